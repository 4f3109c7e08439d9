//! Structured logging setup
//!
//! Every component logs through `tracing`. Hosts that do not install their own
//! subscriber can call [`init_logging_with_config`] once at startup to get:
//! - JSON (production) or pretty (development) output
//! - `RUST_LOG` style filtering plus extra per-target directives
//! - Sampling of low-severity events so hot paths stay cheap under load
//! - Optional non-blocking output through `tracing-appender`
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `SWITCHYARD_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `SWITCHYARD_LOG_FORMAT` | json/pretty | `json` |
//! | `SWITCHYARD_LOG_SAMPLING_MODE` | all/error-only/sampled | `all` |
//! | `SWITCHYARD_LOG_SAMPLING_RATE` | 0.0-1.0, used by `sampled` | `0.1` |
//! | `SWITCHYARD_LOG_ASYNC` | buffer output on a worker thread | `false` |
//! | `SWITCHYARD_LOG_TARGET_FILTER` | comma-separated directives | none |
//! | `SWITCHYARD_LOG_INCLUDE_LOCATION` | add file:line | `false` |

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::subscriber::Interest;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Every event passing the level filter
    All,
    /// Only WARN and ERROR
    ErrorOnly,
    /// All WARN and ERROR, plus a fraction of everything else
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace/debug/info/warn/error; `RUST_LOG` wins when set
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction (0.0-1.0) of low-severity events kept in `Sampled` mode
    pub sampling_rate: f64,
    /// Write through a background worker instead of the calling thread
    pub async_logging: bool,
    /// Extra filter directives, comma-separated (e.g. `switchyard::router=debug`)
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 0.1,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("SWITCHYARD_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("SWITCHYARD_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            sampling_mode: env::var("SWITCHYARD_LOG_SAMPLING_MODE")
                .map(|s| SamplingMode::parse(&s))
                .unwrap_or(defaults.sampling_mode),
            sampling_rate: env::var("SWITCHYARD_LOG_SAMPLING_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sampling_rate),
            async_logging: env::var("SWITCHYARD_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: env::var("SWITCHYARD_LOG_TARGET_FILTER").ok(),
            include_location: env::var("SWITCHYARD_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable, synchronous
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    /// JSON, sampled, buffered
    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::Sampled,
            sampling_rate: 0.1,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Drops low-severity events according to a [`SamplingMode`]
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    /// Decision that holds for every event of a callsite; `None` when each
    /// event must be sampled on its own.
    fn callsite_decision(&self, metadata: &Metadata<'_>) -> Option<bool> {
        let severe = matches!(*metadata.level(), Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => Some(true),
            SamplingMode::ErrorOnly => Some(severe),
            SamplingMode::Sampled if severe => Some(true),
            SamplingMode::Sampled if self.sampling_rate <= 0.0 => Some(false),
            SamplingMode::Sampled => None,
        }
    }

    /// Keep every n-th sampled event.
    fn sample_next(&self) -> bool {
        let interval = (1.0 / self.sampling_rate).round().max(1.0) as u64;
        self.counter.fetch_add(1, Ordering::Relaxed) % interval == 0
    }

    fn should_sample(&self, metadata: &Metadata<'_>) -> bool {
        self.callsite_decision(metadata)
            .unwrap_or_else(|| self.sample_next())
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    // Interest is cached per callsite, so sampled callsites must stay
    // `sometimes` for `event_enabled` to see every event.
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if !metadata.is_event() {
            return Interest::always();
        }
        match self.callsite_decision(metadata) {
            Some(true) => Interest::always(),
            Some(false) => Interest::never(),
            None => Interest::sometimes(),
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans are structure, not output; only events are filtered
        !metadata.is_event() || self.callsite_decision(metadata) != Some(false)
    }

    fn event_enabled(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) -> bool {
        self.should_sample(event.metadata())
    }
}

/// Keeps the non-blocking writer alive; drop it at shutdown to flush.
#[must_use = "dropping the guard stops buffered log output"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install a global subscriber built from `config`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use switchyard::logging::{init_logging_with_config, LogConfig};
///
/// let _guard = init_logging_with_config(&LogConfig::from_env())
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
            }
        }
    }

    let (writer, worker) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}

/// Shorthand for `init_logging_with_config(&LogConfig::from_env())`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard> {
    init_logging_with_config(&LogConfig::from_env())
}
