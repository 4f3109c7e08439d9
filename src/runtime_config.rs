//! # Runtime Configuration Module
//!
//! Configuration for the dispatcher's externally visible failure behavior.
//!
//! ## Sources
//!
//! [`DispatchConfig`] can be built three ways:
//! - [`DispatchConfig::default()`] - safe production defaults
//! - [`DispatchConfig::from_env()`] - defaults overridden by environment variables
//! - [`DispatchConfig::from_yaml_str()`] - a YAML document; missing keys keep defaults
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `SWITCHYARD_EXPOSE_ERROR_DETAIL` | `expose_error_detail` | `false` |
//! | `SWITCHYARD_NOT_FOUND_BODY` | `not_found_body` | empty |
//! | `SWITCHYARD_ERROR_BODY` | `error_body` | `Internal Server Error` |
//!
//! ## Example Configuration
//!
//! ```yaml
//! expose_error_detail: false
//! not_found_body: "Not Found"
//! error_body: "Something went wrong"
//! ```
//!
//! `expose_error_detail` writes the raw error text into 500 responses. Leave
//! it off outside development.

use std::env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How the dispatcher renders its own 404 and 500 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Put the error chain into the 500 body instead of `error_body`
    pub expose_error_detail: bool,
    /// Body for 404 responses; empty means no body
    pub not_found_body: String,
    /// Body for 500 responses when detail is hidden
    pub error_body: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            expose_error_detail: false,
            not_found_body: String::new(),
            error_body: "Internal Server Error".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable booleans fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            expose_error_detail: env::var("SWITCHYARD_EXPOSE_ERROR_DETAIL")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.expose_error_detail),
            not_found_body: env::var("SWITCHYARD_NOT_FOUND_BODY")
                .unwrap_or(defaults.not_found_body),
            error_body: env::var("SWITCHYARD_ERROR_BODY").unwrap_or(defaults.error_body),
        }
    }

    /// Parse configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this structure.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse dispatch configuration")
    }

    /// Read and parse a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml_str(&content)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
