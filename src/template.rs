//! Pluggable template rendering
//!
//! Handlers that produce HTML depend on the [`TemplateRenderer`] trait rather
//! than a concrete engine. [`MiniJinjaRenderer`] is the bundled implementation:
//! it owns its `minijinja` environment and loads templates lazily from one
//! directory, so several renderers with different roots can coexist.

use std::fmt;
use std::path::{Path, PathBuf};

use minijinja::{Environment, ErrorKind};
use serde_json::Value as JsonValue;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The renderer was built with an empty directory path
    InvalidPath,
    /// No template with this name exists under the template directory
    NotFound { name: String },
    /// The template exists but failed to load or render
    Render { name: String, message: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::InvalidPath => write!(f, "template error: empty template directory"),
            TemplateError::NotFound { name } => {
                write!(f, "template error: template '{}' not found", name)
            }
            TemplateError::Render { name, message } => {
                write!(f, "template error: rendering '{}' failed: {}", name, message)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Renders a named template against a JSON model.
pub trait TemplateRenderer: Send + Sync {
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] for unknown names, [`TemplateError::Render`]
    /// for syntax or evaluation failures.
    fn render(&self, name: &str, model: &JsonValue) -> Result<String, TemplateError>;
}

/// MiniJinja environment rooted at one directory
pub struct MiniJinjaRenderer {
    root: PathBuf,
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// # Errors
    ///
    /// [`TemplateError::InvalidPath`] if `dir` is empty.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let root = dir.as_ref().to_path_buf();
        if root.as_os_str().is_empty() {
            return Err(TemplateError::InvalidPath);
        }
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(root.clone()));
        debug!(template_dir = %root.display(), "Template renderer created");
        Ok(Self { root, env })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, model: &JsonValue) -> Result<String, TemplateError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => TemplateError::NotFound {
                name: name.to_owned(),
            },
            _ => TemplateError::Render {
                name: name.to_owned(),
                message: e.to_string(),
            },
        })?;
        template.render(model).map_err(|e| {
            error!(template = %name, error = %e, "Template rendering failed");
            TemplateError::Render {
                name: name.to_owned(),
                message: e.to_string(),
            }
        })
    }
}

impl fmt::Debug for MiniJinjaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniJinjaRenderer")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
