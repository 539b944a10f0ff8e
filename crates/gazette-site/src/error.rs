//! Site build errors.

use std::path::PathBuf;

/// Errors that can occur while building a site.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to render template {template}: {message}")]
    Render { template: String, message: String },

    #[error("Failed to convert markdown: {name}: {message}")]
    Markdown { name: String, message: String },

    #[error("Permalink collision: {first} and {second} both write to {}", .path.display())]
    PermalinkCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Invalid permalink pattern {0:?}: missing :num placeholder")]
    InvalidPermalinkPattern(String),

    #[error("Invalid pagination settings: items_per_page must be at least 1")]
    InvalidItemsPerPage,

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SiteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
