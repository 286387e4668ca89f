use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the helpdesk core.
#[derive(Debug, Error)]
pub enum HelpdeskError {
    /// Filesystem failures (knowledge base, conversation log, dataset export).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON in a knowledge base, label mapping or log file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("knowledge base not found: {}", .0.display())]
    KnowledgeBaseNotFound(PathBuf),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The intent model answered, but not with something usable.
    #[error("Model error: {0}")]
    Model(String),

    /// Transport failure talking to the intent model endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, HelpdeskError>;
