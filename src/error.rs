//! Error types shared by the mail matching and PDF conversion stages.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause kept behind transport and PDF errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BillError {
    /// The requested bill has no entry in the configuration.
    #[error("bill not configured: {0}")]
    BillNotConfigured(String),

    #[error("invalid configuration for bill {bill}: {reason}")]
    InvalidConfig { bill: String, reason: String },

    #[error("invalid month name {name:?}: {reason}")]
    InvalidMonthName { name: String, reason: &'static str },

    #[error("invalid year {0}: expected a year between 1 and 9999")]
    InvalidYear(i32),

    /// Loading or parsing the configuration failed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("label not found: {0}")]
    LabelNotFound(String),

    /// A mailbox call failed. The underlying cause is kept as the error source.
    #[error("{operation} failed{}", message_suffix(.message_id))]
    Transport {
        operation: &'static str,
        message_id: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("got unexpected email, messageId: {0}")]
    UnexpectedEmail(String),

    #[error("email {message_id} carries labels of several bills: {}", .bills.join(", "))]
    AmbiguousEmail {
        message_id: String,
        bills: Vec<String>,
    },

    #[error("no attachment found in email, messageId: {0}")]
    NoAttachmentFound(String),

    #[error("unable to decrypt bill {bill}")]
    DecryptionFailed {
        bill: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid page range for bill {bill}: {reason}")]
    InvalidPageRange { bill: String, reason: String },

    #[error("{stage} stage failed for bill {bill}")]
    Pdf {
        bill: String,
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    /// Wraps the failure of one batch entry so the report names the entry.
    #[error("failed to convert {filename} for bill {bill}")]
    Conversion {
        bill: String,
        filename: String,
        #[source]
        source: Box<BillError>,
    },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn message_suffix(message_id: &Option<String>) -> String {
    match message_id {
        Some(id) => format!(" (messageId: {id})"),
        None => String::new(),
    }
}

impl BillError {
    pub(crate) fn transport(
        operation: &'static str,
        message_id: Option<&str>,
        source: anyhow::Error,
    ) -> Self {
        BillError::Transport {
            operation,
            message_id: message_id.map(str::to_string),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BillError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BillError>;
