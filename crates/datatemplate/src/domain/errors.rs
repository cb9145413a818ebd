//! Domain-specific errors.

use thiserror::Error;

use crate::domain::model::DocumentKind;

/// Failures surfaced to the user while moving bundles in and out of a session.
///
/// None of these are fatal: the session reports them and stays interactive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataTemplateError {
    /// Data is present but does not look like a header plus at least one row.
    #[error("Not Enough Rows in Data")]
    EmptyDataShape,
    /// Template is empty when generating.
    #[error("No Template")]
    MissingTemplate,
    /// Strict detection found none of the bundle tags.
    #[error("Invalid DataTemplate Format")]
    InvalidFormat,
    /// A field could not pass through the transport encoding. The detail is kept as the source.
    #[error("Invalid Character Encoding in DataTemplate")]
    Encoding(#[from] EncodingError),
    /// Restoring from a URL query failed; carries the underlying message.
    #[error("{0}")]
    Restore(String),
}

impl DataTemplateError {
    /// Document that should receive focus once the error is reported.
    pub fn focus_target(&self) -> Option<DocumentKind> {
        match self {
            DataTemplateError::EmptyDataShape => Some(DocumentKind::Data),
            DataTemplateError::MissingTemplate => Some(DocumentKind::Template),
            _ => None,
        }
    }
}

/// Transport encoding failures for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("invalid base64 in '{field}': {reason}")]
    InvalidBase64 { field: String, reason: String },
    #[error("'{field}' does not decode to valid UTF-8 text")]
    InvalidText { field: String },
    #[error("'{field}' contains {ch:?} which cannot be encoded as latin1")]
    Unrepresentable { field: String, ch: char },
}
