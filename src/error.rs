use crate::types::FieldName;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Field '{0}' holds a non-finite double ({1}) which cannot be represented in JSON")]
    NonFiniteValue(FieldName, f64),

    #[error("Failed to serialize or parse an event line ({0})")]
    Json(#[from] serde_json::Error),

    #[error(
        "The log sink rejected the event line ({})",
        .0.kind()
    )]
    Sink(io::Error),

    #[error("Encountered a malformed event line ({0})")]
    MalformedLine(String),

    #[error("Failed to load the session info ({0})")]
    Config(#[from] serde_yaml::Error),

    #[error(
        "Encountered an IO error while reading or writing event lines ({})",
        .0.kind()
    )]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed_line<S: AsRef<str>>(reason: S) -> Self {
        Error::MalformedLine(reason.as_ref().to_owned())
    }
}
