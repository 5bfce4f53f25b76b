use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("no API token configured; save one with `token set <TOKEN>`")]
    MissingCredential,

    #[error("{0}")]
    TransportFailure(String),

    #[error("image generation failed with status {status}: {body}")]
    GenerationFailed { status: u16, body: String },

    #[error("could not decode generation archive: {0}")]
    ArchiveDecodeFailure(String),

    #[error("failed to access {}: {message}", .path.display())]
    PersistenceFailure { path: PathBuf, message: String },

    #[error("invalid query: {0}")]
    ValidationFailure(String),

    #[error("a generation request is already in flight for \"{0}\"")]
    GenerationBusy(String),
}

impl StudioError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
