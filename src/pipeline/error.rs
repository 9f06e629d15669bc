/// Errors raised while staging a selection. Staging is all-or-nothing:
/// nothing from the rejected selection is kept.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{count} file(s) have an unsupported format")]
    UnsupportedType { count: usize },

    #[error("A batch can hold at most {limit} items ({attempted} staged)")]
    TooManyItems { attempted: usize, limit: usize },
}

/// Terminal upload failures. Any of these halts the remaining queue;
/// items committed before the failure stay committed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Could not get an upload target: {0}")]
    TargetUnavailable(String),

    #[error("Byte transfer failed: {0}")]
    TransferFailed(String),

    #[error("Session rejected: {0}")]
    Unauthorized(String),

    #[error("No profile for the author: {0}")]
    AuthorNotFound(String),
}

/// A failed media fetch during export. Never fatal; the file is skipped.
#[derive(Debug, thiserror::Error)]
#[error("Fetch failed: {0}")]
pub struct FetchError(pub String);

/// Export failures that abort the whole archive
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to assemble archive: {0}")]
    Archive(String),
}
