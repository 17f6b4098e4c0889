/// Error taxonomy for the sync and auth engine.
///
/// User-initiated operations return these synchronously so the caller can
/// display `reason_code()`. Background operations log and swallow them;
/// local state is never rolled back, so every one of these is recoverable
/// by a later sync trigger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("operation requires connectivity and none exists")]
    Offline,

    #[error("a lecture with this title already exists")]
    DuplicateTitle,

    #[error("asset upload failed after retries")]
    UploadFailed,

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("offline with no prior session")]
    CacheMiss,

    #[error("local store error: {0}")]
    Store(String),
}

impl SyncError {
    pub fn store(err: eyre::Report) -> Self {
        Self::Store(err.to_string())
    }

    /// Stable code for caller-level error display.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SyncError::NotAuthenticated => "NOT_AUTHENTICATED",
            SyncError::Offline => "OFFLINE",
            SyncError::DuplicateTitle => "DUPLICATE_TITLE",
            SyncError::UploadFailed => "UPLOAD_FAILED",
            SyncError::Remote(_) => "REMOTE_ERROR",
            SyncError::CacheMiss => "CACHE_MISS",
            SyncError::Store(_) => "STORE_ERROR",
        }
    }
}
