use crate::api_client::AuthClient;
use crate::error::SyncError;
use crate::retry::{retry, RetryPolicy};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

/// Uploads local recordings to blob storage and hands back durable remote
/// URLs. The destination key is deterministic, so a retried or repeated
/// upload overwrites the same object instead of duplicating it.
pub struct AssetUploader {
    policy: RetryPolicy,
}

impl Default for AssetUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetUploader {
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// `Err(UploadFailed)` means "unavailable for now", never a fatal
    /// condition: the local file is still on disk and a later attempt
    /// retries the upload. The returned value is always a remote URL,
    /// never a local path.
    pub async fn upload(
        &self,
        client: &AuthClient,
        user_id: Uuid,
        record_id: Uuid,
        local_path: &Path,
    ) -> Result<String, SyncError> {
        let ext = local_path
            .extension()
            .and_then(|x| x.to_str())
            .unwrap_or("m4a");
        let key = format!("{user_id}/{record_id}.{ext}");

        let bytes = match tokio::fs::read(local_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to read audio file {local_path:?}: {err}");
                return Err(SyncError::UploadFailed);
            }
        };

        let content_type = content_type_for(ext);
        debug!("uploading {} bytes to {key}", bytes.len());

        let res = retry(self.policy, || {
            client.put_blob(&key, bytes.clone(), content_type)
        })
        .await;

        res.map_err(|err| {
            warn!(
                "upload of {key} failed after {} attempts: {err}",
                self.policy.max_attempts
            );
            SyncError::UploadFailed
        })
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "m4a" | "mp4" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}
