use crate::api_client::AuthClient;
use crate::database::Database;
use crate::domain::Lecture;
use crate::error::SyncError;
use crate::uploader::AssetUploader;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one full sync sequence, shared with coalesced callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub migrated: usize,
    pub pulled: usize,
    pub pushed: usize,
}

type InflightOutcome = Option<Result<SyncSummary, SyncError>>;

/// Orchestrates legacy migration, full pulls and per-record pushes.
///
/// Failure handling is deliberately lazy: remote errors never roll back
/// local state, so the next sync trigger resumes outstanding work. There
/// is no internal retry beyond what the uploader does for blobs.
pub struct SyncCoordinator {
    db: Arc<Database>,
    uploader: AssetUploader,
    /// One full sequence per user at a time; later callers join the
    /// in-flight outcome instead of starting a second run.
    inflight: Mutex<HashMap<Uuid, watch::Receiver<InflightOutcome>>>,
}

impl SyncCoordinator {
    pub fn new(db: Arc<Database>, uploader: AssetUploader) -> Self {
        Self {
            db,
            uploader,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Full sequence: migrate -> pull -> push, single-flight per user.
    pub async fn sync_all(
        &self,
        client: &AuthClient,
        user_id: Uuid,
    ) -> Result<SyncSummary, SyncError> {
        let tx = {
            let mut inflight = self.inflight.lock().await;
            if let Some(rx) = inflight.get(&user_id) {
                let mut rx = rx.clone();
                drop(inflight);
                debug!("joining in-flight sync for {user_id}");
                return match rx.wait_for(|x| x.is_some()).await {
                    Ok(outcome) => outcome.clone().expect("guarded by wait_for"),
                    Err(_) => Err(SyncError::Remote("sync leader dropped".into())),
                };
            }
            let (tx, rx) = watch::channel(None);
            inflight.insert(user_id, rx);
            tx
        };

        let result = self.run_sequence(client, user_id).await;

        self.inflight.lock().await.remove(&user_id);
        let _ = tx.send(Some(result.clone()));

        result
    }

    async fn run_sequence(
        &self,
        client: &AuthClient,
        user_id: Uuid,
    ) -> Result<SyncSummary, SyncError> {
        debug!("starting sync sequence for {user_id}");

        let migrated = self.migrate_legacy(user_id).await?;
        let pulled = self.pull_all(client, user_id).await?;
        let pushed = self.push_all(client, user_id).await?;

        let summary = SyncSummary {
            migrated,
            pulled,
            pushed,
        };
        info!(
            "sync done. {} migrated / {} pulled / {} pushed",
            summary.migrated, summary.pulled, summary.pushed
        );
        Ok(summary)
    }

    /// Adopt rows written before accounts existed into this user. No-op
    /// once nothing legacy remains.
    pub async fn migrate_legacy(&self, user_id: Uuid) -> Result<usize, SyncError> {
        let adopted = self
            .db
            .adopt_legacy(user_id)
            .await
            .map_err(SyncError::store)?;
        if adopted > 0 {
            info!("adopted {adopted} legacy lectures for {user_id}");
        }
        Ok(adopted as usize)
    }

    /// Download the remote state and apply rows that are newer than the
    /// local copy. Local rows that are newer stay put and go out with the
    /// next push. Also refreshes saved filters and the preferences blob.
    pub async fn pull_all(&self, client: &AuthClient, user_id: Uuid) -> Result<usize, SyncError> {
        let remote = client.list_lectures().await?;
        debug!("remote lecture count {}", remote.len());

        let mut apply: Vec<Lecture> = vec![];
        for record in &remote {
            let mut lecture = match Lecture::from_cloud(record) {
                Ok(lecture) => lecture,
                Err(err) => {
                    warn!("skipping malformed remote lecture {}: {err}", record.id);
                    continue;
                }
            };

            match self.db.get(lecture.id).await.map_err(SyncError::store)? {
                Some(local) if local.updated_at >= lecture.updated_at => continue,
                Some(local) => {
                    // whole-row replace, but the not-yet-uploaded recording
                    // on this device must survive the overwrite
                    lecture.local_audio_path = local.local_audio_path;
                    apply.push(lecture);
                }
                None => apply.push(lecture),
            }
        }

        self.db.save_bulk(&apply).await.map_err(SyncError::store)?;

        let filters = client.list_filters().await?;
        self.db
            .save_filters(user_id, &filters)
            .await
            .map_err(SyncError::store)?;

        let preferences = client.get_preferences().await?;
        self.db
            .set_preferences(user_id, &preferences)
            .await
            .map_err(SyncError::store)?;

        Ok(apply.len())
    }

    /// Push every local row changed since the last completed push. A
    /// record that fails stays pending; the cursor only advances when the
    /// whole batch went through.
    pub async fn push_all(&self, client: &AuthClient, user_id: Uuid) -> Result<usize, SyncError> {
        let cursor_at = OffsetDateTime::now_utc();
        let from = self.db.last_sync(user_id).await.map_err(SyncError::store)?;
        let pending = self.db.after(user_id, from).await.map_err(SyncError::store)?;
        debug!("pushing {} pending lectures", pending.len());

        let mut pushed = 0;
        for lecture in &pending {
            match self.upsert(client, lecture).await {
                Ok(_) => pushed += 1,
                Err(err) => {
                    warn!(
                        "push of {} failed ({}): {err}",
                        lecture.id,
                        err.reason_code()
                    );
                }
            }
        }

        if pushed == pending.len() {
            self.db
                .save_last_sync(user_id, cursor_at)
                .await
                .map_err(SyncError::store)?;
        }

        Ok(pushed)
    }

    /// Whole-row upsert keyed by id, rejected when another record of the
    /// same user already carries this title. A local recording is routed
    /// through the uploader first; when that fails the row goes out with
    /// `audio_url` empty rather than ever exposing a local path.
    ///
    /// Returns the durable audio URL, when one exists, for caller display.
    pub async fn upsert(
        &self,
        client: &AuthClient,
        lecture: &Lecture,
    ) -> Result<Option<String>, SyncError> {
        let user_id = lecture.user_id.ok_or(SyncError::NotAuthenticated)?;

        let same_title = client.find_lectures_by_title(&lecture.title).await?;
        if same_title.iter().any(|x| x.id != lecture.id) {
            return Err(SyncError::DuplicateTitle);
        }

        let mut record = lecture.clone();
        if record.audio_url.is_none() {
            if let Some(path) = record.local_audio_path.clone() {
                match self
                    .uploader
                    .upload(client, user_id, record.id, Path::new(&path))
                    .await
                {
                    Ok(url) => {
                        record.audio_url = Some(url);
                        self.db.save(&record).await.map_err(SyncError::store)?;
                    }
                    Err(err) => {
                        // file stays local; the next sync retries the upload
                        warn!(
                            "audio for {} unavailable ({}), pushing without it",
                            record.id,
                            err.reason_code()
                        );
                    }
                }
            }
        }

        let cloud = record.to_cloud(user_id).map_err(SyncError::store)?;
        client.upsert_lecture(&cloud).await?;

        Ok(record.audio_url)
    }

    /// Local delete first, remote delete best-effort. A failed remote
    /// delete is logged and swallowed.
    pub async fn delete(&self, client: &AuthClient, id: Uuid) -> Result<(), SyncError> {
        self.db.delete(id).await.map_err(SyncError::store)?;

        if let Err(err) = client.delete_lecture(id).await {
            warn!("remote delete of {id} failed: {err}");
        }

        Ok(())
    }
}
