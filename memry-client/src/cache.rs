use crate::encryption::{load_key, open, seal};
use crate::settings::Settings;
use eyre::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reduced projection of a verified session. This is the only identity
/// material that survives a restart. It grants degraded offline access
/// only and must never authorize a privileged remote call by itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CachedAuthState {
    pub user_id: Uuid,
    pub email: String,
    pub authorized: bool,
}

/// Encrypted at-rest store for the last online-verified identity.
///
/// Write only right after an online-verified authentication. Read only on
/// offline startup. Purge on sign-out and on any failed revalidation.
pub struct SecureAuthCache {
    cache_path: PathBuf,
    key_path: PathBuf,
}

impl SecureAuthCache {
    pub fn new(settings: &Settings) -> Self {
        Self {
            cache_path: PathBuf::from(&settings.auth_cache_path),
            key_path: PathBuf::from(&settings.key_path),
        }
    }

    /// A malformed or undecryptable cache is treated as a miss, not an
    /// error; offline bootstrap then simply fails with no prior session.
    pub fn read(&self) -> Option<CachedAuthState> {
        if !self.cache_path.exists() {
            return None;
        }

        match self.read_inner() {
            Ok(state) => Some(state),
            Err(err) => {
                warn!("failed to read auth cache, treating as miss: {err}");
                None
            }
        }
    }

    fn read_inner(&self) -> Result<CachedAuthState> {
        let key = load_key(&self.key_path)?;
        let raw = fs_err::read_to_string(&self.cache_path)?;
        let blob = serde_json::from_str(&raw).context("Malformed auth cache file")?;
        let plain = open(blob, &key)?;
        let state = serde_json::from_slice(&plain).context("Malformed auth cache payload")?;
        Ok(state)
    }

    pub fn write(&self, state: &CachedAuthState) -> Result<()> {
        let key = load_key(&self.key_path)?;
        let plain = serde_json::to_vec(state)?;
        let blob = seal(&plain, &key)?;
        if let Some(dir) = self.cache_path.parent() {
            fs_err::create_dir_all(dir)?;
        }
        fs_err::write(&self.cache_path, serde_json::to_string(&blob)?)
            .wrap_err("Failed to write auth cache file")?;
        debug!("auth cache written for {}", state.user_id);
        Ok(())
    }

    pub fn purge(&self) -> Result<()> {
        if self.cache_path.exists() {
            fs_err::remove_file(&self.cache_path)?;
            debug!("auth cache purged");
        }
        Ok(())
    }
}
