use clap::Subcommand;
use eyre::Result;
use memry_client::auth::AuthSessionManager;
use memry_client::cache::SecureAuthCache;
use memry_client::database::Database;
use memry_client::net::{NetworkMonitor, ServerProbe};
use memry_client::settings::Settings;
use memry_client::sync::SyncCoordinator;
use memry_client::uploader::AssetUploader;
use std::sync::Arc;

mod account;
mod list;
mod status;
mod sync;

#[derive(Subcommand)]
#[clap(infer_subcommands = true)]
pub enum MemryCmd {
    #[command(subcommand)]
    Account(account::Cmd),
    List(list::Cmd),
    Sync,
    Status,
}

impl MemryCmd {
    #[tokio::main]
    pub async fn run(self) -> Result<()> {
        let settings = Settings::new()?;

        match self {
            Self::Account(cmd) => cmd.run(&settings).await,
            Self::List(cmd) => cmd.run(&settings).await,
            Self::Sync => sync::run(&settings).await,
            Self::Status => status::run(&settings).await,
        }
    }
}

/// Everything a command needs wired together: connectivity probed against
/// the configured server, the local store, and the auth manager on top.
pub(crate) struct Engine {
    pub monitor: Arc<NetworkMonitor>,
    pub db: Arc<Database>,
    pub coordinator: Arc<SyncCoordinator>,
    pub auth: AuthSessionManager,
}

impl Engine {
    pub(crate) async fn new(settings: &Settings) -> Result<Self> {
        let probe = Arc::new(ServerProbe::new(&settings.server_address));
        let monitor = Arc::new(NetworkMonitor::new(probe).await);
        let db = Arc::new(Database::new(&settings.db_path).await?);
        let coordinator = Arc::new(SyncCoordinator::new(db.clone(), AssetUploader::new()));
        let auth = AuthSessionManager::new(
            settings.clone(),
            SecureAuthCache::new(settings),
            monitor.clone(),
            coordinator.clone(),
        );

        Ok(Self {
            monitor,
            db,
            coordinator,
            auth,
        })
    }
}
