use crate::command::Engine;
use eyre::Result;
use memry_client::api_client;
use memry_client::auth::AuthState;
use memry_client::error::SyncError;
use memry_client::settings::Settings;

pub(crate) async fn run(settings: &Settings) -> Result<()> {
    match api_client::health_check(&settings.server_address).await {
        Ok(res) => println!(
            "Server {} is {} (version {})",
            settings.server_address, res.status, res.version
        ),
        Err(err) => println!("Server {} is unreachable: {err}", settings.server_address),
    }

    let engine = Engine::new(settings).await?;
    let state = match engine.auth.initialize().await {
        Ok(state) => state,
        Err(SyncError::CacheMiss) => AuthState::Unauthenticated,
        Err(err) => return Err(err.into()),
    };

    match state {
        AuthState::OnlineAuthenticated(session) => {
            println!("Logged in as {} (verified online).", session.email)
        }
        AuthState::OfflineCached(cached) => {
            println!("Logged in as {} (offline, cached identity).", cached.email)
        }
        AuthState::Unauthenticated => println!("Not logged in."),
        AuthState::Uninitialized => println!("Auth state unknown."),
    }

    Ok(())
}
