use crate::command::Engine;
use eyre::Result;
use memry_client::error::SyncError;
use memry_client::settings::Settings;

pub(crate) async fn run(settings: &Settings) -> Result<()> {
    let engine = Engine::new(settings).await?;

    let state = match engine.auth.initialize().await {
        Ok(state) => state,
        Err(SyncError::CacheMiss) => {
            println!("You are not logged in.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let Some(user_id) = state.user_id() else {
        println!("You are not logged in.");
        return Ok(());
    };

    if !engine.monitor.is_online() {
        println!("You appear to be offline. Changes will sync once the server is reachable.");
        return Ok(());
    }

    let client = engine.auth.client()?;
    let summary = engine.coordinator.sync_all(&client, user_id).await?;

    println!(
        "Sync done. {} migrated / {} pulled / {} pushed",
        summary.migrated, summary.pulled, summary.pushed
    );
    Ok(())
}
