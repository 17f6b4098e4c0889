use crate::command::Engine;
use eyre::Result;
use memry_client::settings::Settings;

pub async fn run(settings: &Settings) -> Result<()> {
    if settings.session().is_none() {
        println!("You are not logged in.");
        return Ok(());
    }

    let engine = Engine::new(settings).await?;
    engine.auth.sign_out().await?;

    println!("You are logged out!");
    Ok(())
}
