use crate::command::Engine;
use clap::Parser;
use eyre::Result;
use memry_client::error::SyncError;
use memry_client::settings::Settings;
use memry_client::utils::read_input;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    #[arg(short, long)]
    pub email: Option<String>,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let email = self.email.unwrap_or_else(|| read_input("email"));

        let engine = Engine::new(settings).await?;
        match engine.auth.reset_password(&email).await {
            Ok(()) => {
                println!("Password reset email sent to {email}.");
                Ok(())
            }
            Err(SyncError::Offline) => {
                println!("Cannot reset the password while offline.");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
