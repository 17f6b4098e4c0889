use crate::command::Engine;
use clap::Parser;
use eyre::Result;
use memry_client::error::SyncError;
use memry_client::settings::Settings;
use memry_client::utils::{read_input, read_input_hidden};

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    #[arg(short, long)]
    pub email: Option<String>,
    #[arg(short, long)]
    pub password: Option<String>,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        if settings.session().is_some() {
            println!("You are already logged in.");
            return Ok(());
        }

        let email = self.email.unwrap_or_else(|| read_input("email"));
        let password = self
            .password
            .unwrap_or_else(|| read_input_hidden("password"));

        let engine = Engine::new(settings).await?;
        match engine.auth.sign_up(&email, &password).await {
            Ok(session) => {
                println!("Account created for {}!", session.email);
                Ok(())
            }
            Err(SyncError::Offline) => {
                println!("Cannot register while offline.");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
