use crate::command::Engine;
use clap::Parser;
use eyre::Result;
use memry_client::error::SyncError;
use memry_client::settings::Settings;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    /// Only lectures carrying this category tag
    #[arg(short, long)]
    category: Option<String>,
    /// Title search
    #[arg(default_value = "")]
    query: String,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let engine = Engine::new(settings).await?;

        // a cached offline identity is enough to browse local data
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

        let lectures = engine
            .db
            .list(user_id, self.category.as_deref(), &self.query)
            .await?;

        if lectures.is_empty() {
            println!("No lectures found.");
            return Ok(());
        }

        for lecture in &lectures {
            println!("{:12} {}", lecture.display_date(), lecture.title);
        }
        Ok(())
    }
}
