use clap::Parser;
use eyre::Result;
use memry_client::settings::Settings;

mod login;
mod logout;
mod register;
mod reset;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    Login(login::Cmd),
    Register(register::Cmd),
    ResetPassword(reset::Cmd),
    Logout,
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.run(settings).await,
            Self::Register(cmd) => cmd.run(settings).await,
            Self::ResetPassword(cmd) => cmd.run(settings).await,
            Self::Logout => logout::run(settings).await,
        }
    }
}
