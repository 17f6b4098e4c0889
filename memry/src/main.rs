use clap::Parser;
use eyre::Result;
use memry::command::MemryCmd;
use memry::VERSION;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author = "Memry",
    version = VERSION,
    )]
struct Memry {
    #[command(subcommand)]
    memry: MemryCmd,
}

impl Memry {
    fn run(self) -> Result<()> {
        self.memry.run()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    Memry::parse().run()
}
