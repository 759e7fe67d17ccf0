use clap::Parser;
use tracing_subscriber::EnvFilter;

use nestegg::api::{Cli, Command, run_compare, run_http_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command.unwrap_or_default() {
        Command::Serve { port } => run_http_server(port).await?,
        Command::Compare(args) => print!("{}", run_compare(&args)?),
    }

    Ok(())
}
