use anyhow::Context;
use clap::Parser;
use gig_income::api::{Cli, Command, run_cli_calculation, run_http_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gig_income=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .with_context(|| format!("HTTP server on port {port} failed"))?,
        Command::Calculate(args) => {
            let response = run_cli_calculation(&args)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
