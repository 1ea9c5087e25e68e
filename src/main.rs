use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tweetgen_gateway::{ApiServerBuilder, Config};

/// Tweetgen - backend for generating and posting tweets
#[derive(Parser)]
#[command(name = "tweetgen", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,tweetgen_gateway=info",
        1 => "info,tweetgen_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    tracing::info!(
        port = config.server.port,
        backend = ?config.storage.backend,
        "starting tweetgen gateway"
    );

    let server = ApiServerBuilder::from_config(&config)?.build();
    server.run().await?;

    tracing::info!("tweetgen gateway stopped");
    Ok(())
}
