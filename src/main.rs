//! canopy CLI binary entry point.

use canopy::cli::{chat, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse_args();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Chat(args) => chat::handle_chat(config, args).await,
        Commands::Health => chat::handle_health(config).await,
    };

    if let Err(e) = result {
        tracing::debug!(category = %e.category(), "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("canopy=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
