use clap::Parser;
use riskloop::cli::{Cli, Commands};
use riskloop::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = riskloop::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Size(args) => {
            args.execute(&config)?;
        }
        Commands::Execute(args) => {
            tracing::info!(symbol = %args.symbol, "Starting paper execution");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
