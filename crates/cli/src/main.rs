use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use volume_bot_core::{AppConfig, ConfigLoader, Notifier};
use volume_bot_exchange_evm::EvmExchangeClient;
use volume_bot_orchestrator::{
    LogNotifier, Scheduler, SqliteStateStore, TelegramNotifier, TradeCycleController, TradePaths,
};

#[derive(Parser)]
#[command(name = "volume-bot")]
#[command(about = "AMM volume bot: keeps a token's price feed active with randomized trades", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trade scheduler (daemon mode)
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Fire a single trade cycle immediately, then exit
    Once {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Load and validate the configuration, then exit
    CheckConfig {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let scheduler = build_scheduler(&config).await?;
            tokio::select! {
                result = scheduler.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), shutting down");
                    Ok(())
                }
            }
        }
        Commands::Once { config } => {
            let scheduler = build_scheduler(&config).await?;
            let report = scheduler.run_once().await?;
            tracing::info!(outcome = ?report.outcome, "single cycle finished");
            Ok(())
        }
        Commands::CheckConfig { config } => {
            let config = load_config(&config)?;
            tracing::info!(
                tx_delay_min = config.trade.tx_delay_min,
                tx_delay_max = config.trade.tx_delay_max,
                strategy_bias = config.trade.strategy_bias,
                "configuration is valid"
            );
            Ok(())
        }
    }
}

fn load_config(path: &str) -> Result<AppConfig> {
    let config = ConfigLoader::load_from(path)?;
    config.validate()?;
    Ok(config)
}

async fn build_scheduler(
    config_path: &str,
) -> Result<Scheduler<EvmExchangeClient, SqliteStateStore>> {
    let config = load_config(config_path)?;

    let client = Arc::new(EvmExchangeClient::connect(
        &config.exchange,
        &config.wallet,
    )?);
    client.probe().await?;

    let paths = TradePaths::new(client.token(), client.weth(), client.usdt());
    let controller = TradeCycleController::new(client, config.trade.clone(), paths);

    let store = SqliteStateStore::new(&config.database.url).await?;

    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
    if let Some(telegram) = TelegramNotifier::from_config(&config.reporting)? {
        notifiers.push(Box::new(telegram));
    }

    Ok(Scheduler::new(
        controller,
        store,
        notifiers,
        config.trade.tx_delay_min,
        config.trade.tx_delay_max,
    ))
}
