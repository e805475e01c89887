pub mod amounts;
pub mod config;
pub mod config_loader;
pub mod events;
pub mod sizing;
pub mod solver;
pub mod state;
pub mod traits;

pub use amounts::{eth_to_wei_floor, format_wei, WAD};
pub use config::{
    AppConfig, DatabaseConfig, ExchangeConfig, ReportingConfig, TradeConfig, WalletConfig,
};
pub use config_loader::ConfigLoader;
pub use events::{
    CycleOutcome, CycleReport, SwapOutcome, SwapReceipt, TradeDirection, TradeExecution,
};
pub use sizing::{sample_trade_size, TradeSizeParams};
pub use solver::solve_sell_amount;
pub use state::TradeState;
pub use traits::{ExchangeClient, Notifier, StateStore};
