use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub wallet: WalletConfig,
    pub exchange: ExchangeConfig,
    pub trade: TradeConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub address: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub rpc_url: String,
    /// AMM router the wallet has granted token approval to.
    pub router: String,
    /// The token whose price feed this bot keeps alive.
    pub token: String,
    pub weth: String,
    pub usdt: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Minimum minutes between trades.
    pub tx_delay_min: u64,
    /// Maximum minutes between trades.
    pub tx_delay_max: u64,
    /// Floor for sampled trade sizes, in native-asset units. Must sit below
    /// the distribution's mass center or rejection sampling will spin.
    pub min_amount: f64,
    pub buy_amount_mean: f64,
    pub buy_amount_std_dev: f64,
    /// Strategy bias in [-100, 100]. Positive accumulates the native asset
    /// (buy less, sell more); negative accumulates the token.
    #[serde(default)]
    pub strategy_bias: f64,
}

impl TradeConfig {
    /// Bias factor in [-1, 1], derived from the percentage-style config knob.
    #[must_use]
    pub fn bias_factor(&self) -> f64 {
        self.strategy_bias / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub telegram_enabled: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_thread_id: Option<String>,
}

impl AppConfig {
    /// Startup validation. Everything rejected here is a fatal
    /// configuration error; nothing below this line is recoverable at
    /// runtime.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.wallet.address.trim().is_empty() {
            anyhow::bail!("wallet.address must be set");
        }
        if self.wallet.private_key.trim().is_empty() {
            anyhow::bail!("wallet.private_key must be set");
        }
        if self.exchange.rpc_url.trim().is_empty() {
            anyhow::bail!("exchange.rpc_url must be set");
        }

        let trade = &self.trade;
        if trade.strategy_bias < -100.0 || trade.strategy_bias > 100.0 {
            anyhow::bail!(
                "trade.strategy_bias must be between -100 and 100, got {}",
                trade.strategy_bias
            );
        }
        if trade.tx_delay_min == 0 || trade.tx_delay_max == 0 {
            anyhow::bail!("trade delays must be positive");
        }
        if trade.tx_delay_min > trade.tx_delay_max {
            anyhow::bail!(
                "trade.tx_delay_min ({}) must not exceed trade.tx_delay_max ({})",
                trade.tx_delay_min,
                trade.tx_delay_max
            );
        }
        if trade.min_amount <= 0.0 {
            anyhow::bail!("trade.min_amount must be positive");
        }
        if trade.buy_amount_mean <= 0.0 {
            anyhow::bail!("trade.buy_amount_mean must be positive");
        }
        if trade.buy_amount_std_dev < 0.0 {
            anyhow::bail!("trade.buy_amount_std_dev must not be negative");
        }
        if trade.buy_amount_std_dev == 0.0 && trade.buy_amount_mean < trade.min_amount {
            anyhow::bail!(
                "with zero std dev every sample is the mean, which is below trade.min_amount"
            );
        }

        if self.reporting.telegram_enabled
            && (self.reporting.telegram_bot_token.is_none()
                || self.reporting.telegram_chat_id.is_none())
        {
            anyhow::bail!(
                "reporting.telegram_enabled requires telegram_bot_token and telegram_chat_id"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            wallet: WalletConfig {
                address: "0x1111111111111111111111111111111111111111".to_string(),
                private_key: "0xabc".to_string(),
            },
            exchange: ExchangeConfig {
                rpc_url: "https://mainnet.base.org".to_string(),
                router: "0x2222222222222222222222222222222222222222".to_string(),
                token: "0x3333333333333333333333333333333333333333".to_string(),
                weth: "0x4444444444444444444444444444444444444444".to_string(),
                usdt: "0x5555555555555555555555555555555555555555".to_string(),
                explorer_url: "https://basescan.org/tx/".to_string(),
            },
            trade: TradeConfig {
                tx_delay_min: 60,
                tx_delay_max: 120,
                min_amount: 0.01,
                buy_amount_mean: 0.1,
                buy_amount_std_dev: 0.02,
                strategy_bias: 0.0,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            reporting: ReportingConfig::default(),
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_bias_out_of_range() {
        let mut config = valid_config();
        config.trade.strategy_bias = 101.0;
        assert!(config.validate().is_err());
        config.trade.strategy_bias = -100.5;
        assert!(config.validate().is_err());
        config.trade.strategy_bias = -100.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_delay_range() {
        let mut config = valid_config();
        config.trade.tx_delay_min = 180;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_std_dev_below_minimum() {
        let mut config = valid_config();
        config.trade.buy_amount_std_dev = 0.0;
        config.trade.buy_amount_mean = 0.005;
        assert!(config.validate().is_err());
    }

    #[test]
    fn telegram_toggle_requires_credentials() {
        let mut config = valid_config();
        config.reporting.telegram_enabled = true;
        assert!(config.validate().is_err());
        config.reporting.telegram_bot_token = Some("token".to_string());
        config.reporting.telegram_chat_id = Some("-100123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bias_factor_scales_to_unit_interval() {
        let mut config = valid_config();
        config.trade.strategy_bias = 50.0;
        assert!((config.trade.bias_factor() - 0.5).abs() < f64::EPSILON);
        config.trade.strategy_bias = -100.0;
        assert!((config.trade.bias_factor() + 1.0).abs() < f64::EPSILON);
    }
}
