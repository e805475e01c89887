use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use volume_bot_core::config::ReportingConfig;
use volume_bot_core::events::{CycleOutcome, CycleReport};
use volume_bot_core::format_wei;
use volume_bot_core::traits::Notifier;

/// Renders a cycle report as the human-readable summary sent to chat
/// collaborators and the log.
#[must_use]
pub fn format_report(report: &CycleReport) -> String {
    let mut lines = vec![format!(
        "Trade Report: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    )];

    match &report.outcome {
        CycleOutcome::Traded {
            execution,
            attempts,
        } => {
            lines.push(format!("Type: {}", execution.direction.as_str()));
            lines.push(format!("Amount In: {}", format_wei(execution.amount_in)));
            lines.push(format!(
                "Amount Out Min: {}",
                format_wei(execution.amount_out_min)
            ));
            lines.push(format!("Wallet: {}", execution.recipient));
            lines.push(format!("Transaction: {}", execution.tx_url));
            lines.push(format!("Attempts: {attempts}"));
        }
        CycleOutcome::Skipped { reason } => {
            lines.push(format!("Skipped: {reason}"));
        }
        CycleOutcome::Failed { reason, attempts } => {
            lines.push(format!("Failed after {attempts} attempts: {reason}"));
        }
    }

    lines.push(format!("Balance: {}", format_wei(report.native_balance)));
    if let Some(previous) = report.state.previous_trade {
        lines.push(format!("Previous Trade: {previous}"));
    }
    if let Some(next) = report.state.next_trade {
        lines.push(format!("Next Trade: {next}"));
    }
    lines.push(format!("Trade Count: {}", report.state.trade_count));

    lines.join("\n")
}

/// Delivers cycle reports through the Telegram Bot API.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
    thread_id: Option<String>,
}

impl TelegramNotifier {
    /// Builds a notifier from the reporting config, or `None` when the
    /// Telegram toggle is off.
    ///
    /// # Errors
    /// Returns an error if the toggle is on but credentials are missing.
    pub fn from_config(reporting: &ReportingConfig) -> Result<Option<Self>> {
        if !reporting.telegram_enabled {
            return Ok(None);
        }
        let bot_token = reporting
            .telegram_bot_token
            .clone()
            .context("telegram_bot_token is required when telegram reporting is enabled")?;
        let chat_id = reporting
            .telegram_chat_id
            .clone()
            .context("telegram_chat_id is required when telegram reporting is enabled")?;

        Ok(Some(Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
            thread_id: reporting.telegram_thread_id.clone(),
        }))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, report: &CycleReport) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": format_report(report),
        });
        if let Some(thread_id) = &self.thread_id {
            body["message_thread_id"] = json!(thread_id);
        }

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("telegram request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("telegram responded with {status}: {detail}");
        }
        Ok(())
    }
}

/// Fallback collaborator that writes every report to the log, so outcomes
/// are visible even with all remote delivery disabled.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, report: &CycleReport) -> Result<()> {
        info!("\n{}", format_report(report));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use chrono::Utc;
    use volume_bot_core::events::{TradeDirection, TradeExecution};
    use volume_bot_core::state::TradeState;
    use volume_bot_core::WAD;

    #[test]
    fn formats_a_traded_report_with_schedule() {
        let report = CycleReport {
            outcome: CycleOutcome::Traded {
                execution: TradeExecution {
                    direction: TradeDirection::Sell,
                    amount_in: U256::from(3u8) * WAD,
                    amount_out_min: WAD,
                    path: vec![Address::ZERO],
                    recipient: Address::ZERO,
                    tx_url: "0xdeadbeef".to_string(),
                },
                attempts: 2,
            },
            native_balance: U256::from(5u8) * WAD,
            state: TradeState {
                previous_trade: Some(Utc::now()),
                next_trade: Some(Utc::now()),
                trade_count: 9,
            },
            finished_at: Utc::now(),
        };

        let text = format_report(&report);
        assert!(text.contains("Type: SELL"));
        assert!(text.contains("Amount In: 3"));
        assert!(text.contains("Attempts: 2"));
        assert!(text.contains("Trade Count: 9"));
        assert!(text.contains("0xdeadbeef"));
    }

    #[test]
    fn formats_skip_and_failure_outcomes() {
        let base = CycleReport {
            outcome: CycleOutcome::Skipped {
                reason: "insufficient balance".to_string(),
            },
            native_balance: U256::ZERO,
            state: TradeState::default(),
            finished_at: Utc::now(),
        };
        assert!(format_report(&base).contains("Skipped: insufficient balance"));

        let failed = CycleReport {
            outcome: CycleOutcome::Failed {
                reason: "rpc unreachable".to_string(),
                attempts: 3,
            },
            ..base
        };
        assert!(format_report(&failed).contains("Failed after 3 attempts"));
    }

    #[test]
    fn disabled_toggle_yields_no_notifier() {
        let notifier = TelegramNotifier::from_config(&ReportingConfig::default()).unwrap();
        assert!(notifier.is_none());
    }

    #[test]
    fn enabled_toggle_without_credentials_is_an_error() {
        let reporting = ReportingConfig {
            telegram_enabled: true,
            ..ReportingConfig::default()
        };
        assert!(TelegramNotifier::from_config(&reporting).is_err());
    }
}
