use std::sync::Arc;

use alloy_primitives::{Address, U256};
use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use volume_bot_core::config::TradeConfig;
use volume_bot_core::events::{CycleOutcome, CycleReport, SwapOutcome, TradeDirection, TradeExecution};
use volume_bot_core::format_wei;
use volume_bot_core::sizing::{sample_trade_size, TradeSizeParams};
use volume_bot_core::solver::solve_sell_amount;
use volume_bot_core::state::TradeState;
use volume_bot_core::traits::ExchangeClient;

use crate::executor::{ExecError, SwapExecutor};

/// Attempts per cycle before the cycle is declared failed.
pub const MAX_ATTEMPTS: u32 = 3;

/// Swap paths for the configured pair. Buys route native asset to the
/// token, sells route the token back, both through the stable leg.
#[derive(Debug, Clone)]
pub struct TradePaths {
    pub token: Address,
    pub buy: Vec<Address>,
    pub sell: Vec<Address>,
}

impl TradePaths {
    #[must_use]
    pub fn new(token: Address, weth: Address, usdt: Address) -> Self {
        Self {
            token,
            buy: vec![weth, usdt, token],
            sell: vec![token, usdt, weth],
        }
    }
}

enum AttemptOutcome {
    Traded(TradeExecution),
    InsufficientBalance { reason: String },
}

/// Drives one trade cycle: size the trade, solve the sell input when
/// needed, execute the swap, and classify the result. Retries transient
/// faults up to [`MAX_ATTEMPTS`]; never retries insufficient balance.
pub struct TradeCycleController<C: ExchangeClient> {
    client: Arc<C>,
    executor: SwapExecutor<C>,
    trade: TradeConfig,
    paths: TradePaths,
}

impl<C: ExchangeClient> TradeCycleController<C> {
    #[must_use]
    pub fn new(client: Arc<C>, trade: TradeConfig, paths: TradePaths) -> Self {
        Self {
            executor: SwapExecutor::new(client.clone()),
            client,
            trade,
            paths,
        }
    }

    /// Runs one full cycle and always produces a report; errors never
    /// escape to the scheduler, so a cycle that cannot trade still hands
    /// control back for the next attempt.
    pub async fn run_cycle(&self, state: &TradeState) -> CycleReport {
        let direction = TradeDirection::from_trade_count(state.trade_count);
        info!(
            trade_count = state.trade_count,
            direction = direction.as_str(),
            "trade cycle started"
        );

        let mut attempts = 0u32;
        let outcome = loop {
            attempts += 1;
            match self.attempt(direction).await {
                Ok(AttemptOutcome::Traded(execution)) => {
                    break CycleOutcome::Traded { execution, attempts };
                }
                Ok(AttemptOutcome::InsufficientBalance { reason }) => {
                    info!(%reason, "cycle skipped");
                    break CycleOutcome::Skipped { reason };
                }
                Err(err) if attempts < MAX_ATTEMPTS => {
                    warn!(attempt = attempts, error = %format!("{err:#}"), "trade attempt failed; retrying");
                }
                Err(err) => {
                    warn!(attempts, error = %format!("{err:#}"), "cycle failed after final attempt");
                    break CycleOutcome::Failed {
                        reason: format!("{err:#}"),
                        attempts,
                    };
                }
            }
        };

        let native_balance = match self.client.native_balance().await {
            Ok(balance) => balance,
            Err(err) => {
                warn!(error = %err, "failed to read native balance for report");
                U256::ZERO
            }
        };

        CycleReport {
            outcome,
            native_balance,
            state: state.clone(),
            finished_at: Utc::now(),
        }
    }

    /// One sizing -> (solving) -> executing pass. Errors are transient by
    /// definition here; expected conditions come back as `Ok` variants.
    async fn attempt(&self, direction: TradeDirection) -> Result<AttemptOutcome> {
        let amount_in = match direction {
            TradeDirection::Buy => {
                let value = self.sample(direction)?;
                volume_bot_core::eth_to_wei_floor(value)?
            }
            TradeDirection::Sell => {
                // The sample is a target value in the quote asset; the swap
                // needs an input in the traded token.
                let target = self.sample(direction)?;
                let min_out = volume_bot_core::eth_to_wei_floor(target)?;
                let balance = self.client.token_balance(self.paths.token).await?;
                match solve_sell_amount(self.client.as_ref(), &self.paths.sell, min_out, balance)
                    .await?
                {
                    Some(amount) => amount,
                    None => {
                        return Ok(AttemptOutcome::InsufficientBalance {
                            reason: format!(
                                "token balance {} cannot realize the target value {}",
                                format_wei(balance),
                                format_wei(min_out)
                            ),
                        });
                    }
                }
            }
        };

        let path = match direction {
            TradeDirection::Buy => &self.paths.buy,
            TradeDirection::Sell => &self.paths.sell,
        };

        match self.executor.execute(direction, amount_in, path).await {
            Ok(SwapOutcome::Success(execution)) => Ok(AttemptOutcome::Traded(execution)),
            Ok(SwapOutcome::Failure { reason }) => anyhow::bail!("swap failed: {reason}"),
            Err(ExecError::InsufficientBalance {
                required,
                available,
            }) => Ok(AttemptOutcome::InsufficientBalance {
                reason: format!(
                    "balance {} is below the required {}",
                    format_wei(available),
                    format_wei(required)
                ),
            }),
            Err(ExecError::Other(err)) => Err(err),
        }
    }

    fn sample(&self, direction: TradeDirection) -> Result<f64> {
        let params = TradeSizeParams::from_config(&self.trade, direction);
        // Scoped so the thread-local RNG is dropped before any await point.
        let mut rng = rand::thread_rng();
        sample_trade_size(&mut rng, &params)
    }
}
