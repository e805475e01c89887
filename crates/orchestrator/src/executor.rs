use std::sync::Arc;

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use volume_bot_core::events::{SwapOutcome, TradeDirection, TradeExecution};
use volume_bot_core::format_wei;
use volume_bot_core::traits::ExchangeClient;

/// Seconds until the on-chain deadline embedded in each swap. This is the
/// only timeout in the system; confirmation waits are otherwise unbounded.
const SWAP_DEADLINE_SECS: i64 = 20 * 60;

/// Errors an executor invocation distinguishes for the controller.
/// Insufficient balance is an expected condition and must not be retried;
/// everything else is treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Computes the minimum acceptable output under the flat 10% slippage
/// tolerance, in integer arithmetic that always rounds the tolerance down.
#[must_use]
pub fn amount_out_min(expected_out: U256) -> U256 {
    expected_out - expected_out / U256::from(10u8)
}

/// Submits one slippage-bounded exchange operation and classifies the
/// confirmation. Mutates no local state; the only side effect is the swap
/// itself.
pub struct SwapExecutor<C: ExchangeClient> {
    client: Arc<C>,
}

impl<C: ExchangeClient> SwapExecutor<C> {
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Executes a swap of `amount_in` along `path` in the given direction.
    ///
    /// A confirmation with success status yields `SwapOutcome::Success`
    /// carrying the realized parameters; a confirmed failure yields
    /// `SwapOutcome::Failure`. Collaborator faults surface as
    /// `ExecError::Other` for the controller's retry loop.
    ///
    /// # Errors
    /// `ExecError::InsufficientBalance` when the wallet cannot cover
    /// `amount_in`; `ExecError::Other` for any collaborator fault.
    pub async fn execute(
        &self,
        direction: TradeDirection,
        amount_in: U256,
        path: &[Address],
    ) -> Result<SwapOutcome, ExecError> {
        self.check_balance(direction, amount_in, path).await?;

        if direction == TradeDirection::Sell {
            let token = *path.first().context("swap path is empty")?;
            self.client.ensure_allowance(token, amount_in).await?;
        }

        let amounts = self.client.amounts_out(amount_in, path).await?;
        let expected_out = *amounts
            .last()
            .context("quote returned an empty amounts list")?;
        let min_out = amount_out_min(expected_out);
        let deadline = (Utc::now().timestamp() + SWAP_DEADLINE_SECS) as u64;

        info!(
            direction = direction.as_str(),
            amount_in = %format_wei(amount_in),
            expected_out = %format_wei(expected_out),
            amount_out_min = %format_wei(min_out),
            "submitting swap"
        );

        let receipt = self
            .client
            .swap(direction, amount_in, min_out, path, deadline)
            .await?;

        if receipt.success {
            info!(tx_url = %receipt.tx_url, "swap confirmed");
            Ok(SwapOutcome::Success(TradeExecution {
                direction,
                amount_in,
                amount_out_min: min_out,
                path: path.to_vec(),
                recipient: self.client.wallet_address(),
                tx_url: receipt.tx_url,
            }))
        } else {
            Ok(SwapOutcome::Failure {
                reason: format!("swap transaction {} reverted", receipt.tx_url),
            })
        }
    }

    async fn check_balance(
        &self,
        direction: TradeDirection,
        amount_in: U256,
        path: &[Address],
    ) -> Result<(), ExecError> {
        let available = match direction {
            TradeDirection::Buy => self.client.native_balance().await?,
            TradeDirection::Sell => {
                let token = *path.first().context("swap path is empty")?;
                self.client.token_balance(token).await?
            }
        };
        if available < amount_in {
            return Err(ExecError::InsufficientBalance {
                required: amount_in,
                available,
            });
        }
        Ok(())
    }
}
