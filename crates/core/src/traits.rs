use alloy_primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;

use crate::events::{CycleReport, SwapReceipt, TradeDirection};
use crate::state::TradeState;

/// Ledger/exchange collaborator. All amounts are wei (fixed-point, 10^18).
///
/// The contract-call semantics behind these operations are opaque to the
/// rest of the system; tests substitute deterministic stubs.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    fn wallet_address(&self) -> Address;

    async fn native_balance(&self) -> Result<U256>;

    async fn token_balance(&self, token: Address) -> Result<U256>;

    /// Read-only quote along `path`; the last element is the output amount.
    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>>;

    /// Makes sure the router can spend at least `amount` of `token`,
    /// approving more if the current allowance is short.
    async fn ensure_allowance(&self, token: Address, amount: U256) -> Result<()>;

    async fn swap(
        &self,
        direction: TradeDirection,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        deadline: u64,
    ) -> Result<SwapReceipt>;
}

/// Durable storage for the single trade-state record, read at startup and
/// overwritten atomically after every cycle.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Option<TradeState>>;

    async fn save(&self, state: &TradeState) -> Result<()>;
}

/// Outbound report delivery. Failures are logged by the scheduler and never
/// affect the trade schedule.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, report: &CycleReport) -> Result<()>;
}
