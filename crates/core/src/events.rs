use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::TradeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    /// Buy on even counts, sell on odd counts. Evaluated from the trade
    /// count as it was *before* the cycle increments it.
    #[must_use]
    pub const fn from_trade_count(count: u64) -> Self {
        if count % 2 == 0 {
            Self::Buy
        } else {
            Self::Sell
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Parameters of a swap that confirmed on-chain with success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecution {
    pub direction: TradeDirection,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Explorer link to the confirmed transaction.
    pub tx_url: String,
}

/// Result of one swap submission, produced once per executor invocation and
/// consumed immediately by the cycle controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwapOutcome {
    Success(TradeExecution),
    Failure { reason: String },
}

/// Raw confirmation handed back by the exchange collaborator.
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    /// Explorer link to the submitted transaction.
    pub tx_url: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleOutcome {
    Traded { execution: TradeExecution, attempts: u32 },
    Skipped { reason: String },
    Failed { reason: String, attempts: u32 },
}

/// Ephemeral summary of one trade cycle, handed to notification
/// collaborators and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub native_balance: U256,
    pub state: TradeState,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_alternates_with_count_parity() {
        let directions: Vec<_> = (0..4).map(TradeDirection::from_trade_count).collect();
        assert_eq!(
            directions,
            vec![
                TradeDirection::Buy,
                TradeDirection::Sell,
                TradeDirection::Buy,
                TradeDirection::Sell,
            ]
        );
    }
}
