use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single durable record of bot progress.
///
/// Owned exclusively by the scheduler; other components only ever see a
/// read-only snapshot. `trade_count` is monotonic across restarts and never
/// resets, which is what keeps the buy/sell alternation stable through
/// crashes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeState {
    pub previous_trade: Option<DateTime<Utc>>,
    pub next_trade: Option<DateTime<Utc>>,
    pub trade_count: u64,
}
