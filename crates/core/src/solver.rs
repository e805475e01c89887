use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use tracing::debug;

use crate::amounts::WAD;
use crate::traits::ExchangeClient;

/// Smallest input considered by the search: 0.000001 units.
const SEARCH_FLOOR_WEI: U256 = U256::from_limbs([1_000_000_000_000, 0, 0, 0]);

/// Generous upper bound on the input space: 1,000,000 units.
fn search_ceiling_wei() -> U256 {
    U256::from(1_000_000u64) * WAD
}

/// Finds the smallest input amount of the traded token whose quoted output
/// along `path` is at least `min_out_wei`, without exceeding `balance`.
///
/// The sampler yields a target denominated in the quote asset; the sell swap
/// needs an input denominated in the traded token. This bridges the two by
/// binary search over the integer input space, querying the collaborator's
/// quoting function at each midpoint. Midpoints above the live balance are
/// excluded without a quote call, since they could never be executed.
///
/// Returns `None` when no input within bounds clears the minimum, which the
/// caller must treat as an insufficient-balance condition rather than a
/// transient fault. Correctness assumes the quoting function is monotone
/// non-decreasing in the input amount, which holds for a single AMM pool;
/// multi-hop routing can in principle violate it, in which case the result
/// is still feasible but not necessarily minimal.
///
/// # Errors
/// Returns an error only when a quote call itself fails.
pub async fn solve_sell_amount<C>(
    client: &C,
    path: &[Address],
    min_out_wei: U256,
    balance: U256,
) -> Result<Option<U256>>
where
    C: ExchangeClient + ?Sized,
{
    let one = U256::from(1u8);
    let mut low = SEARCH_FLOOR_WEI;
    let mut high = search_ceiling_wei();
    let mut best: Option<U256> = None;

    while low <= high {
        let mid = (low + high) / U256::from(2u8);

        if mid > balance {
            high = mid - one;
            continue;
        }

        let amounts = client
            .amounts_out(mid, path)
            .await
            .context("quote failed during sell amount search")?;
        let out = amounts
            .last()
            .copied()
            .context("quote returned an empty amounts list")?;

        if out >= min_out_wei {
            best = Some(mid);
            high = mid - one;
        } else {
            low = mid + one;
        }
    }

    debug!(
        min_out_wei = %min_out_wei,
        balance = %balance,
        chosen = ?best,
        "sell amount search finished"
    );

    Ok(best)
}
