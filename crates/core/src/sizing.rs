use anyhow::Result;
use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::config::TradeConfig;
use crate::events::TradeDirection;

/// Distribution parameters for one trade-size draw, derived from static
/// configuration per invocation and never persisted.
#[derive(Debug, Clone, Copy)]
pub struct TradeSizeParams {
    pub mean: f64,
    pub std_dev: f64,
    /// In [-1, 1]; validated at startup.
    pub bias_factor: f64,
    pub direction: TradeDirection,
    pub minimum: f64,
}

impl TradeSizeParams {
    #[must_use]
    pub fn from_config(trade: &TradeConfig, direction: TradeDirection) -> Self {
        Self {
            mean: trade.buy_amount_mean,
            std_dev: trade.buy_amount_std_dev,
            bias_factor: trade.bias_factor(),
            direction,
            minimum: trade.min_amount,
        }
    }

    /// Applies the strategy bias to the configured distribution.
    ///
    /// Positive bias accumulates the native asset: buys shrink by `(1 - b)`
    /// and sells grow by `(1 + b)`. Negative bias accumulates the token:
    /// buys grow by `(1 + |b|)` and sells shrink by `(1 - |b|)`. The std
    /// dev is rescaled by the same ratio as the mean, so the coefficient of
    /// variation is preserved.
    #[must_use]
    pub fn adjusted(&self) -> (f64, f64) {
        if self.bias_factor == 0.0 {
            return (self.mean, self.std_dev);
        }

        let is_buy = self.direction == TradeDirection::Buy;
        let scale = if self.bias_factor > 0.0 {
            if is_buy {
                1.0 - self.bias_factor
            } else {
                1.0 + self.bias_factor
            }
        } else if is_buy {
            1.0 + self.bias_factor.abs()
        } else {
            1.0 - self.bias_factor.abs()
        };

        let adjusted_mean = self.mean * scale;
        let adjusted_std_dev = (self.std_dev / self.mean) * adjusted_mean;
        (adjusted_mean, adjusted_std_dev)
    }
}

/// Samples a trade size of at least `params.minimum` from the bias-adjusted
/// Gaussian, by mapping uniform draws through the inverse CDF and rejecting
/// draws below the minimum.
///
/// The rejection loop is unbounded by design: termination is the operator's
/// responsibility, met by configuring the minimum below the distribution's
/// effective mass center (enforced only for the degenerate zero-variance
/// case, where rejection could never terminate).
///
/// # Errors
/// Returns an error if the adjusted distribution parameters are invalid or
/// can provably never clear the minimum.
pub fn sample_trade_size<R: Rng>(rng: &mut R, params: &TradeSizeParams) -> Result<f64> {
    let (mean, std_dev) = params.adjusted();

    if std_dev == 0.0 {
        if mean < params.minimum {
            anyhow::bail!(
                "zero variance with mean {mean} below minimum {}",
                params.minimum
            );
        }
        return Ok(mean);
    }

    let normal = Normal::new(mean, std_dev)
        .map_err(|e| anyhow::anyhow!("invalid trade size distribution: {e}"))?;

    loop {
        let value = normal.inverse_cdf(rng.gen::<f64>());
        if value >= params.minimum {
            return Ok(value);
        }
    }
}
