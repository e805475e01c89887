use alloy_primitives::U256;
use anyhow::Result;

/// One whole unit of an 18-decimal asset, in wei.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

const WAD_DECIMALS: u32 = 18;

/// Converts a decimal amount of the native asset into wei, rounding down.
///
/// All on-chain amounts are fixed-point integers scaled by 10^18; floats only
/// exist on the configuration/sampling side and are converted here once,
/// before any arithmetic that must stay exact.
///
/// # Errors
/// Returns an error if the amount is non-finite, negative, or too large to
/// represent in 128 bits of wei.
pub fn eth_to_wei_floor(amount_eth: f64) -> Result<U256> {
    if !amount_eth.is_finite() {
        anyhow::bail!("amount is not finite: {amount_eth}");
    }
    if amount_eth < 0.0 {
        anyhow::bail!("amount is negative: {amount_eth}");
    }

    let scaled = amount_eth * 10f64.powi(WAD_DECIMALS as i32);
    if !scaled.is_finite() || scaled >= 2f64.powi(128) {
        anyhow::bail!("amount overflows wei representation: {amount_eth}");
    }

    Ok(U256::from(scaled.floor() as u128))
}

/// Formats a wei amount as a decimal string with trailing zeros trimmed.
#[must_use]
pub fn format_wei(amount_wei: U256) -> String {
    let whole = amount_wei / WAD;
    let frac = amount_wei % WAD;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>18}", frac.to_string());
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_whole_units_exactly() {
        assert_eq!(eth_to_wei_floor(1.0).unwrap(), WAD);
        assert_eq!(eth_to_wei_floor(0.0).unwrap(), U256::ZERO);
        assert_eq!(
            eth_to_wei_floor(0.01).unwrap(),
            U256::from(10_000_000_000_000_000u64)
        );
    }

    #[test]
    fn rounds_down_sub_wei_remainders() {
        let third = eth_to_wei_floor(1.0 / 3.0).unwrap();
        assert!(third < WAD / U256::from(3u8) + U256::from(1u8));
    }

    #[test]
    fn rejects_invalid_amounts() {
        assert!(eth_to_wei_floor(f64::NAN).is_err());
        assert!(eth_to_wei_floor(f64::INFINITY).is_err());
        assert!(eth_to_wei_floor(-0.5).is_err());
        assert!(eth_to_wei_floor(1e30).is_err());
    }

    #[test]
    fn formats_wei_as_decimal() {
        assert_eq!(format_wei(WAD), "1");
        assert_eq!(format_wei(U256::ZERO), "0");
        assert_eq!(format_wei(WAD / U256::from(2u8)), "0.5");
        assert_eq!(
            format_wei(WAD + U256::from(10_000_000_000_000_000u64)),
            "1.01"
        );
    }
}
