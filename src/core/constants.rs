/// Fixed constants of the bonding curve model

/// Market cap in USD at which a pump.fun bonding curve graduates
pub const GRADUATION_MCAP_USD: f64 = 69_000.0;

/// Rough SOL/USD conversion used for market cap estimates, not authoritative
pub const APPROX_SOL_USD: f64 = 180.0;

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Alert type emitted by the early signal coordinator
pub const ULTRA_EARLY_SIGNAL: &str = "ultra_early";

/// Maps a market cap onto bonding curve completion, clamped to [0, 100]
pub fn completion_percent(market_cap_usd: f64, graduation_mcap_usd: f64) -> f64 {
    if market_cap_usd.is_nan() || market_cap_usd <= 0.0 || graduation_mcap_usd <= 0.0 {
        return 0.0;
    }
    (market_cap_usd / graduation_mcap_usd * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_is_clamped() {
        assert_eq!(completion_percent(138_000.0, GRADUATION_MCAP_USD), 100.0);
        assert_eq!(completion_percent(-5.0, GRADUATION_MCAP_USD), 0.0);
        assert_eq!(completion_percent(f64::NAN, GRADUATION_MCAP_USD), 0.0);
        assert_eq!(completion_percent(f64::INFINITY, GRADUATION_MCAP_USD), 100.0);

        for mcap in [0.0, 1.0, 10_350.0, 68_999.0, 69_000.0, 1e12] {
            let pct = completion_percent(mcap, GRADUATION_MCAP_USD);
            assert!((0.0..=100.0).contains(&pct), "{} -> {}", mcap, pct);
        }
    }

    #[test]
    fn test_completion_linear_below_graduation() {
        let pct = completion_percent(10_350.0, GRADUATION_MCAP_USD);
        assert!((pct - 15.0).abs() < 1e-9);
    }
}
