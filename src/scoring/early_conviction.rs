/// Additive early conviction scoring
///
/// Each factor picks its highest qualifying tier only. The total is not
/// clamped; the posting threshold lives with the caller.

use tracing::debug;

use crate::aggregator::HotToken;
use crate::core::{ConvictionResult, CurveSnapshot};

/// (minimum count, points), highest tier first
const SMART_MONEY_TIERS: [(usize, u32); 3] = [(3, 50), (2, 40), (1, 30)];
const KOL_TIERS: [(usize, u32); 2] = [(2, 35), (1, 25)];
const SOCIAL_TIERS: [(usize, u32); 3] = [(3, 30), (2, 20), (1, 10)];
const CONVERGENCE_TIERS: [(usize, u32); 2] = [(4, 25), (3, 15)];

const VOLUME_THRESHOLD_USD: f64 = 10_000.0;
const VOLUME_POINTS: u32 = 15;

fn tier_for(count: usize, tiers: &[(usize, u32)]) -> Option<u32> {
    tiers
        .iter()
        .find(|(min, _)| count >= *min)
        .map(|(_, points)| *points)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EarlyConvictionScorer;

impl EarlyConvictionScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, token: &str, hot: &HotToken, curve: &CurveSnapshot) -> ConvictionResult {
        let mut result = ConvictionResult::default();

        let (points, label) = Self::curve_tier(curve.completion_percent);
        result.add(
            points,
            format!("📈 {} curve ({:.1}%) (+{})", label, curve.completion_percent, points),
        );

        let smart_money = hot.smart_money.len();
        if let Some(points) = tier_for(smart_money, &SMART_MONEY_TIERS) {
            result.add(points, format!("🐋 {} smart money buy(s) (+{})", smart_money, points));
        }

        let kols = hot.kols.len();
        if let Some(points) = tier_for(kols, &KOL_TIERS) {
            result.add(points, format!("📢 {} KOL buy(s) (+{})", kols, points));
        }

        let social = hot.social_count();
        if let Some(points) = tier_for(social, &SOCIAL_TIERS) {
            result.add(
                points,
                format!(
                    "💬 {} social call(s) ({} telegram, {} twitter) (+{})",
                    social,
                    hot.telegram.len(),
                    hot.twitter.len(),
                    points
                ),
            );
        }

        if let Some(points) = tier_for(hot.signal_count, &CONVERGENCE_TIERS) {
            result.add(
                points,
                format!("🎯 {} converging signals (+{})", hot.signal_count, points),
            );
        }

        if curve.volume_24h > VOLUME_THRESHOLD_USD {
            result.add(
                VOLUME_POINTS,
                format!("📊 Strong volume (${:.0}) (+{})", curve.volume_24h, VOLUME_POINTS),
            );
        }

        if curve.holder_count > 100 {
            result.add(10, format!("👥 {} holders (+10)", curve.holder_count));
        } else if curve.holder_count > 50 {
            result.add(5, format!("👥 {} holders (+5)", curve.holder_count));
        }

        debug!(token, score = result.score, factors = result.reasons.len(), "Conviction scored");
        result
    }

    fn curve_tier(completion_percent: f64) -> (u32, &'static str) {
        if completion_percent < 20.0 {
            (40, "Ultra early")
        } else if completion_percent < 40.0 {
            (30, "Very early")
        } else if completion_percent < 60.0 {
            (20, "Early")
        } else {
            (10, "Late-stage")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CurveProvenance, SmartMoneyBuy, SocialCall, WalletTier};
    use tokio::time::Instant;

    fn buy(tier: WalletTier) -> SmartMoneyBuy {
        SmartMoneyBuy {
            wallet: "wallet".to_string(),
            name: "Tracked Wallet".to_string(),
            tier,
            win_rate: 0.0,
            pnl_30d: 0.0,
            amount: 0.0,
        }
    }

    fn call() -> SocialCall {
        SocialCall {
            caller: "caller".to_string(),
            channel: None,
            followers: None,
            message: String::new(),
        }
    }

    fn hot(smart_money: usize, kols: usize, telegram: usize, twitter: usize) -> HotToken {
        let now = Instant::now();
        HotToken {
            token: "mint".to_string(),
            smart_money: vec![buy(WalletTier::Elite); smart_money],
            kols: vec![buy(WalletTier::Mid); kols],
            telegram: vec![call(); telegram],
            twitter: vec![call(); twitter],
            signal_count: smart_money + kols + telegram + twitter,
            first_seen: now,
            last_updated: now,
        }
    }

    fn curve(pct: f64) -> CurveSnapshot {
        CurveSnapshot {
            token: "mint".to_string(),
            completion_percent: pct,
            market_cap_usd: pct / 100.0 * 69_000.0,
            sol_raised: 0.0,
            holder_count: 0,
            volume_24h: 0.0,
            provenance: CurveProvenance::PumpfunApi,
            fetched_at: Instant::now(),
        }
    }

    #[test]
    fn test_ultra_early_convergence_scenario() {
        let result = EarlyConvictionScorer::new().score("mint", &hot(3, 0, 1, 0), &curve(15.0));
        assert_eq!(result.score, 125);
        assert_eq!(result.reasons.len(), 4);
        assert!(result.reasons[0].contains("(+40)"));
    }

    #[test]
    fn test_single_social_call_scores_low() {
        let result = EarlyConvictionScorer::new().score("mint", &hot(0, 0, 1, 0), &curve(30.0));
        assert_eq!(result.score, 40);
        assert_eq!(result.reasons.len(), 2);
    }

    #[test]
    fn test_curve_tiers() {
        let scorer = EarlyConvictionScorer::new();
        let empty = hot(0, 0, 0, 0);
        let scores: Vec<u32> = [0.0, 19.9, 20.0, 39.9, 40.0, 59.9, 60.0, 70.0]
            .iter()
            .map(|pct| scorer.score("mint", &empty, &curve(*pct)).score)
            .collect();
        assert_eq!(scores, vec![40, 40, 30, 30, 20, 20, 10, 10]);
    }

    #[test]
    fn test_smart_money_tier_is_exclusive() {
        let scorer = EarlyConvictionScorer::new();
        let base = scorer.score("mint", &hot(0, 0, 0, 0), &curve(65.0)).score;
        let five = scorer.score("mint", &hot(5, 0, 0, 0), &curve(65.0)).score;
        // 5 events also trip the convergence tier (+25)
        assert_eq!(five - base, 50 + 25);
    }

    #[test]
    fn test_smart_money_monotonic() {
        let scorer = EarlyConvictionScorer::new();
        let scores: Vec<u32> = (1..=3)
            .map(|n| scorer.score("mint", &hot(n, 1, 1, 0), &curve(25.0)).score)
            .collect();
        assert!(scores.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_kol_and_social_tiers() {
        let scorer = EarlyConvictionScorer::new();
        // curve 10, kol 35, social 30, convergence 25
        assert_eq!(scorer.score("mint", &hot(0, 2, 2, 1), &curve(65.0)).score, 100);
        // curve 10, kol 25, social 20, convergence 15
        assert_eq!(scorer.score("mint", &hot(0, 1, 0, 2), &curve(65.0)).score, 10 + 25 + 20 + 15);
    }

    #[test]
    fn test_volume_and_holders() {
        let scorer = EarlyConvictionScorer::new();
        let empty = hot(0, 0, 0, 0);

        let mut snapshot = curve(65.0);
        snapshot.volume_24h = 10_000.0;
        snapshot.holder_count = 50;
        assert_eq!(scorer.score("mint", &empty, &snapshot).score, 10);

        snapshot.volume_24h = 10_001.0;
        snapshot.holder_count = 51;
        assert_eq!(scorer.score("mint", &empty, &snapshot).score, 10 + 15 + 5);

        snapshot.holder_count = 101;
        assert_eq!(scorer.score("mint", &empty, &snapshot).score, 10 + 15 + 10);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = EarlyConvictionScorer::new();
        let bundle = hot(2, 1, 1, 1);
        let snapshot = curve(33.0);
        assert_eq!(
            scorer.score("mint", &bundle, &snapshot),
            scorer.score("mint", &bundle, &snapshot)
        );
    }
}
