/// Early signal evaluation loop
///
/// Every pass pulls hot tokens from the aggregator, resolves curve progress,
/// scores survivors and emits alerts. Decisions are terminal: a token in the
/// processed set is never evaluated again. Missing curve data is not a
/// decision and the token is retried on the next pass.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::alert::{AlertSink, EarlyAlert};
use super::processed::{ProcessedSet, TokenDecision};
use super::seen::SeenOracle;
use crate::aggregator::{HotToken, SignalAggregator};
use crate::config::{AggregatorConfig, CoordinatorConfig};
use crate::core::ULTRA_EARLY_SIGNAL;
use crate::curve::{CurveProgressResolver, FeedHandle};
use crate::scoring::EarlyConvictionScorer;

/// Outcome of evaluating one hot token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Decided(TokenDecision),
    /// No curve data from any tier
    Deferred,
    AlreadySeen,
}

/// Counters for one coordinator pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub hot: usize,
    pub alerted: usize,
    pub rejected_late: usize,
    pub rejected_low: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub errors: usize,
    pub expired: usize,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.hot == 0 && self.errors == 0 && self.expired == 0
    }
}

pub struct EarlySignalCoordinator {
    config: CoordinatorConfig,
    aggregator_config: AggregatorConfig,
    aggregator: Arc<SignalAggregator>,
    resolver: Arc<CurveProgressResolver>,
    scorer: EarlyConvictionScorer,
    sink: Arc<dyn AlertSink>,
    seen: Option<Arc<dyn SeenOracle>>,
    feed: Option<FeedHandle>,
    processed: ProcessedSet,
}

impl EarlySignalCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        aggregator_config: AggregatorConfig,
        aggregator: Arc<SignalAggregator>,
        resolver: Arc<CurveProgressResolver>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let processed = ProcessedSet::new(config.processed_capacity);
        Self {
            config,
            aggregator_config,
            aggregator,
            resolver,
            scorer: EarlyConvictionScorer::new(),
            sink,
            seen: None,
            feed: None,
            processed,
        }
    }

    pub fn with_seen_oracle(mut self, oracle: Arc<dyn SeenOracle>) -> Self {
        self.seen = Some(oracle);
        self
    }

    /// Hot tokens are handed to the live feed so their trades reach the live tier
    pub fn with_feed(mut self, feed: FeedHandle) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Polls until shutdown. A failing evaluation never stops the loop.
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            "🎯 Early signal coordinator started (min conviction {}, max curve {:.0}%, every {:?})",
            self.config.min_conviction,
            self.config.max_curve_percent,
            self.config.poll_interval()
        );

        loop {
            let report = self.run_once().await;
            if !report.is_quiet() {
                info!(
                    hot = report.hot,
                    alerted = report.alerted,
                    rejected_late = report.rejected_late,
                    rejected_low = report.rejected_low,
                    deferred = report.deferred,
                    skipped = report.skipped,
                    errors = report.errors,
                    expired = report.expired,
                    "Coordinator cycle complete"
                );
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval()) => {}
                _ = shutdown.recv() => {
                    info!("🛑 Early signal coordinator shutting down");
                    return Ok(());
                }
            }
        }
    }

    pub async fn run_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        report.expired = self
            .aggregator
            .cleanup_old_signals(self.aggregator_config.retention());
        self.resolver.prune_stale(self.aggregator_config.window());

        let hot = self
            .aggregator
            .get_hot_tokens(self.aggregator_config.min_signals, self.aggregator_config.window());
        report.hot = hot.len();

        if let Some(feed) = &self.feed {
            let expired: Vec<String> = feed
                .watched_tokens()
                .into_iter()
                .filter(|t| !self.aggregator.is_tracked(t))
                .collect();
            let dropped = feed.unwatch_tokens(&expired);
            if dropped > 0 {
                debug!("Stopped watching {} tokens with no live signals", dropped);
            }

            let fresh = feed.watch_tokens(hot.keys());
            if fresh > 0 {
                debug!("Watching {} new hot tokens on the live feed", fresh);
            }
        }

        for (token, bundle) in hot {
            if self.processed.contains(&token) {
                report.skipped += 1;
                continue;
            }

            match self.evaluate(&token, &bundle).await {
                Ok(Evaluation::Decided(decision)) => {
                    debug!(token = %token, decision = decision.as_str(), "Token decided");
                    self.processed.insert(token.clone(), decision);
                    self.aggregator.forget(&token);
                    if let Some(feed) = &self.feed {
                        feed.unwatch_tokens([&token]);
                    }
                    match decision {
                        TokenDecision::Alerted => report.alerted += 1,
                        TokenDecision::RejectedLateCurve => report.rejected_late += 1,
                        TokenDecision::RejectedLowScore => report.rejected_low += 1,
                    }
                }
                Ok(Evaluation::Deferred) => report.deferred += 1,
                Ok(Evaluation::AlreadySeen) => report.skipped += 1,
                Err(e) => {
                    error!(token = %token, error = %e, signals = bundle.signal_count, "Evaluation failed");
                    report.errors += 1;
                }
            }
        }

        report
    }

    /// Takes a hot token through the decision states. Errors leave no state
    /// behind so the token is evaluated again next pass.
    pub async fn evaluate(&self, token: &str, bundle: &HotToken) -> Result<Evaluation> {
        if let Some(oracle) = &self.seen {
            if oracle.has_seen(token).await? {
                debug!(token, "Already posted, skipping");
                return Ok(Evaluation::AlreadySeen);
            }
        }

        let curve = match self.resolver.get_curve_progress(token).await {
            Some(curve) => curve,
            None => {
                debug!(token, "No curve data, retrying next cycle");
                return Ok(Evaluation::Deferred);
            }
        };

        if curve.completion_percent > self.config.max_curve_percent {
            info!(
                token,
                pct = curve.completion_percent,
                source = curve.provenance.as_str(),
                "⏭️  Curve too advanced, rejecting"
            );
            return Ok(Evaluation::Decided(TokenDecision::RejectedLateCurve));
        }

        let result = self.scorer.score(token, bundle, &curve);

        if result.score < self.config.min_conviction {
            info!(
                token,
                score = result.score,
                min = self.config.min_conviction,
                pct = curve.completion_percent,
                "❌ Conviction below threshold"
            );
            return Ok(Evaluation::Decided(TokenDecision::RejectedLowScore));
        }

        info!(
            token,
            score = result.score,
            pct = curve.completion_percent,
            smart_money = bundle.smart_money.len(),
            kols = bundle.kols.len(),
            social = bundle.social_count(),
            "🚨 Ultra early signal"
        );

        let alert = EarlyAlert {
            token: token.to_string(),
            signal_type: ULTRA_EARLY_SIGNAL.to_string(),
            early_score: result.score,
            curve_completion: curve.completion_percent,
            signal_data: bundle.clone(),
            curve,
            reasons: result.reasons,
            detected_at: Utc::now(),
        };

        if let Err(e) = self.sink.deliver(alert).await {
            warn!(token, error = %e, "Alert delivery failed");
            return Err(e);
        }

        Ok(Evaluation::Decided(TokenDecision::Alerted))
    }
}
