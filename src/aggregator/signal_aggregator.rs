/// Time-windowed correlation of signals from independent sources

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::core::{
    Result, SentinelError, SignalEvent, SignalKind, SignalPayload, SmartMoneyBuy, SocialCall,
};

/// Per-token event store, events kept ordered by observation time
#[derive(Debug, Clone)]
pub struct TokenSignalBundle {
    smart_money: VecDeque<SignalEvent>,
    telegram: VecDeque<SignalEvent>,
    twitter: VecDeque<SignalEvent>,
    pub first_seen: Instant,
    pub last_updated: Instant,
}

impl TokenSignalBundle {
    fn new(at: Instant) -> Self {
        Self {
            smart_money: VecDeque::new(),
            telegram: VecDeque::new(),
            twitter: VecDeque::new(),
            first_seen: at,
            last_updated: at,
        }
    }

    fn lane_mut(&mut self, kind: SignalKind) -> &mut VecDeque<SignalEvent> {
        match kind {
            SignalKind::SmartMoney => &mut self.smart_money,
            SignalKind::TelegramCall => &mut self.telegram,
            SignalKind::TwitterCall => &mut self.twitter,
        }
    }

    fn push(&mut self, event: SignalEvent) {
        let observed_at = event.observed_at;
        let lane = self.lane_mut(event.kind());

        // Late deliveries are placed by timestamp rather than appended
        if lane.back().map_or(true, |last| last.observed_at <= observed_at) {
            lane.push_back(event);
        } else {
            let idx = lane.partition_point(|e| e.observed_at <= observed_at);
            lane.insert(idx, event);
        }

        self.first_seen = self.first_seen.min(observed_at);
        self.last_updated = self.last_updated.max(observed_at);
    }

    /// Drops events older than `max_age` relative to `now`
    fn prune(&mut self, now: Instant, max_age: Duration) {
        for lane in [&mut self.smart_money, &mut self.telegram, &mut self.twitter] {
            while lane
                .front()
                .map_or(false, |e| now.saturating_duration_since(e.observed_at) > max_age)
            {
                lane.pop_front();
            }
        }
    }

    /// Total surviving events across all kinds, duplicates included
    pub fn signal_count(&self) -> usize {
        self.smart_money.len() + self.telegram.len() + self.twitter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal_count() == 0
    }

    pub fn events(&self, kind: SignalKind) -> impl Iterator<Item = &SignalEvent> {
        match kind {
            SignalKind::SmartMoney => self.smart_money.iter(),
            SignalKind::TelegramCall => self.telegram.iter(),
            SignalKind::TwitterCall => self.twitter.iter(),
        }
    }

    fn summarize(&self, token: &str) -> HotToken {
        let mut summary = HotToken {
            token: token.to_string(),
            smart_money: Vec::new(),
            kols: Vec::new(),
            telegram: Vec::new(),
            twitter: Vec::new(),
            signal_count: self.signal_count(),
            first_seen: self.first_seen,
            last_updated: self.last_updated,
        };

        for event in self.smart_money.iter().chain(&self.telegram).chain(&self.twitter) {
            match &event.payload {
                SignalPayload::SmartMoney(buy) if buy.tier.is_smart_money() => {
                    summary.smart_money.push(buy.clone())
                }
                SignalPayload::SmartMoney(buy) => summary.kols.push(buy.clone()),
                SignalPayload::TelegramCall(call) => summary.telegram.push(call.clone()),
                SignalPayload::TwitterCall(call) => summary.twitter.push(call.clone()),
            }
        }

        summary
    }
}

/// Snapshot of a hot token's windowed signals, grouped for scoring.
///
/// Smart-money events from elite/high wallets land in `smart_money`, other
/// tracked wallets land in `kols`. Each event belongs to exactly one group.
#[derive(Debug, Clone, PartialEq)]
pub struct HotToken {
    pub token: String,
    pub smart_money: Vec<SmartMoneyBuy>,
    pub kols: Vec<SmartMoneyBuy>,
    pub telegram: Vec<SocialCall>,
    pub twitter: Vec<SocialCall>,
    pub signal_count: usize,
    pub first_seen: Instant,
    pub last_updated: Instant,
}

impl HotToken {
    pub fn social_count(&self) -> usize {
        self.telegram.len() + self.twitter.len()
    }
}

/// Aggregates signal events per token and answers hot-token queries
#[derive(Debug, Default)]
pub struct SignalAggregator {
    tokens: DashMap<String, TokenSignalBundle>,
}

impl SignalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_smart_money_signal(&self, token: &str, buy: SmartMoneyBuy) -> Result<()> {
        self.record(SignalEvent::new(token, SignalPayload::SmartMoney(buy)))
    }

    pub fn add_telegram_signal(&self, token: &str, call: SocialCall) -> Result<()> {
        self.record(SignalEvent::new(token, SignalPayload::TelegramCall(call)))
    }

    pub fn add_twitter_signal(&self, token: &str, call: SocialCall) -> Result<()> {
        self.record(SignalEvent::new(token, SignalPayload::TwitterCall(call)))
    }

    /// Stores one event. Identical events are all retained.
    pub fn record(&self, event: SignalEvent) -> Result<()> {
        if event.token.trim().is_empty() {
            return Err(SentinelError::EmptyToken);
        }
        event.payload.validate()?;

        debug!(token = %event.token, kind = event.kind().as_str(), "Signal recorded");

        let observed_at = event.observed_at;
        self.tokens
            .entry(event.token.clone())
            .or_insert_with(|| TokenSignalBundle::new(observed_at))
            .push(event);
        Ok(())
    }

    /// Returns tokens with at least `min_signals` events inside the trailing
    /// `max_age` window. Expired events are pruned as a side effect; the result
    /// carries no ordering guarantee.
    #[instrument(skip(self))]
    pub fn get_hot_tokens(&self, min_signals: usize, max_age: Duration) -> HashMap<String, HotToken> {
        let now = Instant::now();

        self.tokens.retain(|_, bundle| {
            bundle.prune(now, max_age);
            !bundle.is_empty()
        });

        let hot: HashMap<String, HotToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.value().signal_count() >= min_signals)
            .map(|entry| (entry.key().clone(), entry.value().summarize(entry.key())))
            .collect();

        debug!(tracked = self.tokens.len(), hot = hot.len(), "Hot token scan complete");
        hot
    }

    /// Removes tokens whose newest event is older than `max_age`
    pub fn cleanup_old_signals(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.tokens.len();
        self.tokens
            .retain(|_, bundle| now.saturating_duration_since(bundle.last_updated) <= max_age);
        let removed = before.saturating_sub(self.tokens.len());
        if removed > 0 {
            debug!("Cleaned up {} old signal bundles", removed);
        }
        removed
    }

    /// Drops all state for a token that reached a final decision
    pub fn forget(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn bundle(&self, token: &str) -> Option<TokenSignalBundle> {
        self.tokens.get(token).map(|b| b.value().clone())
    }

    pub fn is_tracked(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn tracked_tokens(&self) -> usize {
        self.tokens.len()
    }
}
