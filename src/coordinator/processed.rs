/// Terminal decision memory for the coordinator

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecision {
    RejectedLateCurve,
    RejectedLowScore,
    Alerted,
}

impl TokenDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenDecision::RejectedLateCurve => "REJECTED_LATE_CURVE",
            TokenDecision::RejectedLowScore => "REJECTED_LOW_SCORE",
            TokenDecision::Alerted => "ALERTED",
        }
    }
}

/// Insertion-ordered set of decided tokens. Once `capacity` is exceeded the
/// oldest decision is forgotten.
#[derive(Debug)]
pub struct ProcessedSet {
    decisions: HashMap<String, TokenDecision>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ProcessedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            decisions: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns false when the token already had a decision; the first one stands
    pub fn insert(&mut self, token: impl Into<String>, decision: TokenDecision) -> bool {
        let token = token.into();
        if self.decisions.contains_key(&token) {
            return false;
        }

        self.decisions.insert(token.clone(), decision);
        self.order.push_back(token);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.decisions.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, token: &str) -> bool {
        self.decisions.contains_key(token)
    }

    pub fn get(&self, token: &str) -> Option<TokenDecision> {
        self.decisions.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_decision_is_final() {
        let mut set = ProcessedSet::new(10);
        assert!(set.insert("a", TokenDecision::RejectedLowScore));
        assert!(!set.insert("a", TokenDecision::Alerted));
        assert_eq!(set.get("a"), Some(TokenDecision::RejectedLowScore));
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(TokenDecision::Alerted.as_str(), "ALERTED");
        assert_eq!(TokenDecision::RejectedLateCurve.as_str(), "REJECTED_LATE_CURVE");
        assert_eq!(TokenDecision::RejectedLowScore.as_str(), "REJECTED_LOW_SCORE");
    }

    #[test]
    fn test_evicts_oldest_over_capacity() {
        let mut set = ProcessedSet::new(2);
        set.insert("a", TokenDecision::Alerted);
        set.insert("b", TokenDecision::Alerted);
        set.insert("c", TokenDecision::RejectedLateCurve);

        assert_eq!(set.len(), 2);
        assert!(!set.contains("a"));
        assert!(set.contains("b"));
        assert!(set.contains("c"));
    }
}
