// Core modules
pub mod core;
pub mod config;

// Signal pipeline
pub mod aggregator;
pub mod curve;
pub mod scoring;
pub mod coordinator;

pub mod transport;

// Re-export commonly used types for convenience
pub use crate::core::*;
pub use aggregator::{HotToken, SignalAggregator};
pub use coordinator::{EarlyAlert, EarlySignalCoordinator, TokenDecision};
pub use curve::CurveProgressResolver;
pub use scoring::EarlyConvictionScorer;
