/// Cross-source signal aggregation

pub mod signal_aggregator;

pub use signal_aggregator::{HotToken, SignalAggregator, TokenSignalBundle};
