/// Conviction scoring for hot tokens

pub mod early_conviction;

pub use early_conviction::EarlyConvictionScorer;
