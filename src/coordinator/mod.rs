/// Hot token evaluation, decision memory and alert emission

pub mod alert;
pub mod early_signal;
pub mod processed;
pub mod seen;

pub use alert::{AlertSink, EarlyAlert};
pub use early_signal::{CycleReport, EarlySignalCoordinator, Evaluation};
pub use processed::{ProcessedSet, TokenDecision};
pub use seen::{MemorySeenOracle, SeenOracle};
