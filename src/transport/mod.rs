/// Channels between watchers, the aggregator and alert consumers

pub mod alert_bus;
pub mod signal_bus;

pub use alert_bus::AlertBus;
pub use signal_bus::{decode_envelope, IngestStats, SignalBus, SignalSender};
