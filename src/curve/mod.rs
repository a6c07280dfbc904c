/// Bonding curve progress resolution

pub mod helius_client;
pub mod live_feed;
pub mod pumpfun_client;
pub mod resolver;
pub mod source;

pub use helius_client::HeliusFallbackClient;
pub use live_feed::{parse_feed_message, FeedHandle, PumpPortalFeed};
pub use pumpfun_client::{PumpFunClient, PumpFunCoin};
pub use resolver::{CurveProgressResolver, LiveCurveUpdate};
pub use source::{CurveQuote, CurveQuoteSource};
