//! External collaborator seams.
//!
//! Each boundary the engine talks across is a trait so deployments can
//! swap transports without touching the pipeline: market data in, alert
//! definitions in, triggers and snapshots out.

pub mod broadcast;
pub mod config_store;
pub mod delivery;
pub mod market_data;

pub use broadcast::{BroadcastTransport, LogBroadcast};
pub use config_store::{ConfigurationStore, InMemoryConfigStore};
pub use delivery::{DeliveryChannel, LogDelivery};
pub use market_data::{InMemoryMarketData, MarketDataProvider};
