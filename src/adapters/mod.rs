//! Concrete implementations of the [`crate::ports`] trait boundaries.

pub mod channel_event_bus;
pub mod http_client;
pub mod sqlite_store;

pub use channel_event_bus::{ChannelEventBus, TracingEventBus};
pub use http_client::OzonHttpClient;
pub use sqlite_store::SqliteTaskStore;
