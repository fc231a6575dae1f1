//! Trait boundaries to every external collaborator.
//!
//! Everything the `engine` module depends on outside of pure domain types
//! goes through one of these ports; production deployments plug in their own
//! implementations, this crate ships the [`crate::adapters`] needed to run
//! stand-alone.

mod credentials;
mod event_bus;
mod marketplace;
mod store;

pub use credentials::CredentialStore;
pub use event_bus::EventBus;
pub use marketplace::{
    CancelStatus, ClusterInfo, ClusterWarehouse, Credentials, DraftCreateRequest, DraftInfo,
    DraftItem, DraftStatus, DraftWarehouse, DropOffWarehouse, MarketplaceClient, SkuResolution,
    SupplyCancelResult, SupplyCreateRequest, SupplyState, SupplyStatus, TimeslotsRequest,
    TimeslotsResponse, WarehouseState,
};
pub use store::TaskStore;
