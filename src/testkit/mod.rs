//! Deterministic test doubles for every port, mirroring the reference
//! harness's scripted stream fixtures.

mod credentials;
mod event_bus;
mod marketplace;
mod store;

pub use credentials::FixedCredentialStore;
pub use event_bus::RecordingEventBus;
pub use marketplace::{credential_revoked_error, direct_draft_request, ScriptedMarketplaceClient};
pub use store::InMemoryTaskStore;
