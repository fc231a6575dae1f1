//! The orchestration engine: rate limiting, draft/timeslot sub-state
//! machines, SKU resolution, the task registry, and the top-level
//! Supply Orchestrator that composes them.

mod draft;
mod orchestrator;
mod rate_limit;
mod registry;
mod sku;
mod timeslot;

pub use draft::{DraftController, DraftReady};
pub use orchestrator::SupplyOrchestrator;
pub use rate_limit::RateLimiter;
pub use registry::TaskRegistry;
pub use timeslot::{TimeslotOutcome, TimeslotPoller};
