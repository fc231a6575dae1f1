//! Best-effort, non-blocking event delivery to the chat layer.

use crate::domain::Event;

/// Sink for orchestrator transition events.
///
/// `emit` must never block or fail loudly: a disconnected subscriber is a
/// logged warning, not a propagated error, per SPEC_FULL.md §4.4.
pub trait EventBus: Send + Sync {
    fn emit(&self, event: Event);
}
