//! Event bus adapters, following the reference's `TelegramNotifier` shape:
//! a synchronous, non-blocking `emit` backed by an unbounded channel, with a
//! dropped receiver degrading to a logged warning rather than an error.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::domain::Event;
use crate::ports::EventBus;

/// Hands events to an `UnboundedReceiver<Event>` owned by whatever is
/// forwarding them to the chat layer. `emit` never blocks: sending into an
/// unbounded channel is synchronous, and a closed receiver is logged, not
/// propagated.
pub struct ChannelEventBus {
    sender: UnboundedSender<Event>,
}

impl ChannelEventBus {
    #[must_use]
    pub fn new(sender: UnboundedSender<Event>) -> Self {
        Self { sender }
    }
}

impl EventBus for ChannelEventBus {
    fn emit(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("event bus channel closed, dropping event");
        }
    }
}

/// Logs every event at `info` level instead of forwarding it anywhere.
/// Useful for the CLI and for any deployment without a chat layer attached.
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, event: Event) {
        info!(task_id = %event.task_id, kind = ?event.kind, message = ?event.message, "task event");
    }
}
