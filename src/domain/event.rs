//! Typed events emitted by the orchestrator onto the [`EventBus`](crate::ports::EventBus) port.

use serde::{Deserialize, Serialize};

/// The event types a chat layer (or any other subscriber) can react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    DraftCreated,
    DraftValid,
    DraftExpired,
    DraftInvalid,
    DraftError,
    TimeslotMissing,
    WarehousePending,
    SupplyCreated { order_id: Option<u64> },
    WindowExpired,
    Cancelled,
    Error,
    NoCredentials,
}

/// A single transition notification. Delivery through the event bus is
/// best-effort and must never block the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub task_id: String,
    pub kind: EventKind,
    pub message: Option<String>,
    pub operation_id: Option<String>,
}

impl Event {
    #[must_use]
    pub fn new(task_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            message: None,
            operation_id: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }
}
