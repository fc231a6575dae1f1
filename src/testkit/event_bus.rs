//! Recording `EventBus` test double.

use parking_lot::Mutex;

use crate::domain::Event;
use crate::ports::EventBus;

#[derive(Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
