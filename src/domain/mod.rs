//! Pure domain types shared by every engine component.
//!
//! Nothing in this module talks to the network, a clock, or a database; it
//! is the vocabulary the rest of the crate is built from.

mod event;
mod task;

pub use event::{Event, EventKind};
pub use task::{
    CompletedOrder, Item, SupplyType, Task, TaskState, TimeWindow, Timeslot,
};
