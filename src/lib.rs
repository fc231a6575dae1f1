//! Ozon slot engine - supply order scheduling against the Ozon Seller API.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/     # Pure types: Task, Event, lifecycle state
//! ├── ports/      # Trait boundaries to external collaborators
//! ├── adapters/   # Concrete implementations of the ports
//! ├── db/         # Diesel schema/models backing the SQLite adapter
//! ├── engine/     # Rate limiter, registry, draft controller, poller, orchestrator
//! └── cli/        # Operator command-line front end
//! ```
//!
//! The chat transport, spreadsheet ingestion, credential storage backend, and
//! production task-store schema all live outside this crate; this crate only
//! depends on their trait contracts (see [`ports`]).

pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod time;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use error::{Error, Result};
