//! The persistent task store contract.
//!
//! The engine snapshots a task after every state transition; it never reads
//! back its own writes mid-run (each runner owns its in-memory `Task`
//! exclusively), but a restart resumes by calling `find`.

use async_trait::async_trait;

use crate::domain::{CompletedOrder, Task};
use crate::error::Result;

/// Durable storage for pending and completed tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Overwrite (or insert) the snapshot for `task.task_id`.
    async fn save(&self, task: &Task) -> Result<()>;

    /// Look up a pending task by owner and id.
    async fn find(&self, user_id: &str, task_id: &str) -> Result<Option<Task>>;

    /// Remove a pending task record. Idempotent: deleting an absent task is
    /// not an error.
    async fn delete(&self, user_id: &str, task_id: &str) -> Result<()>;

    /// List every pending task for a user, e.g. for restart-resume.
    async fn list(&self, user_id: &str) -> Result<Vec<Task>>;

    /// Persist a completed order. Does not touch the pending task record;
    /// callers delete the pending record separately.
    async fn complete(&self, order: &CompletedOrder) -> Result<()>;
}
