//! In-memory `TaskStore` for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::domain::{CompletedOrder, Task};
use crate::error::Result;

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<(String, String), Task>>,
    completed: Mutex<Vec<CompletedOrder>>,
}

impl InMemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn completed_orders(&self) -> Vec<CompletedOrder> {
        self.completed.lock().clone()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

#[async_trait]
impl crate::ports::TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> Result<()> {
        self.tasks
            .lock()
            .insert((task.user_id.clone(), task.task_id.clone()), task.clone());
        Ok(())
    }

    async fn find(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .get(&(user_id.to_string(), task_id.to_string()))
            .cloned())
    }

    async fn delete(&self, user_id: &str, task_id: &str) -> Result<()> {
        self.tasks
            .lock()
            .remove(&(user_id.to_string(), task_id.to_string()));
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn complete(&self, order: &CompletedOrder) -> Result<()> {
        self.completed.lock().push(order.clone());
        Ok(())
    }
}
