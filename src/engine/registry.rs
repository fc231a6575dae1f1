//! Task registry: maps a running task to its cancellation handle and
//! guarantees at most one active runner per task id (SPEC_FULL.md §4 /
//! §5 restart-safety discussion).

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Tracks which tasks currently have a runner in flight. The registry does
/// not own the runner's future; it only holds the handle needed to cancel
/// it and a guard against launching the same task twice.
#[derive(Default)]
pub struct TaskRegistry {
    handles: DashMap<String, CancellationToken>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task_id` as running and returns its cancellation token.
    /// If the task already has an active runner, that runner's token is
    /// cancelled first so at most one runner per task id is ever live.
    pub fn register(&self, task_id: &str, parent: &CancellationToken) -> CancellationToken {
        if let Some(existing) = self.handles.get(task_id) {
            existing.cancel();
        }
        let token = parent.child_token();
        self.handles.insert(task_id.to_string(), token.clone());
        token
    }

    /// Requests cancellation of a running task. No-op if the task isn't
    /// currently registered.
    pub fn cancel(&self, task_id: &str) -> bool {
        if let Some(token) = self.handles.get(task_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Removes a task from the registry once its runner has exited, whether
    /// by completion, cancellation, or failure.
    pub fn clear(&self, task_id: &str) {
        self.handles.remove(task_id);
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.handles.contains_key(task_id)
    }

    pub fn running_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_again_cancels_the_previous_handle() {
        let registry = TaskRegistry::new();
        let parent = CancellationToken::new();
        let first = registry.register("task-1", &parent);
        assert!(!first.is_cancelled());
        let second = registry.register("task-1", &parent);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_trips_the_returned_token() {
        let registry = TaskRegistry::new();
        let parent = CancellationToken::new();
        let token = registry.register("task-1", &parent);
        assert!(!token.is_cancelled());
        assert!(registry.cancel("task-1"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_unknown_task_is_noop() {
        let registry = TaskRegistry::new();
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn clear_drops_the_handle_without_cancelling_it() {
        let registry = TaskRegistry::new();
        let parent = CancellationToken::new();
        let token = registry.register("task-1", &parent);
        registry.clear("task-1");
        assert!(!registry.is_running("task-1"));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn parent_cancellation_propagates_to_children() {
        let registry = TaskRegistry::new();
        let parent = CancellationToken::new();
        let token = registry.register("task-1", &parent);
        parent.cancel();
        assert!(token.is_cancelled());
    }
}
