//! The `Task` aggregate and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether the supply goes straight to the destination warehouse or through
/// an intermediate drop-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupplyType {
    Direct,
    Crossdock,
}

/// A line item in the manifest. `sku` is resolved (never left empty) before
/// a draft is created; see `engine::sku`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub article: String,
    pub sku: Option<u64>,
    pub quantity: u32,
}

impl Item {
    /// # Errors
    /// Returns `Error::Input` if `quantity` is not positive.
    pub fn new(article: impl Into<String>, sku: Option<u64>, quantity: u32) -> Result<Self> {
        if quantity == 0 {
            return Err(Error::Input("item quantity must be > 0".to_string()));
        }
        Ok(Self {
            article: article.into(),
            sku,
            quantity,
        })
    }
}

/// The seller's acceptable hour-of-day window for a timeslot's start, in the
/// destination warehouse's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeWindow {
    FirstAvailable,
    HourRange { from_hour: u32, to_hour: Option<u32> },
}

impl TimeWindow {
    /// Whether a slot whose local start hour is `hour` satisfies this window.
    #[must_use]
    pub fn accepts_hour(&self, hour: u32) -> bool {
        match self {
            TimeWindow::FirstAvailable => true,
            TimeWindow::HourRange { from_hour, to_hour } => match to_hour {
                Some(to) => (*from_hour..=*to).contains(&hour),
                None => hour >= *from_hour,
            },
        }
    }
}

/// A concrete delivery interval offered by the marketplace, in UTC (parsed
/// from the warehouse-local timestamps the marketplace returns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Lifecycle state of a `Task`. Persisted verbatim after every transition so
/// a process restart can classify a task without re-deriving it from the
/// optional draft/timeslot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created,
    DraftPending,
    DraftReady,
    Polling,
    SupplyCreating,
    Completed,
    Expired,
    Cancelled,
    Failed,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Expired | TaskState::Cancelled | TaskState::Failed
        )
    }
}

/// The unit of work driven by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub user_id: String,
    pub cluster_id: String,
    pub drop_off_warehouse_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub warehouse_auto_select: bool,
    pub supply_type: SupplyType,
    pub items: Vec<Item>,
    pub ready_in_days: i64,
    pub search_deadline: DateTime<Utc>,
    pub time_window: TimeWindow,

    pub draft_operation_id: Option<String>,
    pub draft_id: Option<String>,
    pub draft_created_at: Option<DateTime<Utc>>,
    pub draft_expires_at: Option<DateTime<Utc>>,

    pub selected_timeslot: Option<Timeslot>,
    pub order_flag: bool,
    pub state: TaskState,
}

impl Task {
    /// Validate the invariants from SPEC_FULL.md §3 that don't already hold
    /// by construction.
    ///
    /// # Errors
    /// Returns `Error::Input` describing the first violated invariant.
    pub fn validate(&self, now: DateTime<Utc>, ready_days_max: i64) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::Input("task has no items".to_string()));
        }
        if self.supply_type == SupplyType::Crossdock && self.drop_off_warehouse_id.is_none() {
            return Err(Error::Input(
                "crossdock supply requires a drop-off warehouse".to_string(),
            ));
        }
        let days_until_deadline = (self.search_deadline - now).num_days();
        if self.ready_in_days > days_until_deadline {
            return Err(Error::Input(format!(
                "ready_in_days ({}) exceeds days until search_deadline ({days_until_deadline})",
                self.ready_in_days
            )));
        }
        if days_until_deadline > ready_days_max {
            return Err(Error::Input(format!(
                "search_deadline is more than {ready_days_max} days out"
            )));
        }
        Ok(())
    }

    /// All items carry a resolved, positive SKU.
    #[must_use]
    pub fn skus_resolved(&self) -> bool {
        self.items.iter().all(|item| item.sku.is_some_and(|sku| sku > 0))
    }

    /// Reset the draft-specific fields, e.g. before recreating a draft.
    pub fn clear_draft(&mut self) {
        self.draft_operation_id = None;
        self.draft_id = None;
        self.draft_created_at = None;
        self.draft_expires_at = None;
    }

    #[must_use]
    pub fn draft_expired(&self, now: DateTime<Utc>) -> bool {
        match self.draft_expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }
}

/// A completed supply order, persisted separately from the pending task
/// record and never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub task_id: String,
    pub user_id: String,
    pub order_id: Option<u64>,
    pub operation_id: String,
    pub draft_id: String,
    pub warehouse_id: String,
    pub drop_off_warehouse_id: Option<String>,
    pub timeslot: Timeslot,
    pub items: Vec<Item>,
    pub completed_at: DateTime<Utc>,
}
