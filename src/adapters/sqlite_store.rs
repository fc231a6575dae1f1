//! SQLite-backed `TaskStore`, following the reference's
//! `core::store::sqlite` + `core::db` split: normalised columns for the
//! fields queries filter on, a JSON blob for nested structures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::model::{CompletedOrderRow, TaskRow};
use crate::db::schema::{completed_orders, tasks};
use crate::db::DbPool;
use crate::domain::{CompletedOrder, Item, SupplyType, Task, TaskState, TimeWindow, Timeslot};
use crate::error::{Error, Result};
use crate::ports::TaskStore;

pub struct SqliteTaskStore {
    pool: DbPool,
}

impl SqliteTaskStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn task_to_row(task: &Task) -> Result<TaskRow> {
        Ok(TaskRow {
            task_id: task.task_id.clone(),
            user_id: task.user_id.clone(),
            cluster_id: task.cluster_id.clone(),
            drop_off_warehouse_id: task.drop_off_warehouse_id.clone(),
            warehouse_id: task.warehouse_id.clone(),
            warehouse_auto_select: task.warehouse_auto_select,
            supply_type: serde_json::to_string(&task.supply_type)?,
            items_json: serde_json::to_string(&task.items)?,
            ready_in_days: task.ready_in_days,
            search_deadline: task.search_deadline.to_rfc3339(),
            time_window_json: serde_json::to_string(&task.time_window)?,
            draft_operation_id: task.draft_operation_id.clone(),
            draft_id: task.draft_id.clone(),
            draft_created_at: task.draft_created_at.map(|dt| dt.to_rfc3339()),
            draft_expires_at: task.draft_expires_at.map(|dt| dt.to_rfc3339()),
            selected_timeslot_json: task
                .selected_timeslot
                .map(|slot| serde_json::to_string(&slot))
                .transpose()?,
            order_flag: task.order_flag,
            state: serde_json::to_string(&task.state)?,
        })
    }

    fn row_to_task(row: TaskRow) -> Result<Task> {
        Ok(Task {
            task_id: row.task_id,
            user_id: row.user_id,
            cluster_id: row.cluster_id,
            drop_off_warehouse_id: row.drop_off_warehouse_id,
            warehouse_id: row.warehouse_id,
            warehouse_auto_select: row.warehouse_auto_select,
            supply_type: serde_json::from_str::<SupplyType>(&row.supply_type)?,
            items: serde_json::from_str::<Vec<Item>>(&row.items_json)?,
            ready_in_days: row.ready_in_days,
            search_deadline: parse_rfc3339(&row.search_deadline)?,
            time_window: serde_json::from_str::<TimeWindow>(&row.time_window_json)?,
            draft_operation_id: row.draft_operation_id,
            draft_id: row.draft_id,
            draft_created_at: row.draft_created_at.as_deref().map(parse_rfc3339).transpose()?,
            draft_expires_at: row.draft_expires_at.as_deref().map(parse_rfc3339).transpose()?,
            selected_timeslot: row
                .selected_timeslot_json
                .as_deref()
                .map(serde_json::from_str::<Timeslot>)
                .transpose()?,
            order_flag: row.order_flag,
            state: serde_json::from_str::<TaskState>(&row.state)?,
        })
    }

    fn order_to_row(order: &CompletedOrder) -> Result<CompletedOrderRow> {
        Ok(CompletedOrderRow {
            task_id: order.task_id.clone(),
            user_id: order.user_id.clone(),
            order_id: order.order_id.map(|id| id as i64),
            operation_id: order.operation_id.clone(),
            draft_id: order.draft_id.clone(),
            warehouse_id: order.warehouse_id.clone(),
            drop_off_warehouse_id: order.drop_off_warehouse_id.clone(),
            timeslot_json: serde_json::to_string(&order.timeslot)?,
            items_json: serde_json::to_string(&order.items)?,
            completed_at: order.completed_at.to_rfc3339(),
        })
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(e.to_string()))
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn save(&self, task: &Task) -> Result<()> {
        let row = Self::task_to_row(task)?;
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::replace_into(tasks::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn find(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let row: Option<TaskRow> = tasks::table
            .find(task_id)
            .filter(tasks::user_id.eq(user_id))
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(Self::row_to_task).transpose()
    }

    async fn delete(&self, user_id: &str, task_id: &str) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::delete(tasks::table.find(task_id).filter(tasks::user_id.eq(user_id)))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let rows: Vec<TaskRow> = tasks::table
            .filter(tasks::user_id.eq(user_id))
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(Self::row_to_task).collect()
    }

    async fn complete(&self, order: &CompletedOrder) -> Result<()> {
        let row = Self::order_to_row(order)?;
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::replace_into(completed_orders::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
