//! Row types for the `tasks` and `completed_orders` tables.
//!
//! Nested structures (items, the time window, the selected timeslot) are
//! stored as JSON blobs in a single column, mirroring the reference's
//! `serde_json::to_string` columns for nested domain data.

use diesel::prelude::*;

use super::schema::{completed_orders, tasks};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskRow {
    pub task_id: String,
    pub user_id: String,
    pub cluster_id: String,
    pub drop_off_warehouse_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub warehouse_auto_select: bool,
    pub supply_type: String,
    pub items_json: String,
    pub ready_in_days: i64,
    pub search_deadline: String,
    pub time_window_json: String,
    pub draft_operation_id: Option<String>,
    pub draft_id: Option<String>,
    pub draft_created_at: Option<String>,
    pub draft_expires_at: Option<String>,
    pub selected_timeslot_json: Option<String>,
    pub order_flag: bool,
    pub state: String,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = completed_orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CompletedOrderRow {
    pub task_id: String,
    pub user_id: String,
    pub order_id: Option<i64>,
    pub operation_id: String,
    pub draft_id: String,
    pub warehouse_id: String,
    pub drop_off_warehouse_id: Option<String>,
    pub timeslot_json: String,
    pub items_json: String,
    pub completed_at: String,
}
