//! Draft Controller: drives the `Idle -> Creating -> Ready` sub-state
//! machine described in SPEC_FULL.md §4.2.

use std::collections::HashSet;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DraftConfig;
use crate::domain::{Event, EventKind, Task};
use crate::engine::rate_limit::RateLimiter;
use crate::error::{Error, Result};
use crate::ports::{
    Credentials, DraftCreateRequest, DraftInfo, DraftItem, DraftStatus, DraftWarehouse, EventBus,
    MarketplaceClient, WarehouseState,
};

/// A fully resolved draft: ready for the Timeslot Poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReady {
    pub draft_id: String,
    pub warehouse_id: String,
}

enum PollOutcome {
    Ready(DraftReady),
    Retry,
}

pub struct DraftController<'a> {
    pub client: &'a dyn MarketplaceClient,
    pub rate_limiter: &'a RateLimiter,
    pub events: &'a dyn EventBus,
    pub config: &'a DraftConfig,
}

impl<'a> DraftController<'a> {
    /// Drives `task` to a ready draft, recreating as many times as needed
    /// (up to `recreate_max_attempts`). Mutates `task`'s draft fields as it
    /// goes; the caller is responsible for persisting the snapshot.
    pub async fn ensure_ready(
        &self,
        task: &mut Task,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<DraftReady> {
        let mut recreate_attempts: u32 = 0;
        let mut last_warehouse_pending: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if task.draft_operation_id.is_none() {
                self.create(task, credentials, cancel).await?;
            }

            match self
                .poll(task, credentials, cancel, &mut last_warehouse_pending)
                .await?
            {
                PollOutcome::Ready(ready) => return Ok(ready),
                PollOutcome::Retry => {
                    task.clear_draft();
                    recreate_attempts += 1;
                    if recreate_attempts > self.config.recreate_max_attempts {
                        self.events.emit(Event::new(&task.task_id, EventKind::DraftError));
                        return Err(Error::DraftRetriesExhausted(recreate_attempts));
                    }
                    tokio::select! {
                        () = sleep(Duration::from_millis(self.config.recreate_backoff_ms)) => {}
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                    }
                }
            }
        }
    }

    async fn create(
        &self,
        task: &mut Task,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.rate_limiter.acquire(&credentials.client_id, cancel).await?;

        let request = DraftCreateRequest {
            cluster_ids: vec![task.cluster_id.clone()],
            drop_off_point_warehouse_id: task.drop_off_warehouse_id.clone(),
            items: task
                .items
                .iter()
                .map(|item| DraftItem {
                    sku: item.sku.expect("skus resolved before draft creation"),
                    quantity: item.quantity,
                })
                .collect(),
            supply_type: task.supply_type,
        };

        let operation_id = self.client.create_draft(credentials, request).await?;
        let now = Utc::now();
        task.draft_operation_id = Some(operation_id.clone());
        task.draft_created_at = Some(now);
        task.draft_expires_at = Some(now + ChronoDuration::milliseconds(self.config.lifetime_ms));
        self.events.emit(
            Event::new(&task.task_id, EventKind::DraftCreated).with_operation_id(operation_id),
        );
        Ok(())
    }

    async fn poll(
        &self,
        task: &mut Task,
        credentials: &Credentials,
        cancel: &CancellationToken,
        last_warehouse_pending: &mut Option<String>,
    ) -> Result<PollOutcome> {
        let operation_id = task
            .draft_operation_id
            .clone()
            .expect("create() always sets draft_operation_id");

        for attempt in 0..self.config.poll_max_attempts {
            if task.draft_expired(Utc::now()) {
                self.events.emit(Event::new(&task.task_id, EventKind::DraftExpired));
                return Ok(PollOutcome::Retry);
            }

            self.rate_limiter.acquire(&credentials.client_id, cancel).await?;
            let info = self.client.draft_info(credentials, &operation_id).await?;

            match info.status {
                DraftStatus::Success => {
                    let draft_id = info
                        .draft_id
                        .clone()
                        .ok_or_else(|| Error::DraftInvalid("SUCCESS without draft_id".to_string()))?;
                    let warehouses = normalize_warehouses(info.warehouses);

                    match select_warehouse(task, &warehouses) {
                        Selection::Selected(warehouse_id) => {
                            task.draft_id = Some(draft_id.clone());
                            self.events.emit(Event::new(&task.task_id, EventKind::DraftValid));
                            return Ok(PollOutcome::Ready(DraftReady { draft_id, warehouse_id }));
                        }
                        Selection::Pending(warehouse_id) => {
                            if last_warehouse_pending.as_deref() != Some(warehouse_id.as_str()) {
                                self.events.emit(
                                    Event::new(&task.task_id, EventKind::WarehousePending)
                                        .with_message(format!("warehouse {warehouse_id} not yet available")),
                                );
                                *last_warehouse_pending = Some(warehouse_id);
                            }
                        }
                        Selection::NotFound => {
                            self.events.emit(Event::new(&task.task_id, EventKind::DraftError));
                            return Ok(PollOutcome::Retry);
                        }
                    }
                }
                DraftStatus::Failed => {
                    self.events.emit(Event::new(&task.task_id, EventKind::DraftInvalid));
                    return Ok(PollOutcome::Retry);
                }
                DraftStatus::Expired => {
                    self.events.emit(Event::new(&task.task_id, EventKind::DraftExpired));
                    return Ok(PollOutcome::Retry);
                }
                DraftStatus::Calculating => {
                    debug!(task_id = %task.task_id, attempt, "draft still calculating");
                }
            }

            tokio::select! {
                () = sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
                () = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }

        warn!(task_id = %task.task_id, "draft poll attempts exhausted without a terminal status");
        Ok(PollOutcome::Retry)
    }
}

enum Selection {
    Selected(String),
    Pending(String),
    NotFound,
}

fn select_warehouse(task: &Task, warehouses: &[DraftWarehouse]) -> Selection {
    if task.warehouse_auto_select {
        return match warehouses
            .iter()
            .find(|w| w.state == WarehouseState::FullAvailable)
        {
            Some(w) => Selection::Selected(w.warehouse_id.clone()),
            None => Selection::NotFound,
        };
    }

    let Some(pinned) = task.warehouse_id.as_deref() else {
        return Selection::NotFound;
    };
    match warehouses.iter().find(|w| w.warehouse_id == pinned) {
        Some(w) if w.state == WarehouseState::FullAvailable => {
            Selection::Selected(w.warehouse_id.clone())
        }
        Some(w) => Selection::Pending(w.warehouse_id.clone()),
        None => Selection::NotFound,
    }
}

/// Sort by `(total_rank ASC NULLS LAST, total_score DESC NULLS LAST, name ASC)`,
/// deduplicating by `warehouse_id` and keeping the best-ranked entry.
fn normalize_warehouses(mut warehouses: Vec<DraftWarehouse>) -> Vec<DraftWarehouse> {
    warehouses.sort_by(|a, b| {
        let rank_a = a.total_rank.unwrap_or(i32::MAX);
        let rank_b = b.total_rank.unwrap_or(i32::MAX);
        rank_a
            .cmp(&rank_b)
            .then_with(|| {
                let score_a = a.total_score.unwrap_or(f64::MIN);
                let score_b = b.total_score.unwrap_or(f64::MIN);
                score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut seen = HashSet::new();
    warehouses
        .into_iter()
        .filter(|w| seen.insert(w.warehouse_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, SupplyType, TaskState, TimeWindow};
    use crate::testkit::{RecordingEventBus, ScriptedMarketplaceClient};
    use crate::config::RateLimitConfig;
    use chrono::Duration as CD;

    fn base_task() -> Task {
        Task {
            task_id: "t1".to_string(),
            user_id: "u1".to_string(),
            cluster_id: "c1".to_string(),
            drop_off_warehouse_id: None,
            warehouse_id: None,
            warehouse_auto_select: true,
            supply_type: SupplyType::Direct,
            items: vec![Item::new("123", Some(123), 1).unwrap()],
            ready_in_days: 1,
            search_deadline: Utc::now() + CD::days(7),
            time_window: TimeWindow::FirstAvailable,
            draft_operation_id: None,
            draft_id: None,
            draft_created_at: None,
            draft_expires_at: None,
            selected_timeslot: None,
            order_flag: false,
            state: TaskState::Created,
        }
    }

    fn draft_config() -> DraftConfig {
        DraftConfig {
            poll_interval_ms: 0,
            poll_max_attempts: 10,
            recreate_max_attempts: 3,
            lifetime_ms: 1_800_000,
            recreate_backoff_ms: 0,
        }
    }

    fn success_info(draft_id: &str, warehouse_id: &str, state: WarehouseState) -> DraftInfo {
        DraftInfo {
            status: DraftStatus::Success,
            code: None,
            draft_id: Some(draft_id.to_string()),
            warehouses: vec![DraftWarehouse {
                warehouse_id: warehouse_id.to_string(),
                name: "wh".to_string(),
                state,
                total_rank: Some(1),
                total_score: Some(10.0),
            }],
            error_message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_resolves_draft_with_auto_select() {
        let client = ScriptedMarketplaceClient::new();
        client.push_create_draft(Ok("op-1".to_string()));
        client.push_draft_info(success_info("d-1", "wh-1", WarehouseState::FullAvailable));

        let rate_limiter = RateLimiter::new(RateLimitConfig {
            per_second_ms: 0,
            per_minute: 1000,
            per_hour: 1000,
            min_wait_ms: 0,
        });
        let events = RecordingEventBus::new();
        let config = draft_config();
        let controller = DraftController {
            client: &client,
            rate_limiter: &rate_limiter,
            events: &events,
            config: &config,
        };

        let mut task = base_task();
        let creds = crate::ports::Credentials {
            client_id: "c1".to_string(),
            api_key: "k1".to_string(),
        };
        let cancel = CancellationToken::new();

        let ready = controller.ensure_ready(&mut task, &creds, &cancel).await.unwrap();
        assert_eq!(ready.draft_id, "d-1");
        assert_eq!(ready.warehouse_id, "wh-1");
        assert_eq!(client.create_draft_calls(), 1);

        let kinds: Vec<_> = events.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::DraftCreated, EventKind::DraftValid]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_triggers_recreate() {
        let client = ScriptedMarketplaceClient::new();
        client.push_create_draft(Ok("op-1".to_string()));
        client.push_draft_info(DraftInfo {
            status: DraftStatus::Failed,
            code: Some(1),
            draft_id: None,
            warehouses: Vec::new(),
            error_message: None,
        });
        client.push_create_draft(Ok("op-2".to_string()));
        client.push_draft_info(success_info("d-1", "wh-1", WarehouseState::FullAvailable));

        let rate_limiter = RateLimiter::new(RateLimitConfig {
            per_second_ms: 0,
            per_minute: 1000,
            per_hour: 1000,
            min_wait_ms: 0,
        });
        let events = RecordingEventBus::new();
        let config = draft_config();
        let controller = DraftController {
            client: &client,
            rate_limiter: &rate_limiter,
            events: &events,
            config: &config,
        };

        let mut task = base_task();
        let creds = crate::ports::Credentials {
            client_id: "c1".to_string(),
            api_key: "k1".to_string(),
        };
        let cancel = CancellationToken::new();

        let ready = controller.ensure_ready(&mut task, &creds, &cancel).await.unwrap();
        assert_eq!(ready.draft_id, "d-1");
        assert_eq!(client.create_draft_calls(), 2);

        let kinds: Vec<_> = events.events().into_iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::DraftInvalid));
        assert!(kinds.contains(&EventKind::DraftCreated));
        assert!(kinds.contains(&EventKind::DraftValid));
    }

    #[test]
    fn normalize_deduplicates_keeping_best_rank() {
        let warehouses = vec![
            DraftWarehouse {
                warehouse_id: "a".to_string(),
                name: "A".to_string(),
                state: WarehouseState::FullAvailable,
                total_rank: Some(2),
                total_score: None,
            },
            DraftWarehouse {
                warehouse_id: "a".to_string(),
                name: "A".to_string(),
                state: WarehouseState::FullAvailable,
                total_rank: Some(1),
                total_score: None,
            },
        ];
        let normalized = normalize_warehouses(warehouses);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].total_rank, Some(1));
    }

    #[test]
    fn normalize_sorts_rank_then_score_then_name() {
        let warehouses = vec![
            DraftWarehouse {
                warehouse_id: "b".to_string(),
                name: "B".to_string(),
                state: WarehouseState::Draft,
                total_rank: None,
                total_score: Some(5.0),
            },
            DraftWarehouse {
                warehouse_id: "c".to_string(),
                name: "C".to_string(),
                state: WarehouseState::Draft,
                total_rank: Some(1),
                total_score: Some(1.0),
            },
        ];
        let normalized = normalize_warehouses(warehouses);
        assert_eq!(normalized[0].warehouse_id, "c");
        assert_eq!(normalized[1].warehouse_id, "b");
    }

    #[test]
    fn select_warehouse_pinned_pending_is_distinct_from_not_found() {
        let mut task = base_task();
        task.warehouse_auto_select = false;
        task.warehouse_id = Some("wh-1".to_string());
        let warehouses = vec![DraftWarehouse {
            warehouse_id: "wh-1".to_string(),
            name: "wh".to_string(),
            state: WarehouseState::Draft,
            total_rank: Some(1),
            total_score: Some(1.0),
        }];
        assert!(matches!(select_warehouse(&task, &warehouses), Selection::Pending(_)));

        task.warehouse_id = Some("missing".to_string());
        assert!(matches!(select_warehouse(&task, &warehouses), Selection::NotFound));
    }
}
