//! Supply Orchestrator: the top-level state machine composing the Draft
//! Controller, Timeslot Poller, and SKU resolution (SPEC_FULL.md §4.4).

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{DraftConfig, SupplyConfig, TimeslotConfig};
use crate::domain::{CompletedOrder, Event, EventKind, Task, TaskState};
use crate::engine::draft::DraftController;
use crate::engine::rate_limit::RateLimiter;
use crate::engine::sku;
use crate::engine::timeslot::{TimeslotOutcome, TimeslotPoller};
use crate::error::{Error, Result};
use crate::ports::{CredentialStore, EventBus, MarketplaceClient, SupplyCreateRequest, SupplyState, TaskStore};

/// Drives a single `Task` from `Created` to a terminal state. One instance
/// is shared across every runner; `run` is the only method that mutates a
/// task, and it owns its `Task` exclusively for the duration of the call.
pub struct SupplyOrchestrator<'a> {
    pub client: &'a dyn MarketplaceClient,
    pub store: &'a dyn TaskStore,
    pub credentials: &'a dyn CredentialStore,
    pub events: &'a dyn EventBus,
    pub rate_limiter: &'a RateLimiter,
    pub draft_config: &'a DraftConfig,
    pub timeslot_config: &'a TimeslotConfig,
    pub supply_config: &'a SupplyConfig,
}

impl<'a> SupplyOrchestrator<'a> {
    /// Run `task` to completion or a terminal failure. The caller is
    /// responsible for registering `cancel` with the task registry before
    /// calling this and deregistering it afterwards.
    pub async fn run(&self, mut task: Task, cancel: CancellationToken) -> Result<()> {
        let result = self.run_inner(&mut task, &cancel).await;

        match &result {
            Err(Error::Cancelled) => {
                info!(task_id = %task.task_id, "task cancelled");
                self.events.emit(Event::new(&task.task_id, EventKind::Cancelled));
                if let Err(e) = self.store.delete(&task.user_id, &task.task_id).await {
                    error!(task_id = %task.task_id, error = %e, "failed to delete pending task after cancellation");
                }
            }
            Err(Error::CredentialRevoked(reason)) => {
                self.events.emit(
                    Event::new(&task.task_id, EventKind::NoCredentials).with_message(reason.clone()),
                );
                if let Err(e) = self.credentials.clear(&task.user_id).await {
                    error!(task_id = %task.task_id, error = %e, "failed to clear revoked credentials");
                }
                if let Err(e) = self.store.delete(&task.user_id, &task.task_id).await {
                    error!(task_id = %task.task_id, error = %e, "failed to delete pending task after credential revocation");
                }
            }
            Err(_) | Ok(()) => {}
        }

        result
    }

    async fn run_inner(&self, task: &mut Task, cancel: &CancellationToken) -> Result<()> {
        let credentials = self
            .credentials
            .credentials_for(&task.user_id)
            .await?
            .ok_or_else(|| Error::Input(format!("no credentials for user {}", task.user_id)))?;

        task.state = TaskState::DraftPending;
        if !task.skus_resolved() {
            sku::resolve_items(
                self.client,
                &credentials,
                &mut task.items,
                self.supply_config.sku_resolve_batch_size,
            )
            .await?;
        }
        self.store.save(task).await?;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let draft_controller = DraftController {
                client: self.client,
                rate_limiter: self.rate_limiter,
                events: self.events,
                config: self.draft_config,
            };
            let ready = match draft_controller.ensure_ready(task, &credentials, cancel).await {
                Ok(ready) => ready,
                Err(Error::DraftRetriesExhausted(attempts)) => {
                    task.state = TaskState::Failed;
                    self.store.save(task).await?;
                    return Err(Error::DraftRetriesExhausted(attempts));
                }
                Err(e) => return Err(e),
            };

            task.state = TaskState::DraftReady;
            self.store.save(task).await?;

            task.state = TaskState::Polling;
            self.store.save(task).await?;

            let poller = TimeslotPoller {
                client: self.client,
                events: self.events,
                config: self.timeslot_config,
            };
            let outcome = poller
                .search(task, &ready.draft_id, &ready.warehouse_id, &credentials, cancel)
                .await?;

            match outcome {
                TimeslotOutcome::WindowExpired => {
                    task.state = TaskState::Expired;
                    self.store.delete(&task.user_id, &task.task_id).await?;
                    return Ok(());
                }
                TimeslotOutcome::DraftExpired => {
                    task.clear_draft();
                    task.state = TaskState::DraftPending;
                    self.store.save(task).await?;
                    continue;
                }
                TimeslotOutcome::Found(slot) => {
                    task.selected_timeslot = Some(slot);
                    task.state = TaskState::SupplyCreating;
                    self.store.save(task).await?;

                    let request = SupplyCreateRequest {
                        draft_id: ready.draft_id.clone(),
                        warehouse_id: ready.warehouse_id.clone(),
                        timeslot: slot,
                    };
                    let operation_id = match self.client.create_supply(&credentials, request).await {
                        Ok(id) => id,
                        Err(e) if e.is_fatal_to_runner() => return Err(e),
                        Err(e) => {
                            task.state = TaskState::Failed;
                            self.events.emit(
                                Event::new(&task.task_id, EventKind::Error).with_message(e.to_string()),
                            );
                            self.store.save(task).await?;
                            return Err(e);
                        }
                    };

                    let order_id = self.resolve_order_id(task, &credentials, &operation_id, cancel).await?;

                    let completed = CompletedOrder {
                        task_id: task.task_id.clone(),
                        user_id: task.user_id.clone(),
                        order_id,
                        operation_id: operation_id.clone(),
                        draft_id: ready.draft_id.clone(),
                        warehouse_id: ready.warehouse_id.clone(),
                        drop_off_warehouse_id: task.drop_off_warehouse_id.clone(),
                        timeslot: slot,
                        items: task.items.clone(),
                        completed_at: Utc::now(),
                    };
                    self.store.complete(&completed).await?;
                    self.store.delete(&task.user_id, &task.task_id).await?;

                    task.order_flag = true;
                    task.state = TaskState::Completed;
                    self.events.emit(
                        Event::new(&task.task_id, EventKind::SupplyCreated { order_id })
                            .with_operation_id(operation_id),
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Best-effort resolution of the marketplace `order_id` after supply
    /// creation. Only cancellation/credential errors unwind; any other
    /// failure here just means the completed order is persisted without an
    /// `order_id`.
    async fn resolve_order_id(
        &self,
        task: &Task,
        credentials: &crate::ports::Credentials,
        operation_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>> {
        for attempt in 0..self.supply_config.order_id_poll_attempts {
            if attempt > 0 {
                tokio::select! {
                    () = sleep(Duration::from_millis(self.supply_config.order_id_poll_delay_ms)) => {}
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
            match self.client.supply_status(credentials, operation_id).await {
                Ok(status) => {
                    if let Some(&order_id) = status.order_ids.first() {
                        return Ok(Some(order_id));
                    }
                    if status.state == SupplyState::Failed {
                        break;
                    }
                }
                Err(e) if e.is_fatal_to_runner() => return Err(e),
                Err(e) => {
                    info!(task_id = %task.task_id, error = %e, "order id poll attempt failed, retrying");
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::domain::{Item, SupplyType, TimeWindow};
    use crate::ports::{
        Credentials, DraftInfo, DraftStatus, DraftWarehouse, SupplyStatus, TimeslotsResponse,
        WarehouseState,
    };
    use crate::testkit::{FixedCredentialStore, InMemoryTaskStore, RecordingEventBus, ScriptedMarketplaceClient};
    use chrono::Duration as CD;

    fn base_task() -> Task {
        let now = Utc::now();
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
            search_deadline: now + CD::days(7),
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

    fn fast_configs() -> (DraftConfig, TimeslotConfig, SupplyConfig, RateLimitConfig) {
        (
            DraftConfig {
                poll_interval_ms: 0,
                poll_max_attempts: 10,
                recreate_max_attempts: 3,
                lifetime_ms: 1_800_000,
                recreate_backoff_ms: 0,
            },
            TimeslotConfig { poll_interval_ms: 0, window_max_days: 28 },
            SupplyConfig {
                ready_days_min: 0,
                ready_days_max: 28,
                ready_days_default: 1,
                order_id_poll_attempts: 5,
                order_id_poll_delay_ms: 0,
                sku_resolve_batch_size: 100,
            },
            RateLimitConfig { per_second_ms: 0, per_minute: 1000, per_hour: 1000, min_wait_ms: 0 },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_completes_and_persists_order() {
        let task = base_task();
        let slot_from = Utc::now() + CD::hours(25);

        let client = ScriptedMarketplaceClient::new();
        client.push_create_draft(Ok("op-1".to_string()));
        client.push_draft_info(DraftInfo {
            status: DraftStatus::Success,
            code: None,
            draft_id: Some("d-1".to_string()),
            warehouses: vec![DraftWarehouse {
                warehouse_id: "wh-1".to_string(),
                name: "wh".to_string(),
                state: WarehouseState::FullAvailable,
                total_rank: Some(1),
                total_score: Some(1.0),
            }],
            error_message: None,
        });
        client.push_draft_timeslots(TimeslotsResponse {
            warehouse_timezone_offset_minutes: 0,
            slots: vec![crate::domain::Timeslot { from: slot_from, to: slot_from + CD::hours(2) }],
        });
        client.push_create_supply(Ok("sup-1".to_string()));
        client.push_supply_status(SupplyStatus {
            state: SupplyState::Success,
            order_ids: vec![999],
            errors: Vec::new(),
        });

        let store = InMemoryTaskStore::new();
        let credentials_store = FixedCredentialStore::with_credentials(
            "u1",
            Credentials { client_id: "c1".to_string(), api_key: "k1".to_string() },
        );
        let events = RecordingEventBus::new();
        let rate_limiter = RateLimiter::new(fast_configs().3);
        let (draft_config, timeslot_config, supply_config, _) = fast_configs();

        let orchestrator = SupplyOrchestrator {
            client: &client,
            store: &store,
            credentials: &credentials_store,
            events: &events,
            rate_limiter: &rate_limiter,
            draft_config: &draft_config,
            timeslot_config: &timeslot_config,
            supply_config: &supply_config,
        };

        let cancel = CancellationToken::new();
        orchestrator.run(task, cancel).await.unwrap();

        assert_eq!(store.pending_count(), 0);
        let completed = store.completed_orders();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].order_id, Some(999));

        let kinds: Vec<_> = events.events().into_iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::DraftCreated));
        assert!(kinds.contains(&EventKind::SupplyCreated { order_id: Some(999) }));
    }

    #[tokio::test(start_paused = true)]
    async fn window_exhaustion_deletes_pending_task_without_creating_supply() {
        let mut task = base_task();
        task.ready_in_days = 0;
        task.search_deadline = Utc::now() + CD::milliseconds(500);

        let client = ScriptedMarketplaceClient::new();
        client.push_create_draft(Ok("op-1".to_string()));
        client.push_draft_info(DraftInfo {
            status: DraftStatus::Success,
            code: None,
            draft_id: Some("d-1".to_string()),
            warehouses: vec![DraftWarehouse {
                warehouse_id: "wh-1".to_string(),
                name: "wh".to_string(),
                state: WarehouseState::FullAvailable,
                total_rank: Some(1),
                total_score: Some(1.0),
            }],
            error_message: None,
        });
        for _ in 0..20 {
            client.push_draft_timeslots(TimeslotsResponse {
                warehouse_timezone_offset_minutes: 0,
                slots: Vec::new(),
            });
        }

        let store = InMemoryTaskStore::new();
        let credentials_store = FixedCredentialStore::with_credentials(
            "u1",
            Credentials { client_id: "c1".to_string(), api_key: "k1".to_string() },
        );
        let events = RecordingEventBus::new();
        let (draft_config, timeslot_config, supply_config, rate_config) = fast_configs();
        let rate_limiter = RateLimiter::new(rate_config);

        let orchestrator = SupplyOrchestrator {
            client: &client,
            store: &store,
            credentials: &credentials_store,
            events: &events,
            rate_limiter: &rate_limiter,
            draft_config: &draft_config,
            timeslot_config: &timeslot_config,
            supply_config: &supply_config,
        };

        let cancel = CancellationToken::new();
        orchestrator.run(task, cancel).await.unwrap();

        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.completed_orders().len(), 0);
        assert_eq!(client.create_supply_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_deletes_pending_task_and_emits_once() {
        let task = base_task();

        let client = ScriptedMarketplaceClient::new();
        client.push_create_draft(Ok("op-1".to_string()));
        for _ in 0..50 {
            client.push_draft_info(DraftInfo {
                status: DraftStatus::Calculating,
                code: None,
                draft_id: None,
                warehouses: Vec::new(),
                error_message: None,
            });
        }

        let store = InMemoryTaskStore::new();
        store.save(&task).await.unwrap();
        let credentials_store = FixedCredentialStore::with_credentials(
            "u1",
            Credentials { client_id: "c1".to_string(), api_key: "k1".to_string() },
        );
        let events = RecordingEventBus::new();
        let (draft_config, timeslot_config, supply_config, rate_config) = fast_configs();
        let draft_config = DraftConfig { poll_interval_ms: 10_000, ..draft_config };
        let rate_limiter = RateLimiter::new(rate_config);

        let orchestrator = SupplyOrchestrator {
            client: &client,
            store: &store,
            credentials: &credentials_store,
            events: &events,
            rate_limiter: &rate_limiter,
            draft_config: &draft_config,
            timeslot_config: &timeslot_config,
            supply_config: &supply_config,
        };

        let cancel = CancellationToken::new();
        let run_future = orchestrator.run(task, cancel.clone());
        tokio::pin!(run_future);

        let canceller = async {
            sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        };
        tokio::pin!(canceller);

        let result = tokio::select! {
            result = &mut run_future => result,
            () = &mut canceller => run_future.await,
        };
        assert!(matches!(result, Err(Error::Cancelled)));

        assert_eq!(store.pending_count(), 0);
        let cancel_events = events
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::Cancelled)
            .count();
        assert_eq!(cancel_events, 1);
    }
}
