//! Timeslot Poller: searches a ready draft's candidate destination warehouse
//! for an acceptable delivery slot (SPEC_FULL.md §4.3).

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::config::TimeslotConfig;
use crate::domain::{Event, EventKind, Task, Timeslot};
use crate::error::{Error, Result};
use crate::ports::{Credentials, EventBus, MarketplaceClient, TimeslotsRequest};
use crate::time::{end_of_moscow_day, local_hour, start_of_moscow_day};

/// Outcome of one search pass over a task's acceptance window.
pub enum TimeslotOutcome {
    Found(Timeslot),
    WindowExpired,
    /// The draft expired mid-search; caller should return to the Draft
    /// Controller to recreate it.
    DraftExpired,
}

pub struct TimeslotPoller<'a> {
    pub client: &'a dyn MarketplaceClient,
    pub events: &'a dyn EventBus,
    pub config: &'a TimeslotConfig,
}

impl<'a> TimeslotPoller<'a> {
    pub async fn search(
        &self,
        task: &Task,
        draft_id: &str,
        warehouse_id: &str,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<TimeslotOutcome> {
        let mut timeslot_missing_emitted = false;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let now = Utc::now();
            if now > task.search_deadline {
                self.events.emit(Event::new(&task.task_id, EventKind::WindowExpired));
                return Ok(TimeslotOutcome::WindowExpired);
            }
            if task.draft_expired(now) {
                return Ok(TimeslotOutcome::DraftExpired);
            }

            let from = start_of_moscow_day(now, task.ready_in_days);
            let max_horizon = now + ChronoDuration::days(self.config.window_max_days);
            let to = end_of_moscow_day(task.search_deadline.min(max_horizon));

            if from > to {
                self.events.emit(Event::new(&task.task_id, EventKind::WindowExpired));
                return Ok(TimeslotOutcome::WindowExpired);
            }

            let response = self
                .client
                .draft_timeslots(
                    credentials,
                    TimeslotsRequest {
                        draft_id: draft_id.to_string(),
                        warehouse_ids: vec![warehouse_id.to_string()],
                        date_from: from,
                        date_to: to,
                    },
                )
                .await?;

            let mut slots = response.slots;
            slots.sort_by_key(|slot| slot.from);
            slots.dedup_by(|a, b| a.from == b.from && a.to == b.to);

            let candidate = slots
                .into_iter()
                .filter(|slot| slot.from >= from)
                .find(|slot| {
                    let hour = local_hour(slot.from, response.warehouse_timezone_offset_minutes);
                    task.time_window.accepts_hour(hour)
                });

            match candidate {
                Some(slot) => return Ok(TimeslotOutcome::Found(slot)),
                None => {
                    if !timeslot_missing_emitted {
                        self.events.emit(Event::new(&task.task_id, EventKind::TimeslotMissing));
                        timeslot_missing_emitted = true;
                    }
                    tokio::select! {
                        () = sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, SupplyType, TaskState, TimeWindow};
    use crate::ports::TimeslotsResponse;
    use crate::testkit::{RecordingEventBus, ScriptedMarketplaceClient};
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
            draft_operation_id: Some("op-1".to_string()),
            draft_id: Some("d-1".to_string()),
            draft_created_at: Some(now),
            draft_expires_at: Some(now + CD::minutes(30)),
            selected_timeslot: None,
            order_flag: false,
            state: TaskState::Polling,
        }
    }

    fn config() -> TimeslotConfig {
        TimeslotConfig {
            poll_interval_ms: 0,
            window_max_days: 28,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            client_id: "c1".to_string(),
            api_key: "k1".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finds_first_slot_within_window() {
        let task = base_task();
        let client = ScriptedMarketplaceClient::new();
        let slot_from = task.search_deadline - CD::days(1);
        client.push_draft_timeslots(TimeslotsResponse {
            warehouse_timezone_offset_minutes: 0,
            slots: vec![Timeslot { from: slot_from, to: slot_from + CD::hours(2) }],
        });
        let events = RecordingEventBus::new();
        let cfg = config();
        let poller = TimeslotPoller { client: &client, events: &events, config: &cfg };
        let cancel = CancellationToken::new();

        let outcome = poller
            .search(&task, "d-1", "wh-1", &credentials(), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, TimeslotOutcome::Found(slot) if slot.from == slot_from));
    }

    #[tokio::test(start_paused = true)]
    async fn window_exhaustion_emits_timeslot_missing_once_then_window_expired() {
        let mut task = base_task();
        task.ready_in_days = 0;
        task.search_deadline = Utc::now() + CD::milliseconds(500);

        let client = ScriptedMarketplaceClient::new();
        for _ in 0..20 {
            client.push_draft_timeslots(TimeslotsResponse {
                warehouse_timezone_offset_minutes: 0,
                slots: Vec::new(),
            });
        }
        let events = RecordingEventBus::new();
        let cfg = TimeslotConfig { poll_interval_ms: 100, window_max_days: 28 };
        let poller = TimeslotPoller { client: &client, events: &events, config: &cfg };
        let cancel = CancellationToken::new();

        let outcome = poller
            .search(&task, "d-1", "wh-1", &credentials(), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, TimeslotOutcome::WindowExpired));

        let missing_count = events
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::TimeslotMissing)
            .count();
        assert_eq!(missing_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_expiry_returns_control_without_calling_client() {
        let mut task = base_task();
        task.draft_expires_at = Some(Utc::now() - CD::seconds(1));

        let client = ScriptedMarketplaceClient::new();
        let events = RecordingEventBus::new();
        let cfg = config();
        let poller = TimeslotPoller { client: &client, events: &events, config: &cfg };
        let cancel = CancellationToken::new();

        let outcome = poller
            .search(&task, "d-1", "wh-1", &credentials(), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, TimeslotOutcome::DraftExpired));
        assert_eq!(client.draft_timeslots_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hour_range_rejects_slots_outside_window() {
        let mut task = base_task();
        task.time_window = TimeWindow::HourRange { from_hour: 9, to_hour: Some(12) };

        let client = ScriptedMarketplaceClient::new();
        let slot_date = (task.search_deadline - CD::days(1)).date_naive();
        let rejected_from = slot_date.and_hms_opt(3, 0, 0).unwrap().and_utc();
        let accepted_from = slot_date.and_hms_opt(10, 0, 0).unwrap().and_utc();
        client.push_draft_timeslots(TimeslotsResponse {
            warehouse_timezone_offset_minutes: 0,
            slots: vec![
                Timeslot { from: rejected_from, to: rejected_from + CD::hours(1) },
                Timeslot { from: accepted_from, to: accepted_from + CD::hours(1) },
            ],
        });
        let events = RecordingEventBus::new();
        let cfg = config();
        let poller = TimeslotPoller { client: &client, events: &events, config: &cfg };
        let cancel = CancellationToken::new();

        let outcome = poller
            .search(&task, "d-1", "wh-1", &credentials(), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, TimeslotOutcome::Found(slot) if slot.from == accepted_from));
    }
}
