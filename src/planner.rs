use std::sync::Arc;

use crate::aggregate::{aggregate_cohorts, Cohort};
use crate::backend::PlannerBackend;
use crate::error::PlannerError;
use crate::models::{Event, EventDraft, LeadTime, PermissionState, Settings, Task, TaskDraft};
use crate::notify::{Clock, NotificationCapability};
use crate::permission::PermissionGate;
use crate::reminder::{ReminderInputs, ReminderScheduler};
use crate::state::AppState;
use crate::storage::Storage;
use crate::timer::TimerDriver;

/// Ties the backend, the permission gate, the reminder scheduler and the
/// task aggregator together.
///
/// Every mutation goes to the backend first; on success the affected
/// collection is re-fetched and all derived state is rebuilt from the fresh
/// snapshot.
pub struct Planner<B: PlannerBackend, D: TimerDriver> {
    backend: B,
    gate: PermissionGate,
    scheduler: ReminderScheduler<D>,
    state: AppState,
    storage: Storage,
}

impl<B: PlannerBackend, D: TimerDriver> Planner<B, D> {
    /// `settings` are the ones already loaded from `storage`; later changes
    /// are saved back there.
    pub fn new(
        backend: B,
        capability: Arc<dyn NotificationCapability>,
        driver: D,
        clock: Arc<dyn Clock>,
        storage: Storage,
        settings: Settings,
    ) -> Self {
        let gate = PermissionGate::new(Arc::clone(&capability));
        log::info!(
            "planner: init permission={:?} lead_time={:?} api={}",
            gate.state(),
            settings.lead_time,
            settings.api_base_url
        );
        Self {
            backend,
            gate,
            scheduler: ReminderScheduler::new(driver, capability, clock),
            state: AppState::new(settings),
            storage,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.events()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.tasks()
    }

    pub fn cohorts(&self) -> Vec<Cohort> {
        aggregate_cohorts(&self.state.tasks())
    }

    pub fn permission(&self) -> PermissionState {
        self.gate.state()
    }

    pub fn lead_time(&self) -> LeadTime {
        self.state.settings().lead_time
    }

    pub fn reminders(&self) -> &ReminderScheduler<D> {
        &self.scheduler
    }

    fn rederive(&mut self) -> usize {
        let events = self.state.events();
        self.scheduler.derive(ReminderInputs {
            events: &events,
            lead_time: self.state.settings().lead_time,
            permission: self.gate.state(),
        })
    }

    /// Returns the number of reminders armed from the new snapshot.
    pub async fn refresh_events(&mut self) -> Result<usize, PlannerError> {
        let events = self.backend.fetch_events().await?;
        log::debug!("planner: fetched events count={}", events.len());
        self.state.replace_events(events);
        Ok(self.rederive())
    }

    pub async fn refresh_tasks(&mut self) -> Result<usize, PlannerError> {
        let tasks = self.backend.fetch_tasks().await?;
        let count = tasks.len();
        log::debug!("planner: fetched tasks count={count}");
        self.state.replace_tasks(tasks);
        Ok(count)
    }

    pub async fn create_event(&mut self, draft: &EventDraft) -> Result<usize, PlannerError> {
        self.backend.create_event(draft).await?;
        self.refresh_events().await
    }

    pub async fn update_event(&mut self, id: &str, draft: &EventDraft) -> Result<usize, PlannerError> {
        self.backend.update_event(id, draft).await?;
        self.refresh_events().await
    }

    pub async fn delete_event(&mut self, id: &str) -> Result<usize, PlannerError> {
        self.backend.delete_event(id).await?;
        self.refresh_events().await
    }

    pub async fn create_task(&mut self, draft: &TaskDraft) -> Result<usize, PlannerError> {
        self.backend.create_task(draft).await?;
        self.refresh_tasks().await
    }

    pub async fn update_task(&mut self, id: &str, draft: &TaskDraft) -> Result<usize, PlannerError> {
        self.backend.update_task(id, draft).await?;
        self.refresh_tasks().await
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<usize, PlannerError> {
        self.backend.delete_task(id).await?;
        self.refresh_tasks().await
    }

    /// Flips the completion flag of a task from the current snapshot.
    /// Unknown ids are ignored and return `Ok(false)`.
    pub async fn toggle_task_completion(&mut self, id: &str) -> Result<bool, PlannerError> {
        let Some(task) = self.state.find_task(id) else {
            return Ok(false);
        };
        let mut draft = TaskDraft::from_task(&task);
        draft.is_completed = !task.is_completed;
        self.update_task(id, &draft).await?;
        Ok(true)
    }

    /// Persists the new lead time and rebuilds reminders with it.
    pub fn set_lead_time(&mut self, lead_time: LeadTime) -> Result<usize, PlannerError> {
        let previous = self.state.settings();
        let mut settings = previous.clone();
        settings.lead_time = lead_time;
        self.state.update_settings(settings.clone());

        let saved = self
            .storage
            .ensure_dirs()
            .and_then(|_| self.storage.save_settings(&settings));
        if let Err(error) = saved {
            // Keep the running planner consistent with what is on disk.
            self.state.update_settings(previous);
            return Err(error.into());
        }
        Ok(self.rederive())
    }

    pub fn request_permission(&mut self) -> Result<PermissionState, PlannerError> {
        let state = self.gate.request_permission()?;
        self.rederive();
        Ok(state)
    }

    /// Cancels every pending reminder.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::models::utc_midnight;
    use crate::notify::testing::{FakeNotifier, FixedClock};
    use crate::timer::manual::ManualTimers;

    #[derive(Default)]
    struct FakeBackend {
        events: Mutex<Vec<Event>>,
        tasks: Mutex<Vec<Task>>,
        next_id: Mutex<u32>,
        event_fetches: Mutex<usize>,
        task_fetches: Mutex<usize>,
        fail_with: Mutex<Option<String>>,
    }

    impl FakeBackend {
        fn check(&self, operation: &'static str) -> Result<(), PlannerError> {
            match self.fail_with.lock().unwrap().clone() {
                Some(message) => Err(PlannerError::upstream(operation, message)),
                None => Ok(()),
            }
        }

        fn new_id(&self, prefix: &str) -> String {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("{prefix}{next}")
        }
    }

    impl PlannerBackend for FakeBackend {
        async fn fetch_events(&self) -> Result<Vec<Event>, PlannerError> {
            self.check("fetch_events")?;
            *self.event_fetches.lock().unwrap() += 1;
            Ok(self.events.lock().unwrap().clone())
        }

        async fn create_event(&self, draft: &EventDraft) -> Result<(), PlannerError> {
            self.check("create_event")?;
            let id = self.new_id("e");
            self.events.lock().unwrap().push(Event {
                id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                event: None,
                date: draft.date.clone(),
            });
            Ok(())
        }

        async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<(), PlannerError> {
            self.check("update_event")?;
            if let Some(event) = self.events.lock().unwrap().iter_mut().find(|e| e.id == id) {
                event.title = draft.title.clone();
                event.description = draft.description.clone();
                event.date = draft.date.clone();
            }
            Ok(())
        }

        async fn delete_event(&self, id: &str) -> Result<(), PlannerError> {
            self.check("delete_event")?;
            self.events.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }

        async fn fetch_tasks(&self) -> Result<Vec<Task>, PlannerError> {
            self.check("fetch_tasks")?;
            *self.task_fetches.lock().unwrap() += 1;
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn create_task(&self, draft: &TaskDraft) -> Result<(), PlannerError> {
            self.check("create_task")?;
            let id = self.new_id("t");
            self.tasks.lock().unwrap().push(Task {
                id,
                description: draft.description.clone(),
                start_date: draft.start_date.clone(),
                end_date: draft.end_date.clone(),
                is_completed: draft.is_completed,
            });
            Ok(())
        }

        async fn update_task(&self, id: &str, draft: &TaskDraft) -> Result<(), PlannerError> {
            self.check("update_task")?;
            if let Some(task) = self.tasks.lock().unwrap().iter_mut().find(|t| t.id == id) {
                task.description = draft.description.clone();
                task.start_date = draft.start_date.clone();
                task.end_date = draft.end_date.clone();
                task.is_completed = draft.is_completed;
            }
            Ok(())
        }

        async fn delete_task(&self, id: &str) -> Result<(), PlannerError> {
            self.check("delete_task")?;
            self.tasks.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    struct TestCtx {
        root: tempfile::TempDir,
        timers: ManualTimers,
        notifier: Arc<FakeNotifier>,
        planner: Planner<FakeBackend, ManualTimers>,
    }

    fn now() -> DateTime<Utc> {
        utc_midnight("2024-01-01").unwrap()
    }

    fn ctx_with(notifier: FakeNotifier) -> TestCtx {
        let root = tempfile::tempdir().unwrap();
        let timers = ManualTimers::default();
        let notifier = Arc::new(notifier);
        let storage = Storage::new(root.path().to_path_buf());
        let settings = storage.load_settings_or_default();
        let planner = Planner::new(
            FakeBackend::default(),
            notifier.clone(),
            timers.clone(),
            Arc::new(FixedClock::at(now())),
            storage,
            settings,
        );
        TestCtx {
            root,
            timers,
            notifier,
            planner,
        }
    }

    fn event_draft(description: &str, date: &str) -> EventDraft {
        EventDraft {
            title: Some(description.to_uppercase()),
            description: description.to_string(),
            date: date.to_string(),
        }
    }

    fn task_draft(description: &str, start: &str, end: &str) -> TaskDraft {
        TaskDraft {
            description: description.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            is_completed: false,
        }
    }

    #[tokio::test]
    async fn event_mutations_refetch_and_rederive() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        let planner = &mut ctx.planner;

        assert_eq!(planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap(), 1);
        assert_eq!(planner.create_event(&event_draft("trip", "2024-02-01")).await.unwrap(), 2);
        assert_eq!(*planner.backend.event_fetches.lock().unwrap(), 2);
        assert_eq!(planner.events().len(), 2);

        let exam_id = planner.events()[0].id.clone();
        assert_eq!(planner.delete_event(&exam_id).await.unwrap(), 1);
        assert_eq!(ctx.timers.pending_fire_times(), vec![utc_midnight("2024-01-31").unwrap()]);

        ctx.timers.advance_to(utc_midnight("2024-03-01").unwrap());
        assert_eq!(ctx.notifier.bodies(), vec!["trip is in about day."]);
    }

    #[tokio::test]
    async fn update_event_moves_the_reminder() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        let planner = &mut ctx.planner;
        planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap();
        let id = planner.events()[0].id.clone();

        planner.update_event(&id, &event_draft("exam", "2024-01-20")).await.unwrap();
        assert_eq!(
            planner.reminders().fire_times(),
            vec![(id, utc_midnight("2024-01-19").unwrap())]
        );
    }

    #[tokio::test]
    async fn failed_mutation_propagates_without_refetch() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        let planner = &mut ctx.planner;
        planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap();
        *planner.backend.fail_with.lock().unwrap() = Some("connection reset".to_string());

        let err = planner.create_event(&event_draft("x", "2024-01-11")).await.unwrap_err();
        assert!(matches!(err, PlannerError::UpstreamFetch { operation: "create_event", .. }));
        assert_eq!(*planner.backend.event_fetches.lock().unwrap(), 1);
        assert_eq!(planner.events().len(), 1);
        assert_eq!(planner.reminders().armed_count(), 1);
    }

    #[tokio::test]
    async fn task_mutations_refresh_cohorts() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        let planner = &mut ctx.planner;

        planner.create_task(&task_draft("a", "2024-02-01", "2024-02-10")).await.unwrap();
        planner.create_task(&task_draft("b", "2024-01-01", "2024-01-05")).await.unwrap();
        planner.create_task(&task_draft("c", "2024-01-01", "2024-01-05")).await.unwrap();
        assert_eq!(*planner.backend.task_fetches.lock().unwrap(), 3);

        let b_id = planner.tasks()[1].id.clone();
        assert!(planner.toggle_task_completion(&b_id).await.unwrap());

        let cohorts = planner.cohorts();
        assert_eq!(cohorts.len(), 2);
        assert_eq!(cohorts[0].start_date, "2024-01-01");
        assert_eq!((cohorts[0].completed_count, cohorts[0].total_count), (1, 2));
        assert_eq!(cohorts[0].percentage, 50.0);
        assert_eq!(cohorts[1].percentage, 0.0);

        assert!(planner.toggle_task_completion(&b_id).await.unwrap());
        assert_eq!(planner.cohorts()[0].completed_count, 0);

        let a_id = planner.tasks()[0].id.clone();
        planner.delete_task(&a_id).await.unwrap();
        assert_eq!(planner.cohorts().len(), 1);
    }

    #[tokio::test]
    async fn toggling_unknown_task_is_a_no_op() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        assert!(!ctx.planner.toggle_task_completion("missing").await.unwrap());
        assert_eq!(*ctx.planner.backend.task_fetches.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn uses_the_settings_it_is_given() {
        let root = tempfile::tempdir().unwrap();
        let storage = Storage::new(root.path().to_path_buf());
        let settings = Settings {
            lead_time: LeadTime::OneHour,
            ..Settings::default()
        };
        let timers = ManualTimers::default();
        let mut planner = Planner::new(
            FakeBackend::default(),
            Arc::new(FakeNotifier::granted()),
            timers.clone(),
            Arc::new(FixedClock::at(now())),
            storage,
            settings,
        );
        assert_eq!(planner.lead_time(), LeadTime::OneHour);
        assert!(Storage::new(root.path().to_path_buf()).load_settings().is_err());

        planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap();
        assert_eq!(
            timers.pending_fire_times(),
            vec![utc_midnight("2024-01-10").unwrap() - chrono::Duration::hours(1)]
        );
    }

    #[tokio::test]
    async fn lead_time_is_persisted_and_rederives() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        ctx.planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap();

        assert_eq!(ctx.planner.set_lead_time(LeadTime::None).unwrap(), 0);
        assert!(ctx.timers.pending_fire_times().is_empty());

        assert_eq!(ctx.planner.set_lead_time(LeadTime::ThirtyMinutes).unwrap(), 1);
        assert_eq!(ctx.planner.lead_time(), LeadTime::ThirtyMinutes);

        let reloaded = Storage::new(ctx.root.path().to_path_buf()).load_settings().unwrap();
        assert_eq!(reloaded.settings.lead_time, LeadTime::ThirtyMinutes);
    }

    #[tokio::test]
    async fn lead_time_save_failure_rolls_back() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        // A regular file where the data directory should be makes every write fail.
        let blocked = ctx.root.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        ctx.planner.storage = Storage::new(blocked);

        let err = ctx.planner.set_lead_time(LeadTime::OneHour).unwrap_err();
        assert!(matches!(err, PlannerError::Storage(_)));
        assert_eq!(ctx.planner.lead_time(), LeadTime::OneDay);
    }

    #[tokio::test]
    async fn granting_permission_arms_pending_events() {
        let mut ctx = ctx_with(FakeNotifier::with_state(
            PermissionState::Unknown,
            PermissionState::Granted,
        ));
        assert_eq!(ctx.planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap(), 0);

        assert_eq!(ctx.planner.request_permission().unwrap(), PermissionState::Granted);
        assert_eq!(ctx.planner.reminders().armed_count(), 1);
        assert_eq!(ctx.notifier.prompt_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_notifications_surface_error() {
        let mut notifier = FakeNotifier::with_state(PermissionState::Unknown, PermissionState::Granted);
        notifier.supported = false;
        let mut ctx = ctx_with(notifier);

        let err = ctx.planner.request_permission().unwrap_err();
        assert!(matches!(err, PlannerError::UnsupportedCapability));
        assert_eq!(ctx.planner.permission(), PermissionState::Unknown);
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_reminders() {
        let mut ctx = ctx_with(FakeNotifier::granted());
        ctx.planner.create_event(&event_draft("exam", "2024-01-10")).await.unwrap();
        ctx.planner.shutdown();

        assert_eq!(ctx.planner.reminders().armed_count(), 0);
        ctx.timers.advance_to(utc_midnight("2024-02-01").unwrap());
        assert!(ctx.notifier.bodies().is_empty());
    }
}
