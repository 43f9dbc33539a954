use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::models::{utc_midnight, Event, LeadTime, PermissionState};
use crate::notify::{reminder_body, Clock, NotificationCapability, REMINDER_TITLE};
use crate::timer::TimerDriver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReminder {
    pub event_id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Everything a derivation depends on besides the clock.
#[derive(Debug, Clone, Copy)]
pub struct ReminderInputs<'a> {
    pub events: &'a [Event],
    pub lead_time: LeadTime,
    pub permission: PermissionState,
}

/// Computes which reminders should be armed at `now`.
///
/// An event gets a reminder iff `utc_midnight(date) - lead_time > now`.
/// Past fire times are dropped, never caught up. Events whose date does not
/// parse are skipped without affecting the rest of the batch.
pub fn plan_reminders(
    events: &[Event],
    lead_time: LeadTime,
    permission: PermissionState,
    now: DateTime<Utc>,
) -> Vec<PlannedReminder> {
    if permission != PermissionState::Granted {
        return Vec::new();
    }
    let Some(offset) = lead_time.duration() else {
        return Vec::new();
    };

    let mut planned = Vec::new();
    for event in events {
        let Some(event_at) = utc_midnight(&event.date) else {
            log::debug!("reminder: skip event id={} unparseable date={:?}", event.id, event.date);
            continue;
        };
        let Some(fire_at) = event_at.checked_sub_signed(offset) else {
            log::debug!("reminder: skip event id={} fire time out of range date={:?}", event.id, event.date);
            continue;
        };
        if fire_at <= now {
            continue;
        }
        planned.push(PlannedReminder {
            event_id: event.id.clone(),
            fire_at,
            title: REMINDER_TITLE.to_string(),
            body: reminder_body(event.reminder_text(), lead_time.label()),
        });
    }
    planned
}

struct ArmedReminder<H> {
    event_id: String,
    fire_at: DateTime<Utc>,
    handle: H,
}

/// Owns the live set of reminder timers and rebuilds it from scratch on every
/// input change.
pub struct ReminderScheduler<D: TimerDriver> {
    driver: D,
    notifier: Arc<dyn NotificationCapability>,
    clock: Arc<dyn Clock>,
    armed: Vec<ArmedReminder<D::Handle>>,
    // Bumped under lock on every derivation and teardown. Firing callbacks take
    // the same lock, so they never see a half-built generation.
    generation: Arc<Mutex<u64>>,
    soft_failures: Arc<AtomicUsize>,
}

impl<D: TimerDriver> ReminderScheduler<D> {
    pub fn new(driver: D, notifier: Arc<dyn NotificationCapability>, clock: Arc<dyn Clock>) -> Self {
        Self {
            driver,
            notifier,
            clock,
            armed: Vec::new(),
            generation: Arc::new(Mutex::new(0)),
            soft_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cancels every owned timer, then arms one per planned reminder.
    /// Returns the number of timers now owned.
    pub fn derive(&mut self, inputs: ReminderInputs<'_>) -> usize {
        let now = self.clock.now();
        let generation_cell = Arc::clone(&self.generation);
        let mut generation = lock_generation(&generation_cell);
        *generation += 1;
        let current = *generation;

        let cancelled = self.cancel_armed();
        let planned = plan_reminders(inputs.events, inputs.lead_time, inputs.permission, now);

        for reminder in planned {
            let job = self.fire_job(current, reminder.title, reminder.body);
            let handle = self.driver.arm(reminder.fire_at, now, job);
            self.armed.push(ArmedReminder {
                event_id: reminder.event_id,
                fire_at: reminder.fire_at,
                handle,
            });
        }

        log::debug!(
            "reminder: derived generation={current} cancelled={cancelled} armed={} events={} lead_time={:?} permission={:?}",
            self.armed.len(),
            inputs.events.len(),
            inputs.lead_time,
            inputs.permission
        );
        self.armed.len()
    }

    /// Cancels every owned timer. Same as the first step of a derivation.
    pub fn shutdown(&mut self) {
        let generation_cell = Arc::clone(&self.generation);
        let mut generation = lock_generation(&generation_cell);
        *generation += 1;
        let cancelled = self.cancel_armed();
        if cancelled > 0 {
            log::info!("reminder: teardown cancelled={cancelled}");
        }
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn fire_times(&self) -> Vec<(String, DateTime<Utc>)> {
        self.armed
            .iter()
            .map(|armed| (armed.event_id.clone(), armed.fire_at))
            .collect()
    }

    /// Emission failures swallowed so far.
    pub fn soft_failures(&self) -> usize {
        self.soft_failures.load(Ordering::SeqCst)
    }

    fn cancel_armed(&mut self) -> usize {
        let count = self.armed.len();
        for armed in self.armed.drain(..) {
            self.driver.cancel(armed.handle);
        }
        count
    }

    fn fire_job(&self, owner: u64, title: String, body: String) -> Box<dyn FnOnce() + Send> {
        let generation = Arc::clone(&self.generation);
        let notifier = Arc::clone(&self.notifier);
        let soft_failures = Arc::clone(&self.soft_failures);
        Box::new(move || {
            let live = lock_generation(&generation);
            if *live != owner {
                log::debug!("reminder: stale timer generation={owner} live={}", *live);
                return;
            }
            if let Err(err) = notifier.emit(&title, &body) {
                soft_failures.fetch_add(1, Ordering::SeqCst);
                log::warn!("reminder: emission failed body={body:?}: {err}");
            }
        })
    }
}

impl<D: TimerDriver> Drop for ReminderScheduler<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_generation(cell: &Mutex<u64>) -> MutexGuard<'_, u64> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
