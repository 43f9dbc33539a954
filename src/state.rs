use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Event, Settings, Task};

/// Latest snapshots handed over by the backend plus the user's settings.
///
/// Snapshots are only ever replaced wholesale after a fetch.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                events: Vec::new(),
                tasks: Vec::new(),
                settings,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn replace_events(&self, events: Vec<Event>) {
        self.lock().events = events;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        self.lock().tasks = tasks;
    }

    pub fn find_task(&self, task_id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        self.lock().settings = settings;
    }
}

#[derive(Debug)]
struct AppData {
    events: Vec<Event>,
    tasks: Vec<Task>,
    settings: Settings,
}
