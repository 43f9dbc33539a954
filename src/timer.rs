use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type TimerJob = Box<dyn FnOnce() + Send + 'static>;

/// Arms and cancels one-shot timers.
pub trait TimerDriver {
    type Handle;

    /// Runs `job` once at `fire_at`. `now` is the caller's notion of the current instant.
    fn arm(&mut self, fire_at: DateTime<Utc>, now: DateTime<Utc>, job: TimerJob) -> Self::Handle;

    fn cancel(&mut self, handle: Self::Handle);
}

/// One sleeping tokio task per timer; cancel aborts the task.
pub struct TokioTimers {
    runtime: Handle,
}

impl TokioTimers {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TimerDriver for TokioTimers {
    type Handle = JoinHandle<()>;

    fn arm(&mut self, fire_at: DateTime<Utc>, now: DateTime<Utc>, job: TimerJob) -> JoinHandle<()> {
        let delay = (fire_at - now).to_std().unwrap_or_default();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            job();
        })
    }

    fn cancel(&mut self, handle: JoinHandle<()>) {
        handle.abort();
    }
}
