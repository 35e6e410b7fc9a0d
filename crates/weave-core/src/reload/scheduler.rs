use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::event::LogCategory;
use crate::kernel::error::Result;

/// What the scheduler rebuilds.
pub trait ReloadTarget: Send + Sync {
    /// Rebuild the program. Blocks until cutover or rollback.
    fn reload(&self) -> Result<()>;

    /// Report through the current program's `log` interface.
    fn log(&self, category: LogCategory, message: &str);

    /// Source files of the currently loaded feature modules.
    fn feature_sources(&self) -> BTreeSet<PathBuf> {
        BTreeSet::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Idle,
    /// A timer is armed; another change restarts it.
    Debouncing,
    /// A rebuild is running; changes only mark a follow-up cycle.
    Rebuilding,
}

struct SchedulerState {
    phase: ReloadPhase,
    timer: Option<JoinHandle<()>>,
    pending: bool,
    delay: Duration,
    completed_cycles: u64,
    cancelled: bool,
}

/// Last-change-wins debounce in front of a [`ReloadTarget`].
///
/// At most one timer exists at a time: every `schedule` aborts the armed
/// timer and arms a fresh one.
pub struct ReloadScheduler {
    target: Arc<dyn ReloadTarget>,
    runtime: Handle,
    state: Mutex<SchedulerState>,
}

impl ReloadScheduler {
    pub fn new(target: Arc<dyn ReloadTarget>, delay: Duration, runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            target,
            runtime,
            state: Mutex::new(SchedulerState {
                phase: ReloadPhase::Idle,
                timer: None,
                pending: false,
                delay,
                completed_cycles: 0,
                cancelled: false,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn target(&self) -> &Arc<dyn ReloadTarget> {
        &self.target
    }

    pub fn phase(&self) -> ReloadPhase {
        self.lock().phase
    }

    pub fn delay(&self) -> Duration {
        self.lock().delay
    }

    /// Applies from the next armed timer on.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    /// Number of rebuilds run to completion, successful or not.
    pub fn completed_cycles(&self) -> u64 {
        self.lock().completed_cycles
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Note a change: (re)arm the debounce timer, or mark a follow-up cycle
    /// if a rebuild is running.
    pub fn schedule(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.cancelled {
            return;
        }
        if state.phase == ReloadPhase::Rebuilding {
            state.pending = true;
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        // The deadline is fixed here, not when the task is first polled.
        let sleep = {
            let _guard = self.runtime.enter();
            tokio::time::sleep(state.delay)
        };
        let this = Arc::clone(self);
        state.timer = Some(self.runtime.spawn(async move {
            sleep.await;
            this.fire();
        }));
        state.phase = ReloadPhase::Debouncing;
    }

    fn fire(self: &Arc<Self>) {
        {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.timer = None;
            state.phase = ReloadPhase::Rebuilding;
        }

        if let Err(e) = self.target.reload() {
            log::error!("Reload failed: {}", e);
        }

        let rerun = {
            let mut state = self.lock();
            state.completed_cycles += 1;
            state.phase = ReloadPhase::Idle;
            std::mem::take(&mut state.pending)
        };
        if rerun {
            self.target
                .log(LogCategory::Fine, "Changes arrived during rebuild, scheduling another reload.");
            self.schedule();
        }
    }

    /// Abort any armed timer and refuse further scheduling.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        state.pending = false;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if state.phase == ReloadPhase::Debouncing {
            state.phase = ReloadPhase::Idle;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}

impl fmt::Debug for ReloadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ReloadScheduler")
            .field("phase", &state.phase)
            .field("pending", &state.pending)
            .field("delay", &state.delay)
            .field("completed_cycles", &state.completed_cycles)
            .finish()
    }
}
