//! Timer service for the input pipeline.
//!
//! Three timers exist: the relative-motion flush, the long-press detector and
//! the gamepad mouse-emulation poll. They fire on a thread that is not the
//! event thread, so their callbacks must only touch thread-safe state.

use crate::errors::InputError;
use crate::gamepad::SlotHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Whether a timer fires once or keeps firing every `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Once,
    Repeating,
}

/// Timer expiry handed back to the event thread.
///
/// Callbacks never touch tracker state directly; the owner checks these
/// against current state before acting, so a late fire is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The touch long-press armed under `generation` expired.
    LongPress { generation: u64 },
    /// Mouse-emulation poll for a gamepad slot.
    MouseEmulation { slot: SlotHandle },
}

/// Callback run when a timer fires.
pub type TimerTask = Box<dyn FnMut() + Send + 'static>;

/// Something that can run callbacks later.
///
/// Cancellation is best-effort: a callback already in flight may still run
/// once after [`TimerDriver::cancel`] returns.
pub trait TimerDriver: Send + Sync {
    /// Schedule `task` to run after `delay` (and every `delay` after that if
    /// repeating).
    fn schedule(&self, delay: Duration, mode: TimerMode, task: TimerTask) -> TimerId;

    /// Stop a timer. Unknown or already-finished ids are ignored.
    fn cancel(&self, id: TimerId);
}

/// Timer driver backed by a private single-worker tokio runtime.
pub struct TokioTimerDriver {
    runtime: Option<Runtime>,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl TokioTimerDriver {
    /// Start the timer thread.
    pub fn new() -> Result<Self, InputError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("input-timers")
            .enable_time()
            .build()?;

        Ok(Self {
            runtime: Some(runtime),
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }
}

impl TimerDriver for TokioTimerDriver {
    fn schedule(&self, delay: Duration, mode: TimerMode, mut task: TimerTask) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let Some(runtime) = &self.runtime else {
            return TimerId(id);
        };

        // interval_at panics on a zero period
        let delay = delay.max(Duration::from_millis(1));
        let handle = runtime.spawn(async move {
            match mode {
                TimerMode::Once => {
                    tokio::time::sleep(delay).await;
                    task();
                }
                TimerMode::Repeating => {
                    let start = tokio::time::Instant::now() + delay;
                    let mut ticker = tokio::time::interval_at(start, delay);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        ticker.tick().await;
                        task();
                    }
                }
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(id, handle);
        trace!(id, ?delay, ?mode, "Timer scheduled");
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        if let Some(handle) = self.tasks.lock().remove(&id.0) {
            handle.abort();
            trace!(id = id.0, "Timer cancelled");
        }
    }
}

impl Drop for TokioTimerDriver {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        debug!("Timer thread stopped");
    }
}

struct ManualTimer {
    id: u64,
    due: Duration,
    period: Option<Duration>,
    task: Option<TimerTask>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
}

/// Deterministic timer driver with a virtual clock.
///
/// Nothing fires until [`ManualTimerDriver::advance`] is called; callbacks then
/// run on the calling thread in due order.
#[derive(Default)]
pub struct ManualTimerDriver {
    state: Mutex<ManualState>,
}

impl ManualTimerDriver {
    /// Create a driver with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of live timers.
    pub fn pending(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Move the clock forward, firing every timer that comes due on the way.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;

        loop {
            let (id, mut task) = {
                let mut state = self.state.lock();
                let next = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target && t.task.is_some())
                    .min_by_key(|(_, t)| (t.due, t.id))
                    .map(|(pos, _)| pos);
                let Some(pos) = next else {
                    state.now = target;
                    return;
                };
                let timer = &mut state.timers[pos];
                let (id, due) = (timer.id, timer.due);
                let Some(task) = timer.task.take() else {
                    return;
                };
                state.now = due;
                (id, task)
            };

            task();

            let mut state = self.state.lock();
            if let Some(pos) = state.timers.iter().position(|t| t.id == id) {
                let period = state.timers[pos].period;
                match period {
                    Some(period) => {
                        let timer = &mut state.timers[pos];
                        timer.due += period;
                        timer.task = Some(task);
                    }
                    None => {
                        state.timers.remove(pos);
                    }
                }
            }
        }
    }
}

impl TimerDriver for ManualTimerDriver {
    fn schedule(&self, delay: Duration, mode: TimerMode, task: TimerTask) -> TimerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let delay = delay.max(Duration::from_millis(1));
        let due = state.now + delay;
        state.timers.push(ManualTimer {
            id,
            due,
            period: (mode == TimerMode::Repeating).then_some(delay),
            task: Some(task),
        });
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        self.state.lock().timers.retain(|t| t.id != id.0);
    }
}
