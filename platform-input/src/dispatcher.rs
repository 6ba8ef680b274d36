//! Protocol dispatch: the outbound sink plus the relative-motion flush timer.

use crate::mouse::MotionAccumulator;
use crate::timer::{TimerDriver, TimerId, TimerMode};
use std::sync::Arc;
use std::time::Duration;
use stream_protocol::InputSink;
use tracing::debug;

/// Owns the outbound sink and batches relative mouse motion.
///
/// Relative motion is never sent per event. It accumulates and a periodic
/// timer sends whatever is pending, which keeps packet rate bounded no matter
/// how fast the mouse reports.
pub struct Dispatcher {
    sink: Arc<dyn InputSink>,
    motion: Arc<MotionAccumulator>,
    timers: Arc<dyn TimerDriver>,
    flush_timer: TimerId,
}

impl Dispatcher {
    /// Start flushing motion every `interval`.
    pub fn new(sink: Arc<dyn InputSink>, timers: Arc<dyn TimerDriver>, interval: Duration) -> Self {
        let motion = Arc::new(MotionAccumulator::new());

        let flush_sink = Arc::clone(&sink);
        let flush_motion = Arc::clone(&motion);
        let flush_timer = timers.schedule(
            interval,
            TimerMode::Repeating,
            Box::new(move || {
                if let Some((dx, dy)) = flush_motion.drain() {
                    flush_sink.send_mouse_move_event(dx, dy);
                }
            }),
        );
        debug!(?interval, "Mouse flush timer started");

        Self {
            sink,
            motion,
            timers,
            flush_timer,
        }
    }

    /// The outbound sink.
    pub fn sink(&self) -> &dyn InputSink {
        self.sink.as_ref()
    }

    /// Queue relative motion for the next flush.
    pub fn add_motion(&self, dx: i32, dy: i32) {
        self.motion.add(dx, dy);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.timers.cancel(self.flush_timer);
    }
}
