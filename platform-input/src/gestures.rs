//! Touch screen gestures: tap to click, long-press to right-click.
//!
//! Only the primary finger (the one that last touched down) drives the
//! pointer. A second finger landing while one is already down is ignored,
//! as is any motion or lift from a finger other than the primary one.

use crate::events::{TouchDevice, TouchEvent, TouchPhase};
use crate::mouse::PointerMapper;
use crate::timer::{TimerDriver, TimerEvent, TimerId, TimerMode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stream_protocol::{ButtonAction, InputSink, MouseButton};
use tracing::{debug, trace};

/// How long a finger must stay put to become a right-click.
pub const LONG_PRESS_ACTIVATION_DELAY: Duration = Duration::from_millis(650);
/// Normalized distance a finger may drift before the long-press is cancelled.
pub const LONG_PRESS_ACTIVATION_DELTA: f32 = 0.01;
/// A second tap within this window does not move the pointer.
pub const DOUBLE_TAP_DEAD_ZONE_DELAY: Duration = Duration::from_millis(250);
/// ...as long as it lands within this normalized distance of the lift.
pub const DOUBLE_TAP_DEAD_ZONE_DELTA: f32 = 0.025;

#[derive(Debug, Clone, Copy)]
struct TouchPoint {
    finger_id: i64,
    x: f32,
    y: f32,
    timestamp: Instant,
}

impl TouchPoint {
    fn of(ev: &TouchEvent) -> Self {
        Self {
            finger_id: ev.finger_id,
            x: ev.x,
            y: ev.y,
            timestamp: ev.timestamp,
        }
    }

    fn distance(&self, x: f32, y: f32) -> f32 {
        (x - self.x).hypot(y - self.y)
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmedLongPress {
    timer: TimerId,
    generation: u64,
}

/// Primary-finger gesture state.
pub struct TouchTracker {
    timers: Arc<dyn TimerDriver>,
    timer_events: flume::Sender<TimerEvent>,
    last_down: Option<TouchPoint>,
    last_up: Option<TouchPoint>,
    long_press: Option<ArmedLongPress>,
    generation: u64,
}

impl TouchTracker {
    /// Create a tracker whose long-press timer reports through `timer_events`.
    pub fn new(timers: Arc<dyn TimerDriver>, timer_events: flume::Sender<TimerEvent>) -> Self {
        Self {
            timers,
            timer_events,
            last_down: None,
            last_up: None,
            long_press: None,
            generation: 0,
        }
    }

    /// A long-press timer is armed.
    pub fn long_press_armed(&self) -> bool {
        self.long_press.is_some()
    }

    fn disarm(&mut self) {
        if let Some(armed) = self.long_press.take() {
            self.timers.cancel(armed.timer);
        }
    }

    fn arm(&mut self) {
        self.disarm();
        self.generation += 1;
        let generation = self.generation;
        let tx = self.timer_events.clone();
        let timer = self.timers.schedule(
            LONG_PRESS_ACTIVATION_DELAY,
            TimerMode::Once,
            Box::new(move || {
                let _ = tx.send(TimerEvent::LongPress { generation });
            }),
        );
        self.long_press = Some(ArmedLongPress { timer, generation });
    }

    /// Handle one finger event.
    pub fn handle(&mut self, ev: &TouchEvent, mapper: &PointerMapper, sink: &dyn InputSink) {
        if ev.device != TouchDevice::Direct {
            trace!("Ignoring indirect touch device");
            return;
        }

        let is_down = ev.phase == TouchPhase::Down;
        if is_down && ev.fingers > 1 {
            return;
        }
        if !is_down && self.last_down.map(|d| d.finger_id) != Some(ev.finger_id) {
            return;
        }

        if let Some(down) = self.last_down {
            if down.distance(ev.x, ev.y) > LONG_PRESS_ACTIVATION_DELTA {
                self.disarm();
            }
        }

        let in_double_tap_zone = is_down
            && self.last_up.is_some_and(|up| {
                ev.timestamp.saturating_duration_since(up.timestamp) <= DOUBLE_TAP_DEAD_ZONE_DELAY
                    && up.distance(ev.x, ev.y) <= DOUBLE_TAP_DEAD_ZONE_DELTA
            });
        if !in_double_tap_zone {
            let p = mapper.map_normalized(ev.x, ev.y);
            sink.send_mouse_position_event(p.x, p.y, p.reference_width, p.reference_height);
        }

        match ev.phase {
            TouchPhase::Down => {
                self.last_down = Some(TouchPoint::of(ev));
                self.arm();
                sink.send_mouse_button_event(ButtonAction::Press, MouseButton::Left);
            }
            TouchPhase::Up => {
                self.last_up = Some(TouchPoint::of(ev));
                self.disarm();
                sink.send_mouse_button_event(ButtonAction::Release, MouseButton::Left);
                // A long-press may have turned this into a right-click
                sink.send_mouse_button_event(ButtonAction::Release, MouseButton::Right);
            }
            TouchPhase::Motion => {}
        }
    }

    /// The long-press timer fired. Stale generations are ignored.
    pub fn on_long_press(&mut self, generation: u64, sink: &dyn InputSink) {
        match self.long_press {
            Some(armed) if armed.generation == generation => {
                self.long_press = None;
                debug!("Long press, converting to right click");
                sink.send_mouse_button_event(ButtonAction::Release, MouseButton::Left);
                sink.send_mouse_button_event(ButtonAction::Press, MouseButton::Right);
            }
            _ => trace!(generation, "Stale long-press timer"),
        }
    }
}

impl Drop for TouchTracker {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimerDriver;
    use pretty_assertions::assert_eq;
    use stream_protocol::{InputPacket, RecordingSink};

    struct Rig {
        timers: Arc<ManualTimerDriver>,
        rx: flume::Receiver<TimerEvent>,
        tracker: TouchTracker,
        mapper: PointerMapper,
        sink: RecordingSink,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            let timers = Arc::new(ManualTimerDriver::new());
            let (tx, rx) = flume::unbounded();
            let tracker = TouchTracker::new(timers.clone(), tx);
            Self {
                timers,
                rx,
                tracker,
                mapper: PointerMapper::new(1000, 1000, 1000, 1000),
                sink: RecordingSink::new(),
                t0: Instant::now(),
            }
        }

        fn touch(&mut self, phase: TouchPhase, finger_id: i64, x: f32, y: f32, at_ms: u64, fingers: u32) {
            let ev = TouchEvent {
                device: TouchDevice::Direct,
                phase,
                finger_id,
                x,
                y,
                fingers,
                timestamp: self.t0 + Duration::from_millis(at_ms),
            };
            self.tracker.handle(&ev, &self.mapper, &self.sink);
        }

        fn pump_timers(&mut self) {
            for ev in self.rx.try_iter().collect::<Vec<_>>() {
                if let TimerEvent::LongPress { generation } = ev {
                    self.tracker.on_long_press(generation, &self.sink);
                }
            }
        }
    }

    fn press(b: MouseButton) -> InputPacket {
        InputPacket::MouseButton {
            action: ButtonAction::Press,
            button: b,
        }
    }

    fn release(b: MouseButton) -> InputPacket {
        InputPacket::MouseButton {
            action: ButtonAction::Release,
            button: b,
        }
    }

    fn pos(x: i16, y: i16) -> InputPacket {
        InputPacket::MousePosition {
            x,
            y,
            reference_width: 1000,
            reference_height: 1000,
        }
    }

    #[test]
    fn test_tap() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 7, 0.5, 0.25, 0, 1);
        rig.touch(TouchPhase::Up, 7, 0.5, 0.25, 80, 0);

        assert_eq!(
            rig.sink.take(),
            vec![
                pos(500, 250),
                press(MouseButton::Left),
                pos(500, 250),
                release(MouseButton::Left),
                release(MouseButton::Right),
            ]
        );
        assert!(!rig.tracker.long_press_armed());
    }

    #[test]
    fn test_second_finger_ignored() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.1, 0.1, 0, 1);
        rig.sink.take();

        rig.touch(TouchPhase::Down, 2, 0.9, 0.9, 10, 2);
        rig.touch(TouchPhase::Motion, 2, 0.8, 0.8, 20, 2);
        rig.touch(TouchPhase::Up, 2, 0.8, 0.8, 30, 1);
        assert!(rig.sink.is_empty());
    }

    #[test]
    fn test_double_tap_dead_zone() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.touch(TouchPhase::Up, 1, 0.5, 0.5, 50, 0);
        rig.sink.take();

        rig.touch(TouchPhase::Down, 2, 0.515625, 0.515625, 200, 1);
        assert_eq!(rig.sink.take(), vec![press(MouseButton::Left)]);
    }

    #[test]
    fn test_slow_second_tap_repositions() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.touch(TouchPhase::Up, 1, 0.5, 0.5, 50, 0);
        rig.sink.take();

        rig.touch(TouchPhase::Down, 2, 0.515625, 0.515625, 400, 1);
        assert_eq!(
            rig.sink.take(),
            vec![pos(515, 515), press(MouseButton::Left)]
        );
    }

    #[test]
    fn test_long_press_fires_once() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.sink.take();

        rig.timers.advance(LONG_PRESS_ACTIVATION_DELAY);
        rig.pump_timers();
        assert_eq!(
            rig.sink.take(),
            vec![release(MouseButton::Left), press(MouseButton::Right)]
        );

        rig.timers.advance(Duration::from_secs(5));
        rig.pump_timers();
        assert!(rig.sink.is_empty());
    }

    #[test]
    fn test_movement_cancels_long_press() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.touch(TouchPhase::Motion, 1, 0.53, 0.5, 100, 1);
        assert!(!rig.tracker.long_press_armed());
        rig.sink.take();

        rig.timers.advance(Duration::from_secs(1));
        rig.pump_timers();
        assert!(rig.sink.is_empty());
    }

    #[test]
    fn test_small_jitter_keeps_long_press() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.touch(TouchPhase::Motion, 1, 0.505, 0.5, 100, 1);
        assert!(rig.tracker.long_press_armed());
    }

    #[test]
    fn test_stale_generation_ignored() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 0, 1);
        rig.touch(TouchPhase::Up, 1, 0.5, 0.5, 100, 0);
        rig.touch(TouchPhase::Down, 1, 0.5, 0.5, 600, 1);
        rig.sink.take();

        // Generation 1 belonged to the first touch
        rig.tracker.on_long_press(1, &rig.sink);
        assert!(rig.sink.is_empty());
        assert!(rig.tracker.long_press_armed());
    }

    #[test]
    fn test_indirect_device_ignored() {
        let mut rig = Rig::new();
        let ev = TouchEvent {
            device: TouchDevice::Indirect,
            phase: TouchPhase::Down,
            finger_id: 1,
            x: 0.5,
            y: 0.5,
            fingers: 1,
            timestamp: rig.t0,
        };
        rig.tracker.handle(&ev, &rig.mapper, &rig.sink);
        assert!(rig.sink.is_empty());
    }
}
