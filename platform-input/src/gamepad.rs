//! Gamepad slot tracking, state reporting and mouse emulation.
//!
//! Controllers live in a fixed arena of [`MAX_GAMEPADS`] slots. A new
//! controller takes the lowest free slot; in multi-controller mode the slot
//! number is also the index the host sees. Every slot carries a generation
//! counter so a timer that fires after its controller was unplugged (and the
//! slot perhaps reused) can tell it is stale.

use crate::errors::InputError;
use crate::events::{
    ControllerAxis, ControllerAxisEvent, ControllerButton, ControllerButtonEvent, EventBacklog,
    InputEvent,
};
use crate::haptics::{self, HapticCaps, HapticMethod};
use crate::handler::SessionAction;
use crate::timer::{TimerDriver, TimerEvent, TimerId, TimerMode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stream_protocol::{
    ButtonAction, ControllerButtons, ControllerPacket, InputSink, MouseButton,
};
use tracing::{debug, info, trace, warn};

pub use stream_protocol::MAX_GAMEPADS;

/// Holding start longer than this toggles mouse emulation.
pub const MOUSE_EMULATION_LONG_PRESS_TIME: Duration = Duration::from_millis(750);
/// Mouse emulation poll period.
pub const MOUSE_EMULATION_POLLING_INTERVAL: Duration = Duration::from_millis(50);
/// Stick deflection multiplier applied before the cubic curve.
pub const MOUSE_EMULATION_MOTION_MULTIPLIER: f32 = 4.0;
/// Motion below this (after the curve) is ignored.
pub const MOUSE_EMULATION_DEADZONE: f32 = 2.0;

/// An opened controller.
///
/// Dropping the device closes it. Haptic methods have no-op or failing
/// defaults so backends only implement what the hardware offers.
pub trait GamepadDevice {
    /// Stable id the platform uses in this controller's events.
    fn instance_id(&self) -> u32;

    /// Product name for diagnostics.
    fn name(&self) -> String {
        "<unknown>".to_string()
    }

    /// Light the player indicator, where the device has one.
    fn set_player_index(&mut self, _index: i16) {}

    /// Native dual-motor rumble; zero magnitudes stop it.
    fn rumble(&mut self, _low_freq: u16, _high_freq: u16, _duration_ms: u32) -> Result<(), InputError> {
        Err(InputError::Haptic("dual-motor rumble unsupported".to_string()))
    }

    /// Legacy haptic effects this device supports.
    fn haptic_caps(&self) -> HapticCaps {
        HapticCaps::empty()
    }

    /// Start an infinite left/right effect, replacing any previous one.
    fn play_left_right(&mut self, _large: u16, _small: u16) -> Result<(), InputError> {
        Err(InputError::Haptic("left/right effect unsupported".to_string()))
    }

    /// Destroy the current left/right effect, if any.
    fn stop_left_right(&mut self) {}

    /// Start an infinite simple rumble of `strength` in `0.0..=1.0`.
    fn play_simple_rumble(&mut self, _strength: f32) -> Result<(), InputError> {
        Err(InputError::Haptic("simple rumble unsupported".to_string()))
    }

    /// Stop the simple rumble.
    fn stop_simple_rumble(&mut self) {}
}

/// Opens controllers announced by the platform.
pub trait GamepadBackend {
    /// Open the controller at `device_index`.
    fn open(&mut self, device_index: u32) -> Result<Box<dyn GamepadDevice>, InputError>;
}

/// Generation-checked reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: usize,
    generation: u32,
}

impl SlotHandle {
    /// Arena position.
    pub fn slot(&self) -> usize {
        self.index
    }
}

/// Analog and digital inputs of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadInputs {
    pub buttons: ControllerButtons,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_stick_x: i16,
    pub left_stick_y: i16,
    pub right_stick_x: i16,
    pub right_stick_y: i16,
}

impl GamepadInputs {
    fn packet(&self, index: i16, active_mask: i16) -> ControllerPacket {
        ControllerPacket {
            index,
            active_mask,
            buttons: self.buttons,
            left_trigger: self.left_trigger,
            right_trigger: self.right_trigger,
            left_stick_x: self.left_stick_x,
            left_stick_y: self.left_stick_y,
            right_stick_x: self.right_stick_x,
            right_stick_y: self.right_stick_y,
        }
    }

    /// Store one axis value. Returns `false` for axes the host has no slot for.
    pub fn set_axis(&mut self, axis: ControllerAxis, value: i16) -> bool {
        match axis {
            ControllerAxis::LeftX => self.left_stick_x = value,
            ControllerAxis::LeftY => self.left_stick_y = invert_stick_y(value),
            ControllerAxis::RightX => self.right_stick_x = value,
            ControllerAxis::RightY => self.right_stick_y = invert_stick_y(value),
            ControllerAxis::TriggerLeft => self.left_trigger = scale_trigger(value),
            ControllerAxis::TriggerRight => self.right_trigger = scale_trigger(value),
            ControllerAxis::Other(_) => return false,
        }
        true
    }
}

/// Platform sticks report positive Y as down; the host wants up.
///
/// `-32768` cannot be negated in 16 bits, so it is capped at `-32767` first.
pub fn invert_stick_y(value: i16) -> i16 {
    -value.max(-i16::MAX)
}

/// Scale a `0..=32767` trigger reading to a byte.
pub fn scale_trigger(value: i16) -> u8 {
    (i32::from(value.max(0)) * 255 / i32::from(i16::MAX)) as u8
}

/// Host flag for a platform button.
pub fn button_flag(button: ControllerButton) -> Option<ControllerButtons> {
    Some(match button {
        ControllerButton::A => ControllerButtons::A,
        ControllerButton::B => ControllerButtons::B,
        ControllerButton::X => ControllerButtons::X,
        ControllerButton::Y => ControllerButtons::Y,
        ControllerButton::Back => ControllerButtons::BACK,
        ControllerButton::Guide => ControllerButtons::SPECIAL,
        ControllerButton::Start => ControllerButtons::PLAY,
        ControllerButton::LeftStick => ControllerButtons::LS_CLK,
        ControllerButton::RightStick => ControllerButtons::RS_CLK,
        ControllerButton::LeftShoulder => ControllerButtons::LB,
        ControllerButton::RightShoulder => ControllerButtons::RB,
        ControllerButton::DpadUp => ControllerButtons::UP,
        ControllerButton::DpadDown => ControllerButtons::DOWN,
        ControllerButton::DpadLeft => ControllerButtons::LEFT,
        ControllerButton::DpadRight => ControllerButtons::RIGHT,
        ControllerButton::Other(_) => return None,
    })
}

fn emulated_mouse_button(button: ControllerButton) -> Option<MouseButton> {
    match button {
        ControllerButton::A => Some(MouseButton::Left),
        ControllerButton::B => Some(MouseButton::Right),
        ControllerButton::X => Some(MouseButton::Middle),
        ControllerButton::LeftShoulder => Some(MouseButton::X1),
        ControllerButton::RightShoulder => Some(MouseButton::X2),
        _ => None,
    }
}

fn emulation_axis(raw: i16) -> f32 {
    let delta = (f32::from(raw) / 32766.0 * MOUSE_EMULATION_MOTION_MULTIPLIER).powi(3);
    if delta.abs() > MOUSE_EMULATION_DEADZONE {
        delta - MOUSE_EMULATION_DEADZONE.copysign(delta)
    } else {
        0.0
    }
}

/// Pointer motion for one mouse-emulation tick, from whichever stick is
/// deflected further. `None` when both axes are inside the deadzone.
pub fn emulation_delta(inputs: &GamepadInputs) -> Option<(i16, i16)> {
    let magnitude = |x: i16, y: i16| x.unsigned_abs() as u32 + y.unsigned_abs() as u32;

    // Stored Y is already "up is positive"; pointer Y grows downward.
    let (raw_x, raw_y) = if magnitude(inputs.left_stick_x, inputs.left_stick_y)
        > magnitude(inputs.right_stick_x, inputs.right_stick_y)
    {
        (inputs.left_stick_x, inputs.left_stick_y.saturating_neg())
    } else {
        (inputs.right_stick_x, inputs.right_stick_y.saturating_neg())
    };

    let dx = emulation_axis(raw_x) as i16;
    let dy = emulation_axis(raw_y) as i16;
    (dx != 0 || dy != 0).then_some((dx, dy))
}

struct GamepadSlot {
    device: Box<dyn GamepadDevice>,
    instance_id: u32,
    index: i16,
    inputs: GamepadInputs,
    haptic: HapticMethod,
    emulation_timer: Option<TimerId>,
    last_start_down: Option<Instant>,
}

#[derive(Default)]
struct SlotEntry {
    generation: u32,
    slot: Option<GamepadSlot>,
}

/// Tracks every attached controller.
pub struct GamepadManager {
    backend: Box<dyn GamepadBackend>,
    slots: [SlotEntry; MAX_GAMEPADS],
    multi_controller: bool,
    gamepad_mouse: bool,
    timers: Arc<dyn TimerDriver>,
    timer_events: flume::Sender<TimerEvent>,
}

impl GamepadManager {
    /// Create an empty arena.
    pub fn new(
        backend: Box<dyn GamepadBackend>,
        multi_controller: bool,
        gamepad_mouse: bool,
        timers: Arc<dyn TimerDriver>,
        timer_events: flume::Sender<TimerEvent>,
    ) -> Self {
        Self {
            backend,
            slots: Default::default(),
            multi_controller,
            gamepad_mouse,
            timers,
            timer_events,
        }
    }

    /// Bitmask of attached controller indices.
    ///
    /// In single-controller mode the host always sees exactly player one.
    pub fn active_mask(&self) -> i16 {
        if !self.multi_controller {
            return 0x1;
        }
        self.slots
            .iter()
            .filter_map(|e| e.slot.as_ref())
            .fold(0, |mask, s| mask | (1 << s.index))
    }

    /// Number of attached controllers.
    pub fn attached(&self) -> usize {
        self.slots.iter().filter(|e| e.slot.is_some()).count()
    }

    /// Host index of an attached controller.
    pub fn index_of(&self, instance_id: u32) -> Option<i16> {
        self.slot_of(instance_id).map(|s| s.index)
    }

    /// Haptic method chosen for an attached controller.
    pub fn haptic_method(&self, instance_id: u32) -> Option<HapticMethod> {
        self.slot_of(instance_id).map(|s| s.haptic)
    }

    /// Whether the controller is currently driving the mouse.
    pub fn is_emulating_mouse(&self, instance_id: u32) -> bool {
        self.slot_of(instance_id)
            .is_some_and(|s| s.emulation_timer.is_some())
    }

    fn slot_of(&self, instance_id: u32) -> Option<&GamepadSlot> {
        self.slots
            .iter()
            .filter_map(|e| e.slot.as_ref())
            .find(|s| s.instance_id == instance_id)
    }

    fn find(&self, instance_id: u32) -> Option<usize> {
        self.slots.iter().position(|e| {
            e.slot
                .as_ref()
                .is_some_and(|s| s.instance_id == instance_id)
        })
    }

    fn send_state(&self, pos: usize, sink: &dyn InputSink) {
        if let Some(slot) = &self.slots[pos].slot {
            let packet = slot.inputs.packet(slot.index, self.active_mask());
            sink.send_multi_controller_event(packet);
        }
    }

    /// Open and register a newly attached controller.
    pub fn attach(&mut self, device_index: u32, sink: &dyn InputSink) -> Option<SlotHandle> {
        let mut device = match self.backend.open(device_index) {
            Ok(device) => device,
            Err(e) => {
                warn!(device_index, error = %e, "Failed to open gamepad");
                return None;
            }
        };

        let Some(pos) = self.slots.iter().position(|e| e.slot.is_none()) else {
            warn!(device_index, "No open gamepad slots found");
            // Dropping the device closes it
            return None;
        };

        let index = if self.multi_controller { pos as i16 } else { 0 };
        if self.multi_controller {
            device.set_player_index(index);
        }

        let haptic = HapticMethod::detect(device.as_mut());
        let instance_id = device.instance_id();
        info!(
            slot = pos,
            player = index,
            instance_id,
            name = %device.name(),
            ?haptic,
            "Gamepad attached"
        );

        let entry = &mut self.slots[pos];
        entry.generation = entry.generation.wrapping_add(1);
        entry.slot = Some(GamepadSlot {
            device,
            instance_id,
            index,
            inputs: GamepadInputs::default(),
            haptic,
            emulation_timer: None,
            last_start_down: None,
        });
        let handle = SlotHandle {
            index: pos,
            generation: entry.generation,
        };

        // Let the host know we've arrived
        self.send_state(pos, sink);
        Some(handle)
    }

    /// Forget a controller that went away. Unknown ids are ignored.
    pub fn detach(&mut self, instance_id: u32, sink: &dyn InputSink, actions: &mut Vec<SessionAction>) {
        let Some(pos) = self.find(instance_id) else {
            trace!(instance_id, "Removal of untracked gamepad");
            return;
        };
        let Some(slot) = self.slots[pos].slot.take() else {
            return;
        };

        if let Some(timer) = slot.emulation_timer {
            self.timers.cancel(timer);
            actions.push(SessionAction::MouseEmulationChanged {
                controller: slot.index,
                active: false,
            });
        }

        info!(slot = pos, player = slot.index, "Gamepad is gone");
        // Mask is recomputed without this slot
        sink.send_multi_controller_event(ControllerPacket::neutral(slot.index, self.active_mask()));
    }

    /// Apply axis motion, folding in queued motion for the same controller.
    pub fn handle_axis(
        &mut self,
        ev: &ControllerAxisEvent,
        backlog: &mut dyn EventBacklog,
        sink: &dyn InputSink,
    ) {
        let Some(pos) = self.find(ev.instance_id) else {
            return;
        };
        let Some(slot) = self.slots[pos].slot.as_mut() else {
            return;
        };

        let mut current = *ev;
        loop {
            if !slot.inputs.set_axis(current.axis, current.value) {
                debug!(axis = ?current.axis, "Unhandled controller axis");
                return;
            }

            match backlog.peek() {
                Some(InputEvent::ControllerAxis(next)) if next.instance_id == ev.instance_id => {
                    current = *next;
                    backlog.pop();
                }
                _ => break,
            }
        }

        if slot.emulation_timer.is_none() {
            self.send_state(pos, sink);
        }
    }

    /// Apply a button transition.
    pub fn handle_button(
        &mut self,
        ev: &ControllerButtonEvent,
        sink: &dyn InputSink,
        actions: &mut Vec<SessionAction>,
    ) {
        let Some(pos) = self.find(ev.instance_id) else {
            return;
        };
        let Some(flag) = button_flag(ev.button) else {
            debug!(button = ?ev.button, "Unhandled controller button");
            return;
        };

        let mask = self.active_mask();
        let generation = self.slots[pos].generation;
        let gamepad_mouse = self.gamepad_mouse;
        let Some(slot) = self.slots[pos].slot.as_mut() else {
            return;
        };
        let emulating = slot.emulation_timer.is_some();

        if ev.pressed {
            slot.inputs.buttons.insert(flag);

            if ev.button == ControllerButton::Start {
                slot.last_start_down = Some(ev.timestamp);
            } else if emulating {
                if let Some(button) = emulated_mouse_button(ev.button) {
                    sink.send_mouse_button_event(ButtonAction::Press, button);
                } else if ev.button == ControllerButton::DpadUp {
                    sink.send_scroll_event(1);
                } else if ev.button == ControllerButton::DpadDown {
                    sink.send_scroll_event(-1);
                }
            }
        } else {
            slot.inputs.buttons.remove(flag);

            if ev.button == ControllerButton::Start {
                let held = slot
                    .last_start_down
                    .map(|down| ev.timestamp.saturating_duration_since(down));
                if held.is_some_and(|held| held > MOUSE_EMULATION_LONG_PRESS_TIME) {
                    if let Some(timer) = slot.emulation_timer.take() {
                        self.timers.cancel(timer);
                        info!(player = slot.index, "Mouse emulation deactivated");
                        actions.push(SessionAction::MouseEmulationChanged {
                            controller: slot.index,
                            active: false,
                        });
                    } else if gamepad_mouse {
                        // The host must see start released; nothing below will send it
                        sink.send_multi_controller_event(slot.inputs.packet(slot.index, mask));

                        let tx = self.timer_events.clone();
                        let handle = SlotHandle {
                            index: pos,
                            generation,
                        };
                        slot.emulation_timer = Some(self.timers.schedule(
                            MOUSE_EMULATION_POLLING_INTERVAL,
                            TimerMode::Repeating,
                            Box::new(move || {
                                let _ = tx.send(TimerEvent::MouseEmulation { slot: handle });
                            }),
                        ));
                        info!(player = slot.index, "Mouse emulation active");
                        actions.push(SessionAction::MouseEmulationChanged {
                            controller: slot.index,
                            active: true,
                        });
                    }
                }
            } else if emulating {
                if let Some(button) = emulated_mouse_button(ev.button) {
                    sink.send_mouse_button_event(ButtonAction::Release, button);
                }
            }
        }

        if slot.inputs.buttons == ControllerButtons::QUIT_CHORD {
            info!(player = slot.index, "Detected quit gamepad button combo");
            actions.push(SessionAction::Quit);
            sink.send_multi_controller_event(ControllerPacket::neutral(slot.index, mask));
            return;
        }

        if slot.emulation_timer.is_none() {
            sink.send_multi_controller_event(slot.inputs.packet(slot.index, mask));
        }
    }

    /// One mouse-emulation poll. Stale handles and stopped emulation are ignored.
    pub fn on_emulation_tick(&self, handle: SlotHandle, sink: &dyn InputSink) {
        let Some(entry) = self.slots.get(handle.index) else {
            return;
        };
        let live = entry.generation == handle.generation;
        let Some(slot) = entry.slot.as_ref().filter(|s| live && s.emulation_timer.is_some()) else {
            trace!(slot = handle.index, "Stale mouse emulation tick");
            return;
        };

        if let Some((dx, dy)) = emulation_delta(&slot.inputs) {
            sink.send_mouse_move_event(dx, dy);
        }
    }

    /// Forward a rumble request from the host.
    ///
    /// `controller` indexes the arena directly, matching how indices are
    /// handed out in multi-controller mode.
    pub fn rumble(&mut self, controller: u16, low_freq: u16, high_freq: u16) {
        let Some(slot) = self
            .slots
            .get_mut(usize::from(controller))
            .and_then(|e| e.slot.as_mut())
        else {
            return;
        };
        haptics::apply(slot.haptic, slot.device.as_mut(), low_freq, high_freq);
    }
}

impl Drop for GamepadManager {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut().filter_map(|e| e.slot.as_mut()) {
            if let Some(timer) = slot.emulation_timer.take() {
                self.timers.cancel(timer);
            }
        }
    }
}
