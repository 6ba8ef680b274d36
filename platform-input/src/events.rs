//! Raw inbound events, already detached from any particular windowing library.

use crate::keyboard::{KeyMods, Keycode, Scancode};
use std::time::Instant;

/// Which device produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerSource {
    /// A real mouse or trackpad.
    Mouse,
    /// Synthesized by the platform from touch input.
    Touch,
}

/// Kind of touch device reporting finger events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchDevice {
    /// Touch screen: coordinates map onto the window.
    Direct,
    /// Trackpad-class device: coordinates are device-relative.
    Indirect,
}

/// Finger transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// Finger touched down.
    Down,
    /// Finger moved.
    Motion,
    /// Finger lifted (or the touch was cancelled).
    Up,
}

/// Keyboard press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Physical key position.
    pub scancode: Scancode,
    /// Logical key under the active layout.
    pub keycode: Keycode,
    /// Modifier bits at the time of the event.
    pub mods: KeyMods,
    /// Press (`true`) or release.
    pub pressed: bool,
    /// Auto-repeat of a key already held.
    pub repeat: bool,
}

/// Mouse button press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub source: PointerSource,
    /// Platform button number: 1 left, 2 middle, 3 right, 4 and 5 side buttons.
    pub button: u8,
    pub pressed: bool,
}

/// Pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMotionEvent {
    pub source: PointerSource,
    /// Cursor position in window coordinates. Raw device motion has none.
    pub position: Option<(i32, i32)>,
    pub xrel: i32,
    pub yrel: i32,
}

/// Wheel movement in clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheelEvent {
    pub source: PointerSource,
    pub x: i32,
    pub y: i32,
}

/// One finger transition with normalized `[0, 1]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub device: TouchDevice,
    pub phase: TouchPhase,
    pub finger_id: i64,
    pub x: f32,
    pub y: f32,
    /// Fingers touching the device after this event was generated.
    pub fingers: u32,
    pub timestamp: Instant,
}

/// Controller analog axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    TriggerLeft,
    TriggerRight,
    /// Anything the host has no slot for.
    Other(u8),
}

/// Controller digital buttons, in platform order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerButton {
    A,
    B,
    X,
    Y,
    Back,
    Guide,
    Start,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    /// Paddles, touchpad click, misc buttons.
    Other(u8),
}

/// Axis motion on one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerAxisEvent {
    pub instance_id: u32,
    pub axis: ControllerAxis,
    pub value: i16,
}

/// Button transition on one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerButtonEvent {
    pub instance_id: u32,
    pub button: ControllerButton,
    pub pressed: bool,
    pub timestamp: Instant,
}

/// Every raw event the input pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    MouseButton(MouseButtonEvent),
    MouseMotion(MouseMotionEvent),
    MouseWheel(MouseWheelEvent),
    Touch(TouchEvent),
    ControllerAxis(ControllerAxisEvent),
    ControllerButton(ControllerButtonEvent),
    /// A controller was plugged in; `device_index` is what the backend opens.
    ControllerAdded { device_index: u32 },
    /// A controller went away.
    ControllerRemoved { instance_id: u32 },
    /// Window gained focus; `left_button_down_inside` when the user clicked
    /// into the client area to activate it.
    FocusGained { left_button_down_inside: bool },
    /// Window lost focus.
    FocusLost,
    /// Window drawable changed size.
    Resized { width: u32, height: u32 },
}

/// Access to events still queued behind the one being handled.
///
/// Lets axis motion for one controller be coalesced into a single send.
pub trait EventBacklog {
    /// Look at the next queued event without removing it.
    fn peek(&self) -> Option<&InputEvent>;
    /// Remove the next queued event.
    fn pop(&mut self) -> Option<InputEvent>;
}

impl EventBacklog for std::collections::VecDeque<InputEvent> {
    fn peek(&self) -> Option<&InputEvent> {
        self.front()
    }

    fn pop(&mut self) -> Option<InputEvent> {
        self.pop_front()
    }
}

/// Backlog for callers that hand events over one at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBacklog;

impl EventBacklog for NoBacklog {
    fn peek(&self) -> Option<&InputEvent> {
        None
    }

    fn pop(&mut self) -> Option<InputEvent> {
        None
    }
}
