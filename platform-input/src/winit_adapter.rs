//! Translate winit window and device events into [`InputEvent`]s.
//!
//! winit 0.28 reports raw platform scancodes (evdev numbering on Linux and
//! the BSDs) plus a layout-dependent [`VirtualKeyCode`]. Physical positions
//! come from the scancode where the numbering is known and from the virtual
//! key otherwise.

use crate::capture::CursorControl;
use crate::events::{
    InputEvent, KeyEvent, MouseButtonEvent, MouseMotionEvent, MouseWheelEvent, PointerSource,
    TouchDevice, TouchEvent, TouchPhase,
};
use crate::keyboard::{KeyMods, Keycode, Scancode};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use winit::event::{
    DeviceEvent, ElementState, KeyboardInput, ModifiersState, MouseButton, MouseScrollDelta, Touch,
    TouchPhase as WinitTouchPhase, VirtualKeyCode, WindowEvent,
};
use winit::window::{CursorGrabMode, Window};

/// Stateful translator; one per window.
#[derive(Debug)]
pub struct WinitTranslator {
    mods: KeyMods,
    keys_down: HashSet<u32>,
    cursor: (i32, i32),
    cursor_inside: bool,
    left_down: bool,
    fingers: HashSet<u64>,
    window_size: (u32, u32),
    motion_remainder: (f64, f64),
}

impl WinitTranslator {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            mods: KeyMods::empty(),
            keys_down: HashSet::new(),
            cursor: (0, 0),
            cursor_inside: false,
            left_down: false,
            fingers: HashSet::new(),
            window_size: (window_width, window_height),
            motion_remainder: (0.0, 0.0),
        }
    }

    /// Translate a window event. Most events map to at most one input event.
    pub fn window_event(&mut self, event: &WindowEvent<'_>) -> Option<InputEvent> {
        match event {
            WindowEvent::ModifiersChanged(state) => {
                self.mods = mods_from_winit(*state);
                None
            }
            WindowEvent::KeyboardInput { input, .. } => self.key_input(input),
            WindowEvent::CursorEntered { .. } => {
                self.cursor_inside = true;
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_inside = false;
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as i32, position.y as i32);
                // Relative motion arrives as device events
                Some(InputEvent::MouseMotion(MouseMotionEvent {
                    source: PointerSource::Mouse,
                    position: Some(self.cursor),
                    xrel: 0,
                    yrel: 0,
                }))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                if *button == MouseButton::Left {
                    self.left_down = pressed;
                }
                Some(InputEvent::MouseButton(MouseButtonEvent {
                    source: PointerSource::Mouse,
                    button: button_number(*button)?,
                    pressed,
                }))
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = wheel_clicks(*delta);
                if x == 0 && y == 0 {
                    return None;
                }
                Some(InputEvent::MouseWheel(MouseWheelEvent {
                    source: PointerSource::Mouse,
                    x,
                    y,
                }))
            }
            WindowEvent::Touch(touch) => self.touch(touch),
            WindowEvent::Focused(true) => Some(InputEvent::FocusGained {
                left_button_down_inside: self.left_down && self.cursor_inside,
            }),
            WindowEvent::Focused(false) => {
                // Key-ups sent while unfocused never reach us
                self.keys_down.clear();
                Some(InputEvent::FocusLost)
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
                Some(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                })
            }
            _ => None,
        }
    }

    /// Translate a device event; only raw mouse motion is of interest.
    pub fn device_event(&mut self, event: &DeviceEvent) -> Option<InputEvent> {
        let DeviceEvent::MouseMotion { delta } = event else {
            return None;
        };

        let dx = delta.0 + self.motion_remainder.0;
        let dy = delta.1 + self.motion_remainder.1;
        let (xrel, yrel) = (dx.trunc(), dy.trunc());
        self.motion_remainder = (dx - xrel, dy - yrel);
        if xrel == 0.0 && yrel == 0.0 {
            return None;
        }

        // The window reports the matching position through CursorMoved
        Some(InputEvent::MouseMotion(MouseMotionEvent {
            source: PointerSource::Mouse,
            position: None,
            xrel: xrel as i32,
            yrel: yrel as i32,
        }))
    }

    /// Translate one keyboard transition. winit does not flag auto-repeat,
    /// so a press of a key already down is reported as a repeat.
    pub fn key_input(&mut self, input: &KeyboardInput) -> Option<InputEvent> {
        let pressed = input.state == ElementState::Pressed;
        let repeat = if pressed {
            !self.keys_down.insert(input.scancode)
        } else {
            self.keys_down.remove(&input.scancode);
            false
        };

        let scancode = physical_scancode(input.scancode, input.virtual_keycode);
        let keycode = input
            .virtual_keycode
            .map_or(Keycode::UNKNOWN, logical_keycode);
        if scancode == Scancode::UNKNOWN && keycode == Keycode::UNKNOWN {
            debug!(raw = input.scancode, "Unidentified key");
            return None;
        }

        Some(InputEvent::Key(KeyEvent {
            scancode,
            keycode,
            mods: self.mods,
            pressed,
            repeat,
        }))
    }

    fn touch(&mut self, touch: &Touch) -> Option<InputEvent> {
        let phase = match touch.phase {
            WinitTouchPhase::Started => {
                self.fingers.insert(touch.id);
                TouchPhase::Down
            }
            WinitTouchPhase::Moved => TouchPhase::Motion,
            WinitTouchPhase::Ended | WinitTouchPhase::Cancelled => {
                self.fingers.remove(&touch.id);
                TouchPhase::Up
            }
        };

        let (w, h) = self.window_size;
        if w == 0 || h == 0 {
            return None;
        }

        Some(InputEvent::Touch(TouchEvent {
            device: TouchDevice::Direct,
            phase,
            finger_id: touch.id as i64,
            x: (touch.location.x / f64::from(w)).clamp(0.0, 1.0) as f32,
            y: (touch.location.y / f64::from(h)).clamp(0.0, 1.0) as f32,
            fingers: self.fingers.len() as u32,
            timestamp: Instant::now(),
        }))
    }
}

fn mods_from_winit(state: ModifiersState) -> KeyMods {
    let mut mods = KeyMods::empty();
    mods.set(KeyMods::LSHIFT, state.shift());
    mods.set(KeyMods::LCTRL, state.ctrl());
    mods.set(KeyMods::LALT, state.alt());
    mods.set(KeyMods::LGUI, state.logo());
    mods
}

fn button_number(button: MouseButton) -> Option<u8> {
    match button {
        MouseButton::Left => Some(1),
        MouseButton::Middle => Some(2),
        MouseButton::Right => Some(3),
        MouseButton::Other(code) => side_button(code),
    }
}

/// Back and forward buttons. winit passes the platform's own numbering
/// through `Other`.
#[cfg(target_os = "windows")]
fn side_button(code: u16) -> Option<u8> {
    // XBUTTON1, XBUTTON2
    match code {
        1 => Some(4),
        2 => Some(5),
        _ => None,
    }
}

#[cfg(target_os = "macos")]
fn side_button(code: u16) -> Option<u8> {
    match code {
        3 => Some(4),
        4 => Some(5),
        _ => None,
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn side_button(code: u16) -> Option<u8> {
    match code {
        // X11 core buttons, then evdev BTN_SIDE and BTN_EXTRA from Wayland
        8 | 0x113 => Some(4),
        9 | 0x114 => Some(5),
        _ => None,
    }
}

fn wheel_clicks(delta: MouseScrollDelta) -> (i32, i32) {
    fn clicks(v: f64) -> i32 {
        if v == 0.0 {
            0
        } else if v.abs() < 1.0 {
            v.signum() as i32
        } else {
            v.round() as i32
        }
    }

    match delta {
        MouseScrollDelta::LineDelta(x, y) => (clicks(f64::from(x)), clicks(f64::from(y))),
        // Pixel deltas from touchpads count as one click per event
        MouseScrollDelta::PixelDelta(pos) => (sign(pos.x), sign(pos.y)),
    }
}

fn sign(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

fn physical_scancode(raw: u32, vk: Option<VirtualKeyCode>) -> Scancode {
    if cfg!(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd"
    )) {
        let sc = scancode_from_evdev(raw);
        if sc != Scancode::UNKNOWN {
            return sc;
        }
    }
    vk.map_or(Scancode::UNKNOWN, scancode_from_virtual)
}

/// Linux evdev key number to physical position.
pub fn scancode_from_evdev(code: u32) -> Scancode {
    match code {
        1 => Scancode::ESCAPE,
        2..=10 => Scancode(Scancode::NUM_1.0 + (code - 2) as u16),
        11 => Scancode::NUM_0,
        12 => Scancode::MINUS,
        13 => Scancode::EQUALS,
        14 => Scancode::BACKSPACE,
        15 => Scancode::TAB,
        16 => letter('q'),
        17 => letter('w'),
        18 => letter('e'),
        19 => letter('r'),
        20 => letter('t'),
        21 => letter('y'),
        22 => letter('u'),
        23 => letter('i'),
        24 => letter('o'),
        25 => letter('p'),
        26 => Scancode::LEFT_BRACKET,
        27 => Scancode::RIGHT_BRACKET,
        28 => Scancode::RETURN,
        29 => Scancode::LCTRL,
        30 => letter('a'),
        31 => letter('s'),
        32 => letter('d'),
        33 => letter('f'),
        34 => letter('g'),
        35 => letter('h'),
        36 => letter('j'),
        37 => letter('k'),
        38 => letter('l'),
        39 => Scancode::SEMICOLON,
        40 => Scancode::APOSTROPHE,
        41 => Scancode::GRAVE,
        42 => Scancode::LSHIFT,
        43 => Scancode::BACKSLASH,
        44 => letter('z'),
        45 => letter('x'),
        46 => letter('c'),
        47 => letter('v'),
        48 => letter('b'),
        49 => letter('n'),
        50 => letter('m'),
        51 => Scancode::COMMA,
        52 => Scancode::PERIOD,
        53 => Scancode::SLASH,
        54 => Scancode::RSHIFT,
        55 => Scancode::KP_MULTIPLY,
        56 => Scancode::LALT,
        57 => Scancode::SPACE,
        58 => Scancode::CAPS_LOCK,
        59..=68 => Scancode(Scancode::F1.0 + (code - 59) as u16),
        69 => Scancode::NUM_LOCK,
        70 => Scancode::SCROLL_LOCK,
        71 => Scancode(Scancode::KP_1.0 + 6),
        72 => Scancode(Scancode::KP_1.0 + 7),
        73 => Scancode::KP_9,
        74 => Scancode::KP_MINUS,
        75 => Scancode(Scancode::KP_1.0 + 3),
        76 => Scancode(Scancode::KP_1.0 + 4),
        77 => Scancode(Scancode::KP_1.0 + 5),
        78 => Scancode::KP_PLUS,
        79 => Scancode::KP_1,
        80 => Scancode(Scancode::KP_1.0 + 1),
        81 => Scancode(Scancode::KP_1.0 + 2),
        82 => Scancode::KP_0,
        83 => Scancode::KP_PERIOD,
        86 => Scancode::NON_US_BACKSLASH,
        87 => Scancode(Scancode::F1.0 + 10),
        88 => Scancode::F12,
        96 => Scancode::KP_ENTER,
        97 => Scancode::RCTRL,
        98 => Scancode::KP_DIVIDE,
        99 => Scancode::PRINT_SCREEN,
        100 => Scancode::RALT,
        102 => Scancode::HOME,
        103 => Scancode::UP,
        104 => Scancode::PAGE_UP,
        105 => Scancode::LEFT,
        106 => Scancode::RIGHT,
        107 => Scancode::END,
        108 => Scancode::DOWN,
        109 => Scancode::PAGE_DOWN,
        110 => Scancode::INSERT,
        111 => Scancode::DELETE,
        119 => Scancode::PAUSE,
        121 => Scancode::KP_COMMA,
        125 => Scancode::LGUI,
        126 => Scancode::RGUI,
        127 => Scancode::APPLICATION,
        183..=194 => Scancode(Scancode::F13.0 + (code - 183) as u16),
        _ => Scancode::UNKNOWN,
    }
}

fn letter(c: char) -> Scancode {
    Scancode::letter(c).unwrap_or(Scancode::UNKNOWN)
}

/// Physical position assumed for a virtual key on a US layout.
pub fn scancode_from_virtual(vk: VirtualKeyCode) -> Scancode {
    use VirtualKeyCode as V;
    match vk {
        V::Key1 => Scancode::NUM_1,
        V::Key2 => Scancode(Scancode::NUM_1.0 + 1),
        V::Key3 => Scancode(Scancode::NUM_1.0 + 2),
        V::Key4 => Scancode(Scancode::NUM_1.0 + 3),
        V::Key5 => Scancode(Scancode::NUM_1.0 + 4),
        V::Key6 => Scancode(Scancode::NUM_1.0 + 5),
        V::Key7 => Scancode(Scancode::NUM_1.0 + 6),
        V::Key8 => Scancode(Scancode::NUM_1.0 + 7),
        V::Key9 => Scancode::NUM_9,
        V::Key0 => Scancode::NUM_0,
        V::Escape => Scancode::ESCAPE,
        V::F1 => Scancode::F1,
        V::F2 => Scancode(Scancode::F1.0 + 1),
        V::F3 => Scancode(Scancode::F1.0 + 2),
        V::F4 => Scancode(Scancode::F1.0 + 3),
        V::F5 => Scancode(Scancode::F1.0 + 4),
        V::F6 => Scancode(Scancode::F1.0 + 5),
        V::F7 => Scancode(Scancode::F1.0 + 6),
        V::F8 => Scancode(Scancode::F1.0 + 7),
        V::F9 => Scancode(Scancode::F1.0 + 8),
        V::F10 => Scancode(Scancode::F1.0 + 9),
        V::F11 => Scancode(Scancode::F1.0 + 10),
        V::F12 => Scancode::F12,
        V::Snapshot => Scancode::PRINT_SCREEN,
        V::Scroll => Scancode::SCROLL_LOCK,
        V::Pause => Scancode::PAUSE,
        V::Insert => Scancode::INSERT,
        V::Home => Scancode::HOME,
        V::Delete => Scancode::DELETE,
        V::End => Scancode::END,
        V::PageDown => Scancode::PAGE_DOWN,
        V::PageUp => Scancode::PAGE_UP,
        V::Left => Scancode::LEFT,
        V::Up => Scancode::UP,
        V::Right => Scancode::RIGHT,
        V::Down => Scancode::DOWN,
        V::Back => Scancode::BACKSPACE,
        V::Return => Scancode::RETURN,
        V::Space => Scancode::SPACE,
        V::Numlock => Scancode::NUM_LOCK,
        V::Numpad0 => Scancode::KP_0,
        V::Numpad1 => Scancode::KP_1,
        V::Numpad2 => Scancode(Scancode::KP_1.0 + 1),
        V::Numpad3 => Scancode(Scancode::KP_1.0 + 2),
        V::Numpad4 => Scancode(Scancode::KP_1.0 + 3),
        V::Numpad5 => Scancode(Scancode::KP_1.0 + 4),
        V::Numpad6 => Scancode(Scancode::KP_1.0 + 5),
        V::Numpad7 => Scancode(Scancode::KP_1.0 + 6),
        V::Numpad8 => Scancode(Scancode::KP_1.0 + 7),
        V::Numpad9 => Scancode::KP_9,
        V::NumpadAdd => Scancode::KP_PLUS,
        V::NumpadDivide => Scancode::KP_DIVIDE,
        V::NumpadDecimal => Scancode::KP_PERIOD,
        V::NumpadComma => Scancode::KP_COMMA,
        V::NumpadEnter => Scancode::KP_ENTER,
        V::NumpadMultiply => Scancode::KP_MULTIPLY,
        V::NumpadSubtract => Scancode::KP_MINUS,
        V::Apostrophe => Scancode::APOSTROPHE,
        V::Backslash => Scancode::BACKSLASH,
        V::Capital => Scancode::CAPS_LOCK,
        V::Comma => Scancode::COMMA,
        V::Equals => Scancode::EQUALS,
        V::Grave => Scancode::GRAVE,
        V::LAlt => Scancode::LALT,
        V::LBracket => Scancode::LEFT_BRACKET,
        V::LControl => Scancode::LCTRL,
        V::LShift => Scancode::LSHIFT,
        V::LWin => Scancode::LGUI,
        V::Minus => Scancode::MINUS,
        V::Period => Scancode::PERIOD,
        V::RAlt => Scancode::RALT,
        V::RBracket => Scancode::RIGHT_BRACKET,
        V::RControl => Scancode::RCTRL,
        V::RShift => Scancode::RSHIFT,
        V::RWin => Scancode::RGUI,
        V::Semicolon => Scancode::SEMICOLON,
        V::Slash => Scancode::SLASH,
        V::Tab => Scancode::TAB,
        V::WebBack => Scancode::AC_BACK,
        V::WebForward => Scancode::AC_FORWARD,
        V::WebHome => Scancode::AC_HOME,
        V::WebRefresh => Scancode::AC_REFRESH,
        V::WebSearch => Scancode::AC_SEARCH,
        V::WebStop => Scancode::AC_STOP,
        V::WebFavorites => Scancode::AC_BOOKMARKS,
        other => letter_key(other).map_or(Scancode::UNKNOWN, letter),
    }
}

fn logical_keycode(vk: VirtualKeyCode) -> Keycode {
    letter_key(vk).map_or(Keycode::UNKNOWN, Keycode::from_char)
}

fn letter_key(vk: VirtualKeyCode) -> Option<char> {
    use VirtualKeyCode as V;
    const LETTERS: [VirtualKeyCode; 26] = [
        V::A, V::B, V::C, V::D, V::E, V::F, V::G, V::H, V::I, V::J, V::K, V::L, V::M,
        V::N, V::O, V::P, V::Q, V::R, V::S, V::T, V::U, V::V, V::W, V::X, V::Y, V::Z,
    ];
    LETTERS
        .iter()
        .position(|&l| l == vk)
        .map(|i| char::from(b'a' + i as u8))
}

/// Capture cursor control backed by a winit window.
pub struct WindowCursor {
    window: Arc<Window>,
}

impl WindowCursor {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl CursorControl for WindowCursor {
    fn set_relative_mode(&mut self, enabled: bool) -> bool {
        let mode = if enabled {
            CursorGrabMode::Locked
        } else {
            CursorGrabMode::None
        };
        match self.window.set_cursor_grab(mode) {
            Ok(()) => true,
            Err(err) => {
                warn!("Cursor grab {:?} unavailable: {}", mode, err);
                false
            }
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }
}
