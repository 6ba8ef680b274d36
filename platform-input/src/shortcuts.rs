//! Local hotkey chords (Ctrl+Alt+Shift+letter).
//!
//! Chords are consumed by the client and never reach the host. Each chord is
//! matched by logical key first and only then by physical position, so Latin
//! layouts hit the letter printed on the key while non-Latin layouts still
//! have a working (if oddly placed) chord. Every logical check runs before
//! any positional one; otherwise one chord's letter could collide with
//! another chord's position.

use crate::keyboard::{KeyMods, Keycode, Scancode};
use tracing::info;

/// Local actions that a hotkey chord triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// End the streaming session.
    Quit,
    /// Release or take input capture.
    ToggleCapture,
    /// Switch between absolute and relative mouse mode.
    ToggleMouseMode,
    /// Enter or leave fullscreen.
    ToggleFullscreen,
    /// Show or hide the performance overlay.
    ToggleStatsOverlay,
}

/// A single chord definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    /// Action triggered by this chord.
    pub action: HotkeyAction,
    /// Logical key matched first.
    pub keycode: Keycode,
    /// Physical key matched when no logical key matched.
    pub scancode: Scancode,
    /// Chord makes no sense without a window manager.
    pub needs_window_manager: bool,
    /// Description for help/UI.
    pub description: &'static str,
}

impl Hotkey {
    /// Human readable chord, e.g. `Ctrl+Alt+Shift+Q`.
    pub fn combination(&self) -> String {
        let letter = char::from_u32(self.keycode.0)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');
        format!("Ctrl+Alt+Shift+{letter}")
    }
}

const HOTKEYS: [Hotkey; 5] = [
    Hotkey {
        action: HotkeyAction::Quit,
        keycode: Keycode::Q,
        scancode: Scancode::Q,
        needs_window_manager: false,
        description: "Quit the session",
    },
    Hotkey {
        action: HotkeyAction::ToggleCapture,
        keycode: Keycode::Z,
        scancode: Scancode::Z,
        needs_window_manager: true,
        description: "Toggle mouse and keyboard capture",
    },
    Hotkey {
        action: HotkeyAction::ToggleMouseMode,
        keycode: Keycode::M,
        scancode: Scancode::M,
        needs_window_manager: true,
        description: "Toggle absolute/relative mouse mode",
    },
    Hotkey {
        action: HotkeyAction::ToggleFullscreen,
        keycode: Keycode::X,
        scancode: Scancode::X,
        needs_window_manager: true,
        description: "Toggle fullscreen",
    },
    Hotkey {
        action: HotkeyAction::ToggleStatsOverlay,
        keycode: Keycode::S,
        scancode: Scancode::S,
        needs_window_manager: false,
        description: "Toggle the statistics overlay",
    },
];

/// Matches key presses against the hotkey chords.
#[derive(Debug, Clone)]
pub struct HotkeyMatcher {
    window_manager: bool,
}

impl HotkeyMatcher {
    /// Create a matcher. Without a window manager the capture, mouse-mode and
    /// fullscreen chords are disabled.
    pub fn new(window_manager: bool) -> Self {
        Self { window_manager }
    }

    /// Chords available on this platform, in priority order.
    pub fn hotkeys(&self) -> impl Iterator<Item = &'static Hotkey> + '_ {
        HOTKEYS
            .iter()
            .filter(move |h| !h.needs_window_manager || self.window_manager)
    }

    /// Match a key press. Releases never match.
    pub fn match_press(
        &self,
        keycode: Keycode,
        scancode: Scancode,
        mods: KeyMods,
        pressed: bool,
    ) -> Option<HotkeyAction> {
        if !pressed || !(mods.ctrl() && mods.alt() && mods.shift()) {
            return None;
        }

        let (hotkey, by) = if let Some(h) = self.hotkeys().find(|h| h.keycode == keycode) {
            (h, "keycode")
        } else {
            (self.hotkeys().find(|h| h.scancode == scancode)?, "scancode")
        };

        info!(action = ?hotkey.action, matched_by = by, "Detected hotkey combo");
        Some(hotkey.action)
    }
}
