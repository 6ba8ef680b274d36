//! Keyboard normalization: physical key positions to Windows virtual-key codes.
//!
//! The host expects virtual-key codes as if the keys had been pressed on a US
//! layout. Keys are identified by their physical position ([`Scancode`], USB
//! HID usage numbering) so the result does not depend on the local layout.

use bitflags::bitflags;
use std::collections::BTreeSet;
use stream_protocol::{InputSink, KeyAction, KeyModifiers};
use tracing::{debug, warn};

/// Physical key position, numbered by USB HID keyboard usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scancode(pub u16);

impl Scancode {
    pub const UNKNOWN: Self = Self(0);
    pub const A: Self = Self(4);
    pub const C: Self = Self(6);
    pub const M: Self = Self(16);
    pub const Q: Self = Self(20);
    pub const S: Self = Self(22);
    pub const X: Self = Self(27);
    pub const Z: Self = Self(29);
    pub const NUM_1: Self = Self(30);
    pub const NUM_9: Self = Self(38);
    pub const NUM_0: Self = Self(39);
    pub const RETURN: Self = Self(40);
    pub const ESCAPE: Self = Self(41);
    pub const BACKSPACE: Self = Self(42);
    pub const TAB: Self = Self(43);
    pub const SPACE: Self = Self(44);
    pub const MINUS: Self = Self(45);
    pub const EQUALS: Self = Self(46);
    pub const LEFT_BRACKET: Self = Self(47);
    pub const RIGHT_BRACKET: Self = Self(48);
    pub const BACKSLASH: Self = Self(49);
    pub const SEMICOLON: Self = Self(51);
    pub const APOSTROPHE: Self = Self(52);
    pub const GRAVE: Self = Self(53);
    pub const COMMA: Self = Self(54);
    pub const PERIOD: Self = Self(55);
    pub const SLASH: Self = Self(56);
    pub const CAPS_LOCK: Self = Self(57);
    pub const F1: Self = Self(58);
    pub const F12: Self = Self(69);
    pub const PRINT_SCREEN: Self = Self(70);
    pub const SCROLL_LOCK: Self = Self(71);
    pub const PAUSE: Self = Self(72);
    pub const INSERT: Self = Self(73);
    pub const HOME: Self = Self(74);
    pub const PAGE_UP: Self = Self(75);
    pub const DELETE: Self = Self(76);
    pub const END: Self = Self(77);
    pub const PAGE_DOWN: Self = Self(78);
    pub const RIGHT: Self = Self(79);
    pub const LEFT: Self = Self(80);
    pub const DOWN: Self = Self(81);
    pub const UP: Self = Self(82);
    pub const NUM_LOCK: Self = Self(83);
    pub const KP_DIVIDE: Self = Self(84);
    pub const KP_MULTIPLY: Self = Self(85);
    pub const KP_MINUS: Self = Self(86);
    pub const KP_PLUS: Self = Self(87);
    pub const KP_ENTER: Self = Self(88);
    pub const KP_1: Self = Self(89);
    pub const KP_9: Self = Self(97);
    pub const KP_0: Self = Self(98);
    pub const KP_PERIOD: Self = Self(99);
    pub const NON_US_BACKSLASH: Self = Self(100);
    pub const APPLICATION: Self = Self(101);
    pub const F13: Self = Self(104);
    pub const F24: Self = Self(115);
    pub const EXECUTE: Self = Self(116);
    pub const HELP: Self = Self(117);
    pub const SELECT: Self = Self(119);
    pub const KP_COMMA: Self = Self(133);
    pub const CLEAR: Self = Self(156);
    pub const LCTRL: Self = Self(224);
    pub const LSHIFT: Self = Self(225);
    pub const LALT: Self = Self(226);
    pub const LGUI: Self = Self(227);
    pub const RCTRL: Self = Self(228);
    pub const RSHIFT: Self = Self(229);
    pub const RALT: Self = Self(230);
    pub const RGUI: Self = Self(231);
    pub const AC_SEARCH: Self = Self(268);
    pub const AC_HOME: Self = Self(269);
    pub const AC_BACK: Self = Self(270);
    pub const AC_FORWARD: Self = Self(271);
    pub const AC_STOP: Self = Self(272);
    pub const AC_REFRESH: Self = Self(273);
    pub const AC_BOOKMARKS: Self = Self(274);

    /// Scancode for letter `c` (`'a'..='z'`, case-insensitive).
    pub const fn letter(c: char) -> Option<Self> {
        let lower = c.to_ascii_lowercase();
        if lower.is_ascii_lowercase() {
            Some(Self(Self::A.0 + (lower as u16 - 'a' as u16)))
        } else {
            None
        }
    }
}

/// Logical key produced by the active layout.
///
/// Printable keys carry their lowercase Unicode code point; everything else
/// is [`Keycode::UNKNOWN`] as far as this crate is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keycode(pub u32);

impl Keycode {
    pub const UNKNOWN: Self = Self(0);
    pub const M: Self = Self('m' as u32);
    pub const Q: Self = Self('q' as u32);
    pub const S: Self = Self('s' as u32);
    pub const X: Self = Self('x' as u32);
    pub const Z: Self = Self('z' as u32);

    /// Logical key for a character; letters are folded to lowercase.
    pub fn from_char(c: char) -> Self {
        Self(c.to_ascii_lowercase() as u32)
    }
}

bitflags! {
    /// Modifier bits as reported by the platform with every key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyMods: u16 {
        const LSHIFT = 0x0001;
        const RSHIFT = 0x0002;
        const LCTRL  = 0x0040;
        const RCTRL  = 0x0080;
        const LALT   = 0x0100;
        const RALT   = 0x0200;
        const LGUI   = 0x0400;
        const RGUI   = 0x0800;
        const NUM    = 0x1000;
        const CAPS   = 0x2000;
    }
}

impl KeyMods {
    /// Either control key held.
    pub fn ctrl(self) -> bool {
        self.intersects(Self::LCTRL | Self::RCTRL)
    }

    /// Either alt key held.
    pub fn alt(self) -> bool {
        self.intersects(Self::LALT | Self::RALT)
    }

    /// Either shift key held.
    pub fn shift(self) -> bool {
        self.intersects(Self::LSHIFT | Self::RSHIFT)
    }

    /// Either GUI key held.
    pub fn gui(self) -> bool {
        self.intersects(Self::LGUI | Self::RGUI)
    }

    /// Protocol modifier flags for these bits.
    pub fn to_protocol(self) -> KeyModifiers {
        let mut out = KeyModifiers::empty();
        out.set(KeyModifiers::SHIFT, self.shift());
        out.set(KeyModifiers::CTRL, self.ctrl());
        out.set(KeyModifiers::ALT, self.alt());
        out.set(KeyModifiers::META, self.gui());
        out
    }
}

fn offset_in(sc: Scancode, first: Scancode, last: Scancode, base: i16) -> Option<i16> {
    (first.0..=last.0)
        .contains(&sc.0)
        .then(|| base + (sc.0 - first.0) as i16)
}

/// Map a physical key to the host's virtual-key code.
///
/// Returns `None` for keys the host has no code for. The GUI keys land here
/// too: they only ever contribute the META modifier.
pub fn map_scancode(sc: Scancode) -> Option<i16> {
    if let Some(vk) = offset_in(sc, Scancode::NUM_1, Scancode::NUM_9, 0x31) {
        return Some(vk);
    }
    if let Some(vk) = offset_in(sc, Scancode::A, Scancode(Scancode::A.0 + 25), 0x41) {
        return Some(vk);
    }
    if let Some(vk) = offset_in(sc, Scancode::F1, Scancode::F12, 0x70)
        .or_else(|| offset_in(sc, Scancode::F13, Scancode::F24, 0x7C))
    {
        return Some(vk);
    }
    if let Some(vk) = offset_in(sc, Scancode::KP_1, Scancode::KP_9, 0x61) {
        return Some(vk);
    }

    let vk = match sc {
        Scancode::BACKSPACE => 0x08,
        Scancode::TAB => 0x09,
        Scancode::CLEAR => 0x0C,
        Scancode::KP_ENTER | Scancode::RETURN => 0x0D,
        Scancode::PAUSE => 0x13,
        Scancode::CAPS_LOCK => 0x14,
        Scancode::ESCAPE => 0x1B,
        Scancode::SPACE => 0x20,
        Scancode::PAGE_UP => 0x21,
        Scancode::PAGE_DOWN => 0x22,
        Scancode::END => 0x23,
        Scancode::HOME => 0x24,
        Scancode::LEFT => 0x25,
        Scancode::UP => 0x26,
        Scancode::RIGHT => 0x27,
        Scancode::DOWN => 0x28,
        Scancode::SELECT => 0x29,
        Scancode::EXECUTE => 0x2B,
        Scancode::PRINT_SCREEN => 0x2C,
        Scancode::INSERT => 0x2D,
        Scancode::DELETE => 0x2E,
        Scancode::HELP => 0x2F,
        Scancode::KP_0 => 0x60,
        Scancode::NUM_0 => 0x30,
        Scancode::KP_MULTIPLY => 0x6A,
        Scancode::KP_PLUS => 0x6B,
        Scancode::KP_COMMA => 0x6C,
        Scancode::KP_MINUS => 0x6D,
        Scancode::KP_PERIOD => 0x6E,
        Scancode::KP_DIVIDE => 0x6F,
        Scancode::NUM_LOCK => 0x90,
        Scancode::SCROLL_LOCK => 0x91,
        Scancode::LSHIFT => 0xA0,
        Scancode::RSHIFT => 0xA1,
        Scancode::LCTRL => 0xA2,
        Scancode::RCTRL => 0xA3,
        Scancode::LALT => 0xA4,
        Scancode::RALT => 0xA5,
        Scancode::AC_BACK => 0xA6,
        Scancode::AC_FORWARD => 0xA7,
        Scancode::AC_REFRESH => 0xA8,
        Scancode::AC_STOP => 0xA9,
        Scancode::AC_SEARCH => 0xAA,
        Scancode::AC_BOOKMARKS => 0xAB,
        Scancode::AC_HOME => 0xAC,
        Scancode::SEMICOLON => 0xBA,
        Scancode::EQUALS => 0xBB,
        Scancode::COMMA => 0xBC,
        Scancode::MINUS => 0xBD,
        Scancode::PERIOD => 0xBE,
        Scancode::SLASH => 0xBF,
        Scancode::GRAVE => 0xC0,
        Scancode::LEFT_BRACKET => 0xDB,
        Scancode::BACKSLASH => 0xDC,
        Scancode::RIGHT_BRACKET => 0xDD,
        Scancode::APOSTROPHE => 0xDE,
        Scancode::NON_US_BACKSLASH => 0xE2,
        _ => return None,
    };
    Some(vk)
}

/// Keys the host currently believes are held down.
///
/// Kept only so every key can be force-released when the platform will not
/// deliver the release itself (focus loss, capture toggles).
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys_down: BTreeSet<i16>,
}

impl KeyboardState {
    /// Create an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward one non-repeat key transition.
    ///
    /// Returns `false` when the key has no host code and was dropped.
    pub fn forward(
        &mut self,
        sink: &dyn InputSink,
        scancode: Scancode,
        mods: KeyMods,
        pressed: bool,
    ) -> bool {
        let Some(key_code) = map_scancode(scancode) else {
            debug!(scancode = scancode.0, "Unhandled scancode, not forwarded");
            return false;
        };

        let action = if pressed {
            self.keys_down.insert(key_code);
            KeyAction::Down
        } else {
            self.keys_down.remove(&key_code);
            KeyAction::Up
        };

        sink.send_keyboard_event(key_code, action, mods.to_protocol());
        true
    }

    /// Release every tracked key with no modifiers. No-op when nothing is held.
    pub fn raise_all(&mut self, sink: &dyn InputSink) {
        if self.keys_down.is_empty() {
            return;
        }

        warn!(count = self.keys_down.len(), "Raising held keys");
        for key_code in std::mem::take(&mut self.keys_down) {
            sink.send_keyboard_event(key_code, KeyAction::Up, KeyModifiers::empty());
        }
    }

    /// Number of keys currently tracked down.
    pub fn held(&self) -> usize {
        self.keys_down.len()
    }
}
