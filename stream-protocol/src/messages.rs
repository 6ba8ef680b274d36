//! Input packets and the wire-level codes they carry.

use bitflags::bitflags;

/// Key transition reported with a keyboard packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key went down.
    Down,
    /// Key went up.
    Up,
}

impl KeyAction {
    /// Wire code for this action.
    pub const fn code(self) -> u8 {
        match self {
            Self::Down => 0x03,
            Self::Up => 0x04,
        }
    }
}

/// Mouse button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    /// Button pressed.
    Press,
    /// Button released.
    Release,
}

impl ButtonAction {
    /// Wire code for this action.
    pub const fn code(self) -> u8 {
        match self {
            Self::Press => 0x07,
            Self::Release => 0x08,
        }
    }
}

/// Mouse buttons understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel click.
    Middle,
    /// Secondary button.
    Right,
    /// First side button (back).
    X1,
    /// Second side button (forward).
    X2,
}

impl MouseButton {
    /// Wire code for this button.
    pub const fn code(self) -> u8 {
        match self {
            Self::Left => 0x01,
            Self::Middle => 0x02,
            Self::Right => 0x03,
            Self::X1 => 0x04,
            Self::X2 => 0x05,
        }
    }
}

bitflags! {
    /// Modifier flags attached to each keyboard packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        /// Either shift key.
        const SHIFT = 0x01;
        /// Either control key.
        const CTRL  = 0x02;
        /// Either alt key.
        const ALT   = 0x04;
        /// Either GUI (super/command/windows) key.
        const META  = 0x08;
    }
}

bitflags! {
    /// Digital button state of one controller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControllerButtons: u16 {
        /// D-pad up.
        const UP      = 0x0001;
        /// D-pad down.
        const DOWN    = 0x0002;
        /// D-pad left.
        const LEFT    = 0x0004;
        /// D-pad right.
        const RIGHT   = 0x0008;
        /// Start / menu.
        const PLAY    = 0x0010;
        /// Back / view / select.
        const BACK    = 0x0020;
        /// Left stick click.
        const LS_CLK  = 0x0040;
        /// Right stick click.
        const RS_CLK  = 0x0080;
        /// Left shoulder.
        const LB      = 0x0100;
        /// Right shoulder.
        const RB      = 0x0200;
        /// Guide / home.
        const SPECIAL = 0x0400;
        /// South face button.
        const A       = 0x1000;
        /// East face button.
        const B       = 0x2000;
        /// West face button.
        const X       = 0x4000;
        /// North face button.
        const Y       = 0x8000;
    }
}

impl ControllerButtons {
    /// The chord that asks the client to end the session.
    pub const QUIT_CHORD: Self = Self::PLAY
        .union(Self::BACK)
        .union(Self::LB)
        .union(Self::RB);
}

/// Full state of one controller as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerPacket {
    /// Controller index the host sees.
    pub index: i16,
    /// Bitmask of every currently attached controller index.
    pub active_mask: i16,
    /// Digital buttons currently held.
    pub buttons: ControllerButtons,
    /// Left trigger, 0..=255.
    pub left_trigger: u8,
    /// Right trigger, 0..=255.
    pub right_trigger: u8,
    /// Left stick X.
    pub left_stick_x: i16,
    /// Left stick Y, positive is up.
    pub left_stick_y: i16,
    /// Right stick X.
    pub right_stick_x: i16,
    /// Right stick Y, positive is up.
    pub right_stick_y: i16,
}

impl ControllerPacket {
    /// A packet with every input at rest.
    pub const fn neutral(index: i16, active_mask: i16) -> Self {
        Self {
            index,
            active_mask,
            buttons: ControllerButtons::empty(),
            left_trigger: 0,
            right_trigger: 0,
            left_stick_x: 0,
            left_stick_y: 0,
            right_stick_x: 0,
            right_stick_y: 0,
        }
    }
}

/// One input message for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPacket {
    /// Virtual-key press or release.
    Keyboard {
        /// Windows virtual-key code.
        key_code: i16,
        /// Press or release.
        action: KeyAction,
        /// Modifiers held when the event happened.
        modifiers: KeyModifiers,
    },
    /// Mouse button press or release.
    MouseButton {
        /// Press or release.
        action: ButtonAction,
        /// Button affected.
        button: MouseButton,
    },
    /// Relative pointer motion.
    MouseMove {
        /// Horizontal delta.
        dx: i16,
        /// Vertical delta.
        dy: i16,
    },
    /// Absolute pointer position inside a reference surface.
    MousePosition {
        /// Horizontal position.
        x: i16,
        /// Vertical position.
        y: i16,
        /// Width the position is relative to.
        reference_width: i16,
        /// Height the position is relative to.
        reference_height: i16,
    },
    /// Vertical wheel clicks, positive is away from the user.
    Scroll {
        /// Signed click count.
        amount: i8,
    },
    /// Controller state snapshot.
    Controller(ControllerPacket),
}
