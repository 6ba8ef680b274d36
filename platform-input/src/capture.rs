//! Pointer capture state machine.

use tracing::{info, warn};

/// Who currently owns the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureState {
    /// Input stays with the local desktop.
    #[default]
    Released,
    /// Platform relative mode: cursor hidden and locked, raw deltas delivered.
    CapturedRelative,
    /// Cursor only hidden. Used in absolute mode and where relative mode is
    /// unavailable.
    CapturedFake,
}

impl CaptureState {
    /// Input is being routed to the stream.
    pub fn is_active(self) -> bool {
        self != Self::Released
    }
}

/// Platform cursor operations the capture controller needs.
pub trait CursorControl {
    /// Enter or leave relative (locked, hidden) mode. Returns `false` when
    /// the platform refused.
    fn set_relative_mode(&mut self, enabled: bool) -> bool;

    /// Show or hide the cursor over the window.
    fn set_cursor_visible(&mut self, visible: bool);
}

/// Owns the capture state and the cursor it manipulates.
pub struct CaptureController {
    cursor: Box<dyn CursorControl>,
    state: CaptureState,
    absolute_mode: bool,
}

impl CaptureController {
    /// Start released.
    pub fn new(cursor: Box<dyn CursorControl>, absolute_mode: bool) -> Self {
        Self {
            cursor,
            state: CaptureState::Released,
            absolute_mode,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Input is being routed to the stream.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Absolute (position) mouse mode is selected.
    pub fn absolute_mode(&self) -> bool {
        self.absolute_mode
    }

    /// Take or release capture.
    ///
    /// Taking capture while already captured keeps the current mode, so
    /// relative and fake capture are never both in effect.
    pub fn set_active(&mut self, active: bool) {
        match (active, self.state) {
            (true, CaptureState::Released) => {
                if self.absolute_mode {
                    self.cursor.set_cursor_visible(false);
                    self.state = CaptureState::CapturedFake;
                } else if self.cursor.set_relative_mode(true) {
                    self.state = CaptureState::CapturedRelative;
                } else {
                    warn!("Relative mouse mode unavailable, hiding cursor instead");
                    self.cursor.set_cursor_visible(false);
                    self.state = CaptureState::CapturedFake;
                }
                info!(state = ?self.state, "Input captured");
            }
            (false, CaptureState::CapturedFake) => {
                self.cursor.set_cursor_visible(true);
                self.state = CaptureState::Released;
                info!("Input released");
            }
            (false, CaptureState::CapturedRelative) => {
                self.cursor.set_relative_mode(false);
                self.state = CaptureState::Released;
                info!("Input released");
            }
            _ => {}
        }
    }

    /// Flip absolute/relative mode, recapturing in the new mode.
    pub fn toggle_mouse_mode(&mut self) {
        self.set_active(false);
        self.absolute_mode = !self.absolute_mode;
        info!(absolute = self.absolute_mode, "Mouse mode toggled");
        self.set_active(true);
    }
}
