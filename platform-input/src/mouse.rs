//! Mouse translation: button mapping, absolute positioning and relative
//! motion batching.

use std::sync::atomic::{AtomicU64, Ordering};
use stream_common::{scale_source_to_destination, Point, Rect};
use stream_protocol::MouseButton;

/// Map a platform button number to a host button.
pub fn map_mouse_button(button: u8) -> Option<MouseButton> {
    match button {
        1 => Some(MouseButton::Left),
        2 => Some(MouseButton::Middle),
        3 => Some(MouseButton::Right),
        4 => Some(MouseButton::X1),
        5 => Some(MouseButton::X2),
        _ => None,
    }
}

/// Pending relative motion shared between the event thread and the flush
/// timer.
///
/// Both axes live in one 64-bit word so that a drain always observes a
/// matching (dx, dy) pair.
#[derive(Debug, Default)]
pub struct MotionAccumulator {
    packed: AtomicU64,
}

fn pack(dx: i32, dy: i32) -> u64 {
    (u64::from(dx as u32) << 32) | u64::from(dy as u32)
}

fn unpack(word: u64) -> (i32, i32) {
    ((word >> 32) as u32 as i32, word as u32 as i32)
}

fn saturate_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl MotionAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add motion. Saturates rather than wrapping on absurd input.
    pub fn add(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        // The closure always returns Some, so this cannot fail.
        let _ = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (x, y) = unpack(word);
                Some(pack(x.saturating_add(dx), y.saturating_add(dy)))
            });
    }

    /// Take everything accumulated so far, leaving zero behind.
    ///
    /// Returns `None` when there is nothing to send.
    pub fn drain(&self) -> Option<(i16, i16)> {
        let (x, y) = unpack(self.packed.swap(0, Ordering::AcqRel));
        if x == 0 && y == 0 {
            None
        } else {
            Some((saturate_i16(x), saturate_i16(y)))
        }
    }

    /// Look at the pending motion without draining it.
    pub fn pending(&self) -> (i32, i32) {
        unpack(self.packed.load(Ordering::Acquire))
    }
}

/// An absolute pointer position in video-region coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoPosition {
    pub x: i16,
    pub y: i16,
    pub reference_width: i16,
    pub reference_height: i16,
}

/// Maps window coordinates onto the letterboxed video region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerMapper {
    stream: Rect,
    window: Rect,
}

impl PointerMapper {
    /// Mapper for a stream of the given size shown in a window of the given size.
    pub fn new(stream_width: u32, stream_height: u32, window_width: u32, window_height: u32) -> Self {
        Self {
            stream: Rect::from_size(stream_width, stream_height),
            window: Rect::from_size(window_width, window_height),
        }
    }

    /// Window size changed.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window = Rect::from_size(width, height);
    }

    /// The part of the window covered by video.
    pub fn video_rect(&self) -> Rect {
        scale_source_to_destination(self.stream, self.window)
    }

    fn position(dst: Rect, p: Point) -> VideoPosition {
        VideoPosition {
            x: saturate_i16(p.x),
            y: saturate_i16(p.y),
            reference_width: saturate_i16(dst.width as i32),
            reference_height: saturate_i16(dst.height as i32),
        }
    }

    /// Map a window-space pixel position, clamped to the video region.
    pub fn map_window_point(&self, x: i32, y: i32) -> VideoPosition {
        let dst = self.video_rect();
        Self::position(dst, dst.relative_clamped(x, y))
    }

    /// Map a normalized `[0, 1]` window position (touch input). Values outside
    /// that range occur when a drag leaves the window and are clamped.
    pub fn map_normalized(&self, x: f32, y: f32) -> VideoPosition {
        let px = (x * self.window.width as f32) as i32;
        let py = (y * self.window.height as f32) as i32;
        self.map_window_point(px, py)
    }
}
