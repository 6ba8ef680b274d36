//! The send-event seam between the input pipeline and the transport.

use crate::messages::{
    ButtonAction, ControllerPacket, InputPacket, KeyAction, KeyModifiers, MouseButton,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Fire-and-forget sink for input packets.
///
/// Implementations must be callable from the timer thread as well as the
/// event thread: the relative-motion flush runs off the main thread.
pub trait InputSink: Send + Sync {
    /// Hand one packet to the transport. Never blocks waiting for the host.
    fn submit(&self, packet: InputPacket);

    /// Send a key transition.
    fn send_keyboard_event(&self, key_code: i16, action: KeyAction, modifiers: KeyModifiers) {
        self.submit(InputPacket::Keyboard {
            key_code,
            action,
            modifiers,
        });
    }

    /// Send a mouse button transition.
    fn send_mouse_button_event(&self, action: ButtonAction, button: MouseButton) {
        self.submit(InputPacket::MouseButton { action, button });
    }

    /// Send relative pointer motion.
    fn send_mouse_move_event(&self, dx: i16, dy: i16) {
        self.submit(InputPacket::MouseMove { dx, dy });
    }

    /// Send an absolute pointer position.
    fn send_mouse_position_event(&self, x: i16, y: i16, reference_width: i16, reference_height: i16) {
        self.submit(InputPacket::MousePosition {
            x,
            y,
            reference_width,
            reference_height,
        });
    }

    /// Send vertical wheel clicks.
    fn send_scroll_event(&self, amount: i8) {
        self.submit(InputPacket::Scroll { amount });
    }

    /// Send one controller snapshot.
    fn send_multi_controller_event(&self, packet: ControllerPacket) {
        self.submit(InputPacket::Controller(packet));
    }
}

/// Sink that forwards packets to a transport thread over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    packets: flume::Sender<InputPacket>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub fn new(packets: flume::Sender<InputPacket>) -> Self {
        Self { packets }
    }
}

impl InputSink for ChannelSink {
    fn submit(&self, packet: InputPacket) {
        trace!(?packet, "input packet");
        if self.packets.send(packet).is_err() {
            // Transport already gone; input after disconnect is meaningless.
            debug!("Dropping input packet, transport closed");
        }
    }
}

/// Create a [`ChannelSink`] and the receiver the transport drains.
///
/// The channel is unbounded: input must never be dropped or stall the event
/// thread because the transport is momentarily slow.
pub fn channel_sink() -> (ChannelSink, flume::Receiver<InputPacket>) {
    let (tx, rx) = flume::unbounded();
    (ChannelSink::new(tx), rx)
}

/// Sink that records every packet in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    packets: Mutex<Vec<InputPacket>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn packets(&self) -> Vec<InputPacket> {
        self.packets.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<InputPacket> {
        std::mem::take(&mut *self.packets.lock())
    }

    /// Number of packets recorded so far.
    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.packets.lock().is_empty()
    }
}

impl InputSink for RecordingSink {
    fn submit(&self, packet: InputPacket) {
        self.packets.lock().push(packet);
    }
}
