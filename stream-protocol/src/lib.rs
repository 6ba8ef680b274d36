//! Outbound input protocol for the streaming client.
//!
//! The network transport is an external collaborator: this crate only
//! describes what gets sent to it and provides the seam it is reached
//! through.
//!
//! - [`InputPacket`] - one fire-and-forget input message
//! - [`InputSink`] - the six send calls consumed by the input pipeline
//! - [`ChannelSink`] - forwards packets over a `flume` channel to the
//!   transport thread
//! - [`RecordingSink`] - keeps every packet in memory, for tests and replays
//!
//! # Example
//!
//! ```
//! use stream_protocol::{channel_sink, InputPacket, InputSink, KeyAction, KeyModifiers};
//!
//! let (sink, packets) = channel_sink();
//! sink.send_keyboard_event(0x41, KeyAction::Down, KeyModifiers::SHIFT);
//!
//! assert_eq!(
//!     packets.try_recv().ok(),
//!     Some(InputPacket::Keyboard {
//!         key_code: 0x41,
//!         action: KeyAction::Down,
//!         modifiers: KeyModifiers::SHIFT,
//!     })
//! );
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod messages;
pub mod sink;

pub use messages::{
    ButtonAction, ControllerButtons, ControllerPacket, InputPacket, KeyAction, KeyModifiers,
    MouseButton,
};
pub use sink::{channel_sink, ChannelSink, InputSink, RecordingSink};

/// Maximum number of simultaneously reported controllers.
pub const MAX_GAMEPADS: usize = 4;
