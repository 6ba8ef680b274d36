//! platform-input: turn local keyboard, mouse, touch and gamepad input into
//! stream input packets.
//!
//! [`InputHandler`] owns all input state. The embedding event loop feeds it
//! [`InputEvent`]s (the [`winit_adapter`] module produces them from winit),
//! calls [`InputHandler::dispatch_timers`] when timer events are pending, and
//! acts on the returned [`SessionAction`]s. Packets leave through an
//! [`stream_protocol::InputSink`].
//!
//! ```no_run
//! use platform_input::{InputConfig, InputHandler, NoBacklog};
//! use std::sync::Arc;
//!
//! let (sink, packets) = stream_protocol::channel_sink();
//! let mut input = InputHandler::builder(InputConfig::default())
//!     .sink(Arc::new(sink))
//!     .build()?;
//!
//! input.set_capture_active(true);
//! input.dispatch_timers();
//! # drop(packets);
//! # drop(NoBacklog);
//! # Ok::<(), platform_input::InputError>(())
//! ```

pub mod capture;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod gamepad;
pub mod gestures;
pub mod haptics;
pub mod handler;
pub mod keyboard;
pub mod mouse;
pub mod shortcuts;
pub mod timer;
pub mod winit_adapter;

pub use capture::{CaptureController, CaptureState, CursorControl};
pub use config::{InputConfig, InputConfigBuilder, MOUSE_POLLING_INTERVAL_ENV};
pub use errors::InputError;
pub use events::{EventBacklog, InputEvent, NoBacklog};
pub use gamepad::{GamepadBackend, GamepadDevice, GamepadManager, SlotHandle, MAX_GAMEPADS};
pub use handler::{InputHandler, InputHandlerBuilder, SessionAction};
pub use haptics::{HapticCaps, HapticMethod};
pub use keyboard::{map_scancode, KeyMods, Keycode, Scancode};
pub use shortcuts::{Hotkey, HotkeyAction, HotkeyMatcher};
pub use timer::{ManualTimerDriver, TimerDriver, TimerEvent, TokioTimerDriver};
