#![allow(dead_code)]

use parking_lot::Mutex;
use platform_input::{
    CursorControl, GamepadBackend, GamepadDevice, InputConfig, InputError, InputHandler,
    ManualTimerDriver,
};
use std::sync::Arc;
use stream_protocol::RecordingSink;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cursor that records what it was asked to do.
#[derive(Clone, Default)]
pub struct FakeCursor {
    pub allow_relative: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl CursorControl for FakeCursor {
    fn set_relative_mode(&mut self, enabled: bool) -> bool {
        self.calls.lock().push(format!("relative {enabled}"));
        self.allow_relative
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.calls.lock().push(format!("visible {visible}"));
    }
}

pub struct FakePad {
    pub instance_id: u32,
}

impl GamepadDevice for FakePad {
    fn instance_id(&self) -> u32 {
        self.instance_id
    }
}

/// Opens a pad whose instance id is `device_index + 100`.
pub struct FakeBackend;

pub const INSTANCE_BASE: u32 = 100;

impl GamepadBackend for FakeBackend {
    fn open(&mut self, device_index: u32) -> Result<Box<dyn GamepadDevice>, InputError> {
        Ok(Box::new(FakePad {
            instance_id: device_index + INSTANCE_BASE,
        }))
    }
}

pub struct Rig {
    pub input: InputHandler,
    pub sink: Arc<RecordingSink>,
    pub timers: Arc<ManualTimerDriver>,
    pub cursor: FakeCursor,
}

pub fn rig(config: InputConfig) -> Rig {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());
    let timers = Arc::new(ManualTimerDriver::new());
    let cursor = FakeCursor {
        allow_relative: true,
        ..Default::default()
    };
    let input = InputHandler::builder(config)
        .sink(sink.clone())
        .timers(timers.clone())
        .cursor(Box::new(cursor.clone()))
        .gamepad_backend(Box::new(FakeBackend))
        .build()
        .expect("handler");
    Rig {
        input,
        sink,
        timers,
        cursor,
    }
}

pub fn default_rig() -> Rig {
    rig(InputConfig::default())
}
