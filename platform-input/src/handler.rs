//! The owning input context.
//!
//! [`InputHandler`] holds every piece of input state and is the only thing
//! the embedding event loop talks to. Everything here runs on the event
//! thread; the timer thread only ever reaches the motion accumulator and the
//! sink, and reports other expiries back through a channel drained by
//! [`InputHandler::dispatch_timers`].

use crate::capture::{CaptureController, CaptureState, CursorControl};
use crate::config::InputConfig;
use crate::dispatcher::Dispatcher;
use crate::errors::InputError;
use crate::events::{
    EventBacklog, InputEvent, KeyEvent, MouseButtonEvent, MouseMotionEvent, MouseWheelEvent,
    PointerSource,
};
use crate::gamepad::{GamepadBackend, GamepadDevice, GamepadManager};
use crate::gestures::TouchTracker;
use crate::keyboard::KeyboardState;
use crate::mouse::{map_mouse_button, PointerMapper, VideoPosition};
use crate::shortcuts::{HotkeyAction, HotkeyMatcher};
use crate::timer::{TimerDriver, TimerEvent, TokioTimerDriver};
use std::sync::Arc;
use stream_protocol::{ButtonAction, InputSink};
use tracing::{debug, info, trace};

/// Something the embedding application has to do in response to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// End the session.
    Quit,
    /// Flip between windowed and fullscreen.
    ToggleFullscreen,
    /// Show or hide the statistics overlay.
    ToggleStatsOverlay,
    /// A gamepad entered or left mouse emulation.
    MouseEmulationChanged { controller: i16, active: bool },
}

/// Cursor for headless sessions: relative mode is never available.
struct NoCursor;

impl CursorControl for NoCursor {
    fn set_relative_mode(&mut self, _enabled: bool) -> bool {
        false
    }

    fn set_cursor_visible(&mut self, _visible: bool) {}
}

/// Backend for sessions without controller support.
struct NoGamepads;

impl GamepadBackend for NoGamepads {
    fn open(&mut self, device_index: u32) -> Result<Box<dyn GamepadDevice>, InputError> {
        Err(InputError::ControllerOpen {
            device_index,
            reason: "no controller backend".to_string(),
        })
    }
}

/// Builder for an [`InputHandler`].
pub struct InputHandlerBuilder {
    config: InputConfig,
    sink: Option<Arc<dyn InputSink>>,
    timers: Option<Arc<dyn TimerDriver>>,
    cursor: Option<Box<dyn CursorControl>>,
    gamepads: Option<Box<dyn GamepadBackend>>,
    window_size: (u32, u32),
}

impl InputHandlerBuilder {
    /// Where packets go. Required.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn InputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Timer driver. Defaults to a private tokio timer thread.
    #[must_use]
    pub fn timers(mut self, timers: Arc<dyn TimerDriver>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Cursor control for capture. Defaults to one without relative mode.
    #[must_use]
    pub fn cursor(mut self, cursor: Box<dyn CursorControl>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Controller backend. Defaults to none.
    #[must_use]
    pub fn gamepad_backend(mut self, backend: Box<dyn GamepadBackend>) -> Self {
        self.gamepads = Some(backend);
        self
    }

    /// Initial window size. Defaults to the stream size.
    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Validate the configuration and start the flush timer.
    pub fn build(self) -> Result<InputHandler, InputError> {
        self.config.validate()?;
        let sink = self
            .sink
            .ok_or_else(|| InputError::Config("an input sink is required".to_string()))?;
        let timers: Arc<dyn TimerDriver> = match self.timers {
            Some(timers) => timers,
            None => Arc::new(TokioTimerDriver::new()?),
        };
        let cursor = self.cursor.unwrap_or_else(|| Box::new(NoCursor));
        let backend = self.gamepads.unwrap_or_else(|| Box::new(NoGamepads));

        let (timer_tx, timer_rx) = flume::unbounded();
        let config = self.config;

        info!(
            stream = %format_args!("{}x{}", config.stream_width, config.stream_height),
            absolute_mouse = config.absolute_mouse_mode,
            multi_controller = config.multi_controller,
            "Input handler ready"
        );

        Ok(InputHandler {
            dispatcher: Dispatcher::new(sink, Arc::clone(&timers), config.mouse_poll_interval()),
            hotkeys: HotkeyMatcher::new(config.window_manager),
            keyboard: KeyboardState::new(),
            capture: CaptureController::new(cursor, config.absolute_mouse_mode),
            touch: TouchTracker::new(Arc::clone(&timers), timer_tx.clone()),
            gamepads: GamepadManager::new(
                backend,
                config.multi_controller,
                config.gamepad_mouse,
                timers,
                timer_tx,
            ),
            pointer: PointerMapper::new(
                config.stream_width,
                config.stream_height,
                self.window_size.0,
                self.window_size.1,
            ),
            last_position: None,
            timer_events: timer_rx,
            fullscreen: false,
        })
    }
}

/// Translates raw input into protocol packets and local session actions.
pub struct InputHandler {
    // Field order is drop order: the dispatcher stops the flush timer before
    // the timer driver it shares can go away.
    dispatcher: Dispatcher,
    hotkeys: HotkeyMatcher,
    keyboard: KeyboardState,
    capture: CaptureController,
    touch: TouchTracker,
    gamepads: GamepadManager,
    pointer: PointerMapper,
    /// Last absolute position sent to the host.
    last_position: Option<VideoPosition>,
    timer_events: flume::Receiver<TimerEvent>,
    fullscreen: bool,
}

impl InputHandler {
    /// Start building a handler for `config`.
    pub fn builder(config: InputConfig) -> InputHandlerBuilder {
        let window_size = (config.stream_width, config.stream_height);
        InputHandlerBuilder {
            config,
            sink: None,
            timers: None,
            cursor: None,
            gamepads: None,
            window_size,
        }
    }

    /// Handle one raw event.
    ///
    /// `backlog` exposes events queued behind this one so controller axis
    /// motion can be coalesced; pass [`crate::NoBacklog`] when there is none.
    pub fn handle_event(
        &mut self,
        event: InputEvent,
        backlog: &mut dyn EventBacklog,
    ) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        match event {
            InputEvent::Key(ev) => self.handle_key(&ev, &mut actions),
            InputEvent::MouseButton(ev) => self.handle_mouse_button(&ev),
            InputEvent::MouseMotion(ev) => self.handle_mouse_motion(&ev),
            InputEvent::MouseWheel(ev) => self.handle_mouse_wheel(&ev),
            InputEvent::Touch(ev) => {
                // Touch moves the host pointer behind our back
                self.last_position = None;
                self.touch.handle(&ev, &self.pointer, self.dispatcher.sink())
            }
            InputEvent::ControllerAxis(ev) => {
                self.gamepads.handle_axis(&ev, backlog, self.dispatcher.sink())
            }
            InputEvent::ControllerButton(ev) => {
                self.gamepads
                    .handle_button(&ev, self.dispatcher.sink(), &mut actions)
            }
            InputEvent::ControllerAdded { device_index } => {
                self.gamepads.attach(device_index, self.dispatcher.sink());
            }
            InputEvent::ControllerRemoved { instance_id } => {
                self.gamepads
                    .detach(instance_id, self.dispatcher.sink(), &mut actions)
            }
            InputEvent::FocusGained {
                left_button_down_inside,
            } => {
                // Clicking into the window should not need a second click to capture
                if left_button_down_inside {
                    self.set_capture_active(true);
                }
            }
            InputEvent::FocusLost => self.handle_focus_lost(),
            InputEvent::Resized { width, height } => self.set_window_size(width, height),
        }

        actions
    }

    /// Act on timer expiries reported since the last call.
    pub fn dispatch_timers(&mut self) {
        while let Ok(ev) = self.timer_events.try_recv() {
            self.handle_timer_event(ev);
        }
    }

    /// Act on one timer expiry.
    pub fn handle_timer_event(&mut self, ev: TimerEvent) {
        match ev {
            TimerEvent::LongPress { generation } => {
                self.touch.on_long_press(generation, self.dispatcher.sink())
            }
            TimerEvent::MouseEmulation { slot } => {
                self.gamepads.on_emulation_tick(slot, self.dispatcher.sink())
            }
        }
    }

    /// Receiver for timer expiries, for event loops that want to select on it.
    pub fn timer_events(&self) -> &flume::Receiver<TimerEvent> {
        &self.timer_events
    }

    fn handle_key(&mut self, ev: &KeyEvent, actions: &mut Vec<SessionAction>) {
        if let Some(action) = self
            .hotkeys
            .match_press(ev.keycode, ev.scancode, ev.mods, ev.pressed)
        {
            self.run_hotkey(action, actions);
            return;
        }

        if ev.repeat {
            return;
        }

        self.keyboard
            .forward(self.dispatcher.sink(), ev.scancode, ev.mods, ev.pressed);
    }

    fn run_hotkey(&mut self, action: HotkeyAction, actions: &mut Vec<SessionAction>) {
        match action {
            HotkeyAction::Quit => actions.push(SessionAction::Quit),
            HotkeyAction::ToggleCapture => {
                self.set_capture_active(!self.capture.is_active());
                // Their key-up events will never reach us
                self.raise_all_keys();
            }
            HotkeyAction::ToggleMouseMode => {
                self.capture.toggle_mouse_mode();
                self.last_position = None;
            }
            HotkeyAction::ToggleFullscreen => {
                actions.push(SessionAction::ToggleFullscreen);
                self.raise_all_keys();
            }
            HotkeyAction::ToggleStatsOverlay => {
                actions.push(SessionAction::ToggleStatsOverlay);
                self.raise_all_keys();
            }
        }
    }

    fn handle_mouse_button(&mut self, ev: &MouseButtonEvent) {
        if ev.source == PointerSource::Touch {
            return;
        }

        if !self.capture.is_active() {
            // Capture on release so the click that focused us is not half-sent
            if ev.button == 1 && !ev.pressed {
                self.set_capture_active(true);
            }
            return;
        }

        let Some(button) = map_mouse_button(ev.button) else {
            debug!(button = ev.button, "Unhandled button event");
            return;
        };
        let action = if ev.pressed {
            ButtonAction::Press
        } else {
            ButtonAction::Release
        };
        self.dispatcher.sink().send_mouse_button_event(action, button);
    }

    fn handle_mouse_motion(&mut self, ev: &MouseMotionEvent) {
        if !self.capture.is_active() || ev.source == PointerSource::Touch {
            return;
        }

        if self.capture.absolute_mode() {
            let Some((x, y)) = ev.position else {
                return;
            };
            let p = self.pointer.map_window_point(x, y);
            if self.last_position == Some(p) {
                return;
            }
            self.last_position = Some(p);
            self.dispatcher.sink().send_mouse_position_event(
                p.x,
                p.y,
                p.reference_width,
                p.reference_height,
            );
        } else {
            self.dispatcher.add_motion(ev.xrel, ev.yrel);
        }
    }

    fn handle_mouse_wheel(&mut self, ev: &MouseWheelEvent) {
        if !self.capture.is_active() || ev.source == PointerSource::Touch {
            return;
        }

        if ev.y != 0 {
            let clicks = ev.y.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8;
            self.dispatcher.sink().send_scroll_event(clicks);
        }
    }

    fn handle_focus_lost(&mut self) {
        // Releasing capture mid-transition breaks leaving fullscreen
        if !self.fullscreen && !self.capture.absolute_mode() {
            self.set_capture_active(false);
        }
        // Shortcuts that steal focus (Alt+Tab) would otherwise leave keys stuck
        self.raise_all_keys();
    }

    /// Take or release input capture.
    pub fn set_capture_active(&mut self, active: bool) {
        self.capture.set_active(active);
        self.last_position = None;
    }

    /// Whether input is currently routed to the stream.
    pub fn is_capture_active(&self) -> bool {
        self.capture.is_active()
    }

    /// Current capture state.
    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Absolute mouse mode is selected.
    pub fn absolute_mouse_mode(&self) -> bool {
        self.capture.absolute_mode()
    }

    /// Release every key the host believes is held.
    pub fn raise_all_keys(&mut self) {
        self.keyboard.raise_all(self.dispatcher.sink());
    }

    /// Tell the handler whether the window is fullscreen. Fullscreen keeps
    /// capture across focus loss.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        trace!(fullscreen, "Fullscreen state");
        self.fullscreen = fullscreen;
    }

    /// Window drawable size changed.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.pointer.set_window_size(width, height);
        self.last_position = None;
    }

    /// Forward a rumble request from the host.
    pub fn rumble(&mut self, controller: u16, low_freq: u16, high_freq: u16) {
        if usize::from(controller) >= crate::gamepad::MAX_GAMEPADS {
            return;
        }
        self.gamepads.rumble(controller, low_freq, high_freq);
    }

    /// Attached controllers.
    pub fn gamepads(&self) -> &GamepadManager {
        &self.gamepads
    }

    /// Keys currently tracked down.
    pub fn keys_held(&self) -> usize {
        self.keyboard.held()
    }
}
