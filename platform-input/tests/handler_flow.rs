mod common;

use common::{default_rig, rig, INSTANCE_BASE};
use platform_input::events::{
    ControllerAxis, ControllerAxisEvent, ControllerButton, ControllerButtonEvent, KeyEvent,
    MouseButtonEvent, MouseMotionEvent, MouseWheelEvent, PointerSource, TouchDevice, TouchEvent,
    TouchPhase,
};
use platform_input::{
    CaptureState, InputConfig, InputEvent, KeyMods, Keycode, NoBacklog, Scancode, SessionAction,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use stream_protocol::{
    ButtonAction, ControllerButtons, ControllerPacket, InputPacket, KeyAction, KeyModifiers,
    MouseButton,
};

const CHORD: KeyMods = KeyMods::LCTRL.union(KeyMods::LALT).union(KeyMods::LSHIFT);

fn key(scancode: Scancode, keycode: Keycode, mods: KeyMods, pressed: bool, repeat: bool) -> InputEvent {
    InputEvent::Key(KeyEvent {
        scancode,
        keycode,
        mods,
        pressed,
        repeat,
    })
}

fn letter(c: char) -> Scancode {
    Scancode::letter(c).expect("letter")
}

fn mouse_button(button: u8, pressed: bool) -> InputEvent {
    InputEvent::MouseButton(MouseButtonEvent {
        source: PointerSource::Mouse,
        button,
        pressed,
    })
}

fn motion(x: i32, y: i32, xrel: i32, yrel: i32) -> InputEvent {
    InputEvent::MouseMotion(MouseMotionEvent {
        source: PointerSource::Mouse,
        position: Some((x, y)),
        xrel,
        yrel,
    })
}

fn raw_motion(xrel: i32, yrel: i32) -> InputEvent {
    InputEvent::MouseMotion(MouseMotionEvent {
        source: PointerSource::Mouse,
        position: None,
        xrel,
        yrel,
    })
}

fn touch(phase: TouchPhase, x: f32, y: f32, fingers: u32, timestamp: Instant) -> InputEvent {
    InputEvent::Touch(TouchEvent {
        device: TouchDevice::Direct,
        phase,
        finger_id: 7,
        x,
        y,
        fingers,
        timestamp,
    })
}

fn pad_button(instance_id: u32, button: ControllerButton, pressed: bool, at: Instant) -> InputEvent {
    InputEvent::ControllerButton(ControllerButtonEvent {
        instance_id,
        button,
        pressed,
        timestamp: at,
    })
}

fn key_packet(key_code: i16, action: KeyAction, modifiers: KeyModifiers) -> InputPacket {
    InputPacket::Keyboard {
        key_code,
        action,
        modifiers,
    }
}

fn button_packet(action: ButtonAction, button: MouseButton) -> InputPacket {
    InputPacket::MouseButton { action, button }
}

#[test]
fn test_key_press_release_with_repeat() {
    let mut r = default_rig();
    let a = letter('a');

    r.input.handle_event(key(a, Keycode::from_char('a'), KeyMods::empty(), true, false), &mut NoBacklog);
    r.input.handle_event(key(a, Keycode::from_char('a'), KeyMods::empty(), true, true), &mut NoBacklog);
    r.input.handle_event(key(a, Keycode::from_char('a'), KeyMods::empty(), false, false), &mut NoBacklog);

    assert_eq!(
        r.sink.packets(),
        vec![
            key_packet(0x41, KeyAction::Down, KeyModifiers::empty()),
            key_packet(0x41, KeyAction::Up, KeyModifiers::empty()),
        ]
    );
    assert_eq!(r.input.keys_held(), 0);
}

#[test]
fn test_raise_all_keys_when_nothing_held() {
    let mut r = default_rig();
    r.input.raise_all_keys();
    assert!(r.sink.is_empty());
}

#[test]
fn test_quit_chord_is_not_forwarded() {
    let mut r = default_rig();
    let actions = r
        .input
        .handle_event(key(Scancode::Q, Keycode::Q, CHORD, true, false), &mut NoBacklog);
    assert_eq!(actions, vec![SessionAction::Quit]);
    assert!(r.sink.is_empty());
}

#[test]
fn test_fullscreen_chord_raises_held_keys() {
    let mut r = default_rig();
    let c = letter('c');
    r.input.handle_event(key(c, Keycode::from_char('c'), KeyMods::empty(), true, false), &mut NoBacklog);
    r.sink.take();

    let actions = r
        .input
        .handle_event(key(Scancode::X, Keycode::X, CHORD, true, false), &mut NoBacklog);
    assert_eq!(actions, vec![SessionAction::ToggleFullscreen]);
    assert_eq!(
        r.sink.take(),
        vec![key_packet(0x43, KeyAction::Up, KeyModifiers::empty())]
    );
}

#[test]
fn test_capture_chord_toggles() {
    let mut r = default_rig();
    assert_eq!(r.input.capture_state(), CaptureState::Released);

    r.input.handle_event(key(Scancode::Z, Keycode::Z, CHORD, true, false), &mut NoBacklog);
    assert_eq!(r.input.capture_state(), CaptureState::CapturedRelative);

    r.input.handle_event(key(Scancode::Z, Keycode::Z, CHORD, true, false), &mut NoBacklog);
    assert_eq!(r.input.capture_state(), CaptureState::Released);
    assert_eq!(
        *r.cursor.calls.lock(),
        vec!["relative true".to_string(), "relative false".to_string()]
    );
}

#[test]
fn test_capture_chord_needs_window_manager() {
    let config = InputConfig::builder().window_manager(false).build().expect("config");
    let mut r = rig(config);

    let actions = r
        .input
        .handle_event(key(Scancode::Z, Keycode::Z, CHORD, true, false), &mut NoBacklog);
    assert!(actions.is_empty());
    assert_eq!(r.input.capture_state(), CaptureState::Released);
    // Without the chord the key goes to the host
    assert_eq!(
        r.sink.packets(),
        vec![key_packet(0x5A, KeyAction::Down, KeyModifiers::SHIFT | KeyModifiers::CTRL | KeyModifiers::ALT)]
    );
}

#[test]
fn test_left_release_takes_capture() {
    let mut r = default_rig();

    r.input.handle_event(mouse_button(1, true), &mut NoBacklog);
    assert!(!r.input.is_capture_active());
    r.input.handle_event(mouse_button(1, false), &mut NoBacklog);
    assert!(r.input.is_capture_active());
    assert!(r.sink.is_empty());

    r.input.handle_event(mouse_button(3, true), &mut NoBacklog);
    r.input.handle_event(mouse_button(9, true), &mut NoBacklog);
    assert_eq!(
        r.sink.packets(),
        vec![button_packet(ButtonAction::Press, MouseButton::Right)]
    );
}

#[test]
fn test_touch_sourced_mouse_events_are_ignored() {
    let mut r = default_rig();
    r.input.set_capture_active(true);
    r.input.handle_event(
        InputEvent::MouseButton(MouseButtonEvent {
            source: PointerSource::Touch,
            button: 1,
            pressed: true,
        }),
        &mut NoBacklog,
    );
    r.input.handle_event(
        InputEvent::MouseWheel(MouseWheelEvent {
            source: PointerSource::Touch,
            x: 0,
            y: 1,
        }),
        &mut NoBacklog,
    );
    assert!(r.sink.is_empty());
}

#[test]
fn test_relative_motion_is_batched() {
    let mut r = default_rig();
    r.input.set_capture_active(true);

    r.input.handle_event(motion(0, 0, 3, -2), &mut NoBacklog);
    r.input.handle_event(motion(0, 0, 3, -2), &mut NoBacklog);
    assert!(r.sink.is_empty());

    r.timers.advance(Duration::from_millis(5));
    assert_eq!(r.sink.take(), vec![InputPacket::MouseMove { dx: 6, dy: -4 }]);

    r.timers.advance(Duration::from_millis(20));
    assert!(r.sink.is_empty());
}

#[test]
fn test_motion_ignored_without_capture() {
    let mut r = default_rig();
    r.input.handle_event(motion(0, 0, 3, -2), &mut NoBacklog);
    r.timers.advance(Duration::from_millis(10));
    assert!(r.sink.is_empty());
}

#[test]
fn test_absolute_motion_is_letterboxed() {
    let config = InputConfig::builder()
        .stream_size(1920, 1080)
        .absolute_mouse_mode(true)
        .build()
        .expect("config");
    let mut r = rig(config);
    r.input.set_window_size(1024, 768);
    r.input.set_capture_active(true);
    assert_eq!(r.input.capture_state(), CaptureState::CapturedFake);

    // Inside the top bar: clamped to the first video row
    r.input.handle_event(motion(100, 10, 0, 0), &mut NoBacklog);
    r.input.handle_event(motion(512, 384, 0, 0), &mut NoBacklog);
    assert_eq!(
        r.sink.packets(),
        vec![
            InputPacket::MousePosition {
                x: 100,
                y: 0,
                reference_width: 1024,
                reference_height: 576,
            },
            InputPacket::MousePosition {
                x: 512,
                y: 288,
                reference_width: 1024,
                reference_height: 576,
            },
        ]
    );
}

#[test]
fn test_absolute_motion_sends_each_position_once() {
    let config = InputConfig::builder()
        .stream_size(1280, 720)
        .absolute_mouse_mode(true)
        .build()
        .expect("config");
    let mut r = rig(config);
    r.input.set_window_size(1280, 720);
    r.input.set_capture_active(true);

    // One physical move: the window position, then the raw device delta
    r.input.handle_event(motion(200, 100, 0, 0), &mut NoBacklog);
    r.input.handle_event(raw_motion(4, 2), &mut NoBacklog);
    // Same spot again
    r.input.handle_event(motion(200, 100, 0, 0), &mut NoBacklog);
    r.input.handle_event(motion(201, 100, 0, 0), &mut NoBacklog);

    assert_eq!(
        r.sink.packets(),
        vec![
            InputPacket::MousePosition {
                x: 200,
                y: 100,
                reference_width: 1280,
                reference_height: 720,
            },
            InputPacket::MousePosition {
                x: 201,
                y: 100,
                reference_width: 1280,
                reference_height: 720,
            },
        ]
    );
    r.timers.advance(Duration::from_millis(10));
    assert_eq!(r.sink.len(), 2);
}

#[test]
fn test_recapture_resends_unchanged_position() {
    let config = InputConfig::builder()
        .stream_size(1280, 720)
        .absolute_mouse_mode(true)
        .build()
        .expect("config");
    let mut r = rig(config);
    r.input.set_window_size(1280, 720);
    r.input.set_capture_active(true);

    r.input.handle_event(motion(50, 60, 0, 0), &mut NoBacklog);
    r.input.set_capture_active(false);
    r.input.set_capture_active(true);
    r.input.handle_event(motion(50, 60, 0, 0), &mut NoBacklog);
    assert_eq!(r.sink.len(), 2);
}

#[test]
fn test_wheel_sends_scroll() {
    let mut r = default_rig();
    r.input.set_capture_active(true);
    let wheel = |y| {
        InputEvent::MouseWheel(MouseWheelEvent {
            source: PointerSource::Mouse,
            x: 0,
            y,
        })
    };
    r.input.handle_event(wheel(2), &mut NoBacklog);
    r.input.handle_event(wheel(0), &mut NoBacklog);
    r.input.handle_event(wheel(-1), &mut NoBacklog);
    assert_eq!(
        r.sink.packets(),
        vec![
            InputPacket::Scroll { amount: 2 },
            InputPacket::Scroll { amount: -1 },
        ]
    );
}

#[test]
fn test_focus_lost_releases_capture_and_keys() {
    let mut r = default_rig();
    r.input.set_capture_active(true);
    let a = letter('a');
    r.input.handle_event(key(a, Keycode::from_char('a'), KeyMods::LSHIFT, true, false), &mut NoBacklog);

    r.input.handle_event(InputEvent::FocusLost, &mut NoBacklog);
    assert!(!r.input.is_capture_active());
    assert_eq!(
        r.sink.packets(),
        vec![
            key_packet(0x41, KeyAction::Down, KeyModifiers::SHIFT),
            key_packet(0x41, KeyAction::Up, KeyModifiers::empty()),
        ]
    );
}

#[test]
fn test_focus_lost_keeps_capture_in_fullscreen() {
    let mut r = default_rig();
    r.input.set_fullscreen(true);
    r.input.set_capture_active(true);
    r.input.handle_event(InputEvent::FocusLost, &mut NoBacklog);
    assert!(r.input.is_capture_active());
}

#[test]
fn test_focus_gained_by_click_captures() {
    let mut r = default_rig();
    r.input.handle_event(
        InputEvent::FocusGained {
            left_button_down_inside: false,
        },
        &mut NoBacklog,
    );
    assert!(!r.input.is_capture_active());
    r.input.handle_event(
        InputEvent::FocusGained {
            left_button_down_inside: true,
        },
        &mut NoBacklog,
    );
    assert!(r.input.is_capture_active());
}

fn touch_rig() -> common::Rig {
    let config = InputConfig::builder()
        .stream_size(1000, 1000)
        .build()
        .expect("config");
    let mut r = rig(config);
    r.input.set_window_size(1000, 1000);
    r
}

fn position(x: i16, y: i16) -> InputPacket {
    InputPacket::MousePosition {
        x,
        y,
        reference_width: 1000,
        reference_height: 1000,
    }
}

#[test]
fn test_double_tap_keeps_first_position() {
    let mut r = touch_rig();
    let t0 = Instant::now();
    let p = 0.515625;

    r.input.handle_event(touch(TouchPhase::Down, p, p, 1, t0), &mut NoBacklog);
    r.input.handle_event(touch(TouchPhase::Up, p, p, 0, t0 + Duration::from_millis(40)), &mut NoBacklog);
    r.input.handle_event(touch(TouchPhase::Down, p, p, 1, t0 + Duration::from_millis(120)), &mut NoBacklog);

    assert_eq!(
        r.sink.packets(),
        vec![
            position(515, 515),
            button_packet(ButtonAction::Press, MouseButton::Left),
            position(515, 515),
            button_packet(ButtonAction::Release, MouseButton::Left),
            button_packet(ButtonAction::Release, MouseButton::Right),
            // Second tap inside the dead zone: no position update
            button_packet(ButtonAction::Press, MouseButton::Left),
        ]
    );
}

#[test]
fn test_long_press_becomes_right_click_once() {
    let mut r = touch_rig();
    let t0 = Instant::now();
    let p = 0.515625;

    r.input.handle_event(touch(TouchPhase::Down, p, p, 1, t0), &mut NoBacklog);
    r.sink.take();

    r.timers.advance(Duration::from_millis(700));
    r.input.dispatch_timers();
    r.timers.advance(Duration::from_millis(700));
    r.input.dispatch_timers();

    assert_eq!(
        r.sink.take(),
        vec![
            button_packet(ButtonAction::Release, MouseButton::Left),
            button_packet(ButtonAction::Press, MouseButton::Right),
        ]
    );
}

#[test]
fn test_moving_finger_cancels_long_press() {
    let mut r = touch_rig();
    let t0 = Instant::now();

    r.input.handle_event(touch(TouchPhase::Down, 0.25, 0.25, 1, t0), &mut NoBacklog);
    r.input.handle_event(touch(TouchPhase::Motion, 0.5, 0.5, 1, t0), &mut NoBacklog);
    r.sink.take();

    r.timers.advance(Duration::from_millis(700));
    r.input.dispatch_timers();
    assert!(r.sink.is_empty());
}

fn pad(id: u32) -> u32 {
    id + INSTANCE_BASE
}

fn mask_of(packet: &InputPacket) -> i16 {
    match packet {
        InputPacket::Controller(p) => p.active_mask,
        other => panic!("expected controller packet, got {other:?}"),
    }
}

#[test]
fn test_gamepad_slots_and_mask() {
    let mut r = default_rig();

    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 1 }, &mut NoBacklog);
    assert_eq!(r.input.gamepads().index_of(pad(0)), Some(0));
    assert_eq!(r.input.gamepads().index_of(pad(1)), Some(1));
    assert_eq!(r.input.gamepads().active_mask(), 0b11);

    let arrivals = r.sink.take();
    assert_eq!(arrivals.len(), 2);
    assert_eq!(mask_of(&arrivals[0]), 0b01);
    assert_eq!(mask_of(&arrivals[1]), 0b11);

    r.input.handle_event(InputEvent::ControllerRemoved { instance_id: pad(0) }, &mut NoBacklog);
    assert_eq!(r.input.gamepads().active_mask(), 0b10);
    assert_eq!(r.input.gamepads().index_of(pad(1)), Some(1));
    assert_eq!(
        r.sink.take(),
        vec![InputPacket::Controller(ControllerPacket::neutral(0, 0b10))]
    );
}

#[test]
fn test_axis_motion_is_coalesced() {
    let mut r = default_rig();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.sink.take();

    let axis = |instance_id, axis, value| {
        InputEvent::ControllerAxis(ControllerAxisEvent {
            instance_id,
            axis,
            value,
        })
    };
    let mut backlog: VecDeque<InputEvent> = VecDeque::from(vec![
        axis(pad(0), ControllerAxis::LeftY, i16::MIN),
        axis(pad(0), ControllerAxis::TriggerRight, i16::MAX),
        InputEvent::FocusLost,
    ]);

    r.input.handle_event(axis(pad(0), ControllerAxis::LeftX, 1000), &mut backlog);

    assert_eq!(backlog.len(), 1);
    let packets = r.sink.take();
    assert_eq!(packets.len(), 1);
    let InputPacket::Controller(state) = packets[0] else {
        panic!("expected controller packet");
    };
    assert_eq!(state.left_stick_x, 1000);
    assert_eq!(state.left_stick_y, 32767);
    assert_eq!(state.right_trigger, 255);
}

#[test]
fn test_quit_gamepad_combo() {
    let mut r = default_rig();
    let t0 = Instant::now();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.sink.take();

    let mut actions = Vec::new();
    for button in [
        ControllerButton::Start,
        ControllerButton::Back,
        ControllerButton::LeftShoulder,
        ControllerButton::RightShoulder,
    ] {
        actions.extend(r.input.handle_event(pad_button(pad(0), button, true, t0), &mut NoBacklog));
    }

    assert_eq!(actions, vec![SessionAction::Quit]);
    let packets = r.sink.take();
    assert_eq!(
        packets.last(),
        Some(&InputPacket::Controller(ControllerPacket::neutral(0, 0b1)))
    );
    let chord = packets.iter().any(|p| {
        matches!(p, InputPacket::Controller(c) if c.buttons == ControllerButtons::QUIT_CHORD)
    });
    assert!(!chord);
}

fn start_mouse_emulation(r: &mut common::Rig, t0: Instant) -> Vec<SessionAction> {
    r.input.handle_event(pad_button(pad(0), ControllerButton::Start, true, t0), &mut NoBacklog);
    r.input.handle_event(
        pad_button(pad(0), ControllerButton::Start, false, t0 + Duration::from_millis(800)),
        &mut NoBacklog,
    )
}

#[test]
fn test_mouse_emulation_toggle() {
    let mut r = default_rig();
    let t0 = Instant::now();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);

    let actions = start_mouse_emulation(&mut r, t0);
    assert_eq!(
        actions,
        vec![SessionAction::MouseEmulationChanged {
            controller: 0,
            active: true,
        }]
    );
    assert!(r.input.gamepads().is_emulating_mouse(pad(0)));
    r.sink.take();

    // Full deflection right moves the pointer instead of the stick
    r.input.handle_event(
        InputEvent::ControllerAxis(ControllerAxisEvent {
            instance_id: pad(0),
            axis: ControllerAxis::LeftX,
            value: 32766,
        }),
        &mut NoBacklog,
    );
    r.input.handle_event(pad_button(pad(0), ControllerButton::A, true, t0), &mut NoBacklog);
    assert_eq!(
        r.sink.take(),
        vec![button_packet(ButtonAction::Press, MouseButton::Left)]
    );

    r.timers.advance(Duration::from_millis(50));
    r.input.dispatch_timers();
    assert_eq!(r.sink.take(), vec![InputPacket::MouseMove { dx: 62, dy: 0 }]);

    let actions = start_mouse_emulation(&mut r, t0 + Duration::from_secs(2));
    assert_eq!(
        actions,
        vec![SessionAction::MouseEmulationChanged {
            controller: 0,
            active: false,
        }]
    );
    assert!(!r.input.gamepads().is_emulating_mouse(pad(0)));
}

#[test]
fn test_short_start_press_does_not_emulate() {
    let mut r = default_rig();
    let t0 = Instant::now();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.input.handle_event(pad_button(pad(0), ControllerButton::Start, true, t0), &mut NoBacklog);
    let actions = r.input.handle_event(
        pad_button(pad(0), ControllerButton::Start, false, t0 + Duration::from_millis(200)),
        &mut NoBacklog,
    );
    assert!(actions.is_empty());
    assert!(!r.input.gamepads().is_emulating_mouse(pad(0)));
}

#[test]
fn test_stale_emulation_tick_after_reattach() {
    let mut r = default_rig();
    let t0 = Instant::now();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    start_mouse_emulation(&mut r, t0);
    r.input.handle_event(
        InputEvent::ControllerAxis(ControllerAxisEvent {
            instance_id: pad(0),
            axis: ControllerAxis::LeftX,
            value: 32766,
        }),
        &mut NoBacklog,
    );

    // Tick queued but not yet handled when the pad goes away
    r.timers.advance(Duration::from_millis(50));
    let actions = r
        .input
        .handle_event(InputEvent::ControllerRemoved { instance_id: pad(0) }, &mut NoBacklog);
    assert_eq!(
        actions,
        vec![SessionAction::MouseEmulationChanged {
            controller: 0,
            active: false,
        }]
    );
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.sink.take();

    r.input.dispatch_timers();
    r.timers.advance(Duration::from_millis(200));
    r.input.dispatch_timers();
    assert!(r.sink.is_empty());
}

#[test]
fn test_rumble_out_of_range_is_ignored() {
    let mut r = default_rig();
    r.input.handle_event(InputEvent::ControllerAdded { device_index: 0 }, &mut NoBacklog);
    r.input.rumble(9, 0xFFFF, 0xFFFF);
    r.input.rumble(0, 0xFFFF, 0xFFFF);
}
