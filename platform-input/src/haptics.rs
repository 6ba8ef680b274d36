//! Controller rumble.
//!
//! Devices expose one of three haptic interfaces. The method is chosen once
//! at attach time and every rumble request for that controller goes through
//! it.

use crate::gamepad::GamepadDevice;
use bitflags::bitflags;
use tracing::{debug, trace};

/// Duration of a dual-motor rumble request. The host refreshes or stops it
/// well before this expires.
pub const RUMBLE_DURATION_MS: u32 = 30_000;

/// Simple-rumble weight of the high-frequency motor.
pub const SIMPLE_RUMBLE_HIGH_FREQ_WEIGHT: f32 = 0.33;
/// Simple-rumble weight of the low-frequency motor.
pub const SIMPLE_RUMBLE_LOW_FREQ_WEIGHT: f32 = 0.8;

bitflags! {
    /// Legacy haptic effects a device advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HapticCaps: u8 {
        /// Independent large/small motor effect.
        const LEFT_RIGHT    = 1 << 0;
        /// Single-strength rumble.
        const SIMPLE_RUMBLE = 1 << 1;
    }
}

/// How rumble requests reach a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HapticMethod {
    /// No rumble support.
    #[default]
    None,
    /// Native low/high frequency motor control.
    DualMotor,
    /// Legacy left/right effect.
    LeftRight,
    /// Legacy single-strength rumble.
    SimpleRumble,
}

impl HapticMethod {
    /// Pick the best method for a freshly opened device.
    ///
    /// Dual-motor support is tested with a tiny non-zero rumble: a zero
    /// request may be short-circuited by the platform and report success
    /// without reaching the driver.
    pub fn detect(device: &mut dyn GamepadDevice) -> Self {
        if device.rumble(1, 1, 1).is_ok() {
            return Self::DualMotor;
        }

        let caps = device.haptic_caps();
        if caps.contains(HapticCaps::LEFT_RIGHT) {
            Self::LeftRight
        } else if caps.contains(HapticCaps::SIMPLE_RUMBLE) {
            Self::SimpleRumble
        } else {
            Self::None
        }
    }
}

/// Strength for a simple-rumble device, weighted toward the low-frequency motor.
pub fn simple_rumble_strength(low_freq: u16, high_freq: u16) -> f32 {
    let weighted = SIMPLE_RUMBLE_HIGH_FREQ_WEIGHT * f32::from(high_freq)
        + SIMPLE_RUMBLE_LOW_FREQ_WEIGHT * f32::from(low_freq);
    (weighted / 65535.0).min(1.0)
}

/// Apply a rumble request. A zero/zero request only stops the current effect.
pub fn apply(method: HapticMethod, device: &mut dyn GamepadDevice, low_freq: u16, high_freq: u16) {
    trace!(?method, low_freq, high_freq, "Rumble");

    let result = match method {
        HapticMethod::None => Ok(()),
        HapticMethod::DualMotor => device.rumble(low_freq, high_freq, RUMBLE_DURATION_MS),
        HapticMethod::LeftRight => {
            device.stop_left_right();
            if low_freq == 0 && high_freq == 0 {
                return;
            }
            // Legacy magnitudes top out at 32767
            device.play_left_right(low_freq / 2, high_freq / 2)
        }
        HapticMethod::SimpleRumble => {
            device.stop_simple_rumble();
            if low_freq == 0 && high_freq == 0 {
                return;
            }
            device.play_simple_rumble(simple_rumble_strength(low_freq, high_freq))
        }
    };

    if let Err(e) = result {
        debug!(error = %e, "Rumble request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InputError;

    #[derive(Default)]
    struct LegacyPad {
        caps: HapticCaps,
        log: Vec<String>,
    }

    impl GamepadDevice for LegacyPad {
        fn instance_id(&self) -> u32 {
            1
        }

        fn haptic_caps(&self) -> HapticCaps {
            self.caps
        }

        fn play_left_right(&mut self, large: u16, small: u16) -> Result<(), InputError> {
            self.log.push(format!("lr {large} {small}"));
            Ok(())
        }

        fn stop_left_right(&mut self) {
            self.log.push("lr stop".into());
        }

        fn play_simple_rumble(&mut self, strength: f32) -> Result<(), InputError> {
            self.log.push(format!("simple {strength:.3}"));
            Ok(())
        }

        fn stop_simple_rumble(&mut self) {
            self.log.push("simple stop".into());
        }
    }

    #[test]
    fn test_detect_order() {
        let mut pad = LegacyPad {
            caps: HapticCaps::LEFT_RIGHT | HapticCaps::SIMPLE_RUMBLE,
            ..Default::default()
        };
        assert_eq!(HapticMethod::detect(&mut pad), HapticMethod::LeftRight);

        pad.caps = HapticCaps::SIMPLE_RUMBLE;
        assert_eq!(HapticMethod::detect(&mut pad), HapticMethod::SimpleRumble);

        pad.caps = HapticCaps::empty();
        assert_eq!(HapticMethod::detect(&mut pad), HapticMethod::None);
    }

    #[test]
    fn test_left_right_halves_and_replaces() {
        let mut pad = LegacyPad::default();
        apply(HapticMethod::LeftRight, &mut pad, 65535, 1000);
        assert_eq!(pad.log, vec!["lr stop", "lr 32767 500"]);
    }

    #[test]
    fn test_zero_request_only_stops() {
        let mut pad = LegacyPad::default();
        apply(HapticMethod::LeftRight, &mut pad, 0, 0);
        apply(HapticMethod::SimpleRumble, &mut pad, 0, 0);
        assert_eq!(pad.log, vec!["lr stop", "simple stop"]);
    }

    #[test]
    fn test_simple_rumble_strength() {
        assert_eq!(simple_rumble_strength(0, 0), 0.0);
        assert!((simple_rumble_strength(65535, 0) - 0.8).abs() < 1e-4);
        assert!((simple_rumble_strength(0, 65535) - 0.33).abs() < 1e-4);
        assert_eq!(simple_rumble_strength(65535, 65535), 1.0);
    }
}
