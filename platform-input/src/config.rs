//! Input pipeline configuration.

use crate::errors::InputError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding the relative-motion flush period (ms).
pub const MOUSE_POLLING_INTERVAL_ENV: &str = "MOUSE_POLLING_INTERVAL";

/// Settings for the input pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Stream width in pixels; absolute positions are scaled against it.
    #[serde(default = "default_stream_width")]
    pub stream_width: u32,
    /// Stream height in pixels.
    #[serde(default = "default_stream_height")]
    pub stream_height: u32,
    /// Start with absolute (position) mouse mode instead of relative.
    #[serde(default)]
    pub absolute_mouse_mode: bool,
    /// Report each gamepad under its own index.
    #[serde(default = "default_true")]
    pub multi_controller: bool,
    /// Allow holding start to turn a gamepad into a mouse.
    #[serde(default = "default_true")]
    pub gamepad_mouse: bool,
    /// Relative motion flush period in milliseconds.
    #[serde(default = "default_mouse_poll_interval_ms")]
    pub mouse_poll_interval_ms: u64,
    /// A window manager is present. Without one the capture, mouse-mode and
    /// fullscreen chords are disabled.
    #[serde(default = "default_true")]
    pub window_manager: bool,
}

fn default_stream_width() -> u32 {
    1280
}

fn default_stream_height() -> u32 {
    720
}

fn default_mouse_poll_interval_ms() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            stream_width: default_stream_width(),
            stream_height: default_stream_height(),
            absolute_mouse_mode: false,
            multi_controller: default_true(),
            gamepad_mouse: default_true(),
            mouse_poll_interval_ms: default_mouse_poll_interval_ms(),
            window_manager: default_true(),
        }
    }
}

impl InputConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> InputConfigBuilder {
        InputConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, InputError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.stream_width == 0 || self.stream_height == 0 {
            return Err(InputError::Config(format!(
                "Stream size {}x{} must be non-zero",
                self.stream_width, self.stream_height
            )));
        }

        if self.mouse_poll_interval_ms == 0 {
            return Err(InputError::Config(
                "Mouse poll interval cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        let value = std::env::var(MOUSE_POLLING_INTERVAL_ENV).ok();
        self.apply_poll_interval_override(value.as_deref());
    }

    /// Apply a raw `MOUSE_POLLING_INTERVAL` value. Zero, empty or garbage
    /// values leave the configured interval alone.
    pub fn apply_poll_interval_override(&mut self, value: Option<&str>) {
        let Some(ms) = value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        else {
            return;
        };

        warn!(interval_ms = ms, "Using custom mouse polling interval");
        self.mouse_poll_interval_ms = ms;
    }

    /// Relative motion flush period.
    #[must_use]
    pub fn mouse_poll_interval(&self) -> Duration {
        Duration::from_millis(self.mouse_poll_interval_ms)
    }
}

/// Builder for creating an `InputConfig`.
#[derive(Default)]
pub struct InputConfigBuilder {
    config: InputConfig,
}

impl InputConfigBuilder {
    /// Sets the stream resolution.
    #[must_use]
    pub fn stream_size(mut self, width: u32, height: u32) -> Self {
        self.config.stream_width = width;
        self.config.stream_height = height;
        self
    }

    /// Start in absolute mouse mode.
    #[must_use]
    pub fn absolute_mouse_mode(mut self, enabled: bool) -> Self {
        self.config.absolute_mouse_mode = enabled;
        self
    }

    /// Report each gamepad under its own index.
    #[must_use]
    pub fn multi_controller(mut self, enabled: bool) -> Self {
        self.config.multi_controller = enabled;
        self
    }

    /// Allow gamepad mouse emulation.
    #[must_use]
    pub fn gamepad_mouse(mut self, enabled: bool) -> Self {
        self.config.gamepad_mouse = enabled;
        self
    }

    /// Sets the relative motion flush period.
    #[must_use]
    pub fn mouse_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.mouse_poll_interval_ms = ms;
        self
    }

    /// Declare whether a window manager is present.
    #[must_use]
    pub fn window_manager(mut self, present: bool) -> Self {
        self.config.window_manager = present;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<InputConfig, InputError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
