//! Error types for the input pipeline.

use std::io;
use thiserror::Error;

/// Errors raised while setting up or running the input pipeline.
///
/// Nothing on the per-event path is fatal: unknown keys, buttons and axes are
/// logged and dropped. These errors cover setup and device plumbing.
#[derive(Debug, Error)]
pub enum InputError {
    /// Configuration value out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Timer runtime or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A controller could not be opened by the backend.
    #[error("Failed to open controller {device_index}: {reason}")]
    ControllerOpen { device_index: u32, reason: String },

    /// The device rejected a haptic request.
    #[error("Haptic effect failed: {0}")]
    Haptic(String),
}

impl InputError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ControllerOpen { .. } | Self::Haptic(_))
    }
}
