//! Error types for frame import and rendering.

use crate::frame::PixelFormat;
use thiserror::Error;

/// Failures of the render path.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Frame source cannot export dma-buf surfaces")]
    ExportUnsupported,

    #[error("Required extension {0} is unavailable")]
    MissingExtension(&'static str),

    #[error("Failed to load EGL: {0}")]
    EglLoad(String),

    #[error("Unsupported hardware format {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Stream format changed from {from:?} to {to:?}")]
    FormatChanged { from: PixelFormat, to: PixelFormat },

    #[error("Frame is not resident in device memory")]
    NotHardwareFrame,

    #[error("Shader build failed: {0}")]
    Shader(String),

    #[error("GL call failed: {0}")]
    Gl(String),

    #[error("Present failed: {0}")]
    Present(String),
}

impl RenderError {
    /// Whether the caller must give up on this renderer and pick another.
    ///
    /// Non-fatal errors only cost the current frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RenderError::NotHardwareFrame | RenderError::Present(_))
    }
}

/// Failures importing one frame. Always limited to that frame.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Surface export failed: {0}")]
    Export(String),

    #[error("Surface has {0} planes, at most {max} are supported", max = crate::importer::MAX_PLANES)]
    TooManyPlanes(usize),

    #[error("Malformed surface descriptor: {0}")]
    BadDescriptor(String),

    #[error("Unknown DRM fourcc {0:#010x}")]
    UnknownFourcc(u32),

    #[error("Image creation failed for plane {plane}: {reason}")]
    CreateImage { plane: usize, reason: String },

    #[error("Binding image to texture failed: {0}")]
    Bind(String),
}
