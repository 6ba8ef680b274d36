//! The seams between the compositor, its frame source and the window system.

use crate::colorspace::ConversionParams;
use crate::errors::{ImportError, RenderError};
use crate::frame::PixelFormat;
use crate::importer::ImageFactory;

/// Shows the finished back buffer.
pub trait Presenter {
    fn present(&mut self) -> Result<(), RenderError>;
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The new frame was drawn and presented.
    Presented,
    /// Importing the new frame failed; the previous picture was presented again.
    PresentedStale,
}

/// Draws decoded frames.
pub trait FrameRenderer {
    type Frame;

    /// Draw and present `frame`.
    ///
    /// Errors for which [`RenderError::is_fatal`] holds mean this renderer
    /// cannot continue with the stream.
    fn render_frame(&mut self, frame: &Self::Frame) -> Result<FrameOutcome, RenderError>;

    /// The drawable changed size.
    fn resize(&mut self, width: u32, height: u32);
}

/// The GL work behind one composited frame.
pub trait PlaneDrawer {
    /// A pipeline for the stream format exists.
    fn is_specialized(&self) -> bool;

    /// Build the program and geometry for `format`, replacing any previous
    /// pipeline.
    fn specialize(&mut self, format: PixelFormat) -> Result<(), RenderError>;

    /// Attach `images` to the plane textures, plane 0 first.
    fn bind_planes<F: ImageFactory>(
        &mut self,
        factory: &F,
        images: &[F::Image],
    ) -> Result<(), ImportError>;

    /// Clear and draw the plane textures into `viewport`, given as GL
    /// `(x, y, width, height)` with a bottom-left origin.
    fn draw(&mut self, conversion: &ConversionParams, viewport: (i32, i32, i32, i32));
}
