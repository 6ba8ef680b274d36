//! stream-display: zero-copy presentation of hardware-decoded video.
//!
//! Decoded NV12 surfaces are exported as dma-bufs through a
//! [`FrameExporter`], wrapped plane by plane as EGL images by an
//! [`ImageFactory`], bound to GL textures and converted to RGB by the
//! [`Compositor`] using the frame's colorspace and range.
//!
//! ```no_run
//! # fn demo<E: stream_display::FrameExporter>(
//! #     exporter: E,
//! #     display: khronos_egl::Display,
//! #     surface: khronos_egl::Surface,
//! #     frame: &E::Frame,
//! # ) -> Result<(), stream_display::RenderError> {
//! use stream_display::{egl, Compositor, FrameRenderer, HardwareFrameImporter};
//!
//! let instance = egl::load()?;
//! let factory = egl::EglImageFactory::new(instance.clone(), display)?;
//! let importer = HardwareFrameImporter::new(exporter, factory)?;
//! let presenter = egl::EglPresenter::new(instance.clone(), display, surface);
//! let gl = unsafe { egl::load_gl(&instance) };
//!
//! let mut compositor = Compositor::new(gl, importer, presenter, (1280, 720))?;
//! compositor.render_frame(frame)?;
//! # Ok(())
//! # }
//! ```

pub mod colorspace;
pub mod compositor;
pub mod egl;
pub mod errors;
pub mod frame;
pub mod importer;
pub mod renderer;
pub mod shaders;

pub use colorspace::{ColorRange, ColorSpace, ConversionParams};
pub use compositor::{letterbox_viewport, Compositor, GlesDrawer};
pub use errors::{ImportError, RenderError};
pub use frame::{DecodedFrame, FrameExporter, PixelFormat, PrimeLayer, PrimeObject, PrimeSurfaceDescriptor};
pub use importer::{HardwareFrameImporter, ImageFactory, ImportedFrame, PlaneImport, MAX_PLANES};
pub use renderer::{FrameOutcome, FrameRenderer, PlaneDrawer, Presenter};
