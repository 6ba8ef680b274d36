//! Zero-copy import of hardware frames, one image per plane.

use crate::errors::{ImportError, RenderError};
use crate::frame::{DecodedFrame, FrameExporter, PixelFormat, PrimeSurfaceDescriptor};
use drm_fourcc::{DrmFourcc, DrmModifier};
use std::os::fd::BorrowedFd;
use tracing::{debug, info, warn};

/// Most planes a single surface may be split into.
pub const MAX_PLANES: usize = 4;

/// Everything needed to wrap one plane as an image.
#[derive(Debug, Clone, Copy)]
pub struct PlaneImport<'a> {
    pub plane: usize,
    pub fourcc: DrmFourcc,
    pub width: u32,
    pub height: u32,
    pub fd: BorrowedFd<'a>,
    pub offset: u32,
    pub pitch: u32,
    /// Only set when modifier-aware import is available and the exporter
    /// reported a real modifier.
    pub modifier: Option<DrmModifier>,
}

/// Creates and destroys native images over dma-buf planes.
pub trait ImageFactory {
    type Image;

    /// Whether explicit format modifiers may be passed on import.
    fn supports_modifiers(&self) -> bool;

    fn create_image(&self, plane: &PlaneImport<'_>) -> Result<Self::Image, ImportError>;

    fn destroy_image(&self, image: Self::Image);

    /// Attach `image` as the storage of the currently bound 2D texture.
    fn bind_texture(&self, image: &Self::Image) -> Result<(), ImportError>;
}

/// Images for one frame. Destroys them on drop, before the exported file
/// descriptors close.
pub struct ImportedFrame<'f, F: ImageFactory> {
    factory: &'f F,
    images: Vec<F::Image>,
    // Declared last: dropped after the images are gone
    _descriptor: PrimeSurfaceDescriptor,
}

impl<'f, F: ImageFactory> ImportedFrame<'f, F> {
    pub fn images(&self) -> &[F::Image] {
        &self.images
    }

    pub fn plane_count(&self) -> usize {
        self.images.len()
    }
}

impl<F: ImageFactory> Drop for ImportedFrame<'_, F> {
    fn drop(&mut self) {
        for image in self.images.drain(..) {
            self.factory.destroy_image(image);
        }
    }
}

/// Width and height of `plane` for a frame of the given size. Chroma planes
/// are subsampled by two in both directions.
pub fn plane_dimensions(plane: usize, width: u32, height: u32) -> (u32, u32) {
    if plane == 0 {
        (width, height)
    } else {
        (width / 2, height / 2)
    }
}

/// Turns decoder surfaces into per-plane images.
pub struct HardwareFrameImporter<E, F> {
    exporter: E,
    factory: F,
    format: Option<PixelFormat>,
}

impl<E: FrameExporter, F: ImageFactory> HardwareFrameImporter<E, F> {
    /// Fails when the exporter cannot produce dma-bufs at all.
    pub fn new(exporter: E, factory: F) -> Result<Self, RenderError> {
        if !exporter.can_export_dmabuf() {
            return Err(RenderError::ExportUnsupported);
        }
        Ok(Self {
            exporter,
            factory,
            format: None,
        })
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Format fixed by the first frame, if any frame was seen.
    pub fn format(&self) -> Option<PixelFormat> {
        self.format
    }

    /// Check `frame` against the stream format, fixing it on the first frame.
    ///
    /// Only NV12 is accepted. A later frame in a different format is
    /// rejected rather than re-negotiated.
    pub fn negotiate(&mut self, frame: &E::Frame) -> Result<PixelFormat, RenderError> {
        let Some(format) = frame.hw_format() else {
            return Err(RenderError::NotHardwareFrame);
        };

        match self.format {
            Some(current) if current == format => Ok(format),
            Some(current) => Err(RenderError::FormatChanged {
                from: current,
                to: format,
            }),
            None if format == PixelFormat::Nv12 => {
                info!(?format, "Selected hardware surface format");
                self.format = Some(format);
                Ok(format)
            }
            None => Err(RenderError::UnsupportedFormat(format)),
        }
    }

    /// Export and wrap every plane of `frame`.
    ///
    /// On failure images created so far are destroyed and the exported
    /// descriptors closed; nothing carries over to the next frame.
    pub fn import(&self, frame: &E::Frame) -> Result<ImportedFrame<'_, F>, ImportError> {
        let descriptor = self.exporter.export_surface(frame)?;
        if descriptor.layers.len() > MAX_PLANES {
            return Err(ImportError::TooManyPlanes(descriptor.layers.len()));
        }

        let use_modifiers = self.factory.supports_modifiers();
        let mut images = Vec::with_capacity(descriptor.layers.len());

        for (plane, layer) in descriptor.layers.iter().enumerate() {
            let object = descriptor.object_for(layer)?;
            let fourcc = DrmFourcc::try_from(layer.drm_format)
                .map_err(|_| ImportError::UnknownFourcc(layer.drm_format))?;
            let modifier = DrmModifier::from(object.modifier);
            let (width, height) = plane_dimensions(plane, frame.width(), frame.height());

            let import = PlaneImport {
                plane,
                fourcc,
                width,
                height,
                fd: descriptor.fd_for(layer)?,
                offset: layer.offset,
                pitch: layer.pitch,
                modifier: (use_modifiers && modifier != DrmModifier::Invalid).then_some(modifier),
            };

            match self.factory.create_image(&import) {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!(plane, error = %e, "Plane import failed, dropping frame");
                    for image in images {
                        self.factory.destroy_image(image);
                    }
                    return Err(e);
                }
            }
        }

        debug!(planes = images.len(), "Imported frame");
        Ok(ImportedFrame {
            factory: &self.factory,
            images,
            _descriptor: descriptor,
        })
    }
}
