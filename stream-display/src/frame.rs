//! Decoded frames and the dma-buf export boundary.

use crate::colorspace::{ColorRange, ColorSpace};
use crate::errors::ImportError;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

/// Memory layout of a decoded hardware surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luma plane followed by an interleaved half-resolution chroma plane.
    Nv12,
    /// 10-bit variant of NV12.
    P010,
    /// Three separate 8-bit planes.
    Yuv420p,
    /// Anything else, by decoder-specific id.
    Other(i32),
}

/// A frame produced by the video decoder.
pub trait DecodedFrame {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Layout of the device surface behind this frame. `None` for frames
    /// decoded into system memory.
    fn hw_format(&self) -> Option<PixelFormat>;
    fn color_space(&self) -> ColorSpace;
    fn color_range(&self) -> ColorRange;
}

/// One exported memory object.
#[derive(Debug)]
pub struct PrimeObject {
    /// Closed when the descriptor is dropped.
    pub fd: OwnedFd,
    pub size: u32,
    /// DRM format modifier describing tiling.
    pub modifier: u64,
}

/// One plane of an exported surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeLayer {
    /// DRM fourcc of this plane alone (R8, GR88, ...).
    pub drm_format: u32,
    /// Index into [`PrimeSurfaceDescriptor::objects`].
    pub object_index: usize,
    pub offset: u32,
    pub pitch: u32,
}

/// A device surface exported as dma-buf objects, one layer per plane.
#[derive(Debug)]
pub struct PrimeSurfaceDescriptor {
    pub fourcc: u32,
    pub width: u32,
    pub height: u32,
    pub objects: Vec<PrimeObject>,
    pub layers: Vec<PrimeLayer>,
}

impl PrimeSurfaceDescriptor {
    /// Memory object backing `layer`.
    pub fn object_for(&self, layer: &PrimeLayer) -> Result<&PrimeObject, ImportError> {
        self.objects.get(layer.object_index).ok_or_else(|| {
            ImportError::BadDescriptor(format!(
                "layer references object {} of {}",
                layer.object_index,
                self.objects.len()
            ))
        })
    }

    /// Borrow the file descriptor backing `layer`.
    pub fn fd_for(&self, layer: &PrimeLayer) -> Result<BorrowedFd<'_>, ImportError> {
        self.object_for(layer).map(|o| o.fd.as_fd())
    }
}

/// A decoder backend able to hand out its surfaces as dma-bufs.
pub trait FrameExporter {
    type Frame: DecodedFrame;

    /// Whether zero-copy export is possible at all. When it is not, stream
    /// setup has to pick a copying renderer instead.
    fn can_export_dmabuf(&self) -> bool;

    /// Export the surface behind `frame` with one layer per plane, after
    /// waiting for decoding into it to finish.
    fn export_surface(&self, frame: &Self::Frame) -> Result<PrimeSurfaceDescriptor, ImportError>;
}
