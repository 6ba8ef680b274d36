//! EGL dma-buf image import and presentation.

use crate::errors::{ImportError, RenderError};
use crate::importer::{ImageFactory, PlaneImport};
use crate::renderer::Presenter;
use khronos_egl as egl;
use std::ffi::c_void;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use tracing::{debug, info};

/// Dynamically loaded EGL 1.5.
pub type Egl = egl::DynamicInstance<egl::EGL1_5>;

// EGL_EXT_image_dma_buf_import
pub const LINUX_DMA_BUF_EXT: egl::Enum = 0x3270;
pub const LINUX_DRM_FOURCC_EXT: egl::Attrib = 0x3271;
pub const DMA_BUF_PLANE0_FD_EXT: egl::Attrib = 0x3272;
pub const DMA_BUF_PLANE0_OFFSET_EXT: egl::Attrib = 0x3273;
pub const DMA_BUF_PLANE0_PITCH_EXT: egl::Attrib = 0x3274;
// EGL_EXT_image_dma_buf_import_modifiers
pub const DMA_BUF_PLANE0_MODIFIER_LO_EXT: egl::Attrib = 0x3443;
pub const DMA_BUF_PLANE0_MODIFIER_HI_EXT: egl::Attrib = 0x3444;

pub const DMA_BUF_IMPORT: &str = "EGL_EXT_image_dma_buf_import";
pub const DMA_BUF_IMPORT_MODIFIERS: &str = "EGL_EXT_image_dma_buf_import_modifiers";

type ImageTargetTexture2DOes = unsafe extern "C" fn(target: u32, image: *const c_void);

/// A display's extension list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EglExtensions {
    names: Vec<String>,
}

impl EglExtensions {
    /// Split a space-separated `EGL_EXTENSIONS` string.
    pub fn parse(list: &str) -> Self {
        Self {
            names: list.split_ascii_whitespace().map(str::to_owned).collect(),
        }
    }

    /// Query `display`.
    pub fn query(egl: &Egl, display: egl::Display) -> Result<Self, RenderError> {
        let list = egl
            .query_string(Some(display), egl::EXTENSIONS)
            .map_err(|e| RenderError::EglLoad(format!("cannot query extensions: {e}")))?;
        Ok(Self::parse(&list.to_string_lossy()))
    }

    /// Exact name match; a prefix of a longer name does not count.
    pub fn supports(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Attribute list for importing one plane with `eglCreateImage`.
pub fn dma_buf_attributes(plane: &PlaneImport<'_>) -> Vec<egl::Attrib> {
    let mut attribs = vec![
        LINUX_DRM_FOURCC_EXT,
        plane.fourcc as egl::Attrib,
        egl::WIDTH as egl::Attrib,
        plane.width as egl::Attrib,
        egl::HEIGHT as egl::Attrib,
        plane.height as egl::Attrib,
        DMA_BUF_PLANE0_FD_EXT,
        plane.fd.as_raw_fd() as egl::Attrib,
        DMA_BUF_PLANE0_OFFSET_EXT,
        plane.offset as egl::Attrib,
        DMA_BUF_PLANE0_PITCH_EXT,
        plane.pitch as egl::Attrib,
    ];
    if let Some(modifier) = plane.modifier {
        let bits = u64::from(modifier);
        attribs.extend_from_slice(&[
            DMA_BUF_PLANE0_MODIFIER_LO_EXT,
            (bits & 0xFFFF_FFFF) as egl::Attrib,
            DMA_BUF_PLANE0_MODIFIER_HI_EXT,
            (bits >> 32) as egl::Attrib,
        ]);
    }
    attribs.push(egl::NONE as egl::Attrib);
    attribs
}

/// Load EGL from the system library.
pub fn load() -> Result<Arc<Egl>, RenderError> {
    // SAFETY: libEGL is a well-behaved system library with no load-time side effects.
    let egl = unsafe { Egl::load_required() }.map_err(|e| RenderError::EglLoad(format!("{e:?}")))?;
    Ok(Arc::new(egl))
}

/// Resolve GL entry points through `eglGetProcAddress`.
///
/// # Safety
///
/// A GL context created from `egl` must be current on the calling thread
/// whenever the returned context is used.
pub unsafe fn load_gl(egl: &Egl) -> glow::Context {
    glow::Context::from_loader_function(|name| {
        egl.get_proc_address(name)
            .map_or(std::ptr::null(), |f| f as *const c_void)
    })
}

/// Imports dma-buf planes as `EGLImage`s on one display.
///
/// The display's GL context must be current on the calling thread whenever
/// images are bound.
pub struct EglImageFactory {
    egl: Arc<Egl>,
    display: egl::Display,
    modifiers: bool,
    image_target: ImageTargetTexture2DOes,
}

impl EglImageFactory {
    /// Check the display for dma-buf import and resolve the GL binding entry point.
    pub fn new(egl: Arc<Egl>, display: egl::Display) -> Result<Self, RenderError> {
        let extensions = EglExtensions::query(&egl, display)?;
        if !extensions.supports(DMA_BUF_IMPORT) {
            return Err(RenderError::MissingExtension(DMA_BUF_IMPORT));
        }
        let modifiers = extensions.supports(DMA_BUF_IMPORT_MODIFIERS);

        let proc = egl
            .get_proc_address("glEGLImageTargetTexture2DOES")
            .ok_or(RenderError::MissingExtension("GL_OES_EGL_image"))?;
        // SAFETY: the entry point has this signature per GL_OES_EGL_image.
        let image_target: ImageTargetTexture2DOes = unsafe { std::mem::transmute(proc) };

        info!(modifiers, "EGL dma-buf import available");
        Ok(Self {
            egl,
            display,
            modifiers,
            image_target,
        })
    }
}

impl ImageFactory for EglImageFactory {
    type Image = egl::Image;

    fn supports_modifiers(&self) -> bool {
        self.modifiers
    }

    fn create_image(&self, plane: &PlaneImport<'_>) -> Result<egl::Image, ImportError> {
        let attribs = dma_buf_attributes(plane);
        // SAFETY: dma-buf import takes no client buffer and no context.
        let (context, buffer) = unsafe {
            (
                egl::Context::from_ptr(egl::NO_CONTEXT),
                egl::ClientBuffer::from_ptr(std::ptr::null_mut()),
            )
        };
        self.egl
            .create_image(self.display, context, LINUX_DMA_BUF_EXT, buffer, &attribs)
            .map_err(|e| ImportError::CreateImage {
                plane: plane.plane,
                reason: e.to_string(),
            })
    }

    fn destroy_image(&self, image: egl::Image) {
        if let Err(e) = self.egl.destroy_image(self.display, image) {
            debug!(error = %e, "eglDestroyImage failed");
        }
    }

    fn bind_texture(&self, image: &egl::Image) -> Result<(), ImportError> {
        // SAFETY: a texture is bound to TEXTURE_2D and the image belongs to our display.
        unsafe { (self.image_target)(glow::TEXTURE_2D, image.as_ptr() as *const c_void) };
        Ok(())
    }
}

/// Presents by swapping an EGL window surface.
pub struct EglPresenter {
    egl: Arc<Egl>,
    display: egl::Display,
    surface: egl::Surface,
}

impl EglPresenter {
    pub fn new(egl: Arc<Egl>, display: egl::Display, surface: egl::Surface) -> Self {
        Self {
            egl,
            display,
            surface,
        }
    }

    /// Disable vsync throttling on the surface.
    pub fn set_swap_interval(&self, interval: i32) -> Result<(), RenderError> {
        self.egl
            .swap_interval(self.display, interval)
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}

impl Presenter for EglPresenter {
    fn present(&mut self) -> Result<(), RenderError> {
        self.egl
            .swap_buffers(self.display, self.surface)
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}
