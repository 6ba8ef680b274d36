//! Draws imported NV12 frames with a fixed YUV to RGB pipeline.
//!
//! [`Compositor`] decides what happens to each frame: negotiation, colour
//! conversion, import and presentation. [`GlesDrawer`] owns every GL object.
//! Its textures are made up front. The program and quad are built lazily once
//! the first frame fixes the surface format. All of it is deleted on drop.

use crate::colorspace::ConversionParams;
use crate::errors::{ImportError, RenderError};
use crate::frame::{DecodedFrame, FrameExporter, PixelFormat};
use crate::importer::{HardwareFrameImporter, ImageFactory};
use crate::renderer::{FrameOutcome, FrameRenderer, PlaneDrawer, Presenter};
use crate::shaders;
use glow::HasContext;
use stream_common::{scale_source_to_destination, Rect};
use tracing::{debug, info, trace, warn};

type Texture = <glow::Context as HasContext>::Texture;
type Program = <glow::Context as HasContext>::Program;
type Shader = <glow::Context as HasContext>::Shader;
type VertexArray = <glow::Context as HasContext>::VertexArray;
type Buffer = <glow::Context as HasContext>::Buffer;
type UniformLocation = <glow::Context as HasContext>::UniformLocation;

/// Planes sampled by the NV12 shader.
const PLANES: usize = 2;

/// Full-screen quad: position then texture coordinate per vertex.
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 16] = [
     1.0,  1.0, 1.0, 0.0,
     1.0, -1.0, 1.0, 1.0,
    -1.0, -1.0, 0.0, 1.0,
    -1.0,  1.0, 0.0, 0.0,
];

/// Two triangles over [`QUAD_VERTICES`].
pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// GL viewport `(x, y, width, height)` that letterboxes `video` inside
/// `window`. GL's origin is the bottom-left corner.
pub fn letterbox_viewport(video: (u32, u32), window: (u32, u32)) -> (i32, i32, i32, i32) {
    let fit = scale_source_to_destination(
        Rect::from_size(video.0, video.1),
        Rect::from_size(window.0, window.1),
    );
    let gl_y = window.1 as i32 - fit.bottom();
    (fit.x, gl_y, fit.width as i32, fit.height as i32)
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn u32_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

struct Pipeline {
    program: Program,
    vao: VertexArray,
    vbo: Buffer,
    ebo: Buffer,
    planes: [Option<UniformLocation>; PLANES],
    matrix: Option<UniformLocation>,
    offset: Option<UniformLocation>,
}

/// [`PlaneDrawer`] over a GLES 3 context.
///
/// Owns the plane textures and, once specialised, the program and quad.
/// Everything is deleted on drop.
pub struct GlesDrawer {
    gl: glow::Context,
    textures: [Texture; PLANES],
    pipeline: Option<Pipeline>,
}

impl GlesDrawer {
    /// Create the plane textures and clear the surface.
    ///
    /// `gl` must be current on this thread for the drawer's lifetime.
    pub fn new(gl: glow::Context) -> Result<Self, RenderError> {
        let textures = unsafe {
            let luma = gl.create_texture().map_err(RenderError::Gl)?;
            let chroma = match gl.create_texture() {
                Ok(t) => t,
                Err(e) => {
                    gl.delete_texture(luma);
                    return Err(RenderError::Gl(e));
                }
            };
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
            [luma, chroma]
        };

        Ok(Self {
            gl,
            textures,
            pipeline: None,
        })
    }

    fn compile(&self, kind: u32, source: &str) -> Result<Shader, RenderError> {
        unsafe {
            let shader = self.gl.create_shader(kind).map_err(RenderError::Shader)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(RenderError::Shader(format!("compile: {log}")))
            }
        }
    }

    fn link_program(&self) -> Result<Program, RenderError> {
        let vertex = self.compile(glow::VERTEX_SHADER, shaders::VERTEX_SHADER)?;
        let fragment = match self.compile(glow::FRAGMENT_SHADER, shaders::NV12_FRAGMENT_SHADER) {
            Ok(s) => s,
            Err(e) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(e);
            }
        };

        unsafe {
            let result = match self.gl.create_program() {
                Ok(program) => {
                    self.gl.attach_shader(program, vertex);
                    self.gl.attach_shader(program, fragment);
                    self.gl.link_program(program);
                    self.gl.detach_shader(program, vertex);
                    self.gl.detach_shader(program, fragment);
                    if self.gl.get_program_link_status(program) {
                        Ok(program)
                    } else {
                        let log = self.gl.get_program_info_log(program);
                        self.gl.delete_program(program);
                        Err(RenderError::Shader(format!("link: {log}")))
                    }
                }
                Err(e) => Err(RenderError::Shader(e)),
            };
            self.gl.delete_shader(vertex);
            self.gl.delete_shader(fragment);
            result
        }
    }

    unsafe fn build_quad(&self, program: Program) -> Result<Pipeline, RenderError> {
        let gl = &self.gl;
        let vao = gl.create_vertex_array().map_err(RenderError::Gl)?;
        let vbo = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_vertex_array(vao);
                return Err(RenderError::Gl(e));
            }
        };
        let ebo = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_buffer(vbo);
                gl.delete_vertex_array(vao);
                return Err(RenderError::Gl(e));
            }
        };

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &f32_bytes(&QUAD_VERTICES), glow::STATIC_DRAW);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            &u32_bytes(&QUAD_INDICES),
            glow::STATIC_DRAW,
        );

        let stride = 4 * std::mem::size_of::<f32>() as i32;
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, 2 * std::mem::size_of::<f32>() as i32);
        gl.enable_vertex_attrib_array(1);

        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);

        Ok(Pipeline {
            program,
            vao,
            vbo,
            ebo,
            planes: shaders::UNIFORM_PLANES.map(|name| gl.get_uniform_location(program, name)),
            matrix: gl.get_uniform_location(program, shaders::UNIFORM_MATRIX),
            offset: gl.get_uniform_location(program, shaders::UNIFORM_OFFSET),
        })
    }

    fn delete_pipeline(&self, pipeline: Pipeline) {
        unsafe {
            self.gl.delete_program(pipeline.program);
            self.gl.delete_vertex_array(pipeline.vao);
            self.gl.delete_buffer(pipeline.vbo);
            self.gl.delete_buffer(pipeline.ebo);
        }
    }
}

impl PlaneDrawer for GlesDrawer {
    fn is_specialized(&self) -> bool {
        self.pipeline.is_some()
    }

    fn specialize(&mut self, format: PixelFormat) -> Result<(), RenderError> {
        if format != PixelFormat::Nv12 {
            return Err(RenderError::UnsupportedFormat(format));
        }
        if let Some(old) = self.pipeline.take() {
            self.delete_pipeline(old);
        }

        let program = self.link_program()?;
        let pipeline = match unsafe { self.build_quad(program) } {
            Ok(p) => p,
            Err(e) => {
                unsafe { self.gl.delete_program(program) };
                return Err(e);
            }
        };

        info!(?format, "Render pipeline ready");
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn bind_planes<F: ImageFactory>(
        &mut self,
        factory: &F,
        images: &[F::Image],
    ) -> Result<(), ImportError> {
        for (unit, (image, texture)) in images.iter().zip(self.textures).enumerate() {
            unsafe {
                self.gl.active_texture(glow::TEXTURE0 + unit as u32);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            }
            factory.bind_texture(image)?;
            unsafe {
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            }
        }
        Ok(())
    }

    fn draw(&mut self, conversion: &ConversionParams, viewport: (i32, i32, i32, i32)) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        let (x, y, w, h) = viewport;

        unsafe {
            let gl = &self.gl;
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.viewport(x, y, w, h);

            gl.use_program(Some(pipeline.program));
            gl.uniform_matrix_3_f32_slice(pipeline.matrix.as_ref(), false, &conversion.matrix);
            let [ox, oy, oz] = conversion.offsets;
            gl.uniform_3_f32(pipeline.offset.as_ref(), ox, oy, oz);
            for (unit, (location, texture)) in pipeline.planes.iter().zip(self.textures).enumerate() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                gl.uniform_1_i32(location.as_ref(), unit as i32);
            }

            gl.bind_vertex_array(Some(pipeline.vao));
            gl.draw_elements(glow::TRIANGLES, QUAD_INDICES.len() as i32, glow::UNSIGNED_INT, 0);
            gl.bind_vertex_array(None);
        }
    }
}

impl Drop for GlesDrawer {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            self.delete_pipeline(pipeline);
        }
        for texture in self.textures {
            unsafe { self.gl.delete_texture(texture) };
        }
    }
}

/// Compositor for zero-copy NV12 frames.
///
/// Frame policy lives here; the GL work is delegated to a [`PlaneDrawer`].
pub struct Compositor<E, F, P, D = GlesDrawer> {
    importer: HardwareFrameImporter<E, F>,
    presenter: P,
    drawer: D,
    conversion: Option<ConversionParams>,
    video_size: Option<(u32, u32)>,
    window_size: (u32, u32),
}

impl<E: FrameExporter, F: ImageFactory, P: Presenter> Compositor<E, F, P, GlesDrawer> {
    /// Compositor drawing through `gl`, which must stay current on this
    /// thread for the compositor's lifetime.
    pub fn new(
        gl: glow::Context,
        importer: HardwareFrameImporter<E, F>,
        presenter: P,
        window_size: (u32, u32),
    ) -> Result<Self, RenderError> {
        let drawer = GlesDrawer::new(gl)?;
        Ok(Self::with_drawer(drawer, importer, presenter, window_size))
    }
}

impl<E: FrameExporter, F: ImageFactory, P: Presenter, D: PlaneDrawer> Compositor<E, F, P, D> {
    pub fn with_drawer(
        drawer: D,
        importer: HardwareFrameImporter<E, F>,
        presenter: P,
        window_size: (u32, u32),
    ) -> Self {
        debug!(width = window_size.0, height = window_size.1, "Compositor initialized");
        Self {
            importer,
            presenter,
            drawer,
            conversion: None,
            video_size: None,
            window_size,
        }
    }

    /// Conversion chosen from the first frame.
    pub fn conversion(&self) -> Option<&ConversionParams> {
        self.conversion.as_ref()
    }

    pub fn importer(&self) -> &HardwareFrameImporter<E, F> {
        &self.importer
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn drawer(&self) -> &D {
        &self.drawer
    }

    fn viewport(&self) -> (i32, i32, i32, i32) {
        match self.video_size {
            Some(video) => letterbox_viewport(video, self.window_size),
            None => (0, 0, self.window_size.0 as i32, self.window_size.1 as i32),
        }
    }
}

impl<E: FrameExporter, F: ImageFactory, P: Presenter, D: PlaneDrawer> FrameRenderer
    for Compositor<E, F, P, D>
{
    type Frame = E::Frame;

    fn render_frame(&mut self, frame: &E::Frame) -> Result<FrameOutcome, RenderError> {
        let format = self.importer.negotiate(frame)?;
        if !self.drawer.is_specialized() {
            self.drawer.specialize(format)?;
        }
        let conversion = *self
            .conversion
            .get_or_insert_with(|| ConversionParams::select(frame.color_space(), frame.color_range()));
        if self.video_size.is_none() {
            debug!(width = frame.width(), height = frame.height(), "Video size");
            self.video_size = Some((frame.width(), frame.height()));
        }
        let viewport = self.viewport();

        // Images stay alive until the frame has been presented
        let imported = match self.importer.import(frame) {
            Ok(imported) => Some(imported),
            Err(e) => {
                warn!(error = %e, "Frame import failed, presenting previous frame");
                None
            }
        };
        let outcome = match &imported {
            Some(planes) => match self.drawer.bind_planes(self.importer.factory(), planes.images()) {
                Ok(()) => FrameOutcome::Presented,
                Err(e) => {
                    warn!(error = %e, "Binding imported planes failed");
                    FrameOutcome::PresentedStale
                }
            },
            None => FrameOutcome::PresentedStale,
        };

        self.drawer.draw(&conversion, viewport);
        self.presenter.present()?;
        drop(imported);

        trace!(?outcome, "Frame done");
        Ok(outcome)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!("Attempted to resize to zero-size window, ignoring");
            return;
        }
        self.window_size = (width, height);
    }
}
