//! glium-backed provider for the renderer.

use std::collections::BTreeSet;
use std::rc::Rc;

use glium::backend::Context;
use glium::framebuffer::{DefaultFramebuffer, SimpleFrameBuffer};
use glium::index::{NoIndices, PrimitiveType};
use glium::texture::{MipmapsOption, RawImage2d, Texture2d, UncompressedFloatFormat};
use glium::uniforms::{
    MagnifySamplerFilter, MinifySamplerFilter, Sampler, SamplerWrapFunction,
    Uniforms as GliumUniforms,
};
use glium::{uniform, BlitTarget, CapabilitiesSource, Program, Surface, VertexBuffer};
use scene3d_core::{
    Api, BlendFactor, BlendState, Capabilities, Color, DrawCommand, Effect, Feature, GlVersion,
    GlslVersion, GraphicsError, HandleMap, PixelBuffer, PixelFormat, Primitive, ProgramId,
    ReadBuffer, Rect, RenderTarget, ShaderStage, Size, Texture, TextureFormat, TextureId,
};
use tracing::{debug, trace};

use crate::gl_backend::{HostContext, HostGlBackend};
use crate::glsl;
use crate::state;

/// Which capability set a [`GlDevice`] exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlProfile {
    /// GL 3.2+: framebuffer objects, blits and float textures are core.
    Gl3,
    /// Legacy path: GLSL 1.20, optional features only through extensions.
    Gl1,
}

#[derive(Copy, Clone)]
struct QuadVertex {
    position: [f32; 2],
}

glium::implement_vertex!(QuadVertex, position);

const QUAD: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
    },
    QuadVertex {
        position: [-1.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
    },
];

struct GlTexture {
    texture: Texture2d,
    size: Size,
}

/// An OpenGL context provider backed by glium.
pub struct GlDevice {
    ctx: Rc<Context>,
    backend: Rc<HostGlBackend>,
    profile: GlProfile,
    caps: Capabilities,
    textures: HandleMap<GlTexture>,
    programs: HandleMap<(Program, Effect)>,
    quad: VertexBuffer<QuadVertex>,
}

impl std::fmt::Debug for GlDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlDevice")
            .field("profile", &self.profile)
            .field("caps", &self.caps)
            .finish()
    }
}

fn resource_error(what: &'static str, err: impl std::fmt::Debug) -> GraphicsError {
    GraphicsError::ResourceCreation {
        what,
        reason: format!("{err:?}"),
    }
}

impl GlDevice {
    /// Wraps the host's current context with the full GL3 capability set.
    pub fn new(host: Rc<dyn HostContext>) -> Result<Self, GraphicsError> {
        host.make_current()?;
        let backend = Rc::new(HostGlBackend::new(host));

        debug!("BACKEND: {backend:?}");

        let ctx = unsafe {
            Context::new(
                backend.clone(),
                false,
                glium::debug::DebugCallbackBehavior::Ignore,
            )
        }
        .map_err(|err| GraphicsError::ContextCreation(err.to_string()))?;

        debug!("OPENGL_VERSION {}", ctx.get_opengl_version_string());

        let quad = VertexBuffer::new(&ctx, &QUAD).map_err(|e| resource_error("vertex buffer", e))?;
        let caps = Self::query_capabilities(&ctx, GlProfile::Gl3);
        debug!(?caps, "GL3 capabilities");

        Ok(Self {
            ctx,
            backend,
            profile: GlProfile::Gl3,
            caps,
            textures: HandleMap::new(),
            programs: HandleMap::new(),
            quad,
        })
    }

    /// Restricts the device to the legacy capability set.
    pub fn into_legacy(mut self) -> Self {
        self.profile = GlProfile::Gl1;
        self.caps = Self::query_capabilities(&self.ctx, GlProfile::Gl1);
        debug!(caps = ?self.caps, "GL1 capabilities");
        self
    }

    fn query_capabilities(ctx: &Rc<Context>, profile: GlProfile) -> Capabilities {
        let version = GlVersion::parse(ctx.get_opengl_version_string());
        let ext = ctx.get_extensions();

        let mut extensions = BTreeSet::new();
        for (present, name) in [
            (ext.gl_ext_framebuffer_blit, "GL_EXT_framebuffer_blit"),
            (ext.gl_arb_framebuffer_object, "GL_ARB_framebuffer_object"),
            (ext.gl_arb_texture_float, "GL_ARB_texture_float"),
        ] {
            if present {
                extensions.insert(name.to_owned());
            }
        }

        let best = glsl::get_best_target(&**ctx);
        let core3 = version >= GlVersion::new(3, 0);
        let (glsl, framebuffer_blit, float_textures) = match profile {
            GlProfile::Gl3 => (
                best,
                core3 || ext.gl_arb_framebuffer_object || ext.gl_ext_framebuffer_blit,
                core3 || ext.gl_arb_texture_float,
            ),
            GlProfile::Gl1 => (
                best.map(|v| v.min(GlslVersion::Glsl120)),
                ext.gl_ext_framebuffer_blit,
                ext.gl_arb_texture_float,
            ),
        };

        Capabilities {
            api: Api::OpenGl,
            version,
            glsl,
            framebuffer_blit,
            float_textures,
            extensions,
        }
    }

    pub fn profile(&self) -> GlProfile {
        self.profile
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn make_current(&self) -> Result<(), GraphicsError> {
        self.backend.host().make_current()?;
        unsafe {
            self.ctx
                .rebuild(self.backend.clone())
                .map_err(|err| GraphicsError::ContextCreation(err.to_string()))
        }
    }

    pub fn is_context_lost(&self) -> bool {
        self.ctx.is_context_lost()
    }

    pub fn drawable_size(&self) -> Size {
        self.backend.host().drawable_size()
    }

    fn has_framebuffers(&self) -> bool {
        self.profile == GlProfile::Gl3 || self.caps.has_extension("GL_ARB_framebuffer_object")
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    pub fn create_texture(
        &mut self,
        size: Size,
        format: TextureFormat,
    ) -> Result<Texture, GraphicsError> {
        if format.is_float() && !self.caps.float_textures {
            return Err(GraphicsError::UnsupportedFeature(Feature::FloatTextures));
        }
        let gl_format = match format {
            TextureFormat::Rgba8 => UncompressedFloatFormat::U8U8U8U8,
            TextureFormat::Rgba16F => UncompressedFloatFormat::F16F16F16F16,
            TextureFormat::Rgba32F => UncompressedFloatFormat::F32F32F32F32,
        };
        let texture = Texture2d::empty_with_format(
            &self.ctx,
            gl_format,
            MipmapsOption::NoMipmap,
            size.width,
            size.height,
        )
        .map_err(|e| resource_error("texture", e))?;
        trace!(?size, ?format, "texture created");
        let id = TextureId(self.textures.insert(GlTexture { texture, size }));
        Ok(Texture { id, size, format })
    }

    pub fn delete_texture(&mut self, id: TextureId) -> Result<(), GraphicsError> {
        self.textures
            .remove(id.0)
            .map(|_| ())
            .ok_or(GraphicsError::UnknownResource {
                kind: "texture",
                id: id.0,
            })
    }

    /// Replaces the contents with RGBA8 pixels, top row first.
    pub fn upload_texture(&mut self, id: TextureId, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        let tex = self.texture(id)?;
        if pixels.format() != PixelFormat::Rgba8
            || pixels.width() != tex.size.width
            || pixels.height() != tex.size.height
        {
            return Err(GraphicsError::InvalidPixelData {
                expected: tex.size.area() * 4,
                actual: pixels.data().len(),
            });
        }
        let image = RawImage2d::from_raw_rgba_reversed(pixels.data(), (pixels.width(), pixels.height()));
        tex.texture.write(
            glium::Rect {
                left: 0,
                bottom: 0,
                width: tex.size.width,
                height: tex.size.height,
            },
            image,
        );
        Ok(())
    }

    /// Reads a texture back as RGBA8, top row first.
    pub fn read_texture(&mut self, id: TextureId) -> Result<PixelBuffer, GraphicsError> {
        let tex = self.texture(id)?;
        let rows: Vec<Vec<(u8, u8, u8, u8)>> = tex.texture.read();
        let data = rows
            .iter()
            .rev()
            .flatten()
            .flat_map(|&(r, g, b, a)| [r, g, b, a])
            .collect();
        PixelBuffer::from_data(tex.size.width, tex.size.height, PixelFormat::Rgba8, data)
    }

    fn texture(&self, id: TextureId) -> Result<&GlTexture, GraphicsError> {
        self.textures.get(id.0).ok_or(GraphicsError::UnknownResource {
            kind: "texture",
            id: id.0,
        })
    }

    fn sampler(&self, id: TextureId) -> Result<Sampler<'_, Texture2d>, GraphicsError> {
        Ok(self
            .texture(id)?
            .texture
            .sampled()
            .magnify_filter(MagnifySamplerFilter::Nearest)
            .minify_filter(MinifySamplerFilter::Nearest)
            .wrap_function(SamplerWrapFunction::Clamp))
    }

    fn texel_size(&self, id: TextureId) -> Result<[f32; 2], GraphicsError> {
        let size = self.texture(id)?.size;
        Ok([1.0 / size.width as f32, 1.0 / size.height as f32])
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    pub fn compile_program(&mut self, effect: &Effect) -> Result<ProgramId, GraphicsError> {
        effect.validate()?;
        let version = self.caps.glsl.ok_or(GraphicsError::ShaderCompile {
            stage: ShaderStage::Vertex,
            log: "no supported GLSL version".to_owned(),
        })?;
        let vertex = glsl::vertex_source(version);
        let fragment = glsl::fragment_source(version, effect);

        let program = Program::from_source(&self.ctx, &vertex, &fragment, None).map_err(|err| {
            use glium::program::ProgramCreationError as E;
            match err {
                E::CompilationError(log, shader) => GraphicsError::ShaderCompile {
                    stage: match shader {
                        glium::program::ShaderType::Vertex => ShaderStage::Vertex,
                        _ => ShaderStage::Fragment,
                    },
                    log,
                },
                E::LinkingError(log) => GraphicsError::ShaderLink { log },
                other => GraphicsError::ShaderLink {
                    log: other.to_string(),
                },
            }
        })?;
        debug!(program = effect.name(), ?version, "program compiled");
        Ok(ProgramId(self.programs.insert((program, *effect))))
    }

    pub fn delete_program(&mut self, id: ProgramId) -> Result<(), GraphicsError> {
        self.programs
            .remove(id.0)
            .map(|_| ())
            .ok_or(GraphicsError::UnknownResource {
                kind: "program",
                id: id.0,
            })
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    pub fn clear(&mut self, target: RenderTarget, color: Color) -> Result<(), GraphicsError> {
        let (r, g, b, a) = (color.r, color.g, color.b, color.a);
        match target {
            RenderTarget::Default => DefaultFramebuffer::back_left(&self.ctx).clear_color(r, g, b, a),
            RenderTarget::Texture(id) => self.texture(id)?.texture.as_surface().clear_color(r, g, b, a),
        }
        Ok(())
    }

    pub fn draw(&mut self, cmd: &DrawCommand<'_>) -> Result<(), GraphicsError> {
        if let RenderTarget::Texture(target) = cmd.target {
            if cmd.uniforms.textures().any(|t| t == target) {
                return Err(GraphicsError::FeedbackLoop(target.0));
            }
        }
        let (program, effect) = self
            .programs
            .get(cmd.program.0)
            .ok_or(GraphicsError::UnknownResource {
                kind: "program",
                id: cmd.program.0,
            })?;
        let u = cmd.uniforms;

        match effect {
            Effect::Copy => {
                let uniforms = uniform! { source: self.sampler(u.texture("source")?)? };
                self.submit(cmd, program, &uniforms)
            }
            Effect::BloomExtract => {
                let uniforms = uniform! {
                    source: self.sampler(u.texture("source")?)?,
                    threshold: u.scalar("threshold")?,
                };
                self.submit(cmd, program, &uniforms)
            }
            Effect::Blur { .. } => {
                let source = u.texture("source")?;
                let uniforms = uniform! {
                    source: self.sampler(source)?,
                    texel_size: self.texel_size(source)?,
                };
                self.submit(cmd, program, &uniforms)
            }
            Effect::Composite => {
                let uniforms = uniform! {
                    scene: self.sampler(u.texture("scene")?)?,
                    bloom: self.sampler(u.texture("bloom")?)?,
                    bloom_strength: u.scalar("bloom_strength")?,
                };
                self.submit(cmd, program, &uniforms)
            }
            Effect::SolidColor => {
                let uniforms = uniform! { color: u.vector("color")? };
                self.submit(cmd, program, &uniforms)
            }
        }
    }

    fn target_height(&self, target: RenderTarget) -> Result<u32, GraphicsError> {
        Ok(match target {
            RenderTarget::Default => self.drawable_size().height,
            RenderTarget::Texture(id) => self.texture(id)?.size.height,
        })
    }

    fn submit<U: GliumUniforms>(
        &self,
        cmd: &DrawCommand<'_>,
        program: &Program,
        uniforms: &U,
    ) -> Result<(), GraphicsError> {
        let height = self.target_height(cmd.target)?;
        let to_gl = |r: Rect| glium::Rect {
            left: r.left.max(0) as u32,
            bottom: (height as i32 - r.bottom).max(0) as u32,
            width: r.width().max(0) as u32,
            height: r.height().max(0) as u32,
        };
        let scissor = match cmd.primitive {
            Primitive::FullscreenQuad => None,
            Primitive::Rect(rect) => {
                let r = rect.to_pixels(cmd.viewport);
                Some(to_gl(Rect::new(
                    r.left.max(cmd.viewport.left),
                    r.top.max(cmd.viewport.top),
                    r.right.min(cmd.viewport.right),
                    r.bottom.min(cmd.viewport.bottom),
                )))
            }
        };
        let params = glium::DrawParameters {
            blend: to_glium_blend(cmd.blend),
            viewport: Some(to_gl(cmd.viewport)),
            scissor,
            ..Default::default()
        };
        let indices = NoIndices(PrimitiveType::TriangleStrip);

        let result = match cmd.target {
            RenderTarget::Default => DefaultFramebuffer::back_left(&self.ctx).draw(
                &self.quad,
                indices,
                program,
                uniforms,
                &params,
            ),
            RenderTarget::Texture(id) => {
                let mut fb = SimpleFrameBuffer::new(&self.ctx, &self.texture(id)?.texture)
                    .map_err(|e| resource_error("framebuffer", e))?;
                fb.draw(&self.quad, indices, program, uniforms, &params)
            }
        };
        result.map_err(|e| resource_error("draw call", e))
    }

    pub fn blit(
        &mut self,
        src: TextureId,
        dst: RenderTarget,
        dst_rect: Rect,
    ) -> Result<(), GraphicsError> {
        if !self.caps.framebuffer_blit {
            return Err(GraphicsError::UnsupportedFeature(Feature::FramebufferBlit));
        }
        if dst == RenderTarget::Texture(src) {
            return Err(GraphicsError::FeedbackLoop(src.0));
        }
        let height = self.target_height(dst)?;
        let target = BlitTarget {
            left: dst_rect.left.max(0) as u32,
            bottom: (height as i32 - dst_rect.bottom).max(0) as u32,
            width: dst_rect.width(),
            height: dst_rect.height(),
        };
        let source = SimpleFrameBuffer::new(&self.ctx, &self.texture(src)?.texture)
            .map_err(|e| resource_error("framebuffer", e))?;
        match dst {
            RenderTarget::Default => source.blit_whole_color_to(
                &DefaultFramebuffer::back_left(&self.ctx),
                &target,
                MagnifySamplerFilter::Nearest,
            ),
            RenderTarget::Texture(id) => {
                let fb = SimpleFrameBuffer::new(&self.ctx, &self.texture(id)?.texture)
                    .map_err(|e| resource_error("framebuffer", e))?;
                source.blit_whole_color_to(&fb, &target, MagnifySamplerFilter::Nearest)
            }
        }
        Ok(())
    }

    pub fn blit_back_to_front(&mut self, rect: Rect) -> Result<(), GraphicsError> {
        if !self.caps.framebuffer_blit {
            return Err(GraphicsError::UnsupportedFeature(Feature::FramebufferBlit));
        }
        let size = self.drawable_size();
        let region = rect.clamped_to(size);
        if region.is_empty() {
            return Ok(());
        }
        unsafe {
            state::blit_back_to_front((
                region.left,
                size.height as i32 - region.bottom,
                region.width(),
                region.height(),
            ));
            self.ctx
                .rebuild(self.backend.clone())
                .map_err(|err| GraphicsError::ContextCreation(err.to_string()))?;
        }
        Ok(())
    }

    /// Reads a region of the default framebuffer as RGBA8, top row first.
    pub fn read_pixels(&mut self, buffer: ReadBuffer, rect: Rect) -> Result<PixelBuffer, GraphicsError> {
        let size = self.drawable_size();
        let region = rect.clamped_to(size);
        if region.is_empty() {
            return Err(GraphicsError::Readback(format!(
                "region {rect:?} lies outside the {}x{} framebuffer",
                size.width, size.height
            )));
        }
        let gl_buffer = match buffer {
            ReadBuffer::Front => gl::FRONT,
            ReadBuffer::Back => gl::BACK,
        };
        let extent = region.size();
        let mut pixels = PixelBuffer::new(extent.width, extent.height, PixelFormat::Rgba8);
        unsafe {
            state::read_default_framebuffer(
                gl_buffer,
                (
                    region.left,
                    size.height as i32 - region.bottom,
                    region.width(),
                    region.height(),
                ),
                self.has_framebuffers(),
                pixels.data_mut(),
            );
            self.ctx
                .rebuild(self.backend.clone())
                .map_err(|err| GraphicsError::ContextCreation(err.to_string()))?;
        }
        pixels.flip_vertical();
        Ok(pixels)
    }

    pub fn flush(&mut self) {
        self.ctx.flush();
    }

    /// The host swapped; nothing is cached per buffer.
    pub fn buffers_swapped(&mut self) {}

    pub fn resize(&mut self, size: Size) {
        debug!(?size, "drawable resized");
    }

    pub fn end_frame(&mut self, restore_host_state: bool) {
        if !restore_host_state {
            return;
        }
        let size = self.drawable_size();
        unsafe {
            state::reset_state(
                (size.width, size.height),
                self.profile == GlProfile::Gl3,
                self.has_framebuffers(),
            );
            if let Err(err) = self.ctx.rebuild(self.backend.clone()) {
                tracing::error!("failed to resync glium state: {err}");
            }
        }
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }
}

fn to_glium_factor(factor: BlendFactor) -> glium::LinearBlendingFactor {
    use glium::LinearBlendingFactor as F;
    match factor {
        BlendFactor::Zero => F::Zero,
        BlendFactor::One => F::One,
        BlendFactor::SrcAlpha => F::SourceAlpha,
        BlendFactor::OneMinusSrcAlpha => F::OneMinusSourceAlpha,
    }
}

fn to_glium_blend(state: BlendState) -> glium::Blend {
    if !state.enabled {
        return glium::Blend::default();
    }
    let function = glium::BlendingFunction::Addition {
        source: to_glium_factor(state.src),
        destination: to_glium_factor(state.dst),
    };
    glium::Blend {
        color: function,
        alpha: function,
        constant_value: (0.0, 0.0, 0.0, 0.0),
    }
}
