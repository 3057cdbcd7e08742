//! Software context provider.
//!
//! Executes the same draw commands as the OpenGL providers on the CPU. It
//! owns a front and a back buffer standing in for the window's default
//! framebuffer, so present and read-back paths can be exercised headless.

mod shader;
mod surface;

use scene3d_core::{
    Capabilities, Color, DrawCommand, Effect, Feature, GraphicsError, HandleMap, PixelBuffer,
    PixelFormat, Primitive, ProgramId, ReadBuffer, Rect, RenderTarget, Size, Texture,
    TextureFormat, TextureId,
};

use shader::Shader;
pub use surface::{quantize, Surface};

/// Counters for work submitted to the provider.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub draws: u64,
    pub clears: u64,
    pub blits: u64,
    pub readbacks: u64,
    pub read_bytes: u64,
    pub flushes: u64,
    pub swaps: u64,
    /// Frames closed with `end_frame`, abandoned ones included.
    pub frames_ended: u64,
}

pub struct SoftwareProvider {
    caps: Capabilities,
    textures: HandleMap<Surface>,
    programs: HandleMap<Effect>,
    front: Surface,
    back: Surface,
    lost: bool,
    stats: SoftwareStats,
}

impl SoftwareProvider {
    /// Provider with every optional feature available.
    pub fn new(size: Size) -> Self {
        Self::with_capabilities(size, Capabilities::software())
    }

    /// Provider reporting `caps`; used to exercise fallback paths.
    pub fn with_capabilities(size: Size, caps: Capabilities) -> Self {
        tracing::debug!(
            width = size.width,
            height = size.height,
            blit = caps.framebuffer_blit,
            float = caps.float_textures,
            "software provider created"
        );
        Self {
            caps,
            textures: HandleMap::new(),
            programs: HandleMap::new(),
            front: Surface::new(size, TextureFormat::Rgba8),
            back: Surface::new(size, TextureFormat::Rgba8),
            lost: false,
            stats: SoftwareStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Provider interface
    // ------------------------------------------------------------------

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn make_current(&self) -> Result<(), GraphicsError> {
        if self.lost {
            return Err(GraphicsError::ContextLost);
        }
        Ok(())
    }

    pub fn is_context_lost(&self) -> bool {
        self.lost
    }

    pub fn drawable_size(&self) -> Size {
        self.back.size
    }

    pub fn create_texture(
        &mut self,
        size: Size,
        format: TextureFormat,
    ) -> Result<Texture, GraphicsError> {
        if format.is_float() && !self.caps.float_textures {
            return Err(GraphicsError::UnsupportedFeature(Feature::FloatTextures));
        }
        if size.is_empty() {
            return Err(GraphicsError::ResourceCreation {
                what: "texture",
                reason: format!("zero-sized {}x{}", size.width, size.height),
            });
        }
        let id = TextureId(self.textures.insert(Surface::new(size, format)));
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

    /// Replaces the contents of a texture with RGBA8 pixels, top row first.
    pub fn upload_texture(&mut self, id: TextureId, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        let surface = self.texture_mut(id)?;
        let expected = surface.size.area() * 4;
        if pixels.format() != PixelFormat::Rgba8
            || pixels.width() != surface.size.width
            || pixels.height() != surface.size.height
        {
            return Err(GraphicsError::InvalidPixelData {
                expected,
                actual: pixels.data().len(),
            });
        }
        let width = surface.size.width as i32;
        for (i, px) in pixels.data().chunks_exact(4).enumerate() {
            let texel = [px[0], px[1], px[2], px[3]].map(|c| c as f32 / 255.0);
            surface.store(i as i32 % width, i as i32 / width, texel);
        }
        Ok(())
    }

    pub fn read_texture(&mut self, id: TextureId) -> Result<PixelBuffer, GraphicsError> {
        let surface = self.texture(id)?;
        let pixels = surface.read_rgba8(surface.bounds());
        self.stats.readbacks += 1;
        self.stats.read_bytes += pixels.data().len() as u64;
        Ok(pixels)
    }

    pub fn compile_program(&mut self, effect: &Effect) -> Result<ProgramId, GraphicsError> {
        effect.validate()?;
        tracing::trace!(program = effect.name(), "software program built");
        Ok(ProgramId(self.programs.insert(*effect)))
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

    pub fn clear(&mut self, target: RenderTarget, color: Color) -> Result<(), GraphicsError> {
        self.target_mut(target)?.fill(color.to_array());
        self.stats.clears += 1;
        Ok(())
    }

    pub fn draw(&mut self, cmd: &DrawCommand<'_>) -> Result<(), GraphicsError> {
        let effect = *self
            .programs
            .get(cmd.program.0)
            .ok_or(GraphicsError::UnknownResource {
                kind: "program",
                id: cmd.program.0,
            })?;
        if let RenderTarget::Texture(target) = cmd.target {
            if cmd.uniforms.textures().any(|t| t == target) {
                return Err(GraphicsError::FeedbackLoop(target.0));
            }
        }

        let bounds = self.target(cmd.target)?.bounds();
        let covered = match cmd.primitive {
            Primitive::FullscreenQuad => cmd.viewport,
            Primitive::Rect(rect) => {
                let r = rect.to_pixels(cmd.viewport);
                Rect::new(
                    r.left.max(cmd.viewport.left),
                    r.top.max(cmd.viewport.top),
                    r.right.min(cmd.viewport.right),
                    r.bottom.min(cmd.viewport.bottom),
                )
            }
        }
        .clamped_to(bounds.size());

        let shaded = {
            let textures = &self.textures;
            let shader = Shader::bind(&effect, cmd.uniforms, |id| {
                textures.get(id.0).ok_or(GraphicsError::UnknownResource {
                    kind: "texture",
                    id: id.0,
                })
            })?;
            let vw = cmd.viewport.width().max(1) as f32;
            let vh = cmd.viewport.height().max(1) as f32;
            let mut shaded = Vec::with_capacity(covered.size().area());
            for y in covered.top..covered.bottom {
                for x in covered.left..covered.right {
                    let u = (x as f32 + 0.5 - cmd.viewport.left as f32) / vw;
                    let v = (y as f32 + 0.5 - cmd.viewport.top as f32) / vh;
                    shaded.push(shader.shade(u, v));
                }
            }
            shaded
        };

        let blend = cmd.blend;
        let target = self.target_mut(cmd.target)?;
        let mut texels = shaded.into_iter();
        for y in covered.top..covered.bottom {
            for x in covered.left..covered.right {
                if let Some(src) = texels.next() {
                    let out = blend.blend(src, target.get(x, y));
                    target.store(x, y, out);
                }
            }
        }
        self.stats.draws += 1;
        Ok(())
    }

    /// Copies the whole of `src` into `dst_rect` of `dst` with nearest
    /// filtering.
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
        let source = self.texture(src)?.clone();
        let target = self.target_mut(dst)?;
        let region = dst_rect.clamped_to(target.size);
        let (dw, dh) = (dst_rect.width().max(1) as f32, dst_rect.height().max(1) as f32);
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let u = (x as f32 + 0.5 - dst_rect.left as f32) / dw;
                let v = (y as f32 + 0.5 - dst_rect.top as f32) / dh;
                let (sx, sy) = source.texel_at(u, v);
                target.store(x, y, source.fetch(sx, sy));
            }
        }
        self.stats.blits += 1;
        Ok(())
    }

    /// Copies a region of the back buffer onto the front buffer.
    pub fn blit_back_to_front(&mut self, rect: Rect) -> Result<(), GraphicsError> {
        if !self.caps.framebuffer_blit {
            return Err(GraphicsError::UnsupportedFeature(Feature::FramebufferBlit));
        }
        let region = rect.clamped_to(self.back.size);
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let texel = self.back.get(x, y);
                self.front.store(x, y, texel);
            }
        }
        self.stats.blits += 1;
        Ok(())
    }

    /// Reads a region of the default framebuffer as RGBA8, top row first.
    pub fn read_pixels(&mut self, buffer: ReadBuffer, rect: Rect) -> Result<PixelBuffer, GraphicsError> {
        let surface = match buffer {
            ReadBuffer::Front => &self.front,
            ReadBuffer::Back => &self.back,
        };
        let region = rect.clamped_to(surface.size);
        if region.is_empty() {
            return Err(GraphicsError::Readback(format!(
                "region {rect:?} lies outside the {}x{} framebuffer",
                surface.size.width, surface.size.height
            )));
        }
        let pixels = surface.read_rgba8(region);
        self.stats.readbacks += 1;
        self.stats.read_bytes += pixels.data().len() as u64;
        Ok(pixels)
    }

    pub fn flush(&mut self) {
        self.stats.flushes += 1;
    }

    /// Called after the window swapped buffers.
    pub fn buffers_swapped(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.stats.swaps += 1;
    }

    pub fn resize(&mut self, size: Size) {
        if size == self.back.size {
            return;
        }
        tracing::debug!(width = size.width, height = size.height, "software framebuffer resized");
        self.front.resize(size);
        self.back.resize(size);
    }

    /// Nothing to restore: the software provider shares no state with a host.
    pub fn end_frame(&mut self, _restore_host_state: bool) {
        self.stats.frames_ended += 1;
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    // ------------------------------------------------------------------
    // Test and headless helpers
    // ------------------------------------------------------------------

    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Marks the context as lost; every later frame fails.
    pub fn lose_context(&mut self) {
        self.lost = true;
    }

    /// Overwrites texel values directly, bypassing 8-bit upload.
    pub fn write_texels(&mut self, id: TextureId, texels: &[[f32; 4]]) -> Result<(), GraphicsError> {
        let surface = self.texture_mut(id)?;
        if texels.len() != surface.texels.len() {
            return Err(GraphicsError::InvalidPixelData {
                expected: surface.texels.len(),
                actual: texels.len(),
            });
        }
        let format = surface.format;
        for (dst, src) in surface.texels.iter_mut().zip(texels) {
            *dst = quantize(format, *src);
        }
        Ok(())
    }

    /// Stored texel values, row-major, top row first.
    pub fn texels(&self, id: TextureId) -> Result<&[[f32; 4]], GraphicsError> {
        Ok(&self.texture(id)?.texels)
    }

    pub fn front_buffer(&self) -> &Surface {
        &self.front
    }

    pub fn back_buffer(&self) -> &Surface {
        &self.back
    }

    fn texture(&self, id: TextureId) -> Result<&Surface, GraphicsError> {
        self.textures.get(id.0).ok_or(GraphicsError::UnknownResource {
            kind: "texture",
            id: id.0,
        })
    }

    fn texture_mut(&mut self, id: TextureId) -> Result<&mut Surface, GraphicsError> {
        self.textures
            .get_mut(id.0)
            .ok_or(GraphicsError::UnknownResource {
                kind: "texture",
                id: id.0,
            })
    }

    fn target(&self, target: RenderTarget) -> Result<&Surface, GraphicsError> {
        match target {
            RenderTarget::Default => Ok(&self.back),
            RenderTarget::Texture(id) => self.texture(id),
        }
    }

    fn target_mut(&mut self, target: RenderTarget) -> Result<&mut Surface, GraphicsError> {
        match target {
            RenderTarget::Default => Ok(&mut self.back),
            RenderTarget::Texture(id) => self.texture_mut(id),
        }
    }
}
