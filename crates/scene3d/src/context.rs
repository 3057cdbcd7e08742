//! [`GraphicContext`]: the provider plus the per-context state passes share.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use scene3d_core::{
    BlendState, Capabilities, Color, DrawCommand, Effect, Feature, GraphicsError, PixelBuffer,
    Primitive, ProgramId, ReadBuffer, Rect, RenderTarget, Size, Texture, TextureFormat, TextureId,
    Uniforms,
};
use scene3d_gl::{GlDevice, HostContext};
use scene3d_sw::SoftwareProvider;
use tracing::{debug, warn};

use crate::config::ContextDescription;
use crate::pool::{PoolStats, PooledFramebuffer, ResourcePool};
use crate::provider::{ContextProvider, ProviderKind};
use crate::share::{ShareHandoff, SharedContextLease, SharedContextRegistry};

/// Everything a pass needs to render: the provider, the viewport, the
/// framebuffer pool and a program cache keyed by [`Effect`].
///
/// A context is used from one thread at a time. Passes may not switch the
/// current context while they run.
pub struct GraphicContext {
    provider: ContextProvider,
    description: ContextDescription,
    viewport: Size,
    pool: ResourcePool,
    programs: HashMap<Effect, ProgramId>,
    fallbacks_reported: HashSet<Feature>,
    in_pass: bool,
    lease: Option<SharedContextLease>,
}

impl std::fmt::Debug for GraphicContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicContext")
            .field("provider", &self.provider.kind())
            .field("viewport", &self.viewport)
            .field("pool", &self.pool.stats())
            .finish()
    }
}

impl GraphicContext {
    /// Wraps an already selected provider.
    pub fn new(
        provider: ContextProvider,
        description: ContextDescription,
        registry: Option<&SharedContextRegistry>,
    ) -> Self {
        Self::with_handoff(provider, description, registry.map(SharedContextRegistry::begin_init))
    }

    /// The registry stays locked until the context is fully set up.
    fn with_handoff(
        provider: ContextProvider,
        description: ContextDescription,
        handoff: Option<ShareHandoff<'_>>,
    ) -> Self {
        if let Some(source) = handoff.as_ref().and_then(|h| h.share_source()) {
            debug!(source = source.0, "sharing objects with existing context");
        }
        let viewport = provider.drawable_size();
        debug!(kind = ?provider.kind(), ?viewport, caps = ?provider.capabilities(), "graphic context created");
        Self {
            provider,
            description,
            viewport,
            pool: ResourcePool::new(viewport),
            programs: HashMap::new(),
            fallbacks_reported: HashSet::new(),
            in_pass: false,
            lease: handoff.map(|h| h.complete()),
        }
    }

    /// Headless context rendering on the CPU.
    pub fn headless(size: Size) -> Self {
        Self::new(
            ContextProvider::Software(SoftwareProvider::new(size)),
            ContextDescription::default(),
            None,
        )
    }

    /// Wraps the host's GL context, choosing the GL3 or GL1 provider from the
    /// requested and the reported version.
    pub fn from_host_gl(
        host: Rc<dyn HostContext>,
        description: ContextDescription,
        registry: Option<&SharedContextRegistry>,
    ) -> Result<Self, GraphicsError> {
        let handoff = registry.map(SharedContextRegistry::begin_init);
        let device = GlDevice::new(host)?;
        let actual = device.capabilities().version;
        let provider = match ProviderKind::select(&description, actual) {
            ProviderKind::Gl3 => ContextProvider::Gl3(device),
            _ => ContextProvider::Gl1(device.into_legacy()),
        };
        debug!(%actual, kind = ?provider.kind(), "OpenGL provider selected");
        Ok(Self::with_handoff(provider, description, handoff))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn provider(&self) -> &ContextProvider {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut ContextProvider {
        &mut self.provider
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.provider.capabilities()
    }

    pub fn description(&self) -> &ContextDescription {
        &self.description
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn viewport_rect(&self) -> Rect {
        Rect::from_size(self.viewport)
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn share_lease(&self) -> Option<&SharedContextLease> {
        self.lease.as_ref()
    }

    pub fn software(&self) -> Option<&SoftwareProvider> {
        match &self.provider {
            ContextProvider::Software(sw) => Some(sw),
            _ => None,
        }
    }

    pub fn software_mut(&mut self) -> Option<&mut SoftwareProvider> {
        match &mut self.provider {
            ContextProvider::Software(sw) => Some(sw),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Current context
    // ------------------------------------------------------------------

    /// Makes this context current. Refused while a pass is running.
    pub fn make_current(&self) -> Result<(), GraphicsError> {
        if self.in_pass {
            return Err(GraphicsError::ContextSwitchDuringPass);
        }
        self.provider.make_current()
    }

    pub fn is_context_lost(&self) -> bool {
        self.provider.is_context_lost()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.in_pass = true;
    }

    pub(crate) fn end_pass(&mut self) {
        self.in_pass = false;
    }

    pub fn in_pass(&self) -> bool {
        self.in_pass
    }

    // ------------------------------------------------------------------
    // Programs and textures
    // ------------------------------------------------------------------

    /// Returns the cached program for `effect`, compiling it on first use.
    pub fn program(&mut self, effect: &Effect) -> Result<ProgramId, GraphicsError> {
        if let Some(id) = self.programs.get(effect) {
            return Ok(*id);
        }
        let id = self.provider.compile_program(effect)?;
        self.programs.insert(*effect, id);
        Ok(id)
    }

    pub fn create_texture(&mut self, size: Size, format: TextureFormat) -> Result<Texture, GraphicsError> {
        self.provider.create_texture(size, format)
    }

    pub fn delete_texture(&mut self, id: TextureId) -> Result<(), GraphicsError> {
        self.provider.delete_texture(id)
    }

    pub fn upload_texture(&mut self, id: TextureId, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        self.provider.upload_texture(id, pixels)
    }

    pub fn read_texture(&mut self, id: TextureId) -> Result<PixelBuffer, GraphicsError> {
        self.provider.read_texture(id)
    }

    // ------------------------------------------------------------------
    // Framebuffer pool
    // ------------------------------------------------------------------

    pub fn acquire_framebuffer(
        &mut self,
        size: Size,
        format: TextureFormat,
    ) -> Result<PooledFramebuffer, GraphicsError> {
        self.pool.acquire_framebuffer(&mut self.provider, size, format)
    }

    pub fn acquire_viewport_framebuffer(
        &mut self,
        format: TextureFormat,
        divisor: u32,
    ) -> Result<PooledFramebuffer, GraphicsError> {
        self.pool
            .acquire_viewport_framebuffer(&mut self.provider, format, divisor)
    }

    /// Like [`Self::acquire_framebuffer`], but falls back to an 8-bit target
    /// when float targets are unsupported.
    pub fn acquire_framebuffer_or_fallback(
        &mut self,
        size: Size,
        format: TextureFormat,
    ) -> Result<PooledFramebuffer, GraphicsError> {
        match self.acquire_framebuffer(size, format) {
            Err(GraphicsError::UnsupportedFeature(feature)) if format.is_float() => {
                self.report_fallback(feature, "using 8-bit render targets");
                self.acquire_framebuffer(size, TextureFormat::Rgba8)
            }
            other => other,
        }
    }

    pub fn release_framebuffer(&mut self, fb: PooledFramebuffer) {
        self.pool.release(&mut self.provider, fb);
    }

    /// Keeps `slot` holding a current target of `size`, reacquiring it
    /// after a resize or a size change.
    pub fn ensure_framebuffer(
        &mut self,
        slot: &mut Option<PooledFramebuffer>,
        size: Size,
        format: TextureFormat,
    ) -> Result<Texture, GraphicsError> {
        if let Some(fb) = slot.take() {
            let fallback = format.is_float() && fb.format() == TextureFormat::Rgba8;
            if self.pool.is_current(&fb)
                && fb.size() == size
                && (fb.format() == format || fallback)
            {
                let texture = fb.texture();
                *slot = Some(fb);
                return Ok(texture);
            }
            self.release_framebuffer(fb);
        }
        let fb = self.acquire_framebuffer_or_fallback(size, format)?;
        let texture = fb.texture();
        *slot = Some(fb);
        Ok(texture)
    }

    pub fn release_slot(&mut self, slot: &mut Option<PooledFramebuffer>) {
        if let Some(fb) = slot.take() {
            self.release_framebuffer(fb);
        }
    }

    fn report_fallback(&mut self, feature: Feature, action: &str) {
        if self.fallbacks_reported.insert(feature) {
            warn!("{feature} unsupported, {action}");
        }
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    pub fn clear(&mut self, target: RenderTarget, color: Color) -> Result<(), GraphicsError> {
        self.provider.clear(target, color)
    }

    pub fn draw(&mut self, cmd: &DrawCommand<'_>) -> Result<(), GraphicsError> {
        self.provider.draw(cmd)
    }

    /// Fullscreen draw of `effect` into `target`.
    pub fn draw_fullscreen(
        &mut self,
        effect: &Effect,
        target: RenderTarget,
        viewport: Rect,
        blend: BlendState,
        uniforms: &Uniforms,
    ) -> Result<(), GraphicsError> {
        let program = self.program(effect)?;
        self.provider.draw(&DrawCommand {
            program,
            target,
            viewport,
            primitive: Primitive::FullscreenQuad,
            blend,
            uniforms,
        })
    }

    /// Copies `src` into `dst_rect`, by framebuffer blit when available and
    /// by a textured draw otherwise.
    pub fn blit_or_copy(
        &mut self,
        src: Texture,
        dst: RenderTarget,
        dst_rect: Rect,
    ) -> Result<(), GraphicsError> {
        match self.provider.blit(src.id, dst, dst_rect) {
            Err(GraphicsError::UnsupportedFeature(feature)) => {
                self.report_fallback(feature, "copying with a draw call");
                let uniforms = Uniforms::new().with_texture("source", src.id);
                self.draw_fullscreen(&Effect::Copy, dst, dst_rect, BlendState::REPLACE, &uniforms)
            }
            other => other,
        }
    }

    pub fn read_pixels(&mut self, buffer: ReadBuffer, rect: Rect) -> Result<PixelBuffer, GraphicsError> {
        self.provider.read_pixels(buffer, rect)
    }

    pub fn blit_back_to_front(&mut self, rect: Rect) -> Result<(), GraphicsError> {
        self.provider.blit_back_to_front(rect)
    }

    pub fn flush(&mut self) {
        self.provider.flush();
    }

    pub fn buffers_swapped(&mut self) {
        self.provider.buffers_swapped();
    }

    /// Applies a new viewport size and invalidates viewport-sized targets.
    pub fn resize(&mut self, size: Size) {
        if size == self.viewport {
            return;
        }
        debug!(from = ?self.viewport, to = ?size, "viewport resized");
        self.viewport = size;
        self.provider.resize(size);
        self.pool.invalidate_viewport(&mut self.provider, size);
    }

    pub(crate) fn end_frame(&mut self) {
        self.provider.end_frame(self.description.restore_host_state);
    }
}

impl Drop for GraphicContext {
    fn drop(&mut self) {
        self.pool.clear(&mut self.provider);
        for (_, program) in self.programs.drain() {
            if let Err(err) = self.provider.delete_program(program) {
                warn!("failed to delete program: {err}");
            }
        }
    }
}
