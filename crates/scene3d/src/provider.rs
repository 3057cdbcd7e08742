//! The provider variant a [`crate::GraphicContext`] renders through.
//!
//! The variant is chosen once, when the context is created. Every variant
//! exposes the same operations, so callers never inspect which one they hold.

use scene3d_core::{
    Capabilities, Color, DrawCommand, Effect, GlVersion, GraphicsError, PixelBuffer, ProgramId,
    ReadBuffer, Rect, RenderTarget, Size, Texture, TextureFormat, TextureId,
};
use scene3d_gl::GlDevice;
use scene3d_sw::SoftwareProvider;

use crate::config::ContextDescription;

/// Which provider variant is in use.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Gl3,
    Gl1,
    Software,
}

impl ProviderKind {
    /// Lowest version served by the GL3 provider.
    pub const GL3_MIN: GlVersion = GlVersion::new(3, 2);

    /// Picks the OpenGL provider for a context the driver reports as
    /// `actual`.
    ///
    /// GL3 is used when at least 3.2 was requested and either lower versions
    /// are not allowed or the driver actually delivers 3.2. Everything else
    /// takes the GL1 path.
    pub fn select(desc: &ContextDescription, actual: GlVersion) -> ProviderKind {
        let requested = GlVersion::new(desc.version_major, desc.version_minor);
        if requested >= Self::GL3_MIN && (!desc.allow_lower_versions || actual >= Self::GL3_MIN) {
            ProviderKind::Gl3
        } else {
            ProviderKind::Gl1
        }
    }
}

pub enum ContextProvider {
    Gl3(GlDevice),
    Gl1(GlDevice),
    Software(SoftwareProvider),
}

impl std::fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContextProvider").field(&self.kind()).finish()
    }
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            ContextProvider::Gl3($p) | ContextProvider::Gl1($p) => $body,
            ContextProvider::Software($p) => $body,
        }
    };
}

impl ContextProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ContextProvider::Gl3(_) => ProviderKind::Gl3,
            ContextProvider::Gl1(_) => ProviderKind::Gl1,
            ContextProvider::Software(_) => ProviderKind::Software,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        dispatch!(self, p => p.capabilities())
    }

    pub fn make_current(&self) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.make_current())
    }

    pub fn is_context_lost(&self) -> bool {
        dispatch!(self, p => p.is_context_lost())
    }

    pub fn drawable_size(&self) -> Size {
        dispatch!(self, p => p.drawable_size())
    }

    pub fn create_texture(
        &mut self,
        size: Size,
        format: TextureFormat,
    ) -> Result<Texture, GraphicsError> {
        dispatch!(self, p => p.create_texture(size, format))
    }

    pub fn delete_texture(&mut self, id: TextureId) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.delete_texture(id))
    }

    pub fn upload_texture(&mut self, id: TextureId, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.upload_texture(id, pixels))
    }

    pub fn read_texture(&mut self, id: TextureId) -> Result<PixelBuffer, GraphicsError> {
        dispatch!(self, p => p.read_texture(id))
    }

    pub fn compile_program(&mut self, effect: &Effect) -> Result<ProgramId, GraphicsError> {
        dispatch!(self, p => p.compile_program(effect))
    }

    pub fn delete_program(&mut self, id: ProgramId) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.delete_program(id))
    }

    pub fn clear(&mut self, target: RenderTarget, color: Color) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.clear(target, color))
    }

    pub fn draw(&mut self, cmd: &DrawCommand<'_>) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.draw(cmd))
    }

    pub fn blit(&mut self, src: TextureId, dst: RenderTarget, dst_rect: Rect) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.blit(src, dst, dst_rect))
    }

    pub fn blit_back_to_front(&mut self, rect: Rect) -> Result<(), GraphicsError> {
        dispatch!(self, p => p.blit_back_to_front(rect))
    }

    pub fn read_pixels(&mut self, buffer: ReadBuffer, rect: Rect) -> Result<PixelBuffer, GraphicsError> {
        dispatch!(self, p => p.read_pixels(buffer, rect))
    }

    pub fn flush(&mut self) {
        dispatch!(self, p => p.flush())
    }

    pub fn buffers_swapped(&mut self) {
        dispatch!(self, p => p.buffers_swapped())
    }

    pub fn resize(&mut self, size: Size) {
        dispatch!(self, p => p.resize(size))
    }

    pub fn end_frame(&mut self, restore_host_state: bool) {
        dispatch!(self, p => p.end_frame(restore_host_state))
    }

    pub fn live_textures(&self) -> usize {
        dispatch!(self, p => p.live_textures())
    }

    pub fn live_programs(&self) -> usize {
        dispatch!(self, p => p.live_programs())
    }
}
