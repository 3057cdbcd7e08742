//! Reusable framebuffer targets shared by all passes of a context.
//!
//! A handle returned by [`ResourcePool::acquire_framebuffer`] is owned by the
//! caller until it is handed back with [`ResourcePool::release`]. Handles are
//! not `Clone`, so two live handles never share backing storage.
//!
//! Resizing the viewport bumps the pool epoch: free entries are destroyed
//! right away and handles acquired before the resize are destroyed when
//! released, so the next acquire allocates at the new size.

use scene3d_core::{GraphicsError, RenderTarget, Size, Texture, TextureFormat, TextureId};
use tracing::{debug, trace, warn};

use crate::provider::ContextProvider;

/// A color target checked out of the pool.
#[derive(Debug, PartialEq, Eq)]
pub struct PooledFramebuffer {
    texture: Texture,
    epoch: u64,
}

impl PooledFramebuffer {
    #[inline]
    pub fn texture(&self) -> Texture {
        self.texture
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.texture.id
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.texture.size
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.texture.format
    }

    #[inline]
    pub fn target(&self) -> RenderTarget {
        RenderTarget::Texture(self.texture.id)
    }
}

/// Allocation counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Backing textures created.
    pub allocations: u64,
    /// Acquires served from the free list.
    pub reuses: u64,
    pub releases: u64,
    /// Backing textures deleted.
    pub destroyed: u64,
    /// Handles currently checked out.
    pub live: usize,
    /// Most handles ever checked out at once.
    pub high_water: usize,
}

#[derive(Debug, Default)]
pub struct ResourcePool {
    free: Vec<Texture>,
    epoch: u64,
    viewport: Size,
    stats: PoolStats,
}

impl ResourcePool {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Number of idle targets kept for reuse.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Whether `fb` was acquired after the last viewport change.
    pub fn is_current(&self, fb: &PooledFramebuffer) -> bool {
        fb.epoch == self.epoch
    }

    pub fn acquire_framebuffer(
        &mut self,
        provider: &mut ContextProvider,
        size: Size,
        format: TextureFormat,
    ) -> Result<PooledFramebuffer, GraphicsError> {
        let texture = match self
            .free
            .iter()
            .position(|t| t.size == size && t.format == format)
        {
            Some(index) => {
                self.stats.reuses += 1;
                let texture = self.free.swap_remove(index);
                trace!(id = texture.id.0, ?size, ?format, "framebuffer reused");
                texture
            }
            None => {
                let texture = provider.create_texture(size, format)?;
                self.stats.allocations += 1;
                debug!(id = texture.id.0, ?size, ?format, "framebuffer allocated");
                texture
            }
        };
        self.stats.live += 1;
        self.stats.high_water = self.stats.high_water.max(self.stats.live);
        Ok(PooledFramebuffer {
            texture,
            epoch: self.epoch,
        })
    }

    /// Acquires a target sized to the viewport divided by `divisor`.
    pub fn acquire_viewport_framebuffer(
        &mut self,
        provider: &mut ContextProvider,
        format: TextureFormat,
        divisor: u32,
    ) -> Result<PooledFramebuffer, GraphicsError> {
        let size = self.viewport.scaled_down(divisor);
        self.acquire_framebuffer(provider, size, format)
    }

    pub fn release(&mut self, provider: &mut ContextProvider, fb: PooledFramebuffer) {
        self.stats.live = self.stats.live.saturating_sub(1);
        self.stats.releases += 1;
        if fb.epoch == self.epoch {
            self.free.push(fb.texture);
        } else {
            trace!(id = fb.texture.id.0, "stale framebuffer destroyed on release");
            self.destroy(provider, fb.texture);
        }
    }

    /// Drops every idle target and marks live ones stale.
    pub fn invalidate_viewport(&mut self, provider: &mut ContextProvider, viewport: Size) {
        self.epoch += 1;
        self.viewport = viewport;
        debug!(
            ?viewport,
            idle = self.free.len(),
            live = self.stats.live,
            "framebuffer pool invalidated"
        );
        for texture in std::mem::take(&mut self.free) {
            self.destroy(provider, texture);
        }
    }

    /// Destroys all idle targets. Live handles are reported, not reclaimed.
    pub fn clear(&mut self, provider: &mut ContextProvider) {
        if self.stats.live > 0 {
            warn!(live = self.stats.live, "pool cleared with framebuffers still checked out");
        }
        for texture in std::mem::take(&mut self.free) {
            self.destroy(provider, texture);
        }
    }

    fn destroy(&mut self, provider: &mut ContextProvider, texture: Texture) {
        if let Err(err) = provider.delete_texture(texture.id) {
            warn!("failed to delete pooled framebuffer: {err}");
        }
        self.stats.destroyed += 1;
    }
}
