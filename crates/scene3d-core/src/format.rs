//! Texture storage formats and CPU-side pixel layouts.

/// Storage format of a GPU texture / framebuffer color attachment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit unsigned normalised RGBA.
    Rgba8,
    /// 16-bit float RGBA. Used for intermediates that must not band.
    Rgba16F,
    /// 32-bit float RGBA.
    Rgba32F,
}

impl TextureFormat {
    #[inline]
    pub fn is_float(self) -> bool {
        !matches!(self, TextureFormat::Rgba8)
    }

    #[inline]
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
        }
    }
}

/// Layout of a tight-packed CPU pixel buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Four bytes per pixel, RGBA order.
    Rgba8,
    /// One byte per pixel holding alpha only.
    Alpha8,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Alpha8 => 1,
        }
    }
}
