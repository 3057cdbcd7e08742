//! CPU texel storage with per-format quantisation.

use half::f16;
use scene3d_core::{PixelBuffer, PixelFormat, Rect, Size, TextureFormat};

/// Rounds a shaded value to what a texture of `format` can store.
#[inline]
pub fn quantize(format: TextureFormat, texel: [f32; 4]) -> [f32; 4] {
    match format {
        TextureFormat::Rgba8 => texel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0),
        TextureFormat::Rgba16F => texel.map(|c| f16::from_f32(c).to_f32()),
        TextureFormat::Rgba32F => texel,
    }
}

#[inline]
fn to_unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Row-major, top row first.
#[derive(Debug, Clone)]
pub struct Surface {
    pub size: Size,
    pub format: TextureFormat,
    pub texels: Vec<[f32; 4]>,
}

impl Surface {
    pub fn new(size: Size, format: TextureFormat) -> Self {
        Self {
            size,
            format,
            texels: vec![[0.0; 4]; size.area()],
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    /// Nearest fetch with clamp-to-edge addressing.
    #[inline]
    pub fn fetch(&self, x: i32, y: i32) -> [f32; 4] {
        if self.size.is_empty() {
            return [0.0; 4];
        }
        let x = x.clamp(0, self.size.width as i32 - 1);
        let y = y.clamp(0, self.size.height as i32 - 1);
        self.texels[self.index(x, y)]
    }

    /// Texel coordinate under normalised `(u, v)`.
    #[inline]
    pub fn texel_at(&self, u: f32, v: f32) -> (i32, i32) {
        (
            (u * self.size.width as f32).floor() as i32,
            (v * self.size.height as f32).floor() as i32,
        )
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> [f32; 4] {
        self.texels[self.index(x, y)]
    }

    #[inline]
    pub fn store(&mut self, x: i32, y: i32, texel: [f32; 4]) {
        let i = self.index(x, y);
        self.texels[i] = quantize(self.format, texel);
    }

    pub fn fill(&mut self, texel: [f32; 4]) {
        let texel = quantize(self.format, texel);
        self.texels.iter_mut().for_each(|t| *t = texel);
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.texels = vec![[0.0; 4]; size.area()];
    }

    /// Reads `rect` (already clamped) as tight-packed RGBA8, top row first.
    pub fn read_rgba8(&self, rect: Rect) -> PixelBuffer {
        let size = rect.size();
        let mut out = PixelBuffer::new(size.width, size.height, PixelFormat::Rgba8);
        let data = out.data_mut();
        let mut o = 0;
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                for c in self.get(x, y) {
                    data[o] = to_unorm8(c);
                    o += 1;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_storage_rounds_to_nearest_level() {
        let q = quantize(TextureFormat::Rgba8, [0.5, 1.5, -1.0, 0.1]);
        assert_eq!(q, [128.0 / 255.0, 1.0, 0.0, 26.0 / 255.0]);
    }

    #[test]
    fn half_float_keeps_hdr_values() {
        let q = quantize(TextureFormat::Rgba16F, [4.0, 0.5, 0.25, 1.0]);
        assert_eq!(q, [4.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn fetch_clamps_to_edges() {
        let mut s = Surface::new(Size::new(2, 1), TextureFormat::Rgba32F);
        s.store(0, 0, [1.0, 0.0, 0.0, 1.0]);
        s.store(1, 0, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(s.fetch(-5, 3), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.fetch(7, -1), [0.0, 1.0, 0.0, 1.0]);
    }
}
