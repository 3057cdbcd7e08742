//! Dense CPU pixel buffers handed between the renderer and the window layer.

use crate::error::GraphicsError;
use crate::format::PixelFormat;

/// Tight-packed pixel rows, top row first.
///
/// There is no row padding: `pitch() == width * bytes_per_pixel()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates a zero-filled buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    /// Wraps existing bytes, validating the length against the dimensions.
    pub fn from_data(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, GraphicsError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(GraphicsError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Bytes per row.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of the pixel at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.bytes_per_pixel();
        let start = y as usize * self.pitch() + x as usize * bpp;
        &self.data[start..start + bpp]
    }

    /// Reverses row order in place (OpenGL returns rows bottom-up).
    pub fn flip_vertical(&mut self) {
        let pitch = self.pitch();
        let rows = self.height as usize;
        for y in 0..rows / 2 {
            let (top, bottom) = self.data.split_at_mut((rows - 1 - y) * pitch);
            top[y * pitch..(y + 1) * pitch].swap_with_slice(&mut bottom[..pitch]);
        }
    }

    /// Extracts the alpha channel of an RGBA buffer. Alpha buffers are
    /// returned unchanged.
    pub fn to_alpha(&self) -> PixelBuffer {
        match self.format {
            PixelFormat::Alpha8 => self.clone(),
            PixelFormat::Rgba8 => PixelBuffer {
                width: self.width,
                height: self.height,
                format: PixelFormat::Alpha8,
                data: self.data.chunks_exact(4).map(|px| px[3]).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_length() {
        let err = PixelBuffer::from_data(2, 2, PixelFormat::Rgba8, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            GraphicsError::InvalidPixelData {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn flip_reverses_rows() {
        let mut buf =
            PixelBuffer::from_data(1, 3, PixelFormat::Alpha8, vec![1, 2, 3]).unwrap();
        buf.flip_vertical();
        assert_eq!(buf.data(), &[3, 2, 1]);
    }

    #[test]
    fn alpha_extraction_is_tight_packed() {
        let buf = PixelBuffer::from_data(
            2,
            1,
            PixelFormat::Rgba8,
            vec![10, 20, 30, 40, 50, 60, 70, 80],
        )
        .unwrap();
        let alpha = buf.to_alpha();
        assert_eq!(alpha.pitch(), 2);
        assert_eq!(alpha.data(), &[40, 80]);
    }
}
