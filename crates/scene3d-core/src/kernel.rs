//! Separable Gaussian kernel.
//!
//! A 2D Gaussian of radius `r` factors into two 1D passes of `2r + 1` taps,
//! turning an `O(r²)` convolution into `O(r)` per pass.

use std::hash::{Hash, Hasher};

/// Largest radius accepted when building a blur program.
pub const MAX_BLUR_RADIUS: u32 = 32;

/// 1D Gaussian weights, baked into blur programs.
#[derive(Debug, Copy, Clone)]
pub struct BlurKernel {
    radius: u32,
    sigma: f32,
}

impl BlurKernel {
    /// Builds a kernel. `sigma` defaults to `radius / 2`.
    pub fn new(radius: u32, sigma: Option<f32>) -> Self {
        let sigma = sigma
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or((radius as f32 * 0.5).max(0.5));
        Self { radius, sigma }
    }

    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    #[inline]
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    #[inline]
    pub fn taps(&self) -> usize {
        2 * self.radius as usize + 1
    }

    /// Normalised weights for offsets `-r..=r`.
    pub fn weights(&self) -> Vec<f32> {
        let r = self.radius as i32;
        let denom = 2.0 * self.sigma * self.sigma;
        let raw: Vec<f32> = (-r..=r)
            .map(|i| (-((i * i) as f32) / denom).exp())
            .collect();
        let sum: f32 = raw.iter().sum();
        raw.into_iter().map(|w| w / sum).collect()
    }

    /// `(offset, weight)` pairs, offsets in texels.
    pub fn offsets_and_weights(&self) -> impl Iterator<Item = (i32, f32)> {
        let r = self.radius as i32;
        (-r..=r).zip(self.weights())
    }
}

impl PartialEq for BlurKernel {
    fn eq(&self, other: &Self) -> bool {
        self.radius == other.radius && self.sigma.to_bits() == other.sigma.to_bits()
    }
}

impl Eq for BlurKernel {}

impl Hash for BlurKernel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.radius.hash(state);
        self.sigma.to_bits().hash(state);
    }
}
