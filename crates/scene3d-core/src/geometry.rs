//! Integer and normalised rectangles used for viewports and draw regions.
//!
//! All rectangles use a top-left origin with `+Y` pointing down. Providers that
//! talk to OpenGL convert to bottom-left origin at the API boundary.

/// Size of a render target in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Divides both dimensions, never going below one pixel.
    pub fn scaled_down(self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }
}

/// Pixel rectangle, `right`/`bottom` exclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle covering a whole target of the given size.
    #[inline]
    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn size(&self) -> Size {
        Size::new(self.width().max(0) as u32, self.height().max(0) as u32)
    }

    /// Clamps the rectangle to `[0, size)`. The result may be empty.
    pub fn clamped_to(&self, size: Size) -> Self {
        Self {
            left: self.left.max(0),
            top: self.top.max(0),
            right: self.right.min(size.width as i32),
            bottom: self.bottom.min(size.height as i32),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Rectangle in normalised `[0, 1]` coordinates relative to a viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rectf {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rectf {
    pub const FULL: Rectf = Rectf::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Maps this rectangle into pixel space of `viewport`, rounding to the
    /// pixels whose centers fall inside.
    pub fn to_pixels(&self, viewport: Rect) -> Rect {
        let w = viewport.width() as f32;
        let h = viewport.height() as f32;
        let map = |origin: i32, extent: f32, t: f32| origin + (t * extent - 0.5).ceil() as i32;
        Rect {
            left: map(viewport.left, w, self.left),
            top: map(viewport.top, h, self.top),
            right: map(viewport.left, w, self.right),
            bottom: map(viewport.top, h, self.bottom),
        }
    }
}
