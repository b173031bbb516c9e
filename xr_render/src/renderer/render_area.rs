/// Render-area (viewport) rectangles and their stack

use glam::UVec2;

/// Pixel rectangle, origin at the lower-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RenderArea {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Area at the origin covering `size`
    pub fn from_size(size: UVec2) -> Self {
        Self::new(0, 0, size.x, size.y)
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (dx, dy) = (i64::from(x) - i64::from(self.x), i64::from(y) - i64::from(self.y));
        (0..i64::from(self.width)).contains(&dx) && (0..i64::from(self.height)).contains(&dy)
    }
}

/// Stack of nested render areas; the top is current
///
/// Render thread only.
#[derive(Debug, Default)]
pub struct RenderAreaStack {
    areas: Vec<RenderArea>,
}

impl RenderAreaStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, area: RenderArea) {
        self.areas.push(area);
    }

    pub fn pop(&mut self) -> Option<RenderArea> {
        self.areas.pop()
    }

    pub fn top(&self) -> Option<RenderArea> {
        self.areas.last().copied()
    }

    /// Top of the stack, or the full window when empty
    pub fn current(&self, window_size: UVec2) -> RenderArea {
        self.top().unwrap_or_else(|| RenderArea::from_size(window_size))
    }

    pub fn depth(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn clear(&mut self) {
        self.areas.clear();
    }
}

#[cfg(test)]
#[path = "render_area_tests.rs"]
mod tests;
