//! Core type definitions shared by the mapping pipeline.

use serde::Serialize;

/// Integer pixel rectangle in atlas space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when both rectangles share at least one pixel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Rectangle in output-surface pixel space, as stored in the bounds lookup texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn to_rgba(self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn from_rgba(v: [f32; 4]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            width: v[2],
            height: v[3],
        }
    }

    pub fn center(&self) -> [f32; 2] {
        [self.x + self.width * 0.5, self.y + self.height * 0.5]
    }
}

/// Generated GLSL sources for one material.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ShaderBundle {
    pub vertex: String,
    pub fragment: String,
}

/// Blend configuration for the terminal surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Straight (non-premultiplied) source-over: `src * a + dst * (1 - a)`.
    Straight,
    Premultiplied,
}

/// Fixed-function state the shaded surface must be drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
}

impl Default for RenderState {
    fn default() -> Self {
        // The fragment stage composites alpha itself.
        Self {
            depth_test: false,
            depth_write: false,
            blend: BlendMode::Straight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 0, 5, 5);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&PixelRect::new(9, 9, 2, 2)));
    }

    #[test]
    fn empty_rect_never_intersects() {
        let a = PixelRect::new(0, 0, 10, 10);
        assert!(!a.intersects(&PixelRect::new(2, 2, 0, 4)));
    }
}
