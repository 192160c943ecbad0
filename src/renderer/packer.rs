//! Growing-bin rectangle packer.
//!
//! Rectangles are placed in input order into a bin that starts at the size of
//! the first rectangle and grows right or down whenever nothing fits. Free space
//! is tracked as a list of disjoint rectangles; placing a rectangle splits its
//! host with the shorter-leftover-axis guillotine rule. Placements never move
//! once made, so packing cannot fail for any finite input whose bin fits in
//! `u32` on each side. Growth never overflows: a rectangle that would need a
//! bin beyond that is given an empty placement at the origin.

use super::types::PixelRect;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackSize {
    pub width: u32,
    pub height: u32,
}

impl PackSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackResult {
    pub bin_width: u32,
    pub bin_height: u32,
    /// Same length and order as the input sizes.
    pub placements: Vec<PixelRect>,
}

#[derive(Clone, Debug, Default)]
pub struct GrowingPacker {
    bin_width: u32,
    bin_height: u32,
    free: Vec<PixelRect>,
}

impl GrowingPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bin_size(&self) -> [u32; 2] {
        [self.bin_width, self.bin_height]
    }

    /// Place one rectangle, growing the bin as needed.
    pub fn insert(&mut self, size: PackSize) -> PixelRect {
        let PackSize { width, height } = size;
        if width == 0 || height == 0 {
            return PixelRect::new(0, 0, width, height);
        }

        if self.bin_width == 0 || self.bin_height == 0 {
            // Seed: a bin that only holds zero-area entries so far.
            self.bin_width = width;
            self.bin_height = height;
            self.free.clear();
            return PixelRect::new(0, 0, width, height);
        }

        loop {
            if let Some(i) = self.best_fit(width, height) {
                return self.place(i, width, height);
            }
            if !self.grow(width, height) {
                log::warn!(
                    "{width}x{height} does not fit a {}x{} bin without exceeding u32; placed empty",
                    self.bin_width,
                    self.bin_height
                );
                return PixelRect::new(0, 0, 0, 0);
            }
        }
    }

    fn best_fit(&self, width: u32, height: u32) -> Option<usize> {
        let mut best: Option<(usize, u64, u32)> = None;
        for (i, fr) in self.free.iter().enumerate() {
            if fr.width < width || fr.height < height {
                continue;
            }
            let area = fr.area();
            let short_leftover = (fr.width - width).min(fr.height - height);
            let better = match best {
                None => true,
                Some((_, best_area, best_short)) => {
                    area < best_area || (area == best_area && short_leftover < best_short)
                }
            };
            if better {
                best = Some((i, area, short_leftover));
            }
        }
        best.map(|(i, _, _)| i)
    }

    fn place(&mut self, i: usize, width: u32, height: u32) -> PixelRect {
        let host = self.free.remove(i);
        let leftover_w = host.width - width;
        let leftover_h = host.height - height;

        let (right, down) = if leftover_w <= leftover_h {
            (
                PixelRect::new(host.x + width, host.y, leftover_w, height),
                PixelRect::new(host.x, host.y + height, host.width, leftover_h),
            )
        } else {
            (
                PixelRect::new(host.x + width, host.y, leftover_w, host.height),
                PixelRect::new(host.x, host.y + height, width, leftover_h),
            )
        };

        for piece in [right, down] {
            if !piece.is_empty() {
                self.free.push(piece);
            }
        }

        PixelRect::new(host.x, host.y, width, height)
    }

    /// Add free space that fits `width x height`. False when every way of
    /// growing would overflow the bin's `u32` extent.
    fn grow(&mut self, width: u32, height: u32) -> bool {
        let grown_right = self.bin_width.checked_add(width);
        let grown_down = self.bin_height.checked_add(height);
        let can_grow_right = height <= self.bin_height && grown_right.is_some();
        let can_grow_down = width <= self.bin_width && grown_down.is_some();

        if !can_grow_right && !can_grow_down {
            if width <= self.bin_width || grown_down.is_none() {
                return false;
            }
            // Widen first so that the next attempt can grow down.
            self.free.push(PixelRect::new(
                self.bin_width,
                0,
                width - self.bin_width,
                self.bin_height,
            ));
            self.bin_width = width;
            return true;
        }

        let grow_right = match (grown_right, grown_down) {
            (Some(right), Some(down)) if can_grow_right && can_grow_down => {
                aspect(right, self.bin_height) < aspect(self.bin_width, down)
            }
            _ => can_grow_right,
        };

        if let (true, Some(right)) = (grow_right, grown_right) {
            self.free
                .push(PixelRect::new(self.bin_width, 0, width, self.bin_height));
            self.bin_width = right;
        } else if let Some(down) = grown_down {
            self.free
                .push(PixelRect::new(0, self.bin_height, self.bin_width, height));
            self.bin_height = down;
        }
        true
    }
}

fn aspect(w: u32, h: u32) -> f64 {
    let (lo, hi) = if w < h { (w as u64, h as u64) } else { (h as u64, w as u64) };
    hi as f64 / lo.max(1) as f64
}

/// Pack `sizes` in order.
pub fn pack(sizes: &[PackSize]) -> PackResult {
    let mut packer = GrowingPacker::new();
    let placements = sizes.iter().map(|s| packer.insert(*s)).collect();
    let [bin_width, bin_height] = packer.bin_size();
    PackResult {
        bin_width,
        bin_height,
        placements,
    }
}
