//! Composites every text bitmap into the shared atlas texture.

use image::{RgbaImage, imageops};

use super::mapping::Mapping;

/// Copy each bitmap to its placement. Placements never overlap, so pixels are
/// replaced rather than blended and alpha is preserved as drawn.
pub fn build_atlas(mapping: &Mapping) -> RgbaImage {
    let mut atlas = RgbaImage::new(mapping.width(), mapping.height());
    for entry in mapping.entries() {
        if entry.placement.is_empty() {
            continue;
        }
        imageops::replace(
            &mut atlas,
            &entry.raster.bitmap,
            entry.placement.x as i64,
            entry.placement.y as i64,
        );
    }
    atlas
}
