//! The set of texts rendered by one material, with their atlas placements.

use super::{
    packer::{PackSize, pack},
    rasterizer::{RasterizedText, TextRasterizer},
    types::{Bounds, PixelRect},
};
use crate::text::Text;

#[derive(Clone, Debug)]
pub struct TextEntry {
    /// Registration order; the key into every lookup texture.
    pub index: usize,
    pub text: Text,
    pub raster: RasterizedText,
    pub placement: PixelRect,
}

/// Immutable once built. Changing the text set means building a new mapping,
/// which may reassign indices.
#[derive(Clone, Debug)]
pub struct Mapping {
    entries: Vec<TextEntry>,
    width: u32,
    height: u32,
}

impl Mapping {
    /// Rasterize `texts` and pack them in registration order.
    ///
    /// A text the rasterizer rejects is dropped with a warning before indices
    /// are assigned, so the remaining texts keep dense indices.
    pub fn build(texts: Vec<Text>, rasterizer: &dyn TextRasterizer) -> Self {
        let mut rasterized = Vec::with_capacity(texts.len());
        for (i, text) in texts.into_iter().enumerate() {
            match rasterizer.rasterize(&text) {
                Ok(raster) => rasterized.push((text, raster)),
                Err(e) => log::warn!("dropping text {i} ({:?}): {e:#}", text.value),
            }
        }
        Self::from_rasterized(rasterized)
    }

    /// Pack texts that were rasterized elsewhere.
    pub fn from_rasterized(items: Vec<(Text, RasterizedText)>) -> Self {
        let sizes: Vec<PackSize> = items
            .iter()
            .map(|(_, r)| PackSize::new(r.width, r.height))
            .collect();
        let packed = pack(&sizes);

        let entries: Vec<TextEntry> = items
            .into_iter()
            .zip(packed.placements)
            .enumerate()
            .map(|(index, ((text, raster), placement))| TextEntry {
                index,
                text,
                raster,
                placement,
            })
            .collect();

        log::debug!(
            "packed {} texts into {}x{}",
            entries.len(),
            packed.bin_width,
            packed.bin_height
        );

        Self {
            entries,
            width: packed.bin_width.max(1),
            height: packed.bin_height.max(1),
        }
    }

    pub fn entries(&self) -> &[TextEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TextEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atlas width in pixels (at least 1).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Atlas height in pixels (at least 1).
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Bounds of entry `index` on an output surface of `output_size` pixels.
    ///
    /// The atlas is stretched over the whole output surface, so bounds are the
    /// atlas placement scaled by output/atlas.
    pub fn output_bounds(&self, index: usize, output_size: [u32; 2]) -> Option<Bounds> {
        let p = self.entries.get(index)?.placement;
        let sx = output_size[0] as f64 / self.width as f64;
        let sy = output_size[1] as f64 / self.height as f64;
        Some(Bounds {
            x: (p.x as f64 * sx) as f32,
            y: (p.y as f64 * sy) as f32,
            width: (p.width as f64 * sx) as f32,
            height: (p.height as f64 * sy) as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::{Result, bail};

    fn blank(value: &str, w: u32, h: u32) -> (Text, RasterizedText) {
        (Text::new(value), RasterizedText::blank(w, h))
    }

    /// Fixed-size boxes; rejects any text whose value is "bad".
    struct PickyRasterizer;

    impl TextRasterizer for PickyRasterizer {
        fn rasterize(&self, text: &Text) -> Result<RasterizedText> {
            if text.value == "bad" {
                bail!("no glyphs");
            }
            Ok(RasterizedText::blank(6, 4))
        }
    }

    #[test]
    fn rejected_texts_are_dropped_and_indices_stay_dense() {
        let texts = ["ok", "bad", "ok2"].into_iter().map(Text::new).collect();
        let mapping = Mapping::build(texts, &PickyRasterizer);
        let values: Vec<(usize, &str)> = mapping
            .entries()
            .iter()
            .map(|e| (e.index, e.text.value.as_str()))
            .collect();
        assert_eq!(values, [(0, "ok"), (1, "ok2")]);
    }

    #[test]
    fn all_texts_rejected_gives_empty_mapping() {
        let mapping = Mapping::build(vec![Text::new("bad")], &PickyRasterizer);
        assert!(mapping.is_empty());
        assert_eq!(mapping.size(), [1, 1]);
    }

    #[test]
    fn indices_follow_registration_order() {
        let mapping = Mapping::from_rasterized(vec![blank("a", 4, 4), blank("b", 8, 2)]);
        let values: Vec<(usize, &str)> = mapping
            .entries()
            .iter()
            .map(|e| (e.index, e.text.value.as_str()))
            .collect();
        assert_eq!(values, [(0, "a"), (1, "b")]);
    }

    #[test]
    fn empty_mapping_is_one_pixel() {
        let mapping = Mapping::from_rasterized(Vec::new());
        assert!(mapping.is_empty());
        assert_eq!(mapping.size(), [1, 1]);
    }

    #[test]
    fn output_bounds_scale_with_output_size() {
        let mapping = Mapping::from_rasterized(vec![blank("a", 10, 20), blank("b", 10, 20)]);
        let [w, h] = mapping.size();
        let same = mapping.output_bounds(1, [w, h]).unwrap();
        let p = mapping.get(1).unwrap().placement;
        assert_eq!(same, Bounds { x: p.x as f32, y: p.y as f32, width: 10.0, height: 20.0 });

        let doubled = mapping.output_bounds(1, [w * 2, h * 2]).unwrap();
        assert_eq!(doubled.width, 20.0);
        assert_eq!(doubled.height, 40.0);
        assert!(mapping.output_bounds(2, [w, h]).is_none());
    }
}
