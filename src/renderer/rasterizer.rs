//! Text rasterization seam.
//!
//! The pipeline only needs a pixel box and a bitmap per text; how those are
//! produced is up to the [`TextRasterizer`] implementation. [`FontdueRasterizer`]
//! is the bundled one.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use image::{Rgba, RgbaImage};

use crate::{
    color::parse_fill,
    text::{Text, TextProperties},
};

/// A measured and drawn text, ready to be copied into the atlas.
#[derive(Clone, Debug)]
pub struct RasterizedText {
    pub width: u32,
    pub height: u32,
    pub bitmap: RgbaImage,
}

impl RasterizedText {
    pub fn new(bitmap: RgbaImage) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            bitmap,
        }
    }

    /// A transparent bitmap of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }
}

pub trait TextRasterizer: Send + Sync {
    fn rasterize(&self, text: &Text) -> Result<RasterizedText>;
}

pub struct FontdueRasterizer {
    fallback: fontdue::Font,
    families: HashMap<String, fontdue::Font>,
}

fn load_font(bytes: &[u8]) -> Result<fontdue::Font> {
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|e| anyhow!("failed to parse font: {e}"))
}

fn load_font_file(path: &Path) -> Result<fontdue::Font> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    load_font(&bytes).with_context(|| format!("font {}", path.display()))
}

impl FontdueRasterizer {
    pub fn new(fallback: fontdue::Font) -> Self {
        Self {
            fallback,
            families: HashMap::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(load_font(bytes)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_font_file(path.as_ref())?))
    }

    pub fn add_family(&mut self, family: impl Into<String>, font: fontdue::Font) {
        self.families.insert(family.into(), font);
    }

    pub fn add_family_from_path(
        &mut self,
        family: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let font = load_font_file(path.as_ref())?;
        self.add_family(family, font);
        Ok(())
    }

    fn font_for(&self, props: &TextProperties) -> &fontdue::Font {
        self.families.get(&props.family).unwrap_or(&self.fallback)
    }
}

struct PlacedGlyph {
    ch: char,
    x: f32,
    baseline: f32,
}

/// Box size for a block of lines with the given advances, including padding.
pub(crate) fn box_size(line_advances: &[f32], props: &TextProperties) -> (u32, u32) {
    let pad = props.resolved_padding();
    let widest = line_advances.iter().copied().fold(0.0_f32, f32::max);
    let lines = line_advances.len().max(1) as f32;
    let w = pad.left + widest + pad.right;
    let h = pad.top + lines * props.line_height() + pad.bottom;
    (w.ceil().max(0.0) as u32, h.ceil().max(0.0) as u32)
}

impl TextRasterizer for FontdueRasterizer {
    fn rasterize(&self, text: &Text) -> Result<RasterizedText> {
        let props = &text.properties;
        let font = self.font_for(props);
        let px = props.size.max(0.0);
        let pad = props.resolved_padding();
        let line_height = props.line_height();

        let (ascent, descent) = font
            .horizontal_line_metrics(px)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((px * 0.8, -px * 0.2));
        let half_leading = (line_height - (ascent - descent)) * 0.5;

        let mut glyphs: Vec<PlacedGlyph> = Vec::new();
        let mut advances: Vec<f32> = Vec::new();
        for (line_index, line) in text.value.split('\n').enumerate() {
            let baseline = pad.top + line_index as f32 * line_height + half_leading + ascent;
            let mut pen = 0.0_f32;
            let mut prev: Option<char> = None;
            for ch in line.chars() {
                if let Some(p) = prev {
                    pen += font.horizontal_kern(p, ch, px).unwrap_or(0.0);
                }
                glyphs.push(PlacedGlyph {
                    ch,
                    x: pad.left + pen,
                    baseline,
                });
                pen += font.metrics(ch, px).advance_width;
                prev = Some(ch);
            }
            advances.push(pen);
        }

        let (width, height) = box_size(&advances, props);
        let fill = parse_fill(&props.fill);
        let mut bitmap = RgbaImage::new(width, height);

        for g in &glyphs {
            let (metrics, coverage) = font.rasterize(g.ch, px);
            let gx = (g.x + metrics.xmin as f32).round() as i64;
            let gy = (g.baseline - (metrics.ymin as f32 + metrics.height as f32)).round() as i64;
            for cy in 0..metrics.height {
                for cx in 0..metrics.width {
                    let (x, y) = (gx + cx as i64, gy + cy as i64);
                    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                        continue;
                    }
                    let cov = coverage[cy * metrics.width + cx] as u32;
                    let alpha = (cov * fill[3] as u32 / 255) as u8;
                    let dst = bitmap.get_pixel_mut(x as u32, y as u32);
                    if alpha > dst[3] {
                        *dst = Rgba([fill[0], fill[1], fill[2], alpha]);
                    }
                }
            }
        }

        Ok(RasterizedText {
            width,
            height,
            bitmap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_size_includes_padding_and_leading() {
        let props = TextProperties {
            size: 20.0,
            leading: 1.5,
            padding: 2.0,
            padding_left: Some(5.0),
            ..TextProperties::default()
        };
        assert_eq!(box_size(&[30.2, 12.0], &props), (38, 64));
    }

    #[test]
    fn empty_text_is_one_line_tall() {
        let props = TextProperties::default();
        assert_eq!(box_size(&[0.0], &props), (0, 18));
        assert_eq!(box_size(&[], &props), (0, 18));
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        assert!(FontdueRasterizer::from_bytes(&[0, 1, 2, 3]).is_err());
    }

    const MONO: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/DejaVuSansMono.ttf"
    ));

    fn mono() -> FontdueRasterizer {
        FontdueRasterizer::from_bytes(MONO).unwrap()
    }

    fn styled(value: &str, props: TextProperties) -> RasterizedText {
        mono()
            .rasterize(&Text::with_properties(value, props))
            .unwrap()
    }

    fn padded(fill: &str) -> TextProperties {
        TextProperties {
            size: 24.0,
            padding: 6.0,
            fill: fill.to_string(),
            ..TextProperties::default()
        }
    }

    #[test]
    fn bitmap_matches_measured_box() {
        let props = padded("#000");
        let font = fontdue::Font::from_bytes(MONO, fontdue::FontSettings::default()).unwrap();
        let advance = font.metrics('H', 24.0).advance_width
            + font.horizontal_kern('H', 'i', 24.0).unwrap_or(0.0)
            + font.metrics('i', 24.0).advance_width;

        let r = styled("Hi", props.clone());
        assert_eq!((r.width, r.height), box_size(&[advance], &props));
        assert_eq!(r.bitmap.dimensions(), (r.width, r.height));
        assert_eq!(r.height, (6.0 + 24.0 * 1.5 + 6.0_f32).ceil() as u32);
    }

    #[test]
    fn padding_stays_clear_of_ink() {
        let r = styled("Hi", padded("#000"));
        let mut inked = 0;
        for (x, y, px) in r.bitmap.enumerate_pixels() {
            if px[3] == 0 {
                continue;
            }
            inked += 1;
            assert!(x >= 6 && x < r.width - 6, "ink at x={x}");
            assert!(y >= 6 && y < r.height - 6, "ink at y={y}");
        }
        assert!(inked > 0);
    }

    #[test]
    fn fill_alpha_scales_coverage() {
        let r = styled("Hi", padded("#ff000080"));
        let max_alpha = r.bitmap.pixels().map(|p| p[3]).max().unwrap();
        assert!(max_alpha > 0 && max_alpha <= 128, "max alpha {max_alpha}");
        for px in r.bitmap.pixels().filter(|p| p[3] > 0) {
            assert_eq!([px[0], px[1], px[2]], [255, 0, 0]);
        }
    }

    #[test]
    fn each_line_adds_one_line_height() {
        let one = styled("Hi", padded("#000"));
        let two = styled("Hi\nHi", padded("#000"));
        assert!(two.height > one.height);
        assert_eq!(two.height - one.height, 36);
        assert_eq!(two.width, one.width);
    }

    #[test]
    fn blank_raster_matches_bitmap() {
        let r = RasterizedText::blank(7, 3);
        assert_eq!((r.width, r.height), (7, 3));
        assert_eq!(r.bitmap.dimensions(), (7, 3));
    }
}
