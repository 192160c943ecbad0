//! Lookup textures that let the fragment stage find the text under a pixel.
//!
//! Channel layout is hardcoded in the generated shader:
//! - indices: R = normalized text index, A = 1 inside some text, 0 elsewhere.
//! - bounds:  RGBA = (x, y, width, height) in output pixels, texel `i` = text `i`.
//!
//! A text index is normalized to the u coordinate of its texel centre in a
//! 1 x N texture, so the value read from the indices texture can be used as-is
//! to sample the bounds and uniform textures.

use std::ops::Range;

use image::{Rgba, Rgba32FImage};

use super::{mapping::Mapping, types::Bounds};

/// `(index + 0.5) / text_count`.
pub fn encode_text_index(index: usize, text_count: usize) -> f32 {
    if text_count == 0 {
        return 0.0;
    }
    ((index as f64 + 0.5) / text_count as f64) as f32
}

/// Inverse of [`encode_text_index`]; `None` when there are no texts.
pub fn decode_text_index(value: f32, text_count: usize) -> Option<usize> {
    if text_count == 0 {
        return None;
    }
    let i = (value as f64 * text_count as f64).floor();
    Some((i.max(0.0) as usize).min(text_count - 1))
}

/// Raw bytes of a float texture for GPU upload.
pub fn texture_bytes(texture: &Rgba32FImage) -> &[u8] {
    bytemuck::cast_slice(texture.as_raw().as_slice())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndicesOptions {
    pub output_size: [u32; 2],
    /// Fraction of output resolution the indices texture is built at, in (0, 1].
    /// A text smaller than one texel still claims the texel under its centre.
    pub sample_accuracy: f32,
}

impl IndicesOptions {
    pub fn new(output_size: [u32; 2]) -> Self {
        Self {
            output_size,
            sample_accuracy: 1.0,
        }
    }

    pub fn texture_size(&self) -> [u32; 2] {
        let accuracy = if self.sample_accuracy.is_finite() && self.sample_accuracy > 0.0 {
            self.sample_accuracy.min(1.0) as f64
        } else {
            1.0
        };
        self.output_size
            .map(|v| ((v as f64 * accuracy).ceil() as u32).max(1))
    }
}

/// First texel whose centre is at or past `edge` (an output-space coordinate).
fn first_texel_at(edge: f64, output: u32, texels: u32) -> u32 {
    let t = (edge * texels as f64 / output.max(1) as f64 - 0.5).ceil();
    t.clamp(0.0, texels as f64) as u32
}

/// Texels along one axis whose centres fall in `[start, start + len)`. A
/// non-empty span that covers no centre gets the texel under its midpoint.
fn texel_span(start: f64, len: f64, output: u32, texels: u32) -> Range<u32> {
    let first = first_texel_at(start, output, texels);
    let end = first_texel_at(start + len, output, texels);
    if first < end || len <= 0.0 || texels == 0 {
        return first..end;
    }
    let mid = ((start + len * 0.5) * texels as f64 / output.max(1) as f64).floor();
    let t = mid.clamp(0.0, (texels - 1) as f64) as u32;
    t..t + 1
}

/// Paint each text's output bounds with its index, in registration order.
/// Later texts overwrite earlier ones where bounds overlap.
pub fn build_indices_texture(mapping: &Mapping, options: IndicesOptions) -> Rgba32FImage {
    let bounds: Vec<Bounds> = mapping
        .entries()
        .iter()
        .filter_map(|e| mapping.output_bounds(e.index, options.output_size))
        .collect();
    paint_indices(&bounds, options)
}

/// Paint output-space `bounds` (text `i` at position `i`) into an indices
/// texture. A texel belongs to a text when its centre falls inside the bounds,
/// or when it is under the centre of non-empty bounds that cover no centre.
/// The highest index wins where bounds overlap.
pub fn paint_indices(bounds: &[Bounds], options: IndicesOptions) -> Rgba32FImage {
    let [tw, th] = options.texture_size();
    let [ow, oh] = options.output_size;
    let mut texture = Rgba32FImage::new(tw, th);
    let count = bounds.len();

    for (index, b) in bounds.iter().enumerate() {
        let xs = texel_span(b.x as f64, b.width as f64, ow, tw);
        let ys = texel_span(b.y as f64, b.height as f64, oh, th);

        let texel = Rgba([encode_text_index(index, count), 0.0, 0.0, 1.0]);
        for y in ys {
            for x in xs.clone() {
                texture.put_pixel(x, y, texel);
            }
        }
    }

    texture
}

/// One texel per text holding its output-space bounds.
pub fn build_bounds_texture(mapping: &Mapping, output_size: [u32; 2]) -> Rgba32FImage {
    let width = (mapping.len() as u32).max(1);
    let mut texture = Rgba32FImage::new(width, 1);
    for entry in mapping.entries() {
        if let Some(b) = mapping.output_bounds(entry.index, output_size) {
            texture.put_pixel(entry.index as u32, 0, Rgba(b.to_rgba()));
        }
    }
    texture
}

/// Text index and mask stored at an indices texel.
pub fn read_indices_texel(
    texture: &Rgba32FImage,
    x: u32,
    y: u32,
    text_count: usize,
) -> Option<usize> {
    let Rgba([r, _, _, a]) = *texture.get_pixel(x, y);
    if a < 0.5 {
        return None;
    }
    decode_text_index(r, text_count)
}
