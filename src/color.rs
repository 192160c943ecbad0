use anyhow::{Result, bail};
use image::Rgba;

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parse a CSS-style hex color: `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
///
/// Example:
/// ```
/// use text_mapping_render::color::parse_hex_color;
/// let c = parse_hex_color("#f80").unwrap();
/// assert_eq!(c.0, [255, 136, 0, 255]);
/// ```
pub fn parse_hex_color(s: &str) -> Result<Rgba<u8>> {
    let Some(digits) = s.trim().strip_prefix('#') else {
        bail!("color must start with '#': {s:?}");
    };
    let nibbles: Option<Vec<u8>> = digits.bytes().map(hex_nibble).collect();
    let Some(n) = nibbles else {
        bail!("invalid hex digit in color {s:?}");
    };

    let channels: Vec<u8> = match n.len() {
        3 | 4 => n.iter().map(|v| v * 17).collect(),
        6 | 8 => n.chunks(2).map(|p| p[0] * 16 + p[1]).collect(),
        other => bail!("color {s:?} has {other} hex digits (expected 3, 4, 6 or 8)"),
    };

    let a = channels.get(3).copied().unwrap_or(255);
    Ok(Rgba([channels[0], channels[1], channels[2], a]))
}

/// Resolve a text fill, falling back to opaque black.
pub fn parse_fill(s: &str) -> Rgba<u8> {
    match parse_hex_color(s) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("invalid fill, using black: {e:#}");
            Rgba([0, 0, 0, 255])
        }
    }
}
