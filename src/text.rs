//! Text values and their style properties.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Style properties handed to the rasterizer.
///
/// Every field has a default, so a scene may specify any subset. Per-side
/// padding falls back to `padding` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProperties {
    pub family: String,
    /// Font size in pixels.
    pub size: f32,
    /// Line height as a multiple of `size`.
    pub leading: f32,
    pub fill: String,
    pub style: String,
    pub weight: u16,
    pub padding: f32,
    pub padding_top: Option<f32>,
    pub padding_right: Option<f32>,
    pub padding_bottom: Option<f32>,
    pub padding_left: Option<f32>,
}

impl Default for TextProperties {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size: 12.0,
            leading: 1.5,
            fill: "#000".to_string(),
            style: "normal".to_string(),
            weight: 500,
            padding: 0.0,
            padding_top: None,
            padding_right: None,
            padding_bottom: None,
            padding_left: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl TextProperties {
    pub fn resolved_padding(&self) -> Padding {
        let side = |v: Option<f32>| v.unwrap_or(self.padding).max(0.0);
        Padding {
            top: side(self.padding_top),
            right: side(self.padding_right),
            bottom: side(self.padding_bottom),
            left: side(self.padding_left),
        }
    }

    pub fn line_height(&self) -> f32 {
        (self.size * self.leading).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub value: String,
    #[serde(default)]
    pub properties: TextProperties,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            properties: TextProperties::default(),
        }
    }

    pub fn with_properties(value: impl Into<String>, properties: TextProperties) -> Self {
        Self {
            value: value.into(),
            properties,
        }
    }
}

/// Keep only entries that describe a text; everything else is dropped with a warning.
///
/// Accepted shapes are a bare string or an object with a string `value` and
/// optional `properties`.
pub fn parse_texts(values: &[Value]) -> Vec<Text> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| match v {
            Value::String(s) => Some(Text::new(s.clone())),
            Value::Object(obj) if obj.get("value").is_some_and(Value::is_string) => {
                match serde_json::from_value::<Text>(v.clone()) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        log::warn!("dropping text entry {i}: invalid properties: {e}");
                        None
                    }
                }
            }
            _ => {
                log::warn!("dropping text entry {i}: expected a string or {{\"value\": string}}");
                None
            }
        })
        .collect()
}
