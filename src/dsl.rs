//! JSON scene files: texts, fonts, output surface and material.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    renderer::{FontdueRasterizer, MaterialBuildOptions, MaterialSpec},
    text::{Text, parse_texts},
};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    #[serde(default)]
    pub output: Option<OutputSize>,
    #[serde(default = "default_sample_accuracy")]
    pub sample_accuracy: f32,
    #[serde(default)]
    pub fonts: FontConfig,
    /// Raw entries; anything that is not a text is dropped on use.
    #[serde(default)]
    pub texts: Vec<Value>,
    pub material: MaterialSpec,
}

fn default_sample_accuracy() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct FontConfig {
    /// Used for every family without its own entry.
    #[serde(default)]
    pub default: Option<PathBuf>,
    #[serde(default)]
    pub families: BTreeMap<String, PathBuf>,
}

impl SceneConfig {
    pub fn texts(&self) -> Vec<Text> {
        parse_texts(&self.texts)
    }

    pub fn build_options(&self) -> MaterialBuildOptions {
        MaterialBuildOptions {
            output_size: self.output.map(|o| [o.width, o.height]),
            sample_accuracy: self.sample_accuracy,
        }
    }

    pub fn rasterizer(&self) -> Result<FontdueRasterizer> {
        let default = self
            .fonts
            .default
            .as_ref()
            .ok_or_else(|| anyhow!("scene has no default font (fonts.default)"))?;
        let mut rasterizer = FontdueRasterizer::from_path(default)?;
        for (family, path) in &self.fonts.families {
            rasterizer
                .add_family_from_path(family, path)
                .with_context(|| format!("failed to load font family {family:?}"))?;
        }
        Ok(rasterizer)
    }

    /// Resolve relative font paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.fonts.default.as_mut() {
            resolve(p);
        }
        self.fonts.families.values_mut().for_each(resolve);
    }
}

pub fn load_scene_from_path(path: impl AsRef<Path>) -> Result<SceneConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene json at {}", path.display()))?;
    let mut scene: SceneConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scene json at {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    scene.resolve_paths(base);
    Ok(scene)
}
