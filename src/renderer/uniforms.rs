//! Per-text user uniforms, marshaled through 1 x N float textures.
//!
//! Each declared uniform gets one RGBA32F texel per text. The fragment stage
//! samples texel `textIndex` and swizzles it down to the declared type, so
//! user code sees an ordinary variable whose value varies per text.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};
use image::{Rgba, Rgba32FImage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    data_textures::texture_bytes,
    shader::{is_reserved_identifier, uniform_texture_name},
    utils::is_glsl_identifier,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniformType {
    #[serde(rename = "1f")]
    Float,
    #[serde(rename = "2f")]
    Vec2,
    #[serde(rename = "3f")]
    Vec3,
    #[serde(rename = "4f")]
    Vec4,
}

impl UniformType {
    /// Parse the wire name (`"1f"` .. `"4f"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1f" => Some(Self::Float),
            "2f" => Some(Self::Vec2),
            "3f" => Some(Self::Vec3),
            "4f" => Some(Self::Vec4),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Float => "1f",
            Self::Vec2 => "2f",
            Self::Vec3 => "3f",
            Self::Vec4 => "4f",
        }
    }

    pub fn glsl(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }

    /// Swizzle applied to the sampled texel.
    pub fn swizzle(self) -> &'static str {
        match self {
            Self::Float => "x",
            Self::Vec2 => "xy",
            Self::Vec3 => "xyz",
            Self::Vec4 => "xyzw",
        }
    }

    pub fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }
}

/// A typed uniform value. Serializes as a number or an array of numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    pub fn zero(ty: UniformType) -> Self {
        Self::from_texel(ty, [0.0; 4])
    }

    pub fn ty(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
        }
    }

    /// Texel layout: components in RGBA order, unused channels zero.
    pub fn to_texel(self) -> [f32; 4] {
        match self {
            Self::Float(x) => [x, 0.0, 0.0, 0.0],
            Self::Vec2([x, y]) => [x, y, 0.0, 0.0],
            Self::Vec3([x, y, z]) => [x, y, z, 0.0],
            Self::Vec4(v) => v,
        }
    }

    pub fn from_texel(ty: UniformType, t: [f32; 4]) -> Self {
        match ty {
            UniformType::Float => Self::Float(t[0]),
            UniformType::Vec2 => Self::Vec2([t[0], t[1]]),
            UniformType::Vec3 => Self::Vec3([t[0], t[1], t[2]]),
            UniformType::Vec4 => Self::Vec4(t),
        }
    }

    /// Parse a JSON number (scalar) or array of numbers (vector) as `ty`.
    pub fn from_json(ty: UniformType, v: &Value) -> Result<Self> {
        let nums: Vec<f32> = match v {
            Value::Number(n) => vec![n.as_f64().ok_or_else(|| anyhow!("invalid number"))? as f32],
            Value::Array(items) => items
                .iter()
                .map(|x| {
                    x.as_f64()
                        .map(|f| f as f32)
                        .ok_or_else(|| anyhow!("expected number, got {x}"))
                })
                .collect::<Result<_>>()?,
            other => bail!("expected number or array, got {other}"),
        };
        if nums.len() != ty.components() {
            bail!(
                "type {} expects {} component(s), got {}",
                ty.wire_name(),
                ty.components(),
                nums.len()
            );
        }
        let mut t = [0.0; 4];
        t[..nums.len()].copy_from_slice(&nums);
        Ok(Self::from_texel(ty, t))
    }
}

/// Uniform declaration as written in a material spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformDecl {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_text: Option<Vec<Value>>,
}

/// A validated uniform declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct UserUniform {
    pub name: String,
    pub ty: UniformType,
    /// Used for every text without a per-text value.
    pub value: UniformValue,
    pub per_text: Vec<UniformValue>,
}

impl UserUniform {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            ty: value.ty(),
            value,
            per_text: Vec::new(),
        }
    }

    pub fn with_per_text(mut self, values: Vec<UniformValue>) -> Self {
        self.per_text = values;
        self
    }

    pub fn value_for(&self, index: usize) -> UniformValue {
        self.per_text.get(index).copied().unwrap_or(self.value)
    }
}

fn validate_decl(name: &str, decl: &UniformDecl) -> Result<UserUniform> {
    if !is_glsl_identifier(name) || name.starts_with('_') {
        bail!("not a usable GLSL identifier");
    }
    if is_reserved_identifier(name) {
        bail!("name is reserved by the mapping shader");
    }
    let Some(ty) = UniformType::parse(&decl.ty) else {
        bail!("unsupported type {:?}", decl.ty);
    };

    let value = match &decl.value {
        Some(v) => UniformValue::from_json(ty, v)?,
        None => UniformValue::zero(ty),
    };
    let per_text = decl
        .per_text
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, v)| {
            UniformValue::from_json(ty, v).map_err(|e| anyhow!("perText[{i}]: {e}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(UserUniform {
        name: name.to_string(),
        ty,
        value,
        per_text,
    })
}

/// Validate declarations, dropping (with a warning) any that cannot be used.
pub fn extract_valid_uniforms(decls: &BTreeMap<String, UniformDecl>) -> Vec<UserUniform> {
    decls
        .iter()
        .filter_map(|(name, decl)| match validate_decl(name, decl) {
            Ok(u) => Some(u),
            Err(e) => {
                log::warn!("dropping uniform {name:?}: {e:#}");
                None
            }
        })
        .collect()
}

/// Live per-text values of one uniform and the texture that carries them.
#[derive(Clone, Debug)]
pub struct UniformDataTexture {
    uniform: UserUniform,
    text_count: usize,
    texture: Rgba32FImage,
    version: u64,
}

impl UniformDataTexture {
    pub fn new(uniform: UserUniform, text_count: usize) -> Self {
        let width = (text_count as u32).max(1);
        let mut texture = Rgba32FImage::new(width, 1);
        if uniform.per_text.len() > text_count {
            log::warn!(
                "uniform {}: ignoring {} per-text value(s) beyond {} texts",
                uniform.name,
                uniform.per_text.len() - text_count,
                text_count
            );
        }
        for i in 0..text_count {
            texture.put_pixel(i as u32, 0, Rgba(uniform.value_for(i).to_texel()));
        }
        Self {
            uniform,
            text_count,
            texture,
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.uniform.name
    }

    pub fn ty(&self) -> UniformType {
        self.uniform.ty
    }

    /// Sampler name used for this uniform in the fragment stage.
    pub fn texture_name(&self) -> String {
        uniform_texture_name(&self.uniform.name)
    }

    pub fn text_count(&self) -> usize {
        self.text_count
    }

    pub fn get(&self, index: usize) -> Option<UniformValue> {
        if index >= self.text_count {
            return None;
        }
        let texel = self.texture.get_pixel(index as u32, 0).0;
        Some(UniformValue::from_texel(self.uniform.ty, texel))
    }

    pub fn set(&mut self, index: usize, value: UniformValue) -> Result<()> {
        if value.ty() != self.uniform.ty {
            bail!(
                "uniform {} is {}, got a {} value",
                self.uniform.name,
                self.uniform.ty.wire_name(),
                value.ty().wire_name()
            );
        }
        if index >= self.text_count {
            bail!(
                "uniform {}: text index {index} out of range (text count {})",
                self.uniform.name,
                self.text_count
            );
        }
        self.texture
            .put_pixel(index as u32, 0, Rgba(value.to_texel()));
        self.version += 1;
        Ok(())
    }

    pub fn set_all(&mut self, value: UniformValue) -> Result<()> {
        for i in 0..self.text_count {
            self.set(i, value)?;
        }
        Ok(())
    }

    pub fn texture(&self) -> &Rgba32FImage {
        &self.texture
    }

    pub fn bytes(&self) -> &[u8] {
        texture_bytes(&self.texture)
    }

    /// Bumped on every mutation; compare against the last uploaded version.
    pub fn version(&self) -> u64 {
        self.version
    }
}

pub fn build_user_uniform_textures(
    uniforms: &[UserUniform],
    text_count: usize,
) -> BTreeMap<String, UniformDataTexture> {
    uniforms
        .iter()
        .map(|u| (u.name.clone(), UniformDataTexture::new(u.clone(), text_count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decls(v: Value) -> BTreeMap<String, UniformDecl> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn per_text_scalars_fill_red_channel() {
        let uniforms = extract_valid_uniforms(&decls(json!({
            "uSpeed": {"type": "1f", "perText": [0.1, 0.5, 0.9]}
        })));
        let textures = build_user_uniform_textures(&uniforms, 3);
        let speed = &textures["uSpeed"];
        assert_eq!(speed.texture().dimensions(), (3, 1));
        let reds: Vec<f32> = speed.texture().pixels().map(|p| p.0[0]).collect();
        assert_eq!(reds, [0.1, 0.5, 0.9]);
    }

    #[test]
    fn scalar_value_is_broadcast() {
        let uniforms = extract_valid_uniforms(&decls(json!({
            "uColor": {"type": "4f", "value": [1.0, 0.5, 0.25, 1.0]}
        })));
        let textures = build_user_uniform_textures(&uniforms, 2);
        for i in 0..2 {
            assert_eq!(
                textures["uColor"].get(i),
                Some(UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
            );
        }
    }

    #[test]
    fn short_per_text_list_falls_back_to_value() {
        let uniforms = extract_valid_uniforms(&decls(json!({
            "uOffset": {"type": "2f", "value": [9.0, 9.0], "perText": [[1.0, 2.0]]}
        })));
        let textures = build_user_uniform_textures(&uniforms, 2);
        assert_eq!(textures["uOffset"].get(0), Some(UniformValue::Vec2([1.0, 2.0])));
        assert_eq!(textures["uOffset"].get(1), Some(UniformValue::Vec2([9.0, 9.0])));
        assert_eq!(textures["uOffset"].texture().get_pixel(1, 0).0, [9.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn unusable_declarations_are_dropped() {
        let uniforms = extract_valid_uniforms(&decls(json!({
            "uOk": {"type": "3f", "value": [0, 0, 1]},
            "uMatrix": {"type": "m4", "value": 1.0},
            "uShort": {"type": "3f", "value": [0, 1]},
            "_uSampler": {"type": "1f"},
            "uResolution": {"type": "2f"},
            "textTexture": {"type": "1f"},
            "gl_Foo": {"type": "1f"},
            "float": {"type": "1f"}
        })));
        let names: Vec<&str> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["uOk"]);
    }

    #[test]
    fn set_checks_type_and_range_and_bumps_version() {
        let uniforms = vec![UserUniform::new("uTime", UniformValue::Float(0.0))];
        let mut textures = build_user_uniform_textures(&uniforms, 2);
        let t = textures.get_mut("uTime").unwrap();
        assert_eq!(t.version(), 0);

        t.set(1, UniformValue::Float(2.5)).unwrap();
        assert_eq!(t.get(1), Some(UniformValue::Float(2.5)));
        assert_eq!(t.version(), 1);

        assert!(t.set(2, UniformValue::Float(1.0)).is_err());
        assert!(t.set(0, UniformValue::Vec2([1.0, 1.0])).is_err());
        assert_eq!(t.version(), 1);

        t.set_all(UniformValue::Float(7.0)).unwrap();
        assert_eq!(t.get(0), Some(UniformValue::Float(7.0)));
        assert_eq!(t.bytes().len(), 2 * 16);
        assert_eq!(t.texture_name(), "_uTimeTexture");
    }

    #[test]
    fn zero_texts_still_allocate_one_texel() {
        let uniforms = vec![UserUniform::new("uTime", UniformValue::Float(1.0))];
        let textures = build_user_uniform_textures(&uniforms, 0);
        assert_eq!(textures["uTime"].texture().dimensions(), (1, 1));
        assert_eq!(textures["uTime"].get(0), None);
    }
}
