//! Assembles a renderable material from a mapping and a user shader spec.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Result, anyhow};
use image::{Rgba32FImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{
    atlas::build_atlas,
    build_plan::{BuildStage, StageOutputs, run_stages},
    data_textures::{IndicesOptions, build_bounds_texture, build_indices_texture},
    glsl_templates as tpl,
    mapping::Mapping,
    shader::{synthesize, uniform_texture_name},
    types::{RenderState, ShaderBundle},
    uniforms::{
        UniformDataTexture, UniformDecl, UniformValue, UserUniform, build_user_uniform_textures,
        extract_valid_uniforms,
    },
};

/// User half of a material: declared uniforms and the `mainImage` source.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MaterialSpec {
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformDecl>,
    #[serde(rename = "mainImage")]
    pub main_image: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialBuildOptions {
    /// Output surface size in pixels; the atlas size when unset.
    pub output_size: Option<[u32; 2]>,
    pub sample_accuracy: f32,
}

impl Default for MaterialBuildOptions {
    fn default() -> Self {
        Self {
            output_size: None,
            sample_accuracy: 1.0,
        }
    }
}

/// Texture a sampled uniform is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Atlas,
    TextIndices,
    TextBounds,
    UserUniform(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerFilter {
    Linear,
    Nearest,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformEntryValue {
    Texture(TextureSlot),
    Sampler(SamplerFilter),
    Floats(Vec<f32>),
    /// Default of a per-text uniform; the live values are in its data texture.
    Default(UniformValue),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UniformEntry {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: UniformEntryValue,
}

impl UniformEntry {
    fn texture(slot: TextureSlot) -> Self {
        Self {
            ty: "t".to_string(),
            value: UniformEntryValue::Texture(slot),
        }
    }

    fn sampler(filter: SamplerFilter) -> Self {
        Self {
            ty: "sampler".to_string(),
            value: UniformEntryValue::Sampler(filter),
        }
    }
}

enum StageOutput {
    Atlas(RgbaImage),
    Data(Rgba32FImage),
    Uniforms(BTreeMap<String, UniformDataTexture>),
}

const ATLAS_STAGE: &str = "atlas";
const INDICES_STAGE: &str = "indices";
const BOUNDS_STAGE: &str = "bounds";
const USER_UNIFORMS_STAGE: &str = "user_uniforms";

fn take_stage(outputs: &mut StageOutputs<StageOutput>, name: &str) -> Result<StageOutput> {
    outputs
        .take(name)
        .ok_or_else(|| anyhow!("build stage {name} produced no output"))
}

#[derive(Clone, Debug, Default)]
pub struct MaterialBuilder {
    options: MaterialBuildOptions,
}

impl MaterialBuilder {
    pub fn new(options: MaterialBuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MaterialBuildOptions {
        self.options
    }

    /// Build every texture concurrently, then synthesize the shaders.
    ///
    /// Unusable uniform declarations are dropped with a warning. A `mainImage`
    /// that declares a reserved name is an error.
    pub fn build(&self, mapping: Arc<Mapping>, spec: &MaterialSpec) -> Result<MappingMaterial> {
        let output_size = self.options.output_size.unwrap_or_else(|| mapping.size());
        let indices_options = IndicesOptions {
            output_size,
            sample_accuracy: self.options.sample_accuracy,
        };
        let uniforms = extract_valid_uniforms(&spec.uniforms);
        let text_count = mapping.len();

        let m: &Mapping = &mapping;
        let declared = &uniforms;
        let stages = vec![
            BuildStage::new(ATLAS_STAGE, move |_| Ok(StageOutput::Atlas(build_atlas(m)))),
            BuildStage::new(INDICES_STAGE, move |_| {
                Ok(StageOutput::Data(build_indices_texture(m, indices_options)))
            }),
            BuildStage::new(BOUNDS_STAGE, move |_| {
                Ok(StageOutput::Data(build_bounds_texture(m, output_size)))
            }),
            BuildStage::new(USER_UNIFORMS_STAGE, move |_| {
                Ok(StageOutput::Uniforms(build_user_uniform_textures(
                    declared, text_count,
                )))
            }),
        ];
        let mut outputs = run_stages(stages)?;

        let StageOutput::Atlas(atlas) = take_stage(&mut outputs, ATLAS_STAGE)? else {
            return Err(anyhow!("atlas stage returned the wrong output"));
        };
        let StageOutput::Data(indices) = take_stage(&mut outputs, INDICES_STAGE)? else {
            return Err(anyhow!("indices stage returned the wrong output"));
        };
        let StageOutput::Data(bounds) = take_stage(&mut outputs, BOUNDS_STAGE)? else {
            return Err(anyhow!("bounds stage returned the wrong output"));
        };
        let StageOutput::Uniforms(user_uniforms) = take_stage(&mut outputs, USER_UNIFORMS_STAGE)?
        else {
            return Err(anyhow!("user uniform stage returned the wrong output"));
        };

        let shaders = synthesize(&uniforms, &spec.main_image)?;
        let uniform_table = uniform_table(&uniforms, output_size);

        Ok(MappingMaterial {
            mapping,
            output_size,
            shaders,
            uniform_table,
            atlas,
            indices,
            bounds,
            user_uniforms,
            render_state: RenderState::default(),
        })
    }
}

fn uniform_table(uniforms: &[UserUniform], output_size: [u32; 2]) -> BTreeMap<String, UniformEntry> {
    let mut table = BTreeMap::new();
    table.insert(
        tpl::ATLAS_TEXTURE.to_string(),
        UniformEntry::texture(TextureSlot::Atlas),
    );
    table.insert(
        tpl::ATLAS_SAMPLER.to_string(),
        UniformEntry::sampler(SamplerFilter::Linear),
    );
    table.insert(
        tpl::INDICES_TEXTURE.to_string(),
        UniformEntry::texture(TextureSlot::TextIndices),
    );
    table.insert(
        tpl::BOUNDS_TEXTURE.to_string(),
        UniformEntry::texture(TextureSlot::TextBounds),
    );
    // Lookup textures hold exact values; they must not be filtered.
    table.insert(
        tpl::DATA_SAMPLER.to_string(),
        UniformEntry::sampler(SamplerFilter::Nearest),
    );
    table.insert(
        tpl::CANVAS_RESOLUTION.to_string(),
        UniformEntry {
            ty: "2f".to_string(),
            value: UniformEntryValue::Floats(vec![output_size[0] as f32, output_size[1] as f32]),
        },
    );

    for u in uniforms {
        table.insert(
            uniform_texture_name(&u.name),
            UniformEntry::texture(TextureSlot::UserUniform(u.name.clone())),
        );
        table.insert(
            u.name.clone(),
            UniformEntry {
                ty: u.ty.wire_name().to_string(),
                value: UniformEntryValue::Default(u.value),
            },
        );
    }
    table
}

/// Everything needed to draw a mapping: shaders, textures and uniform table.
#[derive(Clone, Debug)]
pub struct MappingMaterial {
    mapping: Arc<Mapping>,
    output_size: [u32; 2],
    shaders: ShaderBundle,
    uniform_table: BTreeMap<String, UniformEntry>,
    atlas: RgbaImage,
    indices: Rgba32FImage,
    bounds: Rgba32FImage,
    user_uniforms: BTreeMap<String, UniformDataTexture>,
    render_state: RenderState,
}

impl MappingMaterial {
    pub fn shaders(&self) -> &ShaderBundle {
        &self.shaders
    }

    pub fn uniform_table(&self) -> &BTreeMap<String, UniformEntry> {
        &self.uniform_table
    }

    pub fn atlas(&self) -> &RgbaImage {
        &self.atlas
    }

    pub fn indices_texture(&self) -> &Rgba32FImage {
        &self.indices
    }

    pub fn bounds_texture(&self) -> &Rgba32FImage {
        &self.bounds
    }

    pub fn user_uniform(&self, name: &str) -> Option<&UniformDataTexture> {
        self.user_uniforms.get(name)
    }

    /// Per-text values can be changed between frames without a rebuild.
    pub fn user_uniform_mut(&mut self, name: &str) -> Option<&mut UniformDataTexture> {
        self.user_uniforms.get_mut(name)
    }

    pub fn user_uniforms(&self) -> impl Iterator<Item = &UniformDataTexture> {
        self.user_uniforms.values()
    }

    pub fn render_state(&self) -> RenderState {
        self.render_state
    }

    pub fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    pub fn text_count(&self) -> usize {
        self.mapping.len()
    }

    pub fn output_size(&self) -> [u32; 2] {
        self.output_size
    }

    /// Compile the generated shaders; see [`ShaderBundle::validate`].
    pub fn validate(&self) -> Result<()> {
        self.shaders.validate()
    }
}
