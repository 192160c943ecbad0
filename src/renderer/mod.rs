//! Text-mapping renderer: packs rasterized texts into an atlas and builds the
//! lookup textures and shaders that draw them.
//!
//! This module is organized into several submodules:
//! - `types`: Core type definitions (PixelRect, Bounds, ShaderBundle, RenderState)
//! - `packer`: Growing-bin rectangle packer
//! - `rasterizer`: Text rasterization (fontdue)
//! - `mapping`: Texts, their indices and atlas placements
//! - `atlas`: Atlas texture composition
//! - `data_textures`: Indices and bounds lookup textures
//! - `uniforms`: Per-text user uniforms and their data textures
//! - `glsl_templates` / `shader`: GLSL synthesis with reserved-name hygiene
//! - `validation`: GLSL validation and WGSL cross-compilation using naga
//! - `build_plan`: Dependency-ordered concurrent build stages
//! - `material` / `material_slot`: Material assembly and latest-wins rebuilds
//!
//! The main entry points are:
//! - `Mapping::build`: Rasterize and pack a text sequence
//! - `MaterialBuilder::build`: Build every texture and the shaders for a mapping

pub mod atlas;
pub mod build_plan;
pub mod data_textures;
pub mod glsl_templates;
pub mod mapping;
pub mod material;
pub mod material_slot;
pub mod packer;
pub mod rasterizer;
pub mod shader;
pub mod types;
pub mod uniforms;
pub mod utils;
pub mod validation;

pub use atlas::build_atlas;
pub use data_textures::{
    IndicesOptions, build_bounds_texture, build_indices_texture, decode_text_index,
    encode_text_index, paint_indices, read_indices_texel,
};
pub use mapping::{Mapping, TextEntry};
pub use material::{MappingMaterial, MaterialBuildOptions, MaterialBuilder, MaterialSpec};
pub use material_slot::MaterialSlot;
pub use packer::{GrowingPacker, PackResult, PackSize, pack};
pub use rasterizer::{FontdueRasterizer, RasterizedText, TextRasterizer};
pub use shader::synthesize;
pub use types::{Bounds, PixelRect, RenderState, ShaderBundle};
pub use uniforms::{UniformDataTexture, UniformType, UniformValue, UserUniform};
pub use validation::{GlslShaderStage, glsl_to_wgsl, validate_glsl};
