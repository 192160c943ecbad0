//! GLSL 450 templates for the mapping material.
//!
//! Everything is bound in descriptor set 0:
//!
//! | binding | name                   | kind                          |
//! |---------|------------------------|-------------------------------|
//! | 0       | `_uSampler`            | `texture2D` atlas             |
//! | 1       | `_uAtlasSampler`       | `sampler` for the atlas       |
//! | 2       | `_uTextIndicesTexture` | `texture2D` RGBA32F           |
//! | 3       | `_uTextBoundsTexture`  | `texture2D` RGBA32F           |
//! | 4       | `_uDataSampler`        | `sampler` (nearest) for data  |
//! | 5       | `_MappingParams`       | std140 block                  |
//! | 6 + k   | `_<name>Texture`       | `texture2D` per user uniform  |

pub mod fragment;
pub mod vertex;

pub use fragment::{FragmentTemplateSpec, build_fragment_glsl};
pub use vertex::build_vertex_glsl;

pub const TEX_COORD_VARYING: &str = "_vTexCoord";
pub const FRAG_COLOR_OUTPUT: &str = "_fragColor";
pub const ATLAS_TEXTURE: &str = "_uSampler";
pub const ATLAS_SAMPLER: &str = "_uAtlasSampler";
pub const INDICES_TEXTURE: &str = "_uTextIndicesTexture";
pub const BOUNDS_TEXTURE: &str = "_uTextBoundsTexture";
pub const DATA_SAMPLER: &str = "_uDataSampler";
pub const PARAMS_BLOCK: &str = "_MappingParams";
pub const CANVAS_RESOLUTION: &str = "_uCanvasResolution";
pub const TEXT_BOUNDS_GLOBAL: &str = "_textBounds";

pub const ATLAS_TEXTURE_BINDING: u32 = 0;
pub const ATLAS_SAMPLER_BINDING: u32 = 1;
pub const INDICES_TEXTURE_BINDING: u32 = 2;
pub const BOUNDS_TEXTURE_BINDING: u32 = 3;
pub const DATA_SAMPLER_BINDING: u32 = 4;
pub const PARAMS_BINDING: u32 = 5;
pub const FIRST_USER_UNIFORM_BINDING: u32 = 6;
