//! Fragment/vertex source synthesis for the mapping material.

use anyhow::{Context, Result, bail};

use super::{
    glsl_templates::{self as tpl, FragmentTemplateSpec, build_fragment_glsl, build_vertex_glsl},
    types::ShaderBundle,
    uniforms::UserUniform,
    utils::{declared_identifiers, indent_glsl_body},
    validation::{GlslShaderStage, glsl_to_wgsl, validate_glsl},
};

/// Globals and functions the template defines; user code must not declare them.
const RESERVED_GLOBALS: &[&str] = &[
    tpl::TEX_COORD_VARYING,
    tpl::FRAG_COLOR_OUTPUT,
    tpl::ATLAS_TEXTURE,
    tpl::ATLAS_SAMPLER,
    tpl::INDICES_TEXTURE,
    tpl::BOUNDS_TEXTURE,
    tpl::DATA_SAMPLER,
    tpl::PARAMS_BLOCK,
    tpl::CANVAS_RESOLUTION,
    tpl::TEXT_BOUNDS_GLOBAL,
    "uResolution",
    "textTexture",
    "combineColors",
    "rgbaFromRgb",
    "main",
];

/// Locals of the generated `main()`. A uniform with one of these names would be
/// assigned to the local instead of the global.
const MAIN_LOCALS: &[&str] = &[
    "textIndexData",
    "textIndex",
    "textAlpha",
    "fragCoord",
    "outColor",
];

pub const MAIN_IMAGE_FN: &str = "mainImage";

/// True when `name` cannot be used for a user uniform.
pub fn is_reserved_identifier(name: &str) -> bool {
    name == MAIN_IMAGE_FN || RESERVED_GLOBALS.contains(&name) || MAIN_LOCALS.contains(&name)
}

/// Private sampler name carrying the per-text values of uniform `name`.
pub fn uniform_texture_name(name: &str) -> String {
    format!("_{name}Texture")
}

/// Reject user code that declares a name the template owns.
pub fn check_main_image_hygiene(main_image: &str, uniforms: &[UserUniform]) -> Result<()> {
    let uniform_textures: Vec<String> = uniforms
        .iter()
        .map(|u| uniform_texture_name(&u.name))
        .collect();

    let mut clashes: Vec<String> = Vec::new();
    for name in declared_identifiers(main_image) {
        let reserved = RESERVED_GLOBALS.contains(&name.as_str())
            || uniform_textures.contains(&name)
            || uniforms.iter().any(|u| u.name == name);
        if reserved && !clashes.contains(&name) {
            clashes.push(name);
        }
    }

    if !clashes.is_empty() {
        bail!(
            "mainImage source declares reserved identifier(s): {}",
            clashes.join(", ")
        );
    }
    Ok(())
}

fn fragment_spec(uniforms: &[UserUniform], main_image: &str) -> FragmentTemplateSpec {
    let mut spec = FragmentTemplateSpec {
        main_image: indent_glsl_body(main_image, 0),
        ..FragmentTemplateSpec::default()
    };

    for (k, u) in uniforms.iter().enumerate() {
        let binding = tpl::FIRST_USER_UNIFORM_BINDING + k as u32;
        let texture = uniform_texture_name(&u.name);
        spec.private_uniform_textures.push_str(&format!(
            "layout(set = 0, binding = {binding}) uniform texture2D {texture};\n"
        ));
        spec.public_uniform_declarations
            .push_str(&format!("{} {};\n", u.ty.glsl(), u.name));
        spec.uniform_definitions.push_str(&format!(
            "    {name} = textureLod(sampler2D({texture}, {sampler}), vec2(textIndex, 0.5), 0.0).{swizzle};\n",
            name = u.name,
            sampler = tpl::DATA_SAMPLER,
            swizzle = u.ty.swizzle(),
        ));
    }

    spec
}

/// Generate both stages for the given (already validated) uniforms and user code.
///
/// Whether `main_image` actually defines `mainImage` is only known once the
/// source is compiled; see [`ShaderBundle::validate`].
pub fn synthesize(uniforms: &[UserUniform], main_image: &str) -> Result<ShaderBundle> {
    check_main_image_hygiene(main_image, uniforms)?;
    Ok(ShaderBundle {
        vertex: build_vertex_glsl(),
        fragment: build_fragment_glsl(&fragment_spec(uniforms, main_image)),
    })
}

impl ShaderBundle {
    /// Compile both stages with naga; errors are returned as reported.
    pub fn validate(&self) -> Result<()> {
        validate_glsl(&self.vertex, GlslShaderStage::Vertex)
            .context("vertex stage failed to compile")?;
        validate_glsl(&self.fragment, GlslShaderStage::Fragment)
            .context("fragment stage failed to compile")?;
        Ok(())
    }

    /// Cross-compile both stages to WGSL as `(vertex, fragment)`.
    pub fn to_wgsl(&self) -> Result<(String, String)> {
        let vertex = glsl_to_wgsl(&self.vertex, GlslShaderStage::Vertex)
            .context("vertex stage failed to compile")?;
        let fragment = glsl_to_wgsl(&self.fragment, GlslShaderStage::Fragment)
            .context("fragment stage failed to compile")?;
        Ok((vertex, fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::uniforms::UniformValue;

    const MAIN_IMAGE: &str = "\
void mainImage(out vec4 mainImage, in vec2 fragCoord) {
    mainImage = textTexture(fragCoord / uResolution);
}";

    fn speed() -> UserUniform {
        UserUniform::new("uSpeed", UniformValue::Float(0.5))
    }

    fn position_of(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in:\n{haystack}"))
    }

    #[test]
    fn fragment_sections_are_in_order() {
        let bundle = synthesize(&[speed()], MAIN_IMAGE).unwrap();
        let f = &bundle.fragment;
        let order = [
            "uniform texture2D _uSampler;",
            "uniform texture2D _uSpeedTexture;",
            "float uSpeed;",
            "vec4 textTexture(vec2 coord)",
            "void combineColors(",
            "void rgbaFromRgb(",
            "void mainImage(out vec4 fragColor, in vec2 fragCoord);",
            "mainImage = textTexture(fragCoord / uResolution);",
            "void main()",
            "uSpeed = textureLod(sampler2D(_uSpeedTexture, _uDataSampler), vec2(textIndex, 0.5), 0.0).x;",
            "outColor.a = outColor.a * textAlpha;",
        ];
        let positions: Vec<usize> = order.iter().map(|s| position_of(f, s)).collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "sections out of order: {positions:?}"
        );
    }

    #[test]
    fn user_uniform_bindings_follow_fixed_ones() {
        let uniforms = [
            UserUniform::new("uA", UniformValue::Vec2([0.0, 0.0])),
            UserUniform::new("uB", UniformValue::Vec4([0.0; 4])),
        ];
        let bundle = synthesize(&uniforms, MAIN_IMAGE).unwrap();
        assert!(bundle
            .fragment
            .contains("layout(set = 0, binding = 6) uniform texture2D _uATexture;"));
        assert!(bundle
            .fragment
            .contains("layout(set = 0, binding = 7) uniform texture2D _uBTexture;"));
        assert!(bundle.fragment.contains("vec2 uA;"));
        assert!(bundle.fragment.contains(").xyzw;"));
    }

    #[test]
    fn vertex_stage_passes_through() {
        let bundle = synthesize(&[], MAIN_IMAGE).unwrap();
        assert!(bundle.vertex.contains("_vTexCoord = uv;"));
        assert!(bundle.vertex.contains("gl_Position = vec4(position, 1.0);"));
    }

    #[test]
    fn shadowing_reserved_names_is_rejected() {
        let bad = "\
vec4 textTexture(vec2 c) { return vec4(1.0); }
void mainImage(out vec4 o, in vec2 p) { o = textTexture(p); }";
        let err = synthesize(&[], bad).unwrap_err();
        assert!(format!("{err:#}").contains("textTexture"));

        let bad_uniform_texture = "\
float _uSpeedTexture;
void mainImage(out vec4 o, in vec2 p) { o = vec4(uSpeed); }";
        assert!(synthesize(&[speed()], bad_uniform_texture).is_err());
    }

    #[test]
    fn locals_named_like_main_locals_are_fine() {
        let src = "\
void mainImage(out vec4 o, in vec2 fragCoord) {
    float textIndex = 1.0;
    o = vec4(textIndex);
}";
        assert!(synthesize(&[], src).is_ok());
    }

    #[test]
    fn reserved_names_cover_uniform_hazards() {
        for name in ["uResolution", "textIndex", "mainImage", "main", "_uSampler"] {
            assert!(is_reserved_identifier(name), "{name}");
        }
        assert!(!is_reserved_identifier("uSpeed"));
    }
}
