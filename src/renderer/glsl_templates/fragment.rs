/// Insertion points of the fragment template, filled by the synthesizer.
#[derive(Clone, Debug, Default)]
pub struct FragmentTemplateSpec {
    /// One `texture2D` binding per user uniform.
    pub private_uniform_textures: String,
    /// One plain global per user uniform, visible to `mainImage`.
    pub public_uniform_declarations: String,
    /// Statements in `main()` assigning each public uniform from its texture.
    pub uniform_definitions: String,
    /// User code defining `mainImage`.
    pub main_image: String,
}

pub fn build_fragment_glsl(spec: &FragmentTemplateSpec) -> String {
    format!(
        "\
#version 450\n\
\n\
layout(location = 0) in vec2 _vTexCoord;\n\
layout(location = 0) out vec4 _fragColor;\n\
\n\
layout(set = 0, binding = 0) uniform texture2D _uSampler;\n\
layout(set = 0, binding = 1) uniform sampler _uAtlasSampler;\n\
layout(set = 0, binding = 2) uniform texture2D _uTextIndicesTexture;\n\
layout(set = 0, binding = 3) uniform texture2D _uTextBoundsTexture;\n\
layout(set = 0, binding = 4) uniform sampler _uDataSampler;\n\
layout(std140, set = 0, binding = 5) uniform _MappingParams {{\n\
    vec2 _uCanvasResolution;\n\
}};\n\
{private_uniform_textures}\
\n\
vec4 _textBounds;\n\
\n\
vec2 uResolution;\n\
{public_uniform_declarations}\
\n\
// Sample the current text at `coord` in [0, 1] of its bounds; transparent outside.\n\
vec4 textTexture(vec2 coord) {{\n\
    vec2 adjustedFragCoord = _textBounds.xy + _textBounds.zw * coord;\n\
    vec2 uv = adjustedFragCoord / _uCanvasResolution;\n\
    vec4 texel = textureLod(sampler2D(_uSampler, _uAtlasSampler), uv, 0.0);\n\
    vec2 inside = step(_textBounds.xy, adjustedFragCoord)\n\
        * step(adjustedFragCoord, _textBounds.xy + _textBounds.zw);\n\
    return texel * (inside.x * inside.y);\n\
}}\n\
\n\
void combineColors(out vec4 adjustedColor, in vec4 bg, in vec4 color) {{\n\
    float a = color.a;\n\
\n\
    float r = (1.0 - a) * bg.r + a * color.r;\n\
    float g = (1.0 - a) * bg.g + a * color.g;\n\
    float b = (1.0 - a) * bg.b + a * color.b;\n\
\n\
    adjustedColor = vec4(r, g, b, 1.0);\n\
}}\n\
\n\
void rgbaFromRgb(out vec4 rgba, in vec3 rgb) {{\n\
    float a = 1.0 - min(rgb.r, min(rgb.g, rgb.b));\n\
\n\
    float r = 1.0 - (1.0 - rgb.r) / a;\n\
    float g = 1.0 - (1.0 - rgb.g) / a;\n\
    float b = 1.0 - (1.0 - rgb.b) / a;\n\
\n\
    rgba = vec4(r, g, b, a);\n\
}}\n\
\n\
void mainImage(out vec4 fragColor, in vec2 fragCoord);\n\
\n\
{main_image}\n\
\n\
void main() {{\n\
    vec4 textIndexData = textureLod(sampler2D(_uTextIndicesTexture, _uDataSampler), _vTexCoord, 0.0);\n\
    float textIndex = textIndexData.r;\n\
    float textAlpha = textIndexData.a;\n\
\n\
    _textBounds = textureLod(sampler2D(_uTextBoundsTexture, _uDataSampler), vec2(textIndex, 0.5), 0.0);\n\
\n\
    uResolution = _textBounds.zw;\n\
{uniform_definitions}\
\n\
    vec2 fragCoord = gl_FragCoord.xy - _textBounds.xy;\n\
    vec4 outColor = vec4(0.0);\n\
    mainImage(outColor, fragCoord);\n\
\n\
    // Zero outside every text, whatever mainImage returned.\n\
    outColor.a = outColor.a * textAlpha;\n\
    _fragColor = outColor;\n\
}}\n",
        private_uniform_textures = spec.private_uniform_textures,
        public_uniform_declarations = spec.public_uniform_declarations,
        uniform_definitions = spec.uniform_definitions,
        main_image = spec.main_image.trim_end(),
    )
}
