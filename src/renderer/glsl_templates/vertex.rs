/// Fixed vertex stage: passes position and texture coordinate through.
pub fn build_vertex_glsl() -> String {
    "\
#version 450\n\
\n\
layout(location = 0) in vec3 position;\n\
layout(location = 1) in vec2 uv;\n\
\n\
layout(location = 0) out vec2 _vTexCoord;\n\
\n\
void main() {\n\
    _vTexCoord = uv;\n\
    gl_Position = vec4(position, 1.0);\n\
}\n"
        .to_string()
}
