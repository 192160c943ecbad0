//! GLSL compilation checks using the naga library.
//!
//! The pipeline cannot tell whether user-supplied `mainImage` code is valid on
//! its own; these helpers run the generated sources through naga's GLSL
//! frontend and validator, which is what a wgpu backend would do on first use.

use anyhow::{Result, anyhow};

#[derive(Debug, Clone, Copy)]
pub enum GlslShaderStage {
    Vertex,
    Fragment,
}

fn parse_and_validate(
    source: &str,
    stage: GlslShaderStage,
) -> Result<(naga::Module, naga::valid::ModuleInfo)> {
    let shader_stage = match stage {
        GlslShaderStage::Vertex => naga::ShaderStage::Vertex,
        GlslShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut parser = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: shader_stage,
        defines: Default::default(),
    };

    let module = parser
        .parse(&options, source)
        .map_err(|e| anyhow!("GLSL parse failed: {e:?}\n{}", numbered_source(source)))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed: {e:?}\n{}", numbered_source(source)))?;

    Ok((module, info))
}

/// Parse and validate GLSL 450 source for `stage`.
pub fn validate_glsl(source: &str, stage: GlslShaderStage) -> Result<naga::Module> {
    parse_and_validate(source, stage).map(|(module, _)| module)
}

pub fn glsl_to_wgsl(source: &str, stage: GlslShaderStage) -> Result<String> {
    let (module, info) = parse_and_validate(source, stage)?;
    naga::back::wgsl::write_string(
        &module,
        &info,
        naga::back::wgsl::WriterFlags::EXPLICIT_TYPES,
    )
    .map_err(|e| anyhow!("WGSL writer failed: {e:?}"))
}

/// Source with line numbers, for error reports.
fn numbered_source(source: &str) -> String {
    let mut output = String::from("Generated GLSL:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fragment() {
        let source = r#"#version 450
layout(location = 0) out vec4 color;
void main() {
    color = vec4(1.0, 0.0, 0.0, 1.0);
}
"#;
        assert!(validate_glsl(source, GlslShaderStage::Fragment).is_ok());
    }

    #[test]
    fn test_invalid_syntax() {
        let source = "#version 450\nvoid main() { float x = ; }\n";
        let err = validate_glsl(source, GlslShaderStage::Fragment).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("GLSL parse failed"));
        assert!(msg.contains("   2 | void main()"));
    }

    #[test]
    fn test_numbered_source() {
        assert_eq!(
            numbered_source("a\nb"),
            "Generated GLSL:\n---\n   1 | a\n   2 | b\n---\n"
        );
    }
}
