use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, Rgba32FImage};
use text_mapping_render::{
    dsl,
    renderer::{Mapping, MappingMaterial, MaterialBuilder},
};

#[derive(Debug, Default, Clone)]
struct Cli {
    scene: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scene" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --scene"));
                };
                cli.scene = Some(PathBuf::from(v));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output-dir"));
                };
                cli.output_dir = Some(PathBuf::from(v));
                i += 2;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --scene <scene.json>, --output-dir <dir>)"
                ));
            }
        }
    }
    Ok(cli)
}

fn save_data_texture(texture: &Rgba32FImage, path: &Path) -> Result<()> {
    DynamicImage::ImageRgba32F(texture.clone())
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn write_outputs(material: &MappingMaterial, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let atlas_path = output_dir.join("atlas.png");
    material
        .atlas()
        .save(&atlas_path)
        .with_context(|| format!("failed to write {}", atlas_path.display()))?;
    save_data_texture(material.indices_texture(), &output_dir.join("indices.exr"))?;
    save_data_texture(material.bounds_texture(), &output_dir.join("bounds.exr"))?;
    for uniform in material.user_uniforms() {
        save_data_texture(
            uniform.texture(),
            &output_dir.join(format!("{}.exr", uniform.name())),
        )?;
    }

    let shaders = material.shaders();
    write_text(&output_dir.join("material.vert"), &shaders.vertex)?;
    write_text(&output_dir.join("material.frag"), &shaders.fragment)?;
    let (_, fragment_wgsl) = shaders.to_wgsl()?;
    write_text(&output_dir.join("material.frag.wgsl"), &fragment_wgsl)?;

    let table = serde_json::to_string_pretty(material.uniform_table())
        .context("failed to serialize uniform table")?;
    write_text(&output_dir.join("uniforms.json"), &table)?;
    Ok(())
}

fn run(scene_path: &Path, output_dir: &Path) -> Result<()> {
    let start = Instant::now();
    let scene = dsl::load_scene_from_path(scene_path)?;
    let rasterizer = scene.rasterizer()?;
    let texts = scene.texts();

    let mapping = Arc::new(Mapping::build(texts, &rasterizer));
    log::info!(
        "mapped {} texts into a {}x{} atlas",
        mapping.len(),
        mapping.width(),
        mapping.height()
    );

    let material = MaterialBuilder::new(scene.build_options()).build(mapping, &scene.material)?;
    material.validate()?;
    write_outputs(&material, output_dir)?;

    log::info!(
        "wrote material to {} in {:?}",
        output_dir.display(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let scene_path = cli
        .scene
        .ok_or_else(|| anyhow!("--scene <scene.json> is required"))?;
    let output_dir = cli.output_dir.unwrap_or_else(|| {
        scene_path
            .parent()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    run(&scene_path, &output_dir)
}
