use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use lux_renderer::{render, save_ppm, RenderConfig, World, DEFAULT_LEAF_SIZE, DEFAULT_MAX_DEPTH};

/// Render a scene description to a PPM image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene description file
    scene: PathBuf,

    /// Output image (defaults to the scene path with a .ppm extension)
    output: Option<PathBuf>,

    /// Worker threads (defaults to available parallelism)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Maximum primitives per BVH leaf
    #[arg(short, long, default_value_t = DEFAULT_LEAF_SIZE)]
    leaf_size: usize,

    /// Maximum reflection/refraction depth
    #[arg(short, long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,
}

/// Image path for `scene`: the explicit output, or the scene path with a
/// `.ppm` extension. Never the scene file itself.
fn output_path(scene: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let path = output.map_or_else(|| scene.with_extension("ppm"), Path::to_path_buf);
    if path.as_path() == scene {
        bail!(
            "Output {} would overwrite the scene file; pass an output path",
            path.display()
        );
    }
    Ok(path)
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let output = output_path(&args.scene, args.output.as_deref())?;
    let config = RenderConfig {
        threads: args.threads,
        max_depth: args.max_depth,
        max_leaf_size: args.leaf_size,
    };

    let start = Instant::now();
    let scene = lux_core::load_scene(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    let frustum = scene.camera.frustum().context("Invalid camera")?;

    let world = World::build(scene, config.max_leaf_size).context("Failed to prepare scene")?;
    log::info!("Scene ready in {:.2?}", start.elapsed());

    let image = render(&world, &frustum, &config).context("Render failed")?;
    save_ppm(&image, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!("Done in {:.2?}", start.elapsed());
    Ok(())
}
