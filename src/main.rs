//! noisebake CLI - GPU procedural noise baker.
//!
//! Bake Perlin, Simplex and Voronoi noise into PNG images or texture
//! assets using WGSL compute kernels.

use clap::{Parser, Subcommand};
use image::codecs::png::{CompressionType, FilterType};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use noisebake::config::GeneratorConfig;
use noisebake::export::{expected_file_size, parse_header, AssetWriter, FsAssetStore, PngExportOptions};
use noisebake::gpu::{GpuContext, WgpuBackend};
use noisebake::noise::{NoiseVariant, ParameterRandomizer, VariantClasses};
use noisebake::pipeline::{plan_dispatch, GenerationRequest, NoiseGenerator, RequestState};

/// GPU procedural noise baker.
#[derive(Parser)]
#[command(name = "noisebake")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake one noise texture on the GPU.
    Generate {
        /// Generator configuration (JSON).
        #[arg(short, long)]
        config: PathBuf,

        /// Directory output paths are relative to.
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Noise variant, e.g. PERLIN_2D or voronoi-3d-cells.
        #[arg(short, long)]
        variant: Option<NoiseVariant>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Volume depth (3D variants only).
        #[arg(long)]
        depth: Option<u32>,

        /// Seed string for the offset randomizer.
        #[arg(short, long)]
        seed: Option<String>,

        /// Output path without extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Encode 2D output as PNG.
        #[arg(long)]
        png: bool,

        /// Favor PNG encoding speed over file size.
        #[arg(long)]
        fast_png: bool,

        /// Perlin/Simplex frequency.
        #[arg(long)]
        scale: Option<f32>,

        /// Voronoi cells per unit.
        #[arg(long)]
        cell_density: Option<f32>,

        /// Voronoi feature-point rotation.
        #[arg(long)]
        angle_offset: Option<f32>,
    },

    /// Show the dispatch a request would produce, without a GPU.
    Plan {
        #[arg(short, long)]
        variant: NoiseVariant,

        #[arg(long, default_value = "256")]
        width: u32,

        #[arg(long, default_value = "256")]
        height: u32,

        #[arg(long, default_value = "1")]
        depth: u32,

        #[arg(short, long, default_value = "")]
        seed: String,
    },

    /// Print the header of a texture asset.
    Inspect {
        path: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            config,
            root,
            variant,
            width,
            height,
            depth,
            seed,
            output,
            png,
            fast_png,
            scale,
            cell_density,
            angle_offset,
        } => load_request(&config).and_then(|(loaded, mut request)| {
            if let Some(v) = variant {
                request.variant = v;
            }
            if let Some(w) = width {
                request.width = w;
            }
            if let Some(h) = height {
                request.height = h;
            }
            if let Some(d) = depth {
                request.depth = d;
            }
            if let Some(s) = seed {
                request.seed = s;
            }
            if let Some(o) = output {
                request.output_path = o;
            }
            if png {
                request.encode_as_image = true;
            }
            if let Some(s) = scale {
                request.scale = s;
            }
            if let Some(c) = cell_density {
                request.cell_density = c;
            }
            if let Some(a) = angle_offset {
                request.angle_offset = a;
            }
            run_generate(&config, &loaded, &root, &request, fast_png)
        }),
        Commands::Plan {
            variant,
            width,
            height,
            depth,
            seed,
        } => run_plan(variant, width, height, depth, &seed),
        Commands::Inspect { path } => run_inspect(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_request(path: &Path) -> Result<(GeneratorConfig, GenerationRequest), Box<dyn Error>> {
    let config = GeneratorConfig::load(path)?;
    let request = config.output.clone();
    Ok((config, request))
}

fn run_generate(
    config_path: &Path,
    config: &GeneratorConfig,
    root: &Path,
    request: &GenerationRequest,
    fast_png: bool,
) -> Result<(), Box<dyn Error>> {
    println!("noisebake - GPU Noise Baker");
    println!("===========================");
    println!("Variant: {}", request.variant);
    println!("Size: {}x{}x{}", request.width, request.height, request.depth);
    println!("Seed: {:?}", request.seed);
    println!("Output: {}", root.join(&request.output_path).display());

    let start = Instant::now();

    println!("\nInitializing GPU...");
    let backend = Arc::new(WgpuBackend::new(GpuContext::new_blocking()?));

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let registry = config.build_registry(base_dir, |label, source, entry_point| {
        backend.compile_kernel(label, source, entry_point)
    })?;
    println!("Compiled {} generator(s)", registry.len());

    let mut writer = AssetWriter::new(Arc::new(FsAssetStore::new(root)));
    if fast_png {
        writer = writer.with_png_options(PngExportOptions {
            compression: CompressionType::Fast,
            filter: FilterType::NoFilter,
        });
    }
    let generator = NoiseGenerator::with_writer(Arc::clone(&backend), registry, writer);

    let pending = generator.generate(request)?;
    println!("Dispatched, waiting for readback...");
    generator.wait_idle()?;

    let elapsed = start.elapsed();
    match pending.state() {
        RequestState::ImageWritten => {
            println!("\nPNG written: {}.png", root.join(pending.output_path()).display());
        }
        RequestState::AssetPersisted => {
            println!("\nAsset written: {}.asset", root.join(pending.output_path()).display());
            if let Some(texture) = generator.output_texture() {
                println!(
                    "  {}x{}x{} {:?}, readable: {}",
                    texture.width(),
                    texture.height(),
                    texture.depth(),
                    texture.dimension(),
                    texture.is_readable()
                );
            }
        }
        other => return Err(format!("generation ended in state {}", other.name()).into()),
    }
    println!("Total time: {:.2?}", elapsed);
    Ok(())
}

fn run_plan(variant: NoiseVariant, width: u32, height: u32, depth: u32, seed: &str) -> Result<(), Box<dyn Error>> {
    let plan = plan_dispatch(&VariantClasses::default(), variant, width, height, depth)?;
    let d = &plan.descriptor;
    let offset = ParameterRandomizer::new(seed).offset_vector();

    println!("Dispatch plan for {}", variant);
    println!("==============================");
    println!("Dimension: {:?}", d.dimension);
    println!("Extent: {}x{}x{}", d.width, d.height, d.depth);
    println!("Format: {:?}", d.format);
    println!(
        "Workgroups: {}x{}x{}",
        plan.workgroups.x, plan.workgroups.y, plan.workgroups.z
    );
    println!(
        "Host buffer: {} bytes ({:.2} MB)",
        d.byte_len(),
        d.byte_len() as f64 / (1024.0 * 1024.0)
    );
    println!(
        "Offset: ({:.3}, {:.3}, {:.3}, {:.3})",
        offset.x, offset.y, offset.z, offset.w
    );
    Ok(())
}

fn run_inspect(path: &Path) -> Result<(), Box<dyn Error>> {
    let bytes = std::fs::read(path)?;
    let d = parse_header(&bytes)?;
    let expected = expected_file_size(&d);

    println!("Texture asset: {}", path.display());
    println!("  Dimension: {:?}", d.dimension);
    println!("  Extent: {}x{}x{}", d.width, d.height, d.depth);
    println!("  Format: {:?}", d.format);
    println!("  File size: {} bytes (expected {})", bytes.len(), expected);
    if bytes.len() as u64 != expected {
        return Err("asset payload does not match its header".into());
    }
    Ok(())
}
