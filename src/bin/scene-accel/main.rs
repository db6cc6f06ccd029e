//! scene-accel CLI - build acceleration data for procedural scenes.

use anyhow::{bail, Context, Result};
use scene_accel::prelude::*;
use scene_accel::scene::demo;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_GRID: usize = 8;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = LevelFilter::INFO;
    let mut config_path: Option<String> = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = LevelFilter::DEBUG,
            "-vv" | "--trace" => level = LevelFilter::TRACE,
            "-q" | "--quiet" => level = LevelFilter::ERROR,
            "--config" => match iter.next() {
                Some(path) => config_path = Some(path.clone()),
                None => {
                    eprintln!("Error: --config needs a file argument");
                    std::process::exit(1);
                }
            },
            _ => filtered_args.push(arg),
        }
    }

    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "demo" | "d" => cmd_demo(&filtered_args[1..], config_path.as_deref()),
        "config" | "c" => match filtered_args.get(1) {
            Some(path) => cmd_config(path),
            None => {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: scene-accel config <options.json>");
                std::process::exit(1);
            }
        },
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides the flag-derived level.
fn init_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn load_options(config_path: Option<&str>) -> Result<BuildOptions> {
    match config_path {
        Some(path) => BuildOptions::load(path)
            .with_context(|| format!("loading build options from {}", path)),
        None => Ok(BuildOptions::default()),
    }
}

fn cmd_demo(args: &[&str], config_path: Option<&str>) -> Result<()> {
    let mut grid = DEFAULT_GRID;
    let mut out: Option<&str> = None;
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        match arg {
            "--grid" | "-g" => {
                let value = iter.next().context("--grid needs a number")?;
                grid = value
                    .parse()
                    .with_context(|| format!("invalid grid size '{}'", value))?;
            }
            "--out" | "-o" => {
                out = Some(*iter.next().context("--out needs a file argument")?);
            }
            other => bail!("unexpected demo argument '{}'", other),
        }
    }

    let options = load_options(config_path)?;
    let scene = demo::grid_scene(grid);
    tracing::info!(
        grid,
        meshes = scene.meshes().len(),
        instances = scene.instances().len(),
        "building demo scene"
    );

    let start = Instant::now();
    let build = scene.build(&options, &TracingDiagnostics)?;
    let elapsed = start.elapsed();

    let tlas_nodes = build.tlas.as_ref().map_or(0, |t| t.len());
    let tlas_depth = build.tlas.as_ref().map_or(0, |t| t.depth());
    let geo = &build.geometry;

    println!("Scene: {}x{} grid", grid, grid);
    println!("  Meshes:          {}", scene.meshes().len());
    println!("  Instances:       {}", scene.instances().len());
    println!("  Materials:       {}", scene.materials().len());
    println!("  Lights:          {}", scene.lights().len());
    println!("  TLAS nodes:      {} (depth {})", tlas_nodes, tlas_depth);
    println!("  Flat nodes:      {}", build.flat.nodes.len());
    match build.flat.top_level_index {
        Some(i) => println!("  Top-level index: {}", i),
        None => println!("  Top-level index: none"),
    }
    println!(
        "  Triangles:       {} (texture {}x{})",
        geo.triangle_layout.count, geo.triangle_layout.width, geo.triangle_layout.width
    );
    println!(
        "  Vertices:        {} (texture {}x{})",
        geo.vertex_layout.count, geo.vertex_layout.width, geo.vertex_layout.width
    );
    println!("  Scene bounds:    {:?}", build.scene_bounds);
    println!("  Build time:      {:.2?}", elapsed);

    if let Some(path) = out {
        let gpu = GpuSceneData::from_build(&build);
        write_dump(&gpu, Path::new(path))?;
        println!("Wrote {} ({} bytes)", path, gpu.dump_len());
    }
    Ok(())
}

fn write_dump(gpu: &GpuSceneData, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    gpu.write_to(BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn cmd_config(path: &str) -> Result<()> {
    let options =
        BuildOptions::load(path).with_context(|| format!("loading build options from {}", path))?;
    tracing::debug!(?options, "options valid");
    println!("{}", options.to_json()?);
    Ok(())
}

fn print_version() {
    println!(
        "scene-accel {} (built {})",
        env!("CARGO_PKG_VERSION"),
        scene_accel::BUILD_DATE
    );
}

fn print_help() {
    println!("scene-accel - two-level BVH builder for GPU path tracing");
    println!();
    println!("USAGE:");
    println!("    scene-accel [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    d, demo [--grid N] [--out <file>]   Build an NxN grid scene, print stats,");
    println!("                                        optionally dump GPU buffers");
    println!("    c, config <file.json>               Validate and print build options");
    println!("    version                             Show version");
    println!("    h, help                             Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose          Debug output");
    println!("    -vv, --trace           Trace output");
    println!("    -q, --quiet            Errors only");
    println!("    --config <file.json>   Build options for demo");
    println!();
    println!("Log filtering can be refined with RUST_LOG, e.g. RUST_LOG=scene_accel=debug");
}
