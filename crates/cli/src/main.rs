//! GPU architecture simulator CLI.
//!
//! This binary provides a single entry point for the simulation demos. It
//! performs:
//! 1. **Demo:** Render textured geometry for N frames and print the
//!    performance report.
//! 2. **Stress:** Replay sequential, mip-walk, and random texture access
//!    patterns against the texture cache and print its metrics.

use clap::{Parser, Subcommand};
use std::{fs, process};

use gpu_core::config::Config;
use gpu_core::pipeline::{Texture, Vertex};
use gpu_core::GpuSystem;

#[derive(Parser, Debug)]
#[command(
    name = "gpusim",
    author,
    version,
    about = "GPU architecture simulator",
    long_about = "Cycle/latency-accounting simulator for a small GPU-like system: \
shader cores, an L1/L2/VRAM memory hierarchy, an adaptive texture cache with \
prefetching, and a fixed-function graphics pipeline.\n\nConfiguration is JSON \
(all fields optional); the CLI uses built-in defaults when no file is given.\n\n\
Examples:\n  gpusim demo --frames 10\n  gpusim stress\n  gpusim -c config.json demo"
)]
struct Cli {
    /// JSON configuration file (defaults apply to omitted fields).
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render textured demo geometry and print the performance report.
    Demo {
        /// Number of frames to render.
        #[arg(short, long, default_value_t = 10)]
        frames: u32,
    },

    /// Replay texture access patterns and print the cache metrics.
    Stress,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Demo { frames } => cmd_demo(&config, frames),
        Commands::Stress => cmd_stress(&config),
    }
}

/// Loads the configuration file, or the defaults when none is given.
///
/// Exits the process on an unreadable or malformed file.
fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };

    let contents = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {}: {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        eprintln!("Error parsing config {}: {}", path, e);
        process::exit(1);
    })
}

/// A two-triangle quad with full texture coverage.
fn demo_quad() -> Vec<Vertex> {
    let vertex = |x: f32, y: f32, u: f32, v: f32| Vertex {
        position: [x, y, 0.0, 1.0],
        color: [1.0, 1.0, 1.0, 1.0],
        texcoord: [u, v],
        normal: [0.0, 0.0, 1.0],
    };

    vec![
        vertex(-0.8, -0.8, 0.0, 0.0),
        vertex(0.8, -0.8, 1.0, 0.0),
        vertex(0.8, 0.8, 1.0, 1.0),
        vertex(-0.8, -0.8, 0.0, 0.0),
        vertex(0.8, 0.8, 1.0, 1.0),
        vertex(-0.8, 0.8, 0.0, 1.0),
    ]
}

/// A 256x256 RGBA checkerboard texture.
fn demo_texture(id: u64) -> Texture {
    let (width, height) = (256u32, 256u32);
    let mut data = vec![0u8; (width * height * 4) as usize];

    for y in 0..height {
        for x in 0..width {
            let index = ((y * width + x) * 4) as usize;
            let checker = ((x / 32) + (y / 32)) % 2 == 0;
            let shade = if checker { 255 } else { 64 };
            data[index] = shade;
            data[index + 1] = shade;
            data[index + 2] = shade;
            data[index + 3] = 255;
        }
    }

    Texture {
        id,
        width,
        height,
        format: 0,
        data,
        mip_levels: 1,
    }
}

/// Renders `frames` frames of the demo quad and prints the full report.
fn cmd_demo(config: &Config, frames: u32) {
    let mut gpu = GpuSystem::new(config);

    println!(
        "[*] Demo: {} frames at {}x{}, {} shader cores",
        frames,
        config.pipeline.viewport_width,
        config.pipeline.viewport_height,
        config.core.shader_cores
    );

    gpu.pipeline.bind_texture(0, demo_texture(1));
    let quad = demo_quad();

    // A trivial compute workload alongside the rendering.
    let program = [0x01, 0, 1, 2, 0x03, 0, 0, 0];

    for frame in 0..frames {
        gpu.begin_frame();
        gpu.draw_triangles(&quad);
        gpu.dispatch_compute(&program, 64);
        gpu.end_frame();
        gpu.present();

        let stats = gpu.pipeline.statistics();
        println!(
            "  frame {:>3}: {:.3} ms, {} fragments, {} texture samples",
            frame, stats.frame_time_ms, stats.fragments_processed, stats.texture_samples
        );
    }

    gpu.monitor.print_report();
    print_texture_metrics(&gpu);
}

/// Replays the three canonical access patterns and prints the cache metrics.
fn cmd_stress(config: &Config) {
    let mut gpu = GpuSystem::new(config);
    let mut buf = [0u8; 1024];

    println!("[*] Stress: sequential sweep");
    for texture_id in 1..=10u64 {
        gpu.read_texture(texture_id, 0, 0, &mut buf);
    }

    println!("[*] Stress: mip walk");
    for mip in 0..8u32 {
        gpu.read_texture(100, mip, 0, &mut buf[..512]);
    }

    println!("[*] Stress: scattered access");
    for i in 0..50u64 {
        let texture_id = 1000 + (i * 7) % 20;
        let mip = (i % 4) as u32;
        gpu.read_texture(texture_id, mip, 0, &mut buf[..256]);
    }

    print_texture_metrics(&gpu);
    gpu.monitor.print_report();
}

/// Prints the texture cache metric snapshot.
fn print_texture_metrics(gpu: &GpuSystem) {
    let metrics = gpu.texture_cache.get_metrics();

    println!("\nTEXTURE CACHE");
    println!("  hits                         {}", metrics.cache_hits);
    println!("  misses                       {}", metrics.cache_misses);
    println!(
        "  hit_rate                     {:.2}%",
        metrics.hit_rate * 100.0
    );
    println!("  prefetch_hits                {}", metrics.prefetch_hits);
    println!("  prefetch_misses              {}", metrics.prefetch_misses);
    println!(
        "  prefetch_efficiency          {:.2}%",
        metrics.prefetch_efficiency * 100.0
    );
    println!(
        "  utilization                  {}%",
        metrics.cache_utilization_percent
    );
    println!(
        "  bytes_transferred            {} KiB",
        metrics.bytes_transferred / 1024
    );
    println!(
        "  avg_access_latency           {:.4} ms",
        metrics.avg_access_latency_ms
    );
}
