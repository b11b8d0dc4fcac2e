//! Spectral ocean - snapshot exporter
//!
//! Simulates one ocean tile at a chosen time and writes the height map
//! (and optionally the FFT butterfly table) as PNG images.

mod cli;

use std::time::Instant;

use clap::Parser;
use image::{GrayImage, Luma, Rgb, RgbImage};

use cli::Args;
use spectral_ocean::fft::FftPlan;
use spectral_ocean::ocean::Ocean;

/// Map `value` from [-1, 1] to a byte
fn unit_to_byte(value: f32) -> u8 {
    ((value + 1.0) * 127.5).clamp(0.0, 255.0) as u8
}

/// Grayscale image of the height map, min height black, max height white
fn heightmap_image(ocean: &Ocean) -> GrayImage {
    let n = ocean.config().n as u32;
    let heights = ocean.height_map();
    let (lo, hi) = ocean.min_max_height();
    let range = hi - lo;

    GrayImage::from_fn(n, n, |x, z| {
        let h = heights[(z * n + x) as usize];
        let t = if range > 0.0 { (h - lo) / range } else { 0.5 };
        Luma([(t * 255.0).round() as u8])
    })
}

/// Butterfly table image: one row per stage, twiddle re/im in R/G, upper wing in B
fn butterfly_image(plan: &FftPlan) -> RgbImage {
    let n = plan.n() as u32;
    let table = plan.butterfly_table();

    RgbImage::from_fn(n, plan.log2_n() as u32, |p, stage| {
        let [re, im, _, _] = table[(stage * n + p) as usize];
        let half = 1u32 << stage;
        let upper = p % (2 * half) >= half;
        Rgb([unit_to_byte(re), unit_to_byte(im), if upper { 255 } else { 0 }])
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = args.ocean_config();
    let export = args.export_config();
    let backend = args.parse_backend()?;

    println!("Spectral ocean");
    println!("  N: {}", config.n);
    println!(
        "  Wind: ({}, {}) at {} m/s",
        config.wind_direction.x, config.wind_direction.y, config.wind_speed
    );
    println!("  Seed: {}", config.seed);

    let start = Instant::now();

    let mut ocean = Ocean::with_backend(config, backend)?;
    ocean.simulate(export.time_s)?;

    let (lo, hi) = ocean.min_max_height();
    println!("  Backend: {}", ocean.backend_name());
    println!("  Time: {} s", export.time_s);
    println!("  Height range: [{lo:.4}, {hi:.4}]");

    std::fs::create_dir_all(&export.output_dir)?;

    let heightmap = export.heightmap_path();
    heightmap_image(&ocean).save(&heightmap)?;
    println!("  Height map: {heightmap}");

    if export.butterfly {
        let plan = FftPlan::new(ocean.config().n)?;
        let path = export.butterfly_path();
        butterfly_image(&plan).save(&path)?;
        println!("  Butterfly table: {path}");
    }

    println!("  Elapsed: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
