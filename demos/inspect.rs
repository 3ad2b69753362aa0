//! Inspect Example
//!
//! Runs the full inspection pipeline on one image and writes the report as
//! JSON and PDF. No classifier, recognizer or geocoder is attached, so those
//! sections come out as unavailable.
//!
//! Run with: cargo run --example inspect -- <image_path> [output_dir]

use std::{env, fs, path::Path};

use image_insight::{
    ImageInspector, InspectorConfig, error::Result, report::Section, report::pdf::PdfExporter,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Image Insight - Inspect Example");
        println!("===============================");
        println!();
        println!("Usage: {} <image_path> [output_dir] [config.toml]", args[0]);
        println!();
        println!("Arguments:");
        println!("  image_path   - JPEG, PNG or GIF image to inspect");
        println!("  output_dir   - Optional output directory (default: ./output)");
        println!("  config.toml  - Optional inspector configuration");
        return Ok(());
    }

    let image_path = &args[1];
    let output_dir = args.get(2).map(|s| s.as_str()).unwrap_or("./output");

    if !Path::new(image_path).exists() {
        eprintln!("Error: Image file '{}' not found", image_path);
        std::process::exit(1);
    }

    let config = match args.get(3) {
        Some(path) => InspectorConfig::load(path)?,
        None => InspectorConfig::default(),
    };

    fs::create_dir_all(output_dir)?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Image Insight - Inspect                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("📁 Input:  {}", image_path);
    println!("📂 Output: {}", output_dir);
    println!();

    print!("Analyzing... ");
    let report = ImageInspector::with_config(config).analyze_path(image_path)?;
    println!("✓");
    println!();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("FILE");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Name:       {}", report.file.name);
    println!("  Size:       {}", report.file.size_formatted);
    println!("  Format:     {}", report.file.mime_type);
    println!("  Dimensions: {} x {} pixels", report.file.width, report.file.height);
    if let Some((lat, lon)) = report.location.coordinates() {
        println!("  GPS:        {:.6}, {:.6}", lat, lon);
    }
    println!();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("COLORS");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if let Section::Ready { value } = &report.main_colors {
        let hex: Vec<String> = value.iter().map(|c| c.to_hex()).collect();
        println!("  Main colors: {}", hex.join(" "));
    }
    match &report.color_distribution {
        Section::Ready { value } => {
            for share in &value.shares {
                println!("     {}  {:>6.2}%", share.swatch.to_hex(), share.percentage);
            }
        }
        Section::Unavailable { reason } => println!("  Distribution unavailable: {}", reason),
    }
    println!();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("METADATA ({} entries)", report.entries.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in report.entries.iter().take(15) {
        println!("  {:<28} {}", entry.key, entry.value);
    }
    if report.entries.len() > 15 {
        println!("  ... and {} more", report.entries.len() - 15);
    }
    println!();

    let json_output = format!("{}/analysis.json", output_dir);
    let pdf_output = format!("{}/analysis.pdf", output_dir);
    report.save_json(&json_output)?;
    PdfExporter::new().save(&report, &pdf_output)?;

    println!("  ✓ JSON report: {}", json_output);
    println!("  ✓ PDF report:  {}", pdf_output);

    Ok(())
}
