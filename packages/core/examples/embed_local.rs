//! Embed local video files into a local presentation
//!
//! Run with: cargo run --example embed_local -p deckcast-core -- deck.pptx out.pptx 2:clip.mp4 [3:intro.mov ...]
//!
//! Set `EMBED_CONFIG` to a JSON embed configuration to override the defaults.

use deckcast_core::media::{mime_from_path, DEFAULT_VIDEO_MIME};
use deckcast_core::{EmbedConfig, EmbedEntry, EmbedPipeline, VideoAsset};
use std::path::Path;
use std::time::Instant;

fn parse_entry(arg: &str) -> Result<EmbedEntry, Box<dyn std::error::Error>> {
    let (slide, path) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected SLIDE:PATH, got {:?}", arg))?;
    let slide_index: usize = slide.parse()?;
    let data = std::fs::read(path)?;
    let mime = mime_from_path(path).unwrap_or(DEFAULT_VIDEO_MIME);
    Ok(EmbedEntry::new(slide_index, VideoAsset::new(data, mime)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: embed_local <input.pptx> <output.pptx> <slide:video>...");
        std::process::exit(2);
    }

    let config = match std::env::var_os("EMBED_CONFIG") {
        Some(path) => {
            println!("Config: {:?}", path);
            EmbedConfig::load_from_file(Path::new(&path))?
        }
        None => EmbedConfig::default(),
    };

    let document = std::fs::read(&args[0])?;
    let entries = args[2..]
        .iter()
        .map(|arg| parse_entry(arg))
        .collect::<Result<Vec<_>, _>>()?;

    println!("Embedding {} video(s) into {}", entries.len(), args[0]);

    let start = Instant::now();
    let pipeline = EmbedPipeline::new(&config)?;
    let output = pipeline.run(&document, entries)?;

    for report in &output.reports {
        println!(
            "  slide {}: {} ({}) at {:.2}x{:.2}in, poster {:?}",
            report.slide_index,
            report.intrinsic,
            if report.probed { "probed" } else { "fallback" },
            report.emu.cx as f64 / deckcast_core::EMU_PER_INCH as f64,
            report.emu.cy as f64 / deckcast_core::EMU_PER_INCH as f64,
            report.poster_source,
        );
    }

    std::fs::write(&args[1], &output.document)?;
    println!(
        "\nWrote {} ({} bytes) in {:.2?}",
        args[1],
        output.document.len(),
        start.elapsed()
    );

    Ok(())
}
