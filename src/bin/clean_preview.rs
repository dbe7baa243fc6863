//! Show how titles (or artist names) read from stdin are cleaned and split.
//!
//! Usage:
//!   printf 'Dua Lipa - Levitating (Official Music Video)\n' | clean-preview
//!   printf 'Ed Sheeran & Justin Bieber\n' | clean-preview --artist

use anyhow::{Context, Result};
use chart_unify::config::CleaningConfig;
use chart_unify::normalize::normalize;
use chart_unify::pipeline::UnificationPipeline;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clean-preview")]
#[command(about = "Preview title/artist cleaning for lines read from stdin")]
struct Args {
    /// TOML file with cleaning rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat each line as an artist or channel name instead of a title
    #[arg(long)]
    artist: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CleaningConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => CleaningConfig::default(),
    };
    let pipeline = UnificationPipeline::new(config).context("Invalid cleaning config")?;
    let normalizer = pipeline.normalizer();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        writeln!(out, "{}", line)?;
        writeln!(out, "  normalized: {:?}", normalize(&line))?;

        if args.artist {
            writeln!(out, "  artist:     {:?}", normalizer.clean_artist(&line))?;
        } else {
            let cleaned = normalizer.clean_title(&line);
            writeln!(out, "  title:      {:?}", cleaned)?;

            let extraction = pipeline.extractor().extract(&cleaned);
            match (&extraction.artist, extraction.pattern) {
                (Some(artist), Some(pattern)) => writeln!(
                    out,
                    "  split:      artist={:?} track={:?} ({})",
                    artist,
                    extraction.track,
                    pattern.as_str()
                )?,
                _ => writeln!(out, "  split:      no artist, track={:?}", extraction.track)?,
            }
        }
    }

    Ok(())
}
