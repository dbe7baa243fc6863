use anyhow::{Context, Result};
use chart_unify::config::CleaningConfig;
use chart_unify::models::{CleaningStats, Source};
use chart_unify::pipeline::UnificationPipeline;
use chart_unify::progress::{format_duration, Progress};
use chart_unify::report::RunReport;
use chart_unify::safety::{validate_output_path, validate_output_table};
use chart_unify::storage::{self, CHART_TABLE, DEFAULT_OUTPUT_TABLE, VIDEO_TABLE};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chart-unify")]
#[command(about = "Reconcile chart and video records into one deduplicated table")]
struct Args {
    /// SQLite database holding the collectors' tables
    database: PathBuf,

    /// Output table (dropped and recreated)
    #[arg(long, default_value = DEFAULT_OUTPUT_TABLE)]
    table: String,

    /// Similarity threshold, overrides the config file
    #[arg(long)]
    threshold: Option<f64>,

    /// TOML file with cleaning rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the cleaning report and dataset summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the unified records as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide spinners, log phase completions instead
    #[arg(long)]
    log_only: bool,

    /// Run the pipeline without writing the output table
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chart_unify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(args: &Args) -> Result<CleaningConfig> {
    let config = match &args.config {
        Some(path) => CleaningConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => CleaningConfig::default(),
    };
    match args.threshold {
        Some(threshold) => Ok(config.with_threshold(threshold)?),
        None => Ok(config),
    }
}

fn check_outputs(args: &Args) -> Result<()> {
    validate_output_table(&args.table, &[CHART_TABLE, VIDEO_TABLE])?;
    let sources: [&Path; 1] = [&args.database];
    for output in [&args.report, &args.json].into_iter().flatten() {
        validate_output_path(output, &sources)?;
    }
    Ok(())
}

fn print_summary(report: &RunReport, stats: &CleaningStats) {
    let cleaning = &report.cleaning;
    let summary = &report.summary;

    println!("\n{:=<60}", "");
    println!("Unification complete!");
    println!(
        "  Input: {} chart + {} video = {}",
        cleaning.original_chart_records,
        cleaning.original_video_records,
        cleaning.total_original_records
    );
    println!(
        "  Dropped (empty title/artist): {} chart, {} video",
        stats.chart_empty_identity, stats.video_empty_identity
    );
    println!(
        "  Same-source duplicates: {} chart, {} video",
        stats.chart_duplicates_removed, stats.video_duplicates_removed
    );
    println!(
        "  Cross-source merges: {} ({} fields filled)",
        stats.cross_source_merged, stats.fields_filled
    );
    println!("  Malformed fields: {}", stats.malformed_fields);
    println!(
        "  Output: {} records ({} chart, {} video), {} removed",
        cleaning.final_unified_records,
        summary.chart_records,
        summary.video_records,
        cleaning.total_removed
    );
    println!(
        "  Unique: {} tracks, {} artists",
        summary.unique_tracks, summary.unique_artists
    );
    println!(
        "  Completeness: {:.1}%  Duplicate rate: {:.1}%",
        summary.completeness_percent, summary.duplicate_rate_percent
    );
    if !summary.top_artists.is_empty() {
        println!("  Top artists:");
        for entry in &summary.top_artists {
            println!("    {:>5}  {}", entry.count, entry.name);
        }
    }
    println!("{:=<60}", "");
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = load_config(&args)?;
    check_outputs(&args)?;

    let start = Instant::now();
    let progress = Progress::new(args.log_only);
    let pipeline = UnificationPipeline::new(config).context("Invalid cleaning config")?;
    info!(
        threshold = pipeline.config().similarity_threshold,
        database = %args.database.display(),
        "starting unification"
    );

    let mut conn = storage::open_database(&args.database, args.dry_run)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;

    let phase = progress.phase("Phase 1: Reading source tables");
    let chart_raw = storage::read_chart_records(&conn).context("Failed to read chart records")?;
    let video_raw = storage::read_video_records(&conn).context("Failed to read video records")?;
    phase.finish(&format!(
        "Phase 1: Read {} chart and {} video records",
        chart_raw.len(),
        video_raw.len()
    ));

    let mut stats = CleaningStats {
        chart_input: chart_raw.len(),
        video_input: video_raw.len(),
        ..CleaningStats::default()
    };

    let phase = progress.phase("Phase 2: Cleaning chart records");
    let charts = pipeline.normalize_chart_records(&chart_raw, &mut stats);
    let charts = pipeline.deduplicate_source(&charts, Source::Chart, &mut stats);
    phase.finish(&format!("Phase 2: {} chart records after deduplication", charts.len()));

    let phase = progress.phase("Phase 3: Cleaning video records");
    let videos = pipeline.normalize_video_records(&video_raw, &mut stats);
    let videos = pipeline.deduplicate_source(&videos, Source::Video, &mut stats);
    phase.finish(&format!("Phase 3: {} video records after deduplication", videos.len()));

    let phase = progress.phase("Phase 4: Merging across sources");
    let unified = pipeline.unify(&charts, &videos);
    let records = pipeline.merge_across_sources(&unified, &mut stats);
    stats.final_records = records.len();
    phase.finish(&format!("Phase 4: {} unified records", records.len()));

    if args.dry_run {
        println!("Dry run: table '{}' left untouched", args.table);
    } else {
        let phase = progress.phase("Phase 5: Writing output table");
        let written = storage::write_unified_records(&mut conn, &args.table, &records)
            .with_context(|| format!("Failed to write table '{}'", args.table))?;
        phase.finish(&format!("Phase 5: Wrote {} rows to '{}'", written, args.table));
    }

    let report = RunReport::new(&records, &stats);
    print_summary(&report, &stats);

    if let Some(path) = &args.report {
        report
            .write_to_file(path)
            .with_context(|| format!("Failed to write report {:?}", path))?;
        println!("Report written to {:?}", path);
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write records {:?}", path))?;
        println!("Records written to {:?}", path);
    }

    println!("Elapsed: {}", format_duration(start.elapsed()));
    Ok(())
}
