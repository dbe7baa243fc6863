//! Run reports: record counts before and after cleaning, and a summary of
//! the unified dataset.

use std::path::Path;

use chrono::Local;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::Result;
use crate::merge::Completeness;
use crate::models::{CleaningStats, Source, UnifiedRecord};

/// Number of artists listed in [`DatasetSummary::top_artists`].
pub const TOP_ARTISTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub original_chart_records: usize,
    pub original_video_records: usize,
    pub total_original_records: usize,
    pub final_unified_records: usize,
    pub total_removed: usize,
    /// ISO-8601, local time
    pub cleaning_timestamp: String,
}

pub fn generate_cleaning_report(
    original_chart_count: usize,
    original_video_count: usize,
    final_count: usize,
) -> CleaningReport {
    let total = original_chart_count + original_video_count;
    CleaningReport {
        original_chart_records: original_chart_count,
        original_video_records: original_video_count,
        total_original_records: total,
        final_unified_records: final_count,
        total_removed: total.saturating_sub(final_count),
        cleaning_timestamp: Local::now().to_rfc3339(),
    }
}

// ============================================================================
// Dataset summary
// ============================================================================

/// A name with its number of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub chart_records: usize,
    pub video_records: usize,
    pub unique_tracks: usize,
    pub unique_artists: usize,
    /// Most frequent artists, count descending then name ascending.
    pub top_artists: Vec<NameCount>,
    /// Chart-sourced records per chart name, same ordering.
    pub chart_distribution: Vec<NameCount>,
    /// Populated cells over all cells of the unified schema, in percent.
    pub completeness_percent: f64,
    /// Records sharing a track name with an earlier record, in percent.
    pub duplicate_rate_percent: f64,
}

fn ranked(counts: FxHashMap<&str, usize>) -> Vec<NameCount> {
    let mut ranked: Vec<NameCount> = counts
        .into_iter()
        .map(|(name, count)| NameCount {
            name: name.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked
}

pub fn summarize_dataset(records: &[UnifiedRecord]) -> DatasetSummary {
    let total_records = records.len();
    let chart_records = records.iter().filter(|r| r.source == Source::Chart).count();

    let unique_tracks = records
        .iter()
        .map(|r| r.track_name.as_str())
        .collect::<FxHashSet<_>>()
        .len();

    let mut artist_counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut chart_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for record in records {
        *artist_counts.entry(record.artist_name.as_str()).or_default() += 1;
        if record.source == Source::Chart {
            if let Some(chart_name) = record.chart_name.as_deref() {
                *chart_counts.entry(chart_name).or_default() += 1;
            }
        }
    }
    let unique_artists = artist_counts.len();

    let mut top_artists = ranked(artist_counts);
    top_artists.truncate(TOP_ARTISTS);

    let (completeness_percent, duplicate_rate_percent) = if total_records == 0 {
        (0.0, 0.0)
    } else {
        let populated: usize = records.iter().map(|r| r.populated_fields()).sum();
        let cells = total_records * UnifiedRecord::FIELD_COUNT;
        (
            populated as f64 / cells as f64 * 100.0,
            (total_records - unique_tracks) as f64 / total_records as f64 * 100.0,
        )
    };

    DatasetSummary {
        total_records,
        chart_records,
        video_records: total_records - chart_records,
        unique_tracks,
        unique_artists,
        top_artists,
        chart_distribution: ranked(chart_counts),
        completeness_percent,
        duplicate_rate_percent,
    }
}

// ============================================================================
// Combined report file
// ============================================================================

/// Everything the CLI writes with `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub cleaning: CleaningReport,
    pub summary: DatasetSummary,
    pub stats: CleaningStats,
}

impl RunReport {
    pub fn new(records: &[UnifiedRecord], stats: &CleaningStats) -> Self {
        Self {
            cleaning: generate_cleaning_report(stats.chart_input, stats.video_input, records.len()),
            summary: summarize_dataset(records),
            stats: stats.clone(),
        }
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
