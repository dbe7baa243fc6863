//! Core data models for the reconciliation pipeline.
//!
//! Raw records are what the collectors stored, loosely typed. Normalized
//! records are the per-source working set. Unified records are the output
//! schema shared by both sources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dedup::MatchKey;
use crate::merge::Completeness;

/// Parsed `additional_info` blob.
pub type JsonObject = Map<String, Value>;

// ============================================================================
// Provenance
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Chart,
    Video,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Chart => "chart",
            Source::Video => "video",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable position of a record within one stage's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ============================================================================
// Raw Collector Records
// ============================================================================

/// Chart entry as stored by a chart collector.
/// Numeric and JSON fields are kept as raw JSON values and coerced later.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawChartRecord {
    pub position: Option<Value>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub chart_name: Option<String>,
    pub chart_date: Option<String>,
    pub additional_info: Option<Value>, // JSON object, or a string holding one
}

/// Video metadata as stored by a video collector.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawVideoRecord {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub view_count: Option<Value>,
    pub like_count: Option<Value>,
    pub comment_count: Option<Value>,
    pub duration: Option<String>, // ISO-8601, e.g. "PT4M13S"
    pub tags: Option<Value>,      // JSON array, or a string holding one
    pub published_at: Option<String>,
}

// ============================================================================
// Normalized Records
// ============================================================================

/// Numeric signals. `None` means unknown, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub chart_position: Option<i64>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub duration_seconds: Option<i64>,
}

impl Metrics {
    /// Number of known metrics.
    pub fn populated(&self) -> usize {
        [
            self.chart_position,
            self.view_count,
            self.like_count,
            self.comment_count,
            self.duration_seconds,
        ]
        .iter()
        .filter(|m| m.is_some())
        .count()
    }
}

/// Fields that only exist for one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDetails {
    Chart {
        chart_name: Option<String>,
        chart_date: Option<String>,
        additional_info: Option<JsonObject>,
    },
    Video {
        video_id: Option<String>,
        tags: Option<Vec<String>>,
        published_at: Option<String>,
    },
}

impl SourceDetails {
    pub fn source(&self) -> Source {
        match self {
            SourceDetails::Chart { .. } => Source::Chart,
            SourceDetails::Video { .. } => Source::Video,
        }
    }

    fn populated(&self) -> usize {
        match self {
            SourceDetails::Chart {
                chart_name,
                chart_date,
                additional_info,
            } => {
                usize::from(chart_name.is_some())
                    + usize::from(chart_date.is_some())
                    + usize::from(additional_info.is_some())
            }
            SourceDetails::Video {
                video_id,
                tags,
                published_at,
            } => {
                usize::from(video_id.is_some())
                    + usize::from(tags.is_some())
                    + usize::from(published_at.is_some())
            }
        }
    }
}

/// A record after title/artist cleaning. `clean_title` and `clean_artist`
/// are never empty; records that would violate this are dropped upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub clean_title: String,
    pub clean_artist: String,
    pub source: Source,
    pub metrics: Metrics,
    pub details: SourceDetails,
    pub original_title: String,
    pub original_artist: String,
}

impl MatchKey for NormalizedRecord {
    fn match_title(&self) -> &str {
        &self.clean_title
    }

    fn match_artist(&self) -> &str {
        &self.clean_artist
    }
}

impl Completeness for NormalizedRecord {
    fn populated_fields(&self) -> usize {
        // clean_title, clean_artist, source, original_title, original_artist
        5 + self.metrics.populated() + self.details.populated()
    }

    fn has_view_count(&self) -> bool {
        self.metrics.view_count.is_some()
    }
}

// ============================================================================
// Output Model
// ============================================================================

/// Final unified record: the union of chart and video fields.
///
/// Fields that do not apply to the record's source are `None`. Cross-source
/// merging fills `None` fields from the absorbed duplicate and never
/// overwrites a populated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub track_name: String,
    pub artist_name: String,
    pub source: Source,

    // Chart fields
    pub chart_name: Option<String>,
    pub chart_position: Option<i64>,
    pub chart_date: Option<String>,
    pub additional_info: Option<JsonObject>,

    // Video fields
    pub video_id: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub published_at: Option<String>,

    // Audit
    pub original_title: String,
    pub original_artist: String,
}

/// Copy `other` into `slot` when `slot` is empty. Returns whether it did.
fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) -> bool {
    if slot.is_none() && other.is_some() {
        slot.clone_from(other);
        true
    } else {
        false
    }
}

impl UnifiedRecord {
    /// Project a normalized record onto the unified schema.
    pub fn from_normalized(record: NormalizedRecord) -> Self {
        let mut unified = Self {
            track_name: record.clean_title,
            artist_name: record.clean_artist,
            source: record.source,
            chart_name: None,
            chart_position: record.metrics.chart_position,
            chart_date: None,
            additional_info: None,
            video_id: None,
            view_count: record.metrics.view_count,
            like_count: record.metrics.like_count,
            comment_count: record.metrics.comment_count,
            duration_seconds: record.metrics.duration_seconds,
            tags: None,
            published_at: None,
            original_title: record.original_title,
            original_artist: record.original_artist,
        };

        match record.details {
            SourceDetails::Chart {
                chart_name,
                chart_date,
                additional_info,
            } => {
                unified.chart_name = chart_name;
                unified.chart_date = chart_date;
                unified.additional_info = additional_info;
            }
            SourceDetails::Video {
                video_id,
                tags,
                published_at,
            } => {
                unified.video_id = video_id;
                unified.tags = tags;
                unified.published_at = published_at;
            }
        }

        unified
    }

    /// Fill every empty field from `other`. Returns the number of fields filled.
    pub fn fill_missing_from(&mut self, other: &UnifiedRecord) -> usize {
        [
            fill(&mut self.chart_name, &other.chart_name),
            fill(&mut self.chart_position, &other.chart_position),
            fill(&mut self.chart_date, &other.chart_date),
            fill(&mut self.additional_info, &other.additional_info),
            fill(&mut self.video_id, &other.video_id),
            fill(&mut self.view_count, &other.view_count),
            fill(&mut self.like_count, &other.like_count),
            fill(&mut self.comment_count, &other.comment_count),
            fill(&mut self.duration_seconds, &other.duration_seconds),
            fill(&mut self.tags, &other.tags),
            fill(&mut self.published_at, &other.published_at),
        ]
        .iter()
        .filter(|&&filled| filled)
        .count()
    }

    fn optional_populated(&self) -> usize {
        [
            self.chart_name.is_some(),
            self.chart_position.is_some(),
            self.chart_date.is_some(),
            self.additional_info.is_some(),
            self.video_id.is_some(),
            self.view_count.is_some(),
            self.like_count.is_some(),
            self.comment_count.is_some(),
            self.duration_seconds.is_some(),
            self.tags.is_some(),
            self.published_at.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    /// Total number of columns in the unified schema.
    pub const FIELD_COUNT: usize = 16;
}

impl MatchKey for UnifiedRecord {
    fn match_title(&self) -> &str {
        &self.track_name
    }

    fn match_artist(&self) -> &str {
        &self.artist_name
    }
}

impl Completeness for UnifiedRecord {
    fn populated_fields(&self) -> usize {
        // track_name, artist_name, source, original_title, original_artist
        5 + self.optional_populated()
    }

    fn has_view_count(&self) -> bool {
        self.view_count.is_some()
    }
}

// ============================================================================
// Record Issues
// ============================================================================

/// Non-fatal problems found while normalizing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIssue {
    /// A field could not be parsed and was degraded (numeric → None, blob → empty)
    MalformedField { source: Source, field: &'static str },
    /// Title or artist was empty after cleaning; the record is dropped
    EmptyIdentity(Source),
    /// No artist could be extracted from a video title; channel name used instead
    NoMatchExtraction,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-stage counters for one pipeline run.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    // Inputs
    pub chart_input: usize,
    pub video_input: usize,

    // Normalization
    pub chart_empty_identity: usize,
    pub video_empty_identity: usize,
    pub malformed_fields: usize,
    pub extraction_matches: usize,
    pub extraction_fallbacks: usize,

    // Same-source deduplication
    pub chart_duplicate_pairs: usize,
    pub chart_duplicates_removed: usize,
    pub video_duplicate_pairs: usize,
    pub video_duplicates_removed: usize,

    // Cross-source merge
    pub cross_source_pairs: usize,
    pub cross_source_merged: usize,
    pub fields_filled: usize,

    pub final_records: usize,
}

impl CleaningStats {
    pub fn record_issue(&mut self, issue: RecordIssue) {
        match issue {
            RecordIssue::MalformedField { .. } => self.malformed_fields += 1,
            RecordIssue::EmptyIdentity(Source::Chart) => self.chart_empty_identity += 1,
            RecordIssue::EmptyIdentity(Source::Video) => self.video_empty_identity += 1,
            RecordIssue::NoMatchExtraction => self.extraction_fallbacks += 1,
        }
    }

    /// Records dropped for an empty title or artist.
    pub fn empty_identity_total(&self) -> usize {
        self.chart_empty_identity + self.video_empty_identity
    }

    /// Everything that went in but did not come out.
    pub fn total_removed(&self) -> usize {
        (self.chart_input + self.video_input).saturating_sub(self.final_records)
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
