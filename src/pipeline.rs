//! Staged reconciliation of chart and video records.
//!
//! ```text
//! chart ─ normalize ─ dedup ─┐
//!                            ├─ unify ─ cross-source merge ─ final
//! video ─ normalize ─ dedup ─┘
//! ```
//!
//! Each stage is a public method that borrows its input and returns an owned
//! result, so callers can run them one at a time (the CLI does, to show a
//! spinner per phase) or all at once through
//! [`UnificationPipeline::build_unified_dataset`].

use tracing::info;

use crate::config::CleaningConfig;
use crate::dedup::find_duplicates;
use crate::error::Result;
use crate::extract::TitleArtistExtractor;
use crate::fields::{coerce_int, parse_iso_duration, parse_json_object, parse_tags, Field};
use crate::merge::RecordMerger;
use crate::models::{
    CleaningStats, Metrics, NormalizedRecord, RawChartRecord, RawVideoRecord, RecordIssue,
    Source, SourceDetails, UnifiedRecord,
};
use crate::normalize::TextNormalizer;

/// Output of a full run.
#[derive(Debug, Clone)]
pub struct UnifiedDataset {
    pub records: Vec<UnifiedRecord>,
    pub stats: CleaningStats,
}

pub struct UnificationPipeline {
    config: CleaningConfig,
    normalizer: TextNormalizer,
    extractor: TitleArtistExtractor,
    merger: RecordMerger,
}

/// Unwrap a coerced field, counting it when malformed.
fn counted<T>(field: Field<T>, source: Source, name: &'static str, stats: &mut CleaningStats) -> Field<T> {
    if field.is_malformed() {
        stats.record_issue(RecordIssue::MalformedField { source, field: name });
    }
    field
}

impl UnificationPipeline {
    /// Validate the config and compile its pattern tables.
    pub fn new(config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: TextNormalizer::new(&config)?,
            extractor: TitleArtistExtractor::new(&config),
            merger: RecordMerger::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn extractor(&self) -> &TitleArtistExtractor {
        &self.extractor
    }

    // ========================================================================
    // Normalization
    // ========================================================================

    /// Clean one chart entry. `None` when title or artist ends up empty.
    pub fn normalize_chart_record(
        &self,
        raw: &RawChartRecord,
        stats: &mut CleaningStats,
    ) -> Option<NormalizedRecord> {
        let clean_title = self.normalizer.clean_title(raw.track_name.as_deref().unwrap_or(""));
        let clean_artist = self.normalizer.clean_artist(raw.artist_name.as_deref().unwrap_or(""));
        if clean_title.is_empty() || clean_artist.is_empty() {
            stats.record_issue(RecordIssue::EmptyIdentity(Source::Chart));
            return None;
        }

        let position = counted(coerce_int(raw.position.as_ref()), Source::Chart, "position", stats);
        let additional_info = counted(
            parse_json_object(raw.additional_info.as_ref()),
            Source::Chart,
            "additional_info",
            stats,
        );

        Some(NormalizedRecord {
            clean_title,
            clean_artist,
            source: Source::Chart,
            metrics: Metrics {
                chart_position: position.into_option(),
                ..Metrics::default()
            },
            details: SourceDetails::Chart {
                chart_name: raw.chart_name.clone(),
                chart_date: raw.chart_date.clone(),
                additional_info: additional_info.into_option_or_empty(),
            },
            original_title: raw.track_name.clone().unwrap_or_default(),
            original_artist: raw.artist_name.clone().unwrap_or_default(),
        })
    }

    /// Clean one video. The artist and track come from the title when it
    /// can be split, otherwise from the channel name and the cleaned title.
    pub fn normalize_video_record(
        &self,
        raw: &RawVideoRecord,
        stats: &mut CleaningStats,
    ) -> Option<NormalizedRecord> {
        let cleaned_title = self.normalizer.clean_title(raw.title.as_deref().unwrap_or(""));
        let channel = self.normalizer.clean_artist(raw.channel_title.as_deref().unwrap_or(""));

        let extraction = self.extractor.extract(&cleaned_title);
        let (clean_title, clean_artist) = match extraction.artist {
            Some(artist) => {
                stats.extraction_matches += 1;
                (extraction.track, artist)
            }
            None => {
                if !cleaned_title.is_empty() {
                    stats.record_issue(RecordIssue::NoMatchExtraction);
                }
                (cleaned_title, channel)
            }
        };

        if clean_title.is_empty() || clean_artist.is_empty() {
            stats.record_issue(RecordIssue::EmptyIdentity(Source::Video));
            return None;
        }

        let metrics = Metrics {
            chart_position: None,
            view_count: counted(coerce_int(raw.view_count.as_ref()), Source::Video, "view_count", stats)
                .into_option(),
            like_count: counted(coerce_int(raw.like_count.as_ref()), Source::Video, "like_count", stats)
                .into_option(),
            comment_count: counted(
                coerce_int(raw.comment_count.as_ref()),
                Source::Video,
                "comment_count",
                stats,
            )
            .into_option(),
            duration_seconds: counted(
                parse_iso_duration(raw.duration.as_deref()),
                Source::Video,
                "duration",
                stats,
            )
            .into_option(),
        };
        let tags = counted(parse_tags(raw.tags.as_ref()), Source::Video, "tags", stats);

        Some(NormalizedRecord {
            clean_title,
            clean_artist,
            source: Source::Video,
            metrics,
            details: SourceDetails::Video {
                video_id: raw.video_id.clone(),
                tags: tags.into_option_or_empty(),
                published_at: raw.published_at.clone(),
            },
            original_title: raw.title.clone().unwrap_or_default(),
            original_artist: raw.channel_title.clone().unwrap_or_default(),
        })
    }

    pub fn normalize_chart_records(
        &self,
        raw: &[RawChartRecord],
        stats: &mut CleaningStats,
    ) -> Vec<NormalizedRecord> {
        let records: Vec<_> = raw
            .iter()
            .filter_map(|r| self.normalize_chart_record(r, stats))
            .collect();
        info!(
            input = raw.len(),
            kept = records.len(),
            empty_identity = stats.chart_empty_identity,
            "normalized chart records"
        );
        records
    }

    pub fn normalize_video_records(
        &self,
        raw: &[RawVideoRecord],
        stats: &mut CleaningStats,
    ) -> Vec<NormalizedRecord> {
        let records: Vec<_> = raw
            .iter()
            .filter_map(|r| self.normalize_video_record(r, stats))
            .collect();
        info!(
            input = raw.len(),
            kept = records.len(),
            empty_identity = stats.video_empty_identity,
            extracted = stats.extraction_matches,
            fallbacks = stats.extraction_fallbacks,
            "normalized video records"
        );
        records
    }

    // ========================================================================
    // Deduplication
    // ========================================================================

    /// Detect and resolve duplicates among records of one source.
    pub fn deduplicate_source(
        &self,
        records: &[NormalizedRecord],
        source: Source,
        stats: &mut CleaningStats,
    ) -> Vec<NormalizedRecord> {
        let pairs = find_duplicates(records, self.config.similarity_threshold);
        let outcome = self.merger.resolve(&pairs, records);

        match source {
            Source::Chart => {
                stats.chart_duplicate_pairs += pairs.len();
                stats.chart_duplicates_removed += outcome.removed;
            }
            Source::Video => {
                stats.video_duplicate_pairs += pairs.len();
                stats.video_duplicates_removed += outcome.removed;
            }
        }
        info!(
            %source,
            pairs = pairs.len(),
            removed = outcome.removed,
            remaining = outcome.survivors.len(),
            "removed same-source duplicates"
        );
        outcome.survivors
    }

    /// Project both sets onto the unified schema, charts first.
    pub fn unify(&self, charts: &[NormalizedRecord], videos: &[NormalizedRecord]) -> Vec<UnifiedRecord> {
        charts
            .iter()
            .chain(videos)
            .cloned()
            .map(UnifiedRecord::from_normalized)
            .collect()
    }

    /// Detect duplicates over the combined set and fold each pair into its
    /// first record.
    pub fn merge_across_sources(
        &self,
        records: &[UnifiedRecord],
        stats: &mut CleaningStats,
    ) -> Vec<UnifiedRecord> {
        let pairs = find_duplicates(records, self.config.similarity_threshold);
        let outcome = self.merger.merge_cross_source(&pairs, records);

        stats.cross_source_pairs += pairs.len();
        stats.cross_source_merged += outcome.removed;
        stats.fields_filled += outcome.fields_filled;
        info!(
            pairs = pairs.len(),
            merged = outcome.removed,
            fields_filled = outcome.fields_filled,
            remaining = outcome.survivors.len(),
            "merged cross-source duplicates"
        );
        outcome.survivors
    }

    // ========================================================================
    // Full run
    // ========================================================================

    pub fn build_unified_dataset(
        &self,
        chart: &[RawChartRecord],
        video: &[RawVideoRecord],
    ) -> UnifiedDataset {
        let mut stats = CleaningStats {
            chart_input: chart.len(),
            video_input: video.len(),
            ..CleaningStats::default()
        };

        let charts = self.normalize_chart_records(chart, &mut stats);
        let charts = self.deduplicate_source(&charts, Source::Chart, &mut stats);

        let videos = self.normalize_video_records(video, &mut stats);
        let videos = self.deduplicate_source(&videos, Source::Video, &mut stats);

        let unified = self.unify(&charts, &videos);
        let records = self.merge_across_sources(&unified, &mut stats);

        stats.final_records = records.len();
        info!(
            input = chart.len() + video.len(),
            output = records.len(),
            removed = stats.total_removed(),
            "unified dataset built"
        );

        UnifiedDataset { records, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> UnificationPipeline {
        UnificationPipeline::new(CleaningConfig::default()).unwrap()
    }

    fn chart(title: &str, artist: &str) -> RawChartRecord {
        RawChartRecord {
            track_name: Some(title.to_string()),
            artist_name: Some(artist.to_string()),
            ..RawChartRecord::default()
        }
    }

    fn video(title: &str, channel: &str) -> RawVideoRecord {
        RawVideoRecord {
            title: Some(title.to_string()),
            channel_title: Some(channel.to_string()),
            ..RawVideoRecord::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CleaningConfig {
            similarity_threshold: 2.0,
            ..CleaningConfig::default()
        };
        assert!(UnificationPipeline::new(config).is_err());
    }

    #[test]
    fn test_normalize_chart_record() {
        let mut stats = CleaningStats::default();
        let raw = RawChartRecord {
            position: Some(json!("3")),
            additional_info: Some(json!("{\"peak\": 1}")),
            chart_name: Some("Hot 100".to_string()),
            ..chart("Levitating (Official Video)", "Dua Lipa & DaBaby")
        };

        let record = pipeline().normalize_chart_record(&raw, &mut stats).unwrap();
        assert_eq!(record.clean_title, "Levitating");
        assert_eq!(record.clean_artist, "Dua Lipa and DaBaby");
        assert_eq!(record.metrics.chart_position, Some(3));
        assert_eq!(record.original_title, "Levitating (Official Video)");
        let SourceDetails::Chart { additional_info, .. } = &record.details else {
            panic!("chart record with video details");
        };
        assert_eq!(additional_info.as_ref().and_then(|m| m.get("peak")), Some(&json!(1)));
        assert_eq!(stats.malformed_fields, 0);
    }

    #[test]
    fn test_normalize_chart_record_malformed_fields() {
        let mut stats = CleaningStats::default();
        let raw = RawChartRecord {
            position: Some(json!("first")),
            additional_info: Some(json!("{oops")),
            ..chart("Song", "Artist")
        };

        let record = pipeline().normalize_chart_record(&raw, &mut stats).unwrap();
        assert_eq!(record.metrics.chart_position, None);
        assert_eq!(
            record.details,
            SourceDetails::Chart {
                chart_name: None,
                chart_date: None,
                additional_info: Some(Default::default()),
            }
        );
        assert_eq!(stats.malformed_fields, 2);
    }

    #[test]
    fn test_normalize_video_record_extracts_artist() {
        let mut stats = CleaningStats::default();
        let raw = RawVideoRecord {
            view_count: Some(json!("2500000000")),
            duration: Some("PT3M54S".to_string()),
            ..video("Ed Sheeran - Shape of You (Official Music Video)", "Ed Sheeran")
        };

        let record = pipeline().normalize_video_record(&raw, &mut stats).unwrap();
        assert_eq!(record.clean_title, "Shape of You");
        assert_eq!(record.clean_artist, "Ed Sheeran");
        assert_eq!(record.metrics.view_count, Some(2_500_000_000));
        assert_eq!(record.metrics.duration_seconds, Some(234));
        assert_eq!(stats.extraction_matches, 1);
    }

    #[test]
    fn test_normalize_video_record_falls_back_to_channel() {
        let mut stats = CleaningStats::default();
        let raw = video("Levitating (Official Music Video)", "Dua Lipa - Topic");

        let record = pipeline().normalize_video_record(&raw, &mut stats).unwrap();
        assert_eq!(record.clean_title, "Levitating");
        assert_eq!(record.clean_artist, "Dua Lipa");
        assert_eq!(stats.extraction_fallbacks, 1);
    }

    #[test]
    fn test_empty_identity_dropped() {
        let mut stats = CleaningStats::default();
        let p = pipeline();
        assert!(p.normalize_chart_record(&chart("(Official Audio)", "Someone"), &mut stats).is_none());
        assert!(p.normalize_chart_record(&RawChartRecord::default(), &mut stats).is_none());
        assert!(p.normalize_video_record(&video("Song", "  "), &mut stats).is_none());
        assert_eq!(stats.chart_empty_identity, 2);
        assert_eq!(stats.video_empty_identity, 1);
    }

    #[test]
    fn test_stages_do_not_disturb_inputs() {
        let p = pipeline();
        let mut stats = CleaningStats::default();
        let charts = p.normalize_chart_records(
            &[chart("Song", "Artist"), chart("Song", "Artist")],
            &mut stats,
        );
        let deduped = p.deduplicate_source(&charts, Source::Chart, &mut stats);
        assert_eq!(charts.len(), 2);
        assert_eq!(deduped.len(), 1);
        assert_eq!(stats.chart_duplicate_pairs, 1);
        assert_eq!(stats.chart_duplicates_removed, 1);
    }

    #[test]
    fn test_unify_orders_charts_first() {
        let p = pipeline();
        let mut stats = CleaningStats::default();
        let charts = p.normalize_chart_records(&[chart("A", "X")], &mut stats);
        let videos = p.normalize_video_records(&[video("B", "Y")], &mut stats);

        let unified = p.unify(&charts, &videos);
        let sources: Vec<Source> = unified.iter().map(|r| r.source).collect();
        assert_eq!(sources, vec![Source::Chart, Source::Video]);
    }

    #[test]
    fn test_empty_inputs() {
        let dataset = pipeline().build_unified_dataset(&[], &[]);
        assert!(dataset.records.is_empty());
        assert_eq!(dataset.stats.total_removed(), 0);
    }
}
