//! Duplicate resolution.
//!
//! Records sit in a [`RecordArena`] addressed by stable [`RecordId`]s; a
//! removed set marks the losers. Pairs are walked strictly in the order the
//! detector produced them, and a pair touching an already removed record is
//! skipped.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::CleaningConfig;
use crate::dedup::DuplicateCandidate;
use crate::models::{RecordId, UnifiedRecord};

/// How much of a record is known.
pub trait Completeness {
    /// Number of populated fields.
    fn populated_fields(&self) -> usize;
    fn has_view_count(&self) -> bool;
}

// ============================================================================
// Arena
// ============================================================================

/// Records plus the set of ids already merged away.
#[derive(Debug)]
pub struct RecordArena<R> {
    records: Vec<R>,
    removed: FxHashSet<RecordId>,
}

impl<R> RecordArena<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            removed: FxHashSet::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&R> {
        self.records.get(id.index())
    }

    /// Both ids exist and neither has been removed.
    pub fn both_live(&self, a: RecordId, b: RecordId) -> bool {
        a != b
            && a.index() < self.records.len()
            && b.index() < self.records.len()
            && !self.removed.contains(&a)
            && !self.removed.contains(&b)
    }

    pub fn is_removed(&self, id: RecordId) -> bool {
        self.removed.contains(&id)
    }

    pub fn remove(&mut self, id: RecordId) {
        self.removed.insert(id);
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Mutable access to `keep` alongside shared access to `other`.
    fn pair_mut(&mut self, keep: RecordId, other: RecordId) -> (&mut R, &R) {
        let (k, o) = (keep.index(), other.index());
        if k < o {
            let (left, right) = self.records.split_at_mut(o);
            (&mut left[k], &right[0])
        } else {
            let (left, right) = self.records.split_at_mut(k);
            (&mut right[0], &left[o])
        }
    }

    /// Surviving records in their original order.
    pub fn into_survivors(self) -> Vec<R> {
        let removed = self.removed;
        self.records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(&RecordId(*i)))
            .map(|(_, r)| r)
            .collect()
    }
}

/// Result of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<R> {
    pub survivors: Vec<R>,
    pub removed: usize,
    /// Fields copied into survivors (cross-source only).
    pub fields_filled: usize,
}

impl<R> MergeOutcome<R> {
    fn from_arena(arena: RecordArena<R>, fields_filled: usize) -> Self {
        let removed = arena.removed_count();
        Self {
            survivors: arena.into_survivors(),
            removed,
            fields_filled,
        }
    }
}

// ============================================================================
// Merger
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordMerger {
    view_count_bonus: usize,
}

impl RecordMerger {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            view_count_bonus: config.view_count_bonus,
        }
    }

    /// Populated fields, plus the bonus when a view count is known.
    pub fn completeness_score<R: Completeness>(&self, record: &R) -> usize {
        let bonus = if record.has_view_count() {
            self.view_count_bonus
        } else {
            0
        };
        record.populated_fields() + bonus
    }

    /// Same-source resolution: the less complete record of each pair is
    /// removed. Ties keep the first record.
    pub fn resolve<R>(&self, pairs: &[DuplicateCandidate], records: &[R]) -> MergeOutcome<R>
    where
        R: Completeness + Clone,
    {
        let mut arena = RecordArena::new(records.to_vec());

        for pair in pairs {
            if !arena.both_live(pair.first, pair.second) {
                continue;
            }
            let (Some(first), Some(second)) = (arena.get(pair.first), arena.get(pair.second)) else {
                continue;
            };

            let score_first = self.completeness_score(first);
            let score_second = self.completeness_score(second);
            let loser = if score_first >= score_second {
                pair.second
            } else {
                pair.first
            };

            debug!(
                first = pair.first.index(),
                second = pair.second.index(),
                score_first,
                score_second,
                removed = loser.index(),
                "resolved duplicate pair"
            );
            arena.remove(loser);
        }

        MergeOutcome::from_arena(arena, 0)
    }

    /// Cross-source merge: the first record of each pair survives and takes
    /// every field it is missing from the second, which is removed. A
    /// populated field is never overwritten.
    pub fn merge_cross_source(
        &self,
        pairs: &[DuplicateCandidate],
        records: &[UnifiedRecord],
    ) -> MergeOutcome<UnifiedRecord> {
        let mut arena = RecordArena::new(records.to_vec());
        let mut fields_filled = 0;

        for pair in pairs {
            if !arena.both_live(pair.first, pair.second) {
                continue;
            }

            let (keep, other) = arena.pair_mut(pair.first, pair.second);
            let filled = keep.fill_missing_from(other);
            debug!(
                kept = pair.first.index(),
                kept_source = %keep.source,
                absorbed = pair.second.index(),
                absorbed_source = %other.source,
                filled,
                "merged cross-source pair"
            );

            fields_filled += filled;
            arena.remove(pair.second);
        }

        MergeOutcome::from_arena(arena, fields_filled)
    }
}

impl Default for RecordMerger {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        name: &'static str,
        fields: usize,
        views: bool,
    }

    impl Completeness for Rec {
        fn populated_fields(&self) -> usize {
            self.fields
        }
        fn has_view_count(&self) -> bool {
            self.views
        }
    }

    fn rec(name: &'static str, fields: usize, views: bool) -> Rec {
        Rec { name, fields, views }
    }

    fn pair(first: usize, second: usize) -> DuplicateCandidate {
        DuplicateCandidate {
            first: RecordId(first),
            second: RecordId(second),
            title_similarity: 1.0,
            artist_similarity: 1.0,
        }
    }

    fn names(records: &[Rec]) -> Vec<&'static str> {
        records.iter().map(|r| r.name).collect()
    }

    fn unified(source: Source) -> UnifiedRecord {
        UnifiedRecord {
            track_name: "Song".to_string(),
            artist_name: "Artist".to_string(),
            source,
            chart_name: None,
            chart_position: None,
            chart_date: None,
            additional_info: None,
            video_id: None,
            view_count: None,
            like_count: None,
            comment_count: None,
            duration_seconds: None,
            tags: None,
            published_at: None,
            original_title: "Song".to_string(),
            original_artist: "Artist".to_string(),
        }
    }

    #[test]
    fn test_resolve_keeps_more_complete() {
        let records = vec![rec("a", 3, false), rec("b", 5, false), rec("c", 1, false)];
        let outcome = RecordMerger::default().resolve(&[pair(0, 1)], &records);
        assert_eq!(names(&outcome.survivors), vec!["b", "c"]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_resolve_tie_keeps_first() {
        let records = vec![rec("a", 4, false), rec("b", 4, false)];
        let outcome = RecordMerger::default().resolve(&[pair(0, 1)], &records);
        assert_eq!(names(&outcome.survivors), vec!["a"]);
    }

    #[test]
    fn test_view_count_bonus_outweighs_fields() {
        // 4 + 10 beats 13
        let records = vec![rec("chart", 13, false), rec("video", 4, true)];
        let outcome = RecordMerger::default().resolve(&[pair(0, 1)], &records);
        assert_eq!(names(&outcome.survivors), vec!["video"]);

        let config = CleaningConfig {
            view_count_bonus: 0,
            ..CleaningConfig::default()
        };
        let outcome = RecordMerger::new(&config).resolve(&[pair(0, 1)], &records);
        assert_eq!(names(&outcome.survivors), vec!["chart"]);
    }

    #[test]
    fn test_resolve_skips_removed() {
        // (0,1) removes 0; (0,2) is skipped, so 2 survives even though 0 beat it
        let records = vec![rec("a", 2, false), rec("b", 5, false), rec("c", 1, false)];
        let outcome = RecordMerger::default().resolve(&[pair(0, 1), pair(0, 2)], &records);
        assert_eq!(names(&outcome.survivors), vec!["b", "c"]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_resolve_ignores_out_of_range_pairs() {
        let records = vec![rec("a", 1, false)];
        let outcome = RecordMerger::default().resolve(&[pair(0, 7)], &records);
        assert_eq!(names(&outcome.survivors), vec!["a"]);
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn test_cross_source_fills_without_overwriting() {
        let mut chart = unified(Source::Chart);
        chart.chart_position = Some(1);
        chart.view_count = Some(5);

        let mut video = unified(Source::Video);
        video.view_count = Some(1_000_000);
        video.video_id = Some("abc123".to_string());
        video.duration_seconds = Some(233);

        let outcome = RecordMerger::default().merge_cross_source(&[pair(0, 1)], &[chart, video]);
        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.fields_filled, 2);

        let merged = &outcome.survivors[0];
        assert_eq!(merged.source, Source::Chart);
        assert_eq!(merged.chart_position, Some(1));
        assert_eq!(merged.view_count, Some(5));
        assert_eq!(merged.video_id.as_deref(), Some("abc123"));
        assert_eq!(merged.duration_seconds, Some(233));
    }

    #[test]
    fn test_cross_source_first_write_wins() {
        let first = unified(Source::Chart);
        let mut second = unified(Source::Video);
        second.video_id = Some("first".to_string());
        let mut third = unified(Source::Video);
        third.video_id = Some("second".to_string());
        third.like_count = Some(10);

        let outcome = RecordMerger::default()
            .merge_cross_source(&[pair(0, 1), pair(0, 2), pair(1, 2)], &[first, second, third]);
        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.survivors[0].video_id.as_deref(), Some("first"));
        assert_eq!(outcome.survivors[0].like_count, Some(10));
    }

    #[test]
    fn test_arena() {
        let mut arena = RecordArena::new(vec!["a", "b", "c"]);
        assert!(arena.both_live(RecordId(0), RecordId(2)));
        arena.remove(RecordId(1));
        assert!(arena.is_removed(RecordId(1)));
        assert!(!arena.both_live(RecordId(0), RecordId(1)));
        assert!(!arena.both_live(RecordId(0), RecordId(0)));
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.into_survivors(), vec!["a", "c"]);
    }
}
