//! All-pairs fuzzy duplicate detection.
//!
//! Every pair `i < j` is scored on title and artist similarity; a pair is a
//! candidate when both scores reach the threshold. Pair scoring runs on the
//! rayon pool, output is always in row-major `(i, j)` order.

use rayon::prelude::*;

use crate::models::RecordId;
use crate::similarity::{lowered, similarity_lowered};

/// Title and artist used to decide whether two records are the same song.
pub trait MatchKey {
    fn match_title(&self) -> &str;
    fn match_artist(&self) -> &str;
}

/// A pair of records judged to be the same song.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateCandidate {
    pub first: RecordId,
    pub second: RecordId,
    pub title_similarity: f64,
    pub artist_similarity: f64,
}

/// Find all duplicate pairs in `records`.
///
/// With `threshold == 1.0` only records whose titles and artists are equal
/// ignoring case are paired.
pub fn find_duplicates<R: MatchKey + Sync>(records: &[R], threshold: f64) -> Vec<DuplicateCandidate> {
    let n = records.len();
    if n < 2 {
        return Vec::new();
    }

    // Lowercase once per record, not once per pair
    let keys: Vec<(Vec<char>, Vec<char>)> = records
        .par_iter()
        .map(|r| (lowered(r.match_title()), lowered(r.match_artist())))
        .collect();

    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let keys = &keys;
            (i + 1..n).filter_map(move |j| {
                let title_similarity = similarity_lowered(&keys[i].0, &keys[j].0);
                if title_similarity < threshold {
                    return None;
                }
                let artist_similarity = similarity_lowered(&keys[i].1, &keys[j].1);
                if artist_similarity < threshold {
                    return None;
                }
                Some(DuplicateCandidate {
                    first: RecordId(i),
                    second: RecordId(j),
                    title_similarity,
                    artist_similarity,
                })
            })
        })
        .collect()
}
