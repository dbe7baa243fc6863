//! Text normalization for chart and video records.
//!
//! `normalize` is the shared base step (encoding artifacts, NFKD, whitespace).
//! [`TextNormalizer`] layers the title and artist rules on top of it, using
//! the boilerplate and substitution tables from [`CleaningConfig`].
//!
//! Rule order is part of the contract: every rule sees the output of the
//! previous one.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

use crate::config::{CleaningConfig, Substitution};
use crate::error::Result;

// ============================================================================
// FIXED PATTERNS
// ============================================================================

/// UTF-8 curly quotes that were decoded as Windows-1252 somewhere upstream.
/// Longest sequences first so a prefix never shadows a longer match.
pub const MOJIBAKE_REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "'"),  // â€™  right single quote
    ("\u{e2}\u{20ac}\u{153}", "\""),  // â€œ  left double quote
    ("\u{e2}\u{20ac}\u{9d}", "\""),   // â€\x9d right double quote
    ("\u{e2}\u{20ac}", "\""),         // â€   truncated right double quote
];

/// Bracketed spans ending in a remix/version/edit/mix keyword: "[Club Mix]"
pub static REMIX_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[[^\]]*(?:remix|version|edit|mix)\]").unwrap());

/// Parenthesized spans ending in a remix/version/edit/mix keyword: "(Radio Edit)"
pub static REMIX_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\([^)]*(?:remix|version|edit|mix)\)").unwrap());

/// Regex to collapse whitespace runs into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// YouTube auto-generated channel suffix: "Dua Lipa - Topic"
pub static TOPIC_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*-\s*Topic$").unwrap());

/// Any remaining "feat" / "Feat." / "FEAT" word
pub static FEAT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfeat\b\.?").unwrap());

/// Characters trimmed from both ends of a cleaned title.
const TITLE_EDGE_CHARS: &[char] = &[' ', '-', '\u{2013}', '\u{2014}'];

// ============================================================================
// BASE NORMALIZATION
// ============================================================================

/// Base cleanup shared by titles and artists.
///
/// Replaces mojibake quotes, applies NFKD, collapses whitespace and trims.
/// Idempotent; empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut repaired = text.to_string();
    for (broken, fixed) in MOJIBAKE_REPLACEMENTS {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, fixed);
        }
    }

    let decomposed: String = repaired.nfkd().collect();
    decomposed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize`] for a value that may be missing altogether.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

// ============================================================================
// TITLE / ARTIST CLEANING
// ============================================================================

/// Title and artist cleaner built from a [`CleaningConfig`].
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    title_boilerplate: Vec<Regex>,
    artist_substitutions: Vec<Substitution>,
}

impl TextNormalizer {
    /// Compile the configured boilerplate table (case-insensitive).
    pub fn new(config: &CleaningConfig) -> Result<Self> {
        let title_boilerplate = config
            .title_boilerplate
            .iter()
            .map(|source| RegexBuilder::new(source).case_insensitive(true).build())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            title_boilerplate,
            artist_substitutions: config.artist_substitutions.clone(),
        })
    }

    /// Clean a track or video title.
    /// e.g. "Levitating (Official Music Video)" → "Levitating",
    ///      "Song [Club Mix]" → "Song"
    pub fn clean_title(&self, raw_title: &str) -> String {
        let mut title = normalize(raw_title);
        if title.is_empty() {
            return title;
        }

        for pattern in &self.title_boilerplate {
            title = pattern.replace_all(&title, "").into_owned();
        }

        // Generic remix/version spans, brackets before parentheses
        title = REMIX_BRACKET.replace_all(&title, "").into_owned();
        title = REMIX_PAREN.replace_all(&title, "").into_owned();

        MULTI_SPACE
            .replace_all(&title, " ")
            .trim_matches(TITLE_EDGE_CHARS)
            .to_string()
    }

    /// Clean and standardize an artist or channel name.
    /// e.g. "Ed Sheeran & Justin Bieber" → "Ed Sheeran and Justin Bieber",
    ///      "Dua Lipa - Topic" → "Dua Lipa"
    pub fn clean_artist(&self, raw_artist: &str) -> String {
        let mut artist = normalize(raw_artist);
        if artist.is_empty() {
            return artist;
        }

        // Plain substring replacement, one rule after another
        for sub in &self.artist_substitutions {
            artist = artist.replace(&sub.from, &sub.to);
        }

        artist = TOPIC_SUFFIX.replace(&artist, "").into_owned();
        artist = FEAT_WORD.replace_all(&artist, "feat.").into_owned();

        artist.trim().to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(&CleaningConfig::default()).expect("default boilerplate patterns compile")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Shape   of\tYou \n"), "Shape of You");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some(" a  b ")), "a b");
    }

    #[test]
    fn test_normalize_mojibake_quotes() {
        assert_eq!(normalize("Don\u{e2}\u{20ac}\u{2122}t Stop"), "Don't Stop");
        assert_eq!(
            normalize("\u{e2}\u{20ac}\u{153}Hello\u{e2}\u{20ac}\u{9d}"),
            "\"Hello\""
        );
    }

    #[test]
    fn test_normalize_decomposes() {
        // NFKD splits the accent off and expands compatibility characters
        assert_eq!(normalize("Beyonc\u{e9}"), "Beyonce\u{301}");
        assert_eq!(normalize("\u{fb01}ve"), "five");
        assert_eq!(normalize("a\u{a0}b"), "a b");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Shape of You",
            "  Björk \u{a0} Jóga ",
            "\u{fb01}\u{fb02} \u{bd}",
            "Don\u{e2}\u{20ac}\u{2122}t",
            "\u{e2}\u{20ac}",
            "!!! ... ???",
            "東京 \u{3000} 事変",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_clean_title_boilerplate() {
        let n = TextNormalizer::default();
        assert_eq!(n.clean_title("Levitating (Official Music Video)"), "Levitating");
        assert_eq!(n.clean_title("Song [OFFICIAL VIDEO]"), "Song");
        assert_eq!(n.clean_title("Song (Lyric Video) (HD)"), "Song");
        assert_eq!(n.clean_title("Song (4K) (Remastered)"), "Song");
        assert_eq!(n.clean_title("Song - Topic"), "Song");
        assert_eq!(n.clean_title("Song - Official"), "Song");
    }

    #[test]
    fn test_clean_title_no_residue() {
        let n = TextNormalizer::default();
        assert_eq!(
            n.clean_title("Artist - Song (Official Music Video)"),
            n.clean_title("Artist - Song")
        );
        assert_eq!(n.clean_title("Artist - Song"), "Artist - Song");
    }

    #[test]
    fn test_clean_title_remix_spans() {
        let n = TextNormalizer::default();
        assert_eq!(n.clean_title("Song (Radio Edit)"), "Song");
        assert_eq!(n.clean_title("Song [Club Mix]"), "Song");
        assert_eq!(n.clean_title("Song (Acoustic Version) [Extended Remix]"), "Song");
        // Keyword must close the span
        assert_eq!(n.clean_title("Song (Remix Radio)"), "Song (Remix Radio)");
    }

    #[test]
    fn test_clean_title_trims_dashes() {
        let n = TextNormalizer::default();
        assert_eq!(n.clean_title("— Song –"), "Song");
        assert_eq!(n.clean_title("(Official Audio)"), "");
        assert_eq!(n.clean_title("---"), "");
    }

    #[test]
    fn test_clean_artist_standardization() {
        let n = TextNormalizer::default();
        assert_eq!(n.clean_artist("Ed Sheeran & Justin Bieber"), "Ed Sheeran and Justin Bieber");
        assert_eq!(n.clean_artist("Drake ft. Rihanna"), "Drake feat. Rihanna");
        assert_eq!(n.clean_artist("Drake featuring Rihanna"), "Drake feat. Rihanna");
        assert_eq!(n.clean_artist("Drake Feat Rihanna"), "Drake feat. Rihanna");
        assert_eq!(n.clean_artist("Major Lazer x DJ Snake"), "Major Lazer feat. DJ Snake");
        assert_eq!(n.clean_artist("Artist vs Other"), "Artist vs. Other");
    }

    #[test]
    fn test_clean_artist_topic_suffix() {
        let n = TextNormalizer::default();
        assert_eq!(n.clean_artist("Dua Lipa - Topic"), "Dua Lipa");
        assert_eq!(n.clean_artist("Dua Lipa-topic"), "Dua Lipa");
        assert_eq!(n.clean_artist(""), "");
    }

    #[test]
    fn test_clean_artist_literal_substitutions_are_order_sensitive() {
        let n = TextNormalizer::default();
        // "ft " also hits the tail of "Swift " - legacy behavior kept as-is
        assert_eq!(n.clean_artist("Taylor Swift ft Kendrick"), "Taylor Swifeat. feat. Kendrick");
    }

    #[test]
    fn test_custom_boilerplate_table() {
        let config = CleaningConfig {
            title_boilerplate: vec![r"\(visualizer\)".to_string()],
            ..CleaningConfig::default()
        };
        let n = TextNormalizer::new(&config).unwrap();
        assert_eq!(n.clean_title("Song (Visualizer)"), "Song");
        // Default phrases are no longer stripped
        assert_eq!(n.clean_title("Song (HD)"), "Song (HD)");
    }

    #[test]
    fn test_invalid_boilerplate_pattern() {
        let config = CleaningConfig {
            title_boilerplate: vec![r"(unclosed".to_string()],
            ..CleaningConfig::default()
        };
        assert!(TextNormalizer::new(&config).is_err());
    }

    #[test]
    fn test_total_over_odd_input() {
        let n = TextNormalizer::default();
        for s in ["", "   ", "()", "[]", "-–—", "???", "\u{0}", "ééé", "🎵🎵"] {
            let _ = n.clean_title(s);
            let _ = n.clean_artist(s);
        }
    }
}
