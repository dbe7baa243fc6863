//! Artist/track extraction from free-text video titles.
//!
//! Video titles usually embed both the artist and the track ("Dua Lipa -
//! Levitating"). The patterns below are tried in a fixed order against the
//! whole cleaned title and the first one that matches decides the outcome.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CleaningConfig;

/// Which title shape produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePattern {
    /// `Artist - Track`, hyphen / en-dash / em-dash, optional trailing group
    Dashed,
    /// `Artist "Track"`, straight or curly quotes
    Quoted,
    /// `Artist: Track`
    Colon,
    /// `X by Y`
    By,
}

impl TitlePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            TitlePattern::Dashed => "dashed",
            TitlePattern::Quoted => "quoted",
            TitlePattern::Colon => "colon",
            TitlePattern::By => "by",
        }
    }
}

/// Title patterns in priority order. Group 1 is always read as the artist and
/// group 2 as the track, including for [`TitlePattern::By`].
pub static TITLE_SHAPES: Lazy<Vec<(TitlePattern, Regex)>> = Lazy::new(|| {
    vec![
        (
            TitlePattern::Dashed,
            Regex::new(r"(?i)^(.+?)\s*[-–—]\s*(.+?)(?:\s*\(.*\))?(?:\s*\[.*\])?$").unwrap(),
        ),
        (
            TitlePattern::Quoted,
            Regex::new(r#"(?i)^(.+?)\s*["“”]\s*(.+?)\s*["“”]\s*"#).unwrap(),
        ),
        (
            TitlePattern::Colon,
            Regex::new(r"(?i)^(.+?)\s*:\s*(.+?)(?:\s*\(.*\))?$").unwrap(),
        ),
        (
            TitlePattern::By,
            Regex::new(r"(?i)^(.+?)\s+by\s+(.+?)(?:\s*\(.*\))?$").unwrap(),
        ),
    ]
});

/// Result of splitting a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted artist, `None` when no usable pattern matched.
    pub artist: Option<String>,
    /// Extracted track, or the input title when extraction failed.
    pub track: String,
    /// Pattern that produced `artist`.
    pub pattern: Option<TitlePattern>,
}

impl Extraction {
    fn fallback(title: &str) -> Self {
        Self {
            artist: None,
            track: title.to_string(),
            pattern: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.artist.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TitleArtistExtractor {
    /// Lowercased exclusion terms.
    exclusion_terms: Vec<String>,
}

impl TitleArtistExtractor {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            exclusion_terms: config
                .exclusion_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// Split `title` into (artist, track).
    ///
    /// Only the first matching pattern is considered. If its artist contains
    /// an exclusion term ("official", "video", ...) the whole extraction
    /// fails and the title comes back unchanged.
    pub fn extract(&self, title: &str) -> Extraction {
        if title.is_empty() {
            return Extraction::fallback(title);
        }

        let Some((pattern, caps)) = TITLE_SHAPES
            .iter()
            .find_map(|(pattern, re)| re.captures(title).map(|caps| (*pattern, caps)))
        else {
            return Extraction::fallback(title);
        };

        let artist = caps.get(1).map_or("", |m| m.as_str()).trim();
        let track = caps.get(2).map_or("", |m| m.as_str()).trim();

        if artist.is_empty() || track.is_empty() || self.is_excluded(artist) {
            return Extraction::fallback(title);
        }

        Extraction {
            artist: Some(artist.to_string()),
            track: track.to_string(),
            pattern: Some(pattern),
        }
    }

    fn is_excluded(&self, artist: &str) -> bool {
        let lower = artist.to_lowercase();
        self.exclusion_terms.iter().any(|term| lower.contains(term.as_str()))
    }
}

impl Default for TitleArtistExtractor {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}
