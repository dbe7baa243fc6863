//! Cleaning configuration.
//!
//! Every tunable of a pipeline run lives in one [`CleaningConfig`] value that
//! is handed to [`crate::pipeline::UnificationPipeline::new`]. Defaults
//! reproduce the collectors' historical cleaning rules; a TOML file may
//! override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Both title and artist similarity must reach this to call a pair duplicate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Completeness bonus for records carrying a video view count.
pub const DEFAULT_VIEW_COUNT_BONUS: usize = 10;

/// Terms that disqualify an extracted artist ("Official Video - Song" is not an artist).
pub const DEFAULT_EXCLUSION_TERMS: &[&str] =
    &["official", "music", "video", "audio", "lyrics", "hd", "4k"];

/// Title boilerplate patterns (applied in order, case-insensitive).
pub const DEFAULT_TITLE_BOILERPLATE: &[&str] = &[
    r"\(official\s+music\s+video\)",
    r"\(official\s+video\)",
    r"\(official\s+audio\)",
    r"\[official\s+music\s+video\]",
    r"\[official\s+video\]",
    r"\[official\s+audio\]",
    r"\(music\s+video\)",
    r"\(audio\s+only\)",
    r"\(lyric\s+video\)",
    r"\(lyrics\)",
    r"\(hd\)",
    r"\(4k\)",
    r"\(remastered\)",
    r"\s+-\s+topic$",
    r"\s+-\s+official$",
];

/// Literal artist substitutions. Order matters: each rule sees the output of
/// the previous one.
pub const DEFAULT_ARTIST_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("ft.", "feat."),
    ("ft ", "feat. "),
    ("featuring", "feat."),
    (" & ", " and "),
    (" vs ", " vs. "),
    (" x ", " feat. "),
];

// ============================================================================
// Config value
// ============================================================================

/// One literal substring replacement applied to artist names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Minimum title and artist similarity for a duplicate pair, in [0, 1].
    pub similarity_threshold: f64,
    /// Added to the completeness score of records with a known view count.
    pub view_count_bonus: usize,
    /// Case-insensitive substrings that reject an extracted artist.
    pub exclusion_terms: Vec<String>,
    /// Regex sources stripped from titles, in order.
    pub title_boilerplate: Vec<String>,
    /// Literal replacements applied to artist names, in order.
    pub artist_substitutions: Vec<Substitution>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            view_count_bonus: DEFAULT_VIEW_COUNT_BONUS,
            exclusion_terms: DEFAULT_EXCLUSION_TERMS.iter().map(|s| s.to_string()).collect(),
            title_boilerplate: DEFAULT_TITLE_BOILERPLATE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            artist_substitutions: DEFAULT_ARTIST_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| Substitution {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }
}

impl CleaningConfig {
    /// Parse a TOML document. Keys that are absent keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Override the similarity threshold (e.g. from a command-line flag).
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        self.similarity_threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(Error::config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if let Some(empty) = self.artist_substitutions.iter().find(|s| s.from.is_empty()) {
            return Err(Error::config(format!(
                "artist substitution with empty pattern (replacement '{}')",
                empty.to
            )));
        }
        if self.exclusion_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::config("exclusion terms must not be blank"));
        }
        Ok(())
    }
}
