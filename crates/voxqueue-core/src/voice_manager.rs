//! Voice catalog and the language/accent/gender filters used to pick a voice.

use crate::error::{VoxqueueError, VoxqueueResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Gender classification for voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male voice
    Male,
    /// Female voice
    Female,
    /// Neutral voice
    Neutral,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

impl FromStr for Gender {
    type Err = VoxqueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "neutral" | "n" => Ok(Self::Neutral),
            _ => Err(VoxqueueError::validation(format!(
                "Unknown gender '{s}', expected male, female or neutral"
            ))),
        }
    }
}

/// A selectable synthesis voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceOption {
    /// Identifier sent to the synthesis service
    pub id: String,
    /// Display name
    pub name: String,
    /// Voice gender
    pub gender: Gender,
    /// Language, e.g. "English"
    pub language: String,
    /// Accent within the language, e.g. "British"
    pub accent: String,
}

impl VoiceOption {
    fn new(id: &str, name: &str, gender: Gender, language: &str, accent: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            language: language.to_string(),
            accent: accent.to_string(),
        }
    }
}

impl std::fmt::Display for VoiceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.gender)
    }
}

static BUILTIN_VOICES: Lazy<Vec<VoiceOption>> = Lazy::new(|| {
    use Gender::{Female, Male, Neutral};
    vec![
        VoiceOption::new("Kore", "Kore", Female, "Portuguese", "Brazil"),
        VoiceOption::new("Charon", "Charon", Male, "Portuguese", "Brazil"),
        VoiceOption::new("Luna", "Luna", Female, "Portuguese", "Brazil"),
        VoiceOption::new("Sol", "Sol", Male, "Portuguese", "Brazil"),
        VoiceOption::new("Aria", "Aria", Female, "Portuguese", "Brazil"),
        VoiceOption::new("Leo", "Leo", Male, "Portuguese", "Brazil"),
        VoiceOption::new("pt-PT-Standard-A", "Sofia", Female, "Portuguese", "Portugal"),
        VoiceOption::new("pt-PT-Standard-B", "Diogo", Male, "Portuguese", "Portugal"),
        VoiceOption::new("pt-PT-Standard-C", "Catarina", Female, "Portuguese", "Portugal"),
        VoiceOption::new("pt-PT-Standard-D", "Miguel", Male, "Portuguese", "Portugal"),
        VoiceOption::new("Puck", "Puck", Male, "English", "American"),
        VoiceOption::new("Zephyr", "Zephyr", Female, "English", "American"),
        VoiceOption::new("Fenrir", "Fenrir", Neutral, "English", "American"),
        VoiceOption::new("en-GB-Standard-A", "Arthur", Male, "English", "British"),
        VoiceOption::new("en-GB-Standard-B", "Abigail", Female, "English", "British"),
    ]
});

/// Ordered voice catalog
#[derive(Debug, Clone)]
pub struct VoiceManager {
    voices: Vec<VoiceOption>,
}

impl VoiceManager {
    /// Catalog of the built-in voices
    #[must_use]
    pub fn new() -> Self {
        Self::with_voices(BUILTIN_VOICES.clone())
    }

    /// Catalog of custom voices
    #[must_use]
    pub fn with_voices(voices: Vec<VoiceOption>) -> Self {
        Self { voices }
    }

    /// All voices in catalog order
    #[must_use]
    pub fn voices(&self) -> &[VoiceOption] {
        &self.voices
    }

    /// Get a specific voice by ID
    ///
    /// # Errors
    ///
    /// Returns a voice-not-found error for an unknown ID
    pub fn get_voice(&self, voice_id: &str) -> VoxqueueResult<&VoiceOption> {
        self.voices
            .iter()
            .find(|voice| voice.id == voice_id)
            .ok_or_else(|| VoxqueueError::voice_not_found(voice_id))
    }

    /// Distinct languages in order of first appearance
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        distinct(self.voices.iter().map(|voice| voice.language.as_str()))
    }

    /// Distinct accents of a language in order of first appearance
    #[must_use]
    pub fn accents_for(&self, language: &str) -> Vec<&str> {
        distinct(
            self.voices
                .iter()
                .filter(|voice| voice.language.eq_ignore_ascii_case(language))
                .map(|voice| voice.accent.as_str()),
        )
    }

    /// Voices matching a language and accent, optionally narrowed by gender
    #[must_use]
    pub fn filter(&self, language: &str, accent: &str, gender: Option<Gender>) -> Vec<&VoiceOption> {
        self.voices
            .iter()
            .filter(|voice| {
                voice.language.eq_ignore_ascii_case(language)
                    && voice.accent.eq_ignore_ascii_case(accent)
                    && gender.map_or(true, |g| voice.gender == g)
            })
            .collect()
    }

    /// Voices matching whichever criteria are given
    #[must_use]
    pub fn search(
        &self,
        language: Option<&str>,
        accent: Option<&str>,
        gender: Option<Gender>,
    ) -> Vec<&VoiceOption> {
        self.voices
            .iter()
            .filter(|voice| {
                language.map_or(true, |l| voice.language.eq_ignore_ascii_case(l))
                    && accent.map_or(true, |a| voice.accent.eq_ignore_ascii_case(a))
                    && gender.map_or(true, |g| voice.gender == g)
            })
            .collect()
    }

    /// Get voice count
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl Default for VoiceManager {
    fn default() -> Self {
        Self::new()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
