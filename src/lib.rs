//! # tts-reader
//!
//! A block-by-block text-to-speech reader. Text is split into blocks on blank
//! lines, a cursor walks the blocks on demand, and each block is handed to an
//! external speech engine together with the user's rate, volume and voice.
//!
//! ## Features
//!
//! - **Block navigation**: back / next / goto over one or more loaded files
//! - **Preferences**: rate, volume, voice and recent files persisted as JSON
//! - **Two front-ends**: a synchronous command-line REPL and an asynchronous
//!   [`session::ReadingSession`] for form-based front-ends
//! - **espeak-ng backend**: enabled by the default `espeak` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tts_reader::{blocks::split_blocks, engines::espeak::EspeakEngine, SpeechEngine};
//! use tts_reader::PlaybackParamsBuilder;
//!
//! let engine = EspeakEngine::new();
//! let params = PlaybackParamsBuilder::default().rate(170).build()?;
//!
//! for block in split_blocks("Hello\n\nWorld") {
//!     engine.speak(&block, &params)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod blocks;
pub mod command;
pub mod dispatch;
pub mod engines;
pub mod error;
pub mod import;
pub mod navigator;
pub mod prefs;
pub mod repl;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use derive_builder::Builder;

pub use error::{ReaderError, SpeechError};
use prefs::{DEFAULT_RATE, DEFAULT_VOLUME, RATE_RANGE, VOLUME_RANGE};

/// Reported gender of an engine voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        f.write_str(label)
    }
}

/// A voice as enumerated by a [`SpeechEngine`].
///
/// The reader never mutates these; it only displays them and stores the `id`
/// in the preferences. Gender and age are platform dependent and may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceDescriptor {
    /// Opaque engine identifier, passed back to [`SpeechEngine::speak`].
    pub id: String,
    /// Human readable voice name.
    pub name: String,
    /// Language codes the voice can speak, primary language first.
    pub languages: Vec<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
}

impl VoiceDescriptor {
    /// Comma separated language list, or `"unknown"` when the engine gave none.
    pub fn language_label(&self) -> String {
        if self.languages.is_empty() {
            "unknown".to_string()
        } else {
            self.languages.join(", ")
        }
    }

    /// Multi-line description used by voice detail panels.
    pub fn details(&self) -> String {
        let gender = self
            .gender
            .map(|g| g.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let age = self
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "ID: {}\nName: {}\nLanguage: {}\nGender: {gender}\nAge: {age}",
            self.id,
            self.name,
            self.languages.first().map(String::as_str).unwrap_or("unknown"),
        )
    }

    fn matches_hint(&self, hint: &str) -> bool {
        let hint = hint.to_lowercase();
        self.name.to_lowercase().contains(&hint)
            || self.id.to_lowercase().contains(&hint)
            || self.languages.iter().any(|l| l.to_lowercase() == hint)
    }
}

/// Playback parameters for one speak request.
///
/// Build with [`PlaybackParamsBuilder`]; the builder rejects a rate outside
/// 50–300 and a volume outside 0.0–1.0.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct PlaybackParams {
    /// Speaking rate in words per minute.
    pub rate: u32,
    /// Volume from 0.0 (silent) to 1.0 (full).
    pub volume: f32,
    /// Engine voice id; `None` uses the engine default.
    #[builder(setter(into, strip_option))]
    pub voice_id: Option<String>,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
            voice_id: None,
        }
    }
}

impl PlaybackParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.rate {
            if !RATE_RANGE.contains(&rate) {
                return Err(format!(
                    "rate {rate} is outside {}-{}",
                    RATE_RANGE.start(),
                    RATE_RANGE.end()
                ));
            }
        }
        if let Some(volume) = self.volume {
            if !VOLUME_RANGE.contains(&volume) {
                return Err(format!(
                    "volume {volume} is outside {:.1}-{:.1}",
                    VOLUME_RANGE.start(),
                    VOLUME_RANGE.end()
                ));
            }
        }
        Ok(())
    }
}

/// Common interface for external speech engines.
///
/// Engines are shared between the interactive thread and the dispatch worker,
/// so `stop` must be callable while `speak` is blocked on another thread.
pub trait SpeechEngine: Send + Sync {
    /// Short engine identifier for logs.
    fn name(&self) -> &str;

    /// Enumerate the voices the engine offers.
    fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError>;

    /// Speak `text` and block until playback finishes, fails or is stopped.
    ///
    /// A playback cut short by [`SpeechEngine::stop`] returns `Ok(())`; callers
    /// that care track the stop request themselves.
    fn speak(&self, text: &str, params: &PlaybackParams) -> Result<(), SpeechError>;

    /// Ask the engine to halt the current playback.
    ///
    /// A stop that arrives before playback has started is held and cuts the
    /// next `speak` short, until [`SpeechEngine::clear_stop`] discards it.
    fn stop(&self) -> Result<(), SpeechError>;

    /// Discard a stop request that no playback consumed.
    fn clear_stop(&self) {}
}

/// Why the resolved voice differs from what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceWarning {
    /// The stored voice id is no longer offered by the engine.
    UnknownVoice(String),
    /// No voice matched the preferred-voice hint.
    NoPreferredVoice(String),
}

impl fmt::Display for VoiceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceWarning::UnknownVoice(id) => {
                write!(f, "voice id '{id}' not found, using the default voice")
            }
            VoiceWarning::NoPreferredVoice(hint) => {
                write!(f, "no voice matching '{hint}' found, using the default voice")
            }
        }
    }
}

/// Result of [`initialize`]: parameters ready for `speak`, plus any voice fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Initialized {
    pub params: PlaybackParams,
    pub warning: Option<VoiceWarning>,
}

/// Pick the voice id to use from the engine's voice list.
///
/// A requested id is used only if the engine still offers it. Without a
/// request, the first voice matching `preferred` (name, id or language) wins.
/// Anything else falls back to the engine default (`None`).
pub fn resolve_voice(
    voices: &[VoiceDescriptor],
    requested: Option<&str>,
    preferred: Option<&str>,
) -> (Option<String>, Option<VoiceWarning>) {
    if let Some(id) = requested {
        if voices.iter().any(|v| v.id == id) {
            return (Some(id.to_string()), None);
        }
        return (None, Some(VoiceWarning::UnknownVoice(id.to_string())));
    }

    match preferred {
        Some(hint) => match voices.iter().find(|v| v.matches_hint(hint)) {
            Some(voice) => (Some(voice.id.clone()), None),
            None => (None, Some(VoiceWarning::NoPreferredVoice(hint.to_string()))),
        },
        None => (None, None),
    }
}

/// Prepare playback parameters against a live engine.
///
/// Fails with an initialization error when the parameters are out of range or
/// the engine cannot enumerate its voices. An unknown voice id is not an error:
/// it falls back to the default voice and is reported in
/// [`Initialized::warning`].
pub fn initialize(
    engine: &dyn SpeechEngine,
    rate: u32,
    volume: f32,
    voice_id: Option<&str>,
    preferred: Option<&str>,
) -> Result<Initialized, SpeechError> {
    let mut params = PlaybackParamsBuilder::default()
        .rate(rate)
        .volume(volume)
        .build()
        .map_err(|e| SpeechError::Init(e.to_string()))?;

    let voices = engine.voices()?;
    let (voice, warning) = resolve_voice(&voices, voice_id, preferred);
    if let Some(w) = &warning {
        log::warn!("{}: {w}", engine.name());
    }
    params.voice_id = voice;

    Ok(Initialized { params, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{voice, ScriptedEngine};

    #[test]
    fn builder_rejects_out_of_range_rate() {
        let err = PlaybackParamsBuilder::default().rate(400).build();
        assert!(err.is_err());
        let ok = PlaybackParamsBuilder::default().rate(300).volume(0.0).build();
        assert_eq!(ok.unwrap().rate, 300);
    }

    #[test]
    fn builder_defaults_match_preferences_defaults() {
        let params = PlaybackParamsBuilder::default().build().unwrap();
        assert_eq!(params, PlaybackParams::default());
        assert_eq!(params.rate, 150);
        assert_eq!(params.volume, 1.0);
        assert_eq!(params.voice_id, None);
    }

    #[test]
    fn requested_voice_is_kept_when_offered() {
        let voices = vec![voice("en-gb", "English"), voice("cmn", "Chinese (Mandarin)")];
        let (id, warning) = resolve_voice(&voices, Some("cmn"), None);
        assert_eq!(id.as_deref(), Some("cmn"));
        assert_eq!(warning, None);
    }

    #[test]
    fn unknown_voice_falls_back_to_default() {
        let voices = vec![voice("en-gb", "English")];
        let (id, warning) = resolve_voice(&voices, Some("gone"), Some("English"));
        assert_eq!(id, None);
        assert_eq!(warning, Some(VoiceWarning::UnknownVoice("gone".into())));
    }

    #[test]
    fn preferred_hint_matches_name_case_insensitively() {
        let voices = vec![voice("en-gb", "English"), voice("cmn", "Chinese (Mandarin)")];
        let (id, _) = resolve_voice(&voices, None, Some("mandarin"));
        assert_eq!(id.as_deref(), Some("cmn"));

        let (id, warning) = resolve_voice(&voices, None, Some("Klingon"));
        assert_eq!(id, None);
        assert!(matches!(warning, Some(VoiceWarning::NoPreferredVoice(_))));
    }

    #[test]
    fn initialize_reports_engine_failure() {
        let engine = ScriptedEngine::new();
        engine.fail_voices("no audio device");
        let err = initialize(&engine, 150, 1.0, None, None).unwrap_err();
        assert!(matches!(err, SpeechError::Init(_)));
    }

    #[test]
    fn initialize_rejects_out_of_range_volume() {
        let engine = ScriptedEngine::new();
        let err = initialize(&engine, 150, 1.5, None, None).unwrap_err();
        assert!(matches!(err, SpeechError::Init(_)));
    }

    #[test]
    fn voice_details_fill_unknowns() {
        let v = voice("en-gb", "English");
        let details = v.details();
        assert!(details.contains("ID: en-gb"));
        assert!(details.contains("Gender: unknown"));
        assert!(details.contains("Age: unknown"));
    }
}
