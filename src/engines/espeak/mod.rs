//! espeak-ng speech engine.
//!
//! Speech is produced by running the `espeak-ng` program, which plays audio
//! on the default output device. Nothing is synthesized in-process.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Parameter Mapping
//!
//! | Reader parameter | espeak-ng flag | Notes |
//! |---|---|---|
//! | rate (50–300) | `-s` | words per minute, passed through |
//! | volume (0.0–1.0) | `-a` | amplitude, `volume × 100` |
//! | voice id | `-v` | language code from `espeak-ng --voices` |
//!
//! # Examples
//!
//! ```rust,no_run
//! use tts_reader::{engines::espeak::EspeakEngine, PlaybackParamsBuilder, SpeechEngine};
//!
//! let engine = EspeakEngine::new();
//! for voice in engine.voices()? {
//!     println!("{} ({})", voice.name, voice.id);
//! }
//!
//! let params = PlaybackParamsBuilder::default()
//!     .rate(180)
//!     .volume(0.8)
//!     .voice_id("en-gb")
//!     .build()?;
//! engine.speak("Hello from espeak-ng!", &params)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod voices;

pub use engine::EspeakEngine;
