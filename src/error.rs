use std::path::PathBuf;

use crate::command::ParseError;
use crate::dispatch::DispatchError;
use crate::import::ImportError;
use crate::navigator::NavError;
use crate::prefs::PrefsError;

/// Failures reported by a [`crate::SpeechEngine`].
#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error(
        "speech program '{0}' not found. Install espeak-ng: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    NotFound(PathBuf),
    #[error("failed to initialize speech engine: {0}")]
    Init(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the reader front-ends.
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Prefs(#[from] PrefsError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Navigation(#[from] NavError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no text to read")]
    EmptyText,
    /// Navigation buttons are off until the next read completes.
    #[error("navigation is disabled until a block finishes reading")]
    ControlsDisabled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::convert::Infallible> for ReaderError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}
