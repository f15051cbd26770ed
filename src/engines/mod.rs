//! Speech engines.
//!
//! This module contains implementations of [`crate::SpeechEngine`].
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `espeak` (default) - espeak-ng, driven as a subprocess

#[cfg(feature = "espeak")]
pub mod espeak;
