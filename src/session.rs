//! Controller for form-style front-ends.
//!
//! A [`ReadingSession`] holds what a window would show: the loaded blocks, a
//! status line, and whether the previous/next buttons are enabled. Speech runs
//! on a [`Dispatcher`] worker; the front-end calls [`ReadingSession::poll`]
//! from its event loop to pick up results.
//!
//! Navigation is locked while a block is speaking. Previous/next are enabled
//! again only when playback completes, and next stays disabled on the last
//! block.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::blocks::split_blocks;
use crate::dispatch::{DispatchError, DispatchEvent, Dispatcher, RequestId};
use crate::error::ReaderError;
use crate::navigator::{NavError, NavState, Navigator};
use crate::prefs::SharedPreferences;
use crate::{initialize, SpeechEngine, SpeechError, VoiceDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Queued,
    Speaking,
    Finished,
    StopRequested,
    Stopped,
    Failed(String),
}

/// Enabled state of the block navigation buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

pub struct ReadingSession {
    engine: Arc<dyn SpeechEngine>,
    dispatcher: Dispatcher,
    prefs: SharedPreferences,
    preferred_voice: Option<String>,
    navigator: Navigator,
    chunk_mode: bool,
    controls: Controls,
    status: Status,
    pending: Option<RequestId>,
}

impl ReadingSession {
    pub fn new(engine: Arc<dyn SpeechEngine>, prefs: SharedPreferences) -> Result<Self, ReaderError> {
        let dispatcher = Dispatcher::spawn(Arc::clone(&engine))?;
        Ok(Self {
            engine,
            dispatcher,
            prefs,
            preferred_voice: None,
            navigator: Navigator::new(),
            chunk_mode: false,
            controls: Controls::default(),
            status: Status::Ready,
            pending: None,
        })
    }

    /// Voice to prefer when no voice has been chosen (matched against voice
    /// names, ids and languages).
    pub fn with_preferred_voice(mut self, hint: impl Into<String>) -> Self {
        self.preferred_voice = Some(hint.into());
        self
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn is_chunk_mode(&self) -> bool {
        self.chunk_mode
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Current block as `(index, total)`, zero based.
    pub fn position(&self) -> Option<(usize, usize)> {
        if !self.chunk_mode {
            return None;
        }
        self.navigator
            .current()
            .map(|(i, _)| (i, self.navigator.len()))
    }

    /// One-line status text for a status bar.
    pub fn status_text(&self) -> String {
        let position = self.position();
        match (&self.status, position) {
            (Status::Ready, _) => "Ready".to_string(),
            (Status::Queued, _) => "Queued".to_string(),
            (Status::Speaking, Some((i, n))) => format!("Reading block {}/{n}", i + 1),
            (Status::Speaking, None) => "Reading...".to_string(),
            (Status::Finished, Some((i, n))) => format!("Block {}/{n} done", i + 1),
            (Status::Finished, None) => "Reading complete".to_string(),
            (Status::StopRequested, _) => "Stop requested".to_string(),
            (Status::Stopped, _) => "Stopped".to_string(),
            (Status::Failed(reason), _) => format!("Failed: {reason}"),
        }
    }

    pub fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        self.engine.voices()
    }

    pub fn select_voice(&self, voice_id: Option<String>) -> Result<(), ReaderError> {
        self.prefs.update(|p| {
            p.voice_id = voice_id;
            Ok::<_, std::convert::Infallible>(())
        })
    }

    pub fn set_rate(&self, rate: i64) -> Result<(), ReaderError> {
        self.prefs.update(|p| p.set_rate(rate))
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), ReaderError> {
        self.prefs.update(|p| p.set_volume(volume))
    }

    /// Read the whole text in one go, leaving chunk mode.
    pub fn speak_full(&mut self, text: &str) -> Result<(), ReaderError> {
        self.ensure_idle()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ReaderError::EmptyText);
        }
        self.dispatch(text.to_string())?;
        self.chunk_mode = false;
        self.navigator.reset();
        Ok(())
    }

    /// Split the text into blocks and start reading the first one.
    ///
    /// Returns the number of blocks.
    pub fn speak_chunks(&mut self, text: &str) -> Result<usize, ReaderError> {
        self.ensure_idle()?;
        if text.trim().is_empty() {
            return Err(ReaderError::EmptyText);
        }

        let mut navigator = Navigator::new();
        navigator.load(split_blocks(text))?;
        let first = navigator
            .current()
            .map(|(_, block)| block.to_string())
            .ok_or(NavError::NoBlocks)?;

        self.dispatch(first)?;
        let total = navigator.len();
        self.navigator = navigator;
        self.chunk_mode = true;
        Ok(total)
    }

    pub fn prev(&mut self) -> Result<(), ReaderError> {
        self.ensure_navigable()?;
        if matches!(self.position(), Some((0, _))) {
            return Err(NavError::AlreadyFirst.into());
        }
        self.ensure_enabled(self.controls.prev_enabled)?;
        self.move_and_speak(Navigator::back)
    }

    pub fn next(&mut self) -> Result<(), ReaderError> {
        self.ensure_navigable()?;
        if matches!(self.position(), Some((i, n)) if i + 1 >= n) {
            return Err(NavError::AlreadyLast.into());
        }
        self.ensure_enabled(self.controls.next_enabled)?;
        self.move_and_speak(Navigator::step_forward)
    }

    /// Jump to block `n` (1 based) and read it. Available whenever nothing is
    /// speaking, even after a stop.
    pub fn goto(&mut self, n: usize) -> Result<(), ReaderError> {
        self.ensure_navigable()?;
        self.move_and_speak(|nav| nav.goto(n))
    }

    /// Request that the current playback stop. Both navigation buttons are
    /// disabled until the next successful read.
    pub fn stop(&mut self) -> Result<(), ReaderError> {
        self.controls = Controls::default();
        if self.pending.is_some() {
            self.status = Status::StopRequested;
        }
        self.dispatcher.stop()?;
        Ok(())
    }

    /// Apply any finished dispatcher events. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.dispatcher.try_event() {
            self.apply(event);
            handled += 1;
        }
        handled
    }

    /// Block until the pending request finishes or `timeout` passes.
    /// Returns whether the session is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.dispatcher.wait_event(deadline - now) {
                Some(event) => self.apply(event),
                None => break,
            }
        }
        self.pending.is_none()
    }

    fn apply(&mut self, event: DispatchEvent) {
        if Some(event.id()) != self.pending {
            log::debug!("ignoring stale event for request {}", event.id());
            return;
        }
        match event {
            DispatchEvent::Started(_) => {
                if self.status == Status::Queued {
                    self.status = Status::Speaking;
                }
            }
            // Playback ended on its own just as a stop came in.
            DispatchEvent::Completed(_) if self.status == Status::StopRequested => {
                self.pending = None;
                self.status = Status::Stopped;
                self.controls = Controls::default();
            }
            DispatchEvent::Completed(_) => {
                self.pending = None;
                self.status = Status::Finished;
                self.enable_controls();
            }
            DispatchEvent::Stopped(_) => {
                self.pending = None;
                self.status = Status::Stopped;
                self.controls = Controls::default();
            }
            DispatchEvent::Failed { error, .. } => {
                self.pending = None;
                self.status = Status::Failed(error.to_string());
                self.enable_controls();
            }
        }
    }

    fn enable_controls(&mut self) {
        self.controls = match self.position() {
            Some((i, n)) => Controls {
                prev_enabled: i > 0,
                next_enabled: i + 1 < n,
            },
            None => Controls::default(),
        };
    }

    fn ensure_idle(&self) -> Result<(), ReaderError> {
        if self.pending.is_some() {
            return Err(DispatchError::Busy.into());
        }
        Ok(())
    }

    fn ensure_navigable(&self) -> Result<(), ReaderError> {
        if !self.chunk_mode {
            return Err(NavError::NotLoaded.into());
        }
        self.ensure_idle()
    }

    fn ensure_enabled(&self, enabled: bool) -> Result<(), ReaderError> {
        if enabled {
            Ok(())
        } else {
            Err(ReaderError::ControlsDisabled)
        }
    }

    /// Move the cursor with `step` and read the new block. The cursor is put
    /// back if the block cannot be dispatched.
    fn move_and_speak(
        &mut self,
        step: impl FnOnce(&mut Navigator) -> Result<NavState, NavError>,
    ) -> Result<(), ReaderError> {
        let before = self.navigator.current().map(|(i, _)| i);
        step(&mut self.navigator)?;
        let text = match self.navigator.current() {
            Some((_, block)) => block.to_string(),
            None => return Err(NavError::AlreadyLast.into()),
        };

        if let Err(e) = self.dispatch(text) {
            if let Some(i) = before {
                let _ = self.navigator.goto(i + 1);
            }
            return Err(e);
        }
        Ok(())
    }

    fn dispatch(&mut self, text: String) -> Result<RequestId, ReaderError> {
        let prefs = self.prefs.snapshot();
        let init = initialize(
            self.engine.as_ref(),
            prefs.rate,
            prefs.volume,
            prefs.voice_id.as_deref(),
            self.preferred_voice.as_deref(),
        )?;
        let id = self.dispatcher.submit(text, init.params)?;
        self.pending = Some(id);
        self.status = Status::Queued;
        self.controls = Controls::default();
        Ok(id)
    }
}
