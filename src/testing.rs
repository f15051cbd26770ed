//! In-memory speech engine for unit tests.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::{PlaybackParams, SpeechEngine, SpeechError, VoiceDescriptor};

pub(crate) fn voice(id: &str, name: &str) -> VoiceDescriptor {
    VoiceDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        languages: vec![id.to_string()],
        gender: None,
        age: None,
    }
}

#[derive(Default)]
struct State {
    spoken: Vec<(String, PlaybackParams)>,
    voices: Vec<VoiceDescriptor>,
    voices_error: Option<String>,
    speak_error: Option<String>,
    hold: bool,
    in_flight: bool,
    stop_requested: bool,
}

/// Records what it is asked to say. Can fail on demand, or hold every
/// playback until `release` or `stop` is called. A stop sent before playback
/// starts is kept for the next `speak`, as the espeak engine does.
pub(crate) struct ScriptedEngine {
    state: Mutex<State>,
    changed: Condvar,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                voices: vec![voice("en-gb", "English"), voice("cmn", "Chinese (Mandarin)")],
                ..State::default()
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn fail_voices(&self, message: &str) {
        self.lock().voices_error = Some(message.to_string());
    }

    pub(crate) fn fail_speak(&self, message: Option<&str>) {
        self.lock().speak_error = message.map(str::to_string);
    }

    pub(crate) fn hold_playback(&self) {
        self.lock().hold = true;
    }

    /// Let a held playback finish normally.
    pub(crate) fn release(&self) {
        self.lock().hold = false;
        self.changed.notify_all();
    }

    pub(crate) fn spoken(&self) -> Vec<String> {
        self.lock().spoken.iter().map(|(t, _)| t.clone()).collect()
    }

    pub(crate) fn last_params(&self) -> Option<PlaybackParams> {
        self.lock().spoken.last().map(|(_, p)| p.clone())
    }

    /// Block until a held playback is in flight.
    pub(crate) fn wait_until_speaking(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.in_flight {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.changed.wait_timeout(state, deadline - now).unwrap().0;
        }
        true
    }
}

impl SpeechEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        let state = self.lock();
        match &state.voices_error {
            Some(msg) => Err(SpeechError::Init(msg.clone())),
            None => Ok(state.voices.clone()),
        }
    }

    fn speak(&self, text: &str, params: &PlaybackParams) -> Result<(), SpeechError> {
        let mut state = self.lock();
        if let Some(msg) = &state.speak_error {
            return Err(SpeechError::Synthesis(msg.clone()));
        }
        state.spoken.push((text.to_string(), params.clone()));

        state.in_flight = true;
        self.changed.notify_all();
        while state.hold && !state.stop_requested {
            state = self.changed.wait(state).unwrap();
        }
        state.in_flight = false;
        state.stop_requested = false;
        Ok(())
    }

    fn stop(&self) -> Result<(), SpeechError> {
        self.lock().stop_requested = true;
        self.changed.notify_all();
        Ok(())
    }

    fn clear_stop(&self) {
        self.lock().stop_requested = false;
    }
}
