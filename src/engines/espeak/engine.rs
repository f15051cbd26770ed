use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use super::voices::parse_voice_table;
use crate::{PlaybackParams, SpeechEngine, SpeechError, VoiceDescriptor};

const DEFAULT_BINARY: &str = "espeak-ng";

/// How often a blocked `speak` checks whether espeak-ng has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// espeak-ng text-to-speech engine.
///
/// # Quick Start
///
/// ```rust,no_run
/// use tts_reader::{engines::espeak::EspeakEngine, PlaybackParams, SpeechEngine};
///
/// // Uses system espeak-ng from PATH
/// let engine = EspeakEngine::new();
/// engine.speak("Hello, world!", &PlaybackParams::default())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Bundled espeak-ng
///
/// ```rust,no_run
/// use tts_reader::engines::espeak::EspeakEngine;
/// use std::path::PathBuf;
///
/// // Point to a bundled espeak-ng binary and data directory
/// let engine = EspeakEngine::with_espeak(
///     Some(PathBuf::from("/app/resources/espeak-ng/espeak-ng")),
///     Some(PathBuf::from("/app/resources/espeak-ng-data")),
/// );
/// ```
pub struct EspeakEngine {
    bin_path: PathBuf,
    data_path: Option<PathBuf>,
    /// The espeak-ng process currently speaking, if any.
    child: Mutex<Option<Child>>,
    stop_requested: AtomicBool,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(None, None)
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    ///
    /// Either path can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            data_path,
            child: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Whether the espeak-ng binary can be started at all.
    pub fn is_available(&self) -> bool {
        self.command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        if let Some(data) = &self.data_path {
            cmd.arg(format!("--path={}", data.display()));
        }
        cmd
    }

    fn spawn_error(&self, e: io::Error) -> SpeechError {
        if e.kind() == io::ErrorKind::NotFound {
            SpeechError::NotFound(self.bin_path.clone())
        } else {
            SpeechError::Init(format!("failed to start {}: {e}", self.bin_path.display()))
        }
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for the registered child without holding the lock across sleeps,
    /// so `stop` can get in.
    fn wait_for_child(&self) -> Result<(ExitStatus, Child), SpeechError> {
        loop {
            {
                let mut slot = self.lock_child();
                let child = slot.as_mut().ok_or_else(|| {
                    SpeechError::Synthesis("espeak-ng process went missing".to_string())
                })?;
                if let Some(status) = child.try_wait()? {
                    let child = slot.take().ok_or_else(|| {
                        SpeechError::Synthesis("espeak-ng process went missing".to_string())
                    })?;
                    return Ok((status, child));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Map a 0.0–1.0 volume onto espeak-ng's amplitude, where 100 is normal.
fn amplitude(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// espeak-ng reads stdin line by line; a missing final newline can clip the
/// last word.
fn canonicalize_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        DEFAULT_BINARY
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        let output = self
            .command()
            .arg("--voices")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Init(format!(
                "espeak-ng --voices exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }

        let voices = parse_voice_table(&String::from_utf8_lossy(&output.stdout));
        log::debug!("espeak-ng reported {} voices", voices.len());
        Ok(voices)
    }

    fn speak(&self, text: &str, params: &PlaybackParams) -> Result<(), SpeechError> {
        let mut cmd = self.command();
        cmd.arg("-s")
            .arg(params.rate.to_string())
            .arg("-a")
            .arg(amplitude(params.volume).to_string());
        if let Some(voice) = &params.voice_id {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!(
            "speaking {} chars at rate {} volume {} voice {:?}",
            text.chars().count(),
            params.rate,
            params.volume,
            params.voice_id
        );

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdin = child.stdin.take();
        {
            let mut slot = self.lock_child();
            let child = slot.insert(child);
            // A stop that came in before the child existed.
            if self.stop_requested.load(Ordering::SeqCst) {
                log::debug!("stop pending, killing espeak-ng before it speaks");
                let _ = child.kill();
            }
        }

        if let Some(mut stdin) = stdin {
            let payload = canonicalize_stdin_payload(text);
            match stdin.write_all(payload.as_bytes()) {
                // espeak-ng was stopped or died before reading everything.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    let _ = self.stop();
                    let _ = self.wait_for_child();
                    return Err(SpeechError::Io(e));
                }
                Ok(()) => {}
            }
        }

        let (status, mut child) = self.wait_for_child()?;
        let stopped = self.stop_requested.swap(false, Ordering::SeqCst);
        if status.success() {
            return Ok(());
        }
        if stopped {
            log::info!("espeak-ng playback stopped");
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        Err(SpeechError::Synthesis(format!(
            "espeak-ng exited with code {:?}: {}",
            status.code(),
            stderr.trim()
        )))
    }

    fn stop(&self) -> Result<(), SpeechError> {
        let mut slot = self.lock_child();
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(child) = slot.as_mut() {
            match child.kill() {
                Ok(()) => {}
                // Already exited; `speak` will reap it.
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(SpeechError::Io(e)),
            }
        }
        Ok(())
    }

    fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }
}
