//! Interactive command-line front-end.
//!
//! Fully synchronous: every speak call blocks until playback ends. Free text is
//! read aloud as typed; `:file` switches to chunk mode, where Enter reads the
//! current block and moves on. Reaching the end of the blocks drops back to
//! manual input.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::command::{parse_line, Command, FileTarget, Input};
use crate::error::ReaderError;
use crate::import::{format_size, load_files, scan_txt_files};
use crate::navigator::{NavError, NavState, Navigator};
use crate::prefs::{PrefsError, SharedPreferences};
use crate::{initialize, SpeechEngine};

const RULE_WIDE: usize = 80;
const RULE: usize = 60;
const RULE_NARROW: usize = 40;
const RECENT_SHOWN: usize = 3;

/// Whether the loop should keep going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone)]
pub struct ReplOptions {
    /// Voice hint used when no voice has been selected.
    pub preferred_voice: Option<String>,
    /// Directory searched by `:list` and `:file <number>`.
    pub scan_dir: PathBuf,
}

impl Default for ReplOptions {
    fn default() -> Self {
        Self {
            preferred_voice: None,
            scan_dir: PathBuf::from("."),
        }
    }
}

pub struct Repl<'e, W: Write> {
    engine: &'e dyn SpeechEngine,
    prefs: SharedPreferences,
    options: ReplOptions,
    navigator: Navigator,
    txt_files: Vec<PathBuf>,
    out: W,
}

impl<'e, W: Write> Repl<'e, W> {
    pub fn new(
        engine: &'e dyn SpeechEngine,
        prefs: SharedPreferences,
        options: ReplOptions,
        out: W,
    ) -> Self {
        let mut repl = Self {
            engine,
            prefs,
            options,
            navigator: Navigator::new(),
            txt_files: Vec::new(),
            out,
        };
        repl.rescan();
        repl
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Run until `:quit` or end of input. Preferences are saved on the way
    /// out, including when reading input fails.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<(), ReaderError> {
        let result = self.banner().and_then(|()| self.run_loop(input));
        if let Err(e) = self.prefs.save() {
            log::error!("{e}");
            if let Err(write_err) = writeln!(self.out, "Failed to save preferences: {e}") {
                log::warn!("could not report the save failure: {write_err}");
            }
        }
        result.map_err(ReaderError::from)
    }

    fn run_loop<R: BufRead>(&mut self, mut input: R) -> io::Result<()> {
        let mut line = String::new();
        loop {
            self.show_current_block()?;
            write!(self.out, "> ")?;
            self.out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                return Ok(());
            }
            if self.handle_line(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "Welcome to {}!", env!("CARGO_PKG_NAME"))?;
        writeln!(self.out, "Type ':help' for usage, ':quit' or ':exit' to leave.")?;
        writeln!(self.out, "Type ':voices' to list the available voices.")?;
        writeln!(self.out, "Type ':rate <n>' to set the speaking rate (50-300, 150 recommended).")?;
        writeln!(self.out, "Type ':volume <v>' to set the volume (0.0-1.0).")?;

        let recent = self.prefs.snapshot().recent_files;
        if !recent.is_empty() {
            let start = recent.len().saturating_sub(RECENT_SHOWN);
            writeln!(self.out, "Recent files: {}", recent[start..].join(", "))?;
        }
        Ok(())
    }

    /// Process one line of input.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let input = match parse_line(line) {
            Ok(input) => input,
            Err(e) => {
                writeln!(self.out, "{e}")?;
                return Ok(Flow::Continue);
            }
        };

        match input {
            Input::Empty if self.navigator.is_active() => self.read_next_block()?,
            Input::Empty => writeln!(self.out, "Please enter some text or a command.")?,
            Input::Text(text) => {
                self.speak(&text)?;
            }
            Input::Command(command) => return self.run_command(command),
        }
        Ok(Flow::Continue)
    }

    /// Load `paths` into chunk mode, as `:file` does.
    pub fn load_paths(&mut self, paths: &[PathBuf]) -> io::Result<()> {
        let report = load_files(paths);
        for failure in &report.failures {
            writeln!(self.out, "Error: {failure}")?;
        }
        for (path, count) in &report.loaded {
            writeln!(self.out, "Loaded file: {}, {count} blocks", path.display())?;
        }

        let file_count = report.loaded.len();
        let loaded: Vec<String> = report
            .loaded
            .iter()
            .map(|(p, _)| p.display().to_string())
            .collect();
        match self.navigator.load(report.blocks.into_vec()) {
            Ok(_) => {
                let recorded = self.prefs.update(|p| {
                    for path in loaded {
                        p.record_recent_file(path);
                    }
                    Ok::<_, std::convert::Infallible>(())
                });
                if let Err(e) = recorded {
                    writeln!(self.out, "Failed to save preferences: {e}")?;
                }
                writeln!(
                    self.out,
                    "Loaded {file_count} file(s), {} blocks in total",
                    self.navigator.len()
                )?;
            }
            Err(e) => writeln!(self.out, "{}", capitalize(&e.to_string()))?,
        }
        Ok(())
    }

    fn run_command(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Quit => {
                writeln!(self.out, "Goodbye.")?;
                return Ok(Flow::Quit);
            }
            Command::Help => self.help()?,
            Command::Clear => {
                write!(self.out, "\x1B[2J\x1B[1;1H")?;
                self.out.flush()?;
            }
            Command::About => self.about()?,
            Command::Rate(rate) => match self.prefs.update(|p| p.set_rate(rate)) {
                Ok(()) => writeln!(self.out, "Rate set to {rate}")?,
                Err(e) => self.report_prefs_error(e)?,
            },
            Command::Volume(volume) => match self.prefs.update(|p| p.set_volume(volume)) {
                Ok(()) => writeln!(self.out, "Volume set to {volume}")?,
                Err(e) => self.report_prefs_error(e)?,
            },
            Command::File(target) => self.open_files(target)?,
            Command::List => {
                self.rescan();
                self.list_files()?;
            }
            Command::Voices => self.list_voices()?,
            Command::SelectVoice(index) => self.select_voice(index)?,
            Command::Back | Command::Next | Command::Goto(_) | Command::Manual
                if !self.navigator.is_active() =>
            {
                writeln!(self.out, "No file is loaded. Use ':file <path>' to load one.")?
            }
            Command::Back => match self.navigator.back() {
                Ok(_) => {}
                Err(NavError::AlreadyFirst) => writeln!(self.out, "Already at the first block.")?,
                Err(e) => writeln!(self.out, "{}", capitalize(&e.to_string()))?,
            },
            Command::Next => self.read_next_block()?,
            Command::Goto(n) => {
                if let Err(e) = self.navigator.goto(n) {
                    writeln!(self.out, "{}", capitalize(&e.to_string()))?;
                }
            }
            Command::Manual => {
                self.navigator.reset();
                writeln!(self.out, "Switched back to manual input.")?;
            }
            Command::Unknown(name) => {
                writeln!(self.out, "Unknown command: :{name} (type ':help' for a list)")?
            }
        }
        Ok(Flow::Continue)
    }

    /// Speak `text` with the saved preferences. Failures are reported to the
    /// user and return `false`.
    fn speak(&mut self, text: &str) -> io::Result<bool> {
        let prefs = self.prefs.snapshot();
        let init = match initialize(
            self.engine,
            prefs.rate,
            prefs.volume,
            prefs.voice_id.as_deref(),
            self.options.preferred_voice.as_deref(),
        ) {
            Ok(init) => init,
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(false);
            }
        };
        if let Some(warning) = &init.warning {
            writeln!(self.out, "Warning: {warning}")?;
        }

        match self.engine.speak(text, &init.params) {
            Ok(()) => Ok(true),
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                Ok(false)
            }
        }
    }

    /// Speak the current block, then move past it. The cursor stays put when
    /// speaking fails.
    fn read_next_block(&mut self) -> io::Result<()> {
        let Some((_, block)) = self.navigator.current() else {
            return Ok(());
        };
        let block = block.to_string();
        if !self.speak(&block)? {
            return Ok(());
        }

        if let Ok(NavState::Exhausted) = self.navigator.advance() {
            writeln!(
                self.out,
                "Reached the last block ({} blocks in total).",
                self.navigator.len()
            )?;
            self.navigator.reset();
            writeln!(self.out, "Switched back to manual input.")?;
        }
        Ok(())
    }

    fn show_current_block(&mut self) -> io::Result<()> {
        let Some((index, block)) = self.navigator.current() else {
            return Ok(());
        };
        let total = self.navigator.len();
        let rule = "=".repeat(RULE_NARROW);

        writeln!(self.out)?;
        writeln!(self.out, "=== Block {}/{total} ===", index + 1)?;
        writeln!(self.out, "{block}")?;
        writeln!(self.out, "{rule}")?;
        if index > 0 {
            if let Some(prev) = self.navigator.summary(index - 1) {
                writeln!(self.out, "Previous ({index}/{total}): {prev}")?;
            }
        }
        if let Some(next) = self.navigator.summary(index + 1) {
            writeln!(self.out, "Next ({}/{total}): {next}", index + 2)?;
        }
        writeln!(self.out, "{rule}")?;
        writeln!(
            self.out,
            "Press Enter to read this block, or use ':back', ':next', ':goto <n>' or ':manual'."
        )
    }

    fn open_files(&mut self, target: FileTarget) -> io::Result<()> {
        let paths = match target {
            FileTarget::Paths(paths) => paths.into_iter().map(PathBuf::from).collect(),
            FileTarget::Index(index) => match index.checked_sub(1).and_then(|i| self.txt_files.get(i)) {
                Some(path) => vec![path.clone()],
                None if self.txt_files.is_empty() => {
                    writeln!(
                        self.out,
                        "No txt files found in {}. Use ':list' to rescan.",
                        self.options.scan_dir.display()
                    )?;
                    return Ok(());
                }
                None => {
                    writeln!(
                        self.out,
                        "Invalid file number, enter a number from 1 to {}.",
                        self.txt_files.len()
                    )?;
                    return Ok(());
                }
            },
        };
        self.load_paths(&paths)
    }

    fn rescan(&mut self) {
        self.txt_files = scan_txt_files(&self.options.scan_dir).unwrap_or_else(|e| {
            log::warn!("failed to scan {}: {e}", self.options.scan_dir.display());
            Vec::new()
        });
    }

    fn list_files(&mut self) -> io::Result<()> {
        if self.txt_files.is_empty() {
            return writeln!(
                self.out,
                "No txt files found in {}.",
                self.options.scan_dir.display()
            );
        }

        let rule = "=".repeat(RULE);
        writeln!(self.out)?;
        writeln!(self.out, "Text files in {}:", self.options.scan_dir.display())?;
        writeln!(self.out, "{rule}")?;
        for (i, path) in self.txt_files.iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match path.metadata() {
                Ok(meta) => writeln!(
                    self.out,
                    "{:2}. {name:<40} ({})",
                    i + 1,
                    format_size(meta.len())
                )?,
                Err(_) => writeln!(self.out, "{:2}. {name}", i + 1)?,
            }
        }
        writeln!(self.out, "{rule}")?;
        writeln!(self.out, "Use ':file <number>' to open a file.")
    }

    fn list_voices(&mut self) -> io::Result<()> {
        let voices = match self.engine.voices() {
            Ok(voices) => voices,
            Err(e) => return writeln!(self.out, "Failed to list voices: {e}"),
        };
        if voices.is_empty() {
            return writeln!(self.out, "No voices detected.");
        }

        let rule = "=".repeat(RULE_WIDE);
        writeln!(self.out)?;
        writeln!(self.out, "Available voices:")?;
        writeln!(self.out, "{:<4} {:<30} {:<15} ID", "No.", "Name", "Language")?;
        writeln!(self.out, "{rule}")?;
        for (i, voice) in voices.iter().enumerate() {
            let name: String = voice.name.chars().take(29).collect();
            writeln!(
                self.out,
                "{:<4} {name:<30} {:<15} {}",
                i + 1,
                voice.language_label(),
                voice.id
            )?;
        }
        writeln!(self.out, "{rule}")?;
        writeln!(self.out, "Use ':voice select <number>' to choose a voice.")
    }

    fn select_voice(&mut self, index: usize) -> io::Result<()> {
        let voices = match self.engine.voices() {
            Ok(voices) => voices,
            Err(e) => return writeln!(self.out, "Failed to select voice: {e}"),
        };
        let Some(voice) = index.checked_sub(1).and_then(|i| voices.get(i)) else {
            return writeln!(
                self.out,
                "Voice number out of range, valid range is 1-{}.",
                voices.len()
            );
        };

        let id = voice.id.clone();
        let saved = self.prefs.update(|p| {
            p.voice_id = Some(id);
            Ok::<_, std::convert::Infallible>(())
        });
        writeln!(self.out, "Selected voice: {}", voice.name)?;
        if let Err(e) = saved {
            writeln!(self.out, "Failed to save preferences: {e}")?;
        }
        Ok(())
    }

    fn report_prefs_error(&mut self, error: ReaderError) -> io::Result<()> {
        match error {
            ReaderError::Prefs(PrefsError::RateOutOfRange(_)) => {
                writeln!(self.out, "Rate must be between 50 and 300.")
            }
            ReaderError::Prefs(PrefsError::VolumeOutOfRange(_)) => {
                writeln!(self.out, "Volume must be between 0.0 and 1.0.")
            }
            other => writeln!(self.out, "Failed to save preferences: {other}"),
        }
    }

    fn help(&mut self) -> io::Result<()> {
        write!(
            self.out,
            "
Text-to-speech reader - usage
================================
All commands start with a colon (:).
- Manual input:
  - Type any text and press Enter to hear it.
- File mode:
  - ':file <path1> <path2> ...' loads one or more txt files
  - ':file <number>' opens a file from the current directory listing
  - ':list' lists the txt files in the current directory
  - Text is split into blocks on blank lines. Each block is shown;
    press Enter to read it.
  - Commands:
    - :back          go back one block
    - :next          read this block and move on (same as Enter)
    - :goto <n>      jump to block n
    - :manual        return to manual input
- Voices:
  - :voices                list available voices
  - :voice select <n>      use voice number n
- Other:
  - :rate <n>      speaking rate (50-300, 150 recommended)
  - :volume <v>    volume (0.0-1.0)
  - :help          show this help
  - :about         about this program
  - :clear         clear the screen
  - :quit / :exit  leave
================================
"
        )
    }

    fn about(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", env!("CARGO_PKG_NAME"))?;
        writeln!(self.out, "Version: {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out, "{}", env!("CARGO_PKG_DESCRIPTION"))?;
        writeln!(self.out, "Speech engine: {}", self.engine.name())?;
        writeln!(self.out, "Repository: {}", env!("CARGO_PKG_REPOSITORY"))?;
        writeln!(self.out, "Licensed under {}", env!("CARGO_PKG_LICENSE"))?;
        writeln!(self.out)?;
        writeln!(self.out, "1. Type text, or load txt files with ':file'")?;
        writeln!(self.out, "2. Pick a voice, rate and volume")?;
        writeln!(self.out, "3. Read the text block by block")?;
        writeln!(self.out, "4. Separate blocks with blank lines")
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::PreferencesStore;
    use crate::testing::ScriptedEngine;
    use std::fs;
    use std::io::Cursor;

    struct Fixture {
        dir: tempfile::TempDir,
        engine: ScriptedEngine,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                engine: ScriptedEngine::new(),
            }
        }

        fn store(&self) -> PreferencesStore {
            PreferencesStore::new(self.dir.path().join("config.json"))
        }

        fn repl(&self) -> Repl<'_, Vec<u8>> {
            let options = ReplOptions {
                preferred_voice: None,
                scan_dir: self.dir.path().to_path_buf(),
            };
            Repl::new(
                &self.engine,
                SharedPreferences::load(self.store()),
                options,
                Vec::new(),
            )
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    fn output(repl: &Repl<'_, Vec<u8>>) -> String {
        String::from_utf8_lossy(repl.output()).into_owned()
    }

    #[test]
    fn manual_text_is_spoken() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        assert_eq!(repl.handle_line("hello world\n").unwrap(), Flow::Continue);
        assert_eq!(fx.engine.spoken(), ["hello world"]);
    }

    #[test]
    fn empty_manual_input_is_an_error() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        repl.handle_line("   \n").unwrap();
        assert!(fx.engine.spoken().is_empty());
        assert!(output(&repl).contains("Please enter some text"));
    }

    #[test]
    fn goto_then_next_reads_last_block_and_returns_to_manual() {
        let fx = Fixture::new();
        let path = fx.write("hello.txt", "Hello\n\nWorld");
        let mut repl = fx.repl();

        repl.handle_line(&format!(":file {}", path.display())).unwrap();
        assert_eq!(repl.navigator().blocks(), ["Hello", "World"]);

        repl.handle_line(":goto 2").unwrap();
        repl.handle_line(":next").unwrap();
        assert_eq!(fx.engine.spoken(), ["World"]);
        assert_eq!(repl.navigator().state(), NavState::Idle);
        assert!(output(&repl).contains("Switched back to manual input."));
    }

    #[test]
    fn enter_walks_through_blocks() {
        let fx = Fixture::new();
        fx.write("a.txt", "one\n\ntwo");
        let mut repl = fx.repl();

        repl.handle_line(":file 1").unwrap();
        repl.handle_line("").unwrap();
        assert_eq!(repl.navigator().state(), NavState::Viewing(1));
        repl.handle_line("").unwrap();
        assert_eq!(fx.engine.spoken(), ["one", "two"]);
        assert_eq!(repl.navigator().state(), NavState::Idle);
    }

    #[test]
    fn failed_speech_does_not_advance() {
        let fx = Fixture::new();
        let path = fx.write("a.txt", "one\n\ntwo");
        let mut repl = fx.repl();
        repl.load_paths(&[path]).unwrap();

        fx.engine.fail_speak(Some("no audio"));
        repl.handle_line(":next").unwrap();
        assert_eq!(repl.navigator().state(), NavState::Viewing(0));
        assert!(output(&repl).contains("no audio"));
    }

    #[test]
    fn rate_out_of_range_is_rejected_and_not_persisted() {
        let fx = Fixture::new();
        let mut repl = fx.repl();

        repl.handle_line(":rate 200").unwrap();
        repl.handle_line(":rate 400").unwrap();
        assert!(output(&repl).contains("Rate must be between 50 and 300."));
        assert_eq!(fx.store().load().rate, 200);

        repl.handle_line("speak").unwrap();
        assert_eq!(fx.engine.last_params().unwrap().rate, 200);
    }

    #[test]
    fn volume_is_validated_and_saved() {
        let fx = Fixture::new();
        let mut repl = fx.repl();

        repl.handle_line(":volume 0.25").unwrap();
        repl.handle_line(":volume 2").unwrap();
        repl.handle_line(":volume loud").unwrap();
        let out = output(&repl);
        assert!(out.contains("Volume must be between 0.0 and 1.0."));
        assert!(out.contains("invalid value 'loud'"));
        assert_eq!(fx.store().load().volume, 0.25);
    }

    #[test]
    fn navigation_outside_file_mode_is_reported() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        for cmd in [":back", ":next", ":goto 1", ":manual"] {
            repl.handle_line(cmd).unwrap();
        }
        assert_eq!(output(&repl).matches("No file is loaded").count(), 4);
    }

    #[test]
    fn back_at_first_block_reports() {
        let fx = Fixture::new();
        let path = fx.write("a.txt", "one\n\ntwo");
        let mut repl = fx.repl();
        repl.load_paths(&[path]).unwrap();

        repl.handle_line(":back").unwrap();
        assert!(output(&repl).contains("Already at the first block."));
        repl.handle_line(":goto 9").unwrap();
        assert!(output(&repl).contains("Block 9 is out of range, valid blocks are 1-2"));
        assert_eq!(repl.navigator().state(), NavState::Viewing(0));
    }

    #[test]
    fn loading_records_recent_files() {
        let fx = Fixture::new();
        let a = fx.write("a.txt", "one");
        let b = fx.write("b.txt", "two\n\nthree");
        let mut repl = fx.repl();

        repl.handle_line(&format!(":file {} missing.txt {}", a.display(), b.display()))
            .unwrap();
        assert_eq!(repl.navigator().blocks(), ["one", "two", "three"]);
        let out = output(&repl);
        assert!(out.contains("does not exist"));
        assert!(out.contains("Loaded 2 file(s), 3 blocks in total"));

        let recent = fx.store().load().recent_files;
        assert_eq!(recent, [a.display().to_string(), b.display().to_string()]);
    }

    #[test]
    fn loading_only_blank_files_stays_in_manual_mode() {
        let fx = Fixture::new();
        let blank = fx.write("blank.txt", "\n\n  \n");
        let mut repl = fx.repl();
        repl.load_paths(&[blank]).unwrap();
        assert_eq!(repl.navigator().state(), NavState::Idle);
        assert!(output(&repl).contains("No valid text blocks found"));
    }

    #[test]
    fn file_index_out_of_range() {
        let fx = Fixture::new();
        fx.write("only.txt", "x");
        let mut repl = fx.repl();
        repl.handle_line(":file 3").unwrap();
        assert!(output(&repl).contains("enter a number from 1 to 1"));
    }

    #[test]
    fn list_shows_scanned_files() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        fx.write("later.TXT", "x");
        repl.handle_line(":list").unwrap();
        assert!(output(&repl).contains(" 1. later.TXT"));
        assert!(output(&repl).contains("1 bytes"));
    }

    #[test]
    fn voices_can_be_listed_and_selected() {
        let fx = Fixture::new();
        let mut repl = fx.repl();

        repl.handle_line(":voices").unwrap();
        assert!(output(&repl).contains("Chinese (Mandarin)"));

        repl.handle_line(":voice select 2").unwrap();
        assert_eq!(fx.store().load().voice_id.as_deref(), Some("cmn"));
        repl.handle_line(":voice select 7").unwrap();
        assert!(output(&repl).contains("valid range is 1-2"));

        repl.handle_line("ni hao").unwrap();
        assert_eq!(fx.engine.last_params().unwrap().voice_id.as_deref(), Some("cmn"));
    }

    #[test]
    fn stale_voice_id_falls_back_with_warning() {
        let fx = Fixture::new();
        fs::write(fx.store().path(), r#"{"voice_id": "retired"}"#).unwrap();
        let mut repl = fx.repl();

        repl.handle_line("hello").unwrap();
        assert!(output(&repl).contains("voice id 'retired' not found"));
        assert_eq!(fx.engine.last_params().unwrap().voice_id, None);
    }

    #[test]
    fn engine_failure_is_reported_not_fatal() {
        let fx = Fixture::new();
        fx.engine.fail_voices("driver missing");
        let mut repl = fx.repl();
        assert_eq!(repl.handle_line("hello").unwrap(), Flow::Continue);
        assert!(output(&repl).contains("driver missing"));
        assert!(fx.engine.spoken().is_empty());
    }

    #[test]
    fn unknown_command_is_reported() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        repl.handle_line(":dance").unwrap();
        assert!(output(&repl).contains("Unknown command: :dance"));
    }

    #[test]
    fn run_quits_and_saves() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        repl.run(Cursor::new(":rate 120\n:quit\nnever spoken\n")).unwrap();
        assert!(fx.engine.spoken().is_empty());
        assert_eq!(fx.store().load().rate, 120);
        assert!(output(&repl).contains("Goodbye."));
    }

    #[test]
    fn run_saves_on_end_of_input() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        repl.run(Cursor::new("hi\n")).unwrap();
        assert_eq!(fx.engine.spoken(), ["hi"]);
        assert!(fx.store().path().exists());
    }

    struct BrokenInput;

    impl io::Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "terminal went away"))
        }
    }

    #[test]
    fn run_saves_before_propagating_an_input_error() {
        let fx = Fixture::new();
        let mut repl = fx.repl();
        let input = io::BufReader::new(io::Read::chain(Cursor::new(":rate 90\n"), BrokenInput));

        let result = repl.run(input);
        assert!(matches!(result, Err(ReaderError::Io(_))));
        assert_eq!(fx.store().load().rate, 90);
    }

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unsaveable_preferences_and_closed_output_still_return_an_error() {
        let fx = Fixture::new();
        // A directory cannot be replaced by the preferences file.
        let occupied = fx.dir.path().join("occupied");
        fs::create_dir(&occupied).unwrap();
        let store = PreferencesStore::new(&occupied);
        let mut repl = Repl::new(
            &fx.engine,
            SharedPreferences::load(store),
            ReplOptions::default(),
            ClosedOutput,
        );

        assert!(matches!(repl.run(Cursor::new("")), Err(ReaderError::Io(_))));
    }

    #[test]
    fn banner_lists_last_three_recent_files() {
        let fx = Fixture::new();
        fs::write(
            fx.store().path(),
            r#"{"recent_files": ["a", "b", "c", "d"]}"#,
        )
        .unwrap();
        let mut repl = fx.repl();
        repl.banner().unwrap();
        assert!(output(&repl).contains("Recent files: b, c, d"));
    }

    #[test]
    fn chunk_mode_prompt_shows_neighbour_summaries() {
        let fx = Fixture::new();
        let path = fx.write("a.txt", "one\n\ntwo\n\nthree");
        let mut repl = fx.repl();
        repl.load_paths(&[path]).unwrap();
        repl.handle_line(":goto 2").unwrap();
        repl.show_current_block().unwrap();

        let out = output(&repl);
        assert!(out.contains("=== Block 2/3 ==="));
        assert!(out.contains("Previous (1/3): one"));
        assert!(out.contains("Next (3/3): three"));
    }
}
