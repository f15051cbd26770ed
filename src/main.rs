use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tts_reader::engines::espeak::EspeakEngine;
use tts_reader::prefs::{PreferencesStore, SharedPreferences};
use tts_reader::repl::{Repl, ReplOptions};
use tts_reader::SpeechEngine;

/// Read text aloud block by block with espeak-ng.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Preferences file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// espeak-ng binary to use instead of the one on PATH
    #[arg(long, value_name = "PATH")]
    espeak: Option<PathBuf>,

    /// espeak-ng data directory
    #[arg(long, value_name = "PATH")]
    espeak_data: Option<PathBuf>,

    /// Voice to use when none has been selected (matched against name, id and language)
    #[arg(long, value_name = "HINT")]
    prefer_voice: Option<String>,

    /// Directory searched by :list and :file <number>
    #[arg(long, value_name = "PATH", default_value = ".")]
    dir: PathBuf,

    /// Text files to open in chunk mode on startup
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let store = match args.config {
        Some(path) => PreferencesStore::new(path),
        None => PreferencesStore::default_location(),
    };
    log::info!("preferences at {}", store.path().display());
    let prefs = SharedPreferences::load(store);

    let engine = Arc::new(EspeakEngine::with_espeak(args.espeak, args.espeak_data));
    if !engine.is_available() {
        log::warn!("espeak-ng could not be started; speech will fail until it is installed");
    }

    {
        let prefs = prefs.clone();
        let engine = Arc::clone(&engine);
        if let Err(e) = ctrlc::set_handler(move || {
            log::info!("interrupted, saving preferences");
            let _ = engine.stop();
            if let Err(e) = prefs.save() {
                log::error!("{e}");
            }
            std::process::exit(130);
        }) {
            log::warn!("failed to install Ctrl+C handler: {e}");
        }
    }

    let options = ReplOptions {
        preferred_voice: args.prefer_voice,
        scan_dir: args.dir,
    };
    let mut repl = Repl::new(engine.as_ref(), prefs, options, io::stdout());
    if !args.files.is_empty() {
        if let Err(e) = repl.load_paths(&args.files) {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match repl.run(io::stdin().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
