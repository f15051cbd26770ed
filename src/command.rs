//! Parsing of REPL input lines.
//!
//! Lines starting with `:` are commands; anything else is text to speak.
//! Argument problems come back as [`ParseError`] values so the caller can
//! report them without touching any state.

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Blank line.
    Empty,
    /// Free text to speak.
    Text(String),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Clear,
    Quit,
    /// Raw value; range checks happen in the preferences.
    Rate(i64),
    Volume(f32),
    File(FileTarget),
    List,
    Voices,
    /// 1-based index into the voice list.
    SelectVoice(usize),
    Back,
    Next,
    /// 1-based block number.
    Goto(usize),
    Manual,
    About,
    Unknown(String),
}

/// What `:file` should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// 1-based index into the last directory listing.
    Index(usize),
    Paths(Vec<String>),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing argument, for example: {usage}")]
    MissingArgument { usage: &'static str },
    #[error("invalid value '{value}', for example: {usage}")]
    InvalidValue { value: String, usage: &'static str },
}

const RATE_USAGE: &str = ":rate 150";
const VOLUME_USAGE: &str = ":volume 1.0";
const FILE_USAGE: &str = ":file example.txt or :file 1";
const VOICE_USAGE: &str = ":voice select 1";
const GOTO_USAGE: &str = ":goto 3";

/// Parse one line of REPL input. Surrounding whitespace is ignored.
pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(body) = line.strip_prefix(':') else {
        return Ok(Input::Text(line.to_string()));
    };

    let mut parts = body.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or_default();

    let command = match name.as_str() {
        "help" => Command::Help,
        "clear" => Command::Clear,
        "quit" | "exit" => Command::Quit,
        "rate" => Command::Rate(parse_number(args, RATE_USAGE)?),
        "volume" => Command::Volume(parse_number(args, VOLUME_USAGE)?),
        "file" => Command::File(parse_file_target(args)?),
        "list" => Command::List,
        "voices" => Command::Voices,
        "voice" => parse_voice(args)?,
        "back" => Command::Back,
        "next" => Command::Next,
        "goto" => Command::Goto(parse_number(args, GOTO_USAGE)?),
        "manual" => Command::Manual,
        "about" => Command::About,
        _ => Command::Unknown(name),
    };
    Ok(Input::Command(command))
}

fn parse_number<T: std::str::FromStr>(args: &str, usage: &'static str) -> Result<T, ParseError> {
    if args.is_empty() {
        return Err(ParseError::MissingArgument { usage });
    }
    args.parse().map_err(|_| ParseError::InvalidValue {
        value: args.to_string(),
        usage,
    })
}

fn parse_file_target(args: &str) -> Result<FileTarget, ParseError> {
    if args.is_empty() {
        return Err(ParseError::MissingArgument { usage: FILE_USAGE });
    }
    if args.chars().all(|c| c.is_ascii_digit()) {
        return parse_number(args, FILE_USAGE).map(FileTarget::Index);
    }
    Ok(FileTarget::Paths(
        args.split_whitespace().map(str::to_string).collect(),
    ))
}

fn parse_voice(args: &str) -> Result<Command, ParseError> {
    let mut words = args.split_whitespace();
    match words.next() {
        Some(sub) if sub.eq_ignore_ascii_case("select") => match words.last() {
            Some(index) => parse_number(index, VOICE_USAGE).map(Command::SelectVoice),
            None => Err(ParseError::MissingArgument { usage: VOICE_USAGE }),
        },
        _ => Ok(Command::Unknown("voice".to_string())),
    }
}
