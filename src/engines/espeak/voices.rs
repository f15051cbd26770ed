use crate::{Gender, VoiceDescriptor};

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  cmn             --/M      Chinese_(Mandarin) sit/cmn              (zh-cmn 5)(zh 5)
/// ```
///
/// The language column doubles as the voice id, since `-v` accepts it
/// directly. Lines that do not have at least the first five columns are
/// skipped.
pub fn parse_voice_table(output: &str) -> Vec<VoiceDescriptor> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(parse_voice_line)
        .collect()
}

fn parse_voice_line(line: &str) -> Option<VoiceDescriptor> {
    let mut cols = line.split_whitespace();
    let _priority = cols.next()?;
    let language = cols.next()?;
    let age_gender = cols.next()?;
    let name = cols.next()?;
    let _file = cols.next()?;
    let others: Vec<&str> = cols.collect();

    let (age, gender) = parse_age_gender(age_gender);

    let mut languages = vec![language.to_string()];
    for other in parse_other_languages(&others.join(" ")) {
        if !languages.contains(&other) {
            languages.push(other);
        }
    }

    Some(VoiceDescriptor {
        id: language.to_string(),
        name: name.replace('_', " "),
        languages,
        gender,
        age,
    })
}

fn parse_age_gender(field: &str) -> (Option<u32>, Option<Gender>) {
    let (age, gender) = field.split_once('/').unwrap_or((field, ""));
    let gender = match gender {
        "M" => Some(Gender::Male),
        "F" => Some(Gender::Female),
        _ => None,
    };
    (age.parse().ok(), gender)
}

/// `(zh-cmn 5)(zh 5)` -> `["zh-cmn", "zh"]`.
fn parse_other_languages(field: &str) -> Vec<String> {
    field
        .split(['(', ')'])
        .filter_map(|group| group.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
