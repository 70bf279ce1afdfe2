use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_CLEAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-\(\)\.]").unwrap());
static DIGIT_SEQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d{7,15}").unwrap());
static NAME_STARTS_WITH_PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d").unwrap());

const HEADER_LINES: usize = 30;

const NAME_CONTEXT_KEYWORDS: [&str; 5] = ["email", "phone", "contact", "mobile", "tel"];

const NOT_A_NAME: [&str; 8] = [
    "curriculum vitae",
    "resume",
    "profile",
    "summary",
    "experience",
    "education",
    "skills",
    "contact",
];

/// First phone number in `text` that validates, formatted as E.164.
pub fn extract_phone(text: &str, default_country_code: &str) -> Option<String> {
    text.lines()
        .filter(|line| line.chars().filter(|c| c.is_ascii_digit()).count() >= 7)
        .find_map(|line| normalize_phone(line, default_country_code))
}

/// Ten-digit national numbers get `default_country_code` prepended.
pub fn normalize_phone(text: &str, default_country_code: &str) -> Option<String> {
    format_if_valid_phone(text.trim()).or_else(|| {
        let cleaned = PHONE_CLEAN_RE.replace_all(text, "");
        DIGIT_SEQ_RE
            .find_iter(&cleaned)
            .map(|m| with_country_code(m.as_str(), default_country_code))
            .find_map(|candidate| format_if_valid_phone(&candidate))
    })
}

fn with_country_code(raw: &str, default_country_code: &str) -> String {
    if raw.starts_with('+') {
        return raw.to_string();
    }
    match raw.len() {
        10 if !default_country_code.is_empty() => format!("+{default_country_code}{raw}"),
        len if len > 10 => format!("+{raw}"),
        _ => raw.to_string(),
    }
}

/// Guesses the candidate's name from the header of a résumé body, then from
/// lines sitting directly above contact details.
pub fn guess_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let above_contact = lines
        .windows(2)
        .filter(|pair| mentions_contact(pair[1]))
        .map(|pair| pair[0]);

    lines
        .iter()
        .copied()
        .take(HEADER_LINES)
        .chain(above_contact)
        .find(|line| looks_like_name(line))
        .map(str::to_string)
}

fn mentions_contact(line: &str) -> bool {
    let lower = line.to_lowercase();
    NAME_CONTEXT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn looks_like_name(line: &str) -> bool {
    if line.is_empty()
        || line.len() > 50
        || line.contains(|c: char| c == '@' || c == ':')
        || NAME_STARTS_WITH_PHONE_RE.is_match(line)
    {
        return false;
    }

    let lower = line.to_lowercase();
    if NOT_A_NAME.iter().any(|word| lower.contains(word)) {
        return false;
    }

    let words = line.split_whitespace().count();
    (2..=4).contains(&words)
        && line
            .split_whitespace()
            .all(|word| word.chars().next().is_some_and(char::is_uppercase))
}

fn format_if_valid_phone(input: &str) -> Option<String> {
    let parsed = phonenumber::parse(None, input).ok()?;
    if !phonenumber::is_valid(&parsed) {
        return None;
    }

    Some(parsed.format().mode(phonenumber::Mode::E164).to_string())
}
