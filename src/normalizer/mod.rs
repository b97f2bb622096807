//! Text normalization for speech synthesis
//!
//! Voices read digits and clock times poorly, so every number is spelled out before
//! synthesis. Rules run in order:
//! 1. `HH:MM` becomes hour and minute words (`21:05` → `twenty-one five`)
//! 2. remaining digit runs become cardinals (`2426` → `two thousand four hundred twenty-six`)
//! 3. hyphens become spaces
//! 4. any leftover `:` becomes `, `

pub mod numbers;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

pub use numbers::to_words;

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2}):([0-9]{2})").expect("valid time regex"));

static DIGITS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("valid digits regex"));

static COLON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*:\s*").expect("valid colon regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A pattern matched but a capture group was absent
    MissingGroup(&'static str),
    /// A matched digit run could not be read as a number
    BadNumber(String),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::MissingGroup(what) => write!(f, "missing {} in match", what),
            NormalizeError::BadNumber(digits) => write!(f, "cannot read number '{}'", digits),
        }
    }
}

impl std::error::Error for NormalizeError {}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Never fails. On an internal error the input comes back unchanged.
    pub fn normalize(&self, text: &str) -> String {
        match self.try_normalize(text) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::warn!("Normalization failed, using raw text: {}", e);
                text.to_string()
            }
        }
    }

    pub fn try_normalize(&self, text: &str) -> Result<String, NormalizeError> {
        let text = try_replace_all(&TIME_PATTERN, text, |caps| {
            let hour = read_number(caps, 1, "hour")?;
            let minute = read_number(caps, 2, "minute")?;
            Ok(format!("{} {}", to_words(hour), to_words(minute)))
        })?;

        let text = try_replace_all(&DIGITS_PATTERN, &text, |caps| {
            let digits = caps
                .get(0)
                .ok_or(NormalizeError::MissingGroup("digits"))?
                .as_str();
            Ok(match digits.parse::<u64>() {
                Ok(n) => to_words(n),
                Err(_) => numbers::digits_to_words(digits),
            })
        })?;

        let text = text.replace('-', " ");
        Ok(COLON_PATTERN.replace_all(&text, ", ").into_owned())
    }
}

fn read_number(caps: &Captures<'_>, group: usize, what: &'static str) -> Result<u64, NormalizeError> {
    let digits = caps
        .get(group)
        .ok_or(NormalizeError::MissingGroup(what))?
        .as_str();
    digits
        .parse()
        .map_err(|_| NormalizeError::BadNumber(digits.to_string()))
}

/// `Regex::replace_all` with a fallible replacer
fn try_replace_all<F>(pattern: &Regex, text: &str, mut replace: F) -> Result<String, NormalizeError>
where
    F: FnMut(&Captures<'_>) -> Result<String, NormalizeError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let whole = caps.get(0).ok_or(NormalizeError::MissingGroup("match"))?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replace(&caps)?);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        TextNormalizer::new().normalize(text)
    }

    #[test]
    fn test_train_and_time_spelled_out() {
        assert_eq!(
            normalize("Train 2426 departs 21:05"),
            "Train two thousand four hundred twenty six departs twenty one five"
        );
    }

    #[test]
    fn test_time_rule_runs_before_digits() {
        assert_eq!(normalize("at 9:30."), "at nine thirty.");
        assert_eq!(normalize("00:00"), "zero zero");
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(
            normalize("Platform 3, delayed by 10 minutes"),
            "Platform three, delayed by ten minutes"
        );
    }

    #[test]
    fn test_hyphens_become_spaces() {
        assert_eq!(normalize("Boston-bound train"), "Boston bound train");
    }

    #[test]
    fn test_stray_colons_replaced() {
        assert_eq!(normalize("Attention: platform 9:5"), "Attention, platform nine, five");
        assert_eq!(normalize("Platform 4 : Boston"), "Platform four, Boston");
    }

    #[test]
    fn test_overlong_digit_run() {
        let out = normalize("code 123456789012345678901234");
        assert!(out.starts_with("code one two three"));
        assert!(!out.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_output_has_no_digits_or_colons() {
        let inputs = [
            "Attention please. Train #815 to Las Vegas departs at 07:45 from platform 12.",
            "Acela 2426: delayed 1 min, new time 21:06",
            "12:345:6 1:2 99999999999999999999 -5",
            "",
            "No numbers here.",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(!out.chars().any(|c| c.is_ascii_digit()), "digits left in {:?}", out);
            assert!(!out.contains(':'), "colon left in {:?}", out);
        }
    }

    #[test]
    fn test_text_without_numbers_unchanged() {
        let text = "Please stand back from the platform edge.";
        assert_eq!(normalize(text), text);
    }
}
