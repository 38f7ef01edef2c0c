use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::answers::MAX_GARDEN_AREA_M2;

const YES: [&str; 4] = ["ja", "j", "yes", "y"];
const NO: [&str; 3] = ["nee", "n", "no"];
const BACK: [&str; 5] = ["nee", "n", "no", "terug", "back"];

/// Result of a multi-select answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The customer explicitly chose nothing ("nee").
    Nothing,
    /// Selected tokens, deduplicated, in first-seen order.
    Tokens(Vec<char>),
}

/// Garden area in m². Accepts a comma or dot decimal, with or without an
/// `m²`/`m2` suffix.
pub fn parse_area(text: &str) -> Option<Decimal> {
    parse_number(text, Decimal::ZERO, Decimal::from(MAX_GARDEN_AREA_M2))
}

/// First number in `text`, accepted when `min_exclusive < value <= max`.
pub fn parse_number(text: &str, min_exclusive: Decimal, max: Decimal) -> Option<Decimal> {
    let cleaned: String =
        text.trim().to_lowercase().chars().filter(|c| !c.is_whitespace() && *c != '±').collect();
    let value = first_decimal(&cleaned)?;
    (value > min_exclusive && value <= max).then_some(value)
}

/// Whole percentage 0..=100 with an optional trailing `%`.
pub fn parse_percent(text: &str) -> Option<u8> {
    let trimmed = text.trim().replace('%', "");
    let trimmed = trimmed.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value = trimmed.parse::<u32>().ok()?;
    u8::try_from(value).ok().filter(|pct| *pct <= 100)
}

pub fn parse_yes_no(text: &str) -> Option<bool> {
    let normalized = text.trim().to_lowercase();
    if YES.contains(&normalized.as_str()) {
        Some(true)
    } else if NO.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// A single legal option token.
pub fn parse_choice(text: &str, allowed: &[char]) -> Option<char> {
    let mut chars = text.trim().chars();
    let token = chars.next()?;
    (chars.next().is_none() && allowed.contains(&token)).then_some(token)
}

/// Every allowed digit present in the input, so "1,3", "13" and "3 1" all
/// work. "nee"/"n"/"no" means nothing was chosen.
pub fn parse_multi_select(text: &str, allowed: &[char]) -> Option<Selection> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if NO.contains(&normalized.as_str()) {
        return Some(Selection::Nothing);
    }

    let mut tokens = Vec::new();
    for digit in normalized.chars().filter(char::is_ascii_digit) {
        if allowed.contains(&digit) && !tokens.contains(&digit) {
            tokens.push(digit);
        }
    }
    (!tokens.is_empty()).then_some(Selection::Tokens(tokens))
}

/// Words that mean "go back" in any post-offer menu.
pub fn is_back(text: &str) -> bool {
    BACK.contains(&text.trim().to_lowercase().as_str())
}

fn first_decimal(text: &str) -> Option<Decimal> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().position(char::is_ascii_digit)?;

    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    let mut number: String = chars[start..end].iter().collect();

    if end + 1 < chars.len() && matches!(chars[end], '.' | ',') && chars[end + 1].is_ascii_digit() {
        let mut fraction_end = end + 1;
        while fraction_end < chars.len() && chars[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        number.push('.');
        number.extend(&chars[end + 1..fraction_end]);
    }

    Decimal::from_str(&number).ok()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        is_back, parse_area, parse_choice, parse_multi_select, parse_number, parse_percent,
        parse_yes_no, Selection,
    };

    #[test]
    fn area_accepts_comma_dot_and_suffix() {
        assert_eq!(parse_area("60"), Some(Decimal::from(60)));
        assert_eq!(parse_area("62,5 m²"), Some(Decimal::new(625, 1)));
        assert_eq!(parse_area("± 80.25m2"), Some(Decimal::new(8025, 2)));
    }

    #[test]
    fn area_rejects_zero_too_large_and_text() {
        assert_eq!(parse_area("0"), None);
        assert_eq!(parse_area("100001"), None);
        assert_eq!(parse_area("groot"), None);
        assert_eq!(parse_area("100000"), Some(Decimal::from(100_000)));
    }

    #[test]
    fn number_respects_exclusive_minimum() {
        assert_eq!(parse_number("0", Decimal::ZERO, Decimal::from(10)), None);
        assert_eq!(
            parse_number("ongeveer 10 meter", Decimal::ZERO, Decimal::from(10)),
            Some(Decimal::from(10))
        );
    }

    #[test]
    fn percent_is_whole_and_bounded() {
        assert_eq!(parse_percent("40%"), Some(40));
        assert_eq!(parse_percent(" 100 "), Some(100));
        assert_eq!(parse_percent("101"), None);
        assert_eq!(parse_percent("-5"), None);
        assert_eq!(parse_percent("12.5"), None);
    }

    #[test]
    fn yes_no_vocabulary_is_fixed() {
        assert_eq!(parse_yes_no("Ja"), Some(true));
        assert_eq!(parse_yes_no("y"), Some(true));
        assert_eq!(parse_yes_no("NO"), Some(false));
        assert_eq!(parse_yes_no("misschien"), None);
    }

    #[test]
    fn choice_requires_exact_token() {
        assert_eq!(parse_choice(" 2 ", &['1', '2']), Some('2'));
        assert_eq!(parse_choice("3", &['1', '2']), None);
        assert_eq!(parse_choice("12", &['1', '2']), None);
    }

    #[test]
    fn multi_select_extracts_digits_in_first_seen_order() {
        let allowed = ['1', '2', '3'];
        assert_eq!(parse_multi_select("1,3", &allowed), Some(Selection::Tokens(vec!['1', '3'])));
        assert_eq!(parse_multi_select("31", &allowed), Some(Selection::Tokens(vec!['3', '1'])));
        assert_eq!(parse_multi_select("3 1 3", &allowed), Some(Selection::Tokens(vec!['3', '1'])));
        assert_eq!(parse_multi_select("nee", &allowed), Some(Selection::Nothing));
        assert_eq!(parse_multi_select("9", &allowed), None);
        assert_eq!(parse_multi_select("", &allowed), None);
    }

    #[test]
    fn back_words_include_terug() {
        assert!(is_back("Terug"));
        assert!(is_back("nee"));
        assert!(!is_back("1"));
    }
}
