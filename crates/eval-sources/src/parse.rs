//! Lenient parsing of figures written for humans

use serde_json::Value;

/// Parse a money or count figure such as `$1.2M`, `1,200,000`,
/// `2.5 million` or `-40`
pub fn amount(text: &str) -> Option<f64> {
    let lower = text.trim().to_lowercase();
    let start = lower.find(|c: char| c.is_ascii_digit())?;
    let negative = lower[..start].trim_end().ends_with('-');
    let rest = &lower[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(rest.len());
    let number: f64 = rest[..end].trim_end_matches(['.', ',']).replace(',', "").parse().ok()?;
    let value = number * unit_multiplier(rest[end..].trim_start());
    Some(if negative { -value } else { value })
}

fn unit_multiplier(unit: &str) -> f64 {
    let word: String = unit.chars().take_while(char::is_ascii_alphabetic).collect();
    match word.as_str() {
        "k" | "thousand" => 1e3,
        "m" | "mm" | "mn" | "million" | "millions" => 1e6,
        "b" | "bn" | "billion" | "billions" => 1e9,
        _ => 1.0,
    }
}

/// Parse a headcount, taking the midpoint of ranges such as `10-50`
pub fn headcount(text: &str) -> Option<f64> {
    let numbers: Vec<f64> = text
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .filter_map(|token| token.replace(',', "").parse::<f64>().ok())
        .collect();
    match numbers.as_slice() {
        [] => None,
        [low, high, ..] if text.contains('-') || text.contains(" to ") => Some((low + high) / 2.0),
        [first, ..] => Some(*first),
    }
}

/// First plausible calendar year in the text
pub fn year(text: &str) -> Option<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 4)
        .filter_map(|token| token.parse::<i32>().ok())
        .find(|year| (1800..=2100).contains(year))
}

/// Non-placeholder text from a JSON value
pub fn json_text(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    let placeholder = ["", "null", "none", "unknown", "n/a", "not available", "not found"]
        .contains(&text.to_lowercase().as_str());
    (!placeholder).then(|| text.to_string())
}

/// Number from a JSON value, accepting numeric strings
pub fn json_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => amount(s),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
