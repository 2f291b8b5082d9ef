use once_cell::sync::Lazy;
use regex::Regex;

static HOURS_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}):(\d{2})").expect("hours:minutes pattern"));

/// Normalises an exported cell for the paste sheet.
///
/// Apostrophes are stripped; a value beginning with `H:MM` (up to three hour
/// digits) becomes `H:MM:00`, dropping whatever followed. Everything else is
/// returned as is.
pub fn normalize_cell(raw: &str) -> String {
    let value = raw.replace('\'', "");
    match HOURS_MINUTES.captures(&value) {
        Some(caps) => format!("{}:{}:00", &caps[1], &caps[2]),
        None => value,
    }
}

pub fn normalize_row(row: &[String]) -> Vec<String> {
    row.iter().map(|v| normalize_cell(v)).collect()
}
