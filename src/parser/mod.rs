//! Parser module for the free-text fields of a movie record
//!
//! Movie data arrives from external catalogs as loosely formatted strings
//! ("148 min", "$292,587,330", "Won 4 Oscars. 153 wins & 220 nominations.").
//! Every parser here is pure and total: input it cannot understand yields the
//! documented default (`0`, `None` or an empty list) instead of an error.

use std::ops::AddAssign;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)").expect("leading digits regex should compile"));
static FIRST_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run regex should compile"));
static LEADING_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-+]?[0-9]+)").expect("leading integer regex should compile"));
static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?)")
        .expect("leading float regex should compile")
});

// The three award patterns are applied independently, so an awards line that
// mentions both "Won N Oscars" and "M wins" counts N + M wins.
static OSCAR_WINS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Won\s+([0-9]+)\s+Oscar").expect("oscar regex should compile"));
static WINS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s+win").expect("wins regex should compile"));
static NOMINATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s+nomination").expect("nominations regex should compile"));

/// Date layouts seen in the `released` field
const RELEASE_DATE_FORMATS: &[&str] = &["%d %b %Y", "%d %B %Y", "%Y-%m-%d", "%b %d, %Y", "%B %d, %Y"];

/// Marker external catalogs use for a missing value
pub const NOT_AVAILABLE: &str = "N/A";

/// Wins and nominations summed over awards strings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AwardTotals {
    pub wins: u64,
    pub nominations: u64,
}

impl AddAssign for AwardTotals {
    fn add_assign(&mut self, other: Self) {
        self.wins = self.wins.saturating_add(other.wins);
        self.nominations = self.nominations.saturating_add(other.nominations);
    }
}

fn capture_number(pattern: &Regex, text: &str) -> u64 {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Count wins and nominations mentioned in an awards line
///
/// `None` and `"N/A"` count as nothing.
pub fn parse_awards(awards: Option<&str>) -> AwardTotals {
    let text = match awards {
        Some(text) if text != NOT_AVAILABLE => text,
        _ => return AwardTotals::default(),
    };

    AwardTotals {
        wins: capture_number(&OSCAR_WINS, text).saturating_add(capture_number(&WINS, text)),
        nominations: capture_number(&NOMINATIONS, text),
    }
}

/// Parse a box office figure such as `"$292,587,330"`
///
/// Currency symbol and thousands separators are stripped. Returns `None` for
/// missing, `"N/A"` or otherwise unparsable values.
pub fn parse_box_office(box_office: Option<&str>) -> Option<f64> {
    let raw = box_office?;
    if raw == NOT_AVAILABLE {
        return None;
    }

    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
    cleaned.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Leading year of a free-form year field: `"2010–2014"` gives `2010`
pub fn leading_year(year: Option<&str>) -> Option<i64> {
    LEADING_DIGITS
        .captures(year?)
        .and_then(|caps| caps[1].parse().ok())
}

/// Timeline bucket for a year field: its first four characters
pub fn year_bucket(year: Option<&str>) -> Option<String> {
    let year = year?.trim();
    if year.is_empty() {
        return None;
    }
    Some(year.chars().take(4).collect())
}

/// Parse a `released` value such as `"16 Jul 2010"`
pub fn parse_release_date(released: Option<&str>) -> Option<NaiveDate> {
    let raw = released?.trim();
    RELEASE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Minutes from a runtime such as `"148 min"`; the first digit run, else 0
pub fn parse_runtime(runtime: &str) -> i64 {
    FIRST_DIGITS
        .find(runtime)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Vote count such as `"2,345,678"`; unparsable gives 0
pub fn parse_votes(votes: &str) -> i64 {
    parse_leading_integer(&votes.replace(',', "")).unwrap_or(0)
}

/// Integer prefix of a string, `"3 seasons"` gives `Some(3)`
pub fn parse_leading_integer(raw: &str) -> Option<i64> {
    LEADING_INTEGER
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
}

/// Floating point prefix of a string, `"8.8/10"` gives `Some(8.8)`
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    LEADING_FLOAT
        .captures(raw)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Split a comma separated list, trimming entries and dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
