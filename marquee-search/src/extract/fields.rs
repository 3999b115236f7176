//! Parsing of scraped field text into typed values.
//!
//! Each parser returns `None` for anything it cannot read confidently; a bad
//! field never fails the item it belongs to.

use std::sync::LazyLock;

use regex::Regex;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").expect("static year pattern"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("static decimal pattern"));
static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*h").expect("static hours pattern"));
static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m").expect("static minutes pattern"));
static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bs(\d{1,2})\s*e(\d{1,4})\b|\b(\d{1,2})\s*x\s*(\d{1,4})\b")
        .expect("static episode code pattern")
});

/// First plausible release year (1800-2099) in `text`.
pub fn parse_year(text: &str) -> Option<u16> {
    YEAR.captures(text)?.get(1)?.as_str().parse().ok()
}

/// First number in `text` if it is a valid 0-10 rating.
///
/// Accepts a decimal comma (`"7,5"`).
pub fn parse_rating(text: &str) -> Option<f32> {
    let number = DECIMAL.find(text)?.as_str().replace(',', ".");
    let rating: f32 = number.parse().ok()?;
    (0.0..=10.0).contains(&rating).then_some(rating)
}

/// Runtime in minutes from `"120 min"`, `"2h 10m"`, `"2 h"` or a bare number.
pub fn parse_runtime(text: &str) -> Option<u32> {
    let capture = |re: &Regex| -> Option<u32> { re.captures(text)?.get(1)?.as_str().parse().ok() };

    let total = match (capture(&HOURS), capture(&MINUTES)) {
        (None, None) => text.trim().parse().ok()?,
        (hours, minutes) => hours
            .unwrap_or(0)
            .checked_mul(60)?
            .checked_add(minutes.unwrap_or(0))?,
    };

    (total > 0).then_some(total)
}

/// Season and episode numbers from `"S01E03"` or `"1x03"` style text.
pub fn parse_episode_code(text: &str) -> Option<(u32, u32)> {
    let caps = SEASON_EPISODE.captures(text)?;
    let season = caps.get(1).or_else(|| caps.get(3))?.as_str().parse().ok()?;
    let episode = caps.get(2).or_else(|| caps.get(4))?.as_str().parse().ok()?;
    Some((season, episode))
}

/// Leading integer of an attribute or text value (`"3"`, `"3 "`, `"Ep. 3"`).
pub fn parse_number(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())?
        .parse()
        .ok()
}
