//! Value normalization from provider text to canonical values.
//!
//! Everything here is pure: table lookups, locale fixes, and display-text
//! cleanup. Tables are passed in as static slices so each adapter keeps its
//! own vocabulary next to its parsing code.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use parkdb_core::LotType;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid regex"));

/// Tariff group whose prices are shown in fee descriptions.
pub const STANDARD_TARIFF_GROUP: &str = "standard";

/// Naive layouts accepted by [`parse_utc_timestamp`], tried in order.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Vacancy text that is not one of the declared buckets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown vacancy bucket '{text}'")]
pub struct UnknownBucketError {
    pub text: String,
}

/// A fee duration code with no entry in the adapter's vocabulary.
///
/// This is a configuration defect, not bad input: the vocabulary needs a new
/// entry, so the whole batch fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fee duration '{duration}' is missing from the vocabulary")]
pub struct VocabularyError {
    pub duration: String,
}

/// One tariff price as published by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePrice {
    pub duration: String,
    pub price: Option<Decimal>,
    pub group: String,
}

/// One step of opening-hours cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursRule {
    /// Drop everything from the first occurrence of the marker onwards.
    TruncateAt(&'static str),
    /// Replace every occurrence of the first string with the second.
    Replace(&'static str, &'static str),
}

/// Turns a German decimal comma into a dot when the text contains a digit.
///
/// Text without digits (including the empty string) is returned untouched so
/// the validator can report it as-is. Applying this twice is a no-op.
#[must_use]
pub fn normalize_decimal_comma(raw: &str) -> Cow<'_, str> {
    if raw.contains(',') && DIGIT_RE.is_match(raw) {
        Cow::Owned(raw.replace(',', "."))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Looks up a provider code in a static table.
///
/// Unknown codes map to `None`; they are logged at debug level and never
/// reject the record.
#[must_use]
pub fn map_code<V: Copy>(raw: &str, table: &[(&str, V)]) -> Option<V> {
    let code = raw.trim();
    let mapped = table
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, value)| *value);
    if mapped.is_none() && !code.is_empty() {
        tracing::debug!(code, "unmapped provider code");
    }
    mapped
}

#[must_use]
pub fn map_lot_type(raw: &str, table: &[(&str, LotType)]) -> Option<LotType> {
    map_code(raw, table)
}

/// Maps a textual vacancy bucket to a free-space count.
///
/// The result is a floor estimate: a provider saying `">50"` is reported as
/// 51 free spaces no matter how many are actually free.
///
/// # Errors
///
/// Returns [`UnknownBucketError`] for any text not in `buckets`.
pub fn parse_vacancy_bucket(text: &str, buckets: &[(&str, u32)]) -> Result<u32, UnknownBucketError> {
    let key = text.trim();
    buckets
        .iter()
        .find(|(bucket, _)| *bucket == key)
        .map(|(_, num_free)| *num_free)
        .ok_or_else(|| UnknownBucketError {
            text: text.to_string(),
        })
}

/// Renders standard-tier prices as `"{label}: {price}€"` joined by `", "`.
///
/// Prices outside [`STANDARD_TARIFF_GROUP`] or without an amount are skipped.
/// An empty string means no priced tariff was published.
///
/// # Errors
///
/// Returns [`VocabularyError`] when a rendered price has a duration code
/// without a label.
pub fn render_fee_description(
    prices: &[FeePrice],
    vocabulary: &[(&str, &str)],
) -> Result<String, VocabularyError> {
    let mut parts = Vec::new();
    for fee in prices {
        let Some(price) = fee.price else { continue };
        if fee.group != STANDARD_TARIFF_GROUP {
            continue;
        }
        let label = vocabulary
            .iter()
            .find(|(code, _)| *code == fee.duration)
            .map(|(_, label)| *label)
            .ok_or_else(|| VocabularyError {
                duration: fee.duration.clone(),
            })?;
        parts.push(format!("{label}: {:.2}€", price.round_dp(2)));
    }
    Ok(parts.join(", "))
}

/// Applies `rules` in order and trims the result.
///
/// Best effort: the output is display text, not a machine-readable schedule.
#[must_use]
pub fn clean_opening_hours(text: &str, rules: &[HoursRule]) -> String {
    let mut cleaned = text.to_string();
    for rule in rules {
        match *rule {
            HoursRule::TruncateAt(marker) => {
                if let Some(pos) = cleaned.find(marker) {
                    cleaned.truncate(pos);
                }
            }
            HoursRule::Replace(from, to) => cleaned = cleaned.replace(from, to),
        }
    }
    cleaned.trim().to_string()
}

/// Parses an RFC 3339 timestamp, or a naive ISO timestamp taken as UTC.
#[must_use]
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a yes/no cell in German or English.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "ja" | "j" | "yes" | "y" | "true" | "1" | "x" => Some(true),
        "nein" | "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
