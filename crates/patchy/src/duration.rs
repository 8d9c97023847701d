//! Parsing of `-w` style durations such as `500ms`, `10s` or `1m30s`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("unknown unit {unit:?} in duration {text:?}")]
    UnknownUnit { unit: String, text: String },
}

/// Parse a duration made of `<number><unit>` terms.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; numbers may have a
/// fraction. A bare number is taken as seconds.
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DurationError::Empty);
    }
    if let Ok(seconds) = text.parse::<f64>() {
        return nanos(seconds * 1e9).ok_or_else(|| DurationError::Invalid(text.to_string()));
    }

    let mut total = 0.0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if number_len == 0 {
            return Err(DurationError::Invalid(text.to_string()));
        }
        let value: f64 =
            rest[..number_len].parse().map_err(|_| DurationError::Invalid(text.to_string()))?;
        rest = &rest[number_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(DurationError::Invalid(text.to_string())),
            unit => {
                return Err(DurationError::UnknownUnit {
                    unit: unit.to_string(),
                    text: text.to_string(),
                });
            }
        };
        total += value * scale;
        rest = &rest[unit_len..];
    }

    nanos(total).ok_or_else(|| DurationError::Invalid(text.to_string()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn nanos(value: f64) -> Option<Duration> {
    (value.is_finite() && value >= 0.0 && value < u64::MAX as f64)
        .then(|| Duration::from_nanos(value.round() as u64))
}
