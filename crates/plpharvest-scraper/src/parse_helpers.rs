//! Internal scanning primitives shared by the normalizer, the catalog
//! locator, and the DOM heuristics.
//!
//! Price parsing is deliberately byte-level and locale-naive: thousands
//! separators (`,`) are removed, then the first decimal-looking token wins.
//! Price filtering downstream depends on this exact behavior.

use serde_json::Value;

/// Parses the first decimal-looking token out of a display price.
///
/// `"£1,299.00"` → `1299.0`, `"Now £20 (was £30)"` → `20.0`,
/// `"Sold out"` → `None`.
#[must_use]
pub(crate) fn parse_price_text(text: &str) -> Option<f64> {
    let stripped: String = text.chars().filter(|&c| c != ',').collect();
    first_decimal_token(&stripped).and_then(|token| token.parse::<f64>().ok())
}

/// Returns the first `digits[.digits]` token in `s`, if any.
///
/// A leading `.` is accepted only when followed by a digit (`".99"`); a
/// trailing `.` with no fraction digits is not part of the token.
fn first_decimal_token(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;

    while i < len {
        let starts_number = bytes[i].is_ascii_digit()
            || (bytes[i] == b'.' && i + 1 < len && bytes[i + 1].is_ascii_digit());
        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < len && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        return Some(&s[start..i]);
    }
    None
}

/// Reads a JSON scalar as a non-negative integer. Accepts integral floats
/// and numeric strings (`"3"`), which the site emits interchangeably.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        // Float path is integral, finite and non-negative before the cast.
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Reads a JSON scalar as a finite float. Numeric strings are parsed as
/// plain numbers; display text with symbols is left to [`parse_price_text`].
#[must_use]
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Reads a JSON scalar as a trimmed, non-empty string. Numbers are rendered
/// in their JSON form so numeric ids survive as `"12345"`.
#[must_use]
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a JSON scalar as a boolean. Accepts `"true"`/`"false"` strings.
#[must_use]
pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Looks up a nested key path in a JSON value.
#[must_use]
pub(crate) fn value_at_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}
