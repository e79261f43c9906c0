//! Structured payload recovery from raw page markup.
//!
//! The listing pages carry their catalog as JSON in one of a few places:
//!
//! 1. A `<script>` block tagged as the catalog state
//!    (`<script id="plp-state" type="application/json">{...}</script>`).
//! 2. An inline assignment to a known global inside a generic script
//!    (`window.asos.plp._data = {...};` or `= JSON.parse('...')`).
//! 3. The framework hydration container (`<script id="__NEXT_DATA__">` or
//!    `window.__NEXT_DATA__ = {...}`), which is the secondary source.
//!
//! Page script is never evaluated. Right-hand sides are cut out with a
//! balanced-brace scan and must be strict JSON, JSON after one HTML-entity
//! unescape, or the relaxed literal grammar in [`relax_js_literal`]. Anything
//! else is a miss and the caller falls through to the next strategy.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").expect("valid regex"));

static CATALOG_SCRIPT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:\b(?:id|data-id)\s*=\s*["'](?:plp-state|plp-data|__PLP_STATE__|__INITIAL_STATE__)["']|\bdata-catalog\b)"#,
    )
    .expect("valid regex")
});

static CATALOG_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:window\.asos\.plp\._data|window\.__PLP_STATE__|window\.__INITIAL_STATE__)\s*=\s*",
    )
    .expect("valid regex")
});

static HYDRATION_SCRIPT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bid\s*=\s*["']__NEXT_DATA__["']"#).expect("valid regex")
});

static HYDRATION_ASSIGNMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.__NEXT_DATA__\s*=\s*").expect("valid regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:quot|apos|amp|lt|gt|#34|#39|#47|#x22|#x27|#x2[fF]);").expect("valid regex")
});

/// Where a payload lives: a marked script block and/or a global assignment.
struct PayloadSource {
    name: &'static str,
    script_attr: &'static LazyLock<Regex>,
    assignment: &'static LazyLock<Regex>,
}

static PRIMARY: PayloadSource = PayloadSource {
    name: "primary",
    script_attr: &CATALOG_SCRIPT_ATTR_RE,
    assignment: &CATALOG_ASSIGNMENT_RE,
};

static SECONDARY: PayloadSource = PayloadSource {
    name: "secondary",
    script_attr: &HYDRATION_SCRIPT_ATTR_RE,
    assignment: &HYDRATION_ASSIGNMENT_RE,
};

/// Extracts the catalog payload embedded in a listing page.
///
/// Returns `None` when no marked script block or global assignment holds a
/// parsable payload. Never errors: a missing payload is an expected outcome.
#[must_use]
pub fn extract_primary_payload(markup: &str) -> Option<Value> {
    extract_payload(markup, &PRIMARY)
}

/// Extracts the framework hydration payload (`__NEXT_DATA__`).
#[must_use]
pub fn extract_secondary_payload(markup: &str) -> Option<Value> {
    extract_payload(markup, &SECONDARY)
}

fn extract_payload(markup: &str, source: &PayloadSource) -> Option<Value> {
    // Marked script blocks first: their whole body is the payload.
    for cap in SCRIPT_RE.captures_iter(markup) {
        let (Some(attrs), Some(body)) = (cap.get(1), cap.get(2)) else {
            continue;
        };
        if !source.script_attr.is_match(attrs.as_str()) {
            continue;
        }
        if let Some(value) = parse_json_two_stage(body.as_str()) {
            tracing::debug!(source = source.name, "payload found in marked script block");
            return Some(value);
        }
        tracing::debug!(
            source = source.name,
            "marked script block is not valid JSON; continuing scan"
        );
    }

    // Then inline assignments inside any script.
    for cap in SCRIPT_RE.captures_iter(markup) {
        let Some(body) = cap.get(2) else {
            continue;
        };
        let body = body.as_str();
        let Some(assignment) = source.assignment.find(body) else {
            continue;
        };
        let rhs = body[assignment.end()..].trim_start();
        let parsed = parse_assignment_rhs(rhs);
        if parsed.is_some() {
            tracing::debug!(source = source.name, "payload found in global assignment");
        } else {
            // Real script syntax past the relaxed grammar. No evaluation
            // fallback: this source simply has no payload.
            tracing::debug!(
                source = source.name,
                "global assignment is not a structured literal"
            );
        }
        return parsed;
    }

    None
}

/// Parses the right-hand side of a global assignment.
fn parse_assignment_rhs(rhs: &str) -> Option<Value> {
    if rhs.starts_with('{') {
        let literal = extract_balanced_object(rhs)?;
        return parse_json_two_stage(literal)
            .or_else(|| relax_js_literal(literal).and_then(|s| serde_json::from_str(&s).ok()));
    }

    if let Some(rest) = rhs.strip_prefix("JSON.parse(") {
        let rest = rest.trim_start();
        let decoded = decode_js_string_literal(rest)?;
        return parse_json_two_stage(&decoded);
    }

    None
}

/// Parses `text` as JSON, retrying once after unescaping common HTML entities.
pub(crate) fn parse_json_two_stage(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    match unescape_html_entities(trimmed) {
        Cow::Owned(unescaped) => serde_json::from_str::<Value>(&unescaped).ok(),
        Cow::Borrowed(_) => None,
    }
}

/// Replaces common HTML entities in a single pass, so `&amp;quot;` becomes
/// `&quot;` rather than `"`.
pub(crate) fn unescape_html_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        match &caps[0] {
            "&quot;" | "&#34;" | "&#x22;" => "\"",
            "&apos;" | "&#39;" | "&#x27;" => "'",
            "&lt;" => "<",
            "&gt;" => ">",
            "&#47;" | "&#x2f;" | "&#x2F;" => "/",
            _ => "&",
        }
    })
}

/// Returns the shortest prefix of `s` that is a complete `{…}` object.
///
/// Tracks brace/bracket depth while skipping over `"`, `'` and backtick
/// strings and their escapes. `None` if `s` does not start with `{` or the
/// object never closes.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if let Some(q) = quote {
            match c {
                '\\' => escape = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' | '[' => depth += 1,
            ']' => depth -= 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrites a restricted JavaScript object literal into JSON.
///
/// Accepted beyond JSON: bare identifier keys, single-quoted strings, and
/// trailing commas. Template literals, comments, bare identifiers in value
/// position (other than `true`/`false`/`null`) and anything else that would
/// need evaluation yield `None`.
pub(crate) fn relax_js_literal(src: &str) -> Option<String> {
    let chars: Vec<char> = src.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(src.len() + 16);
    let mut i = 0usize;

    while i < len {
        let c = chars[i];
        match c {
            '"' => {
                let end = scan_string_end(&chars, i, '"')?;
                out.extend(&chars[i..=end]);
                i = end + 1;
            }
            '\'' => {
                let end = scan_string_end(&chars, i, '\'')?;
                out.push('"');
                push_single_quoted_body(&mut out, &chars[i + 1..end]);
                out.push('"');
                i = end + 1;
            }
            '`' => return None,
            '/' if matches!(chars.get(i + 1), Some('/' | '*')) => return None,
            ',' => {
                let mut j = i + 1;
                while j < len && chars[j].is_whitespace() {
                    j += 1;
                }
                if !matches!(chars.get(j), Some('}' | ']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < len && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                let mut j = i;
                while j < len && chars[j].is_whitespace() {
                    j += 1;
                }
                let in_key_position = matches!(
                    out.trim_end().chars().next_back(),
                    Some('{' | ',')
                );
                if in_key_position && chars.get(j) == Some(&':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else if matches!(word.as_str(), "true" | "false" | "null") {
                    out.push_str(&word);
                } else {
                    return None;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Some(out)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Index of the closing `quote` for the string opening at `start`.
fn scan_string_end(chars: &[char], start: usize, quote: char) -> Option<usize> {
    let mut escape = false;
    for (offset, &c) in chars[start + 1..].iter().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' {
            escape = true;
        } else if c == quote {
            return Some(start + 1 + offset);
        }
    }
    None
}

/// Copies a single-quoted string body as a double-quoted JSON body.
fn push_single_quoted_body(out: &mut String, body: &[char]) {
    let mut iter = body.iter().peekable();
    while let Some(&c) = iter.next() {
        match c {
            '\\' => match iter.next() {
                Some('\'') => out.push('\''),
                Some(&next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
}

/// Decodes a JavaScript string literal at the start of `s` (either quote
/// style) into its runtime value.
pub(crate) fn decode_js_string_literal(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let quote = *chars.first()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let end = scan_string_end(&chars, 0, quote)?;

    let mut out = String::with_capacity(end);
    let mut i = 1usize;
    while i < end {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }
        let next = *chars.get(i + 1)?;
        i += 2;
        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'u' => {
                let code = hex_code(&chars, i, 4)?;
                i += 4;
                let decoded = if (0xD800..0xDC00).contains(&code) {
                    low_surrogate(&chars, i).and_then(|low| {
                        i += 6;
                        char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
                    })
                } else {
                    char::from_u32(code)
                };
                out.push(decoded.unwrap_or('\u{FFFD}'));
            }
            'x' => {
                out.push(char::from_u32(hex_code(&chars, i, 2)?)?);
                i += 2;
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn hex_code(chars: &[char], at: usize, len: usize) -> Option<u32> {
    let hex: String = chars.get(at..at + len)?.iter().collect();
    u32::from_str_radix(&hex, 16).ok()
}

/// A `\uDC00`-`\uDFFF` escape at `at`, completing a surrogate pair.
fn low_surrogate(chars: &[char], at: usize) -> Option<u32> {
    if chars.get(at) != Some(&'\\') || chars.get(at + 1) != Some(&'u') {
        return None;
    }
    hex_code(chars, at + 2, 4).filter(|code| (0xDC00..=0xDFFF).contains(code))
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
