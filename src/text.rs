//! Text shaping for terminal columns and log lines.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

const LOG_LINE_LIMIT: usize = 180;
const MASK: &str = "***";

static BEARER_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(bearer)\s+[^\s,;]+").expect("valid bearer regex"));
static SECRET_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(password|token|secret)(["']?\s*[:=]\s*["']?)[^\s"',;&}]+"#)
        .expect("valid secret field regex")
});
// Three dot-separated base64url segments, the shape of the session JWT.
static JWT_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\b")
        .expect("valid jwt regex")
});

/// Joins all whitespace runs (newlines included) into single spaces.
pub fn single_line(value: &str) -> String {
    let mut line = String::with_capacity(value.len());
    for word in value.split_whitespace() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    line
}

/// Trims and cuts `value` to at most `width` characters, marking a cut with `…`.
pub fn fit_width(value: &str, width: usize) -> Cow<'_, str> {
    let value = value.trim();
    if width == 0 {
        return Cow::Borrowed("");
    }
    match value.char_indices().nth(width) {
        None => Cow::Borrowed(value),
        Some(_) => {
            let keep = value
                .char_indices()
                .nth(width - 1)
                .map(|(index, _)| index)
                .unwrap_or(value.len());
            Cow::Owned(format!("{}…", &value[..keep]))
        }
    }
}

/// Masks bearer values, `password=`/`token:` style fields and JWT-shaped strings, then
/// flattens the message to one bounded log line.
pub fn scrub_secrets(message: &str) -> String {
    let flat = single_line(message);
    let masked = BEARER_VALUE.replace_all(&flat, format!("$1 {MASK}"));
    let masked = SECRET_FIELD.replace_all(&masked, format!("$1$2{MASK}"));
    let masked = JWT_LIKE.replace_all(&masked, MASK);
    fit_width(&masked, LOG_LINE_LIMIT).into_owned()
}
