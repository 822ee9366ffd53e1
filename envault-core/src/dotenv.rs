//! Env-file parser following the dotenv conventions.
//!
//! Rules:
//! - `#` comment lines and blank lines are ignored, as are lines that do not
//!   look like an assignment.
//! - An optional `export ` prefix is accepted; keys use `[A-Za-z0-9_.-]`.
//! - Unquoted values are trimmed and stop at a whitespace-preceded `#`.
//! - `'single'` and `` `backtick` `` values are literal; `"double"` values
//!   expand `\n` and `\r`. Quoted values may span several lines.
//! - A later assignment of the same key wins.

use std::collections::HashMap;

/// Parsed key/value pairs of an env file.
pub type EnvMap = HashMap<String, String>;

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Parse env-file text into a key/value map.
pub fn parse(content: &str) -> EnvMap {
    let lines: Vec<&str> = content.lines().collect();
    let mut map = EnvMap::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        idx += 1;

        let Some((key, rest)) = split_assignment(line) else {
            continue;
        };

        let value = match rest.chars().next() {
            Some(quote) if QUOTES.contains(&quote) => {
                let body = &rest[quote.len_utf8()..];
                if let Some(end) = body.find(quote) {
                    unescape(&body[..end], quote)
                } else if let Some((joined, consumed)) = collect_multiline(body, &lines[idx..], quote)
                {
                    idx += consumed;
                    unescape(&joined, quote)
                } else {
                    unquoted(rest)
                }
            }
            _ => unquoted(rest),
        };

        map.insert(key.to_string(), value);
    }

    map
}

/// Decode a raw value exactly as the parser would if it appeared as `x=<raw>`.
///
/// Remote values are compared against local ones through this function so
/// that quoting differences do not count as changes.
pub fn parse_value(raw: &str) -> String {
    parse(&format!("x={raw}")).remove("x").unwrap_or_default()
}

/// Whether `key` is made only of characters the parser accepts in a key.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Split `KEY = value` into the key and the left-trimmed raw value.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = match trimmed.strip_prefix("export") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => trimmed,
    };

    let (key, rest) = trimmed.split_once('=')?;
    let key = key.trim_end();
    if !is_valid_key(key) {
        return None;
    }
    Some((key, rest.trim_start()))
}

fn unquoted(rest: &str) -> String {
    let mut end = rest.len();
    let mut prev_ws = false;
    for (i, c) in rest.char_indices() {
        if c == '#' && prev_ws {
            end = i;
            break;
        }
        prev_ws = c.is_whitespace();
    }
    rest[..end].trim().to_string()
}

/// Join continuation lines until the closing quote.
///
/// Returns the joined body and how many extra lines were consumed, or `None`
/// if the quote is never closed.
fn collect_multiline(first: &str, following: &[&str], quote: char) -> Option<(String, usize)> {
    let mut joined = first.to_string();
    for (n, line) in following.iter().enumerate() {
        joined.push('\n');
        if let Some(end) = line.find(quote) {
            joined.push_str(&line[..end]);
            return Some((joined, n + 1));
        }
        joined.push_str(line);
    }
    None
}

fn unescape(body: &str, quote: char) -> String {
    if quote == '"' {
        body.replace("\\n", "\n").replace("\\r", "\r")
    } else {
        body.to_string()
    }
}
