//! Module property resources.
//!
//! # Responsibility
//! - Read `.properties` style resources shipped with a module.
//! - Split comma-separated property values into sets.
//!
//! # Invariants
//! - A missing or unreadable resource yields empty properties, never an error.
//! - Later definitions of the same key replace earlier ones.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

/// Parsed key/value pairs of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Loads `resource` relative to a module resource root.
pub fn load_properties(root: impl AsRef<Path>, resource: &str) -> Properties {
    let path = root.as_ref().join(resource.trim_start_matches('/'));
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            let properties = parse_properties(&text);
            debug!(
                "event=properties_load module=properties status=ok path={} entries={}",
                path.display(),
                properties.len()
            );
            properties
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(
                "event=properties_load module=properties status=missing path={}",
                path.display()
            );
            Properties::new()
        }
        Err(err) => {
            warn!(
                "event=properties_load module=properties status=error path={} error={}",
                path.display(),
                err
            );
            Properties::new()
        }
    }
}

/// Parses properties text.
///
/// Supports `=`, `:` and whitespace separators, `#`/`!` comment lines,
/// trailing-backslash line continuation and backslash escapes
/// (`\t \n \r \f \\ \uXXXX`; any other escaped character stands for
/// itself, so `\ `, `\=` and `\:` keep separators inside keys).
pub fn parse_properties(text: &str) -> Properties {
    let mut properties = Properties::new();
    let mut pending = String::new();

    for raw_line in text.lines() {
        let line = raw_line.trim_start();

        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if let Some(continued) = strip_continuation(line) {
            pending.push_str(continued);
            continue;
        }

        pending.push_str(line);
        insert_logical_line(&mut properties, &pending);
        pending.clear();
    }

    if !pending.is_empty() {
        insert_logical_line(&mut properties, &pending);
    }

    properties
}

/// Splits a comma-separated value; entries are trimmed and empties dropped.
pub fn format_property_values(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_continuation(line: &str) -> Option<&str> {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    // An even run ends in an escaped backslash, not a continuation.
    if trailing % 2 == 1 {
        Some(&line[..line.len() - 1])
    } else {
        None
    }
}

fn insert_logical_line(properties: &mut Properties, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let key_end = find_key_end(line);
    let raw_key = &line[..key_end];

    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }

    properties.set(unescape(raw_key), unescape(rest));
}

/// Byte offset of the first unescaped `=`, `:` or whitespace.
fn find_key_end(line: &str) -> usize {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return index,
            c if c.is_whitespace() => return index,
            _ => {}
        }
    }
    line.len()
}

fn unescape(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    // Consecutive `\uXXXX` escapes may form a surrogate pair.
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_utf16(&mut units, &mut decoded);
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => match read_hex_unit(&mut chars) {
                Some(unit) => units.push(unit),
                None => {
                    flush_utf16(&mut units, &mut decoded);
                    decoded.push('u');
                }
            },
            Some(escaped) => {
                flush_utf16(&mut units, &mut decoded);
                decoded.push(match escaped {
                    't' => '\t',
                    'n' => '\n',
                    'r' => '\r',
                    'f' => '\u{0C}',
                    other => other,
                });
            }
            None => {}
        }
    }
    flush_utf16(&mut units, &mut decoded);
    decoded
}

/// Consumes four hex digits; leaves `chars` untouched when malformed.
fn read_hex_unit(chars: &mut std::str::Chars<'_>) -> Option<u16> {
    let digits = chars.clone().take(4).collect::<String>();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let unit = u16::from_str_radix(&digits, 16).ok()?;
    for _ in 0..4 {
        chars.next();
    }
    Some(unit)
}

fn flush_utf16(units: &mut Vec<u16>, decoded: &mut String) {
    if units.is_empty() {
        return;
    }
    decoded.extend(
        char::decode_utf16(units.drain(..))
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}
