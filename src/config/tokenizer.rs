//! Text-Section Tokenizer
//!
//! Splits raw configuration bytes into named sections, each holding an
//! ordered list of cleaned `key=value` lines. Knows nothing about WireGuard
//! semantics; validation happens downstream in the model builder.

use std::collections::HashMap;

/// Recognized configuration sections, resolved once at tokenization time.
///
/// Lines seen before any `[Name]` header accumulate under the kind supplied
/// by the caller (normally [`SectionKind::Preamble`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Preamble,
    Interface,
    Peer,
    Socks5,
    Unknown,
}

impl SectionKind {
    /// Resolve a cleaned bracket line (`[Interface]`, `[Peer]`, ...) to a
    /// section kind. Unrecognized names map to `Unknown` and are kept so the
    /// grammar stays forward-compatible with sections we do not interpret.
    fn from_header(header: &str) -> Self {
        match header {
            "[Interface]" => SectionKind::Interface,
            "[Peer]" => SectionKind::Peer,
            "[Socks5]" => SectionKind::Socks5,
            _ => SectionKind::Unknown,
        }
    }
}

/// Tokenized configuration: section kind to the ordered cleaned lines that
/// belong to it. Repeated sections of the same kind merge into one list.
#[derive(Debug, Default)]
pub struct Sections {
    lines: HashMap<SectionKind, Vec<String>>,
}

impl Sections {
    /// Tokenize raw configuration bytes.
    ///
    /// Per-line rules:
    /// - carriage returns are stripped;
    /// - backtick, double-quote, and space characters are removed anywhere in
    ///   the line (a character filter, not a trim — values cannot contain
    ///   spaces);
    /// - cleaned lines that are empty or start with `--` or `#` are dropped;
    /// - a cleaned `[Name]` line switches the current section and is not
    ///   stored as data;
    /// - everything else is appended to the current section's line list.
    ///
    /// Never fails: malformed input just yields sparse or empty sections.
    pub fn tokenize(raw: &[u8], initial: SectionKind) -> Self {
        let mut sections = Sections::default();
        let mut current = initial;

        for line in String::from_utf8_lossy(raw).split('\n') {
            let cleaned = clean_line(line);
            if cleaned.is_empty() || cleaned.starts_with("--") || cleaned.starts_with('#') {
                continue;
            }
            if cleaned.starts_with('[') && cleaned.ends_with(']') {
                current = SectionKind::from_header(&cleaned);
                continue;
            }
            sections.lines.entry(current).or_default().push(cleaned);
        }

        sections
    }

    /// Lines of a section, if the section appeared at all.
    pub fn get(&self, kind: SectionKind) -> Option<&[String]> {
        self.lines.get(&kind).map(|v| v.as_slice())
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.lines.contains_key(&kind)
    }
}

/// Remove `\r` plus the filtered characters (backtick, double quote, space)
/// from anywhere in the line.
fn clean_line(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '\r' | '`' | '"' | ' '))
        .collect()
}

/// Split a cleaned line into `(key, value)` on the first `=`.
///
/// A line without `=` yields `("", "")`. The surrounding characters have
/// already been space-filtered by the tokenizer, so no trimming is needed.
/// This deliberately replaces the index-arithmetic boundary quirks of the
/// original grammar with the conventional first-equals rule.
pub fn split_pair(line: &str) -> (&str, &str) {
    match line.find('=') {
        Some(idx) => (&line[..idx], &line[idx + 1..]),
        None => ("", ""),
    }
}
