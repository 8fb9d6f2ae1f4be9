//! Character-class patterns per type
//!
//! A type is a named run of characters: `en` is a run of Latin letters, `ko`
//! a run of Hangul, and so on. Each type maps to a regex fragment that
//! matches one maximal run. Six types are built in; users extend the table
//! with custom charsets.
//!
//! Custom charsets come in two shapes:
//!
//! - a literal list of characters (`•`, `※◆`), every code point escaped and
//!   folded into a character class;
//! - a delimited regex (`/[\x{2460}-\x{2473}]+/`), used verbatim after the
//!   delimiters are stripped and the trailing flags translated.
//!
//! Fragments that fail to compile are dropped, so the active type list may
//! shrink relative to the configuration.

use crate::config::CustomCharset;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Built-in type identifiers, in their canonical order
pub const BUILTIN_TYPES: [&str; 6] = ["en", "ko", "cn", "jp", "num", "punct"];

const BUILTIN_PATTERNS: [(&str, &str); 6] = [
    ("en", r"[A-Za-z]+"),
    ("ko", r"[\x{3131}-\x{318E}\x{AC00}-\x{D7A3}]+"),
    ("cn", r"[\x{4E00}-\x{9FBF}]+"),
    ("jp", r"[\x{3040}-\x{309F}\x{30A0}-\x{30FF}]+"),
    ("num", r"[0-9]+"),
    (
        "punct",
        r#"[\[\]（）()\.\#\^\-\&,;:@%\*，、。」'"‘’“”«»–—…]+"#,
    ),
];

static DELIMITED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^/(.*)/([gimsuy]*)$").expect("delimited regex pattern"));

pub fn is_builtin(type_id: &str) -> bool {
    BUILTIN_TYPES.contains(&type_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    pub type_id: String,
    pub fragment: String,
}

/// Ordered map from type identifier to regex fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

impl PatternTable {
    /// Table holding only the six built-in types
    pub fn builtin() -> Self {
        let entries = BUILTIN_PATTERNS
            .iter()
            .map(|(type_id, fragment)| PatternEntry {
                type_id: type_id.to_string(),
                fragment: fragment.to_string(),
            })
            .collect();
        PatternTable { entries }
    }

    /// Built-ins plus every valid custom charset, in configuration order.
    ///
    /// A custom entry named like a built-in replaces the built-in fragment.
    pub fn build(custom: &[CustomCharset]) -> Self {
        let mut table = Self::builtin();
        for charset in custom {
            let fragment = charset_fragment(&charset.charset);
            if is_valid_fragment(&fragment) {
                table.insert(&charset.type_id, fragment);
            } else {
                warn!(type_id = %charset.type_id, "dropping custom charset with invalid pattern");
                table.remove(&charset.type_id);
            }
        }
        table
    }

    /// Insert or replace a fragment
    pub fn insert(&mut self, type_id: &str, fragment: String) {
        match self.entries.iter_mut().find(|e| e.type_id == type_id) {
            Some(entry) => entry.fragment = fragment,
            None => self.entries.push(PatternEntry {
                type_id: type_id.to_string(),
                fragment,
            }),
        }
    }

    fn remove(&mut self, type_id: &str) {
        self.entries.retain(|e| e.type_id != type_id);
    }

    pub fn get(&self, type_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.type_id == type_id)
            .map(|e| e.fragment.as_str())
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.get(type_id).is_some()
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }
}

/// Regex fragment for one custom charset string
pub fn charset_fragment(charset: &str) -> String {
    if let Some(caps) = DELIMITED_REGEX.captures(charset) {
        let inner = &caps[1];
        let flags: String = caps[2]
            .chars()
            .filter(|flag| matches!(flag, 'i' | 'm' | 's'))
            .collect();
        return if flags.is_empty() {
            inner.to_string()
        } else {
            format!("(?{}){}", flags, inner)
        };
    }

    let mut chars = charset.chars();
    match (chars.next(), chars.next()) {
        (Some(only), None) => format!("{}+", regex::escape(only.encode_utf8(&mut [0; 4]))),
        _ => {
            let escaped: String = charset
                .chars()
                .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
                .collect();
            format!("[{}]+", escaped)
        }
    }
}

/// A fragment is usable if it compiles both alone and inside a group.
///
/// The grouped check rejects fragments like `a)|(b` that would otherwise
/// break out of their group once combined.
pub fn is_valid_fragment(fragment: &str) -> bool {
    !fragment.is_empty()
        && Regex::new(fragment).is_ok()
        && Regex::new(&format!("(?:{})", fragment)).is_ok()
}
