//! Combined multi-type matcher
//!
//! All active types are folded into one alternation so a single left-to-right
//! scan finds every run. Each alternative is a named group (`__ml0`,
//! `__ml1`, ...), and the type of a match is the first named group that
//! participated. Named groups keep this mapping stable even when a custom
//! regex carries capture groups of its own.
//!
//! Order matters when two classes can claim the same code point: custom
//! types come first, then built-ins, each keeping its configured relative
//! order. The first alternative that matches at a position wins.

use crate::patterns::{is_builtin, PatternTable};
use regex::Regex;
use std::ops::Range;

const GROUP_PREFIX: &str = "__ml";

/// One typed run found in a haystack.
///
/// `range` is in bytes, always on char boundaries, so it slices safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedRun<'t> {
    pub type_id: &'t str,
    pub text: &'t str,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct TypeMatcher {
    regex: Regex,
    types: Vec<String>,
    group_names: Vec<String>,
}

impl TypeMatcher {
    /// Build the matcher for `active` types.
    ///
    /// Types without a usable fragment in `table` are skipped. Returns `None`
    /// when nothing is left, which callers treat as "nothing to wrap".
    pub fn build(active: &[String], table: &PatternTable) -> Option<Self> {
        let custom = active.iter().filter(|t| !is_builtin(t));
        let builtin = active.iter().filter(|t| is_builtin(t));

        let mut types = Vec::new();
        let mut parts = Vec::new();
        let mut group_names = Vec::new();
        for type_id in custom.chain(builtin) {
            if types.contains(type_id) {
                continue;
            }
            let Some(fragment) = table.get(type_id) else {
                continue;
            };
            let name = format!("{}{}", GROUP_PREFIX, types.len());
            parts.push(format!("(?P<{}>{})", name, fragment));
            group_names.push(name);
            types.push(type_id.clone());
        }

        if parts.is_empty() {
            return None;
        }

        let regex = Regex::new(&parts.join("|")).ok()?;
        Some(TypeMatcher {
            regex,
            types,
            group_names,
        })
    }

    /// Types in alternation order (custom first, then built-in)
    pub fn ordered_types(&self) -> &[String] {
        &self.types
    }

    /// True when `text` holds at least one non-empty typed run
    pub fn is_match(&self, text: &str) -> bool {
        self.regex
            .find_iter(text)
            .any(|m| !m.as_str().is_empty())
    }

    /// Every non-empty typed run in `text`, left to right
    pub fn find_runs<'t>(&'t self, text: &'t str) -> Vec<TypedRun<'t>> {
        let mut runs = Vec::new();

        for caps in self.regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.as_str().is_empty() {
                continue;
            }
            let Some(index) = self
                .group_names
                .iter()
                .position(|name| caps.name(name).is_some_and(|g| !g.as_str().is_empty()))
            else {
                continue;
            };

            runs.push(TypedRun {
                type_id: &self.types[index],
                text: whole.as_str(),
                range: whole.range(),
            });
        }

        runs
    }
}
