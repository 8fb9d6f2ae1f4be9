//! Protected segments
//!
//! Some substrings must come through a wrap pass byte-for-byte, with no span
//! boundary inside them:
//!
//! - template placeholders, `{{ ... }}`, always;
//! - shortcode tokens (`[gallery ids="1"]`, `[note]...[/note]`) whose tag is
//!   whitelisted.
//!
//! [`ProtectedSegmenter::split`] cuts a string into alternating protected and
//! unprotected segments. The segments concatenate back to the input exactly.
//! Overlapping protections resolve first-wins: sorted by start, a span that
//! begins inside an already accepted span is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static TEMPLATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("template token pattern"));

static SHORTCODE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([A-Za-z0-9_-]+)((?:\s[^\[\]]*)?)(/?)\]").expect("shortcode pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub protected: bool,
}

impl<'a> Segment<'a> {
    fn plain(text: &'a str) -> Self {
        Segment {
            text,
            protected: false,
        }
    }
}

/// A shortcode occurrence reported by a [`ShortcodeMatcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcodeMatch {
    pub tag: String,
    /// Byte range of the whole token, on char boundaries
    pub range: Range<usize>,
}

/// Finds shortcode tokens in text.
///
/// The host environment owns the real shortcode grammar; this trait is the
/// seam it plugs into. [`BracketShortcodes`] is the built-in approximation.
pub trait ShortcodeMatcher: Send + Sync {
    fn find_shortcodes(&self, text: &str) -> Vec<ShortcodeMatch>;
}

/// `[name attrs]`, `[name attrs /]` and `[name attrs]...[/name]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketShortcodes;

impl ShortcodeMatcher for BracketShortcodes {
    fn find_shortcodes(&self, text: &str) -> Vec<ShortcodeMatch> {
        let mut found = Vec::new();
        let mut pos = 0;

        while let Some(caps) = SHORTCODE_OPEN.captures_at(text, pos) {
            let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let self_closing =
                !caps[3].is_empty() || caps[2].trim_end().ends_with('/');

            let mut end = whole.end();
            if !self_closing {
                let closing = format!("[/{}]", tag.as_str());
                if let Some(offset) = text[whole.end()..].find(&closing) {
                    end = whole.end() + offset + closing.len();
                }
            }

            found.push(ShortcodeMatch {
                tag: tag.as_str().to_string(),
                range: whole.start()..end,
            });
            // Keep scanning inside enclosing bodies; nested tokens are
            // reported too and resolved by the segmenter.
            pos = whole.end();
        }

        found
    }
}

pub struct ProtectedSegmenter {
    whitelist: Vec<String>,
    shortcodes: Box<dyn ShortcodeMatcher>,
}

impl std::fmt::Debug for ProtectedSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedSegmenter")
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

impl ProtectedSegmenter {
    pub fn new(whitelist: Vec<String>) -> Self {
        Self::with_matcher(whitelist, Box::new(BracketShortcodes))
    }

    pub fn with_matcher(whitelist: Vec<String>, shortcodes: Box<dyn ShortcodeMatcher>) -> Self {
        ProtectedSegmenter {
            whitelist,
            shortcodes,
        }
    }

    /// Whether `tag` is a whitelisted shortcode name
    pub fn is_whitelisted(&self, tag: &str) -> bool {
        self.whitelist.iter().any(|name| name == tag)
    }

    /// Split `text` into ordered segments.
    ///
    /// With no protected spans the result is a single unprotected segment
    /// holding all of `text` (even when `text` is empty).
    pub fn split<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut spans: Vec<Range<usize>> =
            TEMPLATE_TOKEN.find_iter(text).map(|m| m.range()).collect();

        if !self.whitelist.is_empty() {
            spans.extend(
                self.shortcodes
                    .find_shortcodes(text)
                    .into_iter()
                    .filter(|sc| self.is_whitelisted(&sc.tag))
                    .map(|sc| sc.range)
                    .filter(|range| {
                        range.start < range.end
                            && range.end <= text.len()
                            && text.is_char_boundary(range.start)
                            && text.is_char_boundary(range.end)
                    }),
            );
        }

        if spans.is_empty() {
            return vec![Segment::plain(text)];
        }

        // Earliest first; on a shared start the longer span wins
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut segments = Vec::new();
        let mut cursor = 0;
        for span in spans {
            if span.start < cursor {
                continue;
            }
            if span.start > cursor {
                segments.push(Segment::plain(&text[cursor..span.start]));
            }
            segments.push(Segment {
                text: &text[span.clone()],
                protected: true,
            });
            cursor = span.end;
        }
        if cursor < text.len() {
            segments.push(Segment::plain(&text[cursor..]));
        }

        segments
    }
}
