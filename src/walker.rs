//! Tree walk and in-place wrapping
//!
//! [`TreeWalker::wrap_within_roots`] visits every root in pre-order with an
//! explicit stack. Children are snapshotted before they are pushed, so
//! replacing a text node never disturbs the walk.
//!
//! Per node:
//!
//! - element in [`ALWAYS_EXCLUDED_TAGS`], or in the exclusion set: skip the
//!   whole subtree;
//! - text whose parent is an already generated span: skip (this is what makes
//!   repeated passes idempotent);
//! - any other text: split into protected/unprotected segments, and if an
//!   unprotected segment has a typed run, replace the node with text and
//!   `<span class="{prefix}-{type}">` nodes. Nothing is touched otherwise.

use crate::dom::{self, NodeSet};
use crate::matcher::TypeMatcher;
use crate::protect::ProtectedSegmenter;
use markup5ever_rcdom::{Handle, NodeData};

/// Tags whose content is never wrapped
pub const ALWAYS_EXCLUDED_TAGS: [&str; 7] =
    ["script", "style", "code", "pre", "textarea", "kbd", "samp"];

/// Tag of generated wrappers
pub const WRAP_TAG: &str = "span";

pub fn is_always_excluded(tag: &str) -> bool {
    ALWAYS_EXCLUDED_TAGS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(tag))
}

/// A slice of a text node after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    /// Kept as plain text (gaps and protected segments)
    Text(&'a str),
    /// One typed run, to be wrapped
    Wrapped { type_id: &'a str, text: &'a str },
}

impl<'a> Piece<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Piece::Text(text) | Piece::Wrapped { text, .. } => text,
        }
    }
}

pub struct TreeWalker<'w> {
    matcher: &'w TypeMatcher,
    segmenter: &'w ProtectedSegmenter,
    class_prefix: &'w str,
}

impl<'w> TreeWalker<'w> {
    pub fn new(
        matcher: &'w TypeMatcher,
        segmenter: &'w ProtectedSegmenter,
        class_prefix: &'w str,
    ) -> Self {
        TreeWalker {
            matcher,
            segmenter,
            class_prefix,
        }
    }

    /// Class for a wrapped run of `type_id`
    pub fn class_for(&self, type_id: &str) -> String {
        format!("{}-{}", self.class_prefix, type_id)
    }

    /// Split `text` into pieces, or `None` when no unprotected segment holds
    /// a typed run (the node should then be left alone).
    ///
    /// The pieces' texts concatenate back to `text`.
    pub fn classify<'a>(&'a self, text: &'a str) -> Option<Vec<Piece<'a>>> {
        let segments = self.segmenter.split(text);
        let worth_it = segments
            .iter()
            .any(|segment| !segment.protected && self.matcher.is_match(segment.text));
        if !worth_it {
            return None;
        }

        let mut pieces = Vec::new();
        for segment in segments {
            if segment.protected {
                if !segment.text.is_empty() {
                    pieces.push(Piece::Text(segment.text));
                }
                continue;
            }

            let mut cursor = 0;
            for run in self.matcher.find_runs(segment.text) {
                if run.range.start > cursor {
                    pieces.push(Piece::Text(&segment.text[cursor..run.range.start]));
                }
                pieces.push(Piece::Wrapped {
                    type_id: run.type_id,
                    text: run.text,
                });
                cursor = run.range.end;
            }
            if cursor < segment.text.len() {
                pieces.push(Piece::Text(&segment.text[cursor..]));
            }
        }

        Some(pieces)
    }

    /// Wrap every eligible text node under `roots`; returns how many text
    /// nodes were replaced.
    ///
    /// A root that is itself in `excluded`, or sits under an element that is,
    /// is skipped entirely.
    pub fn wrap_within_roots(&self, roots: &[Handle], excluded: &NodeSet) -> usize {
        let mut replaced = 0;

        for root in roots {
            if dom::is_within(root, excluded) {
                continue;
            }

            let mut stack: Vec<(Handle, Option<Handle>)> = vec![(root.clone(), None)];
            while let Some((node, parent)) = stack.pop() {
                match &node.data {
                    NodeData::Element { name, .. } => {
                        if is_always_excluded(&name.local)
                            || excluded.contains(&dom::node_key(&node))
                        {
                            continue;
                        }
                        let children: Vec<Handle> = node.children.borrow().clone();
                        stack.extend(
                            children
                                .into_iter()
                                .rev()
                                .map(|child| (child, Some(node.clone()))),
                        );
                    }
                    NodeData::Text { .. } => {
                        let Some(parent) = parent else {
                            continue;
                        };
                        if self.is_wrapped_span(&parent) {
                            continue;
                        }
                        if self.wrap_text_node(&parent, &node) {
                            replaced += 1;
                        }
                    }
                    _ => {}
                }
            }
        }

        replaced
    }

    /// Is `element` a span this engine generated (class `{prefix}-{type}`)?
    pub fn is_wrapped_span(&self, element: &Handle) -> bool {
        if !dom::tag_name(element).is_some_and(|tag| tag.eq_ignore_ascii_case(WRAP_TAG)) {
            return false;
        }
        let marker = format!("{}-", self.class_prefix);
        dom::class_tokens(element).iter().any(|token| {
            token.len() > marker.len()
                && token
                    .get(..marker.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(&marker))
        })
    }

    /// Nodes for `pieces`: adjacent plain pieces merge into one text node
    pub fn build_nodes(&self, pieces: &[Piece]) -> Vec<Handle> {
        let mut nodes = Vec::new();
        let mut pending = String::new();

        for piece in pieces {
            match piece {
                Piece::Text(text) => pending.push_str(text),
                Piece::Wrapped { type_id, text } => {
                    if !pending.is_empty() {
                        nodes.push(dom::create_text(&pending));
                        pending.clear();
                    }
                    let class = self.class_for(type_id);
                    let span = dom::create_element(WRAP_TAG, vec![("class", &class)]);
                    dom::append(&span, dom::create_text(text));
                    nodes.push(span);
                }
            }
        }
        if !pending.is_empty() {
            nodes.push(dom::create_text(&pending));
        }

        nodes
    }

    fn wrap_text_node(&self, parent: &Handle, node: &Handle) -> bool {
        let Some(text) = dom::text_of(node) else {
            return false;
        };
        if text.is_empty() {
            return false;
        }
        let Some(pieces) = self.classify(&text) else {
            return false;
        };
        let replacements = self.build_nodes(&pieces);
        dom::replace_child(parent, node, replacements)
    }
}
