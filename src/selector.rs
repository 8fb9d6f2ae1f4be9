//! Restricted selector grammar
//!
//! Only this much CSS is understood:
//!
//! ```text
//! selector := compound (whitespace compound)*
//! compound := tag? ("." class)*        (at least one of the two)
//! tag      := "*" | [A-Za-z][A-Za-z0-9-]*
//! class    := [A-Za-z0-9_-]+ (Unicode word characters allowed)
//! ```
//!
//! Whitespace is the descendant combinator. Anything else (attribute
//! selectors, pseudo-classes, `>`/`+`/`~`, commas) makes [`Selector::parse`]
//! return `None`, which callers treat as "selects nothing".

use crate::dom::{self, NodeSet};
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static COMPOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9-]*)?((?:\.[\w-]+)*)$").expect("compound pattern")
});

static CLASS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z0-9_-]+)").expect("class token pattern"));

/// `tag.class.class`, one step of a descendant chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    /// Lowercased; `None` matches any element
    pub tag: Option<String>,
    pub classes: Vec<String>,
}

impl Compound {
    pub fn parse(token: &str) -> Option<Self> {
        let caps = COMPOUND.captures(token)?;
        let tag = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|t| *t != "*")
            .map(str::to_ascii_lowercase);
        let classes: Vec<String> = caps[2]
            .split('.')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if caps.get(1).is_none() && classes.is_empty() {
            return None;
        }
        Some(Compound { tag, classes })
    }

    pub fn matches(&self, element: &Handle) -> bool {
        let Some(tag) = dom::tag_name(element) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !tag.eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if self.classes.is_empty() {
            return true;
        }
        let tokens = dom::class_tokens(element);
        self.classes
            .iter()
            .all(|class| tokens.iter().any(|token| token == class))
    }

    fn render(&self) -> String {
        let mut out = self.tag.clone().unwrap_or_default();
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        if out.is_empty() {
            out.push('*');
        }
        out
    }
}

/// A compiled selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A lone `.class`: any element carrying the class
    AnyWithClass(String),
    /// Compounds joined by descendant combinators, outermost first
    Descendant(Vec<Compound>),
}

impl Selector {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let compounds = input
            .split_whitespace()
            .map(Compound::parse)
            .collect::<Option<Vec<_>>>()?;

        if let [only] = compounds.as_slice() {
            if only.tag.is_none() && only.classes.len() == 1 && input.starts_with('.') {
                return Some(Selector::AnyWithClass(only.classes[0].clone()));
            }
        }
        Some(Selector::Descendant(compounds))
    }

    /// Parse every selector, logging and skipping the ones outside the grammar
    pub fn parse_all(inputs: &[String]) -> Vec<Selector> {
        inputs
            .iter()
            .filter_map(|input| {
                let parsed = Selector::parse(input);
                if parsed.is_none() {
                    warn!(selector = %input, "unsupported selector syntax, ignoring");
                }
                parsed
            })
            .collect()
    }

    /// Does `element` match, looking at its ancestors for descendant steps?
    pub fn matches(&self, element: &Handle) -> bool {
        match self {
            Selector::AnyWithClass(class) => dom::has_class(element, class),
            Selector::Descendant(compounds) => {
                let Some((last, ancestors)) = compounds.split_last() else {
                    return false;
                };
                if !last.matches(element) {
                    return false;
                }
                // Right to left, nearest matching ancestor for each step
                let mut remaining = ancestors.iter().rev().peekable();
                let mut current = dom::parent_of(element);
                while let Some(step) = remaining.peek() {
                    let Some(node) = current else {
                        return false;
                    };
                    if !dom::is_element(&node) {
                        return false;
                    }
                    if step.matches(&node) {
                        remaining.next();
                    }
                    current = dom::parent_of(&node);
                }
                true
            }
        }
    }

    /// All matching elements under `scope`, in document order
    pub fn query_all(&self, scope: &Handle) -> Vec<Handle> {
        dom::elements_in_order(scope)
            .into_iter()
            .filter(|element| self.matches(element))
            .collect()
    }
}

/// Union of every selector's matches under `scope`, as a node set
pub fn collect_node_set(selectors: &[Selector], scope: &Handle) -> NodeSet {
    let mut set = NodeSet::new();
    if selectors.is_empty() {
        return set;
    }
    for element in dom::elements_in_order(scope) {
        if selectors.iter().any(|s| s.matches(&element)) {
            set.insert(dom::node_key(&element));
        }
    }
    set
}

/// Widen exclude selectors to survive extra classes on compound tokens.
///
/// Markup generators often add classes that are unknown when the rule is
/// written (`.wp-block-button.is-style-outline`). For every token carrying
/// two or more classes this adds one variant per class with that class
/// dropped, plus the selector with the whole token dropped when other tokens
/// remain. Originals come first; the result is deduplicated and stable.
///
/// This is a heuristic, not CSS semantics: the variants match strictly more
/// elements than the rule as written.
pub fn expand_exclude_variants(selectors: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !expanded.contains(&candidate) {
            expanded.push(candidate);
        }
    };

    for selector in selectors {
        let selector = selector.trim();
        push(selector.to_string());

        let tokens: Vec<&str> = selector.split_whitespace().collect();
        for (index, token) in tokens.iter().enumerate() {
            let Some(compound) = Compound::parse(token) else {
                continue;
            };
            if compound.classes.len() < 2 {
                continue;
            }

            for dropped in 0..compound.classes.len() {
                let mut reduced = compound.clone();
                reduced.classes.remove(dropped);
                let mut variant: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
                variant[index] = reduced.render();
                push(variant.join(" "));
            }

            if tokens.len() > 1 {
                let remaining: Vec<&str> = tokens
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, t)| *t)
                    .collect();
                push(remaining.join(" "));
            }
        }
    }

    expanded
}

/// Class names referenced anywhere in `selectors`, first occurrence order
pub fn extract_class_tokens(selectors: &[String]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for selector in selectors {
        for caps in CLASS_TOKEN.captures_iter(selector) {
            let class = caps[1].to_string();
            if !tokens.contains(&class) {
                tokens.push(class);
            }
        }
    }
    tokens
}
