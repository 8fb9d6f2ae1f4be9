//! Wrap entry points
//!
//! A [`Wrapper`] is built once from a resolved [`WrapConfig`] and then used
//! for any number of fragments. Building compiles everything that depends
//! only on configuration (the combined matcher, selectors, shortcode
//! whitelist); each call parses its own tree.
//!
//! Every string entry point returns valid-or-unchanged markup. Errors are
//! logged and the input comes back as is; the `try_*` variants expose them.

use crate::config::{WrapConfig, WrapOptions};
use crate::dom;
use crate::error::WrapError;
use crate::matcher::TypeMatcher;
use crate::patterns::PatternTable;
use crate::protect::{BracketShortcodes, ProtectedSegmenter, ShortcodeMatcher};
use crate::selector::{collect_node_set, expand_exclude_variants, extract_class_tokens, Selector};
use crate::walker::TreeWalker;
use markup5ever_rcdom::Handle;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Targets for shortcode output, where no selector configuration applies
pub const FALLBACK_TAGS: [&str; 17] = [
    "p",
    "li",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "figcaption",
    "td",
    "th",
    "a",
    "span",
    "em",
    "strong",
    "div",
];

#[derive(Debug)]
pub struct Wrapper {
    config: WrapConfig,
    matcher: Option<TypeMatcher>,
    segmenter: ProtectedSegmenter,
    targets: Vec<Selector>,
    fallback_targets: Vec<Selector>,
    excludes: Vec<Selector>,
    /// Class tokens of the auto selectors, for the substring pre-check
    needles: Vec<String>,
}

impl Default for Wrapper {
    fn default() -> Self {
        Wrapper::new(WrapConfig::default())
    }
}

impl Wrapper {
    pub fn new(config: WrapConfig) -> Self {
        Self::with_shortcode_matcher(config, Box::new(BracketShortcodes))
    }

    pub fn from_options(options: &WrapOptions) -> Self {
        Self::new(options.resolve())
    }

    /// Build with a host-provided shortcode grammar
    pub fn with_shortcode_matcher(config: WrapConfig, shortcodes: Box<dyn ShortcodeMatcher>) -> Self {
        let table = PatternTable::build(&config.custom_charsets);
        let matcher = TypeMatcher::build(&config.types, &table);
        match &matcher {
            Some(matcher) => debug!(types = ?matcher.ordered_types(), "compiled type matcher"),
            None => {
                warn!(types = ?config.types, "no active type has a usable pattern, wrapping disabled")
            }
        }

        let segmenter =
            ProtectedSegmenter::with_matcher(config.shortcode_whitelist.clone(), shortcodes);
        let targets = Selector::parse_all(&config.auto_selectors);
        let fallback_targets = FALLBACK_TAGS.iter().filter_map(|tag| Selector::parse(tag)).collect();
        let excludes = Selector::parse_all(&expand_exclude_variants(&config.exclude_selectors));
        let needles = extract_class_tokens(&config.auto_selectors);

        Wrapper {
            config,
            matcher,
            segmenter,
            targets,
            fallback_targets,
            excludes,
            needles,
        }
    }

    pub fn config(&self) -> &WrapConfig {
        &self.config
    }

    /// Wrap typed runs inside elements matched by the auto selectors.
    ///
    /// The fragment is parsed only when it contains one of the class tokens
    /// named by the auto selectors; with tag-only selectors there is nothing
    /// to look for and the input comes back unchanged.
    pub fn wrap_content(&self, html: &str) -> String {
        self.try_wrap_content(html).unwrap_or_else(|err| {
            warn!(error = %err, "leaving content fragment unchanged");
            html.to_string()
        })
    }

    pub fn try_wrap_content(&self, html: &str) -> Result<String, WrapError> {
        if html.is_empty() || self.targets.is_empty() {
            return Ok(html.to_string());
        }
        if !self.needles.iter().any(|n| html.contains(n.as_str())) {
            debug!("no selector class token in fragment, skipping parse");
            return Ok(html.to_string());
        }
        self.wrap_inside(html, &self.targets)
    }

    /// Wrap shortcode output, targeting [`FALLBACK_TAGS`]
    pub fn wrap_shortcode_output(&self, html: &str) -> String {
        self.try_wrap_shortcode_output(html).unwrap_or_else(|err| {
            warn!(error = %err, "leaving shortcode output unchanged");
            html.to_string()
        })
    }

    pub fn try_wrap_shortcode_output(&self, html: &str) -> Result<String, WrapError> {
        self.wrap_inside(html, &self.fallback_targets)
    }

    /// [`wrap_shortcode_output`](Self::wrap_shortcode_output), but only for
    /// whitelisted shortcode tags
    pub fn wrap_shortcode_tag(&self, tag: &str, html: &str) -> String {
        if html.is_empty() || !self.segmenter.is_whitelisted(tag) {
            return html.to_string();
        }
        self.wrap_shortcode_output(html)
    }

    /// Wrap a plain string and return it as escaped HTML
    pub fn wrap_text(&self, text: &str) -> String {
        let wrapped = self.matcher.as_ref().and_then(|matcher| {
            let walker = TreeWalker::new(matcher, &self.segmenter, &self.config.class_prefix);
            walker.classify(text).map(|pieces| walker.build_nodes(&pieces))
        });

        let holder = dom::create_element("div", vec![]);
        for node in wrapped.unwrap_or_else(|| vec![dom::create_text(text)]) {
            dom::append(&holder, node);
        }
        dom::serialize_children(&holder).unwrap_or_else(|err| {
            warn!(error = %err, "could not render wrapped text");
            String::new()
        })
    }

    fn wrap_inside(&self, html: &str, targets: &[Selector]) -> Result<String, WrapError> {
        if html.trim().is_empty() || targets.is_empty() {
            return Ok(html.to_string());
        }
        let Some(matcher) = &self.matcher else {
            return Ok(html.to_string());
        };
        let limit = self.config.max_input_bytes;
        if limit > 0 && html.len() > limit {
            return Err(WrapError::InputTooLarge {
                len: html.len(),
                limit,
            });
        }

        let fragment = dom::parse_fragment(html)?;
        let roots = collect_roots(targets, fragment.document());
        if roots.is_empty() {
            debug!("no target elements in fragment");
            return Ok(html.to_string());
        }

        let excluded = collect_node_set(&self.excludes, fragment.document());
        let walker = TreeWalker::new(matcher, &self.segmenter, &self.config.class_prefix);
        let replaced = walker.wrap_within_roots(&roots, &excluded);
        if replaced == 0 {
            debug!(roots = roots.len(), "nothing to wrap");
            return Ok(html.to_string());
        }

        debug!(roots = roots.len(), replaced, "wrapped text nodes");
        dom::serialize_children(&fragment.root)
    }
}

/// Matches of every selector, in selector order, each element once
fn collect_roots(selectors: &[Selector], scope: &Handle) -> Vec<Handle> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    for selector in selectors {
        for element in selector.query_all(scope) {
            if seen.insert(dom::node_key(&element)) {
                roots.push(element);
            }
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(types: &[&str], selectors: &[&str], excludes: &[&str]) -> Wrapper {
        Wrapper::from_options(&WrapOptions {
            types: Some(types.iter().map(|s| s.to_string()).collect()),
            auto_selectors: selectors.iter().map(|s| s.to_string()).collect(),
            exclude_selectors: excludes.iter().map(|s| s.to_string()).collect(),
            ..WrapOptions::default()
        })
    }

    #[test]
    fn wraps_inside_selected_elements_only() {
        let w = wrapper(&["en"], &[".post"], &[]);
        assert_eq!(
            w.wrap_content("<div class=\"post\">Hi</div><p>Yo</p>"),
            "<div class=\"post\"><span class=\"ml-en\">Hi</span></div><p>Yo</p>"
        );
    }

    #[test]
    fn skips_parsing_without_class_token_hit() {
        let w = wrapper(&["en"], &[".post"], &[]);
        let html = "<p>Hello <b>world</b></p>";
        assert_eq!(w.wrap_content(html), html);
    }

    #[test]
    fn nothing_selected_returns_input() {
        let w = wrapper(&["en"], &[], &[]);
        assert_eq!(w.wrap_content("<p>Hi</p>"), "<p>Hi</p>");

        let w = wrapper(&["en"], &[".post a"], &[]);
        // Unmatched markup keeps its original spelling
        assert_eq!(w.wrap_content("<P class=\"post\">Hi</P>"), "<P class=\"post\">Hi</P>");
    }

    #[test]
    fn tag_only_selectors_leave_content_alone() {
        let w = wrapper(&["en"], &["p", "li"], &[]);
        assert_eq!(w.wrap_content("<p>Hi</p>"), "<p>Hi</p>");
        assert_eq!(w.try_wrap_content("<li>Yo</li>").unwrap(), "<li>Yo</li>");
    }

    #[test]
    fn exclusion_covers_descendants() {
        let w = wrapper(&["en"], &[".post"], &[".skip"]);
        assert_eq!(
            w.wrap_content("<div class=\"post\"><p>a</p><p class=\"skip\"><b>b</b></p></div>"),
            "<div class=\"post\"><p><span class=\"ml-en\">a</span></p><p class=\"skip\"><b>b</b></p></div>"
        );
    }

    #[test]
    fn compound_exclusion_matches_extra_classes() {
        let w = wrapper(&["en"], &[".post"], &[".btn.is-outline"]);
        assert_eq!(
            w.wrap_content("<div class=\"post\"><a class=\"btn\">x</a></div>"),
            "<div class=\"post\"><a class=\"btn\">x</a></div>"
        );
    }

    #[test]
    fn oversized_input_is_an_error_and_left_alone() {
        let w = Wrapper::from_options(&WrapOptions {
            auto_selectors: vec![".post".to_string()],
            max_input_bytes: Some(8),
            ..WrapOptions::default()
        });
        let html = "<p class=\"post\">Hello there</p>";
        assert!(matches!(
            w.try_wrap_content(html),
            Err(WrapError::InputTooLarge { limit: 8, .. })
        ));
        assert_eq!(w.wrap_content(html), html);
    }

    #[test]
    fn shortcode_output_uses_fallback_tags() {
        let w = wrapper(&["num"], &[], &[]);
        assert_eq!(
            w.wrap_shortcode_output("<li>v2</li>"),
            "<li>v<span class=\"ml-num\">2</span></li>"
        );
        // The synthetic root is a `div`, so bare text is a target too
        assert_eq!(
            w.wrap_shortcode_output("plain 2"),
            "plain <span class=\"ml-num\">2</span>"
        );
        assert_eq!(w.wrap_shortcode_output("<code>2</code>"), "<code>2</code>");
    }

    #[test]
    fn markup_the_parser_would_drop_is_left_alone() {
        let w = wrapper(&["num", "en"], &[".x"], &[]);
        let row = "<tr><td>5</td></tr>";
        assert!(matches!(
            w.try_wrap_shortcode_output(row),
            Err(WrapError::Parse(_))
        ));
        assert_eq!(w.wrap_shortcode_output(row), row);

        let cell = "<div class=\"x\"><td>a</td></div>";
        assert_eq!(w.wrap_content(cell), cell);

        assert_eq!(
            w.wrap_shortcode_output("<table><tr><td>5</td></tr></table>"),
            "<table><tbody><tr><td><span class=\"ml-num\">5</span></td></tr></tbody></table>"
        );
    }

    #[test]
    fn shortcode_tag_gate_respects_whitelist() {
        let w = Wrapper::from_options(&WrapOptions {
            types: Some(vec!["num".to_string()]),
            shortcode_whitelist: vec!["price".to_string()],
            ..WrapOptions::default()
        });
        assert_eq!(
            w.wrap_shortcode_tag("price", "<p>9</p>"),
            "<p><span class=\"ml-num\">9</span></p>"
        );
        assert_eq!(w.wrap_shortcode_tag("other", "<p>9</p>"), "<p>9</p>");
    }

    #[test]
    fn wraps_plain_text() {
        let w = wrapper(&["en", "num"], &[], &[]);
        assert_eq!(
            w.wrap_text("a<1"),
            "<span class=\"ml-en\">a</span>&lt;<span class=\"ml-num\">1</span>"
        );
        assert_eq!(w.wrap_text("?<"), "?&lt;");
    }

    #[test]
    fn wrapper_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Wrapper>();
    }
}
