//! Property-based tests for the wrap pass
//!
//! Fragments are generated from mixed-script text inside a few block shapes.
//! The alphabet avoids `&`, `<` and `>` so text survives serialization as
//! written and tag stripping is a plain regex.

use mlwrap::{CharsetGroup, CharsetSpec, WrapOptions, Wrapper};
use once_cell::sync::Lazy;
use proptest::prelude::*;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

fn full_wrapper() -> Wrapper {
    Wrapper::from_options(&WrapOptions {
        types: Some(
            ["en", "ko", "cn", "jp", "num", "punct"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        auto_selectors: vec![".entry p".to_string(), "li".to_string()],
        exclude_selectors: vec![".skip".to_string()],
        shortcode_whitelist: vec!["note".to_string()],
        custom_charsets: vec![CharsetGroup(vec![(
            "bullet".to_string(),
            CharsetSpec {
                class_name: "ml-bullet".to_string(),
                charset: "•※".to_string(),
            },
        )])],
        ..WrapOptions::default()
    })
}

/// Short mixed-script text: Latin, Hangul, Han, kana, digits, punctuation,
/// braces and brackets (so template and shortcode tokens show up)
fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[A-Za-z]{1,6}",
            "[가-힣]{1,4}",
            "[一-龥]{1,3}",
            "[ぁ-んァ-ン]{1,3}",
            "[0-9]{1,4}",
            "[ .,;:()'\"!?•※-]{1,3}",
            Just("{{ name }}".to_string()),
            Just("[note]x[/note]".to_string()),
            Just("[other]".to_string()),
        ],
        0..8,
    )
    .prop_map(|parts| parts.concat())
}

fn fragment_strategy() -> impl Strategy<Value = String> {
    (text_strategy(), text_strategy(), text_strategy()).prop_map(|(a, b, c)| {
        format!(
            "<div class=\"entry\"><p>{a}<em>{b}</em></p><ul><li>{c}</li></ul><p class=\"skip\">{b}</p></div>"
        )
    })
}

proptest! {
    #[test]
    fn wrapping_is_idempotent(html in fragment_strategy()) {
        let wrapper = full_wrapper();
        let once = wrapper.wrap_content(&html);
        let twice = wrapper.wrap_content(&once);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn wrapping_preserves_text(html in fragment_strategy()) {
        let wrapper = full_wrapper();
        let wrapped = wrapper.wrap_content(&html);
        prop_assert_eq!(strip_tags(&wrapped), strip_tags(&html));
    }

    #[test]
    fn template_tokens_survive_verbatim(text in text_strategy()) {
        let wrapper = full_wrapper();
        let html = format!("<div class=\"entry\"><p>{text} {{{{ name }}}}</p></div>");
        let wrapped = wrapper.wrap_content(&html);
        prop_assert_eq!(
            wrapped.matches("{{ name }}").count(),
            html.matches("{{ name }}").count()
        );
    }

    #[test]
    fn excluded_paragraph_has_no_spans(text in text_strategy()) {
        let wrapper = full_wrapper();
        let html = format!("<div class=\"entry\"><p class=\"skip\"><b>{text}</b></p></div>");
        prop_assert_eq!(wrapper.wrap_content(&html), html);
    }

    #[test]
    fn plain_text_rendering_keeps_characters(text in text_strategy()) {
        let wrapper = full_wrapper();
        prop_assert_eq!(strip_tags(&wrapper.wrap_text(&text)), text);
    }
}
