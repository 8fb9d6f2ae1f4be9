//! Wrap options and their resolution
//!
//! [`WrapOptions`] mirrors the persisted settings blob as-is: every field
//! optional, values unsanitized. [`WrapOptions::resolve`] turns it into a
//! [`WrapConfig`], which is what the engine consumes. All fallbacks (default
//! types, default prefix) happen here, at resolution time, never during a
//! wrap call.
//!
//! Custom charsets keep the blob's shape, a list of single-key objects:
//!
//! ```text
//! custom_charsets = [ { "bullet": { "className": "ml-bullet", "charset": "•" } } ]
//! ```

use crate::patterns::is_builtin;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const DEFAULT_TYPES: [&str; 3] = ["en", "num", "punct"];
pub const DEFAULT_CLASS_PREFIX: &str = "ml";
pub const DEFAULT_MAX_INPUT_BYTES: usize = 2 * 1024 * 1024;

/// Global the front-end script reads its configuration from
pub const FRONTEND_GLOBAL: &str = "window.MLWP_CFG";

/// Settings as stored, before sanitization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapOptions {
    /// `None` (key absent) means the default types
    pub types: Option<Vec<String>>,
    pub class_prefix: Option<String>,
    pub auto_selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
    pub shortcode_whitelist: Vec<String>,
    pub custom_charsets: Vec<CharsetGroup>,
    pub max_input_bytes: Option<usize>,
}

/// Body of one custom charset entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharsetSpec {
    #[serde(
        rename = "className",
        alias = "classname",
        alias = "class_name",
        default
    )]
    pub class_name: String,
    #[serde(default)]
    pub charset: String,
}

/// One object of the `custom_charsets` list, entries kept in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharsetGroup(pub Vec<(String, CharsetSpec)>);

impl<'de> Deserialize<'de> for CharsetGroup {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupVisitor;

        impl<'de> Visitor<'de> for GroupVisitor {
            type Value = CharsetGroup;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of type id to { className, charset }")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, spec)) = map.next_entry::<String, CharsetSpec>()? {
                    entries.push((key, spec));
                }
                Ok(CharsetGroup(entries))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

impl Serialize for CharsetGroup {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, spec) in &self.0 {
            map.serialize_entry(key, spec)?;
        }
        map.end()
    }
}

/// A resolved custom charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCharset {
    pub type_id: String,
    pub class_name: String,
    pub charset: String,
}

/// Sanitized, immutable configuration for one wrap invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapConfig {
    pub types: Vec<String>,
    pub class_prefix: String,
    pub auto_selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
    pub shortcode_whitelist: Vec<String>,
    pub custom_charsets: Vec<CustomCharset>,
    /// `0` disables the bound
    pub max_input_bytes: usize,
}

impl Default for WrapConfig {
    fn default() -> Self {
        WrapOptions::default().resolve()
    }
}

impl WrapOptions {
    pub fn resolve(&self) -> WrapConfig {
        let custom_charsets = self.flatten_charsets();

        let mut types: Vec<String> = Vec::new();
        let requested: Vec<&str> = match &self.types {
            Some(list) => list.iter().map(|t| t.trim()).collect(),
            None => DEFAULT_TYPES.to_vec(),
        };
        let custom_ids = custom_charsets.iter().map(|c| c.type_id.as_str());
        for type_id in requested.into_iter().chain(custom_ids) {
            let known = is_builtin(type_id) || custom_charsets.iter().any(|c| c.type_id == type_id);
            if known && !types.iter().any(|t| t == type_id) {
                types.push(type_id.to_string());
            }
        }
        if types.is_empty() {
            types = DEFAULT_TYPES.iter().map(|t| t.to_string()).collect();
        }

        let class_prefix = self
            .class_prefix
            .as_deref()
            .map(sanitize_identifier)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CLASS_PREFIX.to_string());

        WrapConfig {
            types,
            class_prefix,
            auto_selectors: clean_list(&self.auto_selectors),
            exclude_selectors: clean_list(&self.exclude_selectors),
            shortcode_whitelist: clean_list(&self.shortcode_whitelist),
            custom_charsets,
            max_input_bytes: self.max_input_bytes.unwrap_or(DEFAULT_MAX_INPUT_BYTES),
        }
    }

    /// Parse the one-per-line `type:charset` form into charset groups.
    ///
    /// Lines without a `:` or with an empty side are skipped.
    pub fn parse_simple_charsets(text: &str) -> Vec<CharsetGroup> {
        text.lines()
            .filter_map(|line| {
                let (type_id, charset) = line.trim().split_once(':')?;
                let (type_id, charset) = (type_id.trim(), charset.trim());
                if type_id.is_empty() || charset.is_empty() {
                    return None;
                }
                let spec = CharsetSpec {
                    class_name: format!("{}-{}", DEFAULT_CLASS_PREFIX, type_id),
                    charset: charset.to_string(),
                };
                Some(CharsetGroup(vec![(type_id.to_string(), spec)]))
            })
            .collect()
    }

    fn flatten_charsets(&self) -> Vec<CustomCharset> {
        let mut flattened: Vec<CustomCharset> = Vec::new();
        for (type_id, spec) in self.custom_charsets.iter().flat_map(|group| group.0.iter()) {
            let type_id = type_id.trim();
            if !is_identifier(type_id) || spec.charset.is_empty() {
                continue;
            }
            let resolved = CustomCharset {
                type_id: type_id.to_string(),
                class_name: spec.class_name.clone(),
                charset: spec.charset.clone(),
            };
            match flattened.iter_mut().find(|c| c.type_id == type_id) {
                Some(existing) => *existing = resolved,
                None => flattened.push(resolved),
            }
        }
        flattened
    }
}

impl WrapConfig {
    /// Active types that are not built in, in configuration order
    pub fn custom_types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str).filter(|t| !is_builtin(t))
    }

    /// The subset handed to the client-side engine
    pub fn frontend(&self) -> FrontendConfig {
        FrontendConfig {
            types: self.types.clone(),
            class_prefix: self.class_prefix.clone(),
            selectors: self.auto_selectors.clone(),
            exclude_selectors: self.exclude_selectors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendConfig {
    pub types: Vec<String>,
    pub class_prefix: String,
    pub selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
}

impl FrontendConfig {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// `window.MLWP_CFG = {...};`, injected before the client script runs
    pub fn inline_script(&self) -> String {
        format!("{} = {};", FRONTEND_GLOBAL, self.to_json())
    }
}

fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn is_identifier(raw: &str) -> bool {
    !raw.is_empty() && sanitize_identifier(raw).len() == raw.len()
}

fn clean_list(raw: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for item in raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !cleaned.iter().any(|c| c == item) {
            cleaned.push(item.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullet_group() -> CharsetGroup {
        CharsetGroup(vec![(
            "bullet".to_string(),
            CharsetSpec {
                class_name: "ml-bullet".to_string(),
                charset: "•".to_string(),
            },
        )])
    }

    #[test]
    fn empty_types_fall_back_to_defaults() {
        let config = WrapOptions::default().resolve();
        assert_eq!(config.types, vec!["en", "num", "punct"]);
        assert_eq!(config.class_prefix, "ml");
        assert_eq!(config.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
    }

    #[test]
    fn unknown_types_are_filtered_before_fallback() {
        let options = WrapOptions {
            types: Some(vec!["klingon".to_string(), " ko ".to_string(), "ko".to_string()]),
            ..Default::default()
        };
        assert_eq!(options.resolve().types, vec!["ko"]);

        let options = WrapOptions {
            types: Some(vec!["klingon".to_string()]),
            ..Default::default()
        };
        assert_eq!(options.resolve().types, vec!["en", "num", "punct"]);
    }

    #[test]
    fn custom_types_are_appended() {
        let options = WrapOptions {
            types: Some(vec!["en".to_string()]),
            custom_charsets: vec![bullet_group()],
            ..Default::default()
        };
        let config = options.resolve();
        assert_eq!(config.types, vec!["en", "bullet"]);
        assert_eq!(config.custom_types().collect::<Vec<_>>(), vec!["bullet"]);
        assert_eq!(config.custom_charsets[0].charset, "•");
    }

    #[test]
    fn absent_types_keep_defaults_next_to_custom_types() {
        let options = WrapOptions {
            custom_charsets: vec![bullet_group()],
            ..Default::default()
        };
        assert_eq!(options.resolve().types, vec!["en", "num", "punct", "bullet"]);

        let options = WrapOptions {
            types: Some(Vec::new()),
            custom_charsets: vec![bullet_group()],
            ..Default::default()
        };
        assert_eq!(options.resolve().types, vec!["bullet"]);

        let options = WrapOptions {
            types: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(options.resolve().types, vec!["en", "num", "punct"]);
    }

    #[test]
    fn absent_types_key_deserializes_to_none() {
        let json = r#"{ "custom_charsets": [ { "bullet": { "className": "ml-bullet", "charset": "•" } } ] }"#;
        let options: WrapOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.types, None);
        assert_eq!(options.resolve().types, vec!["en", "num", "punct", "bullet"]);
    }

    #[test]
    fn prefix_is_sanitized() {
        let options = WrapOptions {
            class_prefix: Some("my prefix!".to_string()),
            ..Default::default()
        };
        assert_eq!(options.resolve().class_prefix, "myprefix");

        let options = WrapOptions {
            class_prefix: Some("$$$".to_string()),
            ..Default::default()
        };
        assert_eq!(options.resolve().class_prefix, "ml");
    }

    #[test]
    fn selector_lists_are_trimmed_and_deduplicated() {
        let options = WrapOptions {
            auto_selectors: vec![
                " .entry ".to_string(),
                "".to_string(),
                ".entry".to_string(),
                "h1".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(options.resolve().auto_selectors, vec![".entry", "h1"]);
    }

    #[test]
    fn charset_groups_deserialize_from_blob_shape() {
        let json = r#"{
            "types": ["bullet"],
            "custom_charsets": [
                { "bullet": { "className": "ml-bullet", "charset": "•" } },
                { "bad id": { "className": "x", "charset": "x" } }
            ]
        }"#;
        let options: WrapOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.custom_charsets[0], bullet_group());

        let config = options.resolve();
        assert_eq!(config.types, vec!["bullet"]);
        assert_eq!(config.custom_charsets.len(), 1);
    }

    #[test]
    fn simple_charset_lines() {
        let groups = WrapOptions::parse_simple_charsets("bullet: •\nnocolon\n:empty\nstar:★:☆\n");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], bullet_group());
        assert_eq!(groups[1].0[0].0, "star");
        assert_eq!(groups[1].0[0].1.charset, "★:☆");
    }

    #[test]
    fn frontend_payload_shape() {
        let options = WrapOptions {
            types: Some(vec!["ko".to_string()]),
            auto_selectors: vec![".entry-content".to_string()],
            ..Default::default()
        };
        let script = options.resolve().frontend().inline_script();
        assert_eq!(
            script,
            r#"window.MLWP_CFG = {"types":["ko"],"classPrefix":"ml","selectors":[".entry-content"],"excludeSelectors":[]};"#
        );
    }
}
