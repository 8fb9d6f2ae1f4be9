//! Wrapping markup carried inside API responses
//!
//! Editors and themes fetch rendered markup over JSON endpoints (block
//! previews, REST `content.rendered`, AJAX fragments). Those strings get the
//! same treatment as server-rendered content.

use crate::wrapper::Wrapper;
use serde_json::Value;
use tracing::debug;

/// Keys whose string values are treated as markup regardless of content
pub const HTML_KEYS: [&str; 7] = [
    "template", "html", "content", "excerpt", "rendered", "markup", "output",
];

/// Markup keys for raw response bodies, where AJAX handlers nest their
/// payload under generic envelope keys
pub const RESPONSE_BODY_KEYS: [&str; 12] = [
    "template", "html", "content", "rendered", "markup", "output", "data", "result", "response",
    "body", "posts", "items",
];

impl Wrapper {
    /// Wrap every markup string in `value`, recursively.
    ///
    /// A string is markup when its key is in [`HTML_KEYS`] or when it contains
    /// `<`. Returns how many strings changed.
    pub fn wrap_json_payload(&self, value: &mut Value) -> usize {
        self.wrap_json_with_keys(value, &HTML_KEYS)
    }

    /// Wrap a raw response body.
    ///
    /// JSON objects and arrays are walked like
    /// [`wrap_json_payload`](Self::wrap_json_payload), keyed by
    /// [`RESPONSE_BODY_KEYS`], and re-encoded; any other body containing `<`
    /// is wrapped as HTML. The body comes back untouched when nothing changed.
    pub fn wrap_response_body(&self, body: &str) -> String {
        if let Ok(mut value) = serde_json::from_str::<Value>(body) {
            if value.is_object() || value.is_array() {
                if self.wrap_json_with_keys(&mut value, &RESPONSE_BODY_KEYS) == 0 {
                    return body.to_string();
                }
                return serde_json::to_string(&value).unwrap_or_else(|_| body.to_string());
            }
        }

        if body.contains('<') {
            return self.wrap_content(body);
        }
        debug!("response body is neither JSON nor markup");
        body.to_string()
    }

    fn wrap_json_with_keys(&self, value: &mut Value, keys: &[&str]) -> usize {
        let mut changed = 0;
        self.visit(keys, None, value, &mut changed);
        changed
    }

    fn visit(&self, keys: &[&str], key: Option<&str>, value: &mut Value, changed: &mut usize) {
        match value {
            Value::String(text) => {
                if !is_markup(keys, key, text) {
                    return;
                }
                let wrapped = self.wrap_content(text);
                if wrapped != *text {
                    *text = wrapped;
                    *changed += 1;
                }
            }
            Value::Object(map) => {
                for (child_key, child) in map.iter_mut() {
                    self.visit(keys, Some(child_key.as_str()), child, changed);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(keys, None, item, changed);
                }
            }
            _ => {}
        }
    }
}

fn is_markup(keys: &[&str], key: Option<&str>, text: &str) -> bool {
    key.is_some_and(|k| keys.contains(&k)) || text.contains('<')
}
