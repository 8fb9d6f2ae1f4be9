//! # mlwrap
//!
//! Typography-aware wrapping of multilingual text in HTML fragments.
//!
//! Runs of characters belonging to one class (Latin letters, Hangul, Han,
//! kana, digits, punctuation, or a custom set) are wrapped in
//! `<span class="{prefix}-{type}">` so each script can be styled on its own:
//!
//! ```text
//! <p>안녕 world 123</p>
//! <p><span class="ml-ko">안녕</span> <span class="ml-en">world</span> <span class="ml-num">123</span></p>
//! ```
//!
//! Template placeholders (`{{ ... }}`) and whitelisted shortcodes pass
//! through untouched, `script`/`style`/`code`-like elements are never
//! entered, and a second pass over already wrapped markup changes nothing.
//!
//! ## Layout
//!
//! - [`patterns`]: per-type regex fragments, built-in and custom
//! - [`matcher`]: the combined alternation and typed runs
//! - [`protect`]: protected segments and the shortcode seam
//! - [`selector`]: the restricted selector grammar
//! - [`dom`]: parsing, serialization and tree helpers
//! - [`walker`]: the in-place tree walk
//! - [`wrapper`]: the [`Wrapper`] entry points
//! - [`payload`]: markup inside JSON responses
//! - [`config`]: options and their resolution
//!
//! The `mlwrap-config` crate loads [`WrapOptions`] from layered files and the
//! `mlwrap` binary (`mlwrap-cli`) runs a wrapper from the command line.

pub mod config;
pub mod dom;
pub mod error;
pub mod matcher;
pub mod patterns;
pub mod payload;
pub mod protect;
pub mod selector;
pub mod walker;
pub mod wrapper;

pub use config::{CharsetGroup, CharsetSpec, CustomCharset, FrontendConfig, WrapConfig, WrapOptions};
pub use error::WrapError;
pub use protect::{BracketShortcodes, ShortcodeMatch, ShortcodeMatcher};
pub use wrapper::Wrapper;
