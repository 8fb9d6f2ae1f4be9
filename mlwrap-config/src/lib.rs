//! Configuration loader for mlwrap.
//!
//! `defaults/mlwrap.default.toml` is embedded so the documented defaults and
//! the runtime ones cannot drift. Applications layer user files and single-key
//! overrides on top via [`Loader`], then deserialize into [`WrapOptions`].
//! Sanitization is left to [`WrapOptions::resolve`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use mlwrap::{WrapConfig, WrapOptions};
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/mlwrap.default.toml");

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    ///
    /// `.json` files are read as JSON, anything else as TOML.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = File::from(path).format(format_for(path)).required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = File::from(path).format(format_for(path)).required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the raw options.
    pub fn build(self) -> Result<WrapOptions, ConfigError> {
        self.builder.build()?.try_deserialize()
    }

    /// [`build`](Self::build), then resolve into an engine configuration.
    pub fn build_config(self) -> Result<WrapConfig, ConfigError> {
        Ok(self.build()?.resolve())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<WrapOptions, ConfigError> {
    Loader::new().build()
}

fn format_for(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let options = load_defaults().expect("defaults to deserialize");
        assert_eq!(options.types, None);
        assert_eq!(options.class_prefix.as_deref(), Some("ml"));
        assert!(options.auto_selectors.is_empty());
        assert_eq!(options.max_input_bytes, Some(2 * 1024 * 1024));

        let config = options.resolve();
        assert_eq!(config.types, vec!["en", "num", "punct"]);
        assert_eq!(config, WrapConfig::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("class_prefix", "typo")
            .expect("override to apply")
            .set_override("types", vec!["ko", "en"])
            .expect("override to apply")
            .build_config()
            .expect("config to build");
        assert_eq!(config.class_prefix, "typo");
        assert_eq!(config.types, vec!["ko", "en"]);
    }

    #[test]
    fn layers_toml_file_with_custom_charsets() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
auto_selectors = [".entry-content"]

[[custom_charsets]]
bullet = {{ className = "ml-bullet", charset = "•" }}
"#
        )
        .unwrap();

        let config = Loader::new().with_file(file.path()).build_config().unwrap();
        assert_eq!(config.auto_selectors, vec![".entry-content"]);
        assert_eq!(config.types, vec!["en", "num", "punct", "bullet"]);
        assert_eq!(config.custom_charsets[0].charset, "•");
        assert_eq!(config.custom_charsets[0].class_name, "ml-bullet");
    }

    #[test]
    fn layers_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"class_prefix": "x y", "exclude_selectors": [" .skip ", ""]}}"#
        )
        .unwrap();

        let config = Loader::new().with_file(file.path()).build_config().unwrap();
        assert_eq!(config.class_prefix, "xy");
        assert_eq!(config.exclude_selectors, vec![".skip"]);
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let options = Loader::new()
            .with_optional_file("/definitely/not/here.toml")
            .build()
            .unwrap();
        assert_eq!(options, load_defaults().unwrap());
        assert!(Loader::new().with_file("/definitely/not/here.toml").build().is_err());
    }
}
