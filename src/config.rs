//! Conversion settings and their TOML file form
//!
//! A config file may set any subset of the fields; everything else keeps its
//! default.
//!
//! ```toml
//! [convert]
//! key_prefix = "movie"
//! scale_factor = 2.0
//! renumber = true
//! root_name = "hoge"
//!
//! [svg]
//! pretty_print = false
//! path_precision = 2
//!
//! [css]
//! frame_rate = 24.0
//! visibility_epsilon = 0.0001
//! inline_animation_name = false
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::css::CssConfig;
use crate::renderer::SvgConfig;

/// Errors that can occur when loading a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scale_factor must be a positive number, got {0}")]
    InvalidScaleFactor(f64),
}

/// Configuration for the complete conversion pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    /// Prepended to every instance key and CSS class
    pub key_prefix: String,
    /// The root node scales the stage by `1 / scale_factor`
    pub scale_factor: f64,
    /// Give colliding sprite depths distinct virtual depths before parsing
    pub renumber: bool,
    /// Instance name of the subtree the div tree and class rules start at
    pub root_name: Option<String>,
    pub svg: SvgConfig,
    pub css: CssConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            scale_factor: 1.0,
            renumber: true,
            root_name: None,
            svg: SvgConfig::default(),
            css: CssConfig::default(),
        }
    }
}

/// TOML structure for deserializing config files
#[derive(Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    convert: TomlConvert,
    svg: Option<SvgConfig>,
    css: Option<CssConfig>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TomlConvert {
    key_prefix: Option<String>,
    scale_factor: Option<f64>,
    renumber: Option<bool>,
    root_name: Option<String>,
}

impl ConvertConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();
        let config = Self {
            key_prefix: parsed.convert.key_prefix.unwrap_or(defaults.key_prefix),
            scale_factor: parsed.convert.scale_factor.unwrap_or(defaults.scale_factor),
            renumber: parsed.convert.renumber.unwrap_or(defaults.renumber),
            root_name: parsed.convert.root_name,
            svg: parsed.svg.unwrap_or(defaults.svg),
            css: parsed.css.unwrap_or(defaults.css),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale_factor > 0.0 && self.scale_factor.is_finite()) {
            return Err(ConfigError::InvalidScaleFactor(self.scale_factor));
        }
        Ok(())
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Enable or disable depth renumbering
    pub fn with_renumber(mut self, renumber: bool) -> Self {
        self.renumber = renumber;
        self
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Set the SVG output configuration
    pub fn with_svg(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    /// Set the CSS output configuration
    pub fn with_css(mut self, config: CssConfig) -> Self {
        self.css = config;
        self
    }
}
