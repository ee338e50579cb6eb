//! Configuration for CSS output

use serde::Deserialize;

/// Frame rate used when neither the configuration nor the movie header sets one
pub const DEFAULT_FRAME_RATE: f64 = 12.0;

/// Configuration options for keyframes and class rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Frames per second; the movie header's rate when unset
    pub frame_rate: Option<f64>,

    /// Percent offset of the extra keyframe emitted before a visibility cut
    pub visibility_epsilon: f64,

    /// Whether class rules name their animation
    ///
    /// When false, `-webkit-animation-name` is left out of the class rules so
    /// a caller can start animations later.
    pub inline_animation_name: bool,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            frame_rate: None,
            visibility_epsilon: 0.0001,
            inline_animation_name: true,
        }
    }
}

impl CssConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_rate(mut self, rate: f64) -> Self {
        self.frame_rate = Some(rate);
        self
    }

    pub fn with_visibility_epsilon(mut self, eps: f64) -> Self {
        self.visibility_epsilon = eps;
        self
    }

    pub fn with_inline_animation_name(mut self, inline: bool) -> Self {
        self.inline_animation_name = inline;
        self
    }

    /// Configured rate, else the header's, else [`DEFAULT_FRAME_RATE`]
    pub fn resolve_frame_rate(&self, header_rate: Option<f64>) -> f64 {
        self.frame_rate
            .or(header_rate)
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_FRAME_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_resolution() {
        let config = CssConfig::default();
        assert_eq!(config.resolve_frame_rate(None), 12.0);
        assert_eq!(config.resolve_frame_rate(Some(24.0)), 24.0);
        assert_eq!(config.resolve_frame_rate(Some(0.0)), 12.0);

        let config = config.with_frame_rate(30.0);
        assert_eq!(config.resolve_frame_rate(Some(24.0)), 30.0);
    }

    #[test]
    fn test_toml_fields_are_optional() {
        let config: CssConfig = toml::from_str("inline_animation_name = false").unwrap();
        assert!(!config.inline_animation_name);
        assert_eq!(config.visibility_epsilon, 0.0001);
        assert_eq!(config.frame_rate, None);
    }
}
