#![forbid(unsafe_code)]

//! Canvas configuration as data.
//!
//! [`CanvasConfig`] gathers every tunable of the stack so it can be loaded
//! from TOML or JSON at startup (feature `policy-config`).
//!
//! ```toml
//! desktop_min_width = 1024.0
//!
//! [activation]
//! close_delay_ms = 600
//! activation_line = 0.5
//!
//! [observer]
//! threshold = 0.0
//!
//! [layout]
//! full_bleed = true
//! horizontal_shift = "calc(-25vw + 2rem)"
//! ```
//!
//! `CanvasConfig::default()` reproduces the built-in defaults, so a missing
//! section or key keeps its default value.

#[cfg(feature = "policy-config")]
use std::path::Path;

use scrollcanvas_core::observer::ObserverOptions;
use scrollcanvas_layout::{DEFAULT_DESKTOP_MIN_WIDTH, LayoutConfig};

use crate::activation::ActivationConfig;

/// Every tunable of a canvas context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize)
)]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct CanvasConfig {
    pub activation: ActivationConfig,
    pub observer: ObserverOptions,
    pub layout: LayoutConfig,
    /// Viewports at least this wide (px) are desktop.
    pub desktop_min_width: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            activation: ActivationConfig::default(),
            observer: ObserverOptions::default(),
            layout: LayoutConfig::default(),
            desktop_min_width: DEFAULT_DESKTOP_MIN_WIDTH,
        }
    }
}

impl CanvasConfig {
    /// Load from a TOML string and validate.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.checked()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.checked()
    }

    /// Problems with the current values. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let line = self.activation.activation_line;
        if !(0.0..=1.0).contains(&line) {
            errors.push(format!("activation.activation_line must be in [0, 1], got {line}"));
        }

        let eps = self.activation.tie_epsilon;
        if !eps.is_finite() || eps < 0.0 {
            errors.push(format!("activation.tie_epsilon must be >= 0, got {eps}"));
        }

        let threshold = self.observer.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(format!("observer.threshold must be in [0, 1], got {threshold}"));
        }

        let margin = self.observer.root_margin;
        if !margin.top.resolve(100.0).is_finite() || !margin.bottom.resolve(100.0).is_finite() {
            errors.push("observer.root_margin must be finite".into());
        }

        let width = self.desktop_min_width;
        if !width.is_finite() || width < 0.0 {
            errors.push(format!("desktop_min_width must be >= 0, got {width}"));
        }

        errors
    }

    #[cfg(feature = "policy-config")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// The file parsed but [`CanvasConfig::validate`] rejected it.
    Invalid(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Invalid(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(CanvasConfig::default().validate().is_empty());
    }

    #[test]
    fn default_matches_engine_defaults() {
        let config = CanvasConfig::default();
        assert_eq!(config.activation.close_delay_ms, 600);
        assert_eq!(config.activation.activation_line, 0.5);
        assert_eq!(config.observer.root_margin.to_css(), "-33% 0px -33% 0px");
        assert_eq!(config.desktop_min_width, 1024.0);
    }

    #[test]
    fn validate_catches_out_of_range_values() {
        let mut config = CanvasConfig::default();
        config.activation.activation_line = 1.5;
        config.observer.threshold = -0.1;
        config.desktop_min_width = f64::NAN;
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("activation_line"));
        assert!(errors[1].contains("threshold"));
        assert!(errors[2].contains("desktop_min_width"));
    }

    #[test]
    fn invalid_error_lists_problems() {
        let err = ConfigError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "invalid configuration: a; b");
    }
}
