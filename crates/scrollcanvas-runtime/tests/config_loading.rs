#![forbid(unsafe_code)]

//! Configuration loading from TOML and JSON (feature `policy-config`).
//!
//! Run:
//!   cargo test -p scrollcanvas-runtime --features policy-config --test config_loading

use std::io::Write;

use scrollcanvas_core::observer::{MarginValue, RootMargin};
use scrollcanvas_runtime::{CanvasConfig, ConfigError};

#[test]
fn empty_toml_is_default() {
    let config = CanvasConfig::from_toml_str("").unwrap();
    assert_eq!(config, CanvasConfig::default());
}

#[test]
fn partial_toml_overrides_only_named_keys() {
    let config = CanvasConfig::from_toml_str(
        r#"
desktop_min_width = 900.0

[activation]
close_delay_ms = 250

[layout]
full_bleed = true
horizontal_shift = "calc(-25vw + 2rem)"
"#,
    )
    .unwrap();
    assert_eq!(config.desktop_min_width, 900.0);
    assert_eq!(config.activation.close_delay_ms, 250);
    assert_eq!(config.activation.activation_line, 0.5);
    assert!(config.layout.full_bleed);
    assert_eq!(
        config.layout.horizontal_shift.as_deref(),
        Some("calc(-25vw + 2rem)")
    );
    assert_eq!(config.observer.root_margin, RootMargin::default());
}

#[test]
fn toml_root_margin_sides() {
    let config = CanvasConfig::from_toml_str(
        r#"
[observer.root_margin]
top = { px = -120.0 }
bottom = { percent = -40.0 }
"#,
    )
    .unwrap();
    assert_eq!(config.observer.root_margin.top, MarginValue::Px(-120.0));
    assert_eq!(config.observer.root_margin.bottom, MarginValue::Percent(-40.0));
}

#[test]
fn toml_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[activation]\nclose_delay_ms = 900").unwrap();
    let config = CanvasConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.activation.close_delay_ms, 900);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CanvasConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn json_is_accepted() {
    let json = r#"{"activation":{"tie_epsilon":2.0},"observer":{"threshold":0.25}}"#;
    let config = CanvasConfig::from_json_str(json).unwrap();
    assert_eq!(config.activation.tie_epsilon, 2.0);
    assert_eq!(config.observer.threshold, 0.25);
}

#[test]
fn malformed_inputs_report_parser() {
    assert!(matches!(
        CanvasConfig::from_toml_str("activation = ["),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        CanvasConfig::from_json_str("{"),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn out_of_range_values_are_rejected() {
    let err = CanvasConfig::from_toml_str("[activation]\nactivation_line = 2.0").unwrap_err();
    match err {
        ConfigError::Invalid(problems) => {
            assert_eq!(problems.len(), 1);
            assert!(problems[0].contains("activation_line"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}
