//! Configuration parsing, `!include`, and dotted-path override tests (§6).

use std::io::Write as _;

use dram_core::config::{apply_overrides, Config};

use crate::common::{minimal_yaml, write_trace};

#[test]
fn parses_a_minimal_document_with_defaults_filled_in() {
    let trace = write_trace(&["R 0,0,0,0,0"]);
    let yaml = minimal_yaml(&trace.path().display().to_string());
    let config = Config::from_yaml_str(&yaml, std::path::Path::new(".")).unwrap();

    assert_eq!(config.frontend.r#impl, "read-write-trace");
    assert_eq!(config.system.channels, 1);
    assert_eq!(config.controller.scheduler.r#impl, "default");
    assert_eq!(config.controller.row_policy.r#impl, "open");
    assert!(config.controller.plugins.is_empty());
}

#[test]
fn missing_required_dram_field_fails_to_parse() {
    let trace = write_trace(&["R 0,0,0,0,0"]);
    let yaml = format!(
        "frontend:\n  impl: read-write-trace\n  path: \"{}\"\n",
        trace.path().display()
    );
    let result = Config::from_yaml_str(&yaml, std::path::Path::new("."));
    assert!(result.is_err());
}

#[test]
fn include_directive_composes_a_nested_document() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.txt");
    std::fs::write(&trace_path, "R 0,0,0,0,0\n").unwrap();

    let dram_path = dir.path().join("dram.yaml");
    std::fs::write(&dram_path, "organization: DDR4_8Gb_x8\nspeed: \"2133\"\n").unwrap();

    let main_path = dir.path().join("main.yaml");
    let mut main_file = std::fs::File::create(&main_path).unwrap();
    writeln!(
        main_file,
        "frontend:\n  impl: read-write-trace\n  path: \"{}\"\ndram: !include dram.yaml\n",
        trace_path.display()
    )
    .unwrap();

    let config = Config::from_yaml_file(&main_path).unwrap();
    assert_eq!(config.dram.organization, "DDR4_8Gb_x8");
    assert_eq!(config.dram.speed, "2133");
}

#[test]
fn dotted_path_overrides_mutate_before_deserialization() {
    let trace = write_trace(&["R 0,0,0,0,0"]);
    let yaml = minimal_yaml(&trace.path().display().to_string());
    let overrides = vec![
        ("controller.scheduler.impl".to_string(), "bliss".to_string()),
        ("controller.read_buffer_capacity".to_string(), "128".to_string()),
    ];
    let config =
        Config::from_yaml_str_with_overrides(&yaml, std::path::Path::new("."), &overrides).unwrap();

    assert_eq!(config.controller.scheduler.r#impl, "bliss");
    assert_eq!(config.controller.read_buffer_capacity, 128);
}

#[test]
fn override_on_a_fresh_path_creates_intermediate_maps() {
    let raw: serde_yaml::Value = serde_yaml::from_str("frontend:\n  impl: x\n").unwrap();
    let overrides = vec![("controller.scheduler.impl".to_string(), "prac".to_string())];
    let merged = apply_overrides(raw, &overrides).unwrap();

    let scheduler_impl = merged
        .get("controller")
        .and_then(|c| c.get("scheduler"))
        .and_then(|s| s.get("impl"))
        .and_then(serde_yaml::Value::as_str);
    assert_eq!(scheduler_impl, Some("prac"));
}
