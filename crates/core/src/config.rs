//! Configuration system for the DRAM simulator.
//!
//! The on-disk document is, per §6, "YAML-shaped but format-agnostic": a
//! tree of maps, one key per interface level (`frontend`, `system`,
//! `addr_mapper`, `dram`, `controller`), each carrying an `impl` child that
//! names which concrete strategy to build. This module defines:
//! 1. **Defaults:** baseline constants used when a field is omitted.
//! 2. **Structures:** the per-concern `*Config` structs `serde` deserializes
//!    the document into.
//! 3. **`!include` composition and dotted-path overrides:** preprocessing
//!    passes over the raw [`serde_yaml::Value`] tree, applied before the
//!    typed structs are built.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Baseline configuration constants used when a document omits a field.
mod defaults {
    /// Channels per memory system when the document doesn't say otherwise.
    pub const CHANNELS: usize = 1;
    /// Frontend-cycle count in one frontend:memory tick ratio step.
    pub const FRONTEND_RATIO: u32 = 1;
    /// Memory-cycle count in one frontend:memory tick ratio step.
    pub const MEMORY_RATIO: u32 = 1;
    /// Read buffer capacity per channel.
    pub const READ_BUFFER_CAPACITY: usize = 64;
    /// Write buffer capacity per channel.
    pub const WRITE_BUFFER_CAPACITY: usize = 64;
    /// Low write-mode watermark, as a fraction of write-buffer capacity.
    pub const WATERMARK_LOW: f64 = 0.2;
    /// High write-mode watermark, as a fraction of write-buffer capacity.
    pub const WATERMARK_HIGH: f64 = 0.8;
    /// Closed-row-policy column-access cap before a `close-row` injection.
    pub const ROW_POLICY_CAP: u32 = 4;
    /// Row-indirection table capacity (per bank) for swap-defense plugins.
    pub const RIT_CAPACITY: usize = 64;
}

/// Root configuration: one sub-struct per interface level named in §6.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Request source (trace replay or external-host bridge).
    pub frontend: FrontendConfig,
    /// Clock-domain ratio and run-length bounds.
    #[serde(default)]
    pub system: SystemConfig,
    /// Physical-address-to-DRAM-coordinate mapping.
    #[serde(default)]
    pub addr_mapper: AddrMapperConfig,
    /// DRAM standard, organization, and speed preset.
    pub dram: DramConfig,
    /// Per-channel controller: scheduler, refresh, row policy, plugin chain.
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Config {
    /// Parse a configuration document from a YAML string, resolving any
    /// `!include` directives relative to `base_dir`.
    pub fn from_yaml_str(yaml: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let resolved = resolve_includes(raw, base_dir)?;
        serde_yaml::from_value(resolved).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and parse a configuration document from `path`, resolving
    /// `!include` directives relative to the file's own directory.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Include {
            path: path.display().to_string(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&text, base_dir)
    }

    /// Parse a configuration document, resolve `!include` directives, apply
    /// dotted-path command-line overrides, then deserialize — the order
    /// the CLI needs: overrides must see the fully-composed document, not
    /// just the top-level file.
    pub fn from_yaml_str_with_overrides(
        yaml: &str,
        base_dir: &Path,
        overrides: &[(String, String)],
    ) -> Result<Self, ConfigError> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let resolved = resolve_includes(raw, base_dir)?;
        let overridden = apply_overrides(resolved, overrides)?;
        serde_yaml::from_value(overridden).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Recursively resolve `!include <path>` tagged scalars into the parsed
/// contents of the named file, relative to `base_dir`. `!include` may
/// appear anywhere a value is expected (a whole document, a map value, a
/// sequence element).
fn resolve_includes(value: serde_yaml::Value, base_dir: &Path) -> Result<serde_yaml::Value, ConfigError> {
    match value {
        serde_yaml::Value::Tagged(tagged) if tagged.tag == "!include" => {
            let rel = tagged
                .value
                .as_str()
                .ok_or_else(|| ConfigError::Parse("!include directive must name a path string".to_string()))?;
            let included_path = base_dir.join(rel);
            let text = fs::read_to_string(&included_path).map_err(|source| ConfigError::Include {
                path: included_path.display().to_string(),
                source,
            })?;
            let parsed: serde_yaml::Value =
                serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
            let included_base = included_path.parent().unwrap_or(base_dir);
            resolve_includes(parsed, included_base)
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (k, v) in map {
                let _ = out.insert(k, resolve_includes(v, base_dir)?);
            }
            Ok(serde_yaml::Value::Mapping(out))
        }
        serde_yaml::Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for v in seq {
                out.push(resolve_includes(v, base_dir)?);
            }
            Ok(serde_yaml::Value::Sequence(out))
        }
        other => Ok(other),
    }
}

/// Apply a set of dotted-path `key=value` command-line overrides to a raw
/// configuration document before it is deserialized into [`Config`]. Each
/// path segment navigates into (creating, if absent) a mapping; the final
/// segment's value is replaced with `value` parsed as YAML (so `"4"`
/// becomes an integer, `"true"` a bool, anything else a string).
pub fn apply_overrides(mut doc: serde_yaml::Value, overrides: &[(String, String)]) -> Result<serde_yaml::Value, ConfigError> {
    for (path, value) in overrides {
        let parsed_value: serde_yaml::Value =
            serde_yaml::from_str(value).unwrap_or_else(|_| serde_yaml::Value::String(value.clone()));
        set_dotted(&mut doc, path, parsed_value)?;
    }
    Ok(doc)
}

fn set_dotted(doc: &mut serde_yaml::Value, path: &str, value: serde_yaml::Value) -> Result<(), ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, init)) = segments.split_last() else {
        return Err(ConfigError::TypeCoerce { field: path.to_string(), reason: "empty override path".to_string() });
    };
    let mut cursor = doc;
    for seg in init {
        if !matches!(cursor, serde_yaml::Value::Mapping(_)) {
            *cursor = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        }
        let serde_yaml::Value::Mapping(map) = cursor else { unreachable!() };
        cursor = map
            .entry(serde_yaml::Value::String((*seg).to_string()))
            .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    if !matches!(cursor, serde_yaml::Value::Mapping(_)) {
        *cursor = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    }
    let serde_yaml::Value::Mapping(map) = cursor else { unreachable!() };
    let _ = map.insert(serde_yaml::Value::String((*last).to_string()), value);
    Ok(())
}

/// Request source configuration (§6 frontend/memory boundary).
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Which trace format to read: `"read-write-trace"`, `"load-store-trace"`, or `"o3-core-trace"`.
    pub r#impl: String,
    /// Path to the trace file.
    pub path: String,
    /// Stop after this many requests have been admitted, if set.
    #[serde(default)]
    pub max_requests: Option<u64>,
}

/// Clock-domain ratio and run-length bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of independent memory channels.
    #[serde(default = "SystemConfig::default_channels")]
    pub channels: usize,
    /// Frontend-cycle count in one tick-interleaving step.
    #[serde(default = "SystemConfig::default_frontend_ratio")]
    pub frontend_ratio: u32,
    /// Memory-cycle count in one tick-interleaving step.
    #[serde(default = "SystemConfig::default_memory_ratio")]
    pub memory_ratio: u32,
    /// Maximum memory-clock cycle at which the run terminates, if set.
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl SystemConfig {
    fn default_channels() -> usize {
        defaults::CHANNELS
    }
    fn default_frontend_ratio() -> u32 {
        defaults::FRONTEND_RATIO
    }
    fn default_memory_ratio() -> u32 {
        defaults::MEMORY_RATIO
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            channels: defaults::CHANNELS,
            frontend_ratio: defaults::FRONTEND_RATIO,
            memory_ratio: defaults::MEMORY_RATIO,
            max_cycles: None,
        }
    }
}

/// Address mapper configuration (§4.6): bit-slicing order plus an
/// optional row-indirection table for swap-based RowHammer defenses.
#[derive(Debug, Clone, Deserialize)]
pub struct AddrMapperConfig {
    /// Mapper implementation; currently only `"linear"` is supported.
    #[serde(default = "AddrMapperConfig::default_impl")]
    pub r#impl: String,
    /// Row-indirection table settings, present only when a swap-defense
    /// plugin (RRS, AQUA) is configured.
    #[serde(default)]
    pub row_indirection: Option<RitConfig>,
}

impl AddrMapperConfig {
    fn default_impl() -> String {
        "linear".to_string()
    }
}

impl Default for AddrMapperConfig {
    fn default() -> Self {
        Self { r#impl: Self::default_impl(), row_indirection: None }
    }
}

/// Row-indirection table sizing for RRS/AQUA.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RitConfig {
    /// Entries per bank before an eviction is required.
    #[serde(default = "RitConfig::default_capacity")]
    pub capacity: usize,
    /// Rows reserved as an AQUA quarantine zone (0 rows reserved for RRS).
    #[serde(default)]
    pub quarantine_rows: u32,
}

impl RitConfig {
    fn default_capacity() -> usize {
        defaults::RIT_CAPACITY
    }
}

/// DRAM standard, organization, and speed preset selection.
#[derive(Debug, Clone, Deserialize)]
pub struct DramConfig {
    /// Organization preset name (e.g. `"DDR4_8Gb_x8"`).
    pub organization: String,
    /// Speed preset name within that organization's standard (e.g. `"2133"`).
    pub speed: String,
}

/// Per-channel controller configuration: scheduler, refresh manager, row
/// policy, buffer sizing, write-mode watermarks, and the plugin chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Scheduling strategy.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Refresh manager strategy.
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Row-buffer management policy.
    #[serde(default)]
    pub row_policy: RowPolicyConfig,
    /// Read-buffer capacity, per channel.
    #[serde(default = "ControllerConfig::default_read_capacity")]
    pub read_buffer_capacity: usize,
    /// Write-buffer capacity, per channel.
    #[serde(default = "ControllerConfig::default_write_capacity")]
    pub write_buffer_capacity: usize,
    /// Low write-mode watermark, as a fraction of write-buffer capacity.
    #[serde(default = "ControllerConfig::default_watermark_low")]
    pub watermark_low: f64,
    /// High write-mode watermark, as a fraction of write-buffer capacity.
    #[serde(default = "ControllerConfig::default_watermark_high")]
    pub watermark_high: f64,
    /// Ordered list of RowHammer mitigation plugins and passive observers.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl ControllerConfig {
    fn default_read_capacity() -> usize {
        defaults::READ_BUFFER_CAPACITY
    }
    fn default_write_capacity() -> usize {
        defaults::WRITE_BUFFER_CAPACITY
    }
    fn default_watermark_low() -> f64 {
        defaults::WATERMARK_LOW
    }
    fn default_watermark_high() -> f64 {
        defaults::WATERMARK_HIGH
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            refresh: RefreshConfig::default(),
            row_policy: RowPolicyConfig::default(),
            read_buffer_capacity: defaults::READ_BUFFER_CAPACITY,
            write_buffer_capacity: defaults::WRITE_BUFFER_CAPACITY,
            watermark_low: defaults::WATERMARK_LOW,
            watermark_high: defaults::WATERMARK_HIGH,
            plugins: Vec::new(),
        }
    }
}

/// Scheduler selection (§4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// `"default"`, `"bliss"`, `"blocking"`, or `"prac"`.
    #[serde(default = "SchedulerConfig::default_impl")]
    pub r#impl: String,
}

impl SchedulerConfig {
    fn default_impl() -> String {
        "default".to_string()
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { r#impl: Self::default_impl() }
    }
}

/// Refresh manager selection (§4.4).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Currently only `"all-bank"` is implemented.
    #[serde(default = "RefreshConfig::default_impl")]
    pub r#impl: String,
    /// Override `nREFI` (in memory cycles) instead of deriving it from the
    /// DRAM speed preset.
    #[serde(default)]
    pub nrefi_override: Option<i64>,
}

impl RefreshConfig {
    fn default_impl() -> String {
        "all-bank".to_string()
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { r#impl: Self::default_impl(), nrefi_override: None }
    }
}

/// Row-buffer policy selection (§4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct RowPolicyConfig {
    /// `"open"` or `"closed"`.
    #[serde(default = "RowPolicyConfig::default_impl")]
    pub r#impl: String,
    /// Column-access cap before a `close-row` is injected, under `"closed"`.
    #[serde(default = "RowPolicyConfig::default_cap")]
    pub cap: u32,
}

impl RowPolicyConfig {
    fn default_impl() -> String {
        "open".to_string()
    }
    fn default_cap() -> u32 {
        defaults::ROW_POLICY_CAP
    }
}

impl Default for RowPolicyConfig {
    fn default() -> Self {
        Self { r#impl: Self::default_impl(), cap: defaults::ROW_POLICY_CAP }
    }
}

/// One plugin's configuration: its implementation name plus an untyped
/// parameter bag, parsed by the matching plugin constructor in
/// `crate::plugins`. Keeping the bag untyped here mirrors the original's
/// runtime string-keyed parameter lookup at the single seam where it's
/// unavoidable — each plugin's constructor is the one place that
/// interprets it, and does so with typed field access, not further
/// stringly-typed lookups on any hot path.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// Plugin name (`"graphene"`, `"para"`, `"prac"`, `"blockhammer"`, …).
    pub r#impl: String,
    /// Plugin-specific parameters, as a JSON-compatible map.
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl PluginConfig {
    /// Fetch a required numeric parameter, or a configuration error.
    pub fn require_u64(&self, key: &str) -> Result<u64, ConfigError> {
        self.params
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| ConfigError::MissingField(format!("{}.{key}", self.r#impl)))
    }

    /// Fetch an optional numeric parameter, falling back to `default`.
    #[must_use]
    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.params.get(key).and_then(serde_json::Value::as_u64).unwrap_or(default)
    }

    /// Fetch an optional floating-point parameter, falling back to `default`.
    #[must_use]
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).and_then(serde_json::Value::as_f64).unwrap_or(default)
    }
}
