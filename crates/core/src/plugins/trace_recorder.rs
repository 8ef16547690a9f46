//! Passive issue trace recorder (§4.7.7): records every issued command as
//! a read-write-trace-format line, so a run can be replayed bit-for-bit
//! through [`crate::frontend::ReadWriteTraceFrontend`].

use std::fs::File;
use std::io::{BufWriter, Write as _};

use tracing::warn;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

/// Buffers `{"R"|"W"} <addr-level0>,<addr-level1>,…` lines in memory and
/// flushes them to `output_path` on finalize.
#[derive(Debug)]
pub struct TraceRecorder {
    output_path: String,
    lines: Vec<String>,
}

impl TraceRecorder {
    /// Build from configuration. `output_path` is required.
    pub fn new(_device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let output_path = cfg
            .params
            .get("output_path")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfigError::MissingField(format!("{}.output_path", cfg.r#impl)))?
            .to_string();
        Ok(Self { output_path, lines: Vec::new() })
    }
}

impl ControllerPlugin for TraceRecorder {
    fn name(&self) -> &'static str {
        "trace_recorder"
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, _ctx: &mut PluginContext<'_>) {
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        let tag = if req.is_read { "R" } else { "W" };
        let addrs: Vec<String> = req.addr_vec.0.iter().map(ToString::to_string).collect();
        self.lines.push(format!("{tag} {}", addrs.join(",")));
    }

    fn finalize(&mut self) {
        let Ok(file) = File::create(&self.output_path) else {
            warn!(path = %self.output_path, "trace_recorder: failed to create output file");
            return;
        };
        let mut writer = BufWriter::new(file);
        for line in &self.lines {
            if writeln!(writer, "{line}").is_err() {
                warn!(path = %self.output_path, "trace_recorder: failed to write output file");
                return;
            }
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("recorded_lines", self.lines.len() as f64)]
    }

    fn tick(&mut self, _clk: Clock) {}
}
