//! Passive command-issue counter (§4.7.7): tallies every issued command by
//! name and flushes a CSV-ish count file on finalize. Never injects.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write as _;

use tracing::warn;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

/// Counts every issued command by name; writes `<name>,<count>` lines to
/// `output_path` on finalize, one per observed command.
#[derive(Debug)]
pub struct CommandCounter {
    counts: BTreeMap<String, u64>,
    output_path: Option<String>,
}

impl CommandCounter {
    /// Build from configuration. `output_path` (optional) names the file
    /// to flush to on finalize; if absent, counts are collected but never
    /// written (useful when only `extra_stats` output is wanted).
    pub fn new(_device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let output_path = cfg
            .params
            .get("output_path")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Ok(Self { counts: BTreeMap::new(), output_path })
    }
}

impl ControllerPlugin for CommandCounter {
    fn name(&self) -> &'static str {
        "cmd_counter"
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        let name = ctx.device.spec.commands.name(req.command).to_string();
        *self.counts.entry(name).or_insert(0) += 1;
    }

    fn finalize(&mut self) {
        let Some(path) = &self.output_path else { return };
        let Ok(mut file) = File::create(path) else {
            warn!(path, "cmd_counter: failed to create output file");
            return;
        };
        for (name, count) in &self.counts {
            if writeln!(file, "{name},{count}").is_err() {
                warn!(path, "cmd_counter: failed to write output file");
                return;
            }
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("total_commands", self.counts.values().sum::<u64>() as f64)]
    }

    fn tick(&mut self, _clk: Clock) {}
}
