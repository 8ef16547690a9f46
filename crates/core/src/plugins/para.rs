//! PARA: Probabilistic Adjacent Row Activation (§4.7.2). On every row
//! open, draws a uniform `[0, 1)` sample and injects a victim-row-refresh
//! whenever the draw falls under a configured probability threshold.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate};

/// Probabilistic row-activation defense: issues a `victim-row-refresh`
/// with probability `threshold` on every row open.
#[derive(Debug)]
pub struct Para {
    threshold: f64,
    rng: StdRng,
    vrr_command: usize,
    next_id: u64,
    injections: u64,
}

impl Para {
    /// Build from configuration. `threshold` (required, must lie in
    /// `(0, 1)`) is the per-activate injection probability; `seed`
    /// (default `123`, matching the original's default) seeds the RNG.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let threshold = cfg
            .params
            .get("threshold")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| ConfigError::MissingField(format!("{}.threshold", cfg.r#impl)))?;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::TypeCoerce {
                field: format!("{}.threshold", cfg.r#impl),
                reason: format!("must lie in (0, 1), got {threshold}"),
            });
        }
        let seed = cfg.u64_or("seed", 123);
        let vrr_command = device.spec.final_command_for("victim-row-refresh")?;
        Ok(Self {
            threshold,
            rng: StdRng::seed_from_u64(seed),
            vrr_command,
            next_id: 0,
            injections: 0,
        })
    }
}

impl ControllerPlugin for Para {
    fn name(&self) -> &'static str {
        "para"
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        if !is_activate(ctx.device, req.command) {
            return;
        }
        if self.rng.gen::<f64>() < self.threshold {
            self.next_id += 1;
            self.injections += 1;
            ctx.injected.push(bare_request(
                self.next_id,
                req.addr_vec.clone(),
                "para-vrr",
                self.vrr_command,
                ctx.clk,
                false,
            ));
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("vrr_injections", self.injections as f64)]
    }

    fn tick(&mut self, _clk: Clock) {}
}
