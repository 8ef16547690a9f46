//! The top-level simulation: a frontend, an address mapper, and one
//! [`Controller`] per channel, tied together by the two-clock-domain tick
//! loop described in spec §5. `MemorySystem` owns everything needed to run
//! a configuration document to completion and read back its nested stats.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::controller::{Callback, Controller, PluginChain, RefreshManager, Request, RowPolicy, Scheduler};
use crate::dram::{standards, Device, Level};
use crate::error::{ConfigError, SimError};
use crate::frontend::{Frontend, LoadStoreTraceFrontend, O3CoreTraceFrontend, RawRequest, ReadWriteTraceFrontend};
use crate::mapper::{AddressMapper, LinearMapper, RowIndirectionTable};
use crate::plugins::{self, DeviceTopology};
use crate::stats::{StatBlock, Stats};

/// Read/write completion counters, shared with every admitted request's
/// completion callback via an `Arc<Mutex<_>>` (the callback itself must be
/// `Send`, ruling out a plain `Rc<RefCell<_>>`).
#[derive(Debug, Default)]
struct CompletionStats {
    reads_completed: u64,
    writes_completed: u64,
    total_read_latency: u64,
}

/// Top-level simulator: owns the frontend, the address mapper, and one
/// controller per channel. `run` advances both clock domains in lock-step
/// until the frontend is exhausted (or `max_requests`/`max_cycles` is hit)
/// and every channel has drained.
pub struct MemorySystem {
    frontend: Box<dyn Frontend>,
    mapper: LinearMapper,
    controllers: Vec<Controller>,
    frontend_ratio: u32,
    memory_ratio: u32,
    max_cycles: Option<u64>,
    max_requests: Option<u64>,
    admitted: u64,
    clk: i64,
    /// One request pulled from the frontend but not yet accepted by its
    /// target channel's buffer; retried every subsequent frontend tick
    /// until admission succeeds (§5's backpressure contract).
    pending: Option<RawRequest>,
    completion: Arc<Mutex<CompletionStats>>,
}

impl std::fmt::Debug for MemorySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySystem")
            .field("channels", &self.controllers.len())
            .field("clk", &self.clk)
            .field("admitted", &self.admitted)
            .finish_non_exhaustive()
    }
}

impl MemorySystem {
    /// Build a simulator from a parsed configuration document: resolves the
    /// DRAM standard/organization/speed preset, constructs one device and
    /// controller per channel (scheduler, refresh manager, row policy,
    /// plugin chain, row-indirection table), and opens the configured
    /// frontend's trace file.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let (standard, org_preset, speed) =
            standards::resolve_preset(&config.dram.organization, &config.dram.speed)?;
        let spec = standards::build(standard, org_preset, speed)?;
        let mapper = LinearMapper::from_org(&spec.org);

        let channels = config.system.channels.max(1);
        let rit_capacity = config.addr_mapper.row_indirection.map_or(0, |r| r.capacity).max(1);

        let watermark_low =
            (config.controller.watermark_low * config.controller.write_buffer_capacity as f64).round() as usize;
        let watermark_high =
            (config.controller.watermark_high * config.controller.write_buffer_capacity as f64).round() as usize;

        let mut controllers = Vec::with_capacity(channels);
        for channel in 0..channels {
            let device = Device::new(spec.clone());

            let scheduler = match config.controller.scheduler.r#impl.as_str() {
                "default" => Scheduler::Default,
                "bliss" => Scheduler::Bliss,
                "blocking" => Scheduler::Blocking,
                "prac" => Scheduler::Prac,
                other => return Err(ConfigError::Unregistered { kind: "scheduler", name: other.to_string() }),
            };

            let refresh = match config.controller.refresh.r#impl.as_str() {
                "all-bank" => {
                    let nrefi = config
                        .controller
                        .refresh
                        .nrefi_override
                        .unwrap_or_else(|| standards::nrefi_cycles(speed));
                    let final_command = device.spec.final_command_for("all-bank-refresh")?;
                    let addr_len = device.spec.org.levels.len();
                    let rank_pos = device.spec.org.levels.iter().position(|l| *l == Level::Rank).unwrap_or(0);
                    let num_ranks = device.spec.org.fanout_at(Level::Rank);
                    RefreshManager::all_bank(nrefi, num_ranks, final_command, addr_len, rank_pos)
                }
                other => return Err(ConfigError::Unregistered { kind: "refresh_manager", name: other.to_string() }),
            };

            let row_policy = match config.controller.row_policy.r#impl.as_str() {
                "open" => RowPolicy::Open,
                "closed" => {
                    let final_command = device.spec.final_command_for("close-row")?;
                    RowPolicy::closed(config.controller.row_policy.cap, final_command)
                }
                other => return Err(ConfigError::Unregistered { kind: "row_policy", name: other.to_string() }),
            };

            let mut plugin_chain = PluginChain::new();
            for plugin_cfg in &config.controller.plugins {
                plugin_chain.register(plugins::build_plugin(&device, plugin_cfg)?);
            }

            let num_banks = DeviceTopology::from_device(&device).num_banks;
            let rit = RowIndirectionTable::new(num_banks, rit_capacity);

            let controller = Controller::new(
                channel,
                device,
                scheduler,
                refresh,
                row_policy,
                plugin_chain,
                rit,
                config.controller.read_buffer_capacity,
                config.controller.write_buffer_capacity,
                watermark_low,
                watermark_high,
                speed.read_latency,
            )
            .map_err(|e: SimError| ConfigError::TypeCoerce {
                field: format!("controller[{channel}]"),
                reason: e.to_string(),
            })?;
            controllers.push(controller);
        }

        let path = Path::new(&config.frontend.path);
        let frontend: Box<dyn Frontend> = match config.frontend.r#impl.as_str() {
            "read-write-trace" => Box::new(ReadWriteTraceFrontend::open(path)?),
            "load-store-trace" => Box::new(LoadStoreTraceFrontend::open(path)?),
            "o3-core-trace" => Box::new(O3CoreTraceFrontend::open(path)?),
            other => return Err(ConfigError::Unregistered { kind: "frontend", name: other.to_string() }),
        };

        Ok(Self {
            frontend,
            mapper,
            controllers,
            frontend_ratio: config.system.frontend_ratio.max(1),
            memory_ratio: config.system.memory_ratio.max(1),
            max_cycles: config.system.max_cycles,
            max_requests: config.frontend.max_requests,
            admitted: 0,
            clk: 0,
            pending: None,
            completion: Arc::new(Mutex::new(CompletionStats::default())),
        })
    }

    /// Current memory-domain clock.
    #[must_use]
    pub fn clock(&self) -> i64 {
        self.clk
    }

    /// Run until the frontend is drained and every channel is idle, or
    /// `max_cycles`/`max_requests` cuts the run short.
    pub fn run(&mut self) -> Result<(), SimError> {
        let mut frontend_credit: i64 = 0;
        loop {
            if let Some(max) = self.max_cycles {
                if self.clk as u64 >= max {
                    break;
                }
            }

            frontend_credit += i64::from(self.frontend_ratio);
            while frontend_credit >= i64::from(self.memory_ratio) {
                self.tick_frontend();
                frontend_credit -= i64::from(self.memory_ratio);
            }

            for controller in &mut self.controllers {
                controller.tick(self.clk)?;
            }
            self.clk += 1;

            if self.drained() {
                break;
            }
        }

        for controller in &mut self.controllers {
            controller.plugins.finalize_all();
        }
        Ok(())
    }

    fn frontend_done(&self) -> bool {
        self.frontend.is_exhausted() || self.max_requests.is_some_and(|m| self.admitted >= m)
    }

    fn drained(&self) -> bool {
        self.frontend_done() && self.pending.is_none() && self.controllers.iter().all(Controller::is_idle)
    }

    /// Pull one request from the frontend if nothing is already pending,
    /// then retry admission of whatever is pending. A request that fails
    /// to admit (target buffer full) stays pending for the next frontend
    /// tick — the simulated-world backpressure condition, not an error.
    fn tick_frontend(&mut self) {
        if self.pending.is_none() && !self.frontend_done() {
            self.pending = self.frontend.next_request();
        }
        let Some(raw) = self.pending.take() else { return };
        if self.try_admit(&raw) {
            self.admitted += 1;
        } else {
            self.pending = Some(raw);
        }
    }

    fn channel_of(&self, addr_vec_channel_hint: Option<i64>, linear_addr: Option<u64>) -> usize {
        let channels = self.controllers.len().max(1);
        if let Some(hint) = addr_vec_channel_hint {
            return (hint.max(0) as usize) % channels;
        }
        let addr = linear_addr.unwrap_or(0);
        ((addr >> self.mapper.address_bits()) as usize) % channels
    }

    fn try_admit(&mut self, raw: &RawRequest) -> bool {
        let (is_read, channel, addr_vec) = match raw {
            RawRequest::Resolved { is_read, addr_vec } => {
                let channel = self.channel_of(addr_vec.0.first().copied(), None);
                (*is_read, channel, addr_vec.clone())
            }
            RawRequest::Linear { is_read, addr } => {
                let channel = self.channel_of(None, Some(*addr));
                let rit = &self.controllers[channel].rit;
                let addr_vec = self.mapper.apply(*addr, Some(rit));
                (*is_read, channel, addr_vec)
            }
        };

        let completion = Arc::clone(&self.completion);
        let arrive = self.clk;
        let callback: Callback = Box::new(move |req: &Request| {
            let mut stats = completion.lock().expect("completion stats mutex poisoned");
            if req.is_read {
                stats.reads_completed += 1;
                if let Some(depart) = req.depart {
                    stats.total_read_latency += (depart - arrive).max(0) as u64;
                }
            } else {
                stats.writes_completed += 1;
            }
        });

        self.controllers[channel].send(is_read, addr_vec, 0, self.clk, Some(callback))
    }

    /// Submit one request directly, bypassing the configured frontend —
    /// the seam an external-host bridge frontend would drive through.
    /// Returns `false` (not an error) if the target buffer has no room.
    pub fn admit_external(&mut self, is_read: bool, addr: u64) -> bool {
        let admitted = self.try_admit(&RawRequest::Linear { is_read, addr });
        if admitted {
            self.admitted += 1;
        }
        admitted
    }
}

impl Stats for MemorySystem {
    fn stats(&self) -> StatBlock {
        let completion = self.completion.lock().expect("completion stats mutex poisoned");
        let avg_read_latency = if completion.reads_completed > 0 {
            completion.total_read_latency as f64 / completion.reads_completed as f64
        } else {
            0.0
        };
        let mut block = StatBlock::new("system", "generic_memory_system", None)
            .with("requests_admitted", self.admitted as f64)
            .with("reads_completed", completion.reads_completed as f64)
            .with("writes_completed", completion.writes_completed as f64)
            .with("avg_read_latency", avg_read_latency)
            .with("final_clock", self.clk as f64);
        for controller in &self.controllers {
            block.push_child(controller.stats());
        }
        block
    }
}
