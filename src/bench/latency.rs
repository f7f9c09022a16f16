//! Per-level latency suite
//! Discovers the topology, then probes L1, L2 and L3 in turn

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::HighResolutionCounter;
use crate::config::Config;
use crate::error::Result;
use crate::probe::LatencyProbe;
use crate::topology::Topology;
use crate::types::{CacheLevel, LevelReport};

/// Full run output
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub counter: &'static str,
    pub iterations: u64,
    pub topology: Topology,
    pub levels: Vec<LevelReport>,
}

/// Fixed level table plus the probe that measures it
pub struct LatencySuite {
    iterations: u64,
    topology: Topology,
    levels: Vec<CacheLevel>,
    probe: LatencyProbe,
}

impl LatencySuite {
    /// Suite over the host's discovered topology
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_topology(config, Topology::discover(&config.defaults)))
    }

    /// Suite over an explicit topology
    pub fn with_topology(config: &Config, topology: Topology) -> Self {
        let levels = topology.cache_levels(config.stride);
        let probe = LatencyProbe::new(topology.l3());
        Self {
            iterations: config.iterations,
            topology,
            levels,
            probe,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn levels(&self) -> &[CacheLevel] {
        &self.levels
    }

    /// Banner lines printed before measuring
    pub fn header_lines(&self) -> [String; 2] {
        [
            format!(
                "Detected cache sizes: L1={} KB, L2={} KB, L3={} KB",
                self.topology.size(1) / 1024,
                self.topology.size(2) / 1024,
                self.topology.size(3) / 1024
            ),
            format!(
                "Measuring cache latencies (cycles/access, ns/access) with {} iterations each",
                self.iterations
            ),
        ]
    }

    /// Probe every level once, in order
    pub fn run(&self) -> Result<SuiteReport> {
        info!(
            counter = self.probe.counter().name(),
            flush_bytes = self.probe.flush_size().saturating_mul(2),
            "Starting latency suite"
        );

        let mut reports = Vec::with_capacity(self.levels.len());
        for level in &self.levels {
            info!(level = level.name(), size = level.size(), "Probing");
            let measurement = self
                .probe
                .assess_cache(level.size(), level.stride(), self.iterations)?;
            reports.push(LevelReport::new(level, measurement));
        }

        if !is_ascending(&reports) {
            warn!("Latencies not strictly increasing across levels, results may be noisy");
        }

        Ok(SuiteReport {
            counter: self.probe.counter().name(),
            iterations: self.iterations,
            topology: self.topology.clone(),
            levels: reports,
        })
    }
}

fn is_ascending(reports: &[LevelReport]) -> bool {
    reports
        .windows(2)
        .all(|w| w[0].cycles_per_access < w[1].cycles_per_access)
}

/// Pin the calling thread to `core`, returns whether it took effect
pub fn pin_to_core(core: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    match core_ids.get(core) {
        Some(core_id) => {
            let pinned = core_affinity::set_for_current(*core_id);
            if pinned {
                info!("Pinned measuring thread to CPU core {}", core);
            }
            pinned
        }
        None => {
            warn!(
                "CPU core {} not available ({} logical CPUs), running unpinned",
                core,
                num_cpus::get()
            );
            false
        }
    }
}
