//! Cache Latency Probe
//!
//! Measures memory-access latency at each cache level by timing pointer
//! chases through buffers sized to L1, L2 and L3.
//!
//! ## Architecture
//! - Topology: per-level cache sizes from sysconf / CPUID, with defaults
//! - Chase: aligned successor buffers and the eviction walk
//! - Clock: TSC cycle counter with a monotonic fallback
//! - Probe: warm-up, evict, dual-clock timed chase
//! - Bench: the L1/L2/L3 suite and its report

pub mod config;
pub mod error;
pub mod types;
pub mod topology;
pub mod chase;
pub mod clock;
pub mod probe;
pub mod bench;

pub use config::{Config, DefaultSizes, LoggingConfig};
pub use error::{ProbeError, Result};
pub use types::{CacheLevel, LevelReport, Measurement};
pub use topology::{get_cache_line_size, get_cache_size, Topology};
pub use chase::{flush_cache, ChaseBuffer};
pub use clock::{CycleCounter, HighResolutionCounter};
pub use probe::{assess_cache, LatencyProbe};
pub use bench::{LatencySuite, SuiteReport};
