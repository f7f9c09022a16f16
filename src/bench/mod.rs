//! Benchmark module
//! Cache latency suite across L1, L2 and L3

pub mod latency;

pub use latency::{
    pin_to_core,
    LatencySuite,
    SuiteReport,
};
