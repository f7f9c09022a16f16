//! Core types for the latency probe

use serde::{Deserialize, Serialize};

/// Cache tier under test, built once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLevel {
    ordinal: u8,
    size: usize,
    stride: usize,
}

impl CacheLevel {
    pub fn new(ordinal: u8, size: usize, stride: usize) -> Self {
        Self {
            ordinal,
            size,
            stride,
        }
    }

    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Nominal capacity in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Byte distance between consecutive chase targets
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn name(&self) -> &'static str {
        match self.ordinal {
            1 => "L1",
            2 => "L2",
            3 => "L3",
            _ => "L?",
        }
    }
}

/// Average cost of one dereference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub cycles: u64,
    pub nanos: u64,
}

/// One measured level, ready for printing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub name: String,
    pub size_bytes: usize,
    pub cycles_per_access: u64,
    pub ns_per_access: u64,
}

impl LevelReport {
    pub fn new(level: &CacheLevel, measurement: Measurement) -> Self {
        Self {
            name: level.name().to_string(),
            size_bytes: level.size(),
            cycles_per_access: measurement.cycles,
            ns_per_access: measurement.nanos,
        }
    }

    pub fn size_kib(&self) -> usize {
        self.size_bytes / 1024
    }
}

impl std::fmt::Display for LevelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<3} cache ({:>6} KB): {:>4} cycles | {:>4} ns",
            self.name,
            self.size_kib(),
            self.cycles_per_access,
            self.ns_per_access
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line() {
        let level = CacheLevel::new(2, 256 * 1024, 64);
        let report = LevelReport::new(&level, Measurement { cycles: 14, nanos: 4 });
        assert_eq!(report.to_string(), "L2  cache (   256 KB):   14 cycles |    4 ns");
    }

    #[test]
    fn test_unknown_ordinal_name() {
        assert_eq!(CacheLevel::new(7, 1, 64).name(), "L?");
    }
}
