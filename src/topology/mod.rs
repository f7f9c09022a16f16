//! Cache topology discovery
//! Asks the OS for per-level capacities and falls back to fixed defaults

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DefaultSizes;
use crate::types::CacheLevel;

pub const DEFAULT_L1_SIZE: usize = 32 * 1024;
pub const DEFAULT_L2_SIZE: usize = 256 * 1024;
pub const DEFAULT_L3_SIZE: usize = 8 * 1024 * 1024;
pub const DEFAULT_LINE_SIZE: usize = 64;

/// Size in bytes of the data cache at `level`, or 0 when unknown
///
/// Levels outside 1..=3 always report 0.
pub fn get_cache_size(level: u8) -> usize {
    if !(1..=3).contains(&level) {
        return 0;
    }
    sysconf_size(level)
        .or_else(|| cpuid_size(level))
        .unwrap_or(0)
}

/// Line size in bytes of the cache at `level`, or 0 when unknown
pub fn get_cache_line_size(level: u8) -> usize {
    if !(1..=3).contains(&level) {
        return 0;
    }
    sysconf_line_size(level)
        .or_else(|| cpuid_line_size(level))
        .unwrap_or(0)
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn sysconf_query(name: libc::c_int) -> Option<usize> {
    // SAFETY: sysconf has no memory-safety preconditions
    let val = unsafe { libc::sysconf(name) };
    (val > 0).then_some(val as usize)
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn sysconf_size(level: u8) -> Option<usize> {
    let name = match level {
        1 => libc::_SC_LEVEL1_DCACHE_SIZE,
        2 => libc::_SC_LEVEL2_CACHE_SIZE,
        3 => libc::_SC_LEVEL3_CACHE_SIZE,
        _ => return None,
    };
    sysconf_query(name)
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn sysconf_line_size(level: u8) -> Option<usize> {
    let name = match level {
        1 => libc::_SC_LEVEL1_DCACHE_LINESIZE,
        2 => libc::_SC_LEVEL2_CACHE_LINESIZE,
        3 => libc::_SC_LEVEL3_CACHE_LINESIZE,
        _ => return None,
    };
    sysconf_query(name)
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn sysconf_size(_level: u8) -> Option<usize> {
    None
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn sysconf_line_size(_level: u8) -> Option<usize> {
    None
}

fn cpuid_size(level: u8) -> Option<usize> {
    let size = match level {
        1 => cache_size::l1_cache_size(),
        2 => cache_size::l2_cache_size(),
        3 => cache_size::l3_cache_size(),
        _ => None,
    };
    size.filter(|&s| s > 0)
}

fn cpuid_line_size(level: u8) -> Option<usize> {
    let size = match level {
        1 => cache_size::l1_cache_line_size(),
        2 => cache_size::l2_cache_line_size(),
        3 => cache_size::l3_cache_line_size(),
        _ => None,
    };
    size.filter(|&s| s > 0)
}

/// Where a level's capacity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeSource {
    Detected,
    Default,
}

/// Capacity and line size of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSize {
    pub size: usize,
    pub line_size: usize,
    pub source: SizeSource,
}

/// Per-level cache capacities, fixed once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    levels: [LevelSize; 3],
}

impl Topology {
    /// Query the OS for levels 1-3, substituting `defaults` for unknown sizes
    pub fn discover(defaults: &DefaultSizes) -> Self {
        let fallback = [defaults.l1, defaults.l2, defaults.l3];
        let levels = std::array::from_fn(|i| {
            let ordinal = i as u8 + 1;
            let detected = get_cache_size(ordinal);
            let line = get_cache_line_size(ordinal);

            let (size, source) = if detected > 0 {
                debug!(level = ordinal, size = detected, "Cache size detected");
                (detected, SizeSource::Detected)
            } else {
                warn!(
                    level = ordinal,
                    fallback = fallback[i],
                    "Cache size unavailable, using default"
                );
                (fallback[i], SizeSource::Default)
            };

            LevelSize {
                size,
                line_size: if line > 0 { line } else { DEFAULT_LINE_SIZE },
                source,
            }
        });

        Self { levels }
    }

    /// Topology built purely from `defaults`, without querying the OS
    pub fn from_defaults(defaults: &DefaultSizes) -> Self {
        let sizes = [defaults.l1, defaults.l2, defaults.l3];
        Self {
            levels: sizes.map(|size| LevelSize {
                size,
                line_size: DEFAULT_LINE_SIZE,
                source: SizeSource::Default,
            }),
        }
    }

    /// Capacity of `level` in bytes, 0 outside 1..=3
    pub fn size(&self, level: u8) -> usize {
        self.level(level).map(|l| l.size).unwrap_or(0)
    }

    pub fn level(&self, level: u8) -> Option<&LevelSize> {
        match level {
            1..=3 => self.levels.get(level as usize - 1),
            _ => None,
        }
    }

    /// Largest level, used to size the eviction walk
    pub fn l3(&self) -> usize {
        self.levels[2].size
    }

    /// One descriptor per level, all sharing `stride`
    pub fn cache_levels(&self, stride: usize) -> Vec<CacheLevel> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, l)| CacheLevel::new(i as u8 + 1, l.size, stride))
            .collect()
    }
}
