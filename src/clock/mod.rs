//! Cycle counters
//! TSC on x86_64, monotonic nanoseconds everywhere else

use std::time::Instant;

/// Source of a high-resolution, non-decreasing tick count
pub trait HighResolutionCounter {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Current tick count
    fn now(&self) -> u64;
}

/// CPU timestamp counter
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Tsc;

#[cfg(target_arch = "x86_64")]
impl HighResolutionCounter for Tsc {
    fn name(&self) -> &'static str {
        "rdtsc"
    }

    #[inline(always)]
    fn now(&self) -> u64 {
        unsafe { std::arch::x86_64::_rdtsc() }
    }
}

/// Nanoseconds since the counter was created
#[derive(Debug, Clone, Copy)]
pub struct Monotonic {
    origin: Instant,
}

impl Monotonic {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for Monotonic {
    fn default() -> Self {
        Self::new()
    }
}

impl HighResolutionCounter for Monotonic {
    fn name(&self) -> &'static str {
        "monotonic"
    }

    #[inline(always)]
    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Counter picked for the build target
#[derive(Debug, Clone, Copy)]
pub enum CycleCounter {
    #[cfg(target_arch = "x86_64")]
    Tsc(Tsc),
    Monotonic(Monotonic),
}

impl CycleCounter {
    /// Native cycle counter where available, monotonic clock otherwise
    pub fn select() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            CycleCounter::Tsc(Tsc)
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            CycleCounter::Monotonic(Monotonic::new())
        }
    }
}

impl HighResolutionCounter for CycleCounter {
    fn name(&self) -> &'static str {
        match self {
            #[cfg(target_arch = "x86_64")]
            CycleCounter::Tsc(c) => c.name(),
            CycleCounter::Monotonic(c) => c.name(),
        }
    }

    #[inline(always)]
    fn now(&self) -> u64 {
        match self {
            #[cfg(target_arch = "x86_64")]
            CycleCounter::Tsc(c) => c.now(),
            CycleCounter::Monotonic(c) => c.now(),
        }
    }
}
