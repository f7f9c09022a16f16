//! Latency probe
//! Warm a chase buffer, evict unrelated state, then time a fixed number of
//! dependent loads against two clocks

use std::hint::black_box;
use std::time::Instant;

use tracing::debug;

use crate::chase::{flush_cache, ChaseBuffer};
use crate::clock::{CycleCounter, HighResolutionCounter};
use crate::error::{ProbeError, Result};
use crate::types::Measurement;

/// Eviction step run between warm-up and timing
pub type Evict = fn(usize) -> Result<usize>;

/// Times pointer chases for one configured eviction size
pub struct LatencyProbe<C = CycleCounter, E = Evict> {
    counter: C,
    evict: E,
    flush_size: usize,
}

impl LatencyProbe<CycleCounter> {
    /// Probe using the target's native counter, evicting with `flush_size`
    /// (normally the L3 capacity)
    pub fn new(flush_size: usize) -> Self {
        Self::with_counter(CycleCounter::select(), flush_size)
    }
}

impl<C: HighResolutionCounter> LatencyProbe<C> {
    pub fn with_counter(counter: C, flush_size: usize) -> Self {
        Self {
            counter,
            evict: flush_cache,
            flush_size,
        }
    }
}

impl<C, E> LatencyProbe<C, E>
where
    C: HighResolutionCounter,
    E: Fn(usize) -> Result<usize>,
{
    /// Replace the eviction walk, called with `flush_size` once per probe
    pub fn with_evictor<F>(self, evict: F) -> LatencyProbe<C, F>
    where
        F: Fn(usize) -> Result<usize>,
    {
        LatencyProbe {
            counter: self.counter,
            evict,
            flush_size: self.flush_size,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn flush_size(&self) -> usize {
        self.flush_size
    }

    /// Average cycles and nanoseconds per dereference over `iterations`
    /// chase steps through a `size`-byte buffer with successor `stride`
    pub fn assess_cache(&self, size: usize, stride: usize, iterations: u64) -> Result<Measurement> {
        if iterations == 0 {
            return Err(ProbeError::ZeroIterations);
        }

        let buffer = ChaseBuffer::with_stride(size, stride, "assess_cache")?;

        // Warm-up: one full pass brings the working set in
        let warm = buffer.chase(0, buffer.len() as u64);
        black_box(warm);

        // Disturb everything else before timing
        (self.evict)(self.flush_size)?;

        let wall_start = Instant::now();
        let cycle_start = self.counter.now();
        black_box(buffer.chase(0, iterations));
        let cycle_end = self.counter.now();
        let wall_end = Instant::now();

        let elements = buffer.len();
        drop(buffer);

        let cycles = cycle_end.saturating_sub(cycle_start);
        let nanos = wall_end.duration_since(wall_start).as_nanos() as u64;

        debug!(
            size,
            stride,
            elements,
            iterations,
            total_cycles = cycles,
            total_ns = nanos,
            "Probe complete"
        );

        Ok(Measurement {
            cycles: cycles / iterations,
            nanos: nanos / iterations,
        })
    }
}

/// One-shot probe with the native counter
pub fn assess_cache(size: usize, stride: usize, iterations: u64, flush_size: usize) -> Result<Measurement> {
    LatencyProbe::new(flush_size).assess_cache(size, stride, iterations)
}
