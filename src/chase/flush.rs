//! Eviction primitive
//! Chases a buffer twice the size of the largest cache to push out whatever
//! was resident before

use std::hint::black_box;

use tracing::debug;

use super::buffer::ChaseBuffer;
use crate::error::{ProbeError, Result};

/// Successor offset of the eviction buffer, in slots.
/// Odd and prime so it never lines up with the probe's one-line stride.
pub const FLUSH_STEP: usize = 97;

/// Displace cache contents by walking `2 * reference_size` bytes
///
/// Returns the size of the working buffer in bytes. The buffer is released
/// before returning.
pub fn flush_cache(reference_size: usize) -> Result<usize> {
    let bytes = reference_size
        .checked_mul(2)
        .ok_or(ProbeError::Allocation {
            operation: "flush_cache",
            bytes: usize::MAX,
            align: super::CACHE_LINE,
        })?;

    let buffer = ChaseBuffer::with_step(bytes, FLUSH_STEP, "flush_cache")?;
    let (_, sum) = buffer.chase_sum(0, buffer.len() as u64);
    black_box(sum);

    debug!(bytes = buffer.size_bytes(), "Cache flushed");
    Ok(buffer.size_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chase::ELEMENT;

    #[test]
    fn test_flush_buffer_is_twice_reference() {
        let bytes = flush_cache(8 * 1024 * 1024).unwrap();
        assert_eq!(bytes, 16_777_216);
    }

    #[test]
    fn test_flush_traversal_covers_every_slot_once() {
        let buffer = ChaseBuffer::with_step(16_777_216, FLUSH_STEP, "test").unwrap();
        assert_eq!(buffer.len(), 16_777_216 / ELEMENT);

        let slots = buffer.as_slice();
        let mut visited = vec![false; buffer.len()];
        let mut idx = 0;
        for _ in 0..buffer.len() {
            idx = slots[idx];
            assert!(!visited[idx], "slot {} visited twice", idx);
            visited[idx] = true;
        }
        assert_eq!(idx, 0);
        assert!(visited.iter().all(|&v| v));
    }

    #[test]
    fn test_flush_rejects_tiny_reference() {
        assert!(matches!(
            flush_cache(1),
            Err(ProbeError::BufferTooSmall { size: 2, .. })
        ));
    }

    #[test]
    fn test_flush_overflowing_reference() {
        assert!(matches!(
            flush_cache(usize::MAX),
            Err(ProbeError::Allocation { operation: "flush_cache", .. })
        ));
    }
}
