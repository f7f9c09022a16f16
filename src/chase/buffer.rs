//! Cache-line aligned pointer-chase buffer
//! Owns its allocation, every slot holds the index of its successor

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{ProbeError, Result};

/// Alignment of every chase buffer
pub const CACHE_LINE: usize = 64;

/// Size of one chase slot
pub const ELEMENT: usize = std::mem::size_of::<usize>();

/// Aligned array of successor indices
///
/// Slot `i` holds `(i + step) % len`, so chasing from any valid index stays
/// inside the buffer forever. The allocation is released on drop.
pub struct ChaseBuffer {
    ptr: NonNull<usize>,
    len: usize,
    step: usize,
    layout: Layout,
}

impl ChaseBuffer {
    /// Build a buffer of `size` bytes whose successor is `stride` bytes ahead
    pub fn with_stride(size: usize, stride: usize, operation: &'static str) -> Result<Self> {
        if stride == 0 || stride % ELEMENT != 0 {
            return Err(ProbeError::InvalidStride {
                stride,
                element: ELEMENT,
            });
        }
        Self::with_step(size, stride / ELEMENT, operation)
    }

    /// Build a buffer of `size` bytes whose successor is `step` slots ahead
    pub fn with_step(size: usize, step: usize, operation: &'static str) -> Result<Self> {
        let len = size / ELEMENT;
        if len == 0 {
            return Err(ProbeError::BufferTooSmall {
                size,
                element: ELEMENT,
            });
        }

        let bytes = len * ELEMENT;
        let alloc_err = || ProbeError::Allocation {
            operation,
            bytes,
            align: CACHE_LINE,
        };
        let layout = Layout::from_size_align(bytes, CACHE_LINE).map_err(|_| alloc_err())?;

        // SAFETY: layout has non-zero size
        let raw = unsafe { alloc::alloc(layout) } as *mut usize;
        let ptr = NonNull::new(raw).ok_or_else(alloc_err)?;

        let step = step % len;
        for i in 0..len {
            let next = if i + step >= len { i + step - len } else { i + step };
            // SAFETY: i < len and the allocation holds len slots
            unsafe { ptr.as_ptr().add(i).write(next) };
        }

        Ok(Self {
            ptr,
            len,
            step,
            layout,
        })
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false, construction rejects empty buffers
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes actually allocated
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.layout.size()
    }

    /// Successor offset in slots, already reduced modulo `len`
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn as_ptr(&self) -> *const usize {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[usize] {
        // SAFETY: every slot was initialised in the constructor
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Follow `steps` successor links starting at `start`
    ///
    /// Each load depends on the previous one, which keeps the hardware
    /// prefetcher from running ahead.
    #[inline(always)]
    pub fn chase(&self, start: usize, steps: u64) -> usize {
        assert!(start < self.len, "chase start {} out of {}", start, self.len);
        let base = self.ptr.as_ptr();
        let mut idx = start;
        for _ in 0..steps {
            debug_assert!(idx < self.len);
            // SAFETY: every slot holds an index below len
            idx = unsafe { *base.add(idx) };
        }
        idx
    }

    /// Like [`chase`](Self::chase) but also returns the wrapping sum of
    /// every index visited
    #[inline(always)]
    pub fn chase_sum(&self, start: usize, steps: u64) -> (usize, usize) {
        assert!(start < self.len, "chase start {} out of {}", start, self.len);
        let base = self.ptr.as_ptr();
        let mut idx = start;
        let mut sum = 0usize;
        for _ in 0..steps {
            // SAFETY: every slot holds an index below len
            idx = unsafe { *base.add(idx) };
            sum = sum.wrapping_add(idx);
        }
        (idx, sum)
    }
}

impl Drop for ChaseBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr came from alloc::alloc with this exact layout
        unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.layout) }
    }
}

impl std::fmt::Debug for ChaseBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaseBuffer")
            .field("len", &self.len)
            .field("step", &self.step)
            .field("bytes", &self.size_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_successor_formula() {
        let buffer = ChaseBuffer::with_stride(16 * ELEMENT, 4 * ELEMENT, "test").unwrap();
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.step(), 4);
        for (i, &next) in buffer.as_slice().iter().enumerate() {
            assert_eq!(next, (i + 4) % 16);
        }
    }

    #[test]
    fn test_cache_line_aligned() {
        let buffer = ChaseBuffer::with_stride(32 * 1024, 64, "test").unwrap();
        assert_eq!(buffer.as_ptr() as usize % CACHE_LINE, 0);
        assert_eq!(buffer.size_bytes(), 32 * 1024);
    }

    #[test]
    fn test_partial_element_truncated() {
        let buffer = ChaseBuffer::with_step(3 * ELEMENT + 1, 1, "test").unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.size_bytes(), 3 * ELEMENT);
    }

    #[test]
    fn test_rejects_degenerate_inputs() {
        assert_eq!(
            ChaseBuffer::with_stride(ELEMENT - 1, 64, "test").unwrap_err(),
            ProbeError::BufferTooSmall { size: ELEMENT - 1, element: ELEMENT }
        );
        assert!(matches!(
            ChaseBuffer::with_stride(4096, 0, "test"),
            Err(ProbeError::InvalidStride { stride: 0, .. })
        ));
        assert!(matches!(
            ChaseBuffer::with_stride(4096, ELEMENT + 1, "test"),
            Err(ProbeError::InvalidStride { .. })
        ));
    }

    #[test]
    fn test_stride_larger_than_buffer_wraps() {
        // 4 slots, step 6 reduces to 2
        let buffer = ChaseBuffer::with_stride(4 * ELEMENT, 6 * ELEMENT, "test").unwrap();
        assert_eq!(buffer.step(), 2);
        assert_eq!(buffer.as_slice(), &[2, 3, 0, 1]);
    }

    #[test]
    fn test_chase_wraps_past_len() {
        let buffer = ChaseBuffer::with_stride(8 * ELEMENT, ELEMENT, "test").unwrap();
        assert_eq!(buffer.chase(0, 8), 0);
        assert_eq!(buffer.chase(0, 11), 3);
        assert_eq!(buffer.chase(5, 0), 5);
    }

    #[test]
    fn test_chase_sum_matches_visits() {
        let buffer = ChaseBuffer::with_step(5 * ELEMENT, 2, "test").unwrap();
        // 0 -> 2 -> 4 -> 1 -> 3 -> 0
        let (end, sum) = buffer.chase_sum(0, 5);
        assert_eq!(end, 0);
        assert_eq!(sum, 2 + 4 + 1 + 3);
    }

    proptest! {
        #[test]
        fn test_successor_closed(
            len in 1usize..4096,
            step in 1usize..256,
            steps in 0u64..20_000,
        ) {
            let buffer = ChaseBuffer::with_stride(len * ELEMENT, step * ELEMENT, "test").unwrap();
            prop_assert!(buffer.as_slice().iter().all(|&next| next < len));

            let end = buffer.chase(0, steps);
            prop_assert!(end < len);
            prop_assert_eq!(end as u128, (steps as u128 * step as u128) % len as u128);
        }
    }
}
