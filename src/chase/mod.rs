//! Pointer-chase buffers and the eviction walk built on them

pub mod buffer;
pub mod flush;

pub use buffer::{ChaseBuffer, CACHE_LINE, ELEMENT};
pub use flush::{flush_cache, FLUSH_STEP};
