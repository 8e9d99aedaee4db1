//! Buffer pooling.
//!
//! Many renderlets emitting a little geometry each frame would otherwise
//! create many tiny GPU buffers. Pooled builds copy their payload into one
//! host-side staging arena; a single upload then creates one shared buffer
//! and rewrites every staged tree to point into it.

mod pool;

pub use pool::{BufferPool, DEFAULT_STAGING_CAPACITY, PoolUpload, SubBuffer};
