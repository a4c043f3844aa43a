//! Codec tuning options.
//!
//! Controls when [`crate::codec`] fans work out onto the rayon pool and how
//! large each parallel chunk is. The defaults suit tensors of a few thousand
//! elements and up; small inputs always take the sequential path.
//!
//! # Beispiel
//!
//! ```
//! use accelbits::CodecOptions;
//!
//! let opts = CodecOptions::default()
//!     .with_parallel_threshold(1 << 20)
//!     .with_chunk_elements(1000);
//!
//! assert_eq!(opts.parallel_threshold(), 1 << 20);
//! assert_eq!(opts.chunk_elements(), 1000);
//! assert!(opts.validate().is_ok());
//! ```

use crate::{Error, Result};

/// Default element count from which pack/unpack run in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Default number of elements handled by one parallel task.
pub const DEFAULT_CHUNK_ELEMENTS: usize = 8192;

/// Options for [`crate::codec::pack_with_options`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    pub(crate) parallel_threshold: usize,
    pub(crate) chunk_elements: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            chunk_elements: DEFAULT_CHUNK_ELEMENTS,
        }
    }
}

impl CodecOptions {
    // --- Getter ---

    /// Element count from which work is split across the rayon pool.
    pub fn parallel_threshold(&self) -> usize { self.parallel_threshold }
    /// Requested elements per parallel task.
    pub fn chunk_elements(&self) -> usize { self.chunk_elements }

    // --- Setter ---

    pub fn set_parallel_threshold(&mut self, v: usize) { self.parallel_threshold = v; }
    pub fn set_chunk_elements(&mut self, v: usize) { self.chunk_elements = v; }

    // --- Builder ---

    /// Sets the parallel threshold. `usize::MAX` disables parallelism.
    pub fn with_parallel_threshold(mut self, v: usize) -> Self {
        self.parallel_threshold = v;
        self
    }

    /// Sets the requested chunk size in elements.
    pub fn with_chunk_elements(mut self, v: usize) -> Self {
        self.chunk_elements = v;
        self
    }

    /// Options that never leave the calling thread.
    pub fn sequential() -> Self {
        Self::default().with_parallel_threshold(usize::MAX)
    }

    /// Validates the option values.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_elements == 0 {
            return Err(Error::InvalidOption("chunk_elements must be greater than zero".into()));
        }
        Ok(())
    }

    /// Whether `count` elements should be processed in parallel.
    #[inline]
    pub(crate) fn use_parallel(&self, count: usize) -> bool {
        count >= self.parallel_threshold && count > self.aligned_chunk()
    }

    /// Chunk size rounded up to a multiple of 8 elements.
    ///
    /// 8 Elemente belegen immer `bitwidth` volle Bytes, dadurch schreibt
    /// jeder Chunk in einen disjunkten Byte-Bereich.
    #[inline]
    pub(crate) fn aligned_chunk(&self) -> usize {
        self.chunk_elements.max(1).div_ceil(8) * 8
    }
}
