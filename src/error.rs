//! Internal error types.
//!
//! None of these cross the public `allocate`/`release`/`validate` boundary
//! as a `Result` the caller must handle — the external contract stays
//! null/bool/void (see the crate's design notes). They exist so the
//! diagnostics logged through [`log`](https://docs.rs/log) and the unit
//! tests can name *why* an internal step failed.

use thiserror::Error;

/// Failure extending the program break (real `sbrk` or the test arena).
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum BreakError {
    /// The backing store (OS break or arena) could not satisfy the request.
    #[error("program break could not be grown by {requested} bytes")]
    Exhausted {
        /// Number of bytes that were requested.
        requested: usize,
    },
}

/// Failure inside the block-management core.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// An operation that requires a live heap region was attempted before
    /// one was ever carved out (e.g. `release` on a pointer that cannot
    /// possibly have come from this heap).
    #[error("heap has not been initialized")]
    Uninitialized,
    /// `grow`/`initialize` could not obtain more backing memory.
    #[error("heap growth failed: {0}")]
    BreakExhausted(#[from] BreakError),
    /// `release` was called on a pointer whose header is not ALLOCATED-tagged.
    #[error("invalid free — corrupted block or double free")]
    InvalidFree,
    /// `validate` found a block that fails a layout or tag invariant.
    #[error("heap corruption detected at offset {at:#x}")]
    Corrupt {
        /// Byte offset (relative to `heap_start`) of the offending block.
        at: usize,
    },
}
