//! The program-break boundary.
//!
//! Everything above this module treats "get more backing memory" as an
//! opaque capability. [`ProgramBreak`] names exactly the two operations the
//! rest of the allocator needs; [`SystemBreak`] satisfies it with the real
//! POSIX `sbrk(2)` call, and [`ArenaBreak`] satisfies it with a fixed-size
//! owned buffer so the test suite doesn't contend over the one real,
//! process-wide break.

use crate::error::BreakError;

/// A monotonic program-break capability.
///
/// Implementors hand out a contiguous, ever-growing region starting at
/// whatever address [`current_break`](ProgramBreak::current_break) reports
/// before the first [`grow`](ProgramBreak::grow) call. The region never
/// shrinks and never moves.
pub trait ProgramBreak {
    /// The current top of the managed region.
    fn current_break(&self) -> usize;

    /// Extend the region by `n` bytes, returning the *old* break — the base
    /// address of the freshly added span.
    fn grow(&mut self, n: usize) -> Result<usize, BreakError>;
}

/// A fixed-capacity, in-process arena standing in for the OS break.
///
/// Backed by a `Box<[u64]>` so the base address is 8-byte aligned without
/// needing a platform-specific allocation API, and so the address is stable
/// for the arena's lifetime (the box is never reallocated).
pub struct ArenaBreak {
    storage: Box<[u64]>,
    capacity: usize,
    cursor: usize,
}

impl ArenaBreak {
    /// Reserve an arena of at least `capacity_bytes` bytes.
    #[must_use]
    pub fn new(capacity_bytes: usize) -> Self {
        let words = capacity_bytes.div_ceil(8);
        let storage = vec![0u64; words].into_boxed_slice();
        Self {
            capacity: storage.len() * 8,
            storage,
            cursor: 0,
        }
    }

    fn base(&self) -> usize {
        self.storage.as_ptr() as usize
    }
}

impl ProgramBreak for ArenaBreak {
    fn current_break(&self) -> usize {
        self.base() + self.cursor
    }

    fn grow(&mut self, n: usize) -> Result<usize, BreakError> {
        let new_cursor = self
            .cursor
            .checked_add(n)
            .filter(|&c| c <= self.capacity)
            .ok_or(BreakError::Exhausted { requested: n })?;
        let old = self.base() + self.cursor;
        self.cursor = new_cursor;
        Ok(old)
    }
}

/// The real process program break, moved via `sbrk(2)`.
///
/// Only available on unix targets, where `sbrk` exists. Moving the break
/// concurrently from multiple `SystemBreak` instances (or alongside any
/// other code that calls `sbrk`/`brk`) races; the crate's single-mutator
/// assumption (see the design notes) applies here too.
#[cfg(unix)]
pub struct SystemBreak {
    _private: (),
}

#[cfg(unix)]
impl SystemBreak {
    /// Bind to the process's real program break.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(unix)]
impl Default for SystemBreak {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl ProgramBreak for SystemBreak {
    fn current_break(&self) -> usize {
        // Safety: sbrk(0) only reads the break, never moves it.
        unsafe { libc::sbrk(0) as usize }
    }

    fn grow(&mut self, n: usize) -> Result<usize, BreakError> {
        let increment = isize::try_from(n).map_err(|_| BreakError::Exhausted { requested: n })?;
        // Safety: FFI call per libc's documented sbrk contract; the returned
        // pointer is only ever read as an integer, never dereferenced here.
        let old = unsafe { libc::sbrk(increment) };
        if old as isize == -1 {
            return Err(BreakError::Exhausted { requested: n });
        }
        Ok(old as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_grow_is_contiguous_and_monotonic() {
        let mut arena = ArenaBreak::new(64);
        let a = arena.grow(16).expect("first grow");
        let b = arena.grow(16).expect("second grow");
        assert_eq!(b, a + 16);
        assert_eq!(arena.current_break(), b + 16);
    }

    #[test]
    fn arena_reports_exhaustion_without_growing() {
        let mut arena = ArenaBreak::new(32);
        arena.grow(32).expect("fits exactly");
        let before = arena.current_break();
        let err = arena.grow(1).unwrap_err();
        assert_eq!(err, BreakError::Exhausted { requested: 1 });
        assert_eq!(arena.current_break(), before);
    }

    #[test]
    fn arena_base_is_eight_byte_aligned() {
        let arena = ArenaBreak::new(4096);
        assert_eq!(arena.current_break() % 8, 0);
    }
}
