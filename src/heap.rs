//! Allocate/release entry points: search → grow → unlink → split → mark,
//! and validate → mark-free → insert → coalesce.

use crate::brk::ProgramBreak;
use crate::config::HeapConfig;
use crate::debug;
use crate::error::HeapError;
use crate::free_list::{fl_push, fl_unlink, find_fit};
use crate::header::{write_free_block, BlockHeader, HEADER_SIZE, MAGIC_ALLOCATED};
use log::{debug, trace, warn};
use std::ptr;

/// A single-heap, first-fit, free-list allocator over a [`ProgramBreak`].
///
/// `Heap` owns every piece of mutable allocator state (`heap_start`,
/// `heap_end`, the free-list head, every block header reachable from
/// either). It assumes a single mutator: there is no internal
/// synchronization, and the raw pointers it carries make it `!Send`/`!Sync`
/// by construction, which is deliberate (see the crate's design notes).
pub struct Heap<B: ProgramBreak> {
    brk: B,
    config: HeapConfig,
    heap_start: usize,
    heap_end: usize,
    free_list: *mut BlockHeader,
}

impl<B: ProgramBreak> Heap<B> {
    /// Construct a heap over `brk`, uninitialized until the first
    /// `allocate` or explicit `initialize` call, using the default
    /// [`HeapConfig`].
    #[must_use]
    pub fn new(brk: B) -> Self {
        Self::with_config(brk, HeapConfig::default())
    }

    /// Construct a heap over `brk` with a custom [`HeapConfig`].
    #[must_use]
    pub fn with_config(brk: B, config: HeapConfig) -> Self {
        Self {
            brk,
            config,
            heap_start: 0,
            heap_end: 0,
            free_list: ptr::null_mut(),
        }
    }

    /// Whether [`initialize`](Self::initialize) has already succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.heap_start != 0
    }

    /// Acquire the initial heap region, if not already initialized.
    ///
    /// `initial_size` is rounded up to a multiple of the configured
    /// alignment; if the result is too small to hold a header plus the
    /// minimum payload, [`HeapConfig::default_growth`] is substituted.
    /// Returns the heap base address, or `None` on program-break failure.
    pub fn initialize(&mut self, initial_size: usize) -> Option<usize> {
        if self.is_initialized() {
            return Some(self.heap_start);
        }

        let mut size = self.config.align_up(initial_size);
        if size < HEADER_SIZE + self.config.min_payload {
            size = self.config.default_growth;
        }

        let base = match self.brk.grow(size) {
            Ok(base) => base,
            Err(err) => {
                warn!("heap initialization failed: {err}");
                return None;
            }
        };
        debug_assert_eq!(
            base % self.config.align,
            0,
            "program break must already be aligned"
        );

        let block = base as *mut BlockHeader;
        // Safety: `brk.grow` just reserved `size` fresh, exclusive bytes at `base`.
        unsafe {
            write_free_block(block, size - HEADER_SIZE);
        }

        self.heap_start = base;
        self.heap_end = base + size;
        self.free_list = block;
        debug!("heap initialized at {base:#x}, size {size} bytes");
        Some(base)
    }

    /// Extend the heap by at least `need_bytes` (rounded up to the
    /// configured alignment and growth granularity), merging into a
    /// trailing free block when possible.
    fn grow(&mut self, need_bytes: usize) -> Result<*mut BlockHeader, HeapError> {
        let expand = self
            .config
            .align_up(need_bytes)
            .max(self.config.default_growth);
        let old_end = self.heap_end;
        let base = self.brk.grow(expand)?;
        debug_assert_eq!(base, old_end, "program break grew non-contiguously");
        self.heap_end = old_end + expand;

        let new_block = old_end as *mut BlockHeader;
        // Safety: `brk.grow` just reserved `expand` fresh, exclusive bytes at `old_end`.
        unsafe {
            write_free_block(new_block, expand - HEADER_SIZE);
        }

        if let Some(last) = self.last_block_in_address_order() {
            // Safety: `last` was found walking live blocks below the old `heap_end`.
            if unsafe { (*last).is_free } {
                unsafe {
                    (*last).payload_size += expand;
                }
                debug!("heap grown by {expand} bytes, merged into trailing free block");
                return Ok(last);
            }
        }

        // Safety: `new_block` was just written above and is not yet linked anywhere.
        unsafe {
            fl_push(&mut self.free_list, new_block);
        }
        debug!("heap grown by {expand} bytes, appended as a new free block");
        Ok(new_block)
    }

    /// The last block in address order, or `None` if the heap is empty.
    fn last_block_in_address_order(&self) -> Option<*mut BlockHeader> {
        if !self.is_initialized() {
            return None;
        }
        let mut current = self.heap_start as *mut BlockHeader;
        let mut last = current;
        while (current as usize) < self.heap_end {
            last = current;
            // Safety: invariant 1 (contiguity) holds between top-level calls.
            current = unsafe { BlockHeader::next_in_memory(current) };
        }
        Some(last)
    }

    /// Carve a trailing residual off `block` if the leftover is large enough
    /// to hold a header and the minimum payload.
    ///
    /// `block` must already be unlinked from the free list and have
    /// `payload_size >= req`.
    fn split(&self, block: *mut BlockHeader, req: usize) -> Option<*mut BlockHeader> {
        // Safety: caller guarantees `block` is a live, unlinked header.
        let leftover = unsafe { (*block).payload_size } - req;
        if leftover < HEADER_SIZE + self.config.min_payload {
            return None;
        }

        // Safety: `block` has at least `HEADER_SIZE + req + leftover` bytes
        // reserved, so the residual fits entirely inside the original block.
        unsafe {
            let residual = (block as *mut u8).add(HEADER_SIZE + req).cast::<BlockHeader>();
            write_free_block(residual, leftover - HEADER_SIZE);
            (*block).payload_size = req;
            Some(residual)
        }
    }

    /// Merge `block` with its physically-adjacent free neighbours.
    ///
    /// Forward first, then backward, each located by an address-order walk
    /// from `heap_start` rather than by dereferencing `block`'s own
    /// (possibly stale) free-list links — this is what makes coalesce safe
    /// regardless of which neighbours exist.
    fn coalesce(&mut self, block: *mut BlockHeader) {
        // Safety: `block` is live and below `heap_end`; invariant 1 holds.
        unsafe {
            let next = BlockHeader::next_in_memory(block);
            if (next as usize) < self.heap_end && (*next).is_free {
                fl_unlink(&mut self.free_list, next);
                (*block).payload_size += HEADER_SIZE + (*next).payload_size;
            }
        }

        let mut current = self.heap_start as *mut BlockHeader;
        let mut prev: *mut BlockHeader = ptr::null_mut();
        while (current as usize) < self.heap_end && current != block {
            prev = current;
            // Safety: invariant 1 (contiguity) holds between top-level calls.
            current = unsafe { BlockHeader::next_in_memory(current) };
        }

        if !prev.is_null() {
            // Safety: `prev` was found walking live blocks.
            if unsafe { (*prev).is_free } {
                unsafe {
                    fl_unlink(&mut self.free_list, block);
                    (*prev).payload_size += HEADER_SIZE + (*block).payload_size;
                }
            }
        }
    }

    /// Allocate `size` bytes. Returns an `A`-aligned payload pointer, or
    /// null on a zero-size request or program-break exhaustion.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        if size == 0 {
            return ptr::null_mut();
        }

        if !self.is_initialized() && self.initialize(self.config.default_growth).is_none() {
            return ptr::null_mut();
        }

        let req = self.config.align_up(size);

        // Safety: `self.free_list` is a well-formed free list by invariant 5.
        let mut block = unsafe { find_fit(self.free_list, req) };
        if block.is_null() {
            block = match self.grow(req + HEADER_SIZE) {
                Ok(block) => block,
                Err(err) => {
                    warn!("allocate({size}) failed to grow heap: {err}");
                    return ptr::null_mut();
                }
            };
        }

        // Safety: `block` is either `find_fit`'s result (on the free list)
        // or `grow`'s result (just pushed onto the free list).
        unsafe {
            fl_unlink(&mut self.free_list, block);
        }

        if let Some(residual) = self.split(block, req) {
            // Safety: `residual` was just written by `split` and is not yet linked.
            unsafe {
                fl_push(&mut self.free_list, residual);
            }
        }

        // Safety: `block` is unlinked and large enough for `req` bytes.
        unsafe {
            (*block).is_free = false;
            (*block).magic = MAGIC_ALLOCATED;
        }

        // Safety: `block` is a live, now-allocated header.
        let payload = unsafe { BlockHeader::payload_ptr(block) };
        trace!("allocate({size}) -> {:#x} ({req} bytes reserved)", payload as usize);
        payload
    }

    /// Release a pointer previously returned by [`allocate`](Self::allocate).
    ///
    /// `ptr` may be null, in which case this is a no-op. A pointer that
    /// cannot have come from this heap, or whose header is not
    /// ALLOCATED-tagged (corruption, or a double free), is reported via
    /// [`log::warn!`] and otherwise ignored — the allocator's state is left
    /// unmodified.
    pub fn release(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        if let Err(err) = self.try_release(ptr) {
            warn!("release({:#x}) failed: {err}", ptr as usize);
            return;
        }
        trace!("release({:#x})", ptr as usize);
    }

    /// Fallible core of [`release`](Self::release), naming *why* a release
    /// did not happen for diagnostics and tests. `ptr` must be non-null.
    fn try_release(&mut self, ptr: *mut u8) -> Result<(), HeapError> {
        if !self.is_initialized() {
            return Err(HeapError::Uninitialized);
        }

        // Safety: by contract, `ptr` was returned by a prior `allocate` call
        // on this heap, so the header immediately precedes it.
        let block = unsafe { BlockHeader::from_payload(ptr) };
        // Safety: `block` points at least `HEADER_SIZE` bytes into a
        // previously-reserved span, so reading its tag is sound even if the
        // tag itself has been corrupted.
        if unsafe { (*block).magic } != MAGIC_ALLOCATED {
            return Err(HeapError::InvalidFree);
        }

        // Safety: `block` is a live, currently-allocated header.
        unsafe {
            (*block).is_free = true;
            fl_push(&mut self.free_list, block);
        }
        self.coalesce(block);
        Ok(())
    }

    /// Walk the heap in address order, checking per-block tags and
    /// containment. An uninitialized heap is vacuously valid.
    #[must_use]
    pub fn validate(&self) -> bool {
        debug::validate(self).is_ok()
    }

    pub(crate) fn heap_range(&self) -> (usize, usize) {
        (self.heap_start, self.heap_end)
    }
}
