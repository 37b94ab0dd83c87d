//! The on-heap block record prepended to every payload.

use std::ptr;

/// Sentinel magic value for a free block.
pub(crate) const MAGIC_FREE: u32 = 0xDEAD_BEEF;
/// Sentinel magic value for an allocated block.
pub(crate) const MAGIC_ALLOCATED: u32 = 0xFEED_FACE;

/// Header prepended to every block, free or allocated.
///
/// `next`/`prev` are only meaningful while the block is on the free list;
/// their contents are unspecified once the block is handed out.
#[repr(C)]
pub(crate) struct BlockHeader {
    pub(crate) payload_size: usize,
    pub(crate) next: *mut BlockHeader,
    pub(crate) prev: *mut BlockHeader,
    pub(crate) is_free: bool,
    pub(crate) magic: u32,
}

/// Size of [`BlockHeader`], and therefore the offset from a block's address
/// to its payload.
pub(crate) const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

impl BlockHeader {
    /// The payload address for a block at `block`.
    ///
    /// # Safety
    /// `block` must point to a live, initialized `BlockHeader`.
    pub(crate) unsafe fn payload_ptr(block: *mut BlockHeader) -> *mut u8 {
        unsafe { (block as *mut u8).add(HEADER_SIZE) }
    }

    /// Recover the block header from a payload pointer previously returned
    /// by [`payload_ptr`](Self::payload_ptr).
    ///
    /// # Safety
    /// `payload` must have been returned by `payload_ptr` for a still-live
    /// block; it must not be null.
    pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut BlockHeader {
        unsafe { payload.sub(HEADER_SIZE).cast::<BlockHeader>() }
    }

    /// The block immediately following `block` in address order.
    ///
    /// # Safety
    /// `block` must point to a live, initialized `BlockHeader` whose
    /// `payload_size` has not been corrupted.
    pub(crate) unsafe fn next_in_memory(block: *mut BlockHeader) -> *mut BlockHeader {
        unsafe {
            let size = (*block).payload_size;
            (block as *mut u8).add(HEADER_SIZE + size).cast::<BlockHeader>()
        }
    }
}

/// Write a fresh FREE-tagged header at `addr` covering `payload_size` bytes.
///
/// # Safety
/// `addr` must be valid, writable, and large enough for a `BlockHeader` plus
/// `payload_size` bytes, and must not alias any other live block.
pub(crate) unsafe fn write_free_block(addr: *mut BlockHeader, payload_size: usize) {
    unsafe {
        ptr::write(
            addr,
            BlockHeader {
                payload_size,
                next: ptr::null_mut(),
                prev: ptr::null_mut(),
                is_free: true,
                magic: MAGIC_FREE,
            },
        );
    }
}
