//! The doubly-linked free list: push, unlink, and first-fit search.
//!
//! New free blocks are pushed at the head (insertion order, not address
//! order) — first-fit search therefore favors the most recently freed
//! block, which is what the reuse law in this crate's tests depends on.

use crate::header::{BlockHeader, MAGIC_FREE};
use std::ptr;

/// Push `block` onto the front of the free list rooted at `*head`.
///
/// # Safety
/// `block` must point to a live `BlockHeader` not already on any free list.
/// `*head` must be null or point to a live free-list node.
pub(crate) unsafe fn fl_push(head: &mut *mut BlockHeader, block: *mut BlockHeader) {
    unsafe {
        (*block).is_free = true;
        (*block).magic = MAGIC_FREE;
        (*block).prev = ptr::null_mut();
        (*block).next = *head;
        if !(*head).is_null() {
            (**head).prev = block;
        }
        *head = block;
    }
}

/// Remove `block` from the free list rooted at `*head`.
///
/// # Safety
/// `block` must currently be linked into the list rooted at `*head`.
pub(crate) unsafe fn fl_unlink(head: &mut *mut BlockHeader, block: *mut BlockHeader) {
    unsafe {
        let prev = (*block).prev;
        let next = (*block).next;
        if prev.is_null() {
            *head = next;
        } else {
            (*prev).next = next;
        }
        if !next.is_null() {
            (*next).prev = prev;
        }
        (*block).next = ptr::null_mut();
        (*block).prev = ptr::null_mut();
    }
}

/// First-fit: the first block reachable from `head` whose `payload_size` is
/// at least `req`, or null if none qualifies.
///
/// # Safety
/// `head` must be null or the head of a well-formed free list.
pub(crate) unsafe fn find_fit(head: *mut BlockHeader, req: usize) -> *mut BlockHeader {
    unsafe {
        let mut current = head;
        while !current.is_null() {
            if (*current).payload_size >= req {
                return current;
            }
            current = (*current).next;
        }
        ptr::null_mut()
    }
}
