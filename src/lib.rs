//! A single-heap, first-fit, free-list allocator grown over a program break.
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐      ┌───────────────┐
//! │ ProgramBreak │ ───▶ │  Heap<B>     │ ───▶ │ BlockHeader   │
//! │ (brk.rs)     │      │  (heap.rs)   │      │ (header.rs)   │
//! └─────────────┘      └──────┬───────┘      └───────────────┘
//!                              │
//!                       ┌──────┴───────┐
//!                       │  free_list   │
//!                       │ (free_list.rs)│
//!                       └──────────────┘
//! ```
//!
//! [`Heap`] is the only type most callers need: construct one over a
//! [`ProgramBreak`] implementation ([`SystemBreak`] for the real OS break,
//! [`ArenaBreak`] for tests), then call [`Heap::allocate`] and
//! [`Heap::release`]. There is no internal synchronization — a `Heap` value
//! assumes a single mutator, matching the non-goal this crate was built
//! against. A process-wide convenience wrapper is available behind
//! [`global_heap`] on unix targets, for callers that want `malloc`/`free`-like
//! global state instead of threading a `Heap` value through their code.

pub mod brk;
pub mod config;
pub mod error;

mod debug;
mod free_list;
mod header;
mod heap;

pub use brk::{ArenaBreak, ProgramBreak};
#[cfg(unix)]
pub use brk::SystemBreak;
pub use config::HeapConfig;
pub use error::{BreakError, HeapError};
pub use heap::Heap;

#[cfg(unix)]
mod global {
    use super::{Heap, SystemBreak};
    use std::sync::Once;

    #[allow(static_mut_refs)]
    static mut GLOBAL: Option<Heap<SystemBreak>> = None;
    static INIT: Once = Once::new();

    /// The process-wide heap over the real program break, lazily initialized
    /// on first call.
    ///
    /// # Safety
    /// The caller must not call this concurrently from multiple threads, nor
    /// mix it with any other code that moves the process break via
    /// `sbrk`/`brk` — see [`SystemBreak`]'s single-mutator assumption.
    #[allow(static_mut_refs)]
    pub unsafe fn global_heap() -> &'static mut Heap<SystemBreak> {
        INIT.call_once(|| unsafe {
            GLOBAL = Some(Heap::new(SystemBreak::new()));
        });
        unsafe { GLOBAL.as_mut().expect("initialized by Once above") }
    }
}

#[cfg(unix)]
pub use global::global_heap;
