//! A first-fit heap allocator over a caller-supplied byte region, offered in
//! two variants:
//!
//! - [`ImplicitHeap`]: every block header sits directly in the region in
//!   address order; `allocate` walks the whole chain looking for the first
//!   block that fits. Freed blocks are never coalesced with their
//!   neighbors. This keeps `free` O(1) at the cost of fragmenting faster
//!   under churn, a deliberate trade-off rather than a missing feature.
//! - [`ExplicitHeap`]: free blocks are additionally threaded onto an
//!   address-ordered doubly-linked list, using the free block's own payload
//!   to store the two link words. `allocate` only ever walks free blocks,
//!   and `free`/`reallocate` coalesce eagerly with a free right neighbor.
//!
//! Both variants pack a block's payload size and used/free state into a
//! single header word (see [`mod@header`]) and store block positions as
//! offsets into the region rather than raw pointers (see [`mod@region`]),
//! so arithmetic on block positions cannot produce a dangling pointer by
//! construction; the one place raw pointers appear is at the public
//! `allocate`/`free`/`reallocate` boundary, where callers hand in and get
//! back ordinary `*mut u8` payload pointers, and in the `GlobalAlloc`
//! wrappers ([`GlobalImplicitHeap`], [`GlobalExplicitHeap`]) that adapt
//! either variant to `#[global_allocator]` use.
//!
//! Neither variant grows its region once initialized, and neither
//! synchronizes internally; that is the `GlobalAlloc` wrappers' job, via a
//! `spin::Mutex`, same as everywhere else a single-threaded core is exposed
//! as a global allocator.
//!
//! # Example
//! ```
//! use regionheap::ImplicitHeap;
//!
//! let mut memory = [0u8; 1024];
//! let mut heap = ImplicitHeap::init(&mut memory).unwrap();
//! let a = heap.allocate(64).unwrap();
//! let b = heap.allocate(128).unwrap();
//! unsafe {
//!     heap.free(a).unwrap();
//!     heap.free(b).unwrap();
//! }
//! assert!(heap.validate());
//! ```
#![no_std]
#![warn(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]

mod error;
mod explicit;
mod global;
mod header;
mod implicit;
mod region;

pub use error::{FreeError, InitError};
pub use explicit::{minimum_heap_size as explicit_minimum_heap_size, ExplicitHeap};
pub use global::{GlobalExplicitHeap, GlobalImplicitHeap};
pub use implicit::{minimum_heap_size as implicit_minimum_heap_size, ImplicitHeap};

/// The alignment (in bytes) every header, payload and free-list link word is
/// rounded to: one machine word, matching the header's own width.
pub const ALIGNMENT: usize = core::mem::size_of::<usize>();
