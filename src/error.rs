//! Error types returned by the fallible operations on [`crate::ImplicitHeap`]
//! and [`crate::ExplicitHeap`].
//!
//! Most failure modes in this crate are represented as `Option`/`bool`
//! sentinels (a region too small to hold the minimum bookkeeping, or an
//! allocation request with no fitting block), matching how the rest of the
//! allocator surface reports "nothing to report" conditions. These two enums
//! cover the cases where the caller needs to know *which* thing went wrong.

/// Why [`ImplicitHeap::init`](crate::ImplicitHeap::init) or
/// [`ExplicitHeap::init`](crate::ExplicitHeap::init) refused a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The supplied region is too small to hold both sentinel headers and
    /// one minimum-size free block.
    TooSmall,
}

/// Why a `free` call could not release a pointer.
///
/// A double free is not an error here: it is a silent no-op, matching
/// `free`'s own "invalid free is silently ignored" contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeError {
    /// `ptr` does not correspond to any block header in this region.
    AllocationNotFound,
}
