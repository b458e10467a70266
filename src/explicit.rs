//! The explicit free-list variant: free blocks are threaded onto an
//! address-ordered doubly-linked list (the two link words overlaid on each
//! free block's own payload), so `allocate` only ever walks free blocks
//! instead of every block in the region, and adjacent free blocks are
//! coalesced eagerly.

use crate::error::{FreeError, InitError};
use crate::header::Header;
use crate::region::{BlockOffset, Region};
use crate::ALIGNMENT;

const NONE_SENTINEL: usize = usize::MAX;
const PREV: usize = 0;
const NEXT: usize = 1;

/// Smallest region `ExplicitHeap::init` will accept: two sentinel headers
/// plus one free block large enough to hold both link words.
pub const fn minimum_heap_size() -> usize {
    4 * ALIGNMENT
}

fn round_up(size: usize) -> usize {
    (size + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT
}

fn decode_link(word: usize) -> Option<BlockOffset> {
    if word == NONE_SENTINEL {
        None
    } else {
        Some(BlockOffset(word))
    }
}

fn encode_link(at: Option<BlockOffset>) -> usize {
    at.map_or(NONE_SENTINEL, |at| at.0)
}

/// An address-ordered explicit free-list allocator over a caller-supplied
/// byte region, with splitting on allocate and right-neighbor coalescing on
/// free and on grow-`reallocate`.
///
/// ```
/// use regionheap::ExplicitHeap;
///
/// let mut memory = [0u8; 256];
/// let mut heap = ExplicitHeap::init(&mut memory).unwrap();
/// let ptr = heap.allocate(32).unwrap();
/// unsafe { heap.free(ptr) }.unwrap();
/// ```
pub struct ExplicitHeap<'a> {
    region: Region<'a>,
    head: Option<BlockOffset>,
}

impl<'a> ExplicitHeap<'a> {
    pub fn init(memory: &'a mut [u8]) -> Result<Self, InitError> {
        let region = Region::new(memory, 2 * ALIGNMENT).ok_or(InitError::TooSmall)?;
        let mut heap = Self {
            region,
            head: Some(BlockOffset::START),
        };
        heap.set_links(BlockOffset::START, None, None);
        Ok(heap)
    }

    fn get_link(&self, at: BlockOffset, slot: usize) -> Option<BlockOffset> {
        decode_link(self.region.read_link(at, slot))
    }

    fn set_link(&mut self, at: BlockOffset, slot: usize, value: Option<BlockOffset>) {
        self.region.write_link(at, slot, encode_link(value));
    }

    fn set_links(&mut self, at: BlockOffset, prev: Option<BlockOffset>, next: Option<BlockOffset>) {
        self.set_link(at, PREV, prev);
        self.set_link(at, NEXT, next);
    }

    /// Remove `at` from the free list, patching its neighbors' links (and
    /// `head`, if `at` was first).
    fn unlink(&mut self, at: BlockOffset) {
        let prev = self.get_link(at, PREV);
        let next = self.get_link(at, NEXT);
        match prev {
            Some(p) => self.set_link(p, NEXT, next),
            None => self.head = next,
        }
        if let Some(n) = next {
            self.set_link(n, PREV, prev);
        }
    }

    /// Splice `at` into the free list at the address-ordered position,
    /// assuming `at`'s header is already marked free.
    fn insert_free_ordered(&mut self, at: BlockOffset) {
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(node) = cursor {
            if node.0 > at.0 {
                break;
            }
            prev = Some(node);
            cursor = self.get_link(node, NEXT);
        }
        let next = cursor;
        self.set_links(at, prev, next);
        match prev {
            Some(p) => self.set_link(p, NEXT, Some(at)),
            None => self.head = Some(at),
        }
        if let Some(n) = next {
            self.set_link(n, PREV, Some(at));
        }
    }

    /// Find the first free-list node whose payload is at least `size`
    /// bytes.
    fn find_first_fit(&self, size: usize) -> Option<BlockOffset> {
        let mut cursor = self.head;
        while let Some(node) = cursor {
            if self.region.header(node).size() >= size {
                return Some(node);
            }
            cursor = self.get_link(node, NEXT);
        }
        None
    }

    /// Split-threshold: the smallest remainder worth carving a new free
    /// block out of (its own header plus the two link words).
    fn splittable(remainder: usize) -> bool {
        remainder >= ALIGNMENT + 2 * ALIGNMENT
    }

    pub fn allocate(&mut self, size: usize) -> Option<*mut u8> {
        if size == 0 {
            return None;
        }
        let size = round_up(size).max(2 * ALIGNMENT);
        let at = self.find_first_fit(size)?;
        let total = self.region.header(at).size();
        let remainder = total - size;
        self.unlink(at);
        if Self::splittable(remainder) {
            self.region.set_header(at, Header::used(size));
            let split_at = BlockOffset(at.0 + ALIGNMENT + size);
            self.region
                .set_header(split_at, Header::free(remainder - ALIGNMENT));
            self.insert_free_ordered(split_at);
        } else {
            self.region.set_header(at, Header::used(total));
        }
        log::trace!("explicit: allocated {size} bytes at offset {}", at.0);
        Some(self.region.payload_ptr(at))
    }

    /// True if the block immediately following `at` exists (is not the
    /// terminating sentinel) and is free.
    fn right_neighbor_is_free(&self, at: BlockOffset) -> Option<BlockOffset> {
        let next = self.region.next_offset(at);
        if next.0 >= self.region.end_offset().0 {
            return None;
        }
        self.region.header(next).is_free().then_some(next)
    }

    /// Release the block at `ptr`. A null `ptr` and a pointer already freed
    /// are both silently ignored.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by `allocate` or
    /// `reallocate` on this same heap.
    pub unsafe fn free(&mut self, ptr: *mut u8) -> Result<(), FreeError> {
        if ptr.is_null() {
            return Ok(());
        }
        let at = self
            .region
            .offset_of(ptr)
            .ok_or(FreeError::AllocationNotFound)?;
        let header = self.region.header(at);
        if header.is_free() {
            log::trace!("explicit: ignoring double free at offset {}", at.0);
            return Ok(());
        }
        let mut size = header.size();
        self.region.set_header(at, Header::free(size));
        if let Some(right) = self.right_neighbor_is_free(at) {
            size += ALIGNMENT + self.region.header(right).size();
            self.unlink(right);
            self.region.set_header(at, Header::free(size));
        }
        self.insert_free_ordered(at);
        log::trace!("explicit: freed block at offset {}", at.0);
        Ok(())
    }

    /// A null `ptr` behaves as `allocate(new_size)`.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by `allocate` or
    /// `reallocate` on this same heap, and must not have been freed since.
    pub unsafe fn reallocate(&mut self, ptr: *mut u8, new_size: usize) -> Option<*mut u8> {
        if new_size == 0 {
            return None;
        }
        if ptr.is_null() {
            return self.allocate(new_size);
        }
        let at = self.region.offset_of(ptr)?;
        let new_size = round_up(new_size).max(2 * ALIGNMENT);
        let old_size = self.region.header(at).size();

        if new_size <= old_size {
            let remainder = old_size - new_size;
            if Self::splittable(remainder) {
                self.region.set_header(at, Header::used(new_size));
                let split_at = BlockOffset(at.0 + ALIGNMENT + new_size);
                self.region
                    .set_header(split_at, Header::free(remainder - ALIGNMENT));
                if let Some(right) = self.right_neighbor_is_free(split_at) {
                    let merged = remainder - ALIGNMENT + ALIGNMENT + self.region.header(right).size();
                    self.unlink(right);
                    self.region
                        .set_header(split_at, Header::free(merged));
                }
                self.insert_free_ordered(split_at);
            }
            return Some(ptr);
        }

        // Absorb successive free right-neighbors in place, stopping as soon
        // as the accumulated size suffices or the chain of free neighbors
        // runs out.
        let mut grown = old_size;
        while grown < new_size {
            let Some(right) = self.right_neighbor_is_free(at) else {
                break;
            };
            grown += ALIGNMENT + self.region.header(right).size();
            self.unlink(right);
            self.region.set_header(at, Header::used(grown));
        }

        if grown >= new_size {
            let remainder = grown - new_size;
            if Self::splittable(remainder) {
                self.region.set_header(at, Header::used(new_size));
                let split_at = BlockOffset(at.0 + ALIGNMENT + new_size);
                self.region
                    .set_header(split_at, Header::free(remainder - ALIGNMENT));
                self.insert_free_ordered(split_at);
            } else {
                self.region.set_header(at, Header::used(grown));
            }
            return Some(ptr);
        }

        // Not enough room even after absorbing every contiguous free
        // right-neighbor: relocate, carrying the already-enlarged (but
        // still too small) block's bytes along, then free it. Its right
        // neighbor is guaranteed non-free at this point, so `free` performs
        // no further coalescing here.
        let new_ptr = self.allocate(new_size)?;
        let copy_len = old_size.min(new_size);
        // SAFETY: `ptr` and `new_ptr` point into `self.region`'s backing
        // slice at payload offsets validated by `offset_of`/`allocate`, and
        // cannot overlap since `new_ptr` was carved from a free block
        // disjoint from the still-used block at `ptr`.
        unsafe { core::ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
        // SAFETY: `ptr` is the same still-valid, still-used allocation
        // `offset_of` validated above.
        unsafe { self.free(ptr) }.expect("block just validated above");
        Some(new_ptr)
    }

    /// Check header-chain consistency (as [`crate::ImplicitHeap::validate`]
    /// does) and additionally cross-check the free list against the
    /// linearly-reachable free blocks: every list node must be a free block
    /// visited by the linear walk, every linearly free block must appear on
    /// the list exactly once, and the doubly-linked back-pointers must
    /// agree with the forward pointers.
    pub fn validate(&self) -> bool {
        let mut offset = BlockOffset::START;
        let mut linear_free_count = 0usize;
        loop {
            let header = self.region.header(offset);
            if header.size() % ALIGNMENT != 0 {
                return false;
            }
            if header.is_free() {
                linear_free_count += 1;
            }
            let next = self.region.next_offset(offset);
            if next.0 > self.region.end_offset().0 {
                return false;
            }
            if offset == self.region.end_offset() {
                if !(header.size() == 0 && header.is_used()) {
                    return false;
                }
                break;
            }
            offset = next;
        }

        let max_nodes = self.region.len() / ALIGNMENT + 1;
        let mut list_count = 0usize;
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(node) = cursor {
            list_count += 1;
            if list_count > max_nodes {
                return false; // cyclic or corrupted list
            }
            if !self.region.header(node).is_free() {
                return false;
            }
            if self.get_link(node, PREV) != prev {
                return false;
            }
            if !self.is_linearly_reachable_free_block(node) {
                return false;
            }
            prev = Some(node);
            cursor = self.get_link(node, NEXT);
        }

        list_count == linear_free_count
    }

    fn is_linearly_reachable_free_block(&self, target: BlockOffset) -> bool {
        self.region
            .blocks()
            .any(|at| at == target && self.region.header(at).is_free())
    }

    /// Emit one `log::info!` line per block (offset, size, state), followed
    /// by the free-list order.
    pub fn dump(&self) {
        for at in self.region.blocks() {
            let header = self.region.header(at);
            log::info!(
                "explicit: offset={} size={} state={:?}",
                at.0,
                header.size(),
                header.state()
            );
        }
        let mut cursor = self.head;
        while let Some(node) = cursor {
            log::info!("explicit: free-list node at offset {}", node.0);
            cursor = self.get_link(node, NEXT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_round_trips() {
        let mut memory = [0u8; 128];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let ptr = heap.allocate(16).unwrap();
        assert!(heap.validate());
        unsafe { heap.free(ptr) }.unwrap();
        assert!(heap.validate());
    }

    #[test]
    fn freeing_coalesces_with_right_neighbor() {
        let mut memory = [0u8; 256];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let a = heap.allocate(16).unwrap();
        let b = heap.allocate(16).unwrap();
        unsafe { heap.free(a) }.unwrap();
        unsafe { heap.free(b) }.unwrap();
        assert!(heap.validate());
        // Coalesced, so a request spanning both original blocks must now
        // succeed, unlike the implicit variant.
        assert!(heap.allocate(40).is_some());
    }

    #[test]
    fn double_free_is_a_no_op() {
        let mut memory = [0u8; 128];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let ptr = heap.allocate(16).unwrap();
        unsafe { heap.free(ptr) }.unwrap();
        assert_eq!(unsafe { heap.free(ptr) }, Ok(()));
        assert!(heap.validate());
    }

    #[test]
    fn free_of_null_is_a_no_op() {
        let mut memory = [0u8; 128];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        assert_eq!(unsafe { heap.free(core::ptr::null_mut()) }, Ok(()));
    }

    #[test]
    fn reallocate_of_null_behaves_as_allocate() {
        let mut memory = [0u8; 128];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let ptr = unsafe { heap.reallocate(core::ptr::null_mut(), 32) }.unwrap();
        assert!(!ptr.is_null());
        unsafe { heap.free(ptr) }.unwrap();
    }

    #[test]
    fn shrink_reallocate_keeps_pointer_identity() {
        let mut memory = [0u8; 256];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let ptr = heap.allocate(64).unwrap();
        let shrunk = unsafe { heap.reallocate(ptr, 16) }.unwrap();
        assert_eq!(shrunk, ptr);
        assert!(heap.validate());
    }

    #[test]
    fn grow_reallocate_by_coalescing_keeps_pointer_identity() {
        let mut memory = [0u8; 256];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let a = heap.allocate(16).unwrap();
        let b = heap.allocate(16).unwrap();
        unsafe { heap.free(b) }.unwrap();
        let grown = unsafe { heap.reallocate(a, 48) }.unwrap();
        assert_eq!(grown, a);
        assert!(heap.validate());
    }

    #[test]
    fn grow_reallocate_relocates_when_no_room() {
        let mut memory = [0u8; 160];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        let a = heap.allocate(16).unwrap();
        let _b = heap.allocate(16).unwrap();
        unsafe { core::ptr::write_bytes(a, 0x42, 16) };
        let grown = unsafe { heap.reallocate(a, 64) }.unwrap();
        assert_ne!(grown, a);
        let slice = unsafe { core::slice::from_raw_parts(grown, 16) };
        assert!(slice.iter().all(|&b| b == 0x42));
        assert!(heap.validate());
    }

    #[test]
    fn too_small_region_is_rejected() {
        let mut memory = [0u8; 8];
        assert_eq!(ExplicitHeap::init(&mut memory), Err(InitError::TooSmall));
    }

    #[test]
    fn validate_catches_manually_corrupted_list() {
        let mut memory = [0u8; 128];
        let mut heap = ExplicitHeap::init(&mut memory).unwrap();
        // Detach the sole free block from the list without updating head.
        heap.head = None;
        assert!(!heap.validate());
    }
}
