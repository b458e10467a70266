//! Exercises `GlobalImplicitHeap`/`GlobalExplicitHeap` through `alloc`'s own
//! collections, the same way the teacher crate's own integration tests use
//! its `Allocator<N>` as a `#[global_allocator]`.
#![no_std]

extern crate alloc;

use regionheap::GlobalImplicitHeap;

const HEAP_SIZE: usize = 1024 * 1024;

#[global_allocator]
static ALLOCATOR: GlobalImplicitHeap<HEAP_SIZE> = GlobalImplicitHeap::new();

#[test]
fn vec_grows_via_the_global_allocator() {
    let mut v = alloc::vec![1, 2, 3];
    v.push(4);
    assert_eq!((1..=4).collect::<alloc::vec::Vec<_>>(), v);
}

#[test]
fn map_and_formatting() {
    let mut map = alloc::collections::BTreeMap::new();
    map.insert(10, "hello");
    map.insert(20, "world");

    let message = alloc::format!("{}, {}!", map[&10], map[&20]);
    assert_eq!(message, "hello, world!");
}

#[test]
fn boxes_round_trip_through_heap_allocation() {
    let boxed = alloc::boxed::Box::new([0u8; 256]);
    assert_eq!(boxed.len(), 256);
    drop(boxed);
}
