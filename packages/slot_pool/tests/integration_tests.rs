//! Integration tests for the `slot_pool` package.
//!
//! These exercise the external contract shared by both pool types: records stay reachable
//! through their handles while the pool grows, slots are reused lowest-first and a release-all
//! sweep returns the pool to its initial state.

use slot_pool::{ChainedPool, Handle, Recyclable, SlotPool};

/// A record that owns a nested growable buffer and refers to a sibling record.
#[derive(Debug, Default)]
struct Fragment {
    data: Vec<u8>,
    offset: usize,
    parent: Option<Handle>,
}

impl Recyclable for Fragment {
    fn reset(&mut self) {
        self.data.clear();
        self.offset = 0;
        self.parent = None;
    }

    fn release(&mut self) {
        self.data = Vec::new();
    }
}

#[test]
fn marker_survives_many_growth_events() {
    let mut pool = SlotPool::<Fragment>::builder().initial_capacity(1).build();

    let marker = pool.acquire_tracked("marker").unwrap();
    pool.get_mut(marker).data.extend_from_slice(b"WikiGrab!");
    pool.get_mut(marker).offset = 1234;

    let mut capacities = vec![pool.capacity()];

    for _ in 0..200 {
        let handle = pool.acquire().unwrap();
        pool.get_mut(handle).data.push(0xAA);

        if capacities.last() != Some(&pool.capacity()) {
            capacities.push(pool.capacity());
        }
    }

    // Every growth event exactly doubled the capacity.
    for pair in capacities.windows(2) {
        assert_eq!(pair[1], pair[0] * 2);
    }

    assert_eq!(pool.growth_events(), capacities.len() - 1);
    assert_eq!(pool.get(marker).data, b"WikiGrab!");
    assert_eq!(pool.get(marker).offset, 1234);
    assert_eq!(pool.referee_of(marker), Some("marker"));
}

#[test]
fn sibling_references_inside_the_pool_survive_growth() {
    let mut pool = SlotPool::<Fragment>::builder().initial_capacity(2).build();

    let parent = pool.acquire().unwrap();
    pool.get_mut(parent).data.extend_from_slice(b"parent");

    let child = pool.acquire().unwrap();
    pool.get_mut(child).parent = Some(parent);

    for _ in 0..64 {
        _ = pool.acquire().unwrap();
    }

    let through_child = pool.get(child).parent.unwrap();
    assert_eq!(pool.get(through_child).data, b"parent");
}

#[test]
fn release_all_then_acquire_starts_at_zero() {
    let mut pool = SlotPool::<Fragment>::new();

    let handles: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(pool.used_count(), 10);

    assert_eq!(pool.release_all(), 10);
    assert_eq!(pool.used_count(), 0);

    for handle in handles {
        assert!(!pool.is_occupied(handle));
    }

    let next = pool.acquire().unwrap();
    assert_eq!(next.index(), 0);
    assert!(pool.get(next).data.is_empty());
}

#[test]
fn chained_pool_keeps_contract_without_relocating() {
    let mut pool = ChainedPool::<Fragment>::builder()
        .initial_capacity(3)
        .build_chained();

    let first = pool.acquire().unwrap();
    pool.get_mut(first).data.extend_from_slice(b"first");
    let address = std::ptr::from_ref(pool.get(first));

    let mut block_counts = Vec::new();
    for _ in 0..10 {
        _ = pool.acquire().unwrap();
        block_counts.push(pool.block_count());
    }

    // Each new block has the original capacity.
    assert_eq!(pool.capacity(), pool.block_count() * 3);
    assert_eq!(block_counts.last(), Some(&4));

    assert!(std::ptr::eq(address, pool.get(first)));
    assert_eq!(pool.get(first).data, b"first");

    assert_eq!(pool.release_all(), 11);
    assert_eq!(pool.acquire().unwrap().to_bits(), 0);
}
