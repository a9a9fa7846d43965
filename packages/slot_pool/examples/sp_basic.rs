//! Basic usage of the `slot_pool` crate:
//!
//! * Creating a pool.
//! * Acquiring slots and filling them in place.
//! * Holding handles while the pool grows.
//! * Releasing slots one at a time and all at once.

use slot_pool::SlotPool;

fn main() {
    // A deliberately tiny pool, so that it has to grow.
    let mut pool = SlotPool::<String>::builder().initial_capacity(2).build();

    // Acquiring a slot gives you a handle that you later use to reach the record again.
    let title = pool.acquire_tracked("title").unwrap();
    pool.get_mut(title).push_str("Rust (programming language)");

    // Each of these may force the pool to double its storage and move it elsewhere in memory.
    let paragraphs = (0..10)
        .map(|index| {
            let handle = pool.acquire().unwrap();
            pool.get_mut(handle).push_str(&format!("Paragraph {index}"));
            handle
        })
        .collect::<Vec<_>>();

    println!(
        "Pool holds {} records in a capacity of {} after growing {} times",
        pool.used_count(),
        pool.capacity(),
        pool.growth_events()
    );

    // The handle acquired before all that growth still leads to the same record.
    println!(
        "Record held by '{}': {}",
        pool.referee_of(title).unwrap_or("nobody"),
        pool.get(title)
    );

    pool.release(paragraphs[0]);
    println!("After releasing one paragraph: {} records", pool.used_count());

    // The next record reuses the slot just released. Its old content was cleared.
    let reused = pool.acquire().unwrap();
    println!("Reused slot {} starts empty: {:?}", reused, pool.get(reused));

    // At the end of a phase, everything goes back to the pool in one sweep.
    let released = pool.release_all();
    println!("Released {released} records, {} remain", pool.used_count());
}
