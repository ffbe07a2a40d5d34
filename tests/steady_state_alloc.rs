// ==============================================
// HEAP ACTIVITY OF RECORD_EVENT (integration)
// ==============================================
//
// Counts heap blocks with dhat's testing profiler. Once every slot has been
// claimed, hits and evictions must reuse reserved storage. This file holds a
// single test because dhat allows one profiler per process.

use flowtop::tracker::{Directional, TopTracker};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const CACHE: usize = 64;

fn flow_key(i: usize) -> String {
    format!("flow-{:06}", i)
}

#[test]
fn warm_tracker_records_without_allocating() {
    let _profiler = dhat::Profiler::builder().testing().build();

    // Keys are built up front; only the tracker runs while blocks are counted.
    let keys: Vec<String> = (0..CACHE + 1000).map(flow_key).collect();
    assert!(keys.iter().all(|key| key.len() == keys[0].len()));

    let mut tracker: TopTracker = TopTracker::new(CACHE, 4);
    for (t, key) in keys[..CACHE].iter().enumerate() {
        tracker.record_event(key, t as u64, 1).unwrap();
    }
    assert!(tracker.is_full());

    let before = dhat::HeapStats::get();
    for (t, key) in keys[CACHE..].iter().enumerate() {
        tracker.record_event(key, (CACHE + t) as u64, t as u64).unwrap();
    }
    for (t, key) in keys[keys.len() - CACHE..].iter().enumerate() {
        tracker.record_event(key, 5_000 + t as u64, 3).unwrap();
    }
    let after = dhat::HeapStats::get();
    assert_eq!(
        after.total_blocks - before.total_blocks,
        0,
        "record_event allocated on a warm tracker"
    );
    assert_eq!(tracker.len(), CACHE);
    tracker.check_invariants().unwrap();

    let mut flows: TopTracker<Directional> = TopTracker::new(CACHE, 8);
    for (t, key) in keys[..CACHE].iter().enumerate() {
        flows
            .record_event(key, t as u64, Directional::forward_only(60))
            .unwrap();
    }
    let before = dhat::HeapStats::get();
    for (t, key) in keys[CACHE..].iter().enumerate() {
        flows
            .record_event(key, (CACHE + t) as u64, Directional::reverse_only(1500))
            .unwrap();
    }
    let after = dhat::HeapStats::get();
    assert_eq!(after.total_blocks - before.total_blocks, 0);
}
