#![no_main]

use flowtop::tracker::TopTracker;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary operation sequences on TopTracker
//
// The first two bytes pick the capacities; every following triple is one
// operation: record, top_n, all_entries, get or clear.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let cache = usize::from(data[0] % 16) + 1;
    let top = usize::from(data[1] % 8) + 1;
    let mut tracker: TopTracker<u64> = TopTracker::new(cache, top);

    let mut idx = 2;
    let mut clock = 0u64;
    while idx + 2 < data.len() {
        let op = data[idx] % 8;
        let key = [b'k', data[idx + 1] % 32];
        let weight = u64::from(data[idx + 2]);

        match op {
            0..=3 => {
                // record_event; timestamps may step backwards
                clock = clock.wrapping_add(u64::from(op)).saturating_sub(1);
                let old_len = tracker.len();
                let existed = tracker.contains(key);
                let old_count = tracker.get(key).map(|e| e.count);

                tracker.record_event(key, clock, weight).unwrap();

                let entry = tracker.get(key).unwrap();
                match old_count {
                    Some(count) => {
                        assert_eq!(entry.count, count + weight);
                        assert_eq!(tracker.len(), old_len);
                    },
                    None => {
                        assert!(!existed);
                        assert_eq!(entry.count, weight);
                        assert_eq!(tracker.len(), (old_len + 1).min(cache));
                    },
                }
                let all = tracker.all_entries();
                assert_eq!(all.last().map(|e| e.key), Some(&key[..]));
            },
            4 => {
                // top_n
                let leaders = tracker.top_n();
                assert!(leaders.len() <= top);
                assert!(leaders.len() <= tracker.len());
                for entry in &leaders {
                    assert!(tracker.contains(entry.key));
                }
            },
            5 => {
                // all_entries
                let all = tracker.all_entries();
                assert_eq!(all.len(), tracker.len());
                assert!(all.len() <= cache);
            },
            6 => {
                // empty key
                assert!(tracker.record_event(b"", clock, weight).is_err());
            },
            7 => {
                // clear
                if weight % 16 == 0 {
                    tracker.clear();
                    assert!(tracker.is_empty());
                    assert!(tracker.top_n().is_empty());
                }
            },
            _ => unreachable!(),
        }

        tracker.check_invariants().unwrap();
        idx += 3;
    }
});
