#![no_main]

use flowtop::flow::decode_ipv4;
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes as an Ethernet frame: decoding must never panic, and a
// decoded flow must yield well-formed keys.
fuzz_target!(|data: &[u8]| {
    if let Ok(flow) = decode_ipv4(data) {
        let directed = flow.directed_key();
        assert!(directed.contains("->"));

        let (key, weight) = flow.canonical();
        assert!(key.contains("<->"));
        assert_eq!(weight.forward + weight.reverse, u64::from(flow.total_length));
        if let Some(vid) = flow.vlan {
            assert!(vid <= 0x0fff);
        }
    }
});
