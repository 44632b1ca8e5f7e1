#![no_main]

use libfuzzer_sys::fuzz_target;

// Webhook bodies come straight off the network; parsing must never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(Some(event)) = reval_chat::parse_update(data) {
        // A parsed event always names both the group and the member.
        assert!(!event.group_id.as_str().is_empty());
        assert!(!event.member_id.as_str().is_empty());
    }
});
