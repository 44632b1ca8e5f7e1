#![no_main]

use libfuzzer_sys::fuzz_target;

// Links and session ids are taken from URL paths and request bodies.
fuzz_target!(|input: &str| {
    if let Ok(link) = reval_types::VerificationLink::parse(input) {
        assert_eq!(link.as_str(), input);
        assert!(link
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }
    if let Ok(id) = reval_proof::SessionId::parse(input) {
        assert_eq!(id.as_str(), input);
    }
});
