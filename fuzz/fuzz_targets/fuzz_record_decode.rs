#![no_main]

use libfuzzer_sys::fuzz_target;
use reval_types::VerificationRecord;

// Stored records are bincode; a corrupt value must decode to an error.
fuzz_target!(|data: &[u8]| {
    if let Ok(record) = bincode::deserialize::<VerificationRecord>(data) {
        // Link validation runs on decode too.
        assert!(reval_types::VerificationLink::parse(record.verification_link.as_str()).is_ok());

        let encoded = bincode::serialize(&record).unwrap();
        let decoded: VerificationRecord = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
});
