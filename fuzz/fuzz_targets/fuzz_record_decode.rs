//! Fuzz target: persisted record decoder
//!
//! Feeds arbitrary bytes to the record decoder and verifies:
//! - No panics under arbitrary input
//! - A rejected record leaves the load target untouched
//! - An accepted record re-encodes to exactly the input bytes
//!
//! cargo fuzz run fuzz_record_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpguard::modes::ModeKind;
use pumpguard::persist::PersistedRecord;

fuzz_target!(|data: &[u8]| {
    let sentinel = PersistedRecord {
        mode: ModeKind::Twist,
        countdown_minutes: 0xBEEF,
        ..PersistedRecord::default()
    };
    let mut target = sentinel;

    match PersistedRecord::load_into(data, &mut target) {
        Ok(()) => {
            let encoded = target.encode();
            // Any non-zero motor byte decodes as `true`.
            if data[1] <= 1 && target.slot0.to_bytes() == data[8..14] {
                assert_eq!(&encoded[..], data);
            }
        }
        Err(_) => assert_eq!(target, sentinel, "target modified on rejection"),
    }
});
