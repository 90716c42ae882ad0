//! Fuzz target: `LowpowerTlvs::parse`
//!
//! Feeds arbitrary frames to the low-power TLV parser and checks:
//! - No panics under any byte sequence
//! - Whatever parses re-encodes into a frame that parses to the same records
//!
//! cargo fuzz run fuzz_lowpower_tlv

#![no_main]

use libfuzzer_sys::fuzz_target;
use lowpower::mesh::tlv::{LOWPOWER_TLVS_LEN, LowpowerTlvs};

fuzz_target!(|data: &[u8]| {
    let Ok(tlvs) = LowpowerTlvs::parse(data) else {
        return;
    };

    let mut out: heapless::Vec<u8, LOWPOWER_TLVS_LEN> = heapless::Vec::new();
    tlvs.encode(&mut out).expect("one of each record always fits");
    assert_eq!(LowpowerTlvs::parse(&out), Ok(tlvs));
});
