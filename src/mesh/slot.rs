//! Per-node slot assignment.
//!
//! Every node derives its next wake slot from its own MAC and the slot it
//! is currently in, so neighbours can predict each other's schedule from
//! one time-slot TLV without further exchange.  Collisions between nodes
//! are possible and tolerated.

use hmac_sha256::Hash;

use super::neighbor::MacAddr;

/// Slot the node with `mac` uses in the cycle after `current_slot`.
///
/// Pure: the same inputs always give the same slot, and the result is
/// always in `1..=slot_count`.  A `slot_count` of zero is treated as one.
pub fn next_slot_num(mac: &MacAddr, current_slot: u8, slot_count: u8) -> u8 {
    let mut input = [0u8; 9];
    input[..8].copy_from_slice(mac.as_bytes());
    input[8] = current_slot;
    let digest = Hash::hash(&input);

    let word = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (word % u32::from(slot_count.max(1))) as u8 + 1
}
