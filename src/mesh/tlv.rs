//! Low-power TLVs exchanged with neighbours.
//!
//! Wire format: `type: u8, len: u8, value: [u8; len]`, little-endian
//! integers.  Unknown types are skipped so the two records can ride along
//! any mesh frame.
//!
//! | Type   | Name               | Value                            |
//! |--------|--------------------|----------------------------------|
//! | `0x1b` | `TYPE_TIME_SLOT`   | `slot_num: u8, offset_ms: u32`   |
//! | `0x1c` | `TYPE_BUFQUEUE_SIZE` | `size: u16`                    |

use heapless::Vec;

use crate::error::TlvError;

pub const TYPE_TIME_SLOT: u8 = 0x1b;
pub const TYPE_BUFQUEUE_SIZE: u8 = 0x1c;

const TIME_SLOT_LEN: u8 = 5;
const BUFQUEUE_SIZE_LEN: u8 = 2;

/// Room for one of each record.
pub const LOWPOWER_TLVS_LEN: usize = 2 + TIME_SLOT_LEN as usize + 2 + BUFQUEUE_SIZE_LEN as usize;

/// Sender's current slot and how far into it the sender was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub slot_num: u8,
    pub offset_ms: u32,
}

/// The low-power records found in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowpowerTlvs {
    pub time_slot: Option<TimeSlot>,
    pub bufqueue_size: Option<u16>,
}

impl LowpowerTlvs {
    /// Parse every record in `buf`.  Later duplicates win.
    pub fn parse(buf: &[u8]) -> Result<Self, TlvError> {
        let mut out = Self::default();
        let mut rest = buf;

        while !rest.is_empty() {
            let [tlv_type, len, tail @ ..] = rest else {
                return Err(TlvError::Truncated);
            };
            let len = *len;
            let value = tail.get(..len as usize).ok_or(TlvError::Truncated)?;

            match *tlv_type {
                TYPE_TIME_SLOT => {
                    let &[slot_num, o0, o1, o2, o3] = value else {
                        return Err(TlvError::BadLength { tlv_type: TYPE_TIME_SLOT, len });
                    };
                    out.time_slot = Some(TimeSlot {
                        slot_num,
                        offset_ms: u32::from_le_bytes([o0, o1, o2, o3]),
                    });
                }
                TYPE_BUFQUEUE_SIZE => {
                    let &[s0, s1] = value else {
                        return Err(TlvError::BadLength { tlv_type: TYPE_BUFQUEUE_SIZE, len });
                    };
                    out.bufqueue_size = Some(u16::from_le_bytes([s0, s1]));
                }
                _ => {}
            }

            rest = &tail[len as usize..];
        }

        Ok(out)
    }

    /// Append the present records to `out`.
    pub fn encode<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), TlvError> {
        if let Some(ts) = self.time_slot {
            let o = ts.offset_ms.to_le_bytes();
            push(out, &[TYPE_TIME_SLOT, TIME_SLOT_LEN, ts.slot_num, o[0], o[1], o[2], o[3]])?;
        }
        if let Some(size) = self.bufqueue_size {
            let s = size.to_le_bytes();
            push(out, &[TYPE_BUFQUEUE_SIZE, BUFQUEUE_SIZE_LEN, s[0], s[1]])?;
        }
        Ok(())
    }
}

fn push<const N: usize>(out: &mut Vec<u8, N>, record: &[u8]) -> Result<(), TlvError> {
    out.extend_from_slice(record).map_err(|()| TlvError::BufferFull)
}
