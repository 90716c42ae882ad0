//! Unified error types for the low-power core.
//!
//! Only setup and parsing surfaces are fallible: configuration validation,
//! controller initialisation, TLV decode/encode and callback registration.
//! The sleep and schedule paths themselves never return errors; aborts and
//! clamps are ordinary control flow there.
//!
//! All variants are `Copy` so they can be returned from interrupt-adjacent
//! code without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid.
    Config(&'static str),
    /// Hardware or handle initialisation failed.
    Init(&'static str),
    /// An inbound or outbound TLV record was malformed.
    Tlv(TlvError),
    /// A fixed-capacity table is full.
    CapacityExceeded(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Tlv(e) => write!(f, "tlv: {e}"),
            Self::CapacityExceeded(what) => write!(f, "capacity exceeded: {what}"),
        }
    }
}

// ---------------------------------------------------------------------------
// TLV errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvError {
    /// The buffer ended inside a record header or value.
    Truncated,
    /// A known record type carried an unexpected value length.
    BadLength { tlv_type: u8, len: u8 },
    /// A time-slot record named a slot outside `1..=slot_count`.
    InvalidSlot(u8),
    /// A time-slot offset no parent could be late by (two cycles or more).
    InvalidOffset(u32),
    /// The output buffer cannot hold another record.
    BufferFull,
}

impl fmt::Display for TlvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "record truncated"),
            Self::BadLength { tlv_type, len } => {
                write!(f, "type 0x{tlv_type:02x} has bad length {len}")
            }
            Self::InvalidSlot(slot) => write!(f, "slot {slot} out of range"),
            Self::InvalidOffset(ms) => write!(f, "slot offset {ms} ms out of range"),
            Self::BufferFull => write!(f, "output buffer full"),
        }
    }
}

impl From<TlvError> for Error {
    fn from(e: TlvError) -> Self {
        Self::Tlv(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
