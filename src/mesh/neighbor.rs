//! Neighbor view the schedule manager needs from the mesh stack.

use core::fmt;

/// 64-bit extended MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 8]);

impl MacAddr {
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A child or parent entry in the neighbor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub mac: MacAddr,
    /// Keeps its receiver on while idle (never sleeps).
    pub rx_on_when_idle: bool,
    /// Buffered frames for this child are held until its next wake.
    pub expects_wakeup: bool,
}

impl Neighbor {
    pub const fn new(mac: MacAddr, rx_on_when_idle: bool) -> Self {
        Self {
            mac,
            rx_on_when_idle,
            expects_wakeup: !rx_on_when_idle,
        }
    }
}
