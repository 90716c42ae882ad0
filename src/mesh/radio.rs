//! Radio power bookkeeping and transition callbacks.

use heapless::Vec;

use crate::app::events::RadioTransition;
use crate::error::{Error, Result};

use super::schedule::ScheduleKind;

/// Listeners notified on every radio up/down transition.
pub type RadioCallback = fn(RadioTransition, ScheduleKind);

/// Maximum number of registered radio callbacks.
pub const MAX_RADIO_CALLBACKS: usize = 4;

/// Radio on/off state and the sleep time accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioPowerState {
    pub up: bool,
    /// Mesh-clock ms when the radio last went down.
    pub sleep_start_timestamp: u32,
    /// Total ms spent with the radio down, updated on each wake.
    pub sleep_time: u32,
}

impl RadioPowerState {
    /// The radio starts powered.
    pub const fn new() -> Self {
        Self {
            up: true,
            sleep_start_timestamp: 0,
            sleep_time: 0,
        }
    }

    /// Returns `true` when this call powered the radio down.
    pub fn sleep(&mut self, now_ms: u32) -> bool {
        if !self.up {
            return false;
        }
        self.up = false;
        self.sleep_start_timestamp = now_ms;
        true
    }

    /// Returns `true` when this call powered the radio up.
    pub fn wakeup(&mut self, now_ms: u32) -> bool {
        if self.up {
            return false;
        }
        self.up = true;
        self.sleep_time = self
            .sleep_time
            .wrapping_add(now_ms.wrapping_sub(self.sleep_start_timestamp));
        true
    }
}

impl Default for RadioPowerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity list of [`RadioCallback`]s.
#[derive(Debug, Default)]
pub struct RadioCallbacks {
    list: Vec<RadioCallback, MAX_RADIO_CALLBACKS>,
}

impl RadioCallbacks {
    pub const fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn register(&mut self, cb: RadioCallback) -> Result<()> {
        self.list
            .push(cb)
            .map_err(|_| Error::CapacityExceeded("radio callbacks"))
    }

    pub fn notify(&self, transition: RadioTransition, kind: ScheduleKind) {
        for cb in &self.list {
            cb(transition, kind);
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
