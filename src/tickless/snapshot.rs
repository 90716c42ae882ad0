//! Counter constants derived once at init.

use crate::config::{COUNTER_MAX, TicklessConfig};

/// Decrementing-counter parameters for one clock configuration.
///
/// Computed from the core/tick clock ratio when the controller is
/// initialised and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Counter counts in one full tick.
    pub reload_value: u32,
    /// Counts lost while the counter is stopped, reprogrammed and restarted.
    pub stopped_compensation: u32,
    /// Longest idle period the 24-bit reload register can cover.
    pub max_suppressible_ticks: u32,
}

impl TimerSnapshot {
    pub fn new(config: &TicklessConfig) -> Self {
        let reload_value = config.counts_per_tick();
        Self {
            reload_value,
            stopped_compensation: config.stopped_timer_compensation,
            max_suppressible_ticks: COUNTER_MAX / reload_value,
        }
    }

    /// `LOAD` value for an ordinary one-tick period.
    pub const fn per_tick_reload(&self) -> u32 {
        self.reload_value - 1
    }
}
