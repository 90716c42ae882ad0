//! Low-power configuration parameters
//!
//! All tunable parameters for the tickless idle controller and the mesh
//! low-power schedule manager. Defaults describe an MT7687 running its
//! Cortex-M4 at 192 MHz with a 1 kHz RTOS tick and a 32 kHz GPT.
//! Values can be overridden from JSON (provisioning) or a postcard blob
//! (flash storage).

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest value the 24-bit SysTick reload register can hold.
pub const COUNTER_MAX: u32 = 0x00FF_FFFF;

/// Which hardware readback the controller uses to measure a sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeStrategyKind {
    /// Pick per idle period: auxiliary timer for long sleeps with no sleep
    /// lock held, direct counter otherwise.
    Auto,
    /// Keep the decrementing counter running and read it back on wake.
    DirectCounter,
    /// Gate the counter and measure the sleep with the auxiliary GPT.
    AuxiliaryTimer,
}

/// How the core actually goes to sleep once everything is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepMode {
    /// Plain `wfi`.
    Wfi,
    /// Vendor sleep-manager entry (deep sleep with clock gating).
    Legacy,
}

/// Tickless idle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicklessConfig {
    /// Clock feeding the decrementing counter (Hz).
    pub core_clock_hz: u32,
    /// RTOS tick rate (Hz).
    pub tick_rate_hz: u32,
    /// Counter counts lost while the counter is stopped and restarted.
    pub stopped_timer_compensation: u32,
    /// Auxiliary wake-up timer clock (Hz).
    pub aux_timer_hz: u32,
    /// Wake-source selection policy.
    pub wake_strategy: WakeStrategyKind,
    /// Under `Auto`, idle periods at least this long use the auxiliary timer.
    pub aux_timer_min_ticks: u32,
    /// Sleep instruction path.
    pub sleep_mode: SleepMode,
    /// Idle periods shorter than this are not worth sleeping for.
    pub expected_idle_before_sleep: u32,
}

impl Default for TicklessConfig {
    fn default() -> Self {
        Self {
            core_clock_hz: 192_000_000,
            tick_rate_hz: 1000,
            stopped_timer_compensation: 45,
            aux_timer_hz: 32_768,
            wake_strategy: WakeStrategyKind::Auto,
            aux_timer_min_ticks: 10,
            sleep_mode: SleepMode::Wfi,
            expected_idle_before_sleep: 2,
        }
    }
}

impl TicklessConfig {
    /// Counter counts in one RTOS tick.
    pub fn counts_per_tick(&self) -> u32 {
        self.core_clock_hz / self.tick_rate_hz
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 || self.core_clock_hz == 0 {
            return Err(Error::Config("clock and tick rate must be non-zero"));
        }
        if 1000 % self.tick_rate_hz != 0 {
            return Err(Error::Config("tick period is not a whole number of ms"));
        }
        let per_tick = self.counts_per_tick();
        if per_tick < 2 {
            return Err(Error::Config("core clock too slow for tick rate"));
        }
        if per_tick > COUNTER_MAX {
            return Err(Error::Config("one tick overflows the 24-bit counter"));
        }
        if self.stopped_timer_compensation >= per_tick {
            return Err(Error::Config("stopped-timer compensation exceeds one tick"));
        }
        if self.aux_timer_hz < self.tick_rate_hz {
            return Err(Error::Config("auxiliary timer slower than the tick"));
        }
        if self.expected_idle_before_sleep < 2 {
            return Err(Error::Config("expected idle before sleep must be at least 2"));
        }
        Ok(())
    }
}

/// Mesh low-power schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Number of slots in one schedule cycle.
    pub slot_count: u8,
    /// Length of one slot (ms).
    pub slot_interval_ms: u32,
    /// How long the radio stays up once a slot begins (ms).
    pub awake_window_ms: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            slot_count: 3,
            slot_interval_ms: 1000,
            awake_window_ms: 300,
        }
    }
}

impl MeshConfig {
    /// Length of one full schedule cycle (ms).
    pub fn cycle_ms(&self) -> u32 {
        u32::from(self.slot_count) * self.slot_interval_ms
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(Error::Config("slot count must be non-zero"));
        }
        if self.slot_interval_ms == 0 || self.awake_window_ms == 0 {
            return Err(Error::Config("slot interval and awake window must be non-zero"));
        }
        if self.awake_window_ms > self.slot_interval_ms {
            return Err(Error::Config("awake window longer than a slot"));
        }
        if self.slot_interval_ms.checked_mul(2 * u32::from(self.slot_count)).is_none() {
            return Err(Error::Config("schedule cycle overflows the ms clock"));
        }
        Ok(())
    }
}

/// Complete low-power configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LowPowerConfig {
    pub tickless: TicklessConfig,
    pub mesh: MeshConfig,
}

impl LowPowerConfig {
    pub fn validate(&self) -> Result<()> {
        self.tickless.validate()?;
        self.mesh.validate()
    }

    /// Parse and validate a JSON document (provisioning path).
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Compact blob for flash storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("serialisation failed"))
    }

    /// Decode and validate a blob written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cfg: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("corrupted blob"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
