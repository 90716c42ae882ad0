//! Wake-source strategies.
//!
//! Both strategies share the same outer protocol (see
//! [`TicklessController::suppress_ticks_and_sleep`](super::TicklessController::suppress_ticks_and_sleep));
//! they differ only in what hardware measures the sleep:
//!
//! | Strategy         | During sleep                     | Readback on wake          |
//! |------------------|----------------------------------|---------------------------|
//! | `DirectCounter`  | counter runs with a long `LOAD`  | `VAL` + `COUNTFLAG`       |
//! | `AuxiliaryTimer` | counter gated, GPT one-shot runs | GPT count + expiry flag   |
//!
//! The direct path is exact but limited to the 24-bit reload range and
//! needs the core clock alive.  The auxiliary path survives clock gating.

use crate::app::ports::TicklessHw;
use crate::config::TicklessConfig;

use super::snapshot::TimerSnapshot;
use super::wakeup::WakeupTimerState;

/// Which hardware readback measured a sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSourceKind {
    DirectCounter,
    AuxiliaryTimer,
}

/// What ended the sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// The programmed wake source expired (tick wrap or GPT expiry).
    Timer,
    /// Some other interrupt woke the core early.
    External,
}

/// Raw result of a readback, before the controller clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub elapsed_ticks: u32,
    /// `LOAD` value that finishes the partially elapsed tick.
    pub partial_reload: u32,
    pub cause: WakeCause,
}

/// One way of programming and measuring a sleep.
///
/// Called in this order, all with the tick interrupt masked:
/// `prepare` (counter already stopped) → `arm` → sleep → `reconcile`.
pub trait WakeSource {
    const KIND: WakeSourceKind;

    /// Longest idle period this source can measure.
    fn max_suppressible_ticks(&self, snapshot: &TimerSnapshot) -> u32;

    /// Latch whatever `arm` needs from the stopped counter.
    fn prepare<H: TicklessHw>(&mut self, hw: &H, snapshot: &TimerSnapshot, expected: u32);

    /// Program the hardware so the core wakes after `expected` ticks.
    fn arm<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        snapshot: &TimerSnapshot,
        wakeup: &mut WakeupTimerState<'_>,
        expected: u32,
    );

    /// Disarm, stop the counter and measure the sleep.
    fn reconcile<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        snapshot: &TimerSnapshot,
        wakeup: &mut WakeupTimerState<'_>,
        expected: u32,
    ) -> Reconciliation;
}

// ───────────────────────────────────────────────────────────────
// Direct counter readback
// ───────────────────────────────────────────────────────────────

/// Keeps the decrementing counter running across the sleep with `LOAD`
/// stretched over the whole idle period.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCounter {
    reload: u32,
}

impl DirectCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LOAD` value programmed for the sleep.
    pub fn reload(&self) -> u32 {
        self.reload
    }
}

impl WakeSource for DirectCounter {
    const KIND: WakeSourceKind = WakeSourceKind::DirectCounter;

    fn max_suppressible_ticks(&self, snapshot: &TimerSnapshot) -> u32 {
        snapshot.max_suppressible_ticks
    }

    fn prepare<H: TicklessHw>(&mut self, hw: &H, snapshot: &TimerSnapshot, expected: u32) {
        // What is left of the current tick plus expected - 1 whole ticks.
        let mut reload = hw
            .current_value()
            .saturating_add(snapshot.reload_value.saturating_mul(expected.saturating_sub(1)));
        if reload > snapshot.stopped_compensation {
            reload -= snapshot.stopped_compensation;
        }
        self.reload = reload;
    }

    fn arm<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        _snapshot: &TimerSnapshot,
        _wakeup: &mut WakeupTimerState<'_>,
        _expected: u32,
    ) {
        hw.set_reload(self.reload);
        hw.clear_current();
        hw.enable_counter();
    }

    fn reconcile<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        snapshot: &TimerSnapshot,
        _wakeup: &mut WakeupTimerState<'_>,
        expected: u32,
    ) -> Reconciliation {
        let counted = hw.take_count_flag();
        hw.disable_counter();
        let current = hw.current_value();
        let per_tick = snapshot.reload_value;

        if counted {
            // The counter wrapped: the tick interrupt is pending and will
            // account for one tick itself.  Finish the tick it started.
            let behind = self.reload.saturating_sub(current);
            let partial_reload = (per_tick - 1)
                .checked_sub(behind)
                .filter(|v| *v >= snapshot.stopped_compensation)
                .unwrap_or(per_tick - 1);
            Reconciliation {
                elapsed_ticks: expected.saturating_sub(1),
                partial_reload,
                cause: WakeCause::Timer,
            }
        } else {
            let completed =
                (u64::from(expected) * u64::from(per_tick)).saturating_sub(u64::from(current));
            let whole = completed / u64::from(per_tick);
            let partial = (whole + 1) * u64::from(per_tick) - completed;
            Reconciliation {
                elapsed_ticks: whole.min(u64::from(u32::MAX)) as u32,
                partial_reload: partial as u32,
                cause: WakeCause::External,
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Auxiliary timer readback
// ───────────────────────────────────────────────────────────────

/// Gates the decrementing counter and lets the GPT measure the sleep.
#[derive(Debug, Clone, Copy)]
pub struct AuxiliaryTimer {
    tick_rate_hz: u32,
    aux_timer_hz: u32,
    ms_per_tick: u32,
}

impl AuxiliaryTimer {
    pub fn new(config: &TicklessConfig) -> Self {
        Self {
            tick_rate_hz: config.tick_rate_hz,
            aux_timer_hz: config.aux_timer_hz,
            ms_per_tick: (1000 / config.tick_rate_hz).max(1),
        }
    }

    /// GPT counts in `ms` milliseconds.
    pub fn ms_to_counts(&self, ms: u32) -> u32 {
        (u64::from(ms) * u64::from(self.aux_timer_hz) / 1000).min(u64::from(u32::MAX)) as u32
    }
}

impl WakeSource for AuxiliaryTimer {
    const KIND: WakeSourceKind = WakeSourceKind::AuxiliaryTimer;

    fn max_suppressible_ticks(&self, _snapshot: &TimerSnapshot) -> u32 {
        let max_ms = u64::from(u32::MAX) * 1000 / u64::from(self.aux_timer_hz);
        (max_ms / u64::from(self.ms_per_tick)).min(u64::from(u32::MAX)) as u32
    }

    fn prepare<H: TicklessHw>(&mut self, _hw: &H, _snapshot: &TimerSnapshot, _expected: u32) {}

    fn arm<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        _snapshot: &TimerSnapshot,
        wakeup: &mut WakeupTimerState<'_>,
        expected: u32,
    ) {
        let duration_ms = expected.saturating_mul(self.ms_per_tick);
        wakeup.timeout.clear();
        wakeup.reload_count = self.ms_to_counts(duration_ms);
        wakeup.current_count = wakeup.reload_count;
        hw.start_one_shot_ms(wakeup.handle_index, duration_ms);
    }

    fn reconcile<H: TicklessHw>(
        &mut self,
        hw: &mut H,
        snapshot: &TimerSnapshot,
        wakeup: &mut WakeupTimerState<'_>,
        expected: u32,
    ) -> Reconciliation {
        wakeup.current_count = hw.read_current_count(wakeup.handle_index);
        hw.stop_timer(wakeup.handle_index);
        let per_tick = snapshot.reload_value;

        if wakeup.timeout.take() {
            return Reconciliation {
                elapsed_ticks: expected.saturating_sub(1),
                partial_reload: per_tick - 1,
                cause: WakeCause::Timer,
            };
        }

        // counts * tick_rate / aux_hz = whole ticks; the remainder is the
        // part of the current tick already gone.
        let scaled = u64::from(wakeup.elapsed_count()) * u64::from(self.tick_rate_hz);
        let whole = scaled / u64::from(self.aux_timer_hz);
        let fraction = scaled % u64::from(self.aux_timer_hz);
        let gone = (fraction * u64::from(per_tick) / u64::from(self.aux_timer_hz)) as u32;
        let partial_reload = (per_tick - 1)
            .checked_sub(gone)
            .filter(|v| *v >= snapshot.stopped_compensation)
            .unwrap_or(per_tick - 1);

        Reconciliation {
            elapsed_ticks: whole.min(u64::from(u32::MAX)) as u32,
            partial_reload,
            cause: WakeCause::External,
        }
    }
}
