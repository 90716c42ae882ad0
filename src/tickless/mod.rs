//! Tickless idle controller.
//!
//! Called from the RTOS idle hook with the number of ticks the kernel
//! expects to stay idle.  Suppresses the periodic tick for that long,
//! sleeps, and on wake fast-forwards the kernel tick count by exactly the
//! number of whole ticks that went by.
//!
//! ```text
//!   Idle ──arm──▶ TimerArmed ──wfi──▶ Sleeping ──wake──▶ Reconciling ──step_tick──▶ Idle
//!     ▲               │
//!     └───── abort ───┘   (kernel reported a pending switch)
//! ```
//!
//! The decision window is guarded by masking only the tick interrupt, so
//! every other wake source can still fire while the core sleeps.

pub mod snapshot;
pub mod strategy;
pub mod wakeup;

use log::info;

use crate::app::ports::{SleepModeStatus, TicklessHw, TickCounterPort, SleepLockPort};
use crate::config::{SleepMode, TicklessConfig, WakeStrategyKind};
use crate::error::{Error, Result};

pub use snapshot::TimerSnapshot;
pub use strategy::{AuxiliaryTimer, DirectCounter, WakeCause, WakeSource, WakeSourceKind};
pub use wakeup::{WakeupFlag, WakeupTimerState};

/// Name under which the controller registers with the sleep manager.
pub const SLEEP_HANDLE_NAME: &str = "tickless";

// ---------------------------------------------------------------------------
// Per-call request
// ---------------------------------------------------------------------------

/// One idle period as seen by the sleep hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    /// Upper bound provided by the kernel (after clamping to the hardware).
    pub requested_idle_ticks: u32,
    /// A pre-sleep hook sets this to zero when it already slept.
    pub modifiable_idle_ticks: u32,
}

impl SleepRequest {
    pub fn new(requested_idle_ticks: u32) -> Self {
        Self {
            requested_idle_ticks,
            modifiable_idle_ticks: requested_idle_ticks,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Where the controller is within one suppress call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicklessState {
    Idle,
    TimerArmed,
    Sleeping,
    Reconciling,
}

/// Details of a completed sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepReport {
    pub source: WakeSourceKind,
    /// Idle ticks after clamping to the source's hardware bound.
    pub requested_ticks: u32,
    /// Value handed to `step_tick`.
    pub stepped_ticks: u32,
    pub wake: WakeCause,
    /// The measured sleep exceeded the request and was cut back.
    pub clamped: bool,
    /// `false` when a pre-sleep hook zeroed the idle time.
    pub slept: bool,
}

/// Result of one call to [`TicklessController::suppress_ticks_and_sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Too short to be worth it; hardware untouched.
    Skipped,
    /// The kernel had work pending; the counter was restarted.
    Aborted,
    Slept(SleepReport),
}

/// Counters exposed for telemetry.  `clamps` is the drift signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicklessStats {
    pub sleeps: u32,
    pub aborts: u32,
    pub skipped: u32,
    pub clamps: u32,
    pub timer_wakes: u32,
    pub external_wakes: u32,
    pub stepped_ticks: u64,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the decrementing counter and the auxiliary wake timer across
/// sleep decisions.
pub struct TicklessController<'a> {
    snapshot: TimerSnapshot,
    wakeup: WakeupTimerState<'a>,
    aux: AuxiliaryTimer,
    strategy: WakeStrategyKind,
    aux_min_ticks: u32,
    sleep_mode: SleepMode,
    expected_idle_before_sleep: u32,
    state: TicklessState,
    stats: TicklessStats,
}

impl<'a> TicklessController<'a> {
    /// Validate `config`, acquire the `"tickless"` sleep handle and start
    /// the counter with its per-tick reload.
    ///
    /// `timeout` must be the flag the GPT expiry interrupt signals.
    pub fn init(
        config: &TicklessConfig,
        timeout: &'a WakeupFlag,
        hw: &mut (impl TickCounterPort + SleepLockPort),
    ) -> Result<Self> {
        config.validate()?;
        let handle = hw
            .acquire_handle(SLEEP_HANDLE_NAME)
            .ok_or(Error::Init("sleep handle pool exhausted"))?;
        let snapshot = TimerSnapshot::new(config);

        hw.disable_counter();
        hw.set_reload(snapshot.per_tick_reload());
        hw.clear_current();
        hw.enable_counter();

        info!(
            "Tickless: {} counts/tick, max {} ticks on counter, handle {}",
            snapshot.reload_value, snapshot.max_suppressible_ticks, handle
        );

        Ok(Self {
            snapshot,
            wakeup: WakeupTimerState::new(handle, timeout),
            aux: AuxiliaryTimer::new(config),
            strategy: config.wake_strategy,
            aux_min_ticks: config.aux_timer_min_ticks,
            sleep_mode: config.sleep_mode,
            expected_idle_before_sleep: config.expected_idle_before_sleep,
            state: TicklessState::Idle,
            stats: TicklessStats::default(),
        })
    }

    /// Sleep for up to `expected_idle_ticks` and step the kernel tick count
    /// by the whole ticks that actually elapsed.
    ///
    /// Never fails: a pending context switch aborts, an overrun is clamped
    /// to `expected - 1`.
    pub fn suppress_ticks_and_sleep<H: TicklessHw>(
        &mut self,
        expected_idle_ticks: u32,
        hw: &mut H,
    ) -> SleepOutcome {
        if expected_idle_ticks < self.expected_idle_before_sleep {
            self.stats.skipped = self.stats.skipped.wrapping_add(1);
            return SleepOutcome::Skipped;
        }

        match self.select_source(expected_idle_ticks, hw) {
            WakeSourceKind::DirectCounter => {
                self.sleep_with(&mut DirectCounter::new(), expected_idle_ticks, hw)
            }
            WakeSourceKind::AuxiliaryTimer => {
                let mut aux = self.aux;
                self.sleep_with(&mut aux, expected_idle_ticks, hw)
            }
        }
    }

    /// GPT expiry callback body.  Safe from interrupt context.
    pub fn on_wakeup_timer_expired(&self) {
        self.wakeup.timeout.signal();
    }

    pub fn snapshot(&self) -> &TimerSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> TicklessState {
        self.state
    }

    pub fn stats(&self) -> TicklessStats {
        self.stats
    }

    pub fn wakeup_state(&self) -> &WakeupTimerState<'a> {
        &self.wakeup
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn select_source<H: TicklessHw>(&self, expected: u32, hw: &H) -> WakeSourceKind {
        match self.strategy {
            WakeStrategyKind::DirectCounter => WakeSourceKind::DirectCounter,
            WakeStrategyKind::AuxiliaryTimer => WakeSourceKind::AuxiliaryTimer,
            WakeStrategyKind::Auto => {
                if expected >= self.aux_min_ticks && !hw.is_sleep_locked() {
                    WakeSourceKind::AuxiliaryTimer
                } else {
                    WakeSourceKind::DirectCounter
                }
            }
        }
    }

    fn sleep_with<S: WakeSource, H: TicklessHw>(
        &mut self,
        source: &mut S,
        expected_idle_ticks: u32,
        hw: &mut H,
    ) -> SleepOutcome {
        let snapshot = self.snapshot;
        let expected = expected_idle_ticks.min(source.max_suppressible_ticks(&snapshot));

        // 1. Stop the counter and work out the long reload.
        hw.disable_counter();
        source.prepare(hw, &snapshot, expected);

        // 2. Freeze scheduling decisions without silencing wake sources.
        hw.mask_tick_interrupt();

        // 3. Something became ready since the idle task decided to sleep.
        if hw.confirm_sleep_mode_status() == SleepModeStatus::Abort {
            // Finish the current tick from whatever is left of it.
            let remaining = hw.current_value();
            hw.set_reload(remaining);
            hw.clear_current();
            hw.enable_counter();
            hw.set_reload(snapshot.per_tick_reload());
            hw.unmask_tick_interrupt();

            self.stats.aborts = self.stats.aborts.wrapping_add(1);
            #[cfg(feature = "tickless-debug")]
            log::debug!(
                "Tickless: abort (pending switch), remaining={} aborts={}",
                remaining,
                self.stats.aborts
            );
            return SleepOutcome::Aborted;
        }

        // 4. Arm, run the hooks around the sleep instruction.
        source.arm(hw, &snapshot, &mut self.wakeup, expected);
        self.state = TicklessState::TimerArmed;

        let mut request = SleepRequest::new(expected);
        hw.pre_sleep(&mut request);
        let slept = request.modifiable_idle_ticks > 0;
        if slept {
            self.state = TicklessState::Sleeping;
            hw.feed_watchdog();
            if self.sleep_mode == SleepMode::Legacy && !hw.is_sleep_locked() {
                hw.legacy_sleep();
            } else {
                hw.wait_for_interrupt();
            }
            hw.feed_watchdog();
        }
        hw.post_sleep(&request);

        // 5. Disarm and measure.
        self.state = TicklessState::Reconciling;
        let measured = source.reconcile(hw, &snapshot, &mut self.wakeup, expected);

        let limit = expected.saturating_sub(1);
        let clamped = measured.elapsed_ticks > limit;
        let (stepped, partial_reload) = if clamped {
            (limit, snapshot.per_tick_reload())
        } else {
            (measured.elapsed_ticks, measured.partial_reload)
        };

        // 6. Restart the counter on the partial tick, then resume normal ticks.
        hw.set_reload(partial_reload);
        hw.clear_current();
        hw.enable_counter();
        hw.step_tick(stepped);
        hw.set_reload(snapshot.per_tick_reload());
        hw.unmask_tick_interrupt();
        self.state = TicklessState::Idle;

        self.record(measured.cause, stepped, clamped);
        #[cfg(feature = "tickless-debug")]
        log::debug!(
            "Tickless: {:?} slept={} expected={} measured={} stepped={} cause={:?} clamps={}",
            S::KIND,
            slept,
            expected,
            measured.elapsed_ticks,
            stepped,
            measured.cause,
            self.stats.clamps
        );

        SleepOutcome::Slept(SleepReport {
            source: S::KIND,
            requested_ticks: expected,
            stepped_ticks: stepped,
            wake: measured.cause,
            clamped,
            slept,
        })
    }

    fn record(&mut self, cause: WakeCause, stepped: u32, clamped: bool) {
        let s = &mut self.stats;
        s.sleeps = s.sleeps.wrapping_add(1);
        s.stepped_ticks = s.stepped_ticks.wrapping_add(u64::from(stepped));
        match cause {
            WakeCause::Timer => s.timer_wakes = s.timer_wakes.wrapping_add(1),
            WakeCause::External => s.external_wakes = s.external_wakes.wrapping_add(1),
        }
        if clamped {
            s.clamps = s.clamps.wrapping_add(1);
        }
    }
}
