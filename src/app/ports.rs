//! Port traits: the boundary between the low-power core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TicklessController / LowpowerManager
//! ```
//!
//! The RTOS kernel, the SysTick-style counter, the auxiliary GPT, the
//! radio and the mesh neighbor table all implement these traits.  The
//! core consumes them via generics, so it never touches a register
//! directly and runs unmodified against the mock adapters on the host.
//!
//! ## Ownership notes
//!
//! - **TickCounterPort** is owned exclusively by the tickless controller
//!   while a sleep decision is in flight.  Nothing else may write
//!   `LOAD`/`VAL`/`CTRL` during that window.
//! - **MeshTimerPort** handles belong to the schedule manager; it is the
//!   only caller of `start`/`stop` for the four low-power timers.

use crate::app::events::MeshEvent;
use crate::mesh::neighbor::Neighbor;
use crate::mesh::schedule::{MeshTimer, TimerHandle};
use crate::tickless::SleepRequest;

// ───────────────────────────────────────────────────────────────
// RTOS kernel port
// ───────────────────────────────────────────────────────────────

/// Answer of the kernel when asked whether entering sleep is still safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepModeStatus {
    /// Nothing became ready; go ahead and sleep.
    Proceed,
    /// A context switch is pending or the scheduler is suspended.
    Abort,
}

/// The scheduler hooks the tickless controller needs.
pub trait RtosPort {
    /// Must be called with the tick interrupt masked.
    fn confirm_sleep_mode_status(&mut self) -> SleepModeStatus;

    /// Fast-forward the kernel tick count.  Called inside a critical section.
    fn step_tick(&mut self, whole_ticks: u32);
}

// ───────────────────────────────────────────────────────────────
// Decrementing counter port (SysTick-equivalent)
// ───────────────────────────────────────────────────────────────

/// Register-level access to the tick-generating down counter.
pub trait TickCounterPort {
    /// Clear `CTRL.ENABLE`.
    fn disable_counter(&mut self);

    /// Set `CTRL.ENABLE`.
    fn enable_counter(&mut self);

    /// Read `VAL`.
    fn current_value(&self) -> u32;

    /// Write `VAL`: zeroes it so the next clock loads `LOAD`.
    fn clear_current(&mut self);

    /// Write `LOAD`.
    fn set_reload(&mut self, value: u32);

    /// Read `CTRL.COUNTFLAG`.  The hardware clears it on read.
    fn take_count_flag(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Auxiliary wake-up timer port (GPT)
// ───────────────────────────────────────────────────────────────

/// One-shot down-counting timer that keeps running while the core clock
/// is gated.  Its expiry interrupt must signal the controller's
/// [`WakeupFlag`](crate::tickless::WakeupFlag).
pub trait WakeupTimerPort {
    /// Arm the timer for `duration_ms`.  Re-arming supersedes any pending
    /// expiry.
    fn start_one_shot_ms(&mut self, handle: u8, duration_ms: u32);

    /// Disarm the timer.  Harmless if it already expired.
    fn stop_timer(&mut self, handle: u8);

    /// Remaining counts before expiry (counts down from the reload value).
    fn read_current_count(&self, handle: u8) -> u32;
}

// ───────────────────────────────────────────────────────────────
// CPU port
// ───────────────────────────────────────────────────────────────

/// Interrupt masking and the sleep instruction itself.
pub trait CpuPort {
    /// Mask only the tick interrupt path (other wake sources stay live).
    fn mask_tick_interrupt(&mut self);

    fn unmask_tick_interrupt(&mut self);

    /// `dsb; wfi; isb`.  Returns once any enabled interrupt fires.
    fn wait_for_interrupt(&mut self);

    /// Vendor sleep-manager entry.  Defaults to `wfi`.
    fn legacy_sleep(&mut self) {
        self.wait_for_interrupt();
    }
}

// ───────────────────────────────────────────────────────────────
// Sleep hooks
// ───────────────────────────────────────────────────────────────

/// Board-specific work around the sleep instruction.  All methods default
/// to no-ops.
pub trait SleepHooks {
    /// Radio ownership handoff, switch to crystal, PLL teardown.  May set
    /// `request.modifiable_idle_ticks` to zero to skip the sleep
    /// instruction.
    fn pre_sleep(&mut self, request: &mut SleepRequest) {
        let _ = request;
    }

    /// Undo [`pre_sleep`](Self::pre_sleep).
    fn post_sleep(&mut self, request: &SleepRequest) {
        let _ = request;
    }

    /// Called immediately before and after the sleep instruction.
    fn feed_watchdog(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Sleep lock manager
// ───────────────────────────────────────────────────────────────

/// Shared registry of named sleep handles.
pub trait SleepLockPort {
    /// Acquire a named handle.  `None` when the pool is exhausted.
    fn acquire_handle(&mut self, name: &'static str) -> Option<u8>;

    /// Whether any driver currently forbids deep sleep.
    fn is_sleep_locked(&self) -> bool;
}

/// Everything the tickless controller touches.
pub trait TicklessHw:
    RtosPort + TickCounterPort + WakeupTimerPort + CpuPort + SleepHooks + SleepLockPort
{
}

impl<T> TicklessHw for T where
    T: RtosPort + TickCounterPort + WakeupTimerPort + CpuPort + SleepHooks + SleepLockPort
{
}

// ───────────────────────────────────────────────────────────────
// Mesh ports
// ───────────────────────────────────────────────────────────────

/// Millisecond clock shared with the mesh stack (wraps at `u32::MAX`).
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

/// Software timers of the mesh stack.  Expiries are delivered back to the
/// manager through [`LowpowerManager::on_timer_fired`](crate::mesh::LowpowerManager::on_timer_fired).
pub trait MeshTimerPort {
    /// Arm `timer` to fire once after `duration_ms`.  `None` if no timer
    /// could be allocated.
    fn start(&mut self, timer: MeshTimer, duration_ms: u32) -> Option<TimerHandle>;

    fn stop(&mut self, handle: TimerHandle);
}

/// Radio power control (connsys on/off).
pub trait RadioPort {
    fn set_radio_power(&mut self, on: bool);
}

/// Neighbor table of the mesh stack.
pub trait NeighborPort {
    /// Visit every attached child.
    fn for_each_child(&mut self, f: &mut dyn FnMut(&mut Neighbor));
}

/// Everything the schedule manager touches, apart from the event bus.
pub trait MeshPlatform: ClockPort + MeshTimerPort + RadioPort + NeighborPort {}

impl<T> MeshPlatform for T where T: ClockPort + MeshTimerPort + RadioPort + NeighborPort {}

// ───────────────────────────────────────────────────────────────
// Event bus port
// ───────────────────────────────────────────────────────────────

/// The manager posts radio-window events here.  Adapters decide where
/// they go (mesh event bus, serial log, ...).
pub trait MeshEventSink {
    fn post(&mut self, event: MeshEvent);
}
