//! Auxiliary wake-up timer bookkeeping shared with the GPT interrupt.
//!
//! ```text
//!  GPT expiry ISR ──signal()──▶ WakeupFlag ──take()──▶ suppress routine
//!     (producer)                 (AtomicBool)             (consumer)
//! ```
//!
//! One producer, one consumer, same core.  The flag is the only state the
//! interrupt touches; the counts are written and read by the suppress
//! routine alone.

use core::sync::atomic::{AtomicBool, Ordering};

/// Set by the wake-timer interrupt when the auxiliary timer expires.
///
/// Lives in a `static` on target so the ISR can reach it:
///
/// ```
/// use lowpower::tickless::WakeupFlag;
///
/// static TICKLESS_WAKEUP: WakeupFlag = WakeupFlag::new();
///
/// // GPT callback
/// TICKLESS_WAKEUP.signal();
/// assert!(TICKLESS_WAKEUP.take());
/// assert!(!TICKLESS_WAKEUP.take());
/// ```
#[derive(Debug, Default)]
pub struct WakeupFlag {
    fired: AtomicBool,
}

impl WakeupFlag {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Interrupt side: the dedicated wake timer ended the sleep.
    pub fn signal(&self) {
        self.fired.store(true, Ordering::Release);
    }

    /// Consumer side: read and clear.
    pub fn take(&self) -> bool {
        self.fired.swap(false, Ordering::AcqRel)
    }

    /// Drop a stale expiry before re-arming.
    pub fn clear(&self) {
        self.fired.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// State of the auxiliary wake timer across one sleep.
#[derive(Debug)]
pub struct WakeupTimerState<'a> {
    /// Sleep-manager handle acquired at init; never released.
    pub handle_index: u8,
    /// Expiry signal written by the GPT interrupt.
    pub timeout: &'a WakeupFlag,
    /// Counts the timer was armed with.
    pub reload_count: u32,
    /// Counts left when the sleep ended.
    pub current_count: u32,
}

impl<'a> WakeupTimerState<'a> {
    pub fn new(handle_index: u8, timeout: &'a WakeupFlag) -> Self {
        Self {
            handle_index,
            timeout,
            reload_count: 0,
            current_count: 0,
        }
    }

    /// Counts consumed between arming and wake.
    pub fn elapsed_count(&self) -> u32 {
        self.reload_count.saturating_sub(self.current_count)
    }
}
