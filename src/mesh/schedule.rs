//! Schedule bookkeeping for the own and the parent wake cycle.
//!
//! ```text
//!              wakeup timer                sleep timer
//!   ScheduledSleep ─────────▶ Awake ─────────────────▶ ScheduledSleep
//!         ▲                                                  │
//!         └──────────── update_schedule_timer() ◀────────────┘
//! ```
//!
//! Slots are numbered `1..=slot_count`; a cycle is `slot_count` slots of
//! `slot_interval_ms`.  `timestamp` is the start of the slot the schedule
//! is in (or last was in).

use log::debug;

use crate::config::MeshConfig;

use super::neighbor::MacAddr;
use super::slot::next_slot_num;

/// Which wake cycle a timer or transition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Own cycle while no parent is known yet.
    Attaching,
    /// Own cycle once attached.
    Attached,
    /// The parent's cycle, followed so its broadcasts are heard.
    Parent,
}

impl ScheduleKind {
    pub const fn is_parent(self) -> bool {
        matches!(self, Self::Parent)
    }
}

/// The four software timers owned by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshTimer {
    MyWakeup,
    MySleep,
    ParentWakeup,
    ParentSleep,
}

impl MeshTimer {
    pub const fn wakeup(parent: bool) -> Self {
        if parent { Self::ParentWakeup } else { Self::MyWakeup }
    }

    pub const fn sleep(parent: bool) -> Self {
        if parent { Self::ParentSleep } else { Self::MySleep }
    }

    pub const fn is_parent(self) -> bool {
        matches!(self, Self::ParentWakeup | Self::ParentSleep)
    }

    pub const fn is_wakeup(self) -> bool {
        matches!(self, Self::MyWakeup | Self::ParentWakeup)
    }
}

/// Opaque handle returned by the platform timer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u32);

/// Position within a schedule's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePhase {
    ScheduledSleep,
    Awake,
}

/// Outcome of [`ScheduleSlot::plan_next_wake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePlan {
    /// Arm the wakeup timer for this many ms.
    Arm(u32),
    /// The slot already started this many ms ago; wake now.
    Late(u32),
}

/// Current and next slot of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub slot_num: u8,
    pub next_slot_num: u8,
    /// Start of `slot_num` in mesh-clock ms.
    pub timestamp: u32,
}

impl ScheduleSlot {
    pub const fn new() -> Self {
        Self {
            slot_num: 0,
            next_slot_num: 0,
            timestamp: 0,
        }
    }

    /// Work out when `next_slot_num` starts, as seen from `now_ms`.
    ///
    /// `offset_ms` is how far into `slot_num` its owner already was at
    /// `timestamp`; it is folded into `timestamp`.  A slot that already
    /// began is reported as [`WakePlan::Late`] relative to the most recent
    /// slot start.  Older slots are skipped, at most `slot_count` of them,
    /// advancing the slot numbers the way the owner does.
    pub fn plan_next_wake(
        &mut self,
        owner: &MacAddr,
        offset_ms: u32,
        now_ms: u32,
        config: &MeshConfig,
    ) -> WakePlan {
        self.timestamp = self.timestamp.wrapping_sub(offset_ms);
        let elapsed = i64::from(now_ms.wrapping_sub(self.timestamp));
        let due = self.gap_ms(config) - elapsed;
        if due >= 0 {
            return WakePlan::Arm(due as u32);
        }

        // `late`: ms since `next_slot_num` began.
        let mut late = -due;
        for _ in 0..config.slot_count {
            let mut ahead = *self;
            ahead.timestamp = ahead.timestamp.wrapping_add(self.gap_ms(config) as u32);
            ahead.advance(owner, config.slot_count);
            let following = ahead.gap_ms(config);
            if late < following {
                return WakePlan::Late(late as u32);
            }
            debug!(
                "Mesh: slot {} missed by {} ms, skipping",
                self.next_slot_num, late
            );
            *self = ahead;
            late -= following;
        }
        WakePlan::Late((late % i64::from(config.slot_interval_ms.max(1))) as u32)
    }

    /// ms from the start of `slot_num` to the start of `next_slot_num`.
    fn gap_ms(&self, config: &MeshConfig) -> i64 {
        let slots_ahead = i64::from(config.slot_count) - i64::from(self.slot_num)
            + i64::from(self.next_slot_num);
        (slots_ahead * i64::from(config.slot_interval_ms)).max(1)
    }

    /// Enter `next_slot_num` and derive the one after it.
    pub fn advance(&mut self, owner: &MacAddr, slot_count: u8) {
        self.slot_num = self.next_slot_num;
        self.next_slot_num = next_slot_num(owner, self.slot_num, slot_count);
    }
}

impl Default for ScheduleSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// One wake cycle together with its two timer handles.
///
/// A handle is `Some` exactly while its timer is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub slot: ScheduleSlot,
    pub phase: SchedulePhase,
    pub wakeup_timer: Option<TimerHandle>,
    pub sleep_timer: Option<TimerHandle>,
}

impl Schedule {
    pub const fn new() -> Self {
        Self {
            slot: ScheduleSlot::new(),
            phase: SchedulePhase::ScheduledSleep,
            wakeup_timer: None,
            sleep_timer: None,
        }
    }

    pub fn handle(&self, timer: MeshTimer) -> Option<TimerHandle> {
        if timer.is_wakeup() { self.wakeup_timer } else { self.sleep_timer }
    }

    pub fn handle_mut(&mut self, timer: MeshTimer) -> &mut Option<TimerHandle> {
        if timer.is_wakeup() { &mut self.wakeup_timer } else { &mut self.sleep_timer }
    }

    pub fn is_awake(&self) -> bool {
        self.phase == SchedulePhase::Awake
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// What the node knows about its parent's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentSchedule {
    pub mac: MacAddr,
    pub schedule: Schedule,
    /// ms the parent was into its slot when it sent the last time-slot TLV.
    /// Consumed by the next timer computation.
    pub offset: u32,
    /// Frames the parent still holds for its children.
    pub bufqueue_size: u16,
    /// A time-slot TLV has been received since attaching.
    pub synced: bool,
}

impl ParentSchedule {
    pub const fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            schedule: Schedule::new(),
            offset: 0,
            bufqueue_size: 0,
            synced: false,
        }
    }
}
