//! Mesh low-power schedule manager.
//!
//! Follows two interleaved wake cycles and keeps the radio up only while
//! at least one of them is in its awake window.
//!
//! ```text
//!   ┌───────────────┐  on_timer_fired  ┌──────────────────────┐
//!   │ timer service │─────────────────▶│   LowpowerManager     │
//!   └───────────────┘   (channel)      │                      │
//!                                      │  own schedule ──┐    │  set_radio_power
//!   ┌───────────────┐  update_info     │                 ├──▶ │───────────────▶ radio
//!   │  mesh frames  │─────────────────▶│  parent sched ──┘    │
//!   └───────────────┘  (TLVs)          │                      │  MeshEvent
//!                                      └──────────────────────┘───────────────▶ event bus
//! ```
//!
//! The radio goes down only when neither schedule has a sleep timer
//! pending, i.e. neither is inside its awake window.

pub mod channel;
pub mod neighbor;
pub mod radio;
pub mod schedule;
pub mod slot;
pub mod tlv;

use heapless::Vec;
use log::{debug, info, warn};

use crate::app::events::{MeshEvent, RadioTransition};
use crate::app::ports::{ClockPort, MeshEventSink, MeshPlatform};
use crate::config::MeshConfig;
use crate::error::{Result, TlvError};

use neighbor::{MacAddr, Neighbor};
use radio::{RadioCallback, RadioCallbacks, RadioPowerState};
use schedule::{
    MeshTimer, ParentSchedule, Schedule, SchedulePhase, ScheduleKind, TimerHandle, WakePlan,
};
use slot::next_slot_num;
use tlv::{LowpowerTlvs, TimeSlot};

pub use channel::{LowpowerChannel, LowpowerInput};

/// Owns the own and parent schedules, the four low-power timers and the
/// radio power state.
pub struct LowpowerManager {
    config: MeshConfig,
    mac: MacAddr,
    running: bool,
    own_kind: ScheduleKind,
    own: Schedule,
    parent: Option<ParentSchedule>,
    radio: RadioPowerState,
    callbacks: RadioCallbacks,
}

impl LowpowerManager {
    pub fn new(config: MeshConfig, mac: MacAddr) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            mac,
            running: false,
            own_kind: ScheduleKind::Attaching,
            own: Schedule::new(),
            parent: None,
            radio: RadioPowerState::new(),
            callbacks: RadioCallbacks::new(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin duty cycling.  The own schedule opens its first awake window
    /// immediately.
    pub fn start(&mut self, p: &mut impl MeshPlatform, sink: &mut impl MeshEventSink) {
        if self.running {
            return;
        }
        self.running = true;
        let now = p.now_ms();
        self.own.slot.next_slot_num = next_slot_num(&self.mac, 0, self.config.slot_count);
        self.own.slot.timestamp = now;
        info!(
            "Mesh lowpower: start, {} slots of {} ms, window {} ms",
            self.config.slot_count, self.config.slot_interval_ms, self.config.awake_window_ms
        );
        self.wakeup_timer_handler(self.own_kind, 0, p, sink);
    }

    /// Stop duty cycling: cancel every timer and leave the radio up.
    pub fn stop(&mut self, p: &mut impl MeshPlatform) {
        if !self.running {
            return;
        }
        self.running = false;
        for timer in [MeshTimer::MyWakeup, MeshTimer::MySleep] {
            self.cancel_timer(timer, p);
        }
        if self.parent.is_some() {
            for timer in [MeshTimer::ParentWakeup, MeshTimer::ParentSleep] {
                self.cancel_timer(timer, p);
            }
        }
        self.own.phase = SchedulePhase::ScheduledSleep;
        if let Some(parent) = self.parent.as_mut() {
            parent.schedule.phase = SchedulePhase::ScheduledSleep;
        }
        self.radio_wakeup(self.own_kind, p);
        info!("Mesh lowpower: stop");
    }

    /// Attached to `parent`.  The parent schedule starts once its first
    /// time-slot TLV arrives.
    pub fn on_attached(&mut self, parent: MacAddr, p: &mut impl MeshPlatform) {
        if self.parent.is_some() {
            self.cancel_timer(MeshTimer::ParentWakeup, p);
            self.cancel_timer(MeshTimer::ParentSleep, p);
        }
        self.own_kind = ScheduleKind::Attached;
        self.parent = Some(ParentSchedule::new(parent));
        info!("Mesh lowpower: attached to {}", parent);
    }

    /// Lost the parent: drop its schedule and fall back to attaching.
    pub fn on_detached(&mut self, p: &mut impl MeshPlatform, sink: &mut impl MeshEventSink) {
        if self.parent.is_none() {
            return;
        }
        self.cancel_timer(MeshTimer::ParentWakeup, p);
        self.cancel_timer(MeshTimer::ParentSleep, p);
        self.parent = None;
        self.own_kind = ScheduleKind::Attaching;
        info!("Mesh lowpower: detached");

        if self.running && self.own.sleep_timer.is_none() {
            self.radio_sleep(self.own_kind, p, sink);
        }
    }

    // ── Timer dispatch ───────────────────────────────────────────

    /// Route a timer expiry to its handler.  Expiries for a handle that
    /// is no longer armed (cancelled or superseded) are dropped.
    pub fn on_timer_fired(
        &mut self,
        timer: MeshTimer,
        handle: TimerHandle,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) {
        let armed = self.schedule(timer.is_parent()).and_then(|s| s.handle(timer));
        if !self.running || armed != Some(handle) {
            debug!("Mesh lowpower: stale {:?} expiry {:?} ignored", timer, handle);
            return;
        }

        let kind = self.kind_of(timer);
        if timer.is_wakeup() {
            self.wakeup_timer_handler(kind, 0, p, sink);
        } else {
            self.sleep_timer_handler(kind, p, sink);
        }
    }

    /// Arm the wakeup timer for the next slot of `kind`.
    ///
    /// When the slot already began the wake handler runs right away with
    /// what is left of the window, never less than 1 ms.
    pub fn update_schedule_timer(
        &mut self,
        kind: ScheduleKind,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) {
        let parent = kind.is_parent();
        let now = p.now_ms();
        self.cancel_timer(MeshTimer::wakeup(parent), p);

        let plan = if parent {
            let Some(ps) = self.parent.as_mut() else {
                return;
            };
            let offset = core::mem::take(&mut ps.offset);
            ps.schedule
                .slot
                .plan_next_wake(&ps.mac, offset, now, &self.config)
        } else {
            self.own
                .slot
                .plan_next_wake(&self.mac, 0, now, &self.config)
        };

        match plan {
            WakePlan::Arm(delay_ms) => {
                debug!("Mesh lowpower: {:?} wakes in {} ms", kind, delay_ms);
                self.start_timer(MeshTimer::wakeup(parent), delay_ms, p);
            }
            WakePlan::Late(late_ms) => {
                debug!("Mesh lowpower: {:?} slot began {} ms ago", kind, late_ms);
                self.wakeup_timer_handler(kind, late_ms, p, sink);
            }
        }
    }

    /// A slot of `kind` began `late_ms` ago: enter it, power the radio and
    /// keep it up for the rest of the awake window.
    pub fn wakeup_timer_handler(
        &mut self,
        kind: ScheduleKind,
        late_ms: u32,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) {
        let parent = kind.is_parent();
        let slot_start = p.now_ms().wrapping_sub(late_ms);
        let slot_count = self.config.slot_count;
        let owner = self.mac;

        {
            let Some(sched) = self.schedule_mut(parent) else {
                return;
            };
            sched.wakeup_timer = None;
            sched.phase = SchedulePhase::Awake;
        }
        if let Some(ps) = self.parent.as_mut().filter(|_| parent) {
            ps.offset = 0;
            ps.schedule.slot.timestamp = slot_start;
            ps.schedule.slot.advance(&ps.mac, slot_count);
        } else if !parent {
            self.own.slot.timestamp = slot_start;
            self.own.slot.advance(&owner, slot_count);
        }

        self.radio_wakeup(kind, p);
        sink.post(MeshEvent::up_for(kind));

        let remaining = self.config.awake_window_ms.saturating_sub(late_ms).max(1);
        self.start_timer(MeshTimer::sleep(parent), remaining, p);
    }

    /// The awake window of `kind` closed: schedule its next slot and power
    /// the radio down if the other schedule is not awake either.
    pub fn sleep_timer_handler(
        &mut self,
        kind: ScheduleKind,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) {
        let parent = kind.is_parent();
        {
            let Some(sched) = self.schedule_mut(parent) else {
                return;
            };
            sched.sleep_timer = None;
            sched.phase = SchedulePhase::ScheduledSleep;
        }

        if kind == ScheduleKind::Attached {
            // Frames for sleepy children wait for their next window.
            p.for_each_child(&mut |child: &mut Neighbor| {
                if !child.rx_on_when_idle {
                    child.expects_wakeup = false;
                }
            });
        }

        self.update_schedule_timer(kind, p, sink);

        let parent_sleep = self.parent.as_ref().and_then(|ps| ps.schedule.sleep_timer);
        if self.own.sleep_timer.is_none() && parent_sleep.is_none() {
            self.radio_sleep(kind, p, sink);
        }
    }

    // ── Radio ────────────────────────────────────────────────────

    /// Power the radio down.  No-op when it is already down.
    pub fn radio_sleep(
        &mut self,
        kind: ScheduleKind,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) {
        if !self.radio.sleep(p.now_ms()) {
            return;
        }
        p.set_radio_power(false);
        sink.post(MeshEvent::SchedDown);
        self.callbacks.notify(RadioTransition::Down, kind);
        info!("Mesh lowpower: radio down ({:?})", kind);
    }

    /// Power the radio up and account the time it spent down.  No-op when
    /// it is already up.
    pub fn radio_wakeup(&mut self, kind: ScheduleKind, p: &mut impl MeshPlatform) {
        if !self.radio.wakeup(p.now_ms()) {
            return;
        }
        p.set_radio_power(true);
        self.callbacks.notify(RadioTransition::Up, kind);
        info!(
            "Mesh lowpower: radio up ({:?}), slept {} ms total",
            kind, self.radio.sleep_time
        );
    }

    pub fn register_radio_callback(&mut self, cb: RadioCallback) -> Result<()> {
        self.callbacks.register(cb)
    }

    // ── TLVs ─────────────────────────────────────────────────────

    /// Apply the low-power TLVs received from `neighbor`.
    ///
    /// Only the parent's records are acted on.  A time slot resyncs the
    /// parent schedule; an empty buffer queue closes the parent's awake
    /// window early.
    pub fn lowpower_update_info(
        &mut self,
        neighbor: &Neighbor,
        tlvs: &[u8],
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) -> Result<()> {
        let records = LowpowerTlvs::parse(tlvs)?;
        if let Some(ts) = records.time_slot {
            if ts.slot_num == 0 || ts.slot_num > self.config.slot_count {
                return Err(TlvError::InvalidSlot(ts.slot_num).into());
            }
            if ts.offset_ms >= 2 * self.config.cycle_ms() {
                return Err(TlvError::InvalidOffset(ts.offset_ms).into());
            }
        }

        let now = p.now_ms();
        let slot_count = self.config.slot_count;
        let Some(ps) = self.parent.as_mut().filter(|ps| ps.mac == neighbor.mac) else {
            return Ok(());
        };

        let mut resync = false;
        if let Some(ts) = records.time_slot {
            ps.schedule.slot.slot_num = ts.slot_num;
            ps.schedule.slot.next_slot_num = next_slot_num(&ps.mac, ts.slot_num, slot_count);
            ps.schedule.slot.timestamp = now;
            ps.offset = ts.offset_ms;
            ps.synced = true;
            resync = !ps.schedule.is_awake();
            debug!(
                "Mesh lowpower: parent slot {} offset {} ms",
                ts.slot_num, ts.offset_ms
            );
        }

        let mut close_window = false;
        if let Some(size) = records.bufqueue_size {
            ps.bufqueue_size = size;
            close_window = size == 0 && ps.schedule.sleep_timer.is_some();
        }

        if !self.running {
            return Ok(());
        }
        if resync {
            self.update_schedule_timer(ScheduleKind::Parent, p, sink);
        }
        if close_window {
            debug!("Mesh lowpower: parent queue empty, closing its window");
            self.cancel_timer(MeshTimer::ParentSleep, p);
            self.sleep_timer_handler(ScheduleKind::Parent, p, sink);
        }
        Ok(())
    }

    /// Append the node's own time slot and `bufqueue_size` for broadcast
    /// to children.
    pub fn fill_tlvs<const N: usize>(
        &self,
        bufqueue_size: u16,
        clock: &impl ClockPort,
        out: &mut Vec<u8, N>,
    ) -> Result<()> {
        let records = LowpowerTlvs {
            time_slot: Some(TimeSlot {
                slot_num: self.own.slot.slot_num,
                offset_ms: clock.now_ms().wrapping_sub(self.own.slot.timestamp),
            }),
            bufqueue_size: Some(bufqueue_size),
        };
        records.encode(out)?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_radio_up(&self) -> bool {
        self.radio.up
    }

    /// Total ms the radio has spent powered down.
    pub fn sleep_time(&self) -> u32 {
        self.radio.sleep_time
    }

    pub fn radio(&self) -> &RadioPowerState {
        &self.radio
    }

    pub fn own_kind(&self) -> ScheduleKind {
        self.own_kind
    }

    pub fn own_schedule(&self) -> &Schedule {
        &self.own
    }

    pub fn parent_schedule(&self) -> Option<&ParentSchedule> {
        self.parent.as_ref()
    }

    pub fn timer_handle(&self, timer: MeshTimer) -> Option<TimerHandle> {
        self.schedule(timer.is_parent()).and_then(|s| s.handle(timer))
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    // ── Internal ─────────────────────────────────────────────────

    fn kind_of(&self, timer: MeshTimer) -> ScheduleKind {
        if timer.is_parent() {
            ScheduleKind::Parent
        } else {
            self.own_kind
        }
    }

    fn schedule(&self, parent: bool) -> Option<&Schedule> {
        if parent {
            self.parent.as_ref().map(|ps| &ps.schedule)
        } else {
            Some(&self.own)
        }
    }

    fn schedule_mut(&mut self, parent: bool) -> Option<&mut Schedule> {
        if parent {
            self.parent.as_mut().map(|ps| &mut ps.schedule)
        } else {
            Some(&mut self.own)
        }
    }

    /// Arm `timer`, superseding a pending one.
    fn start_timer(&mut self, timer: MeshTimer, duration_ms: u32, p: &mut impl MeshPlatform) {
        self.cancel_timer(timer, p);
        let handle = p.start(timer, duration_ms);
        if handle.is_none() {
            warn!("Mesh lowpower: no timer available for {:?}", timer);
        }
        if let Some(sched) = self.schedule_mut(timer.is_parent()) {
            *sched.handle_mut(timer) = handle;
        }
    }

    fn cancel_timer(&mut self, timer: MeshTimer, p: &mut impl MeshPlatform) {
        let pending = self
            .schedule_mut(timer.is_parent())
            .and_then(|sched| sched.handle_mut(timer).take());
        if let Some(handle) = pending {
            p.stop(handle);
        }
    }
}
