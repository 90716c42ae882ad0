//! Timer-expiry channel into the schedule manager.
//!
//! Timer callbacks run in interrupt or timer-service context and must not
//! touch the manager directly.  They post here; the mesh task drains the
//! channel with [`LowpowerManager::process_pending`].
//!
//! ```text
//! ┌─────────────────┐  LowpowerInput  ┌──────────────────┐
//! │ timer callback  │────────────────▶│ LowpowerManager  │
//! │ (ISR / service) │   try_send      │ (mesh task)      │
//! └─────────────────┘                 └──────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::{MeshEventSink, MeshPlatform};

use super::LowpowerManager;
use super::schedule::{MeshTimer, TimerHandle};

/// Channel depth.  Four timers, each with at most one expiry in flight,
/// plus headroom for superseded ones.
pub const LOWPOWER_INPUT_DEPTH: usize = 8;

/// Message from timer context to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowpowerInput {
    TimerFired { timer: MeshTimer, handle: TimerHandle },
}

pub type LowpowerChannel = Channel<CriticalSectionRawMutex, LowpowerInput, LOWPOWER_INPUT_DEPTH>;

/// Timer-callback side.  Returns `false` if the channel was full and the
/// expiry was dropped.
pub fn post_timer_fired(channel: &LowpowerChannel, timer: MeshTimer, handle: TimerHandle) -> bool {
    if channel
        .try_send(LowpowerInput::TimerFired { timer, handle })
        .is_err()
    {
        warn!("Mesh lowpower: input channel full, {:?} expiry dropped", timer);
        return false;
    }
    true
}

impl LowpowerManager {
    /// Drain `channel`, dispatching every queued input.  Returns how many
    /// were handled.
    pub fn process_pending(
        &mut self,
        channel: &LowpowerChannel,
        p: &mut impl MeshPlatform,
        sink: &mut impl MeshEventSink,
    ) -> usize {
        let mut handled = 0;
        while let Ok(input) = channel.try_receive() {
            match input {
                LowpowerInput::TimerFired { timer, handle } => {
                    self.on_timer_fired(timer, handle, p, sink);
                }
            }
            handled += 1;
        }
        handled
    }
}
