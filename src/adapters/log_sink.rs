//! Log-based mesh event sink.
//!
//! Implements [`MeshEventSink`] by writing every radio-window event to
//! the logger.  Useful on bring-up boards where the mesh event bus is not
//! wired yet, and as the default sink in host tools.

use log::info;

use crate::app::events::MeshEvent;
use crate::app::ports::MeshEventSink;
use crate::tickless::TicklessStats;

/// Adapter that logs every [`MeshEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    posted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn posted(&self) -> u32 {
        self.posted
    }
}

impl MeshEventSink for LogEventSink {
    fn post(&mut self, event: MeshEvent) {
        self.posted = self.posted.wrapping_add(1);
        match event {
            MeshEvent::SchedDown => info!("MESH | code=0x{:02x} | radio down", event.code()),
            MeshEvent::ParentSchedUp => {
                info!("MESH | code=0x{:02x} | radio up, parent slot", event.code());
            }
            MeshEvent::AttachedSchedUp => {
                info!("MESH | code=0x{:02x} | radio up, own slot", event.code());
            }
        }
    }
}

/// One-line telemetry summary of the tickless counters.
pub fn log_tickless_stats(stats: &TicklessStats) {
    info!(
        "TICKLESS | sleeps={} aborts={} skipped={} clamps={} | wakes timer={} ext={} | stepped={}",
        stats.sleeps,
        stats.aborts,
        stats.skipped,
        stats.clamps,
        stats.timer_wakes,
        stats.external_wakes,
        stats.stepped_ticks,
    );
}
