//! Outbound mesh events.
//!
//! The [`LowpowerManager`](crate::mesh::LowpowerManager) posts these
//! through the [`MeshEventSink`](super::ports::MeshEventSink) port on
//! every radio transition.  Other mesh components use them to learn when
//! the radio window opens and closes.

use crate::mesh::schedule::ScheduleKind;

/// Event codes posted to the mesh event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeshEvent {
    /// Radio powered down (`CODE_MESH_SCHED_DOWN`).
    SchedDown = 0x40,
    /// Radio powered up for the parent's slot (`CODE_MESH_PSCHED_UP`).
    ParentSchedUp = 0x41,
    /// Radio powered up for the node's own slot (`CODE_MESH_ASCHED_UP`).
    AttachedSchedUp = 0x42,
}

impl MeshEvent {
    /// Numeric code as carried on the mesh event bus.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Event announcing the radio coming up for `kind`.
    pub const fn up_for(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::Parent => Self::ParentSchedUp,
            ScheduleKind::Attaching | ScheduleKind::Attached => Self::AttachedSchedUp,
        }
    }
}

/// Direction of a radio power transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioTransition {
    Up,
    Down,
}
