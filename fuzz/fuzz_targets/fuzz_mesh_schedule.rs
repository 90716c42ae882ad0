//! Fuzz target: `LowpowerManager` event sequences
//!
//! Interprets the input as a stream of timer expiries, parent TLVs and
//! clock jumps, and checks after every step:
//! - No panics, including across mesh-clock wraparound
//! - The radio is down only while both sleep timers are idle
//!
//! cargo fuzz run fuzz_mesh_schedule

#![no_main]

use libfuzzer_sys::fuzz_target;
use lowpower::app::events::MeshEvent;
use lowpower::app::ports::{ClockPort, MeshEventSink, MeshTimerPort, NeighborPort, RadioPort};
use lowpower::config::MeshConfig;
use lowpower::mesh::LowpowerManager;
use lowpower::mesh::neighbor::{MacAddr, Neighbor};
use lowpower::mesh::schedule::{MeshTimer, TimerHandle};

const TIMERS: [MeshTimer; 4] = [
    MeshTimer::MyWakeup,
    MeshTimer::MySleep,
    MeshTimer::ParentWakeup,
    MeshTimer::ParentSleep,
];

#[derive(Default)]
struct Platform {
    now: u32,
    next: u32,
    armed: Vec<(MeshTimer, TimerHandle, u32)>,
}

impl ClockPort for Platform {
    fn now_ms(&self) -> u32 {
        self.now
    }
}

impl MeshTimerPort for Platform {
    fn start(&mut self, timer: MeshTimer, duration_ms: u32) -> Option<TimerHandle> {
        self.next += 1;
        let handle = TimerHandle(self.next);
        self.armed.push((timer, handle, duration_ms));
        Some(handle)
    }

    fn stop(&mut self, handle: TimerHandle) {
        self.armed.retain(|(_, h, _)| *h != handle);
    }
}

impl RadioPort for Platform {
    fn set_radio_power(&mut self, _on: bool) {}
}

impl NeighborPort for Platform {
    fn for_each_child(&mut self, _f: &mut dyn FnMut(&mut Neighbor)) {}
}

struct Sink;

impl MeshEventSink for Sink {
    fn post(&mut self, _event: MeshEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let parent = MacAddr([0xaa; 8]);
    let mut m = LowpowerManager::new(MeshConfig::default(), MacAddr([0x11; 8])).unwrap();
    let mut p = Platform {
        now: u32::MAX - 5_000,
        ..Platform::default()
    };
    m.on_attached(parent, &mut p);
    m.start(&mut p, &mut Sink);

    for chunk in data.chunks(4) {
        let [op, a, b, c] = *chunk else { break };
        match op % 4 {
            0 => {
                let timer = TIMERS[usize::from(a % 4)];
                if let Some(i) = p.armed.iter().position(|(t, _, _)| *t == timer) {
                    let (_, handle, ms) = p.armed.remove(i);
                    p.now = p.now.wrapping_add(ms);
                    m.on_timer_fired(timer, handle, &mut p, &mut Sink);
                }
            }
            1 => {
                let offset = u32::from(u16::from_le_bytes([b, c]));
                let mut tlv = vec![0x1b, 5, a];
                tlv.extend_from_slice(&offset.to_le_bytes());
                let _ = m.lowpower_update_info(&Neighbor::new(parent, true), &tlv, &mut p, &mut Sink);
            }
            2 => {
                let tlv = [0x1c, 2, a % 2, 0];
                let _ = m.lowpower_update_info(&Neighbor::new(parent, true), &tlv, &mut p, &mut Sink);
            }
            _ => p.now = p.now.wrapping_add(u32::from(u16::from_le_bytes([a, b]))),
        }

        if !m.is_radio_up() {
            assert!(m.timer_handle(MeshTimer::MySleep).is_none());
            assert!(m.timer_handle(MeshTimer::ParentSleep).is_none());
        }
    }
});
