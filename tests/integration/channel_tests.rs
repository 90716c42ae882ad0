//! Timer expiries delivered through the embassy-sync channel.

use crate::mock_hw::{MockMesh, RecordingSink};
use lowpower::config::MeshConfig;
use lowpower::mesh::LowpowerManager;
use lowpower::mesh::channel::{LOWPOWER_INPUT_DEPTH, LowpowerChannel, post_timer_fired};
use lowpower::mesh::neighbor::MacAddr;
use lowpower::mesh::schedule::{MeshTimer, TimerHandle};

fn started() -> (LowpowerManager, MockMesh, RecordingSink) {
    let mut m = LowpowerManager::new(MeshConfig::default(), MacAddr([1; 8])).unwrap();
    let mut p = MockMesh::new(0);
    let mut sink = RecordingSink::default();
    m.start(&mut p, &mut sink);
    (m, p, sink)
}

#[test]
fn queued_expiry_is_dispatched() {
    let channel = LowpowerChannel::new();
    let (mut m, mut p, mut sink) = started();

    let handle = p.expire(MeshTimer::MySleep).unwrap();
    assert!(post_timer_fired(&channel, MeshTimer::MySleep, handle));
    assert!(m.is_radio_up());

    assert_eq!(m.process_pending(&channel, &mut p, &mut sink), 1);
    assert!(!m.is_radio_up());
    assert!(p.pending(MeshTimer::MyWakeup).is_some());
    assert_eq!(m.process_pending(&channel, &mut p, &mut sink), 0);
}

#[test]
fn superseded_expiry_is_drained_but_ignored() {
    let channel = LowpowerChannel::new();
    let (mut m, mut p, mut sink) = started();

    post_timer_fired(&channel, MeshTimer::MySleep, TimerHandle(4242));
    assert_eq!(m.process_pending(&channel, &mut p, &mut sink), 1);
    assert!(m.is_radio_up());
    assert!(p.pending(MeshTimer::MySleep).is_some());
}

#[test]
fn full_channel_drops_expiry() {
    let channel = LowpowerChannel::new();
    for i in 0..LOWPOWER_INPUT_DEPTH {
        assert!(post_timer_fired(&channel, MeshTimer::MyWakeup, TimerHandle(i as u32)));
    }
    assert!(!post_timer_fired(&channel, MeshTimer::MyWakeup, TimerHandle(99)));
}
