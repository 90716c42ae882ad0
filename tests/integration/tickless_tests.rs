//! Tickless controller against the mock counter, GPT and kernel.

use crate::mock_hw::{HwCall, MockTicklessHw, WakeScenario};
use lowpower::Error;
use lowpower::app::ports::SleepModeStatus;
use lowpower::config::{SleepMode, TicklessConfig, WakeStrategyKind};
use lowpower::tickless::{
    SleepOutcome, TicklessController, TicklessState, WakeCause, WakeSourceKind, WakeupFlag,
};

const PER_TICK: u32 = 192_000;

fn setup<'a>(
    cfg: &TicklessConfig,
    flag: &'a WakeupFlag,
) -> (TicklessController<'a>, MockTicklessHw<'a>) {
    let mut hw = MockTicklessHw::new(flag);
    let ctl = TicklessController::init(cfg, flag, &mut hw).unwrap();
    hw.calls.clear();
    (ctl, hw)
}

fn slept(outcome: SleepOutcome) -> lowpower::tickless::SleepReport {
    match outcome {
        SleepOutcome::Slept(report) => report,
        other => panic!("expected a sleep, got {other:?}"),
    }
}

// ── Init ──────────────────────────────────────────────────────

#[test]
fn init_programs_per_tick_reload_and_starts_counter() {
    let flag = WakeupFlag::new();
    let mut hw = MockTicklessHw::new(&flag);
    let ctl = TicklessController::init(&TicklessConfig::default(), &flag, &mut hw).unwrap();

    assert_eq!(
        hw.calls,
        vec![
            HwCall::DisableCounter,
            HwCall::SetReload(PER_TICK - 1),
            HwCall::ClearCurrent,
            HwCall::EnableCounter,
        ]
    );
    assert!(hw.enabled);
    assert_eq!(ctl.snapshot().max_suppressible_ticks, 87);
    assert_eq!(ctl.state(), TicklessState::Idle);
}

#[test]
fn init_fails_without_sleep_handle() {
    let flag = WakeupFlag::new();
    let mut hw = MockTicklessHw::new(&flag);
    hw.handles_left = 0;
    let err = TicklessController::init(&TicklessConfig::default(), &flag, &mut hw).err();
    assert!(matches!(err, Some(Error::Init(_))));
    assert!(hw.calls.is_empty());
}

#[test]
fn init_rejects_invalid_config() {
    let flag = WakeupFlag::new();
    let mut hw = MockTicklessHw::new(&flag);
    let cfg = TicklessConfig {
        tick_rate_hz: 0,
        ..TicklessConfig::default()
    };
    assert!(matches!(
        TicklessController::init(&cfg, &flag, &mut hw),
        Err(Error::Config(_))
    ));
}

// ── Direct counter ────────────────────────────────────────────

#[test]
fn counter_wrap_steps_expected_minus_one() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 1_000 };

    let report = slept(ctl.suppress_ticks_and_sleep(5, &mut hw));

    let long_reload = 150_000 + PER_TICK * 4 - 45;
    assert_eq!(report.source, WakeSourceKind::DirectCounter);
    assert_eq!(report.wake, WakeCause::Timer);
    assert_eq!(report.stepped_ticks, 4);
    assert_eq!(hw.stepped(), vec![4]);
    assert_eq!(
        hw.reloads(),
        vec![long_reload, PER_TICK - 1 - 1_000, PER_TICK - 1]
    );
    assert!(hw.enabled);
    assert_eq!(ctl.state(), TicklessState::Idle);
}

#[test]
fn counter_wrap_with_large_overshoot_restarts_full_tick() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap {
        overshoot: PER_TICK - 10,
    };

    let report = slept(ctl.suppress_ticks_and_sleep(5, &mut hw));
    assert_eq!(report.stepped_ticks, 4);
    // Remaining count below the compensation: fall back to a full tick.
    assert_eq!(hw.reloads()[1], PER_TICK - 1);
}

#[test]
fn external_wake_on_counter_steps_whole_ticks() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    // 2.5 ticks after the long reload was loaded.
    hw.scenario = WakeScenario::CounterExternal {
        elapsed: PER_TICK * 2 + PER_TICK / 2,
    };

    let report = slept(ctl.suppress_ticks_and_sleep(5, &mut hw));

    let long_reload = 150_000 + PER_TICK * 4 - 45;
    let current = long_reload - (PER_TICK * 2 + PER_TICK / 2);
    let completed = 5 * PER_TICK - current;
    let whole = completed / PER_TICK;
    assert_eq!(report.wake, WakeCause::External);
    assert_eq!(report.stepped_ticks, whole);
    assert!(!report.clamped);
    assert_eq!(hw.reloads()[1], (whole + 1) * PER_TICK - completed);
}

#[test]
fn overrun_is_clamped_and_counted() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = PER_TICK - 1;
    // Counter fully drained without COUNTFLAG: whole == expected.
    hw.scenario = WakeScenario::CounterExternal { elapsed: u32::MAX };

    let report = slept(ctl.suppress_ticks_and_sleep(6, &mut hw));
    assert!(report.clamped);
    assert_eq!(report.stepped_ticks, 5);
    assert_eq!(hw.reloads()[1], PER_TICK - 1);
    assert_eq!(ctl.stats().clamps, 1);
}

#[test]
fn request_beyond_counter_range_is_clamped_to_hardware_bound() {
    let flag = WakeupFlag::new();
    let cfg = TicklessConfig {
        wake_strategy: WakeStrategyKind::DirectCounter,
        ..TicklessConfig::default()
    };
    let (mut ctl, mut hw) = setup(&cfg, &flag);
    hw.val = PER_TICK - 1;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 0 };

    let report = slept(ctl.suppress_ticks_and_sleep(10_000, &mut hw));
    assert_eq!(report.requested_ticks, 87);
    assert_eq!(report.stepped_ticks, 86);
    assert!(hw.reloads()[0] <= 0x00FF_FFFF);
}

// ── Auxiliary timer ───────────────────────────────────────────

#[test]
fn external_wake_on_aux_timer_steps_measured_ticks() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    // 100 ms at 32 768 Hz arms 3276 counts; wake after 984 (just over 30 ms).
    hw.scenario = WakeScenario::AuxExternal { elapsed: 984 };

    let report = slept(ctl.suppress_ticks_and_sleep(100, &mut hw));

    assert_eq!(report.source, WakeSourceKind::AuxiliaryTimer);
    assert_eq!(report.wake, WakeCause::External);
    assert_eq!(report.stepped_ticks, 30);
    assert_eq!(ctl.wakeup_state().reload_count, 3276);
    assert_eq!(ctl.wakeup_state().current_count, 2292);
    assert_eq!(hw.stepped(), vec![30]);
    // 960/32768 of a tick already gone.
    assert_eq!(hw.reloads(), vec![186_374, PER_TICK - 1]);
    assert!(!hw.gpt_armed);
    assert!(
        hw.calls.contains(&HwCall::StartOneShot {
            handle: ctl.wakeup_state().handle_index,
            ms: 100
        })
    );
}

#[test]
fn aux_timeout_steps_expected_minus_one() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.scenario = WakeScenario::AuxTimeout;

    let report = slept(ctl.suppress_ticks_and_sleep(40, &mut hw));
    assert_eq!(report.wake, WakeCause::Timer);
    assert_eq!(report.stepped_ticks, 39);
    assert!(!flag.is_set());
    assert_eq!(ctl.stats().timer_wakes, 1);
}

#[test]
fn stale_expiry_is_cleared_before_arming() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    ctl.on_wakeup_timer_expired();
    assert!(flag.is_set());
    hw.scenario = WakeScenario::AuxExternal { elapsed: 984 };

    let report = slept(ctl.suppress_ticks_and_sleep(100, &mut hw));
    assert_eq!(report.wake, WakeCause::External);
    assert_eq!(report.stepped_ticks, 30);
}

#[test]
fn sleep_lock_forces_direct_counter() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.sleep_locked = true;
    hw.val = PER_TICK - 1;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 0 };

    let report = slept(ctl.suppress_ticks_and_sleep(50, &mut hw));
    assert_eq!(report.source, WakeSourceKind::DirectCounter);
    assert!(!hw.calls.iter().any(|c| matches!(c, HwCall::StartOneShot { .. })));
}

// ── Abort, skip, hooks ────────────────────────────────────────

#[test]
fn abort_restarts_counter_from_remaining_value() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 120_000;
    hw.confirm = SleepModeStatus::Abort;

    assert_eq!(ctl.suppress_ticks_and_sleep(100, &mut hw), SleepOutcome::Aborted);

    assert_eq!(
        hw.after_confirm(),
        &[
            HwCall::SetReload(120_000),
            HwCall::ClearCurrent,
            HwCall::EnableCounter,
            HwCall::SetReload(PER_TICK - 1),
            HwCall::UnmaskTick,
        ]
    );
    assert!(!hw.gpt_armed);
    assert!(hw.stepped().is_empty());
    assert_eq!(hw.count(HwCall::Wfi), 0);
    assert_eq!(ctl.stats().aborts, 1);
    assert_eq!(ctl.state(), TicklessState::Idle);
}

#[test]
fn short_idle_is_skipped_without_touching_hardware() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);

    assert_eq!(ctl.suppress_ticks_and_sleep(1, &mut hw), SleepOutcome::Skipped);
    assert!(hw.calls.is_empty());
    assert_eq!(ctl.stats().skipped, 1);
}

#[test]
fn tick_interrupt_stays_masked_until_after_step() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 10 };
    ctl.suppress_ticks_and_sleep(5, &mut hw);

    let mask = hw.calls.iter().position(|c| *c == HwCall::MaskTick).unwrap();
    let confirm = hw.calls.iter().position(|c| *c == HwCall::Confirm).unwrap();
    let step = hw
        .calls
        .iter()
        .position(|c| matches!(c, HwCall::StepTick(_)))
        .unwrap();
    let unmask = hw.calls.iter().position(|c| *c == HwCall::UnmaskTick).unwrap();
    assert!(mask < confirm && confirm < step && step < unmask);
    assert_eq!(hw.count(HwCall::UnmaskTick), 1);
    assert_eq!(hw.calls.last(), Some(&HwCall::UnmaskTick));
}

#[test]
fn watchdog_fed_around_sleep_instruction() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 10 };
    ctl.suppress_ticks_and_sleep(5, &mut hw);

    let wfi = hw.calls.iter().position(|c| *c == HwCall::Wfi).unwrap();
    assert_eq!(hw.calls[wfi - 1], HwCall::FeedWatchdog);
    assert_eq!(hw.calls[wfi + 1], HwCall::FeedWatchdog);
    assert_eq!(hw.calls[wfi - 2], HwCall::PreSleep);
    assert_eq!(hw.calls[wfi + 2], HwCall::PostSleep);
}

#[test]
fn hook_that_already_slept_skips_sleep_instruction() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);
    hw.val = 150_000;
    hw.skip_sleep_in_hook = true;

    let report = slept(ctl.suppress_ticks_and_sleep(5, &mut hw));
    assert!(!report.slept);
    assert_eq!(hw.count(HwCall::Wfi), 0);
    assert_eq!(hw.count(HwCall::FeedWatchdog), 0);
    assert_eq!(hw.count(HwCall::PostSleep), 1);
    assert_eq!(hw.stepped().len(), 1);
}

#[test]
fn legacy_mode_uses_vendor_sleep_unless_locked() {
    let flag = WakeupFlag::new();
    let cfg = TicklessConfig {
        sleep_mode: SleepMode::Legacy,
        ..TicklessConfig::default()
    };
    let (mut ctl, mut hw) = setup(&cfg, &flag);
    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 10 };

    ctl.suppress_ticks_and_sleep(5, &mut hw);
    assert_eq!(hw.count(HwCall::LegacySleep), 1);

    hw.sleep_locked = true;
    hw.val = 150_000;
    ctl.suppress_ticks_and_sleep(5, &mut hw);
    assert_eq!(hw.count(HwCall::LegacySleep), 1);
    assert_eq!(hw.count(HwCall::Wfi), 1);
}

#[test]
fn stats_accumulate_across_calls() {
    let flag = WakeupFlag::new();
    let (mut ctl, mut hw) = setup(&TicklessConfig::default(), &flag);

    hw.val = 150_000;
    hw.scenario = WakeScenario::CounterWrap { overshoot: 10 };
    ctl.suppress_ticks_and_sleep(5, &mut hw);

    hw.scenario = WakeScenario::AuxExternal { elapsed: 984 };
    ctl.suppress_ticks_and_sleep(100, &mut hw);

    hw.confirm = SleepModeStatus::Abort;
    ctl.suppress_ticks_and_sleep(100, &mut hw);

    let s = ctl.stats();
    assert_eq!(s.sleeps, 2);
    assert_eq!(s.aborts, 1);
    assert_eq!(s.timer_wakes, 1);
    assert_eq!(s.external_wakes, 1);
    assert_eq!(s.stepped_ticks, 34);
}
