//! Whole-boot scenarios for the field controller against mock ports.

use pumpstation::app::events::AppEvent;
use pumpstation::config::SystemConfig;
use pumpstation::control::{FieldController, PumpExit};

use crate::mock_hw::{
    FakeTimeSource, MockBoard, RecordingSink, ScriptedBroker, ScriptedNetwork, ntp_at_utc_hour,
};

/// 15:00 UTC is 17:00 local with the default +2 h offset.
const IN_WINDOW_UTC: u32 = 15;

struct Rig {
    cfg: SystemConfig,
    board: MockBoard,
    net: ScriptedNetwork,
    broker: ScriptedBroker,
    time: FakeTimeSource,
    sink: RecordingSink,
}

impl Rig {
    fn new(frame_volts: &[f32]) -> Self {
        let cfg = SystemConfig::default();
        Self {
            board: MockBoard::new(&cfg, frame_volts),
            net: ScriptedNetwork::default(),
            broker: ScriptedBroker::default(),
            time: FakeTimeSource::answering(ntp_at_utc_hour(IN_WINDOW_UTC)),
            sink: RecordingSink::default(),
            cfg,
        }
    }

    fn run(&mut self) -> pumpstation::control::BootReport {
        FieldController::new(&self.cfg).run(
            &mut self.board,
            &mut self.net,
            &mut self.broker,
            &mut self.time,
            &mut self.sink,
        )
    }
}

#[test]
fn pump_runs_until_window_closes() {
    let mut rig = Rig::new(&[12.6]);
    let report = rig.run();

    assert!(report.online);
    assert!(report.clock_synced);
    assert_eq!(report.initial_publish, Some(true));
    assert_eq!(report.pump, Some(PumpExit::WindowClosed));
    // 17:00 to 19:00 local, one 8.5 s sensor pass plus a 4 min pause per round.
    assert_eq!(report.pump_iterations, 29);

    assert_eq!(rig.board.relay_history, vec![true, false]);
    assert_eq!(rig.board.deep_sleeps, vec![rig.cfg.sleep_duration_ms]);
    assert!(rig.board.longest_unfed_ms < u64::from(rig.cfg.watchdog_timeout_ms));

    let relay = rig.broker.payloads("telemetry/pump/relay");
    assert_eq!(relay.len(), 30);
    assert_eq!(relay[0], "0");
    assert!(relay[1..].iter().all(|p| *p == "1"));
    assert!(rig.broker.payloads("telemetry/pump/battery").iter().all(|p| *p == "12.60"));
    assert!(rig.broker.payloads("telemetry/pump/temp").iter().all(|p| *p == "21.50"));
}

#[test]
fn clock_is_synced_to_local_time_before_first_publish() {
    let mut rig = Rig::new(&[12.6]);
    rig.run();

    let synced = rig.sink.events.iter().position(|e| matches!(e, AppEvent::ClockSynced(_)));
    let first_frame = rig
        .sink
        .events
        .iter()
        .position(|e| matches!(e, AppEvent::Telemetry { .. }));
    assert!(synced < first_frame);
    match &rig.sink.events[synced.unwrap_or_default()] {
        AppEvent::ClockSynced(now) => {
            assert_eq!((now.hour, now.minute), (17, 0));
            assert_eq!((now.year, now.month, now.day), (2024, 6, 1));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn low_voltage_stops_pump_on_third_round() {
    let mut rig = Rig::new(&[12.5, 12.5, 12.5, 11.5]);
    let report = rig.run();

    assert_eq!(report.pump, Some(PumpExit::LowVoltage));
    assert_eq!(report.pump_iterations, 3);
    assert_eq!(rig.board.relay_history, vec![true, false]);
    assert_eq!(
        rig.broker.payloads("telemetry/pump/battery"),
        vec!["12.50", "12.50", "12.50", "11.50"]
    );
    assert!(rig.sink.events.contains(&AppEvent::PumpStopped {
        exit: PumpExit::LowVoltage,
        iterations: 3,
    }));
}

#[test]
fn publish_failure_forces_power_down() {
    let mut rig = Rig::new(&[12.6]);
    // The boot frame goes out; everything after it is rejected.
    rig.broker = ScriptedBroker::failing_after(5);
    let report = rig.run();

    assert_eq!(report.initial_publish, Some(true));
    assert_eq!(report.pump, Some(PumpExit::PublishFailed));
    assert_eq!(report.pump_iterations, 1);
    assert_eq!(rig.board.relay_history, vec![true, false]);
    assert_eq!(rig.board.deep_sleeps.len(), 1);

    let last_two: Vec<_> = rig.sink.events.iter().rev().take(2).collect();
    assert_eq!(
        last_two,
        vec![
            &AppEvent::PowerDown { sleep_ms: rig.cfg.sleep_duration_ms },
            &AppEvent::PumpStopped { exit: PumpExit::PublishFailed, iterations: 1 },
        ]
    );
}

#[test]
fn sensor_failure_publishes_fallback_and_skips_pump() {
    let mut rig = Rig::new(&[12.6]);
    rig.board.fail_soil = true;
    let report = rig.run();

    assert_eq!(report.initial_publish, Some(true));
    assert_eq!(report.pump, None);
    assert_eq!(rig.broker.published.len(), 5);
    assert!(rig.broker.published.iter().all(|(_, payload)| payload == "0"));
    assert!(rig.board.relay_history.is_empty());
}

#[test]
fn offline_boot_recovers_modem_and_sleeps() {
    let mut rig = Rig::new(&[12.6]);
    rig.net.fail_bring_up = true;
    let report = rig.run();

    assert!(!report.online);
    assert_eq!(report.initial_publish, None);
    assert_eq!(report.pump, None);
    assert_eq!(rig.net.recovers, 1);
    assert_eq!(rig.time.queries, 0);
    assert!(rig.broker.published.is_empty());
    assert_eq!(rig.board.deep_sleeps, vec![rig.cfg.sleep_duration_ms]);
    assert!(matches!(rig.sink.events[1], AppEvent::LinkDown(Some(_))));
}

#[test]
fn failed_time_sync_still_publishes_but_never_pumps() {
    let mut rig = Rig::new(&[12.6]);
    rig.time = FakeTimeSource::default();
    let report = rig.run();

    assert!(!report.clock_synced);
    assert_eq!(rig.time.queries, rig.cfg.retry_count);
    assert_eq!(report.initial_publish, Some(true));
    assert_eq!(report.pump, None);
    assert!(rig.board.relay_history.is_empty());
}

#[test]
fn outside_window_skips_pump() {
    let mut rig = Rig::new(&[12.6]);
    // 10:00 UTC is noon local.
    rig.time = FakeTimeSource::answering(ntp_at_utc_hour(10));
    let report = rig.run();

    assert!(report.clock_synced);
    assert_eq!(report.pump, None);
    assert_eq!(rig.broker.published.len(), 5);
}

#[test]
fn battery_between_cutoff_and_floor_skips_pump() {
    let mut rig = Rig::new(&[11.8]);
    let report = rig.run();

    assert_eq!(report.pump, None);
    assert_eq!(rig.broker.payloads("telemetry/pump/battery"), vec!["11.80"]);
}

#[test]
fn last_hour_of_window_still_pumps() {
    let mut rig = Rig::new(&[12.6]);
    // 16:00 UTC is 18:00 local, the final window hour.
    rig.time = FakeTimeSource::answering(ntp_at_utc_hour(16));
    let report = rig.run();

    assert_eq!(report.pump, Some(PumpExit::WindowClosed));
    // 18:00 to 19:00 local
    assert_eq!(report.pump_iterations, 15);
}
