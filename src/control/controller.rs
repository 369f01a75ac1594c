//! Field controller: the once-per-boot control sequence.
//!
//! ```text
//!  boot ─▶ link up? ──no──▶ recover ─────────────────────────┐
//!            │yes                                            │
//!            ▼                                               ▼
//!        time sync ─▶ read + publish ─▶ pump gate ─▶ pump ─▶ power down
//!                                            │no             ▲
//!                                            └───────────────┘
//! ```
//!
//! Nothing survives the power-down except the RTC; on wake the device
//! starts over from boot.  The relay is owned here: every pump exit path
//! releases it except a publish failure, which goes straight to power-down
//! (and power-down releases it first).

use log::{info, warn};

use super::window::ControlWindow;
use crate::app::events::AppEvent;
use crate::app::ports::{Board, BrokerPort, EventSink, NetworkPort, TimeSourcePort};
use crate::config::SystemConfig;
use crate::sensors::{SamplingPlan, SensorHub};
use crate::telemetry::{PublishPolicy, TelemetryFrame, TelemetryPublisher};
use crate::time_sync::sync_clock;

/// Why the pump cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The clock left the control window.
    WindowClosed,
    /// The battery fell below the cutoff; relay released normally.
    LowVoltage,
    /// Telemetry could not be delivered; forced power-down.
    PublishFailed,
}

/// What one boot did, for logs and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct BootReport {
    pub online: bool,
    pub clock_synced: bool,
    /// Outcome of the boot-time publish; `None` when offline.
    pub initial_publish: Option<bool>,
    pub pump: Option<PumpExit>,
    /// Read/publish iterations of the pump cycle.
    pub pump_iterations: u32,
    pub sleep_ms: u32,
}

pub struct FieldController {
    window: ControlWindow,
    low_voltage_cutoff: f32,
    pump_enable_floor: f32,
    pump_interval_ms: u32,
    watchdog_slice_ms: u32,
    time_attempts: u32,
    tz_offset_hours: i8,
    pre_sleep_ms: u32,
    sleep_duration_ms: u32,
    hub: SensorHub,
    publisher: TelemetryPublisher,
}

impl FieldController {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            window: ControlWindow::new(cfg.window_start_hour, cfg.window_end_hour),
            low_voltage_cutoff: cfg.low_voltage_cutoff,
            pump_enable_floor: cfg.pump_enable_floor,
            pump_interval_ms: cfg.pump_interval_ms,
            watchdog_slice_ms: cfg.watchdog_feed_slice_ms().max(1),
            time_attempts: cfg.retry_count,
            tz_offset_hours: cfg.tz_offset_hours,
            pre_sleep_ms: cfg.pre_sleep_ms,
            sleep_duration_ms: cfg.sleep_duration_ms,
            hub: SensorHub::new(SamplingPlan::from_config(cfg)),
            publisher: TelemetryPublisher::new(PublishPolicy::from_config(cfg)),
        }
    }

    /// Run the whole boot sequence, ending in deep sleep.
    pub fn run<B, N, K, T, E>(
        &self,
        board: &mut B,
        net: &mut N,
        broker: &mut K,
        time: &mut T,
        sink: &mut E,
    ) -> BootReport
    where
        B: Board,
        N: NetworkPort,
        K: BrokerPort,
        T: TimeSourcePort,
        E: EventSink,
    {
        sink.emit(&AppEvent::Boot);
        board.feed_watchdog();

        let mut report = BootReport {
            online: self.bring_up(net, sink),
            clock_synced: false,
            initial_publish: None,
            pump: None,
            pump_iterations: 0,
            sleep_ms: self.sleep_duration_ms,
        };
        board.feed_watchdog();

        if report.online {
            report.clock_synced = self.sync_time(board, time, sink);

            let (frame, published) = self.read_and_publish(board, net, broker, sink);
            report.initial_publish = Some(published);

            if self.pump_allowed(report.clock_synced, &frame, board) {
                let (exit, iterations) = self.pump_cycle(board, net, broker, sink);
                report.pump = Some(exit);
                report.pump_iterations = iterations;
            } else {
                info!("Pump conditions not met (synced={})", report.clock_synced);
            }
        }

        self.power_down(board, sink);
        report
    }

    fn bring_up<N: NetworkPort, E: EventSink>(&self, net: &mut N, sink: &mut E) -> bool {
        match net.bring_up() {
            Ok(()) if net.is_online() => {
                sink.emit(&AppEvent::LinkUp);
                true
            }
            Ok(()) => {
                warn!("Bring-up finished but the link is not online");
                net.recover();
                sink.emit(&AppEvent::LinkDown(None));
                false
            }
            Err(e) => {
                warn!("Bring-up failed: {}", e);
                net.recover();
                sink.emit(&AppEvent::LinkDown(Some(e)));
                false
            }
        }
    }

    fn sync_time<B: Board, T: TimeSourcePort, E: EventSink>(
        &self,
        board: &mut B,
        time: &mut T,
        sink: &mut E,
    ) -> bool {
        match sync_clock(time, board, self.time_attempts, self.tz_offset_hours) {
            Ok(now) => {
                sink.emit(&AppEvent::ClockSynced(now));
                true
            }
            Err(e) => {
                sink.emit(&AppEvent::ClockSyncFailed(e));
                false
            }
        }
    }

    fn read_and_publish<B, N, K, E>(
        &self,
        board: &mut B,
        net: &mut N,
        broker: &mut K,
        sink: &mut E,
    ) -> (TelemetryFrame, bool)
    where
        B: Board,
        N: NetworkPort,
        K: BrokerPort,
        E: EventSink,
    {
        let relay_on = board.relay_on();
        let frame = self.hub.read_frame(board, relay_on);
        let published = self.publisher.publish_frame(net, broker, board, &frame).is_ok();
        sink.emit(&AppEvent::Telemetry {
            frame: frame.clone(),
            published,
        });
        (frame, published)
    }

    /// Synced clock, battery above the enable floor, hour inside the window.
    fn pump_allowed<B: Board>(&self, synced: bool, frame: &TelemetryFrame, board: &B) -> bool {
        synced
            && frame.battery_volts() > self.pump_enable_floor
            && self.window.contains(board.now())
    }

    fn pump_cycle<B, N, K, E>(
        &self,
        board: &mut B,
        net: &mut N,
        broker: &mut K,
        sink: &mut E,
    ) -> (PumpExit, u32)
    where
        B: Board,
        N: NetworkPort,
        K: BrokerPort,
        E: EventSink,
    {
        board.set_relay(true);
        sink.emit(&AppEvent::PumpStarted);
        let mut iterations = 0u32;

        let exit = loop {
            if !self.window.contains(board.now()) {
                break PumpExit::WindowClosed;
            }
            iterations += 1;
            let (frame, published) = self.read_and_publish(board, net, broker, sink);
            if !published {
                warn!("Publish failed during pump cycle, forcing power-down");
                sink.emit(&AppEvent::PumpStopped {
                    exit: PumpExit::PublishFailed,
                    iterations,
                });
                return (PumpExit::PublishFailed, iterations);
            }
            if frame.battery_volts() < self.low_voltage_cutoff {
                warn!("Low voltage cut-off at {} V", frame.battery());
                break PumpExit::LowVoltage;
            }
            self.sleep_fed(board, self.pump_interval_ms);
        };

        board.set_relay(false);
        sink.emit(&AppEvent::PumpStopped { exit, iterations });
        (exit, iterations)
    }

    /// Sleep `ms`, feeding the watchdog at least once per half timeout.
    fn sleep_fed<B: Board>(&self, board: &mut B, ms: u32) {
        let mut remaining = ms;
        while remaining > 0 {
            let slice = remaining.min(self.watchdog_slice_ms);
            board.sleep_ms(slice);
            board.feed_watchdog();
            remaining -= slice;
        }
    }

    fn power_down<B: Board, E: EventSink>(&self, board: &mut B, sink: &mut E) {
        board.set_relay(false);
        sink.emit(&AppEvent::PowerDown {
            sleep_ms: self.sleep_duration_ms,
        });
        board.sleep_ms(self.pre_sleep_ms);
        board.deep_sleep(self.sleep_duration_ms);
    }
}
