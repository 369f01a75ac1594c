//! Mock board and services for integration tests.
//!
//! The board keeps a simulated clock that only moves when the controller
//! sleeps, so a whole two-hour pump window runs in microseconds.  Every
//! relay change, watchdog feed and deep-sleep request is recorded for
//! assertions.

use std::collections::VecDeque;

use pumpstation::app::events::AppEvent;
use pumpstation::app::ports::{
    ActuatorPort, BrokerPort, ClockPort, EventSink, NetworkPort, QoS, SensorPort, SystemPort,
    TimeSourcePort,
};
use pumpstation::config::SystemConfig;
use pumpstation::error::{ConnectivityError, Error, PublishError, Result, SensorError};
use pumpstation::time_sync::{NTP_PACKET_LEN, RtcDateTime};

/// Seconds between the NTP era (1900) and the Unix epoch.
pub const NTP_UNIX_DELTA: u32 = 2_208_988_800;

/// NTP seconds for 2024-06-01 at `hour`:00 UTC.
pub fn ntp_at_utc_hour(hour: u32) -> u32 {
    // 2024-06-01 00:00:00 UTC
    const MIDNIGHT_UNIX: u32 = 1_717_200_000;
    MIDNIGHT_UNIX + NTP_UNIX_DELTA + hour * 3_600
}

// ── MockBoard ────────────────────────────────────────────────

pub struct MockBoard {
    /// Pack voltage reported for each successive sensor frame; the last
    /// entry repeats once the list runs out.
    pub frame_volts: Vec<f32>,
    pub temperature: f32,
    pub soil_raw: u16,
    pub rain_raw: u16,
    pub fail_soil: bool,

    sample_count: usize,
    scale: f32,
    battery_reads: usize,
    converting: bool,

    relay: bool,
    pub relay_history: Vec<bool>,

    /// Simulated milliseconds since boot.
    pub elapsed_ms: u64,
    rtc: Option<(i64, u64)>,

    pub feeds: u32,
    last_feed_ms: u64,
    pub longest_unfed_ms: u64,
    pub deep_sleeps: Vec<u32>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new(cfg: &SystemConfig, frame_volts: &[f32]) -> Self {
        Self {
            frame_volts: frame_volts.to_vec(),
            temperature: 21.5,
            soil_raw: 540,
            rain_raw: 1023,
            fail_soil: false,
            sample_count: cfg.sample_count,
            scale: cfg.battery_adc_correction * cfg.battery_divider_ratio,
            battery_reads: 0,
            converting: false,
            relay: false,
            relay_history: Vec::new(),
            elapsed_ms: 0,
            rtc: None,
            feeds: 0,
            last_feed_ms: 0,
            longest_unfed_ms: 0,
            deep_sleeps: Vec::new(),
        }
    }

    fn current_volts(&self) -> f32 {
        let frame = self.battery_reads / self.sample_count.max(1);
        self.frame_volts
            .get(frame)
            .or(self.frame_volts.last())
            .copied()
            .unwrap_or(0.0)
    }

    fn note_unfed(&mut self) {
        let gap = self.elapsed_ms - self.last_feed_ms;
        self.longest_unfed_ms = self.longest_unfed_ms.max(gap);
    }
}

impl SensorPort for MockBoard {
    fn battery_microvolts(&mut self) -> core::result::Result<u32, SensorError> {
        let uv = (self.current_volts() / self.scale * 1_000_000.0).round() as u32;
        self.battery_reads += 1;
        Ok(uv)
    }

    fn start_temperature_conversion(&mut self) -> core::result::Result<(), SensorError> {
        self.converting = true;
        Ok(())
    }

    fn read_temperature(&mut self) -> core::result::Result<f32, SensorError> {
        if !std::mem::take(&mut self.converting) {
            return Err(SensorError::OneWireFailed);
        }
        Ok(self.temperature)
    }

    fn soil_raw(&mut self) -> core::result::Result<u16, SensorError> {
        if self.fail_soil {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(self.soil_raw)
    }

    fn rain_raw(&mut self) -> core::result::Result<u16, SensorError> {
        Ok(self.rain_raw)
    }
}

impl ActuatorPort for MockBoard {
    fn set_relay(&mut self, on: bool) {
        if on != self.relay {
            self.relay_history.push(on);
        }
        self.relay = on;
    }

    fn relay_on(&self) -> bool {
        self.relay
    }
}

impl ClockPort for MockBoard {
    fn now(&self) -> Option<RtcDateTime> {
        let (base, set_at) = self.rtc?;
        let secs = ((self.elapsed_ms - set_at) / 1_000) as i64;
        RtcDateTime::from_unix(base + secs)
    }

    fn set(&mut self, now: &RtcDateTime) {
        self.rtc = now.to_unix().map(|unix| (unix, self.elapsed_ms));
    }
}

impl SystemPort for MockBoard {
    fn feed_watchdog(&mut self) {
        self.note_unfed();
        self.feeds += 1;
        self.last_feed_ms = self.elapsed_ms;
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }

    fn deep_sleep(&mut self, ms: u32) {
        self.note_unfed();
        self.deep_sleeps.push(ms);
    }
}

// ── Network ──────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedNetwork {
    pub fail_bring_up: bool,
    pub online: bool,
    pub bring_ups: u32,
    pub recovers: u32,
}

impl NetworkPort for ScriptedNetwork {
    fn bring_up(&mut self) -> Result<()> {
        self.bring_ups += 1;
        if self.fail_bring_up {
            return Err(Error::Connectivity(ConnectivityError::PppTimeout));
        }
        self.online = true;
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.online
    }

    fn recover(&mut self) {
        self.recovers += 1;
        self.online = false;
    }
}

// ── Broker ───────────────────────────────────────────────────

/// Accepts publishes until `fail_from` of them went out, then rejects
/// every later one.
#[derive(Default)]
pub struct ScriptedBroker {
    pub fail_from: Option<usize>,
    pub connects: u32,
    pub published: Vec<(String, String)>,
    pub rejected: u32,
}

#[allow(dead_code)]
impl ScriptedBroker {
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_from: Some(count),
            ..Self::default()
        }
    }

    pub fn payloads(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl BrokerPort for ScriptedBroker {
    fn connect(&mut self) -> core::result::Result<(), PublishError> {
        self.connects += 1;
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> core::result::Result<(), PublishError> {
        assert_eq!(qos, QoS::AtLeastOnce);
        if self.fail_from.is_some_and(|n| self.published.len() >= n) {
            self.rejected += 1;
            return Err(PublishError::Rejected);
        }
        self.published.push((
            topic.to_owned(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        Ok(())
    }
}

// ── Time source ──────────────────────────────────────────────

/// Answers with the queued NTP seconds, one per query; an empty queue
/// means the service is unreachable.
#[derive(Default)]
pub struct FakeTimeSource {
    answers: VecDeque<u32>,
    pub queries: u32,
}

impl FakeTimeSource {
    pub fn answering(ntp_seconds: u32) -> Self {
        Self {
            answers: VecDeque::from([ntp_seconds]),
            queries: 0,
        }
    }
}

impl TimeSourcePort for FakeTimeSource {
    fn query(
        &mut self,
        request: &[u8; NTP_PACKET_LEN],
    ) -> core::result::Result<[u8; NTP_PACKET_LEN], ConnectivityError> {
        assert_eq!(request[0], 0x1B);
        self.queries += 1;
        let seconds = self
            .answers
            .pop_front()
            .ok_or(ConnectivityError::TimeServiceUnreachable)?;
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        Ok(packet)
    }
}

// ── Events ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Telemetry { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
