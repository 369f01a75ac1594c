//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FieldController (domain)
//! ```
//!
//! Driven adapters (ADC and one-wire sensors, the relay, the RTC, the
//! cellular link, the MQTT client, the time service) implement these
//! traits.  The [`FieldController`](crate::control::FieldController)
//! consumes them via generics, so the control sequence never touches
//! hardware directly and runs unchanged against the host mocks.

use crate::error::{ConnectivityError, PublishError, Result, SensorError};
use crate::time_sync::{NTP_PACKET_LEN, RtcDateTime};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw single-sample primitives.  Filtering and calibration happen in
/// [`crate::sensors`]; adapters only report what the hardware returned.
pub trait SensorPort {
    /// One battery divider sample at the ADC pin, in microvolts.
    fn battery_microvolts(&mut self) -> core::result::Result<u32, SensorError>;

    /// Start a one-wire temperature conversion on every probe.
    fn start_temperature_conversion(&mut self) -> core::result::Result<(), SensorError>;

    /// Read the last converted temperature in °C.
    fn read_temperature(&mut self) -> core::result::Result<f32, SensorError>;

    /// One raw soil-moisture ADC sample.
    fn soil_raw(&mut self) -> core::result::Result<u16, SensorError>;

    /// One raw rain-sensor ADC sample.
    fn rain_raw(&mut self) -> core::result::Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The pump relay.
pub trait ActuatorPort {
    fn set_relay(&mut self, on: bool);

    fn relay_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock and system ports
// ───────────────────────────────────────────────────────────────

/// Battery-backed real-time clock; the only state that survives deep sleep.
pub trait ClockPort {
    /// Current local time, or `None` if the clock was never set.
    fn now(&self) -> Option<RtcDateTime>;

    fn set(&mut self, now: &RtcDateTime);
}

/// Watchdog, blocking delays and the low-power exit.
pub trait SystemPort {
    fn feed_watchdog(&mut self);

    /// Block the control flow for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Enter deep sleep for `ms`.  On hardware this does not return; the
    /// device restarts from boot on wake.
    fn deep_sleep(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Network ports
// ───────────────────────────────────────────────────────────────

/// The cellular data link.
pub trait NetworkPort {
    /// Initialise the modem and bring the data link up.
    fn bring_up(&mut self) -> Result<()>;

    /// Whether the data link can carry traffic right now.
    fn is_online(&self) -> bool;

    /// Hard recovery after a failed bring-up (modem power cycle).
    fn recover(&mut self);
}

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// Telemetry broker session.
pub trait BrokerPort {
    fn connect(&mut self) -> core::result::Result<(), PublishError>;

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> core::result::Result<(), PublishError>;
}

/// Network time service; one request/response exchange per call.
pub trait TimeSourcePort {
    fn query(
        &mut self,
        request: &[u8; NTP_PACKET_LEN],
    ) -> core::result::Result<[u8; NTP_PACKET_LEN], ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Board bundle
// ───────────────────────────────────────────────────────────────

/// Every on-board port in one value, so the controller can hand a single
/// `&mut` to both the sensor path and the relay/clock/watchdog path.
pub trait Board: SensorPort + ActuatorPort + ClockPort + SystemPort {}

impl<T: SensorPort + ActuatorPort + ClockPort + SystemPort> Board for T {}
