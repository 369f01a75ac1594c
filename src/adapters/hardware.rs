//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the relay, the temperature probe, the watchdog and the RTC, and
//! exposes them (plus the ADC channels from `hw_init`) through the board
//! ports.  This is the only module in the system that touches actual
//! hardware.  On non-espidf targets the underlying drivers use cfg-gated
//! simulation stubs.

use std::time::Duration;

use crate::adapters::time::RtcClock;
use crate::app::ports::{ActuatorPort, ClockPort, SensorPort, SystemPort};
use crate::drivers::hw_init::{self, AnalogChannel};
use crate::drivers::power;
use crate::drivers::relay::RelayDriver;
use crate::drivers::thermometer::Thermometer;
use crate::drivers::watchdog::Watchdog;
use crate::error::SensorError;
use crate::time_sync::RtcDateTime;

/// Concrete adapter that combines all on-board hardware behind port traits.
pub struct HardwareAdapter<T> {
    relay: RelayDriver,
    thermometer: T,
    watchdog: Watchdog,
    clock: RtcClock,
}

impl<T: Thermometer> HardwareAdapter<T> {
    pub fn new(relay: RelayDriver, thermometer: T, watchdog: Watchdog, clock: RtcClock) -> Self {
        Self {
            relay,
            thermometer,
            watchdog,
            clock,
        }
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<T: Thermometer> SensorPort for HardwareAdapter<T> {
    fn battery_microvolts(&mut self) -> Result<u32, SensorError> {
        hw_init::battery_microvolts()
    }

    fn start_temperature_conversion(&mut self) -> Result<(), SensorError> {
        self.thermometer.start_conversion()
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.thermometer.read_celsius()
    }

    fn soil_raw(&mut self) -> Result<u16, SensorError> {
        hw_init::adc_read(AnalogChannel::Soil)
    }

    fn rain_raw(&mut self) -> Result<u16, SensorError> {
        hw_init::adc_read(AnalogChannel::Rain)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<T> ActuatorPort for HardwareAdapter<T> {
    fn set_relay(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn relay_on(&self) -> bool {
        self.relay.is_on()
    }
}

// ── Clock and system ports ────────────────────────────────────

impl<T> ClockPort for HardwareAdapter<T> {
    fn now(&self) -> Option<RtcDateTime> {
        self.clock.now()
    }

    fn set(&mut self, now: &RtcDateTime) {
        self.clock.set(now);
    }
}

impl<T> SystemPort for HardwareAdapter<T> {
    fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn deep_sleep(&mut self, ms: u32) {
        self.relay.set(false);
        power::enter_deep_sleep(ms);
    }
}
