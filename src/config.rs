//! System configuration parameters
//!
//! Every tunable of the irrigation station lives in [`SystemConfig`].  The
//! deployed firmware runs on the compiled-in defaults; an override document
//! can be parsed with [`SystemConfig::from_json`] and is validated before use.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::filter::MIN_SAMPLES;

pub type Host = String<64>;
pub type Credential = String<32>;

/// How the controller gets an IP link out of the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMode {
    /// Hand the UART to the host PPP stack (sockets for MQTT and NTP).
    Ppp,
    /// Open the modem's own GPRS bearer (modem-side HTTP only).
    Bearer,
}

/// Raw ADC calibration of a capacitive probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Raw reading with the probe submerged (maps to 100 %).
    pub water_raw: u16,
    /// Raw reading with the probe dry (maps to 0 %).
    pub air_raw: u16,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Cellular ---
    pub link_mode: LinkMode,
    pub apn: Credential,
    pub apn_user: Credential,
    pub apn_password: Credential,
    /// APN written with AT+CGDCONT before the PPP handover.
    pub ppp_apn: Credential,
    /// One-second polls to wait for the PPP link after CONNECT.
    pub ppp_link_polls: u32,
    /// Sleep between idle UART polls inside the AT engine.
    pub at_poll_interval_ms: u32,
    /// `modeminfo` probes during initialize (first try included).
    pub modem_probe_attempts: u32,
    pub modem_probe_backoff_ms: u32,
    /// `getbear` polls after opening the bearer.
    pub ip_poll_attempts: u32,
    pub modem_power_off_ms: u32,
    pub modem_power_settle_ms: u32,

    // --- Time service ---
    pub ntp_host: Host,
    pub ntp_port: u16,
    pub ntp_timeout_ms: u32,
    /// Fixed offset applied to UTC before it is written to the RTC.
    pub tz_offset_hours: i8,

    // --- Broker ---
    pub broker_host: Host,
    pub broker_port: u16,
    pub broker_user: Credential,
    pub broker_password: Credential,
    pub publish_backoff_ms: u32,

    // --- Control window / power ---
    pub window_start_hour: u8,
    pub window_end_hour: u8,
    /// Pump loop exits below this pack voltage.
    pub low_voltage_cutoff: f32,
    /// Pump cycle only starts above this pack voltage.
    pub pump_enable_floor: f32,
    pub pump_interval_ms: u32,

    // --- Sampling ---
    pub sample_count: usize,
    pub sample_delay_ms: u32,
    pub temp_settle_ms: u32,
    pub soil: Calibration,
    pub rain: Calibration,
    pub battery_adc_correction: f32,
    pub battery_divider_ratio: f32,
    /// Filtered pack voltage below this reads as "0.00" (probe missing).
    pub battery_invalid_below: f32,

    // --- Supervision ---
    pub watchdog_timeout_ms: u32,
    pub sleep_duration_ms: u32,
    pub pre_sleep_ms: u32,
    pub retry_count: u32,
}

/// Copy `s` into a fixed-capacity string, truncating on overflow.
pub(crate) fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Cellular
            link_mode: LinkMode::Ppp,
            apn: fixed("m2m.tele2.com"),
            apn_user: String::new(),
            apn_password: String::new(),
            ppp_apn: fixed("m2m.tele2.com"),
            ppp_link_polls: 25,
            at_poll_interval_ms: 1_000,
            modem_probe_attempts: 3,
            modem_probe_backoff_ms: 3_000,
            ip_poll_attempts: 5,
            modem_power_off_ms: 2_000,
            modem_power_settle_ms: 5_000,

            // Time service
            ntp_host: fixed("se.pool.ntp.org"),
            ntp_port: 123,
            ntp_timeout_ms: 20_000,
            tz_offset_hours: 2, // CEST

            // Broker
            broker_host: String::new(),
            broker_port: 1883,
            broker_user: String::new(),
            broker_password: String::new(),
            publish_backoff_ms: 250,

            // Window / power
            window_start_hour: 17,
            window_end_hour: 18,
            low_voltage_cutoff: 11.7,
            pump_enable_floor: 11.9,
            pump_interval_ms: 240_000, // 4 min

            // Sampling
            sample_count: 10,
            sample_delay_ms: 200,
            temp_settle_ms: 50,
            soil: Calibration { water_raw: 324, air_raw: 755 },
            rain: Calibration { water_raw: 236, air_raw: 1023 },
            battery_adc_correction: 0.975,
            battery_divider_ratio: 7.665,
            battery_invalid_below: 2.0,

            // Supervision
            watchdog_timeout_ms: 900_000, // 15 min
            sleep_duration_ms: 300_000,   // 5 min
            pre_sleep_ms: 3_000,
            retry_count: 5,
        }
    }
}

impl SystemConfig {
    /// Parse an override document and validate it.
    pub fn from_json(doc: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(doc).map_err(|_| Error::Config("malformed config document"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        if self.window_start_hour > 23 || self.window_end_hour > 23 {
            return Err(Error::Config("window hours must be 0-23"));
        }
        if self.window_start_hour > self.window_end_hour {
            return Err(Error::Config("window start after window end"));
        }
        if self.pump_enable_floor <= self.low_voltage_cutoff {
            return Err(Error::Config("pump enable floor must exceed low-voltage cutoff"));
        }
        if self.sample_count < MIN_SAMPLES {
            return Err(Error::Config("sample_count must be at least 5"));
        }
        for cal in [self.soil, self.rain] {
            if cal.air_raw <= cal.water_raw {
                return Err(Error::Config("calibration air point must exceed water point"));
            }
        }
        if self.watchdog_timeout_ms == 0 || self.retry_count == 0 {
            return Err(Error::Config("watchdog timeout and retry count must be non-zero"));
        }
        if self.watchdog_feed_slice_ms() == 0 {
            return Err(Error::Config("watchdog timeout too short to feed"));
        }
        Ok(())
    }

    /// Longest single sleep allowed between two watchdog feeds.
    pub fn watchdog_feed_slice_ms(&self) -> u32 {
        self.watchdog_timeout_ms / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.ntp_host.as_str(), "se.pool.ntp.org");
        assert_eq!(c.sample_count, 10);
    }

    #[test]
    fn floor_above_cutoff_invariant() {
        let c = SystemConfig::default();
        assert!(
            c.pump_enable_floor > c.low_voltage_cutoff,
            "pump must not start at a voltage that immediately trips the cutoff"
        );
    }

    #[test]
    fn pump_interval_fits_inside_watchdog() {
        let c = SystemConfig::default();
        assert!(c.pump_interval_ms < c.watchdog_timeout_ms);
        assert!(c.sleep_duration_ms < c.watchdog_timeout_ms);
    }

    #[test]
    fn rejects_inverted_window() {
        let mut c = SystemConfig::default();
        c.window_start_hour = 19;
        assert_eq!(c.validate(), Err(Error::Config("window start after window end")));
    }

    #[test]
    fn rejects_too_few_samples() {
        let mut c = SystemConfig::default();
        c.sample_count = 4;
        assert!(c.validate().is_err());
    }

    #[test]
    fn json_override_roundtrip() {
        let mut c = SystemConfig::default();
        c.broker_host = fixed("broker.example.net");
        c.window_end_hour = 20;
        let json = serde_json::to_string(&c).unwrap();
        let c2 = SystemConfig::from_json(&json).unwrap();
        assert_eq!(c2.broker_host.as_str(), "broker.example.net");
        assert_eq!(c2.window_end_hour, 20);
        assert_eq!(c2.link_mode, LinkMode::Ppp);
    }

    #[test]
    fn json_override_is_validated() {
        let mut c = SystemConfig::default();
        c.low_voltage_cutoff = 12.5;
        let json = serde_json::to_string(&c).unwrap();
        assert!(SystemConfig::from_json(&json).is_err());
        assert!(SystemConfig::from_json("{not json").is_err());
    }

    #[test]
    fn fixed_truncates_to_capacity() {
        let s: String<4> = fixed("abcdefgh");
        assert_eq!(s.as_str(), "abcd");
    }
}
