//! Telemetry frame and its MQTT topic layout.
//!
//! One frame per control cycle, one topic per channel:
//! `telemetry/pump/{battery,temp,soil,rain,relay}`.  Payloads are decimal
//! strings with two places; the relay is `0` or `1`.

pub mod publisher;

use core::fmt::{self, Write};

use heapless::String;

pub use publisher::{PublishPolicy, TelemetryPublisher};

pub const TOPIC_PREFIX: &str = "telemetry/pump/";

/// A formatted channel value.
pub type Reading = String<48>;

pub type Topic = String<32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Battery,
    Temp,
    Soil,
    Rain,
    Relay,
}

impl Channel {
    /// Publication order.
    pub const ALL: [Channel; 5] = [
        Channel::Battery,
        Channel::Temp,
        Channel::Soil,
        Channel::Rain,
        Channel::Relay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Temp => "temp",
            Self::Soil => "soil",
            Self::Rain => "rain",
            Self::Relay => "relay",
        }
    }

    pub fn topic(self) -> Topic {
        let mut topic = Topic::new();
        let _ = write!(topic, "{}{}", TOPIC_PREFIX, self.name());
        topic
    }
}

/// Immutable snapshot of one sensor pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryFrame {
    battery: Reading,
    temp: Reading,
    soil: Reading,
    rain: Reading,
    relay: Reading,
}

fn two_places(value: f32) -> Reading {
    let mut s = Reading::new();
    let _ = write!(s, "{:.2}", value);
    s
}

fn literal(value: &str) -> Reading {
    let mut s = Reading::new();
    let _ = s.push_str(value);
    s
}

impl TelemetryFrame {
    pub fn from_readings(battery: f32, temp: f32, soil: f32, rain: f32, relay_on: bool) -> Self {
        Self {
            battery: two_places(battery),
            temp: two_places(temp),
            soil: two_places(soil),
            rain: two_places(rain),
            relay: literal(if relay_on { "1" } else { "0" }),
        }
    }

    /// Placeholder reported when acquisition failed: every channel `0`.
    pub fn fallback() -> Self {
        Self {
            battery: literal("0"),
            temp: literal("0"),
            soil: literal("0"),
            rain: literal("0"),
            relay: literal("0"),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    pub fn get(&self, channel: Channel) -> &str {
        match channel {
            Channel::Battery => self.battery.as_str(),
            Channel::Temp => self.temp.as_str(),
            Channel::Soil => self.soil.as_str(),
            Channel::Rain => self.rain.as_str(),
            Channel::Relay => self.relay.as_str(),
        }
    }

    pub fn battery(&self) -> &str {
        &self.battery
    }

    pub fn temp(&self) -> &str {
        &self.temp
    }

    pub fn soil(&self) -> &str {
        &self.soil
    }

    pub fn rain(&self) -> &str {
        &self.rain
    }

    pub fn relay(&self) -> &str {
        &self.relay
    }

    /// Channels in publication order with their payloads.
    pub fn entries(&self) -> impl Iterator<Item = (Channel, &str)> {
        Channel::ALL.into_iter().map(move |ch| (ch, self.get(ch)))
    }

    /// Battery voltage as reported; an unparsable value counts as 0 V.
    pub fn battery_volts(&self) -> f32 {
        self.battery.parse().unwrap_or(0.0)
    }
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "battery={} temp={} soil={} rain={} relay={}",
            self.battery, self.temp, self.soil, self.rain, self.relay
        )
    }
}
