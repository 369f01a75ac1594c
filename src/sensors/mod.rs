//! Sensor subsystem: per-channel conversions and the aggregating [`SensorHub`].
//!
//! Every channel is sampled the same way: `sample_count` raw reads spaced
//! by `sample_delay_ms`, reduced with [`filter::trimmed_mean`], then
//! converted.  The hub turns one pass over all channels into a
//! [`TelemetryFrame`].

pub mod battery;
pub mod capacitive;
pub mod filter;

use log::{debug, warn};

use crate::app::ports::{SensorPort, SystemPort};
use crate::config::{Calibration, SystemConfig};
use crate::error::SensorError;
use crate::telemetry::TelemetryFrame;
use battery::BatteryScale;
use filter::trimmed_mean;

/// Sampling parameters shared by all channels, plus per-channel calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPlan {
    pub sample_count: usize,
    pub sample_delay_ms: u32,
    /// Wait between starting a one-wire conversion and reading it.
    pub temp_settle_ms: u32,
    pub soil: Calibration,
    pub rain: Calibration,
    pub battery: BatteryScale,
}

impl SamplingPlan {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            sample_count: cfg.sample_count,
            sample_delay_ms: cfg.sample_delay_ms,
            temp_settle_ms: cfg.temp_settle_ms,
            soil: cfg.soil,
            rain: cfg.rain,
            battery: BatteryScale {
                correction: cfg.battery_adc_correction,
                divider_ratio: cfg.battery_divider_ratio,
                invalid_below: cfg.battery_invalid_below,
            },
        }
    }
}

pub struct SensorHub {
    plan: SamplingPlan,
}

impl SensorHub {
    pub fn new(plan: SamplingPlan) -> Self {
        Self { plan }
    }

    /// Read every channel into a fresh frame.
    ///
    /// The watchdog is fed before and after the pass.  A failure on any
    /// channel discards the partial readings and yields
    /// [`TelemetryFrame::fallback`].
    pub fn read_frame<B>(&self, board: &mut B, relay_on: bool) -> TelemetryFrame
    where
        B: SensorPort + SystemPort,
    {
        board.feed_watchdog();
        let frame = match self.acquire(board, relay_on) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Sensor acquisition failed ({}), reporting fallback frame", e);
                TelemetryFrame::fallback()
            }
        };
        board.feed_watchdog();
        frame
    }

    fn acquire<B>(&self, board: &mut B, relay_on: bool) -> Result<TelemetryFrame, SensorError>
    where
        B: SensorPort + SystemPort,
    {
        let battery = self.read_battery(board)?;
        let temp = self.read_temperature(board)?;
        let soil = self.read_wetness(board, &self.plan.soil, B::soil_raw)?;
        let rain = self.read_wetness(board, &self.plan.rain, B::rain_raw)?;
        debug!(
            "Sensors: battery={:.2} temp={:.2} soil={:.2} rain={:.2}",
            battery, temp, soil, rain
        );
        Ok(TelemetryFrame::from_readings(battery, temp, soil, rain, relay_on))
    }

    /// Pack voltage; 0 when the tap reads below the plausibility floor.
    pub fn read_battery<B>(&self, board: &mut B) -> Result<f32, SensorError>
    where
        B: SensorPort + SystemPort,
    {
        let scale = self.plan.battery;
        let volts = self.sample(board, |b| b.battery_microvolts().map(|uv| scale.pack_volts(uv)))?;
        Ok(scale.validate(volts))
    }

    /// Probe temperature in °C.  Each sample runs its own conversion.
    pub fn read_temperature<B>(&self, board: &mut B) -> Result<f32, SensorError>
    where
        B: SensorPort + SystemPort,
    {
        let settle = self.plan.temp_settle_ms;
        self.sample(board, |b| {
            b.start_temperature_conversion()?;
            b.sleep_ms(settle);
            b.read_temperature()
        })
    }

    fn read_wetness<B>(
        &self,
        board: &mut B,
        cal: &Calibration,
        read: fn(&mut B) -> Result<u16, SensorError>,
    ) -> Result<f32, SensorError>
    where
        B: SensorPort + SystemPort,
    {
        let filtered = self.sample(board, |b| read(b).map(f32::from))?;
        Ok(capacitive::wetness_percent(filtered, cal))
    }

    fn sample<B, F>(&self, board: &mut B, mut read: F) -> Result<f32, SensorError>
    where
        B: SystemPort,
        F: FnMut(&mut B) -> Result<f32, SensorError>,
    {
        let mut samples = Vec::with_capacity(self.plan.sample_count);
        for _ in 0..self.plan.sample_count {
            samples.push(read(board)?);
            board.sleep_ms(self.plan.sample_delay_ms);
        }
        trimmed_mean(&samples)
    }
}
