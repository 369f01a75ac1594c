//! Battery pack voltage from the divider tap.

/// Divider scaling and the floor below which the reading is discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryScale {
    /// ADC gain error correction.
    pub correction: f32,
    /// Pack voltage per volt at the tap.
    pub divider_ratio: f32,
    /// Readings under this are a disconnected tap, not a flat pack.
    pub invalid_below: f32,
}

impl BatteryScale {
    /// Pack voltage for one tap sample.
    pub fn pack_volts(&self, tap_microvolts: u32) -> f32 {
        tap_microvolts as f32 / 1_000_000.0 * self.correction * self.divider_ratio
    }

    /// Zero out an implausible filtered voltage.
    pub fn validate(&self, filtered_volts: f32) -> f32 {
        if filtered_volts < self.invalid_below {
            0.0
        } else {
            filtered_volts
        }
    }
}
