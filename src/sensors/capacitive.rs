//! Capacitive probes (soil moisture, rain) calibrated between a dry and a
//! submerged reading.  The probe reads lower the wetter it is.

use crate::config::Calibration;

/// Map a filtered raw value to 0 % (dry) … 100 % (submerged).
pub fn wetness_percent(filtered: f32, cal: &Calibration) -> f32 {
    let air = f32::from(cal.air_raw);
    let water = f32::from(cal.water_raw);
    // An inverted or empty span reads as dry.
    if air <= water {
        return 0.0;
    }
    let clamped = filtered.max(water).min(air);
    (air - clamped) * 100.0 / (air - water)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOIL: Calibration = Calibration {
        water_raw: 324,
        air_raw: 755,
    };

    #[test]
    fn drier_than_air_is_zero() {
        assert_eq!(wetness_percent(900.0, &SOIL), 0.0);
        assert_eq!(wetness_percent(755.0, &SOIL), 0.0);
    }

    #[test]
    fn wetter_than_water_is_hundred() {
        assert_eq!(wetness_percent(100.0, &SOIL), 100.0);
    }

    #[test]
    fn inverted_calibration_reads_dry() {
        let inverted = Calibration {
            water_raw: 755,
            air_raw: 324,
        };
        assert_eq!(wetness_percent(500.0, &inverted), 0.0);
        let flat = Calibration {
            water_raw: 500,
            air_raw: 500,
        };
        assert_eq!(wetness_percent(500.0, &flat), 0.0);
    }

    #[test]
    fn midpoint_is_fifty() {
        let mid = (755.0 + 324.0) / 2.0;
        assert!((wetness_percent(mid, &SOIL) - 50.0).abs() < 1e-3);
    }
}
