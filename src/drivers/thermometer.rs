//! DS18B20 one-wire temperature probe.
//!
//! The bus is scanned lazily for the first device with the DS18B20 family
//! code; a failed transaction forgets the address so the next read
//! rescans.  Conversion is started for every device on the bus at once.

use crate::error::SensorError;

/// A temperature probe with a separate conversion step.
pub trait Thermometer {
    fn start_conversion(&mut self) -> Result<(), SensorError>;

    /// Result of the last conversion, °C.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ── ESP-IDF implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use ds18b20::Ds18b20;
    use esp_idf_hal::delay::Ets;
    use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull};
    use log::{info, warn};
    use one_wire_bus::{Address, OneWire};

    use super::Thermometer;
    use crate::error::SensorError;

    pub struct Ds18b20Probe {
        bus: OneWire<PinDriver<'static, AnyIOPin, InputOutput>>,
        address: Option<Address>,
        delay: Ets,
    }

    impl Ds18b20Probe {
        pub fn new(pin: AnyIOPin) -> Result<Self, SensorError> {
            let mut line =
                PinDriver::input_output_od(pin).map_err(|_| SensorError::OneWireFailed)?;
            line.set_pull(Pull::Up).map_err(|_| SensorError::OneWireFailed)?;
            line.set_high().map_err(|_| SensorError::OneWireFailed)?;
            let bus = OneWire::new(line).map_err(|_| SensorError::OneWireFailed)?;
            Ok(Self { bus, address: None, delay: Ets })
        }

        fn address(&mut self) -> Result<Address, SensorError> {
            if let Some(address) = self.address {
                return Ok(address);
            }
            for found in self.bus.devices(false, &mut self.delay) {
                match found {
                    Ok(address) if address.family_code() == ds18b20::FAMILY_CODE => {
                        info!("DS18B20 found at {:?}", address);
                        self.address = Some(address);
                        return Ok(address);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("one-wire scan failed: {:?}", e);
                        return Err(SensorError::OneWireFailed);
                    }
                }
            }
            Err(SensorError::NoDevice)
        }
    }

    impl Thermometer for Ds18b20Probe {
        fn start_conversion(&mut self) -> Result<(), SensorError> {
            self.address()?;
            ds18b20::start_simultaneous_temp_measurement(&mut self.bus, &mut self.delay)
                .map_err(|e| {
                    warn!("DS18B20 conversion failed: {:?}", e);
                    self.address = None;
                    SensorError::OneWireFailed
                })
        }

        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            let address = self.address()?;
            let probe = Ds18b20::new::<core::convert::Infallible>(address)
                .map_err(|_| SensorError::NoDevice)?;
            match probe.read_data(&mut self.bus, &mut self.delay) {
                Ok(data) => Ok(data.temperature),
                Err(e) => {
                    warn!("DS18B20 read failed: {:?}", e);
                    self.address = None;
                    Err(SensorError::OneWireFailed)
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::Ds18b20Probe;

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_BITS: AtomicU32 = AtomicU32::new(0x41AC_0000); // 21.5
#[cfg(not(target_os = "espidf"))]
static SIM_PROBE_PRESENT: AtomicBool = AtomicBool::new(true);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temperature(celsius: f32) {
    SIM_TEMP_BITS.store(celsius.to_bits(), Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_probe_present(present: bool) {
    SIM_PROBE_PRESENT.store(present, Ordering::Relaxed);
}

/// Probe backed by the simulation atomics.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimThermometer {
    converting: bool,
}

#[cfg(not(target_os = "espidf"))]
impl Thermometer for SimThermometer {
    fn start_conversion(&mut self) -> Result<(), SensorError> {
        if !SIM_PROBE_PRESENT.load(Ordering::Relaxed) {
            return Err(SensorError::NoDevice);
        }
        self.converting = true;
        Ok(())
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        if !SIM_PROBE_PRESENT.load(Ordering::Relaxed) {
            return Err(SensorError::NoDevice);
        }
        if !core::mem::take(&mut self.converting) {
            return Err(SensorError::OneWireFailed);
        }
        Ok(f32::from_bits(SIM_TEMP_BITS.load(Ordering::Relaxed)))
    }
}
