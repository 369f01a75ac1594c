//! GPIO / peripheral pin assignments for the pump station board
//! (ESP32 with a SIM800 module on UART1).
//!
//! Single source of truth: drivers and `main` reference this module rather
//! than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// SIM800 modem
// ---------------------------------------------------------------------------

/// PWRKEY, held low while the modem is powered.
pub const MODEM_PWKEY_GPIO: i32 = 4;
/// RST, held high (released) in normal operation.
pub const MODEM_RST_GPIO: i32 = 5;
/// Supply switch for the modem module.
pub const MODEM_POWER_ON_GPIO: i32 = 23;
pub const MODEM_TX_GPIO: i32 = 26;
pub const MODEM_RX_GPIO: i32 = 27;
pub const MODEM_BAUD: u32 = 9_600;
/// Driver-level read timeout; one expiry counts as one idle poll.
pub const MODEM_READ_TIMEOUT_MS: u32 = 1_000;

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output: HIGH = pump running.
pub const RELAY_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DS18B20 one-wire bus.
pub const ONEWIRE_GPIO: i32 = 0;

/// Capacitive soil probe, ADC2 channel 2.
pub const SOIL_ADC_GPIO: i32 = 2;
/// Rain plate, ADC2 channel 3.
pub const RAIN_ADC_GPIO: i32 = 15;
/// Battery divider tap, ADC2 channel 5.
pub const BATTERY_ADC_GPIO: i32 = 12;

pub const ADC2_CH_SOIL: u32 = 2;
pub const ADC2_CH_RAIN: u32 = 3;
pub const ADC2_CH_BATTERY: u32 = 5;

/// Probe channels use 10-bit readings; calibration points are 0-1023.
pub const PROBE_ADC_BITS: u32 = 10;
