//! Board drivers: ADC and GPIO setup, the pump relay, the temperature
//! probe, the task watchdog and deep sleep.

pub mod hw_init;
pub mod power;
pub mod relay;
pub mod thermometer;
pub mod watchdog;
