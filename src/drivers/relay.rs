//! Pump relay driver.
//!
//! A single digital output: HIGH closes the relay and runs the pump.  The
//! pin is driven low by `hw_init` at boot, and this driver starts in the
//! matching state.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO via hw_init helpers.
//! On host/test: the level lands in a simulation atomic.

use log::debug;

use crate::drivers::hw_init;
use crate::pins;

pub struct RelayDriver {
    on: bool,
}

impl Default for RelayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayDriver {
    pub fn new() -> Self {
        Self { on: false }
    }

    pub fn set(&mut self, on: bool) {
        if on != self.on {
            debug!("Relay {}", if on { "closed" } else { "open" });
        }
        hw_init::gpio_write(pins::RELAY_GPIO, on);
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
