//! Modem control lines (power key, reset, power enable).
//!
//! The SIM800 board exposes three outputs.  At idle the power key is held
//! low, reset is released (high) and the supply is enabled (high).  Cutting
//! the supply is the recovery of last resort for a wedged modem.

use embedded_hal::digital::OutputPin;
use log::warn;

pub trait ModemControl {
    /// Drive every control line to its idle level.
    fn set_idle_levels(&mut self);

    /// Switch the modem supply.
    fn set_power(&mut self, on: bool);
}

/// Control lines on GPIO outputs; a board without a line passes `None`.
pub struct ControlPins<O> {
    power_key: Option<O>,
    reset: Option<O>,
    power_on: Option<O>,
}

impl<O: OutputPin> ControlPins<O> {
    pub fn new(power_key: Option<O>, reset: Option<O>, power_on: Option<O>) -> Self {
        Self {
            power_key,
            reset,
            power_on,
        }
    }
}

fn drive<O: OutputPin>(pin: Option<&mut O>, high: bool, name: &str) {
    let Some(pin) = pin else { return };
    let result = if high { pin.set_high() } else { pin.set_low() };
    if result.is_err() {
        warn!("Modem: failed to drive {} {}", name, if high { "high" } else { "low" });
    }
}

impl<O: OutputPin> ModemControl for ControlPins<O> {
    fn set_idle_levels(&mut self) {
        drive(self.power_key.as_mut(), false, "PWKEY");
        drive(self.reset.as_mut(), true, "RST");
        drive(self.power_on.as_mut(), true, "POWER_ON");
    }

    fn set_power(&mut self, on: bool) {
        drive(self.power_on.as_mut(), on, "POWER_ON");
    }
}
