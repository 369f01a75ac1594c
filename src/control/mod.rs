//! Field control: the once-per-boot sequence and the pump cycle.

pub mod controller;
pub mod window;

pub use controller::{BootReport, FieldController, PumpExit};
pub use window::ControlWindow;
