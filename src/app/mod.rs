//! Application core boundary: the port traits the field controller runs
//! against and the structured events it emits.
//!
//! All interaction with hardware and the network happens through the
//! **port traits** in [`ports`], keeping the control sequence fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
