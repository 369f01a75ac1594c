//! PumpStation firmware library.
//!
//! Exposes the pure-logic modules (AT engine, modem session, sampling,
//! telemetry, the field controller) for host testing.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod modem;
pub mod pins;
pub mod sensors;
pub mod telemetry;
pub mod time_sync;
