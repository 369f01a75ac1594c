//! Line transport abstraction: the modem UART as seen by the AT engine.
//!
//! Concrete implementations:
//! - ESP-IDF UART driver (`adapters::uart`, firmware only)
//! - scripted transports in tests
//!
//! The engine never touches a UART directly, so the whole AT protocol runs
//! on the host against a scripted line sequence.

use crate::error::ModemError;

/// Byte-oriented, line-buffered channel to the modem.
pub trait LineTransport {
    /// Prepare the link (flush stale input).  Called once per initialize.
    fn open(&mut self) -> Result<(), ModemError> {
        Ok(())
    }

    /// Write every byte of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), ModemError>;

    /// Read one line including its trailing `\r\n`.
    ///
    /// Returns `Ok(None)` when the driver's read timeout elapsed with no
    /// complete line; the engine counts that as one idle poll.
    fn read_line(&mut self) -> Result<Option<String>, ModemError>;
}
