//! SIM800 UART as a [`LineTransport`].
//!
//! Bytes are accumulated until a `\n` arrives; a read that sees no complete
//! line within the timeout reports one idle poll and keeps the partial data
//! for the next call.  The driver is shared behind an `Arc` so the PPP
//! adapter can pump the same UART once the modem leaves command mode.

use std::sync::Arc;
use std::time::{Duration, Instant};

use esp_idf_hal::delay::TickType;
use esp_idf_hal::uart::UartDriver;

use crate::error::ModemError;
use crate::modem::LineTransport;

pub struct UartLineTransport {
    uart: Arc<UartDriver<'static>>,
    pending: Vec<u8>,
    timeout: Duration,
}

impl UartLineTransport {
    pub fn new(uart: UartDriver<'static>, timeout_ms: u32) -> Self {
        Self {
            uart: Arc::new(uart),
            pending: Vec::with_capacity(128),
            timeout: Duration::from_millis(u64::from(timeout_ms)),
        }
    }

    /// The underlying driver, for data mode.
    pub fn shared(&self) -> Arc<UartDriver<'static>> {
        Arc::clone(&self.uart)
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl LineTransport for UartLineTransport {
    fn open(&mut self) -> Result<(), ModemError> {
        self.pending.clear();
        self.uart.clear_rx().map_err(|_| ModemError::Transport)
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), ModemError> {
        while !data.is_empty() {
            let n = self.uart.write(data).map_err(|_| ModemError::Transport)?;
            data = &data[n..];
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, ModemError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; 64];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let ticks = TickType::new_millis(remaining.as_millis() as u64).ticks();
            let n = self
                .uart
                .read(&mut chunk, ticks)
                .map_err(|_| ModemError::Transport)?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&chunk[..n]);
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
        }
    }
}
