//! Modem-side HTTP client types and the scoped HTTP context.
//!
//! The SIM800 keeps one HTTP context (`AT+HTTPINIT` … `AT+HTTPTERM`).
//! [`HttpContext`] owns it for the length of one request: `close()` ends
//! it on the success path, and dropping an open context sends
//! `AT+HTTPTERM` as well, so every early return releases it.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use super::command::AtCommand;
use super::engine::AtEngine;
use super::transport::LineTransport;
use crate::error::ModemError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
}

pub(crate) struct HttpContext<'a, T: LineTransport, D: DelayNs> {
    engine: &'a mut AtEngine<T, D>,
    open: bool,
}

impl<'a, T: LineTransport, D: DelayNs> HttpContext<'a, T, D> {
    /// Run `AT+HTTPINIT`.  A failed init still gets a closing `AT+HTTPTERM`.
    pub(crate) fn open(engine: &'a mut AtEngine<T, D>) -> Result<Self, ModemError> {
        let mut ctx = Self { engine, open: true };
        debug!("Http request: inithttp");
        ctx.execute(&AtCommand::InitHttp)?;
        Ok(ctx)
    }

    pub(crate) fn execute(&mut self, cmd: &AtCommand<'_>) -> Result<String, ModemError> {
        self.engine.execute(cmd)
    }

    pub(crate) fn execute_with(
        &mut self,
        cmd: &AtCommand<'_>,
        clean_output: bool,
    ) -> Result<String, ModemError> {
        self.engine.execute_with(cmd, clean_output)
    }

    /// End the context, reporting a failed `AT+HTTPTERM`.
    pub(crate) fn close(mut self) -> Result<(), ModemError> {
        self.open = false;
        debug!("Http request: closehttp");
        self.engine.execute(&AtCommand::CloseHttp).map(|_| ())
    }
}

impl<T: LineTransport, D: DelayNs> Drop for HttpContext<'_, T, D> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(e) = self.engine.execute(&AtCommand::CloseHttp) {
            warn!("Http request: closehttp on abort failed: {}", e);
        }
    }
}
