//! AT command engine.
//!
//! Runs exactly one command at a time against a [`LineTransport`]: write
//! the command line, then read lines until the command's terminator, an
//! `ERROR` line, or the idle-poll budget runs out.
//!
//! ## Terminal detection
//!
//! | Line                                   | Result                         |
//! |----------------------------------------|--------------------------------|
//! | `ERROR\r\n`                            | `ModemError::Generic`          |
//! | `<terminator>\r\n`                     | exact stop                     |
//! | starts with `<terminator>` after `\r\n`| prefixed stop, line is output  |
//! | anything else                          | accumulated                    |
//!
//! The timeout counts idle polls only.  Lines that arrive in between do
//! not reset the counter, so a chatty modem still times out on its gaps.

use embedded_hal::delay::DelayNs;
use log::debug;

use super::command::AtCommand;
use super::transport::LineTransport;
use crate::error::ModemError;

/// Length-prefix header the modem puts in front of an HTTP body.
const HTTPREAD_HEADER: &str = "+HTTPREAD:";
const ERROR_LINE: &str = "ERROR\r\n";
const BLANK_LINE: &str = "\r\n";

/// How a command's response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// A line equal to the terminator.
    Exact,
    /// A terminator carrying payload, e.g. `+HTTPACTION: 0,200,123`.
    Prefixed,
}

/// Raw accumulated response of one command, before echo stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub output: String,
    pub terminal: Terminal,
}

pub struct AtEngine<T, D> {
    transport: T,
    delay: D,
    poll_interval_ms: u32,
}

impl<T: LineTransport, D: DelayNs> AtEngine<T, D> {
    pub fn new(transport: T, delay: D, poll_interval_ms: u32) -> Self {
        Self {
            transport,
            delay,
            poll_interval_ms,
        }
    }

    /// Run `cmd` and return its cleaned output.
    pub fn execute(&mut self, cmd: &AtCommand<'_>) -> Result<String, ModemError> {
        self.execute_with(cmd, true)
    }

    /// Run `cmd`; with `clean_output` off, embedded `\r` and blank-line
    /// artifacts are kept (HTTP bodies).
    pub fn execute_with(
        &mut self,
        cmd: &AtCommand<'_>,
        clean_output: bool,
    ) -> Result<String, ModemError> {
        let line = cmd.render();
        let outcome = self.exchange_line(cmd, &line)?;
        let output = post_process(&outcome.output, &line, clean_output);
        debug!("Returning {:?}", output);
        Ok(output)
    }

    /// Run `cmd` and return the raw outcome with its terminal kind.
    pub fn exchange(&mut self, cmd: &AtCommand<'_>) -> Result<CommandOutcome, ModemError> {
        let line = cmd.render();
        self.exchange_line(cmd, &line)
    }

    fn exchange_line(
        &mut self,
        cmd: &AtCommand<'_>,
        line: &str,
    ) -> Result<CommandOutcome, ModemError> {
        let wire = format!("{line}\r\n");
        debug!("Writing AT command {:?}", wire);
        self.transport.write_all(wire.as_bytes())?;

        let terminator = cmd.terminator();
        let exact = format!("{terminator}{BLANK_LINE}");
        let budget = cmd.timeout_polls();
        let drop_read_header = matches!(cmd, AtCommand::GetData);

        let mut pre_end = true;
        let mut output = String::new();
        let mut idle_polls = 0u32;

        loop {
            let Some(received) = self.transport.read_line()? else {
                self.delay.delay_ms(self.poll_interval_ms);
                idle_polls += 1;
                if idle_polls > budget {
                    return Err(ModemError::Timeout {
                        command: cmd.name(),
                        budget,
                    });
                }
                continue;
            };
            debug!("Read {:?}", received);

            if received == ERROR_LINE {
                return Err(ModemError::Generic { command: cmd.name() });
            }
            if received == exact {
                debug!("Detected exact end");
                return Ok(CommandOutcome {
                    output,
                    terminal: Terminal::Exact,
                });
            }
            if pre_end && received.starts_with(terminator) {
                debug!("Detected prefixed end");
                output.push_str(&received);
                return Ok(CommandOutcome {
                    output,
                    terminal: Terminal::Prefixed,
                });
            }

            pre_end = received == BLANK_LINE;

            if drop_read_header && received.starts_with(HTTPREAD_HEADER) {
                continue;
            }
            output.push_str(&received);
        }
    }

    /// Block for `ms` on the engine's delay provider.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    #[cfg(test)]
    pub(crate) fn delay(&self) -> &D {
        &self.delay
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Strip the command echo and the protocol's trailing CRLF; optionally
/// collapse carriage returns and blank-line artifacts.
fn post_process(raw: &str, command_line: &str, clean_output: bool) -> String {
    let echo = format!("{command_line}\r\r\n");
    let mut out = raw.replace(&echo, "");
    if out.ends_with(BLANK_LINE) {
        out.truncate(out.len() - BLANK_LINE.len());
    }
    if clean_output {
        out = out.replace('\r', "").replace("\n\n", "");
        if out.starts_with('\n') {
            out.remove(0);
        }
        if out.ends_with('\n') {
            out.pop();
        }
    }
    out
}
