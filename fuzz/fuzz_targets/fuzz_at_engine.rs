//! Fuzz target: `AtEngine::exchange`
//!
//! Splits the input into modem lines and replays them as the answer to a
//! command.  The engine must always finish (terminator, ERROR or idle
//! timeout) without panicking, and never read past the script.
//!
//! cargo fuzz run fuzz_at_engine

#![no_main]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use libfuzzer_sys::fuzz_target;
use pumpstation::error::ModemError;
use pumpstation::modem::{AtCommand, AtEngine, LineTransport};

struct Replay {
    lines: VecDeque<String>,
}

impl LineTransport for Replay {
    fn write_all(&mut self, _data: &[u8]) -> Result<(), ModemError> {
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, ModemError> {
        Ok(self.lines.pop_front())
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let text = String::from_utf8_lossy(rest);
    let lines: VecDeque<String> = text
        .split_inclusive('\n')
        .map(|l| l.replace('\n', "\r\n"))
        .collect();
    let fed = lines.len();
    let total: usize = lines.iter().map(String::len).sum();

    let cmd = match selector % 5 {
        0 => AtCommand::ModemInfo,
        1 => AtCommand::GetBearer,
        2 => AtCommand::DoGet,
        3 => AtCommand::GetData,
        _ => AtCommand::PppConnect,
    };

    let mut engine = AtEngine::new(Replay { lines }, NoDelay, 0);
    match engine.exchange(&cmd) {
        Ok(outcome) => assert!(outcome.output.len() <= total),
        Err(ModemError::Timeout { budget, .. }) => assert_eq!(budget, cmd.timeout_polls()),
        Err(_) => {}
    }
    assert!(engine.transport().lines.len() <= fed);
});
