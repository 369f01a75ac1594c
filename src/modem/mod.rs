//! SIM800 cellular modem.
//!
//! - [`command`]: the AT command table
//! - [`engine`]: one-command-at-a-time request/response engine
//! - [`session`]: modem lifecycle (init, GPRS bearer, HTTP, PPP)
//! - [`link`]: the session behind the application's network port

pub mod command;
pub mod control;
pub mod engine;
pub mod http;
pub mod link;
pub mod ppp;
pub mod response;
pub mod session;
pub mod transport;

pub use command::AtCommand;
pub use control::{ControlPins, ModemControl};
pub use engine::{AtEngine, CommandOutcome, Terminal};
pub use http::{HttpMethod, HttpResponse};
pub use link::{CellularLink, LinkSettings};
pub use ppp::{PppAuth, PppCredentials, PppLink};
pub use response::{IpAddr, Operator};
pub use session::{Modem, ModemSettings, SessionState, Teardown};
pub use transport::LineTransport;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators for modem unit tests.

    use std::collections::VecDeque;

    use embedded_hal::delay::DelayNs;

    use super::control::ModemControl;
    use super::ppp::{PppCredentials, PppLink};
    use super::transport::LineTransport;
    use crate::error::{ConnectivityError, ModemError};

    /// Replays a fixed list of reads; `None` is an idle poll.  Once the
    /// script runs out every read is idle.
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: VecDeque<Option<String>>,
        pub written: Vec<String>,
    }

    impl ScriptedTransport {
        pub fn new(lines: &[Option<&str>]) -> Self {
            Self {
                script: lines.iter().map(|l| l.map(str::to_owned)).collect(),
                written: Vec::new(),
            }
        }

        /// Script made of received lines only.
        pub fn replies(lines: &[&str]) -> Self {
            Self {
                script: lines.iter().map(|l| Some((*l).to_owned())).collect(),
                written: Vec::new(),
            }
        }

        /// Written command lines without their CRLF.
        pub fn sent(&self) -> Vec<&str> {
            self.written.iter().map(|w| w.trim_end_matches("\r\n")).collect()
        }
    }

    impl LineTransport for ScriptedTransport {
        fn write_all(&mut self, data: &[u8]) -> Result<(), ModemError> {
            self.written.push(String::from_utf8_lossy(data).into_owned());
            Ok(())
        }

        fn read_line(&mut self) -> Result<Option<String>, ModemError> {
            Ok(self.script.pop_front().flatten())
        }
    }

    /// Records requested delays without sleeping.
    #[derive(Default)]
    pub struct CountingDelay {
        pub calls: u32,
        pub total_ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.total_ms += ms;
        }
    }

    #[derive(Default)]
    pub struct RecordingControl {
        pub idle_sets: u32,
        pub power: Vec<bool>,
    }

    impl ModemControl for RecordingControl {
        fn set_idle_levels(&mut self) {
            self.idle_sets += 1;
        }

        fn set_power(&mut self, on: bool) {
            self.power.push(on);
        }
    }

    /// PPP negotiator that comes up after `polls_until_up` status checks.
    #[derive(Default)]
    pub struct FakePpp {
        pub activations: u32,
        pub deactivations: u32,
        pub fail_activate: bool,
        pub polls_until_up: u32,
        pub active: bool,
        polls: core::cell::Cell<u32>,
    }

    impl FakePpp {
        pub fn up_after(polls: u32) -> Self {
            Self {
                polls_until_up: polls,
                ..Self::default()
            }
        }
    }

    impl<T> PppLink<T> for FakePpp {
        fn activate(
            &mut self,
            _transport: &mut T,
            _credentials: &PppCredentials<'_>,
        ) -> Result<(), ConnectivityError> {
            if self.fail_activate {
                return Err(ConnectivityError::PppFailed);
            }
            self.activations += 1;
            self.active = true;
            self.polls.set(0);
            Ok(())
        }

        fn deactivate(&mut self) {
            self.deactivations += 1;
            self.active = false;
        }

        fn is_connected(&self) -> bool {
            if !self.active {
                return false;
            }
            let seen = self.polls.get();
            self.polls.set(seen + 1);
            seen >= self.polls_until_up
        }
    }
}
