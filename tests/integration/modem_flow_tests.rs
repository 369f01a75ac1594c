//! End-to-end modem flows through the public link API: bring-up in both
//! link modes, modem-side HTTP, and the power-cycle recovery.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use pumpstation::app::ports::NetworkPort;
use pumpstation::config::{LinkMode, SystemConfig};
use pumpstation::error::{ConnectivityError, Error, ModemError};
use pumpstation::modem::{
    AtEngine, CellularLink, ControlPins, HttpMethod, LineTransport, LinkSettings, Modem,
    ModemSettings, PppCredentials, PppLink, SessionState,
};

const OK: &str = "OK\r\n";

// ── Collaborators ────────────────────────────────────────────

/// Modem stand-in: replays queued lines and logs every command written.
#[derive(Clone, Default)]
struct Sim800 {
    inner: Rc<RefCell<SimState>>,
}

#[derive(Default)]
struct SimState {
    replies: VecDeque<String>,
    sent: Vec<String>,
    opens: u32,
}

impl Sim800 {
    fn with_replies(lines: &[&str]) -> Self {
        let sim = Self::default();
        sim.inner.borrow_mut().replies = lines.iter().map(|l| (*l).to_owned()).collect();
        sim
    }

    fn sent(&self) -> Vec<String> {
        self.inner.borrow().sent.clone()
    }
}

impl LineTransport for Sim800 {
    fn open(&mut self) -> Result<(), ModemError> {
        self.inner.borrow_mut().opens += 1;
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ModemError> {
        let line = String::from_utf8_lossy(data);
        self.inner
            .borrow_mut()
            .sent
            .push(line.trim_end_matches("\r\n").to_owned());
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, ModemError> {
        Ok(self.inner.borrow_mut().replies.pop_front())
    }
}

#[derive(Default)]
struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// GPIO output logging `(name, level)` into a shared trace.
struct TracePin {
    name: &'static str,
    trace: Rc<RefCell<Vec<(&'static str, bool)>>>,
}

impl ErrorType for TracePin {
    type Error = Infallible;
}

impl OutputPin for TracePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.trace.borrow_mut().push((self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.trace.borrow_mut().push((self.name, true));
        Ok(())
    }
}

/// PPP negotiator that is up as soon as it is activated.
#[derive(Default)]
struct InstantPpp {
    up: bool,
}

impl<T> PppLink<T> for InstantPpp {
    fn activate(
        &mut self,
        _transport: &mut T,
        credentials: &PppCredentials<'_>,
    ) -> Result<(), ConnectivityError> {
        assert!(credentials.user.is_empty());
        self.up = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.up = false;
    }

    fn is_connected(&self) -> bool {
        self.up
    }
}

type Link = CellularLink<Sim800, NoDelay, ControlPins<TracePin>, InstantPpp>;

fn build(sim: &Sim800, mode: LinkMode) -> (Link, Rc<RefCell<Vec<(&'static str, bool)>>>) {
    let cfg = SystemConfig::default();
    let trace = Rc::new(RefCell::new(Vec::new()));
    let pin = |name| TracePin { name, trace: Rc::clone(&trace) };
    let control = ControlPins::new(Some(pin("pwkey")), Some(pin("rst")), Some(pin("power")));
    let modem = Modem::new(
        AtEngine::new(sim.clone(), NoDelay, cfg.at_poll_interval_ms),
        control,
        InstantPpp::default(),
        ModemSettings::from_config(&cfg),
    );
    let mut settings = LinkSettings::from_config(&cfg);
    settings.mode = mode;
    (CellularLink::new(modem, settings), trace)
}

fn init_replies() -> Vec<&'static str> {
    vec![
        "SIM800 R14.18\r\n", OK, // ATI
        "+CIPSSL: (0-1)\r\n", OK, // AT+CIPSSL=?
        "+CSQ: 21,0\r\n", OK, // AT+CSQ
        "+COPS: 0,0,\"Tele2\"\r\n", OK, // AT+COPS?
    ]
}

// ── Flows ────────────────────────────────────────────────────

#[test]
fn bearer_bring_up_then_http_get() {
    let mut replies = init_replies();
    replies.extend([
        "+SAPBR: 1,3,\"0.0.0.0\"\r\n", OK, // no bearer yet
        OK, OK, OK, OK, OK, OK, // closebear initgprs setapn setuser setpwd opengprs
        "+SAPBR: 1,3,\"0.0.0.0\"\r\n", OK, // first poll
        "+SAPBR: 1,1,\"10.64.3.7\"\r\n", OK, // second poll
    ]);
    replies.extend([
        "+SAPBR: 1,1,\"10.64.3.7\"\r\n", OK, // getbear
        "ERROR\r\n", // stale closehttp
        OK, OK, OK, OK, // inithttp sethttp disablessl initurl
        "\r\n", "+HTTPACTION: 0,200,11\r\n",
        "+HTTPREAD: 11\r\n", "{\"ok\":true}\r\n", OK,
        OK, // closehttp
    ]);
    let sim = Sim800::with_replies(&replies);
    let (mut link, trace) = build(&sim, LinkMode::Bearer);

    link.bring_up().unwrap();
    assert!(link.is_online());
    assert!(link.modem().ssl_available());
    assert!(matches!(link.modem().state(), SessionState::GprsConnected(ip) if ip.as_str() == "10.64.3.7"));
    assert_eq!(
        trace.borrow().as_slice(),
        &[("pwkey", false), ("rst", true), ("power", true)]
    );

    let resp = link
        .modem_mut()
        .http_request("http://example.com/ping", HttpMethod::Get, None, None)
        .unwrap();
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, "{\"ok\":true}");

    let sent = sim.sent();
    assert!(sent.contains(&"AT+SAPBR=3,1,\"APN\",\"m2m.tele2.com\"".to_owned()));
    assert!(sent.contains(&"AT+HTTPPARA=\"URL\",\"http://example.com/ping\"".to_owned()));
    assert_eq!(sent.last().map(String::as_str), Some("AT+HTTPTERM"));
    assert_eq!(sim.inner.borrow().opens, 1);
}

#[test]
fn ppp_bring_up_hands_uart_to_negotiator() {
    let mut replies = init_replies();
    replies.extend([OK, OK, OK, OK, OK, OK, OK, OK, "CONNECT\r\n"]);
    let sim = Sim800::with_replies(&replies);
    let (mut link, _) = build(&sim, LinkMode::Ppp);

    link.bring_up().unwrap();
    assert!(link.is_online());
    assert!(link.modem().ppp_is_up());

    let sent = sim.sent();
    let handover = &sent[sent.len() - 9..];
    assert_eq!(handover[0], "AT");
    assert_eq!(handover[1], "ATZ");
    assert_eq!(handover[8], "AT+CGDATA=\"PPP\",1");
    assert!(handover[7].contains("m2m.tele2.com"));
}

#[test]
fn silent_modem_is_power_cycled_on_recover() {
    let sim = Sim800::default();
    let (mut link, trace) = build(&sim, LinkMode::Ppp);

    assert!(matches!(
        link.bring_up(),
        Err(Error::Modem(ModemError::Timeout { command: "modeminfo", .. }))
    ));
    assert_eq!(link.modem().state(), &SessionState::Failed);
    // One probe per configured attempt.
    let probes = sim.sent().iter().filter(|c| *c == "ATI").count();
    assert_eq!(probes, SystemConfig::default().modem_probe_attempts as usize);

    trace.borrow_mut().clear();
    link.recover();
    assert_eq!(
        trace.borrow().as_slice(),
        &[("power", false), ("power", true)]
    );
    assert_eq!(link.modem().state(), &SessionState::NotInitialized);
    assert!(!link.is_online());
}
