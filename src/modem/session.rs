//! SIM800 session: bring-up, GPRS bearer, HTTP over the bearer, PPP.
//!
//! State machine:
//!
//! ```text
//! NotInitialized --initialize--> Initialized --connect--> GprsConnected(ip)
//!        ^                          |    ^                      |
//!        |                          |    +------disconnect------+
//!   power_cycle                     +--ppp_connect--> PppConnected
//!        |                          ^                      |
//!     (any)                         +----ppp_disconnect----+
//! ```
//!
//! A failed `initialize` leaves the session in `Failed`; only a power cycle
//! or a new `initialize` leaves it.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::command::AtCommand;
use super::control::ModemControl;
use super::engine::AtEngine;
use super::http::{DEFAULT_CONTENT_TYPE, HttpContext, HttpMethod, HttpResponse};
use super::ppp::{PppCredentials, PppLink};
use super::response::{
    IpAddr, Operator, parse_bearer_ip, parse_current_operator, parse_http_status,
    parse_operator_list, parse_signal_ratio,
};
use super::transport::LineTransport;
use crate::config::{Credential, SystemConfig};
use crate::error::{ConnectivityError, ModemError, Result};

/// `AT+CIPSSL=?` answer of firmware that can do HTTPS.
const SSL_CAPABLE: &str = "+CIPSSL: (0-1)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NotInitialized,
    Initialized,
    GprsConnected(IpAddr),
    PppConnected,
    Failed,
}

/// Result of a best-effort teardown command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Closed,
    /// The modem answered `ERROR`; nothing was open.
    NotOpen,
}

fn best_effort(result: core::result::Result<String, ModemError>) -> Result<Teardown> {
    match result {
        Ok(_) => Ok(Teardown::Closed),
        Err(ModemError::Generic { command }) => {
            debug!("{}: nothing to close", command);
            Ok(Teardown::NotOpen)
        }
        Err(e) => Err(e.into()),
    }
}

/// Timing and retry knobs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ModemSettings {
    pub probe_attempts: u32,
    pub probe_backoff_ms: u32,
    pub ip_poll_attempts: u32,
    pub ip_poll_interval_ms: u32,
    pub ppp_apn: Credential,
    pub power_off_ms: u32,
    pub power_settle_ms: u32,
}

impl ModemSettings {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            probe_attempts: cfg.modem_probe_attempts,
            probe_backoff_ms: cfg.modem_probe_backoff_ms,
            ip_poll_attempts: cfg.ip_poll_attempts,
            ip_poll_interval_ms: cfg.at_poll_interval_ms,
            ppp_apn: cfg.ppp_apn.clone(),
            power_off_ms: cfg.modem_power_off_ms,
            power_settle_ms: cfg.modem_power_settle_ms,
        }
    }
}

impl Default for ModemSettings {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

pub struct Modem<T, D, C, P> {
    engine: AtEngine<T, D>,
    control: C,
    ppp: P,
    settings: ModemSettings,
    state: SessionState,
    modem_info: Option<String>,
    ssl_available: bool,
}

impl<T, D, C, P> Modem<T, D, C, P>
where
    T: LineTransport,
    D: DelayNs,
    C: ModemControl,
    P: PppLink<T>,
{
    pub fn new(engine: AtEngine<T, D>, control: C, ppp: P, settings: ModemSettings) -> Self {
        Self {
            engine,
            control,
            ppp,
            settings,
            state: SessionState::NotInitialized,
            modem_info: None,
            ssl_available: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.state, SessionState::NotInitialized | SessionState::Failed)
    }

    /// Data path is usable: bearer has an address or PPP finished negotiating.
    pub fn is_online(&self) -> bool {
        match self.state {
            SessionState::GprsConnected(_) => true,
            SessionState::PppConnected => self.ppp.is_connected(),
            _ => false,
        }
    }

    pub fn ppp_is_up(&self) -> bool {
        matches!(self.state, SessionState::PppConnected) && self.ppp.is_connected()
    }

    pub fn ssl_available(&self) -> bool {
        self.ssl_available
    }

    /// `ATI` text captured by the last successful initialize.
    pub fn modem_info(&self) -> Option<&str> {
        self.modem_info.as_deref()
    }

    /// Block on the engine's delay provider.
    pub fn pause_ms(&mut self, ms: u32) {
        self.engine.pause_ms(ms);
    }

    fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ModemError::NotInitialized.into())
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    pub fn initialize(&mut self) -> Result<()> {
        info!("Initializing modem...");
        self.control.set_idle_levels();
        self.engine.transport_mut().open()?;
        self.modem_info = None;
        self.ssl_available = false;

        let info = match self.probe() {
            Ok(info) => info,
            Err(e) => {
                warn!("Modem did not answer: {}", e);
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };
        info!("Ok, modem \"{}\" is ready and accepting commands", info);
        self.modem_info = Some(info);

        self.ssl_available = match self.engine.execute(&AtCommand::CheckSsl) {
            Ok(out) => out == SSL_CAPABLE,
            Err(ModemError::Generic { .. }) => false,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };
        debug!("SSL available: {}", self.ssl_available);

        self.state = SessionState::Initialized;
        Ok(())
    }

    fn probe(&mut self) -> core::result::Result<String, ModemError> {
        let attempts = self.settings.probe_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.engine.execute(&AtCommand::ModemInfo) {
                Ok(info) => return Ok(info),
                Err(e) if attempt < attempts => {
                    debug!("Modem probe {}/{} failed: {}", attempt, attempts, e);
                    attempt += 1;
                    self.engine.pause_ms(self.settings.probe_backoff_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cut the modem supply, wait, restore it and let it boot.
    pub fn power_cycle(&mut self) {
        info!("Power cycling modem");
        if matches!(self.state, SessionState::PppConnected) {
            self.ppp.deactivate();
        }
        self.control.set_power(false);
        self.engine.pause_ms(self.settings.power_off_ms);
        self.control.set_power(true);
        self.engine.pause_ms(self.settings.power_settle_ms);
        self.state = SessionState::NotInitialized;
        self.modem_info = None;
        self.ssl_available = false;
    }

    /// Send a command outside the session's own flows.
    pub fn execute(&mut self, cmd: &AtCommand<'_>) -> Result<String> {
        Ok(self.engine.execute(cmd)?)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn get_info(&mut self) -> Result<String> {
        self.execute(&AtCommand::ModemInfo)
    }

    pub fn firmware_revision(&mut self) -> Result<String> {
        self.execute(&AtCommand::FwRevision)
    }

    pub fn battery_status(&mut self) -> Result<String> {
        self.execute(&AtCommand::Battery)
    }

    pub fn scan_networks(&mut self) -> Result<Vec<Operator>> {
        let out = self.execute(&AtCommand::Scan)?;
        Ok(parse_operator_list(&out))
    }

    pub fn current_network(&mut self) -> Result<Option<heapless::String<32>>> {
        let out = self.execute(&AtCommand::Network)?;
        Ok(parse_current_operator(&out))
    }

    /// Signal strength as a fraction of the best reportable RSSI.
    pub fn signal_strength(&mut self) -> Result<f32> {
        let out = self.execute(&AtCommand::Signal)?;
        Ok(parse_signal_ratio(&out)?)
    }

    /// Bearer address, or `None` while unassigned.
    pub fn get_ip_addr(&mut self) -> Result<Option<IpAddr>> {
        let out = self.execute(&AtCommand::GetBearer)?;
        Ok(parse_bearer_ip(&out)?)
    }

    // ── GPRS bearer ─────────────────────────────────────────────

    pub fn close_bearer(&mut self) -> Result<Teardown> {
        best_effort(self.engine.execute(&AtCommand::CloseBearer))
    }

    /// Open the GPRS bearer and wait for an address.
    pub fn connect(&mut self, apn: &str, user: &str, pwd: &str) -> Result<IpAddr> {
        self.require_initialized()?;

        if let Some(ip) = self.get_ip_addr()? {
            debug!("Bearer already up with {}", ip.as_str());
            self.state = SessionState::GprsConnected(ip.clone());
            return Ok(ip);
        }

        info!("Connecting modem to APN {}", apn);
        self.close_bearer()?;
        self.execute(&AtCommand::InitGprs)?;
        self.execute(&AtCommand::SetApn(apn))?;
        self.execute(&AtCommand::SetUser(user))?;
        self.execute(&AtCommand::SetPwd(pwd))?;
        self.execute(&AtCommand::OpenGprs)?;

        for attempt in 1..=self.settings.ip_poll_attempts {
            if let Some(ip) = self.get_ip_addr()? {
                info!("Bearer up, IP {}", ip.as_str());
                self.state = SessionState::GprsConnected(ip.clone());
                return Ok(ip);
            }
            debug!("No IP yet ({}/{})", attempt, self.settings.ip_poll_attempts);
            if attempt < self.settings.ip_poll_attempts {
                self.engine.pause_ms(self.settings.ip_poll_interval_ms);
            }
        }
        Err(ConnectivityError::NoIpAddress.into())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.close_bearer()?;
        if let Some(ip) = self.get_ip_addr()? {
            warn!("Bearer closed but {} is still assigned", ip.as_str());
            return Err(ConnectivityError::StillConnected.into());
        }
        self.state = SessionState::Initialized;
        Ok(())
    }

    // ── HTTP over the bearer ────────────────────────────────────

    pub fn http_request(
        &mut self,
        url: &str,
        method: HttpMethod,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<HttpResponse> {
        let secure = if url.starts_with("https://") {
            true
        } else if url.starts_with("http://") {
            false
        } else {
            return Err(ConnectivityError::UnsupportedScheme.into());
        };

        if self.get_ip_addr()?.is_none() {
            return Err(ConnectivityError::NotConnected.into());
        }

        debug!("Http request: closehttp left over from an earlier request");
        best_effort(self.engine.execute(&AtCommand::CloseHttp))?;

        let ssl_available = self.ssl_available;
        let mut ctx = HttpContext::open(&mut self.engine)?;
        ctx.execute(&AtCommand::SetHttp)?;
        match (ssl_available, secure) {
            (true, true) => {
                ctx.execute(&AtCommand::EnableSsl)?;
            }
            (true, false) => {
                ctx.execute(&AtCommand::DisableSsl)?;
            }
            (false, true) => return Err(ConnectivityError::SslUnavailable.into()),
            (false, false) => {}
        }
        ctx.execute(&AtCommand::InitUrl(url))?;

        let action = match method {
            HttpMethod::Get => ctx.execute(&AtCommand::DoGet)?,
            HttpMethod::Post => {
                let body = body.unwrap_or("");
                ctx.execute(&AtCommand::SetContent(
                    content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
                ))?;
                ctx.execute(&AtCommand::PostLen(body.len()))?;
                ctx.execute(&AtCommand::DumpData(body))?;
                ctx.execute(&AtCommand::DoPost)?
            }
        };
        let status_code = parse_http_status(&action)?;
        let body = ctx.execute_with(&AtCommand::GetData, false)?;
        ctx.close()?;

        debug!("Http request: status {} ({} bytes)", status_code, body.len());
        Ok(HttpResponse { status_code, body })
    }

    // ── PPP ─────────────────────────────────────────────────────

    /// Prepare the modem for PPP and hand the UART to the negotiator.
    pub fn ppp_connect(&mut self) -> Result<()> {
        self.require_initialized()?;
        info!("Switching modem to PPP on APN {}", self.settings.ppp_apn.as_str());

        let apn = self.settings.ppp_apn.clone();
        for cmd in [
            AtCommand::SyncBaud,
            AtCommand::Reset,
            AtCommand::EchoOff,
            AtCommand::RfOn,
            AtCommand::CheckPin,
            AtCommand::CheckReg,
            AtCommand::NoSms,
            AtCommand::PppSetApn(apn.as_str()),
            AtCommand::PppConnect,
        ] {
            self.engine.execute(&cmd)?;
        }

        self.ppp.activate(
            self.engine.transport_mut(),
            &PppCredentials::anonymous_chap(),
        )?;
        self.state = SessionState::PppConnected;
        Ok(())
    }

    /// Stop PPP and return the modem to command mode with RF off.
    pub fn ppp_disconnect(&mut self) -> Result<()> {
        info!("Leaving PPP");
        self.ppp.deactivate();
        self.state = SessionState::Initialized;
        for cmd in [
            AtCommand::SyncBaud,
            AtCommand::Disconnect,
            AtCommand::RfOff,
            AtCommand::EchoOn,
        ] {
            self.engine.execute(&cmd)?;
        }
        Ok(())
    }
}
