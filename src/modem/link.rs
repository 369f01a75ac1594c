//! The modem session behind the application's [`NetworkPort`].
//!
//! Bring-up is `initialize` followed by either the PPP handover (the host
//! IP stack then carries MQTT and NTP) or the modem's own GPRS bearer.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::control::ModemControl;
use super::ppp::PppLink;
use super::session::Modem;
use super::transport::LineTransport;
use crate::app::ports::NetworkPort;
use crate::config::{Credential, LinkMode, SystemConfig};
use crate::error::{ConnectivityError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    pub mode: LinkMode,
    pub apn: Credential,
    pub user: Credential,
    pub password: Credential,
    /// Status checks while waiting for PPP, one per `poll_interval_ms`.
    pub ppp_link_polls: u32,
    pub poll_interval_ms: u32,
}

impl LinkSettings {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            mode: cfg.link_mode,
            apn: cfg.apn.clone(),
            user: cfg.apn_user.clone(),
            password: cfg.apn_password.clone(),
            ppp_link_polls: cfg.ppp_link_polls,
            poll_interval_ms: cfg.at_poll_interval_ms,
        }
    }
}

pub struct CellularLink<T, D, C, P> {
    modem: Modem<T, D, C, P>,
    settings: LinkSettings,
}

impl<T, D, C, P> CellularLink<T, D, C, P>
where
    T: LineTransport,
    D: DelayNs,
    C: ModemControl,
    P: PppLink<T>,
{
    pub fn new(modem: Modem<T, D, C, P>, settings: LinkSettings) -> Self {
        Self { modem, settings }
    }

    pub fn modem(&self) -> &Modem<T, D, C, P> {
        &self.modem
    }

    /// Direct session access, e.g. for modem-side HTTP in bearer mode.
    pub fn modem_mut(&mut self) -> &mut Modem<T, D, C, P> {
        &mut self.modem
    }

    /// Record radio conditions while the UART still speaks AT.
    fn log_radio(&mut self) {
        match self.modem.signal_strength() {
            Ok(ratio) => info!("Signal strength {:.0}%", ratio * 100.0),
            Err(e) => debug!("Signal query failed: {}", e),
        }
        match self.modem.current_network() {
            Ok(Some(op)) => info!("Registered on {}", op.as_str()),
            Ok(None) => info!("Not registered on any operator"),
            Err(e) => debug!("Operator query failed: {}", e),
        }
    }

    fn wait_for_ppp(&mut self) -> Result<()> {
        if self.modem.ppp_is_up() {
            return Ok(());
        }
        for _ in 0..self.settings.ppp_link_polls {
            self.modem.pause_ms(self.settings.poll_interval_ms);
            if self.modem.ppp_is_up() {
                return Ok(());
            }
        }
        warn!(
            "PPP link not up after {} s",
            self.settings.ppp_link_polls * self.settings.poll_interval_ms / 1000
        );
        Err(ConnectivityError::PppTimeout.into())
    }
}

impl<T, D, C, P> NetworkPort for CellularLink<T, D, C, P>
where
    T: LineTransport,
    D: DelayNs,
    C: ModemControl,
    P: PppLink<T>,
{
    fn bring_up(&mut self) -> Result<()> {
        self.modem.initialize()?;
        self.log_radio();
        match self.settings.mode {
            LinkMode::Ppp => {
                self.modem.ppp_connect()?;
                self.wait_for_ppp()?;
                info!("PPP link up");
            }
            LinkMode::Bearer => {
                let ip = self.modem.connect(
                    &self.settings.apn,
                    &self.settings.user,
                    &self.settings.password,
                )?;
                info!("GPRS bearer up with {}", ip.as_str());
            }
        }
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.modem.is_online()
    }

    fn recover(&mut self) {
        self.modem.power_cycle();
    }
}
