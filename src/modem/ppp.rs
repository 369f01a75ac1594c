//! PPP handover boundary.
//!
//! After `AT+CGDATA="PPP",1` answers `CONNECT` the UART carries PPP frames
//! instead of AT text.  Link negotiation belongs to the host IP stack; the
//! session only hands it the transport and the credentials.

use crate::error::ConnectivityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PppAuth {
    None,
    Pap,
    Chap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PppCredentials<'a> {
    pub auth: PppAuth,
    pub user: &'a str,
    pub password: &'a str,
}

impl PppCredentials<'static> {
    /// CHAP with empty user and password, as the carrier expects.
    pub const fn anonymous_chap() -> Self {
        Self {
            auth: PppAuth::Chap,
            user: "",
            password: "",
        }
    }
}

/// External PPP negotiator driven over the modem transport `T`.
pub trait PppLink<T> {
    /// Take over `transport` and start negotiating.
    fn activate(
        &mut self,
        transport: &mut T,
        credentials: &PppCredentials<'_>,
    ) -> Result<(), ConnectivityError>;

    /// Stop the link and give the transport back to AT mode.
    fn deactivate(&mut self);

    /// Whether negotiation finished and the host has an address.
    fn is_connected(&self) -> bool;
}
