//! SNTP over the host IP stack.
//!
//! Once PPP is up the lwIP sockets route through the modem, so the plain
//! `std::net` socket works the same on the device and on the host.  Each
//! query binds a fresh socket, which keeps a late answer to an earlier
//! attempt from being read as the current one.

use std::net::{ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::debug;

use crate::app::ports::TimeSourcePort;
use crate::config::{Host, SystemConfig};
use crate::error::ConnectivityError;
use crate::time_sync::NTP_PACKET_LEN;

pub struct UdpTimeSource {
    host: Host,
    port: u16,
    timeout: Duration,
}

impl UdpTimeSource {
    pub fn new(host: Host, port: u16, timeout: Duration) -> Self {
        Self { host, port, timeout }
    }

    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self::new(
            cfg.ntp_host.clone(),
            cfg.ntp_port,
            Duration::from_millis(u64::from(cfg.ntp_timeout_ms.max(1))),
        )
    }
}

impl TimeSourcePort for UdpTimeSource {
    fn query(
        &mut self,
        request: &[u8; NTP_PACKET_LEN],
    ) -> Result<[u8; NTP_PACKET_LEN], ConnectivityError> {
        let server = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                debug!("Resolving {} failed: {}", self.host, e);
                ConnectivityError::TimeServiceUnreachable
            })?
            .next()
            .ok_or(ConnectivityError::TimeServiceUnreachable)?;

        let socket =
            UdpSocket::bind(("0.0.0.0", 0)).map_err(|_| ConnectivityError::TimeServiceUnreachable)?;
        socket
            .set_read_timeout(Some(self.timeout))
            .map_err(|_| ConnectivityError::TimeServiceUnreachable)?;
        socket
            .send_to(request, server)
            .map_err(|_| ConnectivityError::TimeServiceUnreachable)?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let (n, _) = socket
            .recv_from(&mut response)
            .map_err(|_| ConnectivityError::TimeServiceUnreachable)?;
        if n < NTP_PACKET_LEN {
            return Err(ConnectivityError::BadTimeResponse);
        }
        Ok(response)
    }
}
