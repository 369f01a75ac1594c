//! Unified error types for the PumpStation firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the field
//! controller can make its offline / sleep decisions from one type.  All
//! variants are `Copy`; command names are carried as `&'static str` so an
//! error never allocates.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The AT command engine or modem session failed.
    Modem(ModemError),
    /// The cellular data link could not be established or is gone.
    Connectivity(ConnectivityError),
    /// A sensor channel could not be sampled.
    Sensor(SensorError),
    /// Telemetry could not be delivered to the broker.
    Publish(PublishError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modem(e) => write!(f, "modem: {e}"),
            Self::Connectivity(e) => write!(f, "connectivity: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Modem / AT protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// No terminator seen before the idle-poll budget ran out.
    Timeout { command: &'static str, budget: u32 },
    /// The modem answered with a bare `ERROR` line.
    Generic { command: &'static str },
    /// The UART refused a write or a read failed at the driver level.
    Transport,
    /// An operation that needs `initialize()` was called before it.
    NotInitialized,
    /// A response arrived but did not have the expected shape.
    Parse(&'static str),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { command, budget } => {
                write!(f, "timeout for command \"{command}\" (timeout={budget})")
            }
            Self::Generic { command } => write!(f, "generic AT error on \"{command}\""),
            Self::Transport => write!(f, "UART transport failure"),
            Self::NotInitialized => write!(f, "modem is not initialized"),
            Self::Parse(what) => write!(f, "cannot parse {what}"),
        }
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// The bearer opened but no address was assigned within the poll budget.
    NoIpAddress,
    /// The bearer was closed but the modem still reports an address.
    StillConnected,
    /// An HTTP request was attempted without an active bearer.
    NotConnected,
    /// `https://` requested on a firmware revision without SSL.
    SslUnavailable,
    /// The URL scheme is neither `http://` nor `https://`.
    UnsupportedScheme,
    /// PPP was started but the link did not come up in time.
    PppTimeout,
    /// The PPP negotiator refused to start.
    PppFailed,
    /// The time service did not answer before the receive timeout.
    TimeServiceUnreachable,
    /// The time service answered with a short or malformed packet.
    BadTimeResponse,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIpAddress => write!(f, "could not get a valid IP address"),
            Self::StillConnected => write!(f, "bearer closed but an IP address is still assigned"),
            Self::NotConnected => write!(f, "modem is not connected"),
            Self::SslUnavailable => write!(f, "SSL is only supported by firmware revisions >= R14.00"),
            Self::UnsupportedScheme => write!(f, "unsupported URL scheme"),
            Self::PppTimeout => write!(f, "PPP link did not come up"),
            Self::PppFailed => write!(f, "PPP negotiator failed to start"),
            Self::TimeServiceUnreachable => write!(f, "no answer from time service"),
            Self::BadTimeResponse => write!(f, "malformed time service response"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error.
    AdcReadFailed,
    /// One-wire bus transaction failed.
    OneWireFailed,
    /// No device answered on the one-wire bus.
    NoDevice,
    /// Fewer samples than the trimmed mean needs.
    InsufficientSamples,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OneWireFailed => write!(f, "one-wire transaction failed"),
            Self::NoDevice => write!(f, "no one-wire device found"),
            Self::InsufficientSamples => write!(f, "not enough samples to filter"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The broker did not accept a connection.
    BrokerUnreachable,
    /// A publish was attempted and failed at the transport level.
    Rejected,
    /// The data link is down and could not be brought back.
    Offline,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokerUnreachable => write!(f, "broker unreachable"),
            Self::Rejected => write!(f, "publish rejected"),
            Self::Offline => write!(f, "data link offline"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
