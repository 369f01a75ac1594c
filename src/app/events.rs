//! Outbound application events.
//!
//! The [`FieldController`](crate::control::FieldController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, or keep
//! them for a test assertion.

use crate::control::PumpExit;
use crate::error::Error;
use crate::telemetry::TelemetryFrame;
use crate::time_sync::RtcDateTime;

/// Structured events emitted by the field controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The boot sequence started.
    Boot,

    /// The cellular data link is up.
    LinkUp,

    /// Bring-up failed and the modem was power-cycled.  `None` when the
    /// bring-up returned but the link never came online.
    LinkDown(Option<Error>),

    /// The RTC was set from the time service.
    ClockSynced(RtcDateTime),

    /// Every time-service attempt failed.
    ClockSyncFailed(Error),

    /// A sensor frame was read and a publish attempted.
    Telemetry { frame: TelemetryFrame, published: bool },

    /// Relay energised.
    PumpStarted,

    /// Pump cycle finished after `iterations` read/publish rounds.
    PumpStopped { exit: PumpExit, iterations: u32 },

    /// Entering deep sleep.
    PowerDown { sleep_ms: u32 },
}
