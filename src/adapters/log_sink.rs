//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to the UART console in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Boot => info!("BOOT  | starting control sequence"),
            AppEvent::LinkUp => info!("LINK  | online"),
            AppEvent::LinkDown(Some(e)) => warn!("LINK  | offline ({}), modem power-cycled", e),
            AppEvent::LinkDown(None) => warn!("LINK  | offline, modem power-cycled"),
            AppEvent::ClockSynced(now) => info!("CLOCK | synced to {}", now),
            AppEvent::ClockSyncFailed(e) => warn!("CLOCK | not synced ({})", e),
            AppEvent::Telemetry { frame, published } => info!(
                "TELEM | {} | {}",
                frame,
                if *published { "published" } else { "NOT published" }
            ),
            AppEvent::PumpStarted => info!("PUMP  | relay on"),
            AppEvent::PumpStopped { exit, iterations } => {
                info!("PUMP  | stopped after {} rounds: {:?}", iterations, exit);
            }
            AppEvent::PowerDown { sleep_ms } => info!("SLEEP | deep sleep for {} s", sleep_ms / 1000),
        }
    }
}
