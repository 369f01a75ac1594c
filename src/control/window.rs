//! Daily pump window.

use crate::time_sync::RtcDateTime;

/// Hours during which the pump may run.  Both ends are inclusive: a
/// 17–18 window is open from 17:00 until 18:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl ControlWindow {
    pub const fn new(start_hour: u8, end_hour: u8) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains_hour(&self, hour: u8) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }

    /// An unset clock is never inside the window.
    pub fn contains(&self, now: Option<RtcDateTime>) -> bool {
        now.is_some_and(|t| self.contains_hour(t.hour))
    }
}
