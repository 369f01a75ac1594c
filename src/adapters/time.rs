//! Real-time clock adapter.
//!
//! The clock holds local wall time directly (the offset is applied before
//! it is set), so the system timezone stays at UTC and no conversion
//! happens on read.
//!
//! - **`target_os = "espidf"`**: `settimeofday` / `gettimeofday` on the
//!   RTC-backed system time, which keeps running through deep sleep.
//! - **`not(target_os = "espidf")`**: an in-memory clock that advances
//!   with `std::time::Instant`.

use crate::app::ports::ClockPort;
use crate::time_sync::RtcDateTime;

/// Anything before 2020-01-01 means the clock was never set.
const EPOCH_2020: i64 = 1_577_836_800;

pub struct RtcClock {
    #[cfg(not(target_os = "espidf"))]
    set_at: Option<(i64, std::time::Instant)>,
}

impl Default for RtcClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            set_at: None,
        }
    }

    #[cfg(target_os = "espidf")]
    fn unix_now(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some(i64::from(tv.tv_sec))
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_now(&self) -> Option<i64> {
        let (base, at) = self.set_at?;
        Some(base + at.elapsed().as_secs() as i64)
    }

    #[cfg(target_os = "espidf")]
    fn set_unix(&mut self, secs: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: secs as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) } != 0 {
            log::warn!("settimeofday failed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_unix(&mut self, secs: i64) {
        self.set_at = Some((secs, std::time::Instant::now()));
    }
}

impl ClockPort for RtcClock {
    fn now(&self) -> Option<RtcDateTime> {
        let secs = self.unix_now()?;
        if secs < EPOCH_2020 {
            return None;
        }
        RtcDateTime::from_unix(secs)
    }

    fn set(&mut self, now: &RtcDateTime) {
        match now.to_unix() {
            Some(secs) => self.set_unix(secs),
            None => log::warn!("Refusing to set clock to invalid date {}", now),
        }
    }
}
