//! Timer-woken deep sleep.
//!
//! Only the RTC domain survives; the next wake is a fresh boot.

use log::info;

/// Arm the RTC timer and enter deep sleep.  Does not return on hardware.
#[cfg(target_os = "espidf")]
pub fn enter_deep_sleep(ms: u32) {
    info!("Deep sleep for {} s", ms / 1000);
    // SAFETY: plain ESP-IDF calls; esp_deep_sleep_start never returns.
    unsafe {
        esp_idf_sys::esp_sleep_enable_timer_wakeup(u64::from(ms) * 1_000);
        esp_idf_sys::esp_deep_sleep_start();
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn enter_deep_sleep(ms: u32) {
    info!("Deep sleep (sim) for {} ms: returning", ms);
}
