//! Task watchdog for the control task.
//!
//! A hung modem exchange or a stuck pump loop ends in a panic reset instead
//! of a relay left closed.  The controller feeds at least once per half
//! timeout; the host build only counts feeds.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;
use log::{info, warn};

pub struct Watchdog {
    timeout_ms: u32,
    /// The control task is registered with the TWDT.
    #[cfg(target_os = "espidf")]
    armed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: core::cell::Cell<u32>,
}

/// Apply `timeout_ms` to the TWDT and register the calling task.
#[cfg(target_os = "espidf")]
fn arm(timeout_ms: u32) -> bool {
    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // The bootloader may already have started the TWDT; reconfiguring then
    // only changes the timeout.
    let rc = unsafe { esp_task_wdt_reconfigure(&cfg) };
    if rc != ESP_OK as i32 {
        warn!("TWDT reconfigure rc={}", rc);
    }
    let rc = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
    if rc != ESP_OK as i32 {
        warn!("TWDT: control task not registered (rc={})", rc);
        return false;
    }
    true
}

impl Watchdog {
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        let wd = Self {
            timeout_ms,
            armed: arm(timeout_ms),
        };
        #[cfg(not(target_os = "espidf"))]
        let wd = Self {
            timeout_ms,
            feeds: core::cell::Cell::new(0),
        };

        if wd.is_armed() {
            info!("Watchdog armed, reset after {} s without a feed", timeout_ms / 1000);
        } else {
            warn!("Watchdog not armed");
        }
        wd
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    #[cfg(target_os = "espidf")]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_armed(&self) -> bool {
        true
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.armed {
            unsafe {
                esp_task_wdt_reset();
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.feeds.set(self.feeds.get() + 1);
    }

    /// Feeds seen so far (host simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_feeds(&self) -> u32 {
        self.feeds.get()
    }
}
