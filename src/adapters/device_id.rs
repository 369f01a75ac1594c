//! Device identity derived from the ESP32 factory MAC address.
//!
//! The MQTT client id is `pump-xxyyzz` (last 3 bytes of the 6-byte MAC,
//! lowercase hex).  With a persistent broker session the id must be stable
//! across reboots, which the eFuse MAC guarantees.

use core::fmt::Write;

/// MQTT client id, e.g. `pump-efcafe`.
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn client_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "pump-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
