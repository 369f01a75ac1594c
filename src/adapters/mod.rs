//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to                 |
//! |-------------|-------------------------|-----------------------------|
//! | `hardware`  | SensorPort, ActuatorPort| ESP32 ADC2, relay GPIO,     |
//! |             | ClockPort, SystemPort   | DS18B20, TWDT, RTC          |
//! | `log_sink`  | EventSink               | Serial log output           |
//! | `time`      | ClockPort               | RTC-backed system time      |
//! | `udp`       | TimeSourcePort          | SNTP over `std::net`        |
//! | `uart`      | LineTransport           | SIM800 on UART1 (firmware)  |
//! | `ppp`       | PppLink                 | lwIP PPPoS (firmware)       |
//! | `mqtt`      | BrokerPort              | ESP-IDF MQTT client (fw)    |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
#[cfg(target_os = "espidf")]
pub mod ppp;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
pub mod udp;
