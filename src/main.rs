//! PumpStation Firmware: Main Entry Point
//!
//! One pass of the field controller per wake, then deep sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        CellularLink        MqttBroker         │
//! │  (Sensor+Actuator+      (SIM800 over UART,  (BrokerPort)       │
//! │   Clock+System)          lwIP PPPoS)        UdpTimeSource      │
//! │  LogEventSink                               (TimeSourcePort)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           FieldController (pure logic)                 │    │
//! │  │  time sync · sampling · publish · pump window          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, IOPin, OutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_hal::units::Hertz;
use log::info;

use pumpstation::adapters::device_id;
use pumpstation::adapters::hardware::HardwareAdapter;
use pumpstation::adapters::log_sink::LogEventSink;
use pumpstation::adapters::mqtt::MqttBroker;
use pumpstation::adapters::ppp::LwipPpp;
use pumpstation::adapters::time::RtcClock;
use pumpstation::adapters::uart::UartLineTransport;
use pumpstation::adapters::udp::UdpTimeSource;
use pumpstation::config::SystemConfig;
use pumpstation::control::FieldController;
use pumpstation::drivers::hw_init;
use pumpstation::drivers::relay::RelayDriver;
use pumpstation::drivers::thermometer::Ds18b20Probe;
use pumpstation::drivers::watchdog::Watchdog;
use pumpstation::error::Error;
use pumpstation::modem::{AtEngine, CellularLink, ControlPins, LinkSettings, Modem, ModemSettings};
use pumpstation::pins;

/// Time for a serial console to attach before the first log line matters.
const CONSOLE_WAIT_MS: u32 = 3_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PumpStation v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    FreeRtos::delay_ms(CONSOLE_WAIT_MS);

    let config = SystemConfig::default();
    config.validate()?;

    // ── 2. Board ──────────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    let peripherals = Peripherals::take()?;
    let gpio = peripherals.pins;

    let thermometer = Ds18b20Probe::new(gpio.gpio0.downgrade()).map_err(Error::from)?;
    let mut board = HardwareAdapter::new(RelayDriver::new(), thermometer, watchdog, RtcClock::new());

    // ── 3. Modem and cellular link ────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart1,
        gpio.gpio26,
        gpio.gpio27,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(pins::MODEM_BAUD)),
    )?;
    let transport = UartLineTransport::new(uart, pins::MODEM_READ_TIMEOUT_MS);
    let control = ControlPins::new(
        Some(PinDriver::output(gpio.gpio4.downgrade_output())?),
        Some(PinDriver::output(gpio.gpio5.downgrade_output())?),
        Some(PinDriver::output(gpio.gpio23.downgrade_output())?),
    );
    let modem = Modem::new(
        AtEngine::new(transport, FreeRtos, config.at_poll_interval_ms),
        control,
        LwipPpp::new(),
        ModemSettings::from_config(&config),
    );
    let mut link = CellularLink::new(modem, LinkSettings::from_config(&config));

    // ── 4. Network services ───────────────────────────────────
    let client_id = device_id::client_id(&device_id::read_mac());
    info!("Device ID: {}", client_id);
    let mut broker = MqttBroker::new(&config, client_id);
    let mut time_source = UdpTimeSource::from_config(&config);
    let mut sink = LogEventSink::new();

    // ── 5. Control sequence (ends in deep sleep) ──────────────
    let controller = FieldController::new(&config);
    let report = controller.run(&mut board, &mut link, &mut broker, &mut time_source, &mut sink);
    info!("Boot finished: {:?}", report);
    Ok(())
}
