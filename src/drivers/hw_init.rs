//! One-shot ADC initialisation and sample reads.
//!
//! The three analog channels (soil probe, rain plate, battery divider) sit
//! on ADC2.  The probes are read raw at 10 bits so their calibration points
//! stay in the 0-1023 range; the battery channel is read at 12 bits through
//! the line-fitting calibration scheme and reported in microvolts.
//!
//! The relay GPIO is configured as an output driven low, so the pump is off
//! from the first instruction after reset.
//!
//! On host targets the readings come from atomics set by `sim_set_*`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcChannelFailed { channel: u32, rc: i32 },
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC2 init failed (rc={})", rc),
            Self::AdcChannelFailed { channel, rc } => {
                write!(f, "ADC2 channel {} config failed (rc={})", channel, rc)
            }
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Init("relay GPIO"),
            _ => Self::Init("ADC"),
        }
    }
}

/// An analog input of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    Soil,
    Rain,
    Battery,
}

impl AnalogChannel {
    #[cfg(target_os = "espidf")]
    fn adc_channel(self) -> u32 {
        match self {
            Self::Soil => pins::ADC2_CH_SOIL,
            Self::Rain => pins::ADC2_CH_RAIN,
            Self::Battery => pins::ADC2_CH_BATTERY,
        }
    }
}

// ── ESP-IDF implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC2_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
static mut BATTERY_CALI: adc_cali_handle_t = core::ptr::null_mut();

/// SAFETY: Only called after `init_peripherals()` from the single control
/// task; the handle is never written again.
#[cfg(target_os = "espidf")]
unsafe fn adc2_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC2_HANDLE }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the controller runs.
    unsafe {
        init_gpio_outputs()?;
        init_adc()?;
    }
    info!("hw_init: ADC2 configured (soil=CH2, rain=CH3, battery=CH5)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    unsafe { gpio_set_level(pins::RELAY_GPIO, 0) };
    info!("hw_init: relay output on GPIO{} (low)", pins::RELAY_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes an output configured in
    // init_gpio_outputs(); control task only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
static SIM_RELAY: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    if pin == crate::pins::RELAY_GPIO {
        SIM_RELAY.store(high, Ordering::Relaxed);
    }
}

/// Last level written to the relay pin (host simulation only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_relay_level() -> bool {
    SIM_RELAY.load(Ordering::Relaxed)
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_2,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC2_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC2_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let probe_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_10,
    };
    let battery_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let channels = [
        (AnalogChannel::Soil, &probe_cfg),
        (AnalogChannel::Rain, &probe_cfg),
        (AnalogChannel::Battery, &battery_cfg),
    ];
    for (channel, cfg) in channels {
        let ch = channel.adc_channel();
        let ret = unsafe { adc_oneshot_config_channel(adc2_handle(), ch, cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcChannelFailed { channel: ch, rc: ret });
        }
    }

    let cali_cfg = adc_cali_line_fitting_config_t {
        unit_id: adc_unit_t_ADC_UNIT_2,
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        ..Default::default()
    };
    // SAFETY: BATTERY_CALI is only written here, once at boot.
    let ret = unsafe { adc_cali_create_scheme_line_fitting(&cali_cfg, &raw mut BATTERY_CALI) };
    if ret != ESP_OK as i32 {
        warn!("hw_init: battery calibration unavailable ({}), using nominal scale", ret);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn read_raw(channel: AnalogChannel) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc2_handle() contract, single control task only.
    let ret = unsafe { adc_oneshot_read(adc2_handle(), channel.adc_channel(), &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.max(0) as u16)
}

/// One raw sample from a probe channel.
#[cfg(target_os = "espidf")]
pub fn adc_read(channel: AnalogChannel) -> Result<u16, SensorError> {
    read_raw(channel)
}

/// One battery sample at the ADC pin, in microvolts.
#[cfg(target_os = "espidf")]
pub fn battery_microvolts() -> Result<u32, SensorError> {
    let raw = read_raw(AnalogChannel::Battery)?;
    // SAFETY: BATTERY_CALI is written once during init_adc().
    let cali = unsafe { BATTERY_CALI };
    if cali.is_null() {
        // 12 dB attenuation spans roughly 0-3.9 V over 12 bits.
        return Ok(u32::from(raw) * 3_900_000 / 4_095);
    }
    let mut mv: i32 = 0;
    let ret = unsafe { adc_cali_raw_to_voltage(cali, i32::from(raw), &mut mv) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(mv.max(0) as u32 * 1_000)
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_RAW: AtomicU16 = AtomicU16::new(540);
#[cfg(not(target_os = "espidf"))]
static SIM_RAIN_RAW: AtomicU16 = AtomicU16::new(1023);
#[cfg(not(target_os = "espidf"))]
static SIM_BATTERY_UV: AtomicU32 = AtomicU32::new(1_680_000);

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(channel: AnalogChannel) -> Result<u16, SensorError> {
    match channel {
        AnalogChannel::Soil => Ok(SIM_SOIL_RAW.load(Ordering::Relaxed)),
        AnalogChannel::Rain => Ok(SIM_RAIN_RAW.load(Ordering::Relaxed)),
        AnalogChannel::Battery => Err(SensorError::AdcReadFailed),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn battery_microvolts() -> Result<u32, SensorError> {
    Ok(SIM_BATTERY_UV.load(Ordering::Relaxed))
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: AnalogChannel, raw: u16) {
    match channel {
        AnalogChannel::Soil => SIM_SOIL_RAW.store(raw, Ordering::Relaxed),
        AnalogChannel::Rain => SIM_RAIN_RAW.store(raw, Ordering::Relaxed),
        AnalogChannel::Battery => {
            SIM_BATTERY_UV.store(u32::from(raw) * 3_900_000 / 4_095, Ordering::Relaxed);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_microvolts(uv: u32) {
    SIM_BATTERY_UV.store(uv, Ordering::Relaxed);
}
