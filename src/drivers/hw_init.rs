//! One-shot ADC initialisation and the probe ADC reader.
//!
//! The tank level probes and the dry-run probe sit on ADC1 and are read
//! with the oneshot driver through raw ESP-IDF sys calls.  Digital pins
//! (relay, LEDs, fault lines) and the I²C bus go through `esp-idf-hal`
//! drivers created in `main()`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::SensorError;
use crate::pins;
use crate::sensors::{AnalogChannels, Channel};
#[cfg(not(target_os = "espidf"))]
use crate::sensors::LEVEL_PROBES;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcChannelFailed { channel: u32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::AdcChannelFailed { channel, rc } => {
                write!(f, "ADC1 channel {} config failed (rc={})", channel, rc)
            }
        }
    }
}

/// Full-scale reading of the 12-bit converter.
const ADC_MAX_RAW: u32 = 4095;

/// Samples averaged per probe read.
#[cfg(target_os = "espidf")]
const OVERSAMPLE: u32 = 4;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe { init_adc()? };
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.  `init_adc()` completes before the control
/// loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    let channels = pins::LEVEL_PROBE_ADC_CHANNELS
        .iter()
        .chain(core::iter::once(&pins::DRY_RUN_ADC_CHANNEL));
    for &channel in channels {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcChannelFailed { channel, rc: ret });
        }
    }

    info!(
        "hw_init: ADC1 configured (level={:?}, dry-run={})",
        pins::LEVEL_PROBE_ADC_CHANNELS,
        pins::DRY_RUN_ADC_CHANNEL
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract; single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.max(0) as u16)
}

fn raw_to_millivolts(raw: u32) -> u16 {
    (raw.min(ADC_MAX_RAW) * u32::from(pins::ADC_FULL_SCALE_MV) / ADC_MAX_RAW) as u16
}

fn adc_channel(channel: Channel) -> Option<u32> {
    match channel {
        Channel::Level(i) => pins::LEVEL_PROBE_ADC_CHANNELS.get(usize::from(i)).copied(),
        Channel::DryRun => Some(pins::DRY_RUN_ADC_CHANNEL),
    }
}

/// Probe ADC reader.  Averages four conversions per channel.
///
/// On host builds it returns the simulated millivolt values set through
/// [`ProbeAdc::set_sim_millivolts`], starting with every probe dry.
pub struct ProbeAdc {
    #[cfg(not(target_os = "espidf"))]
    sim_mv: [u16; LEVEL_PROBES + 1],
}

impl Default for ProbeAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeAdc {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_mv: [pins::ADC_FULL_SCALE_MV; LEVEL_PROBES + 1],
        }
    }

    /// Set the simulated reading of a channel.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_millivolts(&mut self, channel: Channel, mv: u16) {
        let idx = match channel {
            Channel::Level(i) => usize::from(i),
            Channel::DryRun => LEVEL_PROBES,
        };
        if let Some(slot) = self.sim_mv.get_mut(idx) {
            *slot = mv;
        }
    }

    #[cfg(target_os = "espidf")]
    fn sample(&mut self, adc_ch: u32, _channel: Channel) -> Result<u32, SensorError> {
        let mut sum = 0u32;
        for _ in 0..OVERSAMPLE {
            sum += u32::from(adc1_read(adc_ch)?);
        }
        Ok(sum / OVERSAMPLE)
    }

    #[cfg(not(target_os = "espidf"))]
    fn sample(&mut self, _adc_ch: u32, channel: Channel) -> Result<u32, SensorError> {
        let idx = match channel {
            Channel::Level(i) => usize::from(i),
            Channel::DryRun => LEVEL_PROBES,
        };
        let mv = self.sim_mv[idx];
        Ok(u32::from(mv) * ADC_MAX_RAW / u32::from(pins::ADC_FULL_SCALE_MV))
    }
}

impl AnalogChannels for ProbeAdc {
    fn read_millivolts(&mut self, channel: Channel) -> Result<u16, SensorError> {
        let adc_ch = adc_channel(channel).ok_or(SensorError::AdcReadFailed)?;
        let raw = self.sample(adc_ch, channel)?;
        Ok(raw_to_millivolts(raw))
    }
}
