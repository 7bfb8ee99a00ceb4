//! PumpGuard Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-period cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink   NvsStore     SystemClock   │
//! │  (Sensor+Motor)      (EventSink)    (Config)     (ClockPort)   │
//! │  Eeprom24x           UART console                              │
//! │  (RecordStore)       (Command lines)                           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             PumpController (pure logic)                │    │
//! │  │  Modes · Dry-run FSM · Safety supervisor               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::ESP_ERR_TIMEOUT;

use pumpguard::adapters::eeprom::Eeprom24x;
use pumpguard::adapters::hardware::HardwareAdapter;
use pumpguard::adapters::log_sink::LogEventSink;
use pumpguard::adapters::nvs::NvsStore;
use pumpguard::adapters::time::SystemClock;
use pumpguard::app::commands::Command;
use pumpguard::app::ports::{ClockPort, ConfigPort, RecordStore};
use pumpguard::app::service::PumpController;
use pumpguard::config::ControllerConfig;
use pumpguard::drivers::hw_init::{self, ProbeAdc};
use pumpguard::drivers::indicator::IndicatorLeds;
use pumpguard::drivers::relay::MotorRelay;
use pumpguard::drivers::watchdog::Watchdog;
use pumpguard::persist::{PersistedRecord, RECORD_LEN};
use pumpguard::pins;
use pumpguard::sensors::SensorHub;

/// Longest command line accepted from the console.
const LINE_LEN: usize = 64;

/// Task watchdog timeout.
const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

/// Accumulates console bytes into complete lines.
struct LineBuffer {
    line: heapless::String<LINE_LEN>,
    overflowed: bool,
}

impl LineBuffer {
    fn new() -> Self {
        Self {
            line: heapless::String::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; returns a finished line on `\n`.
    fn push(&mut self, byte: u8) -> Option<heapless::String<LINE_LEN>> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.line);
                let overflowed = core::mem::replace(&mut self.overflowed, false);
                if overflowed {
                    warn!("console: line longer than {} bytes dropped", LINE_LEN);
                    None
                } else {
                    Some(line)
                }
            }
            b'\r' => None,
            b if b.is_ascii() => {
                if self.line.push(b as char).is_err() {
                    self.overflowed = true;
                }
                None
            }
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PumpGuard v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;
    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);
    let peripherals = Peripherals::take()?;

    // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
    let (relay_pin, led_pins, overload_pin, voltage_pin, sda, scl, tx, rx) = unsafe {
        (
            AnyOutputPin::new(pins::RELAY_GPIO),
            [
                AnyOutputPin::new(pins::LED_MOTOR_GPIO),
                AnyOutputPin::new(pins::LED_FAULT_GPIO),
                AnyOutputPin::new(pins::LED_DRY_GPIO),
                AnyOutputPin::new(pins::LED_MODE_GPIO),
            ],
            AnyIOPin::new(pins::OVERLOAD_GPIO),
            AnyIOPin::new(pins::VOLTAGE_FAULT_GPIO),
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
            AnyIOPin::new(pins::UART_TX_GPIO),
            AnyIOPin::new(pins::UART_RX_GPIO),
        )
    };

    // Relay first so the motor is released as early as possible.
    let relay = MotorRelay::new(PinDriver::output(relay_pin)?, pins::RELAY_ACTIVE_LOW);

    let [motor_led, fault_led, dry_led, mode_led] = led_pins;
    let leds = IndicatorLeds::new(
        PinDriver::output(motor_led)?,
        PinDriver::output(fault_led)?,
        PinDriver::output(dry_led)?,
        PinDriver::output(mode_led)?,
    );

    let mut overload_line = PinDriver::input(overload_pin)?;
    overload_line.set_pull(Pull::Down)?;
    let mut voltage_line = PinDriver::input(voltage_pin)?;
    voltage_line.set_pull(Pull::Down)?;

    let sensor_hub = SensorHub::new(ProbeAdc::new(), overload_line, voltage_line);
    let mut hw = HardwareAdapter::new(sensor_hub, relay, leds);

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let mut eeprom = Eeprom24x::new(i2c, pins::EEPROM_I2C_ADDR, pins::EEPROM_RECORD_OFFSET);

    let uart = UartDriver::new(
        peripherals.uart1,
        tx,
        rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::UART_BAUD)),
    )?;

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let config = match NvsStore::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config load failed ({}), using defaults", e);
            ControllerConfig::default()
        }
    };
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    // ── 4. Controller + persisted record ──────────────────────
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    let mut controller = PumpController::new(config);
    controller.start(&mut hw, &mut sink);
    // Seed the level reading before any console command can start a mode.
    controller.process(&clock, &mut hw, &mut sink);

    let mut raw = [0u8; RECORD_LEN];
    let mut record = PersistedRecord::default();
    match eeprom.read_record(&mut raw) {
        Ok(n) => match PersistedRecord::load_into(&raw[..n], &mut record) {
            Ok(()) => controller.restore(&record, &clock, &mut hw, &mut sink),
            Err(e) => warn!("record rejected ({}), starting from defaults", e),
        },
        Err(e) => warn!("record read failed ({}), starting from defaults", e),
    }

    // ── 5. Control loop ───────────────────────────────────────
    info!("entering control loop ({} ms tick)", tick.as_millis());
    let mut console = LineBuffer::new();
    let mut rx_buf = [0u8; 32];

    loop {
        let n = match uart.read(&mut rx_buf, NON_BLOCK) {
            Ok(n) => n,
            Err(e) if e.code() == ESP_ERR_TIMEOUT as i32 => 0,
            Err(e) => {
                warn!("console: uart read failed: {}", e);
                0
            }
        };
        for &byte in &rx_buf[..n] {
            let Some(line) = console.push(byte) else {
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => controller.handle_command(cmd, &clock, &mut hw, &mut sink),
                Err(e) => warn!("console: '{}' ignored: {}", line.as_str(), e),
            }
        }

        controller.process(&clock, &mut hw, &mut sink);
        controller.persist_if_needed(clock.now_ms(), &mut eeprom);
        watchdog.feed();

        std::thread::sleep(tick);
    }
}
