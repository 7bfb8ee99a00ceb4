//! GPIO / peripheral pin assignments for the PumpGuard controller board.
//!
//! Single source of truth: every driver and `main()` references this
//! module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Motor contactor relay
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor.
pub const RELAY_GPIO: i32 = 7;
/// Rev B boards drive the coil through a PNP stage (LOW = energised).
pub const RELAY_ACTIVE_LOW: bool = false;

// ---------------------------------------------------------------------------
// Probes: analog (ADC1)
// ---------------------------------------------------------------------------

/// Tank level probes, bottom first.  ADC1 CH0–CH4 = GPIO 1–5 on ESP32-S3.
pub const LEVEL_PROBE_ADC_CHANNELS: [u32; 5] = [0, 1, 2, 3, 4];
/// Pump-inlet dry-run probe.  ADC1 CH5 = GPIO 6.
pub const DRY_RUN_ADC_CHANNEL: u32 = 5;
/// Input voltage at full-scale reading with 12 dB attenuation.
pub const ADC_FULL_SCALE_MV: u16 = 3300;

// ---------------------------------------------------------------------------
// Fault lines (active HIGH while tripped)
// ---------------------------------------------------------------------------

/// Motor current comparator output.
pub const OVERLOAD_GPIO: i32 = 8;
/// Supply voltage window supervisor output.
pub const VOLTAGE_FAULT_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Front-panel LEDs (active HIGH)
// ---------------------------------------------------------------------------

pub const LED_MOTOR_GPIO: i32 = 11;
pub const LED_FAULT_GPIO: i32 = 12;
pub const LED_DRY_GPIO: i32 = 13;
pub const LED_MODE_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// I²C bus: 24LC-series record EEPROM
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;
pub const I2C_FREQ_HZ: u32 = 100_000;
/// 7-bit address with A0–A2 strapped low.
pub const EEPROM_I2C_ADDR: u8 = 0x50;
/// Byte offset of the controller record (page aligned).
pub const EEPROM_RECORD_OFFSET: u16 = 0x0000;

// ---------------------------------------------------------------------------
// UART command console / radio modem
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;
pub const UART_BAUD: u32 = 115_200;
