//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements            | Connects to                    |
//! |------------|-----------------------|--------------------------------|
//! | `hardware` | SensorPort, MotorPort | probe ADC, fault lines, relay, |
//! |            |                       | panel LEDs                     |
//! | `log_sink` | EventSink             | Serial log output              |
//! | `nvs`      | ConfigPort            | NVS / in-memory store          |
//! |            | RecordStore           |                                |
//! | `eeprom`   | RecordStore           | 24xx EEPROM on I²C             |
//! | `time`     | ClockPort             | ESP32 system timer and RTC     |

pub mod eeprom;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
