//! Inbound commands to the controller.
//!
//! These represent actions requested by the outside world (front panel,
//! UART console, LoRa link) that the
//! [`PumpController`](super::service::PumpController) interprets and acts
//! upon.
//!
//! The text protocol is one command per line, `NAME` or `NAME:a,b,...`:
//!
//! ```text
//! MOTOR_ON                     AUTO_START:30,60,3
//! TIMER_SET:0,6,30,7,0         TIMER_SET:0,6,30,7,0,62   (day mask)
//! TWIST_SET:60,120,6,0,18,0    COUNTDOWN_START:10
//! ```
//!
//! Framing and transport live outside the core; parsing rejects malformed
//! lines here so the controller only ever sees well-formed values.

use core::fmt;
use core::str::FromStr;

use crate::clock::HourMinute;
use crate::modes::auto::AutoSettings;
use crate::modes::timer::{ALL_DAYS, TIMER_SLOTS};
use crate::modes::twist::TwistSettings;

/// Most arguments any command takes.
const MAX_ARGS: usize = 6;

/// Every command name the console accepts.
const NAMES: [&str; 17] = [
    "MOTOR_ON",
    "MOTOR_OFF",
    "SEMI_AUTO_START",
    "SEMI_AUTO_STOP",
    "TWIST_START",
    "TWIST_STOP",
    "TWIST_SET",
    "TIMER_START",
    "TIMER_STOP",
    "TIMER_SET",
    "TIMER_DISABLE",
    "AUTO_START",
    "AUTO_STOP",
    "COUNTDOWN_START",
    "COUNTDOWN_STOP",
    "CLEAR_MAX_RUN",
    "STOP_ALL",
];

/// Commands that external adapters can send into the controller core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Manual direct control.
    MotorOn,
    MotorOff,

    SemiAutoStart,
    SemiAutoStop,

    /// Start twist, optionally replacing the stored settings first.
    TwistStart(Option<TwistSettings>),
    TwistStop,
    /// Store twist settings without starting.
    TwistSet(TwistSettings),

    TimerStart,
    TimerStop,
    /// Configure and enable one slot.
    TimerSet {
        index: usize,
        on: HourMinute,
        off: HourMinute,
        day_mask: u8,
    },
    TimerDisable(usize),

    /// Start auto with the given or the configured default parameters.
    AutoStart(Option<AutoSettings>),
    AutoStop,

    /// Start a countdown of the given or the stored number of minutes.
    CountdownStart(Option<u16>),
    CountdownStop,

    /// Operator acknowledgement of a max-run trip.
    ClearMaxRun,

    /// Stop every mode and the motor.
    StopAll,
}

/// Why a command line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Command name not recognised.
    Unknown,
    /// Wrong number of arguments.
    ArgCount { expected: usize, got: usize },
    /// An argument is not a number or is out of range.
    BadArgument(usize),
    /// Timer slot index outside 0–4.
    SlotOutOfRange(usize),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown command"),
            Self::ArgCount { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
            Self::BadArgument(i) => write!(f, "argument {i} invalid"),
            Self::SlotOutOfRange(i) => write!(f, "timer slot {i} out of range"),
        }
    }
}

/// Parsed numeric arguments.
struct Args(heapless::Vec<u16, MAX_ARGS>);

impl Args {
    fn parse(raw: Option<&str>) -> Result<Self, CommandError> {
        let mut out = heapless::Vec::new();
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self(out));
        };
        for (i, field) in raw.split(',').enumerate() {
            let v = field
                .trim()
                .parse::<u16>()
                .map_err(|_| CommandError::BadArgument(i))?;
            out.push(v).map_err(|_| CommandError::ArgCount {
                expected: MAX_ARGS,
                got: i + 1,
            })?;
        }
        Ok(Self(out))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expect(&self, expected: usize) -> Result<(), CommandError> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(CommandError::ArgCount {
                expected,
                got: self.len(),
            })
        }
    }

    fn none(&self) -> Result<(), CommandError> {
        self.expect(0)
    }

    fn u8_at(&self, i: usize, max: u16) -> Result<u8, CommandError> {
        match self.0.get(i) {
            Some(&v) if v <= max => Ok(v as u8),
            _ => Err(CommandError::BadArgument(i)),
        }
    }

    fn u16_at(&self, i: usize) -> Result<u16, CommandError> {
        self.0.get(i).copied().ok_or(CommandError::BadArgument(i))
    }

    fn hm_at(&self, i: usize) -> Result<HourMinute, CommandError> {
        Ok(HourMinute::new(self.u8_at(i, 23)?, self.u8_at(i + 1, 59)?))
    }

    fn slot_at(&self, i: usize) -> Result<usize, CommandError> {
        let index = usize::from(self.u16_at(i)?);
        if index < TIMER_SLOTS {
            Ok(index)
        } else {
            Err(CommandError::SlotOutOfRange(index))
        }
    }

    fn twist(&self) -> Result<TwistSettings, CommandError> {
        self.expect(6)?;
        Ok(TwistSettings::new(
            self.u16_at(0)?,
            self.u16_at(1)?,
            self.hm_at(2)?,
            self.hm_at(4)?,
        ))
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, raw_args) = match line.split_once(':') {
            Some((n, a)) => (n.trim(), Some(a)),
            None => (line, None),
        };
        if !NAMES.contains(&name) {
            return Err(CommandError::Unknown);
        }
        let args = Args::parse(raw_args)?;

        let cmd = match name {
            "MOTOR_ON" => {
                args.none()?;
                Self::MotorOn
            }
            "MOTOR_OFF" => {
                args.none()?;
                Self::MotorOff
            }
            "SEMI_AUTO_START" => {
                args.none()?;
                Self::SemiAutoStart
            }
            "SEMI_AUTO_STOP" => {
                args.none()?;
                Self::SemiAutoStop
            }
            "TWIST_START" if args.is_empty() => Self::TwistStart(None),
            "TWIST_START" => Self::TwistStart(Some(args.twist()?)),
            "TWIST_STOP" => {
                args.none()?;
                Self::TwistStop
            }
            "TWIST_SET" => Self::TwistSet(args.twist()?),
            "TIMER_START" => {
                args.none()?;
                Self::TimerStart
            }
            "TIMER_STOP" => {
                args.none()?;
                Self::TimerStop
            }
            "TIMER_SET" => {
                let day_mask = match args.len() {
                    5 => ALL_DAYS,
                    6 => args.u8_at(5, u16::from(ALL_DAYS))?,
                    got => return Err(CommandError::ArgCount { expected: 5, got }),
                };
                Self::TimerSet {
                    index: args.slot_at(0)?,
                    on: args.hm_at(1)?,
                    off: args.hm_at(3)?,
                    day_mask,
                }
            }
            "TIMER_DISABLE" => {
                args.expect(1)?;
                Self::TimerDisable(args.slot_at(0)?)
            }
            "AUTO_START" if args.is_empty() => Self::AutoStart(None),
            "AUTO_START" => {
                args.expect(3)?;
                Self::AutoStart(Some(AutoSettings::new(
                    args.u16_at(0)?,
                    args.u16_at(1)?,
                    args.u8_at(2, u16::from(u8::MAX))?,
                )))
            }
            "AUTO_STOP" => {
                args.none()?;
                Self::AutoStop
            }
            "COUNTDOWN_START" if args.is_empty() => Self::CountdownStart(None),
            "COUNTDOWN_START" => {
                args.expect(1)?;
                Self::CountdownStart(Some(args.u16_at(0)?))
            }
            "COUNTDOWN_STOP" => {
                args.none()?;
                Self::CountdownStop
            }
            "CLEAR_MAX_RUN" => {
                args.none()?;
                Self::ClearMaxRun
            }
            "STOP_ALL" => {
                args.none()?;
                Self::StopAll
            }
            _ => return Err(CommandError::Unknown),
        };
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_commands() {
        assert_eq!("MOTOR_ON".parse::<Command>(), Ok(Command::MotorOn));
        assert_eq!("  SEMI_AUTO_STOP\r\n".parse::<Command>(), Ok(Command::SemiAutoStop));
        assert_eq!("AUTO_START".parse::<Command>(), Ok(Command::AutoStart(None)));
        assert_eq!("CLEAR_MAX_RUN".parse::<Command>(), Ok(Command::ClearMaxRun));
    }

    #[test]
    fn auto_parameters() {
        assert_eq!(
            "AUTO_START:30,60,3".parse::<Command>(),
            Ok(Command::AutoStart(Some(AutoSettings::new(30, 60, 3))))
        );
        assert_eq!(
            "AUTO_START:30,60".parse::<Command>(),
            Err(CommandError::ArgCount { expected: 3, got: 2 })
        );
        assert_eq!(
            "AUTO_START:30,60,300".parse::<Command>(),
            Err(CommandError::BadArgument(2))
        );
    }

    #[test]
    fn timer_set() {
        assert_eq!(
            "TIMER_SET:0,6,30,7,0".parse::<Command>(),
            Ok(Command::TimerSet {
                index: 0,
                on: HourMinute::new(6, 30),
                off: HourMinute::new(7, 0),
                day_mask: ALL_DAYS,
            })
        );
        assert_eq!(
            "TIMER_SET:4,23,0,1,0,65".parse::<Command>().map(|c| match c {
                Command::TimerSet { day_mask, .. } => day_mask,
                _ => 0xFF,
            }),
            Ok(65)
        );
        assert_eq!(
            "TIMER_SET:5,6,30,7,0".parse::<Command>(),
            Err(CommandError::SlotOutOfRange(5))
        );
        assert_eq!(
            "TIMER_SET:0,24,0,7,0".parse::<Command>(),
            Err(CommandError::BadArgument(1))
        );
    }

    #[test]
    fn twist_forms() {
        let s = TwistSettings::new(60, 120, HourMinute::new(6, 0), HourMinute::new(18, 0));
        assert_eq!("TWIST_SET:60,120,6,0,18,0".parse::<Command>(), Ok(Command::TwistSet(s)));
        assert_eq!("TWIST_START:60,120,6,0,18,0".parse::<Command>(), Ok(Command::TwistStart(Some(s))));
        assert_eq!("TWIST_START".parse::<Command>(), Ok(Command::TwistStart(None)));
    }

    #[test]
    fn countdown_forms() {
        assert_eq!("COUNTDOWN_START:10".parse::<Command>(), Ok(Command::CountdownStart(Some(10))));
        assert_eq!("COUNTDOWN_START".parse::<Command>(), Ok(Command::CountdownStart(None)));
    }

    #[test]
    fn rejects_junk() {
        assert_eq!("REBOOT".parse::<Command>(), Err(CommandError::Unknown));
        assert_eq!("".parse::<Command>(), Err(CommandError::Unknown));
        assert_eq!("MOTOR_ON:1".parse::<Command>(), Err(CommandError::ArgCount { expected: 0, got: 1 }));
        assert_eq!("COUNTDOWN_START:ten".parse::<Command>(), Err(CommandError::BadArgument(0)));
        assert!("TWIST_SET:1,2,3,4,5,6,7".parse::<Command>().is_err());
    }

    #[test]
    fn unknown_name_wins_over_argument_errors() {
        assert_eq!("FOO:x".parse::<Command>(), Err(CommandError::Unknown));
        assert_eq!("FOO:1,2,3,4,5,6,7".parse::<Command>(), Err(CommandError::Unknown));
        assert_eq!("motor_on".parse::<Command>(), Err(CommandError::Unknown));
        assert_eq!("MOTOR_ON:x".parse::<Command>(), Err(CommandError::BadArgument(0)));
    }
}
