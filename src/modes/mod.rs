//! Operating modes.
//!
//! Exactly one mode is active at a time.  [`ActiveMode`] is a tagged enum,
//! so the exclusivity is structural: starting a mode replaces the previous
//! variant, and the per-run state of Timer, Countdown, Twist and Auto lives
//! inside its variant and is dropped with it.
//!
//! The engines here are pure: they read a tick timestamp and a few inputs
//! and return motor *requests*.  Only the controller touches the motor.

pub mod auto;
pub mod countdown;
pub mod timer;
pub mod twist;

use core::fmt;

use serde::{Deserialize, Serialize};

use auto::AutoRun;
use countdown::CountdownRun;
use timer::TimerRun;
use twist::TwistRun;

/// Mode identity without run state.  Used in status, records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ModeKind {
    #[default]
    Idle = 0,
    Manual = 1,
    SemiAuto = 2,
    Timer = 3,
    Countdown = 4,
    Twist = 5,
    Auto = 6,
}

impl ModeKind {
    /// Decode the persisted mode byte.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Idle),
            1 => Some(Self::Manual),
            2 => Some(Self::SemiAuto),
            3 => Some(Self::Timer),
            4 => Some(Self::Countdown),
            5 => Some(Self::Twist),
            6 => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Manual => "MANUAL",
            Self::SemiAuto => "SEMI_AUTO",
            Self::Timer => "TIMER",
            Self::Countdown => "COUNTDOWN",
            Self::Twist => "TWIST",
            Self::Auto => "AUTO",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active mode and its run state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveMode {
    #[default]
    Idle,
    Manual,
    SemiAuto,
    Timer(TimerRun),
    Countdown(CountdownRun),
    Twist(TwistRun),
    Auto(AutoRun),
}

impl ActiveMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Manual => ModeKind::Manual,
            Self::SemiAuto => ModeKind::SemiAuto,
            Self::Timer(_) => ModeKind::Timer,
            Self::Countdown(_) => ModeKind::Countdown,
            Self::Twist(_) => ModeKind::Twist,
            Self::Auto(_) => ModeKind::Auto,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Modes that keep control of the motor when the dry-run detector
    /// confirms dry.
    pub fn holds_motor(&self) -> bool {
        matches!(self, Self::Manual | Self::SemiAuto | Self::Auto(_))
    }
}
