//! Single-shot countdown: run for a fixed time, stop early if the tank fills.

use log::info;

/// Why a countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    TankFull,
    Elapsed,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Running { remaining_secs: u32 },
    Finished(CountdownEnd),
}

/// Run state while Countdown mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownRun {
    pub run_secs: u32,
    pub deadline_ms: u64,
    /// Always 1: one run per start.
    pub remaining_runs: u8,
    /// Seconds shown on the display, rounded up.
    pub remaining_secs: u32,
}

impl CountdownRun {
    /// Arm a countdown.  A zero duration is not a run; the caller treats
    /// `None` as a stop.
    pub fn start(now_ms: u64, secs: u32) -> Option<Self> {
        if secs == 0 {
            return None;
        }
        info!("countdown: {} s", secs);
        Some(Self {
            run_secs: secs,
            deadline_ms: now_ms + u64::from(secs) * 1000,
            remaining_runs: 1,
            remaining_secs: secs,
        })
    }

    pub fn tick(&mut self, now_ms: u64, tank_full: bool) -> CountdownStep {
        if tank_full {
            self.finish();
            return CountdownStep::Finished(CountdownEnd::TankFull);
        }
        if now_ms >= self.deadline_ms {
            self.finish();
            return CountdownStep::Finished(CountdownEnd::Elapsed);
        }

        // Ceiling division: never show 0 while time remains.
        let remaining_ms = self.deadline_ms - now_ms;
        self.remaining_secs = remaining_ms.div_ceil(1000) as u32;
        CountdownStep::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    fn finish(&mut self) {
        self.remaining_secs = 0;
        self.remaining_runs = 0;
    }
}
