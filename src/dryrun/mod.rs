//! Dry-run detector: a function-pointer finite state machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌─────────┬───────────┬────────────────────────────┐    │
//! │  │ State   │ on_enter  │ on_update                  │    │
//! │  ├─────────┼───────────┼────────────────────────────┤    │
//! │  │ Idle    │ fn(ctx)   │ fn(ctx) -> Option<State>   │    │
//! │  │ Probe   │ fn(ctx)   │ fn(ctx) -> Option<State>   │    │
//! │  │ Normal  │ fn(ctx)   │ fn(ctx) -> Option<State>   │    │
//! │  └─────────┴───────────┴────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the detector calls `on_update` for the current state.  A
//! `Some(next)` return runs `on_enter` for the next state.  Handlers never
//! touch the motor: they leave a request in [`DryRunContext::motor_request`]
//! and the controller decides whether to honour it.
//!
//! Whether a request is even recorded depends on [`Supervision`]: modes that
//! hold independent control of the motor (Manual, Semi-Auto, Auto) still
//! see the detector's verdict but veto its motor effects.

pub mod context;
pub mod states;

use context::DryRunContext;
use log::info;

use crate::config::ControllerConfig;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Dry-run detector states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DryRunState {
    /// Dry confirmed (or nothing running); waiting for the next probe.
    Idle = 0,
    /// Motor on for a bounded window to test for water.
    Probe = 1,
    /// Water present; absence must persist past the confirm delay.
    Normal = 2,
}

impl DryRunState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a table index back to a state.  Out-of-range indices fall
    /// back to `Idle` in release builds.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Probe,
            2 => Self::Normal,
            _ => {
                debug_assert!(false, "invalid dry-run state index: {idx}");
                Self::Idle
            }
        }
    }
}

/// How the active mode relates to the detector this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervision {
    /// No mode is active.  The detector resets and forces the motor off.
    Unsupervised,
    /// The mode drives the motor itself; detector motor effects are vetoed.
    Hold,
    /// The detector may start and stop the motor while the mode wants it on.
    Driven { demand: bool },
}

/// Result of one detector update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunOutput {
    /// Motor command the detector wants applied, if any.
    pub motor_request: Option<bool>,
    /// Debounced "water present" signal (`senseDryRun`).
    pub water_ok: bool,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions.  Runs once per transition.
pub type StateActionFn = fn(&mut DryRunContext);

/// Per-tick update handler.  `Some(next)` triggers a transition.
pub type StateUpdateFn = fn(&mut DryRunContext) -> Option<DryRunState>;

/// Static descriptor for a single detector state.
pub struct StateDescriptor {
    pub id: DryRunState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// Detector engine
// ---------------------------------------------------------------------------

/// The dry-run detector.  Owns the state table and its context; the
/// controller is the only caller.
pub struct DryRunDetector {
    table: [StateDescriptor; DryRunState::COUNT],
    current: usize,
    ctx: DryRunContext,
}

impl DryRunDetector {
    pub fn new(config: &ControllerConfig) -> Self {
        let table = states::build_state_table();
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "dry-run state table out of order"
        );
        Self {
            table,
            current: DryRunState::Idle as usize,
            ctx: DryRunContext::new(config),
        }
    }

    /// Advance the detector by one tick.
    pub fn update(&mut self, now_ms: u64, water_present: bool, supervision: Supervision) -> DryRunOutput {
        self.ctx.begin_tick(now_ms, water_present);

        match supervision {
            Supervision::Unsupervised => {
                // Never run unsupervised: idle and force the motor off.
                self.rest(now_ms);
                self.ctx.motor_request = Some(false);
            }
            Supervision::Driven { demand: false } => {
                // Mode is between run windows; probe as soon as it wants water.
                self.rest(now_ms);
            }
            Supervision::Hold | Supervision::Driven { demand: true } => {
                self.ctx.drives_motor = matches!(supervision, Supervision::Driven { .. });
                if let Some(next) = (self.table[self.current].on_update)(&mut self.ctx) {
                    self.transition(next);
                }
            }
        }

        DryRunOutput {
            motor_request: self.ctx.motor_request.take(),
            water_ok: self.water_ok(),
        }
    }

    /// Drop back to `Idle` with the probe due immediately.  Called whenever
    /// a mode starts so a fresh run is tested straight away.
    pub fn reset(&mut self, now_ms: u64) {
        self.ctx.begin_tick(now_ms, false);
        self.rest(now_ms);
        self.ctx.motor_request = None;
    }

    /// Current detector state.
    pub fn state(&self) -> DryRunState {
        DryRunState::from_index(self.current)
    }

    /// Debounced water signal: true only once water has been seen and its
    /// absence has not been confirmed.
    pub fn water_ok(&self) -> bool {
        self.state() == DryRunState::Normal
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn rest(&mut self, now_ms: u64) {
        self.ctx.drives_motor = false;
        if self.state() != DryRunState::Idle {
            self.transition(DryRunState::Idle);
        }
        self.ctx.deadline_ms = now_ms;
    }

    fn transition(&mut self, next: DryRunState) {
        let next_idx = next as usize;
        info!(
            "dry-run: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );
        self.current = next_idx;
        if let Some(enter) = self.table[next_idx].on_enter {
            enter(&mut self.ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_supervision() -> impl Strategy<Value = Supervision> {
        prop_oneof![
            Just(Supervision::Unsupervised),
            Just(Supervision::Hold),
            any::<bool>().prop_map(|demand| Supervision::Driven { demand }),
        ]
    }

    proptest! {
        #[test]
        fn hold_never_requests_motor(
            steps in proptest::collection::vec((1u64..3_000, any::<bool>()), 1..200)
        ) {
            let mut d = DryRunDetector::new(&ControllerConfig::default());
            let mut t = 0;
            for (dt, water) in steps {
                t += dt;
                let out = d.update(t, water, Supervision::Hold);
                prop_assert_eq!(out.motor_request, None);
            }
        }

        #[test]
        fn water_ok_only_in_normal(
            steps in proptest::collection::vec((1u64..3_000, any::<bool>(), arb_supervision()), 1..200)
        ) {
            let mut d = DryRunDetector::new(&ControllerConfig::default());
            let mut t = 0;
            for (dt, water, sup) in steps {
                t += dt;
                let out = d.update(t, water, sup);
                prop_assert_eq!(out.water_ok, d.state() == DryRunState::Normal);
                if sup == Supervision::Unsupervised {
                    prop_assert_eq!(out.motor_request, Some(false));
                }
            }
        }
    }
}
