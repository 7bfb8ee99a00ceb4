//! Concrete dry-run state handlers and table builder.
//!
//! ```text
//!  IDLE ──[water]──────────────────────────▶ NORMAL
//!   │ ▲                                       │
//!   │ └──[window elapsed, dry: motor off]─┐   │
//! [probe due]                             │ [dry ≥ confirm: motor off]
//!   ▼                                     │   │
//!  PROBE ──[water]──▶ NORMAL              │   ▼
//!   └─────────────────────────────────────┘  IDLE
//! ```

use super::context::DryRunContext;
use super::{DryRunState, StateDescriptor};
use log::{info, warn};

/// Build the static state table.  Called once at construction.
pub fn build_state_table() -> [StateDescriptor; DryRunState::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: DryRunState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_update: idle_update,
        },
        // Index 1: Probe
        StateDescriptor {
            id: DryRunState::Probe,
            name: "Probe",
            on_enter: Some(probe_enter),
            on_update: probe_update,
        },
        // Index 2: Normal
        StateDescriptor {
            id: DryRunState::Normal,
            name: "Normal",
            on_enter: Some(normal_enter),
            on_update: normal_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut DryRunContext) {
    ctx.confirming = false;
}

fn idle_update(ctx: &mut DryRunContext) -> Option<DryRunState> {
    if ctx.water_present {
        return Some(DryRunState::Normal);
    }
    if ctx.deadline_elapsed() {
        return Some(DryRunState::Probe);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROBE: motor on for a bounded window to look for water
// ═══════════════════════════════════════════════════════════════════════════

fn probe_enter(ctx: &mut DryRunContext) {
    ctx.deadline_ms = ctx.now_ms + ctx.probe_on_ms;
    ctx.request_motor(true);
    info!("dry-run: probing for {} ms", ctx.probe_on_ms);
}

fn probe_update(ctx: &mut DryRunContext) -> Option<DryRunState> {
    if ctx.water_present {
        return Some(DryRunState::Normal);
    }
    if ctx.deadline_elapsed() {
        ctx.deadline_ms = ctx.now_ms + ctx.probe_off_ms;
        ctx.request_motor(false);
        warn!("dry-run: no water after probe, retry in {} ms", ctx.probe_off_ms);
        return Some(DryRunState::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL: water present, absence is debounced
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut DryRunContext) {
    ctx.confirming = false;
    ctx.request_motor(true);
}

fn normal_update(ctx: &mut DryRunContext) -> Option<DryRunState> {
    if ctx.water_present {
        ctx.confirming = false;
        return None;
    }

    if !ctx.confirming {
        ctx.confirming = true;
        ctx.confirm_start_ms = ctx.now_ms;
        return None;
    }

    if ctx.now_ms.saturating_sub(ctx.confirm_start_ms) >= ctx.confirm_ms {
        ctx.deadline_ms = ctx.now_ms + ctx.probe_off_ms;
        ctx.request_motor(false);
        warn!("dry-run: water absent for {} ms, dry confirmed", ctx.confirm_ms);
        return Some(DryRunState::Idle);
    }

    None
}
