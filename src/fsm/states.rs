//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers, with no closures
//! and no dynamic dispatch.
//!
//! ```text
//!  DISCONNECTED ──[link up]──▶ WARMING ──[window full]──▶ STEADY
//!        ▲                        ▲                          │
//!        │                        └──[window not full]───────┤
//!        │                                                   │
//!        └────────────[link down]── WARMING / STEADY ◀───────┘
//! ```

use super::context::MonitorContext;
use super::{StateDescriptor, StateId};
use crate::safety::LinkFault;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Disconnected
        StateDescriptor {
            id: StateId::Disconnected,
            on_enter: Some(disconnected_enter),
            on_exit: None,
            on_update: disconnected_update,
        },
        // Index 1: Warming
        StateDescriptor {
            id: StateId::Warming,
            on_enter: Some(warming_enter),
            on_exit: None,
            on_update: warming_update,
        },
        // Index 2: Steady
        StateDescriptor {
            id: StateId::Steady,
            on_enter: Some(steady_enter),
            on_exit: Some(steady_exit),
            on_update: steady_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED: no sensor session, gate held blocked
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(ctx: &mut MonitorContext) {
    ctx.commands.force_block = true;
    ctx.commands.clear_samples = true;
    ctx.commands.evaluate = false;
    warn!("DISCONNECTED: samples cleared, gate forced to blocked");
}

fn disconnected_update(ctx: &mut MonitorContext) -> Option<StateId> {
    if ctx.link_up() {
        return Some(StateId::Warming);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WARMING: connected, window not yet full; fail-safe blocked
// ═══════════════════════════════════════════════════════════════════════════

fn warming_enter(ctx: &mut MonitorContext) {
    ctx.commands.force_block = true;
    ctx.commands.evaluate = true;
    info!(
        "WARMING: collecting samples ({}/{})",
        ctx.window.len, ctx.window.capacity
    );
}

fn warming_update(ctx: &mut MonitorContext) -> Option<StateId> {
    if ctx.has_fault(LinkFault::LinkDown) {
        return Some(StateId::Disconnected);
    }
    if ctx.window.is_full() {
        return Some(StateId::Steady);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  STEADY: window full, decisions follow the smoothed cadence
// ═══════════════════════════════════════════════════════════════════════════

fn steady_enter(ctx: &mut MonitorContext) {
    ctx.commands.evaluate = true;
    info!(
        "STEADY: window full, average {:.1} RPM",
        ctx.window.average_rpm
    );
}

fn steady_exit(ctx: &mut MonitorContext) {
    info!(
        "STEADY: leaving after {:.0}s",
        ctx.time_in_state().as_secs_f32()
    );
}

fn steady_update(ctx: &mut MonitorContext) -> Option<StateId> {
    if ctx.has_fault(LinkFault::LinkDown) {
        return Some(StateId::Disconnected);
    }
    if !ctx.window.is_full() {
        return Some(StateId::Warming);
    }
    None
}
