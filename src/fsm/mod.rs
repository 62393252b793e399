//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌──────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId      │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├──────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Disconnected │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Warming      │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Steady       │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  └──────────────┴───────────┴──────────┴───────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut MonitorContext`.

pub mod context;
pub mod states;

use core::fmt;

use context::MonitorContext;
use log::info;
use serde::Serialize;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Monitor loop states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum StateId {
    Disconnected = 0,
    Warming = 1,
    Steady = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Every state, in table order.
    pub const ALL: [StateId; Self::COUNT] = [Self::Disconnected, Self::Warming, Self::Steady];
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Warming => write!(f, "Warming"),
            Self::Steady => write!(f, "Steady"),
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut MonitorContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut MonitorContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// Drives the monitor states from a fixed descriptor table.
///
/// The engine owns only bookkeeping (which state, since which tick); all
/// decisions live in the handlers and everything they need is on the
/// [`MonitorContext`].
pub struct Fsm {
    /// Indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
    tick_count: u64,
    /// Tick at which `current` was entered.
    entered_at: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial,
            tick_count: 0,
            entered_at: 0,
        }
    }

    /// Enter the initial state.  Call once, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut MonitorContext) {
        info!("Monitor starting in {}", self.current);
        if let Some(enter) = self.descriptor().on_enter {
            enter(ctx);
        }
    }

    /// Run the current state's update and follow the transition it asks for.
    pub fn tick(&mut self, ctx: &mut MonitorContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.entered_at;

        if let Some(next) = (self.descriptor().on_update)(ctx) {
            self.enter(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    fn descriptor(&self) -> &StateDescriptor {
        &self.table[self.current as usize]
    }

    fn enter(&mut self, next: StateId, ctx: &mut MonitorContext) {
        info!("Monitor state {} -> {}", self.current, next);

        if let Some(exit) = self.descriptor().on_exit {
            exit(ctx);
        }

        self.current = next;
        self.entered_at = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.descriptor().on_enter {
            enter(ctx);
        }
    }
}

/// Hooks for driving the engine directly in tests.
#[cfg(test)]
impl Fsm {
    fn force_transition(&mut self, next: StateId, ctx: &mut MonitorContext) {
        if next != self.current {
            self.enter(next, ctx);
        }
    }

    fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.entered_at
    }
}
