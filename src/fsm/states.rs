//! Transition rules and entry/exit actions.
//!
//! ```text
//!  UNINITIALIZED ──[Initialize]──▶ INITIALIZING ──[Ready]──▶ MEASURING
//!                                       │                    │     ▲
//!                                    [Fault]              [Stop] [Start]
//!                                       │                    ▼     │
//!                                       │                   STOPPED
//!                                       ▼
//!  Initializing / Measuring / Stopped ──[Fault]──▶ FAILED (terminal)
//! ```

use log::{error, info};

use super::context::LifecycleContext;
use super::{StateDescriptor, StateId, Trigger};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table. Row order matches `StateId` discriminants.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Uninitialized,
            name: "Uninitialized",
            on_enter: None,
            on_exit: None,
            on_event: uninitialized_event,
        },
        StateDescriptor {
            id: StateId::Initializing,
            name: "Initializing",
            on_enter: Some(initializing_enter),
            on_exit: None,
            on_event: initializing_event,
        },
        StateDescriptor {
            id: StateId::Measuring,
            name: "Measuring",
            on_enter: Some(measuring_enter),
            on_exit: Some(measuring_exit),
            on_event: measuring_event,
        },
        StateDescriptor {
            id: StateId::Stopped,
            name: "Stopped",
            on_enter: Some(stopped_enter),
            on_exit: None,
            on_event: stopped_event,
        },
        StateDescriptor {
            id: StateId::Failed,
            name: "Failed",
            on_enter: Some(failed_enter),
            on_exit: None,
            on_event: failed_event,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNINITIALIZED
// ═══════════════════════════════════════════════════════════════════════════

fn uninitialized_event(trigger: Trigger) -> Option<StateId> {
    match trigger {
        Trigger::Initialize => Some(StateId::Initializing),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIALIZING
// ═══════════════════════════════════════════════════════════════════════════

fn initializing_enter(ctx: &mut LifecycleContext) {
    ctx.cancel();
}

fn initializing_event(trigger: Trigger) -> Option<StateId> {
    match trigger {
        Trigger::Ready => Some(StateId::Measuring),
        Trigger::Fault => Some(StateId::Failed),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  MEASURING
// ═══════════════════════════════════════════════════════════════════════════

fn measuring_enter(ctx: &mut LifecycleContext) {
    ctx.diagnostics.consecutive_failures = 0;
    info!("MEASURING: continuous measurement running");
}

fn measuring_exit(ctx: &mut LifecycleContext) {
    // A continuation in flight must not publish into the next state.
    ctx.cancel();
}

fn measuring_event(trigger: Trigger) -> Option<StateId> {
    match trigger {
        Trigger::Stop => Some(StateId::Stopped),
        Trigger::Fault => Some(StateId::Failed),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPED
// ═══════════════════════════════════════════════════════════════════════════

fn stopped_enter(ctx: &mut LifecycleContext) {
    info!(
        "STOPPED: reporting missing values ({} cycles completed)",
        ctx.diagnostics.cycles_completed
    );
}

fn stopped_event(trigger: Trigger) -> Option<StateId> {
    match trigger {
        Trigger::Start => Some(StateId::Measuring),
        Trigger::Fault => Some(StateId::Failed),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAILED
// ═══════════════════════════════════════════════════════════════════════════

fn failed_enter(ctx: &mut LifecycleContext) {
    ctx.cancel();
    error!("FAILED: device presumed unreachable until the driver is recreated");
}

fn failed_event(_trigger: Trigger) -> Option<StateId> {
    None
}
