//! Function-pointer lifecycle state machine.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌───────────────┬───────────┬──────────┬──────────────────┐  │
//! │  │ StateId       │ on_enter  │ on_exit  │ on_event         │  │
//! │  ├───────────────┼───────────┼──────────┼──────────────────┤  │
//! │  │ Uninitialized │ —         │ —        │ fn(trig)->Option │  │
//! │  │ Initializing  │ fn(ctx)   │ —        │ fn(trig)->Option │  │
//! │  │ Measuring     │ fn(ctx)   │ fn(ctx)  │ fn(trig)->Option │  │
//! │  │ Stopped       │ fn(ctx)   │ —        │ fn(trig)->Option │  │
//! │  │ Failed        │ fn(ctx)   │ —        │ fn(trig)->Option │  │
//! │  └───────────────┴───────────┴──────────┴──────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The driver fires a [`Trigger`] when a step of its command sequence
//! completes. `on_event` for the current state decides the next state;
//! `None` means the trigger is not valid here and the caller gets
//! [`Error::InvalidState`]. On a transition the engine runs `on_exit` for
//! the old state and `on_enter` for the new one, both against the shared
//! [`LifecycleContext`].

pub mod context;
pub mod states;

use context::LifecycleContext;
use log::info;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Lifecycle states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Uninitialized = 0,
    Initializing = 1,
    Measuring = 2,
    Stopped = 3,
    Failed = 4,
}

impl StateId {
    pub const COUNT: usize = 5;

    /// Convert a table index back to `StateId`. Out-of-range indices map to
    /// `Failed`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Measuring,
            3 => Self::Stopped,
            4 => Self::Failed,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Failed
            }
        }
    }

    /// States in which no channel is ever decoded.
    pub const fn is_inactive(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Stopped | Self::Failed)
    }
}

/// Completed steps that can move the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Host asked for setup.
    Initialize,
    /// Start command settled; continuous measurement is running.
    Ready,
    /// Host asked to stop measuring.
    Stop,
    /// Host asked to resume measuring.
    Start,
    /// Fatal I/O failure.
    Fault,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit` action, run once per transition.
pub type StateActionFn = fn(&mut LifecycleContext);

/// Transition rule: `Some(next)` if `trigger` is accepted in this state.
pub type StateEventFn = fn(Trigger) -> Option<StateId>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The lifecycle engine. Owns the state table and the current state index.
pub struct Lifecycle {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    transitions: u32,
}

impl Lifecycle {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// Number of transitions taken since construction.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Whether `trigger` would be accepted in the current state.
    pub fn accepts(&self, trigger: Trigger) -> bool {
        (self.table[self.current].on_event)(trigger).is_some()
    }

    /// Apply `trigger`. Returns the new state, or
    /// `Error::InvalidState(current)` if the trigger is not valid here.
    pub fn fire(&mut self, trigger: Trigger, ctx: &mut LifecycleContext) -> Result<StateId> {
        let Some(next) = (self.table[self.current].on_event)(trigger) else {
            return Err(Error::InvalidState(self.current_state()));
        };
        self.transition(next, ctx);
        Ok(next)
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut LifecycleContext) {
        let next_idx = next_id as usize;

        info!(
            "lifecycle: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(states::build_state_table(), StateId::Uninitialized)
    }
}
