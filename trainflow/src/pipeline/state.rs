//! Run state tracking.

use crate::core::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// State before the change.
    pub from: PipelineState,
    /// State after the change.
    pub to: PipelineState,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid pipeline transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Current state.
    pub from: PipelineState,
    /// Requested state.
    pub to: PipelineState,
}

/// Tracks the state of one run and every change it went through.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: PipelineState,
    transitions: Vec<Transition>,
}

impl StateMachine {
    /// Creates a machine in [`PipelineState::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the recorded transitions, oldest first.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Moves to `to` if allowed.
    pub fn transition(&mut self, to: PipelineState) -> Result<Transition, InvalidTransition> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(InvalidTransition { from, to });
        }
        let transition = Transition {
            from,
            to,
            at: Utc::now(),
        };
        self.state = to;
        self.transitions.push(transition.clone());
        Ok(transition)
    }
}
