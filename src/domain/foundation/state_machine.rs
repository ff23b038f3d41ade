//! State machine trait for status enums.
//!
//! Order status, order payment status, payment status and subscription status
//! all share this interface so that transition rules live in one allow-list per
//! enum instead of being re-checked at every caller.

use std::fmt;

/// A rejected transition between two states of the same machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Display> fmt::Display for InvalidTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot transition from {} to {}", self.from, self.to)
    }
}

impl<S: fmt::Debug + fmt::Display> std::error::Error for InvalidTransition<S> {}

/// Trait for status enums that represent state machines.
///
/// Implementors list the allowed targets per state; validation and
/// terminal-state detection come for free.
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug + 'static {
    /// Every state of the machine, used by exhaustive checks.
    const ALL: &'static [Self];

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> &'static [Self];

    /// Returns true if transition from self to target is in the allow-list.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation.
    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
