//! Transition states and the rule that folds a parent's state into a child's.
//!
//! A node's *effective* state is never more "in" than its ancestors: an ancestor
//! that is out, leaving, appearing or entering drags every descendant along with it.
//! See [`combine`] for the exact precedence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseStateError;

/// Logical visibility state of a container in the transition tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    /// Not visible.
    Out,
    /// Fully visible and settled.
    #[default]
    In,
    /// Becoming visible for the first time.
    Appearing,
    /// Becoming visible again.
    Entering,
    /// On the way out.
    Leaving,
}

impl TransitionState {
    /// All states, in declaration order.
    pub const ALL: [TransitionState; 5] = [
        TransitionState::Out,
        TransitionState::In,
        TransitionState::Appearing,
        TransitionState::Entering,
        TransitionState::Leaving,
    ];

    /// Lowercase name, as used in configuration and traces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
            Self::Appearing => "appearing",
            Self::Entering => "entering",
            Self::Leaving => "leaving",
        }
    }
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

/// Combine a parent's effective state with a node's own declared state.
///
/// Rules are checked in order and the first match wins:
/// 1. either side `Out` gives `Out`
/// 2. either side `Leaving` gives `Leaving`
/// 3. either side `Appearing` gives `Appearing`
/// 4. either side `Entering` gives `Entering`
/// 5. otherwise the node's own state
///
/// A missing parent (a root) leaves `own` untouched.
pub fn combine(parent: Option<TransitionState>, own: TransitionState) -> TransitionState {
    use TransitionState::*;

    let Some(parent) = parent else {
        return own;
    };

    for dominant in [Out, Leaving, Appearing, Entering] {
        if parent == dominant || own == dominant {
            return dominant;
        }
    }
    own
}
