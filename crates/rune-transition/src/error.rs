//! Error types for the transition crate.

use thiserror::Error;

use crate::tree::ElementId;

/// A string that does not name a [`TransitionState`](crate::TransitionState).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown transition state: {0:?}")]
pub struct ParseStateError(pub String);

/// Misuse of a [`TransitionTree`](crate::TransitionTree).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No element with this id is mounted.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// The element exists but is a listener, which cannot have children.
    #[error("element {0} is not a transition node")]
    NotANode(ElementId),

    /// The element exists but is not a listener.
    #[error("element {0} is not a transition listener")]
    NotAListener(ElementId),

    /// Moving the element would make it its own ancestor.
    #[error("moving {element} under {parent} would create a cycle")]
    Cycle {
        /// Element being moved.
        element: ElementId,
        /// Requested new parent.
        parent: ElementId,
    },
}
