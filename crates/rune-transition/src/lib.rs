//! Hierarchical transition states for nested UI containers.
//!
//! Every [`TransitionNode`] declares a [`TransitionState`] of its own and combines it
//! with its parent's, so a container that is leaving drags everything inside it
//! along. When a node's effective state changes its listeners receive the raw
//! `on_transition(prev, next)` callback followed by directional callbacks
//! (`will_appear`, `did_come_in`, `will_leave`, ...).
//!
//! # Architecture
//!
//! ```text
//! TransitionNode (root)
//!   ├── ParentLink ──► TransitionNode (child)
//!   │                    ├── CallbackForwarder ──► Callbacks of a TransitionListener
//!   │                    └── RenderRefresh     ──► render(state)
//!   └── ...
//!
//! TransitionTree
//!   └── drives mount / update / unmount in tree order
//! ```
//!
//! Everything is single-threaded and synchronous: a state change is fully
//! propagated and every callback has run by the time the triggering call returns.

pub mod error;
pub mod events;
pub mod leaf;
pub mod lifecycle;
pub mod listener;
pub mod node;
pub mod state;
pub mod tree;

pub use error::{ParseStateError, TreeError};
pub use events::{EventRecorder, TransitionEvent};
pub use leaf::{RenderFn, TransitionListener};
pub use lifecycle::LifecycleHooks;
pub use listener::{CallbackFn, Callbacks, LifecycleEvent, Listener, ListenerRegistry, TransitionFn};
pub use node::{TransitionNode, lifecycle_events};
pub use state::{TransitionState, combine};
pub use tree::{Element, ElementId, TransitionTree};
