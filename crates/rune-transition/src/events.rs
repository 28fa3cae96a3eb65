//! Recorded transition events.
//!
//! [`EventRecorder`] hands out [`Callbacks`] that append a [`TransitionEvent`] for
//! every notification they receive, tagged with a caller-chosen source name. The
//! demo driver prints these traces and the tests assert on them.
//!
//! # Usage
//!
//! ```ignore
//! let recorder = EventRecorder::new();
//! let leaf = TransitionListener::new(recorder.callbacks("leaf"));
//! leaf.attach();
//! assert_eq!(recorder.len(), 1); // did_come_in
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::listener::{Callbacks, LifecycleEvent};
use crate::state::TransitionState;

const ALL_EVENTS: [LifecycleEvent; 8] = [
    LifecycleEvent::WillComeIn,
    LifecycleEvent::DidComeIn,
    LifecycleEvent::WillAppear,
    LifecycleEvent::DidAppear,
    LifecycleEvent::WillEnter,
    LifecycleEvent::DidEnter,
    LifecycleEvent::WillLeave,
    LifecycleEvent::DidLeave,
];

/// One notification observed by a recording listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// Raw `on_transition(prev, next)`.
    Transition {
        /// Listener that observed the event.
        source: String,
        /// State before the change.
        prev: TransitionState,
        /// State after the change.
        next: TransitionState,
    },
    /// Directional callback.
    Lifecycle {
        /// Listener that observed the event.
        source: String,
        /// Which callback fired.
        event: LifecycleEvent,
    },
}

impl TransitionEvent {
    /// Get the source name for this event.
    pub fn source(&self) -> &str {
        match self {
            Self::Transition { source, .. } | Self::Lifecycle { source, .. } => source,
        }
    }

    /// Check if this is a raw transition event.
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }

    /// The directional event, if this is one.
    pub fn lifecycle(&self) -> Option<LifecycleEvent> {
        match self {
            Self::Lifecycle { event, .. } => Some(*event),
            Self::Transition { .. } => None,
        }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition { source, prev, next } => write!(f, "{source}: {prev} -> {next}"),
            Self::Lifecycle { source, event } => write!(f, "{source}: {event}"),
        }
    }
}

/// Shared, append-only log of [`TransitionEvent`]s.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<TransitionEvent>>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks recording every notification under `source`.
    pub fn callbacks(&self, source: impl Into<String>) -> Callbacks {
        let source: Rc<str> = Rc::from(source.into());
        let mut callbacks = {
            let recorder = self.clone();
            let source = source.clone();
            Callbacks::new().with_transition(move |prev, next| {
                recorder.push(TransitionEvent::Transition {
                    source: source.to_string(),
                    prev,
                    next,
                });
            })
        };
        for event in ALL_EVENTS {
            let recorder = self.clone();
            let source = source.clone();
            callbacks = callbacks.on(event, move || {
                recorder.push(TransitionEvent::Lifecycle {
                    source: source.to_string(),
                    event,
                });
            });
        }
        callbacks
    }

    /// Record an event directly.
    pub fn push(&self, event: TransitionEvent) {
        self.events.borrow_mut().push(event);
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.borrow().clone()
    }

    /// Events observed by `source`.
    pub fn events_for(&self, source: &str) -> Vec<TransitionEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.source() == source)
            .cloned()
            .collect()
    }

    /// How many times `event` fired, across all sources.
    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.lifecycle() == Some(event))
            .count()
    }

    /// Take all recorded events, leaving the log empty.
    pub fn drain(&self) -> Vec<TransitionEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Get the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
