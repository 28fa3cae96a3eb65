//! Listener capability and the per-node listener registry.
//!
//! Anything that wants to hear about transitions implements [`Listener`]. Most
//! callers never implement it directly and instead hand a [`Callbacks`] bag of
//! optional closures to a [`TransitionListener`](crate::TransitionListener).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::state::TransitionState;

/// Directional lifecycle notification, fired based on a `(prev, next)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// About to become visible (appearing or entering).
    WillComeIn,
    /// Settled in.
    DidComeIn,
    /// Started appearing.
    WillAppear,
    /// Finished appearing.
    DidAppear,
    /// Started entering.
    WillEnter,
    /// Finished entering.
    DidEnter,
    /// Started leaving.
    WillLeave,
    /// Finished leaving.
    DidLeave,
}

impl LifecycleEvent {
    /// Snake-case name used in traces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WillComeIn => "will_come_in",
            Self::DidComeIn => "did_come_in",
            Self::WillAppear => "will_appear",
            Self::DidAppear => "did_appear",
            Self::WillEnter => "will_enter",
            Self::DidEnter => "did_enter",
            Self::WillLeave => "will_leave",
            Self::DidLeave => "did_leave",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of transition notifications from a [`TransitionNode`](crate::TransitionNode).
///
/// Both methods default to doing nothing, so implementors only override what they
/// care about.
pub trait Listener {
    /// Raw notification carrying both sides of an effective-state change.
    fn on_transition(&self, _prev: TransitionState, _next: TransitionState) {}

    /// Directional notification derived from the same change.
    fn on_lifecycle(&self, _event: LifecycleEvent) {}
}

/// Closure receiving `(prev, next)`.
pub type TransitionFn = Rc<dyn Fn(TransitionState, TransitionState)>;

/// Argument-less lifecycle closure.
pub type CallbackFn = Rc<dyn Fn()>;

/// A bag of optional callbacks. Callbacks that are not set are simply skipped.
///
/// ```ignore
/// let callbacks = Callbacks::new()
///     .with_transition(|prev, next| println!("{prev} -> {next}"))
///     .did_come_in(|| println!("in"));
/// ```
#[derive(Clone, Default)]
pub struct Callbacks {
    on_transition: Option<TransitionFn>,
    will_come_in: Option<CallbackFn>,
    did_come_in: Option<CallbackFn>,
    will_appear: Option<CallbackFn>,
    did_appear: Option<CallbackFn>,
    will_enter: Option<CallbackFn>,
    did_enter: Option<CallbackFn>,
    will_leave: Option<CallbackFn>,
    did_leave: Option<CallbackFn>,
}

impl Callbacks {
    /// Create an empty callback set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw transition callback.
    pub fn with_transition(mut self, f: impl Fn(TransitionState, TransitionState) + 'static) -> Self {
        self.on_transition = Some(Rc::new(f));
        self
    }

    /// Set the callback for a directional event.
    pub fn on(mut self, event: LifecycleEvent, f: impl Fn() + 'static) -> Self {
        *self.slot_mut(event) = Some(Rc::new(f));
        self
    }

    /// Set `will_come_in`.
    pub fn will_come_in(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::WillComeIn, f)
    }

    /// Set `did_come_in`.
    pub fn did_come_in(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::DidComeIn, f)
    }

    /// Set `will_appear`.
    pub fn will_appear(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::WillAppear, f)
    }

    /// Set `did_appear`.
    pub fn did_appear(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::DidAppear, f)
    }

    /// Set `will_enter`.
    pub fn will_enter(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::WillEnter, f)
    }

    /// Set `did_enter`.
    pub fn did_enter(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::DidEnter, f)
    }

    /// Set `will_leave`.
    pub fn will_leave(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::WillLeave, f)
    }

    /// Set `did_leave`.
    pub fn did_leave(self, f: impl Fn() + 'static) -> Self {
        self.on(LifecycleEvent::DidLeave, f)
    }

    /// The callback registered for `event`, if any.
    pub fn get(&self, event: LifecycleEvent) -> Option<&CallbackFn> {
        match event {
            LifecycleEvent::WillComeIn => self.will_come_in.as_ref(),
            LifecycleEvent::DidComeIn => self.did_come_in.as_ref(),
            LifecycleEvent::WillAppear => self.will_appear.as_ref(),
            LifecycleEvent::DidAppear => self.did_appear.as_ref(),
            LifecycleEvent::WillEnter => self.will_enter.as_ref(),
            LifecycleEvent::DidEnter => self.did_enter.as_ref(),
            LifecycleEvent::WillLeave => self.will_leave.as_ref(),
            LifecycleEvent::DidLeave => self.did_leave.as_ref(),
        }
    }

    /// Whether a raw transition callback is set.
    pub fn has_on_transition(&self) -> bool {
        self.on_transition.is_some()
    }

    fn slot_mut(&mut self, event: LifecycleEvent) -> &mut Option<CallbackFn> {
        match event {
            LifecycleEvent::WillComeIn => &mut self.will_come_in,
            LifecycleEvent::DidComeIn => &mut self.did_come_in,
            LifecycleEvent::WillAppear => &mut self.will_appear,
            LifecycleEvent::DidAppear => &mut self.did_appear,
            LifecycleEvent::WillEnter => &mut self.will_enter,
            LifecycleEvent::DidEnter => &mut self.did_enter,
            LifecycleEvent::WillLeave => &mut self.will_leave,
            LifecycleEvent::DidLeave => &mut self.did_leave,
        }
    }
}

impl Listener for Callbacks {
    fn on_transition(&self, prev: TransitionState, next: TransitionState) {
        if let Some(f) = &self.on_transition {
            f(prev, next);
        }
    }

    fn on_lifecycle(&self, event: LifecycleEvent) {
        if let Some(f) = self.get(event) {
            f();
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const EVENTS: [LifecycleEvent; 8] = [
            LifecycleEvent::WillComeIn,
            LifecycleEvent::DidComeIn,
            LifecycleEvent::WillAppear,
            LifecycleEvent::DidAppear,
            LifecycleEvent::WillEnter,
            LifecycleEvent::DidEnter,
            LifecycleEvent::WillLeave,
            LifecycleEvent::DidLeave,
        ];
        let set: Vec<&str> = EVENTS
            .into_iter()
            .filter(|event| self.get(*event).is_some())
            .map(LifecycleEvent::as_str)
            .collect();
        f.debug_struct("Callbacks")
            .field("on_transition", &self.on_transition.is_some())
            .field("lifecycle", &set)
            .finish()
    }
}

/// Ordered set of listeners registered with one node.
///
/// Identity is by allocation (`Rc::ptr_eq`). Notification iterates over a snapshot,
/// so a callback that adds or removes listeners cannot invalidate the iteration;
/// whether such a listener observes the in-flight event is unspecified.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RefCell<Vec<Rc<dyn Listener>>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Registering the same listener twice keeps both entries.
    pub fn add(&self, listener: Rc<dyn Listener>) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Remove the first entry that is `listener`. Returns false if it was not present.
    pub fn remove(&self, listener: &Rc<dyn Listener>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `listener` is registered.
    pub fn contains(&self, listener: &Rc<dyn Listener>) -> bool {
        self.listeners.borrow().iter().any(|l| Rc::ptr_eq(l, listener))
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Visit every listener in registration order.
    pub fn for_each(&self, mut f: impl FnMut(&dyn Listener)) {
        let snapshot: Vec<Rc<dyn Listener>> = self.listeners.borrow().clone();
        for listener in &snapshot {
            f(listener.as_ref());
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
