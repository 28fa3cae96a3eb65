//! Transition nodes and the notification protocol.
//!
//! A [`TransitionNode`] declares a state of its own and combines it with its
//! parent's effective state. Every node registers a small [`ParentLink`] listener
//! with its parent; when the parent notifies, the link asks the child to re-derive
//! its effective state and, if that changed, the child notifies its own listeners.
//! A change at the root therefore reaches every descendant within one call.
//!
//! # Driver contract
//!
//! The host calls [`on_mount`](TransitionNode::on_mount) once,
//! [`on_external_update`](TransitionNode::on_external_update) after every declared
//! state or parent change, and [`on_unmount`](TransitionNode::on_unmount) once.
//! Ancestors mount before descendants and unmount after them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, trace, warn};

use crate::listener::{LifecycleEvent, Listener, ListenerRegistry};
use crate::state::{TransitionState, combine};

/// Directional events for a `(prev, next)` pair, in firing order.
///
/// | next        | prev                      | events                     |
/// |-------------|---------------------------|----------------------------|
/// | `out`       | `leaving`                 | did_leave                  |
/// | `in`        | `appearing`               | did_appear, did_come_in    |
/// | `in`        | `entering`                | did_enter, did_come_in     |
/// | `appearing` | `out`, `leaving`          | will_appear, will_come_in  |
/// | `entering`  | `out`, `leaving`          | will_enter, will_come_in   |
/// | `leaving`   | `in`, `appearing`, `entering` | will_leave             |
///
/// Every other pair yields nothing beyond the raw `on_transition`.
pub fn lifecycle_events(prev: TransitionState, next: TransitionState) -> &'static [LifecycleEvent] {
    use LifecycleEvent::*;
    use TransitionState::*;

    match (prev, next) {
        (Leaving, Out) => &[DidLeave],
        (Appearing, In) => &[DidAppear, DidComeIn],
        (Entering, In) => &[DidEnter, DidComeIn],
        (Out | Leaving, Appearing) => &[WillAppear, WillComeIn],
        (Out | Leaving, Entering) => &[WillEnter, WillComeIn],
        (In | Appearing | Entering, Leaving) => &[WillLeave],
        _ => &[],
    }
}

/// A container in the transition tree.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct TransitionNode {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    label: Option<String>,
    declared: Cell<TransitionState>,
    /// Parent requested by the driver.
    parent: RefCell<Option<TransitionNode>>,
    /// Parent whose registry currently holds `link`.
    registered_with: RefCell<Option<TransitionNode>>,
    previous: Cell<Option<TransitionState>>,
    mounted: Cell<bool>,
    /// State the forced `-> out` started from, set by `on_unmount`.
    left_from: Cell<Option<TransitionState>>,
    listeners: ListenerRegistry,
    link: Rc<ParentLink>,
}

/// The listener a node registers with its parent.
///
/// Holds only a weak reference so a parent never keeps its children alive.
struct ParentLink {
    node: Weak<NodeInner>,
}

impl Listener for ParentLink {
    fn on_transition(&self, _prev: TransitionState, _next: TransitionState) {
        if let Some(inner) = self.node.upgrade() {
            TransitionNode { inner }.refresh();
        }
    }
}

impl TransitionNode {
    /// Create an unmounted root node declaring `declared`.
    pub fn new(declared: TransitionState) -> Self {
        Self::build(None, declared)
    }

    /// Create a node carrying a label for logs and `Debug` output.
    pub fn with_label(label: impl Into<String>, declared: TransitionState) -> Self {
        Self::build(Some(label.into()), declared)
    }

    fn build(label: Option<String>, declared: TransitionState) -> Self {
        let inner = Rc::new_cyclic(|weak| NodeInner {
            label,
            declared: Cell::new(declared),
            parent: RefCell::new(None),
            registered_with: RefCell::new(None),
            previous: Cell::new(None),
            mounted: Cell::new(false),
            left_from: Cell::new(None),
            listeners: ListenerRegistry::new(),
            link: Rc::new(ParentLink { node: weak.clone() }),
        });
        Self { inner }
    }

    /// Label given at construction, if any.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Whether two handles refer to the same node.
    pub fn ptr_eq(&self, other: &TransitionNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The state this node declares for itself.
    pub fn declared_state(&self) -> TransitionState {
        self.inner.declared.get()
    }

    /// Change the declared state.
    ///
    /// Listeners are not notified until [`on_external_update`](Self::on_external_update).
    pub fn set_declared_state(&self, state: TransitionState) {
        self.inner.declared.set(state);
    }

    /// Effective state: the declared state folded with every ancestor's.
    ///
    /// Recomputed on each call, O(depth).
    pub fn effective_state(&self) -> TransitionState {
        let parent = self
            .inner
            .parent
            .borrow()
            .as_ref()
            .map(TransitionNode::effective_state);
        combine(parent, self.declared_state())
    }

    /// The last effective state listeners were told about.
    pub fn previous_effective_state(&self) -> Option<TransitionState> {
        self.inner.previous.get()
    }

    /// Current parent, if any.
    pub fn parent(&self) -> Option<TransitionNode> {
        self.inner.parent.borrow().clone()
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &TransitionNode) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if node.ptr_eq(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Point this node at a new parent (or none).
    ///
    /// Registration follows at the next mount or update. Returns false and leaves the
    /// linkage alone if `parent` is this node or one of its descendants.
    pub fn attach_to_parent(&self, parent: Option<&TransitionNode>) -> bool {
        if let Some(parent) = parent {
            if self.is_ancestor_of(parent) {
                warn!("refusing to attach {:?} below its own descendant {:?}", self, parent);
                return false;
            }
        }
        *self.inner.parent.borrow_mut() = parent.cloned();
        true
    }

    /// Drop the parent link. Equivalent to `attach_to_parent(None)`.
    pub fn detach_from_parent(&self) {
        *self.inner.parent.borrow_mut() = None;
    }

    /// Whether [`on_mount`](Self::on_mount) ran and [`on_unmount`](Self::on_unmount) has not.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Register a listener with this node.
    pub fn add_listener(&self, listener: Rc<dyn Listener>) {
        self.inner.listeners.add(listener);
    }

    /// Deregister a listener. Unknown listeners are ignored.
    pub fn remove_listener(&self, listener: &Rc<dyn Listener>) {
        self.inner.listeners.remove(listener);
    }

    /// Number of registered listeners, child links included.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Mount hook: join the parent's registry and record the initial state.
    ///
    /// If the node starts out `in`, its current listeners get `did_come_in` right away.
    /// No other transition is synthesised for the initial state.
    pub fn on_mount(&self) {
        if self.is_mounted() {
            warn!("{:?} mounted twice", self);
            return;
        }
        self.inner.mounted.set(true);
        self.inner.left_from.set(None);
        self.sync_registration();

        let state = self.effective_state();
        self.inner.previous.set(Some(state));
        debug!("mounted {:?}", self);

        if state == TransitionState::In {
            self.dispatch(LifecycleEvent::DidComeIn);
        }
    }

    /// Update hook: follow a parent change, then notify if the effective state moved.
    ///
    /// Before mount the new state is only recorded. After unmount updates are ignored.
    pub fn on_external_update(&self) {
        if self.unmounted_from().is_some() {
            trace!("ignoring update of unmounted {:?}", self);
            return;
        }
        if self.is_mounted() {
            self.sync_registration();
        }
        self.refresh();
    }

    /// Unmount hook: force a final transition to `out`, then leave the parent.
    pub fn on_unmount(&self) {
        if !self.is_mounted() {
            return;
        }
        let prev = self.inner.previous.replace(Some(TransitionState::Out));
        self.inner
            .left_from
            .set(Some(prev.unwrap_or(TransitionState::Out)));
        self.handle_transition(prev, TransitionState::Out);

        self.inner.mounted.set(false);
        let registered = self.inner.registered_with.borrow_mut().take();
        if let Some(parent) = registered {
            parent.inner.listeners.remove(&self.link());
            trace!("{:?} left {:?}", self, parent);
        }
        debug!("unmounted {:?}", self);
    }

    /// The state this node's final `-> out` transition started from.
    ///
    /// `Some` only between [`on_unmount`](Self::on_unmount) and a later remount.
    pub fn unmounted_from(&self) -> Option<TransitionState> {
        if self.is_mounted() {
            return None;
        }
        self.inner.left_from.get()
    }

    /// Re-derive the effective state and notify listeners if it changed.
    fn refresh(&self) {
        let next = self.effective_state();
        let prev = self.inner.previous.get();
        if prev == Some(next) {
            return;
        }
        // Record first so a callback re-entering this node sees the new state.
        self.inner.previous.set(Some(next));
        self.handle_transition(prev, next);
    }

    /// Notify every listener of a `prev -> next` change.
    ///
    /// Without a previous state nothing fires: the raw callback needs both sides and
    /// every directional rule names a concrete `prev`.
    pub(crate) fn handle_transition(&self, prev: Option<TransitionState>, next: TransitionState) {
        let Some(prev) = prev else {
            return;
        };
        if prev == next {
            return;
        }
        debug!("{:?}: {} -> {}", self, prev, next);

        self.inner
            .listeners
            .for_each(|listener| listener.on_transition(prev, next));
        for &event in lifecycle_events(prev, next) {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: LifecycleEvent) {
        self.inner
            .listeners
            .for_each(|listener| listener.on_lifecycle(event));
    }

    fn link(&self) -> Rc<dyn Listener> {
        self.inner.link.clone()
    }

    /// Move `link` to the registry of the requested parent.
    fn sync_registration(&self) {
        let desired = self.parent();
        let current = self.inner.registered_with.borrow().clone();
        let unchanged = match (&desired, &current) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        let link = self.link();
        if let Some(old) = &current {
            old.inner.listeners.remove(&link);
            trace!("{:?} left {:?}", self, old);
        }
        if let Some(new) = &desired {
            new.inner.listeners.add(link);
            trace!("{:?} joined {:?}", self, new);
        }
        *self.inner.registered_with.borrow_mut() = desired;
    }
}

impl fmt::Debug for TransitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TransitionNode");
        if let Some(label) = self.label() {
            s.field("label", &label);
        }
        s.field("declared", &self.declared_state())
            .field("previous", &self.inner.previous.get())
            .field("listeners", &self.listener_count())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
