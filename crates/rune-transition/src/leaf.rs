//! Leaf subscribers.
//!
//! A [`TransitionListener`] forwards the notifications of its nearest ancestor
//! [`TransitionNode`] to a caller-supplied [`Callbacks`] bag, and keeps an optional
//! render function fed with the live transition state.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, trace, warn};

use crate::listener::{Callbacks, LifecycleEvent, Listener};
use crate::node::TransitionNode;
use crate::state::TransitionState;

/// Render function receiving the leaf's current transition state.
pub type RenderFn = Rc<dyn Fn(TransitionState)>;

/// Leaf subscriber attached below a [`TransitionNode`] (or at the root).
///
/// Without an ancestor the leaf behaves as permanently `in`. Cloning yields another
/// handle to the same leaf.
#[derive(Clone)]
pub struct TransitionListener {
    inner: Rc<LeafInner>,
}

struct LeafInner {
    label: Option<String>,
    ancestor: RefCell<Option<TransitionNode>>,
    registered_with: RefCell<Option<TransitionNode>>,
    mounted: Cell<bool>,
    forwarder: Rc<CallbackForwarder>,
    render: Rc<RenderRefresh>,
}

/// Delivers node notifications to whichever callback set is current.
struct CallbackForwarder {
    callbacks: RefCell<Rc<Callbacks>>,
}

impl CallbackForwarder {
    fn current(&self) -> Rc<Callbacks> {
        // Cloned out so a callback may swap the set while it runs.
        self.callbacks.borrow().clone()
    }
}

impl Listener for CallbackForwarder {
    fn on_transition(&self, prev: TransitionState, next: TransitionState) {
        self.current().on_transition(prev, next);
    }

    fn on_lifecycle(&self, event: LifecycleEvent) {
        self.current().on_lifecycle(event);
    }
}

/// Re-renders the leaf after every transition its ancestor reports.
struct RenderRefresh {
    leaf: Weak<LeafInner>,
    render: RefCell<Option<RenderFn>>,
    count: Cell<u64>,
}

impl RenderRefresh {
    fn refresh(&self) {
        self.count.set(self.count.get() + 1);
        let Some(inner) = self.leaf.upgrade() else {
            return;
        };
        let state = TransitionListener { inner }.transition_state();
        let render = self.render.borrow().clone();
        if let Some(render) = render {
            render(state);
        }
    }
}

impl Listener for RenderRefresh {
    fn on_transition(&self, _prev: TransitionState, _next: TransitionState) {
        self.refresh();
    }
}

impl TransitionListener {
    /// Create an unattached leaf with the given callbacks.
    pub fn new(callbacks: Callbacks) -> Self {
        Self::build(None, callbacks)
    }

    /// Create a leaf carrying a label for logs and `Debug` output.
    pub fn with_label(label: impl Into<String>, callbacks: Callbacks) -> Self {
        Self::build(Some(label.into()), callbacks)
    }

    fn build(label: Option<String>, callbacks: Callbacks) -> Self {
        let inner = Rc::new_cyclic(|weak| LeafInner {
            label,
            ancestor: RefCell::new(None),
            registered_with: RefCell::new(None),
            mounted: Cell::new(false),
            forwarder: Rc::new(CallbackForwarder {
                callbacks: RefCell::new(Rc::new(callbacks)),
            }),
            render: Rc::new(RenderRefresh {
                leaf: weak.clone(),
                render: RefCell::new(None),
                count: Cell::new(0),
            }),
        });
        Self { inner }
    }

    /// Label given at construction, if any.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Nearest ancestor node requested by the driver.
    pub fn ancestor(&self) -> Option<TransitionNode> {
        self.inner.ancestor.borrow().clone()
    }

    /// Point the leaf at a new nearest ancestor (or none).
    ///
    /// Registration follows at the next [`attach`](Self::attach) or [`update`](Self::update).
    pub fn set_ancestor(&self, ancestor: Option<&TransitionNode>) {
        *self.inner.ancestor.borrow_mut() = ancestor.cloned();
    }

    /// Replace the callback set. Never synthesises a transition.
    pub fn set_callbacks(&self, callbacks: Callbacks) {
        *self.inner.forwarder.callbacks.borrow_mut() = Rc::new(callbacks);
    }

    /// The current callback set.
    pub fn callbacks(&self) -> Rc<Callbacks> {
        self.inner.forwarder.current()
    }

    /// Install the function called with the live state on every refresh.
    pub fn set_render(&self, render: impl Fn(TransitionState) + 'static) {
        *self.inner.render.render.borrow_mut() = Some(Rc::new(render));
    }

    /// How many times the leaf has been refreshed.
    pub fn render_count(&self) -> u64 {
        self.inner.render.count.get()
    }

    /// Live transition state: the ancestor's effective state, or `in` at the root.
    pub fn transition_state(&self) -> TransitionState {
        self.ancestor()
            .map_or(TransitionState::In, |node| node.effective_state())
    }

    /// Whether the leaf is attached.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Mount hook: subscribe to the ancestor and catch up on `did_come_in`.
    ///
    /// An ancestor that is not mounted yet delivers `did_come_in` from its own mount,
    /// so the leaf stays quiet in that case.
    pub fn attach(&self) {
        if self.is_mounted() {
            warn!("{:?} attached twice", self);
            return;
        }
        self.inner.mounted.set(true);
        self.sync_registration();
        self.inner.render.refresh();
        debug!("attached {:?}", self);

        let came_in = match self.ancestor() {
            None => true,
            Some(node) => node.is_mounted() && node.effective_state() == TransitionState::In,
        };
        if came_in {
            self.inner.forwarder.on_lifecycle(LifecycleEvent::DidComeIn);
        }
    }

    /// Update hook: follow an ancestor change.
    pub fn update(&self) {
        if !self.is_mounted() {
            return;
        }
        if self.sync_registration() {
            self.inner.render.refresh();
        }
    }

    /// Unmount hook: unsubscribe and deliver a terminal leave notification.
    ///
    /// Below an ancestor that is not already `out` the leaf sees
    /// `on_transition(current, out)` then `did_leave`. At the root it sees `will_leave`
    /// then `did_leave`. If the ancestor was unmounted first, its forced `-> out` has
    /// already reached the leaf and only a missing `did_leave` is added.
    pub fn detach(&self) {
        if !self.is_mounted() {
            return;
        }
        self.inner.mounted.set(false);

        let registered = self.inner.registered_with.borrow_mut().take();
        let forwarder = &self.inner.forwarder;
        match registered {
            Some(node) => {
                node.remove_listener(&self.forwarder_listener());
                node.remove_listener(&self.render_listener());
                match node.unmounted_from() {
                    // `leaving -> out` carried its own did_leave.
                    Some(TransitionState::Out | TransitionState::Leaving) => {}
                    Some(_) => forwarder.on_lifecycle(LifecycleEvent::DidLeave),
                    None => {
                        let state = node.effective_state();
                        if state != TransitionState::Out {
                            forwarder.on_transition(state, TransitionState::Out);
                            forwarder.on_lifecycle(LifecycleEvent::DidLeave);
                        }
                    }
                }
            }
            None => {
                forwarder.on_lifecycle(LifecycleEvent::WillLeave);
                forwarder.on_lifecycle(LifecycleEvent::DidLeave);
            }
        }
        debug!("detached {:?}", self);
    }

    fn forwarder_listener(&self) -> Rc<dyn Listener> {
        self.inner.forwarder.clone()
    }

    fn render_listener(&self) -> Rc<dyn Listener> {
        self.inner.render.clone()
    }

    /// Move both listeners to the requested ancestor. Returns true if anything moved.
    fn sync_registration(&self) -> bool {
        let desired = self.ancestor();
        let current = self.inner.registered_with.borrow().clone();
        let unchanged = match (&desired, &current) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        if let Some(old) = &current {
            old.remove_listener(&self.forwarder_listener());
            old.remove_listener(&self.render_listener());
            trace!("{:?} left {:?}", self, old);
        }
        if let Some(new) = &desired {
            new.add_listener(self.forwarder_listener());
            new.add_listener(self.render_listener());
            trace!("{:?} joined {:?}", self, new);
        }
        *self.inner.registered_with.borrow_mut() = desired;
        true
    }
}

impl fmt::Debug for TransitionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TransitionListener");
        if let Some(label) = self.label() {
            s.field("label", &label);
        }
        s.field("callbacks", &*self.callbacks())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
