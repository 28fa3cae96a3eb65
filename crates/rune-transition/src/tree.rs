//! A reference driver owning a tree of transition elements.
//!
//! Hosts with their own component model call the [`LifecycleHooks`] directly.
//! [`TransitionTree`] is the driver for everyone else: it keeps an arena of mounted
//! elements, injects parent references explicitly, mounts top-down and tears
//! subtrees down bottom-up, so every leaf sees exactly one terminal leave.
//!
//! ```ignore
//! let mut tree = TransitionTree::new();
//! let outer = tree.mount_node(None, TransitionState::Out)?;
//! let inner = tree.mount_node(Some(outer), TransitionState::In)?;
//! tree.mount_listener(Some(inner), recorder.callbacks("leaf"))?;
//! tree.set_declared_state(outer, TransitionState::Appearing)?;
//! ```

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::leaf::TransitionListener;
use crate::lifecycle::LifecycleHooks;
use crate::listener::Callbacks;
use crate::node::TransitionNode;
use crate::state::TransitionState;

/// Handle of an element mounted in a [`TransitionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element of the tree: a container node or a leaf listener.
#[derive(Debug, Clone)]
pub enum Element {
    /// Container that may have children.
    Node(TransitionNode),
    /// Leaf subscriber.
    Listener(TransitionListener),
}

impl Element {
    fn hooks(&self) -> &dyn LifecycleHooks {
        match self {
            Self::Node(node) => node as &dyn LifecycleHooks,
            Self::Listener(listener) => listener as &dyn LifecycleHooks,
        }
    }

    /// Current transition state as seen by this element.
    pub fn state(&self) -> TransitionState {
        match self {
            Self::Node(node) => node.effective_state(),
            Self::Listener(listener) => listener.transition_state(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    element: Element,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Arena of mounted elements driving their lifecycle hooks.
#[derive(Debug, Default)]
pub struct TransitionTree {
    entries: HashMap<ElementId, Entry>,
    roots: Vec<ElementId>,
    next_id: u64,
}

impl TransitionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a node declaring `declared` under `parent` (or as a root).
    pub fn mount_node(
        &mut self,
        parent: Option<ElementId>,
        declared: TransitionState,
    ) -> Result<ElementId, TreeError> {
        let parent_node = self.parent_node(parent)?;
        let id = self.allocate();
        let node = TransitionNode::with_label(id.to_string(), declared);
        node.attach_to_parent(parent_node.as_ref());
        self.insert(id, parent, Element::Node(node.clone()));
        node.on_mount();
        Ok(id)
    }

    /// Mount a leaf listener with `callbacks` under `parent` (or as a root).
    pub fn mount_listener(
        &mut self,
        parent: Option<ElementId>,
        callbacks: Callbacks,
    ) -> Result<ElementId, TreeError> {
        let parent_node = self.parent_node(parent)?;
        let id = self.allocate();
        let listener = TransitionListener::with_label(id.to_string(), callbacks);
        listener.set_ancestor(parent_node.as_ref());
        self.insert(id, parent, Element::Listener(listener.clone()));
        listener.attach();
        Ok(id)
    }

    /// Change a node's declared state and run its update hook.
    pub fn set_declared_state(
        &mut self,
        id: ElementId,
        state: TransitionState,
    ) -> Result<(), TreeError> {
        let node = self.node(id)?;
        node.set_declared_state(state);
        node.on_external_update();
        Ok(())
    }

    /// Replace a listener's callbacks.
    pub fn set_callbacks(&mut self, id: ElementId, callbacks: Callbacks) -> Result<(), TreeError> {
        let listener = self.listener(id)?;
        listener.set_callbacks(callbacks);
        listener.update();
        Ok(())
    }

    /// Install a render function on a listener.
    pub fn set_render(
        &mut self,
        id: ElementId,
        render: impl Fn(TransitionState) + 'static,
    ) -> Result<(), TreeError> {
        self.listener(id)?.set_render(render);
        Ok(())
    }

    /// Move an element (and its subtree) under `new_parent`, or make it a root.
    pub fn reparent(
        &mut self,
        id: ElementId,
        new_parent: Option<ElementId>,
    ) -> Result<(), TreeError> {
        if !self.entries.contains_key(&id) {
            return Err(TreeError::UnknownElement(id));
        }
        let parent_node = self.parent_node(new_parent)?;
        if let Some(parent) = new_parent {
            if self.is_ancestor(id, parent) {
                return Err(TreeError::Cycle {
                    element: id,
                    parent,
                });
            }
        }

        self.unlink(id);
        self.link(id, new_parent);

        let element = self.entries[&id].element.clone();
        match &element {
            Element::Node(node) => {
                node.attach_to_parent(parent_node.as_ref());
            }
            Element::Listener(listener) => listener.set_ancestor(parent_node.as_ref()),
        }
        element.hooks().on_update();
        debug!("moved {} under {:?}", id, new_parent);
        Ok(())
    }

    /// Unmount an element and its whole subtree, descendants first.
    pub fn unmount(&mut self, id: ElementId) -> Result<(), TreeError> {
        if !self.entries.contains_key(&id) {
            return Err(TreeError::UnknownElement(id));
        }
        let order = self.post_order(id);
        for element_id in &order {
            if let Some(entry) = self.entries.get(element_id) {
                entry.element.hooks().on_unmount();
            }
        }
        self.unlink(id);
        for element_id in &order {
            self.entries.remove(element_id);
        }
        debug!("unmounted {} ({} elements)", id, order.len());
        Ok(())
    }

    /// Unmount every root.
    pub fn clear(&mut self) {
        for root in self.roots.clone() {
            if let Err(err) = self.unmount(root) {
                warn!("failed to unmount root {}: {}", root, err);
            }
        }
    }

    /// Transition state currently seen by an element.
    pub fn effective_state(&self, id: ElementId) -> Result<TransitionState, TreeError> {
        self.element(id)
            .map(Element::state)
            .ok_or(TreeError::UnknownElement(id))
    }

    /// Look up an element.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.entries.get(&id).map(|entry| &entry.element)
    }

    /// Look up a node.
    pub fn node(&self, id: ElementId) -> Result<&TransitionNode, TreeError> {
        match self.element(id) {
            Some(Element::Node(node)) => Ok(node),
            Some(Element::Listener(_)) => Err(TreeError::NotANode(id)),
            None => Err(TreeError::UnknownElement(id)),
        }
    }

    /// Look up a listener.
    pub fn listener(&self, id: ElementId) -> Result<&TransitionListener, TreeError> {
        match self.element(id) {
            Some(Element::Listener(listener)) => Ok(listener),
            Some(Element::Node(_)) => Err(TreeError::NotAListener(id)),
            None => Err(TreeError::UnknownElement(id)),
        }
    }

    /// Parent of an element.
    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>, TreeError> {
        self.entries
            .get(&id)
            .map(|entry| entry.parent)
            .ok_or(TreeError::UnknownElement(id))
    }

    /// Children of an element, in mount order.
    pub fn children(&self, id: ElementId) -> Result<&[ElementId], TreeError> {
        self.entries
            .get(&id)
            .map(|entry| entry.children.as_slice())
            .ok_or(TreeError::UnknownElement(id))
    }

    /// Root elements, in mount order.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Whether `id` is mounted.
    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of mounted elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is mounted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocate(&mut self) -> ElementId {
        self.next_id += 1;
        ElementId(self.next_id)
    }

    fn parent_node(&self, parent: Option<ElementId>) -> Result<Option<TransitionNode>, TreeError> {
        parent.map(|id| self.node(id).cloned()).transpose()
    }

    fn insert(&mut self, id: ElementId, parent: Option<ElementId>, element: Element) {
        self.entries.insert(
            id,
            Entry {
                element,
                parent: None,
                children: Vec::new(),
            },
        );
        self.link(id, parent);
    }

    fn link(&mut self, id: ElementId, parent: Option<ElementId>) {
        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.entries.get_mut(&parent_id) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent = parent;
        }
    }

    fn unlink(&mut self, id: ElementId) {
        let parent = self.entries.get(&id).and_then(|entry| entry.parent);
        let siblings = match parent {
            Some(parent_id) => match self.entries.get_mut(&parent_id) {
                Some(parent) => &mut parent.children,
                None => return,
            },
            None => &mut self.roots,
        };
        siblings.retain(|child| *child != id);
    }

    /// True if `ancestor` is `id` or above it.
    fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.entries.get(&current).and_then(|entry| entry.parent);
        }
        false
    }

    /// Subtree of `id`, children before parents.
    fn post_order(&self, id: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            stack.push((current, true));
            if let Some(entry) = self.entries.get(&current) {
                // Reversed so siblings tear down in mount order.
                for child in entry.children.iter().rev() {
                    stack.push((*child, false));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRecorder;
    use crate::listener::LifecycleEvent;
    use TransitionState::*;

    #[test]
    fn test_mount_links_parents_and_children() {
        let mut tree = TransitionTree::new();
        let root = tree.mount_node(None, In).unwrap();
        let child = tree.mount_node(Some(root), Appearing).unwrap();
        let leaf = tree.mount_listener(Some(child), Callbacks::new()).unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), &[root]);
        assert_eq!(tree.children(root).unwrap(), &[child]);
        assert_eq!(tree.parent(leaf).unwrap(), Some(child));
        assert_eq!(tree.effective_state(leaf).unwrap(), Appearing);
        assert_eq!(tree.node(root).unwrap().listener_count(), 1);
        assert_eq!(tree.node(child).unwrap().listener_count(), 2);
    }

    #[test]
    fn test_listener_cannot_be_a_parent() {
        let mut tree = TransitionTree::new();
        let leaf = tree.mount_listener(None, Callbacks::new()).unwrap();
        assert_eq!(
            tree.mount_node(Some(leaf), In),
            Err(TreeError::NotANode(leaf))
        );
        assert_eq!(
            tree.set_declared_state(leaf, Out),
            Err(TreeError::NotANode(leaf))
        );
    }

    #[test]
    fn test_unknown_element() {
        let mut tree = TransitionTree::new();
        let missing = ElementId(42);
        assert_eq!(tree.unmount(missing), Err(TreeError::UnknownElement(missing)));
        assert_eq!(
            tree.effective_state(missing),
            Err(TreeError::UnknownElement(missing))
        );
        assert_eq!(
            tree.set_callbacks(missing, Callbacks::new()),
            Err(TreeError::UnknownElement(missing))
        );
    }

    #[test]
    fn test_unmount_tears_down_bottom_up() {
        let recorder = EventRecorder::new();
        let mut tree = TransitionTree::new();
        let root = tree.mount_node(None, In).unwrap();
        let child = tree.mount_node(Some(root), In).unwrap();
        tree.mount_listener(Some(child), recorder.callbacks("leaf"))
            .unwrap();
        recorder.clear();

        tree.unmount(child).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).unwrap().is_empty());
        assert_eq!(tree.node(root).unwrap().listener_count(), 0);
        assert_eq!(recorder.count(LifecycleEvent::DidLeave), 1);
        assert_eq!(recorder.events().iter().filter(|e| e.is_transition()).count(), 1);
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut tree = TransitionTree::new();
        let root = tree.mount_node(None, In).unwrap();
        let child = tree.mount_node(Some(root), In).unwrap();

        assert_eq!(
            tree.reparent(root, Some(child)),
            Err(TreeError::Cycle {
                element: root,
                parent: child
            })
        );
        assert_eq!(
            tree.reparent(root, Some(root)),
            Err(TreeError::Cycle {
                element: root,
                parent: root
            })
        );
    }

    #[test]
    fn test_reparent_to_root_and_back() {
        let mut tree = TransitionTree::new();
        let a = tree.mount_node(None, Out).unwrap();
        let leaf = tree.mount_listener(Some(a), Callbacks::new()).unwrap();
        assert_eq!(tree.effective_state(leaf).unwrap(), Out);

        tree.reparent(leaf, None).unwrap();
        assert_eq!(tree.roots(), &[a, leaf]);
        assert_eq!(tree.effective_state(leaf).unwrap(), In);
        assert_eq!(tree.node(a).unwrap().listener_count(), 0);

        tree.reparent(leaf, Some(a)).unwrap();
        assert_eq!(tree.roots(), &[a]);
        assert_eq!(tree.node(a).unwrap().listener_count(), 2);
    }

    #[test]
    fn test_clear_unmounts_everything() {
        let recorder = EventRecorder::new();
        let mut tree = TransitionTree::new();
        let a = tree.mount_node(None, In).unwrap();
        tree.mount_listener(Some(a), recorder.callbacks("x")).unwrap();
        tree.mount_listener(None, recorder.callbacks("y")).unwrap();
        recorder.clear();

        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
        assert_eq!(recorder.count(LifecycleEvent::DidLeave), 2);
        assert_eq!(recorder.count(LifecycleEvent::WillLeave), 1);
    }

    #[test]
    fn test_element_id_display() {
        assert_eq!(ElementId(7).to_string(), "#7");
    }
}
