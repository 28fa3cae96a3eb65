//! Hooks an external driver invokes on tree elements.

use crate::leaf::TransitionListener;
use crate::node::TransitionNode;

/// Mount / update / unmount hooks.
///
/// A driver calls `on_mount` once, `on_update` whenever the element's inputs may have
/// changed, and `on_unmount` once at the end. Ancestors are mounted before their
/// descendants and unmounted after them.
pub trait LifecycleHooks {
    /// The element entered the tree.
    fn on_mount(&self);
    /// Declared state, parent or configuration may have changed.
    fn on_update(&self);
    /// The element is leaving the tree. Terminal.
    fn on_unmount(&self);
}

impl LifecycleHooks for TransitionNode {
    fn on_mount(&self) {
        TransitionNode::on_mount(self);
    }

    fn on_update(&self) {
        self.on_external_update();
    }

    fn on_unmount(&self) {
        TransitionNode::on_unmount(self);
    }
}

impl LifecycleHooks for TransitionListener {
    fn on_mount(&self) {
        self.attach();
    }

    fn on_update(&self) {
        self.update();
    }

    fn on_unmount(&self) {
        self.detach();
    }
}
