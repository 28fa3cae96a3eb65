//! Scripted scenarios driven through a [`TransitionTree`].
//!
//! A scenario is a TOML document with a list of steps tagged by `action`. Elements
//! are referred to by the names given when they are mounted.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::info;
use rune_transition::{ElementId, EventRecorder, TransitionEvent, TransitionState, TransitionTree};
use serde::{Deserialize, Serialize};

/// Scenario used when no file is configured.
pub const BUILTIN: &str = include_str!("../scenarios/nested_fade.toml");

/// A named list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Steps, run in order.
    pub steps: Vec<Step>,
}

/// One driver action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Mount a transition node. The state defaults to `in`.
    MountNode {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        state: TransitionState,
    },
    /// Mount a recording listener.
    MountListener {
        name: String,
        #[serde(default)]
        parent: Option<String>,
    },
    /// Change a node's declared state.
    SetState { name: String, state: TransitionState },
    /// Move an element under another node, or to the root.
    Reparent {
        name: String,
        #[serde(default)]
        parent: Option<String>,
    },
    /// Unmount an element and its subtree.
    Unmount { name: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let under = |parent: &Option<String>| parent.as_deref().unwrap_or("<root>").to_string();
        match self {
            Self::MountNode {
                name,
                parent,
                state,
            } => write!(f, "mount node {name} ({state}) under {}", under(parent)),
            Self::MountListener { name, parent } => {
                write!(f, "mount listener {name} under {}", under(parent))
            }
            Self::SetState { name, state } => write!(f, "set {name} to {state}"),
            Self::Reparent { name, parent } => write!(f, "move {name} under {}", under(parent)),
            Self::Unmount { name } => write!(f, "unmount {name}"),
        }
    }
}

impl Scenario {
    /// Parse a scenario from TOML.
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid scenario")
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("in {}", path.display()))
    }
}

/// Events produced by one step.
#[derive(Debug, Clone)]
pub struct StepTrace {
    /// The step that ran.
    pub step: Step,
    /// Everything listeners observed while it ran.
    pub events: Vec<TransitionEvent>,
}

/// Runs steps against a tree, recording what the listeners see.
#[derive(Debug, Default)]
pub struct ScenarioRunner {
    tree: TransitionTree,
    names: HashMap<String, ElementId>,
    recorder: EventRecorder,
}

impl ScenarioRunner {
    /// Create a runner with an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The driven tree.
    pub fn tree(&self) -> &TransitionTree {
        &self.tree
    }

    /// Run every step of `scenario`.
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<StepTrace>> {
        info!("running scenario {:?} ({} steps)", scenario.name, scenario.steps.len());
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                self.apply(step)
                    .with_context(|| format!("step {} ({step}) failed", index + 1))
            })
            .collect()
    }

    /// Run one step.
    pub fn apply(&mut self, step: &Step) -> Result<StepTrace> {
        match step {
            Step::MountNode {
                name,
                parent,
                state,
            } => {
                self.ensure_unused(name)?;
                let parent = self.resolve_parent(parent)?;
                let id = self.tree.mount_node(parent, *state)?;
                self.names.insert(name.clone(), id);
            }
            Step::MountListener { name, parent } => {
                self.ensure_unused(name)?;
                let parent = self.resolve_parent(parent)?;
                let id = self
                    .tree
                    .mount_listener(parent, self.recorder.callbacks(name.as_str()))?;
                self.names.insert(name.clone(), id);
            }
            Step::SetState { name, state } => {
                let id = self.resolve(name)?;
                self.tree.set_declared_state(id, *state)?;
            }
            Step::Reparent { name, parent } => {
                let id = self.resolve(name)?;
                let parent = self.resolve_parent(parent)?;
                self.tree.reparent(id, parent)?;
            }
            Step::Unmount { name } => {
                let id = self.resolve(name)?;
                self.tree.unmount(id)?;
                self.names.retain(|_, element| self.tree.contains(*element));
            }
        }
        Ok(StepTrace {
            step: step.clone(),
            events: self.recorder.drain(),
        })
    }

    fn resolve(&self, name: &str) -> Result<ElementId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("no element named {name:?}"))
    }

    fn resolve_parent(&self, parent: &Option<String>) -> Result<Option<ElementId>> {
        parent.as_deref().map(|name| self.resolve(name)).transpose()
    }

    fn ensure_unused(&self, name: &str) -> Result<()> {
        if self.names.contains_key(name) {
            bail!("element {name:?} is already mounted");
        }
        Ok(())
    }
}
