//! Workflow graph definition, validation, and the standard revision pipeline.
//!
//! A graph is a set of named nodes, each bound to a [`NodeKind`], plus one
//! outgoing edge per node. Edges are either unconditional or decided by a
//! pure router over the run state. `compile` checks the whole definition up
//! front, so a compiled graph can never route to a node that does not exist.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use redline_types::run::{RunState, RunStatus, Target};
use thiserror::Error;

use super::router::{self, HumanRoute, ProduceRoute, ReviewRoute, VerifyRoute};

// ---------------------------------------------------------------------------
// Node names of the standard pipeline
// ---------------------------------------------------------------------------

pub const AWAIT_HUMAN: &str = "await_human";
pub const PRODUCE: &str = "produce";
pub const INVOKE_TOOLS: &str = "invoke_tools";
pub const REVIEW: &str = "review";
pub const VERIFY: &str = "verify";

/// What a node does when the engine executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    AwaitHuman,
    Produce,
    InvokeTools,
    Review,
    Verify,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("graph has no entry point")]
    MissingEntry,

    #[error("entry node '{0}' has no outgoing edge")]
    EntryWithoutEdge(String),

    #[error("node '{node}' does not map router outcome '{outcome}'")]
    UnmappedOutcome { node: String, outcome: String },

    #[error("node '{0}' declared twice")]
    DuplicateNode(String),

    #[error("node '{0}' has more than one outgoing edge")]
    DuplicateEdge(String),

    #[error("node '{0}' has no outgoing edge")]
    NodeWithoutEdge(String),

    #[error("end is not reachable from entry node '{0}'")]
    EndUnreachable(String),
}

// ---------------------------------------------------------------------------
// Router outcomes
// ---------------------------------------------------------------------------

/// A closed set of labels a router can return.
///
/// `ALL` lets `compile` verify that every label is mapped to a target.
pub trait Outcome: Copy + Eq + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
}

type Decide = Box<dyn Fn(&RunState) -> &'static str + Send + Sync>;

enum Edge {
    Always(Target),
    Conditional {
        decide: Decide,
        labels: Vec<&'static str>,
        branches: HashMap<&'static str, Target>,
    },
}

impl Edge {
    fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Always(target) => vec![target],
            Edge::Conditional { branches, .. } => branches.values().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// GraphDefinition (builder)
// ---------------------------------------------------------------------------

/// Mutable graph under construction.
#[derive(Default)]
pub struct GraphDefinition {
    nodes: Vec<(String, NodeKind)>,
    edges: Vec<(String, Edge)>,
    entry: Option<String>,
}

impl GraphDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> &mut Self {
        self.nodes.push((name.into(), kind));
        self
    }

    pub fn set_entry(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry = Some(name.into());
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: Target) -> &mut Self {
        self.edges.push((from.into(), Edge::Always(to)));
        self
    }

    /// Route out of `from` by calling `decide` on the post-step state.
    pub fn add_conditional_edges<O: Outcome>(
        &mut self,
        from: impl Into<String>,
        decide: fn(&RunState) -> O,
        branches: impl IntoIterator<Item = (O, Target)>,
    ) -> &mut Self {
        let branches = branches
            .into_iter()
            .map(|(outcome, target)| (outcome.label(), target))
            .collect();
        self.edges.push((
            from.into(),
            Edge::Conditional {
                decide: Box::new(move |state| decide(state).label()),
                labels: O::ALL.iter().map(|o| o.label()).collect(),
                branches,
            },
        ));
        self
    }

    /// Validate and freeze the graph.
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;

        let mut nodes: BTreeMap<String, NodeKind> = BTreeMap::new();
        for (name, kind) in self.nodes {
            if name == Target::END_MARKER || nodes.insert(name.clone(), kind).is_some() {
                return Err(GraphError::DuplicateNode(name));
            }
        }
        if !nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }

        let mut edges: HashMap<String, Edge> = HashMap::new();
        for (from, edge) in self.edges {
            if !nodes.contains_key(&from) {
                return Err(GraphError::UnknownNode(from));
            }
            for target in edge.targets() {
                if let Target::Node(name) = target {
                    if !nodes.contains_key(name) {
                        return Err(GraphError::UnknownNode(name.clone()));
                    }
                }
            }
            if let Edge::Conditional { labels, branches, .. } = &edge {
                if let Some(missing) = labels.iter().find(|l| !branches.contains_key(**l)) {
                    return Err(GraphError::UnmappedOutcome {
                        node: from,
                        outcome: (*missing).to_string(),
                    });
                }
            }
            if edges.contains_key(&from) {
                return Err(GraphError::DuplicateEdge(from));
            }
            edges.insert(from, edge);
        }

        if !edges.contains_key(&entry) {
            return Err(GraphError::EntryWithoutEdge(entry));
        }
        if let Some(stuck) = nodes.keys().find(|n| !edges.contains_key(*n)) {
            return Err(GraphError::NodeWithoutEdge(stuck.clone()));
        }

        // Reachability over the flow graph, with END as an explicit sink.
        let mut flow = DiGraph::<&str, ()>::new();
        let end = flow.add_node(Target::END_MARKER);
        let index: HashMap<&str, NodeIndex> = nodes
            .keys()
            .map(|name| (name.as_str(), flow.add_node(name.as_str())))
            .collect();
        for (from, edge) in &edges {
            for target in edge.targets() {
                let to = match target {
                    Target::End => end,
                    Target::Node(name) => index[name.as_str()],
                };
                flow.add_edge(index[from.as_str()], to, ());
            }
        }
        let start = index[entry.as_str()];
        if !has_path_connecting(&flow, start, end, None) {
            return Err(GraphError::EndUnreachable(entry));
        }
        for (name, idx) in &index {
            if !has_path_connecting(&flow, start, *idx, None) {
                tracing::warn!(node = %name, "node is unreachable from the entry point");
            }
        }

        Ok(CompiledGraph {
            nodes,
            edges,
            entry,
        })
    }
}

// ---------------------------------------------------------------------------
// CompiledGraph
// ---------------------------------------------------------------------------

/// Validated, immutable workflow graph.
pub struct CompiledGraph {
    nodes: BTreeMap<String, NodeKind>,
    edges: HashMap<String, Edge>,
    entry: String,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

impl CompiledGraph {
    pub fn entry(&self) -> Target {
        Target::node(self.entry.clone())
    }

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).copied()
    }

    /// Where to go after `from`, given the state produced by its step.
    pub fn next(&self, from: &str, state: &RunState) -> Result<Target, GraphError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| GraphError::UnknownNode(from.to_string()))?;
        match edge {
            Edge::Always(target) => Ok(target.clone()),
            Edge::Conditional { decide, branches, .. } => {
                let label = decide(state);
                branches
                    .get(label)
                    .cloned()
                    .ok_or_else(|| GraphError::UnmappedOutcome {
                        node: from.to_string(),
                        outcome: label.to_string(),
                    })
            }
        }
    }

    /// Lifecycle status implied by a pending target.
    pub fn status_for(&self, next: &Target) -> RunStatus {
        match next {
            Target::End => RunStatus::Completed,
            Target::Node(name) if self.kind(name) == Some(NodeKind::AwaitHuman) => {
                RunStatus::AwaitingHuman
            }
            Target::Node(_) => RunStatus::Running,
        }
    }

    /// Mermaid flowchart of the graph.
    pub fn describe(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let _ = writeln!(out, "    START([start]) --> {}", self.entry);
        for name in self.nodes.keys() {
            let edge = &self.edges[name];
            match edge {
                Edge::Always(target) => {
                    let _ = writeln!(out, "    {name} --> {}", mermaid_id(target));
                }
                Edge::Conditional { labels, branches, .. } => {
                    for label in labels {
                        let target = &branches[*label];
                        let _ = writeln!(out, "    {name} -->|{label}| {}", mermaid_id(target));
                    }
                }
            }
        }
        out.push_str("    END([end])\n");
        out
    }
}

fn mermaid_id(target: &Target) -> &str {
    match target {
        Target::End => "END",
        Target::Node(name) => name,
    }
}

// ---------------------------------------------------------------------------
// Standard pipeline
// ---------------------------------------------------------------------------

/// The human -> produce -> review -> verify revision loop.
pub fn revision_pipeline() -> GraphDefinition {
    let mut graph = GraphDefinition::new();
    graph
        .add_node(AWAIT_HUMAN, NodeKind::AwaitHuman)
        .add_node(PRODUCE, NodeKind::Produce)
        .add_node(INVOKE_TOOLS, NodeKind::InvokeTools)
        .add_node(REVIEW, NodeKind::Review)
        .add_node(VERIFY, NodeKind::Verify)
        .set_entry(AWAIT_HUMAN)
        .add_conditional_edges(
            AWAIT_HUMAN,
            router::route_after_human,
            [
                (HumanRoute::Continue, Target::node(PRODUCE)),
                (HumanRoute::Finish, Target::End),
            ],
        )
        .add_conditional_edges(
            PRODUCE,
            router::route_after_produce,
            [
                (ProduceRoute::InvokeTools, Target::node(INVOKE_TOOLS)),
                (ProduceRoute::Review, Target::node(REVIEW)),
                (ProduceRoute::SkipReview, Target::node(VERIFY)),
            ],
        )
        .add_edge(INVOKE_TOOLS, Target::node(PRODUCE))
        .add_conditional_edges(
            REVIEW,
            router::route_after_review,
            [
                (ReviewRoute::Approved, Target::node(VERIFY)),
                (ReviewRoute::CeilingReached, Target::node(VERIFY)),
                (ReviewRoute::Rejected, Target::node(PRODUCE)),
            ],
        )
        .add_conditional_edges(
            VERIFY,
            router::route_after_verify,
            [
                (VerifyRoute::Verified, Target::node(AWAIT_HUMAN)),
                (VerifyRoute::CeilingReached, Target::node(AWAIT_HUMAN)),
                (VerifyRoute::Rejected, Target::node(PRODUCE)),
            ],
        );
    graph
}
