//! The result presenter (C7): turns a solver's output into a renderer-agnostic
//! graph of nodes and edges, grouped into the three memory-model containers
//! and tagged with shape hints (spec §4.5).
//!
//! Container/shape precedence is grounded directly in the reference
//! system's diagram builder: containers are chosen by the *first* matching
//! option in ascending `StmtOption` order (heap, then stack, then global),
//! while shape is chosen by the *last* matching option in that same order
//! (so e.g. `Undefined` always wins over `HeapObj` when both are present).

use crate::andersen::PointsToSet;
use crate::steensgaard::SteensgaardResult;
use pointercore_core::{Constraint, Result, StmtOption};
use pointercore_store::ConstraintStore;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContainer {
    Heap,
    Stack,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Plain,
    Object,
    NullPtr,
    Undefined,
    Function,
}

#[derive(Debug, Clone)]
pub struct PresentedNode {
    pub hash: u64,
    pub label: String,
    pub container: Option<NodeContainer>,
    pub shape: NodeShape,
    /// Set for the query's seed node — the reference diagram builder's
    /// `centerNodeDecoration` (gold fill) applied to whatever hash the
    /// query started from (spec §4.5).
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PresentedEdge {
    pub from: u64,
    pub to: u64,
    /// Styled dashed when the LHS of the underlying constraint is a
    /// reference (spec §4.5).
    pub dashed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PresentedGraph {
    pub nodes: Vec<PresentedNode>,
    pub edges: Vec<PresentedEdge>,
}

/// Picks the first of `{HeapObj, StackObj, GlobalObject}` present in
/// `options`, in that order; entities tagged with none of the three (a
/// parameter, a member, a return-inlined value) get no container.
fn container_for(options: &BTreeSet<StmtOption>) -> Option<NodeContainer> {
    if options.contains(&StmtOption::HeapObj) {
        Some(NodeContainer::Heap)
    } else if options.contains(&StmtOption::StackObj) {
        Some(NodeContainer::Stack)
    } else if options.contains(&StmtOption::GlobalObject) {
        Some(NodeContainer::Global)
    } else {
        None
    }
}

/// Applies shape decorations in ascending `StmtOption` order so a
/// later-ordinal option (e.g. `Undefined`) overrides an earlier one (e.g.
/// `HeapObj`) when both are present on the same entity, matching the
/// reference system's unconditional decoration loop.
fn shape_for(options: &BTreeSet<StmtOption>) -> NodeShape {
    let mut shape = NodeShape::Plain;
    for opt in options {
        shape = match opt {
            StmtOption::HeapObj | StmtOption::Literal => NodeShape::Object,
            StmtOption::NullPtr => NodeShape::NullPtr,
            StmtOption::FunctionCall => NodeShape::Function,
            StmtOption::Undefined => NodeShape::Undefined,
            _ => shape,
        };
    }
    shape
}

/// Accumulates per-hash metadata (merged options, reference flag) across
/// every constraint side that mentions it, then renders `PresentedNode`s on
/// demand.
struct GraphBuilder<'s> {
    store: &'s ConstraintStore,
    options: HashMap<u64, BTreeSet<StmtOption>>,
    is_reference: HashMap<u64, bool>,
}

impl<'s> GraphBuilder<'s> {
    fn new(store: &'s ConstraintStore, constraints: &[Constraint]) -> Self {
        let mut options: HashMap<u64, BTreeSet<StmtOption>> = HashMap::new();
        let mut is_reference: HashMap<u64, bool> = HashMap::new();
        for c in constraints {
            for side in [&c.lhs, &c.rhs] {
                options.entry(side.hash).or_default().extend(side.options.iter().copied());
                if side.is_reference() {
                    is_reference.insert(side.hash, true);
                }
            }
        }
        Self {
            store,
            options,
            is_reference,
        }
    }

    fn node(&self, hash: u64, seed: u64) -> Result<PresentedNode> {
        let label = match self.store.get_ast_node(hash)? {
            Some(n) => n.ast_value,
            None => format!("#{hash:x}"),
        };
        let opts = self.options.get(&hash).cloned().unwrap_or_default();
        Ok(PresentedNode {
            hash,
            label,
            container: container_for(&opts),
            shape: shape_for(&opts),
            highlighted: hash == seed,
        })
    }

    fn dashed(&self, from: u64) -> bool {
        *self.is_reference.get(&from).unwrap_or(&false)
    }
}

/// Renders an Andersen solver's points-to sets: one edge per `(variable,
/// target)` pair, one node per hash that appears as either endpoint. `seed`
/// is the hash the query sliced from; its node is returned `highlighted`.
pub fn present_andersen(
    store: &ConstraintStore,
    constraints: &[Constraint],
    points_to: &PointsToSet,
    seed: u64,
) -> Result<PresentedGraph> {
    let builder = GraphBuilder::new(store, constraints);
    let mut seen = std::collections::HashSet::new();
    let mut edges = Vec::new();

    for (&from, targets) in points_to.entries() {
        seen.insert(from);
        for &to in targets {
            seen.insert(to);
            edges.push(PresentedEdge {
                from,
                to,
                dashed: builder.dashed(from),
            });
        }
    }

    let mut nodes = Vec::with_capacity(seen.len());
    for hash in seen {
        nodes.push(builder.node(hash, seed)?);
    }
    nodes.sort_by_key(|n| n.hash);
    edges.sort_by_key(|e| (e.from, e.to));

    Ok(PresentedGraph { nodes, edges })
}

/// Renders a Steensgaard solver's equivalence classes: one edge per
/// `(variable, resolved pointee class)` pair. `seed` is the hash the query
/// sliced from; its node is returned `highlighted`.
pub fn present_steensgaard(
    store: &ConstraintStore,
    constraints: &[Constraint],
    result: &SteensgaardResult,
    seed: u64,
) -> Result<PresentedGraph> {
    let builder = GraphBuilder::new(store, constraints);
    // Nodes are class representatives, not raw hashes, so the seed must be
    // canonicalized the same way before comparing for the highlight.
    let seed_class = result.class_of(seed);
    let mut seen = std::collections::HashSet::new();
    let mut edges = Vec::new();

    for (&hash, &class) in result.classes() {
        seen.insert(class);
        if let Some(target) = result.points_to(hash) {
            seen.insert(target);
            edges.push(PresentedEdge {
                from: class,
                to: target,
                dashed: builder.dashed(hash),
            });
        }
    }

    let mut nodes = Vec::with_capacity(seen.len());
    for hash in seen {
        nodes.push(builder.node(hash, seed_class)?);
    }
    nodes.sort_by_key(|n| n.hash);
    edges.sort_by_key(|e| (e.from, e.to));

    Ok(PresentedGraph { nodes, edges })
}
