//! Visibility and filtering.
//!
//! Resolves the current [`Selection`] into the active node/edge subgraph and
//! owns the derived per-element render state table. Every recomputation
//! resets that table to defaults and yields a [`RelayoutRequest`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use super::search::{Rule, SearchTarget, evaluate};
use super::selection::{Selection, SelectionError, SelectionForm};
use super::throttle::Debounce;
use super::types::{EdgeId, GraphSnapshot, NodeId};

/// Node and edge ids eligible for layout and rendering, in snapshot order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveSubgraph {
	/// Active node ids.
	pub nodes: Vec<NodeId>,
	/// Active edge ids. Both endpoints of each are in `nodes`.
	pub edges: Vec<EdgeId>,
}

impl ActiveSubgraph {
	/// Whether no node is active.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Active node ids as a set.
	pub fn node_set(&self) -> BTreeSet<&str> {
		self.nodes.iter().map(String::as_str).collect()
	}

	fn full(snapshot: &GraphSnapshot) -> Self {
		Self {
			nodes: snapshot.nodes.iter().map(|n| n.id.clone()).collect(),
			edges: snapshot.edges.iter().map(|e| e.id()).collect(),
		}
	}

	/// Keep `nodes` (snapshot order) and every edge with both endpoints in it.
	fn induced(snapshot: &GraphSnapshot, nodes: &HashSet<&str>) -> Self {
		Self {
			nodes: snapshot
				.nodes
				.iter()
				.filter(|n| nodes.contains(n.id.as_str()))
				.map(|n| n.id.clone())
				.collect(),
			edges: snapshot
				.edges
				.iter()
				.filter(|e| nodes.contains(e.source.as_str()) && nodes.contains(e.target.as_str()))
				.map(|e| e.id())
				.collect(),
		}
	}
}

/// Resolve `selection` against `snapshot`.
///
/// An empty result for any mode other than [`Selection::None`] is a valid
/// terminal state and is returned as such.
pub fn compute_active_subgraph(snapshot: &GraphSnapshot, selection: &Selection) -> ActiveSubgraph {
	match selection {
		Selection::None => ActiveSubgraph::full(snapshot),
		Selection::Nodes { ids, .. } if ids.is_empty() => ActiveSubgraph::full(snapshot),
		Selection::Nodes {
			ids,
			include_neighbors,
		} => {
			let mut active: HashSet<&str> = snapshot
				.nodes
				.iter()
				.map(|n| n.id.as_str())
				.filter(|id| ids.contains(*id))
				.collect();
			if *include_neighbors {
				let seeds = active.clone();
				for edge in &snapshot.edges {
					if seeds.contains(edge.source.as_str()) {
						active.insert(edge.target.as_str());
					}
					if seeds.contains(edge.target.as_str()) {
						active.insert(edge.source.as_str());
					}
				}
			}
			ActiveSubgraph::induced(snapshot, &active)
		}
		Selection::Edge { id } => match snapshot.edge(id) {
			Some(edge) => {
				let ends: HashSet<&str> = [edge.source.as_str(), edge.target.as_str()].into();
				ActiveSubgraph {
					nodes: snapshot
						.nodes
						.iter()
						.filter(|n| ends.contains(n.id.as_str()))
						.map(|n| n.id.clone())
						.collect(),
					edges: vec![id.clone()],
				}
			}
			None => ActiveSubgraph::default(),
		},
		Selection::Search { rules, target } => search_subgraph(snapshot, rules, *target),
	}
}

fn search_subgraph(
	snapshot: &GraphSnapshot,
	rules: &[Rule],
	target: SearchTarget,
) -> ActiveSubgraph {
	let catalog = match target {
		SearchTarget::Node => &snapshot.node_properties,
		SearchTarget::Edge => &snapshot.edge_properties,
	};
	if rules.is_empty() || rules.iter().any(|r| !catalog.contains(&r.property)) {
		return ActiveSubgraph::default();
	}

	match target {
		SearchTarget::Node => {
			let matched: HashSet<&str> = snapshot
				.nodes
				.iter()
				.filter(|n| evaluate(rules, &n.properties))
				.map(|n| n.id.as_str())
				.collect();
			ActiveSubgraph::induced(snapshot, &matched)
		}
		SearchTarget::Edge => {
			let edges: Vec<_> = snapshot
				.edges
				.iter()
				.filter(|e| evaluate(rules, &e.properties))
				.collect();
			let ends: HashSet<&str> = edges
				.iter()
				.flat_map(|e| [e.source.as_str(), e.target.as_str()])
				.collect();
			ActiveSubgraph {
				nodes: snapshot
					.nodes
					.iter()
					.filter(|n| ends.contains(n.id.as_str()))
					.map(|n| n.id.clone())
					.collect(),
				edges: edges.iter().map(|e| e.id()).collect(),
			}
		}
	}
}

/// Derived per-node state. Only this table is touched by interaction.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRenderState {
	/// In the active subgraph.
	pub visible: bool,
	/// Outside the hover focus.
	pub dimmed: bool,
	/// Catalog keys shown as chips on the card.
	pub displayed_properties: BTreeSet<String>,
}

/// Derived per-edge state.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRenderState {
	/// Set by the filter only.
	pub displayed: bool,
	/// Temporarily hidden while the canvas is being panned.
	pub pan_hidden: bool,
	/// Incident to the hovered node.
	pub highlighted: bool,
	/// Opacity of the edge stroke, label background and label text.
	pub label_opacity: f64,
}

impl EdgeRenderState {
	/// Whether the edge is displayed and not hidden by a pan.
	pub fn is_drawn(&self) -> bool {
		self.displayed && !self.pan_hidden
	}
}

/// Render state for every element of the snapshot, keyed by stable id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStates {
	/// State per node id.
	pub nodes: BTreeMap<NodeId, NodeRenderState>,
	/// State per edge id.
	pub edges: BTreeMap<EdgeId, EdgeRenderState>,
}

impl RenderStates {
	/// Default state: active elements visible, nothing dimmed or highlighted.
	/// Each node displays the catalog keys it actually carries.
	pub fn for_subgraph(snapshot: &GraphSnapshot, active: &ActiveSubgraph) -> Self {
		let active_nodes = active.node_set();
		let active_edges: HashSet<&EdgeId> = active.edges.iter().collect();

		let nodes = snapshot
			.nodes
			.iter()
			.map(|node| {
				let displayed_properties = snapshot
					.node_properties
					.iter()
					.filter(|key| node.properties.iter().any(|p| &p.key == *key))
					.cloned()
					.collect();
				let state = NodeRenderState {
					visible: active_nodes.contains(node.id.as_str()),
					dimmed: false,
					displayed_properties,
				};
				(node.id.clone(), state)
			})
			.collect();

		let edges = snapshot
			.edges
			.iter()
			.map(|edge| {
				let id = edge.id();
				let state = EdgeRenderState {
					displayed: active_edges.contains(&id),
					pan_hidden: false,
					highlighted: false,
					label_opacity: 1.0,
				};
				(id, state)
			})
			.collect();

		Self { nodes, edges }
	}

	/// State of node `id`.
	pub fn node(&self, id: &str) -> Option<&NodeRenderState> {
		self.nodes.get(id)
	}

	/// State of edge `id`.
	pub fn edge(&self, id: &EdgeId) -> Option<&EdgeRenderState> {
		self.edges.get(id)
	}
}

/// Relayout of exactly these elements was requested.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayoutRequest {
	/// Elements to lay out.
	pub subgraph: ActiveSubgraph,
}

/// Owns the current selection, the active subgraph and the render states.
///
/// Selection changes made through [`VisibilityEngine::select`] are debounced
/// so a burst of edits produces one recomputation against the final value.
pub struct VisibilityEngine {
	snapshot: Arc<GraphSnapshot>,
	selection: Selection,
	active: ActiveSubgraph,
	states: RenderStates,
	pending: Debounce<Selection>,
}

impl VisibilityEngine {
	/// Engine over `snapshot` with no selection. `debounce_ms` delays
	/// [`VisibilityEngine::select`].
	pub fn new(snapshot: Arc<GraphSnapshot>, debounce_ms: f64) -> Self {
		let active = compute_active_subgraph(&snapshot, &Selection::None);
		let states = RenderStates::for_subgraph(&snapshot, &active);
		Self {
			snapshot,
			selection: Selection::None,
			active,
			states,
			pending: Debounce::new(debounce_ms),
		}
	}

	/// Graph being filtered.
	pub fn snapshot(&self) -> &Arc<GraphSnapshot> {
		&self.snapshot
	}

	/// Selection currently applied.
	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/// Current active subgraph.
	pub fn active(&self) -> &ActiveSubgraph {
		&self.active
	}

	/// Current render states.
	pub fn states(&self) -> &RenderStates {
		&self.states
	}

	/// Render states, for interaction effects.
	pub fn states_mut(&mut self) -> &mut RenderStates {
		&mut self.states
	}

	/// Queue a selection change; it applies once edits settle.
	pub fn select(&mut self, selection: Selection, now: f64) {
		self.pending.offer(now, selection);
	}

	/// Queue a selection coming from an external form. A form with several
	/// modes filled in is rejected and the current selection is kept.
	pub fn select_form(&mut self, form: SelectionForm, now: f64) -> Result<(), SelectionError> {
		match Selection::try_from(form) {
			Ok(selection) => {
				self.select(selection, now);
				Ok(())
			}
			Err(e) => {
				warn!("perturbation-map: {e}; keeping {} selection", self.selection.mode());
				Err(e)
			}
		}
	}

	/// Apply a settled selection, if any.
	pub fn poll(&mut self, now: f64) -> Option<RelayoutRequest> {
		let selection = self.pending.poll(now)?;
		Some(self.apply(selection))
	}

	/// When the queued selection settles.
	pub fn deadline(&self) -> Option<f64> {
		self.pending.deadline()
	}

	/// Apply `selection` immediately, bypassing the debounce.
	pub fn apply(&mut self, selection: Selection) -> RelayoutRequest {
		self.pending.cancel();
		self.selection = selection;
		self.recompute()
	}

	/// Recompute from the current selection and reset render states.
	pub fn recompute(&mut self) -> RelayoutRequest {
		self.active = compute_active_subgraph(&self.snapshot, &self.selection);
		self.states = RenderStates::for_subgraph(&self.snapshot, &self.active);
		debug!(
			"perturbation-map: {} selection -> {} nodes, {} edges",
			self.selection.mode(),
			self.active.nodes.len(),
			self.active.edges.len()
		);
		RelayoutRequest {
			subgraph: self.active.clone(),
		}
	}

	/// Drop a queued selection change.
	pub fn cancel_pending(&mut self) {
		self.pending.cancel();
	}
}
