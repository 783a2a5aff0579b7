//! State of one mounted perturbation map view.
//!
//! Wires the data store, the visibility engine, the layout engine and the
//! interaction machines together. Host bindings translate native events
//! into the pointer/wheel methods here; every method returns whether the
//! canvas needs a redraw.

use std::sync::Arc;

use log::debug;

use super::editor::StructureEditSession;
use super::filter::{ActiveSubgraph, RelayoutRequest, VisibilityEngine};
use super::interaction::{DetailLevel, InteractionConfig, InteractionMachine};
use super::layout::{
	Layout, LayoutAlgorithm, LayoutConfig, LayoutEdge, LayoutInput, LayoutNode, Point,
	compute_layout,
};
use super::scale::{ScaleConfig, ViewTransform};
use super::selection::{Selection, SelectionError, SelectionForm};
use super::store::GraphStore;
use super::theme::Theme;
use super::types::{GraphSnapshot, NodeId, find_property};

/// Wheel delta to zoom factor.
const WHEEL_ZOOM_SPEED: f64 = 0.001;

/// Where an in-progress pan started.
#[derive(Clone, Copy, Debug, Default)]
struct PanAnchor {
	pointer: (f64, f64),
	origin: (f64, f64),
}

/// Everything one mounted view knows.
pub struct PerturbationMapState {
	/// Loaded data plus structure edits.
	pub store: GraphStore,
	/// Selection, active subgraph and render states.
	pub engine: VisibilityEngine,
	/// Hover, pan and zoom-detail machines.
	pub interaction: InteractionMachine,
	/// Layout tuning and canvas size.
	pub layout_config: LayoutConfig,
	/// Positions of the active subgraph.
	pub layout: Layout,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Rendered sizes.
	pub scale: ScaleConfig,
	/// Rendered colors.
	pub theme: Theme,
	/// Open structure edit, if any.
	pub editor: StructureEditSession,
	pan: Option<PanAnchor>,
}

impl PerturbationMapState {
	/// View of the whole graph.
	pub fn new(
		store: GraphStore,
		layout_config: LayoutConfig,
		interaction: InteractionConfig,
	) -> Self {
		Self::with_selection(store, Selection::None, layout_config, interaction)
	}

	/// View with `selection` already applied. Lays out once.
	pub fn with_selection(
		store: GraphStore,
		selection: Selection,
		layout_config: LayoutConfig,
		interaction: InteractionConfig,
	) -> Self {
		let mut engine = VisibilityEngine::new(store.snapshot(), interaction.relayout_debounce_ms);
		if selection != Selection::None {
			engine.apply(selection);
		}
		let mut state = Self {
			store,
			engine,
			interaction: InteractionMachine::new(interaction),
			layout_config,
			layout: Layout::default(),
			transform: ViewTransform::default(),
			scale: ScaleConfig::default(),
			theme: Theme::default(),
			editor: StructureEditSession::Closed,
			pan: None,
		};
		state.relayout();
		state
	}

	/// Graph on display.
	pub fn snapshot(&self) -> &Arc<GraphSnapshot> {
		self.engine.snapshot()
	}

	/// Structure detail level for the current zoom.
	pub fn detail(&self) -> DetailLevel {
		self.interaction.detail()
	}

	/// Swap in freshly loaded data, keeping the current selection.
	pub fn replace_store(&mut self, store: GraphStore) {
		self.interaction.dispose(self.engine.states_mut());
		let selection = self.engine.selection().clone();
		let debounce_ms = self.interaction.config().relayout_debounce_ms;
		self.engine = VisibilityEngine::new(store.snapshot(), debounce_ms);
		self.store = store;
		self.editor.cancel();
		let request = self.engine.apply(selection);
		self.on_relayout_request(request);
	}

	/// Queue a selection change. It takes effect once edits settle.
	pub fn select(&mut self, selection: Selection, now: f64) {
		self.engine.select(selection, now);
	}

	/// Queue a selection from an external form; conflicting forms are
	/// rejected and the current selection is kept.
	pub fn select_form(&mut self, form: SelectionForm, now: f64) -> Result<(), SelectionError> {
		self.engine.select_form(form, now)
	}

	/// Apply a selection immediately.
	pub fn apply_selection(&mut self, selection: Selection) {
		let request = self.engine.apply(selection);
		self.on_relayout_request(request);
	}

	/// Switch layout algorithm, laying out again on change.
	pub fn set_algorithm(&mut self, algorithm: LayoutAlgorithm) {
		if self.layout_config.algorithm != algorithm {
			self.layout_config.algorithm = algorithm;
			self.relayout();
		}
	}

	/// Canvas resized: refit the view.
	pub fn resize(&mut self, width: f64, height: f64) {
		if width <= 0.0 || height <= 0.0 {
			return;
		}
		self.layout_config.width = width;
		self.layout_config.height = height;
		self.fit_view();
	}

	fn on_relayout_request(&mut self, request: RelayoutRequest) {
		self.interaction.on_recompute(self.engine.states_mut());
		self.layout = compute_layout(&self.layout_input(&request.subgraph), &self.layout_config);
		self.fit_view();
	}

	/// Lay out the current active subgraph again.
	pub fn relayout(&mut self) {
		let request = RelayoutRequest {
			subgraph: self.engine.active().clone(),
		};
		self.on_relayout_request(request);
	}

	fn fit_view(&mut self) {
		self.transform = match &self.layout.bounds {
			Some(bounds) => ViewTransform::fit(
				bounds,
				self.layout_config.width,
				self.layout_config.height,
				self.layout_config.fit_padding,
			),
			None => ViewTransform::default(),
		};
		self.interaction.zoom_now(self.transform.k);
	}

	/// Node cards at their rendered size; label points sized like the edge's
	/// label card.
	pub fn layout_input(&self, subgraph: &ActiveSubgraph) -> LayoutInput {
		let snapshot = self.snapshot();
		let nodes = subgraph
			.nodes
			.iter()
			.map(|id| LayoutNode {
				id: id.clone(),
				size: self.scale.node_size,
			})
			.collect();
		let edges = subgraph
			.edges
			.iter()
			.map(|id| {
				let chips = snapshot.edge(id).map_or(0, |edge| {
					snapshot
						.edge_properties
						.iter()
						.filter(|key| find_property(&edge.properties, key).is_some())
						.count()
				});
				LayoutEdge {
					id: id.clone(),
					label_size: self.scale.label_size(chips),
				}
			})
			.collect();
		LayoutInput { nodes, edges }
	}

	/// Laid-out nodes back to front: dimmed cards first, then the rest.
	pub fn paint_order(&self) -> Vec<(&NodeId, Point)> {
		let states = self.engine.states();
		let dimmed = |id: &str| states.node(id).is_some_and(|s| s.dimmed);
		let (mut order, focused): (Vec<_>, Vec<_>) = self
			.layout
			.positions
			.iter()
			.map(|(id, p)| (id, *p))
			.partition(|(id, _)| dimmed(id));
		order.extend(focused);
		order
	}

	/// Topmost visible node under the screen point, in paint order.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeId> {
		let (wx, wy) = self.transform.screen_to_world(sx, sy);
		let (hw, hh) = (self.scale.node_size.width / 2.0, self.scale.node_size.height / 2.0);
		let states = self.engine.states();
		self.paint_order()
			.into_iter()
			.rev()
			.find(|(id, p)| {
				states.node(id).is_some_and(|s| s.visible)
					&& (wx - p.x).abs() <= hw
					&& (wy - p.y).abs() <= hh
			})
			.map(|(id, _)| id.clone())
	}

	/// Button pressed at a screen point: start a pan.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) -> bool {
		if !self.interaction.pan_start(self.engine.states_mut()) {
			return false;
		}
		self.pan = Some(PanAnchor {
			pointer: (sx, sy),
			origin: (self.transform.x, self.transform.y),
		});
		true
	}

	/// Pointer moved: pan when dragging, else hover hit-test.
	pub fn pointer_move(&mut self, now: f64, sx: f64, sy: f64) -> bool {
		if self.interaction.is_panning() {
			return match self.interaction.pan_move(now, (sx, sy)) {
				Some(pos) => self.pan_to(pos),
				None => false,
			};
		}
		let hit = self.node_at_position(sx, sy);
		self.interaction.hover(self.engine.states_mut(), hit.as_deref())
	}

	/// Button released: end the pan, applying its last position.
	pub fn pointer_up(&mut self, now: f64) -> bool {
		let was_panning = self.interaction.is_panning();
		if let Some(pos) = self.interaction.pan_end(now, self.engine.states_mut()) {
			self.pan_to(pos);
		}
		self.pan = None;
		was_panning
	}

	/// Pointer left the canvas.
	pub fn pointer_leave(&mut self) -> bool {
		self.pan = None;
		self.interaction.leave(self.engine.states_mut())
	}

	fn pan_to(&mut self, (sx, sy): (f64, f64)) -> bool {
		let Some(anchor) = self.pan else {
			return false;
		};
		self.transform.x = anchor.origin.0 + sx - anchor.pointer.0;
		self.transform.y = anchor.origin.1 + sy - anchor.pointer.1;
		true
	}

	/// Zoom around the pointer. The transform follows every event; the
	/// detail level follows the throttled ratio.
	pub fn wheel(&mut self, now: f64, sx: f64, sy: f64, delta_y: f64) -> bool {
		let factor = (-delta_y * WHEEL_ZOOM_SPEED).exp();
		self.transform.zoom_at(sx, sy, factor);
		self.interaction.zoom(now, self.transform.k);
		true
	}

	/// Apply debounced selections and throttled interaction values that are
	/// due at `now`.
	pub fn poll(&mut self, now: f64) -> bool {
		let mut changed = false;
		if let Some(request) = self.engine.poll(now) {
			self.on_relayout_request(request);
			changed = true;
		}
		let polled = self.interaction.poll(now);
		if let Some(pos) = polled.pan_to {
			changed |= self.pan_to(pos);
		}
		changed || polled.detail.is_some()
	}

	/// Earliest time [`PerturbationMapState::poll`] has work to do.
	pub fn deadline(&self) -> Option<f64> {
		match (self.engine.deadline(), self.interaction.deadline()) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(a, b) => a.or(b),
		}
	}

	/// Open the structure editor on `node`.
	pub fn begin_edit(&mut self, node: &str) -> bool {
		self.editor = StructureEditSession::begin(&self.store, node);
		self.editor.is_open()
	}

	/// Persist the open edit into the store.
	pub fn commit_edit(&mut self) -> bool {
		self.editor.commit(&mut self.store).is_some()
	}

	/// Discard the open edit.
	pub fn cancel_edit(&mut self) {
		self.editor.cancel();
	}

	/// Return every interaction to idle and drop pending work.
	pub fn dispose(&mut self) {
		self.interaction.dispose(self.engine.states_mut());
		self.engine.cancel_pending();
		self.pan = None;
		debug!("perturbation-map: view disposed");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perturbation_map::filter::tests::diamond;
	use crate::components::perturbation_map::types::EdgeId;

	fn state() -> PerturbationMapState {
		PerturbationMapState::new(
			GraphStore::new(diamond()),
			LayoutConfig::default(),
			InteractionConfig::default(),
		)
	}

	#[test]
	fn selecting_an_edge_centers_its_endpoints() {
		let mut state = state();
		state.select(Selection::edge("a", "b"), 0.0);
		assert!(!state.poll(100.0));
		assert!(state.poll(150.0));

		assert_eq!(state.engine.active().nodes, vec!["a", "b"]);
		assert_eq!(state.engine.active().edges, vec![EdgeId::new("a", "b")]);
		assert_eq!(state.layout.positions.len(), 2);
		let (a, b) = (
			state.layout.position("a").unwrap(),
			state.layout.position("b").unwrap(),
		);
		assert!(((a.x + b.x) / 2.0 - 400.0).abs() < 1e-6);
		assert!(((a.y + b.y) / 2.0 - 300.0).abs() < 1e-6);
	}

	#[test]
	fn empty_result_renders_nothing() {
		let mut state = state();
		state.apply_selection(Selection::nodes(["nope"], false));
		assert!(state.layout.positions.is_empty());
		assert_eq!(state.transform, ViewTransform::default());
		assert_eq!(state.node_at_position(400.0, 300.0), None);
	}

	#[test]
	fn empty_store_is_renderable() {
		let state = PerturbationMapState::new(
			GraphStore::default(),
			LayoutConfig::default(),
			InteractionConfig::default(),
		);
		assert!(state.layout.positions.is_empty());
		assert!(state.engine.active().is_empty());
	}

	#[test]
	fn view_is_fitted_after_relayout() {
		let state = state();
		let bounds = state.layout.bounds.unwrap();
		let (x0, y0) = (
			bounds.min_x * state.transform.k + state.transform.x,
			bounds.min_y * state.transform.k + state.transform.y,
		);
		let (x1, y1) = (
			bounds.max_x * state.transform.k + state.transform.x,
			bounds.max_y * state.transform.k + state.transform.y,
		);
		assert!(x0 >= 20.0 - 1e-6 && y0 >= 20.0 - 1e-6);
		assert!(x1 <= 780.0 + 1e-6 && y1 <= 580.0 + 1e-6);
	}

	#[test]
	fn hover_hit_tests_node_cards() {
		let mut state = state();
		let p = state.layout.position("d").unwrap();
		let t = state.transform;
		let (sx, sy) = (p.x * t.k + t.x, p.y * t.k + t.y);
		assert_eq!(state.node_at_position(sx, sy).as_deref(), Some("d"));
		assert!(state.pointer_move(0.0, sx, sy));
		assert_eq!(state.interaction.hovered(), Some("d"));
		assert!(state.engine.states().node("a").unwrap().dimmed);
		assert!(state.pointer_leave());
		assert!(!state.engine.states().node("a").unwrap().dimmed);
	}

	#[test]
	fn hit_test_follows_paint_order() {
		let mut state = state();
		let t = state.transform;
		let screen = |p: Point| (p.x * t.k + t.x, p.y * t.k + t.y);

		let (ax, ay) = screen(state.layout.position("a").unwrap());
		assert!(state.pointer_move(0.0, ax, ay));
		assert!(state.engine.states().node("d").unwrap().dimmed);

		// Dimmed `d` under focused `b`: `b` is painted last, so it is hit.
		let b = state.layout.position("b").unwrap();
		state.layout.positions.insert("d".into(), b);
		let order: Vec<&str> = state.paint_order().iter().map(|(id, _)| id.as_str()).collect();
		assert_eq!(order, vec!["d", "a", "b", "c"]);
		let (bx, by) = screen(b);
		assert_eq!(state.node_at_position(bx, by).as_deref(), Some("b"));
	}

	#[test]
	fn initial_selection_is_laid_out_directly() {
		let state = PerturbationMapState::with_selection(
			GraphStore::new(diamond()),
			Selection::edge("a", "b"),
			LayoutConfig::default(),
			InteractionConfig::default(),
		);
		assert_eq!(state.engine.selection(), &Selection::edge("a", "b"));
		assert_eq!(state.layout.positions.len(), 2);
		assert_eq!(state.deadline(), None);

		let mut applied = self::state();
		applied.apply_selection(Selection::edge("a", "b"));
		assert_eq!(state.layout, applied.layout);
		assert_eq!(state.transform, applied.transform);
	}

	#[test]
	fn drag_pans_the_view() {
		let mut state = state();
		let start = state.transform;
		assert!(state.pointer_down(10.0, 10.0));
		assert!(state.pointer_move(0.0, 30.0, 50.0));
		state.pointer_move(5.0, 40.0, 60.0);
		assert!(state.pointer_up(10.0));
		assert!((state.transform.x - (start.x + 30.0)).abs() < 1e-9);
		assert!((state.transform.y - (start.y + 50.0)).abs() < 1e-9);
		assert!(state.engine.states().edges.values().all(|e| e.is_drawn()));
	}

	#[test]
	fn wheel_zoom_switches_detail() {
		let mut state = state();
		let k = state.transform.k;
		let target = 0.5;
		let delta = -(target / k).ln() / WHEEL_ZOOM_SPEED;
		state.wheel(1000.0, 400.0, 300.0, delta);
		assert!((state.transform.k - target).abs() < 1e-9);
		assert_eq!(state.detail(), DetailLevel::Placeholder);
	}

	#[test]
	fn structure_edit_round_trip() {
		let mut state = state();
		assert!(state.begin_edit("a"));
		state.editor.on_change("CCO");
		assert!(state.commit_edit());
		assert_eq!(state.store.structure_of("a"), Some("CCO"));
		assert!(state.begin_edit("a"));
		state.editor.on_change("CCN");
		state.cancel_edit();
		assert_eq!(state.store.structure_of("a"), Some("CCO"));
	}

	#[test]
	fn dispose_cancels_pending_selection() {
		let mut state = state();
		state.select(Selection::edge("a", "b"), 0.0);
		state.dispose();
		assert_eq!(state.deadline(), None);
		assert!(!state.poll(1000.0));
		assert_eq!(state.engine.active().nodes.len(), 4);
	}
}
