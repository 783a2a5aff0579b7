//! Hover, pan and zoom interaction.
//!
//! Each concern is a small state machine with a pure transition function
//! `(state, event) -> (state, effect)`. [`InteractionMachine`] owns the three
//! machines plus their throttles and applies the effects to the derived
//! [`RenderStates`] table, which is the only thing interaction may touch.

use std::collections::BTreeSet;

use log::debug;

use super::filter::RenderStates;
use super::throttle::Throttle;
use super::types::{EdgeId, NodeId};

/// Timing and threshold settings for interaction.
#[derive(Clone, Debug)]
pub struct InteractionConfig {
	/// Zoom ratio at and above which structures are drawn in full.
	pub detail_threshold: f64,
	/// Minimum interval between zoom ratios reaching the detail machine.
	pub zoom_throttle_ms: f64,
	/// Minimum interval between applied pan moves.
	pub pan_throttle_ms: f64,
	/// Quiet period before a selection edit triggers a relayout.
	pub relayout_debounce_ms: f64,
	/// Opacity of edges and labels not incident to the hovered node.
	pub faded_opacity: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self {
			detail_threshold: 0.8,
			zoom_throttle_ms: 100.0,
			pan_throttle_ms: 16.0,
			relayout_debounce_ms: 150.0,
			faded_opacity: 0.2,
		}
	}
}

/// Hover machine state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HoverState {
	/// Nothing hovered; all render states at defaults.
	#[default]
	Idle,
	/// This node and its neighbourhood are highlighted.
	Highlighted(NodeId),
}

/// Pointer input to the hover machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent {
	/// The pointer is over a node.
	Enter(NodeId),
	/// The pointer is over no node.
	Leave,
}

/// Render-state change requested by a hover transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoverEffect {
	/// Leave render states as they are.
	None,
	/// Focus this node, dim the rest.
	Highlight(NodeId),
	/// Undim every node and restore every edge.
	Reset,
}

/// Hover transition. Entering the already highlighted node is a no-op.
pub fn hover_transition(state: &HoverState, event: HoverEvent) -> (HoverState, HoverEffect) {
	match (state, event) {
		(HoverState::Highlighted(current), HoverEvent::Enter(node)) if *current == node => {
			(state.clone(), HoverEffect::None)
		}
		(_, HoverEvent::Enter(node)) => (
			HoverState::Highlighted(node.clone()),
			HoverEffect::Highlight(node),
		),
		(HoverState::Highlighted(_), HoverEvent::Leave) => (HoverState::Idle, HoverEffect::Reset),
		(HoverState::Idle, HoverEvent::Leave) => (HoverState::Idle, HoverEffect::None),
	}
}

/// Pan machine state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PanState {
	/// No drag in progress.
	#[default]
	Idle,
	/// Edges hidden when the pan began; only these are restored.
	EdgesHidden(BTreeSet<EdgeId>),
}

/// Pointer input to the pan machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanEvent {
	/// A drag began on empty canvas.
	Start,
	/// The drag was released.
	End,
	/// The pointer left the canvas mid-gesture.
	Leave,
}

/// Render-state change requested by a pan transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanEffect {
	/// Leave render states as they are.
	None,
	/// Hide every displayed edge.
	HideEdges,
	/// Restore the edges hidden at pan start.
	RestoreEdges,
}

/// Pan transition. Start while panning and end while idle are no-ops.
pub fn pan_transition(state: &PanState, event: PanEvent) -> (PanState, PanEffect) {
	match (state, event) {
		(PanState::Idle, PanEvent::Start) => (
			PanState::EdgesHidden(BTreeSet::new()),
			PanEffect::HideEdges,
		),
		(PanState::EdgesHidden(_), PanEvent::End | PanEvent::Leave) => {
			(PanState::Idle, PanEffect::RestoreEdges)
		}
		_ => (state.clone(), PanEffect::None),
	}
}

/// Which structure rendering nodes get at the current zoom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailLevel {
	/// Zoomed out: cheap placeholder boxes.
	Placeholder,
	/// Zoomed in: full structure drawings.
	#[default]
	Full,
}

impl DetailLevel {
	/// Level for zoom ratio `k`. The threshold itself is full detail.
	pub fn for_zoom(k: f64, threshold: f64) -> Self {
		if k >= threshold {
			DetailLevel::Full
		} else {
			DetailLevel::Placeholder
		}
	}
}

/// New detail level for zoom ratio `k`, or `None` when it does not change.
pub fn detail_transition(current: DetailLevel, k: f64, threshold: f64) -> Option<DetailLevel> {
	let next = DetailLevel::for_zoom(k, threshold);
	(next != current).then_some(next)
}

/// Mark `node` and its one-hop neighbors as focused, dim everything else and
/// fade every edge not incident to `node`.
fn apply_highlight(states: &mut RenderStates, node: &str, faded: f64) {
	let mut focus: BTreeSet<NodeId> = BTreeSet::from([node.to_string()]);
	for (id, edge) in &states.edges {
		if edge.displayed && id.touches(node) {
			focus.insert(id.source.clone());
			focus.insert(id.target.clone());
		}
	}
	for (id, state) in states.nodes.iter_mut() {
		state.dimmed = !focus.contains(id);
	}
	for (id, state) in states.edges.iter_mut() {
		state.highlighted = state.displayed && id.touches(node);
		state.label_opacity = if state.highlighted { 1.0 } else { faded };
	}
}

fn reset_highlight(states: &mut RenderStates) {
	for state in states.nodes.values_mut() {
		state.dimmed = false;
	}
	for state in states.edges.values_mut() {
		state.highlighted = false;
		state.label_opacity = 1.0;
	}
}

/// Hide every currently displayed edge, returning the ones hidden.
fn hide_edges(states: &mut RenderStates) -> BTreeSet<EdgeId> {
	states
		.edges
		.iter_mut()
		.filter(|(_, s)| s.displayed && !s.pan_hidden)
		.map(|(id, s)| {
			s.pan_hidden = true;
			id.clone()
		})
		.collect()
}

fn restore_edges(states: &mut RenderStates, hidden: &BTreeSet<EdgeId>) {
	for id in hidden {
		if let Some(state) = states.edges.get_mut(id) {
			state.pan_hidden = false;
		}
	}
}

/// Results of polling the throttles after a timer fires.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polled {
	/// Latest pointer position of an ongoing pan.
	pub pan_to: Option<(f64, f64)>,
	/// Detail level change from a throttled zoom.
	pub detail: Option<DetailLevel>,
}

/// All interaction state of one mounted view.
#[derive(Clone, Debug)]
pub struct InteractionMachine {
	config: InteractionConfig,
	hover: HoverState,
	pan: PanState,
	detail: DetailLevel,
	pan_moves: Throttle<(f64, f64)>,
	zooms: Throttle<f64>,
}

impl InteractionMachine {
	/// Idle machines with full detail.
	pub fn new(config: InteractionConfig) -> Self {
		Self {
			pan_moves: Throttle::new(config.pan_throttle_ms),
			zooms: Throttle::new(config.zoom_throttle_ms),
			config,
			hover: HoverState::Idle,
			pan: PanState::Idle,
			detail: DetailLevel::Full,
		}
	}

	/// Settings in use.
	pub fn config(&self) -> &InteractionConfig {
		&self.config
	}

	/// Currently highlighted node.
	pub fn hovered(&self) -> Option<&str> {
		match &self.hover {
			HoverState::Highlighted(id) => Some(id),
			HoverState::Idle => None,
		}
	}

	/// Whether a drag is in progress.
	pub fn is_panning(&self) -> bool {
		matches!(self.pan, PanState::EdgesHidden(_))
	}

	/// Current detail level.
	pub fn detail(&self) -> DetailLevel {
		self.detail
	}

	/// Pointer is over `node`, or over nothing. Returns whether the render
	/// states changed.
	pub fn hover(&mut self, states: &mut RenderStates, node: Option<&str>) -> bool {
		let event = match node {
			Some(id) => HoverEvent::Enter(id.to_string()),
			None => HoverEvent::Leave,
		};
		let (next, effect) = hover_transition(&self.hover, event);
		self.hover = next;
		match effect {
			HoverEffect::None => false,
			HoverEffect::Highlight(id) => {
				apply_highlight(states, &id, self.config.faded_opacity);
				true
			}
			HoverEffect::Reset => {
				reset_highlight(states);
				true
			}
		}
	}

	/// A drag began. Hides every displayed edge; returns whether the render
	/// states changed.
	pub fn pan_start(&mut self, states: &mut RenderStates) -> bool {
		let (next, effect) = pan_transition(&self.pan, PanEvent::Start);
		if effect != PanEffect::HideEdges {
			return false;
		}
		let hidden = hide_edges(states);
		debug!("perturbation-map: pan started, hiding {} edges", hidden.len());
		self.pan = match next {
			PanState::EdgesHidden(_) => PanState::EdgesHidden(hidden),
			idle => idle,
		};
		true
	}

	/// Pointer moved during a pan. Returns the position to pan to now, if
	/// the throttle lets it through.
	pub fn pan_move(&mut self, now: f64, pos: (f64, f64)) -> Option<(f64, f64)> {
		if !self.is_panning() {
			return None;
		}
		self.pan_moves.offer(now, pos)
	}

	/// End the pan, restoring the edges it hid. Returns a pending pointer
	/// position that still has to be applied.
	pub fn pan_end(&mut self, now: f64, states: &mut RenderStates) -> Option<(f64, f64)> {
		self.finish_pan(PanEvent::End, states)?;
		self.pan_moves.flush(now)
	}

	/// Pointer left the canvas: end any pan and drop any hover.
	pub fn leave(&mut self, states: &mut RenderStates) -> bool {
		let panned = self.finish_pan(PanEvent::Leave, states).is_some();
		self.pan_moves.cancel();
		let hovered = self.hover(states, None);
		panned || hovered
	}

	fn finish_pan(&mut self, event: PanEvent, states: &mut RenderStates) -> Option<()> {
		let (next, effect) = pan_transition(&self.pan, event);
		if effect != PanEffect::RestoreEdges {
			return None;
		}
		if let PanState::EdgesHidden(hidden) = std::mem::replace(&mut self.pan, next) {
			restore_edges(states, &hidden);
			debug!("perturbation-map: pan ended, restored {} edges", hidden.len());
		}
		Some(())
	}

	/// Zoom ratio changed. Returns a new detail level when the throttle lets
	/// the ratio through and it crosses the threshold.
	pub fn zoom(&mut self, now: f64, k: f64) -> Option<DetailLevel> {
		let k = self.zooms.offer(now, k)?;
		self.set_zoom(k)
	}

	/// Zoom ratio set by the view itself, e.g. when fitting. Not throttled.
	pub fn zoom_now(&mut self, k: f64) -> Option<DetailLevel> {
		self.zooms.cancel();
		self.set_zoom(k)
	}

	fn set_zoom(&mut self, k: f64) -> Option<DetailLevel> {
		let next = detail_transition(self.detail, k, self.config.detail_threshold)?;
		debug!("perturbation-map: zoom {k:.2} -> {next:?} detail");
		self.detail = next;
		Some(next)
	}

	/// Emit throttled values that have become due.
	pub fn poll(&mut self, now: f64) -> Polled {
		let pan_to = self.pan_moves.poll(now);
		let detail = self.zooms.poll(now).and_then(|k| self.set_zoom(k));
		Polled { pan_to, detail }
	}

	/// Earliest time a throttled value becomes due.
	pub fn deadline(&self) -> Option<f64> {
		match (self.pan_moves.deadline(), self.zooms.deadline()) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(a, b) => a.or(b),
		}
	}

	/// The filter rebuilt `states` with defaults. Hover is dropped; a pan in
	/// progress hides the newly displayed edges too.
	pub fn on_recompute(&mut self, states: &mut RenderStates) {
		self.hover = HoverState::Idle;
		if self.is_panning() {
			self.pan = PanState::EdgesHidden(hide_edges(states));
		}
	}

	/// Return every machine to idle and drop pending throttled values.
	pub fn dispose(&mut self, states: &mut RenderStates) {
		self.finish_pan(PanEvent::Leave, states);
		self.hover(states, None);
		self.pan_moves.cancel();
		self.zooms.cancel();
	}
}

impl Default for InteractionMachine {
	fn default() -> Self {
		Self::new(InteractionConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::components::perturbation_map::filter::VisibilityEngine;
	use crate::components::perturbation_map::filter::tests::diamond;
	use crate::components::perturbation_map::selection::Selection;

	fn engine() -> VisibilityEngine {
		VisibilityEngine::new(Arc::new(diamond()), 0.0)
	}

	#[test]
	fn hover_transitions() {
		let (s, e) = hover_transition(&HoverState::Idle, HoverEvent::Enter("a".into()));
		assert_eq!(s, HoverState::Highlighted("a".into()));
		assert_eq!(e, HoverEffect::Highlight("a".into()));

		let (s2, e2) = hover_transition(&s, HoverEvent::Enter("a".into()));
		assert_eq!(s2, s);
		assert_eq!(e2, HoverEffect::None);

		let (s3, e3) = hover_transition(&s, HoverEvent::Leave);
		assert_eq!((s3, e3), (HoverState::Idle, HoverEffect::Reset));

		let (_, e4) = hover_transition(&HoverState::Idle, HoverEvent::Leave);
		assert_eq!(e4, HoverEffect::None);
	}

	#[test]
	fn hover_dims_everything_but_neighbors() {
		let mut engine = engine();
		let mut machine = InteractionMachine::default();
		assert!(machine.hover(engine.states_mut(), Some("a")));
		let states = engine.states();
		assert!(!states.node("a").unwrap().dimmed);
		assert!(!states.node("b").unwrap().dimmed);
		assert!(!states.node("c").unwrap().dimmed);
		assert!(states.node("d").unwrap().dimmed);

		let ab = states.edge(&EdgeId::new("a", "b")).unwrap();
		assert!(ab.highlighted);
		assert_eq!(ab.label_opacity, 1.0);
		let bd = states.edge(&EdgeId::new("b", "d")).unwrap();
		assert!(!bd.highlighted);
		assert_eq!(bd.label_opacity, 0.2);
	}

	#[test]
	fn hover_reset_is_bit_exact() {
		let mut engine = engine();
		let before = engine.states().clone();
		let mut machine = InteractionMachine::default();
		machine.hover(engine.states_mut(), Some("a"));
		machine.hover(engine.states_mut(), Some("d"));
		machine.hover(engine.states_mut(), None);
		assert_eq!(engine.states(), &before);
		assert_eq!(machine.hovered(), None);
	}

	#[test]
	fn hovering_same_node_twice_is_noop() {
		let mut engine = engine();
		let mut machine = InteractionMachine::default();
		assert!(machine.hover(engine.states_mut(), Some("b")));
		let once = engine.states().clone();
		assert!(!machine.hover(engine.states_mut(), Some("b")));
		assert_eq!(engine.states(), &once);
	}

	#[test]
	fn pan_restores_prior_visibility_not_filter_visibility() {
		let mut engine = engine();
		engine.apply(Selection::nodes(["a", "b", "d"], false));
		let hidden_by_filter = EdgeId::new("a", "c");
		let visible = EdgeId::new("a", "b");
		let before = engine.states().clone();

		let mut machine = InteractionMachine::default();
		assert!(machine.pan_start(engine.states_mut()));
		assert!(!engine.states().edge(&visible).unwrap().is_drawn());
		assert!(!engine.states().edge(&hidden_by_filter).unwrap().is_drawn());
		assert!(!machine.pan_start(engine.states_mut()));

		machine.pan_end(100.0, engine.states_mut());
		let states = engine.states();
		assert!(states.edge(&visible).unwrap().is_drawn());
		assert!(!states.edge(&hidden_by_filter).unwrap().is_drawn());
		assert!(!states.edge(&hidden_by_filter).unwrap().displayed);
		assert_eq!(states, &before);
	}

	#[test]
	fn leaving_canvas_ends_pan() {
		let mut engine = engine();
		let before = engine.states().clone();
		let mut machine = InteractionMachine::default();
		machine.pan_start(engine.states_mut());
		machine.pan_move(0.0, (10.0, 10.0));
		machine.pan_move(1.0, (12.0, 12.0));
		assert!(machine.leave(engine.states_mut()));
		assert!(!machine.is_panning());
		assert_eq!(engine.states(), &before);
		assert_eq!(machine.deadline(), None);
	}

	#[test]
	fn pan_end_flushes_last_move() {
		let mut engine = engine();
		let mut machine = InteractionMachine::default();
		machine.pan_start(engine.states_mut());
		assert_eq!(machine.pan_move(0.0, (1.0, 1.0)), Some((1.0, 1.0)));
		assert_eq!(machine.pan_move(4.0, (2.0, 2.0)), None);
		assert_eq!(machine.pan_end(8.0, engine.states_mut()), Some((2.0, 2.0)));
		assert_eq!(machine.pan_move(9.0, (3.0, 3.0)), None);
	}

	#[test]
	fn recompute_during_pan_hides_new_edges() {
		let mut engine = engine();
		let mut machine = InteractionMachine::default();
		engine.apply(Selection::edge("a", "b"));
		machine.pan_start(engine.states_mut());
		engine.apply(Selection::None);
		machine.on_recompute(engine.states_mut());
		assert!(engine.states().edges.values().all(|e| !e.is_drawn()));
		machine.pan_end(50.0, engine.states_mut());
		assert!(engine.states().edges.values().all(|e| e.is_drawn()));
	}

	#[test]
	fn zoom_detail_is_throttled() {
		let mut machine = InteractionMachine::default();
		assert_eq!(machine.zoom(0.0, 0.5), Some(DetailLevel::Placeholder));
		assert_eq!(machine.zoom(10.0, 0.9), None);
		assert_eq!(machine.zoom(20.0, 1.2), None);
		assert_eq!(machine.detail(), DetailLevel::Placeholder);
		assert_eq!(machine.deadline(), Some(100.0));
		assert_eq!(machine.poll(100.0).detail, Some(DetailLevel::Full));
		assert_eq!(machine.zoom(300.0, 2.0), None);
		assert_eq!(machine.detail(), DetailLevel::Full);
	}

	#[test]
	fn detail_threshold_is_inclusive() {
		assert_eq!(DetailLevel::for_zoom(0.8, 0.8), DetailLevel::Full);
		assert_eq!(DetailLevel::for_zoom(0.79, 0.8), DetailLevel::Placeholder);
		assert_eq!(detail_transition(DetailLevel::Full, 3.0, 0.8), None);
	}

	#[test]
	fn dispose_returns_to_idle() {
		let mut engine = engine();
		let before = engine.states().clone();
		let mut machine = InteractionMachine::default();
		machine.hover(engine.states_mut(), Some("c"));
		machine.pan_start(engine.states_mut());
		machine.zoom(0.0, 0.3);
		machine.zoom(1.0, 5.0);
		machine.dispose(engine.states_mut());

		assert_eq!(machine.hovered(), None);
		assert!(!machine.is_panning());
		assert_eq!(machine.deadline(), None);
		assert_eq!(machine.poll(1000.0), Polled::default());
		assert_eq!(engine.states(), &before);
	}
}
