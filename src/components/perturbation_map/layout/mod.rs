//! Layout of the active subgraph.
//!
//! Two interchangeable algorithms produce final, non-animated positions:
//! - [`LayoutAlgorithm::Force`]: a fixed-step force simulation that also
//!   places one synthetic label point per edge.
//! - [`LayoutAlgorithm::Hierarchical`]: longest-path ranking with barycenter
//!   crossing reduction. Fully deterministic.
//!
//! Positions are node centers in world units. The result is centered on the
//! configured canvas.

mod force;
mod hierarchy;

use std::collections::BTreeMap;

use log::debug;

use super::types::{EdgeId, NodeId};

/// Which layout to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutAlgorithm {
	/// Undirected, exploratory views.
	#[default]
	Force,
	/// Edges read as directed `source -> target`.
	Hierarchical,
}

/// Tuning for both layout algorithms.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
	/// Algorithm to run.
	pub algorithm: LayoutAlgorithm,
	/// Canvas size; the layout is centered on `(width / 2, height / 2)`.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Rest length between the two real endpoints of an edge.
	pub link_distance: f64,
	/// Rest length of the endpoint-to-label links, relative to `link_distance`.
	pub label_link_ratio: f64,
	/// Pairwise repulsion between simulation points.
	pub charge_strength: f64,
	/// Fraction of the centroid offset removed each step.
	pub center_strength: f64,
	/// Extra collision radius around real nodes.
	pub node_margin: f64,
	/// Extra collision radius around label points. Smaller than `node_margin`.
	pub label_margin: f64,
	/// Number of simulation steps.
	pub steps: usize,
	/// Per-step cooling: `alpha *= 1 - alpha_decay`.
	pub alpha_decay: f64,
	/// Seed of the initial placement jitter.
	pub seed: u64,
	/// Padding used when fitting the viewport to the result.
	pub fit_padding: f64,
	/// Vertical gap between hierarchical ranks.
	pub rank_gap: f64,
	/// Horizontal gap between nodes sharing a rank.
	pub node_gap: f64,
	/// Upper bound on barycenter sweep rounds.
	pub max_sweeps: usize,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			algorithm: LayoutAlgorithm::Force,
			width: 800.0,
			height: 600.0,
			link_distance: 200.0,
			label_link_ratio: 0.5,
			charge_strength: 400.0,
			center_strength: 1.0,
			node_margin: 60.0,
			label_margin: 30.0,
			steps: 200,
			alpha_decay: 0.02,
			seed: 0x5EED,
			fit_padding: 20.0,
			rank_gap: 80.0,
			node_gap: 40.0,
			max_sweeps: 8,
		}
	}
}

impl LayoutConfig {
	/// Canvas center.
	pub fn center(&self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}
}

/// A position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// Creates a point.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Rendered size of a node card or an edge label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
	/// Width in world units.
	pub width: f64,
	/// Height in world units.
	pub height: f64,
}

impl Size {
	/// Creates a size.
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	/// Radius of the circle enclosing a box of this size.
	pub fn half_diagonal(&self) -> f64 {
		(self.width * self.width + self.height * self.height).sqrt() / 2.0
	}
}

/// A node to position, with the size of its card.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	/// Node id.
	pub id: NodeId,
	/// Card size, used for collision and bounds.
	pub size: Size,
}

/// An edge to lay out, with the size of its label card.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutEdge {
	/// Edge id.
	pub id: EdgeId,
	/// Label card size, used for label point collision.
	pub label_size: Size,
}

/// The node/edge subset to position. Edges whose endpoints are not in
/// `nodes` are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutInput {
	/// Nodes, in a stable order.
	pub nodes: Vec<LayoutNode>,
	/// Edges between them.
	pub edges: Vec<LayoutEdge>,
}

impl LayoutInput {
	fn index(&self) -> BTreeMap<&str, usize> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect()
	}

	/// Edges resolved to node indices, dropping dangling ones.
	fn resolved_edges(&self) -> Vec<(usize, usize, &LayoutEdge)> {
		let index = self.index();
		self.edges
			.iter()
			.filter_map(|e| {
				let s = *index.get(e.id.source.as_str())?;
				let t = *index.get(e.id.target.as_str())?;
				Some((s, t, e))
			})
			.collect()
	}
}

/// Axis-aligned bounding box in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	/// Left edge.
	pub min_x: f64,
	/// Top edge.
	pub min_y: f64,
	/// Right edge.
	pub max_x: f64,
	/// Bottom edge.
	pub max_y: f64,
}

impl Bounds {
	/// Horizontal extent.
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	/// Vertical extent.
	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	/// Center of the box.
	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}

	fn around(center: Point, size: Size) -> Self {
		Self {
			min_x: center.x - size.width / 2.0,
			min_y: center.y - size.height / 2.0,
			max_x: center.x + size.width / 2.0,
			max_y: center.y + size.height / 2.0,
		}
	}

	fn union(self, other: Self) -> Self {
		Self {
			min_x: self.min_x.min(other.min_x),
			min_y: self.min_y.min(other.min_y),
			max_x: self.max_x.max(other.max_x),
			max_y: self.max_y.max(other.max_y),
		}
	}
}

/// Final positions. Only real nodes are position sources; label anchors
/// tell the renderer where each edge label goes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	/// Center of each node card.
	pub positions: BTreeMap<NodeId, Point>,
	/// Simulated label points, force layout only.
	pub label_anchors: BTreeMap<EdgeId, Point>,
	/// Bounding box of the real nodes, `None` when empty.
	pub bounds: Option<Bounds>,
}

impl Layout {
	/// Center of node `id`.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.positions.get(id).copied()
	}

	/// Anchor for an edge label: its simulated point, or the edge midpoint.
	pub fn label_anchor(&self, id: &EdgeId) -> Option<Point> {
		if let Some(p) = self.label_anchors.get(id) {
			return Some(*p);
		}
		let (a, b) = (self.position(&id.source)?, self.position(&id.target)?);
		Some(Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
	}
}

/// Position `input` with the configured algorithm.
pub fn compute_layout(input: &LayoutInput, config: &LayoutConfig) -> Layout {
	if input.nodes.is_empty() {
		return Layout::default();
	}

	let (centers, anchors) = match config.algorithm {
		LayoutAlgorithm::Force => force::simulate(input, config),
		LayoutAlgorithm::Hierarchical => hierarchy::arrange(input, config),
	};
	match config.algorithm {
		LayoutAlgorithm::Force => debug!(
			"perturbation-map: force layout of {} nodes, {} edges in {} steps",
			input.nodes.len(),
			input.edges.len(),
			config.steps
		),
		LayoutAlgorithm::Hierarchical => debug!(
			"perturbation-map: hierarchical layout of {} nodes, {} edges",
			input.nodes.len(),
			input.edges.len()
		),
	}

	finish(input, centers, anchors, config.center())
}

/// Translate so the real nodes' bounding box is centered on `target`.
fn finish(
	input: &LayoutInput,
	centers: Vec<Point>,
	anchors: Vec<(EdgeId, Point)>,
	target: Point,
) -> Layout {
	let bounds = input
		.nodes
		.iter()
		.zip(&centers)
		.map(|(n, c)| Bounds::around(*c, n.size))
		.reduce(Bounds::union);
	let Some(bounds) = bounds else {
		return Layout::default();
	};

	let center = bounds.center();
	let (dx, dy) = (target.x - center.x, target.y - center.y);
	let shift = |p: Point| Point::new(p.x + dx, p.y + dy);

	Layout {
		positions: input
			.nodes
			.iter()
			.zip(centers)
			.map(|(n, c)| (n.id.clone(), shift(c)))
			.collect(),
		label_anchors: anchors.into_iter().map(|(id, p)| (id, shift(p))).collect(),
		bounds: Some(Bounds {
			min_x: bounds.min_x + dx,
			min_y: bounds.min_y + dy,
			max_x: bounds.max_x + dx,
			max_y: bounds.max_y + dy,
		}),
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) fn diamond_input() -> LayoutInput {
		let node = |id: &str| LayoutNode {
			id: id.into(),
			size: Size::new(200.0, 200.0),
		};
		let edge = |s: &str, t: &str| LayoutEdge {
			id: EdgeId::new(s, t),
			label_size: Size::new(160.0, 60.0),
		};
		LayoutInput {
			nodes: vec![node("a"), node("b"), node("c"), node("d")],
			edges: vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
		}
	}

	#[test]
	fn empty_input_gives_empty_layout() {
		for algorithm in [LayoutAlgorithm::Force, LayoutAlgorithm::Hierarchical] {
			let config = LayoutConfig {
				algorithm,
				..Default::default()
			};
			let layout = compute_layout(&LayoutInput::default(), &config);
			assert!(layout.positions.is_empty());
			assert!(layout.bounds.is_none());
		}
	}

	#[test]
	fn single_node_is_centered() {
		let input = LayoutInput {
			nodes: vec![LayoutNode {
				id: "solo".into(),
				size: Size::new(100.0, 60.0),
			}],
			edges: vec![],
		};
		for algorithm in [LayoutAlgorithm::Force, LayoutAlgorithm::Hierarchical] {
			let config = LayoutConfig {
				algorithm,
				..Default::default()
			};
			let p = compute_layout(&input, &config).position("solo").unwrap();
			assert!((p.x - 400.0).abs() < 1e-9);
			assert!((p.y - 300.0).abs() < 1e-9);
		}
	}

	#[test]
	fn dangling_edges_are_ignored() {
		let mut input = diamond_input();
		input.nodes.truncate(2);
		let layout = compute_layout(&input, &LayoutConfig::default());
		assert_eq!(layout.positions.len(), 2);
		assert_eq!(layout.label_anchors.len(), 1);
	}

	#[test]
	fn label_anchor_falls_back_to_midpoint() {
		let mut layout = Layout::default();
		layout.positions.insert("a".into(), Point::new(0.0, 0.0));
		layout.positions.insert("b".into(), Point::new(10.0, 20.0));
		assert_eq!(
			layout.label_anchor(&EdgeId::new("a", "b")),
			Some(Point::new(5.0, 10.0))
		);
		assert_eq!(layout.label_anchor(&EdgeId::new("a", "z")), None);
	}

	#[test]
	fn half_diagonal() {
		assert!((Size::new(6.0, 8.0).half_diagonal() - 5.0).abs() < 1e-12);
	}

	struct Captured;

	static RECORDS: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());
	static LOGGER: Captured = Captured;

	impl log::Log for Captured {
		fn enabled(&self, _: &log::Metadata<'_>) -> bool {
			true
		}

		fn log(&self, record: &log::Record<'_>) {
			RECORDS.lock().unwrap().push(record.args().to_string());
		}

		fn flush(&self) {}
	}

	#[test]
	fn force_layout_logs_its_step_count() {
		let _ = log::set_logger(&LOGGER);
		log::set_max_level(log::LevelFilter::Debug);

		let config = LayoutConfig {
			steps: 37,
			..Default::default()
		};
		compute_layout(&diamond_input(), &config);
		let records = RECORDS.lock().unwrap();
		assert!(
			records
				.iter()
				.any(|r| r == "perturbation-map: force layout of 4 nodes, 4 edges in 37 steps")
		);
	}
}
