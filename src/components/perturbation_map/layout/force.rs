//! Fixed-step force-directed layout with edge label points.
//!
//! Every edge `u -> v` contributes a synthetic label point `L` and three
//! links: `u-L` and `L-v` at the short label distance, and `u-v` at the full
//! link distance. Repulsion and link springs come from the `force_graph`
//! simulation; rest-length relaxation, collision and centering are applied
//! on top of each step. The step size cools by `alpha_decay` per step and the
//! loop always stops after `steps` iterations.

use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{LayoutConfig, LayoutInput, Point};
use crate::components::perturbation_map::types::EdgeId;

const MASS: f32 = 10.0;
const SPRING: f32 = 0.01;
const FORCE_MAX: f32 = 50.0;
const NODE_SPEED: f32 = 1.0;
const DAMPING: f32 = 0.6;
const LINK_STRENGTH: f64 = 0.5;
const COLLIDE_STRENGTH: f64 = 0.7;

/// Per-point payload stored in the simulation.
#[derive(Clone, Copy, Debug, Default)]
struct Body {
	index: usize,
}

#[derive(Clone, Copy, Debug)]
struct Link {
	a: usize,
	b: usize,
	rest: f64,
}

pub(super) fn simulate(
	input: &LayoutInput,
	config: &LayoutConfig,
) -> (Vec<Point>, Vec<(EdgeId, Point)>) {
	let edges = input.resolved_edges();
	let node_count = input.nodes.len();
	let center = config.center();
	let mut rng = StdRng::seed_from_u64(config.seed);

	let mut points: Vec<Point> = Vec::with_capacity(node_count + edges.len());
	let mut radii: Vec<f64> = Vec::with_capacity(node_count + edges.len());

	// Phyllotaxis spiral around the canvas center, lightly jittered.
	let spacing = config.link_distance / 4.0;
	let golden = PI * (3.0 - 5f64.sqrt());
	for (i, node) in input.nodes.iter().enumerate() {
		let r = spacing * (0.5 + i as f64).sqrt();
		let angle = i as f64 * golden;
		points.push(Point::new(
			center.x + r * angle.cos() + rng.gen_range(-1.0..1.0),
			center.y + r * angle.sin() + rng.gen_range(-1.0..1.0),
		));
		radii.push(node.size.half_diagonal() + config.node_margin);
	}

	let short = config.link_distance * config.label_link_ratio;
	let mut links = Vec::with_capacity(edges.len() * 3);
	for (k, &(s, t, edge)) in edges.iter().enumerate() {
		let label = node_count + k;
		let (ps, pt) = (points[s], points[t]);
		points.push(Point::new(
			(ps.x + pt.x) / 2.0 + rng.gen_range(-1.0..1.0),
			(ps.y + pt.y) / 2.0 + rng.gen_range(-1.0..1.0),
		));
		radii.push(edge.label_size.half_diagonal() + config.label_margin);
		links.push(Link { a: s, b: label, rest: short });
		links.push(Link { a: label, b: t, rest: short });
		links.push(Link {
			a: s,
			b: t,
			rest: config.link_distance,
		});
	}

	let mut graph: ForceGraph<Body, ()> = ForceGraph::new(SimulationParameters {
		force_charge: config.charge_strength as f32,
		force_spring: SPRING,
		force_max: FORCE_MAX,
		node_speed: NODE_SPEED,
		damping_factor: DAMPING,
	});
	let handles: Vec<_> = points
		.iter()
		.enumerate()
		.map(|(index, p)| {
			graph.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: MASS,
				is_anchor: false,
				user_data: Body { index },
			})
		})
		.collect();
	for link in &links {
		graph.add_edge(handles[link.a], handles[link.b], EdgeData::default());
	}

	let mut alpha = 1.0;
	for _ in 0..config.steps {
		graph.update(alpha as f32);
		graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			if x.is_finite() && y.is_finite() {
				points[node.data.user_data.index] = Point::new(x, y);
			}
		});

		relax_links(&mut points, &links, alpha, &mut rng);
		collide(&mut points, &radii, &mut rng);
		recenter(&mut points, center, config.center_strength);

		graph.visit_nodes_mut(|node| {
			let p = points[node.data.user_data.index];
			node.data.x = p.x as f32;
			node.data.y = p.y as f32;
		});
		alpha *= 1.0 - config.alpha_decay;
	}

	let anchors = edges
		.iter()
		.enumerate()
		.map(|(k, (_, _, edge))| (edge.id.clone(), points[node_count + k]))
		.collect();
	points.truncate(node_count);
	(points, anchors)
}

/// Nudge each link towards its rest length, scaled by the current alpha.
fn relax_links(points: &mut [Point], links: &[Link], alpha: f64, rng: &mut StdRng) {
	for link in links {
		let (a, b) = (points[link.a], points[link.b]);
		let (mut dx, mut dy) = (b.x - a.x, b.y - a.y);
		if dx * dx + dy * dy < 1e-12 {
			dx = jiggle(rng);
			dy = jiggle(rng);
		}
		let dist = (dx * dx + dy * dy).sqrt();
		let k = (dist - link.rest) / dist * alpha * LINK_STRENGTH * 0.5;
		points[link.a].x += dx * k;
		points[link.a].y += dy * k;
		points[link.b].x -= dx * k;
		points[link.b].y -= dy * k;
	}
}

/// Separate every pair of points closer than the sum of their radii.
fn collide(points: &mut [Point], radii: &[f64], rng: &mut StdRng) {
	for i in 0..points.len() {
		for j in (i + 1)..points.len() {
			let min_dist = radii[i] + radii[j];
			let (mut dx, mut dy) = (points[j].x - points[i].x, points[j].y - points[i].y);
			let d2 = dx * dx + dy * dy;
			if d2 >= min_dist * min_dist {
				continue;
			}
			if d2 < 1e-12 {
				dx = jiggle(rng);
				dy = jiggle(rng);
			}
			let dist = (dx * dx + dy * dy).sqrt();
			let k = (min_dist - dist) / dist * COLLIDE_STRENGTH * 0.5;
			points[i].x -= dx * k;
			points[i].y -= dy * k;
			points[j].x += dx * k;
			points[j].y += dy * k;
		}
	}
}

/// Shift all points so their mean moves towards `center`.
fn recenter(points: &mut [Point], center: Point, strength: f64) {
	if points.is_empty() {
		return;
	}
	let n = points.len() as f64;
	let (sx, sy) = points
		.iter()
		.fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
	let (dx, dy) = ((center.x - sx / n) * strength, (center.y - sy / n) * strength);
	for p in points.iter_mut() {
		p.x += dx;
		p.y += dy;
	}
}

fn jiggle(rng: &mut StdRng) -> f64 {
	(rng.gen_range(0.0..1.0) - 0.5) * 1e-6
}

#[cfg(test)]
mod tests {
	use super::super::tests::diamond_input;
	use super::super::{LayoutConfig, compute_layout};
	use super::*;

	/// For each ordered pair, whether the first node is left of / above the second.
	fn relative_order(layout: &super::super::Layout) -> Vec<(bool, bool)> {
		let ps: Vec<Point> = layout.positions.values().copied().collect();
		let mut order = Vec::new();
		for a in &ps {
			for b in &ps {
				order.push((a.x < b.x, a.y < b.y));
			}
		}
		order
	}

	#[test]
	fn fixed_seed_is_reproducible() {
		let config = LayoutConfig::default();
		let first = compute_layout(&diamond_input(), &config);
		let second = compute_layout(&diamond_input(), &config);
		assert_eq!(relative_order(&first), relative_order(&second));
		assert_eq!(first.positions, second.positions);
	}

	#[test]
	fn real_nodes_do_not_overlap() {
		let layout = compute_layout(&diamond_input(), &LayoutConfig::default());
		let ps: Vec<Point> = layout.positions.values().copied().collect();
		for (i, a) in ps.iter().enumerate() {
			for b in &ps[i + 1..] {
				let (dx, dy) = ((a.x - b.x).abs(), (a.y - b.y).abs());
				assert!(dx.max(dy) >= 200.0, "overlap between {a:?} and {b:?}");
			}
		}
	}

	#[test]
	fn one_label_anchor_per_edge() {
		let layout = compute_layout(&diamond_input(), &LayoutConfig::default());
		assert_eq!(layout.label_anchors.len(), 4);
		assert!(
			layout
				.label_anchors
				.values()
				.all(|p| p.x.is_finite() && p.y.is_finite())
		);
	}

	#[test]
	fn isolated_nodes_are_placed() {
		let mut input = diamond_input();
		input.edges.clear();
		let layout = compute_layout(&input, &LayoutConfig::default());
		assert_eq!(layout.positions.len(), 4);
		let bounds = layout.bounds.unwrap();
		assert!((bounds.center().x - 400.0).abs() < 1e-6);
		assert!((bounds.center().y - 300.0).abs() < 1e-6);
	}

	#[test]
	fn collide_separates_coincident_points() {
		let mut rng = StdRng::seed_from_u64(1);
		let mut points = vec![Point::new(0.0, 0.0), Point::new(0.0, 0.0)];
		for _ in 0..50 {
			collide(&mut points, &[10.0, 10.0], &mut rng);
		}
		let d = ((points[0].x - points[1].x).powi(2) + (points[0].y - points[1].y).powi(2)).sqrt();
		assert!(d > 19.0);
	}

	#[test]
	fn recenter_moves_mean_to_center() {
		let mut points = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
		recenter(&mut points, Point::new(100.0, 50.0), 1.0);
		assert_eq!(points, vec![Point::new(95.0, 50.0), Point::new(105.0, 50.0)]);
	}
}
