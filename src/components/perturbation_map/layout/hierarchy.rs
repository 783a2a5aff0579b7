//! Layered layout for directed perturbation maps.
//!
//! 1. Ranks by longest path from the sources (Kahn order, ties by id).
//! 2. Barycenter sweeps within ranks, keeping the ordering with the fewest
//!    crossings.
//! 3. Rows top to bottom, each row centered horizontally.
//!
//! No randomness and no iteration count: equal input gives equal output.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::{LayoutConfig, LayoutInput, Point};
use crate::components::perturbation_map::types::EdgeId;

struct Ranked<'a> {
	ids: Vec<&'a str>,
	succ: Vec<Vec<usize>>,
	pred: Vec<Vec<usize>>,
}

impl<'a> Ranked<'a> {
	fn new(input: &'a LayoutInput) -> Self {
		let n = input.nodes.len();
		let mut succ = vec![Vec::new(); n];
		let mut pred = vec![Vec::new(); n];
		for (s, t, _) in input.resolved_edges() {
			if s != t {
				succ[s].push(t);
				pred[t].push(s);
			}
		}
		for list in succ.iter_mut().chain(pred.iter_mut()) {
			list.sort_unstable();
			list.dedup();
		}
		Self {
			ids: input.nodes.iter().map(|n| n.id.as_str()).collect(),
			succ,
			pred,
		}
	}

	fn by_id(&self, a: usize, b: usize) -> Ordering {
		self.ids[a].cmp(self.ids[b])
	}
}

/// Longest-path ranks. Nodes left over by a cycle go one rank below the
/// deepest ranked node.
fn assign_ranks(graph: &Ranked) -> Vec<usize> {
	let n = graph.ids.len();
	let mut in_degree: Vec<usize> = graph.pred.iter().map(Vec::len).collect();
	let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
	queue.sort_by(|&a, &b| graph.by_id(a, b));

	let mut ranks = vec![0usize; n];
	let mut visited = vec![false; n];
	let mut head = 0;
	while head < queue.len() {
		let u = queue[head];
		head += 1;
		visited[u] = true;

		let mut next = graph.succ[u].clone();
		next.sort_by(|&a, &b| graph.by_id(a, b));
		for v in next {
			ranks[v] = ranks[v].max(ranks[u] + 1);
			in_degree[v] -= 1;
			if in_degree[v] == 0 {
				queue.push(v);
			}
		}
	}

	if visited.iter().any(|v| !v) {
		let deepest = ranks
			.iter()
			.zip(&visited)
			.filter(|(_, seen)| **seen)
			.map(|(r, _)| *r)
			.max()
			.map_or(0, |r| r + 1);
		for (rank, seen) in ranks.iter_mut().zip(&visited) {
			if !seen {
				*rank = deepest;
			}
		}
	}
	ranks
}

fn rank_buckets(graph: &Ranked, ranks: &[usize]) -> Vec<Vec<usize>> {
	let depth = ranks.iter().copied().max().map_or(0, |r| r + 1);
	let mut buckets = vec![Vec::new(); depth];
	for (v, &r) in ranks.iter().enumerate() {
		buckets[r].push(v);
	}
	for bucket in &mut buckets {
		bucket.sort_by(|&a, &b| graph.by_id(a, b));
	}
	buckets
}

fn barycenter(order: &[usize], neighbors: &[usize]) -> Option<f64> {
	let positions: Vec<usize> = neighbors
		.iter()
		.filter_map(|nb| order.iter().position(|v| v == nb))
		.collect();
	if positions.is_empty() {
		return None;
	}
	Some(positions.iter().sum::<usize>() as f64 / positions.len() as f64)
}

/// Reorder `rows[r]` by barycenter against `rows[reference]`. Nodes without
/// neighbors in the reference row keep their current slot value.
fn sweep(rows: &mut [Vec<usize>], graph: &Ranked, r: usize, reference: usize, downward: bool) {
	let fixed = rows[reference].clone();
	let mut scored: Vec<(usize, f64)> = rows[r]
		.iter()
		.enumerate()
		.map(|(slot, &v)| {
			let neighbors = if downward { &graph.pred[v] } else { &graph.succ[v] };
			(v, barycenter(&fixed, neighbors).unwrap_or(slot as f64))
		})
		.collect();
	scored.sort_by(|a, b| {
		a.1.partial_cmp(&b.1)
			.unwrap_or(Ordering::Equal)
			.then_with(|| graph.by_id(a.0, b.0))
	});
	rows[r] = scored.into_iter().map(|(v, _)| v).collect();
}

fn crossings_between(upper: &[usize], lower: &[usize], graph: &Ranked) -> usize {
	let pairs: Vec<(usize, usize)> = upper
		.iter()
		.enumerate()
		.flat_map(|(i, &u)| {
			graph.succ[u]
				.iter()
				.filter_map(|v| lower.iter().position(|w| w == v))
				.map(move |j| (i, j))
		})
		.collect();

	let mut count = 0;
	for (k, &(a1, b1)) in pairs.iter().enumerate() {
		for &(a2, b2) in &pairs[k + 1..] {
			if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
				count += 1;
			}
		}
	}
	count
}

fn total_crossings(rows: &[Vec<usize>], graph: &Ranked) -> usize {
	rows.windows(2)
		.map(|w| crossings_between(&w[0], &w[1], graph))
		.sum()
}

/// Alternate down and up sweeps, stopping at the first round that does not
/// improve on the best ordering seen.
fn reduce_crossings(rows: &mut Vec<Vec<usize>>, graph: &Ranked, max_sweeps: usize) {
	if rows.len() < 2 {
		return;
	}
	let mut best = total_crossings(rows, graph);
	let mut best_rows = rows.clone();
	for _ in 0..max_sweeps {
		if best == 0 {
			break;
		}
		for r in 1..rows.len() {
			sweep(rows, graph, r, r - 1, true);
		}
		for r in (0..rows.len() - 1).rev() {
			sweep(rows, graph, r, r + 1, false);
		}
		let crossings = total_crossings(rows, graph);
		if crossings < best {
			best = crossings;
			best_rows = rows.clone();
		} else {
			break;
		}
	}
	*rows = best_rows;
}

pub(super) fn arrange(
	input: &LayoutInput,
	config: &LayoutConfig,
) -> (Vec<Point>, Vec<(EdgeId, Point)>) {
	let graph = Ranked::new(input);
	let ranks = assign_ranks(&graph);
	let mut rows = rank_buckets(&graph, &ranks);
	reduce_crossings(&mut rows, &graph, config.max_sweeps);

	let mut centers = vec![Point::default(); input.nodes.len()];
	let mut y = 0.0;
	for row in &rows {
		let row_height = row
			.iter()
			.map(|&v| input.nodes[v].size.height)
			.fold(0.0, f64::max);
		let row_width: f64 = row.iter().map(|&v| input.nodes[v].size.width).sum::<f64>()
			+ config.node_gap * row.len().saturating_sub(1) as f64;

		let mut x = -row_width / 2.0;
		for &v in row {
			let w = input.nodes[v].size.width;
			centers[v] = Point::new(x + w / 2.0, y + row_height / 2.0);
			x += w + config.node_gap;
		}
		y += row_height + config.rank_gap;
	}

	let mut seen = HashSet::new();
	let anchors = input
		.resolved_edges()
		.into_iter()
		.filter(|(_, _, e)| seen.insert(e.id.clone()))
		.map(|(s, t, e)| {
			let (a, b) = (centers[s], centers[t]);
			(e.id.clone(), Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
		})
		.collect();
	(centers, anchors)
}

#[cfg(test)]
mod tests {
	use super::super::tests::diamond_input;
	use super::super::{LayoutAlgorithm, LayoutConfig, LayoutEdge, LayoutNode, Size, compute_layout};
	use super::*;

	fn hierarchical() -> LayoutConfig {
		LayoutConfig {
			algorithm: LayoutAlgorithm::Hierarchical,
			..Default::default()
		}
	}

	fn input(nodes: &[&str], edges: &[(&str, &str)]) -> LayoutInput {
		LayoutInput {
			nodes: nodes
				.iter()
				.map(|id| LayoutNode {
					id: (*id).into(),
					size: Size::new(100.0, 50.0),
				})
				.collect(),
			edges: edges
				.iter()
				.map(|(s, t)| LayoutEdge {
					id: EdgeId::new(*s, *t),
					label_size: Size::new(80.0, 30.0),
				})
				.collect(),
		}
	}

	#[test]
	fn ranks_follow_longest_path() {
		let input = input(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("a", "c"), ("d", "d")]);
		let graph = Ranked::new(&input);
		assert_eq!(assign_ranks(&graph), vec![0, 1, 2, 0]);
	}

	#[test]
	fn cycles_are_ranked_below() {
		let input = input(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
		let graph = Ranked::new(&input);
		assert_eq!(assign_ranks(&graph), vec![0, 1, 1]);
	}

	#[test]
	fn diamond_rows() {
		let layout = compute_layout(&diamond_input(), &hierarchical());
		let y = |id: &str| layout.position(id).unwrap().y;
		assert!(y("a") < y("b"));
		assert_eq!(y("b"), y("c"));
		assert!(y("c") < y("d"));
		let center = layout.bounds.unwrap().center();
		assert!((center.x - 400.0).abs() < 1e-9);
		assert!((center.y - 300.0).abs() < 1e-9);
	}

	#[test]
	fn barycenter_removes_crossing() {
		// a -> d and b -> c start out crossed when rows are ordered by id.
		let input = input(&["a", "b", "c", "d"], &[("a", "d"), ("b", "c")]);
		let graph = Ranked::new(&input);
		let mut rows = rank_buckets(&graph, &assign_ranks(&graph));
		assert_eq!(total_crossings(&rows, &graph), 1);
		reduce_crossings(&mut rows, &graph, 8);
		assert_eq!(total_crossings(&rows, &graph), 0);
	}

	#[test]
	fn is_deterministic() {
		let config = hierarchical();
		let a = compute_layout(&diamond_input(), &config);
		let b = compute_layout(&diamond_input(), &config);
		assert_eq!(a, b);
	}

	#[test]
	fn isolated_node_sits_on_rank_zero() {
		let input = input(&["a", "b", "lonely"], &[("a", "b")]);
		let layout = compute_layout(&input, &hierarchical());
		assert_eq!(layout.position("lonely").unwrap().y, layout.position("a").unwrap().y);
	}
}
