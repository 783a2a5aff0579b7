//! Canvas rendering for the perturbation map.
//!
//! Draws from the view state only; nothing here mutates it.
//! Passes, back to front:
//! 1. Background (screen space)
//! 2. Edges, then edge label cards at their layout anchors (world space)
//! 3. Compound cards: header, structure area, property chips

use std::collections::BTreeMap;

use web_sys::CanvasRenderingContext2d;

use super::filter::EdgeRenderState;
use super::interaction::DetailLevel;
use super::layout::Point;
use super::scale::{ScaleConfig, ScaledValues};
use super::state::PerturbationMapState;
use super::theme::{Color, PropertyDomain, Theme, chip_pages, color_for, text_color_for};
use super::types::{EdgeId, GraphSnapshot, Property, PropertyValue, find_property};

/// Draws a compound structure into a box. Implementations are external; the
/// box is always reserved even when nothing is drawn.
pub trait StructureRenderer {
	/// Draw `structure` into the box at `(x, y)`. Nothing is drawn when
	/// `visible` is false.
	#[allow(clippy::too_many_arguments)]
	fn draw(
		&self,
		ctx: &CanvasRenderingContext2d,
		structure: &str,
		x: f64,
		y: f64,
		width: f64,
		height: f64,
		visible: bool,
		detail: DetailLevel,
	);
}

/// Draws a plain box, with the structure string in full detail.
#[derive(Clone, Debug, Default)]
pub struct PlaceholderRenderer {
	/// Colors of the box and text.
	pub theme: Theme,
}

impl StructureRenderer for PlaceholderRenderer {
	fn draw(
		&self,
		ctx: &CanvasRenderingContext2d,
		structure: &str,
		x: f64,
		y: f64,
		width: f64,
		height: f64,
		visible: bool,
		detail: DetailLevel,
	) {
		if !visible {
			return;
		}
		ctx.set_fill_style_str(&self.theme.placeholder.to_css());
		ctx.fill_rect(x, y, width, height);
		if detail == DetailLevel::Full && !structure.is_empty() {
			ctx.set_fill_style_str(&self.theme.header_text.to_css());
			let _ = ctx.fill_text_with_max_width(structure, x + 4.0, y + height / 2.0, width - 8.0);
		}
	}
}

/// One colored property chip.
#[derive(Clone, Debug, PartialEq)]
pub struct Chip {
	/// `key: value` label.
	pub text: String,
	/// Encoded value color.
	pub background: Color,
	/// Text color readable on `background`.
	pub foreground: Color,
}

/// Numeric range of every catalog key, for node and edge properties.
#[derive(Clone, Debug, Default)]
pub struct Domains {
	nodes: BTreeMap<String, PropertyDomain>,
	edges: BTreeMap<String, PropertyDomain>,
}

impl Domains {
	/// Domains of every catalog key in `snapshot`.
	pub fn of(snapshot: &GraphSnapshot) -> Self {
		let collect = |keys: &[String], on_edges: bool| -> BTreeMap<String, PropertyDomain> {
			keys.iter()
				.filter_map(|k| Some((k.clone(), PropertyDomain::of(snapshot, k, on_edges)?)))
				.collect()
		};
		Self {
			nodes: collect(&snapshot.node_properties, false),
			edges: collect(&snapshot.edge_properties, true),
		}
	}
}

fn format_value(value: &PropertyValue) -> String {
	match value {
		PropertyValue::Number(n) if n.fract() != 0.0 => format!("{n:.2}"),
		other => other.to_string(),
	}
}

/// Chips for the `keys` a node or edge carries, colored by where each value
/// sits within its domain. Values with no numeric domain are drawn invalid.
pub fn chips<'a>(
	keys: impl IntoIterator<Item = &'a String>,
	properties: &[Property],
	domains: &BTreeMap<String, PropertyDomain>,
) -> Vec<Chip> {
	keys.into_iter()
		.filter_map(|key| {
			let property = find_property(properties, key)?;
			let background = match (property.value.as_number(), domains.get(key)) {
				(Some(v), Some(d)) => color_for(v, d.min, d.max, true, false),
				_ => color_for(f64::NAN, 0.0, 0.0, true, false),
			};
			Some(Chip {
				text: format!("{}: {}", key, format_value(&property.value)),
				background,
				foreground: text_color_for(background),
			})
		})
		.collect()
}

/// Renders the complete view to the canvas.
pub fn render(
	state: &PerturbationMapState,
	ctx: &CanvasRenderingContext2d,
	structures: &dyn StructureRenderer,
) {
	let (width, height) = (state.layout_config.width, state.layout_config.height);
	let theme = &state.theme;
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, width, height);

	let snapshot = state.snapshot();
	if state.layout.positions.is_empty() {
		return;
	}

	let t = state.transform;
	let scale = ScaledValues::new(&state.scale, t.k);
	let domains = Domains::of(snapshot);

	ctx.save();
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);
	ctx.set_font(&scale.font);

	draw_edges(state, ctx, &scale);
	draw_edge_labels(state, ctx, &domains);
	draw_nodes(state, ctx, &domains, structures);

	ctx.restore();
}

fn drawn_edges(state: &PerturbationMapState) -> impl Iterator<Item = (&EdgeId, &EdgeRenderState)> {
	state.engine.states().edges.iter().filter(|(_, s)| s.is_drawn())
}

fn draw_edges(state: &PerturbationMapState, ctx: &CanvasRenderingContext2d, scale: &ScaledValues) {
	let theme = &state.theme;
	// Highlighted edges last so they sit on top.
	for highlighted in [false, true] {
		for (id, edge) in drawn_edges(state).filter(|(_, s)| s.highlighted == highlighted) {
			let (Some(a), Some(b)) = (
				state.layout.position(&id.source),
				state.layout.position(&id.target),
			) else {
				continue;
			};
			let (color, width) = if edge.highlighted {
				(theme.edge_highlight, scale.highlight_width)
			} else {
				(theme.edge.with_alpha(edge.label_opacity), scale.edge_width)
			};
			ctx.set_stroke_style_str(&color.to_css());
			ctx.set_line_width(width);
			ctx.begin_path();
			ctx.move_to(a.x, a.y);
			ctx.line_to(b.x, b.y);
			ctx.stroke();
			draw_arrow_head(ctx, a, b, state.scale.node_size.height / 2.0, width * 4.0);
		}
	}
}

/// Arrow tip on the target card's border.
fn draw_arrow_head(ctx: &CanvasRenderingContext2d, from: Point, to: Point, inset: f64, size: f64) {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist <= inset {
		return;
	}
	let (ux, uy) = (dx / dist, dy / dist);
	let tip = Point::new(to.x - ux * inset, to.y - uy * inset);
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(tip.x - ux * size - uy * size * 0.5, tip.y - uy * size + ux * size * 0.5);
	ctx.line_to(tip.x - ux * size + uy * size * 0.5, tip.y - uy * size - ux * size * 0.5);
	ctx.close_path();
	ctx.stroke();
}

fn draw_edge_labels(
	state: &PerturbationMapState,
	ctx: &CanvasRenderingContext2d,
	domains: &Domains,
) {
	let snapshot = state.snapshot();
	let config = &state.scale;
	for (id, edge_state) in drawn_edges(state) {
		let (Some(anchor), Some(edge)) = (state.layout.label_anchor(id), snapshot.edge(id)) else {
			continue;
		};
		let chips = chips(&snapshot.edge_properties, &edge.properties, &domains.edges);
		let Some(first_page) = chip_pages(&chips, config.chips_per_page).into_iter().next() else {
			continue;
		};
		let size = config.label_size(first_page.len());
		let (x, y) = (anchor.x - size.width / 2.0, anchor.y - size.height / 2.0);

		ctx.set_global_alpha(edge_state.label_opacity);
		ctx.set_fill_style_str(&state.theme.label_background.to_css());
		ctx.fill_rect(x, y, size.width, size.height);
		let pad = config.label_padding;
		draw_chips(ctx, &first_page, x + pad, y + pad, size.width - 2.0 * pad, config);
		ctx.set_global_alpha(1.0);
	}
}

fn draw_chips(
	ctx: &CanvasRenderingContext2d,
	chips: &[Chip],
	x: f64,
	y: f64,
	width: f64,
	config: &ScaleConfig,
) {
	for (row, chip) in chips.iter().enumerate() {
		let top = y + row as f64 * config.chip_height;
		ctx.set_fill_style_str(&chip.background.to_css());
		ctx.fill_rect(x, top + 1.0, width, config.chip_height - 2.0);
		ctx.set_fill_style_str(&chip.foreground.to_css());
		let baseline = top + config.chip_height * 0.7;
		let _ = ctx.fill_text_with_max_width(&chip.text, x + 4.0, baseline, width - 8.0);
	}
}

fn draw_nodes(
	state: &PerturbationMapState,
	ctx: &CanvasRenderingContext2d,
	domains: &Domains,
	structures: &dyn StructureRenderer,
) {
	let snapshot = state.snapshot();
	let config = &state.scale;
	let theme = &state.theme;
	let size = config.node_size;
	let detail = state.detail();

	let header_baseline = config.header_height * 0.7;

	for (id, p) in state.paint_order() {
		let states = state.engine.states();
		let (Some(node_state), Some(node)) = (states.node(id), snapshot.node(id)) else {
			continue;
		};
		let (x, y) = (p.x - size.width / 2.0, p.y - size.height / 2.0);

		ctx.set_global_alpha(if node_state.dimmed { theme.dimmed_alpha } else { 1.0 });
		ctx.set_fill_style_str(&theme.card.to_css());
		ctx.fill_rect(x, y, size.width, size.height);
		ctx.set_stroke_style_str(&theme.card_border.to_css());
		ctx.set_line_width(1.0);
		ctx.stroke_rect(x, y, size.width, size.height);

		ctx.set_fill_style_str(&theme.header_text.to_css());
		let _ = ctx.fill_text_with_max_width(id, x + 6.0, y + header_baseline, size.width - 12.0);

		let pages = chip_pages(
			&chips(&node_state.displayed_properties, &node.properties, &domains.nodes),
			config.chips_per_page,
		);
		let chip_rows = pages.first().map_or(0, Vec::len);
		let chips_height = chip_rows as f64 * config.chip_height;
		let structure_height = size.height - config.header_height - chips_height;
		structures.draw(
			ctx,
			state.store.structure_of(id).unwrap_or_default(),
			x,
			y + config.header_height,
			size.width,
			structure_height.max(0.0),
			node_state.visible,
			detail,
		);

		if let Some(page) = pages.first() {
			draw_chips(ctx, page, x, y + size.height - chips_height, size.width, config);
		}
		if pages.len() > 1 {
			ctx.set_fill_style_str(&theme.header_text.to_css());
			let indicator = format!("1/{}", pages.len());
			let _ = ctx.fill_text(&indicator, x + size.width - 28.0, y + header_baseline);
		}
		ctx.set_global_alpha(1.0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perturbation_map::filter::tests::diamond;
	use crate::components::perturbation_map::theme::INVALID_COLOR;

	#[test]
	fn chips_follow_catalog_order_and_skip_missing_keys() {
		let g = diamond();
		let domains = Domains::of(&g);
		let node = g.node("d").unwrap();
		let chips = chips(&g.node_properties, &node.properties, &domains.nodes);
		assert_eq!(chips.len(), 1);
		assert_eq!(chips[0].text, "logP: 4");
		assert_eq!(chips[0].background, color_for(4.0, 1.0, 4.0, true, false));
		assert_eq!(chips[0].foreground, text_color_for(chips[0].background));
	}

	#[test]
	fn text_values_use_invalid_color() {
		let props = vec![Property {
			key: "creator".into(),
			value: PropertyValue::Text("alice".into()),
			kind: "categorical".into(),
		}];
		let keys = vec!["creator".to_string()];
		let chips = chips(&keys, &props, &BTreeMap::new());
		assert_eq!(chips[0].background, INVALID_COLOR);
		assert_eq!(chips[0].text, "creator: alice");
	}

	#[test]
	fn domains_cover_catalog_keys_with_numbers() {
		let domains = Domains::of(&diamond());
		assert!(domains.nodes.contains_key("logP"));
		assert!(!domains.nodes.contains_key("QED"));
		assert_eq!(
			domains.edges.get("ddG"),
			Some(&PropertyDomain { min: -1.0, max: 2.0 })
		);
	}

	#[test]
	fn fractional_values_are_rounded() {
		assert_eq!(format_value(&PropertyValue::Number(1.23456)), "1.23");
		assert_eq!(format_value(&PropertyValue::Number(3.0)), "3");
	}
}
