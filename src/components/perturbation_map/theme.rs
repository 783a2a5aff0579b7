//! Colors, property color encoding and visual style.

use super::types::{GraphSnapshot, Property, find_property};

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Alpha channel (0.0-1.0).
	pub a: f64,
}

impl Color {
	/// Opaque color from RGB components.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Same color with alpha `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
		Self {
			r: mix(self.r, other.r),
			g: mix(self.g, other.g),
			b: mix(self.b, other.b),
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	/// WCAG relative luminance of the sRGB color.
	pub fn luminance(self) -> f64 {
		let linear = |c: u8| {
			let v = c as f64 / 255.0;
			if v <= 0.03928 {
				v / 12.92
			} else {
				((v + 0.055) / 1.055).powf(2.4)
			}
		};
		0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
	}

	/// CSS color string for canvas styles.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Opaque black.
pub const BLACK: Color = Color::rgb(0, 0, 0);
/// Opaque white.
pub const WHITE: Color = Color::rgb(255, 255, 255);

/// Background for values that are missing or not finite.
pub const INVALID_COLOR: Color = Color::rgb(0x80, 0x80, 0x80);

/// Red-yellow-green diverging scheme, low to high.
const RD_YL_GN: [Color; 11] = [
	Color::rgb(0xa5, 0x00, 0x26),
	Color::rgb(0xd7, 0x30, 0x27),
	Color::rgb(0xf4, 0x6d, 0x43),
	Color::rgb(0xfd, 0xae, 0x61),
	Color::rgb(0xfe, 0xe0, 0x8b),
	Color::rgb(0xff, 0xff, 0xbf),
	Color::rgb(0xd9, 0xef, 0x8b),
	Color::rgb(0xa6, 0xd9, 0x6a),
	Color::rgb(0x66, 0xbd, 0x63),
	Color::rgb(0x1a, 0x98, 0x50),
	Color::rgb(0x00, 0x68, 0x37),
];

fn interpolate_rd_yl_gn(t: f64) -> Color {
	let t = t.clamp(0.0, 1.0) * (RD_YL_GN.len() - 1) as f64;
	let i = (t.floor() as usize).min(RD_YL_GN.len() - 2);
	RD_YL_GN[i].lerp(RD_YL_GN[i + 1], t - i as f64)
}

/// Background color encoding `value` within `min..=max`.
///
/// The domain is first mapped onto `1..=100`, then onto `0..=1` either
/// linearly or logarithmically (flipped when `inverted`), and sampled from
/// the red-yellow-green scheme. Values outside the domain are clamped.
/// Non-finite values, or a non-finite domain, give [`INVALID_COLOR`].
pub fn color_for(value: f64, min: f64, max: f64, linear: bool, inverted: bool) -> Color {
	if !value.is_finite() || !min.is_finite() || !max.is_finite() {
		return INVALID_COLOR;
	}
	let pre = if max == min {
		50.5
	} else {
		(1.0 + (value - min) / (max - min) * 99.0).clamp(1.0, 100.0)
	};
	let t = if linear {
		(pre - 1.0) / 99.0
	} else {
		pre.ln() / 100f64.ln()
	};
	interpolate_rd_yl_gn(if inverted { 1.0 - t } else { t })
}

/// Black or white text, whichever reads better on `background`.
pub fn text_color_for(background: Color) -> Color {
	if background.luminance() < 0.5 { WHITE } else { BLACK }
}

/// Observed numeric range of a property key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropertyDomain {
	/// Smallest observed value.
	pub min: f64,
	/// Largest observed value.
	pub max: f64,
}

impl PropertyDomain {
	/// Range of `key` across the snapshot's nodes, or edges when `on_edges`.
	/// `None` when no element carries a numeric value for it.
	pub fn of(snapshot: &GraphSnapshot, key: &str, on_edges: bool) -> Option<Self> {
		let lists: Box<dyn Iterator<Item = &[Property]>> = if on_edges {
			Box::new(snapshot.edges.iter().map(|e| e.properties.as_slice()))
		} else {
			Box::new(snapshot.nodes.iter().map(|n| n.properties.as_slice()))
		};
		lists
			.filter_map(|props| find_property(props, key)?.value.as_number())
			.fold(None, |acc: Option<Self>, v| {
				Some(match acc {
					Some(d) => Self {
						min: d.min.min(v),
						max: d.max.max(v),
					},
					None => Self { min: v, max: v },
				})
			})
	}
}

/// Split displayed property keys into pages of at most `page_size` chips.
pub fn chip_pages<T: Clone>(keys: &[T], page_size: usize) -> Vec<Vec<T>> {
	keys.chunks(page_size.max(1)).map(<[T]>::to_vec).collect()
}

/// Colors used by the canvas renderer.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Canvas background.
	pub background: Color,
	/// Compound card fill.
	pub card: Color,
	/// Compound and label card outline.
	pub card_border: Color,
	/// Card header text.
	pub header_text: Color,
	/// Structure box fill at placeholder detail.
	pub placeholder: Color,
	/// Edge stroke.
	pub edge: Color,
	/// Stroke of edges incident to the hovered node.
	pub edge_highlight: Color,
	/// Edge label card fill.
	pub label_background: Color,
	/// Opacity of dimmed nodes.
	pub dimmed_alpha: f64,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: Color::rgb(250, 250, 252),
			card: WHITE,
			card_border: Color::rgb(200, 204, 214),
			header_text: Color::rgb(40, 44, 52),
			placeholder: Color::rgb(232, 234, 240),
			edge: Color::rgb(120, 128, 144),
			edge_highlight: Color::rgb(22, 93, 255),
			label_background: WHITE,
			dimmed_alpha: 0.3,
		}
	}
}
