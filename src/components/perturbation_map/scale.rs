//! Zoom-dependent sizing and the pan/zoom view transform.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: layout coordinates. Node cards and label cards have a
//!   fixed world size and grow on screen as the user zooms in.
//! - **Screen-space**: canvas pixels. Stroke widths are given in pixels and
//!   divided by the zoom factor before drawing.

use super::layout::{Bounds, Size};

/// Smallest zoom ratio, shared by wheel zoom and viewport fitting.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom ratio.
pub const MAX_ZOOM: f64 = 10.0;

/// How a visual property scales with zoom level `k`.
#[derive(Clone, Copy, Debug)]
pub enum ScaleBehavior {
	/// Constant screen-space size (pixels).
	Screen,
	/// World-space size, clamped to `min_screen..=max_screen` pixels.
	Clamped {
		/// Lower bound in pixels.
		min_screen: f64,
		/// Upper bound in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// World-space value to draw with after the canvas transform is applied.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// Sizes of the rendered cards and strokes.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	/// World size of a compound card.
	pub node_size: Size,
	/// Height of the card header showing the compound id.
	pub header_height: f64,
	/// Height of one property chip row.
	pub chip_height: f64,
	/// Chips shown per page on a card.
	pub chips_per_page: usize,
	/// World width of an edge label card.
	pub label_width: f64,
	/// Inner padding of an edge label card.
	pub label_padding: f64,
	/// Edge stroke width in screen pixels.
	pub edge_width: f64,
	/// Stroke width multiplier for edges incident to the hovered node.
	pub highlight_width: f64,
	/// Base font size in world units.
	pub font_size: f64,
	/// How the font follows zoom.
	pub font_behavior: ScaleBehavior,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node_size: Size::new(200.0, 200.0),
			header_height: 24.0,
			chip_height: 21.0,
			chips_per_page: 3,
			label_width: 160.0,
			label_padding: 6.0,
			edge_width: 1.5,
			highlight_width: 2.5,
			font_size: 12.0,
			font_behavior: ScaleBehavior::Clamped {
				min_screen: 4.0,
				max_screen: 24.0,
			},
		}
	}
}

impl ScaleConfig {
	/// Label card size for an edge showing `chips` properties.
	pub fn label_size(&self, chips: usize) -> Size {
		let rows = chips.clamp(1, self.chips_per_page) as f64;
		Size::new(self.label_width, rows * self.chip_height + 2.0 * self.label_padding)
	}
}

/// Pre-computed values for the current zoom level.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Edge stroke width in world units.
	pub edge_width: f64,
	/// Highlighted edge stroke width in world units.
	pub highlight_width: f64,
	/// Canvas font string.
	pub font: String,
}

impl ScaledValues {
	/// Values for zoom ratio `k`.
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let font_size = config.font_behavior.apply(config.font_size, k);
		Self {
			edge_width: config.edge_width / k,
			highlight_width: config.edge_width * config.highlight_width / k,
			font: format!("{font_size}px sans-serif"),
		}
	}
}

/// Pan and zoom transform: `screen = world * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal translation in pixels.
	pub x: f64,
	/// Vertical translation in pixels.
	pub y: f64,
	/// Zoom ratio (1.0 = 100%), clamped to `MIN_ZOOM..=MAX_ZOOM`.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// World position under screen point `(sx, sy)`.
	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Zoom by `factor` keeping the screen point `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}

	/// Transform showing all of `bounds` inside a `width` x `height` canvas
	/// with `padding` pixels on every side.
	pub fn fit(bounds: &Bounds, width: f64, height: f64, padding: f64) -> Self {
		let avail_w = (width - 2.0 * padding).max(1.0);
		let avail_h = (height - 2.0 * padding).max(1.0);
		let k = if bounds.width() > 0.0 && bounds.height() > 0.0 {
			(avail_w / bounds.width())
				.min(avail_h / bounds.height())
				.clamp(MIN_ZOOM, MAX_ZOOM)
		} else {
			1.0
		};
		let c = bounds.center();
		Self {
			x: width / 2.0 - c.x * k,
			y: height / 2.0 - c.y * k,
			k,
		}
	}
}
