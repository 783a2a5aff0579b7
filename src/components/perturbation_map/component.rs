//! Leptos component wrapping the perturbation map canvas.
//!
//! Native pointer and wheel events are forwarded to [`PerturbationMapState`].
//! Nothing animates: a frame is requested only when state changes, and one
//! timeout is kept armed for the earliest debounced or throttled deadline.
//! Unmounting disposes the view synchronously, removing listeners and
//! cancelling the pending frame and timeout.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::interaction::InteractionConfig;
use super::layout::{LayoutAlgorithm, LayoutConfig};
use super::render::{self, PlaceholderRenderer};
use super::selection::Selection;
use super::state::PerturbationMapState;
use super::store::GraphStore;

/// A mounted view: engine state plus the canvas it draws on.
struct MapContext {
	state: PerturbationMapState,
	ctx: CanvasRenderingContext2d,
	structures: PlaceholderRenderer,
}

/// Browser-side resources of one mounted view.
#[derive(Default)]
struct Host {
	map: Option<MapContext>,
	frame: Option<i32>,
	timer: Option<i32>,
	render_cb: Option<Closure<dyn FnMut()>>,
	timer_cb: Option<Closure<dyn FnMut()>>,
	resize_cb: Option<Closure<dyn FnMut()>>,
}

type SharedHost = Rc<RefCell<Host>>;

thread_local! {
	// Cleanup callbacks must be `Send`, so they refer to hosts by id.
	static HOSTS: RefCell<HashMap<u32, SharedHost>> = RefCell::new(HashMap::new());
	static NEXT_HOST: Cell<u32> = const { Cell::new(0) };
}

fn register_host() -> (u32, SharedHost) {
	let id = NEXT_HOST.with(|n| {
		let id = n.get();
		n.set(id.wrapping_add(1));
		id
	});
	let host = SharedHost::default();
	HOSTS.with(|hosts| hosts.borrow_mut().insert(id, host.clone()));
	(id, host)
}

/// Return every interaction to idle and release browser resources.
fn dispose_host(id: u32) {
	let Some(host) = HOSTS.with(|hosts| hosts.borrow_mut().remove(&id)) else {
		return;
	};
	let mut host = host.borrow_mut();
	if let Some(map) = host.map.as_mut() {
		map.state.dispose();
	}
	if let Some(window) = web_sys::window() {
		if let Some(frame) = host.frame.take() {
			let _ = window.cancel_animation_frame(frame);
		}
		if let Some(timer) = host.timer.take() {
			window.clear_timeout_with_handle(timer);
		}
		if let Some(cb) = host.resize_cb.as_ref() {
			let cb = cb.as_ref().unchecked_ref();
			let _ = window.remove_event_listener_with_callback("resize", cb);
		}
	}
	*host = Host::default();
	debug!("perturbation-map: host {id} released");
}

fn now() -> f64 {
	js_sys::Date::now()
}

fn request_render(host: &SharedHost) {
	let mut guard = host.borrow_mut();
	let h = &mut *guard;
	if h.frame.is_some() {
		return;
	}
	let (Some(window), Some(cb)) = (web_sys::window(), h.render_cb.as_ref()) else {
		return;
	};
	if let Ok(frame) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
		h.frame = Some(frame);
	}
}

/// Keep one timeout armed for the state's earliest pending deadline.
fn arm_timer(host: &SharedHost) {
	let mut guard = host.borrow_mut();
	let h = &mut *guard;
	let Some(window) = web_sys::window() else {
		return;
	};
	if let Some(timer) = h.timer.take() {
		window.clear_timeout_with_handle(timer);
	}
	let (Some(deadline), Some(cb)) = (
		h.map.as_ref().and_then(|m| m.state.deadline()),
		h.timer_cb.as_ref(),
	) else {
		return;
	};
	let delay = (deadline - now()).max(0.0).ceil() as i32;
	let cb = cb.as_ref().unchecked_ref();
	if let Ok(timer) = window.set_timeout_with_callback_and_timeout_and_arguments_0(cb, delay) {
		h.timer = Some(timer);
	}
}

/// Run `f` against the mounted state, then redraw and re-arm as needed.
fn update(host: &SharedHost, f: impl FnOnce(&mut PerturbationMapState) -> bool) {
	let redraw = host
		.borrow_mut()
		.map
		.as_mut()
		.is_some_and(|m| f(&mut m.state));
	if redraw {
		request_render(host);
	}
	arm_timer(host);
}

fn install_callbacks(host: &SharedHost) {
	let weak: Weak<RefCell<Host>> = Rc::downgrade(host);
	let render_weak = weak.clone();
	let render_cb: Closure<dyn FnMut()> = Closure::new(move || {
		let Some(host) = render_weak.upgrade() else {
			return;
		};
		let mut h = host.borrow_mut();
		h.frame = None;
		if let Some(m) = h.map.as_ref() {
			render::render(&m.state, &m.ctx, &m.structures);
		}
	});
	let timer_cb: Closure<dyn FnMut()> = Closure::new(move || {
		let Some(host) = weak.upgrade() else {
			return;
		};
		host.borrow_mut().timer = None;
		update(&host, |state| state.poll(now()));
	});
	let mut h = host.borrow_mut();
	h.render_cb = Some(render_cb);
	h.timer_cb = Some(timer_cb);
}

fn install_resize(host: &SharedHost, window: &Window, canvas: HtmlCanvasElement) {
	let weak = Rc::downgrade(host);
	let resize_cb: Closure<dyn FnMut()> = Closure::new(move || {
		let (Some(host), Some(win)) = (weak.upgrade(), web_sys::window()) else {
			return;
		};
		let (w, h) = window_size(&win);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		update(&host, |state| {
			state.resize(w, h);
			true
		});
	});
	let _ = window.add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref());
	host.borrow_mut().resize_cb = Some(resize_cb);
}

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

fn local_position(canvas: &NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders the perturbation map on a canvas element.
///
/// `store` and `selection` are reactive: new data replaces the view's graph,
/// and selection changes are debounced before the active subgraph is laid
/// out again. The component sizes itself to its parent container unless
/// `fullscreen` is set or an explicit `width`/`height` is given.
#[component]
pub fn PerturbationMapCanvas(
	/// Graph data; replacing it resets the view.
	#[prop(into)]
	store: Signal<GraphStore>,
	/// Active selection, debounced before it applies.
	#[prop(into)]
	selection: Signal<Selection>,
	/// Layout algorithm.
	#[prop(into, default = Signal::stored(LayoutAlgorithm::Force))]
	algorithm: Signal<LayoutAlgorithm>,
	/// Fill the window and follow its size.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed canvas width.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed canvas height.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let (host_id, host) = register_host();
	on_cleanup(move || dispose_host(host_id));

	let host_init = host.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if host_init.borrow().map.is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("perturbation-map: no window, canvas not mounted");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			let (pw, ph): (f64, f64) = canvas
				.parent_element()
				.map_or((800.0, 600.0), |p| (p.client_width().into(), p.client_height().into()));
			(width.unwrap_or(pw), height.unwrap_or(ph))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx.dyn_into::<CanvasRenderingContext2d>(),
			_ => {
				warn!("perturbation-map: canvas has no 2d context");
				return;
			}
		};
		let Ok(ctx) = ctx else {
			warn!("perturbation-map: 2d context has an unexpected type");
			return;
		};

		let layout_config = LayoutConfig {
			algorithm: algorithm.get_untracked(),
			width: w,
			height: h,
			..Default::default()
		};
		let state = PerturbationMapState::with_selection(
			store.get_untracked(),
			selection.get_untracked(),
			layout_config,
			InteractionConfig::default(),
		);
		let structures = PlaceholderRenderer {
			theme: state.theme.clone(),
		};
		host_init.borrow_mut().map = Some(MapContext { state, ctx, structures });

		install_callbacks(&host_init);
		if fullscreen {
			install_resize(&host_init, &window, canvas);
		}
		request_render(&host_init);
	});

	// Later changes of the reactive inputs; the first run of each is covered
	// by the mount above.
	let host_store = host.clone();
	Effect::new(move |prev: Option<()>| {
		let store = store.get();
		if prev.is_some() {
			update(&host_store, |state| {
				state.replace_store(store);
				true
			});
		}
	});

	let host_selection = host.clone();
	Effect::new(move |prev: Option<()>| {
		let selection = selection.get();
		if prev.is_some() {
			update(&host_selection, |state| {
				state.select(selection, now());
				false
			});
		}
	});

	let host_algorithm = host.clone();
	Effect::new(move |prev: Option<()>| {
		let algorithm = algorithm.get();
		if prev.is_some() {
			update(&host_algorithm, |state| {
				state.set_algorithm(algorithm);
				true
			});
		}
	});

	let host_md = host.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(&canvas_ref, &ev) {
			update(&host_md, |state| state.pointer_down(x, y));
		}
	};

	let host_mm = host.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(&canvas_ref, &ev) {
			update(&host_mm, |state| state.pointer_move(now(), x, y));
		}
	};

	let host_mu = host.clone();
	let on_mouseup = move |_: MouseEvent| {
		update(&host_mu, |state| state.pointer_up(now()));
	};

	let host_ml = host.clone();
	let on_mouseleave = move |_: MouseEvent| {
		update(&host_ml, PerturbationMapState::pointer_leave);
	};

	let host_wh = host;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = local_position(&canvas_ref, &ev) {
			update(&host_wh, |state| state.wheel(now(), x, y, ev.delta_y()));
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="perturbation-map-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
