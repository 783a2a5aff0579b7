//! perturbation-map: interactive perturbation map for chemical compounds.
//!
//! This crate provides a WASM canvas component that shows compounds and the
//! perturbations between them, filters the visible subgraph by selection or
//! property search, lays it out, and reacts to hover, pan and zoom.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod components;

pub use components::perturbation_map::{
	DATA_ELEMENT_ID, GraphSnapshot, GraphSource, GraphStore, LayoutAlgorithm, PerturbationMapCanvas,
	Selection,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("perturbation-map: logging initialized");
}

/// Load the graph named by the `#graph-data` element. Any failure is logged
/// and yields the empty store.
async fn load_store() -> GraphStore {
	match GraphSource::from_document(DATA_ELEMENT_ID) {
		Ok(source) => GraphStore::load(&source).await,
		Err(e) => GraphStore::from_result(Err(e)),
	}
}

/// Main application component.
/// Loads graph data from the page and renders the perturbation map.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let store = RwSignal::new(GraphStore::default());
	let selection = RwSignal::new(Selection::None);
	let algorithm = RwSignal::new(LayoutAlgorithm::Force);

	leptos::task::spawn_local(async move {
		store.set(load_store().await);
	});

	let toggle_layout = move |_| {
		algorithm.update(|a| {
			*a = match a {
				LayoutAlgorithm::Force => LayoutAlgorithm::Hierarchical,
				LayoutAlgorithm::Hierarchical => LayoutAlgorithm::Force,
			}
		})
	};
	let layout_label = move || match algorithm.get() {
		LayoutAlgorithm::Force => "Hierarchical layout",
		LayoutAlgorithm::Hierarchical => "Force layout",
	};
	let summary = move || {
		let snapshot = store.with(|s| s.snapshot());
		format!("{} compounds, {} perturbations", snapshot.nodes.len(), snapshot.edges.len())
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />
		<Title text="Perturbation Map" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<PerturbationMapCanvas
				store=store
				selection=selection
				algorithm=algorithm
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Perturbation Map"</h1>
				<p class="subtitle">{summary}</p>
				<p class="subtitle">
					"Hover a compound to highlight its perturbations. Drag to pan. Scroll to zoom."
				</p>
				<button on:click=toggle_layout>{layout_label}</button>
				<button on:click=move |_| selection.set(Selection::None)>"Show all"</button>
			</div>
		</div>
	}
}
