//! Graph data store.
//!
//! The snapshot is loaded once per session, either from an inline JSON
//! `<script>` element or fetched from the URL in its `data-src` attribute.
//! Reads hand out the same [`Arc`] until the store is replaced by a reload.
//! A failed load is logged and leaves an empty, renderable snapshot.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlScriptElement, Request, RequestInit, RequestMode, Response};

use super::types::{GraphSnapshot, NodeId};

/// Id of the element carrying the graph data or its URL.
pub const DATA_ELEMENT_ID: &str = "graph-data";

/// Why a snapshot could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
	/// Not running in a browser document.
	#[error("no browser window")]
	NoWindow,
	/// The data element is absent.
	#[error("element #{0} not found")]
	MissingElement(String),
	/// The request or the body read failed.
	#[error("fetch failed: {0}")]
	Fetch(String),
	/// The server answered with a non-success status.
	#[error("HTTP {0}")]
	Http(u16),
	/// The data is not a valid snapshot.
	#[error("invalid graph JSON: {0}")]
	Parse(#[from] serde_json::Error),
}

/// Where the snapshot comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphSource {
	/// Text content of the script element with this id.
	Inline(String),
	/// URL fetched with a GET request.
	Remote(String),
}

impl GraphSource {
	/// Inspect the element `element_id`: a `data-src` attribute selects a
	/// remote fetch, otherwise its text is the data.
	pub fn from_document(element_id: &str) -> Result<Self, LoadError> {
		let document = web_sys::window()
			.and_then(|w| w.document())
			.ok_or(LoadError::NoWindow)?;
		let element = document
			.get_element_by_id(element_id)
			.ok_or_else(|| LoadError::MissingElement(element_id.to_string()))?;
		Ok(match element.get_attribute("data-src") {
			Some(url) if !url.trim().is_empty() => GraphSource::Remote(url),
			_ => GraphSource::Inline(element_id.to_string()),
		})
	}

	/// Read and parse the snapshot.
	pub async fn fetch(&self) -> Result<GraphSnapshot, LoadError> {
		let text = match self {
			GraphSource::Inline(id) => inline_text(id)?,
			GraphSource::Remote(url) => fetch_text(url).await?,
		};
		parse_snapshot(&text)
	}
}

fn inline_text(element_id: &str) -> Result<String, LoadError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or(LoadError::NoWindow)?;
	let script: HtmlScriptElement = document
		.get_element_by_id(element_id)
		.and_then(|e| e.dyn_into().ok())
		.ok_or_else(|| LoadError::MissingElement(element_id.to_string()))?;
	script
		.text()
		.map_err(|e| LoadError::Fetch(format!("{e:?}")))
}

async fn fetch_text(url: &str) -> Result<String, LoadError> {
	let opts = RequestInit::new();
	opts.set_method("GET");
	opts.set_mode(RequestMode::Cors);

	let request = Request::new_with_str_and_init(url, &opts)
		.map_err(|e| LoadError::Fetch(format!("request error: {e:?}")))?;
	let window = web_sys::window().ok_or(LoadError::NoWindow)?;
	let value = JsFuture::from(window.fetch_with_request(&request))
		.await
		.map_err(|e| LoadError::Fetch(format!("{e:?}")))?;
	let response: Response = value
		.dyn_into()
		.map_err(|_| LoadError::Fetch("response is not a Response".into()))?;
	if !response.ok() {
		return Err(LoadError::Http(response.status()));
	}

	let promise = response
		.text()
		.map_err(|e| LoadError::Fetch(format!("{e:?}")))?;
	let text = JsFuture::from(promise)
		.await
		.map_err(|e| LoadError::Fetch(format!("{e:?}")))?;
	text.as_string()
		.ok_or_else(|| LoadError::Fetch("response body is not text".into()))
}

/// Parse and sanitize a JSON snapshot.
pub fn parse_snapshot(json: &str) -> Result<GraphSnapshot, LoadError> {
	let snapshot: GraphSnapshot = serde_json::from_str(json)?;
	Ok(sanitize(snapshot))
}

/// Drop duplicate node ids, edges with a missing endpoint and parallel
/// duplicate edges, keeping the first occurrence of each.
pub fn sanitize(mut snapshot: GraphSnapshot) -> GraphSnapshot {
	let mut ids = HashSet::new();
	let before = snapshot.nodes.len();
	snapshot.nodes.retain(|n| ids.insert(n.id.clone()));
	if snapshot.nodes.len() < before {
		warn!(
			"perturbation-map: dropped {} nodes with duplicate ids",
			before - snapshot.nodes.len()
		);
	}

	let mut seen = HashSet::new();
	let (mut dangling, mut duplicate) = (0, 0);
	snapshot.edges.retain(|e| {
		if !ids.contains(&e.source) || !ids.contains(&e.target) {
			dangling += 1;
			false
		} else if !seen.insert(e.id()) {
			duplicate += 1;
			false
		} else {
			true
		}
	});
	if dangling > 0 {
		warn!("perturbation-map: dropped {dangling} edges with unknown endpoints");
	}
	if duplicate > 0 {
		warn!("perturbation-map: dropped {duplicate} duplicate edges");
	}
	snapshot
}

/// Session-wide graph data plus structures edited since load.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
	snapshot: Arc<GraphSnapshot>,
	edited: BTreeMap<NodeId, String>,
}

impl GraphStore {
	/// Store over a sanitized `snapshot`.
	pub fn new(snapshot: GraphSnapshot) -> Self {
		let snapshot = sanitize(snapshot);
		info!(
			"perturbation-map: loaded {} nodes, {} edges",
			snapshot.nodes.len(),
			snapshot.edges.len()
		);
		Self {
			snapshot: Arc::new(snapshot),
			edited: BTreeMap::new(),
		}
	}

	/// Store for the outcome of a load. Failures give the empty store.
	pub fn from_result(result: Result<GraphSnapshot, LoadError>) -> Self {
		match result {
			Ok(snapshot) => Self::new(snapshot),
			Err(e) => {
				warn!("perturbation-map: failed to load graph data: {e}");
				Self::default()
			}
		}
	}

	/// Load from `source`. Never fails; see [`GraphStore::from_result`].
	pub async fn load(source: &GraphSource) -> Self {
		Self::from_result(source.fetch().await)
	}

	/// Shared handle to the loaded snapshot.
	pub fn snapshot(&self) -> Arc<GraphSnapshot> {
		Arc::clone(&self.snapshot)
	}

	/// Whether the store holds no nodes.
	pub fn is_empty(&self) -> bool {
		self.snapshot.is_empty()
	}

	/// Current structure of `id`: the last committed edit, else the loaded one.
	pub fn structure_of(&self, id: &str) -> Option<&str> {
		if let Some(s) = self.edited.get(id) {
			return Some(s);
		}
		self.snapshot.node(id).map(|n| n.structure.as_str())
	}

	/// Persist an edited structure. Unknown node ids are ignored.
	pub fn set_structure(&mut self, id: &str, structure: String) -> bool {
		if self.snapshot.node(id).is_none() {
			warn!("perturbation-map: ignoring structure edit for unknown node {id}");
			return false;
		}
		self.edited.insert(id.to_string(), structure);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const JSON: &str = r#"{
		"nodes": [
			{ "id": "a", "structure": "CCO" },
			{ "id": "b", "structure": "CCN" },
			{ "id": "a", "structure": "CCC" }
		],
		"edges": [
			{ "source": "a", "target": "b" },
			{ "source": "a", "target": "b" },
			{ "source": "b", "target": "a" },
			{ "source": "a", "target": "zzz" }
		],
		"nodeProperties": [],
		"edgeProperties": []
	}"#;

	#[test]
	fn sanitizes_on_parse() {
		let snapshot = parse_snapshot(JSON).unwrap();
		assert_eq!(snapshot.nodes.len(), 2);
		assert_eq!(snapshot.node("a").unwrap().structure, "CCO");
		let edges: Vec<String> = snapshot.edges.iter().map(|e| e.id().to_string()).collect();
		assert_eq!(edges, vec!["a-b", "b-a"]);
	}

	#[test]
	fn invalid_json_is_a_parse_error() {
		assert!(matches!(parse_snapshot("{ nodes: "), Err(LoadError::Parse(_))));
	}

	#[test]
	fn failed_load_gives_empty_store() {
		let store = GraphStore::from_result(Err(LoadError::Http(404)));
		assert!(store.is_empty());
		assert!(store.snapshot().edges.is_empty());
		assert_eq!(store.structure_of("a"), None);
	}

	#[test]
	fn reads_share_one_snapshot() {
		let store = GraphStore::from_result(parse_snapshot(JSON));
		assert!(Arc::ptr_eq(&store.snapshot(), &store.snapshot()));
	}

	#[test]
	fn structure_edits_overlay_loaded_data() {
		let mut store = GraphStore::from_result(parse_snapshot(JSON));
		assert_eq!(store.structure_of("b"), Some("CCN"));
		assert!(store.set_structure("b", "CC(=O)N".into()));
		assert_eq!(store.structure_of("b"), Some("CC(=O)N"));
		assert_eq!(store.snapshot().node("b").unwrap().structure, "CCN");
		assert!(!store.set_structure("zzz", "C".into()));
		assert_eq!(store.structure_of("zzz"), None);
	}
}
