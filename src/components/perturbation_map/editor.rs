//! Structure edit sessions.
//!
//! The editing surface itself is external. A session only remembers which
//! node is being edited and the latest structure it emitted; committing
//! persists that string into the [`GraphStore`], cancelling drops it.

use log::debug;

use super::store::GraphStore;
use super::types::NodeId;

/// Structure editor state of one view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StructureEditSession {
	/// No editor open.
	#[default]
	Closed,
	/// Editing the structure of `node`.
	Editing {
		/// Node being edited.
		node: NodeId,
		/// Structure when the editor opened.
		initial: String,
		/// Last structure the editor emitted.
		latest: String,
	},
}

impl StructureEditSession {
	/// Open an editor on `node`, seeded with its current structure.
	pub fn begin(store: &GraphStore, node: &str) -> Self {
		match store.structure_of(node) {
			Some(structure) => StructureEditSession::Editing {
				node: node.to_string(),
				initial: structure.to_string(),
				latest: structure.to_string(),
			},
			None => StructureEditSession::Closed,
		}
	}

	/// Whether an editor is open.
	pub fn is_open(&self) -> bool {
		matches!(self, StructureEditSession::Editing { .. })
	}

	/// Node being edited.
	pub fn node(&self) -> Option<&str> {
		match self {
			StructureEditSession::Editing { node, .. } => Some(node),
			StructureEditSession::Closed => None,
		}
	}

	/// Record a change event from the editor.
	pub fn on_change(&mut self, structure: impl Into<String>) {
		if let StructureEditSession::Editing { latest, .. } = self {
			*latest = structure.into();
		}
	}

	/// Whether the structure changed since the editor opened.
	pub fn is_dirty(&self) -> bool {
		match self {
			StructureEditSession::Editing { initial, latest, .. } => initial != latest,
			StructureEditSession::Closed => false,
		}
	}

	/// Persist the latest structure and close. Returns what was saved.
	pub fn commit(&mut self, store: &mut GraphStore) -> Option<(NodeId, String)> {
		let StructureEditSession::Editing { node, latest, .. } = std::mem::take(self) else {
			return None;
		};
		store.set_structure(&node, latest.clone());
		debug!("perturbation-map: saved structure of {node}");
		Some((node, latest))
	}

	/// Close without saving.
	pub fn cancel(&mut self) {
		*self = StructureEditSession::Closed;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perturbation_map::filter::tests::diamond;

	#[test]
	fn commit_persists_latest_change() {
		let mut store = GraphStore::new(diamond());
		let mut session = StructureEditSession::begin(&store, "a");
		assert_eq!(session.node(), Some("a"));
		session.on_change("c1ccncc1");
		session.on_change("c1ccncc1O");
		assert!(session.is_dirty());
		let saved = session.commit(&mut store);
		assert_eq!(saved, Some(("a".to_string(), "c1ccncc1O".to_string())));
		assert_eq!(store.structure_of("a"), Some("c1ccncc1O"));
		assert!(!session.is_open());
	}

	#[test]
	fn cancel_discards_changes() {
		let mut store = GraphStore::new(diamond());
		let mut session = StructureEditSession::begin(&store, "b");
		session.on_change("CCCC");
		session.cancel();
		assert_eq!(session.commit(&mut store), None);
		assert_eq!(store.structure_of("b"), Some("c1ccccc1"));
	}

	#[test]
	fn unknown_node_does_not_open() {
		let store = GraphStore::new(diamond());
		let mut session = StructureEditSession::begin(&store, "zzz");
		assert!(!session.is_open());
		session.on_change("C");
		assert!(!session.is_dirty());
	}

	#[test]
	fn reopening_starts_from_saved_structure() {
		let mut store = GraphStore::new(diamond());
		let mut session = StructureEditSession::begin(&store, "c");
		session.on_change("CCO");
		session.commit(&mut store);
		let again = StructureEditSession::begin(&store, "c");
		assert!(!again.is_dirty());
		assert_eq!(
			again,
			StructureEditSession::Editing {
				node: "c".into(),
				initial: "CCO".into(),
				latest: "CCO".into(),
			}
		);
	}
}
