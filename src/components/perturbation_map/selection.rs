//! Selection modes driving the visible subgraph.

use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;

use super::search::{Rule, SearchTarget};
use super::types::{EdgeId, NodeId};

/// Exactly one active selection mode. Being an enum, two modes can never be
/// active at once.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Selection {
	/// No filter: the whole graph is active.
	#[default]
	None,
	/// Chosen compounds.
	Nodes {
		/// Node ids to keep. Empty means no filter.
		ids: BTreeSet<NodeId>,
		/// Also keep every one-hop neighbour of `ids`.
		include_neighbors: bool,
	},
	/// A single perturbation and its two endpoints.
	Edge {
		/// Ordered identity of the edge.
		id: EdgeId,
	},
	/// Elements matching every rule.
	Search {
		/// Rules, AND-combined. Empty matches nothing.
		rules: Vec<Rule>,
		/// Element kind the rules are evaluated against.
		target: SearchTarget,
	},
}

impl Selection {
	/// Node-mode selection over `ids`.
	pub fn nodes<I, S>(ids: I, include_neighbors: bool) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<NodeId>,
	{
		Selection::Nodes {
			ids: ids.into_iter().map(Into::into).collect(),
			include_neighbors,
		}
	}

	/// Edge-mode selection of `source-target`.
	pub fn edge(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Selection::Edge {
			id: EdgeId::new(source, target),
		}
	}

	/// Search-mode selection.
	pub fn search(rules: Vec<Rule>, target: SearchTarget) -> Self {
		Selection::Search { rules, target }
	}

	/// Mode name for logs and error messages.
	pub fn mode(&self) -> &'static str {
		match self {
			Selection::None => "none",
			Selection::Nodes { .. } => "nodes",
			Selection::Edge { .. } => "edge",
			Selection::Search { .. } => "search",
		}
	}
}

/// Rejection of a [`SelectionForm`].
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
	/// More than one mode was filled in.
	#[error("selection form has several active modes: {}", modes.join(", "))]
	Conflicting {
		/// Names of the filled-in modes.
		modes: Vec<&'static str>,
	},
}

/// Raw selection as produced by external form widgets.
///
/// The forms do not guarantee that only one of the fields is filled in, so
/// conversion into a [`Selection`] rejects combinations.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionForm {
	/// Node picker contents.
	#[serde(default)]
	pub node_ids: Vec<NodeId>,
	/// Neighbour toggle of the node picker.
	#[serde(default)]
	pub include_neighbors: bool,
	/// Edge picker contents as `(source, target)`.
	#[serde(default)]
	pub edge: Option<(NodeId, NodeId)>,
	/// Search builder contents.
	#[serde(default)]
	pub search: Option<SearchForm>,
}

/// Search builder part of a [`SelectionForm`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SearchForm {
	/// Rules entered so far.
	#[serde(default)]
	pub rules: Vec<Rule>,
	/// Element kind searched.
	#[serde(default)]
	pub target: SearchTarget,
}

impl TryFrom<SelectionForm> for Selection {
	type Error = SelectionError;

	fn try_from(form: SelectionForm) -> Result<Self, Self::Error> {
		let mut modes = Vec::new();
		if !form.node_ids.is_empty() {
			modes.push("nodes");
		}
		if form.edge.is_some() {
			modes.push("edge");
		}
		if form.search.is_some() {
			modes.push("search");
		}
		if modes.len() > 1 {
			return Err(SelectionError::Conflicting { modes });
		}

		Ok(if let Some((source, target)) = form.edge {
			Selection::edge(source, target)
		} else if let Some(search) = form.search {
			Selection::search(search.rules, search.target)
		} else if !form.node_ids.is_empty() {
			Selection::nodes(form.node_ids, form.include_neighbors)
		} else {
			Selection::None
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perturbation_map::search::Operator;

	#[test]
	fn single_mode_forms_convert() {
		let form = SelectionForm {
			node_ids: vec!["a".into()],
			include_neighbors: true,
			..Default::default()
		};
		assert_eq!(Selection::try_from(form), Ok(Selection::nodes(["a"], true)));

		let form = SelectionForm {
			edge: Some(("a".into(), "b".into())),
			..Default::default()
		};
		assert_eq!(Selection::try_from(form), Ok(Selection::edge("a", "b")));

		assert_eq!(
			Selection::try_from(SelectionForm::default()),
			Ok(Selection::None)
		);
	}

	#[test]
	fn conflicting_forms_are_rejected() {
		let form = SelectionForm {
			node_ids: vec!["a".into()],
			edge: Some(("a".into(), "b".into())),
			search: Some(SearchForm {
				rules: vec![Rule::new("logP", Operator::Gt, "1")],
				target: SearchTarget::Node,
			}),
			..Default::default()
		};
		assert_eq!(
			Selection::try_from(form),
			Err(SelectionError::Conflicting {
				modes: vec!["nodes", "edge", "search"]
			})
		);
	}

	#[test]
	fn search_form_without_rules_is_still_search_mode() {
		let form = SelectionForm {
			search: Some(SearchForm::default()),
			..Default::default()
		};
		assert_eq!(
			Selection::try_from(form).map(|s| s.mode()),
			Ok("search")
		);
	}
}
