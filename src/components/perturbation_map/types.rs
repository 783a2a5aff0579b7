//! Graph data structures loaded into the perturbation map.

use std::fmt;

use serde::Deserialize;

/// Stable identifier of a compound node.
pub type NodeId = String;

/// A property value: numeric measurements or categorical labels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
	/// Numeric measurement.
	Number(f64),
	/// Categorical label, or a number carried as text.
	Text(String),
}

impl PropertyValue {
	/// Numeric view of the value. Text is parsed; anything non-finite is `None`.
	pub fn as_number(&self) -> Option<f64> {
		let n = match self {
			PropertyValue::Number(n) => *n,
			PropertyValue::Text(s) => s.trim().parse::<f64>().ok()?,
		};
		n.is_finite().then_some(n)
	}
}

impl fmt::Display for PropertyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropertyValue::Number(n) => write!(f, "{n}"),
			PropertyValue::Text(s) => f.write_str(s),
		}
	}
}

/// A keyed property carried by a node or an edge.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Property {
	/// Property name, unique within its element.
	pub key: String,
	/// Property value.
	pub value: PropertyValue,
	/// Free-form type tag (e.g. "numeric", "categorical").
	#[serde(rename = "type", default)]
	pub kind: String,
}

/// Looks up a property by key.
pub fn find_property<'a>(properties: &'a [Property], key: &str) -> Option<&'a Property> {
	properties.iter().find(|p| p.key == key)
}

/// A compound in the map.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
	/// Unique identifier. Edges reference nodes by this id.
	pub id: NodeId,
	/// Chemical structure encoding (e.g. SMILES). Opaque to the engine.
	#[serde(default)]
	pub structure: String,
	/// Properties of this compound, in display order.
	#[serde(default)]
	pub properties: Vec<Property>,
}

/// Identity of an edge: the ordered `(source, target)` pair.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId {
	/// Source node id.
	pub source: NodeId,
	/// Target node id.
	pub target: NodeId,
}

impl EdgeId {
	/// Creates an edge id from its endpoints.
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
		}
	}

	/// Whether `node` is either endpoint.
	pub fn touches(&self, node: &str) -> bool {
		self.source == node || self.target == node
	}
}

impl fmt::Display for EdgeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.source, self.target)
	}
}

/// A perturbation between two compounds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Edge {
	/// Source node id.
	pub source: NodeId,
	/// Target node id.
	pub target: NodeId,
	/// Properties of this perturbation.
	#[serde(default)]
	pub properties: Vec<Property>,
}

impl Edge {
	/// Identity of this edge.
	pub fn id(&self) -> EdgeId {
		EdgeId::new(self.source.clone(), self.target.clone())
	}
}

/// A loaded graph: nodes, edges and the catalog of property keys.
///
/// `node_properties` / `edge_properties` list every key available for
/// display or search. Individual elements may omit any of them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
	/// All compounds.
	#[serde(default)]
	pub nodes: Vec<Node>,
	/// All perturbations.
	#[serde(default)]
	pub edges: Vec<Edge>,
	/// Catalog of node property keys.
	#[serde(default)]
	pub node_properties: Vec<String>,
	/// Catalog of edge property keys.
	#[serde(default)]
	pub edge_properties: Vec<String>,
}

impl GraphSnapshot {
	/// Whether the snapshot has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Node with the given id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Edge with the given identity.
	pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
		self.edges
			.iter()
			.find(|e| e.source == id.source && e.target == id.target)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_mixed_property_values() {
		let json = r#"{
			"nodes": [
				{ "id": "a", "structure": "CCO", "properties": [
					{ "key": "logP", "value": 1.5, "type": "numeric" },
					{ "key": "creator", "value": "alice", "type": "categorical" }
				] }
			],
			"edges": [],
			"nodeProperties": ["logP", "creator", "QED"],
			"edgeProperties": ["ddG"]
		}"#;
		let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
		let node = snapshot.node("a").unwrap();
		assert_eq!(node.properties[0].value, PropertyValue::Number(1.5));
		assert_eq!(
			node.properties[1].value,
			PropertyValue::Text("alice".into())
		);
		assert_eq!(snapshot.node_properties.len(), 3);
		assert_eq!(snapshot.edge_properties, vec!["ddG".to_string()]);
	}

	#[test]
	fn numeric_view_of_text_values() {
		assert_eq!(PropertyValue::Text(" 2.5 ".into()).as_number(), Some(2.5));
		assert_eq!(PropertyValue::Text("abc".into()).as_number(), None);
		assert_eq!(PropertyValue::Number(f64::NAN).as_number(), None);
	}

	#[test]
	fn edge_id_displays_as_pair() {
		let id = EdgeId::new("a", "b");
		assert_eq!(id.to_string(), "a-b");
		assert!(id.touches("b"));
		assert!(!id.touches("c"));
	}
}
