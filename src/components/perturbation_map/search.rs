//! Rule-based property search.
//!
//! A property list passes a rule list iff it satisfies every rule. There is
//! no OR or grouping. Rules fail closed: a missing key, a non-numeric value
//! under a numeric operator, or an unparsable rule value all fail the rule.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use super::types::{Property, PropertyValue, find_property};

/// Errors raised while reading search rules.
#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
	/// The operator is not one of [`Operator::ALL`].
	#[error("unknown search operator `{0}`")]
	UnknownOperator(String),
}

/// Closed set of comparison operators.
///
/// Deserialized from its symbol through [`FromStr`], so an unknown symbol
/// fails with [`SearchError::UnknownOperator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Operator {
	/// `=`
	Eq,
	/// `!=`
	Ne,
	/// `<`
	Lt,
	/// `<=`
	Le,
	/// `>`
	Gt,
	/// `>=`
	Ge,
	/// Inclusive numeric range, rule value written as `"lo,hi"`.
	Between,
	/// Categorical equality. Numbers compare by value, so `is "2.0"`
	/// matches a stored `2`; anything else compares as exact text.
	Is,
	/// Negation of [`Operator::Is`].
	IsNot,
}

impl Operator {
	/// Every operator, in the order a search form lists them.
	pub const ALL: [Operator; 9] = [
		Operator::Eq,
		Operator::Ne,
		Operator::Lt,
		Operator::Le,
		Operator::Gt,
		Operator::Ge,
		Operator::Between,
		Operator::Is,
		Operator::IsNot,
	];

	/// Symbol used in rule data.
	pub fn as_str(self) -> &'static str {
		match self {
			Operator::Eq => "=",
			Operator::Ne => "!=",
			Operator::Lt => "<",
			Operator::Le => "<=",
			Operator::Gt => ">",
			Operator::Ge => ">=",
			Operator::Between => "between",
			Operator::Is => "is",
			Operator::IsNot => "is not",
		}
	}

	/// Whether the operator requires numeric values on both sides.
	pub fn is_numeric(self) -> bool {
		!matches!(self, Operator::Is | Operator::IsNot)
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operator {
	type Err = SearchError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		Operator::ALL
			.into_iter()
			.find(|op| op.as_str() == s)
			.ok_or_else(|| SearchError::UnknownOperator(s.to_string()))
	}
}

impl TryFrom<String> for Operator {
	type Error = SearchError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

/// Which element kind a search is run against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTarget {
	/// Search compound properties.
	#[default]
	Node,
	/// Search perturbation properties.
	Edge,
}

/// A single `{property, operator, value}` condition.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Rule {
	/// Property key to test.
	pub property: String,
	/// Comparison applied.
	pub operator: Operator,
	/// Right-hand side as entered, parsed per operator.
	pub value: String,
}

impl Rule {
	/// Creates a rule.
	pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
		Self {
			property: property.into(),
			operator,
			value: value.into(),
		}
	}

	/// Whether `properties` satisfies this rule.
	pub fn matches(&self, properties: &[Property]) -> bool {
		let Some(property) = find_property(properties, &self.property) else {
			return false;
		};

		if !self.operator.is_numeric() {
			let equal = same_value(&property.value, &self.value);
			return match self.operator {
				Operator::Is => equal,
				_ => !equal,
			};
		}

		let Some(actual) = property.value.as_number() else {
			return false;
		};

		if self.operator == Operator::Between {
			return parse_range(&self.value)
				.is_some_and(|(lo, hi)| lo <= actual && actual <= hi);
		}

		let Some(expected) = parse_number(&self.value) else {
			return false;
		};
		match self.operator {
			Operator::Eq => actual == expected,
			Operator::Ne => actual != expected,
			Operator::Lt => actual < expected,
			Operator::Le => actual <= expected,
			Operator::Gt => actual > expected,
			Operator::Ge => actual >= expected,
			Operator::Between | Operator::Is | Operator::IsNot => false,
		}
	}
}

/// Categorical equality: by value when both sides are numbers, else by text.
fn same_value(value: &PropertyValue, text: &str) -> bool {
	match (value.as_number(), parse_number(text)) {
		(Some(a), Some(b)) => a == b,
		_ => value.to_string() == text.trim(),
	}
}

fn parse_number(s: &str) -> Option<f64> {
	s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_range(s: &str) -> Option<(f64, f64)> {
	let (lo, hi) = s.split_once(',')?;
	let (lo, hi) = (parse_number(lo)?, parse_number(hi)?);
	Some((lo.min(hi), lo.max(hi)))
}

/// AND across `rules`. An empty list passes trivially; callers in search
/// mode must treat "no rules" as "no matches" themselves.
pub fn evaluate(rules: &[Rule], properties: &[Property]) -> bool {
	rules.iter().all(|rule| rule.matches(properties))
}
