use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The declared type of an entity field.
///
/// `Record` references another registered entity by name and becomes a single
/// relationship field; `Array(Record(_))` becomes a list relationship. Every
/// other kind maps onto a GraphQL scalar or list thereof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
	Any,
	Null,
	Bool,
	Bytes,
	Datetime,
	Decimal,
	Float,
	Int,
	Number,
	Object,
	String,
	Uuid,
	Option(Box<Kind>),
	Array(Box<Kind>),
	Record(String),
}

impl Kind {
	/// Strip any `Option` wrapping, yielding the kind that decides the
	/// GraphQL base type.
	pub fn non_optional(&self) -> &Kind {
		match self {
			Kind::Option(k) => k.non_optional(),
			k => k,
		}
	}

	/// Whether this kind wires up a relationship rather than a scalar field.
	pub fn is_relationship(&self) -> bool {
		match self.non_optional() {
			Kind::Record(_) => true,
			Kind::Array(k) => matches!(k.non_optional(), Kind::Record(_)),
			_ => false,
		}
	}

	/// Whether a `Record` occurs anywhere in this kind, however deeply.
	pub(crate) fn has_record(&self) -> bool {
		match self {
			Kind::Record(_) => true,
			Kind::Option(k) | Kind::Array(k) => k.has_record(),
			_ => false,
		}
	}

	/// The referenced entity name, for relationship kinds.
	pub fn record_target(&self) -> Option<&str> {
		match self.non_optional() {
			Kind::Record(name) => Some(name),
			Kind::Array(k) => match k.non_optional() {
				Kind::Record(name) => Some(name),
				_ => None,
			},
			_ => None,
		}
	}
}

impl Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Kind::Any => write!(f, "any"),
			Kind::Null => write!(f, "null"),
			Kind::Bool => write!(f, "bool"),
			Kind::Bytes => write!(f, "bytes"),
			Kind::Datetime => write!(f, "datetime"),
			Kind::Decimal => write!(f, "decimal"),
			Kind::Float => write!(f, "float"),
			Kind::Int => write!(f, "int"),
			Kind::Number => write!(f, "number"),
			Kind::Object => write!(f, "object"),
			Kind::String => write!(f, "string"),
			Kind::Uuid => write!(f, "uuid"),
			Kind::Option(k) => write!(f, "option<{k}>"),
			Kind::Array(k) => write!(f, "array<{k}>"),
			Kind::Record(name) => write!(f, "record<{name}>"),
		}
	}
}

/// The filter class a filterable field advertises to its resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
	String,
	Bool,
	Int,
	Float,
	Datetime,
}

impl FilterKind {
	/// Decide which filter class a field of the given kind belongs to.
	///
	/// `Option` is transparent; arrays and relationships are never
	/// filterable, and neither are kinds without an equality-comparable
	/// scalar representation.
	pub fn for_kind(kind: &Kind) -> Option<FilterKind> {
		match kind {
			Kind::String => Some(FilterKind::String),
			Kind::Bool => Some(FilterKind::Bool),
			Kind::Int => Some(FilterKind::Int),
			Kind::Float => Some(FilterKind::Float),
			Kind::Datetime => Some(FilterKind::Datetime),
			Kind::Option(k) => FilterKind::for_kind(k),
			_ => None,
		}
	}

	/// The name of the shared filter input object for this class.
	pub fn filter_type_name(&self) -> &'static str {
		match self {
			FilterKind::String => "_filter_string",
			FilterKind::Bool => "_filter_bool",
			FilterKind::Int => "_filter_int",
			FilterKind::Float => "_filter_float",
			FilterKind::Datetime => "_filter_datetime",
		}
	}
}

impl Display for FilterKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FilterKind::String => write!(f, "string"),
			FilterKind::Bool => write!(f, "bool"),
			FilterKind::Int => write!(f, "int"),
			FilterKind::Float => write!(f, "float"),
			FilterKind::Datetime => write!(f, "datetime"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_kind_for_scalars() {
		assert_eq!(FilterKind::for_kind(&Kind::String), Some(FilterKind::String));
		assert_eq!(FilterKind::for_kind(&Kind::Bool), Some(FilterKind::Bool));
		assert_eq!(FilterKind::for_kind(&Kind::Int), Some(FilterKind::Int));
		assert_eq!(FilterKind::for_kind(&Kind::Float), Some(FilterKind::Float));
		assert_eq!(FilterKind::for_kind(&Kind::Datetime), Some(FilterKind::Datetime));
	}

	#[test]
	fn filter_kind_sees_through_option() {
		assert_eq!(
			FilterKind::for_kind(&Kind::Option(Box::new(Kind::Int))),
			Some(FilterKind::Int)
		);
	}

	#[test]
	fn arrays_and_relationships_are_not_filterable() {
		assert_eq!(FilterKind::for_kind(&Kind::Array(Box::new(Kind::String))), None);
		assert_eq!(FilterKind::for_kind(&Kind::Record("author".to_owned())), None);
		assert_eq!(FilterKind::for_kind(&Kind::Uuid), None);
		assert_eq!(FilterKind::for_kind(&Kind::Object), None);
	}

	#[test]
	fn relationship_classification() {
		let single = Kind::Record("author".to_owned());
		let listing = Kind::Array(Box::new(Kind::Record("post".to_owned())));
		let scalars = Kind::Array(Box::new(Kind::String));
		assert!(single.is_relationship());
		assert!(listing.is_relationship());
		assert!(!scalars.is_relationship());
		assert_eq!(single.record_target(), Some("author"));
		assert_eq!(listing.record_target(), Some("post"));
		assert_eq!(scalars.record_target(), None);
	}

	#[test]
	fn optional_relationship_still_classifies() {
		let kind = Kind::Option(Box::new(Kind::Record("author".to_owned())));
		assert!(kind.is_relationship());
		assert_eq!(kind.record_target(), Some("author"));
	}
}
