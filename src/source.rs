use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::GqlError;
use crate::model::EntityDefinition;

/// How a single record is being addressed.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
	/// Root single queries resolve a record by id or slug.
	Args {
		id: Option<String>,
		slug: Option<String>,
	},
	/// Single relationship fields pass the referencing value of the parent
	/// record through, untouched.
	Relation {
		field: String,
		value: JsonValue,
	},
}

/// The relationship context of a nested list field: the storage name of the
/// referencing field on the parent record, and its raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
	pub field: String,
	pub value: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
	Asc,
	Desc,
}

/// One link of a parsed ordering chain. `field` is the storage name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
	pub field: String,
	pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
	Eq,
	Ne,
}

/// A parsed filter argument.
///
/// Condition values have already been checked against the field's declared
/// kind, and condition fields carry storage names, so a data source can apply
/// the tree to its records directly.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
	Cond {
		field: String,
		op: FilterOp,
		value: JsonValue,
	},
	And(Vec<FilterExpr>),
	Or(Vec<FilterExpr>),
	Not(Box<FilterExpr>),
}

/// The fully parsed argument set of a listing field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
	pub start: Option<i64>,
	pub limit: Option<i64>,
	pub order: Vec<Order>,
	pub filter: Option<FilterExpr>,
	/// Present when the listing hangs off a parent record.
	pub relation: Option<Relation>,
}

/// The resolution seam: schema generation attaches these two calls to every
/// single and listing field it creates. Records are JSON objects keyed by
/// storage field names.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
	async fn single(
		&self,
		entity: &EntityDefinition,
		lookup: Lookup,
	) -> Result<Option<JsonValue>, GqlError>;

	async fn listing(
		&self,
		entity: &EntityDefinition,
		query: Listing,
	) -> Result<Vec<JsonValue>, GqlError>;
}
