use std::sync::Arc;

use async_graphql::dynamic::{
	InputObject, InputValue, Interface, InterfaceField, Object, Scalar, Schema, Type, TypeRef,
};
use async_graphql::{Name, Value as GqlValue};
use chrono::DateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};

use crate::entities::process_entities;
use crate::error::{schema_error, type_error, GqlError};
use crate::ext::NamedContainer;
#[cfg(debug_assertions)]
use crate::ext::ValidatorExt;
use crate::kind::{FilterKind, Kind};
use crate::model::{EntitiesConfig, EntityDefinition, EntityRegistry, SchemaConfig};
use crate::source::DataSource;

/// Translate the registered entity definitions into an executable schema,
/// wiring every generated field to the supplied data source.
pub fn generate_schema<S: DataSource>(
	registry: &EntityRegistry,
	config: &SchemaConfig,
	source: Arc<S>,
) -> Result<Schema, GqlError> {
	let selected: Vec<Arc<EntityDefinition>> = match &config.entities {
		EntitiesConfig::None => return Err(GqlError::NotConfigured),
		EntitiesConfig::Auto => registry.iter().cloned().collect(),
		EntitiesConfig::Include(inc) => {
			registry.iter().filter(|e| inc.contains_name(&e.name)).cloned().collect()
		}
		EntitiesConfig::Exclude(exc) => {
			registry.iter().filter(|e| !exc.contains_name(&e.name)).cloned().collect()
		}
	};

	if selected.is_empty() {
		return Err(schema_error("no entities found in registry"));
	}

	let names: Vec<&str> = selected.iter().map(|e| e.name.as_str()).collect();
	trace!(entities = ?names, "generating schema");

	let query = Object::new("Query");
	let mut types: Vec<Type> = Vec::new();

	let query = process_entities(&selected, query, &mut types, &source)?;

	trace!("current Query object for schema: {:?}", query);

	let mut schema = Schema::build("Query", None, None).register(query);
	for ty in types {
		trace!("adding type: {ty:?}");
		schema = schema.register(ty);
	}

	schema = schema.register(Type::InputObject(filter_id()));
	for fk in [
		FilterKind::String,
		FilterKind::Bool,
		FilterKind::Int,
		FilterKind::Float,
		FilterKind::Datetime,
	] {
		schema = schema.register(Type::InputObject(filter_for_kind(fk)));
	}

	macro_rules! scalar_debug_validated {
		($schema:ident, $name:expr, $kind:expr) => {
			scalar_debug_validated!(
				$schema,
				$name,
				$kind,
				::std::option::Option::<&str>::None,
				::std::option::Option::<&str>::None
			)
		};
		($schema:ident, $name:expr, $kind:expr, $desc:literal) => {
			scalar_debug_validated!($schema, $name, $kind, std::option::Option::Some($desc), None)
		};
		($schema:ident, $name:expr, $kind:expr, $desc:literal, $url:literal) => {
			scalar_debug_validated!(
				$schema,
				$name,
				$kind,
				std::option::Option::Some($desc),
				Some($url)
			)
		};
		($schema:ident, $name:expr, $kind:expr, $desc:expr, $url:expr) => {{
			let new_type = Type::Scalar({
				let mut tmp = Scalar::new($name);
				if let Some(desc) = $desc {
					tmp = tmp.description(desc);
				}
				if let Some(url) = $url {
					tmp = tmp.specified_by_url(url);
				}
				#[cfg(debug_assertions)]
				tmp.add_validator(|v| gql_to_json_kind(v, &$kind).is_ok());
				tmp
			});
			$schema = $schema.register(new_type);
		}};
	}

	scalar_debug_validated!(
		schema,
		"uuid",
		Kind::Uuid,
		"String encoded UUID",
		"https://datatracker.ietf.org/doc/html/rfc4122"
	);

	scalar_debug_validated!(schema, "decimal", Kind::Decimal);
	scalar_debug_validated!(schema, "number", Kind::Number);
	scalar_debug_validated!(schema, "null", Kind::Null);
	scalar_debug_validated!(schema, "datetime", Kind::Datetime);
	scalar_debug_validated!(schema, "object", Kind::Object);
	scalar_debug_validated!(schema, "any", Kind::Any);
	scalar_debug_validated!(schema, "bytes", Kind::Bytes);

	let id_interface =
		Interface::new("record").field(InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID)));
	schema = schema.register(id_interface);

	schema
		.finish()
		.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}

/// Map a declared field kind onto a GraphQL type reference.
///
/// `Option` controls nullability: every non-optional kind comes out non-null.
pub(crate) fn kind_to_type(kind: &Kind) -> Result<TypeRef, GqlError> {
	let optional = matches!(kind, Kind::Option(_));
	let out_ty = match kind.non_optional() {
		Kind::Any => TypeRef::named("any"),
		Kind::Null => TypeRef::named("null"),
		Kind::Bool => TypeRef::named(TypeRef::BOOLEAN),
		Kind::Bytes => TypeRef::named("bytes"),
		Kind::Datetime => TypeRef::named("datetime"),
		Kind::Decimal => TypeRef::named("decimal"),
		Kind::Float => TypeRef::named(TypeRef::FLOAT),
		Kind::Int => TypeRef::named(TypeRef::INT),
		Kind::Number => TypeRef::named("number"),
		Kind::Object => TypeRef::named("object"),
		Kind::String => TypeRef::named(TypeRef::STRING),
		Kind::Uuid => TypeRef::named("uuid"),
		Kind::Record(name) => TypeRef::named(name.clone()),
		Kind::Array(k) => TypeRef::List(Box::new(kind_to_type(k)?)),
		Kind::Option(_) => unreachable!("non_optional strips option wrapping"),
	};

	let out = match optional {
		true => out_ty,
		false => TypeRef::NonNull(Box::new(out_ty)),
	};
	Ok(out)
}

/// Convert a record value into the engine's value space. Total: every JSON
/// value has a GraphQL representation.
pub(crate) fn json_value_to_gql_value(v: JsonValue) -> GqlValue {
	match v {
		JsonValue::Null => GqlValue::Null,
		JsonValue::Bool(b) => GqlValue::Boolean(b),
		JsonValue::Number(n) => GqlValue::Number(n),
		JsonValue::String(s) => GqlValue::String(s),
		JsonValue::Array(a) => GqlValue::List(a.into_iter().map(json_value_to_gql_value).collect()),
		JsonValue::Object(o) => GqlValue::Object(
			o.into_iter().map(|(k, v)| (Name::new(k), json_value_to_gql_value(v))).collect(),
		),
	}
}

/// Convert an input value into a record value, checked against the declared
/// kind of the field it targets. Datetime strings are validated but kept as
/// written.
pub(crate) fn gql_to_json_kind(val: &GqlValue, kind: &Kind) -> Result<JsonValue, GqlError> {
	match kind {
		Kind::Any => match val {
			GqlValue::Null => Ok(JsonValue::Null),
			GqlValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
			GqlValue::Number(n) => Ok(JsonValue::Number(n.clone())),
			GqlValue::String(s) => Ok(JsonValue::String(s.to_owned())),
			GqlValue::Enum(e) => Ok(JsonValue::String(e.to_string())),
			list @ GqlValue::List(_) => gql_to_json_kind(list, &Kind::Array(Box::new(Kind::Any))),
			obj @ GqlValue::Object(_) => gql_to_json_kind(obj, &Kind::Object),
			GqlValue::Binary(_) => Err(type_error(kind.clone(), val)),
		},
		Kind::Null => match val {
			GqlValue::Null => Ok(JsonValue::Null),
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Bool => match val {
			GqlValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Bytes => match val {
			GqlValue::Binary(b) => {
				Ok(JsonValue::Array(b.iter().map(|byte| JsonValue::from(*byte)).collect()))
			}
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Datetime => match val {
			GqlValue::String(s) => match DateTime::parse_from_rfc3339(s) {
				Ok(_) => Ok(JsonValue::String(s.to_owned())),
				Err(_) => Err(type_error(kind.clone(), val)),
			},
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Decimal => match val {
			GqlValue::Number(n) => {
				let d = if let Some(i) = n.as_i64() {
					Decimal::from_i64(i)
				} else if let Some(u) = n.as_u64() {
					Decimal::from_u64(u)
				} else {
					n.as_f64().and_then(Decimal::from_f64)
				};
				match d {
					Some(d) => Ok(JsonValue::String(d.to_string())),
					None => Err(type_error(kind.clone(), val)),
				}
			}
			GqlValue::String(s) => match s.parse::<Decimal>() {
				Ok(d) => Ok(JsonValue::String(d.to_string())),
				Err(_) => Err(type_error(kind.clone(), val)),
			},
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Float => match val {
			GqlValue::Number(n) => match n.as_f64().and_then(Number::from_f64) {
				Some(f) => Ok(JsonValue::Number(f)),
				None => Err(type_error(kind.clone(), val)),
			},
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Int => match val {
			GqlValue::Number(n) => match n.as_i64() {
				Some(i) => Ok(JsonValue::from(i)),
				None => Err(type_error(kind.clone(), val)),
			},
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Number => match val {
			GqlValue::Number(n) => Ok(JsonValue::Number(n.clone())),
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Object => match val {
			GqlValue::Object(o) => {
				let out: Result<serde_json::Map<String, JsonValue>, GqlError> = o
					.iter()
					.map(|(k, v)| gql_to_json_kind(v, &Kind::Any).map(|jv| (k.to_string(), jv)))
					.collect();
				Ok(JsonValue::Object(out?))
			}
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::String => match val {
			GqlValue::String(s) => Ok(JsonValue::String(s.to_owned())),
			GqlValue::Enum(e) => Ok(JsonValue::String(e.to_string())),
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Uuid => match val {
			GqlValue::String(s) => match s.parse::<uuid::Uuid>() {
				Ok(u) => Ok(JsonValue::String(u.to_string())),
				Err(_) => Err(type_error(kind.clone(), val)),
			},
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Option(k) => match val {
			GqlValue::Null => Ok(JsonValue::Null),
			v => gql_to_json_kind(v, k),
		},
		Kind::Array(k) => match val {
			GqlValue::List(l) => {
				let out: Result<Vec<JsonValue>, GqlError> =
					l.iter().map(|v| gql_to_json_kind(v, k)).collect();
				Ok(JsonValue::Array(out?))
			}
			_ => Err(type_error(kind.clone(), val)),
		},
		Kind::Record(_) => match val {
			GqlValue::String(s) => Ok(JsonValue::String(s.to_owned())),
			_ => Err(type_error(kind.clone(), val)),
		},
	}
}

macro_rules! filter_impl {
	($filter:ident, $ty:ident, $name:expr) => {
		$filter = $filter.field(InputValue::new($name, $ty.clone()));
	};
}

pub(crate) fn filter_id() -> InputObject {
	let mut filter = InputObject::new("_filter_id");
	let ty = TypeRef::named(TypeRef::ID);
	filter_impl!(filter, ty, "eq");
	filter_impl!(filter, ty, "ne");
	filter
}

pub(crate) fn filter_for_kind(fk: FilterKind) -> InputObject {
	let ty = match fk {
		FilterKind::String => TypeRef::named(TypeRef::STRING),
		FilterKind::Bool => TypeRef::named(TypeRef::BOOLEAN),
		FilterKind::Int => TypeRef::named(TypeRef::INT),
		FilterKind::Float => TypeRef::named(TypeRef::FLOAT),
		FilterKind::Datetime => TypeRef::named("datetime"),
	};
	let mut filter = InputObject::new(fk.filter_type_name());
	filter_impl!(filter, ty, "eq");
	filter_impl!(filter, ty, "ne");
	filter
}
