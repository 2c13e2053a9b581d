use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use async_graphql::dynamic::{
	Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Type,
	TypeRef,
};
use async_graphql::{indexmap::IndexMap, Name, Value as GqlValue};
use serde_json::Value as JsonValue;

use crate::error::{internal_error, resolver_error, schema_error, GqlError};
use crate::kind::Kind;
use crate::model::{EntityDefinition, FieldDefinition};
use crate::schema::{gql_to_json_kind, json_value_to_gql_value, kind_to_type};
use crate::source::{
	DataSource, FilterExpr, FilterOp, Listing, Lookup, Order, OrderDirection, Relation,
};
use crate::utils::GqlValueUtils;

macro_rules! limit_input {
	() => {
		InputValue::new("limit", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! start_input {
	() => {
		InputValue::new("start", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! id_input {
	() => {
		InputValue::new("id", TypeRef::named(TypeRef::ID))
	};
}

macro_rules! slug_input {
	() => {
		InputValue::new("slug", TypeRef::named(TypeRef::STRING))
	};
}

fn filter_name_for_entity(name: impl Display) -> String {
	format!("_filter_{name}")
}

fn order_name_for_entity(name: impl Display) -> String {
	format!("_order_{name}")
}

fn orderable_name_for_entity(name: impl Display) -> String {
	format!("_orderable_{name}")
}

fn single_description(def: &EntityDefinition) -> String {
	match &def.description {
		Some(desc) => format!("Get a single {} ({}) by id or slug", def.name, desc),
		None => format!("Get a single {} by id or slug", def.name),
	}
}

fn listing_description(def: &EntityDefinition) -> String {
	match &def.description {
		Some(desc) => format!("Get a list of {} ({}) according to filters", def.name, desc),
		None => format!("Get a list of {} according to filters", def.name),
	}
}

/// Build the Query fields, output objects, filter inputs and ordering inputs
/// for every selected entity, attaching resolvers backed by `source`.
pub(crate) fn process_entities<S: DataSource>(
	entities: &[Arc<EntityDefinition>],
	mut query: Object,
	types: &mut Vec<Type>,
	source: &Arc<S>,
) -> Result<Object, GqlError> {
	let by_name: BTreeMap<String, Arc<EntityDefinition>> =
		entities.iter().map(|e| (e.name.clone(), e.clone())).collect();

	for def in entities {
		trace!("Adding entity: {}", def.name);

		let orderable_name = orderable_name_for_entity(&def.name);
		let mut orderable = Enum::new(&orderable_name).item("id").description(format!(
			"Generated from `{}` the fields which a query can be ordered by",
			def.name
		));
		let order_name = order_name_for_entity(&def.name);
		let order_input = InputObject::new(&order_name)
			.description(format!(
				"Generated from `{}` an object representing a query ordering",
				def.name
			))
			.field(InputValue::new("asc", TypeRef::named(&orderable_name)))
			.field(InputValue::new("desc", TypeRef::named(&orderable_name)))
			.field(InputValue::new("then", TypeRef::named(&order_name)));

		let filter_name = filter_name_for_entity(&def.name);
		let mut entity_filter = InputObject::new(&filter_name)
			.field(InputValue::new("id", TypeRef::named("_filter_id")))
			.field(InputValue::new("and", TypeRef::named_nn_list(&filter_name)))
			.field(InputValue::new("or", TypeRef::named_nn_list(&filter_name)))
			.field(InputValue::new("not", TypeRef::named(&filter_name)));

		let def1 = def.clone();
		let source1 = source.clone();
		query = query.field(
			Field::new(def.name.clone(), TypeRef::named_nn_list_nn(def.name.clone()), move |ctx| {
				let def = def1.clone();
				let source = source1.clone();
				FieldFuture::new(async move {
					let args = ctx.args.as_index_map();
					trace!("received request with args: {args:?}");

					let listing = listing_from_args(&def, args, None)?;
					let records = source.listing(&def, listing).await?;

					Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
				})
			})
			.description(listing_description(def))
			.argument(limit_input!())
			.argument(start_input!())
			.argument(InputValue::new("order", TypeRef::named(&order_name)))
			.argument(InputValue::new("filter", TypeRef::named(&filter_name))),
		);

		let def2 = def.clone();
		let source2 = source.clone();
		query = query.field(
			Field::new(format!("_get_{}", def.name), TypeRef::named(def.name.clone()), move |ctx| {
				let def = def2.clone();
				let source = source2.clone();
				FieldFuture::new(async move {
					let args = ctx.args.as_index_map();
					let id = args.get("id").and_then(|v| v.as_string());
					let slug = args.get("slug").and_then(|v| v.as_string());
					if id.is_none() && slug.is_none() {
						return Err(resolver_error("either id or slug must be provided").into());
					}

					match source.single(&def, Lookup::Args { id, slug }).await? {
						Some(record) => Ok(Some(FieldValue::owned_any(record))),
						None => Ok(None),
					}
				})
			})
			.description(single_description(def))
			.argument(id_input!())
			.argument(slug_input!()),
		);

		let mut entity_obj = Object::new(def.name.clone())
			.field(Field::new("id", TypeRef::named_nn(TypeRef::ID), make_id_resolver()))
			.implement("record");
		if let Some(desc) = &def.description {
			entity_obj = entity_obj.description(desc);
		}

		let filter_kinds = def.filter_kinds();

		for field in def.fields.iter().filter(|f| f.is_exposed()) {
			let exposed = field.exposed_name();
			if exposed == "id" {
				// The implicit id field wins.
				continue;
			}

			if field.kind.is_relationship() {
				let target_name = field.kind.record_target().expect("relationship kinds name a target");
				let target = by_name
					.get(target_name)
					.ok_or_else(|| GqlError::UnknownEntity(target_name.to_owned()))?;

				let relation_field = match field.kind.non_optional() {
					Kind::Record(_) => single_relation_field(&exposed, field, target, source),
					_ => listing_relation_field(&exposed, field, target, source),
				};
				entity_obj = entity_obj.field(relation_field);
				continue;
			}

			if field.kind.has_record() {
				// Relationship-shaped but not classifiable as single or list.
				return Err(schema_error(format!(
					"cannot classify field `{}` on `{}`: unsupported kind {}",
					exposed, def.name, field.kind
				)));
			}

			let fd_type = kind_to_type(&field.kind)?;
			orderable = orderable.item(exposed.clone());

			if let Some(fk) = filter_kinds.get(&exposed) {
				entity_filter = entity_filter
					.field(InputValue::new(exposed.clone(), TypeRef::named(fk.filter_type_name())));
			}

			let mut scalar_field =
				Field::new(exposed, fd_type, make_field_resolver(field.name.clone()));
			if let Some(comment) = &field.comment {
				scalar_field = scalar_field.description(comment);
			}
			entity_obj = entity_obj.field(scalar_field);
		}

		types.push(Type::Object(entity_obj));
		types.push(order_input.into());
		types.push(Type::Enum(orderable));
		types.push(Type::InputObject(entity_filter));
	}

	Ok(query)
}

/// A single relationship field: the parent record's referencing value is
/// handed to the source untouched.
fn single_relation_field<S: DataSource>(
	exposed: &str,
	field: &FieldDefinition,
	target: &Arc<EntityDefinition>,
	source: &Arc<S>,
) -> Field {
	let target1 = target.clone();
	let source1 = source.clone();
	let storage = field.name.clone();
	Field::new(exposed, TypeRef::named(target.name.clone()), move |ctx| {
		let target = target1.clone();
		let source = source1.clone();
		let storage = storage.clone();
		FieldFuture::new(async move {
			let value = parent_field_value(&ctx, &storage)?;
			match source
				.single(
					&target,
					Lookup::Relation {
						field: storage,
						value,
					},
				)
				.await?
			{
				Some(record) => Ok(Some(FieldValue::owned_any(record))),
				None => Ok(None),
			}
		})
	})
	.description(single_description(target))
}

/// A list relationship field, carrying the full listing argument set of the
/// target entity plus the parent relation context.
fn listing_relation_field<S: DataSource>(
	exposed: &str,
	field: &FieldDefinition,
	target: &Arc<EntityDefinition>,
	source: &Arc<S>,
) -> Field {
	let target1 = target.clone();
	let source1 = source.clone();
	let storage = field.name.clone();
	Field::new(exposed, TypeRef::named_nn_list(target.name.clone()), move |ctx| {
		let target = target1.clone();
		let source = source1.clone();
		let storage = storage.clone();
		FieldFuture::new(async move {
			let value = parent_field_value(&ctx, &storage)?;
			let args = ctx.args.as_index_map();
			trace!("received request with args: {args:?}");

			let relation = Relation {
				field: storage,
				value,
			};
			let listing = listing_from_args(&target, args, Some(relation))?;
			let records = source.listing(&target, listing).await?;

			Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
		})
	})
	.description(listing_description(target))
	.argument(limit_input!())
	.argument(start_input!())
	.argument(InputValue::new("order", TypeRef::named(order_name_for_entity(&target.name))))
	.argument(InputValue::new("filter", TypeRef::named(filter_name_for_entity(&target.name))))
}

fn make_field_resolver(
	fd_name: impl Into<String>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	let fd_name = fd_name.into();
	move |ctx: ResolverContext| {
		let fd_name = fd_name.clone();
		FieldFuture::new(async move {
			let record = parent_record(&ctx)?;
			match record.get(&fd_name) {
				None | Some(JsonValue::Null) => Ok(None),
				Some(v) => Ok(Some(FieldValue::value(json_value_to_gql_value(v.clone())))),
			}
		})
	}
}

fn make_id_resolver(
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		FieldFuture::new(async move {
			let record = parent_record(&ctx)?;
			let id = record
				.get("id")
				.ok_or_else(|| internal_error(format!("record has no id: {record:?}")))?;
			Ok(Some(FieldValue::value(json_value_to_gql_value(id.clone()))))
		})
	}
}

fn parent_record<'a>(
	ctx: &'a ResolverContext<'_>,
) -> Result<&'a serde_json::Map<String, JsonValue>, GqlError> {
	let record = ctx
		.parent_value
		.downcast_ref::<JsonValue>()
		.ok_or_else(|| internal_error("failed to downcast record"))?;
	record
		.as_object()
		.ok_or_else(|| internal_error(format!("record should be an object, but found: {record:?}")))
}

fn parent_field_value(ctx: &ResolverContext<'_>, storage: &str) -> Result<JsonValue, GqlError> {
	Ok(parent_record(ctx)?.get(storage).cloned().unwrap_or(JsonValue::Null))
}

/// Parse the argument set of a listing field against the entity it targets.
fn listing_from_args(
	def: &EntityDefinition,
	args: &IndexMap<Name, GqlValue>,
	relation: Option<Relation>,
) -> Result<Listing, GqlError> {
	let start = args.get("start").and_then(|v| v.as_i64());
	let limit = args.get("limit").and_then(|v| v.as_i64());

	let order = orders_from_arg(def, args.get("order"))?;
	trace!("parsed orders: {order:?}");

	let filter = match args.get("filter") {
		Some(f) => {
			let o = match f.as_object() {
				Some(o) => o,
				None => {
					error!("Found filter {f}, which should be an object and should have been rejected by the engine.");
					return Err(GqlError::InternalError("Value in filter doesn't fit schema".to_owned()));
				}
			};
			Some(cond_from_filter(o, def)?)
		}
		None => None,
	};
	trace!("parsed filter: {filter:?}");

	Ok(Listing {
		start,
		limit,
		order,
		filter,
		relation,
	})
}

fn orders_from_arg(
	def: &EntityDefinition,
	arg: Option<&GqlValue>,
) -> Result<Vec<Order>, GqlError> {
	let Some(GqlValue::Object(o)) = arg else {
		return Ok(Vec::new());
	};
	let mut orders = vec![];
	let mut current = o;
	loop {
		let asc = current.get("asc");
		let desc = current.get("desc");
		match (asc, desc) {
			(Some(_), Some(_)) => {
				return Err(resolver_error("Found both asc and desc in order"));
			}
			(Some(GqlValue::Enum(a)), None) => {
				orders.push(order_for(def, a.as_str(), OrderDirection::Asc)?);
			}
			(None, Some(GqlValue::Enum(d))) => {
				orders.push(order_for(def, d.as_str(), OrderDirection::Desc)?);
			}
			(_, _) => {
				break;
			}
		}
		if let Some(GqlValue::Object(next)) = current.get("then") {
			current = next;
		} else {
			break;
		}
	}
	Ok(orders)
}

fn order_for(
	def: &EntityDefinition,
	exposed: &str,
	direction: OrderDirection,
) -> Result<Order, GqlError> {
	let field = if exposed == "id" {
		"id".to_owned()
	} else {
		def.field_by_name(exposed)
			.map(|f| f.name.clone())
			.ok_or_else(|| internal_error(format!("unknown order field: {exposed}")))?
	};
	Ok(Order {
		field,
		direction,
	})
}

/// Parse a filter argument object into a condition tree. Field conditions
/// carry storage names and kind-checked values.
fn cond_from_filter(
	filter: &IndexMap<Name, GqlValue>,
	def: &EntityDefinition,
) -> Result<FilterExpr, GqlError> {
	if filter.len() != 1 {
		return Err(resolver_error("Filter must have one item"));
	}

	let (k, v) = filter.iter().next().expect("filter has exactly one item");

	match k.as_str().to_lowercase().as_str() {
		"or" => aggregate(v, AggregateOp::Or, def),
		"and" => aggregate(v, AggregateOp::And, def),
		"not" => negate(v, def),
		_ => binop(k.as_str(), v, def),
	}
}

fn parse_op(name: impl AsRef<str>) -> Result<FilterOp, GqlError> {
	match name.as_ref() {
		"eq" => Ok(FilterOp::Eq),
		"ne" => Ok(FilterOp::Ne),
		op => Err(resolver_error(format!("Unsupported op: {op}"))),
	}
}

fn negate(filter: &GqlValue, def: &EntityDefinition) -> Result<FilterExpr, GqlError> {
	let obj = filter.as_object().ok_or(resolver_error("Value of NOT must be object"))?;
	let inner = cond_from_filter(obj, def)?;

	Ok(FilterExpr::Not(Box::new(inner)))
}

enum AggregateOp {
	And,
	Or,
}

fn aggregate(
	filter: &GqlValue,
	op: AggregateOp,
	def: &EntityDefinition,
) -> Result<FilterExpr, GqlError> {
	let op_str = match op {
		AggregateOp::And => "AND",
		AggregateOp::Or => "OR",
	};
	let list = filter
		.as_list()
		.ok_or(resolver_error(format!("Value of {op_str} should be a list")))?;
	let conds = list
		.iter()
		.map(|v| v.as_object().map(|o| cond_from_filter(o, def)))
		.collect::<Option<Result<Vec<FilterExpr>, GqlError>>>()
		.ok_or(resolver_error(format!("List of {op_str} should contain objects")))??;

	if conds.is_empty() {
		return Err(resolver_error(format!(
			"List of {op_str} should contain at least one object"
		)));
	}

	Ok(match op {
		AggregateOp::And => FilterExpr::And(conds),
		AggregateOp::Or => FilterExpr::Or(conds),
	})
}

fn binop(field_name: &str, val: &GqlValue, def: &EntityDefinition) -> Result<FilterExpr, GqlError> {
	let obj = val.as_object().ok_or(resolver_error("Field filter should be object"))?;

	if obj.len() != 1 {
		return Err(resolver_error("Field filter must have one item"));
	}

	let (field, kind) = if field_name == "id" {
		("id".to_owned(), Kind::Any)
	} else {
		let fd = def
			.field_by_name(field_name)
			.ok_or_else(|| resolver_error(format!("Field `{field_name}` not found")))?;
		(fd.name.clone(), fd.kind.clone())
	};

	let (k, v) = obj.iter().next().expect("field filter has exactly one item");
	let op = parse_op(k)?;
	let value = gql_to_json_kind(v, &kind)?;

	Ok(FilterExpr::Cond {
		field,
		op,
		value,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::FieldDefinition;
	use serde_json::json;

	fn post() -> EntityDefinition {
		EntityDefinition::new("post")
			.field(FieldDefinition::new("Title", Kind::String).filterable())
			.field(FieldDefinition::new("Views", Kind::Int).filterable())
			.field(FieldDefinition::new("CreatedAt", Kind::Datetime).rename("published").filterable())
	}

	fn obj(entries: Vec<(&str, GqlValue)>) -> IndexMap<Name, GqlValue> {
		entries.into_iter().map(|(k, v)| (Name::new(k), v)).collect()
	}

	fn eq_filter(field: &str, value: GqlValue) -> IndexMap<Name, GqlValue> {
		obj(vec![(field, GqlValue::Object(obj(vec![("eq", value)])))])
	}

	#[test]
	fn field_condition_maps_to_storage_name() {
		let def = post();
		let filter = eq_filter("published", GqlValue::String("2024-01-01T00:00:00Z".to_owned()));
		let cond = cond_from_filter(&filter, &def).unwrap();
		assert_eq!(
			cond,
			FilterExpr::Cond {
				field: "CreatedAt".to_owned(),
				op: FilterOp::Eq,
				value: json!("2024-01-01T00:00:00Z"),
			}
		);
	}

	#[test]
	fn values_are_checked_against_field_kinds() {
		let def = post();
		let filter = eq_filter("views", GqlValue::String("many".to_owned()));
		assert!(matches!(
			cond_from_filter(&filter, &def),
			Err(GqlError::TypeError { .. })
		));
	}

	#[test]
	fn aggregates_nest() {
		let def = post();
		let filter = obj(vec![(
			"and",
			GqlValue::List(vec![
				GqlValue::Object(eq_filter("title", GqlValue::String("intro".to_owned()))),
				GqlValue::Object(obj(vec![(
					"not",
					GqlValue::Object(eq_filter("views", GqlValue::Number(10.into()))),
				)])),
			]),
		)]);
		let cond = cond_from_filter(&filter, &def).unwrap();
		let FilterExpr::And(conds) = cond else {
			panic!("expected and");
		};
		assert_eq!(conds.len(), 2);
		assert!(matches!(conds[0], FilterExpr::Cond { .. }));
		assert!(matches!(conds[1], FilterExpr::Not(_)));
	}

	#[test]
	fn empty_aggregates_are_rejected() {
		let def = post();
		let filter = obj(vec![("or", GqlValue::List(vec![]))]);
		assert!(cond_from_filter(&filter, &def).is_err());
	}

	#[test]
	fn multi_key_filters_are_rejected() {
		let def = post();
		let mut filter = eq_filter("title", GqlValue::String("a".to_owned()));
		filter.extend(eq_filter("views", GqlValue::Number(1.into())));
		assert!(cond_from_filter(&filter, &def).is_err());
	}

	#[test]
	fn unknown_fields_and_ops_are_rejected() {
		let def = post();
		let unknown = eq_filter("missing", GqlValue::String("a".to_owned()));
		assert!(cond_from_filter(&unknown, &def).is_err());

		let bad_op = obj(vec![(
			"title",
			GqlValue::Object(obj(vec![("gt", GqlValue::String("a".to_owned()))])),
		)]);
		assert!(matches!(
			cond_from_filter(&bad_op, &def),
			Err(GqlError::ResolverError(msg)) if msg.contains("Unsupported op")
		));
	}

	#[test]
	fn id_conditions_pass_values_through() {
		let def = post();
		let filter = eq_filter("id", GqlValue::String("post:1".to_owned()));
		let cond = cond_from_filter(&filter, &def).unwrap();
		assert_eq!(
			cond,
			FilterExpr::Cond {
				field: "id".to_owned(),
				op: FilterOp::Eq,
				value: json!("post:1"),
			}
		);
	}

	#[test]
	fn order_chains_walk_then_links() {
		let def = post();
		let order = GqlValue::Object(obj(vec![
			("asc", GqlValue::Enum(Name::new("published"))),
			(
				"then",
				GqlValue::Object(obj(vec![("desc", GqlValue::Enum(Name::new("views")))])),
			),
		]));
		let orders = orders_from_arg(&def, Some(&order)).unwrap();
		assert_eq!(
			orders,
			vec![
				Order {
					field: "CreatedAt".to_owned(),
					direction: OrderDirection::Asc,
				},
				Order {
					field: "Views".to_owned(),
					direction: OrderDirection::Desc,
				},
			]
		);
	}

	#[test]
	fn ambiguous_order_links_are_rejected() {
		let def = post();
		let order = GqlValue::Object(obj(vec![
			("asc", GqlValue::Enum(Name::new("views"))),
			("desc", GqlValue::Enum(Name::new("views"))),
		]));
		assert!(orders_from_arg(&def, Some(&order)).is_err());
	}

	#[test]
	fn missing_order_is_empty() {
		let def = post();
		assert!(orders_from_arg(&def, None).unwrap().is_empty());
	}
}
