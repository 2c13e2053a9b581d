use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kind::{FilterKind, Kind};

/// The declared shape of a single entity field.
///
/// `name` is the storage name: the key under which the field appears in the
/// records a [`DataSource`](crate::source::DataSource) returns. The name the
/// schema exposes is derived from it (or from `rename`) by lowercasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
	pub name: String,
	pub kind: Kind,
	/// Overrides the exposed field name, like a serialization tag would.
	pub rename: Option<String>,
	/// Whether the field participates in filter generation.
	pub filterable: bool,
	/// Hidden fields are kept in the definition but never exposed.
	pub hidden: bool,
	pub comment: Option<String>,
}

impl FieldDefinition {
	pub fn new(name: impl Into<String>, kind: Kind) -> Self {
		FieldDefinition {
			name: name.into(),
			kind,
			rename: None,
			filterable: false,
			hidden: false,
			comment: None,
		}
	}

	pub fn rename(mut self, name: impl Into<String>) -> Self {
		self.rename = Some(name.into());
		self
	}

	pub fn filterable(mut self) -> Self {
		self.filterable = true;
		self
	}

	pub fn hidden(mut self) -> Self {
		self.hidden = true;
		self
	}

	pub fn comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = Some(comment.into());
		self
	}

	/// The name the schema exposes for this field.
	///
	/// An empty exposed name marks the field as skipped, as does `hidden`.
	pub fn exposed_name(&self) -> String {
		match &self.rename {
			Some(rename) => rename.to_lowercase(),
			None => self.name.to_lowercase(),
		}
	}

	pub(crate) fn is_exposed(&self) -> bool {
		!self.hidden && !self.exposed_name().is_empty()
	}
}

/// A registered data-model entity: a name, an optional description, and its
/// field definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
	pub name: String,
	pub description: Option<String>,
	pub fields: Vec<FieldDefinition>,
}

impl EntityDefinition {
	pub fn new(name: impl Into<String>) -> Self {
		EntityDefinition {
			name: name.into().to_lowercase(),
			description: None,
			fields: Vec::new(),
		}
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn field(mut self, field: FieldDefinition) -> Self {
		self.fields.push(field);
		self
	}

	/// Look up a field by its exposed name.
	pub fn field_by_name(&self, exposed: &str) -> Option<&FieldDefinition> {
		self.fields.iter().find(|f| f.is_exposed() && f.exposed_name() == exposed)
	}

	/// Exposed field name to filter class, for every visible filterable
	/// field whose kind admits one.
	pub fn filter_kinds(&self) -> BTreeMap<String, FilterKind> {
		let mut filters = BTreeMap::new();
		for field in self.fields.iter().filter(|f| f.is_exposed() && f.filterable) {
			if let Some(fk) = FilterKind::for_kind(&field.kind) {
				filters.insert(field.exposed_name(), fk);
			}
		}
		filters
	}
}

/// Implemented by model types that can hand back their own definition.
pub trait Describe {
	fn describe() -> EntityDefinition;
}

/// An ordered collection of entity definitions.
///
/// The registry tracks a generation counter, bumped on every mutation, which
/// the schema cache uses for invalidation.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
	entities: BTreeMap<String, Arc<EntityDefinition>>,
	generation: u64,
}

impl EntityRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a definition, like redefining a table would.
	pub fn define(&mut self, def: EntityDefinition) -> Arc<EntityDefinition> {
		let def = Arc::new(def);
		self.entities.insert(def.name.clone(), def.clone());
		self.generation += 1;
		def
	}

	pub fn register<T: Describe>(&mut self) -> Arc<EntityDefinition> {
		self.define(T::describe())
	}

	pub fn remove(&mut self, name: &str) -> Option<Arc<EntityDefinition>> {
		let removed = self.entities.remove(name);
		if removed.is_some() {
			self.generation += 1;
		}
		removed
	}

	pub fn get(&self, name: &str) -> Option<&Arc<EntityDefinition>> {
		self.entities.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityDefinition>> {
		self.entities.values()
	}

	pub fn len(&self) -> usize {
		self.entities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Which registered entities the generated schema covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitiesConfig {
	#[default]
	Auto,
	None,
	Include(Vec<String>),
	Exclude(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
	#[serde(default)]
	pub entities: EntitiesConfig,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn post() -> EntityDefinition {
		EntityDefinition::new("Post")
			.description("A published article")
			.field(FieldDefinition::new("Title", Kind::String).filterable())
			.field(FieldDefinition::new("Views", Kind::Int).filterable())
			.field(FieldDefinition::new("Draft", Kind::Bool))
			.field(FieldDefinition::new("Internal", Kind::String).hidden())
			.field(FieldDefinition::new("CreatedAt", Kind::Datetime).rename("published").filterable())
			.field(FieldDefinition::new("Author", Kind::Record("author".to_owned())))
	}

	#[test]
	fn names_are_lowercased() {
		let def = post();
		assert_eq!(def.name, "post");
		assert_eq!(def.fields[0].exposed_name(), "title");
		assert_eq!(def.fields[4].exposed_name(), "published");
	}

	#[test]
	fn field_lookup_uses_exposed_names() {
		let def = post();
		assert_eq!(def.field_by_name("published").map(|f| f.name.as_str()), Some("CreatedAt"));
		assert!(def.field_by_name("internal").is_none());
		assert!(def.field_by_name("createdat").is_none());
	}

	#[test]
	fn filter_kinds_cover_filterable_scalar_fields_only() {
		let filters = post().filter_kinds();
		assert_eq!(filters.get("title"), Some(&FilterKind::String));
		assert_eq!(filters.get("views"), Some(&FilterKind::Int));
		assert_eq!(filters.get("published"), Some(&FilterKind::Datetime));
		// Not filterable, hidden, or a relationship.
		assert!(!filters.contains_key("draft"));
		assert!(!filters.contains_key("internal"));
		assert!(!filters.contains_key("author"));
		assert_eq!(filters.len(), 3);
	}

	#[test]
	fn registry_bumps_generation_on_mutation() {
		let mut registry = EntityRegistry::new();
		assert_eq!(registry.generation(), 0);
		registry.define(post());
		assert_eq!(registry.generation(), 1);
		// Redefinition replaces and still counts as a change.
		registry.define(EntityDefinition::new("post"));
		assert_eq!(registry.generation(), 2);
		assert_eq!(registry.len(), 1);
		assert!(registry.remove("post").is_some());
		assert!(registry.remove("post").is_none());
		assert_eq!(registry.generation(), 3);
	}

	#[test]
	fn register_through_describe() {
		struct Author;
		impl Describe for Author {
			fn describe() -> EntityDefinition {
				EntityDefinition::new("author").field(FieldDefinition::new("name", Kind::String))
			}
		}
		let mut registry = EntityRegistry::new();
		registry.register::<Author>();
		assert!(registry.get("author").is_some());
	}
}
