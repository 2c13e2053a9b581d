//! # Modelgraph
//!
//! This crate generates an executable GraphQL schema from registered
//! data-model definitions. Applications describe their entities as field
//! metadata, supply a [`DataSource`](crate::source::DataSource) for record
//! resolution, and receive an [`async_graphql::dynamic::Schema`] with scalar
//! fields, filter inputs, ordering inputs, and relationship fields wired to
//! the source.
//!
//! Query execution, validation and resolution are delegated entirely to the
//! underlying GraphQL engine and to the supplied data source; this crate is
//! the translation pass in between.

#[macro_use]
extern crate tracing;

pub mod cache;
mod entities;
pub mod error;
mod ext;
pub mod kind;
pub mod model;
pub mod schema;
pub mod source;
mod utils;

pub use cache::{Invalidator, Optimistic, Pessimistic, SchemaCache};
pub use error::GqlError;
pub use kind::{FilterKind, Kind};
pub use model::{
	Describe, EntitiesConfig, EntityDefinition, EntityRegistry, FieldDefinition, SchemaConfig,
};
pub use schema::generate_schema;
pub use source::{
	DataSource, FilterExpr, FilterOp, Listing, Lookup, Order, OrderDirection, Relation,
};
