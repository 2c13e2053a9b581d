use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GqlError;
use crate::model::{EntityRegistry, SchemaConfig};
use crate::schema::generate_schema;
use crate::source::DataSource;

/// Decides whether a cached schema may still be served.
#[async_trait]
pub trait Invalidator: Debug + Clone + Send + Sync + 'static {
	type MetaData: Debug + Clone + Send + Sync;

	fn is_valid(registry: &EntityRegistry, meta: &Self::MetaData) -> bool;

	async fn generate<S: DataSource>(
		registry: &EntityRegistry,
		config: &SchemaConfig,
		source: &Arc<S>,
	) -> Result<(Schema, Self::MetaData), GqlError>;
}

/// Never serves a cached schema: regenerates on every access.
#[derive(Debug, Clone, Copy)]
pub struct Pessimistic;

#[async_trait]
impl Invalidator for Pessimistic {
	type MetaData = ();

	fn is_valid(_registry: &EntityRegistry, _meta: &Self::MetaData) -> bool {
		false
	}

	async fn generate<S: DataSource>(
		registry: &EntityRegistry,
		config: &SchemaConfig,
		source: &Arc<S>,
	) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generate_schema(registry, config, source.clone())?;
		Ok((schema, ()))
	}
}

/// Serves the cached schema while the registry generation is unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Optimistic;

#[async_trait]
impl Invalidator for Optimistic {
	type MetaData = u64;

	fn is_valid(registry: &EntityRegistry, meta: &Self::MetaData) -> bool {
		registry.generation() == *meta
	}

	async fn generate<S: DataSource>(
		registry: &EntityRegistry,
		config: &SchemaConfig,
		source: &Arc<S>,
	) -> Result<(Schema, Self::MetaData), GqlError> {
		let schema = generate_schema(registry, config, source.clone())?;
		Ok((schema, registry.generation()))
	}
}

/// A generated-schema cache over a shared entity registry.
pub struct SchemaCache<S: DataSource, I: Invalidator = Pessimistic> {
	inner: Arc<RwLock<Option<(Schema, I::MetaData)>>>,
	registry: Arc<RwLock<EntityRegistry>>,
	config: SchemaConfig,
	source: Arc<S>,
	_invalidator: PhantomData<I>,
}

impl<S: DataSource, I: Invalidator> Clone for SchemaCache<S, I> {
	fn clone(&self) -> Self {
		SchemaCache {
			inner: self.inner.clone(),
			registry: self.registry.clone(),
			config: self.config.clone(),
			source: self.source.clone(),
			_invalidator: PhantomData,
		}
	}
}

impl<S: DataSource, I: Invalidator> Debug for SchemaCache<S, I> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache")
			.field("config", &self.config)
			.field("_invalidator", &self._invalidator)
			.finish_non_exhaustive()
	}
}

impl<S: DataSource, I: Invalidator> SchemaCache<S, I> {
	pub fn new(registry: EntityRegistry, config: SchemaConfig, source: Arc<S>) -> Self {
		SchemaCache {
			inner: Default::default(),
			registry: Arc::new(RwLock::new(registry)),
			config,
			source,
			_invalidator: PhantomData,
		}
	}

	/// The shared registry handle. Mutations bump the generation, which the
	/// invalidator observes.
	pub fn registry(&self) -> &Arc<RwLock<EntityRegistry>> {
		&self.registry
	}

	pub async fn get_schema(&self) -> Result<Schema, GqlError> {
		{
			let guard = self.inner.read().await;
			if let Some((schema, meta)) = guard.as_ref() {
				let registry = self.registry.read().await;
				if I::is_valid(&registry, meta) {
					return Ok(schema.clone());
				}
			}
		}

		let (schema, meta) = {
			let registry = self.registry.read().await;
			I::generate(&registry, &self.config, &self.source).await?
		};

		{
			let mut guard = self.inner.write().await;
			*guard = Some((schema.clone(), meta));
		}

		Ok(schema)
	}
}
