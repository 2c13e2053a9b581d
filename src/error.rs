use thiserror::Error;

use crate::kind::Kind;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("Error converting value: {val} to type: {target}")]
	TypeError {
		target: Kind,
		val: async_graphql::Value,
	},
	#[error("No entity named `{0}` is registered")]
	UnknownEntity(String),
	#[error("GraphQL generation is not enabled by the current configuration")]
	NotConfigured,
	#[error("Data source error: {0}")]
	SourceError(String),
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}
pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

pub fn type_error(kind: Kind, val: &async_graphql::Value) -> GqlError {
	GqlError::TypeError {
		target: kind,
		val: val.to_owned(),
	}
}

pub fn source_error(msg: impl Into<String>) -> GqlError {
	GqlError::SourceError(msg.into())
}
