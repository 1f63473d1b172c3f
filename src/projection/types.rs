//! Generated API description structures
//!
//! The five-part contract consumed by the external GraphQL-SDL emitter and
//! resolver binder. Maps are BTree-keyed and field lists keep declaration
//! order, so projecting the same compiled model twice yields identical
//! output.

use serde::Serialize;
use std::collections::BTreeMap;

/// One field of a generated object or input type. `field_type` is the
/// rendered type name including non-null/list wrappers, e.g. `[String!]`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiField {
    pub name: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiObjectType {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub fields: Vec<ApiField>,
}

/// A synthesized polymorphic output type standing in for one of several
/// possible referenced entity types. Members are sorted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiUnionType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiInputType {
    pub name: String,
    pub fields: Vec<ApiField>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiArgument {
    pub name: String,
    pub arg_type: String,
}

/// A generated query or mutation signature.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiOperation {
    pub name: String,
    pub arguments: Vec<ApiArgument>,
    pub return_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Complete projected API description.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ApiDescription {
    pub types: BTreeMap<String, ApiObjectType>,
    pub union_types: BTreeMap<String, ApiUnionType>,
    pub inputs: BTreeMap<String, ApiInputType>,
    pub queries: BTreeMap<String, ApiOperation>,
    pub mutations: BTreeMap<String, ApiOperation>,
}
