//! The type registry the analyzer queries while walking an operation.
//!
//! A [`Schema`] is built once from SDL, is immutable afterwards and can be
//! shared between any number of concurrent validation passes.

mod directives;
mod from_sdl;

use std::collections::HashMap;

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::ConstValue;
use indexmap::IndexMap;

use crate::{CostAnnotation, QueryComplexity};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to parse schema: {0}")]
    Parse(#[from] async_graphql_parser::Error),
    #[error("type \"{0}\" is defined more than once")]
    DuplicateType(String),
    #[error("the schema has no query root type")]
    MissingQueryType,
    #[error("the {operation} root type \"{name}\" is not defined")]
    UnknownRootType { operation: &'static str, name: String },
    #[error("invalid @{directive} on {location}: {message}")]
    InvalidDirective {
        directive: &'static str,
        location: String,
        message: String,
    },
}

#[derive(Debug)]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    types: IndexMap<String, TypeDefinition>,
    /// Interface name to the object types implementing it, in declaration order.
    implementations: HashMap<String, Vec<String>>,
    analyzer: Option<QueryComplexity>,
}

impl Schema {
    /// Builds a schema from SDL. Cost directives are read from field and type definitions.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        from_sdl::from_sdl(sdl)
    }

    /// Attaches the complexity analyzer used by [`crate::validate`].
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: QueryComplexity) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn analyzer(&self) -> Option<&QueryComplexity> {
        self.analyzer.as_ref()
    }

    pub fn query_type(&self) -> Option<&TypeDefinition> {
        self.lookup_type(&self.query_type)
    }

    pub fn mutation_type(&self) -> Option<&TypeDefinition> {
        self.mutation_type.as_deref().and_then(|name| self.lookup_type(name))
    }

    pub fn subscription_type(&self) -> Option<&TypeDefinition> {
        self.subscription_type.as_deref().and_then(|name| self.lookup_type(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// The concrete object types implementing an interface.
    ///
    /// Yields nothing for any other kind of type.
    pub fn implementations<'a>(&'a self, ty: &TypeDefinition) -> impl Iterator<Item = &'a TypeDefinition> + 'a {
        let names = match ty.kind {
            TypeKind::Interface => self.implementations.get(&ty.name),
            _ => None,
        };

        names
            .into_iter()
            .flatten()
            .filter_map(|name| self.lookup_type(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

#[derive(Debug)]
pub struct TypeDefinition {
    name: String,
    kind: TypeKind,
    fields: IndexMap<String, FieldDefinition>,
    interfaces: Vec<String>,
    members: Vec<String>,
    cost: Option<CostAnnotation>,
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_union(&self) -> bool {
        self.kind == TypeKind::Union
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(String::as_str)
    }

    /// Members of a union, empty for other kinds.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn cost(&self) -> Option<&CostAnnotation> {
        self.cost.as_ref()
    }
}

#[derive(Debug)]
pub struct FieldDefinition {
    name: String,
    ty: Type,
    arguments: IndexMap<String, InputValueDefinition>,
    cost: Option<CostAnnotation>,
}

impl FieldDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Name of the innermost type, with list and non-null wrappers removed.
    pub fn named_type(&self) -> &str {
        named_type(&self.ty)
    }

    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> impl Iterator<Item = &InputValueDefinition> {
        self.arguments.values()
    }

    pub fn cost(&self) -> Option<&CostAnnotation> {
        self.cost.as_ref()
    }
}

#[derive(Debug)]
pub struct InputValueDefinition {
    name: String,
    ty: Type,
    default_value: Option<ConstValue>,
}

impl InputValueDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&ConstValue> {
        self.default_value.as_ref()
    }
}

pub(crate) fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}
