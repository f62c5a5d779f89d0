use std::collections::HashMap;

use async_graphql_parser::{types as ast, Positioned};
use indexmap::{map::Entry, IndexMap};

use super::{directives::cost_annotation, *};

const DEFAULT_QUERY_TYPE: &str = "Query";
const DEFAULT_MUTATION_TYPE: &str = "Mutation";
const DEFAULT_SUBSCRIPTION_TYPE: &str = "Subscription";
const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Default)]
struct State {
    types: IndexMap<String, TypeDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

pub(super) fn from_sdl(sdl: &str) -> Result<Schema, SchemaError> {
    let document = async_graphql_parser::parse_schema(sdl)?;
    let mut state = State::default();

    for definition in document.definitions {
        match definition {
            ast::TypeSystemDefinition::Schema(schema_definition) => {
                ingest_schema_definition(schema_definition.node, &mut state);
            }
            ast::TypeSystemDefinition::Type(type_definition) => {
                ingest_type_definition(type_definition.node, &mut state)?;
            }
            ast::TypeSystemDefinition::Directive(_) => (),
        }
    }

    for scalar in BUILTIN_SCALARS {
        state
            .types
            .entry(scalar.to_string())
            .or_insert_with(|| TypeDefinition {
                name: scalar.to_string(),
                kind: TypeKind::Scalar,
                fields: IndexMap::new(),
                interfaces: Vec::new(),
                members: Vec::new(),
                cost: None,
            });
    }

    let query_type = root_type(&state, "query", state.query_type.clone(), DEFAULT_QUERY_TYPE)?
        .ok_or(SchemaError::MissingQueryType)?;
    let mutation_type = root_type(&state, "mutation", state.mutation_type.clone(), DEFAULT_MUTATION_TYPE)?;
    let subscription_type = root_type(
        &state,
        "subscription",
        state.subscription_type.clone(),
        DEFAULT_SUBSCRIPTION_TYPE,
    )?;

    let mut implementations: HashMap<String, Vec<String>> = HashMap::new();

    for ty in state.types.values().filter(|ty| ty.kind == TypeKind::Object) {
        for interface in &ty.interfaces {
            implementations
                .entry(interface.clone())
                .or_default()
                .push(ty.name.clone());
        }
    }

    Ok(Schema {
        query_type,
        mutation_type,
        subscription_type,
        types: state.types,
        implementations,
        analyzer: None,
    })
}

/// An explicitly declared root type must exist, a conventional one is optional.
fn root_type(
    state: &State,
    operation: &'static str,
    declared: Option<String>,
    conventional: &str,
) -> Result<Option<String>, SchemaError> {
    match declared {
        Some(name) if state.types.contains_key(&name) => Ok(Some(name)),
        Some(name) => Err(SchemaError::UnknownRootType { operation, name }),
        None => Ok(state
            .types
            .contains_key(conventional)
            .then(|| conventional.to_string())),
    }
}

fn ingest_schema_definition(definition: ast::SchemaDefinition, state: &mut State) {
    let name = |name: Option<Positioned<async_graphql_value::Name>>| name.map(|name| name.node.to_string());

    if let Some(query) = name(definition.query) {
        state.query_type = Some(query);
    }

    if let Some(mutation) = name(definition.mutation) {
        state.mutation_type = Some(mutation);
    }

    if let Some(subscription) = name(definition.subscription) {
        state.subscription_type = Some(subscription);
    }
}

fn ingest_type_definition(definition: ast::TypeDefinition, state: &mut State) -> Result<(), SchemaError> {
    let name = definition.name.node.to_string();
    let cost = cost_annotation(&definition.directives, &name)?;

    let (kind, fields, interfaces, members) = match definition.kind {
        ast::TypeKind::Scalar => (TypeKind::Scalar, Vec::new(), Vec::new(), Vec::new()),
        ast::TypeKind::Object(object) => (TypeKind::Object, object.fields, object.implements, Vec::new()),
        ast::TypeKind::Interface(interface) => (
            TypeKind::Interface,
            interface.fields,
            interface.implements,
            Vec::new(),
        ),
        ast::TypeKind::Union(union) => (TypeKind::Union, Vec::new(), Vec::new(), union.members),
        ast::TypeKind::Enum(_) => (TypeKind::Enum, Vec::new(), Vec::new(), Vec::new()),
        ast::TypeKind::InputObject(_) => (TypeKind::InputObject, Vec::new(), Vec::new(), Vec::new()),
    };

    let fields = fields
        .into_iter()
        .map(|field| ingest_field_definition(&name, field.node))
        .collect::<Result<Vec<_>, _>>()?;

    let ty = match state.types.entry(name.clone()) {
        Entry::Occupied(entry) if definition.extend => entry.into_mut(),
        Entry::Occupied(_) => return Err(SchemaError::DuplicateType(name)),
        Entry::Vacant(entry) => entry.insert(TypeDefinition {
            name,
            kind,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            cost: None,
        }),
    };

    if ty.cost.is_none() {
        ty.cost = cost;
    }

    ty.fields
        .extend(fields.into_iter().map(|field| (field.name.clone(), field)));
    ty.interfaces
        .extend(interfaces.into_iter().map(|interface| interface.node.to_string()));
    ty.members
        .extend(members.into_iter().map(|member| member.node.to_string()));

    Ok(())
}

fn ingest_field_definition(parent: &str, field: ast::FieldDefinition) -> Result<FieldDefinition, SchemaError> {
    let name = field.name.node.to_string();
    let cost = cost_annotation(&field.directives, &format!("{parent}.{name}"))?;

    let arguments = field
        .arguments
        .into_iter()
        .map(|argument| {
            let argument = argument.node;
            let name = argument.name.node.to_string();
            let definition = InputValueDefinition {
                name: name.clone(),
                ty: argument.ty.node,
                default_value: argument.default_value.map(|value| value.node),
            };
            (name, definition)
        })
        .collect();

    Ok(FieldDefinition {
        name,
        ty: field.ty.node,
        arguments,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_root_types() {
        let schema = Schema::parse(
            r"
            type Query { a: Int }
            type Mutation { b: Int }
            ",
        )
        .unwrap();

        assert_eq!(schema.query_type().map(|ty| ty.name()), Some("Query"));
        assert_eq!(schema.mutation_type().map(|ty| ty.name()), Some("Mutation"));
        assert!(schema.subscription_type().is_none());
    }

    #[test]
    fn explicit_root_types() {
        let schema = Schema::parse(
            r"
            schema { query: Root }
            type Root { a: Int }
            ",
        )
        .unwrap();

        assert_eq!(schema.query_type().map(|ty| ty.name()), Some("Root"));
    }

    #[test]
    fn unknown_root_type() {
        let error = Schema::parse("schema { query: Root mutation: Nope } type Root { a: Int }").unwrap_err();

        insta::assert_snapshot!(error, @r###"the mutation root type "Nope" is not defined"###);
    }

    #[test]
    fn missing_query_type() {
        let error = Schema::parse("type Foo { a: Int }").unwrap_err();

        assert!(matches!(error, SchemaError::MissingQueryType));
    }

    #[test]
    fn duplicate_types() {
        let error = Schema::parse("type Query { a: Int } type Query { b: Int }").unwrap_err();

        insta::assert_snapshot!(error, @r###"type "Query" is defined more than once"###);
    }

    #[test]
    fn type_extensions_add_fields() {
        let schema = Schema::parse(
            r"
            type Query { a: Int }
            extend type Query { b: [String!]! }
            ",
        )
        .unwrap();

        let query = schema.query_type().unwrap();
        let fields = query.fields().map(|field| field.name()).collect::<Vec<_>>();

        assert_eq!(fields, ["a", "b"]);
        assert_eq!(query.field("b").unwrap().named_type(), "String");
        assert_eq!(
            schema.lookup_type("String").map(|ty| ty.kind()),
            Some(TypeKind::Scalar)
        );
    }

    #[test]
    fn implementations_follow_declaration_order() {
        let schema = Schema::parse(
            r"
            type Query { node: Node }
            interface Node { id: ID! }
            type B implements Node { id: ID! }
            type A implements Node { id: ID! }
            type C { id: ID! }
            ",
        )
        .unwrap();

        let node = schema.lookup_type("Node").unwrap();
        let implementations = schema.implementations(node).map(|ty| ty.name()).collect::<Vec<_>>();

        assert_eq!(implementations, ["B", "A"]);

        let query = schema.query_type().unwrap();
        assert_eq!(schema.implementations(query).count(), 0);
    }

    #[test]
    fn argument_default_values() {
        let schema = Schema::parse("type Query { users(first: Int = 10, after: String): [Int] }").unwrap();
        let field = schema.query_type().unwrap().field("users").unwrap();

        assert_eq!(
            field.argument("first").and_then(|arg| arg.default_value()),
            Some(&ConstValue::Number(10.into()))
        );
        assert_eq!(field.argument("after").and_then(|arg| arg.default_value()), None);
    }
}
