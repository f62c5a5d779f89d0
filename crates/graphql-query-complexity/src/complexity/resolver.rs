use crate::{
    annotation::most_expensive,
    schema::{Schema, TypeDefinition},
    CostAnnotation,
};

/// The annotation applying to `field` selected on `parent`.
///
/// On an interface the field is looked up on every implementing object and the
/// most expensive declaration wins. Unions declare no fields and resolve to nothing.
pub(crate) fn field_cost<'a>(
    schema: &'a Schema,
    parent: &'a TypeDefinition,
    field: &str,
) -> Option<&'a CostAnnotation> {
    if parent.is_interface() {
        return most_expensive(
            schema
                .implementations(parent)
                .filter_map(|implementation| implementation.field(field))
                .map(|definition| definition.cost()),
        );
    }

    parent.field(field)?.cost()
}

/// The annotation declared on the type a field lands on, fanning out over
/// implementors for interfaces.
pub(crate) fn type_cost<'a>(schema: &'a Schema, ty: &'a TypeDefinition) -> Option<&'a CostAnnotation> {
    if ty.is_interface() {
        return most_expensive(schema.implementations(ty).map(|implementation| implementation.cost()));
    }

    ty.cost()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::parse(&format!(
            "{}\n{}",
            CostAnnotation::definitions(),
            r#"
            type Query { node: Node search: SearchResult }

            interface Node @cost(complexity: 100) { id: ID! friends(first: Int): [Node] }

            type Cheap implements Node @cost(complexity: 1) {
                id: ID! @cost(complexity: 2)
                friends(first: Int): [Node]
            }

            type Expensive implements Node @listCost(assumedSize: 7) {
                id: ID! @cost(complexity: 9)
                friends(first: Int): [Node] @listCost(assumedSize: 5, arguments: ["first"])
            }

            type Plain implements Node {
                id: ID!
                friends(first: Int): [Node]
            }

            interface Orphan { id: ID! }

            union SearchResult @cost(complexity: 3) = Cheap | Plain
            "#
        ))
        .unwrap()
    }

    #[test]
    fn interface_fields_take_the_most_expensive_implementor() {
        let schema = schema();
        let node = schema.lookup_type("Node").unwrap();

        assert_eq!(field_cost(&schema, node, "id"), Some(&CostAnnotation::flat(9)));
        assert_eq!(
            field_cost(&schema, node, "friends"),
            Some(&CostAnnotation::list(None, 5, ["first"]))
        );
        assert_eq!(field_cost(&schema, node, "unknown"), None);
    }

    #[test]
    fn object_fields_use_their_own_declaration() {
        let schema = schema();
        let plain = schema.lookup_type("Plain").unwrap();
        let cheap = schema.lookup_type("Cheap").unwrap();

        assert_eq!(field_cost(&schema, plain, "id"), None);
        assert_eq!(field_cost(&schema, cheap, "id"), Some(&CostAnnotation::flat(2)));
    }

    #[test]
    fn landing_types() {
        let schema = schema();

        // The interface's own declaration is ignored in favour of its implementors.
        let node = schema.lookup_type("Node").unwrap();
        assert_eq!(
            type_cost(&schema, node),
            Some(&CostAnnotation::list(None, 7, Vec::<String>::new()))
        );

        let orphan = schema.lookup_type("Orphan").unwrap();
        assert_eq!(type_cost(&schema, orphan), None);

        let search = schema.lookup_type("SearchResult").unwrap();
        assert_eq!(type_cost(&schema, search), Some(&CostAnnotation::flat(3)));
    }
}
