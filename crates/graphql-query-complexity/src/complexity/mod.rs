//! Builds a cost tree mirroring the selections of a document and folds it
//! into a single complexity score.

mod report;
mod resolver;
mod tree;

use std::collections::HashMap;

use async_graphql_parser::{
    types::{ExecutableDocument, Field, FragmentDefinition, FragmentSpread, OperationDefinition, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;

pub use report::{evaluate, Verdict};

use self::tree::{ChildRef, CostNode, CostNodeId, CostTree, FoldError};
use crate::{
    variables::{coerce_variables, list_size, resolve_argument},
    visitor::{VisitFlow, Visitor, VisitorContext},
    CostAnnotation, ComplexityResult, QueryComplexity, Variables,
};

/// Variables are resolved once per scope: an operation, or `None` for the
/// fragment definitions which live outside of any operation.
type VariableScope = Option<Pos>;

pub(crate) struct ComplexityCalculate<'a, 'r> {
    analyzer: &'a QueryComplexity,
    tree: CostTree<'a>,
    stack: Vec<CostNodeId>,
    operations: Vec<&'a Positioned<OperationDefinition>>,
    variables: HashMap<VariableScope, Option<Variables>>,
    result: &'r mut Option<ComplexityResult>,
}

impl<'a, 'r> ComplexityCalculate<'a, 'r> {
    pub(crate) fn new(analyzer: &'a QueryComplexity, result: &'r mut Option<ComplexityResult>) -> Self {
        ComplexityCalculate {
            analyzer,
            tree: CostTree::default(),
            stack: Vec::new(),
            operations: Vec::new(),
            variables: HashMap::new(),
            result,
        }
    }

    fn current(&self) -> Option<CostNodeId> {
        self.stack.last().copied()
    }

    /// Pushes a new frame. Unless detached, the node becomes a child of the current frame.
    fn enter(&mut self, node: CostNode<'a>, attached: bool) -> CostNodeId {
        let id = self.tree.push(node);

        if attached {
            if let Some(parent) = self.current() {
                self.tree[parent].children.push(ChildRef::Node(id));
            }
        }

        self.stack.push(id);
        id
    }

    fn leave(&mut self) -> Option<CostNodeId> {
        self.stack.pop()
    }

    /// Coerced variables of the current scope, `None` if coercion failed.
    fn variables(&mut self, ctx: &mut VisitorContext<'a>) -> Option<&Variables> {
        let operation = self.operations.last().copied();
        let scope = operation.map(|operation| operation.pos);

        if !self.variables.contains_key(&scope) {
            let coerced = match operation {
                Some(operation) => coerce_variables(&operation.node.variable_definitions, ctx.variables),
                None => coerce_variables(&fragment_scope_definitions(ctx), ctx.variables),
            };

            let coerced = coerced
                .map_err(|errors| {
                    tracing::debug!("Failed to resolve {} variable(s) for list sizes", errors.len());
                    ctx.append_errors(errors);
                })
                .ok();

            self.variables.insert(scope, coerced);
        }

        self.variables.get(&scope).and_then(Option::as_ref)
    }
}

/// Variables referenced in fragment definitions resolve against the first
/// operation declaring them.
fn fragment_scope_definitions(ctx: &VisitorContext<'_>) -> Vec<Positioned<VariableDefinition>> {
    let mut definitions: Vec<Positioned<VariableDefinition>> = Vec::new();

    for (_, operation) in ctx.operations() {
        for definition in &operation.node.variable_definitions {
            let name = &definition.node.name.node;

            if definitions.iter().all(|existing| existing.node.name.node != *name) {
                definitions.push(definition.clone());
            }
        }
    }

    definitions
}

impl<'a> Visitor<'a> for ComplexityCalculate<'a, '_> {
    fn enter_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {
        self.enter(CostNode::container(), false);
    }

    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {
        let root = self.leave();
        debug_assert!(self.stack.is_empty(), "unbalanced cost frames");

        let Some(root) = root else {
            return;
        };

        match self.tree.fold(root, self.analyzer.default_complexity()) {
            Ok(current) => {
                let max = self.analyzer.max_complexity();

                if let Some(error) = evaluate(current, max).into_error() {
                    tracing::warn!("Operation rejected, complexity {current} exceeds the limit of {max}");
                    ctx.errors.push(error);
                }

                *self.result = Some(ComplexityResult { current, max });
            }
            Err(FoldError::FragmentCycle(cycle)) => {
                let locations = ctx
                    .fragment(&cycle[0])
                    .map(|fragment| vec![fragment.pos])
                    .unwrap_or_default();

                ctx.report_error(
                    locations,
                    format!(
                        "Cannot compute complexity, fragment \"{}\" spreads itself via {}",
                        cycle[0],
                        cycle.join(" -> ")
                    ),
                );
            }
        }
    }

    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation_definition: &'a Positioned<OperationDefinition>,
    ) {
        self.operations.push(operation_definition);
    }

    fn exit_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation_definition: &'a Positioned<OperationDefinition>,
    ) {
        self.operations.pop();
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
        // Fragments only count through their spreads.
        let id = self.enter(CostNode::container(), false);
        self.tree.register_fragment(name.as_str(), id);
    }

    fn exit_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
        self.leave();
    }

    fn enter_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
        let name = &fragment_spread.node.fragment_name.node;

        if ctx.fragment(name).is_none() {
            tracing::debug!("Ignoring spread of unknown fragment {name}");
            return;
        }

        if let Some(current) = self.current() {
            self.tree[current].children.push(ChildRef::Fragment(name.as_str()));
        }
    }

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) -> VisitFlow {
        let name = field.node.name.node.as_str();

        if name.starts_with("__") {
            return VisitFlow::Skip;
        }

        let Some(parent_type) = ctx.parent_type() else {
            tracing::debug!("Skipping field {name} without a parent type");
            return VisitFlow::Skip;
        };

        if parent_type.is_union() {
            // Nothing to resolve at this level, selections below attach to the enclosing node.
            if let Some(current) = self.current() {
                self.stack.push(current);
            }
            return VisitFlow::Next;
        }

        let Some(definition) = parent_type.field(name) else {
            tracing::debug!("Skipping unknown field {}.{name}", parent_type.name());
            return VisitFlow::Skip;
        };

        let annotation = resolver::field_cost(ctx.schema, parent_type, name);
        let mut node = CostNode::field(annotation);

        if let Some(size_arguments) = annotation.and_then(CostAnnotation::size_arguments) {
            let Some(variables) = self.variables(ctx) else {
                tracing::debug!("Pruning field {name}, its list size variables could not be resolved");
                return VisitFlow::Skip;
            };

            for (argument, value) in &field.node.arguments {
                let argument = argument.node.as_str();

                if !size_arguments.contains(argument) {
                    continue;
                }

                let size = resolve_argument(&value.node, definition.argument(argument), variables)
                    .as_ref()
                    .and_then(list_size);

                if let Some(size) = size {
                    node.multipliers.push(size);
                }
            }
        }

        if let Some(CostAnnotation::Flat { complexity }) = ctx
            .current_type()
            .and_then(|landing_type| resolver::type_cost(ctx.schema, landing_type))
        {
            node.own_complexity = node.own_complexity.saturating_add(complexity.unwrap_or(0));
        }

        self.enter(node, true);
        VisitFlow::Next
    }

    fn exit_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use crate::test_harness::*;

    #[test]
    fn flat_and_unannotated_fields() {
        expect_complexity!(
            r"
            {
                plain
                cheap
                expensive
            }
            ",
            1 + 2 + 10
        );
    }

    #[test]
    fn default_complexity_is_configurable() {
        let schema = schema_with(QueryComplexity::new(100).with_default_complexity(3));

        let result = complexity_of(&schema, "{ plain unset user { id } }", serde_json::json!({})).unwrap();

        assert_eq!(result.current, 3 + 3 + (3 + 3));
    }

    #[test]
    fn landing_type_cost_applies_to_list_fields_only() {
        // `user` lands on User (@cost 5) but only list fields add the landing cost to their base.
        expect_complexity!("{ user { id } }", 1 + 1);
        expect_complexity!("{ users(first: 2) { id } }", (5 + 1) * 2);
    }

    #[test]
    fn list_size_from_arguments() {
        expect_complexity!("{ numbers(first: 5) }", 2 * 5);
        expect_complexity!("{ numbers }", 2 * 3);
        expect_complexity!("{ numbers(first: 2, last: 3) }", 2 * 2 + 2 * 3);
        expect_complexity!("{ numbers(last: 3, unrelated: 100) }", 2 * 3);
    }

    #[test]
    fn nested_lists_compound() {
        expect_complexity!(
            "{ users(first: 10) { friends(first: 3) { id } } }",
            (5 + (5 + 1) * 3) * 10
        );
    }

    #[test]
    fn interfaces_use_the_most_expensive_implementor() {
        expect_complexity!("{ node { weight } }", 1 + 7);
        expect_complexity!("{ node { ... on Cheap { weight } } }", 1 + 2);
    }

    #[test]
    fn introspection_fields_are_free() {
        expect_complexity!("{ __typename plain }", 1);
        expect_complexity!("{ user { __typename id } }", 2);
        expect_complexity!("{ __schema { types { name fields { name } } } }", 0);
        expect_complexity!("{ search(text: \"x\") { __typename } }", 1);
    }

    #[test]
    fn union_members_through_inline_fragments() {
        expect_complexity!(
            "{ search(text: \"x\") { ... on User { id } ... on Cheap { weight } } }",
            1 + 1 + 2
        );
    }

    #[test]
    fn fields_selected_on_a_union_attach_to_the_enclosing_field() {
        // `entry` is not resolvable on the union, the `User` selection below it still
        // counts towards the list items of `results`, and `plain` stays at the top level.
        expect_complexity!(
            "{ results(first: 3) { entry { ... on User { id } } } plain }",
            3 + 1
        );
        expect_complexity!(
            "{ results(first: 2) { entry { ... on User { id } } other { ... on Cheap { weight } } } }",
            (1 + 2) * 2
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        expect_complexity!("{ plain doesNotExist { id } }", 1);
    }

    #[test]
    fn threshold_boundary() {
        let schema = schema_with(QueryComplexity::new(10));

        let passing = complexity_of(&schema, "{ numbers(first: 5) }", serde_json::json!({})).unwrap();
        assert_eq!(passing, ComplexityResult { current: 10, max: 10 });

        let (result, errors) = run(&schema, "{ numbers(first: 5) plain }", serde_json::json!({}));
        assert_eq!(result, Some(ComplexityResult { current: 11, max: 10 }));
        insta::assert_json_snapshot!(errors, @r###"
        [
          {
            "message": "Complexity of 11 is greater than max complexity of 10",
            "extensions": {
              "complexity": {
                "current": 11,
                "max": 10
              }
            }
          }
        ]
        "###);
    }

    #[test]
    fn fragments_spread_before_their_definition() {
        expect_complexity!(
            r"
            query { user { ...UserFields } }
            fragment UserFields on User { id friends(first: 2) { id } }
            ",
            1 + 1 + (5 + 1) * 2
        );
    }

    #[test]
    fn fragments_count_once_per_spread() {
        expect_complexity!(
            r"
            query {
                a: user { ...UserFields }
                b: user { ...UserFields }
            }
            fragment UserFields on User { id }
            ",
            (1 + 1) * 2
        );
    }

    #[test]
    fn unused_fragments_are_free() {
        expect_complexity!(
            r"
            query { plain }
            fragment Unused on User { id friends(first: 100) { id } }
            ",
            1
        );
    }

    #[test]
    fn fragment_cycles_are_reported() {
        let schema = schema_with(QueryComplexity::new(1000));

        let (result, errors) = run(
            &schema,
            r"
            query { user { ...A } }
            fragment A on User { friends(first: 1) { ...B } }
            fragment B on User { id ...A }
            ",
            serde_json::json!({}),
        );

        assert_eq!(result, None);
        insta::assert_snapshot!(
            errors[0].to_string(),
            @r###"[3:13] Cannot compute complexity, fragment "A" spreads itself via A -> B -> A"###
        );
    }
}
