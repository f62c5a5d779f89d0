//! A depth-first walk over an executable document that keeps track of the
//! schema types at the current position.

use async_graphql_parser::{
    types::{
        ExecutableDocument, Field, FragmentDefinition, FragmentSpread, OperationDefinition,
        OperationType, Selection, SelectionSet,
    },
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::{
    schema::{Schema, TypeDefinition},
    RuleError, Variables,
};

/// What the walk does after entering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VisitFlow {
    /// Descend into the node's children.
    Next,
    /// Do not descend. The matching exit callback is not called either.
    Skip,
}

pub(crate) struct VisitorContext<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) document: &'a ExecutableDocument,
    pub(crate) variables: &'a Variables,
    pub(crate) errors: Vec<RuleError>,
    type_stack: Vec<Option<&'a TypeDefinition>>,
}

impl<'a> VisitorContext<'a> {
    pub(crate) fn new(schema: &'a Schema, document: &'a ExecutableDocument, variables: &'a Variables) -> Self {
        VisitorContext {
            schema,
            document,
            variables,
            errors: Vec::new(),
            type_stack: Vec::new(),
        }
    }

    pub(crate) fn report_error(&mut self, locations: Vec<Pos>, message: impl Into<String>) {
        self.errors.push(RuleError::new(locations, message));
    }

    /// Reports errors, skipping any that was already reported during this pass.
    pub(crate) fn append_errors(&mut self, errors: impl IntoIterator<Item = RuleError>) {
        for error in errors {
            if !self.errors.contains(&error) {
                self.errors.push(error);
            }
        }
    }

    pub(crate) fn with_type<F>(&mut self, ty: Option<&'a TypeDefinition>, f: F)
    where
        F: FnOnce(&mut VisitorContext<'a>),
    {
        self.type_stack.push(ty);
        f(self);
        self.type_stack.pop();
    }

    /// The type of the innermost selection. For a field being entered this is
    /// the type the field resolves to.
    pub(crate) fn current_type(&self) -> Option<&'a TypeDefinition> {
        self.type_stack.last().copied().flatten()
    }

    /// The type declaring the field being entered.
    pub(crate) fn parent_type(&self) -> Option<&'a TypeDefinition> {
        if self.type_stack.len() >= 2 {
            self.type_stack[self.type_stack.len() - 2]
        } else {
            None
        }
    }

    pub(crate) fn fragment(&self, name: &str) -> Option<&'a Positioned<FragmentDefinition>> {
        self.document.fragments.get(name)
    }

    /// Operations of the document in source order.
    pub(crate) fn operations(&self) -> Vec<(Option<&'a Name>, &'a Positioned<OperationDefinition>)> {
        let mut operations = self.document.operations.iter().collect::<Vec<_>>();
        operations.sort_by_key(|(_, operation)| operation.pos);
        operations
    }
}

pub(crate) trait Visitor<'a> {
    fn enter_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {}
    fn exit_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {}

    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation_definition: &'a Positioned<OperationDefinition>,
    ) {
    }
    fn exit_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation_definition: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
    }
    fn exit_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
    }

    fn enter_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) -> VisitFlow {
        VisitFlow::Next
    }
    fn exit_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {}

    fn enter_fragment_spread(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
    }
}

pub(crate) fn visit<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {
    v.enter_document(ctx, doc);

    for (name, operation) in ctx.operations() {
        visit_operation_definition(v, ctx, name, operation);
    }

    let mut fragments = doc.fragments.iter().collect::<Vec<_>>();
    fragments.sort_by_key(|(_, fragment)| fragment.pos);

    for (name, fragment) in fragments {
        let ty = ctx
            .schema
            .lookup_type(fragment.node.type_condition.node.on.node.as_str());

        ctx.with_type(ty, |ctx| visit_fragment_definition(v, ctx, name, fragment));
    }

    v.exit_document(ctx, doc);
}

fn visit_operation_definition<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    name: Option<&'a Name>,
    operation: &'a Positioned<OperationDefinition>,
) {
    let root_type = match operation.node.ty {
        OperationType::Query => ctx.schema.query_type(),
        OperationType::Mutation => ctx.schema.mutation_type(),
        OperationType::Subscription => ctx.schema.subscription_type(),
    };

    ctx.with_type(root_type, |ctx| {
        v.enter_operation_definition(ctx, name, operation);
        visit_selection_set(v, ctx, &operation.node.selection_set);
        v.exit_operation_definition(ctx, name, operation);
    });
}

fn visit_fragment_definition<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    name: &'a Name,
    fragment: &'a Positioned<FragmentDefinition>,
) {
    v.enter_fragment_definition(ctx, name, fragment);
    visit_selection_set(v, ctx, &fragment.node.selection_set);
    v.exit_fragment_definition(ctx, name, fragment);
}

fn visit_selection_set<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    selection_set: &'a Positioned<SelectionSet>,
) {
    for selection in &selection_set.node.items {
        visit_selection(v, ctx, selection);
    }
}

fn visit_selection<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, selection: &'a Positioned<Selection>) {
    match &selection.node {
        Selection::Field(field) => {
            let ty = ctx
                .current_type()
                .and_then(|ty| ty.field(field.node.name.node.as_str()))
                .and_then(|definition| ctx.schema.lookup_type(definition.named_type()));

            ctx.with_type(ty, |ctx| visit_field(v, ctx, field));
        }
        Selection::FragmentSpread(fragment_spread) => {
            v.enter_fragment_spread(ctx, fragment_spread);
        }
        Selection::InlineFragment(inline_fragment) => {
            let selection_set = &inline_fragment.node.selection_set;

            match &inline_fragment.node.type_condition {
                Some(condition) => {
                    let ty = ctx.schema.lookup_type(condition.node.on.node.as_str());
                    ctx.with_type(ty, |ctx| visit_selection_set(v, ctx, selection_set));
                }
                None => visit_selection_set(v, ctx, selection_set),
            }
        }
    }
}

fn visit_field<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
    if v.enter_field(ctx, field) == VisitFlow::Skip {
        return;
    }

    visit_selection_set(v, ctx, &field.node.selection_set);
    v.exit_field(ctx, field);
}
