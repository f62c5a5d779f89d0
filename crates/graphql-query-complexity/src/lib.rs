//! Static complexity analysis of GraphQL operations.
//!
//! Costs are declared on the schema with the `@cost` and `@listCost`
//! directives. Before an operation executes, [`validate`] walks its
//! selections, folds the declared costs into a single score and reports an
//! error when the score is above the configured maximum.

#[cfg(test)]
#[macro_use]
mod test_harness;

mod annotation;
mod complexity;
mod config;
mod context;
mod error;
pub mod schema;
mod variables;
mod visitor;

use async_graphql_parser::types::ExecutableDocument;

pub use annotation::{CostAnnotation, COST_DIRECTIVE_NAME, LIST_COST_DIRECTIVE_NAME};
pub use complexity::{evaluate, Verdict};
pub use config::{ConfigError, QueryComplexity, QueryComplexityConfig, DEFAULT_FIELD_COMPLEXITY};
pub use context::{ComplexityResult, ExecutionContext};
pub use error::{RuleError, ValidationError};
pub use schema::{Schema, SchemaError};
pub use variables::Variables;

use complexity::ComplexityCalculate;
use visitor::{visit, VisitorContext};

/// Runs one complexity validation pass of `document` against `schema`.
///
/// Errors found along the way, including an exceeded limit, are reported on
/// `execution` and the computed complexity is published there. Only a schema
/// without an analyzer fails the pass as a whole.
pub fn validate(
    schema: &Schema,
    document: &ExecutableDocument,
    execution: &mut ExecutionContext,
) -> Result<(), ValidationError> {
    let Some(analyzer) = schema.analyzer() else {
        tracing::error!("Complexity validation requested on a schema without an analyzer");
        return Err(ValidationError::MissingAnalyzer);
    };

    execution.reset();

    let mut result = None;
    let errors = {
        let mut ctx = VisitorContext::new(schema, document, execution.variables());
        let mut calculate = ComplexityCalculate::new(analyzer, &mut result);
        visit(&mut calculate, &mut ctx, document);
        ctx.errors
    };

    execution.extend_errors(errors);

    if let Some(result) = result {
        execution.publish(result);
    }

    Ok(())
}

/// Parses `query`, validates it and returns the computed complexity, or the
/// errors the host should send back to the client.
pub fn check_complexity(
    schema: &Schema,
    query: &str,
    variables: Variables,
) -> Result<ComplexityResult, Vec<RuleError>> {
    let document = async_graphql_parser::parse_query(query).map_err(|error| {
        vec![RuleError::new(error.positions().collect(), error.to_string())]
    })?;

    let mut execution = ExecutionContext::new(variables);

    if let Err(error) = validate(schema, &document, &mut execution) {
        return Err(vec![RuleError::new(Vec::new(), error.to_string())]);
    }

    match execution.complexity().copied() {
        Some(result) if !execution.has_errors() => Ok(result),
        _ => Err(execution.into_errors()),
    }
}
