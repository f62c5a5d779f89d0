use serde::Serialize;

use crate::{RuleError, Variables};

/// The folded complexity of an operation and the limit it was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityResult {
    pub current: usize,
    pub max: usize,
}

impl ComplexityResult {
    pub fn is_exceeded(&self) -> bool {
        self.current > self.max
    }
}

/// Request scoped state of one validation pass.
///
/// Holds the supplied variables and collects what the pass produces: the
/// errors it reported and the published [`ComplexityResult`]. Nothing in here
/// outlives the request.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    variables: Variables,
    errors: Vec<RuleError>,
    complexity: Option<ComplexityResult>,
}

impl ExecutionContext {
    pub fn new(variables: Variables) -> Self {
        ExecutionContext {
            variables,
            ..Default::default()
        }
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn errors(&self) -> &[RuleError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<RuleError> {
        self.errors
    }

    /// The complexity published by the last pass run with this context.
    pub fn complexity(&self) -> Option<&ComplexityResult> {
        self.complexity.as_ref()
    }

    pub(crate) fn extend_errors(&mut self, errors: impl IntoIterator<Item = RuleError>) {
        self.errors.extend(errors);
    }

    pub(crate) fn publish(&mut self, result: ComplexityResult) {
        tracing::info!(
            complexity = result.current,
            max_complexity = result.max,
            "Computed operation complexity"
        );
        self.complexity = Some(result);
    }

    pub(crate) fn reset(&mut self) {
        self.errors.clear();
        self.complexity = None;
    }
}
