use async_graphql_parser::{types::ConstDirective, Positioned};
use async_graphql_value::ConstValue;
use indexmap::IndexSet;

use super::SchemaError;
use crate::{
    annotation::{COST_DIRECTIVE_NAME, LIST_COST_DIRECTIVE_NAME},
    CostAnnotation,
};

/// Reads the first cost directive in `directives`, if any.
pub(super) fn cost_annotation(
    directives: &[Positioned<ConstDirective>],
    location: &str,
) -> Result<Option<CostAnnotation>, SchemaError> {
    for directive in directives {
        let directive = &directive.node;

        match directive.name.node.as_str() {
            COST_DIRECTIVE_NAME => {
                let reader = ArgumentReader {
                    directive,
                    directive_name: COST_DIRECTIVE_NAME,
                    location,
                };

                return Ok(Some(CostAnnotation::Flat {
                    complexity: reader.size("complexity")?,
                }));
            }
            LIST_COST_DIRECTIVE_NAME => {
                let reader = ArgumentReader {
                    directive,
                    directive_name: LIST_COST_DIRECTIVE_NAME,
                    location,
                };

                return Ok(Some(CostAnnotation::List {
                    complexity: reader.size("complexity")?,
                    assumed_size: reader.size("assumedSize")?,
                    size_arguments: reader.names("arguments")?,
                }));
            }
            _ => (),
        }
    }

    Ok(None)
}

struct ArgumentReader<'a> {
    directive: &'a ConstDirective,
    directive_name: &'static str,
    location: &'a str,
}

impl ArgumentReader<'_> {
    fn error(&self, message: String) -> SchemaError {
        SchemaError::InvalidDirective {
            directive: self.directive_name,
            location: self.location.to_string(),
            message,
        }
    }

    fn size(&self, argument: &str) -> Result<Option<usize>, SchemaError> {
        match self.directive.get_argument(argument).map(|value| &value.node) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::Number(number)) => number
                .as_u64()
                .and_then(|value| usize::try_from(value).ok())
                .map(Some)
                .ok_or_else(|| self.error(format!("{argument} must be a non-negative integer, got {number}"))),
            Some(other) => Err(self.error(format!("{argument} must be a non-negative integer, got {other}"))),
        }
    }

    fn names(&self, argument: &str) -> Result<IndexSet<String>, SchemaError> {
        match self.directive.get_argument(argument).map(|value| &value.node) {
            None | Some(ConstValue::Null) => Ok(IndexSet::new()),
            Some(ConstValue::String(name)) => Ok(IndexSet::from([name.clone()])),
            Some(ConstValue::List(values)) => values
                .iter()
                .map(|value| match value {
                    ConstValue::String(name) => Ok(name.clone()),
                    other => Err(self.error(format!("{argument} must only contain strings, got {other}"))),
                })
                .collect(),
            Some(other) => Err(self.error(format!("{argument} must be a list of strings, got {other}"))),
        }
    }
}
