use indexmap::IndexSet;

pub const COST_DIRECTIVE_NAME: &str = "cost";
pub const LIST_COST_DIRECTIVE_NAME: &str = "listCost";

/// The declared cost of a field or of a type.
///
/// Numeric parts are optional on purpose: an unset complexity is filled in with
/// the analyzer's default at evaluation time, and an unset assumed size with 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostAnnotation {
    /// `@cost(complexity: Int)`
    Flat { complexity: Option<usize> },
    /// `@listCost(complexity: Int, assumedSize: Int, arguments: [String!])`
    List {
        complexity: Option<usize>,
        assumed_size: Option<usize>,
        size_arguments: IndexSet<String>,
    },
}

impl CostAnnotation {
    pub fn flat(complexity: impl Into<Option<usize>>) -> Self {
        CostAnnotation::Flat {
            complexity: complexity.into(),
        }
    }

    pub fn list<I, S>(
        complexity: impl Into<Option<usize>>,
        assumed_size: impl Into<Option<usize>>,
        arguments: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CostAnnotation::List {
            complexity: complexity.into(),
            assumed_size: assumed_size.into(),
            size_arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn complexity(&self) -> Option<usize> {
        match self {
            CostAnnotation::Flat { complexity } | CostAnnotation::List { complexity, .. } => *complexity,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, CostAnnotation::List { .. })
    }

    /// Argument names whose runtime values scale this annotation. Empty for flat costs.
    pub fn size_arguments(&self) -> Option<&IndexSet<String>> {
        match self {
            CostAnnotation::List { size_arguments, .. } if !size_arguments.is_empty() => Some(size_arguments),
            _ => None,
        }
    }

    /// SDL definitions of the cost directives, to be prepended to a schema document.
    pub fn definitions() -> &'static str {
        r#"
directive @cost(complexity: Int) on FIELD_DEFINITION | OBJECT | INTERFACE | UNION | SCALAR | ENUM

directive @listCost(
  complexity: Int
  assumedSize: Int
  arguments: [String!]
) on FIELD_DEFINITION | OBJECT | INTERFACE | UNION
"#
    }
}

/// Ordering key used to pick one annotation among several candidates: the most
/// expensive looking declaration wins, and any declaration outranks none.
pub(crate) fn compare_key(annotation: Option<&CostAnnotation>) -> i64 {
    let value = match annotation {
        None => return -1,
        Some(CostAnnotation::List { assumed_size, .. }) => assumed_size.unwrap_or(0),
        Some(CostAnnotation::Flat { complexity }) => complexity.unwrap_or(0),
    };

    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Picks the candidate with the highest [`compare_key`]. Ties keep the earliest candidate.
pub(crate) fn most_expensive<'a>(
    candidates: impl IntoIterator<Item = Option<&'a CostAnnotation>>,
) -> Option<&'a CostAnnotation> {
    let mut best: Option<&'a CostAnnotation> = None;

    for candidate in candidates {
        if compare_key(candidate) > compare_key(best) {
            best = candidate;
        }
    }

    best
}
