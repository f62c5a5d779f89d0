pub(crate) use crate::{ComplexityResult, QueryComplexity};

use crate::{validate, ExecutionContext, RuleError, Schema, Variables};

const FIXTURE: &str = r#"
type Query {
  plain: Int
  unset: Int @cost
  cheap: Int @cost(complexity: 2)
  expensive: Int @cost(complexity: 10)
  user: User
  users(first: Int, last: Int): [User!]! @listCost(arguments: ["first", "last"])
  numbers(first: Int, last: Int = 4, unrelated: Int): [Int!]!
    @listCost(complexity: 2, assumedSize: 3, arguments: ["first", "last"])
  node: Node
  search(text: String!): [SearchResult!]!
  results(first: Int): [SearchResult!]! @listCost(arguments: ["first"])
}

type User @cost(complexity: 5) {
  id: ID!
  friends(first: Int = 10): [User!]! @listCost(arguments: ["first"])
}

interface Node {
  weight: Int
}

type Cheap implements Node {
  weight: Int @cost(complexity: 2)
}

type Pricey implements Node {
  weight: Int @cost(complexity: 7)
}

union SearchResult = User | Cheap
"#;

pub(crate) fn schema_with(analyzer: QueryComplexity) -> Schema {
    Schema::parse(&format!("{}\n{FIXTURE}", crate::CostAnnotation::definitions()))
        .unwrap()
        .with_analyzer(analyzer)
}

pub(crate) fn run(
    schema: &Schema,
    query: &str,
    variables: serde_json::Value,
) -> (Option<ComplexityResult>, Vec<RuleError>) {
    let document = async_graphql_parser::parse_query(query).unwrap();
    let mut execution = ExecutionContext::new(Variables::from_json(variables));

    validate(schema, &document, &mut execution).unwrap();

    (execution.complexity().copied(), execution.into_errors())
}

pub(crate) fn complexity_of(
    schema: &Schema,
    query: &str,
    variables: serde_json::Value,
) -> Result<ComplexityResult, Vec<RuleError>> {
    match run(schema, query, variables) {
        (Some(result), errors) if errors.is_empty() => Ok(result),
        (_, errors) => Err(errors),
    }
}

macro_rules! expect_complexity {
    ($query:expr, $expected:expr $(,)?) => {
        $crate::test_harness::expect_complexity_with(
            $query,
            ::serde_json::json!({}),
            $expected,
        )
    };
    ($query:expr, $variables:expr, $expected:expr $(,)?) => {
        $crate::test_harness::expect_complexity_with($query, $variables, $expected)
    };
}

#[track_caller]
pub(crate) fn expect_complexity_with(query: &str, variables: serde_json::Value, expected: usize) {
    let schema = schema_with(QueryComplexity::new(1000));

    let result = complexity_of(&schema, query, variables).unwrap();
    assert_eq!(result.current, expected, "unexpected complexity for {query}");
}
