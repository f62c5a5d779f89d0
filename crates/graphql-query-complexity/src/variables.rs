use std::{
    collections::BTreeMap,
    convert::Infallible,
    fmt::{self, Display, Formatter},
    ops::Deref,
};

use async_graphql_parser::{
    types::{BaseType, VariableDefinition},
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Value};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{schema::InputValueDefinition, RuleError};

/// Variables supplied with an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Variables(BTreeMap<Name, ConstValue>);

impl Display for Variables {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            write!(f, "{}{name}: {value}", if i == 0 { "" } else { ", " })?;
        }
        f.write_str("}")
    }
}

impl<'de> Deserialize<'de> for Variables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(
            <Option<BTreeMap<Name, ConstValue>>>::deserialize(deserializer)?.unwrap_or_default(),
        ))
    }
}

impl Variables {
    /// Get the variables from a GraphQL value.
    ///
    /// If the value is not a map, then no variables will be returned.
    #[must_use]
    pub fn from_value(value: ConstValue) -> Self {
        match value {
            ConstValue::Object(obj) => Self(obj.into_iter().collect()),
            _ => Self::default(),
        }
    }

    /// Get the values from a JSON value.
    ///
    /// If the value is not a map or the keys of a map are not valid GraphQL names, then no
    /// variables will be returned.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        ConstValue::from_json(value).map(Self::from_value).unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, name: Name, value: ConstValue) {
        self.0.insert(name, value);
    }
}

impl Deref for Variables {
    type Target = BTreeMap<Name, ConstValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<(Name, ConstValue)> for Variables {
    fn from_iter<T: IntoIterator<Item = (Name, ConstValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Coerces the supplied inputs against an operation's variable definitions.
///
/// Missing values fall back to the definition default. All failures are
/// collected rather than stopping at the first one.
pub(crate) fn coerce_variables(
    definitions: &[Positioned<VariableDefinition>],
    inputs: &Variables,
) -> Result<Variables, Vec<RuleError>> {
    let mut coerced = Variables::default();
    let mut errors = Vec::new();

    for definition in definitions {
        let name = &definition.node.name.node;
        let ty = &definition.node.var_type.node;

        match inputs.get(name.as_str()) {
            Some(ConstValue::Null) if !ty.nullable => errors.push(RuleError::new(
                vec![definition.pos],
                format!(r#"Variable "${name}" of non-null type "{ty}" must not be null."#),
            )),
            Some(value) => match invalid_int(&ty.base, value) {
                Some(reason) => errors.push(RuleError::new(
                    vec![definition.pos],
                    format!(r#"Variable "${name}" got invalid value {value}; {reason}"#),
                )),
                None => coerced.insert(name.clone(), value.clone()),
            },
            None => match &definition.node.default_value {
                Some(default_value) => coerced.insert(name.clone(), default_value.node.clone()),
                None if !ty.nullable => errors.push(RuleError::new(
                    vec![definition.pos],
                    format!(r#"Variable "${name}" of required type "{ty}" was not provided."#),
                )),
                None => (),
            },
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Only `Int` is checked, it is the only scalar a size argument can hold.
fn invalid_int(base: &BaseType, value: &ConstValue) -> Option<String> {
    match (base, value) {
        (BaseType::Named(name), ConstValue::Number(number)) if name.as_str() == "Int" => {
            match number.as_i64().map(i32::try_from) {
                Some(Ok(_)) => None,
                Some(Err(_)) => Some(format!("Int cannot represent non 32-bit signed integer value: {number}")),
                None => Some(format!("Int cannot represent non-integer value: {number}")),
            }
        }
        (BaseType::Named(name), ConstValue::Null) if name.as_str() == "Int" => None,
        (BaseType::Named(name), other) if name.as_str() == "Int" => {
            Some(format!("Int cannot represent non-integer value: {other}"))
        }
        _ => None,
    }
}

/// The runtime value of a field argument as written in the query.
///
/// A variable without a runtime value falls back to the argument's default
/// value, and is absent when there is none.
pub(crate) fn resolve_argument(
    value: &Value,
    definition: Option<&InputValueDefinition>,
    variables: &Variables,
) -> Option<ConstValue> {
    match value {
        Value::Variable(name) => variables
            .get(name.as_str())
            .or_else(|| definition.and_then(|definition| definition.default_value()))
            .cloned(),
        value => value
            .clone()
            .into_const_with(|name| {
                Ok::<_, Infallible>(variables.get(name.as_str()).cloned().unwrap_or(ConstValue::Null))
            })
            .ok(),
    }
}

/// Interprets an argument value as a list size.
///
/// Negative integers clamp to zero, anything that is not an integer is ignored.
pub(crate) fn list_size(value: &ConstValue) -> Option<usize> {
    let ConstValue::Number(number) = value else {
        return None;
    };

    if let Some(size) = number.as_u64() {
        return Some(usize::try_from(size).unwrap_or(usize::MAX));
    }

    number.as_i64().map(|_| 0)
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::{parse_query, types::DocumentOperations};
    use serde_json::json;

    use super::*;

    fn coerce(query: &str, inputs: serde_json::Value) -> Result<Variables, Vec<RuleError>> {
        let document = parse_query(query).unwrap();
        let DocumentOperations::Single(operation) = &document.operations else {
            unreachable!("single operation expected")
        };

        coerce_variables(&operation.node.variable_definitions, &Variables::from_json(inputs))
    }

    #[test]
    fn supplied_values_and_defaults() {
        let variables = coerce(
            "query ($first: Int, $last: Int = 3, $after: String) { a }",
            json!({"first": 5}),
        )
        .unwrap();

        insta::assert_snapshot!(variables, @"{first: 5, last: 3}");
    }

    #[test]
    fn required_variables() {
        let errors = coerce("query ($first: Int!, $last: Int!) { a }", json!({"last": null})).unwrap_err();

        let messages = errors.iter().map(ToString::to_string).collect::<Vec<_>>();

        insta::assert_debug_snapshot!(messages, @r###"
        [
            "[1:8] Variable \"$first\" of required type \"Int!\" was not provided.",
            "[1:22] Variable \"$last\" of non-null type \"Int!\" must not be null.",
        ]
        "###);
    }

    #[test]
    fn invalid_integers() {
        let errors = coerce(
            "query ($a: Int, $b: Int, $c: Int) { a }",
            json!({"a": "ten", "b": 1.5, "c": 4_000_000_000_i64}),
        )
        .unwrap_err();

        let messages = errors.into_iter().map(|error| error.message).collect::<Vec<_>>();

        insta::assert_debug_snapshot!(messages, @r###"
        [
            "Variable \"$a\" got invalid value \"ten\"; Int cannot represent non-integer value: \"ten\"",
            "Variable \"$b\" got invalid value 1.5; Int cannot represent non-integer value: 1.5",
            "Variable \"$c\" got invalid value 4000000000; Int cannot represent non 32-bit signed integer value: 4000000000",
        ]
        "###);
    }

    #[test]
    fn list_sizes() {
        assert_eq!(list_size(&ConstValue::Number(5.into())), Some(5));
        assert_eq!(list_size(&ConstValue::Number((-5).into())), Some(0));
        assert_eq!(list_size(&ConstValue::Null), None);
        assert_eq!(list_size(&ConstValue::String("5".into())), None);
    }

    #[test]
    fn variables_from_json() {
        let variables = Variables::from_json(json!({"first": 10, "filter": {"name": "x"}}));

        assert_eq!(variables.get("first"), Some(&ConstValue::Number(10.into())));
        assert_eq!(Variables::from_json(json!([1, 2])), Variables::default());
    }
}
