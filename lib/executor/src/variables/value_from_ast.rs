use graphql_parser::query::Value as ParserValue;
use serde_json::{Map, Number, Value};

/// Converts a constant AST value (a default value, or a literal argument) into JSON.
/// Variables cannot appear in constant positions and become `null`.
pub fn value_from_ast(value: &ParserValue<'_, String>) -> Value {
    match value {
        ParserValue::Null | ParserValue::Variable(_) => Value::Null,
        ParserValue::Boolean(b) => Value::Bool(*b),
        ParserValue::String(s) => Value::String(s.clone()),
        ParserValue::Enum(e) => Value::String(e.clone()),
        ParserValue::Int(n) => n.as_i64().map(Value::from).unwrap_or(Value::Null),
        ParserValue::Float(n) => Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ParserValue::List(items) => Value::Array(items.iter().map(value_from_ast).collect()),
        ParserValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), value_from_ast(value)))
                .collect::<Map<String, Value>>(),
        ),
    }
}
