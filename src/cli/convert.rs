//! JSON -> parameter combination conversion

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::CliError;
use crate::value::{ParamCombination, ParamValue};

static BINDING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));

/// Names a generated test already uses, plus TypeScript reserved words.
const TAKEN_NAMES: &[&str] = &[
    "page", "browser", "test", "expect", "testData", "process", "String", "RegExp", "await",
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
];

/// A parameter becomes a `const` in every generated test, so its name must be
/// a plain identifier that shadows nothing the test relies on.
fn check_binding_name(name: &str, index: usize) -> Result<(), CliError> {
    if !BINDING_NAME.is_match(name) {
        return Err(CliError::InvalidParams(format!(
            "'{}' in combination #{} is not a valid variable name",
            name,
            index + 1
        )));
    }
    if TAKEN_NAMES.contains(&name) {
        return Err(CliError::InvalidParams(format!(
            "'{}' in combination #{} is reserved and cannot be a parameter",
            name,
            index + 1
        )));
    }
    Ok(())
}

/// Convert serde_json::Value to a bound parameter value
///
/// Objects have no counterpart in the language and are rejected.
pub fn json_to_param(v: serde_json::Value) -> Result<ParamValue, CliError> {
    Ok(match v {
        serde_json::Value::Null => ParamValue::Null,
        serde_json::Value::Bool(b) => ParamValue::Boolean(b),
        serde_json::Value::Number(n) => ParamValue::Number(
            Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map_err(|e| CliError::InvalidParams(format!("number {}: {}", n, e)))?,
        ),
        serde_json::Value::String(s) => ParamValue::String(s),
        serde_json::Value::Array(arr) => ParamValue::List(
            arr.into_iter()
                .map(json_to_param)
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(_) => {
            return Err(CliError::InvalidParams(
                "nested objects cannot be bound to a variable".to_string(),
            ));
        }
    })
}

/// Reads a parameter file: an array whose items are either
/// `{ "label": "...", "values": { ... } }` or a flat `{ "name": value }`.
pub fn json_to_combinations(json: &str) -> Result<Vec<ParamCombination>, CliError> {
    let serde_json::Value::Array(items) = serde_json::from_str::<serde_json::Value>(json)? else {
        return Err(CliError::InvalidParams(
            "expected an array of combinations".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let serde_json::Value::Object(mut object) = item else {
                return Err(CliError::InvalidParams(format!(
                    "combination #{} is not an object",
                    index + 1
                )));
            };

            let wrapped = matches!(object.get("values"), Some(serde_json::Value::Object(_)))
                && object.keys().all(|key| key == "values" || key == "label");
            let (label, bindings) = if wrapped {
                let label = match object.remove("label") {
                    Some(serde_json::Value::String(label)) => Some(label),
                    None => None,
                    Some(_) => {
                        return Err(CliError::InvalidParams(format!(
                            "label of combination #{} must be a string",
                            index + 1
                        )));
                    }
                };
                match object.remove("values") {
                    Some(serde_json::Value::Object(values)) => (label, values),
                    _ => (label, serde_json::Map::new()),
                }
            } else {
                (None, object)
            };

            let values = bindings
                .into_iter()
                .map(|(name, value)| {
                    check_binding_name(&name, index)?;
                    Ok((name, json_to_param(value)?))
                })
                .collect::<Result<Vec<_>, CliError>>()?;
            Ok(ParamCombination { label, values })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_item_shapes() {
        let combinations = json_to_combinations(
            r#"[
                { "label": "admin user", "values": { "role": "admin", "retries": 3 } },
                { "role": "viewer", "retries": 0.5, "tags": ["a", null] }
            ]"#,
        )
        .unwrap();

        assert_eq!(combinations[0].display_label(), "admin user");
        assert_eq!(combinations[0].values.len(), 2);
        assert_eq!(
            combinations[1].display_label(),
            "role=viewer, retries=0.5, tags=[a, null]"
        );
    }

    #[test]
    fn test_rejects_non_array_root() {
        assert!(matches!(
            json_to_combinations(r#"{ "role": "admin" }"#),
            Err(CliError::InvalidParams(_))
        ));
        assert!(matches!(
            json_to_combinations(r#"[{ "user": { "name": "x" } }]"#),
            Err(CliError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_rejects_unusable_names() {
        for json in [
            r#"[{ "first name": "Ada" }]"#,
            r#"[{ "1st": "Ada" }]"#,
            r#"[{ "page": "/home" }]"#,
            r#"[{ "label": "x", "values": { "class": "a" } }]"#,
        ] {
            let error = json_to_combinations(json).unwrap_err();
            assert!(matches!(error, CliError::InvalidParams(_)), "{}", json);
        }

        let combinations = json_to_combinations(r#"[{ "first_name": "Ada", "_id": 1 }]"#).unwrap();
        assert_eq!(combinations[0].values[0].0, "first_name");
    }
}
