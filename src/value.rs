use rust_decimal::Decimal;
use serde::Serialize;

/// A value bound to a scenario variable by a parameter combination.
///
/// Numbers are kept as [`Decimal`] so `0.1` is emitted as `0.1`, the same
/// way number literals in scripts are.
///
/// # Examples
///
/// ```
/// use vero_lang::ParamValue;
///
/// let email = ParamValue::String("admin@example.com".to_string());
/// let retries = ParamValue::Number(3.into());
/// assert_eq!(retries.as_label(), "3");
/// assert_eq!(email.as_label(), "admin@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Text used in default combination labels (`role=admin, retries=3`).
    pub fn as_label(&self) -> String {
        match self {
            ParamValue::Null => "null".to_string(),
            ParamValue::Boolean(b) => b.to_string(),
            ParamValue::Number(n) => n.normalize().to_string(),
            ParamValue::String(s) => s.clone(),
            ParamValue::List(items) => {
                let items: Vec<String> = items.iter().map(ParamValue::as_label).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

/// One named set of variable bindings. The same scenario is generated once
/// per combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamCombination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Bindings in declaration order.
    pub values: Vec<(String, ParamValue)>,
}

impl ParamCombination {
    pub fn new(values: Vec<(String, ParamValue)>) -> Self {
        ParamCombination {
            label: None,
            values,
        }
    }

    pub fn labelled(label: impl Into<String>, values: Vec<(String, ParamValue)>) -> Self {
        ParamCombination {
            label: Some(label.into()),
            values,
        }
    }

    /// The explicit label, or `k=v, ...` built from the bindings.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self
                .values
                .iter()
                .map(|(name, value)| format!("{}={}", name, value.as_label()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[test]
fn test_default_label() {
    let combination = ParamCombination::new(vec![
        ("role".to_string(), ParamValue::String("admin".to_string())),
        ("retries".to_string(), ParamValue::Number(Decimal::new(30, 1))),
    ]);
    assert_eq!(combination.display_label(), "role=admin, retries=3");
}
