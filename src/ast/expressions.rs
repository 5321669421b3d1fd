use rust_decimal::Decimal;
use serde::Serialize;

use crate::ast::{ComparisonOp, ElementState};

/// Value expression.
///
/// Expressions appear as action arguments (`FILL x WITH <expr>`), variable
/// initializers and comparison operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expression {
    /// String literal
    ///
    /// # Example
    /// ```text
    /// "hello"
    /// ```
    String { value: String },

    /// Numeric literal, kept exact.
    ///
    /// # Example
    /// ```text
    /// 42
    /// -3.5
    /// ```
    Number { value: Decimal },

    /// `TRUE` / `FALSE`
    Boolean { value: bool },

    /// Environment variable reference, resolved when the script runs.
    ///
    /// # Example
    /// ```text
    /// {{BASE_URL}}
    /// ```
    EnvVar { name: String },

    /// Variable reference, optionally qualified by a page name or a
    /// row variable.
    ///
    /// # Examples
    /// ```text
    /// email            // scenario variable
    /// Login.greeting   // page variable
    /// row.name         // column of a loaded row
    /// ```
    Variable {
        qualifier: Option<String>,
        name: String,
    },

    /// String concatenation (`+`)
    Concat { parts: Vec<Expression> },
}

impl Expression {
    pub fn string(value: impl Into<String>) -> Self {
        Expression::String {
            value: value.into(),
        }
    }

    pub fn variable(qualifier: Option<&str>, name: impl Into<String>) -> Self {
        Expression::Variable {
            qualifier: qualifier.map(str::to_string),
            name: name.into(),
        }
    }

    /// Collects every variable reference in evaluation order.
    pub fn variables(&self) -> Vec<(Option<&str>, &str)> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'a>(&'a self, found: &mut Vec<(Option<&'a str>, &'a str)>) {
        match self {
            Expression::Variable { qualifier, name } => {
                found.push((qualifier.as_deref(), name.as_str()))
            }
            Expression::Concat { parts } => {
                for part in parts {
                    part.collect_variables(found);
                }
            }
            Expression::String { .. }
            | Expression::Number { .. }
            | Expression::Boolean { .. }
            | Expression::EnvVar { .. } => {}
        }
    }
}

/// What a statement acts on.
///
/// `page` is optional: targets may be bare field names resolved against the
/// feature's used pages, or raw selectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<Expression>,
}

impl Target {
    pub fn field(page: Option<&str>, field: impl Into<String>) -> Self {
        Target {
            page: page.map(str::to_string),
            field: Some(field.into()),
            selector: None,
        }
    }

    pub fn selector(selector: Expression) -> Self {
        Target {
            page: None,
            field: None,
            selector: Some(selector),
        }
    }
}

/// Condition of an `IF` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Condition {
    /// `IF Login.error IS VISIBLE`
    ElementState {
        target: Target,
        negated: bool,
        state: ElementState,
    },
    /// `IF count > 3`
    Comparison {
        left: Expression,
        op: ComparisonOp,
        right: Expression,
    },
    /// `IF rememberMe`
    Truthy { value: Expression },
}
