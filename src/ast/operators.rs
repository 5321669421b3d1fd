use serde::Serialize;

/// Comparison operators shared by `IF` conditions and VDQL `WHERE` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOp {
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than (`<`)
    LessThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Substring match (`CONTAINS`)
    Contains,
    /// Prefix match (`STARTS WITH`), VDQL only
    StartsWith,
    /// Suffix match (`ENDS WITH`), VDQL only
    EndsWith,
    /// Regular-expression match (`MATCHES`), VDQL only
    Matches,
    /// Blank value (`IS EMPTY`), VDQL only
    IsEmpty,
    /// Non-blank value (`IS NOT EMPTY`), VDQL only
    IsNotEmpty,
}

impl ComparisonOp {
    /// Unary operators take no right-hand value.
    pub fn is_unary(self) -> bool {
        matches!(self, ComparisonOp::IsEmpty | ComparisonOp::IsNotEmpty)
    }
}

/// Connective between VDQL conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalOp {
    And,
    Or,
}

/// Element states usable in `VERIFY ... IS` and `IF ... IS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementState {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Checked,
    Empty,
    Focused,
}
