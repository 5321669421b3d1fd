use serde::Serialize;

use crate::ast::{ComparisonOp, Expression, LogicalOp};

/// Declared shape of a VDQL result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultType {
    Data,
    List,
    Number,
    Text,
}

/// Aggregations available to `NUMBER x = COUNT Users ...` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    Count,
    Sum,
    Average,
    Min,
    Max,
    Distinct,
}

/// How the query reads its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "aggregation", rename_all = "camelCase")]
pub enum QueryMode {
    /// `LOAD users FROM Users`: every matching row
    Load,
    /// `DATA user = ROW Users`: the first matching row
    Row,
    /// `LIST users = ROWS Users`: matching rows
    Rows,
    /// `NUMBER n = COUNT Users`
    Aggregate(Aggregation),
}

/// `Users` or `Users.email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// `column op value`. `value` is `None` for `IS EMPTY` / `IS NOT EMPTY`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCondition {
    pub column: String,
    pub op: ComparisonOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Expression>,
}

/// A `WHERE` clause.
///
/// Conditions are combined strictly left to right: `a OR b AND c` means
/// `(a OR b) AND c`. There is no precedence between `AND` and `OR`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereClause {
    pub first: DataCondition,
    pub rest: Vec<(LogicalOp, DataCondition)>,
}

impl WhereClause {
    pub fn conditions(&self) -> impl Iterator<Item = &DataCondition> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, c)| c))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// A VDQL data query bound to a scenario variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub result_type: ResultType,
    pub variable: String,
    pub mode: QueryMode,
    pub source: TableRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}
