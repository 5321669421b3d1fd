//! VDQL rules: `LOAD ... FROM`, `ROW`/`ROWS` bindings and aggregations.

use super::{ParseResult, Parser};
use crate::ast::{
    Aggregation, ComparisonOp, DataCondition, DataQuery, LogicalOp, OrderBy, QueryMode,
    ResultType, StatementKind, TableRef, TokenKind, WhereClause,
};

impl Parser {
    /// `TEXT|NUMBER|LIST name = ROW|ROWS|<aggregation> ...`, as opposed to a
    /// plain variable declaration.
    pub(super) fn at_query_binding(&self) -> bool {
        self.peek(1).is_word()
            && self.check_at(2, TokenKind::Equals)
            && query_mode(self.peek(3).kind).is_some()
    }

    /// dataQueryStatement := LOAD name FROM tableRef queryClauses
    ///                     | resultType name "=" queryMode tableRef queryClauses
    pub(super) fn parse_data_query_statement(&mut self) -> ParseResult<StatementKind> {
        let keyword = self.advance();

        let (result_type, variable, mode, source) = if keyword.kind == TokenKind::Load {
            let variable = self.expect_binding("a name for the loaded rows")?;
            self.expect(TokenKind::From, "FROM and the table to load")?;
            let source = self.parse_table_ref()?;
            (ResultType::Data, variable, QueryMode::Load, source)
        } else {
            let result_type = match keyword.kind {
                TokenKind::Text => ResultType::Text,
                TokenKind::Number => ResultType::Number,
                TokenKind::List => ResultType::List,
                _ => ResultType::Data,
            };
            let variable = self.expect_binding("a variable name")?;
            self.expect(TokenKind::Equals, "'=' after the variable name")?;
            let Some(mode) = query_mode(self.current().kind) else {
                return Err(self.unexpected("ROW, ROWS, COUNT, SUM, AVERAGE, MIN, MAX or DISTINCT"));
            };
            self.advance();
            let source = self.parse_table_ref()?;
            (result_type, variable, mode, source)
        };

        let where_clause = if self.eat(TokenKind::Where) {
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat(TokenKind::Order) {
            self.expect(TokenKind::By, "BY after ORDER")?;
            order_by.push(self.parse_order_by()?);
            while self.eat(TokenKind::Comma) {
                order_by.push(self.parse_order_by()?);
            }
        }

        let limit = if self.eat(TokenKind::Limit) {
            Some(self.parse_count("a row limit")?)
        } else {
            None
        };
        let offset = if self.eat(TokenKind::Offset) {
            Some(self.parse_count("a row offset")?)
        } else {
            None
        };

        Ok(StatementKind::DataQuery(DataQuery {
            result_type,
            variable,
            mode,
            source,
            where_clause,
            order_by,
            limit,
            offset,
        }))
    }

    /// tableRef := name [ "." name ]
    fn parse_table_ref(&mut self) -> ParseResult<TableRef> {
        let table = self.expect_name("a table name")?;
        let column = if self.eat(TokenKind::Dot) {
            Some(self.expect_name("a column name")?)
        } else {
            None
        };
        Ok(TableRef { table, column })
    }

    /// whereClause := dataCondition ( (AND|OR) dataCondition )*
    fn parse_where_clause(&mut self) -> ParseResult<WhereClause> {
        let first = self.parse_data_condition()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.current().kind {
                TokenKind::And => LogicalOp::And,
                TokenKind::Or => LogicalOp::Or,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_data_condition()?));
        }
        Ok(WhereClause { first, rest })
    }

    /// dataCondition := column compareOp expression
    ///                | column (STARTS|ENDS) WITH expression
    ///                | column IS [NOT] EMPTY
    fn parse_data_condition(&mut self) -> ParseResult<DataCondition> {
        let column = self.expect_name("a column name")?;

        let op = match self.current().kind {
            TokenKind::EqEq | TokenKind::Equals => ComparisonOp::Equal,
            TokenKind::NotEq => ComparisonOp::NotEqual,
            TokenKind::Gt => ComparisonOp::GreaterThan,
            TokenKind::Lt => ComparisonOp::LessThan,
            TokenKind::GtEq => ComparisonOp::GreaterEqual,
            TokenKind::LtEq => ComparisonOp::LessEqual,
            TokenKind::Contains => ComparisonOp::Contains,
            TokenKind::Matches => ComparisonOp::Matches,
            TokenKind::Starts | TokenKind::Ends => {
                let op = if self.advance().kind == TokenKind::Starts {
                    ComparisonOp::StartsWith
                } else {
                    ComparisonOp::EndsWith
                };
                self.expect(TokenKind::With, "WITH")?;
                let value = self.parse_expression()?;
                return Ok(DataCondition {
                    column,
                    op,
                    value: Some(value),
                });
            }
            TokenKind::Is => {
                self.advance();
                let op = if self.eat(TokenKind::Not) {
                    ComparisonOp::IsNotEmpty
                } else {
                    ComparisonOp::IsEmpty
                };
                self.expect(TokenKind::Empty, "EMPTY")?;
                return Ok(DataCondition {
                    column,
                    op,
                    value: None,
                });
            }
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance();

        let value = self.parse_expression()?;
        Ok(DataCondition {
            column,
            op,
            value: Some(value),
        })
    }

    /// orderBy := column [ASC|DESC]
    fn parse_order_by(&mut self) -> ParseResult<OrderBy> {
        let column = self.expect_name("a column to order by")?;
        let descending = if self.eat(TokenKind::Desc) {
            true
        } else {
            self.eat(TokenKind::Asc);
            false
        };
        Ok(OrderBy { column, descending })
    }

    fn parse_count(&mut self, expected: &str) -> ParseResult<u64> {
        if self.check(TokenKind::NumberLiteral) {
            if let Ok(count) = self.current().value.parse::<u64>() {
                self.advance();
                return Ok(count);
            }
        }
        Err(self.unexpected(expected))
    }
}

fn query_mode(kind: TokenKind) -> Option<QueryMode> {
    let aggregation = match kind {
        TokenKind::Row => return Some(QueryMode::Row),
        TokenKind::Rows => return Some(QueryMode::Rows),
        TokenKind::Count => Aggregation::Count,
        TokenKind::Sum => Aggregation::Sum,
        TokenKind::Average => Aggregation::Average,
        TokenKind::Min => Aggregation::Min,
        TokenKind::Max => Aggregation::Max,
        TokenKind::Distinct => Aggregation::Distinct,
        _ => return None,
    };
    Some(QueryMode::Aggregate(aggregation))
}
