use std::str::FromStr;

use log::trace;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{
    ast::{
        ActionDefinition, ActionRef, Assertion, ComparisonOp, Condition, ElementState,
        Expression, Feature, Field, Hook, HookKind, Page, PageActions, Program, Scenario,
        ScrollDirection, Statement, StatementKind, Target, Token, TokenKind, UrlMatch, UseRef,
        Variable, VariableKind, WaitUnit,
    },
    diagnostics::{self, Diagnostic},
    lexer,
};

mod query;

/// A syntax error. Each carries the position of the offending token.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseError {
    #[error("Expected {expected}, found {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Unclosed {block} block opened at line {line}, column {column}")]
    UnclosedBlock {
        block: String,
        line: usize,
        column: usize,
    },
    #[error("Incomplete {statement} statement at line {line}: expected {expected}")]
    IncompleteStatement {
        statement: String,
        expected: String,
        line: usize,
        column: usize,
    },
    #[error("Unknown statement {found} at line {line}, column {column}")]
    UnknownStatement {
        found: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. }
            | ParseError::UnclosedBlock { line, .. }
            | ParseError::IncompleteStatement { line, .. }
            | ParseError::UnknownStatement { line, .. } => *line,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                line,
                column,
            } => diagnostics::unexpected_token(expected, found, *line, *column),
            ParseError::UnclosedBlock {
                block,
                line,
                column,
            } => diagnostics::missing_closing_brace(block, *line, *column),
            ParseError::IncompleteStatement {
                statement,
                expected,
                line,
                column,
            } => diagnostics::incomplete_statement(statement, expected, *line, *column),
            ParseError::UnknownStatement {
                found,
                line,
                column,
            } => diagnostics::unknown_statement(found, *line, *column),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// The (possibly partial) program and every syntax error found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseOutput {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParseError>,
    /// Keyword and line of the statement being parsed, for "incomplete" errors.
    statement: Option<(String, usize)>,
    /// Set once an unclosed block has been reported, so enclosing blocks
    /// that also run into the end do not report it again.
    unclosed_reported: bool,
}

impl Parser {
    /// Creates a parser over a token stream. Comment tokens are dropped and a
    /// trailing `Eof` is guaranteed.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column + 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Parser {
            tokens,
            position: 0,
            errors: Vec::new(),
            statement: None,
            unclosed_reported: false,
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.position + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn check_at(&self, offset: usize, kind: TokenKind) -> bool {
        self.peek(offset).kind == kind
    }

    /// Consumes the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Builds the error for the current token. Inside a statement, running
    /// into the end of the line or file is reported as an incomplete statement.
    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        if let Some((statement, line)) = &self.statement {
            if token.kind == TokenKind::Eof || token.line > *line {
                return ParseError::IncompleteStatement {
                    statement: statement.clone(),
                    expected: expected.to_string(),
                    line: *line,
                    column: token.column,
                };
            }
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.display(),
            line: token.line,
            column: token.column,
        }
    }

    /// Any word, keywords included. Used for declaration names, members after
    /// `.`, and other positions where no statement can start.
    fn expect_name(&mut self, expected: &str) -> ParseResult<String> {
        if self.current().is_word() {
            Ok(self.advance().value)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// A name that later statements read back bare: parameters, loop items and
    /// declared variables. Statement keywords are rejected here because a bare
    /// `number` or `check` could never be referenced afterwards.
    fn expect_binding(&mut self, expected: &str) -> ParseResult<String> {
        if self.at_bare_name() {
            Ok(self.advance().value)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Whether the current word can stand alone as a variable or field name.
    /// Keywords that introduce statements or connect clauses cannot.
    fn at_bare_name(&self) -> bool {
        let kind = self.current().kind;
        kind == TokenKind::Identifier
            || (kind.is_keyword()
                && !kind.starts_statement()
                && !kind.starts_declaration()
                && !matches!(
                    kind,
                    TokenKind::Scenario
                        | TokenKind::Use
                        | TokenKind::Before
                        | TokenKind::After
                        | TokenKind::Else
                        | TokenKind::Field
                        | TokenKind::True
                        | TokenKind::False
                        | TokenKind::With
                        | TokenKind::To
                        | TokenKind::From
                        | TokenKind::As
                        | TokenKind::Is
                        | TokenKind::Not
                        | TokenKind::Has
                        | TokenKind::Contains
                        | TokenKind::Matches
                        | TokenKind::Where
                        | TokenKind::And
                        | TokenKind::Or
                        | TokenKind::Order
                        | TokenKind::By
                        | TokenKind::Limit
                        | TokenKind::Offset
                        | TokenKind::Times
                        | TokenKind::In
                        | TokenKind::Each
                        | TokenKind::Seconds
                        | TokenKind::Milliseconds
                        | TokenKind::Starts
                        | TokenKind::Ends
                ))
    }

    /// A word followed by `.` and another word: `Login.email`, `row.name`.
    fn at_qualified_name(&self) -> bool {
        self.current().is_word() && self.check_at(1, TokenKind::Dot) && self.peek(2).is_word()
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Skips the rest of a failed statement: stops at the next statement
    /// keyword on a later line, at the `}` closing the enclosing block, or at
    /// a top-level declaration.
    fn synchronize_statement(&mut self, start_line: usize) {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => return,
                kind if kind.starts_declaration() && depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => depth -= 1,
                kind if depth == 0 && kind.starts_statement() && token.line > start_line => {
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips a failed page, library or feature member.
    fn synchronize_member(&mut self, start_line: usize, is_member_start: fn(&Parser) -> bool) {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => return,
                kind if kind.starts_declaration() && depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => depth -= 1,
                _ if depth == 0 && token.line > start_line && is_member_start(self) => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips to the next `PAGE`, `PAGEACTIONS` or `FEATURE`.
    fn synchronize_declaration(&mut self) {
        self.advance();
        while !self.check(TokenKind::Eof) && !self.current().kind.starts_declaration() {
            self.advance();
        }
    }

    /// Records a block that ran into the end of its declaration. The caller
    /// keeps what it parsed so far and returns it.
    fn unclosed(&mut self, block: &str, open: &Token) {
        if self.unclosed_reported {
            return;
        }
        self.unclosed_reported = true;
        self.errors.push(ParseError::UnclosedBlock {
            block: block.to_string(),
            line: open.line,
            column: open.column,
        });
    }

    /// Whether a block loop has run into the end of its enclosing declaration.
    fn at_block_end(&self) -> bool {
        self.check(TokenKind::Eof) || self.current().kind.starts_declaration()
    }

    // ========================================================================
    // program / declaration
    // ========================================================================

    /// program := declaration* EOF
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.check(TokenKind::Eof) {
            self.unclosed_reported = false;
            if let Err(error) = self.parse_declaration(&mut program) {
                self.errors.push(error);
                self.synchronize_declaration();
            }
        }

        program
    }

    /// declaration := pageDeclaration | pageActionsDeclaration | featureDeclaration
    fn parse_declaration(&mut self, program: &mut Program) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Page => program.pages.push(self.parse_page_declaration()?),
            TokenKind::PageActions => program
                .page_actions
                .push(self.parse_page_actions_declaration()?),
            TokenKind::Feature => program.features.push(self.parse_feature_declaration()?),
            _ => return Err(self.unexpected("PAGE, PAGEACTIONS or FEATURE")),
        }
        Ok(())
    }

    /// pageDeclaration := PAGE name [ "(" STRING ")" ] "{" pageMember* "}"
    fn parse_page_declaration(&mut self) -> ParseResult<Page> {
        let keyword = self.advance();
        let name = self.expect_name("a page name")?;

        let url = if self.eat(TokenKind::LParen) {
            let url = self.expect(TokenKind::StringLiteral, "the page URL in quotes")?;
            self.expect(TokenKind::RParen, "')'")?;
            Some(url.value)
        } else {
            None
        };

        let mut page = Page {
            name,
            url,
            fields: Vec::new(),
            variables: Vec::new(),
            actions: Vec::new(),
            line: keyword.line,
        };

        let open = self.expect(TokenKind::LBrace, "'{' to open the page")?;
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_block_end() {
                self.unclosed("page", &open);
                break;
            }
            let start_line = self.current().line;
            if let Err(error) = self.parse_page_member(&mut page) {
                self.statement = None;
                self.errors.push(error);
                self.synchronize_member(start_line, Parser::at_page_member);
            }
        }

        Ok(page)
    }

    fn at_page_member(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Field
                | TokenKind::Text
                | TokenKind::Number
                | TokenKind::Flag
                | TokenKind::List
        ) || self.at_action_definition()
    }

    fn at_action_definition(&self) -> bool {
        self.current().is_word()
            && (self.check_at(1, TokenKind::LBrace) || self.check_at(1, TokenKind::With))
    }

    /// pageMember := FIELD name "=" selectorExpression
    ///             | variableKind name "=" expression
    ///             | actionDefinition
    fn parse_page_member(&mut self, page: &mut Page) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Field => page.fields.push(self.parse_field_declaration()?),
            TokenKind::Text | TokenKind::Number | TokenKind::Flag | TokenKind::List
                if !self.at_action_definition() =>
            {
                page.variables.push(self.parse_page_variable()?)
            }
            _ if self.at_action_definition() => {
                page.actions.push(self.parse_action_definition()?)
            }
            _ => return Err(self.unexpected("FIELD, a variable or an action definition")),
        }
        Ok(())
    }

    fn parse_field_declaration(&mut self) -> ParseResult<Field> {
        let keyword = self.advance();
        self.statement = Some(("FIELD".to_string(), keyword.line));
        let name = self.expect_name("a field name")?;
        self.expect(TokenKind::Equals, "'=' after the field name")?;
        let selector = self.parse_selector_expression()?;
        self.statement = None;
        Ok(Field {
            name,
            selector,
            line: keyword.line,
        })
    }

    fn parse_page_variable(&mut self) -> ParseResult<Variable> {
        let keyword = self.advance();
        self.statement = Some((keyword.value.to_uppercase(), keyword.line));
        let kind = variable_kind(keyword.kind);
        let name = self.expect_name("a variable name")?;
        self.expect(TokenKind::Equals, "'=' after the variable name")?;
        let value = self.parse_expression()?;
        self.statement = None;
        Ok(Variable {
            kind,
            name,
            value,
            line: keyword.line,
        })
    }

    /// actionDefinition := name [ WITH name ("," name)* ] "{" statement* "}"
    fn parse_action_definition(&mut self) -> ParseResult<ActionDefinition> {
        let line = self.current().line;
        let name = self.expect_name("an action name")?;
        let mut parameters = Vec::new();
        if self.eat(TokenKind::With) {
            parameters.push(self.expect_binding("a parameter name")?);
            while self.eat(TokenKind::Comma) {
                parameters.push(self.expect_binding("a parameter name")?);
            }
        }
        let statements = self.parse_block("action")?;
        Ok(ActionDefinition {
            name,
            parameters,
            statements,
            line,
        })
    }

    /// pageActionsDeclaration := PAGEACTIONS name [ FOR name ] "{" actionDefinition* "}"
    fn parse_page_actions_declaration(&mut self) -> ParseResult<PageActions> {
        let keyword = self.advance();
        let name = self.expect_name("a page actions name")?;
        let for_page = if self.eat(TokenKind::For) {
            Some(self.expect_name("a page name after FOR")?)
        } else {
            None
        };

        let mut library = PageActions {
            name,
            for_page,
            actions: Vec::new(),
            line: keyword.line,
        };

        let open = self.expect(TokenKind::LBrace, "'{' to open the page actions")?;
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_block_end() {
                self.unclosed("page actions", &open);
                break;
            }
            let start_line = self.current().line;
            let result = if self.at_action_definition() {
                self.parse_action_definition()
            } else {
                Err(self.unexpected("an action definition"))
            };
            match result {
                Ok(action) => library.actions.push(action),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize_member(start_line, Parser::at_action_definition);
                }
            }
        }

        Ok(library)
    }

    /// featureDeclaration := FEATURE (name|STRING) TAG* "{" featureMember* "}"
    fn parse_feature_declaration(&mut self) -> ParseResult<Feature> {
        let keyword = self.advance();
        let name = if self.check(TokenKind::StringLiteral) {
            self.advance().value
        } else {
            self.expect_name("a feature name")?
        };
        let tags = self.parse_tags();

        let mut feature = Feature {
            name,
            tags,
            uses: Vec::new(),
            hooks: Vec::new(),
            scenarios: Vec::new(),
            line: keyword.line,
        };

        let open = self.expect(TokenKind::LBrace, "'{' to open the feature")?;
        let mut pending_tags = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_block_end() {
                self.unclosed("feature", &open);
                break;
            }
            let start_line = self.current().line;
            if let Err(error) = self.parse_feature_member(&mut feature, &mut pending_tags) {
                self.errors.push(error);
                pending_tags.clear();
                self.synchronize_member(start_line, Parser::at_feature_member);
            }
        }

        Ok(feature)
    }

    fn at_feature_member(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Use
                | TokenKind::Scenario
                | TokenKind::Before
                | TokenKind::After
                | TokenKind::Tag
        )
    }

    /// featureMember := USE name ("," name)* | hookDeclaration | TAG* scenarioDeclaration
    fn parse_feature_member(
        &mut self,
        feature: &mut Feature,
        pending_tags: &mut Vec<String>,
    ) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Tag => pending_tags.extend(self.parse_tags()),
            TokenKind::Use => {
                self.advance();
                loop {
                    let line = self.current().line;
                    let name = self.expect_name("a page name after USE")?;
                    feature.uses.push(UseRef { name, line });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            TokenKind::Before | TokenKind::After => {
                feature.hooks.push(self.parse_hook_declaration()?)
            }
            TokenKind::Scenario => {
                let mut scenario = self.parse_scenario_declaration()?;
                let mut tags = std::mem::take(pending_tags);
                tags.append(&mut scenario.tags);
                scenario.tags = tags;
                feature.scenarios.push(scenario);
            }
            _ => return Err(self.unexpected("USE, SCENARIO, BEFORE or AFTER")),
        }
        Ok(())
    }

    /// hookDeclaration := (BEFORE|AFTER) (EACH|ALL) "{" statement* "}"
    fn parse_hook_declaration(&mut self) -> ParseResult<Hook> {
        let keyword = self.advance();
        let each = match self.current().kind {
            TokenKind::Each => true,
            TokenKind::All => false,
            _ => return Err(self.unexpected("EACH or ALL")),
        };
        self.advance();
        let kind = match (keyword.kind, each) {
            (TokenKind::Before, true) => HookKind::BeforeEach,
            (TokenKind::Before, false) => HookKind::BeforeAll,
            (_, true) => HookKind::AfterEach,
            (_, false) => HookKind::AfterAll,
        };
        let statements = self.parse_block("hook")?;
        Ok(Hook {
            kind,
            statements,
            line: keyword.line,
        })
    }

    /// scenarioDeclaration := SCENARIO (STRING|name) TAG* "{" statement* "}"
    fn parse_scenario_declaration(&mut self) -> ParseResult<Scenario> {
        let keyword = self.advance();
        let name = if self.check(TokenKind::StringLiteral) {
            self.advance().value
        } else {
            self.expect_name("a scenario name")?
        };
        let tags = self.parse_tags();
        let statements = self.parse_block("scenario")?;
        Ok(Scenario {
            name,
            tags,
            statements,
            line: keyword.line,
        })
    }

    fn parse_tags(&mut self) -> Vec<String> {
        let mut tags = Vec::new();
        while self.check(TokenKind::Tag) {
            tags.push(self.advance().value);
        }
        tags
    }

    /// "{" statement* "}" with statement-level recovery.
    fn parse_block(&mut self, block: &str) -> ParseResult<Vec<Statement>> {
        let open = self.expect(TokenKind::LBrace, &format!("'{{' to open the {}", block))?;
        let mut statements = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            if self.at_block_end() {
                self.unclosed(block, &open);
                break;
            }
            let start_line = self.current().line;
            let enclosing = self.statement.clone();
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.statement = enclosing;
                    self.errors.push(error);
                    self.synchronize_statement(start_line);
                }
            }
        }
        Ok(statements)
    }

    // ========================================================================
    // statement
    // ========================================================================

    /// statement := actionStatement | assertionStatement | controlFlowStatement
    ///            | variableDeclaration | performStatement | dataQueryStatement
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current().clone();
        let enclosing = self
            .statement
            .replace((start.value.to_uppercase(), start.line));

        let kind = match start.kind {
            TokenKind::Verify => self.parse_assertion_statement(),
            TokenKind::If | TokenKind::Repeat | TokenKind::For => {
                self.parse_control_flow_statement()
            }
            TokenKind::Perform => self.parse_perform_statement(),
            TokenKind::Load | TokenKind::Data => self.parse_data_query_statement(),
            TokenKind::Text | TokenKind::Number | TokenKind::List if self.at_query_binding() => {
                self.parse_data_query_statement()
            }
            TokenKind::Text | TokenKind::Number | TokenKind::List | TokenKind::Flag => {
                self.parse_variable_declaration()
            }
            kind if kind.starts_statement() => self.parse_action_statement(),
            _ => Err(ParseError::UnknownStatement {
                found: start.display(),
                line: start.line,
                column: start.column,
            }),
        }?;

        self.statement = enclosing;
        Ok(Statement::new(kind, start.line))
    }

    /// actionStatement := one sub-rule per action verb
    fn parse_action_statement(&mut self) -> ParseResult<StatementKind> {
        match self.current().kind {
            TokenKind::Open | TokenKind::Navigate => self.parse_open_action(),
            TokenKind::Click => self.parse_click_action(),
            TokenKind::Fill => self.parse_fill_action(),
            TokenKind::Hover => self.parse_hover_action(),
            TokenKind::Check => self.parse_check_action(),
            TokenKind::Uncheck => self.parse_uncheck_action(),
            TokenKind::Select => self.parse_select_action(),
            TokenKind::Scroll => self.parse_scroll_action(),
            TokenKind::Press => self.parse_press_action(),
            TokenKind::Drag => self.parse_drag_action(),
            TokenKind::Upload => self.parse_upload_action(),
            TokenKind::Wait => self.parse_wait_action(),
            TokenKind::Refresh => {
                self.advance();
                Ok(StatementKind::Refresh)
            }
            TokenKind::Clear => self.parse_clear_action(),
            TokenKind::Take => self.parse_screenshot_action(),
            TokenKind::Log => self.parse_log_action(),
            TokenKind::Switch => self.parse_switch_action(),
            TokenKind::Close => self.parse_close_action(),
            TokenKind::Accept | TokenKind::Dismiss => self.parse_dialog_action(),
            _ => Err(self.unexpected("an action")),
        }
    }

    /// openAction := OPEN expression | NAVIGATE TO expression
    fn parse_open_action(&mut self) -> ParseResult<StatementKind> {
        if self.advance().kind == TokenKind::Navigate {
            self.expect(TokenKind::To, "TO after NAVIGATE")?;
        }
        let url = self.parse_expression()?;
        Ok(StatementKind::Open { url })
    }

    /// clickAction := CLICK target
    fn parse_click_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let target = self.parse_target()?;
        Ok(StatementKind::Click { target })
    }

    /// fillAction := FILL target WITH expression
    fn parse_fill_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let target = self.parse_target()?;
        self.expect(TokenKind::With, "WITH and the value to type")?;
        let value = self.parse_expression()?;
        Ok(StatementKind::Fill { target, value })
    }

    /// hoverAction := HOVER target
    fn parse_hover_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let target = self.parse_target()?;
        Ok(StatementKind::Hover { target })
    }

    /// checkAction := CHECK target
    fn parse_check_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let target = self.parse_target()?;
        Ok(StatementKind::Check { target })
    }

    /// uncheckAction := UNCHECK target
    fn parse_uncheck_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let target = self.parse_target()?;
        Ok(StatementKind::Uncheck { target })
    }

    /// selectAction := SELECT expression FROM target
    fn parse_select_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let option = self.parse_expression()?;
        self.expect(TokenKind::From, "FROM and the dropdown to select in")?;
        let target = self.parse_target()?;
        Ok(StatementKind::Select { option, target })
    }

    /// scrollAction := SCROLL (UP | DOWN | TO target)
    fn parse_scroll_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        match self.current().kind {
            TokenKind::Up | TokenKind::Down => {
                let direction = if self.advance().kind == TokenKind::Up {
                    ScrollDirection::Up
                } else {
                    ScrollDirection::Down
                };
                Ok(StatementKind::Scroll {
                    direction: Some(direction),
                    target: None,
                })
            }
            TokenKind::To => {
                self.advance();
                let target = self.parse_target()?;
                Ok(StatementKind::Scroll {
                    direction: None,
                    target: Some(target),
                })
            }
            _ => Err(self.unexpected("UP, DOWN or TO")),
        }
    }

    /// pressAction := PRESS expression
    fn parse_press_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let key = self.parse_expression()?;
        Ok(StatementKind::Press { key })
    }

    /// dragAction := DRAG target TO target
    fn parse_drag_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let source = self.parse_target()?;
        self.expect(TokenKind::To, "TO and the drop target")?;
        let destination = self.parse_target()?;
        Ok(StatementKind::Drag {
            source,
            destination,
        })
    }

    /// uploadAction := UPLOAD expression TO target
    fn parse_upload_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let file = self.parse_expression()?;
        self.expect(TokenKind::To, "TO and the file input")?;
        let target = self.parse_target()?;
        Ok(StatementKind::Upload { file, target })
    }

    /// waitAction := WAIT FOR target | WAIT expression [SECONDS | MILLISECONDS]
    fn parse_wait_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        if self.eat(TokenKind::For) {
            let target = self.parse_target()?;
            return Ok(StatementKind::WaitFor { target });
        }
        let amount = self.parse_expression()?;
        let unit = if self.eat(TokenKind::Milliseconds) {
            WaitUnit::Milliseconds
        } else {
            self.eat(TokenKind::Seconds);
            WaitUnit::Seconds
        };
        Ok(StatementKind::Wait { amount, unit })
    }

    /// clearAction := CLEAR COOKIES | CLEAR STORAGE | CLEAR target
    fn parse_clear_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        if self.eat(TokenKind::Cookies) {
            return Ok(StatementKind::ClearCookies);
        }
        if self.eat(TokenKind::Storage) {
            return Ok(StatementKind::ClearStorage);
        }
        let target = self.parse_target()?;
        Ok(StatementKind::Clear { target })
    }

    /// screenshotAction := TAKE SCREENSHOT [AS expression]
    fn parse_screenshot_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        self.expect(TokenKind::Screenshot, "SCREENSHOT after TAKE")?;
        let name = if self.eat(TokenKind::As) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(StatementKind::Screenshot { name })
    }

    /// logAction := LOG expression
    fn parse_log_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let message = self.parse_expression()?;
        Ok(StatementKind::Log { message })
    }

    /// switchAction := SWITCH TO ( NEW TAB [expression] | TAB expression
    ///                           | FRAME target | MAIN FRAME )
    fn parse_switch_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        self.expect(TokenKind::To, "TO after SWITCH")?;
        match self.current().kind {
            TokenKind::New => {
                self.advance();
                self.expect(TokenKind::Tab, "TAB after NEW")?;
                let url = if self.at_expression_start() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(StatementKind::SwitchToNewTab { url })
            }
            TokenKind::Tab => {
                self.advance();
                let index = self.parse_expression()?;
                Ok(StatementKind::SwitchToTab { index })
            }
            TokenKind::Frame => {
                self.advance();
                let target = self.parse_target()?;
                Ok(StatementKind::SwitchToFrame { target })
            }
            TokenKind::Main => {
                self.advance();
                self.expect(TokenKind::Frame, "FRAME after MAIN")?;
                Ok(StatementKind::SwitchToMainFrame)
            }
            _ => Err(self.unexpected("NEW TAB, TAB, FRAME or MAIN FRAME")),
        }
    }

    /// closeAction := CLOSE TAB
    fn parse_close_action(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        self.expect(TokenKind::Tab, "TAB after CLOSE")?;
        Ok(StatementKind::CloseTab)
    }

    /// dialogAction := ACCEPT DIALOG [WITH expression] | DISMISS DIALOG
    fn parse_dialog_action(&mut self) -> ParseResult<StatementKind> {
        let keyword = self.advance();
        self.expect(TokenKind::Dialog, "DIALOG")?;
        if keyword.kind == TokenKind::Dismiss {
            return Ok(StatementKind::DismissDialog);
        }
        let prompt = if self.eat(TokenKind::With) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(StatementKind::AcceptDialog { prompt })
    }

    /// assertionStatement := VERIFY ( URL urlMatch expression
    ///                              | TITLE (IS|CONTAINS) expression
    ///                              | target assertionTail )
    fn parse_assertion_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();

        if self.check(TokenKind::Url) && !self.check_at(1, TokenKind::Dot) {
            self.advance();
            let matcher = match self.current().kind {
                TokenKind::Is => UrlMatch::Is,
                TokenKind::Contains => UrlMatch::Contains,
                TokenKind::Matches => UrlMatch::Matches,
                _ => return Err(self.unexpected("IS, CONTAINS or MATCHES")),
            };
            self.advance();
            let expected = self.parse_expression()?;
            return Ok(StatementKind::Verify(Assertion::Url { matcher, expected }));
        }

        if self.check(TokenKind::Title) && !self.check_at(1, TokenKind::Dot) {
            self.advance();
            let contains = match self.current().kind {
                TokenKind::Is => false,
                TokenKind::Contains => true,
                _ => return Err(self.unexpected("IS or CONTAINS")),
            };
            self.advance();
            let expected = self.parse_expression()?;
            return Ok(StatementKind::Verify(Assertion::Title { contains, expected }));
        }

        let target = self.parse_target()?;
        let assertion = self.parse_assertion_tail(target)?;
        Ok(StatementKind::Verify(assertion))
    }

    /// assertionTail := IS [NOT] state
    ///                | [NOT] HAS TEXT expression | [NOT] CONTAINS [TEXT] expression
    ///                | [NOT] HAS VALUE expression
    ///                | HAS ATTRIBUTE expression "=" expression
    ///                | HAS COUNT expression
    fn parse_assertion_tail(&mut self, target: Target) -> ParseResult<Assertion> {
        if self.eat(TokenKind::Is) {
            let negated = self.eat(TokenKind::Not);
            let state = self.parse_element_state()?;
            return Ok(Assertion::State {
                target,
                negated,
                state,
            });
        }

        let negated = self.eat(TokenKind::Not);

        if self.eat(TokenKind::Contains) {
            self.eat(TokenKind::Text);
            let expected = self.parse_expression()?;
            return Ok(Assertion::Text {
                target,
                negated,
                contains: true,
                expected,
            });
        }

        self.expect(TokenKind::Has, "IS, HAS or CONTAINS")?;
        match self.current().kind {
            TokenKind::Text => {
                self.advance();
                let expected = self.parse_expression()?;
                Ok(Assertion::Text {
                    target,
                    negated,
                    contains: false,
                    expected,
                })
            }
            TokenKind::Value => {
                self.advance();
                let expected = self.parse_expression()?;
                Ok(Assertion::Value {
                    target,
                    negated,
                    expected,
                })
            }
            TokenKind::Attribute if !negated => {
                self.advance();
                let name = self.parse_expression()?;
                self.expect(TokenKind::Equals, "'=' and the expected attribute value")?;
                let expected = self.parse_expression()?;
                Ok(Assertion::Attribute {
                    target,
                    name,
                    expected,
                })
            }
            TokenKind::Count if !negated => {
                self.advance();
                let expected = self.parse_expression()?;
                Ok(Assertion::Count { target, expected })
            }
            _ if negated => Err(self.unexpected("TEXT or VALUE")),
            _ => Err(self.unexpected("TEXT, VALUE, ATTRIBUTE or COUNT")),
        }
    }

    fn parse_element_state(&mut self) -> ParseResult<ElementState> {
        let state = match self.current().kind {
            TokenKind::Visible => ElementState::Visible,
            TokenKind::Hidden => ElementState::Hidden,
            TokenKind::Enabled => ElementState::Enabled,
            TokenKind::Disabled => ElementState::Disabled,
            TokenKind::Checked => ElementState::Checked,
            TokenKind::Empty => ElementState::Empty,
            TokenKind::Focused => ElementState::Focused,
            _ => {
                return Err(self.unexpected(
                    "VISIBLE, HIDDEN, ENABLED, DISABLED, CHECKED, EMPTY or FOCUSED",
                ));
            }
        };
        self.advance();
        Ok(state)
    }

    /// controlFlowStatement := ifStatement | repeatStatement | forEachStatement
    fn parse_control_flow_statement(&mut self) -> ParseResult<StatementKind> {
        match self.current().kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Repeat => self.parse_repeat_statement(),
            _ => self.parse_for_each_statement(),
        }
    }

    /// ifStatement := IF condition "{" statement* "}" [ ELSE (ifStatement | "{" statement* "}") ]
    fn parse_if_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let condition = self.parse_condition()?;
        let then_branch = self.parse_block("IF")?;
        let else_branch = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let line = self.current().line;
                let nested = self.parse_if_statement()?;
                vec![Statement::new(nested, line)]
            } else {
                self.parse_block("ELSE")?
            }
        } else {
            Vec::new()
        };
        Ok(StatementKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// condition := expression IS [NOT] state | expression compareOp expression | expression
    fn parse_condition(&mut self) -> ParseResult<Condition> {
        let left = self.parse_expression()?;

        if self.check(TokenKind::Is) {
            let is = self.current().clone();
            self.advance();
            let negated = self.eat(TokenKind::Not);
            let state = self.parse_element_state()?;
            let target = expression_into_target(left).ok_or(ParseError::UnexpectedToken {
                expected: "an element before IS".to_string(),
                found: is.display(),
                line: is.line,
                column: is.column,
            })?;
            return Ok(Condition::ElementState {
                target,
                negated,
                state,
            });
        }

        let op = match self.current().kind {
            TokenKind::EqEq | TokenKind::Equals => Some(ComparisonOp::Equal),
            TokenKind::NotEq => Some(ComparisonOp::NotEqual),
            TokenKind::Gt => Some(ComparisonOp::GreaterThan),
            TokenKind::Lt => Some(ComparisonOp::LessThan),
            TokenKind::GtEq => Some(ComparisonOp::GreaterEqual),
            TokenKind::LtEq => Some(ComparisonOp::LessEqual),
            TokenKind::Contains => Some(ComparisonOp::Contains),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let right = self.parse_expression()?;
                Ok(Condition::Comparison { left, op, right })
            }
            None => Ok(Condition::Truthy { value: left }),
        }
    }

    /// repeatStatement := REPEAT expression TIMES "{" statement* "}"
    fn parse_repeat_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let times = self.parse_expression()?;
        self.expect(TokenKind::Times, "TIMES after the repeat count")?;
        let body = self.parse_block("REPEAT")?;
        Ok(StatementKind::Repeat { times, body })
    }

    /// forEachStatement := FOR EACH name IN name "{" statement* "}"
    fn parse_for_each_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        self.expect(TokenKind::Each, "EACH after FOR")?;
        let item = self.expect_binding("a name for each item")?;
        self.expect(TokenKind::In, "IN and the collection to loop over")?;
        let collection = self.expect_name("the collection to loop over")?;
        let body = self.parse_block("FOR EACH")?;
        Ok(StatementKind::ForEach {
            item,
            collection,
            body,
        })
    }

    /// variableDeclaration := (TEXT|NUMBER|FLAG|LIST) name "=" expression
    fn parse_variable_declaration(&mut self) -> ParseResult<StatementKind> {
        let keyword = self.advance();
        let kind = variable_kind(keyword.kind);
        let name = self.expect_binding("a variable name")?;
        self.expect(TokenKind::Equals, "'=' after the variable name")?;
        let value = self.parse_expression()?;
        Ok(StatementKind::VariableDeclaration { kind, name, value })
    }

    /// performStatement := PERFORM name "." name [ WITH expression ("," expression)* ]
    fn parse_perform_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        if !self.at_qualified_name() {
            return Err(self.unexpected("a page action such as Login.signIn"));
        }
        let page = self.advance().value;
        self.advance(); // Consume '.'
        let action = self.advance().value;

        let mut arguments = Vec::new();
        if self.eat(TokenKind::With) {
            arguments.push(self.parse_expression()?);
            while self.eat(TokenKind::Comma) {
                arguments.push(self.parse_expression()?);
            }
        }

        Ok(StatementKind::Perform {
            action: ActionRef { page, action },
            arguments,
        })
    }

    // ========================================================================
    // expression / target
    // ========================================================================

    fn at_expression_start(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::EnvVar
                | TokenKind::True
                | TokenKind::False
        ) || self.at_qualified_name()
            || self.at_bare_name()
    }

    /// expression := primary ("+" primary)*
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let first = self.parse_primary()?;
        if !self.check(TokenKind::Plus) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(TokenKind::Plus) {
            parts.push(self.parse_primary()?);
        }
        Ok(Expression::Concat { parts })
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current().kind {
            TokenKind::StringLiteral => Ok(Expression::string(self.advance().value)),
            TokenKind::NumberLiteral => {
                let value = Decimal::from_str(&self.current().value)
                    .map_err(|_| self.unexpected("a number"))?;
                self.advance();
                Ok(Expression::Number { value })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean { value: true })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean { value: false })
            }
            TokenKind::EnvVar => Ok(Expression::EnvVar {
                name: self.advance().value,
            }),
            _ if self.at_qualified_name() => {
                let qualifier = self.advance().value;
                self.advance(); // Consume '.'
                let name = self.advance().value;
                Ok(Expression::variable(Some(&qualifier), name))
            }
            _ if self.at_bare_name() => Ok(Expression::variable(None, self.advance().value)),
            _ => Err(self.unexpected("a value")),
        }
    }

    /// selectorExpression := STRING | ENV_VAR
    fn parse_selector_expression(&mut self) -> ParseResult<Expression> {
        match self.current().kind {
            TokenKind::StringLiteral => Ok(Expression::string(self.advance().value)),
            TokenKind::EnvVar => Ok(Expression::EnvVar {
                name: self.advance().value,
            }),
            _ => Err(self.unexpected("a selector in quotes")),
        }
    }

    /// target := selectorExpression | name "." name | name
    fn parse_target(&mut self) -> ParseResult<Target> {
        match self.current().kind {
            TokenKind::StringLiteral | TokenKind::EnvVar => {
                Ok(Target::selector(self.parse_selector_expression()?))
            }
            _ if self.at_qualified_name() => {
                let page = self.advance().value;
                self.advance(); // Consume '.'
                let field = self.advance().value;
                Ok(Target::field(Some(&page), field))
            }
            _ if self.at_bare_name() => Ok(Target::field(None, self.advance().value)),
            _ => Err(self.unexpected("an element (Page.field, a field name or a selector)")),
        }
    }
}

fn variable_kind(kind: TokenKind) -> VariableKind {
    match kind {
        TokenKind::Number => VariableKind::Number,
        TokenKind::Flag => VariableKind::Flag,
        TokenKind::List => VariableKind::List,
        _ => VariableKind::Text,
    }
}

/// Reinterprets the left side of `IF ... IS state` as an element.
fn expression_into_target(expression: Expression) -> Option<Target> {
    match expression {
        Expression::String { .. } | Expression::EnvVar { .. } => {
            Some(Target::selector(expression))
        }
        Expression::Variable { qualifier, name } => Some(Target {
            page: qualifier,
            field: Some(name),
            selector: None,
        }),
        _ => None,
    }
}

/// Parses a token stream into a program, collecting every syntax error.
pub fn parse(tokens: Vec<Token>) -> ParseOutput {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    trace!(
        "parsed {} pages, {} libraries, {} features with {} errors",
        program.pages.len(),
        program.page_actions.len(),
        program.features.len(),
        parser.errors.len()
    );
    ParseOutput {
        program,
        errors: parser.errors,
    }
}

/// Lexes and parses source text. Lexer errors are returned as the error
/// value since no meaningful program can be built from them.
pub fn parse_source(source: &str) -> Result<ParseOutput, Vec<lexer::LexError>> {
    let lexed = lexer::tokenize(source);
    if !lexed.errors.is_empty() {
        return Err(lexed.errors);
    }
    Ok(parse(lexed.tokens))
}
