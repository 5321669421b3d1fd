use log::trace;
use serde::Serialize;
use thiserror::Error;

use crate::{
    ast::{Token, TokenKind},
    diagnostics::{self, Diagnostic},
};

/// A non-fatal problem found while scanning. The lexer records it and keeps
/// going from the next character.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LexError {
    #[error("Unterminated string at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Unterminated environment reference at line {line}, column {column}")]
    UnterminatedEnvVar { line: usize, column: usize },
    #[error("Invalid number '{text}' at line {line}, column {column}")]
    InvalidNumber {
        text: String,
        line: usize,
        column: usize,
    },
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line, .. }
            | LexError::UnterminatedEnvVar { line, .. }
            | LexError::InvalidNumber { line, .. }
            | LexError::UnexpectedCharacter { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexError::UnterminatedString { column, .. }
            | LexError::UnterminatedEnvVar { column, .. }
            | LexError::InvalidNumber { column, .. }
            | LexError::UnexpectedCharacter { column, .. } => *column,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LexError::UnterminatedString { line, column } => {
                diagnostics::unterminated_string(*line, *column)
            }
            LexError::UnterminatedEnvVar { line, column } => {
                diagnostics::unterminated_env_var(*line, *column)
            }
            LexError::InvalidNumber { text, line, column } => {
                diagnostics::invalid_number(text, *line, *column)
            }
            LexError::UnexpectedCharacter {
                character,
                line,
                column,
            } => diagnostics::unexpected_character(*character, *line, *column),
        }
    }
}

/// Tokens plus every error collected during the scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    errors: Vec<LexError>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if keep(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn skip_to_end_of_line(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_comment(&mut self, line: usize, column: usize) -> Token {
        let text = self.read_while(|c| c != '\n');
        Token::new(TokenKind::Comment, text.trim_end(), line, column)
    }

    /// Reads a quoted string. Returns `None` (after recording the error) when
    /// the string is not closed before the end of the line.
    fn read_string(&mut self, quote: char, line: usize, column: usize) -> Option<Token> {
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Some(Token::new(TokenKind::StringLiteral, result, line, column));
                }
                '\n' => break,
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('\\') => result.push('\\'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\n') | None => break,
                        Some(other) => {
                            result.push('\\');
                            result.push(other);
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        self.errors.push(LexError::UnterminatedString { line, column });
        None
    }

    /// Reads `{{NAME}}`. The opening braces are known to be present.
    fn read_env_var(&mut self, line: usize, column: usize) -> Option<Token> {
        self.advance();
        self.advance();

        let mut name = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '}' && self.peek_char(1) == Some('}') {
                self.advance();
                self.advance();
                return Some(Token::new(TokenKind::EnvVar, name.trim(), line, column));
            }
            if ch == '\n' {
                break;
            }
            name.push(ch);
            self.advance();
        }

        self.errors.push(LexError::UnterminatedEnvVar { line, column });
        None
    }

    fn read_number(&mut self, line: usize, column: usize) -> Option<Token> {
        let mut number = String::new();
        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }
        number.push_str(&self.read_while(|c| c.is_ascii_digit()));

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            number.push('.');
            self.advance();
            number.push_str(&self.read_while(|c| c.is_ascii_digit()));

            // A second decimal point makes the whole literal invalid
            if self.current_char() == Some('.')
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                number.push_str(&self.read_while(|c| c.is_ascii_digit() || c == '.'));
                self.errors.push(LexError::InvalidNumber {
                    text: number,
                    line,
                    column,
                });
                return None;
            }
        }

        Some(Token::new(TokenKind::NumberLiteral, number, line, column))
    }

    fn read_word(&mut self, line: usize, column: usize) -> Token {
        let word = self.read_while(|c| c.is_alphanumeric() || c == '_');
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier);
        Token::new(kind, word, line, column)
    }

    fn read_tag(&mut self, line: usize, column: usize) -> Token {
        self.advance(); // Consume @
        let name = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '-');
        Token::new(TokenKind::Tag, name, line, column)
    }

    fn symbol(&mut self, kind: TokenKind, width: usize, line: usize, column: usize) -> Token {
        let text: String = self.input[self.position..self.position + width].iter().collect();
        for _ in 0..width {
            self.advance();
        }
        Token::new(kind, text, line, column)
    }

    fn unexpected(&mut self, character: char, line: usize, column: usize) {
        self.errors.push(LexError::UnexpectedCharacter {
            character,
            line,
            column,
        });
        self.advance();
    }

    /// Produces the next token, recording and skipping anything malformed.
    /// Returns an `Eof` token once the input is exhausted, and keeps doing so.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let (line, column) = (self.line, self.column);

            let Some(ch) = self.current_char() else {
                return Token::new(TokenKind::Eof, "", line, column);
            };

            let token = match ch {
                '#' => Some(self.read_comment(line, column)),
                '/' if self.peek_char(1) == Some('/') => Some(self.read_comment(line, column)),
                '"' | '\'' => self.read_string(ch, line, column),
                '{' if self.peek_char(1) == Some('{') => self.read_env_var(line, column),
                '{' => Some(self.symbol(TokenKind::LBrace, 1, line, column)),
                '}' => Some(self.symbol(TokenKind::RBrace, 1, line, column)),
                '(' => Some(self.symbol(TokenKind::LParen, 1, line, column)),
                ')' => Some(self.symbol(TokenKind::RParen, 1, line, column)),
                ',' => Some(self.symbol(TokenKind::Comma, 1, line, column)),
                '.' => Some(self.symbol(TokenKind::Dot, 1, line, column)),
                '+' => Some(self.symbol(TokenKind::Plus, 1, line, column)),
                '=' if self.peek_char(1) == Some('=') => {
                    Some(self.symbol(TokenKind::EqEq, 2, line, column))
                }
                '=' => Some(self.symbol(TokenKind::Equals, 1, line, column)),
                '!' if self.peek_char(1) == Some('=') => {
                    Some(self.symbol(TokenKind::NotEq, 2, line, column))
                }
                '>' if self.peek_char(1) == Some('=') => {
                    Some(self.symbol(TokenKind::GtEq, 2, line, column))
                }
                '>' => Some(self.symbol(TokenKind::Gt, 1, line, column)),
                '<' if self.peek_char(1) == Some('=') => {
                    Some(self.symbol(TokenKind::LtEq, 2, line, column))
                }
                '<' => Some(self.symbol(TokenKind::Lt, 1, line, column)),
                '@' if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphanumeric() || c == '_') =>
                {
                    Some(self.read_tag(line, column))
                }
                '-' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number(line, column)
                }
                c if c.is_ascii_digit() => self.read_number(line, column),
                c if c.is_alphabetic() || c == '_' => Some(self.read_word(line, column)),
                c => {
                    self.unexpected(c, line, column);
                    None
                }
            };

            if let Some(token) = token {
                return token;
            }
        }
    }

    /// Scans the whole input. The token list always ends with `Eof`.
    pub fn tokenize(mut self) -> LexOutput {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!(
            "lexed {} tokens with {} errors",
            tokens.len(),
            self.errors.len()
        );
        LexOutput {
            tokens,
            errors: self.errors,
        }
    }
}

/// Tokenizes a source file. Never fails: problems are reported in
/// [`LexOutput::errors`].
pub fn tokenize(source: &str) -> LexOutput {
    Lexer::new(source).tokenize()
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut lexer = Lexer::new("click Click CLICK");
    assert_eq!(lexer.next_token().kind, TokenKind::Click);
    assert_eq!(lexer.next_token().kind, TokenKind::Click);
    assert_eq!(lexer.next_token().kind, TokenKind::Click);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_field_declaration() {
    let mut lexer = Lexer::new("FIELD username = \"input[name=user]\"");
    assert_eq!(lexer.next_token().kind, TokenKind::Field);
    let name = lexer.next_token();
    assert_eq!(name.kind, TokenKind::Identifier);
    assert_eq!(name.value, "username");
    assert_eq!(lexer.next_token().kind, TokenKind::Equals);
    let selector = lexer.next_token();
    assert_eq!(selector.kind, TokenKind::StringLiteral);
    assert_eq!(selector.value, "input[name=user]");
    assert_eq!(selector.column, 18);
}
