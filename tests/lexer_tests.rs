// tests/lexer_tests.rs

use vero_lang::ast::TokenKind;
use vero_lang::lexer::{tokenize, LexError, Lexer};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).tokens.iter().map(|t| t.kind).collect()
}

// ============================================================================
// Symbols
// ============================================================================

#[test]
fn test_symbol_tokens() {
    let test_cases = vec![
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        (",", TokenKind::Comma),
        (".", TokenKind::Dot),
        ("+", TokenKind::Plus),
        ("=", TokenKind::Equals),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::NotEq),
        (">", TokenKind::Gt),
        ("<", TokenKind::Lt),
        (">=", TokenKind::GtEq),
        ("<=", TokenKind::LtEq),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token();
        assert_eq!(token.kind, expected, "Failed for input: {}", input);
        assert_eq!(token.value, input);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_string_literals_and_escapes() {
    let output = tokenize(r#""say \"hi\"" 'it\'s' "a\tb\n""#);
    assert!(output.errors.is_empty());
    let values: Vec<&str> = output.tokens[..3].iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, ["say \"hi\"", "it's", "a\tb\n"]);
    assert!(output.tokens[..3]
        .iter()
        .all(|t| t.kind == TokenKind::StringLiteral));
}

#[test]
fn test_numbers() {
    let output = tokenize("42 -3.5 0.25");
    assert!(output.errors.is_empty());
    let values: Vec<&str> = output.tokens[..3].iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, ["42", "-3.5", "0.25"]);
}

#[test]
fn test_env_var_and_tags() {
    let output = tokenize("{{ BASE_URL }} @smoke @slow-suite");
    assert!(output.errors.is_empty());
    assert_eq!(output.tokens[0].kind, TokenKind::EnvVar);
    assert_eq!(output.tokens[0].value, "BASE_URL");
    assert_eq!(output.tokens[1].kind, TokenKind::Tag);
    assert_eq!(output.tokens[1].value, "smoke");
    assert_eq!(output.tokens[2].value, "slow-suite");
}

#[test]
fn test_comments() {
    assert_eq!(
        kinds("# note\nCLICK \"x\" // trailing"),
        vec![
            TokenKind::Comment,
            TokenKind::Click,
            TokenKind::StringLiteral,
            TokenKind::Comment,
            TokenKind::Eof
        ]
    );
}

// ============================================================================
// Keywords
// ============================================================================

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        kinds("PAGE Login pageactions FEATURE scenario USE loginButton"),
        vec![
            TokenKind::Page,
            TokenKind::Identifier,
            TokenKind::PageActions,
            TokenKind::Feature,
            TokenKind::Scenario,
            TokenKind::Use,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_statement_line() {
    assert_eq!(
        kinds("VERIFY Login.error IS NOT VISIBLE"),
        vec![
            TokenKind::Verify,
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::Is,
            TokenKind::Not,
            TokenKind::Visible,
            TokenKind::Eof
        ]
    );
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_positions_are_one_based() {
    let output = tokenize("PAGE Login {\n  FIELD email = \"#e\"\n}");
    let field = &output.tokens[3];
    assert_eq!(field.kind, TokenKind::Field);
    assert_eq!((field.line, field.column), (2, 3));
    for token in &output.tokens {
        assert!(token.line >= 1 && token.column >= 1, "{:?}", token);
    }
}

#[test]
fn test_eof_is_always_last() {
    for source in ["", "   \n\n", "CLICK", "\"open", "{{X", "1.2.3", "$ % ^"] {
        let output = tokenize(source);
        let last = output.tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Eof, "source: {:?}", source);
        assert_eq!(
            output.tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(),
            1
        );
    }
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_unknown_character_is_skipped() {
    let clean = tokenize("CLICK Login.submit\nWAIT 2 SECONDS");
    let dirty = tokenize("CLICK Login.submit $\nWAIT 2 SECONDS");

    assert!(clean.errors.is_empty());
    assert_eq!(
        dirty.errors,
        vec![LexError::UnexpectedCharacter {
            character: '$',
            line: 1,
            column: 20
        }]
    );

    let strip = |tokens: &[vero_lang::Token]| -> Vec<(TokenKind, String)> {
        tokens.iter().map(|t| (t.kind, t.value.clone())).collect()
    };
    assert_eq!(strip(&clean.tokens), strip(&dirty.tokens));
}

#[test]
fn test_unterminated_string_stops_at_line_end() {
    let output = tokenize("OPEN \"/login\nCLICK \"x\"");
    assert_eq!(
        output.errors,
        vec![LexError::UnterminatedString { line: 1, column: 6 }]
    );
    assert_eq!(
        kinds("OPEN \"/login\nCLICK \"x\""),
        vec![
            TokenKind::Open,
            TokenKind::Click,
            TokenKind::StringLiteral,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_invalid_number() {
    let output = tokenize("WAIT 1.2.3 SECONDS");
    assert_eq!(output.errors.len(), 1);
    assert!(matches!(
        &output.errors[0],
        LexError::InvalidNumber { text, .. } if text == "1.2.3"
    ));
    assert_eq!(output.errors[0].to_diagnostic().code, "VERO-003");
}

#[test]
fn test_unterminated_env_var() {
    let output = tokenize("OPEN {{BASE_URL");
    assert_eq!(output.errors[0].to_diagnostic().code, "VERO-002");
    assert_eq!(output.errors[0].column(), 6);
}
