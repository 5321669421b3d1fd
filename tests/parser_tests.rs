// tests/parser_tests.rs

use rust_decimal::Decimal;
use vero_lang::ast::{
    Assertion, ComparisonOp, Condition, ElementState, Expression, HookKind, Program,
    ScrollDirection, StatementKind, Target, UrlMatch, VariableKind, WaitUnit,
};
use vero_lang::parser::{parse_source, ParseError, ParseOutput};

fn parse(source: &str) -> ParseOutput {
    parse_source(source).expect("source should lex cleanly")
}

fn parse_ok(source: &str) -> Program {
    let output = parse(source);
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    output.program
}

/// Parses `body` as the statements of a single scenario.
fn statements(body: &str) -> Vec<StatementKind> {
    let program = parse_ok(&format!("FEATURE F {{\n  SCENARIO \"s\" {{\n{}\n  }}\n}}", body));
    program.features[0].scenarios[0]
        .statements
        .iter()
        .map(|s| s.kind.clone())
        .collect()
}

fn statement(body: &str) -> StatementKind {
    let mut all = statements(body);
    assert_eq!(all.len(), 1, "expected one statement: {:?}", all);
    all.remove(0)
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_page_declaration() {
    let program = parse_ok(
        r##"
PAGE Login ("/login") {
    FIELD email = "#email"
    FIELD password = {{PASSWORD_SELECTOR}}
    TEXT greeting = "Welcome back"
    NUMBER attempts = 3

    signIn WITH user, secret {
        FILL email WITH user
        FILL password WITH secret
        CLICK "Sign in"
    }
}
"##,
    );

    let page = &program.pages[0];
    assert_eq!(page.name, "Login");
    assert_eq!(page.url.as_deref(), Some("/login"));
    assert_eq!(page.line, 2);
    assert_eq!(page.fields.len(), 2);
    assert_eq!(page.fields[0].selector, Expression::string("#email"));
    assert_eq!(
        page.fields[1].selector,
        Expression::EnvVar {
            name: "PASSWORD_SELECTOR".to_string()
        }
    );
    assert_eq!(page.variables[1].kind, VariableKind::Number);
    assert_eq!(page.variables[1].value, Expression::Number { value: Decimal::from(3) });

    let action = &page.actions[0];
    assert_eq!(action.name, "signIn");
    assert_eq!(action.parameters, ["user", "secret"]);
    assert_eq!(action.statements.len(), 3);
}

#[test]
fn test_page_actions_declaration() {
    let program = parse_ok(
        r#"
PAGEACTIONS CheckoutFlows FOR Checkout {
    payByCard WITH card {
        FILL cardNumber WITH card
    }
    cancel {
        CLICK cancelButton
    }
}
"#,
    );
    let library = &program.page_actions[0];
    assert_eq!(library.name, "CheckoutFlows");
    assert_eq!(library.for_page.as_deref(), Some("Checkout"));
    assert_eq!(library.actions.len(), 2);
    assert!(library.actions[1].parameters.is_empty());
}

#[test]
fn test_feature_declaration() {
    let program = parse_ok(
        r#"
FEATURE "Shopping cart" @shop {
    USE Cart, Catalog
    USE Checkout

    BEFORE EACH {
        OPEN "/"
    }
    AFTER ALL {
        CLEAR COOKIES
    }

    @smoke
    SCENARIO "Add an item" @fast {
        CLICK Catalog.firstItem
    }

    SCENARIO removeItem {
        CLICK Cart.remove
    }
}
"#,
    );

    let feature = &program.features[0];
    assert_eq!(feature.name, "Shopping cart");
    assert_eq!(feature.tags, ["shop"]);
    let uses: Vec<&str> = feature.uses.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(uses, ["Cart", "Catalog", "Checkout"]);
    assert_eq!(feature.hooks[0].kind, HookKind::BeforeEach);
    assert_eq!(feature.hooks[1].kind, HookKind::AfterAll);
    assert_eq!(feature.scenarios[0].tags, ["smoke", "fast"]);
    assert_eq!(feature.scenarios[1].name, "removeItem");
    assert!(feature.scenarios[1].tags.is_empty());
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_action_statements() {
    let kinds = statements(
        r#"
    NAVIGATE TO "/home"
    SELECT "Canada" FROM Signup.country
    SCROLL DOWN
    SCROLL TO Footer.links
    PRESS "Enter"
    DRAG Board.card TO Board.done
    UPLOAD "fixtures/a.pdf" TO Profile.avatar
    WAIT 500 MILLISECONDS
    WAIT FOR Dashboard.header
    TAKE SCREENSHOT
    SWITCH TO NEW TAB "https://example.com"
    SWITCH TO TAB 1
    CLOSE TAB
    ACCEPT DIALOG WITH "yes"
    DISMISS DIALOG
    CLEAR STORAGE
    CLEAR Search.query
"#,
    );

    assert_eq!(kinds.len(), 17);
    assert_eq!(kinds[0], StatementKind::Open { url: Expression::string("/home") });
    assert_eq!(
        kinds[1],
        StatementKind::Select {
            option: Expression::string("Canada"),
            target: Target::field(Some("Signup"), "country"),
        }
    );
    assert_eq!(
        kinds[2],
        StatementKind::Scroll {
            direction: Some(ScrollDirection::Down),
            target: None
        }
    );
    assert!(matches!(&kinds[3], StatementKind::Scroll { direction: None, target: Some(_) }));
    assert!(matches!(&kinds[5], StatementKind::Drag { .. }));
    assert!(matches!(
        &kinds[7],
        StatementKind::Wait { unit: WaitUnit::Milliseconds, .. }
    ));
    assert!(matches!(&kinds[8], StatementKind::WaitFor { .. }));
    assert_eq!(kinds[9], StatementKind::Screenshot { name: None });
    assert!(matches!(&kinds[10], StatementKind::SwitchToNewTab { url: Some(_) }));
    assert_eq!(kinds[12], StatementKind::CloseTab);
    assert!(matches!(&kinds[13], StatementKind::AcceptDialog { prompt: Some(_) }));
    assert_eq!(kinds[14], StatementKind::DismissDialog);
    assert_eq!(kinds[15], StatementKind::ClearStorage);
    assert_eq!(
        kinds[16],
        StatementKind::Clear {
            target: Target::field(Some("Search"), "query")
        }
    );
}

#[test]
fn test_wait_defaults_to_seconds() {
    assert_eq!(
        statement("WAIT 2"),
        StatementKind::Wait {
            amount: Expression::Number { value: Decimal::from(2) },
            unit: WaitUnit::Seconds
        }
    );
}

#[test]
fn test_fill_with_concatenation() {
    assert_eq!(
        statement(r#"FILL search WITH "order-" + orderId + {{SUFFIX}}"#),
        StatementKind::Fill {
            target: Target::field(None, "search"),
            value: Expression::Concat {
                parts: vec![
                    Expression::string("order-"),
                    Expression::variable(None, "orderId"),
                    Expression::EnvVar {
                        name: "SUFFIX".to_string()
                    },
                ]
            }
        }
    );
}

// ============================================================================
// Assertions
// ============================================================================

#[test]
fn test_assertions() {
    let kinds = statements(
        r#"
    VERIFY Login.error IS NOT VISIBLE
    VERIFY Home.banner HAS TEXT "Welcome"
    VERIFY Home.banner NOT CONTAINS "Error"
    VERIFY Login.email HAS VALUE "a@b.c"
    VERIFY Login.submit HAS ATTRIBUTE "type" = "submit"
    VERIFY Cart.items HAS COUNT 3
    VERIFY URL MATCHES "/orders/[0-9]+"
    VERIFY TITLE CONTAINS "Dashboard"
"#,
    );

    assert_eq!(
        kinds[0],
        StatementKind::Verify(Assertion::State {
            target: Target::field(Some("Login"), "error"),
            negated: true,
            state: ElementState::Visible,
        })
    );
    assert!(matches!(
        &kinds[1],
        StatementKind::Verify(Assertion::Text { contains: false, negated: false, .. })
    ));
    assert!(matches!(
        &kinds[2],
        StatementKind::Verify(Assertion::Text { contains: true, negated: true, .. })
    ));
    assert!(matches!(&kinds[3], StatementKind::Verify(Assertion::Value { .. })));
    assert!(matches!(&kinds[4], StatementKind::Verify(Assertion::Attribute { .. })));
    assert!(matches!(&kinds[5], StatementKind::Verify(Assertion::Count { .. })));
    assert!(matches!(
        &kinds[6],
        StatementKind::Verify(Assertion::Url { matcher: UrlMatch::Matches, .. })
    ));
    assert!(matches!(
        &kinds[7],
        StatementKind::Verify(Assertion::Title { contains: true, .. })
    ));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_else_if_chain() {
    let StatementKind::If {
        condition,
        then_branch,
        else_branch,
    } = statement(
        r#"IF Login.error IS VISIBLE {
        REFRESH
    } ELSE IF attempts > 3 {
        LOG "too many"
    } ELSE {
        CLICK Login.submit
    }"#,
    )
    else {
        panic!("expected IF");
    };

    assert!(matches!(
        condition,
        Condition::ElementState { negated: false, state: ElementState::Visible, .. }
    ));
    assert_eq!(then_branch.len(), 1);
    assert_eq!(else_branch.len(), 1);
    let StatementKind::If {
        condition: nested,
        else_branch: last,
        ..
    } = &else_branch[0].kind
    else {
        panic!("expected nested IF");
    };
    assert!(matches!(
        nested,
        Condition::Comparison { op: ComparisonOp::GreaterThan, .. }
    ));
    assert_eq!(last.len(), 1);
}

#[test]
fn test_truthy_condition_and_single_equals() {
    let kinds = statements(
        r#"
    IF rememberMe { CHECK Login.remember }
    IF role = "admin" { REFRESH }
"#,
    );
    assert!(matches!(
        &kinds[0],
        StatementKind::If { condition: Condition::Truthy { .. }, .. }
    ));
    assert!(matches!(
        &kinds[1],
        StatementKind::If { condition: Condition::Comparison { op: ComparisonOp::Equal, .. }, .. }
    ));
}

#[test]
fn test_loops_accept_keyword_names() {
    let kinds = statements(
        r#"
    REPEAT 3 TIMES { SCROLL DOWN }
    FOR EACH row IN rows {
        FILL Login.email WITH row.email
    }
"#,
    );
    assert!(matches!(&kinds[0], StatementKind::Repeat { body, .. } if body.len() == 1));
    let StatementKind::ForEach {
        item,
        collection,
        body,
    } = &kinds[1]
    else {
        panic!("expected FOR EACH");
    };
    assert_eq!(item, "row");
    assert_eq!(collection, "rows");
    assert_eq!(
        body[0].kind,
        StatementKind::Fill {
            target: Target::field(Some("Login"), "email"),
            value: Expression::variable(Some("row"), "email"),
        }
    );
}

#[test]
fn test_perform_and_declarations() {
    let kinds = statements(
        r#"
    TEXT email = "a@b.c"
    FLAG remember = TRUE
    PERFORM Login.signIn WITH email, "secret"
"#,
    );
    assert!(matches!(
        &kinds[0],
        StatementKind::VariableDeclaration { kind: VariableKind::Text, .. }
    ));
    assert!(matches!(
        &kinds[1],
        StatementKind::VariableDeclaration { value: Expression::Boolean { value: true }, .. }
    ));
    let StatementKind::Perform { action, arguments } = &kinds[2] else {
        panic!("expected PERFORM");
    };
    assert_eq!((action.page.as_str(), action.action.as_str()), ("Login", "signIn"));
    assert_eq!(arguments.len(), 2);
}

// ============================================================================
// Errors and recovery
// ============================================================================

#[test]
fn test_statement_recovery_keeps_later_statements() {
    let output = parse(
        r#"FEATURE F {
    SCENARIO "s" {
        CLICK
        FILL Login.email WITH "x"
        BOGUS thing
        REFRESH
    }
}"#,
    );

    assert_eq!(output.errors.len(), 2);
    assert!(matches!(
        &output.errors[0],
        ParseError::IncompleteStatement { statement, line: 3, .. } if statement == "CLICK"
    ));
    assert!(matches!(
        &output.errors[1],
        ParseError::UnknownStatement { line: 5, .. }
    ));
    let statements = &output.program.features[0].scenarios[0].statements;
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[1].kind, StatementKind::Refresh);
    assert_eq!(statements[1].line, 6);
}

#[test]
fn test_missing_closing_brace_reported_once() {
    let output = parse(
        r#"FEATURE F {
    SCENARIO "s" {
        REFRESH
"#,
    );
    assert_eq!(output.errors.len(), 1);
    assert!(matches!(
        &output.errors[0],
        ParseError::UnclosedBlock { line: 2, .. }
    ));
    assert_eq!(output.errors[0].to_diagnostic().code, "VERO-011");
    assert_eq!(output.program.features[0].scenarios[0].statements.len(), 1);
}

#[test]
fn test_unclosed_declaration_keeps_following_ones() {
    let output = parse(
        r##"PAGE Login {
    FIELD email = "#email"

FEATURE Auth {
    USE Login
    SCENARIO "s" { CLICK Login.email }
}"##,
    );
    assert_eq!(output.errors.len(), 1);
    assert!(matches!(
        &output.errors[0],
        ParseError::UnclosedBlock { line: 1, .. }
    ));
    assert_eq!(output.program.pages[0].fields.len(), 1);
    assert_eq!(output.program.features.len(), 1);
    assert_eq!(output.program.features[0].scenarios.len(), 1);
}

#[test]
fn test_statement_keywords_cannot_name_variables() {
    let output = parse(
        r##"PAGEACTIONS Flows {
    pay WITH number { FILL "#card" WITH number }
    cancel { REFRESH }
}"##,
    );
    assert_eq!(output.errors.len(), 1);
    assert!(matches!(
        &output.errors[0],
        ParseError::UnexpectedToken { found, line: 2, .. } if found.contains("number")
    ));
    assert_eq!(output.program.page_actions[0].actions.len(), 1);

    let output = parse(
        r#"FEATURE F {
    SCENARIO "s" {
        LOAD check FROM Users
        REFRESH
    }
}"#,
    );
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].to_diagnostic().code, "VERO-010");
}

#[test]
fn test_unexpected_top_level_token() {
    let output = parse("CLICK \"x\"\nPAGE Home { }");
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].to_diagnostic().code, "VERO-010");
    assert_eq!(output.program.pages[0].name, "Home");
}

#[test]
fn test_lexer_errors_prevent_parsing() {
    let errors = parse_source("FEATURE F { SCENARIO \"s\" { OPEN \"/x } }").unwrap_err();
    assert_eq!(errors.len(), 1);
}
