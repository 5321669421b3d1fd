// tests/integration_tests.rs

use vero_lang::pipeline::{self, CompileResult};
use vero_lang::{compile, CompileOutcome, CompileResponse, TranspileOptions};

fn compile_ok(source: &str) -> CompileResult {
    match compile(source, &TranspileOptions::default()).unwrap() {
        CompileOutcome::Success(result) => result,
        CompileOutcome::Failure { errors, .. } => panic!("unexpected errors: {:#?}", errors),
    }
}

fn compile_err(source: &str) -> Vec<String> {
    match compile(source, &TranspileOptions::default()).unwrap() {
        CompileOutcome::Success(result) => panic!("expected failure, got:\n{}", result.code),
        CompileOutcome::Failure { errors, .. } => errors.into_iter().map(|e| e.code).collect(),
    }
}

const LOGIN_SCRIPT: &str = r##"# Login flows
PAGE LoginPage ("/login") {
    FIELD email = "#email"
    FIELD password = "#password"
    FIELD submit = "[data-testid=login]"
    TEXT greeting = "Welcome back"

    login WITH user, secret {
        FILL email WITH user
        FILL password WITH secret
        CLICK submit
    }
}

FEATURE Login @auth {
    USE LoginPage

    BEFORE EACH {
        OPEN "/login"
    }

    SCENARIO "Valid credentials" @smoke {
        PERFORM LoginPage.login WITH "ada@example.com", {{PASSWORD}}
        VERIFY URL CONTAINS "/dashboard"
        VERIFY LoginPage.greeting IS VISIBLE
    }

    SCENARIO "Empty password" {
        FILL LoginPage.email WITH "ada@example.com"
        CLICK LoginPage.submit
        VERIFY LoginPage.submit IS VISIBLE
    }
}
"##;

#[test]
fn test_compile_end_to_end() {
    let result = compile_ok(LOGIN_SCRIPT);

    assert_eq!(result.total_scenarios, 2);
    assert_eq!(result.selected_scenarios, 2);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let code = &result.code;
    assert!(code.starts_with("// Generated by vero. Do not edit.\n"));
    assert!(code.contains("const LoginPage = {\n  url: '/login',\n  greeting: 'Welcome back',\n"));
    assert!(code.contains("  async login(page: Page, user: any, secret: any) {\n"));
    assert!(code.contains("test.describe('Login', () => {"));
    assert!(code.contains("test.beforeEach(async ({ page }) => {\n    await page.goto('/login');\n  });"));
    assert!(code.contains(
        "await LoginPage.login(page, 'ada@example.com', (process.env['PASSWORD'] ?? ''));"
    ));
    assert!(code.contains("test('Empty password', { tag: ['@auth'] }, async ({ page }) => {"));
    assert!(code.contains("await page.getByTestId('login').click();"));

    // Describe blocks stay balanced
    assert_eq!(code.matches("test.describe(").count(), 1);
    assert_eq!(code.matches('{').count(), code.matches('}').count());
}

#[test]
fn test_parse_errors_stop_before_validation() {
    // The unknown page would be a validation error, but parsing fails first
    let codes = compile_err(
        r#"FEATURE F {
    USE Missing
    SCENARIO "s" {
        CLICK
    }
}"#,
    );
    assert_eq!(codes, ["VERO-012"]);
}

#[test]
fn test_validation_errors_block_generation() {
    let codes = compile_err(
        r##"PAGE Cart { FIELD total = "#total" }
FEATURE F {
    USE Checkout
    SCENARIO "s" { CLICK Cart.total }
}"##,
    );
    assert_eq!(codes, ["VERO-200", "VERO-201"]);
}

#[test]
fn test_warnings_travel_with_success() {
    let result = compile_ok(
        r##"PAGE Cart { FIELD total = "#total" }
FEATURE F {
    USE Cart
    SCENARIO "s" { VERIFY Cart.totl IS VISIBLE }
}"##,
    );
    let codes: Vec<&str> = result.warnings.iter().map(|w| w.code.as_str()).collect();
    assert_eq!(codes, ["VERO-205"]);
    assert!(result.code.contains("await expect(page.getByText('totl')).toBeVisible();"));
}

#[test]
fn test_failure_envelope() {
    let outcome = compile("FEATURE F { SCENARIO \"s\" { NOPE } }", &Default::default()).unwrap();
    assert!(!outcome.is_success());

    let json = serde_json::to_value(CompileResponse::from(outcome)).unwrap();
    assert_eq!(json["success"], false);
    assert!(json.get("result").is_none());
    assert_eq!(json["errors"][0]["code"], "VERO-013");
    assert_eq!(json["errors"][0]["category"], "parser");
    assert_eq!(json["errors"][0]["location"]["line"], 1);
    assert!(json["errors"][0]["whatWentWrong"].is_string());
    assert_eq!(json["warnings"], serde_json::json!([]));
}

#[test]
fn test_check_reports_without_generating() {
    let report = pipeline::check(LOGIN_SCRIPT, None);
    assert!(report.valid);

    let report = pipeline::check("PAGE login { }", None);
    assert!(report.valid);
    assert_eq!(report.warnings[0].code, "VERO-300");
}

#[cfg(feature = "cli")]
mod cli {
    use vero_lang::cli::{
        execute_check, execute_compile, render_diagnostics, CheckOptions, CliError,
        CompileOptions,
    };
    use vero_lang::CompileOutcome;

    const PAGES: &str = r#"PAGE Search ("/search") {
    FIELD query = "input[name=q]"
    FIELD go = "button.search"
}"#;

    const FEATURE: &str = r#"FEATURE Search {
    USE Search
    SCENARIO "Find things" @smoke {
        OPEN "/search"
        FILL Search.query WITH term
        CLICK Search.go
    }
    SCENARIO "Empty search" @wip {
        CLICK Search.go
    }
}"#;

    #[test]
    fn test_compile_with_context_and_params() {
        let options = CompileOptions {
            source: FEATURE.to_string(),
            context: vec![PAGES.to_string()],
            exclude_tags: vec!["wip".to_string()],
            params: Some(
                r#"[{"term": "shoes"}, {"label": "unicode", "values": {"term": "café"}}]"#
                    .to_string(),
            ),
            ..Default::default()
        };
        let CompileOutcome::Success(result) = execute_compile(&options).unwrap() else {
            panic!("expected success");
        };

        assert_eq!(result.selected_scenarios, 1);
        let names: Vec<&str> = result.cases.iter().map(|c| c.test_name.as_str()).collect();
        assert_eq!(names, ["Find things [term=shoes]", "Find things [unicode]"]);
        assert!(result.code.contains("const Search = {\n  url: '/search',\n};"));
        assert!(result.code.contains("const term = 'café';"));
        assert!(result.code.contains("await page.locator('input[name=q]').fill(String(term));"));
        assert!(result.code.contains("await page.locator('button.search').click();"));
    }

    #[test]
    fn test_bad_params_are_reported() {
        let options = CompileOptions {
            source: FEATURE.to_string(),
            context: vec![PAGES.to_string()],
            params: Some(r#"{"term": "x"}"#.to_string()),
            ..Default::default()
        };
        assert!(matches!(
            execute_compile(&options),
            Err(CliError::InvalidParams(_))
        ));

        let options = CompileOptions {
            params: Some(r#"[{"search term": "x"}]"#.to_string()),
            ..options
        };
        assert!(matches!(
            execute_compile(&options),
            Err(CliError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_check_without_context_fails() {
        let result = execute_check(&CheckOptions {
            source: FEATURE.to_string(),
            context: Vec::new(),
        });
        assert!(!result.valid);
        let rendered = render_diagnostics(&result.errors, &result.warnings);
        assert!(rendered.starts_with("error[VERO-200] line 2: Unknown page"));
    }
}
