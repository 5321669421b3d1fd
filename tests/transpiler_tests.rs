// tests/transpiler_tests.rs

use vero_lang::parser::parse_source;
use vero_lang::value::{ParamCombination, ParamValue};
use vero_lang::{
    transpile, ContractViolation, Program, ProjectContext, ScenarioSelection, TagMode,
    TranspileOptions, TranspileOutput,
};

fn program(source: &str) -> Program {
    let output = parse_source(source).expect("source should lex cleanly");
    assert!(output.errors.is_empty(), "unexpected parse errors: {:?}", output.errors);
    output.program
}

fn select(program: &Program, selection: ScenarioSelection) -> TranspileOutput {
    transpile(
        program,
        &TranspileOptions {
            selection: Some(selection),
            ..Default::default()
        },
    )
    .expect("transpiles")
}

fn names(output: &TranspileOutput) -> Vec<&str> {
    output.cases.iter().map(|c| c.test_name.as_str()).collect()
}

const SHOP: &str = r#"FEATURE Shop @shop {
    SCENARIO "Checkout works" @Smoke { REFRESH }
    SCENARIO "Cart empty" @slow { REFRESH }
    SCENARIO "Checkout with coupon" @smoke @slow { REFRESH }
}
FEATURE Account {
    SCENARIO "Profile" { REFRESH }
}"#;

// ============================================================================
// Scenario selection
// ============================================================================

#[test]
fn test_no_selection_keeps_everything() {
    let output = transpile(&program(SHOP), &TranspileOptions::default()).unwrap();
    assert_eq!((output.total_scenarios, output.selected_scenarios), (4, 4));
    assert_eq!(
        names(&output),
        ["Checkout works", "Cart empty", "Checkout with coupon", "Profile"]
    );
}

#[test]
fn test_select_by_tags() {
    let program = program(SHOP);

    let any = select(&program, ScenarioSelection::new().with_tag("smoke").with_tag("slow"));
    assert_eq!(any.selected_scenarios, 3);

    let all = select(
        &program,
        ScenarioSelection::new()
            .with_tag("@SMOKE")
            .with_tag("slow")
            .tag_mode(TagMode::All),
    );
    assert_eq!(names(&all), ["Checkout with coupon"]);

    let excluded = select(&program, ScenarioSelection::new().without_tag("shop"));
    assert_eq!(names(&excluded), ["Profile"]);
    assert!(!excluded.code.contains("test.describe('Shop'"));
    assert!(excluded.code.contains("test.describe('Account', () => {"));
}

#[test]
fn test_select_by_name() {
    let program = program(SHOP);

    let exact = select(&program, ScenarioSelection::new().with_scenario("Cart empty"));
    assert_eq!(names(&exact), ["Cart empty"]);

    let substring = select(
        &program,
        ScenarioSelection::new().with_pattern("COUPON").unwrap(),
    );
    assert_eq!(names(&substring), ["Checkout with coupon"]);

    let regex = select(
        &program,
        ScenarioSelection::new().with_pattern("/^checkout/").unwrap(),
    );
    assert_eq!(names(&regex), ["Checkout works", "Checkout with coupon"]);
    assert_eq!(regex.total_scenarios, 4);
}

#[test]
fn test_nothing_selected() {
    let output = select(&program(SHOP), ScenarioSelection::new().with_scenario("Nope"));
    assert_eq!((output.total_scenarios, output.selected_scenarios), (4, 0));
    assert!(output.cases.is_empty());
    assert!(!output.code.contains("test("));
}

#[test]
fn test_feature_tags_are_inherited() {
    let output = transpile(&program(SHOP), &TranspileOptions::default()).unwrap();
    assert!(output
        .code
        .contains("test('Checkout works', { tag: ['@shop', '@smoke'] }, async ({ page }) => {"));
    assert!(output
        .code
        .contains("test('Profile', async ({ page }) => {"));
}

// ============================================================================
// Parameter combinations
// ============================================================================

#[test]
fn test_labelled_combinations() {
    let program = program(r##"FEATURE F { SCENARIO "s" { FILL "#q" WITH term } }"##);
    let combinations = vec![
        ParamCombination::labelled(
            "same",
            vec![("term".to_string(), ParamValue::String("a".to_string()))],
        ),
        ParamCombination::labelled(
            "same",
            vec![("term".to_string(), ParamValue::String("b".to_string()))],
        ),
    ];
    let output = transpile(
        &program,
        &TranspileOptions {
            combinations,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(names(&output), ["s [same]", "s [same #2]"]);
    assert_eq!(output.cases[1].combination_label.as_deref(), Some("same #2"));
    assert_eq!(output.cases[1].scenario, "s");
    assert!(output.code.contains("const term = 'b';"));
}

#[test]
fn test_combinations_multiply_selected_scenarios() {
    let program = program(SHOP);
    let combinations = vec![
        ParamCombination::new(vec![("n".to_string(), ParamValue::Number(1.into()))]),
        ParamCombination::new(vec![("n".to_string(), ParamValue::Number(2.into()))]),
    ];
    let output = transpile(
        &program,
        &TranspileOptions {
            selection: Some(ScenarioSelection::new().with_tag("smoke")),
            combinations,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(output.selected_scenarios, 2);
    assert_eq!(
        names(&output),
        [
            "Checkout works [n=1]",
            "Checkout works [n=2]",
            "Checkout with coupon [n=1]",
            "Checkout with coupon [n=2]"
        ]
    );
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn test_selector_inference() {
    let code = transpile(
        &program(
            r#"PAGE Form {
    FIELD name = "input[name=user]"
    FIELD save = "[data-testid=save]"
    FIELD terms = "label=Accept terms"
    FIELD heading = "Welcome"
}
FEATURE F {
    USE Form
    SCENARIO "s" {
        FILL name WITH "Ada"
        CHECK terms
        CLICK save
        VERIFY heading IS VISIBLE
    }
}"#,
        ),
        &TranspileOptions::default(),
    )
    .unwrap()
    .code;

    assert!(code.contains("await page.locator('input[name=user]').fill('Ada');"));
    assert!(code.contains("await page.getByLabel('Accept terms').check();"));
    assert!(code.contains("await page.getByTestId('save').click();"));
    assert!(code.contains("await expect(page.getByText('Welcome')).toBeVisible();"));
    // Fields only, so no page object
    assert!(!code.contains("const Form"));
}

#[test]
fn test_library_bound_to_page() {
    let code = transpile(
        &program(
            r##"PAGE Checkout { FIELD pay = "#pay" }
PAGEACTIONS Flows FOR Checkout {
    confirm { CLICK pay }
}
FEATURE F {
    USE Checkout
    SCENARIO "s" { PERFORM Flows.confirm }
}"##,
        ),
        &TranspileOptions::default(),
    )
    .unwrap()
    .code;

    assert!(code.contains(
        "const Flows = {\n  async confirm(page: Page) {\n    await page.locator('#pay').click();\n  },\n};\n"
    ));
    assert!(code.contains("await Flows.confirm(page);"));
}

#[test]
fn test_context_pages_are_emitted_when_reached() {
    let context = program(
        r##"PAGE Login ("/login") {
    FIELD email = "#email"
    signIn WITH user { FILL email WITH user }
}
PAGE Unused ("/unused") {
    FIELD x = "#x"
}"##,
    );
    let main = program(
        r#"FEATURE Auth {
    USE Login
    SCENARIO "s" { PERFORM Login.signIn WITH "a" }
}"#,
    );
    let output = transpile(
        &main,
        &TranspileOptions {
            context: Some(ProjectContext::new(&context.pages, &context.page_actions)),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(output.code.contains("const Login = {\n  url: '/login',\n"));
    assert!(output
        .code
        .contains("    await page.locator('#email').fill(String(user));\n"));
    assert!(output.code.contains("await Login.signIn(page, 'a');"));
    assert!(!output.code.contains("Unused"));
}

#[test]
fn test_argument_mismatch_is_a_contract_violation() {
    let program = program(
        r#"PAGE Login { go WITH a { REFRESH } }
FEATURE F {
    USE Login
    SCENARIO "s" { PERFORM Login.go }
}"#,
    );
    let error = transpile(&program, &TranspileOptions::default()).unwrap_err();
    assert_eq!(
        error,
        ContractViolation::ArgumentCount {
            page: "Login".to_string(),
            action: "go".to_string(),
            expected: 1,
            found: 0,
            line: 4
        }
    );
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_nested_declarations_are_hoisted() {
    let code = transpile(
        &program(
            r##"FEATURE F {
    SCENARIO "s" {
        TEXT first = "a"
        IF TRUE {
            LOAD users FROM Users
        }
        FOR EACH user IN users {
            FILL "#email" WITH user.email
        }
        FILL "#last" WITH user.name
        FILL "#first" WITH first
    }
}"##,
        ),
        &TranspileOptions::default(),
    )
    .unwrap()
    .code;

    assert!(code.contains("    let users, user;\n"));
    assert!(code.contains("const first = 'a';"));
    assert!(code.contains("users = await testData.query({ table: 'Users', mode: 'load' });"));
    assert!(!code.contains("const users"));
    assert!(code.contains("for (user of users) {"));
    assert!(code.contains("await page.locator('#last').fill(String(user.name));"));
}

#[test]
fn test_page_fields_read_as_values_use_element_text() {
    let code = transpile(
        &program(
            r##"PAGE Login {
    FIELD email = "#email"
    TEXT greeting = "Hello"
}
PAGE Profile {
    FIELD name = "#name"
}
FEATURE F {
    USE Login
    USE Profile
    SCENARIO "s" {
        FILL "#copy" WITH Profile.name
        FILL "#hello" WITH Login.greeting
        LOAD users FROM Users WHERE email == Login.email
    }
}"##,
        ),
        &TranspileOptions::default(),
    )
    .unwrap()
    .code;

    // Fields only, so Profile has no runtime object to read from
    assert!(!code.contains("const Profile"));
    assert!(code.contains(
        "await page.locator('#copy').fill(String(((await page.locator('#name').textContent()) ?? '')));"
    ));
    assert!(code.contains("await page.locator('#hello').fill(String(Login.greeting));"));
    assert!(code.contains(
        "    const $value1 = ((await page.locator('#email').textContent()) ?? '');\n"
    ));
    assert!(code.contains("where: ($row) => ($row['email'] === $value1)"));
}
