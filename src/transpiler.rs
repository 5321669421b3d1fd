//! Lowers a validated program into a Playwright test file.
//!
//! Output layout, in order:
//!
//! 1. imports (`testData` only when a data query is present)
//! 2. one object per page with a URL, variables or actions, then one per
//!    page-actions library; actions become `async name(page, ...params)`
//! 3. one `test.describe` per feature with its hooks and one `test(...)` per
//!    selected scenario and parameter combination, in source order
//!
//! Field targets are inlined: the field's selector replaces the reference and
//! goes through [`selectors::locator_for`].
//!
//! The transpiler trusts the validator. A reference it cannot resolve is a
//! [`ContractViolation`], never a user diagnostic.

mod selectors;
mod writer;

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::{
    ast::{
        ActionDefinition, Aggregation, Assertion, ComparisonOp, Condition, DataCondition,
        DataQuery, ElementState, Expression, Feature, Hook, HookKind, LogicalOp, Page, PageActions,
        Program, QueryMode, Scenario, ScrollDirection, Statement, StatementKind, Target, UrlMatch,
        WaitUnit,
    },
    selection::{normalize_tag, ScenarioSelection},
    validator::ProjectContext,
    value::{ParamCombination, ParamValue},
};
use writer::{quote, regex_literal, CodeWriter};

/// The transpiler met a reference validation should have rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("internal error: page '{page}' at line {line} is not defined")]
    UnknownPage { page: String, line: usize },
    #[error("internal error: '{page}' has no action '{action}' (line {line})")]
    UnknownAction {
        page: String,
        action: String,
        line: usize,
    },
    #[error("internal error: {page}.{action} takes {expected} argument(s), {found} given (line {line})")]
    ArgumentCount {
        page: String,
        action: String,
        expected: usize,
        found: usize,
        line: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TranspileOptions<'a> {
    pub selection: Option<ScenarioSelection>,
    /// Each selected scenario is generated once per combination. Empty means
    /// once, with no bindings.
    pub combinations: Vec<ParamCombination>,
    pub context: Option<ProjectContext<'a>>,
}

/// One generated `test(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCase {
    pub feature: String,
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combination_label: Option<String>,
    pub test_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspileOutput {
    pub code: String,
    /// Scenarios in the program before selection.
    pub total_scenarios: usize,
    /// Scenarios that survived selection.
    pub selected_scenarios: usize,
    pub cases: Vec<GeneratedCase>,
}

type TranspileResult<T = ()> = Result<T, ContractViolation>;

pub fn transpile(
    program: &Program,
    options: &TranspileOptions<'_>,
) -> Result<TranspileOutput, ContractViolation> {
    let mut transpiler = Transpiler::new(program, options.context.as_ref());

    let mut total_scenarios = 0;
    let mut selected: Vec<(&Feature, Vec<&Scenario>)> = Vec::new();
    for feature in &program.features {
        total_scenarios += feature.scenarios.len();
        let scenarios: Vec<&Scenario> = feature
            .scenarios
            .iter()
            .filter(|scenario| {
                options
                    .selection
                    .as_ref()
                    .is_none_or(|selection| selection.matches(feature, scenario))
            })
            .collect();
        if !scenarios.is_empty() {
            selected.push((feature, scenarios));
        }
    }
    let selected_scenarios: usize = selected.iter().map(|(_, s)| s.len()).sum();

    transpiler.emit_fixtures(program, options.context.as_ref())?;

    let mut cases = Vec::new();
    for (feature, scenarios) in &selected {
        transpiler.emit_feature(*feature, scenarios, &options.combinations, &mut cases)?;
    }

    debug!(
        "transpiled {} of {} scenarios into {} cases",
        selected_scenarios,
        total_scenarios,
        cases.len()
    );

    Ok(TranspileOutput {
        code: transpiler.finish(),
        total_scenarios,
        selected_scenarios,
        cases,
    })
}

/// Lexical state of the statement list being emitted.
#[derive(Debug, Clone)]
struct Frame<'a> {
    /// Page searched first for bare field names.
    default_page: Option<&'a str>,
    /// Pages searched next, in `USE` order.
    uses: Vec<&'a str>,
    variables: Vec<String>,
    /// Declared once with `let` at the top of the body and assigned later.
    hoisted: Vec<String>,
    /// Expression locators hang off: `page` or a frame locator.
    root: String,
    repeat_depth: usize,
}

impl<'a> Frame<'a> {
    fn new(default_page: Option<&'a str>, uses: Vec<&'a str>, variables: Vec<String>) -> Self {
        Frame {
            default_page,
            uses,
            variables,
            hoisted: Vec::new(),
            root: "page".to_string(),
            repeat_depth: 0,
        }
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    fn bind(&mut self, name: &str) {
        if !self.has_variable(name) {
            self.variables.push(name.to_string());
        }
    }

    /// Names declared inside a nested block stay visible after it.
    fn absorb(&mut self, inner: Frame<'a>) {
        for name in inner.variables {
            self.bind(&name);
        }
    }
}

struct Transpiler<'a> {
    pages: BTreeMap<&'a str, &'a Page>,
    libraries: BTreeMap<&'a str, &'a PageActions>,
    writer: CodeWriter,
    uses_test_data: bool,
    frames: usize,
    /// Element texts awaited ahead of a row predicate.
    reads: usize,
}

impl<'a> Transpiler<'a> {
    fn new(program: &'a Program, context: Option<&ProjectContext<'a>>) -> Self {
        let mut pages = BTreeMap::new();
        let mut libraries = BTreeMap::new();
        // Later definitions replace earlier ones, matching the validator
        let context_pages = context.map_or(&[][..], |c| c.pages);
        let context_libraries = context.map_or(&[][..], |c| c.page_actions);
        for page in context_pages.iter().chain(&program.pages) {
            pages.insert(page.name.as_str(), page);
        }
        for library in context_libraries.iter().chain(&program.page_actions) {
            libraries.insert(library.name.as_str(), library);
        }
        Transpiler {
            pages,
            libraries,
            writer: CodeWriter::new(),
            uses_test_data: false,
            frames: 0,
            reads: 0,
        }
    }

    fn finish(self) -> String {
        let mut header = String::from("// Generated by vero. Do not edit.\n");
        header.push_str("import { test, expect, type Page } from '@playwright/test';\n");
        if self.uses_test_data {
            header.push_str("import { testData } from '@vero/runtime';\n");
        }
        header.push('\n');
        header.push_str(&self.writer.finish());
        header
    }

    // ========================================================================
    // Fixtures
    // ========================================================================

    /// Emits this file's pages and libraries, plus the context ones it reaches.
    fn emit_fixtures(
        &mut self,
        program: &'a Program,
        context: Option<&ProjectContext<'a>>,
    ) -> TranspileResult {
        let mut wanted: BTreeSet<&'a str> = BTreeSet::new();
        for page in &program.pages {
            wanted.insert(&page.name);
        }
        for library in &program.page_actions {
            wanted.insert(&library.name);
        }
        for feature in &program.features {
            wanted.extend(feature.uses.iter().map(|u| u.name.as_str()));
            for hook in &feature.hooks {
                collect_references(&hook.statements, &mut wanted);
            }
            for scenario in &feature.scenarios {
                collect_references(&scenario.statements, &mut wanted);
            }
        }

        // Actions of reached definitions may reach further
        let mut pending: Vec<&'a str> = wanted.iter().copied().collect();
        while let Some(name) = pending.pop() {
            let mut found = BTreeSet::new();
            if let Some(page) = self.pages.get(name).copied() {
                for action in &page.actions {
                    collect_references(&action.statements, &mut found);
                }
            }
            if let Some(library) = self.libraries.get(name).copied() {
                found.extend(library.for_page.as_deref());
                for action in &library.actions {
                    collect_references(&action.statements, &mut found);
                }
            }
            for reference in found {
                if wanted.insert(reference) {
                    pending.push(reference);
                }
            }
        }

        // Source order: context first, then this file, each name once
        let context_pages = context.map_or(&[][..], |c| c.pages);
        let context_libraries = context.map_or(&[][..], |c| c.page_actions);
        let mut emitted = BTreeSet::new();

        for page in context_pages.iter().chain(&program.pages) {
            let name = page.name.as_str();
            if wanted.contains(name) && emitted.insert(name) {
                if let Some(page) = self.pages.get(name).copied() {
                    self.emit_page(page)?;
                }
            }
        }

        let mut emitted = BTreeSet::new();
        for library in context_libraries.iter().chain(&program.page_actions) {
            let name = library.name.as_str();
            if wanted.contains(name) && emitted.insert(name) {
                if let Some(library) = self.libraries.get(name).copied() {
                    self.emit_library(library)?;
                }
            }
        }

        Ok(())
    }

    fn emit_page(&mut self, page: &'a Page) -> TranspileResult {
        if page.url.is_none() && page.variables.is_empty() && page.actions.is_empty() {
            return Ok(());
        }

        self.writer.open(&format!("const {} = {{", page.name));
        if let Some(url) = &page.url {
            self.writer.line(&format!("url: {},", quote(url)));
        }
        let frame = Frame::new(Some(page.name.as_str()), Vec::new(), Vec::new());
        for variable in &page.variables {
            let value = self.expression(&variable.value, &frame);
            self.writer.line(&format!("{}: {},", variable.name, value));
        }
        for action in &page.actions {
            self.emit_action(action, Some(page.name.as_str()))?;
        }
        self.writer.close("};");
        self.writer.blank();
        Ok(())
    }

    fn emit_library(&mut self, library: &'a PageActions) -> TranspileResult {
        self.writer.open(&format!("const {} = {{", library.name));
        for action in &library.actions {
            self.emit_action(action, library.for_page.as_deref())?;
        }
        self.writer.close("};");
        self.writer.blank();
        Ok(())
    }

    fn emit_action(
        &mut self,
        action: &'a ActionDefinition,
        default_page: Option<&'a str>,
    ) -> TranspileResult {
        let mut parameters = vec!["page: Page".to_string()];
        parameters.extend(action.parameters.iter().map(|p| format!("{}: any", p)));
        self.writer.open(&format!(
            "async {}({}) {{",
            action.name,
            parameters.join(", ")
        ));
        self.frames = 0;
        self.reads = 0;
        let mut frame = Frame::new(default_page, Vec::new(), action.parameters.clone());
        self.hoist(&action.statements, &mut frame);
        self.emit_statements(&action.statements, &mut frame)?;
        self.writer.close("},");
        Ok(())
    }

    // ========================================================================
    // Features
    // ========================================================================

    fn emit_feature(
        &mut self,
        feature: &'a Feature,
        scenarios: &[&'a Scenario],
        combinations: &[ParamCombination],
        cases: &mut Vec<GeneratedCase>,
    ) -> TranspileResult {
        let uses: Vec<&'a str> = feature.uses.iter().map(|u| u.name.as_str()).collect();

        self.writer
            .open(&format!("test.describe({}, () => {{", quote(&feature.name)));

        for hook in &feature.hooks {
            self.emit_hook(hook, &uses)?;
        }

        for &scenario in scenarios {
            let tags = effective_tags(feature, scenario);
            if combinations.is_empty() {
                self.emit_test(&scenario.name, &tags, scenario, None, &uses)?;
                cases.push(GeneratedCase {
                    feature: feature.name.clone(),
                    scenario: scenario.name.clone(),
                    combination_label: None,
                    test_name: scenario.name.clone(),
                });
                continue;
            }

            let mut labels: Vec<String> = Vec::new();
            for (index, combination) in combinations.iter().enumerate() {
                let mut label = combination.display_label();
                if labels.contains(&label) {
                    label = format!("{} #{}", label, index + 1);
                }
                labels.push(label.clone());

                let test_name = format!("{} [{}]", scenario.name, label);
                self.emit_test(&test_name, &tags, scenario, Some(combination), &uses)?;
                cases.push(GeneratedCase {
                    feature: feature.name.clone(),
                    scenario: scenario.name.clone(),
                    combination_label: Some(label),
                    test_name,
                });
            }
        }

        self.writer.close("});");
        self.writer.blank();
        Ok(())
    }

    fn emit_hook(&mut self, hook: &'a Hook, uses: &[&'a str]) -> TranspileResult {
        let (name, per_test) = match hook.kind {
            HookKind::BeforeAll => ("beforeAll", false),
            HookKind::BeforeEach => ("beforeEach", true),
            HookKind::AfterAll => ("afterAll", false),
            HookKind::AfterEach => ("afterEach", true),
        };

        self.frames = 0;
        self.reads = 0;
        let mut frame = Frame::new(None, uses.to_vec(), Vec::new());
        if per_test {
            self.writer
                .open(&format!("test.{}(async ({{ page }}) => {{", name));
            self.hoist(&hook.statements, &mut frame);
            self.emit_statements(&hook.statements, &mut frame)?;
        } else {
            // The page fixture is per test; suite hooks open their own page
            self.writer
                .open(&format!("test.{}(async ({{ browser }}) => {{", name));
            self.writer.line("let page = await browser.newPage();");
            self.hoist(&hook.statements, &mut frame);
            self.emit_statements(&hook.statements, &mut frame)?;
            self.writer.line("await page.close();");
        }
        self.writer.close("});");
        self.writer.blank();
        Ok(())
    }

    fn emit_test(
        &mut self,
        test_name: &str,
        tags: &[String],
        scenario: &'a Scenario,
        combination: Option<&ParamCombination>,
        uses: &[&'a str],
    ) -> TranspileResult {
        let details = if tags.is_empty() {
            String::new()
        } else {
            let tags: Vec<String> = tags.iter().map(|t| quote(&format!("@{}", t))).collect();
            format!("{{ tag: [{}] }}, ", tags.join(", "))
        };
        self.writer.open(&format!(
            "test({}, {}async ({{ page }}) => {{",
            quote(test_name),
            details
        ));

        self.frames = 0;
        self.reads = 0;
        let bound: Vec<String> = combination
            .map(|c| c.values.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        let mut frame = Frame::new(None, uses.to_vec(), bound);
        let reassigned = hoisted_names(&scenario.statements, &frame.variables);
        if let Some(combination) = combination {
            for (name, value) in &combination.values {
                let keyword = if reassigned.contains(name) { "let" } else { "const" };
                self.writer.line(&format!(
                    "{} {} = {};",
                    keyword,
                    name,
                    param_literal(value)
                ));
            }
        }
        self.hoist(&scenario.statements, &mut frame);
        self.emit_statements(&scenario.statements, &mut frame)?;

        self.writer.close("});");
        self.writer.blank();
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Declares the body's hoisted names that are not already bound.
    fn hoist(&mut self, statements: &'a [Statement], frame: &mut Frame<'a>) {
        frame.hoisted = hoisted_names(statements, &frame.variables);
        let fresh: Vec<&str> = frame
            .hoisted
            .iter()
            .filter(|name| !frame.has_variable(name))
            .map(String::as_str)
            .collect();
        if !fresh.is_empty() {
            self.writer.line(&format!("let {};", fresh.join(", ")));
        }
    }

    fn declare(&mut self, name: &str, value: &str, frame: &mut Frame<'a>) {
        if frame.hoisted.iter().any(|h| h == name) {
            self.writer.line(&format!("{} = {};", name, value));
        } else {
            self.writer.line(&format!("const {} = {};", name, value));
        }
        frame.bind(name);
    }

    fn emit_statements(
        &mut self,
        statements: &'a [Statement],
        frame: &mut Frame<'a>,
    ) -> TranspileResult {
        for statement in statements {
            self.emit_statement(statement, frame)?;
        }
        Ok(())
    }

    fn emit_statement(
        &mut self,
        statement: &'a Statement,
        frame: &mut Frame<'a>,
    ) -> TranspileResult {
        let line = statement.line;
        match &statement.kind {
            StatementKind::Open { url } => {
                let url = self.expression(url, frame);
                self.writer.line(&format!("await page.goto({});", url));
            }
            StatementKind::Click { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.click();", locator));
            }
            StatementKind::Fill { target, value } => {
                let locator = self.locator(target, frame, line)?;
                let value = self.text(value, frame);
                self.writer.line(&format!("await {}.fill({});", locator, value));
            }
            StatementKind::Hover { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.hover();", locator));
            }
            StatementKind::Check { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.check();", locator));
            }
            StatementKind::Uncheck { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.uncheck();", locator));
            }
            StatementKind::Select { option, target } => {
                let locator = self.locator(target, frame, line)?;
                let option = self.text(option, frame);
                self.writer
                    .line(&format!("await {}.selectOption({});", locator, option));
            }
            StatementKind::Scroll { direction, target } => match (direction, target) {
                (_, Some(target)) => {
                    let locator = self.locator(target, frame, line)?;
                    self.writer
                        .line(&format!("await {}.scrollIntoViewIfNeeded();", locator));
                }
                (Some(ScrollDirection::Up), None) => {
                    self.writer.line("await page.mouse.wheel(0, -500);")
                }
                _ => self.writer.line("await page.mouse.wheel(0, 500);"),
            },
            StatementKind::Press { key } => {
                let key = self.text(key, frame);
                self.writer.line(&format!("await page.keyboard.press({});", key));
            }
            StatementKind::Drag {
                source,
                destination,
            } => {
                let source = self.locator(source, frame, line)?;
                let destination = self.locator(destination, frame, line)?;
                self.writer
                    .line(&format!("await {}.dragTo({});", source, destination));
            }
            StatementKind::Upload { file, target } => {
                let locator = self.locator(target, frame, line)?;
                let file = self.expression(file, frame);
                self.writer
                    .line(&format!("await {}.setInputFiles({});", locator, file));
            }
            StatementKind::Wait { amount, unit } => {
                let milliseconds = match (amount, unit) {
                    (Expression::Number { value }, WaitUnit::Seconds) => value
                        .checked_mul(rust_decimal::Decimal::ONE_THOUSAND)
                        .map(|ms| ms.normalize().to_string())
                        .unwrap_or_else(|| format!("({}) * 1000", value.normalize())),
                    (_, WaitUnit::Seconds) => {
                        format!("({}) * 1000", self.expression(amount, frame))
                    }
                    (_, WaitUnit::Milliseconds) => self.expression(amount, frame),
                };
                self.writer
                    .line(&format!("await page.waitForTimeout({});", milliseconds));
            }
            StatementKind::WaitFor { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.waitFor();", locator));
            }
            StatementKind::Refresh => self.writer.line("await page.reload();"),
            StatementKind::Clear { target } => {
                let locator = self.locator(target, frame, line)?;
                self.writer.line(&format!("await {}.clear();", locator));
            }
            StatementKind::Screenshot { name } => match name {
                Some(Expression::String { value }) => {
                    let path = if value.ends_with(".png") {
                        value.clone()
                    } else {
                        format!("{}.png", value)
                    };
                    self.writer
                        .line(&format!("await page.screenshot({{ path: {} }});", quote(&path)));
                }
                Some(name) => {
                    let name = self.expression(name, frame);
                    self.writer.line(&format!(
                        "await page.screenshot({{ path: String({}) + '.png' }});",
                        name
                    ));
                }
                None => self.writer.line("await page.screenshot();"),
            },
            StatementKind::Log { message } => {
                let message = self.expression(message, frame);
                self.writer.line(&format!("console.log({});", message));
            }
            StatementKind::SwitchToTab { index } => {
                let index = self.expression(index, frame);
                self.writer
                    .line(&format!("page = page.context().pages()[({}) - 1];", index));
                self.writer.line("await page.bringToFront();");
            }
            StatementKind::SwitchToNewTab { url } => {
                self.writer.line("page = await page.context().newPage();");
                if let Some(url) = url {
                    let url = self.expression(url, frame);
                    self.writer.line(&format!("await page.goto({});", url));
                }
            }
            StatementKind::CloseTab => {
                self.writer.line("await page.close();");
                self.writer.line("page = page.context().pages().at(-1) ?? page;");
            }
            StatementKind::SwitchToFrame { target } => {
                let locator = self.locator(target, frame, line)?;
                self.frames += 1;
                let name = format!("frame{}", self.frames);
                self.writer
                    .line(&format!("const {} = {}.contentFrame();", name, locator));
                frame.root = name;
            }
            StatementKind::SwitchToMainFrame => frame.root = "page".to_string(),
            StatementKind::AcceptDialog { prompt } => {
                let prompt = prompt
                    .as_ref()
                    .map(|p| self.text(p, frame))
                    .unwrap_or_default();
                self.writer.line(&format!(
                    "page.once('dialog', (dialog) => dialog.accept({}));",
                    prompt
                ));
            }
            StatementKind::DismissDialog => self
                .writer
                .line("page.once('dialog', (dialog) => dialog.dismiss());"),
            StatementKind::ClearCookies => {
                self.writer.line("await page.context().clearCookies();")
            }
            StatementKind::ClearStorage => self.writer.line(
                "await page.evaluate(() => { localStorage.clear(); sessionStorage.clear(); });",
            ),
            StatementKind::Verify(assertion) => self.emit_assertion(assertion, frame, line)?,
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.condition(condition, frame, line)?;
                self.writer.open(&format!("if ({}) {{", condition));
                let mut then_frame = frame.clone();
                self.emit_statements(then_branch, &mut then_frame)?;
                frame.absorb(then_frame);
                if else_branch.is_empty() {
                    self.writer.close("}");
                } else {
                    self.writer.reopen("} else {");
                    let mut else_frame = frame.clone();
                    self.emit_statements(else_branch, &mut else_frame)?;
                    frame.absorb(else_frame);
                    self.writer.close("}");
                }
            }
            StatementKind::Repeat { times, body } => {
                let times = self.expression(times, frame);
                let counter = format!("i{}", frame.repeat_depth);
                self.writer.open(&format!(
                    "for (let {c} = 0; {c} < {}; {c}++) {{",
                    times,
                    c = counter
                ));
                let mut inner = frame.clone();
                inner.repeat_depth += 1;
                self.emit_statements(body, &mut inner)?;
                frame.absorb(inner);
                self.writer.close("}");
            }
            StatementKind::ForEach {
                item,
                collection,
                body,
            } => {
                // Loop items are always hoisted
                self.writer
                    .open(&format!("for ({} of {}) {{", item, collection));
                frame.bind(item);
                let mut inner = frame.clone();
                self.emit_statements(body, &mut inner)?;
                frame.absorb(inner);
                self.writer.close("}");
            }
            StatementKind::VariableDeclaration { name, value, .. } => {
                let value = self.expression(value, frame);
                self.declare(name, &value, frame);
            }
            StatementKind::Perform { action, arguments } => {
                self.check_action(&action.page, &action.action, arguments.len(), line)?;
                let mut values = vec!["page".to_string()];
                values.extend(arguments.iter().map(|a| self.expression(a, frame)));
                self.writer.line(&format!(
                    "await {}.{}({});",
                    action.page,
                    action.action,
                    values.join(", ")
                ));
            }
            StatementKind::DataQuery(query) => {
                let call = self.data_query(query, frame);
                self.declare(&query.variable, &call, frame);
            }
        }
        Ok(())
    }

    fn emit_assertion(
        &mut self,
        assertion: &Assertion,
        frame: &Frame<'a>,
        line: usize,
    ) -> TranspileResult {
        let not = |negated: bool| if negated { ".not" } else { "" };
        let code = match assertion {
            Assertion::State {
                target,
                negated,
                state,
            } => {
                let matcher = match state {
                    ElementState::Visible => "toBeVisible",
                    ElementState::Hidden => "toBeHidden",
                    ElementState::Enabled => "toBeEnabled",
                    ElementState::Disabled => "toBeDisabled",
                    ElementState::Checked => "toBeChecked",
                    ElementState::Empty => "toBeEmpty",
                    ElementState::Focused => "toBeFocused",
                };
                format!(
                    "await expect({}){}.{}();",
                    self.locator(target, frame, line)?,
                    not(*negated),
                    matcher
                )
            }
            Assertion::Text {
                target,
                negated,
                contains,
                expected,
            } => format!(
                "await expect({}){}.{}({});",
                self.locator(target, frame, line)?,
                not(*negated),
                if *contains { "toContainText" } else { "toHaveText" },
                self.text(expected, frame)
            ),
            Assertion::Value {
                target,
                negated,
                expected,
            } => format!(
                "await expect({}){}.toHaveValue({});",
                self.locator(target, frame, line)?,
                not(*negated),
                self.text(expected, frame)
            ),
            Assertion::Attribute {
                target,
                name,
                expected,
            } => format!(
                "await expect({}).toHaveAttribute({}, {});",
                self.locator(target, frame, line)?,
                self.text(name, frame),
                self.text(expected, frame)
            ),
            Assertion::Count { target, expected } => format!(
                "await expect({}).toHaveCount({});",
                self.locator(target, frame, line)?,
                self.expression(expected, frame)
            ),
            Assertion::Url { matcher, expected } => {
                let expected = match matcher {
                    UrlMatch::Is => self.expression(expected, frame),
                    UrlMatch::Contains => self.contains_pattern(expected, frame),
                    UrlMatch::Matches => format!("new RegExp({})", self.text(expected, frame)),
                };
                format!("await expect(page).toHaveURL({});", expected)
            }
            Assertion::Title { contains, expected } => {
                let expected = if *contains {
                    self.contains_pattern(expected, frame)
                } else {
                    self.expression(expected, frame)
                };
                format!("await expect(page).toHaveTitle({});", expected)
            }
        };
        self.writer.line(&code);
        Ok(())
    }

    fn condition(
        &self,
        condition: &Condition,
        frame: &Frame<'a>,
        line: usize,
    ) -> TranspileResult<String> {
        Ok(match condition {
            Condition::ElementState {
                target,
                negated,
                state,
            } => {
                let locator = self.locator(target, frame, line)?;
                let check = match state {
                    ElementState::Visible => format!("await {}.isVisible()", locator),
                    ElementState::Hidden => format!("await {}.isHidden()", locator),
                    ElementState::Enabled => format!("await {}.isEnabled()", locator),
                    ElementState::Disabled => format!("await {}.isDisabled()", locator),
                    ElementState::Checked => format!("await {}.isChecked()", locator),
                    ElementState::Empty => {
                        format!("((await {}.textContent()) ?? '').trim() === ''", locator)
                    }
                    ElementState::Focused => format!(
                        "await {}.evaluate((el) => el === document.activeElement)",
                        locator
                    ),
                };
                if *negated {
                    format!("!({})", check)
                } else {
                    check
                }
            }
            Condition::Comparison { left, op, right } => {
                comparison(&self.expression(left, frame), *op, &self.expression(right, frame))
            }
            Condition::Truthy { value } => self.expression(value, frame),
        })
    }

    fn check_action(
        &self,
        page: &str,
        action: &str,
        arguments: usize,
        line: usize,
    ) -> TranspileResult {
        let definition = match (self.libraries.get(page), self.pages.get(page)) {
            (Some(library), _) => library.action(action),
            (None, Some(definition)) => definition.action(action),
            (None, None) => {
                return Err(ContractViolation::UnknownPage {
                    page: page.to_string(),
                    line,
                });
            }
        };
        let definition = definition.ok_or_else(|| ContractViolation::UnknownAction {
            page: page.to_string(),
            action: action.to_string(),
            line,
        })?;
        if definition.parameters.len() != arguments {
            return Err(ContractViolation::ArgumentCount {
                page: page.to_string(),
                action: action.to_string(),
                expected: definition.parameters.len(),
                found: arguments,
                line,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Data queries
    // ========================================================================

    fn data_query(&mut self, query: &DataQuery, frame: &Frame<'a>) -> String {
        self.uses_test_data = true;

        let mode = match query.mode {
            QueryMode::Load => "load",
            QueryMode::Row => "row",
            QueryMode::Rows => "rows",
            QueryMode::Aggregate(Aggregation::Count) => "count",
            QueryMode::Aggregate(Aggregation::Sum) => "sum",
            QueryMode::Aggregate(Aggregation::Average) => "average",
            QueryMode::Aggregate(Aggregation::Min) => "min",
            QueryMode::Aggregate(Aggregation::Max) => "max",
            QueryMode::Aggregate(Aggregation::Distinct) => "distinct",
        };

        let mut fields = vec![format!("table: {}", quote(&query.source.table))];
        if let Some(column) = &query.source.column {
            fields.push(format!("column: {}", quote(column)));
        }
        fields.push(format!("mode: {}", quote(mode)));

        if let Some(clause) = &query.where_clause {
            // Strictly left to right: ((c1) && (c2)) || (c3)
            let value = self.condition_value(&clause.first, frame);
            let mut predicate = format!("({})", data_condition(&clause.first, &value));
            for (op, condition) in &clause.rest {
                let op = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                let value = self.condition_value(condition, frame);
                predicate = format!(
                    "({} {} ({}))",
                    predicate,
                    op,
                    data_condition(condition, &value)
                );
            }
            fields.push(format!("where: ($row) => {}", predicate));
        }

        if !query.order_by.is_empty() {
            let order: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    format!(
                        "{{ column: {}, descending: {} }}",
                        quote(&o.column),
                        o.descending
                    )
                })
                .collect();
            fields.push(format!("orderBy: [{}]", order.join(", ")));
        }
        if let Some(limit) = query.limit {
            fields.push(format!("limit: {}", limit));
        }
        if let Some(offset) = query.offset {
            fields.push(format!("offset: {}", offset));
        }

        format!("await testData.query({{ {} }})", fields.join(", "))
    }

    /// The value a condition compares against. The row predicate is
    /// synchronous, so element texts are awaited into a local first.
    fn condition_value(&mut self, condition: &DataCondition, frame: &Frame<'a>) -> String {
        let Some(value) = condition.value.as_ref() else {
            return String::new();
        };
        let lowered = self.expression(value, frame);
        if !self.reads_element(value, frame) {
            return lowered;
        }
        self.reads += 1;
        let name = format!("$value{}", self.reads);
        self.writer.line(&format!("const {} = {};", name, lowered));
        name
    }

    // ========================================================================
    // Targets and expressions
    // ========================================================================

    /// Resolves a target to a Playwright locator expression.
    fn locator(
        &self,
        target: &Target,
        frame: &Frame<'a>,
        line: usize,
    ) -> TranspileResult<String> {
        let root = frame.root.as_str();

        if let Some(selector) = &target.selector {
            return Ok(self.selector_locator(root, selector, frame));
        }

        let Some(field) = target.field.as_deref() else {
            return Err(ContractViolation::UnknownPage {
                page: String::new(),
                line,
            });
        };

        match target.page.as_deref() {
            // `row.name`: the element showing that value
            Some(qualifier) if frame.has_variable(qualifier) => {
                Ok(format!("{}.getByText(String({}.{}))", root, qualifier, field))
            }
            Some(page) => {
                let definition =
                    self.pages
                        .get(page)
                        .ok_or_else(|| ContractViolation::UnknownPage {
                            page: page.to_string(),
                            line,
                        })?;
                Ok(self
                    .field_locator(root, definition, field, frame)
                    .unwrap_or_else(|| format!("{}.getByText({})", root, quote(field))))
            }
            None if frame.has_variable(field) => {
                Ok(format!("{}.getByText(String({}))", root, field))
            }
            None => {
                let found = frame
                    .default_page
                    .iter()
                    .chain(&frame.uses)
                    .filter_map(|name| self.pages.get(name))
                    .find_map(|page| self.field_locator(root, page, field, frame));
                Ok(found.unwrap_or_else(|| format!("{}.getByText({})", root, quote(field))))
            }
        }
    }

    fn field_locator(
        &self,
        root: &str,
        page: &Page,
        field: &str,
        frame: &Frame<'a>,
    ) -> Option<String> {
        if let Some(definition) = page.field(field) {
            return Some(self.selector_locator(root, &definition.selector, frame));
        }
        page.variable(field)
            .map(|_| format!("{}.getByText(String({}.{}))", root, page.name, field))
    }

    fn selector_locator(&self, root: &str, selector: &Expression, frame: &Frame<'a>) -> String {
        match selector {
            Expression::String { value } => selectors::locator_for(root, value),
            other => format!("{}.locator({})", root, self.text(other, frame)),
        }
    }

    fn expression(&self, expression: &Expression, frame: &Frame<'a>) -> String {
        match expression {
            Expression::String { value } => quote(value),
            Expression::Number { value } => value.normalize().to_string(),
            Expression::Boolean { value } => value.to_string(),
            Expression::EnvVar { name } => format!("(process.env[{}] ?? '')", quote(name)),
            Expression::Variable { qualifier, name } => match qualifier {
                Some(qualifier) if !frame.has_variable(qualifier) => {
                    self.page_member_value(qualifier, name, frame)
                }
                Some(qualifier) => format!("{}.{}", qualifier, name),
                None => name.clone(),
            },
            Expression::Concat { parts } => parts
                .iter()
                .map(|part| self.text(part, frame))
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }

    /// `Page.member` read as a value. Page variables live on the page object;
    /// fields have no runtime object, so their element's text is read instead.
    fn page_member_value(&self, page: &str, member: &str, frame: &Frame<'a>) -> String {
        let definition = match self.pages.get(page) {
            Some(definition) if definition.variable(member).is_none() => definition,
            _ => return format!("{}.{}", page, member),
        };
        let root = frame.root.as_str();
        let locator = self
            .field_locator(root, definition, member, frame)
            .unwrap_or_else(|| format!("{}.getByText({})", root, quote(member)));
        format!("((await {}.textContent()) ?? '')", locator)
    }

    /// Whether lowering `expression` awaits an element's text.
    fn reads_element(&self, expression: &Expression, frame: &Frame<'a>) -> bool {
        match expression {
            Expression::Variable {
                qualifier: Some(qualifier),
                name,
            } if !frame.has_variable(qualifier) => self
                .pages
                .get(qualifier.as_str())
                .is_some_and(|page| page.variable(name).is_none()),
            Expression::Concat { parts } => parts.iter().any(|p| self.reads_element(p, frame)),
            _ => false,
        }
    }

    /// An expression used where Playwright wants a string.
    fn text(&self, expression: &Expression, frame: &Frame<'a>) -> String {
        match expression {
            Expression::String { .. } | Expression::EnvVar { .. } | Expression::Concat { .. } => {
                self.expression(expression, frame)
            }
            other => format!("String({})", self.expression(other, frame)),
        }
    }

    /// A regular expression matching any text containing `expected`.
    fn contains_pattern(&self, expected: &Expression, frame: &Frame<'a>) -> String {
        match expected {
            Expression::String { value } => regex_literal(value),
            other => format!(
                r"new RegExp({}.replace(/[.*+?^${{}}()|[\]\\]/g, '\\$&'))",
                self.text(other, frame)
            ),
        }
    }
}

/// Names that a body cannot declare with `const` in place. A declaration is
/// visible to every later statement of the body, including those past the end
/// of the block that made it, so names declared in nested blocks, loop items
/// and names declared twice are hoisted.
fn hoisted_names(statements: &[Statement], bound: &[String]) -> Vec<String> {
    let mut seen: Vec<&str> = bound.iter().map(String::as_str).collect();
    let mut hoisted = Vec::new();
    collect_declarations(statements, false, &mut seen, &mut hoisted);
    hoisted
}

fn collect_declarations<'a>(
    statements: &'a [Statement],
    nested: bool,
    seen: &mut Vec<&'a str>,
    hoisted: &mut Vec<String>,
) {
    fn note<'a>(name: &'a str, hoist: bool, seen: &mut Vec<&'a str>, hoisted: &mut Vec<String>) {
        if (hoist || seen.contains(&name)) && !hoisted.iter().any(|h| h == name) {
            hoisted.push(name.to_string());
        }
        seen.push(name);
    }

    for statement in statements {
        match &statement.kind {
            StatementKind::VariableDeclaration { name, .. } => note(name, nested, seen, hoisted),
            StatementKind::DataQuery(query) => note(&query.variable, nested, seen, hoisted),
            StatementKind::ForEach { item, body, .. } => {
                note(item, true, seen, hoisted);
                collect_declarations(body, true, seen, hoisted);
            }
            StatementKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_declarations(then_branch, true, seen, hoisted);
                collect_declarations(else_branch, true, seen, hoisted);
            }
            StatementKind::Repeat { body, .. } => collect_declarations(body, true, seen, hoisted),
            _ => {}
        }
    }
}

/// Page and library names a statement list refers to, nested bodies included.
fn collect_references<'a>(statements: &'a [Statement], found: &mut BTreeSet<&'a str>) {
    for statement in statements {
        for target in statement.kind.targets() {
            found.extend(target.page.as_deref());
        }
        for expression in statement.kind.expressions() {
            found.extend(expression.variables().into_iter().filter_map(|(q, _)| q));
        }
        match &statement.kind {
            StatementKind::Perform { action, .. } => {
                found.insert(&action.page);
            }
            StatementKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_references(then_branch, found);
                collect_references(else_branch, found);
            }
            StatementKind::Repeat { body, .. } | StatementKind::ForEach { body, .. } => {
                collect_references(body, found)
            }
            _ => {}
        }
    }
}

fn data_condition(condition: &DataCondition, value: &str) -> String {
    let column = format!("$row[{}]", quote(&condition.column));
    match condition.op {
        ComparisonOp::StartsWith => format!("String({}).startsWith(String({}))", column, value),
        ComparisonOp::EndsWith => format!("String({}).endsWith(String({}))", column, value),
        ComparisonOp::Matches => format!("new RegExp({}).test(String({}))", value, column),
        ComparisonOp::IsEmpty => format!("({c} == null || String({c}) === '')", c = column),
        ComparisonOp::IsNotEmpty => format!("({c} != null && String({c}) !== '')", c = column),
        op => comparison(&column, op, value),
    }
}

fn comparison(left: &str, op: ComparisonOp, right: &str) -> String {
    let operator = match op {
        ComparisonOp::Equal => "===",
        ComparisonOp::NotEqual => "!==",
        ComparisonOp::GreaterThan => ">",
        ComparisonOp::LessThan => "<",
        ComparisonOp::GreaterEqual => ">=",
        ComparisonOp::LessEqual => "<=",
        ComparisonOp::Contains => {
            return format!("String({}).includes(String({}))", left, right);
        }
        ComparisonOp::StartsWith => {
            return format!("String({}).startsWith(String({}))", left, right);
        }
        ComparisonOp::EndsWith => {
            return format!("String({}).endsWith(String({}))", left, right);
        }
        ComparisonOp::Matches => return format!("new RegExp({}).test(String({}))", right, left),
        ComparisonOp::IsEmpty => return format!("String({} ?? '') === ''", left),
        ComparisonOp::IsNotEmpty => return format!("String({} ?? '') !== ''", left),
    };
    format!("{} {} {}", left, operator, right)
}

fn effective_tags(feature: &Feature, scenario: &Scenario) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in feature.tags.iter().chain(&scenario.tags) {
        let tag = normalize_tag(tag);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn param_literal(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => "null".to_string(),
        ParamValue::Boolean(b) => b.to_string(),
        ParamValue::Number(n) => n.normalize().to_string(),
        ParamValue::String(s) => quote(s),
        ParamValue::List(items) => {
            let items: Vec<String> = items.iter().map(param_literal).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};

    fn program(source: &str) -> Program {
        let output = parser::parse(lexer::tokenize(source).tokens);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        output.program
    }

    fn code(source: &str) -> String {
        transpile(&program(source), &TranspileOptions::default())
            .expect("transpiles")
            .code
    }

    const LOGIN: &str = r##"
PAGE Login ("/login") {
    FIELD email = "#email"
    FIELD submit = "[data-testid=submit]"
    TEXT greeting = "Welcome"

    signIn WITH user {
        FILL email WITH user
        CLICK submit
    }
}
"##;

    #[test]
    fn test_page_fixture_and_field_inlining() {
        let source = format!(
            "{}{}",
            LOGIN,
            r#"FEATURE Auth {
    USE Login
    SCENARIO "Sign in" @smoke {
        OPEN "/login"
        FILL Login.email WITH "a@b.c"
        CLICK submit
        PERFORM Login.signIn WITH "a@b.c"
        VERIFY Login.greeting IS VISIBLE
    }
}"#
        );
        let code = code(&source);

        assert!(code.starts_with("// Generated by vero. Do not edit.\nimport { test, expect, type Page } from '@playwright/test';\n"));
        assert!(!code.contains("testData"));
        assert!(code.contains("const Login = {\n  url: '/login',\n  greeting: 'Welcome',\n"));
        assert!(code.contains("  async signIn(page: Page, user: any) {\n    await page.locator('#email').fill(String(user));\n    await page.getByTestId('submit').click();\n"));
        assert!(code.contains("test.describe('Auth', () => {"));
        assert!(code.contains("test('Sign in', { tag: ['@smoke'] }, async ({ page }) => {"));
        assert!(code.contains("await page.goto('/login');"));
        assert!(code.contains("await page.locator('#email').fill('a@b.c');"));
        assert!(code.contains("await page.getByTestId('submit').click();"));
        assert!(code.contains("await Login.signIn(page, 'a@b.c');"));
        assert!(code.contains("await expect(page.getByText(String(Login.greeting))).toBeVisible();"));
    }

    #[test]
    fn test_unknown_field_falls_back_to_text() {
        let code = code(
            r#"FEATURE Nav { SCENARIO "s" { CLICK "Sign in" CLICK checkout VERIFY URL CONTAINS "/cart?x" } }"#,
        );
        assert!(code.contains("await page.getByText('Sign in').click();"));
        assert!(code.contains("await page.getByText('checkout').click();"));
        assert!(code.contains("await expect(page).toHaveURL(/\\/cart\\?x/);"));
    }

    #[test]
    fn test_combinations_generate_distinct_tests() {
        let program = program(r##"FEATURE F { SCENARIO "Login" { FILL "#u" WITH role } }"##);
        let combinations = ["admin", "editor", "viewer"]
            .iter()
            .map(|role| {
                ParamCombination::new(vec![(
                    "role".to_string(),
                    ParamValue::String(role.to_string()),
                )])
            })
            .collect();
        let output = transpile(
            &program,
            &TranspileOptions {
                combinations,
                ..Default::default()
            },
        )
        .unwrap();

        let names: Vec<&str> = output.cases.iter().map(|c| c.test_name.as_str()).collect();
        assert_eq!(
            names,
            ["Login [role=admin]", "Login [role=editor]", "Login [role=viewer]"]
        );
        assert!(output.code.contains("const role = 'editor';"));
        assert!(output.code.contains("await page.locator('#u').fill(String(role));"));
    }

    #[test]
    fn test_selection_counts() {
        let program = program(
            r#"FEATURE F {
    SCENARIO "a" @smoke { REFRESH }
    SCENARIO "b" { REFRESH }
}"#,
        );
        let output = transpile(
            &program,
            &TranspileOptions {
                selection: Some(ScenarioSelection::new().with_tag("smoke")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(output.total_scenarios, 2);
        assert_eq!(output.selected_scenarios, 1);
        assert!(output.code.contains("test('a'"));
        assert!(!output.code.contains("test('b'"));

        let output = transpile(
            &program,
            &TranspileOptions {
                selection: Some(ScenarioSelection::new().with_tag("missing")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(output.selected_scenarios, 0);
        assert!(!output.code.contains("test.describe"));
    }

    #[test]
    fn test_data_query_lowering() {
        let code = code(
            r##"FEATURE F { SCENARIO "s" {
    LOAD admins FROM Users WHERE role == "admin" OR name STARTS WITH "A" AND email IS EMPTY ORDER BY name DESC LIMIT 5
    FOR EACH admin IN admins {
        FILL "#email" WITH admin.email
    }
} }"##,
        );
        assert!(code.contains("import { testData } from '@vero/runtime';"));
        assert!(code.contains(
            "const admins = await testData.query({ table: 'Users', mode: 'load', where: ($row) => ((($row['role'] === 'admin') || (String($row['name']).startsWith(String('A')))) && (($row['email'] == null || String($row['email']) === ''))), orderBy: [{ column: 'name', descending: true }], limit: 5 });"
        ));
        assert!(code.contains("    let admin;\n"));
        assert!(code.contains("for (admin of admins) {"));
        assert!(code.contains("await page.locator('#email').fill(String(admin.email));"));
    }

    #[test]
    fn test_control_flow_and_waits() {
        let code = code(
            r##"FEATURE F { SCENARIO "s" {
    NUMBER tries = 3
    REPEAT tries TIMES { WAIT 1.5 SECONDS }
    WAIT 79228162514264337593543950335 SECONDS
    IF "#banner" IS NOT VISIBLE { REFRESH } ELSE { WAIT 200 MILLISECONDS }
    SWITCH TO FRAME "#payment"
    CLICK "#pay"
    SWITCH TO MAIN FRAME
    TAKE SCREENSHOT AS "done"
} }"##,
        );
        assert!(code.contains("const tries = 3;"));
        assert!(code.contains("for (let i0 = 0; i0 < tries; i0++) {"));
        assert!(code.contains("await page.waitForTimeout(1500);"));
        assert!(code.contains("if (!(await page.locator('#banner').isVisible())) {"));
        assert!(code.contains("} else {"));
        assert!(code.contains("await page.waitForTimeout(200);"));
        assert!(
            code.contains("await page.waitForTimeout((79228162514264337593543950335) * 1000);")
        );
        assert!(code.contains("const frame1 = page.locator('#payment').contentFrame();"));
        assert!(code.contains("await frame1.locator('#pay').click();"));
        assert!(code.contains("await page.screenshot({ path: 'done.png' });"));
    }

    #[test]
    fn test_suite_hooks_open_a_page() {
        let code = code(r#"FEATURE F { BEFORE ALL { OPEN "/" } SCENARIO "s" { REFRESH } }"#);
        assert!(code.contains("test.beforeAll(async ({ browser }) => {\n    let page = await browser.newPage();\n    await page.goto('/');\n    await page.close();\n  });"));
    }

    #[test]
    fn test_unresolved_action_is_a_contract_violation() {
        let program = program(r#"FEATURE F { SCENARIO "s" { PERFORM Missing.go } }"#);
        let error = transpile(&program, &TranspileOptions::default()).unwrap_err();
        assert_eq!(
            error,
            ContractViolation::UnknownPage {
                page: "Missing".to_string(),
                line: 1
            }
        );
    }
}
