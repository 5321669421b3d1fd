use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::{
    ast::{
        ActionDefinition, ActionRef, Expression, Feature, Page, PageActions, Program, Statement,
        StatementKind, Target,
    },
    diagnostics::{self, Diagnostic},
};

/// Already-parsed declarations from sibling files of the same project.
///
/// Borrowed for the duration of one compile, so any number of compiles can
/// share the same context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectContext<'a> {
    pub pages: &'a [Page],
    pub page_actions: &'a [PageActions],
}

impl<'a> ProjectContext<'a> {
    pub fn new(pages: &'a [Page], page_actions: &'a [PageActions]) -> Self {
        ProjectContext {
            pages,
            page_actions,
        }
    }

    /// Last definition of a page, the same one the validator resolves to.
    pub fn page(&self, name: &str) -> Option<&'a Page> {
        self.pages.iter().rev().find(|p| p.name == name)
    }

    pub fn library(&self, name: &str) -> Option<&'a PageActions> {
        self.page_actions.iter().rev().find(|l| l.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

/// Checks a parsed program against itself and the project context.
///
/// Pass one registers every page and page-actions library (context first,
/// then this file) and checks declarations. Pass two walks features and the
/// bodies of actions defined in this file.
pub fn validate(program: &Program, context: Option<&ProjectContext<'_>>) -> ValidationResult {
    let mut validator = Validator::new();
    validator.collect_definitions(program, context);
    validator.validate_program(program);

    let (errors, warnings): (Vec<_>, Vec<_>) = validator
        .diagnostics
        .into_iter()
        .partition(Diagnostic::is_error);
    debug!(
        "validation finished with {} errors and {} warnings",
        errors.len(),
        warnings.len()
    );
    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Where a statement list lives, which decides the pages it may target.
struct Owner<'v> {
    name: &'v str,
    /// Pages reachable by qualified targets. `None` means every defined page.
    uses: Option<Vec<&'v str>>,
    /// Page owning an action body; always reachable.
    default_page: Option<&'v str>,
}

struct Validator<'a> {
    pages: BTreeMap<&'a str, &'a Page>,
    libraries: BTreeMap<&'a str, &'a PageActions>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Validator<'a> {
    fn new() -> Self {
        Validator {
            pages: BTreeMap::new(),
            libraries: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn page_names(&self) -> Vec<&'a str> {
        self.pages.keys().copied().collect()
    }

    // ========================================================================
    // Pass one: definitions
    // ========================================================================

    fn collect_definitions(&mut self, program: &'a Program, context: Option<&ProjectContext<'a>>) {
        if let Some(context) = context {
            for page in context.pages {
                self.pages.insert(&page.name, page);
            }
            for library in context.page_actions {
                self.libraries.insert(&library.name, library);
            }
        }

        for page in &program.pages {
            if let Some(previous) = self.pages.insert(&page.name, page) {
                self.report(diagnostics::duplicate_definition(
                    "Page",
                    &page.name,
                    page.line,
                    previous.line,
                ));
            }
            self.check_page_declaration(page);
        }

        for page in &program.pages {
            // A local library of the same name is reported against the page below
            if program.page_actions.iter().any(|l| l.name == page.name) {
                continue;
            }
            if let Some(first_line) = self.libraries.get(page.name.as_str()).map(|l| l.line) {
                self.report(diagnostics::duplicate_definition(
                    "Page",
                    &page.name,
                    page.line,
                    first_line,
                ));
            }
        }

        for library in &program.page_actions {
            if let Some(previous) = self.libraries.insert(&library.name, library) {
                self.report(diagnostics::duplicate_definition(
                    "Page actions",
                    &library.name,
                    library.line,
                    previous.line,
                ));
            }
            check_unique(
                library.actions.iter().map(|a| (a.name.as_str(), a.line)),
                "action",
                &library.name,
                &mut self.diagnostics,
            );
        }

        // Checked once every page is registered, so declaration order does not matter
        for library in &program.page_actions {
            // `PERFORM Name.action` cannot tell a page from a library of the same name
            if let Some(first_line) = self.pages.get(library.name.as_str()).map(|p| p.line) {
                self.report(diagnostics::duplicate_definition(
                    "Page actions",
                    &library.name,
                    library.line,
                    first_line,
                ));
            }
            if let Some(page) = &library.for_page {
                if !self.pages.contains_key(page.as_str()) {
                    let candidates = self.page_names();
                    self.report(diagnostics::unknown_actions_page(
                        &library.name,
                        page,
                        library.line,
                        &candidates,
                    ));
                }
            }
        }
    }

    fn check_page_declaration(&mut self, page: &Page) {
        if !is_pascal_case(&page.name) {
            self.report(diagnostics::page_naming(&page.name, page.line));
        }
        for field in &page.fields {
            if !is_camel_case(&field.name) {
                self.report(diagnostics::field_naming(&page.name, &field.name, field.line));
            }
        }

        check_unique(
            page.fields
                .iter()
                .map(|f| (f.name.as_str(), f.line))
                .chain(page.variables.iter().map(|v| (v.name.as_str(), v.line))),
            "field or variable",
            &page.name,
            &mut self.diagnostics,
        );
        check_unique(
            page.actions.iter().map(|a| (a.name.as_str(), a.line)),
            "action",
            &page.name,
            &mut self.diagnostics,
        );
    }

    // ========================================================================
    // Pass two: features and action bodies
    // ========================================================================

    fn validate_program(&mut self, program: &'a Program) {
        for page in &program.pages {
            let owner = Owner {
                name: &page.name,
                uses: None,
                default_page: Some(&page.name),
            };
            for action in &page.actions {
                self.validate_action(action, &owner);
            }
        }

        for library in &program.page_actions {
            let owner = Owner {
                name: &library.name,
                uses: None,
                default_page: library.for_page.as_deref(),
            };
            for action in &library.actions {
                self.validate_action(action, &owner);
            }
        }

        for feature in &program.features {
            self.validate_feature(feature);
        }
    }

    fn validate_action(&mut self, action: &'a ActionDefinition, owner: &Owner<'a>) {
        let mut scope: Vec<&str> = action.parameters.iter().map(String::as_str).collect();
        self.validate_statements(&action.statements, owner, &mut scope);
    }

    fn validate_feature(&mut self, feature: &'a Feature) {
        let mut candidates = self.page_names();
        candidates.extend(self.libraries.keys().copied());
        for use_ref in &feature.uses {
            let name = use_ref.name.as_str();
            if !self.pages.contains_key(name) && !self.libraries.contains_key(name) {
                self.report(diagnostics::unresolved_use(name, use_ref.line, &candidates));
            }
        }

        let owner = Owner {
            name: &feature.name,
            uses: Some(feature.uses.iter().map(|u| u.name.as_str()).collect()),
            default_page: None,
        };

        for hook in &feature.hooks {
            let mut scope = Vec::new();
            self.validate_statements(&hook.statements, &owner, &mut scope);
        }

        for scenario in &feature.scenarios {
            let mut scope = Vec::new();
            self.validate_statements(&scenario.statements, &owner, &mut scope);
        }
    }

    /// Walks a statement list. Scope only grows: a declaration or loop item is
    /// visible to every later statement of the body, inside or outside the
    /// block that introduced it.
    fn validate_statements(
        &mut self,
        statements: &'a [Statement],
        owner: &Owner<'a>,
        scope: &mut Vec<&'a str>,
    ) {
        for statement in statements {
            let line = statement.line;
            for target in statement.kind.targets() {
                self.check_target(target, owner, scope, line);
            }
            for expression in statement.kind.expressions() {
                self.check_expression(expression, scope, line);
            }

            match &statement.kind {
                StatementKind::VariableDeclaration { name, .. } => scope.push(name),
                StatementKind::DataQuery(query) => scope.push(&query.variable),
                StatementKind::Perform { action, arguments } => {
                    self.check_perform(action, arguments.len(), owner, line)
                }
                StatementKind::ForEach {
                    item,
                    collection,
                    body,
                } => {
                    if !scope.contains(&collection.as_str()) {
                        self.report(diagnostics::undefined_collection(collection, line));
                    }
                    scope.push(item);
                    self.validate_statements(body, owner, scope);
                }
                StatementKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.validate_statements(then_branch, owner, scope);
                    self.validate_statements(else_branch, owner, scope);
                }
                StatementKind::Repeat { body, .. } => {
                    self.validate_statements(body, owner, scope);
                }
                _ => {}
            }
        }
    }

    fn page_available(&self, owner: &Owner<'a>, page: &str) -> bool {
        if owner.default_page == Some(page) {
            return true;
        }
        match &owner.uses {
            Some(uses) => uses.contains(&page),
            None => self.pages.contains_key(page),
        }
    }

    fn available_pages(&self, owner: &Owner<'a>) -> Vec<&'a str> {
        let mut pages = match &owner.uses {
            Some(uses) => uses.clone(),
            None => self.page_names(),
        };
        pages.extend(owner.default_page);
        pages
    }

    /// `Page.field` must name a page the owner can reach. A qualifier that is
    /// a variable in scope (`row.name`) reads a column instead.
    fn check_target(&mut self, target: &Target, owner: &Owner<'a>, scope: &[&str], line: usize) {
        let (Some(page), Some(field)) = (target.page.as_deref(), target.field.as_deref()) else {
            return;
        };
        if scope.contains(&page) {
            return;
        }

        if !self.page_available(owner, page) {
            let available = self.available_pages(owner);
            self.report(diagnostics::page_not_in_uses(page, owner.name, line, &available));
            return;
        }

        // An available but undefined page was already reported at its USE line
        if let Some(definition) = self.pages.get(page).copied() {
            if definition.field(field).is_none() && definition.variable(field).is_none() {
                let candidates: Vec<&str> =
                    definition.fields.iter().map(|f| f.name.as_str()).collect();
                self.report(diagnostics::unknown_field(page, field, line, &candidates));
            }
        }
    }

    fn check_expression(&mut self, expression: &Expression, scope: &[&str], line: usize) {
        for (qualifier, name) in expression.variables() {
            match qualifier {
                Some(qualifier) if scope.contains(&qualifier) => {}
                Some(qualifier) => {
                    let known = self.pages.get(qualifier).is_some_and(|page| {
                        page.field(name).is_some() || page.variable(name).is_some()
                    });
                    if !known {
                        let candidates: Vec<&str> = self
                            .pages
                            .get(qualifier)
                            .map(|page| {
                                page.variables
                                    .iter()
                                    .map(|v| v.name.as_str())
                                    .chain(page.fields.iter().map(|f| f.name.as_str()))
                                    .collect()
                            })
                            .unwrap_or_default();
                        self.report(diagnostics::undefined_variable(
                            &format!("{}.{}", qualifier, name),
                            line,
                            &candidates,
                        ));
                    }
                }
                None if scope.contains(&name) => {}
                None => self.report(diagnostics::undefined_variable(name, line, scope)),
            }
        }
    }

    fn check_perform(
        &mut self,
        action: &ActionRef,
        arguments: usize,
        owner: &Owner<'a>,
        line: usize,
    ) {
        let page = action.page.as_str();

        let definition = if let Some(library) = self.libraries.get(page).copied() {
            library.action(&action.action).ok_or_else(|| {
                library.actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
            })
        } else if !self.page_available(owner, page) {
            let available = self.available_pages(owner);
            self.report(diagnostics::page_not_in_uses(page, owner.name, line, &available));
            return;
        } else if let Some(definition) = self.pages.get(page).copied() {
            definition.action(&action.action).ok_or_else(|| {
                definition.actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
            })
        } else {
            return;
        };

        match definition {
            Ok(definition) if definition.parameters.len() != arguments => {
                self.report(diagnostics::argument_count(
                    page,
                    &action.action,
                    definition.parameters.len(),
                    arguments,
                    line,
                ));
            }
            Ok(_) => {}
            Err(candidates) => {
                self.report(diagnostics::unknown_action(page, &action.action, line, &candidates));
            }
        }
    }
}

/// Reports every repeated name after its first occurrence.
fn check_unique<'n>(
    members: impl Iterator<Item = (&'n str, usize)>,
    kind: &str,
    owner: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut seen = HashSet::new();
    for (name, line) in members {
        if !seen.insert(name) {
            diagnostics.push(diagnostics::duplicate_member(kind, name, owner, line));
        }
    }
}

fn is_pascal_case(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase) && !name.contains(['_', '-'])
}

fn is_camel_case(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_lowercase) && !name.contains(['_', '-'])
}
