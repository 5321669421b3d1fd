//! Structured diagnostics shared by every stage.
//!
//! Lexer, parser and validator problems, and failures reported by the
//! execution layer that runs generated scripts, all use the same
//! [`Diagnostic`] shape so one reporting surface can render them. Each
//! concrete problem has a pure factory function here that fills in the
//! explanation and fix hints from contextual arguments.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Lexer,
    Parser,
    Validation,
    Locator,
    Timeout,
    Navigation,
    Assertion,
    Browser,
    Network,
}

impl ErrorCategory {
    /// Compile-time categories are authoring mistakes and never retried.
    pub fn is_compile_time(self) -> bool {
        matches!(
            self,
            ErrorCategory::Lexer | ErrorCategory::Parser | ErrorCategory::Validation
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Flakiness {
    Permanent,
    Flaky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// A follow-up the user can take. `action` is a machine-readable hint for
/// editors (`"replace:Login"`, `"add-use:Checkout"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Suggestion {
    pub fn text(text: impl Into<String>) -> Self {
        Suggestion {
            text: text.into(),
            action: None,
        }
    }

    pub fn with_action(text: impl Into<String>, action: impl Into<String>) -> Self {
        Suggestion {
            text: text.into(),
            action: Some(action.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub category: ErrorCategory,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub title: String,
    pub what_went_wrong: String,
    pub how_to_fix: String,
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flakiness: Option<Flakiness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_retries: Option<u32>,
}

impl Diagnostic {
    fn compile_time(
        code: &str,
        category: ErrorCategory,
        severity: Severity,
        location: Location,
        title: &str,
        what_went_wrong: String,
        how_to_fix: String,
    ) -> Self {
        Diagnostic {
            code: code.to_string(),
            category,
            severity,
            location: Some(location),
            title: title.to_string(),
            what_went_wrong,
            how_to_fix,
            suggestions: Vec::new(),
            flakiness: Some(Flakiness::Permanent),
            retryable: Some(false),
            suggested_retries: None,
        }
    }

    fn runtime(
        code: &str,
        category: ErrorCategory,
        title: &str,
        what_went_wrong: String,
        how_to_fix: String,
        flakiness: Flakiness,
        suggested_retries: u32,
    ) -> Self {
        let retryable = flakiness == Flakiness::Flaky;
        Diagnostic {
            code: code.to_string(),
            category,
            severity: Severity::Error,
            location: None,
            title: title.to_string(),
            what_went_wrong,
            how_to_fix,
            suggestions: Vec::new(),
            flakiness: Some(flakiness),
            retryable: Some(retryable),
            suggested_retries: retryable.then_some(suggested_retries),
        }
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    /// Attaches a source line to an execution-time diagnostic.
    pub fn at_line(mut self, line: usize) -> Self {
        self.location = Some(Location { line, column: None });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|l| l.line)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };
        write!(f, "{}[{}]", severity, self.code)?;
        match self.location {
            Some(Location {
                line,
                column: Some(column),
            }) => write!(f, " {}:{}", line, column)?,
            Some(Location { line, column: None }) => write!(f, " line {}", line)?,
            None => {}
        }
        write!(f, ": {}: {}", self.title, self.what_went_wrong)?;
        if !self.how_to_fix.is_empty() {
            write!(f, "\n  help: {}", self.how_to_fix)?;
        }
        for suggestion in &self.suggestions {
            write!(f, "\n  suggestion: {}", suggestion.text)?;
        }
        Ok(())
    }
}

fn at(line: usize, column: usize) -> Location {
    Location {
        line,
        column: Some(column),
    }
}

fn at_line(line: usize) -> Location {
    Location { line, column: None }
}

// ============================================================================
// Lexer
// ============================================================================

pub fn unterminated_string(line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-001",
        ErrorCategory::Lexer,
        Severity::Error,
        at(line, column),
        "Unterminated string",
        "A quoted text starts here but is never closed on the same line.".to_string(),
        "Add the matching closing quote before the end of the line.".to_string(),
    )
}

pub fn unterminated_env_var(line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-002",
        ErrorCategory::Lexer,
        Severity::Error,
        at(line, column),
        "Unterminated environment reference",
        "An environment reference opened with '{{' is never closed with '}}'.".to_string(),
        "Write environment references as {{NAME}} on a single line.".to_string(),
    )
}

pub fn invalid_number(text: &str, line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-003",
        ErrorCategory::Lexer,
        Severity::Error,
        at(line, column),
        "Invalid number",
        format!("'{}' is not a valid number.", text),
        "Numbers may have one leading '-' and at most one decimal point, like 42 or -3.5."
            .to_string(),
    )
}

pub fn unexpected_character(character: char, line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-004",
        ErrorCategory::Lexer,
        Severity::Error,
        at(line, column),
        "Unexpected character",
        format!("The character '{}' has no meaning in Vero.", character),
        "Remove it, or put it inside quotes if it is part of a text or selector.".to_string(),
    )
    .with_suggestion(Suggestion::with_action(
        format!("Remove '{}'", character),
        "delete-character",
    ))
}

// ============================================================================
// Parser
// ============================================================================

pub fn unexpected_token(expected: &str, found: &str, line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-010",
        ErrorCategory::Parser,
        Severity::Error,
        at(line, column),
        "Unexpected input",
        format!("Expected {} but found {}.", expected, found),
        format!("Check the statement near line {} for a typo or a missing word.", line),
    )
}

pub fn missing_closing_brace(block: &str, line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-011",
        ErrorCategory::Parser,
        Severity::Error,
        at(line, column),
        "Missing closing brace",
        format!("The {} block is not closed before the end of the file.", block),
        "Add a '}' to close the block.".to_string(),
    )
    .with_suggestion(Suggestion::with_action("Insert '}'", "insert:}"))
}

pub fn incomplete_statement(
    statement: &str,
    expected: &str,
    line: usize,
    column: usize,
) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-012",
        ErrorCategory::Parser,
        Severity::Error,
        at(line, column),
        "Incomplete statement",
        format!("The {} statement ends before {}.", statement, expected),
        format!("Complete the {} statement with {}.", statement, expected),
    )
}

pub fn unknown_statement(found: &str, line: usize, column: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-013",
        ErrorCategory::Parser,
        Severity::Error,
        at(line, column),
        "Unknown statement",
        format!("{} does not start a Vero statement.", found),
        "Statements start with an action such as CLICK, FILL, VERIFY, IF or LOAD.".to_string(),
    )
}

// ============================================================================
// Validation
// ============================================================================

pub fn duplicate_definition(kind: &str, name: &str, line: usize, first_line: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-100",
        ErrorCategory::Validation,
        Severity::Error,
        at_line(line),
        "Duplicate definition",
        format!(
            "{} '{}' is already defined (first definition at line {}).",
            kind, name, first_line
        ),
        format!("Rename one of the definitions or remove the duplicate {}.", kind),
    )
}

pub fn duplicate_member(kind: &str, name: &str, owner: &str, line: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-101",
        ErrorCategory::Validation,
        Severity::Error,
        at_line(line),
        "Duplicate member",
        format!("'{}' declares {} '{}' more than once.", owner, kind, name),
        format!("Give each {} in '{}' a distinct name.", kind, owner),
    )
}

pub fn unknown_actions_page(
    library: &str,
    page: &str,
    line: usize,
    candidates: &[&str],
) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-102",
            ErrorCategory::Validation,
            Severity::Error,
            at_line(line),
            "Unknown page",
            format!(
                "Page actions '{}' are declared FOR '{}', which is not defined.",
                library, page
            ),
            "Declare the page, or point the library at an existing page.".to_string(),
        ),
        page,
        candidates,
    )
}

pub fn unresolved_use(name: &str, line: usize, candidates: &[&str]) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-200",
            ErrorCategory::Validation,
            Severity::Error,
            at_line(line),
            "Unknown page",
            format!("USE {} refers to a page that is not defined in this project.", name),
            "Define the page or fix the name in the USE line.".to_string(),
        ),
        name,
        candidates,
    )
}

pub fn page_not_in_uses(page: &str, feature: &str, line: usize, uses: &[&str]) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-201",
            ErrorCategory::Validation,
            Severity::Error,
            at_line(line),
            "Page not available",
            format!("'{}' is not one of the pages feature '{}' uses.", page, feature),
            format!("Add 'USE {}' to the feature, or target a page it already uses.", page),
        )
        .with_suggestion(Suggestion::with_action(
            format!("Add USE {}", page),
            format!("add-use:{}", page),
        )),
        page,
        uses,
    )
}

pub fn unknown_action(page: &str, action: &str, line: usize, candidates: &[&str]) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-202",
            ErrorCategory::Validation,
            Severity::Error,
            at_line(line),
            "Unknown action",
            format!("'{}' has no action named '{}'.", page, action),
            format!("Define '{}' on '{}' or call one of its existing actions.", action, page),
        ),
        action,
        candidates,
    )
}

pub fn undefined_collection(name: &str, line: usize) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-203",
        ErrorCategory::Validation,
        Severity::Error,
        at_line(line),
        "Undefined collection",
        format!("FOR EACH loops over '{}', which has not been loaded in this scenario.", name),
        format!(
            "Load the data first, for example: LOAD {} FROM TableName",
            name
        ),
    )
}

pub fn undefined_variable(name: &str, line: usize, candidates: &[&str]) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-204",
            ErrorCategory::Validation,
            Severity::Warning,
            at_line(line),
            "Variable may not be defined",
            format!("'{}' is not defined before this line.", name),
            "Declare it earlier in the scenario, or make sure it is supplied when the test runs."
                .to_string(),
        ),
        name,
        candidates,
    )
}

pub fn unknown_field(page: &str, field: &str, line: usize, candidates: &[&str]) -> Diagnostic {
    with_closest(
        Diagnostic::compile_time(
            "VERO-205",
            ErrorCategory::Validation,
            Severity::Warning,
            at_line(line),
            "Field may not be defined",
            format!("Page '{}' does not declare a field named '{}'.", page, field),
            format!("Add 'FIELD {} = \"...\"' to page '{}'.", field, page),
        ),
        field,
        candidates,
    )
}

pub fn argument_count(
    page: &str,
    action: &str,
    expected: usize,
    found: usize,
    line: usize,
) -> Diagnostic {
    Diagnostic::compile_time(
        "VERO-206",
        ErrorCategory::Validation,
        Severity::Error,
        at_line(line),
        "Wrong number of arguments",
        format!(
            "{}.{} takes {} argument(s) but {} were given.",
            page, action, expected, found
        ),
        "Pass one value per parameter after WITH, separated by commas.".to_string(),
    )
}

pub fn page_naming(name: &str, line: usize) -> Diagnostic {
    let fixed = to_pascal_case(name);
    Diagnostic::compile_time(
        "VERO-300",
        ErrorCategory::Validation,
        Severity::Warning,
        at_line(line),
        "Page name style",
        format!("Page name '{}' is not PascalCase.", name),
        "Start page names with a capital letter and capitalise each word.".to_string(),
    )
    .with_suggestion(Suggestion::with_action(
        format!("Rename to {}", fixed),
        format!("replace:{}", fixed),
    ))
}

pub fn field_naming(page: &str, name: &str, line: usize) -> Diagnostic {
    let fixed = to_camel_case(name);
    Diagnostic::compile_time(
        "VERO-301",
        ErrorCategory::Validation,
        Severity::Warning,
        at_line(line),
        "Field name style",
        format!("Field '{}' on page '{}' is not camelCase.", name, page),
        "Start field names with a lowercase letter and capitalise each following word."
            .to_string(),
    )
    .with_suggestion(Suggestion::with_action(
        format!("Rename to {}", fixed),
        format!("replace:{}", fixed),
    ))
}

// ============================================================================
// Execution
// ============================================================================

pub fn locator_not_found(selector: &str, statement: &str) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-500",
        ErrorCategory::Locator,
        "Element not found",
        format!("'{}' could not find an element matching {}.", statement, selector),
        "Check the selector against the current page, or wait for the element before acting."
            .to_string(),
        Flakiness::Flaky,
        2,
    )
    .with_suggestion(Suggestion::text(format!(
        "Add 'WAIT FOR' before '{}'",
        statement
    )))
}

pub fn timeout(operation: &str, timeout_ms: u64) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-501",
        ErrorCategory::Timeout,
        "Timed out",
        format!("'{}' did not finish within {} ms.", operation, timeout_ms),
        "The page may be slow; add an explicit WAIT or check that the step can complete."
            .to_string(),
        Flakiness::Flaky,
        3,
    )
}

pub fn navigation_failed(url: &str, reason: &str) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-502",
        ErrorCategory::Navigation,
        "Navigation failed",
        format!("Opening {} failed: {}.", url, reason),
        "Check the URL and that the application is running.".to_string(),
        Flakiness::Flaky,
        2,
    )
}

pub fn assertion_failed(expected: &str, actual: &str, statement: &str) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-503",
        ErrorCategory::Assertion,
        "Check failed",
        format!(
            "'{}' expected {} but the page showed {}.",
            statement, expected, actual
        ),
        "Update the expected value if the application changed, otherwise report a bug."
            .to_string(),
        Flakiness::Permanent,
        0,
    )
}

pub fn browser_closed(reason: &str) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-504",
        ErrorCategory::Browser,
        "Browser closed",
        format!("The browser stopped unexpectedly: {}.", reason),
        "Re-run the test; if it keeps happening, check the machine's memory.".to_string(),
        Flakiness::Flaky,
        1,
    )
}

pub fn network_error(url: &str, reason: &str) -> Diagnostic {
    Diagnostic::runtime(
        "VERO-505",
        ErrorCategory::Network,
        "Network error",
        format!("A request to {} failed: {}.", url, reason),
        "Check connectivity and that the backend is reachable.".to_string(),
        Flakiness::Flaky,
        3,
    )
}

// ============================================================================
// Catalogue
// ============================================================================

/// One entry of the error-code catalogue, as shown by `vero explain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub title: &'static str,
    pub summary: &'static str,
}

const fn entry(
    code: &'static str,
    category: ErrorCategory,
    severity: Severity,
    title: &'static str,
    summary: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        code,
        category,
        severity,
        title,
        summary,
    }
}

pub const CATALOGUE: &[CatalogEntry] = &[
    entry(
        "VERO-001",
        ErrorCategory::Lexer,
        Severity::Error,
        "Unterminated string",
        "A string literal is not closed before the end of its line.",
    ),
    entry(
        "VERO-002",
        ErrorCategory::Lexer,
        Severity::Error,
        "Unterminated environment reference",
        "A {{NAME}} reference is missing its closing braces.",
    ),
    entry(
        "VERO-003",
        ErrorCategory::Lexer,
        Severity::Error,
        "Invalid number",
        "A number has more than one decimal point.",
    ),
    entry(
        "VERO-004",
        ErrorCategory::Lexer,
        Severity::Error,
        "Unexpected character",
        "A character outside of strings and comments is not part of the language.",
    ),
    entry(
        "VERO-010",
        ErrorCategory::Parser,
        Severity::Error,
        "Unexpected input",
        "The parser expected one kind of word or symbol and found another.",
    ),
    entry(
        "VERO-011",
        ErrorCategory::Parser,
        Severity::Error,
        "Missing closing brace",
        "A block opened with '{' is never closed.",
    ),
    entry(
        "VERO-012",
        ErrorCategory::Parser,
        Severity::Error,
        "Incomplete statement",
        "A statement is missing its target, value or keyword.",
    ),
    entry(
        "VERO-013",
        ErrorCategory::Parser,
        Severity::Error,
        "Unknown statement",
        "A line inside a scenario does not start with a statement keyword.",
    ),
    entry(
        "VERO-100",
        ErrorCategory::Validation,
        Severity::Error,
        "Duplicate definition",
        "Two definitions share a name, including a page and a library; the last one is used.",
    ),
    entry(
        "VERO-101",
        ErrorCategory::Validation,
        Severity::Error,
        "Duplicate member",
        "A page declares the same field, variable or action twice.",
    ),
    entry(
        "VERO-102",
        ErrorCategory::Validation,
        Severity::Error,
        "Unknown page",
        "A PAGEACTIONS library is bound to a page that does not exist.",
    ),
    entry(
        "VERO-200",
        ErrorCategory::Validation,
        Severity::Error,
        "Unknown page",
        "A USE line names a page that is not defined.",
    ),
    entry(
        "VERO-201",
        ErrorCategory::Validation,
        Severity::Error,
        "Page not available",
        "A statement targets a page the feature does not USE.",
    ),
    entry(
        "VERO-202",
        ErrorCategory::Validation,
        Severity::Error,
        "Unknown action",
        "PERFORM calls an action the page or library does not define.",
    ),
    entry(
        "VERO-203",
        ErrorCategory::Validation,
        Severity::Error,
        "Undefined collection",
        "FOR EACH loops over a variable that was never loaded.",
    ),
    entry(
        "VERO-204",
        ErrorCategory::Validation,
        Severity::Warning,
        "Variable may not be defined",
        "A variable is read before any declaration; it may be supplied at run time.",
    ),
    entry(
        "VERO-205",
        ErrorCategory::Validation,
        Severity::Warning,
        "Field may not be defined",
        "A target names a field its page does not declare.",
    ),
    entry(
        "VERO-206",
        ErrorCategory::Validation,
        Severity::Error,
        "Wrong number of arguments",
        "PERFORM passes a different number of values than the action declares.",
    ),
    entry(
        "VERO-300",
        ErrorCategory::Validation,
        Severity::Warning,
        "Page name style",
        "Page names should be PascalCase.",
    ),
    entry(
        "VERO-301",
        ErrorCategory::Validation,
        Severity::Warning,
        "Field name style",
        "Field names should be camelCase.",
    ),
    entry(
        "VERO-500",
        ErrorCategory::Locator,
        Severity::Error,
        "Element not found",
        "No element matched a selector while the test ran.",
    ),
    entry(
        "VERO-501",
        ErrorCategory::Timeout,
        Severity::Error,
        "Timed out",
        "A step did not complete within its timeout.",
    ),
    entry(
        "VERO-502",
        ErrorCategory::Navigation,
        Severity::Error,
        "Navigation failed",
        "The browser could not open a URL.",
    ),
    entry(
        "VERO-503",
        ErrorCategory::Assertion,
        Severity::Error,
        "Check failed",
        "A VERIFY step saw a different value than expected.",
    ),
    entry(
        "VERO-504",
        ErrorCategory::Browser,
        Severity::Error,
        "Browser closed",
        "The browser process exited during the run.",
    ),
    entry(
        "VERO-505",
        ErrorCategory::Network,
        Severity::Error,
        "Network error",
        "A network request made by the page failed.",
    ),
];

/// Looks up a code in the catalogue. Accepts `VERO-201`, `vero-201` or `201`.
pub fn explain(code: &str) -> Option<&'static CatalogEntry> {
    let code = code.trim().to_ascii_uppercase();
    let code = if code.starts_with("VERO-") {
        code
    } else {
        format!("VERO-{}", code)
    };
    CATALOGUE.iter().find(|entry| entry.code == code)
}

// ============================================================================
// Helpers
// ============================================================================

fn with_closest(diagnostic: Diagnostic, name: &str, candidates: &[&str]) -> Diagnostic {
    match closest_match(name, candidates) {
        Some(best) => diagnostic.with_suggestion(Suggestion::with_action(
            format!("Did you mean '{}'?", best),
            format!("replace:{}", best),
        )),
        None => diagnostic,
    }
}

/// The candidate with the smallest edit distance, if it is close enough to
/// be a plausible typo.
pub fn closest_match<'a>(name: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let limit = ((name.chars().count() + 2) / 3).max(1);
    candidates
        .iter()
        .filter(|c| **c != name)
        .map(|c| (edit_distance(&name.to_lowercase(), &c.to_lowercase()), *c))
        .filter(|(distance, _)| *distance <= limit)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, c)| c)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            current.push((previous[j] + cost).min(previous[j + 1] + 1).min(current[j] + 1));
        }
        previous = current;
    }
    previous[b.len()]
}

fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn to_pascal_case(name: &str) -> String {
    split_words(name).iter().map(|w| capitalize(w)).collect()
}

pub fn to_camel_case(name: &str) -> String {
    let pascal = to_pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_time_diagnostics_are_permanent() {
        let d = unterminated_string(3, 7);
        assert_eq!(d.flakiness, Some(Flakiness::Permanent));
        assert_eq!(d.retryable, Some(false));
        assert!(d.category.is_compile_time());
    }

    #[test]
    fn flaky_runtime_diagnostics_suggest_retries() {
        let d = timeout("CLICK Login.submit", 5000);
        assert_eq!(d.retryable, Some(true));
        assert_eq!(d.suggested_retries, Some(3));
        let d = assertion_failed("\"Welcome\"", "\"Error\"", "VERIFY Home.banner HAS TEXT");
        assert_eq!(d.retryable, Some(false));
        assert_eq!(d.suggested_retries, None);
    }

    #[test]
    fn closest_match_finds_typos() {
        assert_eq!(closest_match("Loign", &["Login", "Checkout"]), Some("Login"));
        assert_eq!(closest_match("Zebra", &["Login", "Checkout"]), None);
    }

    #[test]
    fn case_conversions() {
        assert_eq!(to_pascal_case("login_page"), "LoginPage");
        assert_eq!(to_camel_case("Submit_Button"), "submitButton");
    }

    #[test]
    fn explain_accepts_short_codes() {
        assert_eq!(explain("201").map(|e| e.code), Some("VERO-201"));
        assert!(explain("VERO-999").is_none());
    }
}
