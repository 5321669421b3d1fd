//! Source text to Playwright script in one call.
//!
//! Lexer or parser errors stop the pipeline before validation. Validation
//! errors stop it before transpilation. Warnings never stop it and are
//! returned with either outcome.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    ast::Program,
    diagnostics::Diagnostic,
    parser,
    transpiler::{self, ContractViolation, GeneratedCase, TranspileOptions},
    validator::{self, ProjectContext, ValidationResult},
};

/// A successful compile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub code: String,
    pub total_scenarios: usize,
    pub selected_scenarios: usize,
    pub cases: Vec<GeneratedCase>,
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Success(CompileResult),
    Failure {
        errors: Vec<Diagnostic>,
        warnings: Vec<Diagnostic>,
    },
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success(_))
    }
}

/// JSON envelope: `{ "success": true, "result": ... }` or
/// `{ "success": false, "errors": [...], "warnings": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CompileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Diagnostic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Diagnostic>>,
}

impl From<CompileOutcome> for CompileResponse {
    fn from(outcome: CompileOutcome) -> Self {
        match outcome {
            CompileOutcome::Success(result) => CompileResponse {
                success: true,
                result: Some(result),
                errors: None,
                warnings: None,
            },
            CompileOutcome::Failure { errors, warnings } => CompileResponse {
                success: false,
                result: None,
                errors: Some(errors),
                warnings: Some(warnings),
            },
        }
    }
}

/// Runs every stage over `source`.
///
/// Returns `Err` only when the transpiler meets something validation should
/// have rejected; user mistakes are always an `Ok(CompileOutcome::Failure)`.
pub fn compile(
    source: &str,
    options: &TranspileOptions<'_>,
) -> Result<CompileOutcome, ContractViolation> {
    let (program, report) = analyze(source, options.context.as_ref());
    let Some(program) = program.filter(|_| report.valid) else {
        return Ok(CompileOutcome::Failure {
            errors: report.errors,
            warnings: report.warnings,
        });
    };

    let output = transpiler::transpile(&program, options)?;
    Ok(CompileOutcome::Success(CompileResult {
        code: output.code,
        total_scenarios: output.total_scenarios,
        selected_scenarios: output.selected_scenarios,
        cases: output.cases,
        warnings: report.warnings,
    }))
}

/// Lexes, parses and validates without generating code.
pub fn check(source: &str, context: Option<&ProjectContext<'_>>) -> ValidationResult {
    analyze(source, context).1
}

fn analyze(
    source: &str,
    context: Option<&ProjectContext<'_>>,
) -> (Option<Program>, ValidationResult) {
    let parsed = match parser::parse_source(source) {
        Ok(parsed) => parsed,
        Err(errors) => {
            debug!("stopping after {} lexer errors", errors.len());
            return (None, failed(errors.iter().map(|e| e.to_diagnostic()).collect()));
        }
    };

    if !parsed.errors.is_empty() {
        debug!("stopping after {} parse errors", parsed.errors.len());
        return (
            None,
            failed(parsed.errors.iter().map(|e| e.to_diagnostic()).collect()),
        );
    }

    let report = validator::validate(&parsed.program, context);
    (Some(parsed.program), report)
}

fn failed(errors: Vec<Diagnostic>) -> ValidationResult {
    ValidationResult {
        valid: false,
        errors,
        warnings: Vec::new(),
    }
}

/// Collects the pages and page-actions libraries of sibling files.
///
/// Files that do not lex or parse cleanly still contribute the declarations
/// that were recovered.
pub fn parse_context<'s>(sources: impl IntoIterator<Item = &'s str>) -> Program {
    let mut context = Program::default();
    for (index, source) in sources.into_iter().enumerate() {
        let lexed = crate::lexer::tokenize(source);
        let parsed = parser::parse(lexed.tokens);
        if !lexed.errors.is_empty() || !parsed.errors.is_empty() {
            warn!(
                "context file #{} has {} lexer and {} parse errors",
                index + 1,
                lexed.errors.len(),
                parsed.errors.len()
            );
        }
        context.pages.extend(parsed.program.pages);
        context.page_actions.extend(parsed.program.page_actions);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_errors_short_circuit() {
        let outcome = compile("FEATURE F { SCENARIO \"s\" { OPEN \"/x } }", &Default::default())
            .unwrap();
        let CompileOutcome::Failure { errors, warnings } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "VERO-001");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_response_envelope() {
        let outcome = compile("FEATURE F { SCENARIO \"s\" { REFRESH } }", &Default::default())
            .unwrap();
        let json = serde_json::to_value(CompileResponse::from(outcome)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["result"]["totalScenarios"], 1);
        assert_eq!(json["result"]["cases"][0]["testName"], "s");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_context_from_sibling_sources() {
        let context = parse_context([
            "PAGE Login { FIELD email = \"#email\" }",
            "PAGEACTIONS Flows FOR Login { go { CLICK email } }\nFEATURE F { }",
        ]);
        assert_eq!(context.pages.len(), 1);
        assert_eq!(context.page_actions[0].name, "Flows");
        assert!(context.features.is_empty());
    }
}
