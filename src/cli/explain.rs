//! Error-code documentation for `vero explain`

use super::CliError;
use crate::diagnostics::{self, CATALOGUE, ErrorCategory};

/// Every code, grouped by category.
pub fn explain_overview() -> String {
    let mut out = String::from("VERO ERROR CODES\n");
    let mut category = None;
    for entry in CATALOGUE {
        if category != Some(entry.category) {
            category = Some(entry.category);
            out.push('\n');
            out.push_str(heading(entry.category));
            out.push('\n');
        }
        out.push_str(&format!("  {}  {}\n", entry.code, entry.title));
    }
    out.push_str("\nRun 'vero explain <code>' for details.\n");
    out
}

/// Details for one code. Accepts `VERO-201`, `vero-201` or `201`.
pub fn explain_code(code: &str) -> Result<String, CliError> {
    let entry = diagnostics::explain(code).ok_or_else(|| CliError::UnknownCode(code.to_string()))?;
    let when = if entry.category.is_compile_time() {
        "Reported while compiling; fix the script and compile again."
    } else {
        "Reported while a generated test runs."
    };
    Ok(format!(
        "{} {}\n\n{}\n\n{}\n",
        entry.code, entry.title, entry.summary, when
    ))
}

fn heading(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Lexer => "LEXER",
        ErrorCategory::Parser => "PARSER",
        ErrorCategory::Validation => "VALIDATION",
        ErrorCategory::Locator => "LOCATOR",
        ErrorCategory::Timeout => "TIMEOUT",
        ErrorCategory::Navigation => "NAVIGATION",
        ErrorCategory::Assertion => "ASSERTION",
        ErrorCategory::Browser => "BROWSER",
        ErrorCategory::Network => "NETWORK",
    }
}

#[test]
fn test_explain_accepts_short_codes() {
    let text = explain_code("201").unwrap();
    assert!(text.starts_with("VERO-201 Page not available"));
    assert!(matches!(explain_code("VERO-999"), Err(CliError::UnknownCode(_))));
    assert!(explain_overview().contains("\nVALIDATION\n  VERO-100  Duplicate definition\n"));
}
