//! Lex, parse and validate a script without generating code

use crate::{
    diagnostics::Diagnostic,
    pipeline,
    validator::{ProjectContext, ValidationResult},
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The script to check
    pub source: String,
    /// Sibling scripts whose pages and libraries are in scope
    pub context: Vec<String>,
}

/// Execute a vero check operation
pub fn execute_check(options: &CheckOptions) -> ValidationResult {
    let context = pipeline::parse_context(options.context.iter().map(String::as_str));
    let context = ProjectContext::new(&context.pages, &context.page_actions);
    pipeline::check(&options.source, Some(&context))
}

/// Human-readable report: errors first, then warnings, one blank line apart.
pub fn render_diagnostics(errors: &[Diagnostic], warnings: &[Diagnostic]) -> String {
    errors
        .iter()
        .chain(warnings)
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_pages_are_in_scope() {
        let options = CheckOptions {
            source: "FEATURE Auth { USE Login SCENARIO \"s\" { CLICK Login.submit } }".to_string(),
            context: vec!["PAGE Login { FIELD submit = \"#go\" }".to_string()],
        };
        let result = execute_check(&options);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());

        let alone = execute_check(&CheckOptions {
            context: Vec::new(),
            ..options
        });
        assert_eq!(alone.errors[0].code, "VERO-200");
    }

    #[test]
    fn test_render_lists_errors_before_warnings() {
        let result = execute_check(&CheckOptions {
            source: "PAGE login { FIELD x = \"#x\" }\nFEATURE F { USE Nope SCENARIO \"s\" { REFRESH } }"
                .to_string(),
            context: Vec::new(),
        });
        let text = render_diagnostics(&result.errors, &result.warnings);
        let error = text.find("error[VERO-200]").unwrap();
        let warning = text.find("warning[VERO-300]").unwrap();
        assert!(error < warning);
    }
}
