//! Compile a script to a Playwright test file

use super::{json_to_combinations, CliError};
use crate::{
    pipeline::{self, CompileOutcome},
    selection::{ScenarioSelection, TagMode},
    transpiler::TranspileOptions,
    validator::ProjectContext,
};

/// Options for the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub source: String,
    /// Sibling scripts whose pages and libraries are in scope
    pub context: Vec<String>,
    /// Only the scenario with exactly this name
    pub scenario: Option<String>,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub tag_mode: Option<String>,
    /// Name filters; `/.../` is a regular expression
    pub grep: Vec<String>,
    /// Contents of a JSON parameter-combination file
    pub params: Option<String>,
}

impl CompileOptions {
    /// `None` when no selection flag was given.
    fn selection(&self) -> Result<Option<ScenarioSelection>, CliError> {
        let mut selection = ScenarioSelection::new();
        if let Some(name) = &self.scenario {
            selection = selection.with_scenario(name.as_str());
        }
        for tag in &self.tags {
            selection = selection.with_tag(tag);
        }
        for tag in &self.exclude_tags {
            selection = selection.without_tag(tag);
        }
        if let Some(mode) = &self.tag_mode {
            selection = selection.tag_mode(mode.parse::<TagMode>()?);
        }
        for pattern in &self.grep {
            selection = selection.with_pattern(pattern)?;
        }
        Ok((!selection.is_empty()).then_some(selection))
    }
}

/// Execute a vero compile operation
pub fn execute_compile(options: &CompileOptions) -> Result<CompileOutcome, CliError> {
    let context = pipeline::parse_context(options.context.iter().map(String::as_str));
    let transpile_options = TranspileOptions {
        selection: options.selection()?,
        combinations: match &options.params {
            Some(json) => json_to_combinations(json)?,
            None => Vec::new(),
        },
        context: Some(ProjectContext::new(&context.pages, &context.page_actions)),
    };
    Ok(pipeline::compile(&options.source, &transpile_options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
FEATURE Checkout @shop {
    SCENARIO "Guest pays" @smoke { REFRESH }
    SCENARIO "Member pays" { REFRESH }
    SCENARIO "Guest cancels" @wip { REFRESH }
}
"#;

    fn compile(options: CompileOptions) -> pipeline::CompileResult {
        match execute_compile(&options).unwrap() {
            CompileOutcome::Success(result) => result,
            CompileOutcome::Failure { errors, .. } => panic!("{:?}", errors),
        }
    }

    #[test]
    fn test_flags_build_a_selection() {
        let result = compile(CompileOptions {
            source: SOURCE.to_string(),
            grep: vec!["guest".to_string()],
            exclude_tags: vec!["wip".to_string()],
            ..Default::default()
        });
        assert_eq!(result.total_scenarios, 3);
        assert_eq!(result.selected_scenarios, 1);
        assert_eq!(result.cases[0].scenario, "Guest pays");
    }

    #[test]
    fn test_params_expand_scenarios() {
        let result = compile(CompileOptions {
            source: SOURCE.to_string(),
            scenario: Some("Member pays".to_string()),
            params: Some(r#"[{ "plan": "gold" }, { "plan": "silver" }]"#.to_string()),
            ..Default::default()
        });
        assert_eq!(result.cases.len(), 2);
        assert_eq!(result.cases[1].test_name, "Member pays [plan=silver]");
    }

    #[test]
    fn test_bad_flags_are_errors() {
        let error = execute_compile(&CompileOptions {
            source: SOURCE.to_string(),
            tag_mode: Some("some".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(error, CliError::Selection(_)));
    }
}
