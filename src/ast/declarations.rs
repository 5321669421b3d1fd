use serde::Serialize;

use crate::ast::{Expression, Statement, VariableKind};

/// A parsed compile unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub pages: Vec<Page>,
    pub page_actions: Vec<PageActions>,
    pub features: Vec<Feature>,
}

/// Selector aliases, variables and reusable actions for one screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub name: String,
    /// Optional URL the page lives at: `PAGE Login ("/login") { ... }`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub fields: Vec<Field>,
    pub variables: Vec<Variable>,
    pub actions: Vec<ActionDefinition>,
    pub line: usize,
}

impl Page {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().rev().find(|f| f.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.iter().rev().find(|a| a.name == name)
    }
}

/// `FIELD submit = "button[type=submit]"`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub selector: Expression,
    pub line: usize,
}

/// `TEXT greeting = "Hello"` declared on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub kind: VariableKind,
    pub name: String,
    pub value: Expression,
    pub line: usize,
}

/// A reusable step sequence: `signIn WITH email, password { ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    pub statements: Vec<Statement>,
    pub line: usize,
}

/// A library of actions not tied to one page's fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageActions {
    pub name: String,
    /// Page whose fields unqualified targets resolve against:
    /// `PAGEACTIONS LoginFlows FOR Login { ... }`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_page: Option<String>,
    pub actions: Vec<ActionDefinition>,
    pub line: usize,
}

impl PageActions {
    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.iter().rev().find(|a| a.name == name)
    }
}

/// `USE Login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UseRef {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    BeforeAll,
    BeforeEach,
    AfterAll,
    AfterEach,
}

/// `BEFORE EACH { ... }` inside a feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hook {
    pub kind: HookKind,
    pub statements: Vec<Statement>,
    pub line: usize,
}

/// A named test suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub name: String,
    pub tags: Vec<String>,
    pub uses: Vec<UseRef>,
    pub hooks: Vec<Hook>,
    pub scenarios: Vec<Scenario>,
    pub line: usize,
}

/// A named test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub statements: Vec<Statement>,
    pub line: usize,
}
