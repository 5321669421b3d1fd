use serde::Serialize;

use crate::ast::{Condition, DataQuery, ElementState, Expression, Target};

/// A scenario, hook or action-body statement with its source line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StatementKind,
    pub line: usize,
}

impl Statement {
    pub fn new(kind: StatementKind, line: usize) -> Self {
        Statement { kind, line }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitUnit {
    Seconds,
    Milliseconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableKind {
    Text,
    Number,
    Flag,
    List,
}

/// `Page.action` as named by a `PERFORM` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRef {
    pub page: String,
    pub action: String,
}

/// How `VERIFY URL` compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlMatch {
    Is,
    Contains,
    Matches,
}

/// Assertion carried by a `VERIFY` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "assertion", rename_all = "camelCase")]
pub enum Assertion {
    /// `VERIFY Login.error IS NOT VISIBLE`
    State {
        target: Target,
        negated: bool,
        state: ElementState,
    },
    /// `VERIFY Home.banner HAS TEXT "Welcome"` / `CONTAINS TEXT "Wel"`
    Text {
        target: Target,
        negated: bool,
        contains: bool,
        expected: Expression,
    },
    /// `VERIFY Login.email HAS VALUE "a@b.c"`
    Value {
        target: Target,
        negated: bool,
        expected: Expression,
    },
    /// `VERIFY Login.submit HAS ATTRIBUTE "type" = "submit"`
    Attribute {
        target: Target,
        name: Expression,
        expected: Expression,
    },
    /// `VERIFY Cart.items HAS COUNT 3`
    Count { target: Target, expected: Expression },
    /// `VERIFY URL CONTAINS "/dashboard"`
    Url { matcher: UrlMatch, expected: Expression },
    /// `VERIFY TITLE IS "Home"`
    Title { contains: bool, expected: Expression },
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatementKind {
    // Actions
    /// `OPEN "/login"` or `NAVIGATE TO "/login"`
    Open { url: Expression },
    Click { target: Target },
    /// `FILL Login.email WITH "user@example.com"`
    Fill { target: Target, value: Expression },
    Hover { target: Target },
    Check { target: Target },
    Uncheck { target: Target },
    /// `SELECT "Canada" FROM Signup.country`
    Select { option: Expression, target: Target },
    /// `SCROLL DOWN` / `SCROLL TO Footer.links`
    Scroll {
        #[serde(skip_serializing_if = "Option::is_none")]
        direction: Option<ScrollDirection>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<Target>,
    },
    /// `PRESS "Enter"`
    Press { key: Expression },
    /// `DRAG Board.card TO Board.done`
    Drag { source: Target, destination: Target },
    /// `UPLOAD "fixtures/a.pdf" TO Profile.avatar`
    Upload { file: Expression, target: Target },
    /// `WAIT 2 SECONDS`
    Wait { amount: Expression, unit: WaitUnit },
    /// `WAIT FOR Dashboard.header`
    WaitFor { target: Target },
    Refresh,
    Clear { target: Target },
    /// `TAKE SCREENSHOT AS "checkout"`
    Screenshot {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<Expression>,
    },
    Log { message: Expression },

    // Tabs, frames, dialogs, storage
    /// `SWITCH TO TAB 2`
    SwitchToTab { index: Expression },
    /// `SWITCH TO NEW TAB "https://..."`
    SwitchToNewTab {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<Expression>,
    },
    CloseTab,
    /// `SWITCH TO FRAME "#payment"`
    SwitchToFrame { target: Target },
    SwitchToMainFrame,
    /// `ACCEPT DIALOG WITH "yes"`
    AcceptDialog {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt: Option<Expression>,
    },
    DismissDialog,
    ClearCookies,
    ClearStorage,

    /// `VERIFY ...`
    Verify(Assertion),

    // Control flow
    If {
        condition: Condition,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    /// `REPEAT 3 TIMES { ... }`
    Repeat {
        times: Expression,
        body: Vec<Statement>,
    },
    /// `FOR EACH row IN rows { ... }`
    ForEach {
        item: String,
        collection: String,
        body: Vec<Statement>,
    },

    /// `TEXT greeting = "Hello"`
    VariableDeclaration {
        kind: VariableKind,
        name: String,
        value: Expression,
    },

    /// `PERFORM Login.signIn WITH "a@b.c", "secret"`
    Perform {
        action: ActionRef,
        arguments: Vec<Expression>,
    },

    /// VDQL: `LOAD users FROM Users WHERE ...`
    DataQuery(DataQuery),
}

impl StatementKind {
    /// Every target this statement acts on, in source order.
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            StatementKind::Click { target }
            | StatementKind::Fill { target, .. }
            | StatementKind::Hover { target }
            | StatementKind::Check { target }
            | StatementKind::Uncheck { target }
            | StatementKind::Select { target, .. }
            | StatementKind::Upload { target, .. }
            | StatementKind::WaitFor { target }
            | StatementKind::Clear { target }
            | StatementKind::SwitchToFrame { target } => vec![target],
            StatementKind::Scroll { target, .. } => target.iter().collect(),
            StatementKind::Drag {
                source,
                destination,
            } => vec![source, destination],
            StatementKind::Verify(assertion) => match assertion {
                Assertion::State { target, .. }
                | Assertion::Text { target, .. }
                | Assertion::Value { target, .. }
                | Assertion::Attribute { target, .. }
                | Assertion::Count { target, .. } => vec![target],
                Assertion::Url { .. } | Assertion::Title { .. } => vec![],
            },
            StatementKind::If {
                condition: Condition::ElementState { target, .. },
                ..
            } => vec![target],
            _ => vec![],
        }
    }

    /// Every value expression read directly by this statement (nested
    /// bodies excluded), in source order.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            StatementKind::Open { url } => vec![url],
            StatementKind::Fill { value, .. } => vec![value],
            StatementKind::Select { option, .. } => vec![option],
            StatementKind::Press { key } => vec![key],
            StatementKind::Upload { file, .. } => vec![file],
            StatementKind::Wait { amount, .. } => vec![amount],
            StatementKind::Screenshot { name } => name.iter().collect(),
            StatementKind::Log { message } => vec![message],
            StatementKind::SwitchToTab { index } => vec![index],
            StatementKind::SwitchToNewTab { url } => url.iter().collect(),
            StatementKind::AcceptDialog { prompt } => prompt.iter().collect(),
            StatementKind::Verify(assertion) => match assertion {
                Assertion::State { .. } => vec![],
                Assertion::Text { expected, .. }
                | Assertion::Value { expected, .. }
                | Assertion::Count { expected, .. }
                | Assertion::Url { expected, .. }
                | Assertion::Title { expected, .. } => vec![expected],
                Assertion::Attribute { name, expected, .. } => vec![name, expected],
            },
            StatementKind::If { condition, .. } => match condition {
                Condition::ElementState { .. } => vec![],
                Condition::Comparison { left, right, .. } => vec![left, right],
                Condition::Truthy { value } => vec![value],
            },
            StatementKind::Repeat { times, .. } => vec![times],
            StatementKind::VariableDeclaration { value, .. } => vec![value],
            StatementKind::Perform { arguments, .. } => arguments.iter().collect(),
            StatementKind::DataQuery(query) => query
                .where_clause
                .iter()
                .flat_map(|clause| clause.conditions())
                .filter_map(|condition| condition.value.as_ref())
                .collect(),
            _ => vec![],
        }
    }
}
