//! # Vero DSL - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for Vero, a
//! plain-language DSL for authoring UI test scenarios.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[declarations]** - Pages, page-action libraries, features, scenarios
//! - **[statements]** - Actions, assertions, control flow, `PERFORM`
//! - **[expressions]** - Values, targets and `IF` conditions
//! - **[operators]** - Comparison/logical operators and element states
//! - **[query]** - VDQL data queries
//!
//! ## Quick Start
//!
//! ```text
//! PAGE Login ("/login") {
//!     FIELD email = "input[name=email]"
//!     FIELD submit = "Sign in"
//! }
//!
//! FEATURE Authentication {
//!     USE Login
//!
//!     SCENARIO "Valid credentials" @smoke {
//!         OPEN "/login"
//!         FILL Login.email WITH "user@example.com"
//!         CLICK Login.submit
//!         VERIFY URL CONTAINS "/dashboard"
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Targets
//!
//! Statements act on targets: `Page.field` (resolved through the page's
//! selector), a bare `field` (resolved through the feature's used pages) or a
//! raw selector string.
//!
//! ### Tabular data (VDQL)
//!
//! ```text
//! LOAD admins FROM Users WHERE role == "admin" ORDER BY name LIMIT 5
//! NUMBER total = COUNT Orders WHERE status == "open"
//! FOR EACH admin IN admins {
//!     FILL Login.email WITH admin.email
//! }
//! ```
//!
//! `WHERE` conditions combine strictly left to right, without precedence
//! between `AND` and `OR`.
//!
//! ### Immutability
//!
//! Nodes are never mutated after parsing. The validator and transpiler only
//! read them.
pub mod tokens;
pub mod declarations;
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod query;

pub use tokens::{Token, TokenKind};
pub use declarations::{
    ActionDefinition, Feature, Field, Hook, HookKind, Page, PageActions, Program, Scenario,
    UseRef, Variable,
};
pub use expressions::{Condition, Expression, Target};
pub use operators::{ComparisonOp, ElementState, LogicalOp};
pub use statements::{
    ActionRef, Assertion, ScrollDirection, Statement, StatementKind, UrlMatch, VariableKind,
    WaitUnit,
};
pub use query::{
    Aggregation, DataCondition, DataQuery, OrderBy, QueryMode, ResultType, TableRef, WhereClause,
};
