pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod selection;
pub mod transpiler;
pub mod validator;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Program, Statement, Token, TokenKind};
pub use diagnostics::Diagnostic;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use pipeline::{compile, CompileOutcome, CompileResponse};
pub use selection::{ScenarioSelection, TagMode};
pub use transpiler::{transpile, ContractViolation, TranspileOptions, TranspileOutput};
pub use validator::{validate, ProjectContext, ValidationResult};
pub use value::{ParamCombination, ParamValue};
