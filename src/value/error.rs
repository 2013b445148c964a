use super::ValueKind;
use crate::lexer::Span;
use compact_str::CompactString;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecErrorKind {
    #[error("Unknown command: {0}")]
    UnknownCommand(CompactString),
    #[error("Undefined variable: {0}")]
    UndefinedVariable(CompactString),
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Type mismatch: expected {expected} but got {actual}")]
    TypeMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("Execution cancelled")]
    Cancelled,
    #[error("Nesting depth limit of {0} exceeded")]
    RecursionLimit(usize),
}

/// A runtime failure. `span` points at the statement that failed, when that
/// statement has a location of its own.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub span: Option<Span>,
}

impl ExecError {
    pub fn at(kind: ExecErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            ExecErrorKind::UnknownCommand(_) => "RT001",
            ExecErrorKind::UndefinedVariable(_) => "RT002",
            ExecErrorKind::StackUnderflow => "RT003",
            ExecErrorKind::TypeMismatch { .. } => "RT004",
            ExecErrorKind::Cancelled => "RT005",
            ExecErrorKind::RecursionLimit(_) => "RT006",
        }
    }
}

impl From<ExecErrorKind> for ExecError {
    fn from(kind: ExecErrorKind) -> Self {
        Self { kind, span: None }
    }
}
