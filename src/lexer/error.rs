use super::span::Span;
use compact_str::CompactString;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexicalErrorKind {
    #[error("Unterminated string literal")]
    UnclosedString,
    #[error("Invalid escape sequence \\{0}")]
    InvalidEscape(char),
    #[error("Invalid numeric literal {0}")]
    InvalidNumber(CompactString),
    #[error("Invalid name {0}")]
    InvalidName(CompactString),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct LexicalError {
    #[source]
    pub kind: LexicalErrorKind,
    pub span: Span,
}
