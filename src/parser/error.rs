use crate::lexer::{LexicalError, Span, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyntaxErrorKind {
    #[error("Expected {expected} but got {actual}.")]
    UnexpectedToken {
        actual: TokenKind,
        expected: &'static str,
    },
    #[error("Unexpected end of input, expected {expected}.")]
    UnexpectedEof { expected: &'static str },
    #[error("Expected a function name but got {0}.")]
    MissingFunctionName(TokenKind),
    #[error("Blocks are nested deeper than {0} levels.")]
    TooDeep(usize),
    #[error("{0}.")]
    LexicalError(#[from] LexicalError),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct SyntaxError {
    #[source]
    pub kind: SyntaxErrorKind,
    pub span: Span,
}

impl SyntaxError {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            SyntaxErrorKind::UnexpectedToken { .. } => "GR001",
            SyntaxErrorKind::UnexpectedEof { .. } => "GR002",
            SyntaxErrorKind::MissingFunctionName(_) => "GR003",
            SyntaxErrorKind::TooDeep(_) => "GR004",
            SyntaxErrorKind::LexicalError(_) => "GR005",
        }
    }
}

impl From<LexicalError> for SyntaxError {
    fn from(value: LexicalError) -> Self {
        Self {
            span: value.span,
            kind: SyntaxErrorKind::LexicalError(value),
        }
    }
}
