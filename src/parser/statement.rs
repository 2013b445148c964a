use crate::lexer::Span;
use crate::value::Value;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A statement sequence shared between the program tree and the function
/// values created from it.
pub type Block = Arc<[Statement]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Statement {
    Literal {
        value: Value,
        span: Span,
    },
    Load {
        name: CompactString,
        span: Span,
    },
    Store {
        name: CompactString,
        span: Span,
    },
    Command {
        name: CompactString,
        span: Span,
    },
    If(IfStatement),
    While(WhileStatement),
    Function(FunctionDecl),
    Call {
        name: Option<CompactString>,
        span: Span,
    },
}

impl Statement {
    /// Location of the statement, if it can fail on its own.
    pub fn span(&self) -> Option<Span> {
        match self {
            Statement::Literal { span, .. }
            | Statement::Load { span, .. }
            | Statement::Store { span, .. }
            | Statement::Command { span, .. }
            | Statement::Call { span, .. } => Some(*span),
            Statement::If(_) | Statement::While(_) | Statement::Function(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBranch {
    pub condition: Block,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub branches: Vec<ConditionalBranch>,
    pub otherwise: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Block,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Option<CompactString>,
    pub body: Block,
}
