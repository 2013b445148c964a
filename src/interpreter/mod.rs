mod builtins;
pub mod cancel;
pub mod command;
pub mod formatter;
pub mod output;
pub mod persist;

use crate::{
    lexer::Span,
    parser::{
        self,
        statement::{IfStatement, Statement, WhileStatement},
        SyntaxError,
    },
    value::{
        error::{ExecError, ExecErrorKind},
        Function, Value,
    },
};
use cancel::CancelToken;
use command::CommandRegistry;
use compact_str::CompactString;
use output::Output;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Failure of a whole submission.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Parses `source` and, only if it parses, runs it against `context`.
pub fn submit(
    source: &str,
    context: &mut Context,
    output: &mut dyn Output,
) -> Result<(), EngineError> {
    let statements = parser::parse(source)?;
    debug!(statements = statements.len(), "executing submission");
    context.exec(&statements, output)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of function calls, `if` and `while` statements that may
    /// be running inside one another at once.
    pub max_depth: usize,
}

impl Limits {
    /// Fits an 8 MiB thread stack in unoptimised builds.
    pub const DEFAULT_MAX_DEPTH: usize = 512;
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// The execution environment of one terminal session: a value stack, a
/// single flat variable map and the commands the host made available.
#[derive(Debug)]
pub struct Context {
    stack: Vec<Value>,
    variables: HashMap<CompactString, Value>,
    commands: Arc<CommandRegistry>,
    cancel: CancelToken,
    limits: Limits,
    depth: usize,
    /// Number of statement sequences handed to [`Context::exec`] so far.
    sources: u64,
    /// The source whose spans the running statements point into.
    origin: u64,
}

impl Context {
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        Self {
            stack: Vec::new(),
            variables: HashMap::new(),
            commands,
            cancel: CancelToken::new(),
            limits: Limits::default(),
            depth: 0,
            sources: 0,
            origin: 0,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// A handle the host can use to stop this context from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }
}

// Stack and variable access
impl Context {
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn variables(&self) -> &HashMap<CompactString, Value> {
        &self.variables
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, ExecErrorKind> {
        self.stack.pop().ok_or(ExecErrorKind::StackUnderflow)
    }

    pub fn peek(&self) -> Result<&Value, ExecErrorKind> {
        self.stack.last().ok_or(ExecErrorKind::StackUnderflow)
    }

    /// The top `count` values, deepest first.
    pub fn top(&self, count: usize) -> Result<&[Value], ExecErrorKind> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(ExecErrorKind::StackUnderflow)?;
        Ok(&self.stack[start..])
    }

    pub fn top_mut(&mut self, count: usize) -> Result<&mut [Value], ExecErrorKind> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(ExecErrorKind::StackUnderflow)?;
        Ok(&mut self.stack[start..])
    }

    /// Drops up to `count` values from the top of the stack.
    pub fn discard(&mut self, count: usize) {
        let len = self.stack.len().saturating_sub(count);
        self.stack.truncate(len);
    }

    pub fn get_var(&self, name: &str) -> Result<Value, ExecErrorKind> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ExecErrorKind::UndefinedVariable(name.into()))
    }

    pub fn set_var(&mut self, name: impl Into<CompactString>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Pops the top value if it is a boolean. Anything else stays put.
    fn pop_condition(&mut self) -> Result<bool, ExecErrorKind> {
        let condition = self.peek()?.as_boolean()?;
        self.stack.pop();
        Ok(condition)
    }
}

// Statement interpreter
impl Context {
    /// Runs a freshly parsed program. Functions it defines are tagged with
    /// the program they came from.
    pub fn exec(
        &mut self,
        statements: &[Statement],
        output: &mut dyn Output,
    ) -> Result<(), ExecError> {
        self.sources += 1;
        self.origin = self.sources;
        self.exec_block(statements, output)
    }

    fn exec_block(
        &mut self,
        statements: &[Statement],
        output: &mut dyn Output,
    ) -> Result<(), ExecError> {
        for statement in statements {
            self.check_cancelled(statement.span())?;
            self.exec_statement(statement, output)?;
        }
        Ok(())
    }

    fn check_cancelled(&self, span: Option<Span>) -> Result<(), ExecError> {
        if self.cancel.is_cancelled() {
            warn!("execution cancelled");
            return Err(ExecError {
                kind: ExecErrorKind::Cancelled,
                span,
            });
        }
        Ok(())
    }

    fn exec_statement(
        &mut self,
        statement: &Statement,
        output: &mut dyn Output,
    ) -> Result<(), ExecError> {
        trace!(?statement, depth = self.stack.len(), "exec");
        match statement {
            Statement::Literal { value, .. } => {
                self.push(value.clone());
                Ok(())
            }
            Statement::Load { name, span } => {
                let value = self.get_var(name).map_err(|e| ExecError::at(e, *span))?;
                self.push(value);
                Ok(())
            }
            Statement::Store { name, span } => {
                let value = self.pop().map_err(|e| ExecError::at(e, *span))?;
                self.set_var(name.clone(), value);
                Ok(())
            }
            Statement::Command { name, span } => {
                let command = self.commands.get(name).ok_or_else(|| {
                    ExecError::at(ExecErrorKind::UnknownCommand(name.clone()), *span)
                })?;
                command
                    .execute(self, output)
                    .map_err(|e| ExecError::at(e, *span))
            }
            Statement::If(stmt) => {
                let span = stmt
                    .branches
                    .first()
                    .and_then(|branch| first_span(&branch.condition));
                self.nested(span, |ctx| ctx.exec_if(stmt, output))
            }
            Statement::While(stmt) => {
                let span = first_span(&stmt.condition);
                self.nested(span, |ctx| ctx.exec_while(stmt, span, output))
            }
            Statement::Function(decl) => {
                let function = Value::Function(Function::new(decl.body.clone(), self.origin));
                match &decl.name {
                    Some(name) => self.set_var(name.clone(), function),
                    None => self.push(function),
                }
                Ok(())
            }
            Statement::Call { name, span } => {
                let function = match name {
                    Some(name) => self.get_var(name).and_then(|value| {
                        value.as_function().cloned()
                    }),
                    None => self.pop_function(),
                }
                .map_err(|e| ExecError::at(e, *span))?;
                self.call(&function, *span, output)
            }
        }
    }

    /// Pops the top value if it is a function. Anything else stays put.
    fn pop_function(&mut self) -> Result<Function, ExecErrorKind> {
        let function = self.peek()?.as_function()?.clone();
        self.stack.pop();
        Ok(function)
    }

    /// Runs `run` one level deeper, failing at `span` once the depth limit is
    /// reached.
    fn nested<T>(
        &mut self,
        span: Option<Span>,
        run: impl FnOnce(&mut Self) -> Result<T, ExecError>,
    ) -> Result<T, ExecError> {
        if self.depth >= self.limits.max_depth {
            return Err(ExecError {
                kind: ExecErrorKind::RecursionLimit(self.limits.max_depth),
                span,
            });
        }
        self.depth += 1;
        trace!(depth = self.depth, "enter");
        let result = run(self);
        self.depth -= 1;
        result
    }

    fn call(
        &mut self,
        function: &Function,
        span: Span,
        output: &mut dyn Output,
    ) -> Result<(), ExecError> {
        let caller = std::mem::replace(&mut self.origin, function.origin);
        let result = self.nested(Some(span), |ctx| ctx.exec_block(&function.body, output));
        self.origin = caller;
        // Spans from another source mean nothing to the caller.
        result.map_err(|mut error| {
            if function.origin != caller {
                error.span = Some(span);
            }
            error
        })
    }

    /// Runs `condition` and pops its boolean result. Type errors point at the
    /// last located statement of the condition.
    fn eval_condition(
        &mut self,
        condition: &[Statement],
        output: &mut dyn Output,
    ) -> Result<bool, ExecError> {
        self.exec_block(condition, output)?;
        self.pop_condition().map_err(|kind| ExecError {
            kind,
            span: condition.iter().rev().find_map(Statement::span),
        })
    }

    fn exec_if(&mut self, stmt: &IfStatement, output: &mut dyn Output) -> Result<(), ExecError> {
        for branch in stmt.branches.iter() {
            if self.eval_condition(&branch.condition, output)? {
                return self.exec_block(&branch.body, output);
            }
        }
        if let Some(otherwise) = &stmt.otherwise {
            self.exec_block(otherwise, output)?;
        }
        Ok(())
    }

    fn exec_while(
        &mut self,
        stmt: &WhileStatement,
        span: Option<Span>,
        output: &mut dyn Output,
    ) -> Result<(), ExecError> {
        loop {
            if self.cancel.is_cancelled() {
                warn!("loop cancelled");
                return Err(ExecError {
                    kind: ExecErrorKind::Cancelled,
                    span,
                });
            }
            if !self.eval_condition(&stmt.condition, output)? {
                return Ok(());
            }
            self.exec_block(&stmt.body, output)?;
        }
    }
}

fn first_span(block: &[Statement]) -> Option<Span> {
    block.iter().find_map(Statement::span)
}
