use std::{sync::Arc, thread, time::Duration};

use color_eyre::Result;
use grpl::{
    interpreter::{
        command::{Command, CommandRegistry, NativeCommand},
        output::{BufferedOutput, Output},
        Limits,
    },
    lexer::Span,
    parser::statement::{ConditionalBranch, IfStatement, Statement, WhileStatement},
    submit,
    value::{
        error::{ExecError, ExecErrorKind},
        Value,
    },
    Context, EngineError,
};
use proptest::prelude::*;

fn context() -> Context {
    Context::new(Arc::new(CommandRegistry::with_builtins()))
}

fn span() -> Span {
    Span::new(0, 0)
}

fn literal(value: impl Into<Value>) -> Statement {
    Statement::Literal {
        value: value.into(),
        span: span(),
    }
}

fn store(name: &str) -> Statement {
    Statement::Store {
        name: name.into(),
        span: span(),
    }
}

fn load(name: &str) -> Statement {
    Statement::Load {
        name: name.into(),
        span: span(),
    }
}

fn exec_kind(context: &mut Context, statements: &[Statement]) -> Option<ExecErrorKind> {
    context
        .exec(statements, &mut BufferedOutput::new())
        .err()
        .map(|e| e.kind)
}

/// Counts every `print` and `clear` it receives.
#[derive(Default)]
struct CountingOutput {
    calls: usize,
}

impl Output for CountingOutput {
    fn print(&mut self, _: &str) {
        self.calls += 1;
    }

    fn clear(&mut self) {
        self.calls += 1;
    }
}

#[test]
fn store_then_load_leaves_the_value() {
    let mut ctx = context();
    let program = [literal(5.0), store("x"), load("x")];
    assert_eq!(exec_kind(&mut ctx, &program), None);
    assert_eq!(ctx.stack(), &[Value::Number(5.0)]);
}

#[test]
fn popping_an_empty_stack_underflows() {
    let mut ctx = context();
    assert_eq!(
        exec_kind(&mut ctx, &[store("x")]),
        Some(ExecErrorKind::StackUnderflow)
    );
    assert!(ctx.variables().is_empty());
}

#[test]
fn first_true_branch_runs() {
    let mut ctx = context();
    let program = [Statement::If(IfStatement {
        branches: vec![ConditionalBranch {
            condition: vec![literal(true)].into(),
            body: vec![literal(1.0)].into(),
        }],
        otherwise: Some(vec![literal(2.0)].into()),
    })];
    assert_eq!(exec_kind(&mut ctx, &program), None);
    assert_eq!(ctx.stack(), &[Value::Number(1.0)]);
}

#[test]
fn false_while_runs_zero_times() {
    let mut ctx = context();
    let program = [Statement::While(WhileStatement {
        condition: vec![literal(false)].into(),
        body: vec![literal(1.0)].into(),
    })];
    assert_eq!(exec_kind(&mut ctx, &program), None);
    assert!(ctx.stack().is_empty());
}

#[test]
fn unknown_command_performs_no_io() {
    let mut ctx = context();
    let mut output = CountingOutput::default();
    let program = [Statement::Command {
        name: "not_a_real_command".into(),
        span: span(),
    }];
    let error = ctx.exec(&program, &mut output).unwrap_err();
    assert_eq!(
        error.kind,
        ExecErrorKind::UnknownCommand("not_a_real_command".into())
    );
    assert_eq!(output.calls, 0);
}

#[test]
fn function_stores_are_visible_to_the_caller() -> Result<()> {
    let mut ctx = context();
    submit("fun f 42 >y end !f", &mut ctx, &mut BufferedOutput::new())?;
    assert_eq!(ctx.get_var("y"), Ok(Value::Number(42.0)));
    assert!(ctx.stack().is_empty());
    Ok(())
}

#[test]
fn failed_statements_leave_the_stack_alone() {
    let mut ctx = context();
    let mut output = BufferedOutput::new();
    for source in ["1 \"a\" +", "rot", "not", "!", "neg"] {
        let _ = submit(source, &mut ctx, &mut output);
    }
    // Only the literals from the first submission made it.
    assert_eq!(ctx.stack(), &[Value::Number(1.0), Value::from("a")]);
}

#[test]
fn syntax_errors_execute_nothing() {
    let mut ctx = context();
    let mut output = BufferedOutput::new();
    let error = submit("1 >x \"hi\" println end", &mut ctx, &mut output).unwrap_err();
    assert!(matches!(error, EngineError::Syntax(_)));
    assert!(ctx.stack().is_empty());
    assert!(ctx.variables().is_empty());
    assert_eq!(output.data(), "");
}

#[test]
fn cancelled_context_runs_nothing() {
    let mut ctx = context();
    ctx.cancel_token().cancel();
    let mut output = BufferedOutput::new();
    let error = submit("\"hi\" println", &mut ctx, &mut output).unwrap_err();
    assert!(matches!(
        error,
        EngineError::Exec(ref e) if e.kind == ExecErrorKind::Cancelled
    ));
    assert_eq!(output.data(), "");

    ctx.cancel_token().reset();
    submit("\"hi\" println", &mut ctx, &mut output).expect("runs after reset");
    assert_eq!(output.data(), "hi\n");
}

#[test]
fn infinite_loop_is_cancelled_from_another_thread() {
    let mut ctx = context();
    let token = ctx.cancel_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let mut output = BufferedOutput::new();
    let error = submit("0 >i while true do $i 1 + >i end", &mut ctx, &mut output)
        .unwrap_err();
    canceller.join().expect("canceller thread panicked");

    assert!(matches!(
        error,
        EngineError::Exec(ref e) if e.kind == ExecErrorKind::Cancelled
    ));
    assert!(matches!(ctx.get_var("i"), Ok(Value::Number(n)) if n > 0.0));
}

#[test]
fn runaway_recursion_hits_the_limit() {
    let mut ctx = context().with_limits(Limits { max_depth: 64 });
    assert_eq!(ctx.limits().max_depth, 64);
    let mut output = BufferedOutput::new();
    let error = submit("0 >n fun f $n 1 + >n !f end !f", &mut ctx, &mut output).unwrap_err();
    assert!(matches!(
        error,
        EngineError::Exec(ref e) if e.kind == ExecErrorKind::RecursionLimit(64)
    ));
    assert_eq!(ctx.get_var("n"), Ok(Value::Number(64.0)));

    // The context is still usable afterwards.
    submit("fun g 1 end !g", &mut ctx, &mut output).expect("shallow call succeeds");
    assert_eq!(ctx.stack(), &[Value::Number(1.0)]);
}

#[test]
fn nested_blocks_count_towards_the_default_limit() {
    let source = format!(
        "fun f {} !f {} end !f",
        "if true then ".repeat(40),
        "end ".repeat(40)
    );
    // The usual main thread stack size.
    let runner = thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || {
            let mut ctx = context();
            assert_eq!(ctx.limits(), Limits::default());
            submit(&source, &mut ctx, &mut BufferedOutput::new())
        })
        .expect("failed to spawn runner thread");
    let error = runner
        .join()
        .expect("runner thread panicked")
        .unwrap_err();
    assert!(matches!(
        error,
        EngineError::Exec(ref e)
            if e.kind == ExecErrorKind::RecursionLimit(Limits::DEFAULT_MAX_DEPTH)
    ));
}

#[test]
fn cancelled_loop_points_at_its_condition() {
    fn stop(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
        context.cancel_token().cancel();
        Ok(())
    }

    let mut registry = CommandRegistry::with_builtins();
    registry.register(NativeCommand::new("stop", stop));
    let mut ctx = Context::new(Arc::new(registry));
    let error = submit("while true do stop end", &mut ctx, &mut BufferedOutput::new())
        .unwrap_err();
    assert_eq!(
        error,
        EngineError::Exec(ExecError {
            kind: ExecErrorKind::Cancelled,
            span: Some(Span::new(6, 10)),
        })
    );
}

#[test]
fn host_commands_can_be_registered() -> Result<()> {
    fn answer(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
        context.push(Value::Number(42.0));
        Ok(())
    }

    let mut registry = CommandRegistry::with_builtins();
    assert!(registry.register(NativeCommand::new("answer", answer)).is_none());
    let replaced = registry.register(NativeCommand::new("dup", answer));
    assert_eq!(replaced.map(|c| c.get_name().to_string()), Some("dup".into()));

    let mut ctx = Context::new(Arc::new(registry));
    assert!(ctx.commands().contains("answer"));
    submit("answer 1 dup", &mut ctx, &mut BufferedOutput::new())?;
    assert_eq!(
        ctx.stack(),
        &[Value::Number(42.0), Value::Number(1.0), Value::Number(42.0)]
    );
    Ok(())
}

proptest! {
    #[test]
    fn stack_length_is_pushes_minus_stores(ops in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut pushes = 0usize;
        let mut program = Vec::new();
        for push in ops {
            if push {
                pushes += 1;
                program.push(literal(pushes as f64));
            } else if pushes > program.iter().filter(|s| matches!(s, Statement::Store { .. })).count() {
                program.push(store("v"));
            }
        }
        let stores = program.iter().filter(|s| matches!(s, Statement::Store { .. })).count();

        let mut ctx = context();
        prop_assert_eq!(exec_kind(&mut ctx, &program), None);
        prop_assert_eq!(ctx.stack().len(), pushes - stores);
    }
}
