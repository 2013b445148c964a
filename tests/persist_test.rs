use std::sync::Arc;

use color_eyre::Result;
use grpl::{
    interpreter::{
        command::CommandRegistry,
        formatter::{BasicFormatter, ValueFormatter},
        output::BufferedOutput,
        persist::{ContextState, PersistError, CONTEXT_STATE_VERSION},
        Limits,
    },
    session::{Session, SessionState},
    submit,
    value::Value,
    Context, EngineError,
};
use serde_json::json;

fn commands() -> Arc<CommandRegistry> {
    Arc::new(CommandRegistry::with_builtins())
}

fn populated_context() -> Result<Context> {
    let mut ctx = Context::new(commands());
    submit(
        "fun sq dup * end \"name\" >who 1 0 / >big 1 0 / neg 2.5 \"s\" true { 1 }",
        &mut ctx,
        &mut BufferedOutput::new(),
    )?;
    Ok(ctx)
}

#[test]
fn snapshot_restores_stack_and_variables() -> Result<()> {
    let ctx = populated_context()?;
    let restored = Context::restore(ctx.snapshot(), commands())?;
    assert_eq!(restored.stack(), ctx.stack());
    assert_eq!(restored.variables(), ctx.variables());
    Ok(())
}

#[test]
fn snapshot_survives_json() -> Result<()> {
    let ctx = populated_context()?;
    let json = ctx.snapshot().to_json()?;
    let mut restored = Context::restore(ContextState::from_json(&json)?, commands())?;
    assert_eq!(restored.stack(), ctx.stack());
    assert_eq!(restored.variables(), ctx.variables());
    assert_eq!(restored.get_var("big"), Ok(Value::Number(f64::INFINITY)));

    // Restored functions are still callable.
    let mut output = BufferedOutput::new();
    submit("clear_stack 3 !sq println", &mut restored, &mut output)?;
    assert_eq!(output.data(), "9\n");
    Ok(())
}

#[test]
fn nan_survives_json() -> Result<()> {
    let mut ctx = Context::new(commands());
    submit("0 0 / >nan", &mut ctx, &mut BufferedOutput::new())?;
    let json = ctx.snapshot().to_json()?;
    let restored = Context::restore(ContextState::from_json(&json)?, commands())?;
    assert!(matches!(restored.get_var("nan"), Ok(Value::Number(n)) if n.is_nan()));
    Ok(())
}

#[test]
fn restored_functions_keep_their_equality() -> Result<()> {
    let mut ctx = Context::new(commands());
    submit("fun f 1 end $f >g $f $g ==", &mut ctx, &mut BufferedOutput::new())?;
    let json = ctx.snapshot().to_json()?;
    let mut restored = Context::restore(ContextState::from_json(&json)?, commands())?;
    submit("$f $g ==", &mut restored, &mut BufferedOutput::new())?;
    assert_eq!(
        restored.stack(),
        &[Value::Boolean(true), Value::Boolean(true)]
    );
    Ok(())
}

#[test]
fn restored_function_errors_point_at_the_call() -> Result<()> {
    let mut ctx = Context::new(commands());
    submit("fun f 1 2 3 4 5 6 frob end", &mut ctx, &mut BufferedOutput::new())?;
    let json = ctx.snapshot().to_json()?;
    let mut restored = Context::restore(ContextState::from_json(&json)?, commands())?;

    let source = "!f";
    let Err(EngineError::Exec(error)) = submit(source, &mut restored, &mut BufferedOutput::new())
    else {
        panic!("expected a runtime error");
    };
    assert_eq!(
        BasicFormatter::new(source).format_error(&error),
        "[1:1] Unknown command: frob"
    );
    Ok(())
}

#[test]
fn values_are_explicitly_tagged() -> Result<()> {
    assert_eq!(
        serde_json::to_value(Value::Number(5.0))?,
        json!({ "type": "Number", "value": 5.0 })
    );
    assert_eq!(
        serde_json::to_value(Value::from("hi"))?,
        json!({ "type": "String", "value": "hi" })
    );
    assert_eq!(
        serde_json::to_value(Value::Number(f64::NEG_INFINITY))?,
        json!({ "type": "Number", "value": "-inf" })
    );
    Ok(())
}

#[test]
fn unknown_versions_are_rejected() -> Result<()> {
    let mut state = Context::new(commands()).snapshot();
    state.version = CONTEXT_STATE_VERSION + 1;
    let json = state.to_json()?;
    let error = Context::restore(ContextState::from_json(&json)?, commands()).unwrap_err();
    assert!(matches!(
        error,
        PersistError::UnsupportedVersion { found, expected }
            if found == CONTEXT_STATE_VERSION + 1 && expected == CONTEXT_STATE_VERSION
    ));
    Ok(())
}

#[test]
fn malformed_json_is_an_encoding_error() {
    let error = ContextState::from_json("{\"version\": 1, \"stack\": [").unwrap_err();
    assert!(matches!(error, PersistError::Encoding(_)));
}

#[test]
fn session_restores_transcript_and_bindings() -> Result<()> {
    let mut session = Session::new(commands());
    let mut viewer = BufferedOutput::new();
    session.on_input("3 >x $x println", &mut viewer)?;

    let json = session.snapshot().to_json()?;
    let restored = Session::restore(SessionState::from_json(&json)?, commands(), Limits::default())?;
    assert_eq!(restored.transcript(), ">3 >x $x println\n3\n");
    assert_eq!(restored.context().get_var("x"), Ok(Value::Number(3.0)));

    let mut late_viewer = BufferedOutput::new();
    restored.attach(&mut late_viewer);
    assert_eq!(late_viewer.data(), restored.transcript());
    assert_eq!(late_viewer.clear_count(), 1);
    Ok(())
}

#[test]
fn session_survives_failed_input() -> Result<()> {
    let mut session = Session::new(commands());
    let mut viewer = BufferedOutput::new();
    assert!(session.on_input("1 nope", &mut viewer).is_err());
    session.on_input("println", &mut viewer)?;
    assert_eq!(
        session.transcript(),
        ">1 nope\nError: [1:3] Unknown command: nope\n>println\n1\n"
    );
    Ok(())
}
