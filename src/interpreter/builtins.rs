//! The default command table. Every command checks its operands before it
//! touches the stack, so a failing command leaves the stack as it found it.

use super::{command::NativeCommand, output::Output, Context};
use crate::value::{error::ExecErrorKind, Value};

pub const BUILTINS: &[NativeCommand] = &[
    // Stack
    NativeCommand::new("dup", dup),
    NativeCommand::new("drop", drop_top),
    NativeCommand::new("swap", swap),
    NativeCommand::new("over", over),
    NativeCommand::new("rot", rot),
    NativeCommand::new("depth", depth),
    NativeCommand::new("clear_stack", clear_stack),
    // Arithmetic
    NativeCommand::new("+", |c, _| binary(c, Value::add)),
    NativeCommand::new("-", |c, _| binary(c, Value::subtract)),
    NativeCommand::new("*", |c, _| binary(c, Value::multiply)),
    NativeCommand::new("/", |c, _| binary(c, Value::divide)),
    NativeCommand::new("%", |c, _| binary(c, Value::remainder)),
    NativeCommand::new("neg", |c, _| unary(c, Value::negate)),
    // Comparison
    NativeCommand::new("==", |c, _| binary(c, |l, r| Ok(Value::Boolean(l.is_equal(r))))),
    NativeCommand::new("!=", |c, _| binary(c, |l, r| Ok(Value::Boolean(!l.is_equal(r))))),
    NativeCommand::new("<", |c, _| binary(c, Value::less_than)),
    NativeCommand::new("<=", |c, _| binary(c, Value::less_than_or_equal)),
    NativeCommand::new(">", |c, _| binary(c, Value::greater_than)),
    NativeCommand::new(">=", |c, _| binary(c, Value::greater_than_or_equal)),
    // Logic
    NativeCommand::new("not", |c, _| unary(c, |v| Ok(Value::Boolean(!v.as_boolean()?)))),
    NativeCommand::new("and", |c, _| {
        binary(c, |l, r| Ok(Value::Boolean(l.as_boolean()? & r.as_boolean()?)))
    }),
    NativeCommand::new("or", |c, _| {
        binary(c, |l, r| Ok(Value::Boolean(l.as_boolean()? | r.as_boolean()?)))
    }),
    // Strings and introspection
    NativeCommand::new("str", |c, _| unary(c, |v| Ok(Value::String(v.to_string().into())))),
    NativeCommand::new("len", |c, _| {
        unary(c, |v| Ok(Value::Number(v.as_string()?.chars().count() as f64)))
    }),
    NativeCommand::new("type", |c, _| {
        unary(c, |v| Ok(Value::String(v.kind().to_string().into())))
    }),
    // IO
    NativeCommand::new("print", print),
    NativeCommand::new("println", println),
    NativeCommand::new("clear", clear),
];

fn unary(
    context: &mut Context,
    operation: fn(&Value) -> Result<Value, ExecErrorKind>,
) -> Result<(), ExecErrorKind> {
    let result = operation(context.peek()?)?;
    context.discard(1);
    context.push(result);
    Ok(())
}

fn binary(
    context: &mut Context,
    operation: fn(&Value, &Value) -> Result<Value, ExecErrorKind>,
) -> Result<(), ExecErrorKind> {
    let operands = context.top(2)?;
    let result = operation(&operands[0], &operands[1])?;
    context.discard(2);
    context.push(result);
    Ok(())
}

fn dup(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let top = context.peek()?.clone();
    context.push(top);
    Ok(())
}

fn drop_top(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    context.pop().map(|_| ())
}

fn swap(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    context.top_mut(2)?.swap(0, 1);
    Ok(())
}

fn over(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let second = context.top(2)?[0].clone();
    context.push(second);
    Ok(())
}

fn rot(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    // a b c -> b c a
    context.top_mut(3)?.rotate_left(1);
    Ok(())
}

fn depth(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let depth = context.stack().len() as f64;
    context.push(Value::Number(depth));
    Ok(())
}

fn clear_stack(context: &mut Context, _: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let depth = context.stack().len();
    context.discard(depth);
    Ok(())
}

fn print(context: &mut Context, output: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let text = context.pop()?.to_string();
    output.print(&text);
    Ok(())
}

fn println(context: &mut Context, output: &mut dyn Output) -> Result<(), ExecErrorKind> {
    let mut text = context.pop()?.to_string();
    text.push('\n');
    output.print(&text);
    Ok(())
}

fn clear(_: &mut Context, output: &mut dyn Output) -> Result<(), ExecErrorKind> {
    output.clear();
    Ok(())
}
