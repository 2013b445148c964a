use super::{
    statement::{FunctionDecl, IfStatement, Statement, WhileStatement},
    Parser, SyntaxError,
};
use crate::lexer::LineBreaks;
use crate::value::Value;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt::Write;

const WRITE_FMT_MSG: &str = "Writing into a String buffer can't fail.";
const ARIADNE_MSG: &str = "Ariadne produces valid utf-8 strings";
const ARIADNE_WRITE_MSG: &str = "Write into buffer should not fail.";

pub trait ParserFormatter {
    fn format(&self, statements: &[Statement]) -> String;
    fn format_error(&self, error: &SyntaxError) -> String;
}

pub trait ToFormatter<F>
where
    F: ParserFormatter,
{
    fn create_formatter(&self) -> F;
}

pub struct DebugFormatter;

impl<'src> ToFormatter<DebugFormatter> for Parser<'src> {
    fn create_formatter(&self) -> DebugFormatter {
        DebugFormatter
    }
}

impl ParserFormatter for DebugFormatter {
    fn format(&self, statements: &[Statement]) -> String {
        format!("{statements:#?}")
    }

    fn format_error(&self, error: &SyntaxError) -> String {
        format!("{error:?}")
    }
}

/// Renders statements back into canonical single-line source and errors as
/// `[line:column] message`.
pub struct BasicFormatter {
    line_breaks: LineBreaks,
}

impl BasicFormatter {
    pub fn new(text: &str) -> Self {
        Self {
            line_breaks: LineBreaks::new(text),
        }
    }
}

impl<'src> ToFormatter<BasicFormatter> for Parser<'src> {
    fn create_formatter(&self) -> BasicFormatter {
        BasicFormatter {
            line_breaks: self.get_line_breaks(),
        }
    }
}

impl ParserFormatter for BasicFormatter {
    fn format(&self, statements: &[Statement]) -> String {
        let mut buffer = String::new();
        format_sequence(&mut buffer, statements);
        buffer
    }

    fn format_error(&self, error: &SyntaxError) -> String {
        let location = self.line_breaks.get_location_from_span(error.span);
        format!("[{location}] {}", error.message())
    }
}

fn format_sequence(buffer: &mut String, statements: &[Statement]) {
    for (index, statement) in statements.iter().enumerate() {
        if index > 0 {
            buffer.push(' ');
        }
        format_statement(buffer, statement);
    }
}

/// Pushes ` <statements> <keyword>`, skipping the gap for empty sequences.
fn format_clause(buffer: &mut String, statements: &[Statement], keyword: &str) {
    if !statements.is_empty() {
        buffer.push(' ');
        format_sequence(buffer, statements);
    }
    buffer.push(' ');
    buffer.push_str(keyword);
}

fn format_literal(buffer: &mut String, value: &Value) {
    match value {
        Value::Number(v) => write!(buffer, "{v}").expect(WRITE_FMT_MSG),
        Value::Boolean(v) => write!(buffer, "{v}").expect(WRITE_FMT_MSG),
        Value::String(v) => {
            buffer.push('"');
            for c in v.chars() {
                match c {
                    '\n' => buffer.push_str("\\n"),
                    '\t' => buffer.push_str("\\t"),
                    '\r' => buffer.push_str("\\r"),
                    '\0' => buffer.push_str("\\0"),
                    '"' => buffer.push_str("\\\""),
                    '\\' => buffer.push_str("\\\\"),
                    c => buffer.push(c),
                }
            }
            buffer.push('"');
        }
        Value::Function(fun) => {
            buffer.push('{');
            format_clause(buffer, &fun.body, "}");
        }
    }
}

fn format_statement(buffer: &mut String, statement: &Statement) {
    match statement {
        Statement::Literal { value, .. } => format_literal(buffer, value),
        Statement::Load { name, .. } => write!(buffer, "${name}").expect(WRITE_FMT_MSG),
        Statement::Store { name, .. } => write!(buffer, ">{name}").expect(WRITE_FMT_MSG),
        Statement::Command { name, .. } => buffer.push_str(name),
        Statement::Call { name: Some(name), .. } => {
            write!(buffer, "!{name}").expect(WRITE_FMT_MSG)
        }
        Statement::Call { name: None, .. } => buffer.push('!'),
        Statement::If(IfStatement {
            branches,
            otherwise,
        }) => {
            for (index, branch) in branches.iter().enumerate() {
                if index > 0 {
                    buffer.push(' ');
                }
                buffer.push_str(if index == 0 { "if" } else { "elif" });
                format_clause(buffer, &branch.condition, "then");
                if !branch.body.is_empty() {
                    buffer.push(' ');
                    format_sequence(buffer, &branch.body);
                }
            }
            if let Some(otherwise) = otherwise {
                buffer.push_str(" else");
                if !otherwise.is_empty() {
                    buffer.push(' ');
                    format_sequence(buffer, otherwise);
                }
            }
            buffer.push_str(" end");
        }
        Statement::While(WhileStatement { condition, body }) => {
            buffer.push_str("while");
            format_clause(buffer, condition, "do");
            format_clause(buffer, body, "end");
        }
        Statement::Function(FunctionDecl {
            name: Some(name),
            body,
        }) => {
            write!(buffer, "fun {name}").expect(WRITE_FMT_MSG);
            format_clause(buffer, body, "end");
        }
        Statement::Function(FunctionDecl { name: None, body }) => {
            buffer.push('{');
            format_clause(buffer, body, "}");
        }
    }
}

/// Renders syntax errors as an ariadne report over the offending source.
pub struct PrettyFormatter<'src> {
    text: &'src str,
    path: &'src str,
}

impl<'src> PrettyFormatter<'src> {
    pub fn new(text: &'src str, path: &'src str) -> Self {
        Self { text, path }
    }
}

impl<'src> ParserFormatter for PrettyFormatter<'src> {
    fn format(&self, statements: &[Statement]) -> String {
        let mut buffer = String::new();
        format_sequence(&mut buffer, statements);
        buffer
    }

    fn format_error(&self, error: &SyntaxError) -> String {
        let path = self.path;
        let range = error.span.range();
        let mut output = std::io::Cursor::new(Vec::new());
        Report::build(ReportKind::Error, (path, range.clone()))
            .with_code(error.code())
            .with_message("Failed to parse script")
            .with_label(
                Label::new((path, range))
                    .with_message(error.message())
                    .with_color(Color::BrightRed),
            )
            .finish()
            .write((path, Source::from(self.text)), &mut output)
            .expect(ARIADNE_WRITE_MSG);
        String::from_utf8(output.into_inner()).expect(ARIADNE_MSG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn canonical(source: &str) -> String {
        let statements = parse(source).expect("valid source");
        BasicFormatter::new(source).format(&statements)
    }

    #[test]
    fn formats_canonical_source() {
        assert_eq!(
            canonical("if  $x then 1 elif true then else \"a\\n\" end"),
            "if $x then 1 elif true then else \"a\\n\" end"
        );
        assert_eq!(canonical("while $go do dup end"), "while $go do dup end");
        assert_eq!(canonical("fun f >y end { } !f !"), "fun f >y end { } !f !");
    }

    #[test]
    fn errors_carry_line_and_column() {
        let source = "1 2\n  end";
        let error = parse(source).unwrap_err();
        assert_eq!(
            BasicFormatter::new(source).format_error(&error),
            "[2:3] Expected end of input but got END."
        );
    }
}
