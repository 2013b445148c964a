use crate::lexer::LineBreaks;
use crate::value::{
    error::{ExecError, ExecErrorKind},
    Value,
};
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};

const ARIADNE_MSG: &str = "Ariadne produces valid utf-8 strings";
const ARIADNE_WRITE_MSG: &str = "Write into buffer should not fail.";

pub trait ValueFormatter {
    fn format(&self, value: &Value) -> String;
    fn format_error(&self, error: &ExecError) -> String;
}

pub struct DebugFormatter;

impl ValueFormatter for DebugFormatter {
    fn format(&self, value: &Value) -> String {
        format!("{value:?}")
    }

    fn format_error(&self, error: &ExecError) -> String {
        format!("{error:?}")
    }
}

/// One line per error, prefixed with the location when there is one.
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

impl ValueFormatter for BasicFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::String(v) => format!("{v:?}"),
            v => format!("{v}"),
        }
    }

    fn format_error(&self, error: &ExecError) -> String {
        match error.span {
            Some(span) => {
                let location = self.line_breaks.get_location_from_span(span);
                format!("[{location}] {}", error.kind)
            }
            None => format!("{}", error.kind),
        }
    }
}

pub struct PrettyFormatter<'src> {
    text: &'src str,
    path: &'src str,
}

impl<'src> PrettyFormatter<'src> {
    pub fn new(text: &'src str, path: &'src str) -> Self {
        Self { text, path }
    }

    fn label_message(kind: &ExecErrorKind) -> String {
        match kind {
            ExecErrorKind::UnknownCommand(name) => {
                format!("No command named {}", name.fg(Color::BrightRed))
            }
            ExecErrorKind::UndefinedVariable(name) => {
                format!("Variable {} was never stored", name.fg(Color::BrightRed))
            }
            ExecErrorKind::StackUnderflow => "The stack is empty here".into(),
            ExecErrorKind::TypeMismatch { expected, actual } => format!(
                "Type is {} instead of {expected}",
                actual.fg(Color::BrightRed)
            ),
            ExecErrorKind::Cancelled => "Stopped before this statement".into(),
            ExecErrorKind::RecursionLimit(limit) => {
                format!("This would exceed {limit} nested calls and blocks")
            }
        }
    }
}

impl<'src> ValueFormatter for PrettyFormatter<'src> {
    fn format(&self, value: &Value) -> String {
        format!("{value}")
    }

    fn format_error(&self, error: &ExecError) -> String {
        let path = self.path;
        let Some(span) = error.span else {
            return format!("[{}] Error: {}", error.code(), error.kind);
        };
        let mut output = std::io::Cursor::new(Vec::new());
        Report::build(ReportKind::Error, (path, span.range()))
            .with_code(error.code())
            .with_message(error.kind.to_string())
            .with_label(
                Label::new((path, span.range()))
                    .with_message(Self::label_message(&error.kind))
                    .with_color(Color::BrightRed),
            )
            .finish()
            .write((path, Source::from(self.text)), &mut output)
            .expect(ARIADNE_WRITE_MSG);
        String::from_utf8(output.into_inner()).expect(ARIADNE_MSG)
    }
}
