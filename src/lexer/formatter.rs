use super::{LineBreaks, Token, TokenKind};
use crate::lexer::{Lexer, LexicalError};

/// Interface for creating new token formatters.
pub trait TokenFormatter {
    /// Formats a token into a string.
    fn format(&self, token: &Token) -> String;
    /// Formats a lexer error into a string.
    fn format_lexical_error(&self, error: &LexicalError) -> String;
}

pub trait ToFormatter<F>
where
    F: TokenFormatter,
{
    fn create_formatter(&self) -> F;
}

pub struct BasicFormatter<'src> {
    text: &'src str,
    line_breaks: LineBreaks,
}

impl<'src> ToFormatter<BasicFormatter<'src>> for Lexer<'src> {
    fn create_formatter(&self) -> BasicFormatter<'src> {
        BasicFormatter {
            text: self.get_source(),
            line_breaks: self.get_line_breaks(),
        }
    }
}

impl<'src> TokenFormatter for BasicFormatter<'src> {
    fn format(&self, token: &Token) -> String {
        let lexeme = self.text.get(token.span.range()).unwrap_or_default();
        match token.kind {
            TokenKind::Eof => "EOF".into(),
            TokenKind::LoadName | TokenKind::StoreName | TokenKind::CallName => {
                format!("{} {lexeme} {}", token.kind, &lexeme[1..])
            }
            kind => format!("{kind} {lexeme}"),
        }
    }

    fn format_lexical_error(&self, error: &LexicalError) -> String {
        let location = self.line_breaks.get_location_from_span(error.span);
        format!("[{location}] Error: {}", error.kind)
    }
}

pub struct DebugFormatter;

impl<'src> ToFormatter<DebugFormatter> for Lexer<'src> {
    fn create_formatter(&self) -> DebugFormatter {
        DebugFormatter {}
    }
}

impl TokenFormatter for DebugFormatter {
    fn format(&self, token: &Token) -> String {
        format!("{token:?}")
    }

    fn format_lexical_error(&self, error: &LexicalError) -> String {
        format!("{error:?}")
    }
}
