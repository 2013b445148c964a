mod error;
pub mod formatter;
mod span;
mod token;

pub use error::{LexicalError, LexicalErrorKind};
pub use span::{Span, SpanIndex, SpanLength};
pub use token::{is_keyword, Token, TokenKind};

use compact_str::CompactString;
use std::{iter::Peekable, rc::Rc, str::CharIndices};
use token::KEYWORD_HASHMAP;

/// A 1-based line and column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub struct LineBreaks {
    text: Rc<str>,
    line_starts: Rc<[usize]>,
}

impl LineBreaks {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            text: text.into(),
            line_starts: line_starts.into(),
        }
    }

    pub fn get_line(&self, offset: SpanIndex) -> u32 {
        let offset = offset.to_usize();
        match self.line_starts.binary_search(&offset) {
            Ok(index) => (index + 1) as u32,
            Err(index) => index as u32,
        }
    }

    pub fn get_location(&self, offset: SpanIndex) -> Location {
        let line = self.get_line(offset);
        let line_start = self.line_starts[(line - 1) as usize];
        let end = offset.to_usize().min(self.text.len());
        let column = self
            .text
            .get(line_start..end)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        Location {
            line,
            column: (column + 1) as u32,
        }
    }

    pub fn get_location_from_span(&self, span: Span) -> Location {
        self.get_location(span.start)
    }
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '"' | '{' | '}' | '#'))
}

fn looks_numeric(lexeme: &str) -> bool {
    let mut chars = lexeme.chars();
    match (chars.next(), chars.next()) {
        (Some(c), _) if c.is_ascii_digit() => true,
        (Some('-' | '+' | '.'), Some(c)) => c.is_ascii_digit(),
        _ => false,
    }
}

#[derive(Debug)]
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line_breaks: LineBreaks,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line_breaks: LineBreaks::new(source),
        }
    }

    pub fn get_source(&self) -> &'src str {
        self.source
    }

    pub fn get_line_breaks(&self) -> LineBreaks {
        self.line_breaks.clone()
    }

    pub fn get_lexeme(&self, span: &Span) -> Option<&'src str> {
        self.source.get(span.range())
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '#' {
                while let Some((_, c)) = self.chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexicalError> {
        self.skip_trivia();

        let Some((start, c)) = self.chars.next() else {
            let end = self.source.len();
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
            });
        };

        let just = |kind: TokenKind| -> Result<Token, LexicalError> {
            Ok(Token {
                kind,
                span: Span::new(start, start + c.len_utf8()),
            })
        };

        match c {
            '{' => just(TokenKind::LeftBrace),
            '}' => just(TokenKind::RightBrace),
            '"' => self.lex_string(start),
            _ => self.lex_word(start),
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, LexicalError> {
        let mut escape_error = None;
        loop {
            let Some((offset, c)) = self.chars.next() else {
                return Err(LexicalError {
                    kind: LexicalErrorKind::UnclosedString,
                    span: Span::new(start, self.source.len()),
                });
            };
            match c {
                '"' => break,
                '\\' => {
                    let Some((_, escaped)) = self.chars.next() else {
                        continue;
                    };
                    if !matches!(escaped, 'n' | 't' | 'r' | '0' | '"' | '\\') && escape_error.is_none()
                    {
                        escape_error = Some(LexicalError {
                            kind: LexicalErrorKind::InvalidEscape(escaped),
                            span: Span::new(offset, offset + 1 + escaped.len_utf8()),
                        });
                    }
                }
                _ => {}
            }
        }

        // Report bad escapes only once the literal is known to be closed.
        if let Some(error) = escape_error {
            return Err(error);
        }

        Ok(Token {
            kind: TokenKind::StringLiteral,
            span: Span::new(start, self.offset()),
        })
    }

    fn lex_word(&mut self, start: usize) -> Result<Token, LexicalError> {
        while self.chars.next_if(|&(_, c)| is_word_char(c)).is_some() {}
        let span = Span::new(start, self.offset());
        let lexeme = &self.source[span.range()];
        let kind = Self::classify_word(lexeme).map_err(|kind| LexicalError { kind, span })?;
        Ok(Token { kind, span })
    }

    fn classify_word(lexeme: &str) -> Result<TokenKind, LexicalErrorKind> {
        if let Some(kind) = KEYWORD_HASHMAP.get(lexeme) {
            return Ok(*kind);
        }

        if looks_numeric(lexeme) {
            return match lexeme.parse::<f64>() {
                Ok(_) => Ok(TokenKind::NumericLiteral),
                Err(_) => Err(LexicalErrorKind::InvalidNumber(lexeme.into())),
            };
        }

        let mut chars = lexeme.chars();
        let prefix = chars.next();
        let rest = chars.as_str();
        let rest_is_name = rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

        let prefixed = match prefix {
            Some('$') => Some(TokenKind::LoadName),
            Some('>') if rest_is_name => Some(TokenKind::StoreName),
            Some('!') if rest_is_name => Some(TokenKind::CallName),
            Some('!') if rest.is_empty() => return Ok(TokenKind::CallTop),
            _ => None,
        };

        match prefixed {
            Some(kind) => {
                if is_identifier(rest) && !is_keyword(rest) {
                    Ok(kind)
                } else {
                    Err(LexicalErrorKind::InvalidName(CompactString::from(lexeme)))
                }
            }
            None => Ok(TokenKind::Word),
        }
    }
}
