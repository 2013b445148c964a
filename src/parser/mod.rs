pub mod error;
pub mod formatter;
pub mod statement;

use crate::{
    lexer::{is_identifier, Lexer, LineBreaks, Token, TokenKind},
    value::Value,
};
use compact_str::CompactString;
pub use error::{SyntaxError, SyntaxErrorKind};
use statement::{Block, ConditionalBranch, FunctionDecl, IfStatement, Statement, WhileStatement};

/// Blocks nested deeper than this are rejected rather than risking the
/// parser's own native stack.
pub const MAX_NESTING: usize = 256;

const LEXEME_MSG: &str = "Lexed tokens have valid spans.";

/// Parses `source` into a statement sequence. Nothing in `source` runs if
/// this fails.
pub fn parse(source: &str) -> Result<Vec<Statement>, SyntaxError> {
    Parser::new(source).parse()
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    lookahead: Option<Result<Token, SyntaxError>>,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
            lookahead: None,
            depth: 0,
        }
    }

    pub fn get_line_breaks(&self) -> LineBreaks {
        self.lexer.get_line_breaks()
    }

    fn peek(&mut self) -> Result<Token, SyntaxError> {
        match self.lookahead {
            Some(ref token_or_error) => token_or_error.clone(),
            None => {
                let next_token = self.next_token();
                self.lookahead = Some(next_token.clone());
                next_token
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        match self.lookahead.take() {
            Some(token_or_error) => token_or_error,
            None => self.lexer.next_token().map_err(SyntaxError::from),
        }
    }

    fn lexeme(&self, token: &Token) -> &'src str {
        self.lexer.get_lexeme(&token.span).expect(LEXEME_MSG)
    }

    fn name(&self, token: &Token) -> CompactString {
        // Strip the `$`, `>` or `!` prefix.
        self.lexeme(token)[1..].into()
    }
}

// Parse program/statements
impl<'src> Parser<'src> {
    pub fn parse(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let (statements, _) = self.parse_sequence(&[TokenKind::Eof], "end of input")?;
        Ok(statements)
    }

    /// Parses statements up to and including one of `terminators`, which is
    /// returned alongside the statements.
    fn parse_sequence(
        &mut self,
        terminators: &[TokenKind],
        expected: &'static str,
    ) -> Result<(Vec<Statement>, Token), SyntaxError> {
        let mut statements = Vec::new();

        loop {
            let token = self.next_token()?;
            if terminators.contains(&token.kind) {
                return Ok((statements, token));
            }

            let statement = match token.kind {
                TokenKind::NumericLiteral => {
                    let lexeme = self.lexeme(&token);
                    let value = lexeme.parse().map_err(|_| SyntaxError {
                        kind: SyntaxErrorKind::UnexpectedToken {
                            actual: token.kind,
                            expected: "a number",
                        },
                        span: token.span,
                    })?;
                    Statement::Literal {
                        value: Value::Number(value),
                        span: token.span,
                    }
                }
                TokenKind::StringLiteral => {
                    let lexeme = self.lexeme(&token);
                    let inner = &lexeme[1..lexeme.len() - 1];
                    Statement::Literal {
                        value: Value::String(unescape(inner)),
                        span: token.span,
                    }
                }
                TokenKind::KeywordTrue => Statement::Literal {
                    value: Value::Boolean(true),
                    span: token.span,
                },
                TokenKind::KeywordFalse => Statement::Literal {
                    value: Value::Boolean(false),
                    span: token.span,
                },
                TokenKind::Word => Statement::Command {
                    name: self.lexeme(&token).into(),
                    span: token.span,
                },
                TokenKind::LoadName => Statement::Load {
                    name: self.name(&token),
                    span: token.span,
                },
                TokenKind::StoreName => Statement::Store {
                    name: self.name(&token),
                    span: token.span,
                },
                TokenKind::CallName => Statement::Call {
                    name: Some(self.name(&token)),
                    span: token.span,
                },
                TokenKind::CallTop => Statement::Call {
                    name: None,
                    span: token.span,
                },
                TokenKind::KeywordIf => self.nested(&token, Self::parse_if)?,
                TokenKind::KeywordWhile => self.nested(&token, Self::parse_while)?,
                TokenKind::KeywordFun => self.nested(&token, Self::parse_named_function)?,
                TokenKind::LeftBrace => self.nested(&token, Self::parse_function_literal)?,
                TokenKind::Eof => {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::UnexpectedEof { expected },
                        span: token.span,
                    })
                }
                TokenKind::KeywordThen
                | TokenKind::KeywordElif
                | TokenKind::KeywordElse
                | TokenKind::KeywordEnd
                | TokenKind::KeywordDo
                | TokenKind::RightBrace => {
                    return Err(SyntaxError {
                        kind: SyntaxErrorKind::UnexpectedToken {
                            actual: token.kind,
                            expected,
                        },
                        span: token.span,
                    })
                }
            };
            statements.push(statement);
        }
    }

    fn nested(
        &mut self,
        opener: &Token,
        parse: fn(&mut Self) -> Result<Statement, SyntaxError>,
    ) -> Result<Statement, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::TooDeep(MAX_NESTING),
                span: opener.span,
            });
        }
        self.depth += 1;
        let statement = parse(self);
        self.depth -= 1;
        statement
    }

    fn block(
        &mut self,
        terminators: &[TokenKind],
        expected: &'static str,
    ) -> Result<(Block, Token), SyntaxError> {
        let (statements, terminator) = self.parse_sequence(terminators, expected)?;
        Ok((statements.into(), terminator))
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        let mut branches = Vec::new();
        let mut otherwise = None;

        loop {
            let (condition, _) = self.block(&[TokenKind::KeywordThen], "`then`")?;
            let (body, terminator) = self.block(
                &[
                    TokenKind::KeywordElif,
                    TokenKind::KeywordElse,
                    TokenKind::KeywordEnd,
                ],
                "`elif`, `else` or `end`",
            )?;
            branches.push(ConditionalBranch { condition, body });

            match terminator.kind {
                TokenKind::KeywordElif => continue,
                TokenKind::KeywordElse => {
                    let (body, _) = self.block(&[TokenKind::KeywordEnd], "`end`")?;
                    otherwise = Some(body);
                    break;
                }
                _ => break,
            }
        }

        Ok(Statement::If(IfStatement {
            branches,
            otherwise,
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, SyntaxError> {
        let (condition, _) = self.block(&[TokenKind::KeywordDo], "`do`")?;
        let (body, _) = self.block(&[TokenKind::KeywordEnd], "`end`")?;
        Ok(Statement::While(WhileStatement { condition, body }))
    }

    fn parse_named_function(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.peek()?;
        let is_name = token.kind == TokenKind::Word && is_identifier(self.lexeme(&token));
        if !is_name {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::MissingFunctionName(token.kind),
                span: token.span,
            });
        }
        let _ = self.next_token()?;

        let (body, _) = self.block(&[TokenKind::KeywordEnd], "`end`")?;
        Ok(Statement::Function(FunctionDecl {
            name: Some(self.lexeme(&token).into()),
            body,
        }))
    }

    fn parse_function_literal(&mut self) -> Result<Statement, SyntaxError> {
        let (body, _) = self.block(&[TokenKind::RightBrace], "`}`")?;
        Ok(Statement::Function(FunctionDecl { name: None, body }))
    }
}

/// Resolves the escapes the lexer already validated.
fn unescape(text: &str) -> CompactString {
    let mut output = CompactString::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('t') => output.push('\t'),
            Some('r') => output.push('\r'),
            Some('0') => output.push('\0'),
            Some(other) => output.push(other),
            None => {}
        }
    }
    output
}
