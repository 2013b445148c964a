use super::span::Span;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

/// The hashmap for keywords
pub static KEYWORD_HASHMAP: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("if", TokenKind::KeywordIf);
    map.insert("then", TokenKind::KeywordThen);
    map.insert("elif", TokenKind::KeywordElif);
    map.insert("else", TokenKind::KeywordElse);
    map.insert("end", TokenKind::KeywordEnd);
    map.insert("while", TokenKind::KeywordWhile);
    map.insert("do", TokenKind::KeywordDo);
    map.insert("fun", TokenKind::KeywordFun);
    map.insert("true", TokenKind::KeywordTrue);
    map.insert("false", TokenKind::KeywordFalse);
    map
});

pub fn is_keyword(lexeme: &str) -> bool {
    KEYWORD_HASHMAP.contains_key(lexeme)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Braces
    LeftBrace,
    RightBrace,

    // Literals
    NumericLiteral,
    StringLiteral,

    // Words
    Word,
    LoadName,
    StoreName,
    CallName,
    CallTop,

    // Keywords
    KeywordIf,
    KeywordThen,
    KeywordElif,
    KeywordElse,
    KeywordEnd,
    KeywordWhile,
    KeywordDo,
    KeywordFun,
    KeywordTrue,
    KeywordFalse,

    // End of file.
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::LeftBrace => write!(f, "LEFT_BRACE"),
            TokenKind::RightBrace => write!(f, "RIGHT_BRACE"),
            TokenKind::NumericLiteral => write!(f, "NUMBER"),
            TokenKind::StringLiteral => write!(f, "STRING"),
            TokenKind::Word => write!(f, "WORD"),
            TokenKind::LoadName => write!(f, "LOAD"),
            TokenKind::StoreName => write!(f, "STORE"),
            TokenKind::CallName => write!(f, "CALL"),
            TokenKind::CallTop => write!(f, "CALL_TOP"),
            TokenKind::KeywordIf => write!(f, "IF"),
            TokenKind::KeywordThen => write!(f, "THEN"),
            TokenKind::KeywordElif => write!(f, "ELIF"),
            TokenKind::KeywordElse => write!(f, "ELSE"),
            TokenKind::KeywordEnd => write!(f, "END"),
            TokenKind::KeywordWhile => write!(f, "WHILE"),
            TokenKind::KeywordDo => write!(f, "DO"),
            TokenKind::KeywordFun => write!(f, "FUN"),
            TokenKind::KeywordTrue => write!(f, "TRUE"),
            TokenKind::KeywordFalse => write!(f, "FALSE"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
