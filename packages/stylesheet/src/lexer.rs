//! CSS tokenizer built on logos.
//!
//! Only the structure matters here: braces, semicolons, colons, parens and
//! strings. Everything else is a `Word`, and the parser slices the source by
//! span to recover preludes and values verbatim.

use crate::error::{Result, StylesheetError};
use logos::Logos;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("/")]
    Slash,

    #[regex(r"@[a-zA-Z_-][a-zA-Z0-9_-]*", |lex| &lex.slice()[1..])]
    AtKeyword(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r#"[^{}();:/@"'\s]+"#, |lex| lex.slice())]
    Word(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Slash => write!(f, "/"),
            Token::AtKeyword(name) => write!(f, "@{}", name),
            Token::String(s) => write!(f, "string {}", s),
            Token::Word(w) => write!(f, "'{}'", w),
        }
    }
}

pub type Spanned<'src> = (Token<'src>, Range<usize>);

/// Tokenize a stylesheet, failing on the first unrecognized input
/// (an unterminated string, a stray `@`).
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(StylesheetError::LexerError { pos: span.start }),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_simple_rule() {
        assert_eq!(
            kinds("a { color: red; }"),
            vec![
                Token::Word("a"),
                Token::LBrace,
                Token::Word("color"),
                Token::Colon,
                Token::Word("red"),
                Token::Semicolon,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_attribute_selector_with_string() {
        let tokens = kinds(r#"[data-x="a;b"]{}"#);
        assert_eq!(tokens[0], Token::Word("[data-x="));
        assert_eq!(tokens[1], Token::String(r#""a;b""#));
        assert_eq!(tokens[2], Token::Word("]"));
    }

    #[test]
    fn test_comments_and_at_keywords() {
        let tokens = kinds("/* note */ @media screen { }");
        assert_eq!(tokens[0], Token::AtKeyword("media"));
        assert_eq!(tokens[1], Token::Word("screen"));
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(matches!(
            tokenize(r#"a { content: "oops }"#),
            Err(StylesheetError::LexerError { .. })
        ));
    }
}
