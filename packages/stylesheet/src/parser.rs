use crate::ast::{normalize_prelude, AtBlock, AtRule, Declaration, Rule, StyleRule, Stylesheet};
use crate::error::{Result, StylesheetError};
use crate::lexer::{tokenize, Spanned, Token};
use tracing::debug;

/// At-rules whose block holds nested rules rather than declarations.
const CONDITIONAL_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

pub fn parse(source: &str) -> Result<Stylesheet> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let rules = parser.parse_rules(false)?;
    Ok(Stylesheet { rules })
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len())
    }

    fn end_of_previous(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_rules(&mut self, nested: bool) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        loop {
            match self.peek() {
                None if nested => return Err(StylesheetError::unexpected_eof(self.offset())),
                None => return Ok(rules),
                Some(Token::RBrace) if nested => {
                    self.advance();
                    return Ok(rules);
                }
                Some(Token::RBrace) => {
                    return Err(StylesheetError::unexpected_token(
                        self.offset(),
                        "rule",
                        "}",
                    ));
                }
                Some(Token::Semicolon) => self.advance(),
                Some(Token::AtKeyword(_)) => rules.push(Rule::At(self.parse_at_rule()?)),
                Some(_) => rules.push(Rule::Style(self.parse_style_rule()?)),
            }
        }
    }

    /// Raw source text from the current token up to (not including) the
    /// first top-level token matching `stop`.
    fn raw_until(&mut self, stop: impl Fn(&Token<'src>) -> bool) -> String {
        let start = self.offset();
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                token if depth == 0 && stop(token) => break,
                _ => {}
            }
            self.advance();
        }
        let end = self.end_of_previous().max(start);
        self.source[start..end].trim().to_string()
    }

    fn parse_style_rule(&mut self) -> Result<StyleRule> {
        let prelude =
            self.raw_until(|t| matches!(t, Token::LBrace | Token::RBrace | Token::Semicolon));
        match self.peek() {
            Some(Token::LBrace) => self.advance(),
            Some(token) => {
                return Err(StylesheetError::unexpected_token(
                    self.offset(),
                    "{",
                    token.to_string(),
                ))
            }
            None => return Err(StylesheetError::unexpected_eof(self.offset())),
        }

        Ok(StyleRule {
            prelude: normalize_prelude(&prelude),
            declarations: self.parse_declarations()?,
        })
    }

    fn parse_at_rule(&mut self) -> Result<AtRule> {
        let name = match self.peek() {
            Some(Token::AtKeyword(name)) => name.to_string(),
            _ => return Err(StylesheetError::unexpected_token(self.offset(), "at-rule", "?")),
        };
        self.advance();

        let prelude = normalize_prelude(&self.raw_until(|t| {
            matches!(t, Token::LBrace | Token::RBrace | Token::Semicolon)
        }));

        let block = match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                None
            }
            Some(Token::LBrace) => {
                self.advance();
                if CONDITIONAL_AT_RULES.contains(&name.as_str()) {
                    Some(AtBlock::Rules(self.parse_rules(true)?))
                } else {
                    Some(AtBlock::Declarations(self.parse_declarations()?))
                }
            }
            // `@import url(x)` at end of input or before a closing brace.
            Some(Token::RBrace) | None => None,
            Some(token) => {
                return Err(StylesheetError::unexpected_token(
                    self.offset(),
                    "{ or ;",
                    token.to_string(),
                ))
            }
        };

        Ok(AtRule {
            name,
            prelude,
            block,
        })
    }

    /// Parse declarations up to and including the closing brace.
    fn parse_declarations(&mut self) -> Result<Vec<Declaration>> {
        let mut declarations = Vec::new();
        loop {
            match self.peek() {
                None => return Err(StylesheetError::unexpected_eof(self.offset())),
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(declarations);
                }
                Some(Token::Semicolon) => self.advance(),
                Some(_) => {
                    if let Some(declaration) = self.parse_declaration() {
                        declarations.push(declaration);
                    }
                }
            }
        }
    }

    /// Parse one `property: value`. Malformed declarations are skipped up to
    /// the next `;` or `}`, the way browsers recover.
    fn parse_declaration(&mut self) -> Option<Declaration> {
        let start = self.offset();
        let property =
            self.raw_until(|t| matches!(t, Token::Colon | Token::Semicolon | Token::RBrace));

        if !matches!(self.peek(), Some(Token::Colon)) || property.is_empty() {
            debug!(pos = start, property = %property, "skipping malformed declaration");
            self.raw_until(|t| matches!(t, Token::Semicolon | Token::RBrace));
            return None;
        }
        self.advance();

        let value = self.raw_until(|t| matches!(t, Token::Semicolon | Token::RBrace));
        Some(Declaration::new(property, value))
    }
}
