//! Recursive descent parser producing the arena model in [`crate::ast`].
//!
//! Whole files are parsed by [`parse_source`].  Parts of a file whose meaning
//! depends on name resolution (object and object set definitions, actual
//! parameters, field defaults, ...) are stored as token [`Block`]s and parsed
//! later with [`Parser::block`] once the analysis knows what they contain.

mod block;
mod class;
mod error;
mod module;
mod object;
mod reference;
mod ty;
mod value;

use crate::{
    ast::{Ast, Block, ScopeId},
    compiler::SourceId,
    location::Location,
    token::{TokenBuffer, TokenKind},
    util::CowVec,
};

pub use self::error::{ParserError, Result};
pub(crate) use self::object::ObjectBody;

/// Parser over a slice of lexed tokens, adding nodes to an [`Ast`]
#[derive(Debug)]
pub struct Parser<'a> {
    /// The tokens being parsed
    tokens: &'a [TokenBuffer],

    /// Index of the next token
    position: usize,

    /// Arena receiving all parsed nodes
    ast: &'a mut Ast,

    /// Scope given to every node created
    scope: ScopeId,

    /// Current recursion depth of the parser
    depth: usize,

    /// Maximum recursion depth before giving up
    max_depth: usize,

    /// Location reported for errors at the end of the tokens
    end: Location,
}

/// Parse every module in a source file into the arena
pub(crate) fn parse_source(
    tokens: &[TokenBuffer],
    ast: &mut Ast,
    source: SourceId,
    max_depth: usize,
) -> Result {
    let end = tokens
        .last()
        .map_or(Location::new(source, 0..0), |t| {
            let loc = t.location();
            Location::new(source, loc.span.end..loc.span.end)
        });

    let mut position = 0;
    while position < tokens.len() {
        let scope = module::module_scope(ast);
        let mut parser = Parser {
            tokens,
            position,
            ast: &mut *ast,
            scope,
            depth: 0,
            max_depth,
            end: end.clone(),
        };
        parser.module_definition(source)?;
        position = parser.position;
    }

    Ok(())
}

impl<'a> Parser<'a> {
    /// Create a parser for the contents of a block, resolving names in `scope`
    pub(crate) fn block(block: &'a Block, ast: &'a mut Ast, scope: ScopeId, max_depth: usize) -> Self {
        let end = Location::new(block.location.source, block.location.span.end..block.location.span.end);
        Self {
            tokens: &block.tokens,
            position: 0,
            ast,
            scope,
            depth: 0,
            max_depth,
            end,
        }
    }

    /// Consume a token of the given kind or return an error.
    /// If an empty list is given, returns any token.
    fn next(&mut self, kind: impl Into<CowVec<TokenKind>>) -> Result<TokenBuffer> {
        let tok = self.peek(kind)?.clone();
        self.position += 1;
        Ok(tok)
    }

    /// Peek a token without consuming it or return an error if the token is not
    /// of one of the provided kinds. If an empty list is given, returns any token.
    fn peek(&self, kind: impl Into<CowVec<TokenKind>>) -> Result<&'a TokenBuffer> {
        let kind = kind.into();

        match self.tokens.get(self.position) {
            Some(tok) if kind.is_empty() || kind.contains(&tok.kind) => Ok(tok),
            Some(tok) => Err(ParserError::Expected {
                kind,
                got: format!("`{}`", tok.value),
                location: tok.location(),
            }),
            None => Err(ParserError::Expected {
                kind,
                got: "end of input".to_string(),
                location: self.end.clone(),
            }),
        }
    }

    /// The kind of the token `n` tokens ahead, if there is one
    fn peek_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.position + n).map(|t| t.kind)
    }

    /// Is the next token of the given kind
    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind(0) == Some(kind)
    }

    /// Consume the next token if it is of the given kind
    fn eat(&mut self, kind: TokenKind) -> Option<TokenBuffer> {
        if self.at(kind) {
            self.position += 1;
            self.tokens.get(self.position - 1).cloned()
        } else {
            None
        }
    }

    /// Have all tokens been consumed
    pub(crate) fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Error unless all tokens have been consumed
    pub(crate) fn finish(&self) -> Result {
        match self.tokens.get(self.position) {
            None => Ok(()),
            Some(tok) => Err(ParserError::TrailingTokens {
                got: format!("`{}`", tok.value),
                location: tok.location(),
            }),
        }
    }

    /// Location of the next token, or the end of input
    fn here(&self) -> Location {
        self.tokens
            .get(self.position)
            .map_or_else(|| self.end.clone(), TokenBuffer::location)
    }

    /// Location from the token at `start` to the last consumed token
    fn since(&self, start: usize) -> Location {
        let first = self.tokens.get(start).map(TokenBuffer::location);
        let last = self
            .position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(TokenBuffer::location);

        match (first, last) {
            (Some(first), Some(last)) if self.position > start => first.to(&last),
            (Some(first), _) => first,
            _ => self.end.clone(),
        }
    }

    /// Enter a nested production
    fn enter(&mut self) -> Result {
        if self.depth >= self.max_depth {
            return Err(ParserError::ParserDepthExceeded {
                location: self.here(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a nested production
    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run a nested production with the depth limit applied
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter()?;
        let result = f(self);
        self.leave();
        result
    }

    /// Consume a group delimited by `open` and `close`, including any nested
    /// groups of the same delimiters, returning the tokens between them.
    fn delimited(&mut self, open: TokenKind, close: TokenKind) -> Result<Block> {
        let start = self.position;
        self.next(vec![open])?;

        let mut level = 1usize;
        let first = self.position;
        loop {
            let tok = self.next(&[])?;
            if tok.kind == open {
                level += 1;
            } else if tok.kind == close {
                level -= 1;
                if level == 0 {
                    break;
                }
            }
        }

        Ok(Block {
            tokens: self.tokens[first..self.position - 1].to_vec(),
            location: self.since(start),
        })
    }

    /// Consume a `{ ... }` group
    fn braced(&mut self) -> Result<Block> {
        self.delimited(TokenKind::LeftCurly, TokenKind::RightCurly)
    }

    /// Consume tokens up to, but not including, the next token of one of the
    /// given kinds that is not nested inside brackets.  Stops at the end of
    /// input or at an unbalanced closing bracket.
    fn until(&mut self, stop: &[TokenKind]) -> Block {
        let start = self.position;
        let mut level = 0usize;

        while let Some(kind) = self.peek_kind(0) {
            if level == 0 && stop.contains(&kind) {
                break;
            }
            match kind {
                TokenKind::LeftCurly | TokenKind::LeftParen | TokenKind::LeftSquare => level += 1,
                TokenKind::RightCurly | TokenKind::RightParen | TokenKind::RightSquare => {
                    if level == 0 {
                        break;
                    }
                    level -= 1;
                }
                _ => (),
            }
            self.position += 1;
        }

        Block {
            tokens: self.tokens[start..self.position].to_vec(),
            location: self.since(start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::Features, lexer::Lexer};

    pub(crate) fn tokens(source: &str) -> Vec<TokenBuffer> {
        Lexer::new(SourceId::new(0), source, Features::default())
            .run()
            .unwrap()
    }

    pub(crate) fn block(source: &str) -> Block {
        let tokens = tokens(source);
        Block {
            location: Location::new(SourceId::new(0), 0..source.len()),
            tokens,
        }
    }

    #[test]
    fn delimited_groups_nest() {
        let toks = tokens("{ a { b } c } d");
        let mut ast = Ast::default();
        let block = Block {
            tokens: toks,
            location: Location::new(SourceId::new(0), 0..15),
        };
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);

        let inner = parser.braced().unwrap();
        assert_eq!(
            inner.tokens.iter().map(|t| t.value.as_str()).collect::<Vec<_>>(),
            vec!["a", "{", "b", "}", "c"]
        );
        assert_eq!(inner.location.span, 0..13);
        assert!(parser.finish().is_err());
    }

    #[test]
    fn until_stops_at_top_level_separator() {
        let block = block("a (b, c) , d");
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);

        let first = parser.until(&[TokenKind::Comma]);
        assert_eq!(first.tokens.len(), 6);
        assert!(parser.eat(TokenKind::Comma).is_some());
    }

    #[test]
    fn depth_limit() {
        let block = block("a");
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 1);

        let err = parser
            .nested(|p| p.nested(|_| Ok(())))
            .unwrap_err();
        assert!(matches!(err, ParserError::ParserDepthExceeded { .. }));
    }
}
