use crate::{
    ast::{Ident, Value, ValueId, ValueKind},
    location::Location,
    token::{TokenBuffer, TokenKind},
};

use super::{Parser, ParserError, Result};

/// Tokens that can start a value
pub(super) const VALUE_START: &[TokenKind] = &[
    TokenKind::Number,
    TokenKind::Hyphen,
    TokenKind::KwTrue,
    TokenKind::KwFalse,
    TokenKind::KwNull,
    TokenKind::CString,
    TokenKind::HString,
    TokenKind::BString,
    TokenKind::LeftCurly,
    TokenKind::ValueReference,
    TokenKind::TypeReference,
    TokenKind::UpperReference,
];

impl Parser<'_> {
    /// Parse a value.  Braced values are not interpreted, as their meaning
    /// depends on the type they are checked against.
    pub(crate) fn value(&mut self) -> Result<ValueId> {
        self.nested(Self::value_inner)
    }

    fn value_inner(&mut self) -> Result<ValueId> {
        let start = self.position;
        let tok = self.peek(VALUE_START)?;

        let kind = match tok.kind {
            TokenKind::Number => {
                self.next(&[])?;
                ValueKind::Integer(number(tok)?)
            }
            TokenKind::Hyphen => {
                self.next(&[])?;
                let tok = self.next(&[TokenKind::Number])?;
                ValueKind::Integer(-number(&tok)?)
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.next(&[])?;
                ValueKind::Boolean(tok.kind == TokenKind::KwTrue)
            }
            TokenKind::KwNull => {
                self.next(&[])?;
                ValueKind::Null
            }
            TokenKind::CString => {
                self.next(&[])?;
                let inner = &tok.value[1..tok.value.len() - 1];
                ValueKind::CString(inner.replace("\"\"", "\""))
            }
            TokenKind::HString => {
                self.next(&[])?;
                ValueKind::HString(quoted_digits(&tok.value))
            }
            TokenKind::BString => {
                self.next(&[])?;
                ValueKind::BString(quoted_digits(&tok.value))
            }
            TokenKind::LeftCurly => ValueKind::Braced(self.braced_value()?),
            TokenKind::ValueReference if self.peek_kind(1) == Some(TokenKind::Colon) => {
                let name = Ident::from_token(&self.next(&[])?);
                self.next(&[TokenKind::Colon])?;
                ValueKind::Choice(name, self.value()?)
            }
            TokenKind::ValueReference if self.peek_kind(1) == Some(TokenKind::LeftParen) => {
                let name = Ident::from_token(&self.next(&[])?);
                self.next(&[TokenKind::LeftParen])?;
                let negative = self.eat(TokenKind::Hyphen).is_some();
                let value = number(&self.next(&[TokenKind::Number])?)?;
                self.next(&[TokenKind::RightParen])?;
                ValueKind::NamedNumber(name, if negative { -value } else { value })
            }
            _ => ValueKind::Reference(self.reference(false)?),
        };

        Ok(self.ast.add_value(Value {
            kind,
            scope: self.scope,
            location: self.since(start),
        }))
    }

    /// The inside of a braced value whose braces were removed when the
    /// assignment was first parsed
    pub(crate) fn value_block(&mut self, location: Location) -> Result<ValueId> {
        let mut items = vec![];
        while !self.is_eof() {
            let mut item = vec![];
            while !self.is_eof() && !self.at(TokenKind::Comma) {
                item.push(self.value()?);
            }
            items.push(item);

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.finish()?;

        Ok(self.ast.add_value(Value {
            kind: ValueKind::Braced(items),
            scope: self.scope,
            location,
        }))
    }

    /// `{ item, item }` where each item is a sequence of values
    fn braced_value(&mut self) -> Result<Vec<Vec<ValueId>>> {
        self.next(&[TokenKind::LeftCurly])?;

        let mut items = vec![];
        if self.eat(TokenKind::RightCurly).is_some() {
            return Ok(items);
        }

        loop {
            let mut item = vec![];
            while !self.at(TokenKind::Comma) && !self.at(TokenKind::RightCurly) {
                item.push(self.value()?);
            }
            items.push(item);

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        Ok(items)
    }
}

/// Parse the text of a number token
fn number(tok: &TokenBuffer) -> Result<i128> {
    tok.value.parse().map_err(|_| ParserError::NumberRange {
        value: tok.value.clone(),
        location: tok.location(),
    })
}

/// The digits of `'...'H` or `'...'B`, without whitespace
fn quoted_digits(value: &str) -> String {
    value
        .trim_start_matches('\'')
        .trim_end_matches(['H', 'B'])
        .trim_end_matches('\'')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Ast, ScopeId, ValueKind},
        parser::{tests::block, Parser, ParserError},
    };

    fn parse(source: &str) -> (Ast, ValueKind) {
        let block = block(source);
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);
        let value = parser.value().unwrap();
        parser.finish().unwrap();
        let kind = ast[value].kind.clone();
        (ast, kind)
    }

    #[test]
    fn literals() {
        assert!(matches!(parse("-42").1, ValueKind::Integer(-42)));
        assert!(matches!(parse("TRUE").1, ValueKind::Boolean(true)));
        assert!(matches!(parse(r#""a""b""#).1, ValueKind::CString(s) if s == "a\"b"));
        assert!(matches!(parse("'0A 1F'H").1, ValueKind::HString(s) if s == "0A1F"));
        assert!(matches!(parse("'0101'B").1, ValueKind::BString(s) if s == "0101"));
    }

    #[test]
    fn braced_items() {
        let (ast, kind) = parse("{ iso standard(0) 8571, other { a 1 } }");
        let ValueKind::Braced(items) = kind else {
            panic!("expected braced value");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].len(), 3);
        assert!(matches!(&ast[items[0][1]].kind, ValueKind::NamedNumber(n, 0) if n.name == "standard"));
        assert_eq!(items[1].len(), 2);
    }

    #[test]
    fn choice_and_references() {
        assert!(matches!(parse("alt : 5").1, ValueKind::Choice(..)));
        assert!(matches!(parse("op.&code").1, ValueKind::Reference(r) if r.fields.len() == 1));
        assert!(matches!(parse("M.value").1, ValueKind::Reference(r) if r.module.is_some()));
    }

    #[test]
    fn number_out_of_range() {
        let block = block("999999999999999999999999999999999999999999");
        let mut ast = Ast::default();
        let err = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .value()
            .unwrap_err();
        assert!(matches!(err, ParserError::NumberRange { .. }));
    }
}
