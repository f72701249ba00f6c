use crate::{
    ast::{AtNotation, Block, ClassId, Ident, ObjectSetElement},
    token::TokenKind,
};

use super::{Parser, ParserError, Result};

impl Parser<'_> {
    /// The inside of an object set definition.  Returns the elements in
    /// source order and whether an extension marker was present.
    pub(crate) fn object_set_spec(
        &mut self,
        owner: &str,
        governor: Option<ClassId>,
    ) -> Result<(Vec<ObjectSetElement>, bool)> {
        let mut elements = vec![];
        let mut extensible = false;

        while !self.is_eof() {
            if self.eat(TokenKind::Ellipsis).is_some() {
                extensible = true;
            } else {
                self.element_union(&mut elements, owner, governor)?;
            }

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.finish()?;
        Ok((elements, extensible))
    }

    /// `element | element UNION element ...`
    fn element_union(
        &mut self,
        elements: &mut Vec<ObjectSetElement>,
        owner: &str,
        governor: Option<ClassId>,
    ) -> Result {
        loop {
            self.element(elements, owner, governor)?;

            if self.eat(TokenKind::Pipe).is_none() && self.eat(TokenKind::KwUnion).is_none() {
                break;
            }
        }

        if self.at(TokenKind::Caret)
            || self.at(TokenKind::KwIntersection)
            || self.at(TokenKind::KwExcept)
        {
            return Err(ParserError::Unsupported {
                what: "intersection and exclusion of object sets",
                location: self.here(),
            });
        }

        Ok(())
    }

    fn element(
        &mut self,
        elements: &mut Vec<ObjectSetElement>,
        owner: &str,
        governor: Option<ClassId>,
    ) -> Result {
        self.nested(|p| {
            if p.eat(TokenKind::LeftParen).is_some() {
                p.element_union(elements, owner, governor)?;
                p.next(&[TokenKind::RightParen])?;
                return Ok(());
            }

            let name = format!("{owner}.{}", elements.len() + 1);
            let element = if !p.at(TokenKind::LeftCurly) && p.starts_object_set_reference() {
                ObjectSetElement::Set(p.object_set_setting(&name, governor)?)
            } else {
                ObjectSetElement::Object(p.object_setting(&name, governor)?)
            };
            elements.push(element);

            Ok(())
        })
    }

    /// `@component.component, @.component, ...`
    pub(crate) fn at_notation_list(&mut self) -> Result<Vec<AtNotation>> {
        let mut notations = vec![];

        loop {
            let start = self.position;
            self.next(&[TokenKind::At])?;

            let mut level = 0;
            loop {
                match self.peek_kind(0) {
                    Some(TokenKind::Dot) => level += 1,
                    Some(TokenKind::Range) => level += 2,
                    Some(TokenKind::Ellipsis) => level += 3,
                    _ => break,
                }
                self.position += 1;
            }

            let mut components = vec![Ident::from_token(&self.next(&[TokenKind::ValueReference])?)];
            while self.eat(TokenKind::Dot).is_some() {
                components.push(Ident::from_token(&self.next(&[TokenKind::ValueReference])?));
            }

            notations.push(AtNotation {
                level,
                components,
                location: self.since(start),
            });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.finish()?;
        Ok(notations)
    }

    /// Split an actual parameter list on its top level commas
    pub(crate) fn actual_parameters(&mut self) -> Result<Vec<Block>> {
        let mut actuals = vec![];

        loop {
            let here = self.here();
            let piece = self.until(&[TokenKind::Comma]);
            if piece.tokens.is_empty() {
                return Err(ParserError::Expected {
                    kind: vec![].into(),
                    got: "an empty parameter".to_string(),
                    location: here,
                });
            }
            actuals.push(piece);

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.finish()?;
        Ok(actuals)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Ast, ObjectKind, ObjectSetElement, ScopeId},
        parser::{tests::block, Parser, ParserError},
    };

    #[test]
    fn set_elements() {
        let mut ast = Ast::default();
        let block = block("op1 | { &code 2 } | Others, ..., (op2 UNION op3)");
        let (elements, extensible) = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .object_set_spec("Ops", None)
            .unwrap();

        assert!(extensible);
        assert_eq!(elements.len(), 5);
        assert!(matches!(elements[2], ObjectSetElement::Set(_)));
        let ObjectSetElement::Object(inline) = elements[1] else {
            panic!("expected object");
        };
        assert!(matches!(ast[inline].kind, ObjectKind::Definition(_)));
        assert_eq!(ast[inline].name, "Ops.2");
    }

    #[test]
    fn empty_set() {
        let mut ast = Ast::default();
        let block = block("");
        let (elements, extensible) = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .object_set_spec("Empty", None)
            .unwrap();
        assert!(elements.is_empty());
        assert!(!extensible);
    }

    #[test]
    fn intersections_are_unsupported() {
        let mut ast = Ast::default();
        let block = block("Ops ^ Others");
        let err = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .object_set_spec("Set", None)
            .unwrap_err();
        assert!(matches!(err, ParserError::Unsupported { .. }));
    }

    #[test]
    fn at_notations() {
        let mut ast = Ast::default();
        let block = block("@code, @.id, @..a.b");
        let list = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .at_notation_list()
            .unwrap();

        let levels: Vec<_> = list.iter().map(|a| a.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
        assert_eq!(list[2].components.len(), 2);
        assert_eq!(list[2].components[1].name, "b");
    }

    #[test]
    fn actual_parameters_split_at_top_level() {
        let mut ast = Ast::default();
        let block = block("INTEGER, { a | b }, SEQUENCE { x INTEGER, y BOOLEAN }");
        let actuals = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .actual_parameters()
            .unwrap();
        assert_eq!(actuals.len(), 3);
        assert_eq!(actuals[2].tokens.len(), 8);
    }
}
