use crate::{ast::{Ident, Reference}, token::TokenKind};

use super::{Parser, Result};

/// Tokens that can start a reference
pub(super) const REFERENCE_START: &[TokenKind] = &[
    TokenKind::ValueReference,
    TokenKind::TypeReference,
    TokenKind::UpperReference,
];

impl Parser<'_> {
    /// Parse `Module.name{actual}.&field.&field`.  Lower case references only
    /// take an actual parameter list if `allow_actual` is set, as a brace
    /// after an identifier within a value starts the next value instead.
    pub(super) fn reference(&mut self, allow_actual: bool) -> Result<Reference> {
        let start = self.position;
        let first = self.next(REFERENCE_START)?;

        let (module, name) = if first.is_upper_reference()
            && self.at(TokenKind::Dot)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::ValueReference | TokenKind::TypeReference | TokenKind::UpperReference)
            ) {
            self.next(&[TokenKind::Dot])?;
            let name = self.next(REFERENCE_START)?;
            (Some(Ident::from_token(&first)), Ident::from_token(&name))
        } else {
            (None, Ident::from_token(&first))
        };

        let upper = name.name.starts_with(char::is_uppercase);
        let actual = if self.at(TokenKind::LeftCurly) && (upper || allow_actual) {
            Some(self.braced()?)
        } else {
            None
        };

        let mut fields = vec![];
        while self.at(TokenKind::Dot)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::TypeField | TokenKind::ValueField)
            )
        {
            self.next(&[TokenKind::Dot])?;
            fields.push(Ident::from_token(
                &self.next(&[TokenKind::TypeField, TokenKind::ValueField])?,
            ));
        }

        Ok(Reference {
            module,
            name,
            actual,
            fields,
            location: self.since(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Ast, ReferenceShape, ScopeId},
        parser::{tests::block, Parser},
    };

    fn reference(source: &str, allow_actual: bool) -> crate::ast::Reference {
        let block = block(source);
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);
        parser.reference(allow_actual).unwrap()
    }

    #[test]
    fn shapes() {
        assert_eq!(reference("Ops", false).shape(), ReferenceShape::Defined);
        assert_eq!(reference("M.Ops", false).shape(), ReferenceShape::Defined);
        assert_eq!(reference("Set{ Ops }", false).shape(), ReferenceShape::Parameterized);
        assert_eq!(reference("obj.&Type", false).shape(), ReferenceShape::FromObject);
        assert_eq!(reference("Set{X}.&id", false).shape(), ReferenceShape::Unsupported);
    }

    #[test]
    fn lower_case_actual_parameters_are_optional() {
        let r = reference("op{ X }", false);
        assert!(r.actual.is_none());
        let r = reference("op{ X }", true);
        assert!(r.actual.is_some());
    }

    #[test]
    fn module_prefix_and_fields() {
        let r = reference("M.obj.&Set.&Type", false);
        assert_eq!(r.module.as_ref().unwrap().name, "M");
        assert_eq!(r.name.name, "obj");
        assert_eq!(r.fields.len(), 2);
        assert_eq!(r.to_string(), "M.obj.&Set.&Type");
    }
}
