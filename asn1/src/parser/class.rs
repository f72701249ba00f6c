use indexmap::IndexMap;

use crate::{
    ast::{
        ClassId, ClassSyntax, FieldDefault, FieldKind, FieldSpec, Governor, Ident,
        ObjectClass, SyntaxNode,
    },
    token::TokenKind,
};

use super::{Parser, ParserError, Result};

impl Parser<'_> {
    /// `CLASS { fields } [WITH SYNTAX { ... }]`
    pub(crate) fn class_definition(&mut self, name: &str) -> Result<ClassId> {
        let start = self.position;
        self.next(&[TokenKind::KwClass])?;
        self.next(&[TokenKind::LeftCurly])?;

        let mut fields = IndexMap::new();
        loop {
            let field = self.field_spec()?;
            if fields.contains_key(&field.name.name) {
                return Err(ParserError::DuplicateField {
                    name: field.name.name,
                    location: field.name.location,
                });
            }
            fields.insert(field.name.name.clone(), field);

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        let syntax = if self.eat(TokenKind::KwWith).is_some() {
            self.next(&[TokenKind::KwSyntax])?;
            ClassSyntax::Unparsed(self.braced()?)
        } else {
            ClassSyntax::Default
        };

        Ok(self.ast.add_class(ObjectClass {
            fields,
            syntax,
            name: name.to_string(),
            scope: self.scope,
            location: self.since(start),
            last_checked: None,
        }))
    }

    /// A single field specification within a class definition
    fn field_spec(&mut self) -> Result<FieldSpec> {
        let start = self.position;
        let tok = self.next(&[TokenKind::TypeField, TokenKind::ValueField])?;
        let value_field = tok.kind == TokenKind::ValueField;

        let kind = match self.peek_kind(0) {
            Some(
                TokenKind::Comma
                | TokenKind::RightCurly
                | TokenKind::KwOptional
                | TokenKind::KwDefault
                | TokenKind::KwUnique,
            ) if !value_field => FieldKind::Type,
            Some(TokenKind::TypeField | TokenKind::ValueField) => {
                return Err(ParserError::Unsupported {
                    what: "variable-type value field",
                    location: self.here(),
                });
            }
            _ => match self.governor()? {
                Governor::Reference(reference) => FieldKind::Undecided(reference),
                Governor::Type(ty) if value_field => FieldKind::Value(ty),
                Governor::Type(ty) => FieldKind::ValueSet(ty),
            },
        };

        let mut spec = FieldSpec {
            name: Ident::from_token(&tok),
            kind,
            optional: false,
            unique: false,
            default: None,
            location: tok.location(),
        };

        loop {
            if self.eat(TokenKind::KwUnique).is_some() {
                spec.unique = true;
            } else if self.eat(TokenKind::KwOptional).is_some() {
                spec.optional = true;
            } else if self.eat(TokenKind::KwDefault).is_some() {
                let block = self.until(&[TokenKind::Comma, TokenKind::RightCurly]);
                spec.default = Some(FieldDefault {
                    location: block.location.clone(),
                    block: Some(block),
                    setting: None,
                });
            } else {
                break;
            }
        }

        spec.location = self.since(start);
        Ok(spec)
    }

    /// The contents of a `WITH SYNTAX` block
    pub(crate) fn with_syntax(&mut self) -> Result<Vec<SyntaxNode>> {
        self.syntax_nodes(false)
    }

    fn syntax_nodes(&mut self, in_group: bool) -> Result<Vec<SyntaxNode>> {
        let mut nodes = vec![];

        while let Some(kind) = self.peek_kind(0) {
            let start = self.position;
            let node = match kind {
                TokenKind::RightSquare if in_group => break,
                TokenKind::LeftSquare => {
                    self.next(&[])?;
                    let inner = self.nested(|p| p.syntax_nodes(true))?;
                    self.next(&[TokenKind::RightSquare])?;
                    SyntaxNode::Optional(inner, self.since(start))
                }
                TokenKind::TypeField | TokenKind::ValueField => {
                    SyntaxNode::Setting(Ident::from_token(&self.next(&[])?))
                }
                _ => {
                    let tok = self.peek(&[])?;
                    if tok.kind != TokenKind::Comma && !tok.is_syntax_word() {
                        return Err(ParserError::Expected {
                            kind: (&[
                                TokenKind::UpperReference,
                                TokenKind::TypeField,
                                TokenKind::ValueField,
                                TokenKind::LeftSquare,
                                TokenKind::Comma,
                            ])
                                .into(),
                            got: format!("`{}`", tok.value),
                            location: tok.location(),
                        });
                    }
                    self.next(&[])?;
                    SyntaxNode::Literal(tok.value.clone(), tok.location())
                }
            };
            nodes.push(node);
        }

        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Ast, ClassSyntax, FieldKind, ScopeId, SyntaxNode},
        parser::{tests::block, Parser, ParserError},
    };

    #[test]
    fn field_kinds_and_flags() {
        let block = block(
            "CLASS {
                &code INTEGER UNIQUE,
                &ArgType OPTIONAL,
                &Values INTEGER,
                &other OTHER-CLASS,
                &priority INTEGER OPTIONAL DEFAULT 5
            } WITH SYNTAX { CODE &code [ARGUMENT &ArgType] }",
        );
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);
        let class = parser.class_definition("OPERATION").unwrap();
        parser.finish().unwrap();

        let fields = &ast[class].fields;
        let syntax = &ast[class].syntax;
        assert_eq!(fields.len(), 5);
        assert!(fields["&code"].unique);
        assert!(matches!(fields["&code"].kind, FieldKind::Value(_)));
        assert!(matches!(fields["&ArgType"].kind, FieldKind::Type));
        assert!(fields["&ArgType"].optional);
        assert!(matches!(fields["&Values"].kind, FieldKind::ValueSet(_)));
        assert!(matches!(fields["&other"].kind, FieldKind::Undecided(_)));

        let priority = &fields["&priority"];
        assert!(priority.optional);
        assert_eq!(priority.default.as_ref().unwrap().block.as_ref().unwrap().tokens.len(), 1);
        assert!(matches!(syntax, ClassSyntax::Unparsed(_)));
    }

    #[test]
    fn duplicate_fields() {
        let block = block("CLASS { &id INTEGER, &id BOOLEAN }");
        let mut ast = Ast::default();
        let err = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .class_definition("C")
            .unwrap_err();
        assert!(matches!(err, ParserError::DuplicateField { .. }));
    }

    #[test]
    fn syntax_tree() {
        let block = block("&Type IDENTIFIED BY &id [, HAS PROPERTY &property]");
        let mut ast = Ast::default();
        let nodes = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .with_syntax()
            .unwrap();

        assert_eq!(nodes.len(), 5);
        assert!(matches!(&nodes[0], SyntaxNode::Setting(id) if id.name == "&Type"));
        assert!(matches!(&nodes[1], SyntaxNode::Literal(word, _) if word == "IDENTIFIED"));
        let SyntaxNode::Optional(group, _) = &nodes[4] else {
            panic!("expected optional group");
        };
        assert!(matches!(&group[0], SyntaxNode::Literal(word, _) if word == ","));
        assert_eq!(group.len(), 4);
    }
}
