use indexmap::IndexMap;

use crate::{
    analysis::Resolved,
    ast::{
        Block, ClassId, FieldKind, FieldSetting, FieldSpec, Ident, NamedSetting, Object,
        ObjectDefinition, ObjectId, ObjectKind, ObjectSet, ObjectSetDefinition, ObjectSetId,
        ObjectSetKind, ReferencedObjectSet, SyntaxNode,
    },
    token::TokenKind,
};

use super::{Parser, ParserError, Result};

/// The settings read from an object definition
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectBody {
    /// Settings of declared fields, in the order written
    pub settings: IndexMap<String, NamedSetting>,

    /// Fields that the class does not declare.  Their settings are skipped.
    pub unknown: Vec<Ident>,
}

impl Parser<'_> {
    /// The inside of an object definition written with the default syntax,
    /// `&field setting, ...`
    pub(crate) fn default_syntax_object(
        &mut self,
        fields: &IndexMap<String, FieldSpec>,
        owner: &str,
    ) -> Result<ObjectBody> {
        let mut body = ObjectBody::default();

        while !self.is_eof() {
            let name = Ident::from_token(&self.next(&[TokenKind::TypeField, TokenKind::ValueField])?);

            match fields.get(&name.name) {
                Some(spec) => {
                    let setting = self.field_setting(&spec.kind, owner, &name.name)?;
                    insert_setting(&mut body, name, setting)?;
                }
                None => {
                    self.until(&[TokenKind::Comma]);
                    body.unknown.push(name);
                }
            }

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.finish()?;
        Ok(body)
    }

    /// The inside of an object definition written with the syntax declared by
    /// the class
    pub(crate) fn defined_syntax_object(
        &mut self,
        syntax: &[SyntaxNode],
        fields: &IndexMap<String, FieldSpec>,
        owner: &str,
    ) -> Result<ObjectBody> {
        let mut body = ObjectBody::default();
        self.syntax_match(syntax, fields, owner, &mut body)?;
        self.finish()?;
        Ok(body)
    }

    fn syntax_match(
        &mut self,
        syntax: &[SyntaxNode],
        fields: &IndexMap<String, FieldSpec>,
        owner: &str,
        body: &mut ObjectBody,
    ) -> Result {
        for node in syntax {
            match node {
                SyntaxNode::Literal(word, _) => {
                    let tok = self.peek(&[]).map_err(|_| ParserError::ExpectedWord {
                        word: word.clone(),
                        got: "end of input".to_string(),
                        location: self.here(),
                    })?;
                    if tok.value != *word {
                        return Err(ParserError::ExpectedWord {
                            word: word.clone(),
                            got: format!("`{}`", tok.value),
                            location: tok.location(),
                        });
                    }
                    self.next(&[])?;
                }
                SyntaxNode::Setting(field) => {
                    let Some(spec) = fields.get(&field.name) else {
                        // reported when the class is checked
                        continue;
                    };
                    let name = Ident {
                        name: field.name.clone(),
                        location: self.here(),
                    };
                    let setting = self.field_setting(&spec.kind, owner, &field.name)?;
                    insert_setting(body, name, setting)?;
                }
                SyntaxNode::Optional(group, _) => {
                    let present = match (group.first(), self.tokens.get(self.position)) {
                        (Some(SyntaxNode::Literal(word, _)), Some(tok)) => tok.value == *word,
                        _ => false,
                    };
                    if present {
                        self.nested(|p| p.syntax_match(group, fields, owner, body))?;
                    }
                }
            }
        }

        Ok(())
    }

    /// A single field setting.  The kind of setting is chosen from the tokens
    /// where they are unambiguous, so that a setting of the wrong kind can be
    /// reported against the field rather than as a syntax error.
    pub(crate) fn field_setting(&mut self, kind: &FieldKind, owner: &str, field: &str) -> Result<FieldSetting> {
        let segment = format!("{owner}.{field}");

        Ok(match kind {
            FieldKind::Type if self.starts_value_literal() => FieldSetting::Value(self.value()?),
            FieldKind::Type => {
                let ty = self.ty()?;
                self.ast[ty].segment = segment;
                FieldSetting::Type(ty)
            }
            FieldKind::Value(_) if self.starts_type_keyword() => {
                let ty = self.ty()?;
                self.ast[ty].segment = segment;
                FieldSetting::Type(ty)
            }
            FieldKind::Value(_) => FieldSetting::Value(self.value()?),
            FieldKind::ValueSet(_) if self.at(TokenKind::LeftCurly) => FieldSetting::ValueSet(self.braced()?),
            FieldKind::ValueSet(_) => {
                let start = self.position;
                self.reference(true)?;
                FieldSetting::ValueSet(Block {
                    tokens: self.tokens[start..self.position].to_vec(),
                    location: self.since(start),
                })
            }
            FieldKind::Object(class) | FieldKind::ObjectSet(class) => {
                let wants_set = matches!(kind, FieldKind::ObjectSet(_));
                if self.at(TokenKind::LeftCurly) {
                    if wants_set {
                        FieldSetting::ObjectSet(self.object_set_setting(&segment, Some(*class))?)
                    } else {
                        FieldSetting::Object(self.object_setting(&segment, Some(*class))?)
                    }
                } else if self.starts_value_literal() {
                    FieldSetting::Value(self.value()?)
                } else if self.starts_object_set_reference() {
                    FieldSetting::ObjectSet(self.object_set_setting(&segment, Some(*class))?)
                } else {
                    FieldSetting::Object(self.object_setting(&segment, Some(*class))?)
                }
            }
            FieldKind::Undecided(_) => {
                return Err(ParserError::Unsupported {
                    what: "setting a field whose kind is not known",
                    location: self.here(),
                })
            }
        })
    }

    /// An object, either `{ ... }` or a reference to an object
    pub(crate) fn object_setting(&mut self, name: &str, governor: Option<ClassId>) -> Result<ObjectId> {
        let start = self.position;

        let kind = if self.at(TokenKind::LeftCurly) {
            ObjectKind::Definition(ObjectDefinition {
                block: Some(self.braced()?),
                settings: IndexMap::new(),
            })
        } else {
            ObjectKind::Referenced {
                reference: self.reference(true)?,
                refd: Resolved::default(),
            }
        };

        Ok(self.ast.add_object(Object {
            kind,
            governor,
            name: name.to_string(),
            scope: self.scope,
            location: self.since(start),
            last_checked: None,
            erroneous: false,
        }))
    }

    /// An object set, either `{ ... }` or a reference to an object set
    pub(crate) fn object_set_setting(&mut self, name: &str, governor: Option<ClassId>) -> Result<ObjectSetId> {
        let start = self.position;

        let kind = if self.at(TokenKind::LeftCurly) {
            ObjectSetKind::Definition(ObjectSetDefinition {
                block: Some(self.braced()?),
                ..Default::default()
            })
        } else {
            ObjectSetKind::Referenced(ReferencedObjectSet {
                reference: self.reference(true)?,
                refd: Resolved::default(),
                fallback: None,
            })
        };

        Ok(self.ast.add_object_set(ObjectSet {
            kind,
            governor,
            name: name.to_string(),
            scope: self.scope,
            location: self.since(start),
            last_checked: None,
        }))
    }

    /// Does the next token start a value that cannot be anything else
    fn starts_value_literal(&self) -> bool {
        match self.peek_kind(0) {
            Some(
                TokenKind::Number
                | TokenKind::Hyphen
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::CString
                | TokenKind::HString
                | TokenKind::BString,
            ) => true,
            Some(TokenKind::ValueReference) => {
                !(self.peek_kind(1) == Some(TokenKind::Dot)
                    && matches!(
                        self.peek_kind(2),
                        Some(TokenKind::TypeField | TokenKind::ValueField)
                    ))
            }
            _ => false,
        }
    }

    /// Does the next token start a type that cannot be a value
    fn starts_type_keyword(&self) -> bool {
        match self.peek_kind(0) {
            Some(TokenKind::TypeReference | TokenKind::UpperReference) => !(self.peek_kind(1)
                == Some(TokenKind::Dot)
                && matches!(
                    self.peek_kind(2),
                    Some(TokenKind::ValueReference | TokenKind::ValueField)
                )),
            Some(TokenKind::ValueReference | TokenKind::KwNull) => false,
            _ => self.starts_type(),
        }
    }

    /// Does the next reference name an object set rather than an object.
    /// Object set references start with an upper case letter or select an
    /// object set field.
    pub(super) fn starts_object_set_reference(&self) -> bool {
        let mut idx = 0;
        let mut is_set = false;

        if let Some(TokenKind::TypeReference | TokenKind::UpperReference) = self.peek_kind(0) {
            is_set = true;
            if self.peek_kind(1) == Some(TokenKind::Dot)
                && matches!(
                    self.peek_kind(2),
                    Some(TokenKind::ValueReference | TokenKind::TypeReference | TokenKind::UpperReference)
                )
            {
                idx = 2;
                is_set = self.peek_kind(2) != Some(TokenKind::ValueReference);
            }
        }

        // skip an actual parameter list
        idx += 1;
        if self.peek_kind(idx) == Some(TokenKind::LeftCurly) {
            let mut level = 0usize;
            while let Some(kind) = self.peek_kind(idx) {
                idx += 1;
                match kind {
                    TokenKind::LeftCurly => level += 1,
                    TokenKind::RightCurly => {
                        level -= 1;
                        if level == 0 {
                            break;
                        }
                    }
                    _ => (),
                }
            }
        }

        // the last selected field decides
        while self.peek_kind(idx) == Some(TokenKind::Dot) {
            match self.peek_kind(idx + 1) {
                Some(TokenKind::TypeField) => is_set = true,
                Some(TokenKind::ValueField) => is_set = false,
                _ => break,
            }
            idx += 2;
        }

        is_set
    }
}

fn insert_setting(body: &mut ObjectBody, name: Ident, setting: FieldSetting) -> Result {
    if body.settings.contains_key(&name.name) {
        return Err(ParserError::DuplicateField {
            name: name.name,
            location: name.location,
        });
    }

    body.settings
        .insert(name.name.clone(), NamedSetting { name, setting });
    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::{
        ast::{Ast, FieldSetting, FieldSpec, ScopeId},
        parser::{tests::block, Parser, ParserError},
    };

    fn class_fields(ast: &mut Ast, source: &str) -> IndexMap<String, FieldSpec> {
        let block = block(source);
        let mut parser = Parser::block(&block, ast, ScopeId::new(0), 100);
        let class = parser.class_definition("OPERATION").unwrap();
        ast[class].fields.clone()
    }

    #[test]
    fn default_syntax() {
        let mut ast = Ast::default();
        let fields = class_fields(&mut ast, "CLASS { &code INTEGER, &ArgType, &Errors ERROR OPTIONAL }");

        let block = block("&code 1, &ArgType SEQUENCE { a INTEGER }, &unknown 5");
        let body = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .default_syntax_object(&fields, "op1")
            .unwrap();

        assert_eq!(body.settings.len(), 2);
        assert!(matches!(body.settings["&code"].setting, FieldSetting::Value(_)));
        let FieldSetting::Type(ty) = body.settings["&ArgType"].setting else {
            panic!("expected type setting");
        };
        assert_eq!(ast[ty].segment, "op1.&ArgType");
        assert_eq!(body.unknown.len(), 1);
        assert_eq!(body.unknown[0].name, "&unknown");
    }

    #[test]
    fn wrong_kind_is_parsed_as_what_it_looks_like() {
        let mut ast = Ast::default();
        let fields = class_fields(&mut ast, "CLASS { &code INTEGER, &ArgType }");

        let block = block("&code BOOLEAN, &ArgType 5");
        let body = Parser::block(&block, &mut ast, ScopeId::new(0), 100)
            .default_syntax_object(&fields, "op1")
            .unwrap();

        assert!(matches!(body.settings["&code"].setting, FieldSetting::Type(_)));
        assert!(matches!(body.settings["&ArgType"].setting, FieldSetting::Value(_)));
    }

    #[test]
    fn defined_syntax_with_optional_groups() {
        let mut ast = Ast::default();
        let class_block = block(
            "CLASS { &code INTEGER, &ArgType OPTIONAL, &Errors ERROR OPTIONAL }
             WITH SYNTAX { CODE &code [ARGUMENT &ArgType] [ERRORS &Errors] }",
        );
        let mut parser = Parser::block(&class_block, &mut ast, ScopeId::new(0), 100);
        let class = parser.class_definition("OPERATION").unwrap();
        let crate::ast::ClassSyntax::Unparsed(syntax_block) = ast[class].syntax.clone() else {
            panic!("expected WITH SYNTAX");
        };
        let mut fields = ast[class].fields.clone();
        // decided by analysis in real use
        fields["&Errors"].kind = crate::ast::FieldKind::ObjectSet(crate::ast::ClassId::new(0));

        let syntax = Parser::block(&syntax_block, &mut ast, ScopeId::new(0), 100)
            .with_syntax()
            .unwrap();

        let object = block("CODE 7 ERRORS { err1 | Others }");
        let body = Parser::block(&object, &mut ast, ScopeId::new(0), 100)
            .defined_syntax_object(&syntax, &fields, "op")
            .unwrap();
        assert_eq!(body.settings.len(), 2);
        assert!(matches!(body.settings["&Errors"].setting, FieldSetting::ObjectSet(_)));

        let object = block("CODE 7 ARGUMENTS INTEGER");
        let err = Parser::block(&object, &mut ast, ScopeId::new(0), 100)
            .defined_syntax_object(&syntax, &fields, "op")
            .unwrap_err();
        assert!(matches!(err, ParserError::TrailingTokens { .. }));
    }

    #[test]
    fn object_set_references_are_recognised() {
        let mut ast = Ast::default();
        for (source, is_set) in [
            ("Ops", true),
            ("op1", false),
            ("M.Ops", true),
            ("M.op1", false),
            ("obj.&Errors", true),
            ("obj.&error", false),
            ("Set{ X }.&obj", false),
        ] {
            let block = block(source);
            let parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);
            assert_eq!(parser.starts_object_set_reference(), is_set, "{source}");
        }
    }
}
