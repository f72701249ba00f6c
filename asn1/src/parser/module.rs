use indexmap::IndexMap;

use crate::{
    ast::{
        Assignment, AssignmentBody, Ast, Block, FormalParameter, Governor, Ident, Import, Module,
        ModuleId, Scope, ScopeId, Setting,
    },
    compiler::SourceId,
    token::TokenKind,
};

use super::{Parser, ParserError, Result};

/// Tokens that can start an assignment name
const ASSIGNMENT_NAME: &[TokenKind] = &[
    TokenKind::ValueReference,
    TokenKind::TypeReference,
    TokenKind::UpperReference,
];

/// Create the scope for the module that is about to be parsed
pub(super) fn module_scope(ast: &mut Ast) -> ScopeId {
    let module = ModuleId::new(ast.modules.len());
    ast.add_scope(Scope {
        module,
        parameters: IndexMap::new(),
    })
}

impl Parser<'_> {
    /// Parse a single ASN.1 module definition
    pub(super) fn module_definition(&mut self, source: SourceId) -> Result {
        let name = Ident::from_token(&self.next(&[TokenKind::TypeReference, TokenKind::UpperReference])?);

        if self.at(TokenKind::LeftCurly) {
            // definitive object identifier, not needed for name resolution
            self.braced()?;
        }
        self.eat(TokenKind::CString);

        self.next(&[TokenKind::KwDefinitions])?;
        self.module_defaults()?;
        self.next(&[TokenKind::Assignment])?;
        self.next(&[TokenKind::KwBegin])?;

        self.exports()?;
        let imports = self.imports()?;

        let module = self.ast.add_module(Module {
            name,
            source,
            scope: self.scope,
            assignments: IndexMap::new(),
            imports,
            duplicates: vec![],
        });
        debug_assert_eq!(module, self.ast.scope_module(self.scope));

        while !self.at(TokenKind::KwEnd) {
            self.assignment()?;
        }
        self.next(&[TokenKind::KwEnd])?;

        Ok(())
    }

    /// The bit between the `DEFINITIONS` keyword and the assignment
    fn module_defaults(&mut self) -> Result {
        if self.at(TokenKind::TypeReference) || self.at(TokenKind::UpperReference) {
            self.next(&[])?;
            self.next(&[TokenKind::KwInstructions])?;
        }

        if self.eat(TokenKind::KwExplicit).is_some()
            || self.eat(TokenKind::KwImplicit).is_some()
            || self.eat(TokenKind::KwAutomatic).is_some()
        {
            self.next(&[TokenKind::KwTags])?;
        }

        if self.eat(TokenKind::KwExtensibility).is_some() {
            self.next(&[TokenKind::KwImplied])?;
        }

        Ok(())
    }

    /// Exported symbols section.  Everything is visible to importers, so the
    /// list itself is skipped.
    fn exports(&mut self) -> Result {
        if self.eat(TokenKind::KwExports).is_none() {
            return Ok(());
        }

        self.until(&[TokenKind::SemiColon]);
        self.next(&[TokenKind::SemiColon])?;

        Ok(())
    }

    /// Parse the list of imported symbols
    fn imports(&mut self) -> Result<Vec<Import>> {
        if self.eat(TokenKind::KwImports).is_none() {
            return Ok(vec![]);
        }

        let mut imports = vec![];
        while !self.at(TokenKind::SemiColon) {
            let mut symbols = vec![];
            loop {
                let tok = self.next(ASSIGNMENT_NAME)?;
                symbols.push(Ident::from_token(&tok));

                // `Name{}` marks a parameterized symbol
                if self.at(TokenKind::LeftCurly) {
                    self.braced()?;
                }

                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }

            self.next(&[TokenKind::KwFrom])?;
            let module = Ident::from_token(
                &self.next(&[TokenKind::TypeReference, TokenKind::UpperReference])?,
            );
            self.assigned_identifier()?;

            imports.push(Import { symbols, module });
        }
        self.next(&[TokenKind::SemiColon])?;

        Ok(imports)
    }

    /// Optional identifier of an imported module, either an object identifier
    /// value or a defined value
    fn assigned_identifier(&mut self) -> Result {
        if self.at(TokenKind::LeftCurly) {
            self.braced()?;
        } else if self.at(TokenKind::ValueReference)
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::Comma | TokenKind::KwFrom | TokenKind::LeftCurly)
            )
        {
            self.next(&[])?;
        }

        if self.eat(TokenKind::KwWith).is_some() {
            self.next(&[TokenKind::UpperReference])?;
        }

        Ok(())
    }

    /// Parse a single assignment to a name
    fn assignment(&mut self) -> Result {
        let start = self.position;
        let name = Ident::from_token(&self.next(ASSIGNMENT_NAME)?);

        let parameters = if self.at(TokenKind::LeftCurly) {
            self.formal_parameters()?
        } else {
            vec![]
        };

        let tail_start = self.position;
        let (governor, body, tail) = if parameters.is_empty() {
            let (governor, body) = self.assignment_body(&name)?;
            (governor, body, None)
        } else {
            // The body is only meaningful once the parameters are known, it
            // is parsed here to find where it ends and again per instance.
            let mark = self.ast.mark();
            self.assignment_body(&name)?;
            self.ast.rollback(mark);

            let tail = Block {
                tokens: self.tokens[tail_start..self.position].to_vec(),
                location: self.since(tail_start),
            };
            (None, AssignmentBody::Deferred, Some(tail))
        };

        let assignment = Assignment {
            name: name.clone(),
            scope: self.scope,
            parameters,
            governor,
            body,
            tail,
            setting: Setting::Unclassified,
            instance_of: None,
            last_checked: None,
            location: self.since(start),
        };
        let id = self.ast.add_assignment(assignment);

        let module = self.ast.scope_module(self.scope);
        let module = &mut self.ast[module];
        if module.assignments.contains_key(&name.name) {
            module.duplicates.push(id);
        } else {
            module.assignments.insert(name.name, id);
        }

        Ok(())
    }

    /// Parse everything after the name (and formal parameters) of an
    /// assignment.  Also used to parse instances of parameterized
    /// assignments.
    pub(crate) fn assignment_body(&mut self, name: &Ident) -> Result<(Option<Governor>, AssignmentBody)> {
        let upper = name.name.starts_with(char::is_uppercase);

        if !upper && self.at(TokenKind::Assignment) {
            let tok = self.peek(&[])?;
            return Err(ParserError::Expected {
                kind: vec![TokenKind::TypeReference, TokenKind::UpperReference].into(),
                got: format!("`{}`", tok.value),
                location: tok.location(),
            });
        }

        if self.eat(TokenKind::Assignment).is_some() {
            let body = if self.at(TokenKind::KwClass) {
                AssignmentBody::Class(self.class_definition(&name.name)?)
            } else if self.at(TokenKind::TypeReference) || self.at(TokenKind::UpperReference) {
                let start = self.position;
                let reference = self.reference(true)?;
                if reference.fields.is_empty() && !self.at(TokenKind::LeftParen) {
                    AssignmentBody::Reference(reference)
                } else {
                    let ty = self.reference_type(reference, start)?;
                    self.ast[ty].segment = name.name.clone();
                    AssignmentBody::Type(ty)
                }
            } else {
                let ty = self.ty()?;
                self.ast[ty].segment = name.name.clone();
                AssignmentBody::Type(ty)
            };

            return Ok((None, body));
        }

        let governor = self.governor()?;
        self.next(&[TokenKind::Assignment])?;

        let body = if self.at(TokenKind::LeftCurly) {
            AssignmentBody::Block(self.braced()?)
        } else if self.starts_value_reference() {
            AssignmentBody::Reference(self.reference(true)?)
        } else if upper {
            AssignmentBody::Reference(self.reference(true)?)
        } else {
            AssignmentBody::Value(self.value()?)
        };

        Ok((Some(governor), body))
    }

    /// Is the next token the start of a value or object reference rather than
    /// a literal value
    fn starts_value_reference(&self) -> bool {
        match (self.peek_kind(0), self.peek_kind(1), self.peek_kind(2)) {
            (Some(TokenKind::ValueReference), next, _) => next != Some(TokenKind::Colon),
            (
                Some(TokenKind::TypeReference | TokenKind::UpperReference),
                Some(TokenKind::Dot),
                Some(TokenKind::ValueReference),
            ) => true,
            _ => false,
        }
    }

    /// The type or class written before `::=`, or before `:` in a formal
    /// parameter
    pub(super) fn governor(&mut self) -> Result<Governor> {
        if self.at(TokenKind::TypeReference) || self.at(TokenKind::UpperReference) {
            let start = self.position;
            let reference = self.reference(true)?;
            if reference.fields.is_empty() && !self.at(TokenKind::LeftParen) {
                return Ok(Governor::Reference(reference));
            }
            return Ok(Governor::Type(self.reference_type(reference, start)?));
        }

        Ok(Governor::Type(self.ty()?))
    }

    /// `{ Type, CLASS : Set, INTEGER : value }`
    fn formal_parameters(&mut self) -> Result<Vec<FormalParameter>> {
        self.next(&[TokenKind::LeftCurly])?;

        let mut parameters = vec![];
        loop {
            let governor = if matches!(
                self.peek_kind(1),
                Some(TokenKind::Comma | TokenKind::RightCurly)
            ) {
                None
            } else {
                let governor = self.governor()?;
                self.next(&[TokenKind::Colon])?;
                Some(governor)
            };

            let name = Ident::from_token(&self.next(ASSIGNMENT_NAME)?);
            parameters.push(FormalParameter { governor, name });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{AssignmentBody, Ast, Governor},
        compiler::SourceId,
        parser::{parse_source, tests::tokens},
    };

    fn parse(source: &str) -> Ast {
        let mut ast = Ast::default();
        parse_source(&tokens(source), &mut ast, SourceId::new(0), 100).unwrap();
        ast
    }

    #[test]
    fn module_header_and_imports() {
        let ast = parse(
            "M { iso 1 } DEFINITIONS AUTOMATIC TAGS ::= BEGIN
                EXPORTS ALL;
                IMPORTS OPERATION, op1 FROM Ops { 1 2 } Other{} FROM X;
                T ::= INTEGER
            END",
        );

        let module = ast.module_by_name("M").unwrap();
        let imports = &ast[module].imports;
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].module.name, "Ops");
        assert_eq!(imports[0].symbols.len(), 2);
        assert_eq!(imports[1].symbols[0].name, "Other");
        assert!(ast.assignment_by_name("M", "T").is_some());
    }

    #[test]
    fn assignment_forms() {
        let ast = parse(
            "M DEFINITIONS ::= BEGIN
                Alias ::= OPERATION
                op1 OPERATION ::= { &code 1 }
                Ops OPERATION ::= { op1 }
                v INTEGER ::= 5
                w INTEGER ::= v
                C ::= CLASS { &id INTEGER }
                T ::= SEQUENCE { a INTEGER }
            END",
        );

        let body = |name| &ast[ast.assignment_by_name("M", name).unwrap()].body;
        assert!(matches!(body("Alias"), AssignmentBody::Reference(_)));
        assert!(matches!(body("op1"), AssignmentBody::Block(_)));
        assert!(matches!(body("Ops"), AssignmentBody::Block(_)));
        assert!(matches!(body("v"), AssignmentBody::Value(_)));
        assert!(matches!(body("w"), AssignmentBody::Reference(_)));
        assert!(matches!(body("C"), AssignmentBody::Class(_)));
        assert!(matches!(body("T"), AssignmentBody::Type(_)));

        let op1 = &ast[ast.assignment_by_name("M", "op1").unwrap()];
        assert!(matches!(&op1.governor, Some(Governor::Reference(r)) if r.name.name == "OPERATION"));
    }

    #[test]
    fn parameterized_assignments_keep_their_tail() {
        let ast = parse(
            "M DEFINITIONS ::= BEGIN
                Wrapper { OPERATION : Set } ::= SEQUENCE { code OPERATION.&code ({Set}) }
            END",
        );

        let id = ast.assignment_by_name("M", "Wrapper").unwrap();
        let assignment = &ast[id];
        assert_eq!(assignment.parameters.len(), 1);
        assert_eq!(assignment.parameters[0].name.name, "Set");
        assert!(matches!(assignment.body, AssignmentBody::Deferred));
        assert_eq!(assignment.tail.as_ref().unwrap().tokens[0].value, "::=");
        // nothing from the body is kept in the arena
        assert!(ast.types.is_empty());
    }

    #[test]
    fn duplicate_assignments_are_recorded() {
        let ast = parse(
            "M DEFINITIONS ::= BEGIN
                T ::= INTEGER
                T ::= BOOLEAN
            END",
        );

        let module = ast.module_by_name("M").unwrap();
        assert_eq!(ast[module].assignments.len(), 1);
        assert_eq!(ast[module].duplicates.len(), 1);
    }

    #[test]
    fn value_assignment_requires_a_type() {
        let mut ast = Ast::default();
        let result = parse_source(
            &tokens("M DEFINITIONS ::= BEGIN a ::= 5 END"),
            &mut ast,
            SourceId::new(0),
            100,
        );
        assert!(result.is_err());
    }
}
