use crate::{
    ast::{
        Block, Component, Constraint, Ident, NamedNumber, Reference, StringKind, TableConstraint,
        Type, TypeId, TypeKind,
    },
    location::Location,
    token::{TokenBuffer, TokenKind},
};

use super::{Parser, ParserError, Result};

/// Tokens that can start a type
const TYPE_START: &[TokenKind] = &[
    TokenKind::LeftSquare,
    TokenKind::KwBoolean,
    TokenKind::KwNull,
    TokenKind::KwInteger,
    TokenKind::KwReal,
    TokenKind::KwBit,
    TokenKind::KwOctet,
    TokenKind::KwObject,
    TokenKind::KwEnumerated,
    TokenKind::KwSequence,
    TokenKind::KwSet,
    TokenKind::KwChoice,
    TokenKind::KwBmpString,
    TokenKind::KwGeneralString,
    TokenKind::KwGraphicString,
    TokenKind::KwIA5String,
    TokenKind::KwNumericString,
    TokenKind::KwPrintableString,
    TokenKind::KwTeletexString,
    TokenKind::KwUniversalString,
    TokenKind::KwUTF8String,
    TokenKind::KwVisibleString,
    TokenKind::KwGeneralizedTime,
    TokenKind::KwUTCTime,
    TokenKind::KwObjectDescriptor,
    TokenKind::TypeReference,
    TokenKind::UpperReference,
    TokenKind::ValueReference,
];

/// Segment used for the element type of SEQUENCE OF and SET OF
pub(crate) const ELEMENT_SEGMENT: &str = "item";

impl Parser<'_> {
    /// Can the next token start a type
    pub(super) fn starts_type(&self) -> bool {
        self.peek_kind(0).is_some_and(|k| TYPE_START.contains(&k))
    }

    /// Parse a type, including any constraints after it
    pub(crate) fn ty(&mut self) -> Result<TypeId> {
        self.nested(Self::ty_inner)
    }

    fn ty_inner(&mut self) -> Result<TypeId> {
        let start = self.position;

        while self.at(TokenKind::LeftSquare) {
            // tags do not affect information object analysis
            self.delimited(TokenKind::LeftSquare, TokenKind::RightSquare)?;
            if self.eat(TokenKind::KwImplicit).is_none() {
                self.eat(TokenKind::KwExplicit);
            }
        }

        let tok = self.next(TYPE_START)?;
        let mut constraints = vec![];

        let kind = match tok.kind {
            TokenKind::KwBoolean => TypeKind::Boolean,
            TokenKind::KwNull => TypeKind::Null,
            TokenKind::KwReal => TypeKind::Real,
            TokenKind::KwInteger => TypeKind::Integer(self.named_numbers()?),
            TokenKind::KwBit => {
                self.next(&[TokenKind::KwString])?;
                TypeKind::BitString(self.named_numbers()?)
            }
            TokenKind::KwOctet => {
                self.next(&[TokenKind::KwString])?;
                TypeKind::OctetString
            }
            TokenKind::KwObject => {
                self.next(&[TokenKind::KwIdentifier])?;
                TypeKind::ObjectIdentifier
            }
            TokenKind::KwEnumerated => TypeKind::Enumerated(self.enumeration()?),
            TokenKind::KwChoice => TypeKind::Choice(self.components()?),
            TokenKind::KwSequence | TokenKind::KwSet => {
                let set = tok.kind == TokenKind::KwSet;
                if self.at(TokenKind::LeftCurly) {
                    let components = self.components()?;
                    if set {
                        TypeKind::Set(components)
                    } else {
                        TypeKind::Sequence(components)
                    }
                } else {
                    if self.at(TokenKind::LeftParen) {
                        constraints.push(self.constraint()?);
                    } else if self.at(TokenKind::KwSize) {
                        let size_start = self.position;
                        self.next(&[TokenKind::KwSize])?;
                        self.delimited(TokenKind::LeftParen, TokenKind::RightParen)?;
                        constraints.push(Constraint::Other(Block {
                            tokens: self.tokens[size_start..self.position].to_vec(),
                            location: self.since(size_start),
                        }));
                    }
                    self.next(&[TokenKind::KwOf])?;

                    // named element, `SEQUENCE OF item Type`
                    if self.at(TokenKind::ValueReference) && self.peek_kind(1) != Some(TokenKind::Dot) {
                        self.next(&[])?;
                    }

                    let element = self.ty()?;
                    if set {
                        TypeKind::SetOf(element)
                    } else {
                        TypeKind::SequenceOf(element)
                    }
                }
            }
            TokenKind::TypeReference | TokenKind::UpperReference | TokenKind::ValueReference => {
                self.position -= 1;
                let reference = self.reference(true)?;
                return self.reference_type(reference, start);
            }
            kind => match string_kind(kind) {
                Some(kind) => TypeKind::String(kind),
                None => {
                    return Err(ParserError::Expected {
                        kind: TYPE_START.into(),
                        got: format!("`{}`", tok.value),
                        location: tok.location(),
                    })
                }
            },
        };

        self.finish_type(kind, constraints, start)
    }

    /// Build a type from a reference that has already been parsed.  Field
    /// selections from an all upper case name are object class field types,
    /// anything else is left to name resolution.
    pub(super) fn reference_type(&mut self, reference: Reference, start: usize) -> Result<TypeId> {
        let is_class = !reference.name.name.chars().any(char::is_lowercase);

        let kind = if is_class && reference.actual.is_none() && !reference.fields.is_empty() {
            if reference.fields.len() > 1 {
                return Err(ParserError::Unsupported {
                    what: "selecting a field through an object field of a class",
                    location: reference.location,
                });
            }
            TypeKind::ClassField {
                field: reference.fields[0].clone(),
                class: reference.without_fields(),
            }
        } else {
            TypeKind::Reference(reference)
        };

        self.finish_type(kind, vec![], start)
    }

    /// Parse trailing constraints and add the type to the arena, linking any
    /// directly nested types back to it
    fn finish_type(&mut self, kind: TypeKind, mut constraints: Vec<Constraint>, start: usize) -> Result<TypeId> {
        while self.at(TokenKind::LeftParen) {
            constraints.push(self.constraint()?);
        }

        let children: Vec<_> = match &kind {
            TypeKind::Sequence(c) | TypeKind::Set(c) | TypeKind::Choice(c) => {
                c.iter().map(|c| (c.ty, c.name.name.clone())).collect()
            }
            TypeKind::SequenceOf(t) | TypeKind::SetOf(t) => vec![(*t, ELEMENT_SEGMENT.to_string())],
            _ => vec![],
        };

        let id = self.ast.add_type(Type {
            kind,
            constraints,
            parent: None,
            segment: String::new(),
            scope: self.scope,
            location: self.since(start),
            last_checked: None,
        });

        for (child, segment) in children {
            self.ast[child].parent = Some(id);
            self.ast[child].segment = segment;
        }

        Ok(id)
    }

    /// `{ a(1), b(-2), c(value) }` after INTEGER or BIT STRING
    fn named_numbers(&mut self) -> Result<Vec<NamedNumber>> {
        if self.eat(TokenKind::LeftCurly).is_none() {
            return Ok(vec![]);
        }

        let mut numbers = vec![];
        loop {
            let name = Ident::from_token(&self.next(&[TokenKind::ValueReference])?);
            self.next(&[TokenKind::LeftParen])?;
            let value = self.value()?;
            self.next(&[TokenKind::RightParen])?;
            numbers.push(NamedNumber { name, value });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        Ok(numbers)
    }

    /// `{ a, b(5), ..., c }`
    fn enumeration(&mut self) -> Result<Vec<Ident>> {
        self.next(&[TokenKind::LeftCurly])?;

        let mut items = vec![];
        loop {
            if self.eat(TokenKind::Ellipsis).is_some() {
                if self.eat(TokenKind::Exclamation).is_some() {
                    self.until(&[TokenKind::Comma, TokenKind::RightCurly]);
                }
            } else {
                let name = self.next(&[TokenKind::ValueReference])?;
                items.push(Ident::from_token(&name));
                if self.at(TokenKind::LeftParen) {
                    self.delimited(TokenKind::LeftParen, TokenKind::RightParen)?;
                }
            }

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        Ok(items)
    }

    /// The components of a SEQUENCE, SET or CHOICE
    fn components(&mut self) -> Result<Vec<Component>> {
        self.next(&[TokenKind::LeftCurly])?;

        let mut components = vec![];
        if self.eat(TokenKind::RightCurly).is_some() {
            return Ok(components);
        }

        loop {
            self.component_item(&mut components)?;
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.next(&[TokenKind::RightCurly])?;

        Ok(components)
    }

    /// A single entry in a component list: a component, an extension marker
    /// or an extension addition group
    fn component_item(&mut self, components: &mut Vec<Component>) -> Result {
        if self.eat(TokenKind::Ellipsis).is_some() {
            if self.eat(TokenKind::Exclamation).is_some() {
                self.until(&[TokenKind::Comma, TokenKind::RightCurly]);
            }
            return Ok(());
        }

        if self.at(TokenKind::LeftSquare) && self.peek_kind(1) == Some(TokenKind::LeftSquare) {
            self.next(&[TokenKind::LeftSquare])?;
            self.next(&[TokenKind::LeftSquare])?;
            if self.at(TokenKind::Number) {
                self.next(&[TokenKind::Number])?;
                self.next(&[TokenKind::Colon])?;
            }
            loop {
                self.component_item(components)?;
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.next(&[TokenKind::RightSquare])?;
            self.next(&[TokenKind::RightSquare])?;
            return Ok(());
        }

        if self.at(TokenKind::KwComponents) {
            let start = self.position;
            self.next(&[TokenKind::KwComponents])?;
            self.next(&[TokenKind::KwOf])?;
            self.ty()?;
            tracing::debug!(location = %self.since(start), "COMPONENTS OF is not expanded");
            return Ok(());
        }

        let name = Ident::from_token(&self.next(&[TokenKind::ValueReference])?);
        let ty = self.ty()?;

        let mut component = Component {
            name,
            ty,
            optional: false,
            default: None,
        };
        if self.eat(TokenKind::KwOptional).is_some() {
            component.optional = true;
        } else if self.eat(TokenKind::KwDefault).is_some() {
            component.default = Some(self.value()?);
        }

        components.push(component);
        Ok(())
    }

    /// A parenthesised constraint.  Table constraints are recognised, all
    /// other constraints are kept as tokens.
    pub(super) fn constraint(&mut self) -> Result<Constraint> {
        let block = self.delimited(TokenKind::LeftParen, TokenKind::RightParen)?;
        let tokens = &block.tokens;

        let Some(first_end) = matching_curly(tokens, 0) else {
            return Ok(Constraint::Other(block));
        };

        let at_block = if first_end + 1 == tokens.len() {
            None
        } else {
            match matching_curly(tokens, first_end + 1) {
                Some(end) if end + 1 == tokens.len() => {
                    Some(inner_block(&tokens[first_end + 1..=end], &block.location))
                }
                _ => return Ok(Constraint::Other(block)),
            }
        };

        Ok(Constraint::Table(TableConstraint {
            object_set_block: Some(inner_block(&tokens[..=first_end], &block.location)),
            at_block,
            object_set: None,
            at_notations: vec![],
            constrained_type: None,
            location: block.location,
        }))
    }
}

/// Index of the `}` closing the `{` at `open`
fn matching_curly(tokens: &[TokenBuffer], open: usize) -> Option<usize> {
    if tokens.get(open)?.kind != TokenKind::LeftCurly {
        return None;
    }

    let mut level = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::LeftCurly => level += 1,
            TokenKind::RightCurly => {
                level -= 1;
                if level == 0 {
                    return Some(idx);
                }
            }
            _ => (),
        }
    }

    None
}

/// Block for the inside of a braced token group, which starts and ends with
/// the braces
fn inner_block(group: &[TokenBuffer], fallback: &Location) -> Block {
    match group {
        [first, inner @ .., last] => Block {
            tokens: inner.to_vec(),
            location: first.location().to(&last.location()),
        },
        _ => Block {
            tokens: vec![],
            location: fallback.clone(),
        },
    }
}

fn string_kind(kind: TokenKind) -> Option<StringKind> {
    Some(match kind {
        TokenKind::KwBmpString => StringKind::Bmp,
        TokenKind::KwGeneralString => StringKind::General,
        TokenKind::KwGraphicString => StringKind::Graphic,
        TokenKind::KwIA5String => StringKind::IA5,
        TokenKind::KwNumericString => StringKind::Numeric,
        TokenKind::KwPrintableString => StringKind::Printable,
        TokenKind::KwTeletexString => StringKind::Teletex,
        TokenKind::KwUniversalString => StringKind::Universal,
        TokenKind::KwUTF8String => StringKind::Utf8,
        TokenKind::KwVisibleString => StringKind::Visible,
        TokenKind::KwGeneralizedTime => StringKind::GeneralizedTime,
        TokenKind::KwUTCTime => StringKind::UtcTime,
        TokenKind::KwObjectDescriptor => StringKind::ObjectDescriptor,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Ast, Constraint, ScopeId, TypeId, TypeKind},
        parser::{tests::block, Parser},
    };

    fn parse(source: &str) -> (Ast, TypeId) {
        let block = block(source);
        let mut ast = Ast::default();
        let mut parser = Parser::block(&block, &mut ast, ScopeId::new(0), 100);
        let ty = parser.ty().unwrap();
        parser.finish().unwrap();
        (ast, ty)
    }

    #[test]
    fn sequence_components_link_to_parent() {
        let (ast, ty) = parse(
            "SEQUENCE { code INTEGER, arg [0] OPERATION.&ArgType OPTIONAL, ..., flag BOOLEAN DEFAULT TRUE }",
        );

        let components = ast[ty].kind.components().unwrap();
        assert_eq!(components.len(), 3);
        assert!(components[1].optional);
        assert!(components[2].default.is_some());

        let arg = components[1].ty;
        assert_eq!(ast[arg].parent, Some(ty));
        assert_eq!(ast[arg].segment, "arg");
        assert!(matches!(&ast[arg].kind, TypeKind::ClassField { field, .. } if field.name == "&ArgType"));
    }

    #[test]
    fn table_constraints_are_recognised() {
        let (ast, ty) = parse("OPERATION.&ArgType ({Ops}{@code, @.id}) (SIZE(1..2))");

        let constraints = &ast[ty].constraints;
        assert_eq!(constraints.len(), 2);
        let table = constraints[0].as_table().unwrap();
        assert_eq!(table.object_set_block.as_ref().unwrap().tokens.len(), 1);
        assert_eq!(table.at_block.as_ref().unwrap().tokens.len(), 6);
        assert!(matches!(constraints[1], Constraint::Other(_)));
    }

    #[test]
    fn sequence_of_with_size() {
        let (ast, ty) = parse("SEQUENCE SIZE (1..10) OF item INTEGER");
        let TypeKind::SequenceOf(element) = ast[ty].kind else {
            panic!("expected SEQUENCE OF");
        };
        assert!(matches!(ast[element].kind, TypeKind::Integer(_)));
        assert_eq!(ast[ty].constraints.len(), 1);
    }

    #[test]
    fn extension_groups_and_enumerations() {
        let (ast, ty) = parse(
            "CHOICE { a ENUMERATED { x, y(3), ... }, ..., [[ 2: b BIT STRING { f(0) } ]] }",
        );
        let components = ast[ty].kind.components().unwrap();
        assert_eq!(components.len(), 2);
        let TypeKind::Enumerated(items) = &ast[components[0].ty].kind else {
            panic!("expected ENUMERATED");
        };
        assert_eq!(items.len(), 2);
    }
}
