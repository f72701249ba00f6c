use tracing::trace;

use crate::{
    ast::{
        Component, FieldSetting, NamedNumber, Reference, ReferenceShape, TypeId, TypeKind, ValueId,
        ValueKind,
    },
    location::Location,
};

use super::{
    object::setting_meaning, resolve::Meaning, AnalysisContext, AnalysisError, Entity,
    ReferenceChain,
};

impl AnalysisContext<'_> {
    /// Check that a value fits a type.  Value references are followed, a value
    /// defined in terms of itself is reported as circular.  Returns false if
    /// the value cannot be given the type at all; problems inside a value that
    /// does fit are reported without changing the result.
    pub(crate) fn check_value(&mut self, ty: TypeId, value: ValueId, chain: &mut ReferenceChain) -> bool {
        let name = match &self.ast[value].kind {
            ValueKind::Reference(reference) => reference.to_string(),
            other => other.describe().to_string(),
        };

        let result = chain.scoped(Entity::Value(value), name, |chain| self.check_value_inner(ty, value, chain));
        result.unwrap_or_else(|circular| {
            self.report_circular(circular);
            false
        })
    }

    fn check_value_inner(&mut self, ty: TypeId, value: ValueId, chain: &mut ReferenceChain) -> bool {
        let Some(last) = self.type_last(ty, chain) else {
            return false;
        };
        let ty_kind = self.ast[last].kind.clone();
        let kind = self.ast[value].kind.clone();
        let location = self.ast[value].location.clone();

        if let ValueKind::Reference(reference) = &kind {
            return self.check_value_reference(ty, &ty_kind, value, reference, chain);
        }
        if let TypeKind::ClassField { .. } = ty_kind {
            return match self.class_field_value_type(last, chain) {
                Some(fixed) => self.check_value_inner(fixed, value, chain),
                None => true,
            };
        }

        let fits = match (&ty_kind, &kind) {
            (TypeKind::Open(_), _) => true,

            (TypeKind::Boolean, ValueKind::Boolean(_))
            | (TypeKind::Null, ValueKind::Null)
            | (TypeKind::Integer(_), ValueKind::Integer(_))
            | (TypeKind::Real, ValueKind::Integer(_) | ValueKind::Braced(_))
            | (TypeKind::BitString(_), ValueKind::BString(_) | ValueKind::HString(_))
            | (TypeKind::OctetString, ValueKind::BString(_) | ValueKind::HString(_))
            | (TypeKind::ObjectIdentifier, ValueKind::Braced(_))
            | (TypeKind::String(_), ValueKind::CString(_) | ValueKind::Braced(_)) => true,

            (TypeKind::BitString(bits), ValueKind::Braced(items)) => {
                self.check_named_bits(bits, items);
                true
            }
            (TypeKind::Sequence(components) | TypeKind::Set(components), ValueKind::Braced(items)) => {
                self.check_components(last, components, items, &location, chain);
                true
            }
            (TypeKind::SequenceOf(element) | TypeKind::SetOf(element), ValueKind::Braced(items)) => {
                for item in items {
                    if let [single] = item.as_slice() {
                        self.check_value(*element, *single, chain);
                    }
                }
                true
            }
            (TypeKind::Choice(components), ValueKind::Choice(name, inner)) => {
                match components.iter().find(|c| c.name.name == name.name) {
                    Some(component) => {
                        self.check_value(component.ty, *inner, chain);
                    }
                    None => self.report(AnalysisError::UnknownComponent {
                        name: name.name.clone(),
                        ty: self.ast[last].segment.clone(),
                        location: name.location.clone(),
                    }),
                }
                true
            }

            _ => false,
        };

        if !fits {
            self.report(AnalysisError::ValueType {
                expected: ty_kind.keyword().to_string(),
                found: kind.describe(),
                location,
            });
        }
        fits
    }

    /// A reference used as a value: an enumeration item or named number of
    /// the type, or a value assignment checked against the same type
    fn check_value_reference(
        &mut self,
        ty: TypeId,
        ty_kind: &TypeKind,
        value: ValueId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> bool {
        let scope = self.ast[value].scope;

        if reference.module.is_none() && reference.fields.is_empty() {
            let name = &reference.name.name;
            let local = match ty_kind {
                TypeKind::Enumerated(items) => items.iter().any(|i| &i.name == name),
                TypeKind::Integer(named) => named.iter().any(|n| &n.name.name == name),
                _ => false,
            };
            if local {
                trace!(name = %name, "value names an item of its type");
                return true;
            }

            if let TypeKind::Enumerated(_) = ty_kind {
                if self.find(scope, reference).is_err() {
                    self.report(AnalysisError::UnknownEnumItem {
                        name: name.clone(),
                        location: reference.location.clone(),
                    });
                    return false;
                }
            }
        }

        let target = match reference.shape() {
            ReferenceShape::FromObject => match self.field_target(scope, reference, chain) {
                Some(FieldSetting::Value(target)) => Some(target),
                Some(other) => {
                    self.report(AnalysisError::ReferenceKind {
                        name: reference.to_string(),
                        expected: "value",
                        found: setting_meaning(&other),
                        location: reference.location.clone(),
                    });
                    None
                }
                None => None,
            },
            _ => match self.meaning(scope, reference, chain) {
                Meaning::Value(target) => Some(target),
                Meaning::Erroneous => None,
                other => {
                    self.report(AnalysisError::ReferenceKind {
                        name: reference.to_string(),
                        expected: "value",
                        found: other.describe(),
                        location: reference.location.clone(),
                    });
                    None
                }
            },
        };

        match target {
            Some(target) => self.check_value(ty, target, chain),
            None => false,
        }
    }

    /// `{ bit, bit }` naming bits of a BIT STRING
    fn check_named_bits(&mut self, bits: &[NamedNumber], items: &[Vec<ValueId>]) {
        for item in items {
            let [single] = item.as_slice() else {
                continue;
            };
            let ValueKind::Reference(reference) = &self.ast[*single].kind else {
                continue;
            };
            if !bits.iter().any(|b| b.name.name == reference.name.name) {
                let error = AnalysisError::UnknownEnumItem {
                    name: reference.name.name.clone(),
                    location: reference.location.clone(),
                };
                self.report(error);
            }
        }
    }

    /// `{ name value, ... }` against the components of a SEQUENCE or SET
    fn check_components(
        &mut self,
        ty: TypeId,
        components: &[Component],
        items: &[Vec<ValueId>],
        location: &Location,
        chain: &mut ReferenceChain,
    ) {
        let mut given = vec![];

        for item in items {
            let [name, value] = item.as_slice() else {
                continue;
            };
            let ValueKind::Reference(reference) = &self.ast[*name].kind else {
                continue;
            };
            let name = reference.name.clone();

            match components.iter().find(|c| c.name.name == name.name) {
                Some(component) => {
                    given.push(name.name.clone());
                    self.check_value(component.ty, *value, chain);
                }
                None => self.report(AnalysisError::UnknownComponent {
                    name: name.name,
                    ty: self.ast[ty].segment.clone(),
                    location: name.location,
                }),
            }
        }

        for component in components {
            if !component.optional && component.default.is_none() && !given.contains(&component.name.name) {
                self.report(AnalysisError::MissingComponent {
                    name: component.name.name.clone(),
                    location: location.clone(),
                });
            }
        }
    }
}
