use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use crate::ast::{
    Constraint, FieldKind, FieldSetting, Ident, OpenType, Reference, ReferenceShape, TypeId,
    TypeKind,
};

use super::{
    chain::Circular, is_fresh, object::setting_meaning, resolve::Meaning, AnalysisContext,
    AnalysisError, Entity, ReferenceChain,
};

impl AnalysisContext<'_> {
    /// Check a type, its components and its table constraints
    pub(crate) fn check_type(&mut self, ty: TypeId, chain: &mut ReferenceChain) {
        if is_fresh(self.ast[ty].last_checked, self.timestamp()) {
            return;
        }
        self.ast[ty].last_checked = Some(self.timestamp());
        trace!(ty = %self.ast[ty].segment, kind = self.ast[ty].kind.keyword(), "checking type");

        match self.ast[ty].kind.clone() {
            TypeKind::Reference(_) => {
                if let Some(target) = self.resolve_type(ty, chain) {
                    self.check_type(target, chain);
                }
            }
            TypeKind::ClassField { class, field } => self.class_field_type(ty, &class, &field, chain),
            TypeKind::Sequence(components) | TypeKind::Set(components) | TypeKind::Choice(components) => {
                for component in components {
                    self.check_type(component.ty, chain);
                    if let Some(default) = component.default {
                        self.check_value(component.ty, default, chain);
                    }
                }
            }
            TypeKind::SequenceOf(element) | TypeKind::SetOf(element) => self.check_type(element, chain),
            _ => (),
        }

        let tables: Vec<_> = self.ast[ty]
            .constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Constraint::Table(_)))
            .map(|(idx, _)| idx)
            .collect();
        for idx in tables {
            self.check_table_constraint(ty, idx, chain);
        }
    }

    /// Turn `CLASS.&field` into an open type when the field is a type field
    fn class_field_type(&mut self, ty: TypeId, class: &Reference, field: &Ident, chain: &mut ReferenceChain) {
        let scope = self.ast[ty].scope;
        let Some(id) = self.resolve_class(scope, class, chain) else {
            return;
        };
        self.check_class(id, chain);

        let kind = self.ast[id].fields.get(&field.name).map(|spec| spec.kind.clone());
        match kind {
            Some(FieldKind::Type) => {
                trace!(ty = %self.ast[ty].segment, "object class field is an open type");
                self.ast[ty].kind = TypeKind::Open(OpenType {
                    class: class.clone(),
                    field: field.clone(),
                    alternatives: IndexMap::new(),
                });
            }
            Some(_) => (),
            None => self.report(AnalysisError::UnknownField {
                field: field.name.clone(),
                class: self.ast[id].name.clone(),
                location: field.location.clone(),
            }),
        }
    }

    /// The fixed type of a value field selected by a `CLASS.&field` type
    pub(crate) fn class_field_value_type(&mut self, ty: TypeId, chain: &mut ReferenceChain) -> Option<TypeId> {
        let TypeKind::ClassField { class, field } = self.ast[ty].kind.clone() else {
            return None;
        };
        let scope = self.ast[ty].scope;
        let id = self.resolve_class(scope, &class, chain)?;

        match self.ast[id].fields.get(&field.name)?.kind {
            FieldKind::Value(value_type) => Some(value_type),
            _ => None,
        }
    }

    /// The type directly named by a type reference
    pub(crate) fn resolve_type(&mut self, ty: TypeId, chain: &mut ReferenceChain) -> Option<TypeId> {
        let TypeKind::Reference(reference) = self.ast[ty].kind.clone() else {
            return None;
        };
        let scope = self.ast[ty].scope;

        let result = chain.scoped(Entity::Type(ty), reference.to_string(), |chain| {
            let found = match reference.shape() {
                ReferenceShape::Defined | ReferenceShape::Parameterized => {
                    match self.meaning(scope, &reference, chain) {
                        Meaning::Type(target) => return Some(target),
                        Meaning::Erroneous => return None,
                        other => other.describe(),
                    }
                }
                ReferenceShape::FromObject => match self.field_target(scope, &reference, chain)? {
                    FieldSetting::Type(target) => return Some(target),
                    other => setting_meaning(&other),
                },
                ReferenceShape::Unsupported => {
                    self.report(AnalysisError::UnsupportedReference {
                        reference: reference.to_string(),
                        location: reference.location.clone(),
                    });
                    return None;
                }
            };

            self.report(AnalysisError::ReferenceKind {
                name: reference.to_string(),
                expected: "type",
                found,
                location: reference.location.clone(),
            });
            None
        });

        match result {
            Ok(target) => target,
            Err(circular) => {
                self.report_circular(circular);
                None
            }
        }
    }

    /// Follow type references until a type that is not a reference
    pub(crate) fn type_last(&mut self, ty: TypeId, chain: &mut ReferenceChain) -> Option<TypeId> {
        let mut visited = vec![];
        let mut seen = HashSet::new();
        let mut current = ty;

        loop {
            let name = match &self.ast[current].kind {
                TypeKind::Reference(reference) => reference.to_string(),
                _ => return Some(current),
            };

            if !seen.insert(current) {
                let start = visited
                    .iter()
                    .position(|(e, _)| *e == Entity::Type(current))
                    .unwrap_or(0);
                let mut path = visited.split_off(start);
                path.push((Entity::Type(current), name));
                self.report_circular(Circular::new(path));
                return None;
            }
            visited.push((Entity::Type(current), name));

            current = self.resolve_type(current, chain)?;
        }
    }
}
