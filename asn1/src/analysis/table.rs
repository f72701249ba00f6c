//! Table constraints and component relation constraints.
//!
//! A table constraint binds an object class field type to an object set.
//! With at-notations it also names sibling components that must be
//! constrained by the same object set, and the open type it constrains gets
//! one alternative for every type its objects give the field.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::ast::{
    AtNotation, ClassId, Constraint, FieldSetting, Ident, ObjectSetDefinition, ObjectSetElement,
    ObjectSetId, ObjectSetKind, TableConstraint, Type, TypeId, TypeKind,
};

use super::{AnalysisContext, AnalysisError, ReferenceChain};

/// What a table constraint resolved to
#[derive(Debug, Clone)]
struct Table {
    /// The object set of the constraint
    set: ObjectSetId,

    /// The open type receiving alternatives, if the field is a type field
    open: Option<TypeId>,

    /// The field selected from the class
    field: Ident,
}

impl AnalysisContext<'_> {
    fn table(&self, ty: TypeId, idx: usize) -> Option<&TableConstraint> {
        self.ast[ty].constraints.get(idx)?.as_table()
    }

    fn table_mut(&mut self, ty: TypeId, idx: usize) -> Option<&mut TableConstraint> {
        match self.ast[ty].constraints.get_mut(idx)? {
            Constraint::Table(table) => Some(table),
            Constraint::Other(_) => None,
        }
    }

    /// Resolve the object set of a table constraint and bind it to the class
    /// of the constrained field.  The blocks of the constraint are parsed the
    /// first time this is called.
    fn prepare_table(&mut self, ty: TypeId, idx: usize, chain: &mut ReferenceChain) -> Option<Table> {
        let location = self.table(ty, idx)?.location.clone();

        let last = self.type_last(ty, chain)?;
        if last != ty {
            self.check_type(last, chain);
        }
        let (class, field, open) = match self.ast[last].kind.clone() {
            TypeKind::Open(open) => (open.class, open.field, true),
            TypeKind::ClassField { class, field } => (class, field, false),
            _ => {
                self.report(AnalysisError::TableConstraintTarget { location });
                return None;
            }
        };
        let class_scope = self.ast[last].scope;
        let class = self.resolve_class(class_scope, &class, chain)?;

        let open = if open {
            Some(self.constrained_type(ty, idx, last))
        } else {
            None
        };

        let set = self.table_object_set(ty, idx, class)?;
        self.parse_at_notations(ty, idx);

        self.set_object_set_governor(set, class);
        self.check_object_set(set, chain);

        Some(Table { set, open, field })
    }

    /// The open type that receives the alternatives of a constraint.  An open
    /// type reached through a type reference is shared, so the constraint
    /// gets its own copy.
    fn constrained_type(&mut self, ty: TypeId, idx: usize, last: TypeId) -> TypeId {
        if let Some(existing) = self.table(ty, idx).and_then(|t| t.constrained_type) {
            return existing;
        }

        let constrained = if last == ty {
            ty
        } else {
            let mut kind = self.ast[last].kind.clone();
            if let TypeKind::Open(open) = &mut kind {
                open.alternatives.clear();
            }
            let node = &self.ast[ty];
            let copy = Type {
                kind,
                constraints: vec![],
                parent: node.parent,
                segment: node.segment.clone(),
                scope: node.scope,
                location: node.location.clone(),
                last_checked: Some(self.timestamp()),
            };
            trace!(ty = %copy.segment, "copying open type for table constraint");
            self.ast.add_type(copy)
        };

        if let Some(table) = self.table_mut(ty, idx) {
            table.constrained_type = Some(constrained);
        }
        constrained
    }

    /// The object set of a constraint, created from its block on first use
    fn table_object_set(&mut self, ty: TypeId, idx: usize, class: ClassId) -> Option<ObjectSetId> {
        let table = self.table_mut(ty, idx)?;
        if let Some(set) = table.object_set {
            return Some(set);
        }
        let block = table.object_set_block.take()?;

        let node = &self.ast[ty];
        let (name, scope) = (format!("{}.table", node.segment), node.scope);
        let location = block.location.clone();
        let kind = ObjectSetKind::Definition(ObjectSetDefinition {
            block: Some(block),
            ..Default::default()
        });
        let set = self.new_object_set(kind, Some(class), &name, scope, location);
        debug!(ty = %self.ast[ty].segment, "created table constraint object set");

        if let Some(table) = self.table_mut(ty, idx) {
            table.object_set = Some(set);
        }
        Some(set)
    }

    fn parse_at_notations(&mut self, ty: TypeId, idx: usize) {
        let Some(block) = self.table_mut(ty, idx).and_then(|t| t.at_block.take()) else {
            return;
        };

        let scope = self.ast[ty].scope;
        match self.parse_block(&block, scope, |p| p.at_notation_list()) {
            Ok(notations) => {
                if let Some(table) = self.table_mut(ty, idx) {
                    table.at_notations = notations;
                }
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Check a table constraint.  For a component relation constraint the
    /// referenced components are checked and the alternatives of the open
    /// type are collected from the object set.
    pub(crate) fn check_table_constraint(&mut self, ty: TypeId, idx: usize, chain: &mut ReferenceChain) {
        let Some(table) = self.prepare_table(ty, idx, chain) else {
            return;
        };
        let notations = self.table(ty, idx).map(|t| t.at_notations.clone()).unwrap_or_default();
        if notations.is_empty() {
            return;
        }

        let set = self.table_set(table.set, chain);
        for notation in &notations {
            if !self.check_at_notation(ty, notation, set, chain) {
                return;
            }
        }

        let Some(open) = table.open else {
            return;
        };
        if let TypeKind::Open(open) = &mut self.ast[open].kind {
            open.alternatives.clear();
        }
        self.collect_alternatives(set, &table.field, open, &mut HashSet::new(), chain);

        let empty = match &self.ast[open].kind {
            TypeKind::Open(open) => open.alternatives.is_empty(),
            _ => false,
        };
        if empty {
            let location = self.table(ty, idx).map_or(self.ast[ty].location.clone(), |t| t.location.clone());
            self.report(AnalysisError::NoAlternatives {
                ty: self.full_name(ty),
                set: self.ast[set].name.clone(),
                field: table.field.name.clone(),
                location,
            });
        }
    }

    /// The object set a table constraint stands for.  The set created for a
    /// constraint usually only names another set, which is followed.
    fn table_set(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) -> ObjectSetId {
        self.parse_object_set(set);
        let inner = match self.ast[set].definition().map(|def| def.elements.as_slice()) {
            Some([ObjectSetElement::Set(inner)]) => Some(*inner),
            _ => None,
        };
        self.get_refd_last(inner.unwrap_or(set), chain)
    }

    /// Find the component named by an at-notation and check it is
    /// constrained by the same object set
    fn check_at_notation(
        &mut self,
        ty: TypeId,
        notation: &AtNotation,
        set: ObjectSetId,
        chain: &mut ReferenceChain,
    ) -> bool {
        let mut ancestors = vec![];
        let mut parent = self.ast[ty].parent;
        while let Some(id) = parent {
            if self.ast[id].kind.is_aggregate() {
                ancestors.push(id);
            }
            parent = self.ast[id].parent;
        }

        let start = match notation.level {
            0 => ancestors.last().copied(),
            level => ancestors.get(level - 1).copied(),
        };
        let Some(mut current) = start else {
            self.report(AnalysisError::TooManyDots {
                available: ancestors.len(),
                location: notation.location.clone(),
            });
            return false;
        };

        for component in &notation.components {
            let Some(last) = self.type_last(current, chain) else {
                return false;
            };
            let Some(components) = self.ast[last].kind.components() else {
                self.report(AnalysisError::NotAggregate {
                    ty: self.ast[last].segment.clone(),
                    location: component.location.clone(),
                });
                return false;
            };

            match components.iter().find(|c| c.name.name == component.name) {
                Some(found) => current = found.ty,
                None => {
                    self.report(AnalysisError::NoComponent {
                        name: component.name.clone(),
                        ty: self.ast[last].segment.clone(),
                        location: component.location.clone(),
                    });
                    return false;
                }
            }
        }

        let sibling = self.ast[current]
            .constraints
            .iter()
            .position(|c| matches!(c, Constraint::Table(_)));
        let same = match sibling {
            Some(idx) => match self.prepare_table(current, idx, chain) {
                Some(table) => self.table_set(table.set, chain) == set,
                None => false,
            },
            None => false,
        };

        if !same {
            self.report(AnalysisError::AtNotationMismatch {
                location: notation.location.clone(),
            });
        }
        same
    }

    /// Add an alternative to `open` for every type the objects of `set` give
    /// `field`, following nested object sets
    fn collect_alternatives(
        &mut self,
        set: ObjectSetId,
        field: &Ident,
        open: TypeId,
        visited: &mut HashSet<ObjectSetId>,
        chain: &mut ReferenceChain,
    ) {
        if !visited.insert(set) {
            return;
        }

        for object in self.flatten(set, chain) {
            match self.field_setting_with_name(object, &field.name) {
                Some(FieldSetting::Type(alternative)) => {
                    self.check_type(alternative, chain);
                    let name = self.alternative_name(alternative, chain);
                    if let TypeKind::Open(open) = &mut self.ast[open].kind {
                        open.alternatives.entry(name).or_insert(alternative);
                    }
                }
                Some(FieldSetting::ObjectSet(nested)) => {
                    let nested = self.get_refd_last(nested, chain);
                    self.collect_alternatives(nested, field, open, visited, chain);
                }
                Some(other) => {
                    trace!(field = %field.name, setting = other.describe(), "setting does not give an alternative");
                }
                None => (),
            }
        }
    }
}
