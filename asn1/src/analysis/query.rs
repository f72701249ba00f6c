//! Lookups for code generation, tools and tests.

use std::collections::HashSet;

use crate::ast::{
    ActualParameter, AssignmentId, ClassId, ObjectId, ObjectSetId, Setting, TypeId, TypeKind,
    ValueId, ValueKind,
};

use super::{resolve::Lookup, AnalysisContext, ReferenceChain};

impl AnalysisContext<'_> {
    /// Find an assignment and make sure it has been checked
    pub fn assignment(&mut self, module: &str, name: &str) -> Option<AssignmentId> {
        let id = self.ast.assignment_by_name(module, name)?;
        self.check_assignment(id, &mut ReferenceChain::new());
        Some(id)
    }

    /// What an assignment turned out to define
    pub fn setting(&mut self, module: &str, name: &str) -> Option<Setting> {
        let id = self.assignment(module, name)?;
        Some(self.ast[id].setting.clone())
    }

    /// The object class defined by an assignment
    pub fn class(&mut self, module: &str, name: &str) -> Option<ClassId> {
        match self.setting(module, name)? {
            Setting::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The object defined by an assignment
    pub fn object(&mut self, module: &str, name: &str) -> Option<ObjectId> {
        match self.setting(module, name)? {
            Setting::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The object set defined by an assignment
    pub fn object_set(&mut self, module: &str, name: &str) -> Option<ObjectSetId> {
        match self.setting(module, name)? {
            Setting::ObjectSet(set) => Some(set),
            _ => None,
        }
    }

    /// The type defined by an assignment
    pub fn ty(&mut self, module: &str, name: &str) -> Option<TypeId> {
        match self.setting(module, name)? {
            Setting::Type(ty) | Setting::ValueSet { ty, .. } | Setting::Value { ty, .. } => Some(ty),
            _ => None,
        }
    }

    /// The type reached from a type assignment through a path of component
    /// names, following type references on the way
    pub fn component_type(&mut self, module: &str, name: &str, path: &[&str]) -> Option<TypeId> {
        let mut current = self.ty(module, name)?;
        let mut chain = ReferenceChain::new();

        for step in path {
            let last = self.type_last(current, &mut chain)?;
            current = self.ast[last]
                .kind
                .components()?
                .iter()
                .find(|c| c.name.name == *step)?
                .ty;
        }

        Some(current)
    }

    /// The alternatives of an open type found through its component relation
    /// constraint, in the order they were found
    pub fn open_type_alternatives(&mut self, ty: TypeId) -> Vec<(String, TypeId)> {
        let constrained = self.ast[ty]
            .constraints
            .iter()
            .filter_map(|c| c.as_table())
            .find_map(|t| t.constrained_type)
            .unwrap_or(ty);

        match &self.ast[constrained].kind {
            TypeKind::Open(open) => open
                .alternatives
                .iter()
                .map(|(name, ty)| (name.clone(), *ty))
                .collect(),
            _ => vec![],
        }
    }

    /// Follow a value through references to value assignments and value
    /// parameters.  Nothing is reported; a reference that does not name a
    /// value is returned as is.
    pub fn value_last(&self, value: ValueId) -> ValueId {
        let mut current = value;
        let mut visited = HashSet::new();

        while visited.insert(current) {
            let ValueKind::Reference(reference) = &self.ast[current].kind else {
                break;
            };
            let next = match self.find(self.ast[current].scope, reference) {
                Ok(Lookup::Assignment(id)) => match self.ast[id].setting {
                    Setting::Value { value, .. } => value,
                    _ => break,
                },
                Ok(Lookup::Parameter(ActualParameter::Value(value))) => value,
                _ => break,
            };
            current = next;
        }

        current
    }

    /// A short human readable name for a type
    pub fn type_display(&self, ty: TypeId) -> String {
        match &self.ast[ty].kind {
            TypeKind::Reference(reference) => reference.to_string(),
            TypeKind::ClassField { class, field } => format!("{class}.{}", field.name),
            TypeKind::Open(open) => format!("{}.{}", open.class, open.field.name),
            kind if kind.is_structured() => self.full_name(ty),
            kind => kind.keyword().to_string(),
        }
    }

    /// The name an object was defined with
    pub fn object_name(&self, object: ObjectId) -> &str {
        &self.ast[object].name
    }

    /// The name of an object class
    pub fn class_name(&self, class: ClassId) -> &str {
        &self.ast[class].name
    }
}
