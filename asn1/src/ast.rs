//! Arena-allocated semantic model of ASN.1 modules, including the
//! information object system: classes, objects and object sets.
//!
//! Every node is owned by the [`Ast`] and referred to by a copyable id.  Nodes
//! that are produced lazily (object set blocks, object definition blocks,
//! instantiated parameterized assignments) are appended to the same arena
//! when they are first needed.

mod class;
mod ids;
mod module;
mod object;
mod object_set;
mod reference;
mod ty;
mod value;

use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

use crate::{location::Location, token::TokenBuffer};

pub use self::{
    class::{ClassSyntax, FieldDefault, FieldKind, FieldSpec, ObjectClass, SyntaxNode},
    ids::{AssignmentId, ClassId, ModuleId, ObjectId, ObjectSetId, ScopeId, TypeId, ValueId},
    module::{
        ActualParameter, Assignment, AssignmentBody, FormalParameter, Governor, Import, Module,
        Scope, Setting,
    },
    object::{FieldSetting, NamedSetting, Object, ObjectDefinition, ObjectKind},
    object_set::{
        DefinitionState, ObjectSet, ObjectSetDefinition, ObjectSetElement, ObjectSetKind,
        ReferencedObjectSet,
    },
    reference::{Reference, ReferenceShape},
    ty::{
        AtNotation, Component, Constraint, NamedNumber, OpenType, StringKind, TableConstraint,
        Type, TypeKind,
    },
    value::{Value, ValueKind},
};

/// An identifier together with where it was written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The (normalised) name
    pub name: String,

    /// Location of the identifier in the source
    pub location: Location,
}

impl Ident {
    /// Create an identifier from a token
    pub(crate) fn from_token(tok: &TokenBuffer) -> Self {
        Self {
            name: tok.value.clone(),
            location: tok.location(),
        }
    }
}

/// A brace delimited group of tokens whose meaning is only known once the
/// names inside it have been resolved.  The tokens exclude the braces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    /// Tokens between the delimiters
    pub tokens: Vec<TokenBuffer>,

    /// Location including the delimiters
    pub location: Location,
}

/// Owner of every node in every parsed module
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub(crate) modules: Vec<Module>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) types: Vec<Type>,
    pub(crate) values: Vec<Value>,
    pub(crate) classes: Vec<ObjectClass>,
    pub(crate) objects: Vec<Object>,
    pub(crate) object_sets: Vec<ObjectSet>,

    /// Instances of parameterized assignments, keyed by the assignment and
    /// the location of the reference that instantiated it
    pub(crate) instances: HashMap<(AssignmentId, Location), AssignmentId>,
}

/// Sizes of every arena at some point, used to undo a failed parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AstMark {
    modules: usize,
    scopes: usize,
    assignments: usize,
    types: usize,
    values: usize,
    classes: usize,
    objects: usize,
    object_sets: usize,
}

macro_rules! arena {
    ($($id:ident => $field:ident, $node:ident, $add:ident;)*) => {
        $(
            impl Index<$id> for Ast {
                type Output = $node;

                fn index(&self, id: $id) -> &$node {
                    &self.$field[id.index()]
                }
            }

            impl IndexMut<$id> for Ast {
                fn index_mut(&mut self, id: $id) -> &mut $node {
                    &mut self.$field[id.index()]
                }
            }

            impl Ast {
                /// Add a new node to the arena, returning its id
                pub(crate) fn $add(&mut self, node: $node) -> $id {
                    let id = $id::new(self.$field.len());
                    self.$field.push(node);
                    id
                }
            }
        )*
    };
}

arena! {
    ModuleId => modules, Module, add_module;
    ScopeId => scopes, Scope, add_scope;
    AssignmentId => assignments, Assignment, add_assignment;
    TypeId => types, Type, add_type;
    ValueId => values, Value, add_value;
    ClassId => classes, ObjectClass, add_class;
    ObjectId => objects, Object, add_object;
    ObjectSetId => object_sets, ObjectSet, add_object_set;
}

impl Ast {
    /// All modules that have been parsed
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(ModuleId::new)
    }

    /// The module that a scope is nested within
    pub fn scope_module(&self, scope: ScopeId) -> ModuleId {
        self[scope].module
    }

    /// Find a module by name
    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.modules().find(|&id| self[id].name.name == name)
    }

    /// Find an assignment by module and assignment name
    pub fn assignment_by_name(&self, module: &str, name: &str) -> Option<AssignmentId> {
        let module = self.module_by_name(module)?;
        self[module].assignments.get(name).copied()
    }

    /// Record the current size of the arenas
    pub(crate) fn mark(&self) -> AstMark {
        AstMark {
            modules: self.modules.len(),
            scopes: self.scopes.len(),
            assignments: self.assignments.len(),
            types: self.types.len(),
            values: self.values.len(),
            classes: self.classes.len(),
            objects: self.objects.len(),
            object_sets: self.object_sets.len(),
        }
    }

    /// Remove every node added since `mark` was taken
    pub(crate) fn rollback(&mut self, mark: AstMark) {
        self.modules.truncate(mark.modules);
        self.scopes.truncate(mark.scopes);
        self.assignments.truncate(mark.assignments);
        self.types.truncate(mark.types);
        self.values.truncate(mark.values);
        self.classes.truncate(mark.classes);
        self.objects.truncate(mark.objects);
        self.object_sets.truncate(mark.object_sets);
    }
}
