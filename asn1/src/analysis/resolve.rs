//! Name lookup, classification of assignments and instantiation of
//! parameterized assignments.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    ast::{
        ActualParameter, Assignment, AssignmentBody, AssignmentId, Block, ClassId, FormalParameter,
        Governor, ObjectDefinition, ObjectId, ObjectKind, ObjectSetDefinition, ObjectSetId,
        ObjectSetKind, Reference, ReferencedObjectSet, Scope, ScopeId, Setting, TypeId, TypeKind,
        Value, ValueId, ValueKind,
    },
    compiler::PRELUDE_MODULE,
    parser::Parser,
    token::TokenKind,
};

use super::{is_fresh, AnalysisContext, AnalysisError, Entity, ReferenceChain, Resolved, Result};

/// Where a name was found
#[derive(Debug, Clone)]
pub(crate) enum Lookup {
    /// A module level assignment
    Assignment(AssignmentId),

    /// An actual parameter of the instance being resolved
    Parameter(ActualParameter),
}

/// What a reference stands for once its assignment has been classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Meaning {
    Type(TypeId),
    Value(ValueId),
    ValueSet,
    Class(ClassId),
    Object(ObjectId),
    ObjectSet(ObjectSetId),

    /// Not resolvable, the problem has already been reported
    Erroneous,
}

/// The governor of an assignment or formal parameter, once resolved
enum GovernorKind {
    Type(TypeId),
    Class(ClassId),
    Erroneous,
}

impl Meaning {
    /// Description for diagnostics
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Meaning::Type(_) => "a type",
            Meaning::Value(_) => "a value",
            Meaning::ValueSet => "a value set",
            Meaning::Class(_) => "an object class",
            Meaning::Object(_) => "an object",
            Meaning::ObjectSet(_) => "an object set",
            Meaning::Erroneous => "erroneous",
        }
    }
}

impl From<&Setting> for Meaning {
    fn from(value: &Setting) -> Self {
        match value {
            Setting::Type(ty) => Meaning::Type(*ty),
            Setting::Value { value, .. } => Meaning::Value(*value),
            Setting::ValueSet { .. } => Meaning::ValueSet,
            Setting::Class(class) => Meaning::Class(*class),
            Setting::Object(object) => Meaning::Object(*object),
            Setting::ObjectSet(set) => Meaning::ObjectSet(*set),
            Setting::Unclassified | Setting::Parameterized | Setting::Erroneous => Meaning::Erroneous,
        }
    }
}

impl From<&ActualParameter> for Meaning {
    fn from(value: &ActualParameter) -> Self {
        match value {
            ActualParameter::Type(ty) => Meaning::Type(*ty),
            ActualParameter::Value(value) => Meaning::Value(*value),
            ActualParameter::ValueSet(_) => Meaning::ValueSet,
            ActualParameter::Class(class) => Meaning::Class(*class),
            ActualParameter::Object(object) => Meaning::Object(*object),
            ActualParameter::ObjectSet(set) => Meaning::ObjectSet(*set),
        }
    }
}

impl AnalysisContext<'_> {
    /// Find the assignment or parameter a reference names, without reporting
    /// anything.  Names are looked up in the parameters of the scope, then the
    /// module, then its imports, then the built-in prelude.
    pub(crate) fn find(&self, scope: ScopeId, reference: &Reference) -> Result<Lookup> {
        let name = &reference.name.name;
        let not_found = || AnalysisError::UnknownReference {
            name: name.clone(),
            location: reference.name.location.clone(),
        };

        if let Some(module) = &reference.module {
            let Some(module_id) = self.ast.module_by_name(&module.name) else {
                return Err(AnalysisError::UnknownModule {
                    name: module.name.clone(),
                    location: module.location.clone(),
                });
            };
            return self.ast[module_id]
                .assignments
                .get(name)
                .copied()
                .map(Lookup::Assignment)
                .ok_or_else(not_found);
        }

        let scope = &self.ast[scope];
        if let Some(actual) = scope.parameters.get(name) {
            return Ok(Lookup::Parameter(actual.clone()));
        }

        let module = &self.ast[scope.module];
        if let Some(&id) = module.assignments.get(name) {
            return Ok(Lookup::Assignment(id));
        }

        for import in &module.imports {
            if !import.symbols.iter().any(|s| &s.name == name) {
                continue;
            }

            let Some(from) = self.ast.module_by_name(&import.module.name) else {
                return Err(AnalysisError::UnknownModule {
                    name: import.module.name.clone(),
                    location: import.module.location.clone(),
                });
            };
            return self.ast[from]
                .assignments
                .get(name)
                .copied()
                .map(Lookup::Assignment)
                .ok_or_else(not_found);
        }

        self.ast
            .module_by_name(PRELUDE_MODULE)
            .and_then(|prelude| self.ast[prelude].assignments.get(name).copied())
            .map(Lookup::Assignment)
            .ok_or_else(not_found)
    }

    /// Resolve a defined or parameterized reference to what it names,
    /// classifying the assignment and instantiating it if required
    pub(crate) fn meaning(
        &mut self,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Meaning {
        let found = match self.find(scope, reference) {
            Ok(found) => found,
            Err(e) => {
                self.report(e);
                return Meaning::Erroneous;
            }
        };

        let id = match found {
            Lookup::Parameter(actual) => {
                if reference.actual.is_some() {
                    self.report(AnalysisError::NotParameterized {
                        name: reference.name.name.clone(),
                        location: reference.location.clone(),
                    });
                }
                return Meaning::from(&actual);
            }
            Lookup::Assignment(id) => id,
        };

        let parameterized = !self.ast[id].parameters.is_empty();
        let id = match (&reference.actual, parameterized) {
            (Some(_), true) => match self.instantiate(id, scope, reference, chain) {
                Some(instance) => instance,
                None => return Meaning::Erroneous,
            },
            (Some(_), false) => {
                self.report(AnalysisError::NotParameterized {
                    name: reference.name.name.clone(),
                    location: reference.location.clone(),
                });
                id
            }
            (None, true) => {
                self.report(AnalysisError::MissingParameters {
                    name: reference.name.name.clone(),
                    location: reference.location.clone(),
                });
                return Meaning::Erroneous;
            }
            (None, false) => id,
        };

        self.classify(id, chain);
        Meaning::from(&self.ast[id].setting)
    }

    /// Resolve a reference that must name an object class
    pub(crate) fn resolve_class(
        &mut self,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Option<ClassId> {
        match self.meaning(scope, reference, chain) {
            Meaning::Class(class) => Some(class),
            Meaning::Erroneous => None,
            other => {
                self.report(AnalysisError::ReferenceKind {
                    name: reference.to_string(),
                    expected: "object class",
                    found: other.describe(),
                    location: reference.location.clone(),
                });
                None
            }
        }
    }

    /// Check an assignment and everything it defines
    pub(crate) fn check_assignment(&mut self, id: AssignmentId, chain: &mut ReferenceChain) {
        if is_fresh(self.ast[id].last_checked, self.timestamp()) {
            return;
        }
        self.ast[id].last_checked = Some(self.timestamp());
        self.classify(id, chain);

        let setting = self.ast[id].setting.clone();
        trace!(name = %self.ast[id].name.name, setting = setting.describe(), "checking assignment");

        match setting {
            Setting::Type(ty) | Setting::ValueSet { ty, .. } => self.check_type(ty, chain),
            Setting::Value { ty, value } => {
                self.check_type(ty, chain);
                self.check_value(ty, value, chain);
            }
            Setting::Class(class) => self.check_class(class, chain),
            Setting::Object(object) => self.check_object(object, chain),
            Setting::ObjectSet(set) => self.check_object_set(set, chain),
            Setting::Unclassified | Setting::Parameterized | Setting::Erroneous => (),
        }
    }

    /// Decide what an assignment defines.  Classification follows references
    /// between assignments, a cycle makes every assignment in it erroneous.
    pub(crate) fn classify(&mut self, id: AssignmentId, chain: &mut ReferenceChain) {
        if !matches!(self.ast[id].setting, Setting::Unclassified) {
            return;
        }

        let name = self.ast[id].name.name.clone();
        let setting = match chain.scoped(Entity::Assignment(id), name, |chain| {
            self.classify_body(id, chain)
        }) {
            Ok(setting) => setting,
            Err(circular) => {
                self.report_circular(circular);
                Setting::Erroneous
            }
        };

        // a cycle found further down may already have decided
        if matches!(self.ast[id].setting, Setting::Unclassified) {
            trace!(name = %self.ast[id].name.name, setting = setting.describe(), "classified");
            self.ast[id].setting = setting;
        }
    }

    fn classify_body(&mut self, id: AssignmentId, chain: &mut ReferenceChain) -> Setting {
        let assignment = &self.ast[id];
        if !assignment.parameters.is_empty() {
            return Setting::Parameterized;
        }

        let scope = assignment.scope;
        let name = assignment.name.clone();
        let location = assignment.location.clone();
        let governor = assignment.governor.clone();
        let body = assignment.body.clone();
        let upper = name.name.starts_with(char::is_uppercase);

        let Some(governor) = governor else {
            return match body {
                AssignmentBody::Type(ty) => Setting::Type(ty),
                AssignmentBody::Class(class) => Setting::Class(class),
                AssignmentBody::Reference(reference) => match self.meaning(scope, &reference, chain) {
                    Meaning::Class(class) => Setting::Class(class),
                    Meaning::Type(ty) => Setting::Type(ty),
                    Meaning::Erroneous => Setting::Erroneous,
                    other => {
                        self.report(AnalysisError::ReferenceKind {
                            name: reference.to_string(),
                            expected: "type or object class",
                            found: other.describe(),
                            location: reference.location.clone(),
                        });
                        Setting::Erroneous
                    }
                },
                AssignmentBody::Deferred => Setting::Parameterized,
                AssignmentBody::Block(_) | AssignmentBody::Value(_) => {
                    self.report(AnalysisError::BodyKind {
                        expected: "type or object class",
                        found: "value",
                        location,
                    });
                    Setting::Erroneous
                }
            };
        };

        match self.governor_kind(scope, &governor, chain) {
            GovernorKind::Erroneous => Setting::Erroneous,
            GovernorKind::Class(class) => match body {
                AssignmentBody::Block(block) if upper => {
                    let location = block.location.clone();
                    let kind = ObjectSetKind::Definition(ObjectSetDefinition {
                        block: Some(block),
                        ..Default::default()
                    });
                    Setting::ObjectSet(self.new_object_set(kind, Some(class), &name.name, scope, location))
                }
                AssignmentBody::Block(block) => {
                    let location = block.location.clone();
                    let kind = ObjectKind::Definition(ObjectDefinition {
                        block: Some(block),
                        settings: IndexMap::new(),
                    });
                    Setting::Object(self.new_object(kind, Some(class), &name.name, scope, location))
                }
                AssignmentBody::Reference(reference) if upper => {
                    let location = reference.location.clone();
                    let kind = ObjectSetKind::Referenced(ReferencedObjectSet {
                        reference,
                        refd: Resolved::default(),
                        fallback: None,
                    });
                    Setting::ObjectSet(self.new_object_set(kind, Some(class), &name.name, scope, location))
                }
                AssignmentBody::Reference(reference) => {
                    let location = reference.location.clone();
                    let kind = ObjectKind::Referenced {
                        reference,
                        refd: Resolved::default(),
                    };
                    Setting::Object(self.new_object(kind, Some(class), &name.name, scope, location))
                }
                _ => {
                    self.report(AnalysisError::BodyKind {
                        expected: if upper { "object set" } else { "object" },
                        found: "value",
                        location,
                    });
                    Setting::Erroneous
                }
            },
            GovernorKind::Type(ty) => match body {
                AssignmentBody::Block(block) if upper => Setting::ValueSet { ty, block },
                AssignmentBody::Block(block) => {
                    let braces = block.location.clone();
                    match self.parse_block(&block, scope, move |p| p.value_block(braces)) {
                        Ok(value) => Setting::Value { ty, value },
                        Err(e) => {
                            self.report(e.into());
                            Setting::Erroneous
                        }
                    }
                }
                AssignmentBody::Reference(reference) if !upper => {
                    let value = self.ast.add_value(Value {
                        location: reference.location.clone(),
                        kind: ValueKind::Reference(reference),
                        scope,
                    });
                    Setting::Value { ty, value }
                }
                AssignmentBody::Value(value) if !upper => Setting::Value { ty, value },
                _ => {
                    self.report(AnalysisError::BodyKind {
                        expected: if upper { "value set" } else { "value" },
                        found: "reference",
                        location,
                    });
                    Setting::Erroneous
                }
            },
        }
    }

    fn governor_kind(&mut self, scope: ScopeId, governor: &Governor, chain: &mut ReferenceChain) -> GovernorKind {
        let reference = match governor {
            Governor::Type(ty) => return GovernorKind::Type(*ty),
            Governor::Reference(reference) => reference,
        };

        match self.meaning(scope, reference, chain) {
            Meaning::Class(class) => GovernorKind::Class(class),
            Meaning::Type(ty) => GovernorKind::Type(ty),
            Meaning::Erroneous => GovernorKind::Erroneous,
            other => {
                self.report(AnalysisError::ReferenceKind {
                    name: reference.to_string(),
                    expected: "type or object class",
                    found: other.describe(),
                    location: reference.location.clone(),
                });
                GovernorKind::Erroneous
            }
        }
    }

    /// Create the instance of a parameterized assignment for one reference.
    /// The body is parsed again in a scope binding the actual parameters.
    fn instantiate(
        &mut self,
        id: AssignmentId,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Option<AssignmentId> {
        let key = (id, reference.location.clone());
        if let Some(&instance) = self.ast.instances.get(&key) {
            trace!(name = %reference.name.name, "instance already exists");
            return Some(instance);
        }

        let actual = reference.actual.clone()?;
        let assignment = &self.ast[id];
        let formals = assignment.parameters.clone();
        let formal_scope = assignment.scope;
        let name = assignment.name.clone();
        let tail = assignment.tail.clone()?;

        let pieces = match self.parse_block(&actual, scope, |p| p.actual_parameters()) {
            Ok(pieces) => pieces,
            Err(e) => {
                self.report(e.into());
                return None;
            }
        };

        if pieces.len() != formals.len() {
            self.report(AnalysisError::ParameterCount {
                name: name.name,
                expected: formals.len(),
                found: pieces.len(),
                location: actual.location,
            });
            return None;
        }

        let mut parameters = IndexMap::new();
        for (formal, piece) in formals.iter().zip(pieces) {
            let actual = self.actual_parameter(formal, &piece, scope, formal_scope, chain)?;
            parameters.insert(formal.name.name.clone(), actual);
        }

        let module = self.ast.scope_module(formal_scope);
        let instance_scope = self.ast.add_scope(Scope { module, parameters });

        let body = self.parse_block(&tail, instance_scope, |p| {
            let body = p.assignment_body(&name)?;
            p.finish()?;
            Ok(body)
        });
        let (governor, body) = match body {
            Ok(body) => body,
            Err(e) => {
                self.report(e.into());
                return None;
            }
        };

        let instance = self.ast.add_assignment(Assignment {
            name,
            scope: instance_scope,
            parameters: vec![],
            governor,
            body,
            tail: None,
            setting: Setting::Unclassified,
            instance_of: Some(id),
            last_checked: None,
            location: reference.location.clone(),
        });
        self.ast.instances.insert(key, instance);
        debug!(name = %reference.name.name, location = %reference.location, "instantiated parameterized assignment");

        Some(instance)
    }

    /// Interpret one actual parameter according to its formal parameter.
    /// Actual parameters are parsed in the scope of the reference.
    fn actual_parameter(
        &mut self,
        formal: &FormalParameter,
        piece: &Block,
        scope: ScopeId,
        formal_scope: ScopeId,
        chain: &mut ReferenceChain,
    ) -> Option<ActualParameter> {
        let upper = formal.name.name.starts_with(char::is_uppercase);
        let name = formal.name.name.clone();

        let governor = match &formal.governor {
            None => {
                if piece.tokens.first().map(|t| t.kind) == Some(TokenKind::KwClass) {
                    let class = self.parse_actual(piece, scope, |p| p.class_definition(&name))?;
                    return Some(ActualParameter::Class(class));
                }

                let ty = self.parse_actual(piece, scope, |p| p.ty())?;
                self.ast[ty].segment = name;
                if let TypeKind::Reference(reference) = self.ast[ty].kind.clone() {
                    if reference.fields.is_empty() {
                        if let Meaning::Class(class) = self.meaning(scope, &reference, chain) {
                            return Some(ActualParameter::Class(class));
                        }
                    }
                }
                return Some(ActualParameter::Type(ty));
            }
            Some(governor) => self.governor_kind(formal_scope, governor, chain),
        };

        match governor {
            GovernorKind::Erroneous => None,
            GovernorKind::Class(class) if upper => self
                .parse_actual(piece, scope, |p| p.object_set_setting(&name, Some(class)))
                .map(ActualParameter::ObjectSet),
            GovernorKind::Class(class) => self
                .parse_actual(piece, scope, |p| p.object_setting(&name, Some(class)))
                .map(ActualParameter::Object),
            GovernorKind::Type(_) if upper => Some(ActualParameter::ValueSet(piece.clone())),
            GovernorKind::Type(_) => self.parse_actual(piece, scope, |p| p.value()).map(ActualParameter::Value),
        }
    }

    fn parse_actual<T>(
        &mut self,
        piece: &Block,
        scope: ScopeId,
        f: impl FnOnce(&mut Parser<'_>) -> crate::parser::Result<T>,
    ) -> Option<T> {
        let result = self.parse_block(piece, scope, |p| {
            let value = f(p)?;
            p.finish()?;
            Ok(value)
        });

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e.into());
                None
            }
        }
    }
}
