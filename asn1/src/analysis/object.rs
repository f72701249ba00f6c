use std::collections::HashSet;

use tracing::trace;

use crate::{
    ast::{
        ClassId, ClassSyntax, FieldSetting, Object, ObjectId, ObjectKind, Reference,
        ReferenceShape, ScopeId,
    },
    location::Location,
    parser::ObjectBody,
};

use super::{
    chain::Circular, is_fresh, resolve::Meaning, AnalysisContext, AnalysisError, Entity,
    ReferenceChain,
};

/// Description of a field setting with an article, for diagnostics
pub(super) fn setting_meaning(setting: &FieldSetting) -> &'static str {
    match setting {
        FieldSetting::Type(_) => "a type",
        FieldSetting::Value(_) => "a value",
        FieldSetting::ValueSet(_) => "a value set",
        FieldSetting::Object(_) => "an object",
        FieldSetting::ObjectSet(_) => "an object set",
    }
}

impl AnalysisContext<'_> {
    /// Add an object to the arena
    pub(crate) fn new_object(
        &mut self,
        kind: ObjectKind,
        governor: Option<ClassId>,
        name: &str,
        scope: ScopeId,
        location: Location,
    ) -> ObjectId {
        self.ast.add_object(Object {
            kind,
            governor,
            name: name.to_string(),
            scope,
            location,
            last_checked: None,
            erroneous: false,
        })
    }

    /// Check an object against its governing class
    pub(crate) fn check_object(&mut self, object: ObjectId, chain: &mut ReferenceChain) {
        if is_fresh(self.ast[object].last_checked, self.timestamp()) {
            return;
        }
        self.ast[object].last_checked = Some(self.timestamp());
        trace!(object = %self.ast[object].name, "checking object");

        if !matches!(self.ast[object].kind, ObjectKind::Referenced { .. }) {
            self.check_object_definition(object, chain);
            return;
        }

        let Some(target) = self.get_refd_object(object, chain) else {
            self.ast[object].erroneous = true;
            return;
        };
        self.check_object(target, chain);

        let Some(last) = self.get_refd_last_object(object, chain) else {
            self.ast[object].erroneous = true;
            return;
        };
        if self.ast[last].erroneous {
            self.ast[object].erroneous = true;
        }
        if let Some(error) = self.object_governor_mismatch(object, last) {
            self.report(error);
        }
    }

    fn check_object_definition(&mut self, object: ObjectId, chain: &mut ReferenceChain) {
        let Some(class) = self.ast[object].governor else {
            return;
        };
        self.check_class(class, chain);

        if let Some(body) = self.parse_object(object, class) {
            let class_name = self.ast[class].name.clone();
            for field in body.unknown {
                self.report(AnalysisError::UnknownField {
                    field: field.name,
                    class: class_name.clone(),
                    location: field.location,
                });
            }
            if let ObjectKind::Definition(def) = &mut self.ast[object].kind {
                def.settings = body.settings;
            }
        }
        if self.ast[object].erroneous {
            return;
        }

        let ObjectKind::Definition(def) = &self.ast[object].kind else {
            return;
        };
        let settings = def.settings.clone();
        let fields = self.ast[class].fields.clone();
        let name = self.ast[object].name.clone();
        let location = self.ast[object].location.clone();

        for spec in fields.values() {
            match settings.get(&spec.name.name) {
                Some(setting) => {
                    if !self.check_field_setting(spec, &setting.setting, &setting.name.location, chain) {
                        self.ast[object].erroneous = true;
                    }
                }
                None if spec.is_required() => self.report(AnalysisError::MissingField {
                    field: spec.name.name.clone(),
                    object: name.clone(),
                    location: location.clone(),
                }),
                None => (),
            }
        }
    }

    /// Parse the block of an object definition with the syntax of its class.
    /// The block is only parsed once, a failed parse makes the object
    /// erroneous.
    fn parse_object(&mut self, object: ObjectId, class: ClassId) -> Option<ObjectBody> {
        let block = match &mut self.ast[object].kind {
            ObjectKind::Definition(def) => def.block.take()?,
            ObjectKind::Referenced { .. } => return None,
        };

        let fields = self.ast[class].fields.clone();
        let syntax = self.ast[class].syntax.clone();
        let owner = self.ast[object].name.clone();
        let scope = self.ast[object].scope;

        trace!(object = %owner, "parsing object definition");
        let result = self.parse_block(&block, scope, |p| match &syntax {
            ClassSyntax::Parsed(nodes) => p.defined_syntax_object(nodes, &fields, &owner),
            ClassSyntax::Default | ClassSyntax::Unparsed(_) => p.default_syntax_object(&fields, &owner),
        });

        match result {
            Ok(body) => Some(body),
            Err(e) => {
                self.report(e.into());
                self.ast[object].erroneous = true;
                None
            }
        }
    }

    /// The error for a referenced object whose target has another class
    pub(crate) fn object_governor_mismatch(&self, object: ObjectId, target: ObjectId) -> Option<AnalysisError> {
        let expected = self.ast[object].governor?;
        let found = self.ast[target].governor?;
        if expected == found {
            return None;
        }

        Some(AnalysisError::ObjectGovernor {
            expected: self.ast[expected].name.clone(),
            object: self.ast[target].name.clone(),
            found: self.ast[found].name.clone(),
            location: self.ast[object].location.clone(),
        })
    }

    /// The object directly named by a referenced object.  A definition is its
    /// own target.
    pub(crate) fn get_refd_object(&mut self, object: ObjectId, chain: &mut ReferenceChain) -> Option<ObjectId> {
        let ObjectKind::Referenced { reference, refd } = &self.ast[object].kind else {
            return Some(object);
        };
        if let Some(&target) = refd.fresh(self.timestamp()) {
            trace!(object = %self.ast[object].name, "object reference already resolved");
            return Some(target);
        }

        let reference = reference.clone();
        let scope = self.ast[object].scope;
        let name = self.ast[object].name.clone();

        let target = match chain.scoped(Entity::Object(object), name, |chain| {
            self.resolve_object_reference(scope, &reference, chain)
        }) {
            Ok(target) => target?,
            Err(circular) => {
                self.report_circular(circular);
                return None;
            }
        };

        let timestamp = self.timestamp();
        if let ObjectKind::Referenced { refd, .. } = &mut self.ast[object].kind {
            refd.store(timestamp, target);
        }
        Some(target)
    }

    fn resolve_object_reference(
        &mut self,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Option<ObjectId> {
        match reference.shape() {
            ReferenceShape::Defined | ReferenceShape::Parameterized => {
                match self.meaning(scope, reference, chain) {
                    Meaning::Object(object) => Some(object),
                    Meaning::Erroneous => None,
                    other => {
                        self.report(AnalysisError::ReferenceKind {
                            name: reference.to_string(),
                            expected: "object",
                            found: other.describe(),
                            location: reference.location.clone(),
                        });
                        None
                    }
                }
            }
            ReferenceShape::FromObject => match self.field_target(scope, reference, chain)? {
                FieldSetting::Object(object) => Some(object),
                other => {
                    self.report(AnalysisError::ReferenceKind {
                        name: reference.to_string(),
                        expected: "object",
                        found: setting_meaning(&other),
                        location: reference.location.clone(),
                    });
                    None
                }
            },
            ReferenceShape::Unsupported => {
                self.report(AnalysisError::UnsupportedReference {
                    reference: reference.to_string(),
                    location: reference.location.clone(),
                });
                None
            }
        }
    }

    /// Follow object references until an object definition is reached
    pub(crate) fn get_refd_last_object(&mut self, object: ObjectId, chain: &mut ReferenceChain) -> Option<ObjectId> {
        let mut visited = vec![];
        let mut seen = HashSet::new();
        let mut current = object;

        loop {
            if !seen.insert(current) {
                let start = visited
                    .iter()
                    .position(|(e, _)| *e == Entity::Object(current))
                    .unwrap_or(0);
                let mut path: Vec<_> = visited.split_off(start);
                path.push((Entity::Object(current), self.ast[current].name.clone()));
                self.report_circular(Circular::new(path));
                return None;
            }
            visited.push((Entity::Object(current), self.ast[current].name.clone()));

            if !matches!(self.ast[current].kind, ObjectKind::Referenced { .. }) {
                return Some(current);
            }
            current = self.get_refd_object(current, chain)?;
        }
    }

    /// The setting named by an `object.&field.&field` reference.  Every field
    /// but the last must be an object field.
    pub(crate) fn field_target(
        &mut self,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Option<FieldSetting> {
        let base = reference.without_fields();
        let mut current = match self.meaning(scope, &base, chain) {
            Meaning::Object(object) => object,
            Meaning::Erroneous => return None,
            other => {
                self.report(AnalysisError::ReferenceKind {
                    name: base.to_string(),
                    expected: "object",
                    found: other.describe(),
                    location: base.location.clone(),
                });
                return None;
            }
        };

        let mut fields = reference.fields.iter().peekable();
        while let Some(field) = fields.next() {
            let object = self.get_refd_last_object(current, chain)?;
            self.check_object(object, chain);

            let Some(setting) = self.field_setting_with_name(object, &field.name) else {
                self.report(AnalysisError::FieldNotSet {
                    field: field.name.clone(),
                    object: self.ast[object].name.clone(),
                    location: field.location.clone(),
                });
                return None;
            };

            if fields.peek().is_none() {
                return Some(setting);
            }

            match setting {
                FieldSetting::Object(next) => current = next,
                other => {
                    self.report(AnalysisError::ReferenceKind {
                        name: field.name.clone(),
                        expected: "object",
                        found: setting_meaning(&other),
                        location: field.location.clone(),
                    });
                    return None;
                }
            }
        }

        None
    }

    /// The setting of a field of an object, falling back to the default
    /// declared by its class
    pub fn field_setting_with_name(&self, object: ObjectId, field: &str) -> Option<FieldSetting> {
        if let ObjectKind::Definition(def) = &self.ast[object].kind {
            if let Some(setting) = def.settings.get(field) {
                return Some(setting.setting.clone());
            }
        }

        let class = self.ast[object].governor?;
        self.ast[class].fields.get(field)?.default.as_ref()?.setting.clone()
    }
}
