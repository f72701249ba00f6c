use std::collections::HashSet;

use tracing::trace;

use crate::{
    ast::{
        ClassId, ClassSyntax, FieldKind, FieldSetting, FieldSpec, ScopeId, SyntaxNode, Type, TypeKind,
    },
    location::Location,
};

use super::{is_fresh, resolve::Meaning, AnalysisContext, AnalysisError, ReferenceChain};

impl AnalysisContext<'_> {
    /// Check an object class: decide the kind of every field, parse and check
    /// defaults, and parse the `WITH SYNTAX` specification
    pub(crate) fn check_class(&mut self, class: ClassId, chain: &mut ReferenceChain) {
        if is_fresh(self.ast[class].last_checked, self.timestamp()) {
            return;
        }
        self.ast[class].last_checked = Some(self.timestamp());
        trace!(class = %self.ast[class].name, "checking object class");

        let scope = self.ast[class].scope;
        let class_name = self.ast[class].name.clone();
        let mut fields = self.ast[class].fields.clone();

        for spec in fields.values_mut() {
            if let FieldKind::Undecided(reference) = &spec.kind {
                let reference = reference.clone();
                let upper = spec.name.name.trim_start_matches('&').starts_with(char::is_uppercase);

                match self.meaning(scope, &reference, chain) {
                    Meaning::Class(governor) if upper => spec.kind = FieldKind::ObjectSet(governor),
                    Meaning::Class(governor) => spec.kind = FieldKind::Object(governor),
                    Meaning::Type(_) => {
                        let ty = self.ast.add_type(Type {
                            kind: TypeKind::Reference(reference.clone()),
                            constraints: vec![],
                            parent: None,
                            segment: format!("{class_name}.{}", spec.name.name),
                            scope,
                            location: reference.location.clone(),
                            last_checked: None,
                        });
                        spec.kind = if upper {
                            FieldKind::ValueSet(ty)
                        } else {
                            FieldKind::Value(ty)
                        };
                    }
                    Meaning::Erroneous => (),
                    other => self.report(AnalysisError::ReferenceKind {
                        name: reference.to_string(),
                        expected: "type or object class",
                        found: other.describe(),
                        location: reference.location.clone(),
                    }),
                }
            }

            if spec.default.is_some() && spec.optional {
                self.report(AnalysisError::OptionalAndDefault {
                    location: spec.location.clone(),
                });
                spec.optional = false;
            }

            if spec.default.is_some() && spec.unique {
                self.report(AnalysisError::UniqueAndDefault {
                    location: spec.location.clone(),
                });
                spec.unique = false;
            }

            if spec.unique && !matches!(spec.kind, FieldKind::Value(_)) {
                self.report(AnalysisError::UniqueNotValue {
                    location: spec.location.clone(),
                });
                spec.unique = false;
            }

            self.parse_field_default(spec, &class_name, scope);
        }

        // defaults may refer back to the class, so store the decided fields
        // and syntax before checking them
        self.ast[class].fields = fields.clone();
        self.check_class_syntax(class);

        for spec in fields.values() {
            if let Some(setting) = spec.default.as_ref().and_then(|d| d.setting.clone()) {
                let location = spec.default.as_ref().map_or(spec.location.clone(), |d| d.location.clone());
                self.check_field_setting(spec, &setting, &location, chain);
            }
        }
    }

    /// Parse the `DEFAULT` setting of a field now that its kind is known
    fn parse_field_default(&mut self, spec: &mut FieldSpec, class_name: &str, scope: ScopeId) {
        let Some(default) = &mut spec.default else {
            return;
        };
        let Some(block) = default.block.take() else {
            return;
        };
        if matches!(spec.kind, FieldKind::Undecided(_)) {
            return;
        }

        let kind = spec.kind.clone();
        let field = spec.name.name.clone();
        let result = self.parse_block(&block, scope, |p| {
            let setting = p.field_setting(&kind, class_name, &field)?;
            p.finish()?;
            Ok(setting)
        });

        match result {
            Ok(setting) => {
                if let Some(default) = &mut spec.default {
                    default.setting = Some(setting);
                }
            }
            Err(e) => self.report(e.into()),
        }
    }

    /// Parse the `WITH SYNTAX` specification and check it against the fields
    fn check_class_syntax(&mut self, class: ClassId) {
        let block = match &self.ast[class].syntax {
            ClassSyntax::Unparsed(block) => block.clone(),
            ClassSyntax::Default | ClassSyntax::Parsed(_) => return,
        };

        let scope = self.ast[class].scope;
        let nodes = match self.parse_block(&block, scope, |p| p.with_syntax()) {
            Ok(nodes) => nodes,
            Err(e) => {
                self.report(e.into());
                self.ast[class].syntax = ClassSyntax::Default;
                return;
            }
        };

        let mut used = HashSet::new();
        self.check_syntax_nodes(class, &nodes, &mut used);

        let missing: Vec<_> = self.ast[class]
            .fields
            .values()
            .filter(|spec| spec.is_required() && !used.contains(&spec.name.name))
            .map(|spec| spec.name.name.clone())
            .collect();
        for name in missing {
            self.report(AnalysisError::SyntaxMissingField {
                name,
                location: block.location.clone(),
            });
        }

        self.ast[class].syntax = ClassSyntax::Parsed(nodes);
    }

    fn check_syntax_nodes(&mut self, class: ClassId, nodes: &[SyntaxNode], used: &mut HashSet<String>) {
        for node in nodes {
            match node {
                SyntaxNode::Literal(..) => (),
                SyntaxNode::Setting(field) => {
                    if !self.ast[class].fields.contains_key(&field.name) {
                        self.report(AnalysisError::SyntaxUnknownField {
                            name: field.name.clone(),
                            location: field.location.clone(),
                        });
                    } else if !used.insert(field.name.clone()) {
                        self.report(AnalysisError::SyntaxDuplicateField {
                            name: field.name.clone(),
                            location: field.location.clone(),
                        });
                    }
                }
                SyntaxNode::Optional(group, location) => {
                    if !matches!(group.first(), Some(SyntaxNode::Literal(..))) {
                        self.report(AnalysisError::SyntaxGroupStart {
                            location: location.clone(),
                        });
                    }
                    self.check_syntax_nodes(class, group, used);
                }
            }
        }
    }

    /// Check that a setting fits the field it is given for.  Returns false if
    /// the setting has the wrong kind or its value does not fit the field.
    pub(crate) fn check_field_setting(
        &mut self,
        spec: &FieldSpec,
        setting: &FieldSetting,
        location: &Location,
        chain: &mut ReferenceChain,
    ) -> bool {
        match (&spec.kind, setting) {
            (FieldKind::Type, FieldSetting::Type(ty)) => self.check_type(*ty, chain),
            (FieldKind::Value(ty), FieldSetting::Value(value)) => {
                self.check_type(*ty, chain);
                return self.check_value(*ty, *value, chain);
            }
            (FieldKind::ValueSet(ty), FieldSetting::ValueSet(_)) => self.check_type(*ty, chain),
            (FieldKind::Object(class), FieldSetting::Object(object)) => {
                self.ast[*object].governor = Some(*class);
                self.check_object(*object, chain);
            }
            (FieldKind::ObjectSet(class), FieldSetting::ObjectSet(set)) => {
                self.set_object_set_governor(*set, *class);
                self.check_object_set(*set, chain);
            }

            // the class has already been reported
            (FieldKind::Undecided(_), _) => return false,

            (kind, setting) => {
                self.report(AnalysisError::SettingKind {
                    field: spec.name.name.clone(),
                    expected: kind.describe(),
                    found: setting.describe(),
                    location: location.clone(),
                });
                return false;
            }
        }

        true
    }
}
