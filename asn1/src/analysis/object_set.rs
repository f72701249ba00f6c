//! Object sets: lazy parsing of definitions, reference resolution and
//! flattening into a de-duplicated list of objects.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::{
    ast::{
        ClassId, FieldSetting, ObjectId, ObjectSet, ObjectSetDefinition, ObjectSetElement,
        ObjectSetId, ObjectSetKind, Reference, ReferenceShape, ScopeId,
    },
    location::Location,
};

use super::{
    chain::Circular, is_fresh, object::setting_meaning, resolve::Meaning, AnalysisContext,
    AnalysisError, Entity, ReferenceChain,
};

impl AnalysisContext<'_> {
    /// Add an object set to the arena
    pub(crate) fn new_object_set(
        &mut self,
        kind: ObjectSetKind,
        governor: Option<ClassId>,
        name: &str,
        scope: ScopeId,
        location: Location,
    ) -> ObjectSetId {
        self.ast.add_object_set(ObjectSet {
            kind,
            governor,
            name: name.to_string(),
            scope,
            location,
            last_checked: None,
        })
    }

    /// Bind an object set to a class.  Changing the class forces the set to
    /// be checked and flattened again.
    pub(crate) fn set_object_set_governor(&mut self, set: ObjectSetId, governor: ClassId) {
        let node = &mut self.ast[set];
        if node.governor == Some(governor) {
            return;
        }

        trace!(set = %node.name, "object set governor changed");
        node.governor = Some(governor);
        node.last_checked = None;
        match &mut node.kind {
            ObjectSetKind::Definition(def) => def.objects = Default::default(),
            ObjectSetKind::Referenced(referenced) => referenced.fallback = None,
        }
    }

    /// Parse the block of an object set definition into its elements.  The
    /// block is only parsed once; a syntax error leaves the set empty.
    pub(crate) fn parse_object_set(&mut self, set: ObjectSetId) {
        let block = match &mut self.ast[set].kind {
            ObjectSetKind::Definition(ObjectSetDefinition { block, .. }) => block.take(),
            ObjectSetKind::Referenced(_) => None,
        };
        let Some(block) = block else {
            return;
        };

        let node = &self.ast[set];
        let (name, governor, scope) = (node.name.clone(), node.governor, node.scope);
        debug!(set = %name, "parsing object set definition");

        let parsed = self.parse_block(&block, scope, |p| p.object_set_spec(&name, governor));
        let (elements, extensible) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.report(e.into());
                (vec![], false)
            }
        };

        if let ObjectSetKind::Definition(def) = &mut self.ast[set].kind {
            def.elements = elements;
            def.extensible = extensible;
        }
    }

    /// Check an object set and everything it contains
    pub(crate) fn check_object_set(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) {
        if is_fresh(self.ast[set].last_checked, self.timestamp()) {
            return;
        }
        self.ast[set].last_checked = Some(self.timestamp());
        trace!(set = %self.ast[set].name, "checking object set");

        if matches!(self.ast[set].kind, ObjectSetKind::Referenced(_)) {
            let target = self.get_refd(set, chain);
            self.check_object_set(target, chain);

            let last = self.get_refd_last(set, chain);
            if let Some(error) = self.object_set_governor_mismatch(set, last) {
                self.report(error);
            }
            return;
        }

        self.parse_object_set(set);
        let Some(def) = self.ast[set].definition() else {
            return;
        };
        let elements = def.elements.clone();
        if let Some(governor) = self.ast[set].governor {
            for element in elements {
                self.check_element(element, governor, chain);
            }
        }

        self.flatten(set, &mut ReferenceChain::new());
    }

    /// Bind an element to the class of its set and check it
    fn check_element(&mut self, element: ObjectSetElement, governor: ClassId, chain: &mut ReferenceChain) {
        match element {
            ObjectSetElement::Object(object) => {
                self.ast[object].governor = Some(governor);
                self.check_object(object, chain);
            }
            ObjectSetElement::Set(set) => {
                self.set_object_set_governor(set, governor);
                self.check_object_set(set, chain);
            }
        }
    }

    /// The error for a set whose resolved target has another class
    fn object_set_governor_mismatch(&self, set: ObjectSetId, target: ObjectSetId) -> Option<AnalysisError> {
        let expected = self.ast[set].governor?;
        let found = self.ast[target].governor?;
        if expected == found {
            return None;
        }

        Some(AnalysisError::ObjectSetGovernor {
            expected: self.ast[expected].name.clone(),
            set: self.ast[target].name.clone(),
            found: self.ast[found].name.clone(),
            location: self.ast[set].location.clone(),
        })
    }

    /// The object set directly named by a referenced object set.  When the
    /// reference does not name an object set an empty set of the expected
    /// class is returned instead.  A definition is its own target.
    pub(crate) fn get_refd(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) -> ObjectSetId {
        let ObjectSetKind::Referenced(referenced) = &self.ast[set].kind else {
            return set;
        };
        if let Some(&target) = referenced.refd.fresh(self.timestamp()) {
            trace!(set = %self.ast[set].name, "object set reference already resolved");
            return target;
        }

        let reference = referenced.reference.clone();
        let scope = self.ast[set].scope;
        let name = self.ast[set].name.clone();

        let target = match chain.scoped(Entity::ObjectSet(set), name, |chain| {
            self.resolve_object_set_reference(scope, &reference, chain)
        }) {
            Ok(Some(target)) => target,
            Ok(None) => self.fallback_set(set),
            Err(circular) => {
                self.report_circular(circular);
                self.fallback_set(set)
            }
        };

        let timestamp = self.timestamp();
        if let ObjectSetKind::Referenced(referenced) = &mut self.ast[set].kind {
            referenced.refd.store(timestamp, target);
        }
        target
    }

    fn resolve_object_set_reference(
        &mut self,
        scope: ScopeId,
        reference: &Reference,
        chain: &mut ReferenceChain,
    ) -> Option<ObjectSetId> {
        let found = match reference.shape() {
            ReferenceShape::Defined | ReferenceShape::Parameterized => {
                match self.meaning(scope, reference, chain) {
                    Meaning::ObjectSet(set) => return Some(set),
                    Meaning::Erroneous => return None,
                    other => other.describe(),
                }
            }
            ReferenceShape::FromObject => match self.field_target(scope, reference, chain)? {
                FieldSetting::ObjectSet(set) => return Some(set),
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
            expected: "ObjectSet",
            found,
            location: reference.location.clone(),
        });
        None
    }

    /// Empty definition standing in for a reference that does not name an
    /// object set.  It has the class the reference was expected to have.
    fn fallback_set(&mut self, set: ObjectSetId) -> ObjectSetId {
        if let ObjectSetKind::Referenced(referenced) = &self.ast[set].kind {
            if let Some(fallback) = referenced.fallback {
                return fallback;
            }
        }

        let node = &self.ast[set];
        let (governor, name, scope, location) = (node.governor, node.name.clone(), node.scope, node.location.clone());
        let kind = ObjectSetKind::Definition(ObjectSetDefinition::default());
        let fallback = self.new_object_set(kind, governor, &name, scope, location);
        debug!(set = %name, "substituting an empty object set");

        if let ObjectSetKind::Referenced(referenced) = &mut self.ast[set].kind {
            referenced.fallback = Some(fallback);
        }
        fallback
    }

    /// Follow references and definitions that only contain a single
    /// referenced set, until a definition with its own elements is reached
    pub(crate) fn get_refd_last(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) -> ObjectSetId {
        let mut visited: Vec<(Entity, String)> = vec![];
        let mut seen = HashSet::new();
        let mut current = set;

        loop {
            if !seen.insert(current) {
                let start = visited
                    .iter()
                    .position(|(e, _)| *e == Entity::ObjectSet(current))
                    .unwrap_or(0);
                let mut path = visited.split_off(start);
                path.push((Entity::ObjectSet(current), self.ast[current].name.clone()));
                self.report_circular(Circular::new(path));

                if matches!(self.ast[set].kind, ObjectSetKind::Referenced(_)) {
                    return self.fallback_set(set);
                }
                return set;
            }
            visited.push((Entity::ObjectSet(current), self.ast[current].name.clone()));

            if matches!(self.ast[current].kind, ObjectSetKind::Referenced(_)) {
                current = self.get_refd(current, chain);
                continue;
            }
            if current == set {
                return current;
            }

            self.parse_object_set(current);
            let pass_through = match self.ast[current].definition() {
                Some(def) => match def.elements.as_slice() {
                    [ObjectSetElement::Set(inner)] => Some(*inner),
                    _ => None,
                },
                None => None,
            };
            match pass_through {
                Some(inner) if matches!(self.ast[inner].kind, ObjectSetKind::Referenced(_)) => current = inner,
                _ => return current,
            }
        }
    }

    /// The de-duplicated objects of a set, after following references
    pub(crate) fn flatten(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) -> Vec<ObjectId> {
        let set = self.get_refd_last(set, chain);
        self.check_object_set(set, chain);

        let Some(def) = self.ast[set].definition() else {
            return vec![];
        };
        if let Some(objects) = def.objects.fresh(self.timestamp()) {
            return objects.clone();
        }

        let name = self.ast[set].name.clone();
        let objects = match chain.scoped(Entity::ObjectSet(set), name, |chain| self.collect(set, chain)) {
            Ok(objects) => objects,
            Err(circular) => {
                self.report_circular(circular);
                return vec![];
            }
        };

        trace!(set = %self.ast[set].name, count = objects.len(), "flattened object set");
        let timestamp = self.timestamp();
        if let ObjectSetKind::Definition(def) = &mut self.ast[set].kind {
            def.objects.store(timestamp, objects.clone());
        }
        objects
    }

    /// Gather the objects of every element of a definition.  Objects of
    /// another class are reported and left out, erroneous objects are left
    /// out silently.
    fn collect(&mut self, set: ObjectSetId, chain: &mut ReferenceChain) -> Vec<ObjectId> {
        let Some(def) = self.ast[set].definition() else {
            return vec![];
        };
        let elements = def.elements.clone();

        let mut objects = vec![];
        let mut seen = HashSet::new();

        for element in elements {
            match element {
                ObjectSetElement::Object(object) => {
                    let Some(last) = self.get_refd_last_object(object, chain) else {
                        continue;
                    };
                    if self.ast[object].erroneous || self.ast[last].erroneous {
                        trace!(object = %self.ast[last].name, "skipping erroneous object");
                        continue;
                    }
                    if let Some(error) = self.object_governor_mismatch(object, last) {
                        self.report(error);
                        continue;
                    }
                    if seen.insert(last) {
                        objects.push(last);
                    }
                }
                ObjectSetElement::Set(inner) => {
                    let last = self.get_refd_last(inner, chain);
                    if let Some(error) = self.object_set_governor_mismatch(inner, last) {
                        self.report(error);
                        continue;
                    }
                    for object in self.flatten(last, chain) {
                        if seen.insert(object) {
                            objects.push(object);
                        }
                    }
                }
            }
        }

        objects
    }

    /// The objects of a set in a stable order, without duplicates
    pub fn object_set_objects(&mut self, set: ObjectSetId) -> Vec<ObjectId> {
        let mut chain = ReferenceChain::new();
        self.check_object_set(set, &mut chain);
        self.flatten(set, &mut chain)
    }

    /// Number of objects in a set once flattened
    pub fn get_nof_objects(&mut self, set: ObjectSetId) -> usize {
        self.object_set_objects(set).len()
    }

    /// The object at `index` of a flattened set
    pub fn get_object_by_index(&mut self, set: ObjectSetId, index: usize) -> Option<ObjectId> {
        self.object_set_objects(set).get(index).copied()
    }

    /// Are two object sets definitions written at the same place with the
    /// same elements and objects.  Sets given by reference are never
    /// equivalent to anything but themselves.
    pub fn object_sets_equivalent(&self, a: ObjectSetId, b: ObjectSetId) -> bool {
        if a == b {
            return true;
        }

        let (first, second) = (&self.ast[a], &self.ast[b]);
        match (first.definition(), second.definition()) {
            (Some(x), Some(y)) => {
                first.location == second.location
                    && x.elements == y.elements
                    && x.objects.last() == y.objects.last()
            }
            _ => false,
        }
    }
}
