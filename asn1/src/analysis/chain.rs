//! Cycle detection while following references.

use std::collections::HashSet;

use crate::ast::{AssignmentId, ClassId, ObjectId, ObjectSetId, TypeId, ValueId};

/// Anything that can take part in a reference cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    Assignment(AssignmentId),
    Type(TypeId),
    Value(ValueId),
    Class(ClassId),
    Object(ObjectId),
    ObjectSet(ObjectSetId),
}

/// The entities currently being resolved by one call, in the order they were
/// entered.  Each entity can be in the chain at most once.
#[derive(Debug, Clone, Default)]
pub struct ReferenceChain {
    stack: Vec<(Entity, String)>,
    members: HashSet<Entity>,
}

/// The chain refused an entity that it already contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circular {
    /// Names of the entities forming the cycle, starting and ending with the
    /// repeated entity
    pub path: Vec<String>,

    /// The entities in the same order as `path`
    pub entities: Vec<Entity>,
}

impl ReferenceChain {
    /// An empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with `entity` added to the chain, removing it again afterwards.
    /// If the entity is already being resolved the cycle is returned instead
    /// and `f` is not run.
    pub fn scoped<R>(
        &mut self,
        entity: Entity,
        name: impl Into<String>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, Circular> {
        let name = name.into();

        if !self.members.insert(entity) {
            let start = self
                .stack
                .iter()
                .position(|(e, _)| *e == entity)
                .unwrap_or(0);
            let mut path: Vec<_> = self.stack[start..].iter().map(|(_, n)| n.clone()).collect();
            let mut entities: Vec<_> = self.stack[start..].iter().map(|(e, _)| *e).collect();
            path.push(name);
            entities.push(entity);
            return Err(Circular { path, entities });
        }

        self.stack.push((entity, name));
        let result = f(self);
        self.stack.pop();
        self.members.remove(&entity);

        Ok(result)
    }

    /// Is the entity currently being resolved
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Number of entities in the chain
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Is the chain empty
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Circular {
    /// Build a cycle from the entities visited, ending with the repeated one
    pub fn new(visited: Vec<(Entity, String)>) -> Self {
        let (entities, path) = visited.into_iter().unzip();
        Self { path, entities }
    }

    /// The cycle through the entities the user named.  Anonymous entities,
    /// such as the elements of a set, have a dotted name and are left out
    /// unless fewer than two named entities remain.
    pub fn named(&self) -> Circular {
        let mut body: Vec<_> = self
            .entities
            .iter()
            .copied()
            .zip(self.path.iter().cloned())
            .collect();
        body.pop();

        let mut named: Vec<_> = body.iter().filter(|(_, name)| !name.contains('.')).cloned().collect();
        named.dedup_by_key(|(entity, _)| *entity);
        if named.len() > 1 && named.first().map(|n| n.0) == named.last().map(|n| n.0) {
            named.pop();
        }
        let distinct: HashSet<_> = named.iter().map(|(entity, _)| *entity).collect();

        let mut cycle = if distinct.len() >= 2 { named } else { body };
        if let Some(first) = cycle.first().cloned() {
            cycle.push(first);
        }
        Circular::new(cycle)
    }

    /// The same cycle starting from its smallest entity, so that a cycle
    /// found from any of its members is described identically
    pub fn canonical(&self) -> Circular {
        let len = self.entities.len().saturating_sub(1);
        let Some(start) = (0..len).min_by_key(|&i| self.entities[i]) else {
            return self.clone();
        };

        let order: Vec<_> = (start..len).chain(0..start).chain(std::iter::once(start)).collect();
        Circular {
            path: order.iter().map(|&i| self.path[i].clone()).collect(),
            entities: order.iter().map(|&i| self.entities[i]).collect(),
        }
    }

    /// `a -> b -> a`
    pub fn describe(&self) -> String {
        self.path
            .iter()
            .map(|n| format!("`{n}`"))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_is_released_after_scope() {
        let mut chain = ReferenceChain::new();
        let a = Entity::Type(TypeId::new(0));

        let inner = chain.scoped(a, "A", |chain| chain.contains(a)).unwrap();
        assert!(inner);
        assert!(!chain.contains(a));
        assert!(chain.is_empty());
    }

    #[test]
    fn re_adding_an_entity_fails_with_the_cycle() {
        let mut chain = ReferenceChain::new();
        let a = Entity::ObjectSet(ObjectSetId::new(0));
        let b = Entity::ObjectSet(ObjectSetId::new(1));

        let result = chain
            .scoped(a, "A", |chain| {
                chain.scoped(b, "B", |chain| chain.scoped(a, "A", |_| ()))
            })
            .unwrap()
            .unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.path, vec!["A", "B", "A"]);
        assert_eq!(err.describe(), "`A` -> `B` -> `A`");
        assert!(chain.is_empty());
    }

    #[test]
    fn named_cycle_skips_anonymous_entities() {
        let a = Entity::ObjectSet(ObjectSetId::new(0));
        let inner = Entity::ObjectSet(ObjectSetId::new(1));
        let b = Entity::ObjectSet(ObjectSetId::new(2));

        let cycle = Circular::new(vec![
            (a, "A".into()),
            (inner, "A.1".into()),
            (b, "B".into()),
            (a, "A".into()),
        ]);
        assert_eq!(cycle.named().describe(), "`A` -> `B` -> `A`");

        let anonymous = Circular::new(vec![(inner, "A.1".into()), (inner, "A.1".into())]);
        assert_eq!(anonymous.named(), anonymous);
    }

    #[test]
    fn cycle_ending_in_an_anonymous_entity_is_closed() {
        let a = Entity::ObjectSet(ObjectSetId::new(0));
        let b = Entity::ObjectSet(ObjectSetId::new(1));
        let a1 = Entity::ObjectSet(ObjectSetId::new(2));
        let b1 = Entity::ObjectSet(ObjectSetId::new(3));

        // found while following `B.1` and while following `A.1`
        let from_a = Circular::new(vec![
            (b1, "B.1".into()),
            (a, "A".into()),
            (a1, "A.1".into()),
            (b, "B".into()),
            (b1, "B.1".into()),
        ]);
        let from_b = Circular::new(vec![
            (a1, "A.1".into()),
            (b, "B".into()),
            (b1, "B.1".into()),
            (a, "A".into()),
            (a1, "A.1".into()),
        ]);

        let expected = "`A` -> `B` -> `A`";
        assert_eq!(from_a.named().canonical().describe(), expected);
        assert_eq!(from_a.named().canonical(), from_b.named().canonical());
    }

    #[test]
    fn canonical_cycle_starts_at_smallest_entity() {
        let a = Entity::ObjectSet(ObjectSetId::new(0));
        let b = Entity::ObjectSet(ObjectSetId::new(1));

        let from_b = Circular::new(vec![(b, "B".into()), (a, "A".into()), (b, "B".into())]);
        let from_a = Circular::new(vec![(a, "A".into()), (b, "B".into()), (a, "A".into())]);

        assert_eq!(from_b.canonical(), from_a);
        assert_eq!(from_a.canonical(), from_a);
    }
}
