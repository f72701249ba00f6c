//! Names given to the alternatives of open types.

use std::collections::HashSet;

use crate::ast::{ActualParameter, ReferenceShape, TypeId, TypeKind};

use super::{resolve::Lookup, AnalysisContext, ReferenceChain};

/// The name with its first character in lower case
pub(crate) fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join the segments of a dotted path with underscores, dropping the `&` of
/// field names
pub(crate) fn flatten_path(path: &str) -> String {
    path.split('.')
        .map(|part| part.trim_start_matches('&'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

impl AnalysisContext<'_> {
    /// The name of the open type alternative for a type.  The same type
    /// always gets the same name.
    pub(crate) fn alternative_name(&mut self, ty: TypeId, chain: &mut ReferenceChain) -> String {
        let base = self.base_name(ty, chain, &mut HashSet::new());
        lower_first(&base)
    }

    fn base_name(&mut self, ty: TypeId, chain: &mut ReferenceChain, visited: &mut HashSet<TypeId>) -> String {
        if !visited.insert(ty) || !self.ast[ty].constraints.is_empty() {
            return self.full_name(ty);
        }

        match self.ast[ty].kind.clone() {
            TypeKind::Reference(reference) => match reference.shape() {
                ReferenceShape::Defined => {
                    let scope = self.ast[ty].scope;
                    if let Ok(Lookup::Parameter(ActualParameter::Type(actual))) = self.find(scope, &reference) {
                        return self.base_name(actual, chain, visited);
                    }
                    reference.name.name
                }
                ReferenceShape::Parameterized => reference.name.name,
                ReferenceShape::FromObject => match self.resolve_type(ty, chain) {
                    Some(target) => self.base_name(target, chain, visited),
                    None => self.full_name(ty),
                },
                ReferenceShape::Unsupported => self.full_name(ty),
            },
            kind if kind.is_structured() => self.full_name(ty),
            TypeKind::Open(_) | TypeKind::ClassField { .. } => self.full_name(ty),
            kind => kind.keyword().replace(' ', "_"),
        }
    }

    /// The path of a type from the construct defining it, joined with
    /// underscores
    pub(crate) fn full_name(&self, ty: TypeId) -> String {
        let mut segments = vec![];
        let mut current = Some(ty);
        while let Some(id) = current {
            segments.push(self.ast[id].segment.as_str());
            current = self.ast[id].parent;
        }
        segments.reverse();

        flatten_path(&segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_character_is_lowered() {
        assert_eq!(lower_first("INTEGER"), "iNTEGER");
        assert_eq!(lower_first("Ops"), "ops");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn paths_are_flattened() {
        assert_eq!(flatten_path("op1.&ArgType"), "op1_ArgType");
        assert_eq!(flatten_path("Message.body.inner"), "Message_body_inner");
        assert_eq!(flatten_path("OCTET_STRING"), "OCTET_STRING");
    }
}
