use std::fmt::Display;

use crate::location::Location;

use super::{Block, Ident};

/// A textual reference to a named assignment, possibly qualified by a module
/// name, followed by an actual parameter list and/or a chain of field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// `Module.` prefix for external references
    pub module: Option<Ident>,

    /// Name of the referenced assignment
    pub name: Ident,

    /// Unparsed actual parameter list of a parameterized reference
    pub actual: Option<Block>,

    /// `.&field` selections, in order
    pub fields: Vec<Ident>,

    /// Location of the whole reference
    pub location: Location,
}

/// The mutually exclusive forms a reference can take during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceShape {
    /// `name` or `Module.name`
    Defined,

    /// `Name{actual}`
    Parameterized,

    /// `object.&field...`
    FromObject,

    /// Anything else, e.g. fields selected from a parameterized reference
    Unsupported,
}

impl Reference {
    /// A plain defined reference to a name
    pub fn simple(name: Ident) -> Self {
        Self {
            location: name.location.clone(),
            module: None,
            name,
            actual: None,
            fields: vec![],
        }
    }

    /// Classify the form of the reference
    pub fn shape(&self) -> ReferenceShape {
        match (self.actual.is_some(), self.fields.is_empty()) {
            (false, true) => ReferenceShape::Defined,
            (true, true) => ReferenceShape::Parameterized,
            (false, false) => ReferenceShape::FromObject,
            (true, false) => ReferenceShape::Unsupported,
        }
    }

    /// The same reference without any field selections
    pub fn without_fields(&self) -> Reference {
        Reference {
            fields: vec![],
            location: self
                .module
                .as_ref()
                .map_or(self.name.location.clone(), |m| m.location.to(&self.name.location)),
            ..self.clone()
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{}.", module.name)?;
        }
        write!(f, "{}", self.name.name)?;
        if self.actual.is_some() {
            write!(f, "{{...}}")?;
        }
        for field in &self.fields {
            write!(f, ".{}", field.name)?;
        }
        Ok(())
    }
}
