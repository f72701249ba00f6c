use crate::{
    analysis::{CompilationTimeStamp, Resolved},
    location::Location,
};

use super::{Block, ClassId, ObjectId, ObjectSetId, Reference, ScopeId};

/// An information object set
#[derive(Debug, Clone)]
pub struct ObjectSet {
    /// How the set is given
    pub kind: ObjectSetKind,

    /// The class of every object in the set
    pub governor: Option<ClassId>,

    /// Name used for the set in diagnostics
    pub name: String,

    /// Scope used to resolve references within the set
    pub scope: ScopeId,

    /// Source location of the set
    pub location: Location,

    /// When the set was last checked
    pub last_checked: Option<CompilationTimeStamp>,
}

#[derive(Debug, Clone)]
pub enum ObjectSetKind {
    /// `{ element | element, ... }`
    Definition(ObjectSetDefinition),

    /// A name resolving to an object set defined elsewhere
    Referenced(ReferencedObjectSet),
}

/// An explicit list of object set elements
#[derive(Debug, Clone, Default)]
pub struct ObjectSetDefinition {
    /// Tokens of the set specification, until parsed
    pub block: Option<Block>,

    /// Elements in source order
    pub elements: Vec<ObjectSetElement>,

    /// An extension marker `...` was present
    pub extensible: bool,

    /// Flattened, de-duplicated objects of the set.  The objects are owned by
    /// their own definitions.
    pub objects: Resolved<Vec<ObjectId>>,
}

/// A single element of an object set definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectSetElement {
    /// An object definition or a referenced object
    Object(ObjectId),

    /// A referenced object set
    Set(ObjectSetId),
}

/// Object set given by reference
#[derive(Debug, Clone)]
pub struct ReferencedObjectSet {
    /// The textual reference
    pub reference: Reference,

    /// Directly referenced object set
    pub refd: Resolved<ObjectSetId>,

    /// Empty set substituted when the reference does not name an object set
    pub fallback: Option<ObjectSetId>,
}

/// Progress of an object set definition through lazy resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefinitionState {
    /// Only the raw block is known
    Unparsed,

    /// Elements are known
    Parsed,

    /// Elements have been checked against the governor
    Checked,

    /// The flattened object list is available
    Flattened,
}

impl ObjectSet {
    /// The definition, if this set is one
    pub fn definition(&self) -> Option<&ObjectSetDefinition> {
        match &self.kind {
            ObjectSetKind::Definition(def) => Some(def),
            ObjectSetKind::Referenced(_) => None,
        }
    }

    /// How far resolution of a definition has progressed at a timestamp.
    /// Returns None for referenced object sets.
    pub fn state(&self, timestamp: CompilationTimeStamp) -> Option<DefinitionState> {
        let def = self.definition()?;

        Some(if def.block.is_some() {
            DefinitionState::Unparsed
        } else if def.objects.fresh(timestamp).is_some() {
            DefinitionState::Flattened
        } else if self
            .last_checked
            .is_some_and(|last| !last.is_less(timestamp))
        {
            DefinitionState::Checked
        } else {
            DefinitionState::Parsed
        })
    }
}
