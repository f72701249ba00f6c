use indexmap::IndexMap;

use crate::{
    analysis::{CompilationTimeStamp, Resolved},
    location::Location,
};

use super::{Block, ClassId, Ident, ObjectId, ObjectSetId, Reference, ScopeId, TypeId, ValueId};

/// An information object
#[derive(Debug, Clone)]
pub struct Object {
    /// How the object is given
    pub kind: ObjectKind,

    /// The class the object is declared against
    pub governor: Option<ClassId>,

    /// Name used for the object in diagnostics
    pub name: String,

    /// Scope used to resolve references within the object
    pub scope: ScopeId,

    /// Source location of the object
    pub location: Location,

    /// When the object was last checked
    pub last_checked: Option<CompilationTimeStamp>,

    /// Set when the object could not be parsed or one of its settings has
    /// the wrong kind.  Erroneous objects are left out of object sets.
    pub erroneous: bool,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// `{ ... }` object definition
    Definition(ObjectDefinition),

    /// `object` or `object.&field` naming an object defined elsewhere
    Referenced {
        reference: Reference,
        refd: Resolved<ObjectId>,
    },
}

/// The settings of an object written in the source
#[derive(Debug, Clone, Default)]
pub struct ObjectDefinition {
    /// Tokens of the definition, until they are parsed with the syntax of the
    /// governing class
    pub block: Option<Block>,

    /// Field settings in the order they were written
    pub settings: IndexMap<String, NamedSetting>,
}

/// One field setting of an object
#[derive(Debug, Clone)]
pub struct NamedSetting {
    /// The `&field` name
    pub name: Ident,

    /// The setting itself
    pub setting: FieldSetting,
}

/// The value given to one field of an object, mirroring the kinds of field
/// specification
#[derive(Debug, Clone)]
pub enum FieldSetting {
    Type(TypeId),
    Value(ValueId),
    ValueSet(Block),
    Object(ObjectId),
    ObjectSet(ObjectSetId),
}

impl FieldSetting {
    /// Description of the setting kind for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            FieldSetting::Type(_) => "type",
            FieldSetting::Value(_) => "value",
            FieldSetting::ValueSet(_) => "value set",
            FieldSetting::Object(_) => "object",
            FieldSetting::ObjectSet(_) => "object set",
        }
    }
}
