use indexmap::IndexMap;

use crate::{analysis::CompilationTimeStamp, location::Location};

use super::{Block, ClassId, FieldSetting, Ident, Reference, ScopeId, TypeId};

/// An information object class
#[derive(Debug, Clone)]
pub struct ObjectClass {
    /// Declared fields in source order
    pub fields: IndexMap<String, FieldSpec>,

    /// How objects of the class are written
    pub syntax: ClassSyntax,

    /// Name used for the class in diagnostics
    pub name: String,

    /// Scope used to resolve references within the class
    pub scope: ScopeId,

    /// Source location of the class definition or reference
    pub location: Location,

    /// When the class was last checked
    pub last_checked: Option<CompilationTimeStamp>,
}

/// The object definition syntax for a class
#[derive(Debug, Clone)]
pub enum ClassSyntax {
    /// No `WITH SYNTAX`, objects use `{ &field setting, ... }`
    Default,

    /// The `WITH SYNTAX` block before it has been checked
    Unparsed(Block),

    /// The checked syntax tree
    Parsed(Vec<SyntaxNode>),
}

/// A node of a `WITH SYNTAX` specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// A word or comma that must appear literally
    Literal(String, Location),

    /// The place where a field setting is written
    Setting(Ident),

    /// `[ ... ]`, a group that may be left out
    Optional(Vec<SyntaxNode>, Location),
}

/// A field declared in a class
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// `&name` including the ampersand
    pub name: Ident,

    /// What kind of setting the field takes
    pub kind: FieldKind,

    /// Marked `OPTIONAL`
    pub optional: bool,

    /// Marked `UNIQUE`
    pub unique: bool,

    /// `DEFAULT` setting
    pub default: Option<FieldDefault>,

    /// Location of the whole field specification
    pub location: Location,
}

/// The kinds of field a class can declare
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// `&Type`
    Type,

    /// `&value Type`
    Value(TypeId),

    /// `&ValueSet Type`
    ValueSet(TypeId),

    /// `&object CLASS`
    Object(ClassId),

    /// `&ObjectSet CLASS`
    ObjectSet(ClassId),

    /// `&name Reference` or `&Name Reference` where the reference could be
    /// either a type or a class.  Decided when the class is checked.
    Undecided(Reference),
}

/// The default setting of a field, parsed once the field kind is known
#[derive(Debug, Clone)]
pub struct FieldDefault {
    /// Tokens of the setting until parsed
    pub block: Option<Block>,

    /// The parsed setting
    pub setting: Option<FieldSetting>,

    /// Location of the default setting
    pub location: Location,
}

impl FieldKind {
    /// Description of the field kind for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Type => "type",
            FieldKind::Value(_) => "fixed-type value",
            FieldKind::ValueSet(_) => "fixed-type value set",
            FieldKind::Object(_) => "object",
            FieldKind::ObjectSet(_) => "object set",
            FieldKind::Undecided(_) => "undecided",
        }
    }
}

impl FieldSpec {
    /// Must every object of the class set this field
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}
