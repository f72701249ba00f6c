use indexmap::IndexMap;

use crate::{analysis::CompilationTimeStamp, location::Location};

use super::{Block, Ident, ObjectSetId, Reference, ScopeId, TypeId, ValueId};

/// An ASN.1 type
#[derive(Debug, Clone)]
pub struct Type {
    /// What kind of type this is
    pub kind: TypeKind,

    /// Constraints written after the type, in order
    pub constraints: Vec<Constraint>,

    /// The type textually enclosing this one, if any
    pub parent: Option<TypeId>,

    /// Name of this type within its parent (component name), or for a
    /// top-level type the name of the construct that defines it
    pub segment: String,

    /// Scope used to resolve references within the type
    pub scope: ScopeId,

    /// Source location of the type
    pub location: Location,

    /// When the type was last checked
    pub last_checked: Option<CompilationTimeStamp>,
}

/// The structure of a type
#[derive(Debug, Clone)]
pub enum TypeKind {
    Boolean,
    Null,
    Integer(Vec<NamedNumber>),
    Real,
    BitString(Vec<NamedNumber>),
    OctetString,
    ObjectIdentifier,
    Enumerated(Vec<Ident>),
    String(StringKind),
    Sequence(Vec<Component>),
    Set(Vec<Component>),
    Choice(Vec<Component>),
    SequenceOf(TypeId),
    SetOf(TypeId),

    /// Reference to a type assignment, a type parameter, or a type field of
    /// an information object (`object.&Type`)
    Reference(Reference),

    /// `CLASS.&field`.  Becomes an open type once the field is known to be a
    /// type field.
    ClassField { class: Reference, field: Ident },

    /// A type whose alternatives are given by a table constraint
    Open(OpenType),
}

/// A member of a SEQUENCE, SET or CHOICE
#[derive(Debug, Clone)]
pub struct Component {
    /// Component identifier
    pub name: Ident,

    /// Type of the component
    pub ty: TypeId,

    /// Marked `OPTIONAL`
    pub optional: bool,

    /// `DEFAULT` value
    pub default: Option<ValueId>,
}

/// A named number of an INTEGER or named bit of a BIT STRING
#[derive(Debug, Clone)]
pub struct NamedNumber {
    pub name: Ident,
    pub value: ValueId,
}

/// Restricted character string and useful time types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Bmp,
    General,
    Graphic,
    IA5,
    Numeric,
    Printable,
    Teletex,
    Universal,
    Utf8,
    Visible,
    GeneralizedTime,
    UtcTime,
    ObjectDescriptor,
}

/// Open type produced from an ObjectClassField type referring to a type field
#[derive(Debug, Clone)]
pub struct OpenType {
    /// The class the field was selected from
    pub class: Reference,

    /// The type field
    pub field: Ident,

    /// Alternatives found through the table constraint, in discovery order.
    /// The types are owned by the objects that define them.
    pub alternatives: IndexMap<String, TypeId>,
}

/// A constraint on a type
#[derive(Debug, Clone)]
pub enum Constraint {
    /// A simple table constraint or a component relation constraint
    Table(TableConstraint),

    /// Any other subtype constraint, not interpreted
    Other(Block),
}

/// `({ObjectSet})` or `({ObjectSet}{@component, ...})`
#[derive(Debug, Clone)]
pub struct TableConstraint {
    /// The object set specification, until parsed
    pub object_set_block: Option<Block>,

    /// The at-notation list, until parsed
    pub at_block: Option<Block>,

    /// The object set, once the block has been parsed
    pub object_set: Option<ObjectSetId>,

    /// The at-notations, once parsed.  Empty for a simple table constraint.
    pub at_notations: Vec<AtNotation>,

    /// The open type receiving the alternatives found through the
    /// constraint.  Either the constrained type itself or, when the open type
    /// was reached through a type reference, a copy owned by the constraint.
    pub constrained_type: Option<TypeId>,

    /// Location of the whole constraint
    pub location: Location,
}

/// `@component.component` or `@.component` within a component relation
/// constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtNotation {
    /// Number of dots before the first component.  Zero means the path starts
    /// at the outermost enclosing type.
    pub level: usize,

    /// Component identifiers to descend through
    pub components: Vec<Ident>,

    /// Location of the at-notation
    pub location: Location,
}

impl TypeKind {
    /// Name of the type as written in ASN.1, for diagnostics and naming
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Boolean => "BOOLEAN",
            TypeKind::Null => "NULL",
            TypeKind::Integer(_) => "INTEGER",
            TypeKind::Real => "REAL",
            TypeKind::BitString(_) => "BIT STRING",
            TypeKind::OctetString => "OCTET STRING",
            TypeKind::ObjectIdentifier => "OBJECT IDENTIFIER",
            TypeKind::Enumerated(_) => "ENUMERATED",
            TypeKind::String(kind) => kind.keyword(),
            TypeKind::Sequence(_) => "SEQUENCE",
            TypeKind::Set(_) => "SET",
            TypeKind::Choice(_) => "CHOICE",
            TypeKind::SequenceOf(_) => "SEQUENCE OF",
            TypeKind::SetOf(_) => "SET OF",
            TypeKind::Reference(_) => "reference",
            TypeKind::ClassField { .. } => "object class field",
            TypeKind::Open(_) => "open type",
        }
    }

    /// Components of a SEQUENCE, SET or CHOICE
    pub fn components(&self) -> Option<&[Component]> {
        match self {
            TypeKind::Sequence(c) | TypeKind::Set(c) | TypeKind::Choice(c) => Some(c),
            _ => None,
        }
    }

    /// Can the type contain named components reachable by a component
    /// relation constraint
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TypeKind::Sequence(_) | TypeKind::Set(_) | TypeKind::Choice(_) | TypeKind::Open(_)
        )
    }

    /// Is this a type built from other named or anonymous types
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            TypeKind::Sequence(_)
                | TypeKind::Set(_)
                | TypeKind::Choice(_)
                | TypeKind::SequenceOf(_)
                | TypeKind::SetOf(_)
                | TypeKind::Enumerated(_)
        )
    }
}

impl StringKind {
    /// The ASN.1 keyword for the type
    pub fn keyword(self) -> &'static str {
        match self {
            StringKind::Bmp => "BMPString",
            StringKind::General => "GeneralString",
            StringKind::Graphic => "GraphicString",
            StringKind::IA5 => "IA5String",
            StringKind::Numeric => "NumericString",
            StringKind::Printable => "PrintableString",
            StringKind::Teletex => "TeletexString",
            StringKind::Universal => "UniversalString",
            StringKind::Utf8 => "UTF8String",
            StringKind::Visible => "VisibleString",
            StringKind::GeneralizedTime => "GeneralizedTime",
            StringKind::UtcTime => "UTCTime",
            StringKind::ObjectDescriptor => "ObjectDescriptor",
        }
    }
}

impl Constraint {
    /// The table constraint, if this is one
    pub fn as_table(&self) -> Option<&TableConstraint> {
        match self {
            Constraint::Table(t) => Some(t),
            Constraint::Other(_) => None,
        }
    }
}
