use crate::location::Location;

use super::{Ident, Reference, ScopeId, ValueId};

/// An ASN.1 value.  Values are parsed without knowing their type, so braced
/// values are kept as a generic list of items and interpreted when checked
/// against a type.
#[derive(Debug, Clone)]
pub struct Value {
    /// The syntactic form of the value
    pub kind: ValueKind,

    /// Scope used to resolve references within the value
    pub scope: ScopeId,

    /// Source location of the value
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Boolean(bool),
    Null,
    Integer(i128),
    CString(String),
    HString(String),
    BString(String),

    /// `{ a 1, b 2 }`, `{ 1, 2 }`, `{ iso standard 8571 }`.  Each inner list
    /// is one comma separated item.
    Braced(Vec<Vec<ValueId>>),

    /// `identifier : value`
    Choice(Ident, ValueId),

    /// `label(number)` within an object identifier value
    NamedNumber(Ident, i128),

    /// A value reference, enumeration item, named number, or value field of
    /// an object (`object.&field`)
    Reference(Reference),
}

impl ValueKind {
    /// Short description of the value for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            ValueKind::Boolean(_) => "boolean value",
            ValueKind::Null => "NULL value",
            ValueKind::Integer(_) => "integer value",
            ValueKind::CString(_) => "character string",
            ValueKind::HString(_) => "hexadecimal string",
            ValueKind::BString(_) => "binary string",
            ValueKind::Braced(_) => "braced value",
            ValueKind::Choice(..) => "choice value",
            ValueKind::NamedNumber(..) => "named number",
            ValueKind::Reference(_) => "reference",
        }
    }
}
