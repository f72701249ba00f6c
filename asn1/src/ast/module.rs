use indexmap::IndexMap;

use crate::{analysis::CompilationTimeStamp, compiler::SourceId, location::Location};

use super::{
    AssignmentId, Block, ClassId, Ident, ModuleId, ObjectId, ObjectSetId, Reference, ScopeId,
    TypeId, ValueId,
};

/// A group of ASN.1 assignments
#[derive(Debug, Clone)]
pub struct Module {
    /// Identifier for the module
    pub name: Ident,

    /// The file the module was read from
    pub source: SourceId,

    /// Top level scope of the module
    pub scope: ScopeId,

    /// Assignments in source order
    pub assignments: IndexMap<String, AssignmentId>,

    /// Symbols imported from other modules
    pub imports: Vec<Import>,

    /// Assignments whose name was already defined earlier in the module
    pub duplicates: Vec<AssignmentId>,
}

/// `a, B FROM Module`
#[derive(Debug, Clone)]
pub struct Import {
    /// The imported symbols
    pub symbols: Vec<Ident>,

    /// The module they are imported from
    pub module: Ident,
}

/// A name resolution scope
#[derive(Debug, Clone)]
pub struct Scope {
    /// Module whose assignments are visible
    pub module: ModuleId,

    /// Actual parameters of an instantiated parameterized assignment, keyed by
    /// the formal parameter name.  Empty for module scopes.
    pub parameters: IndexMap<String, ActualParameter>,
}

/// A named definition in a module
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Name being defined
    pub name: Ident,

    /// Scope the definition is resolved in
    pub scope: ScopeId,

    /// Formal parameters, empty unless the assignment is parameterized
    pub parameters: Vec<FormalParameter>,

    /// Type or class written between the name and `::=`
    pub governor: Option<Governor>,

    /// The right hand side as far as it could be parsed without resolving
    /// names
    pub body: AssignmentBody,

    /// Tokens from the governor to the end of the body, kept for
    /// parameterized assignments so they can be instantiated
    pub tail: Option<Block>,

    /// What the assignment turned out to define
    pub setting: Setting,

    /// The parameterized assignment this is an instance of
    pub instance_of: Option<AssignmentId>,

    /// When the assignment was last checked
    pub last_checked: Option<CompilationTimeStamp>,

    /// Location of the whole assignment
    pub location: Location,
}

/// The governor written in an assignment or formal parameter
#[derive(Debug, Clone)]
pub enum Governor {
    /// A single name that may be a type or a class
    Reference(Reference),

    /// Any other type
    Type(TypeId),
}

/// The right hand side of an assignment, before classification
#[derive(Debug, Clone)]
pub enum AssignmentBody {
    /// A type that is not just a reference
    Type(TypeId),

    /// A class definition
    Class(ClassId),

    /// A single reference, a type or class alias without a governor, or a
    /// value or object reference with one
    Reference(Reference),

    /// `{ ... }` after a governor: a value, value set, object or object set
    Block(Block),

    /// A value that is not braced and not a plain reference
    Value(ValueId),

    /// Parameterized assignments are only parsed when instantiated
    Deferred,
}

/// The classified meaning of an assignment
#[derive(Debug, Clone)]
pub enum Setting {
    /// Not checked yet
    Unclassified,

    /// A parameterized assignment, only its instances are checked
    Parameterized,

    Type(TypeId),
    Value { ty: TypeId, value: ValueId },
    ValueSet { ty: TypeId, block: Block },
    Class(ClassId),
    Object(ObjectId),
    ObjectSet(ObjectSetId),

    /// Could not be classified, a diagnostic has been reported
    Erroneous,
}

/// A formal parameter of a parameterized assignment
#[derive(Debug, Clone)]
pub struct FormalParameter {
    /// Governor of the parameter, absent for type and class parameters
    pub governor: Option<Governor>,

    /// Parameter name
    pub name: Ident,
}

/// An actual parameter bound to a formal parameter in an instance scope
#[derive(Debug, Clone)]
pub enum ActualParameter {
    Type(TypeId),
    Value(ValueId),
    ValueSet(Block),
    Class(ClassId),
    Object(ObjectId),
    ObjectSet(ObjectSetId),
}

impl Setting {
    /// Description of the setting for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Setting::Unclassified => "unclassified assignment",
            Setting::Parameterized => "parameterized assignment",
            Setting::Type(_) => "type",
            Setting::Value { .. } => "value",
            Setting::ValueSet { .. } => "value set",
            Setting::Class(_) => "object class",
            Setting::Object(_) => "object",
            Setting::ObjectSet(_) => "object set",
            Setting::Erroneous => "erroneous assignment",
        }
    }
}
