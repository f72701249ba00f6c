use thiserror::Error;

use crate::{
    diagnostic::{Diagnostic, Label, Level},
    location::Location,
    parser::ParserError,
};

/// Any problem found while resolving and checking modules.  Every error is
/// local to the entity being checked, analysis always continues afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A block that is only parsed once its meaning is known was malformed
    #[error(transparent)]
    Syntax(ParserError),

    #[error("there is no assignment or parameter named `{name}`")]
    UnknownReference { name: String, location: Location },

    #[error("there is no module named `{name}`")]
    UnknownModule { name: String, location: Location },

    #[error("circular reference: {path}")]
    Circular { path: String, location: Location },

    #[error("`{name}` is defined more than once")]
    DuplicateAssignment {
        name: String,
        location: Location,
        first: Location,
    },

    /// A reference resolved to the wrong kind of assignment
    #[error("{expected} reference expected; `{name}` is {found}")]
    ReferenceKind {
        name: String,
        expected: &'static str,
        found: &'static str,
        location: Location,
    },

    /// The right hand side of an assignment does not fit its governor
    #[error("{expected} expected, found {found}")]
    BodyKind {
        expected: &'static str,
        found: &'static str,
        location: Location,
    },

    #[error("`{name}` is not parameterized")]
    NotParameterized { name: String, location: Location },

    #[error("`{name}` is parameterized, actual parameters are required")]
    MissingParameters { name: String, location: Location },

    #[error("`{name}` takes {expected} parameters but {found} were given")]
    ParameterCount {
        name: String,
        expected: usize,
        found: usize,
        location: Location,
    },

    #[error("unsupported reference `{reference}`")]
    UnsupportedReference { reference: String, location: Location },

    #[error("OPTIONAL and DEFAULT are mutually exclusive")]
    OptionalAndDefault { location: Location },

    #[error("UNIQUE and DEFAULT are mutually exclusive")]
    UniqueAndDefault { location: Location },

    #[error("UNIQUE can only be used on fixed-type value fields")]
    UniqueNotValue { location: Location },

    #[error("{expected} setting expected for field `{field}`, found {found}")]
    SettingKind {
        field: String,
        expected: &'static str,
        found: &'static str,
        location: Location,
    },

    #[error("object `{object}` is missing a setting for mandatory field `{field}`")]
    MissingField {
        field: String,
        object: String,
        location: Location,
    },

    #[error("object class `{class}` has no field named `{field}`")]
    UnknownField {
        field: String,
        class: String,
        location: Location,
    },

    #[error("object `{object}` has no setting for field `{field}`")]
    FieldNotSet {
        field: String,
        object: String,
        location: Location,
    },

    #[error("field `{name}` in WITH SYNTAX is not declared by the class")]
    SyntaxUnknownField { name: String, location: Location },

    #[error("field `{name}` appears more than once in WITH SYNTAX")]
    SyntaxDuplicateField { name: String, location: Location },

    #[error("an optional group in WITH SYNTAX must start with a literal")]
    SyntaxGroupStart { location: Location },

    #[error("mandatory field `{name}` cannot be set with the WITH SYNTAX of the class")]
    SyntaxMissingField { name: String, location: Location },

    #[error("objects of objectclass `{expected}` expected; `{object}` is object of class `{found}`")]
    ObjectGovernor {
        expected: String,
        object: String,
        found: String,
        location: Location,
    },

    #[error("objectsets of objectclass `{expected}` expected; `{set}` is objectset of class `{found}`")]
    ObjectSetGovernor {
        expected: String,
        set: String,
        found: String,
        location: Location,
    },

    #[error("{expected} value was expected, found {found}")]
    ValueType {
        expected: String,
        found: &'static str,
        location: Location,
    },

    #[error("`{ty}` has no component named `{name}`")]
    UnknownComponent {
        name: String,
        ty: String,
        location: Location,
    },

    #[error("mandatory component `{name}` is missing")]
    MissingComponent { name: String, location: Location },

    #[error("`{name}` is not a named item of the type")]
    UnknownEnumItem { name: String, location: Location },

    #[error("table constraints can only be applied to object class field types")]
    TableConstraintTarget { location: Location },

    #[error("too many dots: only {available} enclosing types can be referenced")]
    TooManyDots { available: usize, location: Location },

    #[error("no component with name `{name}` in `{ty}`")]
    NoComponent {
        name: String,
        ty: String,
        location: Location,
    },

    #[error("`{ty}` has no components that can be referenced")]
    NotAggregate { ty: String, location: Location },

    #[error("referenced components must be value(set) fields constrained by the same objectset")]
    AtNotationMismatch { location: Location },

    #[error("open type `{ty}` has no alternatives: no object of `{set}` gives a type for `{field}`")]
    NoAlternatives {
        ty: String,
        set: String,
        field: String,
        location: Location,
    },
}

pub type Result<T = (), E = AnalysisError> = std::result::Result<T, E>;

impl AnalysisError {
    /// The primary source location of the error
    pub fn location(&self) -> Location {
        match self {
            AnalysisError::Syntax(e) => e.location(),
            AnalysisError::UnknownReference { location, .. }
            | AnalysisError::UnknownModule { location, .. }
            | AnalysisError::Circular { location, .. }
            | AnalysisError::DuplicateAssignment { location, .. }
            | AnalysisError::ReferenceKind { location, .. }
            | AnalysisError::BodyKind { location, .. }
            | AnalysisError::NotParameterized { location, .. }
            | AnalysisError::MissingParameters { location, .. }
            | AnalysisError::ParameterCount { location, .. }
            | AnalysisError::UnsupportedReference { location, .. }
            | AnalysisError::OptionalAndDefault { location }
            | AnalysisError::UniqueAndDefault { location }
            | AnalysisError::UniqueNotValue { location }
            | AnalysisError::SettingKind { location, .. }
            | AnalysisError::MissingField { location, .. }
            | AnalysisError::UnknownField { location, .. }
            | AnalysisError::FieldNotSet { location, .. }
            | AnalysisError::SyntaxUnknownField { location, .. }
            | AnalysisError::SyntaxDuplicateField { location, .. }
            | AnalysisError::SyntaxGroupStart { location }
            | AnalysisError::SyntaxMissingField { location, .. }
            | AnalysisError::ObjectGovernor { location, .. }
            | AnalysisError::ObjectSetGovernor { location, .. }
            | AnalysisError::ValueType { location, .. }
            | AnalysisError::UnknownComponent { location, .. }
            | AnalysisError::MissingComponent { location, .. }
            | AnalysisError::UnknownEnumItem { location, .. }
            | AnalysisError::TableConstraintTarget { location }
            | AnalysisError::TooManyDots { location, .. }
            | AnalysisError::NoComponent { location, .. }
            | AnalysisError::NotAggregate { location, .. }
            | AnalysisError::AtNotationMismatch { location }
            | AnalysisError::NoAlternatives { location, .. } => location.clone(),
        }
    }

    /// Error code used when reporting the error
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Syntax(e) => e.code(),
            AnalysisError::UnknownReference { .. } | AnalysisError::UnknownModule { .. } => "E101",
            AnalysisError::Circular { .. } => "E102",
            AnalysisError::DuplicateAssignment { .. } => "E103",
            AnalysisError::ReferenceKind { .. } | AnalysisError::BodyKind { .. } => "E104",
            AnalysisError::NotParameterized { .. }
            | AnalysisError::MissingParameters { .. }
            | AnalysisError::ParameterCount { .. } => "E105",
            AnalysisError::UnsupportedReference { .. } => "E106",
            AnalysisError::OptionalAndDefault { .. }
            | AnalysisError::UniqueAndDefault { .. }
            | AnalysisError::UniqueNotValue { .. } => "E110",
            AnalysisError::SettingKind { .. } => "E111",
            AnalysisError::MissingField { .. }
            | AnalysisError::UnknownField { .. }
            | AnalysisError::FieldNotSet { .. } => "E112",
            AnalysisError::SyntaxUnknownField { .. }
            | AnalysisError::SyntaxDuplicateField { .. }
            | AnalysisError::SyntaxGroupStart { .. }
            | AnalysisError::SyntaxMissingField { .. } => "E113",
            AnalysisError::ObjectGovernor { .. } | AnalysisError::ObjectSetGovernor { .. } => "E114",
            AnalysisError::ValueType { .. }
            | AnalysisError::UnknownComponent { .. }
            | AnalysisError::MissingComponent { .. }
            | AnalysisError::UnknownEnumItem { .. } => "E120",
            AnalysisError::TableConstraintTarget { .. } => "E130",
            AnalysisError::TooManyDots { .. }
            | AnalysisError::NoComponent { .. }
            | AnalysisError::NotAggregate { .. } => "E131",
            AnalysisError::AtNotationMismatch { .. } => "E132",
            AnalysisError::NoAlternatives { .. } => "W130",
        }
    }

    /// Severity of the problem.  Only errors stop code generation.
    pub fn level(&self) -> Level {
        match self {
            AnalysisError::NoAlternatives { .. } => Level::Warning,
            _ => Level::Error,
        }
    }
}

impl From<ParserError> for AnalysisError {
    fn from(value: ParserError) -> Self {
        AnalysisError::Syntax(value)
    }
}

impl From<AnalysisError> for Diagnostic {
    fn from(value: AnalysisError) -> Self {
        if let AnalysisError::Syntax(e) = value {
            return e.into();
        }

        let mut diagnostic = Diagnostic::with_level(value.level(), value.code())
            .name(value.to_string())
            .label(Label::new().message(value.to_string()).at(&value.location()));

        if let AnalysisError::DuplicateAssignment { first, .. } = &value {
            diagnostic = diagnostic.label(Label::new().message("first defined here").at(first));
        }

        diagnostic
    }
}
