use thiserror::Error;

use crate::{
    diagnostic::{Diagnostic, Label},
    lexer::LexerError,
    location::Location,
    token::TokenKind,
    util::CowVec,
};

/// Any error that can be emitted by the parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    /// Unable to find one of the token kinds at a given location
    #[error("expected {}, found {got}", expected_list(.kind))]
    Expected {
        kind: CowVec<TokenKind>,
        got: String,
        location: Location,
    },

    /// Recursion depth limit reached in the parser (try to avoid stack overflow)
    #[error("nesting is too deep")]
    ParserDepthExceeded { location: Location },

    /// An error occurred within the lexer
    #[error(transparent)]
    LexerError(#[from] LexerError),

    /// A literal word of a `WITH SYNTAX` specification is missing
    #[error("expected `{word}`, found {got}")]
    ExpectedWord {
        word: String,
        got: String,
        location: Location,
    },

    /// Tokens left over at the end of a block
    #[error("unexpected {got}")]
    TrailingTokens { got: String, location: Location },

    /// A class declares the same field twice
    #[error("duplicate field `{name}`")]
    DuplicateField { name: String, location: Location },

    /// Syntax that is recognised but not handled
    #[error("{what} is not supported")]
    Unsupported { what: &'static str, location: Location },

    /// A number too large to be represented
    #[error("number `{value}` is out of range")]
    NumberRange { value: String, location: Location },
}

pub type Result<T = (), E = ParserError> = std::result::Result<T, E>;

impl ParserError {
    /// Where the error was found
    pub fn location(&self) -> Location {
        match self {
            ParserError::Expected { location, .. }
            | ParserError::ExpectedWord { location, .. }
            | ParserError::ParserDepthExceeded { location }
            | ParserError::TrailingTokens { location, .. }
            | ParserError::DuplicateField { location, .. }
            | ParserError::Unsupported { location, .. }
            | ParserError::NumberRange { location, .. } => location.clone(),
            ParserError::LexerError(e) => Location::new(e.file(), e.offset()..e.offset()),
        }
    }

    /// Error code used when reporting the error
    pub fn code(&self) -> &'static str {
        match self {
            ParserError::LexerError(_) => "E001",
            ParserError::Expected { .. }
            | ParserError::ExpectedWord { .. }
            | ParserError::TrailingTokens { .. } => "E002",
            ParserError::ParserDepthExceeded { .. } => "E003",
            ParserError::DuplicateField { .. } => "E004",
            ParserError::Unsupported { .. } => "E005",
            ParserError::NumberRange { .. } => "E006",
        }
    }
}

fn expected_list(kind: &[TokenKind]) -> String {
    match kind {
        [] => "any token".to_string(),
        [one] => format!("{one:?}"),
        _ => {
            let names: Vec<_> = kind.iter().map(|k| format!("{k:?}")).collect();
            format!("one of {}", names.join(", "))
        }
    }
}

impl From<ParserError> for Diagnostic {
    fn from(value: ParserError) -> Self {
        let location = value.location();
        Diagnostic::error(value.code())
            .name("syntax error")
            .label(Label::new().message(value.to_string()).at(&location))
    }
}

impl From<LexerError> for Diagnostic {
    fn from(value: LexerError) -> Self {
        ParserError::from(value).into()
    }
}
