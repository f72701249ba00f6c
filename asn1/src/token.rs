use crate::{compiler::SourceId, location::Location};

/// The kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    // Single Character tokens
    LeftCurly,
    RightCurly,
    Less,
    Greater,
    Comma,
    Dot,
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    Hyphen,
    Colon,
    Equals,
    SemiColon,
    At,
    Pipe,
    Exclamation,
    Caret,

    // Compound Tokens
    Assignment,
    Range,
    Ellipsis,
    Number,
    CString,
    HString,
    BString,

    /// Identifier starting with a lower case letter
    ValueReference,

    /// Identifier starting with an upper case letter containing at least one
    /// lower case letter
    TypeReference,

    /// Identifier with no lower case letters.  Object class references must
    /// take this form, but type and module references may too.
    UpperReference,

    /// `&Name`, a type, value set or object set field
    TypeField,

    /// `&name`, a value or object field
    ValueField,

    // Keywords
    KwAll,
    KwAutomatic,
    KwBegin,
    KwBit,
    KwBmpString,
    KwBoolean,
    KwChoice,
    KwClass,
    KwComponents,
    KwDefault,
    KwDefinitions,
    KwEnd,
    KwEnumerated,
    KwExcept,
    KwExplicit,
    KwExports,
    KwExtensibility,
    KwFalse,
    KwFrom,
    KwGeneralizedTime,
    KwGeneralString,
    KwGraphicString,
    KwIA5String,
    KwIdentifier,
    KwImplicit,
    KwImplied,
    KwImports,
    KwInstructions,
    KwInteger,
    KwIntersection,
    KwNull,
    KwNumericString,
    KwObject,
    KwObjectDescriptor,
    KwOctet,
    KwOf,
    KwOptional,
    KwPrintableString,
    KwReal,
    KwSequence,
    KwSet,
    KwSize,
    KwString,
    KwSyntax,
    KwTags,
    KwTeletexString,
    KwTrue,
    KwUnion,
    KwUnique,
    KwUniversalString,
    KwUTCTime,
    KwUTF8String,
    KwVisibleString,
    KwWith,
}

/// Data relating to a single lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token<'a> {
    /// The type of this token
    pub(crate) kind: TokenKind,

    /// The string value of the token, will be a valid string for the token kind
    /// so it can be parsed further, e.g. into a number.
    pub(crate) value: &'a str,

    /// Byte offset into the file that the token starts at.  The end location
    /// can be derived from this offset + the length of the value string.
    pub(crate) offset: usize,

    /// The file ID of the file the token was lexed from
    pub(crate) file: SourceId,
}

/// Data relating to a single lexed token, owning the string value of the token,
/// rather than holding a reference to the source.  Syntax blocks that are only
/// parsed once their meaning is known keep their tokens in this form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenBuffer {
    /// The type of this token
    pub(crate) kind: TokenKind,

    /// The string value of the token.  For identifiers this may be the
    /// normalised form of the source text, so its length is stored separately.
    pub(crate) value: String,

    /// Byte offset into the file that the token starts at.
    pub(crate) offset: usize,

    /// Length of the token in the source file, in bytes
    pub(crate) length: usize,

    /// The file ID of the file the token was lexed from
    pub(crate) file: SourceId,
}

impl Token<'_> {
    /// Convert a token to one that owns its value
    pub fn to_owned(&self) -> TokenBuffer {
        TokenBuffer {
            kind: self.kind,
            value: self.value.to_string(),
            offset: self.offset,
            length: self.value.len(),
            file: self.file,
        }
    }
}

impl TokenBuffer {
    /// Source location covered by this token
    pub fn location(&self) -> Location {
        Location::new(self.file, self.offset..self.offset + self.length)
    }

    /// Is this any kind of reference starting with an upper case letter
    pub fn is_upper_reference(&self) -> bool {
        matches!(self.kind, TokenKind::TypeReference | TokenKind::UpperReference)
    }

    /// Can this token be used as a word within a `WITH SYNTAX` specification
    pub fn is_syntax_word(&self) -> bool {
        self.kind == TokenKind::UpperReference
            || KEYWORD_DATA.iter().any(|&(_, kind)| kind == self.kind)
    }
}

/// String/Enum mapping for keywords
pub const KEYWORD_DATA: [(&str, TokenKind); 55] = [
    ("ALL", TokenKind::KwAll),
    ("AUTOMATIC", TokenKind::KwAutomatic),
    ("BEGIN", TokenKind::KwBegin),
    ("BIT", TokenKind::KwBit),
    ("BMPString", TokenKind::KwBmpString),
    ("BOOLEAN", TokenKind::KwBoolean),
    ("CHOICE", TokenKind::KwChoice),
    ("CLASS", TokenKind::KwClass),
    ("COMPONENTS", TokenKind::KwComponents),
    ("DEFAULT", TokenKind::KwDefault),
    ("DEFINITIONS", TokenKind::KwDefinitions),
    ("END", TokenKind::KwEnd),
    ("ENUMERATED", TokenKind::KwEnumerated),
    ("EXCEPT", TokenKind::KwExcept),
    ("EXPLICIT", TokenKind::KwExplicit),
    ("EXPORTS", TokenKind::KwExports),
    ("EXTENSIBILITY", TokenKind::KwExtensibility),
    ("FALSE", TokenKind::KwFalse),
    ("FROM", TokenKind::KwFrom),
    ("GeneralizedTime", TokenKind::KwGeneralizedTime),
    ("GeneralString", TokenKind::KwGeneralString),
    ("GraphicString", TokenKind::KwGraphicString),
    ("IA5String", TokenKind::KwIA5String),
    ("IDENTIFIER", TokenKind::KwIdentifier),
    ("IMPLICIT", TokenKind::KwImplicit),
    ("IMPLIED", TokenKind::KwImplied),
    ("IMPORTS", TokenKind::KwImports),
    ("INSTRUCTIONS", TokenKind::KwInstructions),
    ("INTEGER", TokenKind::KwInteger),
    ("INTERSECTION", TokenKind::KwIntersection),
    ("NULL", TokenKind::KwNull),
    ("NumericString", TokenKind::KwNumericString),
    ("OBJECT", TokenKind::KwObject),
    ("ObjectDescriptor", TokenKind::KwObjectDescriptor),
    ("OCTET", TokenKind::KwOctet),
    ("OF", TokenKind::KwOf),
    ("OPTIONAL", TokenKind::KwOptional),
    ("PrintableString", TokenKind::KwPrintableString),
    ("REAL", TokenKind::KwReal),
    ("SEQUENCE", TokenKind::KwSequence),
    ("SET", TokenKind::KwSet),
    ("SIZE", TokenKind::KwSize),
    ("STRING", TokenKind::KwString),
    ("SYNTAX", TokenKind::KwSyntax),
    ("TAGS", TokenKind::KwTags),
    ("TeletexString", TokenKind::KwTeletexString),
    ("TRUE", TokenKind::KwTrue),
    ("UNION", TokenKind::KwUnion),
    ("UNIQUE", TokenKind::KwUnique),
    ("UniversalString", TokenKind::KwUniversalString),
    ("UTCTime", TokenKind::KwUTCTime),
    ("UTF8String", TokenKind::KwUTF8String),
    ("VisibleString", TokenKind::KwVisibleString),
    ("WITH", TokenKind::KwWith),
    ("T61String", TokenKind::KwTeletexString),
];
