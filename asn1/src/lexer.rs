use std::{collections::HashMap, sync::OnceLock};

use thiserror::Error;
use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::{
    compiler::{Features, SourceId},
    token::{self, Token, TokenBuffer, TokenKind},
    util::CharCursor,
};

/// State for converting a source string into a token stream
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// Iterator over all chars in the file
    chars: CharCursor<'a>,

    /// The original source text
    source: &'a str,

    /// File ID to use for all returned tokens
    file: SourceId,

    /// The enabled compiler features
    features: Features,
}

/// Any error that can be produced while lexing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
pub enum LexerError {
    /// A character that cannot start any token
    #[error("unrecognised character {found:?}")]
    Unrecognised {
        found: char,
        offset: usize,
        file: SourceId,
    },

    /// A `/*` comment without a matching `*/`
    #[error("multi-line comment is not terminated")]
    NonTerminatedComment { offset: usize, file: SourceId },

    /// A `"` string without a closing quote
    #[error("character string is not terminated")]
    NonTerminatedString { offset: usize, file: SourceId },

    /// A `'` string without the closing `'H` or `'B`
    #[error("binary or hexadecimal string is not terminated")]
    NonTerminatedBinaryString { offset: usize, file: SourceId },

    /// Non-ascii identifier while unicode identifiers are disabled
    #[error("unicode identifiers are not enabled")]
    UnicodeIdentifier { offset: usize, file: SourceId },
}

pub type Result<T, E = LexerError> = std::result::Result<T, E>;

impl LexerError {
    /// Byte offset of the error
    pub fn offset(&self) -> usize {
        match *self {
            LexerError::Unrecognised { offset, .. }
            | LexerError::NonTerminatedComment { offset, .. }
            | LexerError::NonTerminatedString { offset, .. }
            | LexerError::NonTerminatedBinaryString { offset, .. }
            | LexerError::UnicodeIdentifier { offset, .. } => offset,
        }
    }

    /// File the error was found in
    pub fn file(&self) -> SourceId {
        match *self {
            LexerError::Unrecognised { file, .. }
            | LexerError::NonTerminatedComment { file, .. }
            | LexerError::NonTerminatedString { file, .. }
            | LexerError::NonTerminatedBinaryString { file, .. }
            | LexerError::UnicodeIdentifier { file, .. } => file,
        }
    }
}

impl<'a> Lexer<'a> {
    /// Create a new Lexer for a given source file.  `file` represents a file
    /// ID that will be returned with each token.
    pub fn new(file: SourceId, source: &'a str, features: Features) -> Self {
        Self {
            chars: CharCursor::new(source),
            source,
            file,
            features,
        }
    }

    /// Lex the whole file, skipping all comments and whitespace
    pub fn run(mut self) -> Result<Vec<TokenBuffer>> {
        let mut tokens = vec![];

        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }

        Ok(tokens)
    }

    /// Return the next meaningful token in the file, or None at the end of
    /// the file.
    fn next_token(&mut self) -> Result<Option<TokenBuffer>> {
        self.skip_trivia()?;

        let Some((offset, c)) = self.chars.peek(0) else {
            return Ok(None);
        };

        let tok = match c {
            '{' => self.simple_token(TokenKind::LeftCurly, offset),
            '}' => self.simple_token(TokenKind::RightCurly, offset),
            '<' => self.simple_token(TokenKind::Less, offset),
            '>' => self.simple_token(TokenKind::Greater, offset),
            ',' => self.simple_token(TokenKind::Comma, offset),
            '(' => self.simple_token(TokenKind::LeftParen, offset),
            ')' => self.simple_token(TokenKind::RightParen, offset),
            '[' => self.simple_token(TokenKind::LeftSquare, offset),
            ']' => self.simple_token(TokenKind::RightSquare, offset),
            '-' | '\u{2011}' => self.simple_token(TokenKind::Hyphen, offset),
            '=' => self.simple_token(TokenKind::Equals, offset),
            ';' => self.simple_token(TokenKind::SemiColon, offset),
            '@' => self.simple_token(TokenKind::At, offset),
            '|' => self.simple_token(TokenKind::Pipe, offset),
            '!' => self.simple_token(TokenKind::Exclamation, offset),
            '^' => self.simple_token(TokenKind::Caret, offset),
            '.' => {
                if let Some(tok) = self.multi_token(TokenKind::Ellipsis, offset, "...") {
                    tok
                } else if let Some(tok) = self.multi_token(TokenKind::Range, offset, "..") {
                    tok
                } else {
                    self.simple_token(TokenKind::Dot, offset)
                }
            }
            ':' => self
                .multi_token(TokenKind::Assignment, offset, "::=")
                .unwrap_or_else(|| self.simple_token(TokenKind::Colon, offset)),
            '"' => self.cstring(offset)?,
            '\'' => self.binary_string(offset)?,
            '&' => self.field_reference(offset)?,
            _ if c.is_ascii_digit() => self.number(offset),
            _ if c.is_alphabetic() => self.identifier(c, offset)?,
            _ => {
                return Err(LexerError::Unrecognised {
                    found: c,
                    offset,
                    file: self.file,
                })
            }
        };

        let end = tok.offset + tok.length;
        while matches!(self.chars.peek(0), Some((o, _)) if o < end) {
            self.chars.next();
        }

        Ok(Some(tok))
    }

    /// Skip over all whitespace and comments before the next token
    fn skip_trivia(&mut self) -> Result<()> {
        while let Some((offset, c)) = self.chars.peek(0) {
            match c {
                '-' | '\u{2011}' => {
                    if !self.single_comment() {
                        break;
                    }
                }
                '/' => {
                    if !self.multi_comment(offset)? {
                        break;
                    }
                }
                _ if self.is_whitespace(c) => {
                    self.chars.next();
                }
                _ => break,
            }
        }

        Ok(())
    }

    /// Return a 1 character token
    fn simple_token(&self, kind: TokenKind, offset: usize) -> TokenBuffer {
        let value = &self.source[offset..];
        let len = value.chars().next().map_or(0, char::len_utf8);
        self.token(kind, offset, &value[..len])
    }

    /// Try to return a multi-character token
    fn multi_token(&self, kind: TokenKind, offset: usize, value: &str) -> Option<TokenBuffer> {
        let tok_value = &self.source[offset..];

        if !tok_value.starts_with(value) {
            return None;
        }

        Some(self.token(kind, offset, &tok_value[..value.len()]))
    }

    /// Build an owned token for a slice of the source
    fn token(&self, kind: TokenKind, offset: usize, value: &'a str) -> TokenBuffer {
        Token {
            kind,
            value,
            offset,
            file: self.file,
        }
        .to_owned()
    }

    /// Skip a single line comment which is text between pairs of two hyphens.
    /// Non-breaking hyphens are also accepted instead of hyphens.  Returns false
    /// if the next characters do not start a comment.
    fn single_comment(&mut self) -> bool {
        let Some((_, second)) = self.chars.peek(1) else {
            return false;
        };
        if !matches!(second, '-' | '\u{2011}') {
            return false;
        }
        self.chars.next(); // Consume the first hyphen
        self.chars.next(); // Consume the second hyphen

        while let Some((_, next)) = self.chars.peek(0) {
            if is_newline(next) {
                break;
            }

            if matches!(next, '-' | '\u{2011}')
                && matches!(self.chars.peek(1), Some((_, '-' | '\u{2011}')))
            {
                self.chars.next();
                self.chars.next();
                break;
            }

            self.chars.next();
        }

        true
    }

    /// Skip a multi line comment which is text between `/*` and `*/`.  The comment
    /// ends when a matching `*/` has been found for every `/*` encountered.
    fn multi_comment(&mut self, offset: usize) -> Result<bool> {
        let Some((_, c)) = self.chars.peek(1) else {
            return Ok(false);
        };
        if c != '*' {
            // not a start of comment
            return Ok(false);
        }

        self.chars.next();
        self.chars.next();

        let mut depth = 1;
        while let Some((_, c)) = self.chars.next() {
            if c == '/' && matches!(self.chars.peek(0), Some((_, '*'))) {
                depth += 1;
                self.chars.next();
            } else if c == '*' && matches!(self.chars.peek(0), Some((_, '/'))) {
                depth -= 1;
                self.chars.next();

                if depth == 0 {
                    break;
                }
            }
        }

        if depth != 0 {
            return Err(LexerError::NonTerminatedComment {
                offset,
                file: self.file,
            });
        }

        Ok(true)
    }

    /// Parse an identifier.  Could be a type reference, identifier, value reference
    /// or module reference, or a keyword.
    fn identifier(&mut self, first: char, offset: usize) -> Result<TokenBuffer> {
        if !first.is_ascii_alphabetic() && !self.features.unicode_identifiers {
            return Err(LexerError::UnicodeIdentifier {
                offset,
                file: self.file,
            });
        }

        let value = &self.source[offset..];

        let mut len = first.len_utf8();
        let mut idx = 1;
        let mut contains_lower = first.is_lowercase();
        while let Some((_, c)) = self.chars.peek(idx) {
            if self.is_identifier_char(c) {
                contains_lower |= c.is_lowercase();
                len += c.len_utf8();
                idx += 1;
                continue;
            }

            if c == '-' || c == '\u{2011}' {
                if let Some((_, next)) = self.chars.peek(idx + 1) {
                    if self.is_identifier_char(next) {
                        // does not check the hyphen as it does not count as
                        // lower or upper case
                        contains_lower |= next.is_lowercase();
                        len += c.len_utf8() + next.len_utf8();
                        idx += 2;
                        continue;
                    }
                }
            }

            break;
        }

        let value = &value[..len];

        let ident_kind = if !contains_lower {
            TokenKind::UpperReference
        } else if first.is_lowercase() {
            TokenKind::ValueReference
        } else {
            TokenKind::TypeReference
        };
        let kind = self.keyword(value).unwrap_or(ident_kind);

        let mut tok = self.token(kind, offset, value);
        if !is_nfc(value) {
            tok.value = value.nfc().collect();
        }

        Ok(tok)
    }

    /// Parse a field reference, an ampersand immediately followed by an
    /// identifier
    fn field_reference(&mut self, offset: usize) -> Result<TokenBuffer> {
        let Some((_, first)) = self.chars.peek(1) else {
            return Err(LexerError::Unrecognised {
                found: '&',
                offset,
                file: self.file,
            });
        };

        if !first.is_alphabetic() {
            return Err(LexerError::Unrecognised {
                found: '&',
                offset,
                file: self.file,
            });
        }

        // step over the ampersand so identifier lookahead is relative to the
        // first character of the name
        self.chars.next();
        let ident = self.identifier(first, offset + 1)?;

        let kind = if first.is_lowercase() {
            TokenKind::ValueField
        } else {
            TokenKind::TypeField
        };

        Ok(TokenBuffer {
            kind,
            value: format!("&{}", ident.value),
            offset,
            length: ident.length + 1,
            file: self.file,
        })
    }

    /// Parse a character string, `""` within the string is an escaped quote
    fn cstring(&mut self, offset: usize) -> Result<TokenBuffer> {
        let value = &self.source[offset..];

        let mut idx = 1;
        let mut len = 1;
        loop {
            let Some((_, c)) = self.chars.peek(idx) else {
                return Err(LexerError::NonTerminatedString {
                    offset,
                    file: self.file,
                });
            };
            idx += 1;
            len += c.len_utf8();

            if c == '"' {
                if matches!(self.chars.peek(idx), Some((_, '"'))) {
                    idx += 1;
                    len += 1;
                    continue;
                }
                break;
            }
        }

        Ok(self.token(TokenKind::CString, offset, &value[..len]))
    }

    /// Parse a hexadecimal `'0A'H` or binary `'01'B` string
    fn binary_string(&mut self, offset: usize) -> Result<TokenBuffer> {
        let value = &self.source[offset..];

        let mut idx = 1;
        let mut len = 1;
        loop {
            let Some((_, c)) = self.chars.peek(idx) else {
                return Err(LexerError::NonTerminatedBinaryString {
                    offset,
                    file: self.file,
                });
            };
            idx += 1;
            len += c.len_utf8();

            if c == '\'' {
                break;
            }
        }

        let kind = match self.chars.peek(idx) {
            Some((_, 'H')) => TokenKind::HString,
            Some((_, 'B')) => TokenKind::BString,
            _ => {
                return Err(LexerError::NonTerminatedBinaryString {
                    offset,
                    file: self.file,
                })
            }
        };

        Ok(self.token(kind, offset, &value[..len + 1]))
    }

    /// Parse a number ([1-9][0-9]*)|0
    fn number(&mut self, offset: usize) -> TokenBuffer {
        let value = &self.source[offset..];
        let mut len = 1;
        while let Some((_, ch)) = self.chars.peek(len) {
            if !ch.is_ascii_digit() {
                break;
            }

            len += 1;
        }

        self.token(TokenKind::Number, offset, &value[..len])
    }

    /// Can the character continue an identifier
    fn is_identifier_char(&self, c: char) -> bool {
        if self.features.unicode_identifiers {
            c.is_alphanumeric()
        } else {
            c.is_ascii_alphanumeric()
        }
    }

    /// Is the character any valid whitespace
    fn is_whitespace(&self, c: char) -> bool {
        // A0 = Non breaking space
        "\t \u{A0}".contains(c)
            || is_newline(c)
            || (self.features.unicode_whitespace && c.is_whitespace())
    }

    /// Find the keyword matching an identifier, if there is one
    fn keyword(&self, value: &str) -> Option<TokenKind> {
        if let Some(&kind) = keywords().get(value) {
            return Some(kind);
        }

        if self.features.lowercase_keywords {
            return lowercase_keywords()
                .get(value.to_ascii_lowercase().as_str())
                .copied();
        }

        None
    }
}

/// Is the character a valid newline character
fn is_newline(c: char) -> bool {
    // 0B = Vertical Tab
    // 0C = Form Feed
    "\n\x0B\x0C\r".contains(c)
}

/// Get a mapping from keyword strings to their token kind
fn keywords() -> &'static HashMap<&'static str, TokenKind> {
    static KEYWORDS: OnceLock<HashMap<&'static str, TokenKind>> = OnceLock::new();
    KEYWORDS.get_or_init(|| HashMap::from(token::KEYWORD_DATA))
}

/// Keyword mapping used when keywords may be written in any case
fn lowercase_keywords() -> &'static HashMap<String, TokenKind> {
    static KEYWORDS: OnceLock<HashMap<String, TokenKind>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        token::KEYWORD_DATA
            .iter()
            .map(|&(name, kind)| (name.to_ascii_lowercase(), kind))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(SourceId::new(0), source, Features::default())
            .run()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn identifiers_are_classified_by_case() {
        let toks = lex("op1 Ops OPERATION TYPE-IDENTIFIER");
        assert_eq!(
            toks.iter().map(|t| t.0).collect::<Vec<_>>(),
            vec![
                TokenKind::ValueReference,
                TokenKind::TypeReference,
                TokenKind::UpperReference,
                TokenKind::UpperReference,
            ]
        );
        assert_eq!(toks[3].1, "TYPE-IDENTIFIER");
    }

    #[test]
    fn field_references() {
        let toks = lex("&code &ArgType, &id");
        assert_eq!(toks[0], (TokenKind::ValueField, "&code".to_string()));
        assert_eq!(toks[1], (TokenKind::TypeField, "&ArgType".to_string()));
        assert_eq!(toks[2].0, TokenKind::Comma);
        assert_eq!(toks[3], (TokenKind::ValueField, "&id".to_string()));
    }

    #[test]
    fn field_reference_location_covers_ampersand() {
        let toks = Lexer::new(SourceId::new(0), " &code", Features::default())
            .run()
            .unwrap();
        assert_eq!(toks[0].location().span, 1..6);
    }

    #[test]
    fn comments_are_skipped() {
        let toks = lex("a -- one -- b /* two /* nested */ */ c -- to end of line\nd");
        assert_eq!(
            toks.into_iter().map(|t| t.1).collect::<Vec<_>>(),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn compound_punctuation() {
        let toks = lex("::= ... .. . : {@.code}");
        assert_eq!(
            toks.iter().map(|t| t.0).collect::<Vec<_>>(),
            vec![
                TokenKind::Assignment,
                TokenKind::Ellipsis,
                TokenKind::Range,
                TokenKind::Dot,
                TokenKind::Colon,
                TokenKind::LeftCurly,
                TokenKind::At,
                TokenKind::Dot,
                TokenKind::ValueReference,
                TokenKind::RightCurly,
            ]
        );
    }

    #[test]
    fn strings() {
        let toks = lex(r#""a ""quoted"" word" '0A'H '0101'B"#);
        assert_eq!(toks[0], (TokenKind::CString, r#""a ""quoted"" word""#.to_string()));
        assert_eq!(toks[1], (TokenKind::HString, "'0A'H".to_string()));
        assert_eq!(toks[2], (TokenKind::BString, "'0101'B".to_string()));
    }

    #[test]
    fn lowercase_keywords_feature() {
        let features = Features {
            lowercase_keywords: true,
            ..Features::default()
        };
        let toks = Lexer::new(SourceId::new(0), "sequence Sequence", features)
            .run()
            .unwrap();
        assert!(toks.iter().all(|t| t.kind == TokenKind::KwSequence));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = Lexer::new(SourceId::new(0), "a /* b", Features::default())
            .run()
            .unwrap_err();
        assert!(matches!(err, LexerError::NonTerminatedComment { offset: 2, .. }));
    }
}
