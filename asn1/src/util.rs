use std::{borrow::Cow, ops::Deref};

/// Cursor over the characters of a source string with unlimited lookahead.
/// Items are the byte offset of each character together with the character.
#[derive(Debug, Clone)]
pub struct CharCursor<'a> {
    source: &'a str,

    /// Byte offset of the next character
    offset: usize,
}

impl<'a> CharCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }

    /// The character `n` places ahead.  `peek(0)` is the character `next()`
    /// would return, without consuming it.
    pub fn peek(&self, n: usize) -> Option<(usize, char)> {
        self.source
            .get(self.offset..)?
            .char_indices()
            .nth(n)
            .map(|(idx, c)| (self.offset + idx, c))
    }
}

impl Iterator for CharCursor<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.source.get(self.offset..)?.chars().next()?;
        let item = (self.offset, c);
        self.offset += c.len_utf8();
        Some(item)
    }
}

/// A list that is usually a static slice, such as the token kinds a parser
/// expects next, but may be built at runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CowVec<T: Clone + 'static>(Cow<'static, [T]>);

impl<T: Clone> From<Vec<T>> for CowVec<T> {
    fn from(value: Vec<T>) -> Self {
        Self(Cow::Owned(value))
    }
}

impl<T: Clone> From<&'static [T]> for CowVec<T> {
    fn from(value: &'static [T]) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl<const N: usize, T: Clone> From<&'static [T; N]> for CowVec<T> {
    fn from(value: &'static [T; N]) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl<T: Clone> Deref for CowVec<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_peeks_without_consuming() {
        let mut cursor = CharCursor::new("a\u{e9}b");
        assert_eq!(cursor.peek(2), Some((3, 'b')));
        assert_eq!(cursor.next(), Some((0, 'a')));
        assert_eq!(cursor.peek(0), Some((1, '\u{e9}')));
        assert_eq!(cursor.next(), Some((1, '\u{e9}')));
        assert_eq!(cursor.next(), Some((3, 'b')));
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.peek(0), None);
    }

    #[test]
    fn expected_lists() {
        let fixed: CowVec<u8> = (&[1, 2]).into();
        let built: CowVec<u8> = vec![1, 2].into();
        assert_eq!(fixed, built);
        assert_eq!(fixed.len(), 2);
    }
}
