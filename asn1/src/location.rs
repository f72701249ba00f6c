use std::{fmt::Display, ops::Range};

use crate::compiler::SourceId;

/// A byte range within a single source file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// The file the range is in
    pub source: SourceId,

    /// Byte range into the source text.  May be empty to represent a position
    /// between two characters, e.g. the end of a file.
    pub span: Range<usize>,
}

impl Location {
    /// Create a new location
    pub fn new(source: SourceId, span: Range<usize>) -> Self {
        Self { source, span }
    }

    /// The smallest location covering both `self` and `other`.  Both must be
    /// in the same file, otherwise `self` is returned unchanged.
    pub fn to(&self, other: &Location) -> Location {
        if self.source != other.source {
            return self.clone();
        }

        Location {
            source: self.source,
            span: self.span.start.min(other.span.start)..self.span.end.max(other.span.end),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}..{}", self.source, self.span.start, self.span.end)
    }
}
