//! Logical clock used to skip re-checking entities that are already up to
//! date.

use std::fmt::Display;

/// A value of the monotonic build clock.  The embedding build driver owns the
/// clock and passes the current value into every analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CompilationTimeStamp(u64);

impl CompilationTimeStamp {
    /// A timestamp with the given clock value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Is this timestamp strictly before `other`
    pub fn is_less(self, other: CompilationTimeStamp) -> bool {
        self.0 < other.0
    }

    /// The following clock value
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for CompilationTimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Has an entity last checked at `last` already been checked at `timestamp`
pub fn is_fresh(last: Option<CompilationTimeStamp>, timestamp: CompilationTimeStamp) -> bool {
    last.is_some_and(|last| !last.is_less(timestamp))
}

/// A cached result together with the time it was computed.  The value is
/// only handed out for timestamps that are not newer than the one it was
/// stored with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    cache: Option<(CompilationTimeStamp, T)>,
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self { cache: None }
    }
}

impl<T> Resolved<T> {
    /// The cached value, if it is up to date at `timestamp`
    pub fn fresh(&self, timestamp: CompilationTimeStamp) -> Option<&T> {
        match &self.cache {
            Some((stamp, value)) if !stamp.is_less(timestamp) => Some(value),
            _ => None,
        }
    }

    /// The cached value regardless of when it was computed
    pub fn last(&self) -> Option<&T> {
        self.cache.as_ref().map(|(_, value)| value)
    }

    /// Replace the cached value
    pub fn store(&mut self, timestamp: CompilationTimeStamp, value: T) {
        self.cache = Some((timestamp, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        let t1 = CompilationTimeStamp::new(1);
        let t2 = t1.next();
        assert!(t1.is_less(t2));
        assert!(!t2.is_less(t1));
        assert!(!t1.is_less(t1));
    }

    #[test]
    fn freshness() {
        let t1 = CompilationTimeStamp::new(1);
        assert!(!is_fresh(None, t1));
        assert!(is_fresh(Some(t1), t1));
        assert!(is_fresh(Some(t1.next()), t1));
        assert!(!is_fresh(Some(t1), t1.next()));
    }

    #[test]
    fn resolved_cache_expires_with_newer_timestamp() {
        let t1 = CompilationTimeStamp::new(4);
        let mut cache = Resolved::default();
        assert_eq!(cache.fresh(t1), None);

        cache.store(t1, "value");
        assert_eq!(cache.fresh(t1), Some(&"value"));
        assert_eq!(cache.fresh(t1.next()), None);
        assert_eq!(cache.last(), Some(&"value"));
    }
}
