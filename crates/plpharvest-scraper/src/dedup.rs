use std::collections::HashSet;

/// Run-wide set of product ids already accepted.
///
/// Blank ids are never recorded and never reported as seen.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seen(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.seen.contains(id)
    }

    /// Records `id`. Returns `true` if it was not already present.
    pub fn mark(&mut self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.seen.insert(id.to_owned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_id_is_seen() {
        let mut dedup = Deduplicator::new();
        assert!(!dedup.seen("100"));
        assert!(dedup.mark("100"));
        assert!(dedup.seen("100"));
    }

    #[test]
    fn second_mark_reports_duplicate() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.mark("100"));
        assert!(!dedup.mark("100"));
        assert!(!dedup.mark(" 100 "));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn blank_ids_are_ignored() {
        let mut dedup = Deduplicator::new();
        assert!(!dedup.mark(""));
        assert!(!dedup.mark("   "));
        assert!(!dedup.seen(""));
        assert!(dedup.is_empty());
    }
}
