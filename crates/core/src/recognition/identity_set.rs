use std::collections::BTreeSet;

/// Distinct identities seen during a run.
#[derive(Clone, Debug, Default)]
pub struct IdentitySet {
    names: BTreeSet<String>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`; returns `false` if it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in lexicographic order, without duplicates.
    pub fn finalize(self) -> Vec<String> {
        self.names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = IdentitySet::new();
        assert!(set.insert("Alice"));
        assert!(!set.insert("Alice"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_finalize_sorted_regardless_of_order() {
        let mut forward = IdentitySet::new();
        let mut backward = IdentitySet::new();
        let names = ["Carol", "Alice", "Bob", "Alice"];
        for name in names {
            forward.insert(name);
        }
        for name in names.iter().rev() {
            backward.insert(name);
        }
        let expected = vec!["Alice", "Bob", "Carol"];
        assert_eq!(forward.finalize(), expected);
        assert_eq!(backward.finalize(), expected);
    }

    #[test]
    fn test_empty_finalize() {
        assert!(IdentitySet::new().finalize().is_empty());
    }
}
