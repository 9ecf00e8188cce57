//! Set arithmetic for list-valued remote fields such as owners and members.

use std::collections::BTreeSet;

/// The additions and removals needed to turn `current` into `desired`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl SetDiff {
    pub fn between(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_is_order_independent() {
        let diff = SetDiff::between(&set(&["c", "a", "b"]), &set(&["b", "d", "c"]));
        assert_eq!(diff.to_add, vec!["d".to_string()]);
        assert_eq!(diff.to_remove, vec!["a".to_string()]);
    }

    #[test]
    fn test_identical_sets_need_nothing() {
        assert!(SetDiff::between(&set(&["a", "b"]), &set(&["b", "a"])).is_empty());
    }
}
