//! Utility functions for the library.
use ahash::AHashSet;

/// Sort a hash set into a stable display/emission order.
pub fn sorted_from_hash_set<T: Ord + Clone>(set: &AHashSet<T>) -> Vec<T> {
    let mut items: Vec<_> = set.iter().cloned().collect();
    items.sort();
    items
}

/// Join expected-token descriptions as `a or b or c`, dropping duplicates
/// while keeping first-seen order.
pub(crate) fn join_expected(descriptions: &[String]) -> String {
    let mut seen = AHashSet::default();
    let unique: Vec<&str> = descriptions
        .iter()
        .filter(|d| seen.insert(d.as_str()))
        .map(|d| d.as_str())
        .collect();
    unique.join(" or ")
}
