//! Test assertions for compensation order.

use super::Journal;

/// Asserts that exactly `expected` were reversed, in that order.
pub fn assert_reversed_in_order(journal: &Journal, expected: &[&str]) {
    let reversed = journal.reversed();
    assert_eq!(
        reversed, expected,
        "Expected reverse order {:?}, got {:?}. Journal: {:?}",
        expected, reversed,
        journal.entries()
    );
}

/// Asserts that `step` was never reversed.
pub fn assert_not_reversed(journal: &Journal, step: &str) {
    assert!(
        !journal.reversed().iter().any(|name| name == step),
        "Expected '{}' not to be reversed. Journal: {:?}",
        step,
        journal.entries()
    );
}
