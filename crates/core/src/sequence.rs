//! Shot ordering by sequence.
//!
//! A sequence is numeric when it consists only of ASCII digits and fits a
//! `u64`. Numeric sequences sort by value and come before every
//! non-numeric sequence; non-numeric sequences sort lexically. Equal keys
//! fall back to creation time.

use std::cmp::Ordering;

use crate::types::Timestamp;

/// Anything that carries a shot sequence and a creation timestamp.
pub trait Sequenced {
    fn sequence(&self) -> &str;
    fn created_at(&self) -> Timestamp;
}

fn numeric_value(sequence: &str) -> Option<u64> {
    let trimmed = sequence.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Compare two sequence strings, ignoring creation time.
pub fn compare_sequence(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Full ordering: sequence first, then creation time.
pub fn compare<T: Sequenced + ?Sized>(a: &T, b: &T) -> Ordering {
    compare_sequence(a.sequence(), b.sequence()).then_with(|| a.created_at().cmp(&b.created_at()))
}

/// Sort in place by [`compare`].
pub fn sort_by_sequence<T: Sequenced>(items: &mut [T]) {
    items.sort_by(|a, b| compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    struct Item {
        seq: &'static str,
        at: Timestamp,
    }

    impl Sequenced for Item {
        fn sequence(&self) -> &str {
            self.seq
        }
        fn created_at(&self) -> Timestamp {
            self.at
        }
    }

    fn order(seqs: &[&'static str]) -> Vec<&'static str> {
        let now = Utc::now();
        let mut items: Vec<Item> = seqs.iter().map(|s| Item { seq: *s, at: now }).collect();
        sort_by_sequence(&mut items);
        items.into_iter().map(|i| i.seq).collect()
    }

    #[test]
    fn numeric_sequences_sort_by_value() {
        assert_eq!(order(&["2", "1", "10", "x"]), vec!["1", "2", "10", "x"]);
    }

    #[test]
    fn non_numeric_sorts_after_numeric_and_lexically() {
        assert_eq!(order(&["b", "3", "a", "12"]), vec!["3", "12", "a", "b"]);
        assert_eq!(compare_sequence("1a", "99"), Ordering::Greater);
        assert_eq!(compare_sequence("-1", "0"), Ordering::Greater);
    }

    #[test]
    fn ties_break_on_creation_time() {
        let now = Utc::now();
        let mut items = vec![
            Item { seq: "1", at: now },
            Item {
                seq: "1",
                at: now - Duration::seconds(5),
            },
        ];
        sort_by_sequence(&mut items);
        assert!(items[0].at < items[1].at);
    }

    #[test]
    fn overflowing_digits_are_non_numeric() {
        let huge = "99999999999999999999999";
        assert_eq!(compare_sequence(huge, "5"), Ordering::Greater);
    }
}
