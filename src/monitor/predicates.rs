// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Comparison predicates for target waits.
//!
//! Some attributes never compare well with plain equality: receptor ID
//! lists arrive in arbitrary order, and membership masks only matter in
//! aggregate. These predicates replace the equality check in
//! [`Watch::for_a_change_matching`](super::Watch::for_a_change_matching).

use std::sync::Arc;

use crate::types::AttrValue;

/// Comparison between the current value and the expected value.
pub type Predicate = Arc<dyn Fn(&AttrValue, &AttrValue) -> bool + Send + Sync>;

/// Matches when both values are tuples holding the same set of elements,
/// ignoring order and duplicates.
#[must_use]
pub fn unordered_equal() -> Predicate {
    Arc::new(|current, expected| match (current, expected) {
        (AttrValue::Tuple(current), AttrValue::Tuple(expected)) => {
            element_set(current) == element_set(expected)
        }
        _ => false,
    })
}

/// Matches when both values are numeric tuples with equal sums.
#[must_use]
pub fn sum_equal() -> Predicate {
    Arc::new(|current, expected| match (tuple_sum(current), tuple_sum(expected)) {
        (Some(current), Some(expected)) => (current - expected).abs() < f64::EPSILON,
        _ => false,
    })
}

fn element_set(values: &[AttrValue]) -> Vec<String> {
    let mut set: Vec<String> = values.iter().map(ToString::to_string).collect();
    set.sort_unstable();
    set.dedup();
    set
}

fn tuple_sum(value: &AttrValue) -> Option<f64> {
    let items = value.as_tuple()?;
    items.iter().map(AttrValue::as_f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> AttrValue {
        AttrValue::from(values.to_vec())
    }

    #[test]
    fn unordered_equal_ignores_order() {
        let predicate = unordered_equal();
        assert!(predicate(&ints(&[3, 1, 2]), &ints(&[1, 2, 3])));
        assert!(!predicate(&ints(&[1, 2]), &ints(&[1, 2, 3])));
    }

    #[test]
    fn unordered_equal_ignores_duplicates() {
        let predicate = unordered_equal();
        assert!(predicate(&ints(&[1, 1, 2]), &ints(&[2, 1])));
    }

    #[test]
    fn unordered_equal_rejects_non_tuples() {
        let predicate = unordered_equal();
        assert!(!predicate(&AttrValue::from("ON"), &ints(&[1])));
    }

    #[test]
    fn sum_equal_compares_totals() {
        let predicate = sum_equal();
        assert!(predicate(&ints(&[1, 1, 1, 1]), &ints(&[4])));
        assert!(!predicate(&ints(&[1, 1]), &ints(&[4])));
    }

    #[test]
    fn sum_equal_rejects_non_numeric_tuples() {
        let predicate = sum_equal();
        let mixed = AttrValue::Tuple(vec![AttrValue::from("ON")]);
        assert!(!predicate(&mixed, &ints(&[0])));
    }
}
