//! Approximate-median selection for the eviction pass.
//!
//! When a sample store fills up, something has to go. Evicting the newest
//! entry would bias the profile toward stacks seen early in the run, and
//! evicting the true minimum would cost a scan per insertion once the store
//! is full. Instead the store batch-evicts every entry at or below an
//! approximate median, freeing about half the slots in one pass, so the cost
//! amortizes to O(1) per insertion while the hot stacks, which have
//! accumulated the most weight, always survive.
//!
//! The approximation is a ternary divide and conquer: split the weights into
//! three near-equal runs, recurse, and take the median of the three
//! sub-results. It lands within the min/max of the input, which is all the
//! eviction pass needs.

use crate::store::Weight;

/// Approximate median of `weights`.
///
/// A single weight is its own median; two are averaged, rounding down; three
/// or more recurse over thirds. The result is always bounded by the minimum
/// and maximum of the input. An empty slice yields 0, but callers never pass
/// one.
pub fn approximate_median(weights: &[Weight]) -> Weight {
    debug_assert!(!weights.is_empty(), "median of an empty weight set");
    match weights {
        [] => 0,
        [single] => *single,
        [a, b] => a.midpoint(*b),
        _ => {
            let third = weights.len() / 3;
            let m1 = approximate_median(&weights[..third]);
            let m2 = approximate_median(&weights[third..2 * third]);
            let m3 = approximate_median(&weights[2 * third..]);
            median_of_three(m1, m2, m3)
        }
    }
}

fn median_of_three(a: Weight, b: Weight, c: Weight) -> Weight {
    a.max(b).min(a.min(b).max(c))
}
