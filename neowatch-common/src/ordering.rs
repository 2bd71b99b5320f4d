//! Null-aware comparisons for optional numeric attributes.
//!
//! A missing value is always the worst case: it sorts after every known value,
//! whichever direction the known values are sorted in.

use std::cmp::Ordering;

/// Ascending order, `None` last.
pub fn asc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending order, `None` last.
pub fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `true` before `false` before unknown.
pub fn flag_true_first(a: Option<bool>, b: Option<bool>) -> Ordering {
    fn rank(flag: Option<bool>) -> u8 {
        match flag {
            Some(true) => 0,
            Some(false) => 1,
            None => 2,
        }
    }
    rank(a).cmp(&rank(b))
}
