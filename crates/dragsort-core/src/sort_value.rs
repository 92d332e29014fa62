//! Integer sort value arithmetic for drag-and-drop ordering
//!
//! Sort values live in `[0, max_sort_value]`. New members are appended
//! `insert_step` past the current maximum; moves split the gap between the
//! neighbours in half. When a split lands on an occupied value the whole
//! relation is respread with `gen_n_sort_values`.

/// Sort value for a member appended with no explicit neighbours.
///
/// # Arguments
/// * `current_max` - Greatest sort value in the relation (None if it is empty)
///
/// # Returns
/// `current_max + insert_step`, or `max_sort_value / 2` for the first member.
/// Saturates instead of wrapping, so an exhausted tail yields an
/// out-of-range candidate.
pub fn gen_append(current_max: Option<i64>, max_sort_value: i64, insert_step: i64) -> i64 {
    match current_max {
        Some(max) => max.saturating_add(insert_step),
        None => max_sort_value / 2,
    }
}

/// Sort value between two optional neighbour values
///
/// # Arguments
/// * `before` - Sort value of the member that should precede (None at the beginning)
/// * `after` - Sort value of the member that should follow (None at the end)
///
/// # Returns
/// None when both neighbours are absent (that case is an append, see
/// `gen_append`). Each operand is halved before adding so the sum cannot
/// overflow.
pub fn gen_between(before: Option<i64>, after: Option<i64>, max_sort_value: i64) -> Option<i64> {
    match (before, after) {
        (None, None) => None,
        (None, Some(after)) => Some(after / 2),
        (Some(before), None) => Some(max_sort_value / 2 + before / 2),
        (Some(before), Some(after)) => Some(before / 2 + after / 2),
    }
}

/// Generate `count` evenly-spaced sort values starting at zero.
///
/// Used for rebalancing a relation. Value `i` is `max_sort_value / count * i`.
pub fn gen_n_sort_values(count: usize, max_sort_value: i64) -> Vec<i64> {
    if count == 0 {
        return Vec::new();
    }
    let gap = max_sort_value / count as i64;
    (0..count as i64).map(|idx| gap * idx).collect()
}

/// Upper-bound check only; negative values are not rejected here.
pub fn is_in_range(sort_value: i64, max_sort_value: i64) -> bool {
    sort_value <= max_sort_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: i64 = 1000;
    const STEP: i64 = 50;

    #[test]
    fn test_gen_append_first_member() {
        assert_eq!(gen_append(None, MAX, STEP), 500);
    }

    #[test]
    fn test_gen_append_after_max() {
        assert_eq!(gen_append(Some(300), MAX, STEP), 350);
    }

    #[test]
    fn test_gen_append_saturates() {
        let value = gen_append(Some(i64::MAX - 1), i64::MAX, 1 << 32);
        assert_eq!(value, i64::MAX);
    }

    #[test]
    fn test_gen_between_no_neighbours() {
        assert_eq!(gen_between(None, None, MAX), None);
    }

    #[test]
    fn test_gen_between_at_beginning() {
        assert_eq!(gen_between(None, Some(100), MAX), Some(50));
        assert_eq!(gen_between(None, Some(1), MAX), Some(0));
    }

    #[test]
    fn test_gen_between_at_end() {
        assert_eq!(gen_between(Some(300), None, MAX), Some(650));
    }

    #[test]
    fn test_gen_between_middle_truncates() {
        assert_eq!(gen_between(Some(100), Some(200), MAX), Some(150));
        assert_eq!(gen_between(Some(101), Some(103), MAX), Some(101));
    }

    #[test]
    fn test_gen_n_sort_values() {
        assert_eq!(gen_n_sort_values(4, MAX), vec![0, 250, 500, 750]);
        assert_eq!(gen_n_sort_values(3, MAX), vec![0, 333, 666]);
    }

    #[test]
    fn test_gen_n_sort_values_empty() {
        assert!(gen_n_sort_values(0, MAX).is_empty());
    }

    #[test]
    fn test_gen_n_sort_values_two() {
        assert_eq!(gen_n_sort_values(2, MAX), vec![0, 500]);
    }

    #[test]
    fn test_range_check_is_upper_bound_only() {
        assert!(is_in_range(MAX, MAX));
        assert!(!is_in_range(MAX + 1, MAX));
        assert!(is_in_range(-1, MAX));
    }

    proptest! {
        #[test]
        fn prop_middle_stays_between_neighbours(a in 0i64..i64::MAX, b in 0i64..i64::MAX) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let mid = gen_between(Some(lo), Some(hi), i64::MAX).unwrap();
            prop_assert!(mid <= hi);
            prop_assert!(mid + 1 >= lo);
        }

        #[test]
        fn prop_rebalanced_values_are_distinct_and_in_range(count in 1usize..500) {
            let values = gen_n_sort_values(count, MAX * 1000);
            prop_assert_eq!(values.len(), count);
            prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(values.iter().all(|v| is_in_range(*v, MAX * 1000)));
        }
    }
}
