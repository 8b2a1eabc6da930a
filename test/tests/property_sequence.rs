//! Ordering and difference properties of the cyclic sequence space,
//! checked across random values and distances.

use proptest::prelude::*;
use slipstream_core::{
    sequence_greater_than, sequence_less_than, try_wrapping_diff, SequenceNumber,
};

proptest! {
    /// Anything strictly within half the range ahead compares greater.
    #[test]
    fn ahead_by_less_than_half_the_range_is_greater(base: u16, distance in 1u16..=32767) {
        let ahead = base.wrapping_add(distance);
        prop_assert!(sequence_greater_than(ahead, base));
        prop_assert!(sequence_less_than(base, ahead));
        prop_assert!(!sequence_greater_than(base, ahead));
        prop_assert!(!sequence_less_than(ahead, base));
    }

    #[test]
    fn equal_values_are_neither_greater_nor_less(value: u16) {
        prop_assert!(!sequence_greater_than(value, value));
        prop_assert!(!sequence_less_than(value, value));
    }

    /// The signed difference recovers the distance that produced it,
    /// and negates cleanly in the other direction.
    #[test]
    fn the_wrapping_difference_recovers_the_distance(base: u16, distance in 0u16..=32767) {
        let ahead = base.wrapping_add(distance);
        prop_assert_eq!(try_wrapping_diff(base, ahead), Ok(distance as i16));
        prop_assert_eq!(try_wrapping_diff(ahead, base), Ok(-(distance as i16)));
    }

    /// Typed comparisons agree with the free functions everywhere an
    /// order exists; exactly half the range apart there is none.
    #[test]
    fn typed_ordering_agrees_with_the_free_functions(a: u16, b: u16) {
        let left = SequenceNumber::new(a);
        let right = SequenceNumber::new(b);
        if a.wrapping_sub(b) == 32768 {
            prop_assert_eq!(left.partial_cmp(&right), None);
        } else {
            prop_assert_eq!(left > right, sequence_greater_than(a, b));
            prop_assert_eq!(left < right, sequence_less_than(a, b));
            prop_assert_eq!(left == right, a == b);
        }
    }

    /// Incrementing steps to the immediate successor, wrap included.
    #[test]
    fn increment_steps_forward_one_at_a_time(value: u16) {
        let current = SequenceNumber::new(value);
        let next = current.increment();
        prop_assert_eq!(next.value(), value.wrapping_add(1));
        prop_assert!(next > current);
    }
}
