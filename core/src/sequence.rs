use std::cmp::Ordering;

use thiserror::Error;

use crate::serde::{ByteReader, ByteWriter, Serde, SerdeErr};

/// Errors that can occur during wrapping sequence arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceNumberError {
    /// Integer overflow occurred during wrapping difference calculation.
    /// This should be mathematically impossible with valid u16 inputs.
    #[error("Integer overflow in wrapping_diff({a}, {b}) - this should not happen")]
    IntegerOverflow { a: u16, b: u16 },
}

/// Returns whether or not a wrapping number is greater than another
/// sequence_greater_than(2,1) will return true
/// sequence_greater_than(1,2) will return false
/// sequence_greater_than(1,1) will return false
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// Returns whether or not a wrapping number is less than another
/// sequence_less_than(1,2) will return true
/// sequence_less_than(2,1) will return false
/// sequence_less_than(1,1) will return false
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}

/// Retrieves the wrapping difference between 2 u16 values.
/// Returns an error if an impossible integer overflow occurs.
///
/// # Examples
/// ```
/// # use slipstream_core::try_wrapping_diff;
/// assert_eq!(try_wrapping_diff(1, 2).unwrap(), 1);
/// assert_eq!(try_wrapping_diff(2, 1).unwrap(), -1);
/// assert_eq!(try_wrapping_diff(65535, 0).unwrap(), 1);
/// assert_eq!(try_wrapping_diff(0, 65535).unwrap(), -1);
/// ```
pub fn try_wrapping_diff(a: u16, b: u16) -> Result<i16, SequenceNumberError> {
    const MAX: i32 = i16::MAX as i32;
    const MIN: i32 = i16::MIN as i32;
    const ADJUST: i32 = (u16::MAX as i32) + 1;

    let a_i32: i32 = i32::from(a);
    let b_i32: i32 = i32::from(b);

    let mut result = b_i32 - a_i32;
    if (MIN..=MAX).contains(&result) {
        Ok(result as i16)
    } else if b_i32 > a_i32 {
        result = b_i32 - (a_i32 + ADJUST);
        if (MIN..=MAX).contains(&result) {
            Ok(result as i16)
        } else {
            Err(SequenceNumberError::IntegerOverflow { a, b })
        }
    } else {
        result = (b_i32 + ADJUST) - a_i32;
        if (MIN..=MAX).contains(&result) {
            Ok(result as i16)
        } else {
            Err(SequenceNumberError::IntegerOverflow { a, b })
        }
    }
}

/// Retrieves the wrapping difference between 2 u16 values.
///
/// # Panics
///
/// Panics if an impossible integer overflow occurs (this should never happen with valid u16 inputs).
///
/// # Examples
/// ```
/// # use slipstream_core::wrapping_diff;
/// assert_eq!(wrapping_diff(1, 2), 1);
/// assert_eq!(wrapping_diff(2, 1), -1);
/// assert_eq!(wrapping_diff(65535, 0), 1);
/// assert_eq!(wrapping_diff(0, 65535), -1);
/// ```
pub fn wrapping_diff(a: u16, b: u16) -> i16 {
    try_wrapping_diff(a, b).expect("integer overflow in wrapping_diff - this should not happen")
}

/// A 16-bit cyclic stream counter. Wraps every 65536 values; ordering
/// comparisons stay correct across the wrap boundary by working on the
/// signed wrapping difference instead of the raw values.
///
/// The one ordering this scheme cannot decide is two values exactly half the
/// range (32768) apart, so the type implements `PartialOrd` rather than
/// `Ord`: `partial_cmp` returns `None` at that distance. Callers must not
/// rely on comparisons between values that far apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns the successor value, wrapping at the end of the range. The
    /// receiver is left untouched.
    #[must_use]
    pub fn increment(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u16> for SequenceNumber {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u16 {
    fn from(value: SequenceNumber) -> Self {
        value.0
    }
}

impl PartialOrd for SequenceNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match wrapping_diff(other.0, self.0) {
            0 => Some(Ordering::Equal),
            i16::MIN => None,
            diff if diff > 0 => Some(Ordering::Greater),
            _ => Some(Ordering::Less),
        }
    }
}

impl Serde for SequenceNumber {
    fn ser(&self, writer: &mut ByteWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self(u16::de(reader)?))
    }
}
