use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The digit assignment for one grid axis: each of 0-9 exactly once.
///
/// Boards start without axis digits (cells are sold blind); an external
/// administrative process assigns them once. Consumers must tolerate their
/// absence, so a malformed array in a document is treated as "unassigned"
/// rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>")]
pub struct AxisDigits([u8; 10]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AxisDigitsError {
    #[error("axis needs exactly 10 digits, got {0}")]
    WrongLength(usize),
    #[error("axis digits must be a permutation of 0-9")]
    NotAPermutation,
}

impl AxisDigits {
    pub fn new(digits: [u8; 10]) -> Result<Self, AxisDigitsError> {
        let mut seen = [false; 10];
        for &d in &digits {
            if d > 9 || seen[d as usize] {
                return Err(AxisDigitsError::NotAPermutation);
            }
            seen[d as usize] = true;
        }
        Ok(Self(digits))
    }

    /// Zero-based grid index of a trailing score digit, if present.
    /// A well-formed permutation contains every digit, so `None` only
    /// happens for out-of-range input.
    pub fn index_of(&self, digit: u8) -> Option<usize> {
        self.0.iter().position(|&d| d == digit)
    }

    pub fn digits(&self) -> &[u8; 10] {
        &self.0
    }

    /// Lenient decode from raw document JSON: anything that is not a
    /// 10-element permutation of number digits comes back as `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != 10 {
            return None;
        }
        let mut digits = [0u8; 10];
        for (slot, item) in digits.iter_mut().zip(items) {
            *slot = u8::try_from(item.as_u64()?).ok()?;
        }
        Self::new(digits).ok()
    }
}

impl TryFrom<Vec<u8>> for AxisDigits {
    type Error = AxisDigitsError;

    fn try_from(digits: Vec<u8>) -> Result<Self, Self::Error> {
        let len = digits.len();
        let arr: [u8; 10] = digits
            .try_into()
            .map_err(|_| AxisDigitsError::WrongLength(len))?;
        Self::new(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_permutation() {
        let axis = AxisDigits::new([7, 2, 9, 0, 4, 6, 1, 3, 8, 5]).unwrap();
        assert_eq!(axis.index_of(7), Some(0));
        assert_eq!(axis.index_of(5), Some(9));
        assert_eq!(axis.index_of(12), None);
    }

    #[test]
    fn test_rejects_duplicates_and_out_of_range() {
        assert_eq!(
            AxisDigits::new([0, 1, 2, 3, 4, 5, 6, 7, 8, 8]),
            Err(AxisDigitsError::NotAPermutation)
        );
        assert_eq!(
            AxisDigits::new([0, 1, 2, 3, 4, 5, 6, 7, 8, 10]),
            Err(AxisDigitsError::NotAPermutation)
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            AxisDigits::try_from(vec![1, 2, 3]),
            Err(AxisDigitsError::WrongLength(3))
        );
    }

    #[test]
    fn test_lenient_json_decode() {
        assert!(AxisDigits::from_json(&json!([7, 2, 9, 0, 4, 6, 1, 3, 8, 5])).is_some());
        assert!(AxisDigits::from_json(&json!([1, 2, 3])).is_none());
        assert!(AxisDigits::from_json(&json!("0123456789")).is_none());
        assert!(AxisDigits::from_json(&json!([0, 1, 2, 3, 4, 5, 6, 7, 8, "9"])).is_none());
    }
}
