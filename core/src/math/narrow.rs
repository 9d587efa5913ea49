use crate::prelude::{CoreError, CoreResult, StorageWidth};
use ndarray::Array2;

/// Unsigned integer type an event array can be stored in.
pub trait EventValue: Copy + Into<f64> + Into<u64> + TryFrom<i64> + Send + Sync + 'static {
    const WIDTH: StorageWidth;

    fn to_le_bytes_vec(self) -> Vec<u8>;
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl EventValue for u8 {
    const WIDTH: StorageWidth = StorageWidth::U8;

    fn to_le_bytes_vec(self) -> Vec<u8> {
        vec![self]
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl EventValue for u16 {
    const WIDTH: StorageWidth = StorageWidth::U16;

    fn to_le_bytes_vec(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl EventValue for u32 {
    const WIDTH: StorageWidth = StorageWidth::U32;

    fn to_le_bytes_vec(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_le_slice(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Smallest and largest value of `raw`, or `None` when it is empty.
pub fn value_range(raw: &Array2<i64>) -> Option<(i64, i64)> {
    raw.iter().fold(None, |range, &value| match range {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// Converts `raw` into `T`, failing with `CoreError::Range` instead of
/// truncating when any value falls outside `T`.
pub fn narrow_to<T: EventValue>(raw: &Array2<i64>) -> CoreResult<Array2<T>> {
    if let Some((min, max)) = value_range(raw) {
        if min < 0 {
            return Err(CoreError::Range {
                value: min,
                width: T::WIDTH,
            });
        }
        if max as u64 > T::WIDTH.max_value() {
            return Err(CoreError::Range {
                value: max,
                width: T::WIDTH,
            });
        }
    }

    let values = raw
        .iter()
        .map(|&value| {
            T::try_from(value).map_err(|_| CoreError::Range {
                value,
                width: T::WIDTH,
            })
        })
        .collect::<CoreResult<Vec<T>>>()?;

    Array2::from_shape_vec(raw.raw_dim(), values)
        .map_err(|err| CoreError::Consistency(format!("event array shape: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn narrows_values_that_fit() {
        let raw = array![[1i64, 2, 65_535], [0, 4, 5]];
        let small = narrow_to::<u16>(&raw).unwrap();
        assert_eq!(small[[0, 2]], 65_535u16);
        assert_eq!(small.shape(), &[2, 3]);
    }

    #[test]
    fn overflow_is_a_range_error_not_a_wrap() {
        let raw = array![[1i64, 70_000], [2, 3]];
        match narrow_to::<u16>(&raw) {
            Err(CoreError::Range { value, width }) => {
                assert_eq!(value, 70_000);
                assert_eq!(width, StorageWidth::U16);
            }
            other => panic!("expected range error, got {:?}", other),
        }
    }

    #[test]
    fn negative_values_are_rejected() {
        let raw = array![[-1i64], [2]];
        assert!(matches!(
            narrow_to::<u32>(&raw),
            Err(CoreError::Range { value: -1, .. })
        ));
    }
}
