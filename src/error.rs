use thiserror::Error;

/// Why a [`HashTable`](crate::HashTable) could not be resized.
///
/// A failed resize leaves the table exactly as it was.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    /// Bucket counts must be powers of two.
    #[error("bucket count {buckets} is not a power of two")]
    NotPowerOfTwo {
        /// The requested bucket count.
        buckets: usize,
    },

    /// The live entries would not fit under the load factor.
    #[error("{live} live entries do not fit in {buckets} buckets (threshold {threshold})")]
    Infeasible {
        /// Entries currently stored.
        live: usize,
        /// The requested bucket count.
        buckets: usize,
        /// Used-bucket limit at the requested bucket count.
        threshold: usize,
    },

    /// The bucket count cannot be doubled without overflowing `usize`.
    #[error("bucket count overflow growing past {buckets} buckets")]
    Overflow {
        /// The current bucket count.
        buckets: usize,
    },

    /// The allocator refused the storage for the new bucket count.
    #[error("failed to allocate storage for {buckets} buckets")]
    AllocFailed {
        /// The requested bucket count.
        buckets: usize,
    },
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn messages_name_the_numbers() {
        let err = CapacityError::Infeasible {
            live: 5,
            buckets: 8,
            threshold: 4,
        };
        assert_eq!(
            err.to_string(),
            "5 live entries do not fit in 8 buckets (threshold 4)"
        );
        assert_eq!(
            CapacityError::NotPowerOfTwo { buckets: 12 }.to_string(),
            "bucket count 12 is not a power of two"
        );
    }
}
