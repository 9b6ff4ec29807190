//! Property-based test generators using proptest.
//!
//! Strategies for channel shapes and write sequences.

use proptest::prelude::*;

/// Strategy for valid write buffer capacities.
pub fn capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..64
}

/// Strategy for unpersisted-bytes bounds, 0 (disabled) included.
pub fn bound_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1u64..128]
}

/// Strategy for a sequence of writes, each possibly empty.
pub fn write_sequence_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..96), 0..24)
}

/// Strategy for bytes already in the file before the channel opens.
pub fn existing_contents_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
