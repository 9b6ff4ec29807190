//! Benchmark utilities for bufchan.

#![warn(missing_docs)]

use rand::Rng;

/// Generate random payload bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}
