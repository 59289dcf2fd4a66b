//! Sample text generation.
//!
//! Produces plaintext whose symbol mix follows an alphabet's weights, so an
//! encode of the sample shows the code lengths the tree was built for.
//!
//! # Design
//!
//! - Seeded `ChaCha8Rng`: the same alphabet and seed always give the same text
//! - Weighted sampling over the alphabet's entries
//! - If every weight is zero the draw falls back to uniform

use huffcoder_core::WeightedAlphabet;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate `length` symbols drawn from `alphabet` by weight.
///
/// An empty alphabet yields an empty string.
pub fn generate_sample_text(alphabet: &WeightedAlphabet, seed: u64, length: usize) -> String {
    let symbols: Vec<char> = alphabet.symbols().collect();
    if symbols.is_empty() {
        return String::new();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let weights: Vec<f64> = alphabet.iter().map(|(_, weight)| weight).collect();

    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..length).map(|_| symbols[dist.sample(&mut rng)]).collect(),
        // All-zero weights
        Err(_) => (0..length).map(|_| symbols[rng.gen_range(0..symbols.len())]).collect(),
    }
}
