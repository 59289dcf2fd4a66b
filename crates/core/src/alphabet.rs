//! Weighted alphabets: the input that drives tree construction.
//!
//! A [`WeightedAlphabet`] maps single characters to non-negative, finite
//! weights and remembers insertion order. Order matters: leaves are laid out
//! in the arena in exactly this order, and the merge rule in
//! [`crate::tree`] is order sensitive.
//!
//! Re-inserting an existing symbol replaces its weight but keeps the position
//! of its first insertion (mapping semantics).

use crate::error::{AlphabetError, Result};
use std::collections::HashMap;

/// Ordered mapping from symbol to weight.
#[derive(Debug, Clone, Default)]
pub struct WeightedAlphabet {
    /// Entries in insertion order
    entries: Vec<(char, f64)>,

    /// Symbol -> position in `entries`
    index: HashMap<char, usize>,
}

impl WeightedAlphabet {
    /// Create an empty alphabet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a symbol.
    ///
    /// # Errors
    /// `AlphabetError::InvalidWeight` if the weight is negative, NaN or infinite.
    pub fn insert(&mut self, symbol: char, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AlphabetError::InvalidWeight { symbol, weight }.into());
        }
        // -0.0 passes the check above; store it as 0.0 so it serializes as "0"
        let weight = if weight == 0.0 { 0.0 } else { weight };

        match self.index.get(&symbol) {
            Some(&pos) => self.entries[pos].1 = weight,
            None => {
                self.index.insert(symbol, self.entries.len());
                self.entries.push((symbol, weight));
            }
        }
        Ok(())
    }

    /// Build an alphabet from `(symbol, weight)` pairs, rejecting the whole
    /// set if any weight is invalid.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (char, f64)>,
    {
        let mut alphabet = Self::new();
        for (symbol, weight) in entries {
            alphabet.insert(symbol, weight)?;
        }
        Ok(alphabet)
    }

    /// Count character occurrences in `text`, in order of first appearance.
    pub fn from_text(text: &str) -> Self {
        let mut alphabet = Self::new();
        for c in text.chars() {
            match alphabet.index.get(&c) {
                Some(&pos) => alphabet.entries[pos].1 += 1.0,
                None => {
                    alphabet.index.insert(c, alphabet.entries.len());
                    alphabet.entries.push((c, 1.0));
                }
            }
        }
        alphabet
    }

    /// Weight of a symbol, if present.
    pub fn get(&self, symbol: char) -> Option<f64> {
        self.index.get(&symbol).map(|&pos| self.entries[pos].1)
    }

    /// Position of the first entry matching the symbol and/or the weight.
    ///
    /// With both given, an entry must match both. With neither, nothing
    /// matches.
    pub fn position_of(&self, symbol: Option<char>, weight: Option<f64>) -> Option<usize> {
        match (symbol, weight) {
            (None, None) => None,
            (Some(symbol), None) => self.index.get(&symbol).copied(),
            (symbol, Some(weight)) => self
                .entries
                .iter()
                .position(|&(c, w)| w == weight && symbol.map_or(true, |s| s == c)),
        }
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Number of symbols (m).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(symbol, weight)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Symbols in insertion order.
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.iter().map(|&(c, _)| c)
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w).sum()
    }
}

impl PartialEq for WeightedAlphabet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
