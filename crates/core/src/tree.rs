//! Prefix-code tree construction, encode and decode.
//!
//! # Arena Layout
//!
//! For an alphabet of `m` symbols the tree is a flat arena of `2m - 1`
//! nodes:
//!
//! ```text
//! index:  0 .. m-1        m .. 2m-2
//!         leaves          internal nodes, in merge order
//!         (alphabet       (last slot is the root)
//!          order)
//! ```
//!
//! Children are owning indices (`left`, `right`); `parent` is a plain
//! back-index. No node refers to anything outside its own arena.
//!
//! # Merge Rule
//!
//! Internal slot `i` takes its two children from [`pick`] over `arena[0..i)`.
//! `pick` is a *first-improvement* scan: it starts at the first unparented
//! node and moves to the first later unparented node that is strictly
//! lighter, then stops. It does not look for the global minimum. Existing
//! code tables depend on this exact order, so it must not be replaced with a
//! priority-queue selection.
//!
//! # Boundary Cases
//!
//! - `m = 0`: [`CodeTree::build`] returns `None`.
//! - `m = 1`: a single leaf that is also the root. Its symbol encodes to the
//!   empty code; decoding any bit fails with `CodecError::DegenerateTree`.

use crate::alphabet::WeightedAlphabet;
use crate::code_text::is_line_break;
use crate::error::{CodecError, Result, TableError};
use crate::table;
use std::collections::HashMap;
use tracing::debug;

/// What a node holds: a symbol, or two children. Never both, never neither.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Leaf(char),
    Internal { left: usize, right: usize },
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeNode {
    kind: NodeKind,
    weight: f64,
    parent: Option<usize>,
}

impl CodeNode {
    fn leaf(symbol: char, weight: f64) -> Self {
        Self {
            kind: NodeKind::Leaf(symbol),
            weight,
            parent: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Symbol carried by a leaf; `None` for internal nodes.
    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            NodeKind::Leaf(symbol) => Some(symbol),
            NodeKind::Internal { .. } => None,
        }
    }

    /// `(left, right)` child indices for internal nodes; `None` for leaves.
    pub fn children(&self) -> Option<(usize, usize)> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal { left, right } => Some((left, right)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Index of the parent node; `None` only for the root.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
}

/// Select the next child for a merge from `nodes[0..k)`.
///
/// Finds the first unparented node `x`, then the first `j > x` that is
/// unparented and strictly lighter than `x`. If such a `j` exists it wins and
/// the scan stops there.
///
/// Returns `None` if `nodes[0..k)` has no unparented node.
pub fn pick(nodes: &[CodeNode], k: usize) -> Option<usize> {
    let window = &nodes[..k.min(nodes.len())];

    let x = window.iter().position(|n| n.parent.is_none())?;
    let improved = window[x + 1..]
        .iter()
        .position(|n| n.parent.is_none() && n.weight < window[x].weight)
        .map(|offset| x + 1 + offset);

    Some(improved.unwrap_or(x))
}

/// An immutable prefix-code tree built from a [`WeightedAlphabet`].
#[derive(Debug, Clone)]
pub struct CodeTree {
    nodes: Vec<CodeNode>,
    alphabet: WeightedAlphabet,

    /// Symbol -> leaf index
    leaves: HashMap<char, usize>,

    /// Code per leaf, indexed like the leaves (`0..m`)
    codes: Vec<String>,
}

impl CodeTree {
    /// Build a tree from an alphabet snapshot.
    ///
    /// Returns `None` iff the alphabet is empty.
    pub fn build(alphabet: &WeightedAlphabet) -> Option<Self> {
        let m = alphabet.len();
        if m == 0 {
            return None;
        }

        let mut nodes: Vec<CodeNode> = Vec::with_capacity(2 * m - 1);
        nodes.extend(alphabet.iter().map(|(symbol, weight)| CodeNode::leaf(symbol, weight)));

        for i in m..2 * m - 1 {
            let x = pick(&nodes, i)?;
            nodes[x].parent = Some(i);
            let y = pick(&nodes, i)?;
            nodes[y].parent = Some(i);

            let weight = nodes[x].weight + nodes[y].weight;
            nodes.push(CodeNode {
                kind: NodeKind::Internal { left: x, right: y },
                weight,
                parent: None,
            });
        }

        let leaves = alphabet
            .symbols()
            .enumerate()
            .map(|(index, symbol)| (symbol, index))
            .collect();
        let codes = (0..m).map(|leaf| path_code(&nodes, leaf)).collect();

        debug!(symbols = m, nodes = nodes.len(), "built code tree");

        Some(Self {
            nodes,
            alphabet: alphabet.clone(),
            leaves,
            codes,
        })
    }

    /// [`CodeTree::build`] for callers that need a tree.
    ///
    /// # Errors
    /// `TableError::Empty` when the alphabet has no symbols.
    pub fn try_build(alphabet: &WeightedAlphabet) -> Result<Self> {
        Self::build(alphabet).ok_or_else(|| TableError::Empty.into())
    }

    /// Encode `text` into a '0'/'1' string.
    ///
    /// # Errors
    /// `CodecError::UnknownSymbol` if any character has no leaf. Nothing is
    /// returned for the valid prefix.
    pub fn encode(&self, text: &str) -> Result<String> {
        let mut out = String::new();
        for (position, symbol) in text.chars().enumerate() {
            let code = self
                .code_of(symbol)
                .ok_or(CodecError::UnknownSymbol { symbol, position })?;
            out.push_str(code);
        }
        Ok(out)
    }

    /// Decode a '0'/'1' string, skipping line breaks.
    ///
    /// # Errors
    /// - `CodecError::InvalidCodeSymbol` on any other character
    /// - `CodecError::TruncatedCode` if the input stops inside a code
    /// - `CodecError::DegenerateTree` if the tree has one symbol and the input
    ///   contains at least one bit
    pub fn decode(&self, code: &str) -> Result<String> {
        let root = self.root();
        let mut cursor = root;
        let mut depth = 0;
        let mut out = String::new();

        for (position, c) in code.chars().enumerate() {
            let go_right = match c {
                '0' => false,
                '1' => true,
                c if is_line_break(c) => continue,
                symbol => return Err(CodecError::InvalidCodeSymbol { symbol, position }.into()),
            };

            cursor = match self.nodes[cursor].kind {
                NodeKind::Internal { left, right } => {
                    if go_right {
                        right
                    } else {
                        left
                    }
                }
                NodeKind::Leaf(symbol) => return Err(CodecError::DegenerateTree { symbol }.into()),
            };
            depth += 1;

            if let NodeKind::Leaf(symbol) = self.nodes[cursor].kind {
                out.push(symbol);
                cursor = root;
                depth = 0;
            }
        }

        if cursor != root {
            return Err(CodecError::TruncatedCode { dangling: depth }.into());
        }
        Ok(out)
    }

    /// Code for one symbol, read root to leaf.
    pub fn code_of(&self, symbol: char) -> Option<&str> {
        self.leaves.get(&symbol).map(|&leaf| self.codes[leaf].as_str())
    }

    /// `(symbol, code)` for every leaf, in alphabet order.
    pub fn codes(&self) -> impl Iterator<Item = (char, &str)> + '_ {
        self.alphabet
            .symbols()
            .zip(self.codes.iter().map(String::as_str))
    }

    /// True for the single-leaf tree, which has no root-to-leaf edges.
    pub fn is_degenerate(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of levels; a lone leaf has height 1.
    pub fn height(&self) -> usize {
        self.codes.iter().map(String::len).max().unwrap_or(0) + 1
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.codes.len()
    }

    /// The arena, leaves first, root last.
    pub fn nodes(&self) -> &[CodeNode] {
        &self.nodes
    }

    /// Index of the root (the last arena slot).
    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    /// The alphabet this tree was built from.
    pub fn alphabet(&self) -> &WeightedAlphabet {
        &self.alphabet
    }

    /// CRC32 of the serialized alphabet. Equal alphabets yield equal trees, so
    /// this identifies the tree.
    pub fn fingerprint(&self) -> u32 {
        crc32fast::hash(table::serialize(&self.alphabet).as_bytes())
    }

    /// Weighted mean code length in bits per symbol.
    ///
    /// Returns 0.0 when all weights are zero.
    pub fn average_code_length(&self) -> f64 {
        let total = self.alphabet.total_weight();
        if total == 0.0 {
            return 0.0;
        }
        self.alphabet
            .iter()
            .zip(&self.codes)
            .map(|((_, weight), code)| weight * code.len() as f64)
            .sum::<f64>()
            / total
    }

    /// Check the structural invariants: full binary shape, consistent parent
    /// links, internal weight = sum of children, prefix-free codes.
    pub fn is_well_formed(&self) -> bool {
        let m = self.alphabet.len();
        if self.nodes.len() != 2 * m - 1 || self.nodes[self.root()].parent.is_some() {
            return false;
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node.kind {
                NodeKind::Leaf(_) if index >= m => return false,
                NodeKind::Leaf(_) => {}
                NodeKind::Internal { left, right } => {
                    if index < m || left == right {
                        return false;
                    }
                    if self.nodes[left].parent != Some(index) || self.nodes[right].parent != Some(index) {
                        return false;
                    }
                    if node.weight != self.nodes[left].weight + self.nodes[right].weight {
                        return false;
                    }
                }
            }
        }

        let mut sorted: Vec<&str> = self.codes.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        !sorted.windows(2).any(|pair| pair[1].starts_with(pair[0]))
    }
}

/// Walk leaf -> root, then reverse to get the root -> leaf code.
fn path_code(nodes: &[CodeNode], leaf: usize) -> String {
    let mut bits = Vec::new();
    let mut current = leaf;

    while let Some(parent) = nodes[current].parent {
        match nodes[parent].kind {
            NodeKind::Internal { left, .. } if left == current => bits.push('0'),
            _ => bits.push('1'),
        }
        current = parent;
    }

    bits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn alphabet(entries: &[(char, f64)]) -> WeightedAlphabet {
        WeightedAlphabet::from_entries(entries.iter().copied()).unwrap()
    }

    fn internal_children(tree: &CodeTree) -> Vec<(usize, usize)> {
        tree.nodes().iter().filter_map(CodeNode::children).collect()
    }

    /// Textbook selection: always merge the two lightest unparented nodes.
    fn min_pair_children(entries: &[(char, f64)]) -> Vec<(usize, usize)> {
        let mut weights: Vec<f64> = entries.iter().map(|&(_, w)| w).collect();
        let mut parented = vec![false; weights.len()];
        let mut merges = Vec::new();

        for _ in 1..entries.len() {
            let pick_min = |weights: &Vec<f64>, parented: &mut Vec<bool>| {
                let best = (0..weights.len())
                    .filter(|&i| !parented[i])
                    .min_by(|&a, &b| weights[a].partial_cmp(&weights[b]).unwrap())
                    .unwrap();
                parented[best] = true;
                best
            };
            let x = pick_min(&weights, &mut parented);
            let y = pick_min(&weights, &mut parented);
            merges.push((x, y));
            weights.push(weights[x] + weights[y]);
            parented.push(false);
        }
        merges
    }

    #[test]
    fn test_golden_merge_order() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0), ('d', 2.0)])).unwrap();

        assert_eq!(internal_children(&tree), vec![(0, 1), (2, 3), (4, 5)]);
        let codes: Vec<_> = tree.codes().collect();
        assert_eq!(codes, vec![('a', "00"), ('b', "01"), ('c', "10"), ('d', "11")]);
        assert_eq!(tree.nodes()[tree.root()].weight(), 6.0);
    }

    #[test]
    fn test_first_improvement_is_not_min_pair() {
        let entries = [('a', 4.0), ('b', 3.0), ('c', 1.0), ('d', 2.0)];
        let tree = CodeTree::build(&alphabet(&entries)).unwrap();

        // b is the first node lighter than a, so it wins over the lighter c
        assert_eq!(internal_children(&tree), vec![(1, 2), (3, 0), (4, 5)]);
        let codes: Vec<_> = tree.codes().collect();
        assert_eq!(codes, vec![('a', "11"), ('b', "00"), ('c', "01"), ('d', "10")]);

        assert_ne!(internal_children(&tree), min_pair_children(&entries));
        assert!(tree.codes().all(|(_, code)| code.len() == 2));
    }

    #[test]
    fn test_pick_stops_at_first_improvement() {
        let nodes: Vec<CodeNode> = [('a', 5.0), ('b', 3.0), ('c', 1.0)]
            .iter()
            .map(|&(s, w)| CodeNode::leaf(s, w))
            .collect();

        assert_eq!(pick(&nodes, 3), Some(1));
        // Only looks inside the window
        assert_eq!(pick(&nodes, 1), Some(0));
        assert_eq!(pick(&nodes, 0), None);
    }

    #[test]
    fn test_pick_skips_parented() {
        let mut nodes: Vec<CodeNode> = [('a', 5.0), ('b', 3.0), ('c', 1.0)]
            .iter()
            .map(|&(s, w)| CodeNode::leaf(s, w))
            .collect();
        nodes[0].parent = Some(3);

        // First unparented is b; c is lighter and comes later
        assert_eq!(pick(&nodes, 3), Some(2));
    }

    #[test]
    fn test_equal_weights_keep_first() {
        let tree = CodeTree::build(&alphabet(&[('x', 1.0), ('y', 1.0), ('z', 1.0)])).unwrap();
        assert_eq!(internal_children(&tree), vec![(0, 1), (2, 3)]);
        assert_eq!(tree.code_of('z'), Some("0"));
        assert_eq!(tree.code_of('x'), Some("10"));
        assert_eq!(tree.code_of('y'), Some("11"));
    }

    #[test]
    fn test_empty_alphabet_has_no_tree() {
        assert!(CodeTree::build(&WeightedAlphabet::new()).is_none());
        assert!(matches!(
            CodeTree::try_build(&WeightedAlphabet::new()),
            Err(Error::Table(TableError::Empty))
        ));
    }

    #[test]
    fn test_single_symbol_tree() {
        let tree = CodeTree::build(&alphabet(&[('q', 3.0)])).unwrap();

        assert!(tree.is_degenerate());
        assert!(tree.is_well_formed());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.encode("qqq").unwrap(), "");
        assert_eq!(tree.decode("").unwrap(), "");
        assert_eq!(tree.decode("\n").unwrap(), "");

        let result = tree.decode("0");
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::DegenerateTree { symbol: 'q' }))
        ));
    }

    #[test]
    fn test_encode_decode() {
        let tree = CodeTree::build(&alphabet(&[('h', 1.0), ('e', 1.0), ('l', 3.0), ('o', 2.0), (' ', 1.0)])).unwrap();

        let text = "hello hello";
        let code = tree.encode(text).unwrap();
        assert!(code.chars().all(|c| c == '0' || c == '1'));
        assert_eq!(tree.decode(&code).unwrap(), text);
    }

    #[test]
    fn test_encode_unknown_symbol() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0)])).unwrap();

        let result = tree.encode("abba!ab");
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::UnknownSymbol { symbol: '!', position: 4 }))
        ));
    }

    #[test]
    fn test_decode_skips_line_breaks() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0), ('d', 2.0)])).unwrap();

        assert_eq!(tree.decode("00011011").unwrap(), "abcd");
        assert_eq!(tree.decode("0\n00\n110\r\n11\n").unwrap(), "abcd");
    }

    #[test]
    fn test_decode_invalid_symbol() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0)])).unwrap();

        let result = tree.decode("01 0");
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::InvalidCodeSymbol { symbol: ' ', position: 2 }))
        ));
    }

    #[test]
    fn test_decode_truncated() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0), ('d', 2.0)])).unwrap();

        let result = tree.decode("000");
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::TruncatedCode { dangling: 1 }))
        ));
    }

    #[test]
    fn test_tree_statistics() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0), ('d', 2.0), ('e', 8.0)])).unwrap();

        assert_eq!(tree.node_count(), 9);
        assert_eq!(tree.leaf_count(), 5);
        assert!(tree.is_well_formed());
        let deepest = tree.codes().map(|(_, c)| c.len()).max().unwrap();
        assert_eq!(tree.height(), deepest + 1);
    }

    #[test]
    fn test_zero_weights() {
        let tree = CodeTree::build(&alphabet(&[('a', 0.0), ('b', 0.0), ('c', 0.0)])).unwrap();
        assert!(tree.is_well_formed());
        assert_eq!(tree.average_code_length(), 0.0);
        assert_eq!(tree.decode(&tree.encode("cab").unwrap()).unwrap(), "cab");
    }

    #[test]
    fn test_average_code_length() {
        let tree = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0), ('d', 2.0)])).unwrap();
        assert_eq!(tree.average_code_length(), 2.0);
    }

    #[test]
    fn test_fingerprint_tracks_alphabet() {
        let t1 = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 2.0)])).unwrap();
        let t2 = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 2.0)])).unwrap();
        let t3 = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 3.0)])).unwrap();

        assert_eq!(t1.fingerprint(), t2.fingerprint());
        assert_ne!(t1.fingerprint(), t3.fingerprint());
    }
}
