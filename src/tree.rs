use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::code_table::CodeTable;
use crate::error::{HuffError, Result};
use crate::frequency::FrequencyTable;

/// A tree node. Leaves carry a byte, internal nodes carry up to two children.
///
/// Nodes rebuilt from a code table have `freq == 0`: the table does not
/// record frequencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub freq: u64,
    pub byte: Option<u8>,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl Node {
    fn leaf(byte: u8, freq: u64) -> Self {
        Self {
            freq,
            byte: Some(byte),
            left: None,
            right: None,
        }
    }

    fn join(left: Box<Node>, right: Box<Node>) -> Self {
        Self {
            freq: left.freq + right.freq,
            byte: None,
            left: Some(left),
            right: Some(right),
        }
    }

    fn branch() -> Self {
        Self {
            freq: 0,
            byte: None,
            left: None,
            right: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.byte.is_some()
    }

    /// `false` selects the left child, `true` the right one.
    pub fn child(&self, bit: bool) -> Option<&Node> {
        if bit {
            self.right.as_deref()
        } else {
            self.left.as_deref()
        }
    }

    fn children(&self) -> impl Iterator<Item = &Node> {
        self.left.as_deref().into_iter().chain(self.right.as_deref())
    }

    fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children().map(Node::leaf_count).sum()
        }
    }

    fn internal_count(&self) -> usize {
        if self.is_leaf() {
            0
        } else {
            1 + self.children().map(Node::internal_count).sum::<usize>()
        }
    }

    fn depth(&self) -> usize {
        self.children().map(|c| 1 + c.depth()).max().unwrap_or(0)
    }

    /// Walks `code` from this node, creating missing branches, and hangs
    /// `symbol` at the end of the path.
    fn insert(&mut self, symbol: u8, code: &str) -> Result<()> {
        if code.is_empty() {
            return Err(HuffError::malformed(Some(symbol), "empty code"));
        }
        let mut cursor = self;
        for digit in code.chars() {
            if let Some(other) = cursor.byte {
                return Err(HuffError::malformed(
                    Some(symbol),
                    format!("code {code} extends the code of symbol {other}"),
                ));
            }
            let slot = match digit {
                '0' => &mut cursor.left,
                '1' => &mut cursor.right,
                _ => {
                    return Err(HuffError::malformed(
                        Some(symbol),
                        format!("invalid digit {digit:?} in code {code:?}"),
                    ));
                }
            };
            cursor = slot.get_or_insert_with(|| Box::new(Node::branch())).as_mut();
        }
        if let Some(other) = cursor.byte {
            return Err(HuffError::malformed(
                Some(symbol),
                format!("code {code} is already assigned to symbol {other}"),
            ));
        }
        if cursor.left.is_some() || cursor.right.is_some() {
            return Err(HuffError::malformed(
                Some(symbol),
                format!("code {code} is a prefix of another symbol's code"),
            ));
        }
        cursor.byte = Some(symbol);
        Ok(())
    }
}

// Priority queue entry. `arrival` breaks frequency ties so that the merge
// order never depends on heap internals.
struct Queued {
    node: Box<Node>,
    arrival: u64,
}

impl Eq for Queued {}
impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        other
            .node
            .freq
            .cmp(&self.node.freq)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}
impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    root: Node,
}

impl HuffmanTree {
    /// Greedy minimum-frequency merge. The first node extracted becomes the
    /// left child. A table with one symbol yields a single-leaf root.
    pub fn from_frequencies(freqs: &FrequencyTable) -> Result<Self> {
        let mut heap = BinaryHeap::with_capacity(freqs.len());
        let mut arrival = 0u64;
        for (byte, freq) in freqs.iter() {
            heap.push(Queued {
                node: Box::new(Node::leaf(byte, freq)),
                arrival,
            });
            arrival += 1;
        }

        loop {
            let left = heap.pop().ok_or(HuffError::EmptyInput)?;
            let Some(right) = heap.pop() else {
                tracing::trace!(weight = left.node.freq, "tree built");
                return Ok(Self { root: *left.node });
            };
            heap.push(Queued {
                node: Box::new(Node::join(left.node, right.node)),
                arrival,
            });
            arrival += 1;
        }
    }

    /// Rebuilds a decoding tree from a persisted code table. Prefix
    /// collisions between codes are rejected here.
    pub fn from_code_table(table: &CodeTable) -> Result<Self> {
        if table.is_empty() {
            return Err(HuffError::EmptyInput);
        }
        let mut root = Node::branch();
        for (symbol, code) in table.iter() {
            root.insert(symbol, code)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn internal_count(&self) -> usize {
        self.root.internal_count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(u8, &str)]) -> CodeTable {
        CodeTable::from_codes(pairs.iter().map(|&(s, c)| (s, c.to_string()))).unwrap()
    }

    #[test]
    fn empty_frequencies_fail() {
        let err = HuffmanTree::from_frequencies(&FrequencyTable::default()).unwrap_err();
        assert!(matches!(err, HuffError::EmptyInput));
    }

    #[test]
    fn single_symbol_is_a_lone_leaf() {
        let tree = HuffmanTree::from_frequencies(&FrequencyTable::from_bytes(&[7; 10])).unwrap();
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().byte, Some(7));
        assert_eq!(tree.root().freq, 10);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.internal_count(), 0);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn lowest_frequency_goes_left() {
        let tree = HuffmanTree::from_frequencies(&FrequencyTable::from_bytes(b"AAAB")).unwrap();
        let root = tree.root();
        assert_eq!(root.freq, 4);
        assert_eq!(root.child(false).and_then(|n| n.byte), Some(b'B'));
        assert_eq!(root.child(true).and_then(|n| n.byte), Some(b'A'));
    }

    #[test]
    fn ties_break_by_symbol_then_arrival() {
        // all equal: 0 and 1 merge first, then 2 and 3, then the two pairs
        let tree = HuffmanTree::from_frequencies(&FrequencyTable::from_bytes(&[3, 2, 1, 0])).unwrap();
        let left = tree.root().child(false).unwrap();
        let right = tree.root().child(true).unwrap();
        assert_eq!(left.child(false).and_then(|n| n.byte), Some(0));
        assert_eq!(left.child(true).and_then(|n| n.byte), Some(1));
        assert_eq!(right.child(false).and_then(|n| n.byte), Some(2));
        assert_eq!(right.child(true).and_then(|n| n.byte), Some(3));
    }

    #[test]
    fn leaf_and_internal_counts() {
        let data = b"this is an example of a huffman tree";
        let freqs = FrequencyTable::from_bytes(data);
        let tree = HuffmanTree::from_frequencies(&freqs).unwrap();
        assert_eq!(tree.leaf_count(), freqs.len());
        assert_eq!(tree.internal_count(), freqs.len() - 1);
        assert_eq!(tree.root().freq, data.len() as u64);
    }

    #[test]
    fn rebuilds_tree_from_codes() {
        let tree = HuffmanTree::from_code_table(&table(&[(65, "0"), (66, "10"), (67, "11")])).unwrap();
        let root = tree.root();
        assert_eq!(root.child(false).and_then(|n| n.byte), Some(65));
        let right = root.child(true).unwrap();
        assert_eq!(right.child(false).and_then(|n| n.byte), Some(66));
        assert_eq!(right.child(true).and_then(|n| n.byte), Some(67));
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.internal_count(), 2);
    }

    #[test]
    fn single_code_rebuilds_with_one_branch() {
        let tree = HuffmanTree::from_code_table(&table(&[(9, "0")])).unwrap();
        assert!(!tree.root().is_leaf());
        assert_eq!(tree.root().child(false).and_then(|n| n.byte), Some(9));
        assert!(tree.root().child(true).is_none());
    }

    #[test]
    fn prefix_collision_is_rejected() {
        let err = HuffmanTree::from_code_table(&table(&[(1, "0"), (2, "01")])).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: Some(2), .. }));

        let err = HuffmanTree::from_code_table(&table(&[(1, "01"), (2, "0")])).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: Some(2), .. }));
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let err = HuffmanTree::from_code_table(&table(&[(1, "10"), (2, "10")])).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { .. }));
    }

    #[test]
    fn empty_table_fails() {
        let err = HuffmanTree::from_code_table(&CodeTable::default()).unwrap_err();
        assert!(matches!(err, HuffError::EmptyInput));
    }
}
