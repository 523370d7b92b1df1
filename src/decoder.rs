use tracing::debug;

use crate::bits::BitUnpacker;
use crate::error::{HuffError, Result};
use crate::tree::HuffmanTree;

/// Recovers the original bytes from a packed stream by walking `tree` one
/// bit at a time, restarting at the root after every leaf.
///
/// A tree whose root is itself a leaf decodes one symbol per `0` bit.
pub fn decode(bytes: &[u8], appended: u8, tree: &HuffmanTree) -> Result<Vec<u8>> {
    let mut bits = BitUnpacker::new(bytes, appended)?;
    let root = tree.root();
    let mut output = Vec::with_capacity(bytes.len() * 2);

    if let Some(byte) = root.byte {
        while let Some(bit) = bits.next_bit()? {
            if bit {
                return Err(HuffError::malformed(
                    Some(byte),
                    format!("unexpected 1 bit at offset {}", bits.consumed() - 1),
                ));
            }
            output.push(byte);
        }
        debug!(symbols = output.len(), "decoded single-symbol stream");
        return Ok(output);
    }

    let mut cursor = root;
    let mut code_start = 0;
    while let Some(bit) = bits.next_bit()? {
        cursor = cursor.child(bit).ok_or_else(|| {
            HuffError::malformed(
                None,
                format!(
                    "no code matches the bits at offset {code_start}..{}",
                    bits.consumed()
                ),
            )
        })?;
        if let Some(byte) = cursor.byte {
            output.push(byte);
            cursor = root;
            code_start = bits.consumed();
        }
    }

    if code_start != bits.total() {
        return Err(HuffError::TruncatedStream {
            consumed: code_start,
            total: bits.total(),
        });
    }

    debug!(symbols = output.len(), bits = bits.total(), "decoded stream");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_table::CodeTable;
    use crate::frequency::FrequencyTable;

    fn rebuilt(pairs: &[(u8, &str)]) -> HuffmanTree {
        let table = CodeTable::from_codes(pairs.iter().map(|&(s, c)| (s, c.to_string()))).unwrap();
        HuffmanTree::from_code_table(&table).unwrap()
    }

    #[test]
    fn decodes_three_symbol_table() {
        let tree = rebuilt(&[(65, "0"), (66, "10"), (67, "11")]);
        // 0 10 11 0 + two padding zeros
        let out = decode(&[0b0101_1000], 2, &tree).unwrap();
        assert_eq!(out, vec![65, 66, 67, 65]);
    }

    #[test]
    fn trailing_leaf_is_emitted() {
        let tree = rebuilt(&[(65, "0"), (66, "1")]);
        assert_eq!(decode(&[0b0000_0001], 0, &tree).unwrap(), vec![65, 65, 65, 65, 65, 65, 65, 66]);
    }

    #[test]
    fn stream_ending_mid_code_is_truncated() {
        let tree = rebuilt(&[(65, "0"), (66, "10"), (67, "11")]);
        // 0 10 1 -> last code unfinished
        let err = decode(&[0b0101_0000], 4, &tree).unwrap_err();
        assert!(matches!(err, HuffError::TruncatedStream { consumed: 3, total: 4 }));
    }

    #[test]
    fn bits_outside_every_code_are_malformed() {
        let tree = rebuilt(&[(65, "0"), (66, "10")]);
        let err = decode(&[0b1100_0000], 6, &tree).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: None, .. }));
    }

    #[test]
    fn builder_tree_with_single_leaf() {
        let tree = HuffmanTree::from_frequencies(&FrequencyTable::from_bytes(&[9; 3])).unwrap();
        assert_eq!(decode(&[0b0000_0000], 5, &tree).unwrap(), vec![9, 9, 9]);
        assert!(decode(&[0b0100_0000], 5, &tree).is_err());
    }

    #[test]
    fn rebuilt_single_symbol_tree() {
        let tree = rebuilt(&[(9, "0")]);
        assert_eq!(decode(&[0x00, 0x00], 6, &tree).unwrap(), vec![9; 10]);
    }

    #[test]
    fn empty_stream_decodes_to_nothing() {
        let tree = rebuilt(&[(65, "0"), (66, "1")]);
        assert!(decode(&[], 0, &tree).unwrap().is_empty());
    }
}
