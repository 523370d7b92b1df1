//! Symbol to bit-code mapping and its persisted JSON form.
//!
//! On disk a table is one flat JSON object. Every symbol appears as its
//! decimal byte value mapped to a string of `0`/`1` digits, and the reserved
//! key `"appended"` holds the number of zero bits padded onto the packed
//! stream:
//!
//! ```json
//! { "65": "0", "66": "10", "67": "11", "appended": 4 }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::write_atomic;
use crate::error::{HuffError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::{HuffmanTree, Node};

/// Reserved key for the padding count. Never a valid symbol key since
/// symbols are written as decimal numbers.
pub const APPENDED_KEY: &str = "appended";

/// Code assigned to the only symbol of a single-leaf tree.
pub const LONE_SYMBOL_CODE: &str = "0";

/// Longest code a 256-symbol alphabet can need.
pub const MAX_CODE_LEN: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: BTreeMap<u8, String>,
    appended: u8,
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    #[serde(flatten)]
    codes: BTreeMap<String, String>,
    appended: u8,
}

fn generate_codes(node: &Node, prefix: &mut String, codes: &mut BTreeMap<u8, String>) {
    if let Some(byte) = node.byte {
        codes.insert(byte, prefix.clone());
        return;
    }
    if let Some(ref left) = node.left {
        prefix.push('0');
        generate_codes(left, prefix, codes);
        prefix.pop();
    }
    if let Some(ref right) = node.right {
        prefix.push('1');
        generate_codes(right, prefix, codes);
        prefix.pop();
    }
}

fn check_code(symbol: u8, code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(HuffError::malformed(Some(symbol), "empty code"));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(HuffError::malformed(
            Some(symbol),
            format!("code is {} bits, longer than {MAX_CODE_LEN}", code.len()),
        ));
    }
    if let Some(digit) = code.chars().find(|c| *c != '0' && *c != '1') {
        return Err(HuffError::malformed(
            Some(symbol),
            format!("invalid digit {digit:?} in code {code:?}"),
        ));
    }
    Ok(())
}

impl CodeTable {
    /// Derives codes by walking the tree: left appends `0`, right appends `1`.
    /// A lone leaf at the root gets [`LONE_SYMBOL_CODE`].
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut codes = BTreeMap::new();
        let root = tree.root();
        match root.byte {
            Some(byte) => {
                codes.insert(byte, LONE_SYMBOL_CODE.to_string());
            }
            None => generate_codes(root, &mut String::new(), &mut codes),
        }
        Self { codes, appended: 0 }
    }

    /// Builds a table from explicit pairs. Codes must be non-empty binary
    /// strings; prefix-freeness is checked when a tree is rebuilt.
    pub fn from_codes<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, String)>,
    {
        let mut codes = BTreeMap::new();
        for (symbol, code) in pairs {
            check_code(symbol, &code)?;
            codes.insert(symbol, code);
        }
        Ok(Self { codes, appended: 0 })
    }

    pub fn code(&self, symbol: u8) -> Option<&str> {
        self.codes.get(&symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// `(symbol, code)` pairs in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.codes.iter().map(|(&s, c)| (s, c.as_str()))
    }

    pub fn appended(&self) -> u8 {
        self.appended
    }

    pub fn set_appended(&mut self, appended: u8) -> Result<()> {
        if appended > 7 {
            return Err(HuffError::InvalidTable(format!(
                "appended must be 0-7, got {appended}"
            )));
        }
        self.appended = appended;
        Ok(())
    }

    /// True when no code is a prefix of (or equal to) another.
    pub fn is_prefix_free(&self) -> bool {
        let mut codes: Vec<&str> = self.codes.values().map(String::as_str).collect();
        codes.sort_unstable();
        codes.windows(2).all(|w| !w[1].starts_with(w[0]))
    }

    /// Total payload length in bits for input with the given frequencies.
    pub fn encoded_bits(&self, freqs: &FrequencyTable) -> Result<u64> {
        freqs.iter().try_fold(0u64, |acc, (symbol, count)| {
            let code = self
                .code(symbol)
                .ok_or_else(|| HuffError::malformed(Some(symbol), "symbol has no code"))?;
            Ok(acc + count * code.len() as u64)
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let file = TableFile {
            codes: self
                .codes
                .iter()
                .map(|(s, c)| (s.to_string(), c.clone()))
                .collect(),
            appended: self.appended,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(text)?;
        let mut pairs = Vec::with_capacity(file.codes.len());
        for (key, code) in file.codes {
            let symbol = key.parse::<u8>().map_err(|_| {
                HuffError::InvalidTable(format!("key {key:?} is not a byte value 0-255"))
            })?;
            pairs.push((symbol, code));
        }
        let mut table = Self::from_codes(pairs)?;
        table.set_appended(file.appended)?;
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.to_json()?.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(data: &[u8]) -> CodeTable {
        let tree = HuffmanTree::from_frequencies(&FrequencyTable::from_bytes(data)).unwrap();
        CodeTable::from_tree(&tree)
    }

    #[test]
    fn two_symbols_get_opposite_single_bits() {
        let table = derive(b"AAAB");
        assert_eq!(table.code(b'B'), Some("0"));
        assert_eq!(table.code(b'A'), Some("1"));
    }

    #[test]
    fn lone_symbol_gets_one_bit() {
        let table = derive(&[42; 10]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.code(42), Some(LONE_SYMBOL_CODE));
    }

    #[test]
    fn derived_codes_are_prefix_free() {
        let table = derive(b"abracadabra, the quick brown fox jumps over the lazy dog");
        assert!(table.is_prefix_free());
    }

    #[test]
    fn detects_prefix_collision() {
        let table = CodeTable::from_codes([(1, "1".into()), (2, "10".into())]).unwrap();
        assert!(!table.is_prefix_free());
    }

    #[test]
    fn frequent_symbols_get_shorter_codes() {
        let table = derive(b"aaaaaaaabbbbccd");
        let len = |s: u8| table.code(s).map(str::len).unwrap();
        assert!(len(b'a') <= len(b'b'));
        assert!(len(b'b') <= len(b'c'));
        assert!(len(b'c') <= len(b'd'));
    }

    #[test]
    fn encoded_bits_sums_code_lengths() {
        let data = b"AAAB";
        let table = derive(data);
        assert_eq!(table.encoded_bits(&FrequencyTable::from_bytes(data)).unwrap(), 4);
    }

    #[test]
    fn json_uses_decimal_keys_and_reserved_appended() {
        let mut table =
            CodeTable::from_codes([(65, "0".into()), (66, "10".into()), (67, "11".into())]).unwrap();
        table.set_appended(4).unwrap();
        let value: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "65": "0", "66": "10", "67": "11", "appended": 4 })
        );
        assert_eq!(CodeTable::from_json(&table.to_json().unwrap()).unwrap(), table);
    }

    #[test]
    fn rejects_out_of_range_padding() {
        let mut table = CodeTable::default();
        assert!(matches!(table.set_appended(8), Err(HuffError::InvalidTable(_))));
        let err = CodeTable::from_json(r#"{ "1": "0", "appended": 9 }"#).unwrap_err();
        assert!(matches!(err, HuffError::InvalidTable(_)));
    }

    #[test]
    fn rejects_bad_symbol_keys() {
        for text in [r#"{ "256": "0", "appended": 0 }"#, r#"{ "x": "0", "appended": 0 }"#] {
            let err = CodeTable::from_json(text).unwrap_err();
            assert!(matches!(err, HuffError::InvalidTable(_)), "{text}");
        }
    }

    #[test]
    fn rejects_non_binary_codes() {
        let err = CodeTable::from_json(r#"{ "3": "012", "appended": 0 }"#).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: Some(3), .. }));
        let err = CodeTable::from_json(r#"{ "3": "", "appended": 0 }"#).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: Some(3), .. }));
    }

    #[test]
    fn rejects_overlong_codes() {
        let longest = "0".repeat(MAX_CODE_LEN);
        assert!(CodeTable::from_codes([(1, longest)]).is_ok());

        let text = format!(r#"{{ "65": "{}", "appended": 0 }}"#, "0".repeat(MAX_CODE_LEN + 1));
        let err = CodeTable::from_json(&text).unwrap_err();
        assert!(matches!(err, HuffError::MalformedCode { symbol: Some(65), .. }));
    }

    #[test]
    fn missing_appended_is_a_json_error() {
        let err = CodeTable::from_json(r#"{ "3": "0" }"#).unwrap_err();
        assert!(matches!(err, HuffError::Json(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let mut table = derive(b"hello world");
        table.set_appended(3).unwrap();
        table.save(&path).unwrap();
        assert_eq!(CodeTable::load(&path).unwrap(), table);
    }
}
