use std::collections::BTreeMap;
use std::io::{self, Read};

const READ_CHUNK: usize = 64 * 1024;

/// Occurrence count of every distinct byte value seen in an input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<u8, u64>,
}

impl FrequencyTable {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut counts = BTreeMap::new();
        for &byte in data {
            *counts.entry(byte).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Consumes `reader` to the end, counting in fixed-size chunks.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut counts = BTreeMap::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for &byte in &buf[..n] {
                *counts.entry(byte).or_insert(0) += 1;
            }
        }
        Ok(Self { counts })
    }

    pub fn get(&self, symbol: u8) -> Option<u64> {
        self.counts.get(&symbol).copied()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterates `(symbol, count)` in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts.iter().map(|(&s, &c)| (s, c))
    }
}
