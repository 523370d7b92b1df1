//! End-to-end compression pipeline and the file glue around it.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::bits;
use crate::code_table::CodeTable;
use crate::decoder;
use crate::error::{HuffError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::HuffmanTree;

pub const COMPRESSED_EXT: &str = "huff";
const TABLE_SUFFIX: &str = ".json";
const DECOMPRESSED_SUFFIX: &str = ".out";
const TEMP_SUFFIX: &str = ".tmp"; // For atomic writes

/// Packed payload and the table needed to decode it. `table.appended()`
/// holds the payload's padding count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub packed: Vec<u8>,
    pub table: CodeTable,
}

fn table_for(freqs: &FrequencyTable) -> Result<CodeTable> {
    let tree = HuffmanTree::from_frequencies(freqs)?;
    debug!(symbols = freqs.len(), depth = tree.depth(), "built code table");
    Ok(CodeTable::from_tree(&tree))
}

fn finish(mut table: CodeTable, packed: bits::Packed) -> Result<Compressed> {
    table.set_appended(packed.appended)?;
    debug!(
        packed = packed.bytes.len(),
        appended = packed.appended,
        "packed payload"
    );
    Ok(Compressed {
        packed: packed.bytes,
        table,
    })
}

pub fn compress(data: &[u8]) -> Result<Compressed> {
    let table = table_for(&FrequencyTable::from_bytes(data))?;
    let packed = bits::pack(data, &table)?;
    finish(table, packed)
}

/// Two passes over the file: one to count, one to encode.
fn compress_path(input: &Path) -> Result<(u64, Compressed)> {
    let freqs = FrequencyTable::from_reader(BufReader::new(File::open(input)?))?;
    let table = table_for(&freqs)?;
    let packed = bits::pack_reader(BufReader::new(File::open(input)?), &table)?;
    Ok((freqs.total(), finish(table, packed)?))
}

/// Rebuilds the tree from `table` alone and decodes `packed`.
pub fn decompress(packed: &[u8], table: &CodeTable) -> Result<Vec<u8>> {
    let tree = HuffmanTree::from_code_table(table)?;
    decoder::decode(packed, table.appended(), &tree)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub original_len: u64,
    pub compressed_len: u64,
}

impl Report {
    /// Original size divided by compressed size.
    pub fn ratio(&self) -> Option<f64> {
        (self.compressed_len > 0).then(|| self.original_len as f64 / self.compressed_len as f64)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} bytes", self.original_len, self.compressed_len)?;
        match self.ratio() {
            Some(ratio) => write!(f, " (ratio {ratio:.3})"),
            None => Ok(()),
        }
    }
}

/// Result of compressing, persisting the table as text, reloading it and
/// decompressing again, all in memory.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    pub report: Report,
    pub original_digest: String,
    pub recovered_digest: String,
}

impl RoundTrip {
    pub fn matches(&self) -> bool {
        self.original_digest == self.recovered_digest
    }
}

fn digest_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub fn round_trip(data: &[u8]) -> Result<RoundTrip> {
    let compressed = compress(data)?;
    let table = CodeTable::from_json(&compressed.table.to_json()?)?;
    let recovered = decompress(&compressed.packed, &table)?;

    let result = RoundTrip {
        report: Report {
            original_len: data.len() as u64,
            compressed_len: compressed.packed.len() as u64,
        },
        original_digest: digest_hex(data),
        recovered_digest: digest_hex(&recovered),
    };
    if !result.matches() {
        warn!(
            original = %result.original_digest,
            recovered = %result.recovered_digest,
            "round trip mismatch"
        );
    }
    Ok(result)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// `<input>.huff`
pub fn default_output_path(input: &Path) -> PathBuf {
    with_suffix(input, &format!(".{COMPRESSED_EXT}"))
}

/// The table sits next to the compressed file: `<compressed>.json`.
pub fn default_table_path(compressed: &Path) -> PathBuf {
    with_suffix(compressed, TABLE_SUFFIX)
}

/// Strips a trailing `.huff`, or appends `.out` when there is none.
pub fn default_decompressed_path(compressed: &Path) -> PathBuf {
    match compressed.extension() {
        Some(ext) if ext == COMPRESSED_EXT => compressed.with_extension(""),
        _ => with_suffix(compressed, DECOMPRESSED_SUFFIX),
    }
}

/// Writes through a sibling temp file and renames it into place, so `path`
/// only ever holds complete contents.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = with_suffix(path, TEMP_SUFFIX);
    if let Err(e) = fs::write(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(HuffError::Io(e));
    }
    Ok(())
}

pub fn compress_file(input: &Path, output: &Path, table_path: &Path) -> Result<Report> {
    let (original_len, compressed) = compress_path(input)?;

    compressed.table.save(table_path)?;
    if let Err(e) = write_atomic(output, &compressed.packed) {
        let _ = fs::remove_file(table_path);
        return Err(e);
    }

    let report = Report {
        original_len,
        compressed_len: compressed.packed.len() as u64,
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        table = %table_path.display(),
        %report,
        "compressed file"
    );
    Ok(report)
}

/// Returns the number of bytes written to `output`.
pub fn decompress_file(input: &Path, table_path: &Path, output: &Path) -> Result<u64> {
    let table = CodeTable::load(table_path)?;
    let packed = fs::read(input)?;
    let data = decompress(&packed, &table)?;
    write_atomic(output, &data)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = data.len(),
        "decompressed file"
    );
    Ok(data.len() as u64)
}
