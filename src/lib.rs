//! # huffpack
//!
//! Byte-oriented Huffman compression. A file is packed into a headerless
//! bit stream, and the code table needed to decode it is kept as a separate
//! JSON document.
//!
//! ```
//! use huffpack::{codec, CodeTable};
//!
//! let compressed = codec::compress(b"abracadabra")?;
//! let json = compressed.table.to_json()?;
//!
//! let table = CodeTable::from_json(&json)?;
//! let restored = codec::decompress(&compressed.packed, &table)?;
//! assert_eq!(restored, b"abracadabra");
//! # Ok::<(), huffpack::HuffError>(())
//! ```

pub mod bits;
pub mod code_table;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod frequency;
pub mod journal;
pub mod tree;

pub use code_table::CodeTable;
pub use codec::{Compressed, Report, compress, decompress};
pub use error::{HuffError, Result};
pub use frequency::FrequencyTable;
pub use tree::HuffmanTree;
