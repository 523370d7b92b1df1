//! MSB-first bit packing of code strings into bytes, and the reverse.

use std::io::{self, Read};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::code_table::CodeTable;
use crate::error::{HuffError, Result};

/// Packed payload plus the number of zero bits padded onto its last byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packed {
    pub bytes: Vec<u8>,
    pub appended: u8,
}

/// Zero bits needed to bring `bit_len` up to a byte boundary.
pub fn padding_for(bit_len: u64) -> u8 {
    ((8 - bit_len % 8) % 8) as u8
}

pub struct BitPacker {
    writer: BitWriter<Vec<u8>, BigEndian>,
    bit_len: u64,
}

impl BitPacker {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            writer: BitWriter::endian(Vec::with_capacity(bytes), BigEndian),
            bit_len: 0,
        }
    }

    /// Appends the bits of a `0`/`1` code string.
    pub fn push_code(&mut self, code: &str) -> Result<()> {
        for digit in code.chars() {
            let bit = match digit {
                '0' => false,
                '1' => true,
                _ => {
                    return Err(HuffError::malformed(
                        None,
                        format!("invalid digit {digit:?} in code {code:?}"),
                    ));
                }
            };
            self.writer.write_bit(bit)?;
            self.bit_len += 1;
        }
        Ok(())
    }

    /// Bits pushed so far, padding excluded.
    pub fn bit_len(&self) -> u64 {
        self.bit_len
    }

    /// Zero-pads to a byte boundary and returns the bytes.
    pub fn finish(mut self) -> Result<Packed> {
        let appended = padding_for(self.bit_len);
        self.writer.byte_align()?;
        Ok(Packed {
            bytes: self.writer.into_writer(),
            appended,
        })
    }
}

impl Default for BitPacker {
    fn default() -> Self {
        Self::new()
    }
}

const READ_CHUNK: usize = 64 * 1024;

fn push_bytes(packer: &mut BitPacker, bytes: &[u8], table: &CodeTable) -> Result<()> {
    for &byte in bytes {
        let code = table
            .code(byte)
            .ok_or_else(|| HuffError::malformed(Some(byte), "byte not in code table"))?;
        packer.push_code(code)?;
    }
    Ok(())
}

/// Encodes every byte of `data`, in order, with its code from `table`.
pub fn pack(data: &[u8], table: &CodeTable) -> Result<Packed> {
    let mut packer = BitPacker::with_capacity(data.len() / 2);
    push_bytes(&mut packer, data, table)?;
    packer.finish()
}

/// Like [`pack`], reading the input from `reader` in chunks.
pub fn pack_reader<R: Read>(mut reader: R, table: &CodeTable) -> Result<Packed> {
    let mut packer = BitPacker::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        push_bytes(&mut packer, &buf[..n], table)?;
    }
    packer.finish()
}

/// Yields the payload bits of a packed stream, MSB first, with the
/// trailing padding already dropped.
pub struct BitUnpacker<'a> {
    reader: BitReader<&'a [u8], BigEndian>,
    total: usize,
    consumed: usize,
}

impl<'a> BitUnpacker<'a> {
    pub fn new(bytes: &'a [u8], appended: u8) -> Result<Self> {
        if appended > 7 {
            return Err(HuffError::InvalidTable(format!(
                "appended must be 0-7, got {appended}"
            )));
        }
        if bytes.is_empty() && appended != 0 {
            return Err(HuffError::InvalidTable(format!(
                "{appended} padding bits declared for an empty stream"
            )));
        }
        Ok(Self {
            reader: BitReader::endian(bytes, BigEndian),
            total: bytes.len() * 8 - appended as usize,
            consumed: 0,
        })
    }

    pub fn next_bit(&mut self) -> Result<Option<bool>> {
        if self.consumed == self.total {
            return Ok(None);
        }
        let bit = self.reader.read_bit()?;
        self.consumed += 1;
        Ok(Some(bit))
    }

    /// Payload bits in the stream.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.total - self.consumed
    }
}
