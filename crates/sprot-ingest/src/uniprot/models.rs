//! UniProt protein row model

use serde::{Deserialize, Serialize};

/// Widest entry name kept, in bytes
pub const IDENTIFIER_MAX_LEN: usize = 16;
/// Widest primary accession kept, in bytes
pub const ACCESSION_MAX_LEN: usize = 15;
/// Widest CRC-64 token kept, in bytes
pub const CRC64_MAX_LEN: usize = 16;

/// One flat-file record reduced to the seven columns of the protein table.
///
/// Field order matches the destination column order:
/// `(identifier, accession, is_reviewed, is_fragment, length, taxon_id, crc64)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinEntry {
    /// Entry name (e.g. "ALBU_HUMAN")
    pub identifier: String,
    /// Primary accession (e.g. "P02768")
    pub accession: String,
    /// Swiss-Prot (reviewed) rather than TrEMBL
    pub is_reviewed: bool,
    /// Sequence is incomplete at one or both termini
    pub is_fragment: bool,
    /// Sequence length in residues
    pub length: i32,
    /// NCBI taxonomy identifier
    pub taxon_id: i32,
    /// CRC-64 of the sequence, 16 hex characters
    pub crc64: String,
}

impl ProteinEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field differs from its default
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Decode `bytes` and cut the result to at most `max_len` bytes.
///
/// Invalid UTF-8 is replaced rather than rejected. The cut backs off to the
/// nearest char boundary so the result never exceeds `max_len`.
pub(crate) fn bounded_text(bytes: &[u8], max_len: usize) -> String {
    let bytes = &bytes[..bytes.len().min(max_len)];
    let text = String::from_utf8_lossy(bytes);

    let mut end = text.len().min(max_len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
