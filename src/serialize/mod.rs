//! C7: depth-first, two-pass bit-packed trie serialization, one module per
//! wire format.

pub mod offsets;
mod v3;
mod v3_2;

use crate::dedup::Completions;
use crate::symbols::{Format, SymbolTable};
use crate::trie::Trie;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("node link offset {offset} exceeds the 64KiB address space")]
    OffsetOverflow { offset: usize },
    #[error("node has {count} chain-matches, exceeding the 4095 cap")]
    ChainCountOverflow { count: usize },
    #[error("match record field {field} value {value} exceeds its {bits}-bit budget")]
    FieldOverflow {
        field: &'static str,
        value: u32,
        bits: u32,
    },
}

/// The serialized trie, in whichever wire format the config selected.
pub enum Wire {
    V3(Vec<u16>),
    V3_2(Vec<u8>),
}

pub fn serialize(
    trie: &Trie,
    symbols: &SymbolTable,
    completions: &Completions,
) -> Result<Wire, SerializeError> {
    match symbols.format() {
        Format::V3 => v3::serialize(trie, symbols, completions).map(Wire::V3),
        Format::V3_2 => v3_2::serialize(trie, symbols, completions).map(Wire::V3_2),
    }
}

pub(crate) fn check_field(field: &'static str, value: u32, bits: u32) -> Result<(), SerializeError> {
    if value >= (1 << bits) {
        return Err(SerializeError::FieldOverflow { field, value, bits });
    }
    Ok(())
}
