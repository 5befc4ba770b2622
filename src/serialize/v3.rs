//! v3 wire format: 16-bit code units, one match record per matched node,
//! chains of single-child nodes coalesced, branch tables for the rest.
//!
//! Grounded on the original generator's `serialize_trie`/`encode_link`
//! (depth-first table build, two-pass offset fixup) and on
//! `peat-brubeck/src/rv32_i/formats.rs`'s bit-packing idiom for the match
//! record's field layout.

use super::offsets::Sink;
use super::{check_field, SerializeError};
use crate::dedup::Completions;
use crate::symbols::SymbolTable;
use crate::trie::{MatchRecord, Trie, TrieNode};

const MATCH_BIT: u16 = 0x8000;
const BRANCH_BIT: u16 = 0x4000;

enum Payload {
    Leaf,
    /// A coalesced run of single-child, non-matching nodes; the landing
    /// node's own entry immediately follows this one in table order, so no
    /// explicit link offset is needed.
    Chain { codes: Vec<u16> },
    /// `(symbol triecode, table index of child entry)`.
    Branch { children: Vec<(u16, usize)> },
}

/// Trie edges are keyed by the rule glyph that produced them; almost all of
/// them are registered input symbols, but a sequence's final symbol is only
/// required to be *some* known symbol (see the data model's sequence
/// validation rule), so transform-only symbols are also accepted here.
fn edge_code(c: char, symbols: &SymbolTable) -> u16 {
    symbols
        .input_code(c)
        .or_else(|| symbols.transform_code(c))
        .unwrap_or_else(|| panic!("unregistered trie edge symbol {c:?}"))
}

struct Entry {
    data: Vec<u16>,
    payload: Payload,
}

pub fn serialize(
    trie: &Trie,
    symbols: &SymbolTable,
    completions: &Completions,
) -> Result<Vec<u16>, SerializeError> {
    let mut table: Vec<Entry> = Vec::new();
    build_table(&trie.root, trie, symbols, completions, &mut table)?;

    let mut offsets = vec![0usize; table.len()];
    let mut cumulative = 0usize;
    for i in 0..table.len() {
        if cumulative > 0xFFFF {
            return Err(SerializeError::OffsetOverflow { offset: cumulative });
        }
        offsets[i] = cumulative;
        let mut sink: Sink<u16> = Sink::measuring();
        write_entry(&table[i], &offsets, &mut sink);
        cumulative += sink.len();
    }

    let mut out = Vec::with_capacity(cumulative);
    for entry in &table {
        let mut sink = Sink::Write(&mut out);
        write_entry(entry, &offsets, &mut sink);
    }

    Ok(out)
}

fn build_table(
    node: &TrieNode,
    trie: &Trie,
    symbols: &SymbolTable,
    completions: &Completions,
    table: &mut Vec<Entry>,
) -> Result<usize, SerializeError> {
    let is_branch = node.children.len() > 1;
    let data = match node.match_idx {
        Some(idx) => build_match_data(&trie.records[idx], is_branch, completions)?,
        None => Vec::new(),
    };

    let my_index = table.len();
    table.push(Entry {
        data,
        payload: Payload::Leaf,
    });

    let payload = if node.children.is_empty() {
        Payload::Leaf
    } else if node.children.len() == 1 {
        let (&first_c, first_child) = node.children.iter().next().unwrap();
        let mut codes = vec![edge_code(first_c, symbols)];
        let mut landing = first_child;
        while landing.children.len() == 1 && landing.match_idx.is_none() {
            let (&c, child) = landing.children.iter().next().unwrap();
            codes.push(edge_code(c, symbols));
            landing = child;
        }
        build_table(landing, trie, symbols, completions, table)?;
        Payload::Chain { codes }
    } else {
        let mut children = Vec::new();
        for (&c, child) in node.children.iter() {
            let link = build_table(child, trie, symbols, completions, table)?;
            children.push((edge_code(c, symbols), link));
        }
        Payload::Branch { children }
    };

    table[my_index].payload = payload;
    Ok(my_index)
}

fn build_match_data(
    record: &MatchRecord,
    is_branch: bool,
    completions: &Completions,
) -> Result<Vec<u16>, SerializeError> {
    let func = record.func as u32;
    let backspaces = record.backspaces.expect("match resolved before serialization");
    let completion = record
        .completion
        .as_deref()
        .expect("match resolved before serialization");

    check_field("func", func, 3)?;
    check_field("backspaces", backspaces, 4)?;
    check_field("completion_length", completion.len() as u32, 7)?;

    let offset = completions.offsets[completion];
    if offset > 0xFFFF {
        return Err(SerializeError::OffsetOverflow { offset });
    }

    let mut code = MATCH_BIT;
    if is_branch {
        code |= BRANCH_BIT;
    }
    code |= (func as u16) << 11;
    code |= (backspaces as u16) << 7;
    code |= completion.len() as u16;

    Ok(vec![code, offset as u16])
}

fn write_entry(entry: &Entry, offsets: &[usize], sink: &mut Sink<u16>) {
    for &unit in &entry.data {
        sink.push(unit);
    }
    match &entry.payload {
        Payload::Leaf => {}
        Payload::Chain { codes } => {
            for &code in codes {
                sink.push(code);
            }
            sink.push(0);
        }
        Payload::Branch { children } => {
            for (i, &(code, link)) in children.iter().enumerate() {
                let mut code = code;
                if i == 0 {
                    code |= BRANCH_BIT;
                }
                sink.push(code);
                sink.push(offsets[link] as u16);
            }
            sink.push(0);
        }
    }
}
