//! C5: the v3 completion resolver. For every unresolved match, simulates the
//! on-screen buffer as the user types the match's sequence, accounting for
//! any shorter rule that would already have fired along the way, then
//! records the exact `(backspaces, completion)` needed to reach the rule's
//! transform.
//!
//! v3_2 never calls [`resolve_all`]: its matches and chain-matches are
//! resolved inline by C4 using [`compute_edit`] directly.

use crate::symbols::Format;
use crate::trie::{MatchRecord, Trie, TrieNode};

/// The backspace/completion edit to turn `screen` into `target`: delete
/// everything after their common prefix, then type the remainder of
/// `target`, with the word-break sentinel rendered as a literal space.
pub fn compute_edit(screen: &str, target: &str, wordbreak: char) -> (u32, String) {
    let screen_chars: Vec<char> = screen.chars().collect();
    let target_chars: Vec<char> = target.chars().collect();
    let common = screen_chars
        .iter()
        .zip(target_chars.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let backspaces = (screen_chars.len() - common) as u32;
    let completion: String = target_chars[common..]
        .iter()
        .map(|&c| if c == wordbreak { ' ' } else { c })
        .collect();
    (backspaces, completion)
}

fn longest_match_at_end(root: &TrieNode, buffer: &[char]) -> Option<usize> {
    let mut node = root;
    let mut longest = None;
    for &c in buffer.iter().rev() {
        match node.children.get(&c) {
            Some(child) => {
                node = child;
                if let Some(idx) = node.match_idx {
                    longest = Some(idx);
                }
            }
            None => break,
        }
    }
    longest
}

/// Resolves every unresolved match in `trie`, recursing into whatever
/// shorter match a sequence's prefix triggers before resolving the match
/// that depends on it.
pub fn resolve_all(trie: &mut Trie, format: Format, wordbreak: char) {
    let Trie { root, records } = trie;
    let root: &TrieNode = &*root;
    fn walk(node: &TrieNode, root: &TrieNode, records: &mut Vec<MatchRecord>, format: Format, wordbreak: char) {
        if let Some(idx) = node.match_idx {
            resolve_one(idx, root, records, format, wordbreak);
        }
        for child in node.children.values() {
            walk(child, root, records, format, wordbreak);
        }
    }
    walk(root, root, records, format, wordbreak);
}

fn resolve_one(
    idx: usize,
    root: &TrieNode,
    records: &mut Vec<MatchRecord>,
    format: Format,
    wordbreak: char,
) {
    if records[idx].is_resolved() {
        return;
    }

    let sequence = records[idx].sequence.clone();
    let target = records[idx].transform.clone();
    let chars: Vec<char> = sequence.chars().collect();

    let mut back: Vec<char> = Vec::new();
    let mut expanded: Vec<char> = Vec::new();

    for &c in &chars[..chars.len().saturating_sub(1)] {
        back.push(c);
        expanded.push(c);

        let mut found = longest_match_at_end(root, &back);
        if found.is_none() {
            found = longest_match_at_end(root, &expanded);
        }

        if let Some(sub_idx) = found {
            resolve_one(sub_idx, root, records, format, wordbreak);
            let sub = &records[sub_idx];
            let backspaces = sub.backspaces.unwrap_or(0) as usize;
            let completion = sub.completion.clone().unwrap_or_default();
            let cut = (backspaces + 1).min(expanded.len());
            expanded.truncate(expanded.len() - cut);
            expanded.extend(completion.chars());
        }
    }

    if format == Format::V3 && expanded.first() == Some(&wordbreak) {
        expanded.remove(0);
    }

    let expanded_str: String = expanded.iter().collect();
    let (backspaces, completion) = compute_edit(&expanded_str, &target, wordbreak);

    records[idx].backspaces = Some(backspaces);
    records[idx].completion = Some(completion);
}
