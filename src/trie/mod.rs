//! C4: the reverse-suffix trie. Sequences are inserted reversed, since the
//! firmware walks its keystroke history newest-to-oldest; the terminal node
//! of each inserted path carries a [`MatchRecord`].

mod chain;

use std::collections::BTreeMap;

use crate::resolve;
use crate::rules::Rule;
use crate::symbols::{Format, SymbolTable};

/// A fully- or partially-resolved match produced by a rule.
///
/// `backspaces`/`completion` start unresolved (`None`) for v3 matches (C5
/// fills them in later) and are always resolved immediately for v3_2
/// matches and chain-matches (resolved inline by C4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub sequence: String,
    pub transform: String,
    pub func: u8,
    pub backspaces: Option<u32>,
    pub completion: Option<String>,
}

impl MatchRecord {
    pub fn is_resolved(&self) -> bool {
        self.backspaces.is_some()
    }
}

/// A v3_2-only match expressed relative to an already-emitted sub-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    pub record: MatchRecord,
    pub sub_rule_sequence: String,
}

#[derive(Debug, Default)]
pub struct TrieNode {
    pub children: BTreeMap<char, TrieNode>,
    pub match_idx: Option<usize>,
    pub chain_matches: Vec<ChainMatch>,
}

impl TrieNode {
    fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct Trie {
    pub root: TrieNode,
    pub records: Vec<MatchRecord>,
}

impl Trie {
    fn insert_path(&mut self, sequence: &str) -> &mut TrieNode {
        let mut node = &mut self.root;
        for c in sequence.chars().rev() {
            node = node.children.entry(c).or_insert_with(TrieNode::new);
        }
        node
    }

    fn insert_plain(&mut self, record: MatchRecord) {
        let idx = self.records.len();
        let sequence = record.sequence.clone();
        self.records.push(record);
        self.insert_path(&sequence).match_idx = Some(idx);
    }

    fn insert_chain(&mut self, chain: ChainMatch) {
        let sequence = chain.record.sequence.clone();
        self.insert_path(&sequence).chain_matches.push(chain);
    }

    /// Looks up the longest match anchored at the end of `buffer`, walking
    /// the trie from the root over `buffer` read backwards. Mirrors the
    /// original generator's `get_trie_result`.
    pub fn longest_match_at_end(&self, buffer: &[char]) -> Option<usize> {
        let mut node = &self.root;
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

    /// Visits every node holding an unresolved match, depth-first.
    pub fn for_each_unresolved_match(&self, mut f: impl FnMut(usize)) {
        fn walk(node: &TrieNode, records: &[MatchRecord], f: &mut impl FnMut(usize)) {
            if let Some(idx) = node.match_idx {
                if !records[idx].is_resolved() {
                    f(idx);
                }
            }
            for child in node.children.values() {
                walk(child, records, f);
            }
        }
        walk(&self.root, &self.records, &mut f);
    }
}

/// Builds the trie for `rules`. In v3_2 mode, shorter rules are inserted
/// first and scanned as chain-match candidates for longer ones; backspaces
/// and completions are resolved inline. In v3 mode, rules are inserted as
/// plain unresolved matches for C5 to resolve afterward.
pub fn build(rules: &[Rule], symbols: &SymbolTable) -> Trie {
    let mut trie = Trie::default();

    match symbols.format() {
        Format::V3 => {
            for rule in rules {
                trie.insert_plain(MatchRecord {
                    sequence: rule.sequence.clone(),
                    transform: rule.transform.clone(),
                    func: rule.func,
                    backspaces: None,
                    completion: None,
                });
            }
        }
        Format::V3_2 => {
            let mut sorted: Vec<Rule> = rules.to_vec();
            sorted.sort_by_key(|r| r.sequence.chars().count());

            let mut inserted: Vec<Rule> = Vec::with_capacity(sorted.len());
            for rule in sorted {
                if let Some(sub) = chain::find_chain_sub(&inserted, &rule.sequence) {
                    let suffix: String = rule
                        .sequence
                        .chars()
                        .skip(sub.sequence.chars().count())
                        .collect();
                    let screen = format!("{}{suffix}", sub.transform);
                    let (backspaces, completion) =
                        resolve::compute_edit(&screen, &rule.transform, symbols.wordbreak());
                    trie.insert_chain(ChainMatch {
                        record: MatchRecord {
                            sequence: rule.sequence.clone(),
                            transform: rule.transform.clone(),
                            func: rule.func,
                            backspaces: Some(backspaces),
                            completion: Some(completion),
                        },
                        sub_rule_sequence: sub.sequence.clone(),
                    });
                } else {
                    let (backspaces, completion) =
                        resolve::compute_edit(&rule.sequence, &rule.transform, symbols.wordbreak());
                    trie.insert_plain(MatchRecord {
                        sequence: rule.sequence.clone(),
                        transform: rule.transform.clone(),
                        func: rule.func,
                        backspaces: Some(backspaces),
                        completion: Some(completion),
                    });
                }
                inserted.push(rule);
            }
        }
    }

    insert_default_identity_matches(&mut trie, symbols);
    trie
}

/// Every sequence token lacking an explicit single-token rule gets a
/// zero-cost identity match, so typing the token alone is always recognized.
fn insert_default_identity_matches(trie: &mut Trie, symbols: &SymbolTable) {
    for glyph in symbols.token_glyphs() {
        let sequence = glyph.to_string();
        let has_match = trie
            .root
            .children
            .get(&glyph)
            .is_some_and(|node| node.match_idx.is_some());
        if has_match {
            continue;
        }
        log::warn!("inserting default identity match for unrepresented token {glyph:?}");
        trie.insert_plain(MatchRecord {
            sequence,
            transform: String::new(),
            func: 0,
            backspaces: Some(0),
            completion: Some(String::new()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn symbols_for(format: &str) -> SymbolTable {
        let text = format!(
            r#"{{
                "format": "{format}",
                "sequence_token_symbols": {{"@": "@"}},
                "wordbreak_symbol": {{" ": " "}},
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
            }}"#
        );
        let config = Config::from_json(&text).unwrap();
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
    fn v3_matches_start_unresolved() {
        let symbols = symbols_for("v3");
        let trie = build(&[rule(":ex@", "example")], &symbols);
        assert_eq!(trie.records.len(), 2); // the rule plus the default "@" identity match
        assert!(trie.records.iter().any(|r| !r.is_resolved()));
    }

    #[test]
    fn v3_2_matches_are_resolved_inline() {
        let symbols = symbols_for("v3_2");
        let trie = build(&[rule(":ex@", "example")], &symbols);
        assert!(trie.records.iter().all(|r| r.is_resolved()));
    }

    #[test]
    fn v3_2_chains_a_longer_rule_off_a_shorter_prefix() {
        let symbols = symbols_for("v3_2");
        let trie = build(
            &[rule(":d@", "develop"), rule(":d@r", "developer")],
            &symbols,
        );
        fn has_chain_for(node: &TrieNode, sequence: &str) -> bool {
            if node.chain_matches.iter().any(|c| c.record.sequence == sequence) {
                return true;
            }
            node.children.values().any(|c| has_chain_for(c, sequence))
        }
        assert!(has_chain_for(&trie.root, ":d@r"));
    }

    #[test]
    fn lone_token_gets_a_default_identity_match() {
        let symbols = symbols_for("v3");
        let trie = build(&[], &symbols);
        let idx = trie.root.children[&'@'].match_idx.unwrap();
        assert_eq!(trie.records[idx].completion.as_deref(), Some(""));
        assert_eq!(trie.records[idx].backspaces, Some(0));
    }

    #[test]
    fn longest_match_at_end_finds_the_deepest_match() {
        let symbols = symbols_for("v3");
        let trie = build(&[rule(":d@", "develop")], &symbols);
        let buffer: Vec<char> = ":d@".chars().collect();
        let idx = trie.longest_match_at_end(&buffer).unwrap();
        assert_eq!(trie.records[idx].sequence, ":d@");
    }
}
