//! End-to-end pipeline tests driving the public `compile()` entry point and
//! the lower-level trie/resolve API directly, covering the testable
//! properties and concrete scenarios named in the specification (S1-S6 and
//! properties 2, 3, 5, 6).

use sequence_transform_gen::compiler::{compile, CompilerContext};
use sequence_transform_gen::config::Config;
use sequence_transform_gen::dedup;
use sequence_transform_gen::error::CompileError;
use sequence_transform_gen::resolve;
use sequence_transform_gen::rules::{self, RuleError};
use sequence_transform_gen::serialize::{self, SerializeError};
use sequence_transform_gen::symbols::SymbolTable;
use sequence_transform_gen::trie::{self, Trie};

const CONFIG_V3: &str = r#"{
    "format": "v3",
    "sequence_token_symbols": {"@": "@"},
    "wordbreak_symbol": {" ": " "},
    "output_func_symbols": ["!"],
    "comment_str": "//",
    "separator_str": "->",
    "rules_file_name": "rules.txt"
}"#;

const CONFIG_V3_2: &str = r#"{
    "format": "v3_2",
    "sequence_token_symbols": {"@": "@"},
    "wordbreak_symbol": {" ": " "},
    "output_func_symbols": ["!"],
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
}"#;

fn context(json: &str) -> CompilerContext {
    CompilerContext::new(Config::from_json(json).unwrap()).unwrap()
}

/// Independently simulates the firmware's trie walk: types `sequence` one
/// character at a time, applying whatever match fires at each step, exactly
/// as the runtime would. Used to check property 2 without reaching into
/// resolver internals.
fn simulate(trie: &Trie, sequence: &str) -> String {
    let mut screen: Vec<char> = Vec::new();
    let mut buffer: Vec<char> = Vec::new();
    for c in sequence.chars() {
        buffer.push(c);
        screen.push(c);
        if let Some(idx) = trie.longest_match_at_end(&buffer) {
            let record = &trie.records[idx];
            let backspaces = record.backspaces.expect("resolved before simulation") as usize;
            let completion = record.completion.as_deref().expect("resolved before simulation");
            let cut = (backspaces + 1).min(screen.len());
            screen.truncate(screen.len() - cut);
            screen.extend(completion.chars());
        }
    }
    screen.into_iter().collect()
}

fn built_v3(rules: &[rules::Rule], symbols: &SymbolTable) -> Trie {
    let mut trie = trie::build(rules, symbols);
    resolve::resolve_all(&mut trie, symbols.format(), symbols.wordbreak());
    trie
}

#[test]
fn s1_chained_rule_reuses_the_shorter_completion_v3() {
    let context = context(CONFIG_V3);
    let rules = rules::parse_rules(":d@ -> develop\n:d@r -> developer\n", &context.config, &context.symbols).unwrap();
    let trie = built_v3(&rules, &context.symbols);
    assert_eq!(simulate(&trie, ":d@"), "develop");
    assert_eq!(simulate(&trie, ":d@r"), "developer");
}

#[test]
fn s1_chained_rule_reuses_the_shorter_completion_v3_2() {
    let context = context(CONFIG_V3_2);
    let rules = rules::parse_rules(":d@ -> develop\n:d@r -> developer\n", &context.config, &context.symbols).unwrap();
    let trie = trie::build(&rules, &context.symbols);
    assert_eq!(simulate(&trie, ":d@"), "develop");
    assert_eq!(simulate(&trie, ":d@r"), "developer");
}

#[test]
fn s2_single_rule_computes_literal_edit() {
    let context = context(CONFIG_V3);
    let rules = rules::parse_rules(":ex@ -> example\n", &context.config, &context.symbols).unwrap();
    let trie = built_v3(&rules, &context.symbols);
    assert_eq!(simulate(&trie, ":ex@"), "example");
}

#[test]
fn s3_shared_completion_has_one_blob_offset() {
    let context = context(CONFIG_V3);
    let rules = rules::parse_rules(
        "the!@ -> the\nteh!@ -> the\n",
        &context.config,
        &context.symbols,
    )
    .unwrap();
    let trie = built_v3(&rules, &context.symbols);
    let completions: Vec<&str> = trie.records.iter().filter_map(|r| r.completion.as_deref()).collect();
    let completions = dedup::pack(completions);
    assert!(completions.offsets.values().all(|&o| completions.blob[o..].starts_with("the")));
}

#[test]
fn s4_regex_region_expands_to_three_rules() {
    let context = context(CONFIG_V3);
    let text = "//REGEX_START\n[abc]x@ -> x\\1\n//REGEX_END\n";
    let output = compile(&context, text).unwrap();
    assert_eq!(output.test_header.matches("uint16_t[]").count(), 3);
}

#[test]
fn s4_same_line_outside_regex_mode_is_a_literal_invalid_symbol() {
    let context = context(CONFIG_V3);
    let err = compile(&context, "[abc]x@ -> x\n").unwrap_err();
    assert!(matches!(err, CompileError::Rule(RuleError::InvalidSymbol { .. })));
}

fn letter_code(mut idx: usize, len: usize) -> String {
    let mut chars = Vec::with_capacity(len);
    for _ in 0..len {
        chars.push((b'a' + (idx % 26) as u8) as char);
        idx /= 26;
    }
    chars.into_iter().collect()
}

/// `n` synthetic rules, each a unique 4-letter base-26 code followed by the
/// sequence token: enough volume that even the minimum 2-code-unit match
/// record per rule overflows the v3 16-bit offset space regardless of how
/// much the trie's shared prefixes reduce total node count.
fn synth_rules(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        let code = letter_code(i, 4);
        out.push_str(&format!("{code}@ -> word_{code}\n"));
    }
    out
}

#[test]
fn s5_oversized_rule_set_aborts_with_offset_overflow() {
    let context = context(CONFIG_V3);
    let rules_text = synth_rules(50_000);
    let err = compile(&context, &rules_text).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Serialize(SerializeError::OffsetOverflow { .. })
    ));
}

#[test]
fn s6_sequence_length_128_is_fatal() {
    let context = context(CONFIG_V3);
    let sequence = "a".repeat(127) + "@";
    let text = format!("{sequence} -> x\n");
    let err = compile(&context, &text).unwrap_err();
    assert!(matches!(err, CompileError::Rule(RuleError::TooLong { .. })));
}

#[test]
fn property6_v3_duplicate_warns_and_keeps_first() {
    let context = context(CONFIG_V3);
    let output = compile(&context, ":ex@ -> example\n:ex@ -> exemplary\n").unwrap();
    assert_eq!(output.test_header.matches("uint16_t[]").count(), 1);
}

#[test]
fn property6_v3_2_duplicate_is_fatal() {
    let context = context(CONFIG_V3_2);
    let err = compile(&context, ":ex@ -> example\n:ex@ -> exemplary\n").unwrap_err();
    assert!(matches!(err, CompileError::Rule(RuleError::Duplicate { .. })));
}

#[test]
fn property4_offsets_in_v3_wire_are_addressable() {
    let context = context(CONFIG_V3);
    let rules = rules::parse_rules(
        ":d@ -> develop\n:d@r -> developer\n:ex@ -> example\n",
        &context.config,
        &context.symbols,
    )
    .unwrap();
    let trie = built_v3(&rules, &context.symbols);
    let completions: Vec<&str> = trie.records.iter().filter_map(|r| r.completion.as_deref()).collect();
    let completions = dedup::pack(completions);
    let wire = serialize::serialize(&trie, &context.symbols, &completions).unwrap();
    match wire {
        sequence_transform_gen::serialize::Wire::V3(units) => assert!(units.len() <= 0xFFFF),
        _ => panic!("expected a v3 wire"),
    }
}

#[test]
fn v3_2_compile_produces_matching_test_and_data_headers() {
    let context = context(CONFIG_V3_2);
    let output = compile(&context, ":ex@ -> example\n:d@ -> develop\n:d@r -> developer\n").unwrap();
    assert!(output.data_header.contains("sequence_transform_trie"));
    // v3_2 renders both sequences and transforms as uint8_t code arrays, so
    // each of the 3 rules contributes two "uint8_t[]" occurrences.
    assert_eq!(output.test_header.matches("uint8_t[]").count(), 6);
}
