//! C8: frames the serialized wire blob and the completions blob, plus a
//! handful of derived constants, into a C header text and a parallel test
//! fixture header.
//!
//! Grounded on the original generator's `generate_sequence_transform_data`
//! (`#define` + array-literal emission via string concatenation), re-expressed
//! with `std::fmt::Write`. The exact text layout is not a behavioral
//! contract (Section 4.8); only the byte blobs it wraps are.

use std::fmt::Write as _;

use crate::rules::Rule;
use crate::serialize::Wire;
use crate::symbols::{Format, SymbolTable};
use crate::trie::Trie;

#[derive(Debug)]
pub struct CompileOutput {
    pub data_header: String,
    pub test_header: String,
}

pub fn emit(trie: &Trie, symbols: &SymbolTable, wire: &Wire, blob: &str, rules: &[Rule]) -> CompileOutput {
    CompileOutput {
        data_header: render_data_header(trie, symbols, wire, blob, rules),
        test_header: render_test_header(symbols, rules),
    }
}

fn edge_code(c: char, symbols: &SymbolTable) -> u32 {
    symbols
        .input_code(c)
        .or_else(|| symbols.transform_code(c))
        .unwrap_or_else(|| panic!("unregistered trie edge symbol {c:?}")) as u32
}

fn escape_c_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            other => vec![other],
        })
        .collect()
}

fn render_data_header(trie: &Trie, symbols: &SymbolTable, wire: &Wire, blob: &str, rules: &[Rule]) -> String {
    let mut out = String::new();
    writeln!(out, "// Generated by stxgen. Do not edit by hand.").unwrap();
    writeln!(out, "#pragma once").unwrap();
    writeln!(out).unwrap();

    let min_len = rules.iter().map(|r| r.sequence.chars().count()).min().unwrap_or(0);
    let max_len = rules.iter().map(|r| r.sequence.chars().count()).max().unwrap_or(0);
    let max_transform_len = rules.iter().map(|r| r.transform.chars().count()).max().unwrap_or(0);
    let max_backspaces = trie.records.iter().filter_map(|r| r.backspaces).max().unwrap_or(0);

    writeln!(out, "#define SEQUENCE_TRANSFORM_MIN_SEQUENCE_LEN {min_len}").unwrap();
    writeln!(out, "#define SEQUENCE_TRANSFORM_MAX_SEQUENCE_LEN {max_len}").unwrap();
    writeln!(out, "#define SEQUENCE_TRANSFORM_MAX_TRANSFORM_LEN {max_transform_len}").unwrap();
    writeln!(out, "#define SEQUENCE_TRANSFORM_MAX_BACKSPACES {max_backspaces}").unwrap();
    writeln!(out, "#define SEQUENCE_TRANSFORM_COMPLETIONS_SIZE {}", blob.len()).unwrap();
    writeln!(out, "#define SEQUENCE_TRANSFORM_TOKEN_COUNT {}", symbols.token_glyphs().count()).unwrap();
    writeln!(out).unwrap();

    let (data_name, data_len) = match symbols.format() {
        Format::V3 => ("sequence_transform_data", "uint16_t"),
        Format::V3_2 => ("sequence_transform_trie", "uint8_t"),
    };
    match wire {
        Wire::V3(units) => {
            writeln!(out, "const {data_len} {data_name}[{}] = {{", units.len()).unwrap();
            write_array(&mut out, units.iter().map(|u| format!("0x{u:04x}")));
            writeln!(out, "}};").unwrap();
        }
        Wire::V3_2(bytes) => {
            writeln!(out, "const {data_len} {data_name}[{}] = {{", bytes.len()).unwrap();
            write_array(&mut out, bytes.iter().map(|b| format!("0x{b:02x}")));
            writeln!(out, "}};").unwrap();
        }
    }
    writeln!(out).unwrap();

    writeln!(
        out,
        "const uint8_t sequence_transform_completions_data[{}] = {{",
        blob.len()
    )
    .unwrap();
    write_array(&mut out, blob.bytes().map(|b| format!("0x{b:02x}")));
    writeln!(out, "}};").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "const uint16_t sequence_transform_ascii_standins[] = {{").unwrap();
    write_array(
        &mut out,
        symbols.token_glyphs().map(|glyph| {
            let standin = symbols.ascii_standin(glyph).unwrap_or(glyph);
            format!("0x{:04x}", standin as u32)
        }),
    );
    writeln!(out, "}};").unwrap();

    out
}

fn render_test_header(symbols: &SymbolTable, rules: &[Rule]) -> String {
    let mut out = String::new();
    writeln!(out, "// Generated by stxgen. Test fixture; do not edit by hand.").unwrap();
    writeln!(out, "#pragma once").unwrap();
    writeln!(out).unwrap();

    let non_func_rules: Vec<&Rule> = rules.iter().filter(|r| r.func == 0).collect();
    let code_type = match symbols.format() {
        Format::V3 => "uint16_t",
        Format::V3_2 => "uint8_t",
    };

    writeln!(out, "const {code_type} *sequence_transform_test_sequences[] = {{").unwrap();
    for rule in &non_func_rules {
        let codes: Vec<String> = rule
            .sequence
            .chars()
            .map(|c| format!("0x{:02x}", edge_code(c, symbols)))
            .collect();
        writeln!(out, "    ({code_type}[]){{{}, 0}},", codes.join(", ")).unwrap();
    }
    writeln!(out, "    NULL").unwrap();
    writeln!(out, "}};").unwrap();
    writeln!(out).unwrap();

    match symbols.format() {
        Format::V3 => {
            writeln!(out, "const char *sequence_transform_test_transforms[] = {{").unwrap();
            for rule in &non_func_rules {
                writeln!(out, "    \"{}\",", escape_c_string(&rule.transform)).unwrap();
            }
            writeln!(out, "    NULL").unwrap();
            writeln!(out, "}};").unwrap();
        }
        Format::V3_2 => {
            writeln!(out, "const uint8_t *sequence_transform_test_transforms[] = {{").unwrap();
            for rule in &non_func_rules {
                let codes: Vec<String> = rule
                    .transform
                    .chars()
                    .map(|c| {
                        let code = symbols
                            .transform_code(c)
                            .unwrap_or_else(|| panic!("unregistered transform symbol {c:?}"));
                        format!("0x{code:02x}")
                    })
                    .collect();
                writeln!(out, "    (uint8_t[]){{{}, 0}},", codes.join(", ")).unwrap();
            }
            writeln!(out, "    NULL").unwrap();
            writeln!(out, "}};").unwrap();
        }
    }

    out
}

fn write_array(out: &mut String, items: impl Iterator<Item = String>) {
    let mut column = 0;
    for item in items {
        write!(out, "{item}, ").unwrap();
        column += 1;
        if column % 12 == 0 {
            writeln!(out).unwrap();
        }
    }
    writeln!(out).unwrap();
}
