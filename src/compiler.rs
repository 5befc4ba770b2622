//! `CompilerContext` and the `compile` entry point orchestrating C1..C8.
//!
//! Grounded on `peat-brubeck/src/interpreter/mod.rs`'s `Interpreter`: one
//! struct owning the resolved configuration, one high-level method that
//! calls into the stage modules in order. No stage reaches for process-wide
//! global state; everything flows through this context or its return value.

use crate::config::Config;
use crate::dedup;
use crate::emit::{self, CompileOutput};
use crate::error::CompileError;
use crate::resolve;
use crate::rules;
use crate::serialize;
use crate::symbols::{Format, SymbolTable};
use crate::trie;

/// Resolved configuration and symbol tables, threaded by reference through
/// every pipeline stage instead of living as process-wide globals.
pub struct CompilerContext {
    pub config: Config,
    pub symbols: SymbolTable,
}

impl CompilerContext {
    pub fn new(config: Config) -> Result<Self, CompileError> {
        let symbols = SymbolTable::build(&config)?;
        Ok(Self { config, symbols })
    }
}

/// Runs the full pipeline (C3..C8) over `rules_text`, against a context
/// built from an already-loaded config (C1/C2).
pub fn compile(context: &CompilerContext, rules_text: &str) -> Result<CompileOutput, CompileError> {
    let rules = rules::parse_rules(rules_text, &context.config, &context.symbols)?;

    let mut built = trie::build(&rules, &context.symbols);
    if context.symbols.format() == Format::V3 {
        resolve::resolve_all(&mut built, context.symbols.format(), context.symbols.wordbreak());
    }

    let completions: Vec<&str> = built.records.iter().filter_map(|r| r.completion.as_deref()).collect();
    let completions = dedup::pack(completions);

    let wire = serialize::serialize(&built, &context.symbols, &completions)?;

    Ok(emit::emit(&built, &context.symbols, &wire, &completions.blob, &rules))
}
