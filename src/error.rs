//! Top-level error type composing every stage's error enum.
//!
//! Grounded on `peat-brubeck/src/interpreter/errors.rs`'s `ExecutionError`
//! (a `From`-composed union of two stage errors), built with `thiserror`
//! instead of a hand-written `Display`/`From` pair.

use crate::config::ConfigError;
use crate::rules::RuleError;
use crate::serialize::SerializeError;
use crate::symbols::SymbolError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("failed to read rules file {path:?}: {source}")]
    RulesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    OutputIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
