//! C3: the rule parser. Reads a dictionary file line by line, expands regex
//! regions, validates each resulting rule, and yields `(sequence, transform)`
//! pairs ready for trie insertion.

mod regex_expand;

use crate::config::Config;
use crate::symbols::{Format, SymbolTable};

pub use regex_expand::RegexExpandError;

const MAX_SEQUENCE_LENGTH: usize = 127;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("line {line}: invalid syntax (missing {sep:?} separator): {text:?}")]
    MissingSeparator {
        line: usize,
        sep: String,
        text: String,
    },
    #[error("line {line}: empty sequence: {text:?}")]
    EmptySequence { line: usize, text: String },
    #[error("line {line}: sequence {sequence:?} contains invalid symbol {symbol:?}")]
    InvalidSymbol {
        line: usize,
        sequence: String,
        symbol: char,
    },
    #[error("line {line}: sequence {sequence:?} exceeds {max} symbols ({len})", max = MAX_SEQUENCE_LENGTH)]
    TooLong {
        line: usize,
        sequence: String,
        len: usize,
    },
    #[error("line {line}: duplicate sequence {sequence:?}")]
    Duplicate { line: usize, sequence: String },
    #[error(transparent)]
    RegexExpand(#[from] RegexExpandError),
}

/// One validated `sequence -> transform` rule, with any trailing
/// output-function trigger already split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub sequence: String,
    pub transform: String,
    pub func: u8,
}

fn validate_rule(
    line: usize,
    sequence: String,
    mut transform: String,
    config: &Config,
    symbols: &SymbolTable,
) -> Result<Rule, RuleError> {
    let length = sequence.chars().count();
    if length > MAX_SEQUENCE_LENGTH {
        return Err(RuleError::TooLong {
            line,
            sequence,
            len: length,
        });
    }

    let body: Vec<char> = sequence.chars().collect();
    for &c in &body[..body.len().saturating_sub(1)] {
        if !symbols.is_input_symbol(c) {
            return Err(RuleError::InvalidSymbol {
                line,
                sequence: sequence.clone(),
                symbol: c,
            });
        }
    }

    if config.implicit_transform_leading_wordbreak
        && sequence.starts_with(config.wordbreak_symbol)
    {
        transform = format!("{}{}", config.wordbreak_symbol, transform);
    }

    let (target, func) = match transform.chars().last() {
        Some(c) => match symbols.output_func_code(c) {
            Some(code) => (transform[..transform.len() - c.len_utf8()].to_string(), code),
            None => (transform, 0),
        },
        None => (transform, 0),
    };

    Ok(Rule {
        sequence,
        transform: target,
        func,
    })
}

/// Parses and fully validates a dictionary file's contents into a flat list
/// of rules, expanding any regex regions along the way.
pub fn parse_rules(
    text: &str,
    config: &Config,
    symbols: &SymbolTable,
) -> Result<Vec<Rule>, RuleError> {
    let regex_start = format!("{}REGEX_START", config.comment_str);
    let regex_end = format!("{}REGEX_END", config.comment_str);
    let mut in_regex = false;

    let mut candidates: Vec<(usize, String, String)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();

        if trimmed == regex_start {
            in_regex = true;
            continue;
        }
        if trimmed == regex_end {
            in_regex = false;
            continue;
        }
        if trimmed.is_empty() || trimmed.find(config.comment_str.as_str()) == Some(0) {
            continue;
        }

        let mut parts = trimmed.splitn(2, config.separator_str.as_str());
        let sequence = parts.next().unwrap_or("").trim().to_string();
        let Some(transform) = parts.next() else {
            return Err(RuleError::MissingSeparator {
                line,
                sep: config.separator_str.clone(),
                text: trimmed.to_string(),
            });
        };
        let transform = transform.trim().to_string();

        if sequence.is_empty() {
            return Err(RuleError::EmptySequence {
                line,
                text: trimmed.to_string(),
            });
        }

        if in_regex {
            for (seq, tr) in regex_expand::expand(&sequence, &transform)? {
                candidates.push((line, seq, tr));
            }
        } else {
            candidates.push((line, sequence, transform));
        }
    }

    let mut rules = Vec::with_capacity(candidates.len());
    let mut seen = std::collections::HashSet::new();

    for (line, sequence, transform) in candidates {
        let rule = validate_rule(line, sequence, transform, config, symbols)?;

        if !seen.insert(rule.sequence.clone()) {
            if symbols.format() == Format::V3_2 {
                return Err(RuleError::Duplicate {
                    line,
                    sequence: rule.sequence,
                });
            }
            log::warn!(
                "line {line}: ignoring duplicate sequence {:?}",
                rule.sequence
            );
            continue;
        }

        rules.push(rule);
    }

    Ok(rules)
}
