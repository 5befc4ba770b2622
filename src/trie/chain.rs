//! v3_2 chain-match discovery: for an incoming rule, find the best
//! already-inserted shorter rule to express its edit relative to, and warn
//! about candidate relationships that were not used.

use crate::rules::Rule;

/// Scans `inserted` (already-built rules, shortest first) in reverse
/// insertion order for the first whose sequence is a prefix of `sequence`.
/// Also warns about other prefix candidates that were passed over, and about
/// shorter rules that occur inside `sequence` without being a prefix or
/// suffix of it (a likely missing intermediate rule).
pub fn find_chain_sub<'a>(inserted: &'a [Rule], sequence: &str) -> Option<&'a Rule> {
    let mut chosen = None;

    for rule in inserted.iter().rev() {
        if rule.sequence == sequence {
            continue;
        }
        if sequence.starts_with(rule.sequence.as_str()) {
            if chosen.is_none() {
                chosen = Some(rule);
            } else {
                log::warn!(
                    "sequence {sequence:?}: prefix rule {:?} exists but {:?} was chained instead",
                    rule.sequence,
                    chosen.unwrap().sequence,
                );
            }
        } else if sequence.contains(rule.sequence.as_str()) && !sequence.ends_with(rule.sequence.as_str())
        {
            log::warn!(
                "sequence {sequence:?}: rule {:?} occurs inside it but is neither a prefix nor a suffix (missing intermediate rule?)",
                rule.sequence
            );
        }
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(sequence: &str) -> Rule {
        Rule {
            sequence: sequence.to_string(),
            transform: String::new(),
            func: 0,
        }
    }

    #[test]
    fn picks_the_most_recently_inserted_prefix() {
        let inserted = vec![rule(":d"), rule(":dev"), rule(":develop")];
        let chosen = find_chain_sub(&inserted, ":developer").unwrap();
        assert_eq!(chosen.sequence, ":develop");
    }

    #[test]
    fn returns_none_when_no_prefix_candidate_exists() {
        let inserted = vec![rule(":abc")];
        assert!(find_chain_sub(&inserted, ":xyz").is_none());
    }
}
