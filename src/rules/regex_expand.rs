//! Alternation/optional-group expansion for rule lines inside a `REGEX_START`
//! / `REGEX_END` region.
//!
//! Deliberately limited: no repetition, no anchors, and one group expanded at
//! a time (recursively, in document order) rather than a general regex
//! engine. See `original_source/generator/sequence_transform_data.py` for the
//! literal-only baseline this extends.

#[derive(Debug, thiserror::Error)]
pub enum RegexExpandError {
    #[error("unterminated '[' group in sequence {0:?}")]
    UnterminatedBracket(String),
    #[error("unterminated '(' group in sequence {0:?}")]
    UnterminatedParen(String),
}

/// Expands the first alternation group found in `sequence`, substituting
/// `\1` in `transform` with the chosen alternative, and recurses until no
/// group remains. Returns one `(sequence, transform)` pair per alternative
/// combination, in document order.
pub fn expand(sequence: &str, transform: &str) -> Result<Vec<(String, String)>, RegexExpandError> {
    let chars: Vec<char> = sequence.chars().collect();

    if let Some(open) = chars.iter().position(|&c| c == '[') {
        let close = chars[open..]
            .iter()
            .position(|&c| c == ']')
            .map(|i| open + i)
            .ok_or_else(|| RegexExpandError::UnterminatedBracket(sequence.to_string()))?;

        let prefix: String = chars[..open].iter().collect();
        let alternatives: Vec<String> = chars[open + 1..close].iter().map(|c| c.to_string()).collect();
        let suffix: String = chars[close + 1..].iter().collect();

        return expand_group(&prefix, &alternatives, &suffix, transform);
    }

    if let Some(open) = chars.iter().position(|&c| c == '(') {
        let close = chars[open..]
            .iter()
            .position(|&c| c == ')')
            .map(|i| open + i)
            .ok_or_else(|| RegexExpandError::UnterminatedParen(sequence.to_string()))?;

        let optional = chars.get(close + 1) == Some(&'?');
        let after = if optional { close + 2 } else { close + 1 };

        let prefix: String = chars[..open].iter().collect();
        let inner: String = chars[open + 1..close].iter().collect();
        let suffix: String = chars[after..].iter().collect();

        let mut alternatives: Vec<String> = inner.split('|').map(|s| s.to_string()).collect();
        if optional {
            alternatives.push(String::new());
        }

        return expand_group(&prefix, &alternatives, &suffix, transform);
    }

    Ok(vec![(sequence.to_string(), transform.to_string())])
}

fn expand_group(
    prefix: &str,
    alternatives: &[String],
    suffix: &str,
    transform: &str,
) -> Result<Vec<(String, String)>, RegexExpandError> {
    let mut out = Vec::new();
    for alt in alternatives {
        let new_sequence = format!("{prefix}{alt}{suffix}");
        let new_transform = transform.replace("\\1", alt);
        out.extend(expand(&new_sequence, &new_transform)?);
    }
    Ok(out)
}
