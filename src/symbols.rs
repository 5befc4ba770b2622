//! Bidirectional symbol tables mapping human-visible glyphs to the numeric
//! *triecodes* used inside the serialized trie.
//!
//! Rules themselves are stored and manipulated as plain [`char`] sequences
//! (matching the way the original generator keys its trie directly off
//! dictionary characters); a [`SymbolTable`] is only consulted to validate
//! that a glyph is known and, at serialization time, to translate it into
//! its numeric code.

use std::collections::HashMap;
use std::fmt;

use crate::config::Config;

/// A single numeric code unit within the emitted trie.
///
/// Always fits in 16 bits (v3) or 8 bits (v3_2); kept as `u16` internally so
/// both formats share one representation until the serializer narrows it.
pub type Triecode = u16;

/// Output wire format the trie is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// 16-bit code units, keyboard-keycode alphabet.
    V3,
    /// 8-bit code units, printable-ASCII alphabet, richer per-node header.
    V3_2,
}

impl Format {
    pub fn token_base(self) -> Triecode {
        match self {
            Format::V3 => 0x0100,
            Format::V3_2 => 0x80,
        }
    }

    pub fn metachar_base(self) -> Triecode {
        0xA0
    }

    pub fn backref_base(self) -> Triecode {
        0x80
    }

    pub fn max_backspaces(self) -> u32 {
        match self {
            Format::V3 => 15,
            Format::V3_2 => 31,
        }
    }

    pub fn max_func(self) -> u32 {
        match self {
            Format::V3 => 7,
            Format::V3_2 => 3,
        }
    }

    pub fn max_completion_length(self) -> usize {
        match self {
            Format::V3 => 127,
            Format::V3_2 => 255,
        }
    }
}

/// One of the v3_2 character-class metacharacters usable inside a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaChar {
    WordBreak,
    Alpha,
    UpperAlpha,
    Digit,
    Punct,
    TerminatingPunct,
    NonterminatingPunct,
    Any,
}

impl MetaChar {
    const ALL: [MetaChar; 8] = [
        MetaChar::WordBreak,
        MetaChar::Alpha,
        MetaChar::UpperAlpha,
        MetaChar::Digit,
        MetaChar::Punct,
        MetaChar::TerminatingPunct,
        MetaChar::NonterminatingPunct,
        MetaChar::Any,
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    #[error("symbol table entry {0:?} is not a single glyph")]
    NotASingleGlyph(String),
    #[error("symbol {0:?} is defined more than once across symbol categories")]
    DuplicateSymbol(char),
    #[error("more than 7 output_func_symbols were configured ({0})")]
    TooManyOutputFuncs(usize),
}

impl fmt::Display for MetaChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetaChar::WordBreak => "word-break",
            MetaChar::Alpha => "alpha",
            MetaChar::UpperAlpha => "upper-alpha",
            MetaChar::Digit => "digit",
            MetaChar::Punct => "punct",
            MetaChar::TerminatingPunct => "terminating-punct",
            MetaChar::NonterminatingPunct => "nonterminating-punct",
            MetaChar::Any => "any",
        };
        f.write_str(name)
    }
}

/// Bidirectional glyph/triecode maps for one compiled configuration.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    format: Format,
    /// Symbols usable anywhere but the last position of a sequence.
    input_codes: HashMap<char, Triecode>,
    /// Symbols usable inside a transform (superset of input symbols in
    /// v3_2, which also allows back-references).
    transform_codes: HashMap<char, Triecode>,
    /// Metacharacter class, keyed by its configured glyph (v3_2 only).
    metachars: HashMap<char, MetaChar>,
    output_funcs: HashMap<char, u8>,
    ascii_standins: HashMap<char, char>,
    wordbreak: char,
}

impl SymbolTable {
    pub fn build(config: &Config) -> Result<Self, SymbolError> {
        let format = config.format;
        let mut input_codes = HashMap::new();
        let mut transform_codes = HashMap::new();
        let mut metachars = HashMap::new();
        let mut ascii_standins = HashMap::new();
        let mut used_codes: HashMap<Triecode, char> = HashMap::new();

        let mut insert = |map: &mut HashMap<char, Triecode>,
                           used: &mut HashMap<Triecode, char>,
                           glyph: char,
                           code: Triecode|
         -> Result<(), SymbolError> {
            if let Some(existing) = used.get(&code) {
                if *existing != glyph {
                    return Err(SymbolError::DuplicateSymbol(glyph));
                }
            } else {
                used.insert(code, glyph);
            }
            map.insert(glyph, code);
            Ok(())
        };

        // Letters and ASCII punctuation share the base of the code space in
        // both formats: literal printable-ASCII codepoints for v3_2, and the
        // keyboard-keycode alphabet below TOKEN_BASE for v3.
        for (glyph, code) in config.literal_alphabet() {
            insert(&mut input_codes, &mut used_codes, glyph, code)?;
            insert(&mut transform_codes, &mut used_codes, glyph, code)?;
        }

        // Word-break sentinel: a normal symbol usable in both sequences and
        // transforms, textually rendered as a literal space in completions.
        let wordbreak_code = config.wordbreak_code();
        insert(
            &mut input_codes,
            &mut used_codes,
            config.wordbreak_symbol,
            wordbreak_code,
        )?;
        insert(
            &mut transform_codes,
            &mut used_codes,
            config.wordbreak_symbol,
            wordbreak_code,
        )?;

        // Sequence tokens.
        for (i, (glyph, ascii)) in config.sequence_token_symbols.iter().enumerate() {
            let code = format.token_base() + i as Triecode;
            insert(&mut input_codes, &mut used_codes, *glyph, code)?;
            insert(&mut transform_codes, &mut used_codes, *glyph, code)?;
            ascii_standins.insert(*glyph, *ascii);
        }

        // Metacharacters (v3_2 only): valid inside sequences, not transforms.
        if format == Format::V3_2 {
            for (i, (meta, glyph)) in MetaChar::ALL.iter().zip(config.metachar_symbols()).enumerate()
            {
                let code = format.metachar_base() + i as Triecode;
                insert(&mut input_codes, &mut used_codes, glyph, code)?;
                metachars.insert(glyph, *meta);
            }

            // Transform back-references: valid inside transforms only, in a
            // namespace disjoint from the input/transform literal codes.
            for (i, glyph) in config.transform_sequence_reference_symbols.iter().enumerate() {
                let code = format.backref_base() + i as Triecode;
                transform_codes.insert(*glyph, code);
            }
        }

        // Output-function trigger symbols.
        if config.output_func_symbols.len() > 7 {
            return Err(SymbolError::TooManyOutputFuncs(
                config.output_func_symbols.len(),
            ));
        }
        let mut output_funcs = HashMap::new();
        for (i, glyph) in config.output_func_symbols.iter().enumerate() {
            output_funcs.insert(*glyph, (i + 1) as u8);
        }

        Ok(SymbolTable {
            format,
            input_codes,
            transform_codes,
            metachars,
            output_funcs,
            ascii_standins,
            wordbreak: config.wordbreak_symbol,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn wordbreak(&self) -> char {
        self.wordbreak
    }

    pub fn is_input_symbol(&self, c: char) -> bool {
        self.input_codes.contains_key(&c)
    }

    pub fn input_code(&self, c: char) -> Option<Triecode> {
        self.input_codes.get(&c).copied()
    }

    pub fn transform_code(&self, c: char) -> Option<Triecode> {
        self.transform_codes.get(&c).copied()
    }

    pub fn is_metachar(&self, c: char) -> bool {
        self.metachars.contains_key(&c)
    }

    pub fn output_func_code(&self, c: char) -> Option<u8> {
        self.output_funcs.get(&c).copied()
    }

    pub fn output_func_count(&self) -> usize {
        self.output_funcs.len()
    }

    pub fn ascii_standin(&self, c: char) -> Option<char> {
        self.ascii_standins.get(&c).copied()
    }

    pub fn token_glyphs(&self) -> impl Iterator<Item = char> + '_ {
        self.ascii_standins.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn sample_config_v3() -> Config {
        Config::from_json(
            r##"{
                "format": "v3",
                "sequence_token_symbols": {"@": "@", "#": "#"},
                "wordbreak_symbol": {" ": " "},
                "output_func_symbols": ["!"],
                "comment_str": "//",
                "separator_str": "->",
                "rules_file_name": "rules.txt"
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn token_codes_start_at_format_base() {
        let config = sample_config_v3();
        let table = SymbolTable::build(&config).unwrap();
        assert_eq!(table.input_code('@'), Some(Format::V3.token_base()));
        assert_eq!(table.input_code('#'), Some(Format::V3.token_base() + 1));
    }

    #[test]
    fn output_func_code_starts_at_one() {
        let config = sample_config_v3();
        let table = SymbolTable::build(&config).unwrap();
        assert_eq!(table.output_func_code('!'), Some(1));
    }

    #[test]
    fn too_many_output_funcs_is_rejected() {
        let mut config = sample_config_v3();
        config.output_func_symbols = "12345678".chars().collect();
        let err = SymbolTable::build(&config).unwrap_err();
        assert!(matches!(err, SymbolError::TooManyOutputFuncs(8)));
    }

    #[test]
    fn ascii_letters_are_registered_as_input_and_transform_symbols() {
        let config = sample_config_v3();
        let table = SymbolTable::build(&config).unwrap();
        assert!(table.is_input_symbol('a'));
        assert!(table.transform_code('a').is_some());
    }
}
