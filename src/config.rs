//! C1: loads and validates the JSON configuration document that describes
//! the symbol alphabet, rule-file location, and output format.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::symbols::{Format, Triecode};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key {0:?}")]
    MissingKey(&'static str),
    #[error("config key {key:?} must be a single glyph, got {value:?}")]
    NotASingleGlyph { key: &'static str, value: String },
    #[error("config key \"format\" must be \"v3\" or \"v3_2\", got {0:?}")]
    InvalidFormat(String),
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The config document as it appears on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    format: Option<String>,
    sequence_token_symbols: IndexMap<String, String>,
    wordbreak_symbol: IndexMap<String, String>,
    output_func_symbols: Vec<String>,
    comment_str: String,
    separator_str: Option<String>,
    rules_file_name: String,
    #[serde(default)]
    implicit_transform_leading_wordbreak: bool,

    // v3_2-only keys.
    space_symbol: Option<String>,
    digit_symbol: Option<String>,
    alpha_symbol: Option<String>,
    upper_alpha_symbol: Option<String>,
    punct_symbol: Option<String>,
    nonterminating_punct_symbol: Option<String>,
    terminating_punct_symbol: Option<String>,
    any_symbol: Option<String>,
    #[serde(default)]
    transform_sequence_reference_symbols: Vec<String>,
}

fn single_glyph(key: &'static str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    let c = chars.next().ok_or(ConfigError::NotASingleGlyph {
        key,
        value: value.to_string(),
    })?;
    if chars.next().is_some() {
        return Err(ConfigError::NotASingleGlyph {
            key,
            value: value.to_string(),
        });
    }
    Ok(c)
}

fn required_glyph(
    key: &'static str,
    field: &Option<String>,
    format: Format,
) -> Result<char, ConfigError> {
    let value = field.as_deref().ok_or_else(|| {
        if format == Format::V3_2 {
            ConfigError::MissingKey(key)
        } else {
            ConfigError::MissingKey(key)
        }
    })?;
    single_glyph(key, value)
}

/// Validated, glyph-typed configuration driving every downstream stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: Format,
    pub sequence_token_symbols: Vec<(char, char)>,
    pub wordbreak_symbol: char,
    pub wordbreak_ascii: char,
    pub output_func_symbols: Vec<char>,
    pub comment_str: String,
    pub separator_str: String,
    pub rules_file_name: String,
    pub implicit_transform_leading_wordbreak: bool,

    pub space_symbol: Option<char>,
    pub digit_symbol: Option<char>,
    pub alpha_symbol: Option<char>,
    pub upper_alpha_symbol: Option<char>,
    pub punct_symbol: Option<char>,
    pub nonterminating_punct_symbol: Option<char>,
    pub terminating_punct_symbol: Option<char>,
    pub any_symbol: Option<char>,
    pub transform_sequence_reference_symbols: Vec<char>,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Overrides the format selected by the config document, for the CLI's
    /// `--format` testing escape hatch. Does not retroactively validate the
    /// v3_2-only fields; forcing v3 -> v3_2 on a v3-shaped config document
    /// will surface as a panic deeper in the pipeline, not here.
    pub fn override_format(&mut self, format: Format) {
        self.format = format;
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let format = match raw.format.as_deref() {
            None | Some("v3") => Format::V3,
            Some("v3_2") => Format::V3_2,
            Some(other) => return Err(ConfigError::InvalidFormat(other.to_string())),
        };

        if raw.sequence_token_symbols.is_empty() {
            return Err(ConfigError::MissingKey("sequence_token_symbols"));
        }
        let mut sequence_token_symbols = Vec::with_capacity(raw.sequence_token_symbols.len());
        for (glyph, ascii) in &raw.sequence_token_symbols {
            sequence_token_symbols.push((
                single_glyph("sequence_token_symbols", glyph)?,
                single_glyph("sequence_token_symbols", ascii)?,
            ));
        }

        let (wb_glyph, wb_ascii) = raw
            .wordbreak_symbol
            .iter()
            .next()
            .ok_or(ConfigError::MissingKey("wordbreak_symbol"))?;
        let wordbreak_symbol = single_glyph("wordbreak_symbol", wb_glyph)?;
        let wordbreak_ascii = single_glyph("wordbreak_symbol", wb_ascii)?;

        let mut output_func_symbols = Vec::with_capacity(raw.output_func_symbols.len());
        for s in &raw.output_func_symbols {
            output_func_symbols.push(single_glyph("output_func_symbols", s)?);
        }

        let separator_str = raw.separator_str.unwrap_or_else(|| "->".to_string());

        let mut config = Config {
            format,
            sequence_token_symbols,
            wordbreak_symbol,
            wordbreak_ascii,
            output_func_symbols,
            comment_str: raw.comment_str,
            separator_str,
            rules_file_name: raw.rules_file_name,
            implicit_transform_leading_wordbreak: raw.implicit_transform_leading_wordbreak,
            space_symbol: None,
            digit_symbol: None,
            alpha_symbol: None,
            upper_alpha_symbol: None,
            punct_symbol: None,
            nonterminating_punct_symbol: None,
            terminating_punct_symbol: None,
            any_symbol: None,
            transform_sequence_reference_symbols: Vec::new(),
        };

        if format == Format::V3_2 {
            config.space_symbol = Some(required_glyph("space_symbol", &raw.space_symbol, format)?);
            config.digit_symbol = Some(required_glyph("digit_symbol", &raw.digit_symbol, format)?);
            config.alpha_symbol = Some(required_glyph("alpha_symbol", &raw.alpha_symbol, format)?);
            config.upper_alpha_symbol = Some(required_glyph(
                "upper_alpha_symbol",
                &raw.upper_alpha_symbol,
                format,
            )?);
            config.punct_symbol = Some(required_glyph("punct_symbol", &raw.punct_symbol, format)?);
            config.nonterminating_punct_symbol = Some(required_glyph(
                "nonterminating_punct_symbol",
                &raw.nonterminating_punct_symbol,
                format,
            )?);
            config.terminating_punct_symbol = Some(required_glyph(
                "terminating_punct_symbol",
                &raw.terminating_punct_symbol,
                format,
            )?);
            config.any_symbol = Some(required_glyph("any_symbol", &raw.any_symbol, format)?);
            for s in &raw.transform_sequence_reference_symbols {
                config
                    .transform_sequence_reference_symbols
                    .push(single_glyph("transform_sequence_reference_symbols", s)?);
            }
        }

        Ok(config)
    }

    /// The literal letters/punctuation alphabet for this format: keyboard
    /// keycode values below `TOKEN_BASE` for v3, literal printable-ASCII
    /// codepoints for v3_2.
    pub fn literal_alphabet(&self) -> Vec<(char, Triecode)> {
        match self.format {
            Format::V3 => v3_keycode_alphabet(),
            Format::V3_2 => ('!'..='~').map(|c| (c, c as Triecode)).collect(),
        }
    }

    /// The triecode for the word-break sentinel symbol.
    pub fn wordbreak_code(&self) -> Triecode {
        match self.format {
            Format::V3 => KC_SPC,
            Format::V3_2 => self.wordbreak_symbol as Triecode,
        }
    }

    /// The 8 metachar glyphs in [`crate::symbols::MetaChar::ALL`] order.
    /// Only meaningful (and only called) for v3_2 configs.
    pub fn metachar_symbols(&self) -> Vec<char> {
        vec![
            self.space_symbol.expect("v3_2 config validated"),
            self.alpha_symbol.expect("v3_2 config validated"),
            self.upper_alpha_symbol.expect("v3_2 config validated"),
            self.digit_symbol.expect("v3_2 config validated"),
            self.punct_symbol.expect("v3_2 config validated"),
            self.terminating_punct_symbol.expect("v3_2 config validated"),
            self.nonterminating_punct_symbol
                .expect("v3_2 config validated"),
            self.any_symbol.expect("v3_2 config validated"),
        ]
    }
}

// Keyboard keycode constants, ported from the original generator's
// `generate_context_char_map` (see original_source/generator/sequence_transform_data.py).
const KC_A: Triecode = 0x04;
const KC_SPC: Triecode = 0x2c;
const KC_MINUS: Triecode = 0x2d;
const KC_SEMICOLON: Triecode = 0x33;
const KC_1: Triecode = 0x1e;
const MOD_LSFT: Triecode = 0x0200;

fn shifted(code: Triecode) -> Triecode {
    MOD_LSFT | code
}

fn v3_keycode_alphabet() -> Vec<(char, Triecode)> {
    let mut map = Vec::new();
    let mut range = |start: Triecode, chars: &str| {
        for (i, c) in chars.chars().enumerate() {
            map.push((c, start + i as Triecode));
        }
    };

    range(KC_SEMICOLON, ";'`,./");
    range(shifted(KC_SEMICOLON), ":\"~<>?");
    range(KC_MINUS, "-=[]\\");
    range(shifted(KC_MINUS), "_+{}|");
    range(KC_1, "1234567890");
    range(shifted(KC_1), "!@#$%^&*()");

    for c in 'a'..='z' {
        map.push((c, KC_A + (c as u32 - 'a' as u32) as Triecode));
    }

    map
}
