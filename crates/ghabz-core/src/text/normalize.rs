//! Text normalization for Persian invoices.
//!
//! Extracted text goes through whitespace cleanup, NFKC folding (which maps
//! Arabic presentation forms back to base letters), digit conversion, letter
//! standardization, space collapsing and finally bidi reordering so that
//! visually laid-out right-to-left text reads in logical order.

use std::panic::{AssertUnwindSafe, catch_unwind};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{trace, warn};
use unicode_bidi::BidiInfo;
use unicode_normalization::UnicodeNormalization;

use crate::models::config::NormalizationConfig;

lazy_static! {
    static ref SPACE_LIKE: Regex = Regex::new(
        r"[\x{2000}-\x{200B}\x{202F}\x{205F}\x{3000}]"
    ).unwrap();

    static ref ZERO_WIDTH: Regex = Regex::new(r"[\x{200C}\x{200D}\x{FEFF}]").unwrap();

    static ref SPACE_RUN: Regex = Regex::new(r"[ \t]+").unwrap();

    static ref SPACE_AROUND_NEWLINE: Regex = Regex::new(r" *\n *").unwrap();
}

/// Normalizes extracted text according to [`NormalizationConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BidiNormalizer {
    options: NormalizationConfig,
}

impl BidiNormalizer {
    pub fn new(options: NormalizationConfig) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizationConfig {
        &self.options
    }

    /// Run the normalization pipeline.
    ///
    /// Bidi reordering runs only when both `apply_bidi` and the
    /// `handle_bidi` option are set. Reordering already-logical text again
    /// is not an identity, so call this once per extracted string.
    pub fn normalize(&self, text: &str, apply_bidi: bool) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result = if self.options.normalize_whitespace {
            normalize_whitespace_chars(text)
        } else {
            text.to_string()
        };

        result = result.nfkc().collect();

        if self.options.normalize_persian_numbers {
            result = to_ascii_digits(&result);
        }

        result = standardize_letters(&result);

        if self.options.remove_extra_spaces {
            result = collapse_spaces(&result);
        }

        if apply_bidi && self.options.handle_bidi {
            result = reorder_visual(&result);
        }

        result
    }

    /// Normalize a table cell: full pipeline with bidi, then trimmed.
    pub fn normalize_cell(&self, text: &str) -> String {
        self.normalize(text, true).trim().to_string()
    }
}

/// Map exotic spaces to U+0020, drop zero-width joiners and unify line breaks.
pub fn normalize_whitespace_chars(text: &str) -> String {
    let text = SPACE_LIKE.replace_all(text, " ");
    let text = ZERO_WIDTH.replace_all(&text, "");
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Convert Persian (U+06F0..) and Arabic-Indic (U+0660..) digits to ASCII.
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => digit(c as u32 - 0x06F0),
            '\u{0660}'..='\u{0669}' => digit(c as u32 - 0x0660),
            _ => c,
        })
        .collect()
}

fn digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

/// Arabic Yeh and Alef Maksura become Persian Yeh, Arabic Kaf becomes Persian Kaf.
pub fn standardize_letters(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{064A}' | '\u{0649}' => '\u{06CC}',
            '\u{0643}' => '\u{06A9}',
            _ => c,
        })
        .collect()
}

/// Collapse space runs, strip spaces around line breaks and trim the ends.
pub fn collapse_spaces(text: &str) -> String {
    let text = SPACE_RUN.replace_all(text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Reorder each line with the Unicode Bidirectional Algorithm.
///
/// Paragraph direction comes from the first strong character of the line.
/// On failure the input is returned unchanged.
pub fn reorder_visual(text: &str) -> String {
    reorder_lines_with(text, reorder_line)
}

fn reorder_lines_with<F>(text: &str, reorder: F) -> String
where
    F: Fn(&str) -> String,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        text.split('\n').map(&reorder).collect::<Vec<_>>().join("\n")
    }));

    match outcome {
        Ok(reordered) => reordered,
        Err(_) => {
            warn!("Bidi reordering failed, keeping extraction order");
            text.to_string()
        }
    }
}

fn reorder_line(line: &str) -> String {
    if line.is_empty() {
        return String::new();
    }

    let info = BidiInfo::new(line, None);
    if !info.has_rtl() {
        return line.to_string();
    }

    trace!("Reordering RTL line of {} bytes", line.len());
    let mut out = String::with_capacity(line.len());
    for paragraph in &info.paragraphs {
        let range = paragraph.range.clone();
        out.push_str(&info.reorder_line(paragraph, range));
    }
    out
}
