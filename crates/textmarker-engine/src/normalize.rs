//! Canonical text form used for anchoring and comparison.
//!
//! Documents get re-rendered with typographic quotes, reflowed whitespace and
//! shifting punctuation spacing, so anchors never compare raw text. Everything
//! that matches or searches text first maps it through [`normalize`], which is
//! deterministic and idempotent: `normalize(normalize(x)) == normalize(x)` for
//! the default options.

use std::sync::LazyLock;

use regex::Regex;

/// Options for [`normalize`].
///
/// The defaults produce the canonical comparison form. `preserve_spacing`
/// skips the final trim (useful when a leading/trailing space is itself
/// significant, e.g. context windows); `preserve_case` skips lowercasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub preserve_spacing: bool,
    pub preserve_case: bool,
}

// Sentence-ending punctuation gets exactly one trailing space, except that a
// following quote hugs the punctuation across one space. Quote rules run
// first so the spaced/joined rules never see a quote directly after the
// punctuation mark.
static SENTENCE_BEFORE_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([.!?])\s*(["'])"#).expect("pattern compiles"));
static SENTENCE_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s+").expect("pattern compiles"));
static SENTENCE_JOINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([.!?])([^\s"'.!?])"#).expect("pattern compiles"));

// List punctuation also gets one trailing space, but a following quote
// attaches with no space at all.
static LIST_BEFORE_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([,;:])\s*(["'])"#).expect("pattern compiles"));
static LIST_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,;:])\s+").expect("pattern compiles"));
static LIST_JOINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([,;:])([^\s"',;:])"#).expect("pattern compiles"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("pattern compiles"));

/// Map `text` to its canonical comparison form.
///
/// Transformations, in order: typographic quote unification, newline/tab to
/// space, sentence-punctuation spacing, list-punctuation spacing, whitespace
/// collapse, trim (unless `preserve_spacing`), lowercase (unless
/// `preserve_case`). Pure string transform; no tree access.
pub fn normalize(text: &str, options: NormalizeOptions) -> String {
    // Steps 1-2: one pass for quote unification and newline/tab mapping.
    let unified: String = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '\u{02BB}' | '\u{02BD}' | '\u{02C8}'
            | '\u{02CA}' | '\u{02CB}' | '\u{0060}' | '\u{00B4}' => '\'',
            '\n' | '\t' | '\r' => ' ',
            other => other,
        })
        .collect();

    let text = SENTENCE_BEFORE_QUOTE.replace_all(&unified, "$1 $2");
    let text = SENTENCE_SPACED.replace_all(&text, "$1 ");
    let text = SENTENCE_JOINED.replace_all(&text, "$1 $2");

    let text = LIST_BEFORE_QUOTE.replace_all(&text, "$1$2");
    let text = LIST_SPACED.replace_all(&text, "$1 ");
    let text = LIST_JOINED.replace_all(&text, "$1 $2");

    let text = WHITESPACE_RUN.replace_all(&text, " ");

    let text = if options.preserve_spacing {
        text.into_owned()
    } else {
        text.trim().to_string()
    };

    if options.preserve_case {
        text
    } else {
        text.to_lowercase()
    }
}

/// [`normalize`] with the default options: the canonical match key form.
pub fn normalize_default(text: &str) -> String {
    normalize(text, NormalizeOptions::default())
}
