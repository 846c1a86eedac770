//! Text normalisation for extracted PDF text and for the PDF writer.
//!
//! Three audiences, three functions:
//!
//! - [`normalize_text`] + [`clean_text`] turn raw per-page extraction output
//!   into the single-line-per-page text the crew reads.
//! - [`to_latin1`] makes arbitrary model output printable with the base-14
//!   Helvetica fonts, which only cover WinAnsi.
//! - [`strip_markdown`] removes inline Markdown syntax before text is laid
//!   out as plain PDF paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Drop control characters, repair CP1252 mojibake and collapse whitespace.
///
/// `\n` and `\t` survive the control-character pass but are folded into
/// single spaces along with every other whitespace run.
pub fn normalize_text(text: &str) -> String {
    let printable: String = text
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect();

    let repaired = repair_mojibake(&printable);
    RE_WHITESPACE.replace_all(&repaired, " ").trim().to_string()
}

/// UTF-8 punctuation that was decoded as Windows-1252 somewhere upstream.
///
/// Longest sequences first: `â€` is a prefix of the other two.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€“", "-"),
    ("â€”", "--"),
    ("â€¦", "..."),
    ("â€", "\""),
    ("Â", ""),
];

fn repair_mojibake(text: &str) -> String {
    MOJIBAKE
        .iter()
        .fold(text.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

static RE_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,;:!?\-()\[\]{}]").unwrap());

/// Keep word characters, whitespace and `.,;:!?-()[]{}`; collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let kept = RE_UNSAFE.replace_all(text, "");
    RE_WHITESPACE.replace_all(&kept, " ").trim().to_string()
}

/// Transliteration table for characters outside Latin-1.
const TRANSLITERATIONS: &[(char, &str)] = &[
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2015}', "--"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2212}', "-"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', ","),
    ('\u{201B}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{2032}', "'"),
    ('\u{2033}', "\""),
    ('\u{2026}', "..."),
    ('\u{2022}', "*"),
    ('\u{2023}', "*"),
    ('\u{25CF}', "*"),
    ('\u{25E6}', "*"),
    ('\u{2043}', "-"),
    ('\u{2192}', "->"),
    ('\u{2190}', "<-"),
    ('\u{2194}', "<->"),
    ('\u{21D2}', "=>"),
    ('\u{2264}', "<="),
    ('\u{2265}', ">="),
    ('\u{2260}', "!="),
    ('\u{2248}', "~"),
    ('\u{221E}', "infinity"),
    ('\u{2211}', "sum"),
    ('\u{221A}', "sqrt"),
    ('\u{03A9}', "Ohm"),
    ('\u{2126}', "Ohm"),
    ('\u{03B1}', "alpha"),
    ('\u{03B2}', "beta"),
    ('\u{03B3}', "gamma"),
    ('\u{03B4}', "delta"),
    ('\u{03B5}', "epsilon"),
    ('\u{03B8}', "theta"),
    ('\u{03BB}', "lambda"),
    ('\u{03BC}', "mu"),
    ('\u{03C0}', "pi"),
    ('\u{03C3}', "sigma"),
    ('\u{0394}', "Delta"),
    ('\u{03A3}', "Sigma"),
    ('\u{20AC}', "EUR"),
    ('\u{20B9}', "INR"),
    ('\u{2122}', "(TM)"),
    ('\u{2020}', "+"),
    ('\u{2021}', "++"),
    ('\u{203B}', "*"),
    ('\u{203C}', "!!"),
    ('\u{2047}', "??"),
    ('\u{2048}', "?!"),
    ('\u{2049}', "!?"),
    ('\u{2053}', "~"),
    ('\u{2713}', "v"),
    ('\u{2717}', "x"),
];

/// Make `text` encodable as Latin-1.
///
/// Typographic punctuation, arrows, Greek letters and common symbols are
/// spelled out; anything still above U+00FF is dropped.
pub fn to_latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if (c as u32) <= 0xFF {
            out.push(c);
        } else if let Some((_, ascii)) = TRANSLITERATIONS.iter().find(|(u, _)| *u == c) {
            out.push_str(ascii);
        }
    }
    out
}

static RE_HEADING_HASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s*").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_STRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*_~`]").unwrap());

/// Strip heading hashes, emphasis markers and stray Markdown punctuation.
pub fn strip_markdown(text: &str) -> String {
    let s = RE_HEADING_HASHES.replace_all(text, "");
    let s = RE_BOLD.replace_all(&s, "$1");
    let s = RE_ITALIC.replace_all(&s, "$1");
    RE_STRAY.replace_all(&s, "").into_owned()
}
