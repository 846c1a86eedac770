//! Post-processing: deterministic cleanup of LLM-written Markdown.
//!
//! Models wrap answers in ` ```markdown ` fences, prefix them with an
//! agent-style `Final Answer:` label, or mix line-ending styles, even when
//! told not to. These passes undo that without touching the content.
//!
//! ## Rule Order
//!
//! The label is stripped after the fence so `Final Answer:` inside a fenced
//! reply is still caught. Line endings are normalised before any line-based
//! rule, and the final-newline pass runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every polish rule to a raw model answer.
///
/// 1. Strip an outer ` ```markdown ` / ` ``` ` fence
/// 2. Strip a leading `Final Answer:` label
/// 3. Normalise line endings (CRLF / CR → LF)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 4+ consecutive newlines to 3
/// 6. Put a blank line before every heading
/// 7. Remove invisible Unicode (zero-width characters, BOM, soft hyphen)
/// 8. End with exactly one newline
pub fn polish_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = strip_answer_label(&s);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = space_headings(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Outer fence ──────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Agent answer label ───────────────────────────────────────────

static RE_ANSWER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?final answer\s*:?\s*(?:\*\*)?\s*:?[ \t]*\r?\n?").unwrap()
});

fn strip_answer_label(input: &str) -> String {
    RE_ANSWER_LABEL.replace(input, "").into_owned()
}

// ── Rule 3: Line endings ─────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Trailing whitespace ──────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

// ── Rule 5: Blank-line runs ──────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

// ── Rule 6: Heading spacing ──────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s").unwrap());

fn space_headings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 64);
    let mut in_code = false;

    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        }
        if !in_code && RE_HEADING.is_match(line) && !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ── Rule 7: Invisible characters ─────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'],
        "",
    )
}

// ── Rule 8: Final newline ────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        assert_eq!(strip_outer_fence("```markdown\n# Hi\nthere\n```"), "# Hi\nthere");
        assert_eq!(strip_outer_fence("```\nplain\n```\n"), "plain");
    }

    #[test]
    fn inner_code_fences_survive() {
        let input = "# Intro\n\n```rust\nfn main() {}\n```\n\nText";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn strips_answer_label() {
        assert_eq!(strip_answer_label("Final Answer:\n# Title"), "# Title");
        assert_eq!(strip_answer_label("**Final Answer:** # Title"), "# Title");
        assert_eq!(strip_answer_label("The final answer is 4"), "The final answer is 4");
    }

    #[test]
    fn collapses_long_blank_runs() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn headings_get_blank_line_before() {
        let out = space_headings("text\n## Section\nbody");
        assert_eq!(out, "text\n\n## Section\nbody\n");
    }

    #[test]
    fn hash_in_code_is_not_a_heading() {
        let out = space_headings("```sh\nls\n# comment\n```");
        assert_eq!(out, "```sh\nls\n# comment\n```\n");
    }

    #[test]
    fn hashtag_is_not_a_heading() {
        let out = space_headings("line\n#rustlang rocks");
        assert_eq!(out, "line\n#rustlang rocks\n");
    }

    #[test]
    fn removes_invisible() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn final_newline() {
        assert_eq!(ensure_final_newline("x\n\n\n"), "x\n");
        assert_eq!(ensure_final_newline("   "), "\n");
    }

    #[test]
    fn full_polish() {
        let raw = "```markdown\r\nFinal Answer:\r\n# Title   \r\nIntro\r\n## Part\r\n\r\n\r\n\r\n\r\nEnd\u{200B}\r\n```";
        assert_eq!(polish_markdown(raw), "# Title\nIntro\n\n## Part\n\n\nEnd\n");
    }
}
