//! HTML writer: a standalone HTML5 page around the rendered Markdown.

use crate::error::ExportError;
use crate::output::ExportedFile;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.+)$").unwrap());

const STYLE: &str = "\
body { font-family: Arial, Helvetica, sans-serif; margin: 40px auto; max-width: 860px; line-height: 1.6; color: #222; }
header h1 { color: #333; border-bottom: 2px solid #333; padding-bottom: 10px; }
header .generated { color: #777; font-size: 0.9em; }
table { border-collapse: collapse; margin: 1em 0; }
th, td { border: 1px solid #ccc; padding: 6px 10px; }
footer { margin-top: 3em; color: #777; font-size: 0.85em; }";

/// `my_report-v2` → `My Report-V2`.
pub fn title_case(base: &str) -> String {
    let spaced = base.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Title for a document: the first `# ` heading, else the title-cased base name.
pub fn document_title(markdown: &str, base: &str) -> String {
    RE_H1
        .captures(markdown)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_case(base))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Markdown with GFM tables to an HTML fragment. Raw HTML in the input is
/// shown as text, never passed through.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// `markdown` without its first `# ` heading when that heading is `title`.
fn without_title_heading<'a>(markdown: &'a str, title: &str) -> Cow<'a, str> {
    let Some(caps) = RE_H1.captures(markdown) else {
        return Cow::Borrowed(markdown);
    };
    match caps.get(0) {
        Some(m) if caps[1].trim() == title => {
            Cow::Owned(format!("{}{}", &markdown[..m.start()], &markdown[m.end()..]))
        }
        _ => Cow::Borrowed(markdown),
    }
}

/// Build the full page. The header carries the title, so a leading heading
/// that repeats it is left out of the body.
pub fn render_html(
    markdown: &str,
    title: Option<&str>,
    base: &str,
    generated_on: NaiveDate,
) -> String {
    let title = match title {
        Some(t) => t.to_string(),
        None => document_title(markdown, base),
    };
    let body = markdown_to_html(&without_title_heading(markdown, &title));
    let title = escape_html(&title);
    let date = generated_on.format("%B %-d, %Y");
    let source = escape_html(base);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
{STYLE}
</style>
</head>
<body>
<header>
<h1>{title}</h1>
<div class="generated">Generated on {date}</div>
</header>
<main>
{body}</main>
<footer>
<p>Source document: {source}</p>
</footer>
</body>
</html>
"#
    )
}

/// Render and write `<dir>/<base>.html`, dated today.
pub fn export_html(
    markdown: &str,
    title: Option<&str>,
    base: &str,
    dir: &Path,
) -> Result<ExportedFile, ExportError> {
    let path = dir.join(format!("{base}.html"));
    let page = render_html(markdown, title, base, chrono::Local::now().date_naive());

    std::fs::write(&path, page.as_bytes()).map_err(|e| ExportError {
        format: "html".to_string(),
        path: path.clone(),
        detail: e.to_string(),
    })?;

    Ok(ExportedFile {
        format: "html".to_string(),
        path,
        bytes: page.len() as u64,
    })
}
