//! PDF writer: plain paragraphs on US Letter pages with the base-14
//! Helvetica fonts.
//!
//! The base-14 fonts need no embedding, which keeps output small and
//! dependency-free, but they only cover WinAnsi. Text therefore goes through
//! [`strip_markdown`] and [`to_latin1`] before layout.
//!
//! ## Layout
//!
//! * Page 612 × 792 pt, 72 pt margins on every side
//! * Title: Helvetica-Bold 24 pt, 30 pt after
//! * Body: Helvetica 12 pt, 12 pt after each paragraph
//! * Paragraphs are separated by blank lines; single newlines inside a
//!   paragraph start a new line (keeps list items apart)
//! * Lines are wrapped with the Helvetica advance widths

use crate::error::ExportError;
use crate::output::ExportedFile;
use crate::pipeline::normalize::{strip_markdown, to_latin1};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::debug;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const TEXT_WIDTH: f32 = (PAGE_WIDTH - 2 * MARGIN) as f32;

/// Advance widths (1/1000 em) for WinAnsi 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for Latin-1 characters above 0x7E.
const FALLBACK_WIDTH: u16 = 556;

struct TextStyle {
    /// Resource name of the font.
    font: &'static str,
    size: i64,
    leading: i64,
    space_after: i64,
    widths: &'static [u16; 95],
}

const TITLE: TextStyle = TextStyle {
    font: "F2",
    size: 24,
    leading: 29,
    space_after: 30,
    widths: &HELVETICA_BOLD,
};

const BODY: TextStyle = TextStyle {
    font: "F1",
    size: 12,
    leading: 15,
    space_after: 12,
    widths: &HELVETICA,
};

impl TextStyle {
    fn char_width(&self, c: char) -> f32 {
        let units = match c as u32 {
            cp @ 0x20..=0x7E => self.widths[(cp - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        };
        units as f32 * self.size as f32 / 1000.0
    }

    fn text_width(&self, text: &str) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum()
    }
}

/// Greedy word wrap to `max_width` points. Words wider than a line are
/// broken between characters.
fn wrap(text: &str, style: &TextStyle, max_width: f32) -> Vec<String> {
    let space = style.char_width(' ');
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0f32;

    for word in text.split_whitespace() {
        let word_width = style.text_width(word);

        if word_width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            for c in word.chars() {
                let w = style.char_width(c);
                if current_width + w > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += w;
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space + word_width
        };

        if needed > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Text cursor over a growing list of pages.
struct Layout {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn line(&mut self, text: &str, style: &TextStyle) {
        if self.y - style.leading < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= style.leading;

        let bytes: Vec<u8> = text
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| c as u32 as u8)
            .collect();

        if let Some(ops) = self.pages.last_mut() {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec![style.font.into(), style.size.into()]));
            ops.push(Operation::new("Td", vec![MARGIN.into(), self.y.into()]));
            ops.push(Operation::new("Tj", vec![Object::string_literal(bytes)]));
            ops.push(Operation::new("ET", vec![]));
        }
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle) {
        for source_line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            for line in wrap(source_line, style, TEXT_WIDTH) {
                self.line(&line, style);
            }
        }
        self.y -= style.space_after;
    }
}

fn media_box() -> Vec<Object> {
    vec![0i64.into(), 0i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]
}

/// Markdown → printable paragraphs.
fn paragraphs(markdown: &str) -> Vec<String> {
    let normalised = markdown.replace("\r\n", "\n");
    normalised
        .split("\n\n")
        .map(|p| to_latin1(&strip_markdown(p)).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Lay out `markdown` and serialise the PDF.
///
/// With `title` set, it becomes the title and every paragraph is body text.
/// Without it, the first paragraph is the title.
pub fn render_pdf(title: Option<&str>, markdown: &str) -> Result<Vec<u8>, lopdf::Error> {
    let mut body = paragraphs(markdown);
    let title = match title {
        Some(t) => Some(to_latin1(t).trim().to_string()),
        None if !body.is_empty() => Some(body.remove(0)),
        None => None,
    };

    let mut layout = Layout::new();
    if let Some(ref t) = title {
        layout.paragraph(t, &TITLE);
    }
    for p in &body {
        layout.paragraph(p, &BODY);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for operations in layout.pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box(),
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => media_box(),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(
            title.unwrap_or_default().chars().map(|c| c as u32 as u8).collect::<Vec<u8>>()
        ),
        "Producer" => Object::string_literal("edgequake-contentgen"),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    debug!("Rendered PDF: {} pages, {} bytes", page_count, buf.len());
    Ok(buf)
}

/// Render and write `<dir>/<base>.pdf`.
pub fn export_pdf(
    markdown: &str,
    title: Option<&str>,
    base: &str,
    dir: &Path,
) -> Result<ExportedFile, ExportError> {
    let path = dir.join(format!("{base}.pdf"));
    let fail = |detail: String| ExportError {
        format: "pdf".to_string(),
        path: path.clone(),
        detail,
    };

    if paragraphs(markdown).is_empty() && !strip_markdown(markdown).trim().is_empty() {
        return Err(fail(
            "no printable text: the PDF fonts cover Latin-1 only, translate the document \
             to English or export HTML"
                .to_string(),
        ));
    }

    let bytes = render_pdf(title, markdown).map_err(|e| fail(e.to_string()))?;
    std::fs::write(&path, &bytes).map_err(|e| fail(e.to_string()))?;

    Ok(ExportedFile {
        format: "pdf".to_string(),
        path: path.clone(),
        bytes: bytes.len() as u64,
    })
}
