//! Plan export to a paginated PDF.
//!
//! [`document_blocks`] decides the structure (headings vs paragraphs);
//! [`export_document`] lays those blocks onto US-Letter pages. Fonts and
//! margins are cosmetic.

use std::fs;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use thiserror::Error;
use tracing::info;

pub const FILE_NAME: &str = "GlobalWell_AI_Plan.pdf";
pub const CONTENT_TYPE: &str = "application/pdf";
pub const DOCUMENT_TITLE: &str = "Your Personalized Wellness Plan";

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN_SIDE: f32 = 25.4;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 6.35;
const PT_TO_MM: f32 = 0.3528;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("could not render document: {0}")]
    Render(String),

    #[error("could not write document: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocBlock {
    Heading(String),
    Paragraph(String),
}

pub fn document_blocks(plan_text: &str) -> Vec<DocBlock> {
    let cleaned = plan_text.replace("###", "").replace("**", "");
    cleaned
        .split('\n')
        .map(|line| match line.strip_prefix("## ") {
            Some(heading) => DocBlock::Heading(heading.to_string()),
            None => DocBlock::Paragraph(line.to_string()),
        })
        .collect()
}

/// Heading texts in document order.
pub fn headings(blocks: &[DocBlock]) -> Vec<&str> {
    blocks
        .iter()
        .filter_map(|b| match b {
            DocBlock::Heading(h) => Some(h.as_str()),
            DocBlock::Paragraph(_) => None,
        })
        .collect()
}

/// Greedy word wrap by character count.
fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn line_height(size: f32) -> f32 {
    size * 1.2 * PT_TO_MM
}

fn chars_per_line(size: f32) -> usize {
    let usable_pt = (PAGE_WIDTH - 2.0 * MARGIN_SIDE) / PT_TO_MM;
    (usable_pt / (size * 0.5)) as usize
}

struct PageCursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageCursor {
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN_TOP;
            self.pages += 1;
        }
    }

    fn write_line(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        let height = line_height(size);
        self.ensure_room(height);
        self.y -= height;
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn skip(&mut self, height: f32) {
        self.ensure_room(height);
        self.y -= height;
    }
}

fn render_error<E: std::fmt::Debug>(err: E) -> ExportError {
    ExportError::Render(format!("{err:?}"))
}

pub fn export_document(plan_text: &str) -> Result<Vec<u8>, ExportError> {
    render(plan_text).map(|rendered| rendered.bytes)
}

struct Rendered {
    bytes: Vec<u8>,
    pages: usize,
}

fn render(plan_text: &str) -> Result<Rendered, ExportError> {
    let (doc, page, layer) = PdfDocument::new(DOCUMENT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let title_font = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_error)?;
    let body_font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut cursor = PageCursor {
        doc,
        layer,
        y: PAGE_HEIGHT - MARGIN_TOP,
        pages: 1,
    };

    let title_width = DOCUMENT_TITLE.chars().count() as f32 * TITLE_SIZE * 0.5 * PT_TO_MM;
    let title_x = ((PAGE_WIDTH - title_width) / 2.0).max(MARGIN_SIDE);
    cursor.write_line(DOCUMENT_TITLE, TITLE_SIZE, title_x, &title_font);
    cursor.skip(24.0 * PT_TO_MM);

    let blocks = document_blocks(plan_text);
    let sections = headings(&blocks).len();
    for block in blocks {
        match block {
            DocBlock::Heading(text) => {
                cursor.skip(line_height(BODY_SIZE) / 2.0);
                for line in wrap_words(&text, chars_per_line(HEADING_SIZE)) {
                    cursor.write_line(&line, HEADING_SIZE, MARGIN_SIDE, &title_font);
                }
            }
            DocBlock::Paragraph(text) if text.trim().is_empty() => {
                cursor.skip(line_height(BODY_SIZE) / 2.0);
            }
            DocBlock::Paragraph(text) => {
                for line in wrap_words(&text, chars_per_line(BODY_SIZE)) {
                    cursor.write_line(&line, BODY_SIZE, MARGIN_SIDE, &body_font);
                }
            }
        }
    }

    let pages = cursor.pages;
    let bytes = cursor.doc.save_to_bytes().map_err(render_error)?;
    info!(pages, sections, bytes = bytes.len(), "rendered plan document");
    Ok(Rendered { bytes, pages })
}

/// Render the plan and write it as [`FILE_NAME`] inside `dir`.
pub fn write_document(dir: &Path, plan_text: &str) -> Result<PathBuf, ExportError> {
    let bytes = export_document(plan_text)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(FILE_NAME);
    let temp_path = path.with_extension("pdf.tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, &path)?;
    Ok(path)
}
