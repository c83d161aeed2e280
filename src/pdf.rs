//! Minimal single-page PDF writer used for completion certificates.
//!
//! Only what certificates need: an A4 landscape page, the two standard Helvetica faces and
//! horizontally centred lines of text. Non-ASCII characters are replaced with `?` because the
//! standard fonts are addressed with single-byte WinAnsi codes.

use std::fmt::Write as _;

const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
// Rough average glyph width of Helvetica as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    size: f32,
    font: Font,
    y: f32,
}

/// PdfPage
///
/// Builder for a landscape page of centred text lines. `y` is measured from the bottom edge.
#[derive(Debug, Clone, Default)]
pub struct PdfPage {
    lines: Vec<Line>,
    border: bool,
}

impl PdfPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height() -> f32 {
        PAGE_HEIGHT
    }

    /// Draws a double frame around the page.
    pub fn with_border(mut self) -> Self {
        self.border = true;
        self
    }

    pub fn centered(mut self, y: f32, size: f32, font: Font, text: &str) -> Self {
        self.lines.push(Line { text: text.to_string(), size, font, y });
        self
    }

    fn content_stream(&self) -> String {
        let mut out = String::new();

        if self.border {
            let _ = writeln!(out, "2 w 20 20 {} {} re S", PAGE_WIDTH - 40.0, PAGE_HEIGHT - 40.0);
            let _ = writeln!(out, "0.5 w 30 30 {} {} re S", PAGE_WIDTH - 60.0, PAGE_HEIGHT - 60.0);
        }

        for line in &self.lines {
            let text = escape(&line.text);
            let width = line.text.chars().count() as f32 * line.size * AVG_GLYPH_WIDTH;
            let x = ((PAGE_WIDTH - width) / 2.0).max(36.0);
            let _ = writeln!(
                out,
                "BT /{} {:.1} Tf {:.1} {:.1} Td ({}) Tj ET",
                line.font.resource(),
                line.size,
                x,
                line.y,
                text
            );
        }
        out
    }

    /// Serialises the page as a complete PDF 1.4 file with a valid cross-reference table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let content = self.content_stream();

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Contents 4 0 R /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> >>"
            ),
            format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
        }

        let xref_offset = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            // Each entry is exactly 20 bytes including the two-byte line ending.
            let _ = write!(out, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );

        out.into_bytes()
    }
}

/// Escapes PDF string delimiters and folds anything outside printable ASCII to `?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
