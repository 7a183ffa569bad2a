//! Minimal single-page PDF writer for bid receipts.
//!
//! Layout coordinates are A4 millimetres measured from the top-left corner
//! and converted to PDF points on output. Text uses the base-14 Helvetica
//! fonts with WinAnsi encoding, so nothing is embedded.

use std::fmt::Write as _;

use super::{Receipt, FEE_LINE};
use crate::bid::signature::Signature;

const PAGE_W_MM: f64 = 210.0;
const PAGE_H_MM: f64 = 297.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

const SIG_BOX_X: f64 = 20.0;
const SIG_BOX_Y: f64 = 145.0;
const SIG_BOX_W: f64 = 60.0;
const SIG_BOX_H: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    /// Advance width in 1/1000 em. Only the glyphs used in centered headings are tabulated.
    fn glyph_width(&self, c: char) -> u32 {
        let bold = matches!(self, Font::HelveticaBold);
        match c {
            ' ' => 278,
            'I' => 278,
            'J' => if bold { 556 } else { 500 },
            'L' => if bold { 611 } else { 556 },
            'A' | 'B' | 'K' => if bold { 722 } else { 667 },
            'E' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
            'F' | 'T' | 'Z' => 611,
            'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722,
            'G' | 'O' | 'Q' => 778,
            'M' => 833,
            'W' => 944,
            _ => if bold { 611 } else { 556 },
        }
    }

    pub fn text_width_pt(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.glyph_width(c)).sum();
        units as f64 * size / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

fn x_pt(x_mm: f64) -> f64 {
    x_mm * PT_PER_MM
}

fn y_pt(y_mm: f64) -> f64 {
    (PAGE_H_MM - y_mm) * PT_PER_MM
}

/// PDF literal string body in WinAnsi. `£` is 0xA3; other non-ASCII becomes `?`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '£' => out.push_str("\\243"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Content stream builder for one page.
#[derive(Debug, Default)]
pub struct PageContent {
    ops: String,
}

impl PageContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rgb(&mut self, r: u8, g: u8, b: u8) -> &mut Self {
        let _ = writeln!(self.ops, "{:.3} {:.3} {:.3} rg", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        self
    }

    pub fn stroke_rgb(&mut self, r: u8, g: u8, b: u8) -> &mut Self {
        let _ = writeln!(self.ops, "{:.3} {:.3} {:.3} RG", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        self
    }

    pub fn fill_rect(&mut self, x_mm: f64, y_mm: f64, w_mm: f64, h_mm: f64) -> &mut Self {
        let _ = writeln!(
            self.ops,
            "{:.2} {:.2} {:.2} {:.2} re f",
            x_pt(x_mm),
            y_pt(y_mm + h_mm),
            w_mm * PT_PER_MM,
            h_mm * PT_PER_MM
        );
        self
    }

    pub fn text(&mut self, font: Font, size: f64, x_mm: f64, y_mm: f64, align: Align, text: &str) -> &mut Self {
        let x = match align {
            Align::Left => x_pt(x_mm),
            Align::Center => x_pt(x_mm) - font.text_width_pt(text, size) / 2.0,
        };
        let _ = writeln!(
            self.ops,
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            size,
            x,
            y_pt(y_mm),
            escape_text(text)
        );
        self
    }

    /// Scales the signature canvas into the given box, preserving aspect ratio.
    pub fn signature(&mut self, sig: &Signature, x_mm: f64, y_mm: f64, w_mm: f64, h_mm: f64) -> &mut Self {
        if sig.width <= 0.0 || sig.height <= 0.0 {
            return self;
        }
        let scale = (w_mm / sig.width as f64).min(h_mm / sig.height as f64);
        self.ops.push_str("q 1 J 1 j 0.6 w\n");
        for stroke in &sig.strokes {
            let Some(first) = stroke.first() else { continue };
            let to_pt = |px: f32, py: f32| (x_pt(x_mm + px as f64 * scale), y_pt(y_mm + py as f64 * scale));
            let (sx, sy) = to_pt(first.x, first.y);
            let _ = writeln!(self.ops, "{:.2} {:.2} m", sx, sy);
            if stroke.len() == 1 {
                // A tap still leaves a dot with round caps.
                let _ = writeln!(self.ops, "{:.2} {:.2} l", sx, sy);
            }
            for p in stroke.iter().skip(1) {
                let (px, py) = to_pt(p.x, p.y);
                let _ = writeln!(self.ops, "{:.2} {:.2} l", px, py);
            }
            self.ops.push_str("S\n");
        }
        self.ops.push_str("Q\n");
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.ops.as_bytes()
    }
}

pub fn receipt_content(receipt: &Receipt) -> PageContent {
    let mut page = PageContent::new();
    page.fill_rgb(10, 10, 11)
        .fill_rect(0.0, 0.0, PAGE_W_MM, 40.0)
        .fill_rgb(80, 200, 120)
        .text(Font::HelveticaBold, 22.0, PAGE_W_MM / 2.0, 20.0, Align::Center, "BIDSMITH ASF")
        .fill_rgb(0, 0, 0)
        .text(Font::Helvetica, 12.0, PAGE_W_MM / 2.0, 60.0, Align::Center, "OFFICIAL BID RECEIPT")
        .text(Font::Helvetica, 10.0, 20.0, 80.0, Align::Left, &format!("Transaction ID: {}", receipt.id))
        .text(Font::Helvetica, 10.0, 20.0, 90.0, Align::Left, &receipt.date_line())
        .text(Font::Helvetica, 10.0, 20.0, 100.0, Align::Left, FEE_LINE)
        .text(Font::Helvetica, 10.0, 20.0, 110.0, Align::Left, "Status: CLEARED - STRIPE PAYMENT VERIFIED")
        .text(Font::Helvetica, 10.0, 20.0, 140.0, Align::Left, "Digital Signature of Authorized Agent:")
        .stroke_rgb(20, 20, 24)
        .signature(&receipt.signature, SIG_BOX_X, SIG_BOX_Y, SIG_BOX_W, SIG_BOX_H)
        .fill_rgb(100, 100, 100)
        .text(
            Font::Helvetica,
            8.0,
            20.0,
            280.0,
            Align::Left,
            "This document is a legally binding ratification of the bid entry.",
        );
    page
}

/// Serializes catalog, page tree, page, content, fonts and info with a byte-exact xref table.
pub fn render_receipt(receipt: &Receipt) -> Vec<u8> {
    let content = receipt_content(receipt);
    let created = receipt.issued_at.format("D:%Y%m%d%H%M%S").to_string();

    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec());
    objects.push(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> /Contents 4 0 R >>",
            PAGE_W_MM * PT_PER_MM,
            PAGE_H_MM * PT_PER_MM
        )
        .into_bytes(),
    );
    let mut stream = format!("<< /Length {} >>\nstream\n", content.as_bytes().len()).into_bytes();
    stream.extend_from_slice(content.as_bytes());
    stream.extend_from_slice(b"\nendstream");
    objects.push(stream);
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec());
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec());
    objects.push(
        format!(
            "<< /Title (BidSmith Receipt {}) /Producer (bidsmith) /CreationDate ({}) >>",
            escape_text(receipt.id.as_str()),
            created
        )
        .into_bytes(),
    );

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in &offsets {
        let _ = write!(xref, "{:010} 00000 n \n", off);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        objects.len(),
        xref_at
    );
    out.extend_from_slice(xref.as_bytes());
    out
}
