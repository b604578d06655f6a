//! Font handling: built-in Type1 standard fonts and embedded TrueType fonts.
//!
//! Standard fonts are referenced by name and use approximate metrics for
//! wrapping. TrueType fonts are parsed with `ttf-parser`, embedded in full as
//! a FontFile2 stream, and carry exact WinAnsi advance widths.

use crate::error::CoreError;

/// WinAnsi code points 0x80..0xA0 that differ from Latin-1.
/// Codes absent from the table (0x81, 0x8D, 0x8F, 0x90, 0x9D) are undefined.
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

/// Encode a single character as a WinAnsi byte, if representable.
pub(crate) fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E => Some(code as u8),
        0xA0..=0xFF => Some(code as u8),
        _ => WINANSI_HIGH
            .iter()
            .find(|(_, ch)| *ch == c)
            .map(|(b, _)| *b),
    }
}

/// Decode a WinAnsi byte back to a character (for width lookups).
fn winansi_char(b: u8) -> Option<char> {
    match b {
        0x20..=0x7E => Some(b as char),
        0xA0..=0xFF => char::from_u32(b as u32),
        _ => WINANSI_HIGH.iter().find(|(wb, _)| *wb == b).map(|(_, c)| *c),
    }
}

/// Encode a string as WinAnsi bytes, replacing unrepresentable characters
/// with '?'.
pub(crate) fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| winansi_byte(c).unwrap_or(b'?')).collect()
}

/// The built-in Type1 fonts every conforming reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    Courier,
}

impl StandardFont {
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::Courier => "Courier",
        }
    }

    /// Approximate advance width of `c` in text space units per em.
    ///
    /// Standard fonts are not embedded, so exact AFM metrics are not
    /// available here; a classed approximation is close enough for greedy
    /// wrapping in sample documents.
    fn char_width(&self, c: char) -> f64 {
        if *self == StandardFont::Courier {
            return 0.6;
        }
        match c {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.24,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.35,
            'm' | 'w' | 'M' | 'W' => 0.85,
            'A'..='Z' | '@' | '%' | '&' => 0.70,
            _ => 0.52,
        }
    }
}

/// A TrueType font loaded from raw bytes, embedded in full.
pub struct TrueTypeFont {
    pub(crate) data: Vec<u8>,
    pub(crate) base_name: String,
    units_per_em: f64,
    pub(crate) ascent: f64,
    pub(crate) descent: f64,
    pub(crate) bbox: [f64; 4],
    /// Advance widths in 1000-unit glyph space for WinAnsi codes 32..=255.
    pub(crate) widths: Vec<i64>,
}

impl TrueTypeFont {
    /// Parse a TrueType font, extracting the metrics needed for embedding.
    ///
    /// `base_name` becomes the /BaseFont entry; it should be the font's
    /// PostScript name (e.g. "FreeSans").
    pub fn load(data: Vec<u8>, base_name: impl Into<String>) -> Result<Self, CoreError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| CoreError::Font(format!("Failed to parse TrueType font: {}", e)))?;

        let upem = face.units_per_em() as f64;
        if upem <= 0.0 {
            return Err(CoreError::Font("Font has invalid units per em".into()));
        }
        let scale = 1000.0 / upem;

        let gb = face.global_bounding_box();
        let bbox = [
            gb.x_min as f64 * scale,
            gb.y_min as f64 * scale,
            gb.x_max as f64 * scale,
            gb.y_max as f64 * scale,
        ];
        let ascent = face.ascender() as f64 * scale;
        let descent = face.descender() as f64 * scale;

        let mut widths = Vec::with_capacity(224);
        for code in 32u16..=255 {
            let w = winansi_char(code as u8)
                .and_then(|c| face.glyph_index(c))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| (adv as f64 * scale).round() as i64)
                .unwrap_or(0);
            widths.push(w);
        }

        Ok(Self {
            data,
            base_name: base_name.into(),
            units_per_em: upem,
            ascent,
            descent,
            bbox,
            widths,
        })
    }

    /// Advance width of `c` in text space units per em.
    fn char_width(&self, c: char) -> f64 {
        let code = winansi_byte(c).unwrap_or(b'?');
        if code < 32 {
            return 0.0;
        }
        self.widths[(code - 32) as usize] as f64 / 1000.0
    }
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("base_name", &self.base_name)
            .field("units_per_em", &self.units_per_em)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A font usable by the document builder.
#[derive(Debug)]
pub enum Font {
    Standard(StandardFont),
    TrueType(TrueTypeFont),
}

impl Font {
    pub fn base_name(&self) -> &str {
        match self {
            Font::Standard(s) => s.base_name(),
            Font::TrueType(t) => &t.base_name,
        }
    }

    /// Width of `text` at the given size, in PDF points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let em: f64 = text
            .chars()
            .map(|c| match self {
                Font::Standard(s) => s.char_width(c),
                Font::TrueType(t) => t.char_width(c),
            })
            .sum();
        em * size
    }
}

impl From<StandardFont> for Font {
    fn from(s: StandardFont) -> Self {
        Font::Standard(s)
    }
}

impl From<TrueTypeFont> for Font {
    fn from(t: TrueTypeFont) -> Self {
        Font::TrueType(t)
    }
}
