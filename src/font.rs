use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use ttf_parser::GlyphId;

use crate::cff::{CffInfo, parse_cff};
use crate::error::{PdfError, Result};
use crate::object::{escape_pdf_string, latin1_bytes};
use crate::subset::find_table;
use crate::type3::{ColorKind, detect_color_kind};
use crate::varstore::design_axes;

/// Standard fonts, keyed by lowercase family plus sorted style letters.
const CORE_FONTS: &[(&str, &str)] = &[
    ("courier", "Courier"),
    ("courierB", "Courier-Bold"),
    ("courierI", "Courier-Oblique"),
    ("courierBI", "Courier-BoldOblique"),
    ("helvetica", "Helvetica"),
    ("helveticaB", "Helvetica-Bold"),
    ("helveticaI", "Helvetica-Oblique"),
    ("helveticaBI", "Helvetica-BoldOblique"),
    ("times", "Times-Roman"),
    ("timesB", "Times-Bold"),
    ("timesI", "Times-Italic"),
    ("timesBI", "Times-BoldItalic"),
    ("symbol", "Symbol"),
    ("zapfdingbats", "ZapfDingbats"),
];

const CORE_FAMILIES: &[&str] = &["courier", "helvetica", "times", "symbol", "zapfdingbats"];

/// cp1252 code points in 0x80..=0x9F.
const WIN_ANSI_EXTRA: &[(char, u8)] = &[
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

pub(crate) fn core_font_name(key: &str) -> Option<&'static str> {
    CORE_FONTS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, name)| *name)
}

pub(crate) fn is_core_family(family: &str) -> bool {
    CORE_FAMILIES.contains(&family)
}

/// Uppercase, sorted style letters; underline is a decoration, not a face.
pub(crate) fn style_key(style: &str) -> String {
    let mut letters: Vec<char> = style
        .to_ascii_uppercase()
        .chars()
        .filter(|c| *c == 'B' || *c == 'I')
        .collect();
    letters.sort_unstable();
    letters.dedup();
    letters.into_iter().collect()
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct CoreFont {
    /// Resource index; selected with `/F{index}`.
    pub index: usize,
    pub key: String,
    pub name: &'static str,
    pub style: String,
}

impl CoreFont {
    fn encode(&self, text: &str) -> Vec<u8> {
        if matches!(self.name, "Symbol" | "ZapfDingbats") {
            return latin1_bytes(text);
        }
        text.chars().map(win_ansi_byte).collect()
    }
}

fn win_ansi_byte(ch: char) -> u8 {
    let cp = ch as u32;
    if cp < 0x80 || (0xA0..=0xFF).contains(&cp) {
        return cp as u8;
    }
    WIN_ANSI_EXTRA
        .iter()
        .find(|(candidate, _)| *candidate == ch)
        .map(|(_, byte)| *byte)
        .unwrap_or(b'?')
}

/// One used glyph; `width` is already scaled to 1000 units per em.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetGlyph {
    pub glyph_id: u16,
    pub unicode: Vec<u32>,
    pub name: String,
    pub width: i64,
}

/// Used glyphs and the character codes handed out for them. Codes start at 1.
#[derive(Debug, Clone)]
pub(crate) struct GlyphSubset {
    entries: Vec<(SubsetGlyph, u32)>,
    by_glyph: HashMap<u16, usize>,
    next: u32,
}

impl Default for GlyphSubset {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_glyph: HashMap::new(),
            next: 1,
        }
    }
}

impl GlyphSubset {
    pub(crate) fn pick(&mut self, glyph: SubsetGlyph) -> u32 {
        if let Some(&pos) = self.by_glyph.get(&glyph.glyph_id) {
            return self.entries[pos].1;
        }
        let code = self.next;
        self.next += 1;
        self.by_glyph.insert(glyph.glyph_id, self.entries.len());
        self.entries.push((glyph, code));
        code
    }

    pub(crate) fn items(&self) -> impl Iterator<Item = (&SubsetGlyph, u32)> {
        self.entries.iter().map(|(glyph, code)| (glyph, *code))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn highest_code(&self) -> u32 {
        self.next - 1
    }

    pub(crate) fn code_widths(&self) -> BTreeMap<u32, i64> {
        self.items().map(|(glyph, code)| (code, glyph.width)).collect()
    }

    pub(crate) fn code_unicodes(&self) -> BTreeMap<u32, Vec<u32>> {
        self.items()
            .map(|(glyph, code)| (code, glyph.unicode.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DescriptorMetrics {
    pub(crate) ascent: i32,
    pub(crate) descent: i32,
    pub(crate) cap_height: i32,
    pub(crate) italic_angle: i32,
    pub(crate) flags: u32,
    pub(crate) bbox: [i32; 4],
    pub(crate) stem_v: i32,
    pub(crate) missing_width: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutlineFormat {
    TrueType,
    Cff(CffInfo),
    /// Bitmap-only font; only drawable through a color technology.
    None,
}

#[derive(Debug, Clone)]
pub struct TtfFont {
    pub index: usize,
    pub key: String,
    /// PostScript name without spaces or parentheses.
    pub name: String,
    pub(crate) data: Arc<Vec<u8>>,
    pub(crate) units_per_em: u16,
    pub(crate) metrics: DescriptorMetrics,
    pub(crate) outlines: OutlineFormat,
    pub(crate) color: Option<ColorKind>,
    pub(crate) subset: GlyphSubset,
    pub(crate) missing_glyphs: Vec<char>,
    pub(crate) biggest_size_pt: f32,
    /// `CPAL` palette for color glyphs.
    pub(crate) palette: usize,
    /// Requested `(axis tag, user value)` pairs for variable color glyphs.
    pub(crate) variations: Vec<([u8; 4], f32)>,
}

impl TtfFont {
    pub(crate) fn face(&self) -> Result<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0)
            .map_err(|err| PdfError::font(format!("cannot parse font {}: {err}", self.name)))
    }

    /// Type-3 color fonts use 1-byte codes.
    pub fn is_color(&self) -> bool {
        self.color.is_some()
    }

    pub(crate) fn scale(&self) -> f32 {
        1000.0 / self.units_per_em.max(1) as f32
    }

    fn encode(&mut self, text: &str) -> Result<String> {
        let data = Arc::clone(&self.data);
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| PdfError::font(format!("cannot parse font {}: {err}", self.name)))?;
        let scale = self.scale();
        let mut hex = String::with_capacity(text.len() * 4);
        for ch in text.chars() {
            let (gid, unicode) = match face.glyph_index(ch) {
                Some(gid) => (gid, vec![ch as u32]),
                None => {
                    if !self.missing_glyphs.contains(&ch) {
                        self.missing_glyphs.push(ch);
                    }
                    (GlyphId(0), Vec::new())
                }
            };
            let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32;
            let name = face
                .glyph_name(gid)
                .map(|name| name.to_string())
                .unwrap_or_else(|| fallback_glyph_name(gid.0, &unicode));
            let code = self.subset.pick(SubsetGlyph {
                glyph_id: gid.0,
                unicode,
                name,
                width: (advance * scale + 0.001).round() as i64,
            });
            if self.is_color() {
                hex.push_str(&format!("{:02X}", code & 0xFF));
            } else {
                hex.push_str(&format!("{:04X}", code));
            }
        }
        Ok(format!("<{hex}>"))
    }
}

pub(crate) fn fallback_glyph_name(gid: u16, unicode: &[u32]) -> String {
    match gid {
        0 => ".notdef".to_string(),
        _ => match unicode {
            [cp] if *cp <= 0xFFFF => format!("uni{:04X}", cp),
            [cp] => format!("u{:X}", cp),
            _ => format!("glyph{gid}"),
        },
    }
}

#[derive(Debug, Clone)]
pub enum RegisteredFont {
    Core(CoreFont),
    TrueType(Box<TtfFont>),
}

impl RegisteredFont {
    pub fn index(&self) -> usize {
        match self {
            RegisteredFont::Core(font) => font.index,
            RegisteredFont::TrueType(font) => font.index,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RegisteredFont::Core(font) => &font.key,
            RegisteredFont::TrueType(font) => &font.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RegisteredFont::Core(font) => font.name,
            RegisteredFont::TrueType(font) => &font.name,
        }
    }
}

/// Fonts of one build. Index `n` is selected in content with `/F{n}`.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    by_key: HashMap<String, usize>,
    render_color_fonts: bool,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FontRegistry {
    pub fn new(render_color_fonts: bool) -> Self {
        Self {
            fonts: Vec::new(),
            by_key: HashMap::new(),
            render_color_fonts,
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).map(|pos| pos + 1)
    }

    pub fn get(&self, index: usize) -> Option<&RegisteredFont> {
        index.checked_sub(1).and_then(|pos| self.fonts.get(pos))
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RegisteredFont> {
        index.checked_sub(1).and_then(|pos| self.fonts.get_mut(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredFont> {
        self.fonts.iter()
    }

    /// Registers (or returns) the standard font stored under `key`.
    pub(crate) fn add_core(&mut self, key: &str, style: &str) -> Result<usize> {
        if let Some(index) = self.index_of(key) {
            return Ok(index);
        }
        let name = core_font_name(key)
            .ok_or_else(|| PdfError::FontLookup(format!("{key} is not a standard font")))?;
        let index = self.fonts.len() + 1;
        self.fonts.push(RegisteredFont::Core(CoreFont {
            index,
            key: key.to_string(),
            name,
            style: style.to_string(),
        }));
        self.by_key.insert(key.to_string(), index - 1);
        Ok(index)
    }

    /// Registers a TrueType/OpenType font under `family` + `style`.
    pub fn add_font(&mut self, family: &str, style: &str, data: Vec<u8>) -> Result<usize> {
        let key = format!("{}{}", normalize_name(family), style_key(style));
        if let Some(index) = self.index_of(&key) {
            return Ok(index);
        }
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| PdfError::font(format!("invalid font data for {family}: {err}")))?;
        let units_per_em = face.units_per_em().max(1);
        let metrics = descriptor_metrics(&face);
        let outlines = if let Some(cff) = find_table(&data, b"CFF ") {
            OutlineFormat::Cff(parse_cff(cff)?)
        } else if face.tables().glyf.is_some() {
            OutlineFormat::TrueType
        } else {
            OutlineFormat::None
        };
        let color = if self.render_color_fonts {
            detect_color_kind(&data, outlines != OutlineFormat::None)
        } else {
            None
        };
        if color.is_none() && outlines == OutlineFormat::None {
            return Err(PdfError::font(format!(
                "font {family} has no outlines and color rendering is disabled"
            )));
        }
        let name = postscript_name(&face, family);
        drop(face);

        let index = self.fonts.len() + 1;
        self.fonts.push(RegisteredFont::TrueType(Box::new(TtfFont {
            index,
            key: key.clone(),
            name,
            data: Arc::new(data),
            units_per_em,
            metrics,
            outlines,
            color,
            subset: GlyphSubset::default(),
            missing_glyphs: Vec::new(),
            biggest_size_pt: 0.0,
            palette: 0,
            variations: Vec::new(),
        })));
        self.by_key.insert(key, index - 1);
        Ok(index)
    }

    fn truetype_mut(&mut self, index: usize) -> Result<&mut TtfFont> {
        match self.get_mut(index) {
            Some(RegisteredFont::TrueType(font)) => Ok(&mut **font),
            Some(RegisteredFont::Core(font)) => Err(PdfError::InvalidConfiguration(format!(
                "F{index} is the standard font {}",
                font.name
            ))),
            None => Err(PdfError::FontLookup(format!("no font registered as F{index}"))),
        }
    }

    /// Selects the `CPAL` palette color glyphs of font `index` are drawn
    /// with. A palette the font lacks falls back to palette 0 when rendering.
    pub fn set_palette(&mut self, index: usize, palette: usize) -> Result<()> {
        self.truetype_mut(index)?.palette = palette;
        Ok(())
    }

    /// Draws the color glyphs of font `index` at `value` (user units) on
    /// variation axis `axis`, e.g. `("wght", 700.0)`.
    pub fn set_variation(&mut self, index: usize, axis: &str, value: f32) -> Result<()> {
        let tag: [u8; 4] = axis
            .as_bytes()
            .try_into()
            .map_err(|_| PdfError::InvalidConfiguration(format!("axis tag {axis:?} is not 4 bytes")))?;
        if !value.is_finite() {
            return Err(PdfError::InvalidConfiguration(format!(
                "variation value for {axis} must be finite"
            )));
        }
        let font = self.truetype_mut(index)?;
        let axes = match find_table(&font.data, b"fvar") {
            Some(fvar) => design_axes(fvar)?,
            None => Vec::new(),
        };
        if !axes.iter().any(|candidate| candidate.tag == tag) {
            return Err(PdfError::InvalidConfiguration(format!(
                "font {} has no variation axis {axis}",
                font.name
            )));
        }
        font.variations.retain(|(existing, _)| *existing != tag);
        font.variations.push((tag, value));
        Ok(())
    }

    /// Maps `text` onto the font's codes and returns the `Tj` string operand.
    pub fn encode_text(&mut self, index: usize, size_pt: f32, text: &str) -> Result<String> {
        let font = self
            .get_mut(index)
            .ok_or_else(|| PdfError::FontLookup(format!("no font registered as F{index}")))?;
        match font {
            RegisteredFont::Core(core) => {
                let bytes = core.encode(text);
                let mut out = Vec::with_capacity(bytes.len() + 2);
                out.push(b'(');
                out.extend_from_slice(&escape_pdf_string(&bytes));
                out.push(b')');
                Ok(out.iter().map(|b| *b as char).collect())
            }
            RegisteredFont::TrueType(ttf) => {
                if size_pt > ttf.biggest_size_pt {
                    ttf.biggest_size_pt = size_pt;
                }
                ttf.encode(text)
            }
        }
    }
}

fn scale_i32(value: i16, scale: f32) -> i32 {
    (value as f32 * scale).round() as i32
}

fn descriptor_metrics(face: &ttf_parser::Face<'_>) -> DescriptorMetrics {
    let scale = 1000.0 / face.units_per_em().max(1) as f32;
    let ascent = scale_i32(face.ascender(), scale);
    let descent = scale_i32(face.descender(), scale);
    let cap_height = face
        .capital_height()
        .map(|value| scale_i32(value, scale))
        .unwrap_or(ascent);
    let bbox = face.global_bounding_box();
    let italic_angle = face.italic_angle().map(|v| v.round() as i32).unwrap_or(0);
    let weight = face.weight().to_number() as f32;

    let mut flags = 4u32;
    if face.is_monospaced() {
        flags |= 1;
    }
    if italic_angle != 0 {
        flags |= 1 << 6;
    }
    if weight >= 600.0 {
        flags |= 1 << 18;
    }
    let missing_width = face
        .glyph_hor_advance(GlyphId(0))
        .map(|w| (w as f32 * scale + 0.001).round() as i64)
        .unwrap_or(0);

    DescriptorMetrics {
        ascent,
        descent,
        cap_height,
        italic_angle,
        flags,
        bbox: [
            scale_i32(bbox.x_min, scale),
            scale_i32(bbox.y_min, scale),
            scale_i32(bbox.x_max, scale),
            scale_i32(bbox.y_max, scale),
        ],
        stem_v: (50.0 + (weight / 65.0).powi(2)).round() as i32,
        missing_width,
    }
}

fn postscript_name(face: &ttf_parser::Face<'_>, family: &str) -> String {
    let (primary, _) = font_names(face, Path::new(family));
    primary
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')'))
        .collect()
}

fn font_names(face: &ttf_parser::Face<'_>, path: &Path) -> (String, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;

    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }

    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string());
    let primary = post
        .clone()
        .or_else(|| full.clone())
        .or_else(|| family.clone())
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "EmbeddedFont".to_string());

    let mut aliases = Vec::new();
    for candidate in [family, full, post, stem].into_iter().flatten() {
        if candidate != primary {
            aliases.push(candidate);
        }
    }

    (primary, aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FontBuilder;
    use crate::varstore::build_fvar;

    #[test]
    fn style_letters_are_sorted_and_underline_dropped() {
        assert_eq!(style_key("ib"), "BI");
        assert_eq!(style_key("BUI"), "BI");
        assert_eq!(style_key("u"), "");
    }

    #[test]
    fn core_fonts_encode_win_ansi_literals() {
        let mut registry = FontRegistry::default();
        let index = registry.add_core("helveticaB", "B").unwrap();
        assert_eq!(registry.get(index).unwrap().name(), "Helvetica-Bold");
        let operand = registry.encode_text(index, 12.0, "a(b) \u{20AC}").unwrap();
        assert_eq!(operand, "(a\\(b\\) \u{80})");
        assert_eq!(registry.add_core("helveticaB", "B").unwrap(), index);
    }

    #[test]
    fn truetype_codes_start_at_one_and_repeat_per_glyph() {
        let data = FontBuilder::new().glyph('A', 600).glyph('B', 500).build();
        let mut registry = FontRegistry::default();
        let index = registry.add_font("Test Sans", "", data).unwrap();
        let operand = registry.encode_text(index, 10.0, "ABA").unwrap();
        assert_eq!(operand, "<000100020001>");
        let Some(RegisteredFont::TrueType(font)) = registry.get(index) else {
            panic!("expected a TrueType font");
        };
        assert!(!font.is_color());
        assert_eq!(font.subset.code_widths().get(&1), Some(&600));
        assert_eq!(font.subset.code_unicodes().get(&2), Some(&vec![0x42]));
        assert_eq!(font.biggest_size_pt, 10.0);
    }

    #[test]
    fn missing_characters_use_notdef_and_are_recorded_once() {
        let data = FontBuilder::new().glyph('A', 600).build();
        let mut registry = FontRegistry::default();
        let index = registry.add_font("Test", "", data).unwrap();
        registry.encode_text(index, 10.0, "Z").unwrap();
        registry.encode_text(index, 10.0, "ZZ").unwrap();
        let Some(RegisteredFont::TrueType(font)) = registry.get(index) else {
            panic!("expected a TrueType font");
        };
        assert_eq!(font.missing_glyphs, vec!['Z']);
        let (glyph, code) = font.subset.items().next().unwrap();
        assert_eq!((glyph.glyph_id, code), (0, 1));
        assert!(glyph.unicode.is_empty());
        assert_eq!(glyph.name, ".notdef");
    }

    #[test]
    fn widths_scale_to_thousand_units() {
        let data = FontBuilder::new().units_per_em(2048).glyph('A', 1229).build();
        let mut registry = FontRegistry::default();
        let index = registry.add_font("Scaled", "", data).unwrap();
        registry.encode_text(index, 10.0, "A").unwrap();
        let Some(RegisteredFont::TrueType(font)) = registry.get(index) else {
            panic!("expected a TrueType font");
        };
        assert_eq!(font.subset.code_widths().get(&1), Some(&600));
    }

    #[test]
    fn color_options_are_validated() {
        let data = FontBuilder::new()
            .glyph('A', 600)
            .table(*b"fvar", build_fvar(&[(*b"wght", 100.0, 400.0, 900.0)]))
            .build();
        let mut registry = FontRegistry::default();
        let index = registry.add_font("Var", "", data).unwrap();
        registry.set_palette(index, 2).unwrap();
        registry.set_variation(index, "wght", 500.0).unwrap();
        registry.set_variation(index, "wght", 700.0).unwrap();
        let Some(RegisteredFont::TrueType(font)) = registry.get(index) else {
            panic!("expected a TrueType font");
        };
        assert_eq!(font.palette, 2);
        assert_eq!(font.variations, vec![(*b"wght", 700.0)]);

        let err = registry.set_variation(index, "wdth", 75.0).unwrap_err();
        assert!(matches!(err, PdfError::InvalidConfiguration(_)));
        let err = registry.set_variation(index, "weight", 75.0).unwrap_err();
        assert!(matches!(err, PdfError::InvalidConfiguration(_)));
        let core = registry.add_core("helvetica", "").unwrap();
        assert!(matches!(
            registry.set_palette(core, 1),
            Err(PdfError::InvalidConfiguration(_))
        ));
        assert!(matches!(registry.set_palette(42, 1), Err(PdfError::FontLookup(_))));
    }

    #[test]
    fn garbage_font_data_is_a_font_error() {
        let mut registry = FontRegistry::default();
        let err = registry.add_font("Broken", "", vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, PdfError::Font(_)));
    }
}
