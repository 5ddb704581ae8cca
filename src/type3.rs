//! Type3 fonts whose glyph programs draw color glyphs.
//!
//! A color font is drawn through exactly one technology, picked from the
//! tables it carries. Each technology is a [`GlyphSource`]; the driver walks
//! the used glyphs, renders each one to a content stream and finally emits
//! the font dictionary around them.

use std::collections::{BTreeMap, HashSet};

use ttf_parser::GlyphId;

use crate::bitmap::{BitmapKind, BitmapStrikes};
use crate::cmap::to_unicode_cmap;
use crate::colr::ColrTable;
use crate::cpal::{Palette, Palettes};
use crate::debug::DebugLogger;
use crate::draw::{self, DrawNode, Fill};
use crate::embed::{SUBSET_PREFIX, log_missing_glyphs};
use crate::error::{PdfError, Result};
use crate::font::{SubsetGlyph, TtfFont};
use crate::images::ImageCache;
use crate::object::{Dict, ObjId, ObjectGraph, PdfObject, Value};
use crate::paint::PaintContext;
use crate::resources::{ResourceCatalog, ResourceRefs, UsageSet};
use crate::sbix::SbixStrike;
use crate::subset::find_table;
use crate::svg::{SvgDocuments, compile_glyph};
use crate::types::{Matrix, Rect, Rgba, TextColor};
use crate::varstore::normalize_location;

/// Highest character code a 1-byte Type3 encoding can address.
const MAX_TYPE3_CODE: u32 = 255;

/// Code points drawn as empty glyphs.
const WHITESPACE: &[u32] = &[
    0x0009, 0x000A, 0x000C, 0x000D, 0x0020, 0x00A0, 0x1680, 0x2000, 0x2001, 0x2002, 0x2003,
    0x2004, 0x2005, 0x2006, 0x2007, 0x2008, 0x2009, 0x200A, 0x202F, 0x205F, 0x3000,
];

/// Color glyph technologies, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColorKind {
    Cbdt,
    Ebdt,
    Colr,
    Svg,
    Sbix,
}

/// Picks the color technology of a font from its table directory. Gray
/// `EBDT` strikes only count when the font has no outlines of its own.
pub(crate) fn detect_color_kind(data: &[u8], has_outlines: bool) -> Option<ColorKind> {
    let has = |tag: &[u8; 4]| find_table(data, tag).is_some();
    if has(b"CBDT") && has(b"CBLC") {
        Some(ColorKind::Cbdt)
    } else if has(b"EBDT") && has(b"EBLC") && !has_outlines {
        Some(ColorKind::Ebdt)
    } else if has(b"COLR") {
        Some(ColorKind::Colr)
    } else if has(b"SVG ") {
        Some(ColorKind::Svg)
    } else if has(b"sbix") {
        Some(ColorKind::Sbix)
    } else {
        None
    }
}

/// One color technology's view of a font's glyphs, in font units.
pub(crate) trait GlyphSource {
    fn glyph_exists(&self, gid: u16) -> bool;
    fn load_glyph(&self, gid: u16, images: &mut ImageCache) -> Result<Vec<DrawNode>>;
}

struct ColrSource<'a> {
    paint: PaintContext<'a>,
    color: Rgba,
}

impl GlyphSource for ColrSource<'_> {
    /// Plain outline glyphs of a COLR font count too; they draw in the text color.
    fn glyph_exists(&self, gid: u16) -> bool {
        self.paint.table.has_glyph(gid) || self.paint.outlines.outline(gid).is_some()
    }

    fn load_glyph(&self, gid: u16, _images: &mut ImageCache) -> Result<Vec<DrawNode>> {
        if self.paint.table.has_glyph(gid) {
            return self.paint.render_glyph(gid);
        }
        Ok(self
            .paint
            .outlines
            .outline(gid)
            .map(|path| DrawNode::Fill {
                path,
                fill: Fill::Solid(self.color),
            })
            .into_iter()
            .collect())
    }
}

struct BitmapSource<'a> {
    strikes: BitmapStrikes<'a>,
    color: Rgba,
}

impl GlyphSource for BitmapSource<'_> {
    fn glyph_exists(&self, gid: u16) -> bool {
        self.strikes.glyph_exists(gid)
    }

    fn load_glyph(&self, gid: u16, images: &mut ImageCache) -> Result<Vec<DrawNode>> {
        self.strikes.load_glyph(gid, images, self.color)
    }
}

struct SbixSource<'a> {
    strike: SbixStrike<'a>,
    face: &'a ttf_parser::Face<'a>,
}

impl GlyphSource for SbixSource<'_> {
    fn glyph_exists(&self, gid: u16) -> bool {
        self.strike.glyph_exists(gid)
    }

    fn load_glyph(&self, gid: u16, images: &mut ImageCache) -> Result<Vec<DrawNode>> {
        let outline_box = self
            .face
            .glyph_bounding_box(GlyphId(gid))
            .map(|r| Rect::new(r.x_min as f32, r.y_min as f32, r.x_max as f32, r.y_max as f32));
        self.strike.load_glyph(gid, outline_box, images)
    }
}

struct SvgSource<'a> {
    documents: SvgDocuments<'a>,
    color: Rgba,
}

impl GlyphSource for SvgSource<'_> {
    fn glyph_exists(&self, gid: u16) -> bool {
        self.documents.glyph_exists(gid)
    }

    fn load_glyph(&self, gid: u16, _images: &mut ImageCache) -> Result<Vec<DrawNode>> {
        match self.documents.document(gid)? {
            Some(document) => compile_glyph(&document, gid, self.color),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Type3Glyph {
    pub(crate) code: u32,
    /// Key in `/CharProcs` and `/Differences`.
    pub(crate) name: String,
    pub(crate) width: i64,
    pub(crate) program: String,
    pub(crate) unicode: Vec<u32>,
}

/// Glyph programs of one color font, ready to be emitted.
#[derive(Debug, Clone)]
pub(crate) struct Type3Font {
    pub(crate) name: String,
    pub(crate) bbox: [i32; 4],
    /// Sorted by code.
    pub(crate) glyphs: Vec<Type3Glyph>,
    /// Images, graphics states and patterns the glyph programs invoke.
    pub(crate) usage: UsageSet,
    pub(crate) transparency: bool,
}

/// Renders every used glyph of a color font. Resources the programs need
/// are registered in `catalog` so they are emitted with the document's own.
pub(crate) fn render_type3(
    font: &TtfFont,
    catalog: &mut ResourceCatalog,
    text_color: TextColor,
    debug: Option<&DebugLogger>,
) -> Result<Type3Font> {
    let highest = font.subset.highest_code();
    if highest > MAX_TYPE3_CODE {
        return Err(PdfError::structural(format!(
            "color font {} uses {highest} glyphs but a Type3 font holds at most {MAX_TYPE3_CODE}",
            font.name
        )));
    }
    let Some(kind) = font.color else {
        return Err(PdfError::font(format!("font {} has no color glyphs", font.name)));
    };
    log_missing_glyphs(font, debug);

    let face = font.face()?;
    let data: &[u8] = &font.data;
    let upem = font.units_per_em;
    let global = face.global_bounding_box();
    let font_box = Rect::new(
        global.x_min as f32,
        global.y_min as f32,
        global.x_max as f32,
        global.y_max as f32,
    );
    let (r, g, b) = text_color.to_rgb();
    let color = Rgba::new(r, g, b, 1.0);
    let target_ppem = (font.biggest_size_pt.ceil() as u16).max(1);
    let missing = |tag: &str| PdfError::font(format!("font {} lost its {tag} table", font.name));

    let mut compiler = Compiler {
        font,
        catalog,
        usage: UsageSet::default(),
        transparency: false,
        debug,
    };
    let glyphs = match kind {
        ColorKind::Cbdt | ColorKind::Ebdt => {
            let bitmap_kind = if kind == ColorKind::Cbdt {
                BitmapKind::Color
            } else {
                BitmapKind::Gray
            };
            let strikes = BitmapStrikes::load(data, bitmap_kind, target_ppem, upem, font_box)?
                .ok_or_else(|| PdfError::font(format!("font {} has no bitmap strikes", font.name)))?;
            compiler.compile(&BitmapSource { strikes, color })?
        }
        ColorKind::Colr => {
            let coords = match find_table(data, b"fvar") {
                Some(fvar) if !font.variations.is_empty() => {
                    normalize_location(fvar, find_table(data, b"avar"), &font.variations)?
                }
                _ => Vec::new(),
            };
            let table = ColrTable::parse(find_table(data, b"COLR").ok_or_else(|| missing("COLR"))?, coords)?;
            let palettes = match find_table(data, b"CPAL") {
                Some(cpal) => Palettes::parse(cpal)?,
                None => Palettes::default(),
            };
            let palette = if palettes.len() > 0 {
                palettes.select(font.palette, debug)
            } else {
                Palette::default()
            };
            let source = ColrSource {
                paint: PaintContext {
                    table: &table,
                    outlines: &face,
                    palette: &palette,
                    text_color,
                    surface: font_box,
                    debug,
                },
                color,
            };
            compiler.compile(&source)?
        }
        ColorKind::Svg => {
            let documents = SvgDocuments::parse(find_table(data, b"SVG ").ok_or_else(|| missing("SVG"))?)?;
            compiler.compile(&SvgSource { documents, color })?
        }
        ColorKind::Sbix => {
            let table = find_table(data, b"sbix").ok_or_else(|| missing("sbix"))?;
            let strike = SbixStrike::load(table, face.number_of_glyphs(), target_ppem, upem)?
                .ok_or_else(|| PdfError::font(format!("font {} has no sbix strikes", font.name)))?;
            compiler.compile(&SbixSource {
                strike,
                face: &face,
            })?
        }
    };
    Ok(Type3Font {
        name: font.name.clone(),
        bbox: font.metrics.bbox,
        glyphs,
        usage: compiler.usage,
        transparency: compiler.transparency,
    })
}

struct Compiler<'a> {
    font: &'a TtfFont,
    catalog: &'a mut ResourceCatalog,
    usage: UsageSet,
    transparency: bool,
    debug: Option<&'a DebugLogger>,
}

impl Compiler<'_> {
    fn compile(&mut self, source: &dyn GlyphSource) -> Result<Vec<Type3Glyph>> {
        let scale = self.font.scale();
        let base = Matrix::scale(scale, scale);
        let mut names = HashSet::new();
        let mut glyphs = Vec::with_capacity(self.font.subset.len());
        for (glyph, code) in self.font.subset.items() {
            let nodes = self.load(source, glyph)?;
            let content = if nodes.is_empty() {
                String::new()
            } else {
                let rendered = draw::render(&nodes, base, self.catalog, &mut self.usage, self.debug);
                self.transparency |= rendered.transparency;
                rendered.content
            };
            let width = glyph.width.max(0);
            let name = if glyph.name.is_empty() || names.contains(&glyph.name) {
                format!("g{}", glyph.glyph_id)
            } else {
                glyph.name.clone()
            };
            names.insert(name.clone());
            glyphs.push(Type3Glyph {
                code,
                name,
                width,
                program: glyph_program(width, &content),
                unicode: glyph.unicode.clone(),
            });
        }
        glyphs.sort_by_key(|glyph| glyph.code);
        Ok(glyphs)
    }

    fn load(&mut self, source: &dyn GlyphSource, glyph: &SubsetGlyph) -> Result<Vec<DrawNode>> {
        if is_whitespace(glyph) {
            return Ok(Vec::new());
        }
        if source.glyph_exists(glyph.glyph_id) {
            return source.load_glyph(glyph.glyph_id, &mut self.catalog.images);
        }
        if let Some(debug) = self.debug {
            debug.event(
                "type3.notdef_fallback",
                &[
                    ("font", self.font.name.clone()),
                    ("glyph", glyph.name.clone()),
                ],
            );
        }
        if glyph.glyph_id != 0 && source.glyph_exists(0) {
            return source.load_glyph(0, &mut self.catalog.images);
        }
        Ok(Vec::new())
    }
}

fn is_whitespace(glyph: &SubsetGlyph) -> bool {
    matches!(glyph.name.as_str(), "space" | "uni00A0")
        || matches!(glyph.unicode.as_slice(), [cp] if WHITESPACE.contains(cp))
}

fn glyph_program(width: i64, content: &str) -> String {
    let content = content.trim_end();
    if content.is_empty() {
        format!("{width} 0 d0")
    } else {
        format!("{width} 0 d0\nq\n{content}\nQ")
    }
}

/// Emits the glyph streams, the ToUnicode map and the Type3 font
/// dictionary, in that order. Returns the font dictionary's id.
pub(crate) fn embed_type3(
    graph: &mut ObjectGraph,
    font: &Type3Font,
    catalog: &ResourceCatalog,
    refs: &ResourceRefs,
    compress: bool,
) -> Result<ObjId> {
    let mut char_procs = Dict::new();
    for glyph in &font.glyphs {
        let id = graph.add(
            PdfObject::content(Dict::new(), glyph.program.as_bytes(), compress)?,
            Some("fonts"),
        )?;
        char_procs.set(&glyph.name, id);
    }

    let unicodes: BTreeMap<u32, Vec<u32>> = font
        .glyphs
        .iter()
        .map(|glyph| (glyph.code, glyph.unicode.clone()))
        .collect();
    let to_unicode = graph.add(
        PdfObject::content(Dict::new(), to_unicode_cmap(&unicodes, 1).as_bytes(), compress)?,
        Some("fonts"),
    )?;

    let first = font.glyphs.first().map(|glyph| glyph.code).unwrap_or(0);
    let last = font.glyphs.last().map(|glyph| glyph.code).unwrap_or(0);
    let mut widths = vec![0i64; (last - first) as usize + 1];
    let mut differences = Vec::with_capacity(font.glyphs.len() + 1);
    let mut previous = None;
    for glyph in &font.glyphs {
        widths[(glyph.code - first) as usize] = glyph.width;
        if previous.map(|code| code + 1) != Some(glyph.code) {
            differences.push(Value::Int(glyph.code as i64));
        }
        differences.push(Value::name(glyph.name.as_str()));
        previous = Some(glyph.code);
    }

    let dict = Dict::typed("Font")
        .with("Subtype", Value::name("Type3"))
        .with("Name", Value::name(format!("{SUBSET_PREFIX}{}", font.name)))
        .with(
            "FontBBox",
            Value::Array(font.bbox.iter().map(|v| Value::Int(*v as i64)).collect()),
        )
        .with("FontMatrix", Value::raw("[0.001 0 0 0.001 0 0]"))
        .with("FirstChar", Value::Int(first as i64))
        .with("LastChar", Value::Int(last as i64))
        .with("CharProcs", char_procs)
        .with(
            "Encoding",
            Dict::typed("Encoding").with("Differences", Value::Array(differences)),
        )
        .with("Widths", Value::Array(widths.into_iter().map(Value::Int).collect()))
        .with("Resources", catalog.resource_dict(&font.usage, refs, false)?)
        .with("ToUnicode", to_unicode);
    graph.add(PdfObject::dict(dict), Some("fonts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colr::build::{colr_v0, colr_v1_with_store, glyph, var_solid};
    use crate::cpal::build_cpal;
    use crate::fixtures::FontBuilder;
    use crate::font::RegisteredFont;
    use crate::svg::build_svg_table;
    use crate::varstore::{build_fvar, build_store};

    fn color_font(catalog: &mut ResourceCatalog, data: Vec<u8>, text: &str) -> TtfFont {
        let fonts = catalog.fonts_mut();
        let index = fonts.add_font("Emoji", "", data).unwrap();
        fonts.encode_text(index, 12.0, text).unwrap();
        match fonts.get(index).cloned() {
            Some(RegisteredFont::TrueType(font)) => *font,
            other => panic!("expected a TrueType font, got {other:?}"),
        }
    }

    fn colr_font() -> Vec<u8> {
        FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .empty_glyph(' ', 250)
            .table(*b"COLR", colr_v0(&[(1, vec![(2, 0)])]))
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 255]]]))
            .build()
    }

    #[test]
    fn detection_follows_table_priority() {
        let both = FontBuilder::new()
            .table(*b"COLR", colr_v0(&[]))
            .table(*b"SVG ", build_svg_table(&[]))
            .build();
        assert_eq!(detect_color_kind(&both, true), Some(ColorKind::Colr));
        let gray = FontBuilder::new()
            .table(*b"EBLC", vec![0; 8])
            .table(*b"EBDT", vec![0; 4])
            .build();
        assert_eq!(detect_color_kind(&gray, true), None);
        assert_eq!(detect_color_kind(&gray, false), Some(ColorKind::Ebdt));
        assert_eq!(detect_color_kind(&FontBuilder::new().build(), true), None);
    }

    #[test]
    fn colr_glyphs_whitespace_and_plain_outlines() {
        let mut catalog = ResourceCatalog::new(true);
        let font = color_font(&mut catalog, colr_font(), "A B");
        assert!(font.is_color());
        let type3 = render_type3(&font, &mut catalog, TextColor::Gray(0.5), None).unwrap();
        assert_eq!(type3.glyphs.len(), 3);
        let [a, space, b] = type3.glyphs.as_slice() else {
            panic!("expected three glyphs");
        };
        assert_eq!((a.code, a.name.as_str()), (1, "uni0041"));
        assert!(a.program.starts_with("600 0 d0\nq\n"));
        assert!(a.program.contains("0 0 1 rg\n"));
        assert!(a.program.ends_with("\nQ"));
        assert_eq!(space.program, "250 0 d0");
        assert!(b.program.contains("0.5 0.5 0.5 rg\n"));
        assert!(!type3.transparency);
    }

    fn configured_font(
        catalog: &mut ResourceCatalog,
        data: Vec<u8>,
        configure: impl FnOnce(&mut crate::font::FontRegistry, usize),
    ) -> TtfFont {
        let fonts = catalog.fonts_mut();
        let index = fonts.add_font("Emoji", "", data).unwrap();
        configure(fonts, index);
        fonts.encode_text(index, 12.0, "A").unwrap();
        match fonts.get(index).cloned() {
            Some(RegisteredFont::TrueType(font)) => *font,
            other => panic!("expected a TrueType font, got {other:?}"),
        }
    }

    #[test]
    fn chosen_palette_colors_reach_the_glyph_program() {
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(*b"COLR", colr_v0(&[(1, vec![(2, 0)])]))
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 255]], &[[0, 255, 0, 255]]]))
            .build();

        let mut catalog = ResourceCatalog::new(true);
        let font = configured_font(&mut catalog, data.clone(), |fonts, index| {
            fonts.set_palette(index, 1).unwrap()
        });
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), None).unwrap();
        assert!(type3.glyphs[0].program.contains("0 1 0 rg\n"));

        let mut catalog = ResourceCatalog::new(true);
        let font = configured_font(&mut catalog, data, |fonts, index| {
            fonts.set_palette(index, 5).unwrap()
        });
        let debug = DebugLogger::in_memory();
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), Some(&debug)).unwrap();
        assert!(type3.glyphs[0].program.contains("0 0 1 rg\n"));
        assert_eq!(debug.count("colr.palette_out_of_range"), 1);
    }

    #[test]
    fn requested_instance_drives_variable_paints() {
        let store = build_store(&[(0.0, 1.0, 1.0)], &[&[-8192]]);
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(
                *b"COLR",
                colr_v1_with_store(&[(1, glyph(2, var_solid(0, 1.0, 0)))], &[], &[], &store),
            )
            .table(*b"CPAL", build_cpal(&[&[[0, 0, 255, 255]]]))
            .table(*b"fvar", build_fvar(&[(*b"wght", 100.0, 400.0, 900.0)]))
            .build();

        let mut catalog = ResourceCatalog::new(true);
        let font = configured_font(&mut catalog, data.clone(), |_, _| {});
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), None).unwrap();
        assert!(!type3.transparency);
        assert!(!type3.glyphs[0].program.contains(" gs\n"));

        let mut catalog = ResourceCatalog::new(true);
        let font = configured_font(&mut catalog, data, |fonts, index| {
            fonts.set_variation(index, "wght", 900.0).unwrap()
        });
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), None).unwrap();
        assert!(type3.transparency);
        assert!(type3.glyphs[0].program.contains("/GS0 gs\n0 0 1 rg\n"));
        let (_, style) = catalog.graphics_styles().next().unwrap();
        assert_eq!(style.fill_alpha, Some(0.5));
    }

    #[test]
    fn only_listed_spaces_are_skipped() {
        let glyph = |cp: u32, name: &str| SubsetGlyph {
            glyph_id: 3,
            unicode: vec![cp],
            name: name.to_string(),
            width: 500,
        };
        assert!(is_whitespace(&glyph(0x3000, "uni3000")));
        assert!(is_whitespace(&glyph(0x0041, "space")));
        assert!(!is_whitespace(&glyph(0x2028, "uni2028")));
        assert!(!is_whitespace(&glyph(0x0085, "uni0085")));
        assert!(!is_whitespace(&SubsetGlyph {
            unicode: Vec::new(),
            ..glyph(0, "g3")
        }));
    }

    #[test]
    fn missing_svg_glyphs_fall_back_to_notdef() {
        let doc = br##"<svg><path id="glyph1" d="M0 0 H100 V100 Z" fill="#00ff00"/></svg>"##;
        let data = FontBuilder::new()
            .glyph('A', 600)
            .glyph('B', 600)
            .table(*b"SVG ", build_svg_table(&[(1, 1, doc.to_vec())]))
            .build();
        let mut catalog = ResourceCatalog::new(true);
        let font = color_font(&mut catalog, data, "AB");
        let debug = DebugLogger::in_memory();
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), Some(&debug)).unwrap();
        assert!(type3.glyphs[0].program.contains("0 1 0 rg\n"));
        assert_eq!(type3.glyphs[1].program, "600 0 d0");
        assert_eq!(debug.count("type3.notdef_fallback"), 1);
    }

    #[test]
    fn more_than_255_codes_are_rejected() {
        let mut builder = FontBuilder::new();
        let mut text = String::new();
        for offset in 0..256u32 {
            let ch = char::from_u32(0x4E00 + offset).unwrap();
            builder = builder.glyph(ch, 500);
            text.push(ch);
        }
        let data = builder.table(*b"COLR", colr_v0(&[(1, vec![(1, 0)])])).build();
        let mut catalog = ResourceCatalog::new(true);
        let font = color_font(&mut catalog, data, &text);
        let err = render_type3(&font, &mut catalog, TextColor::default(), None).unwrap_err();
        assert!(matches!(err, PdfError::Structural(_)));
    }

    #[test]
    fn font_dictionary_lists_procs_widths_and_differences() {
        let mut catalog = ResourceCatalog::new(true);
        let font = color_font(&mut catalog, colr_font(), "A B");
        let type3 = render_type3(&font, &mut catalog, TextColor::default(), None).unwrap();
        let mut graph = ObjectGraph::new();
        let id = embed_type3(&mut graph, &type3, &catalog, &ResourceRefs::default(), false).unwrap();
        assert_eq!(id.get(), 5);
        let (_, object, _) = graph.iter().last().unwrap();
        let dict = &object.dict;
        assert_eq!(dict.get("Subtype"), Some(&Value::name("Type3")));
        assert_eq!(dict.get("Name"), Some(&Value::name("MPDFAA+Emoji")));
        assert_eq!(dict.get("FirstChar"), Some(&Value::Int(1)));
        assert_eq!(dict.get("LastChar"), Some(&Value::Int(3)));
        assert_eq!(
            dict.get("Widths"),
            Some(&Value::Array(vec![Value::Int(600), Value::Int(250), Value::Int(600)]))
        );
        let Some(Value::Dict(encoding)) = dict.get("Encoding") else {
            panic!("missing encoding");
        };
        assert_eq!(
            encoding.get("Differences"),
            Some(&Value::Array(vec![
                Value::Int(1),
                Value::name("uni0041"),
                Value::name("uni0020"),
                Value::name("uni0042"),
            ]))
        );
        let Some(Value::Dict(procs)) = dict.get("CharProcs") else {
            panic!("missing char procs");
        };
        assert_eq!(procs.len(), 3);
    }
}
