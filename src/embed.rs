//! Font dictionaries for standard fonts and composite (CID) fonts.

use std::collections::{BTreeMap, BTreeSet};

use crate::cmap::{Ros, cid_encoding_cmap, cmap_name, to_unicode_cmap};
use crate::debug::DebugLogger;
use crate::error::{PdfError, Result};
use crate::font::{CoreFont, OutlineFormat, RegisteredFont, TtfFont};
use crate::object::{Dict, ObjId, ObjectGraph, PdfObject, Value, flate_compress};
use crate::subset::{find_table, subset_truetype};
use crate::widths::compress_widths;

pub(crate) const SUBSET_PREFIX: &str = "MPDFAA+";

const CID_TO_GID_ENTRIES: usize = 0x1_0000;
const MISSING_GLYPHS_SHOWN: usize = 10;

/// Emits the objects of a standard or outline font and returns the id of
/// the font dictionary. Color fonts go through the Type3 path instead.
pub(crate) fn embed_font(
    graph: &mut ObjectGraph,
    font: &RegisteredFont,
    compress: bool,
    debug: Option<&DebugLogger>,
) -> Result<ObjId> {
    match font {
        RegisteredFont::Core(core) => embed_core(graph, core),
        RegisteredFont::TrueType(ttf) => embed_composite(graph, ttf, compress, debug),
    }
}

fn embed_core(graph: &mut ObjectGraph, font: &CoreFont) -> Result<ObjId> {
    let mut dict = Dict::typed("Font")
        .with("Subtype", Value::name("Type1"))
        .with("BaseFont", Value::name(font.name));
    if !matches!(font.name, "Symbol" | "ZapfDingbats") {
        dict.set("Encoding", Value::name("WinAnsiEncoding"));
    }
    graph.add(PdfObject::dict(dict), Some("fonts"))
}

pub(crate) fn log_missing_glyphs(font: &TtfFont, debug: Option<&DebugLogger>) {
    let (Some(debug), false) = (debug, font.missing_glyphs.is_empty()) else {
        return;
    };
    let mut shown: Vec<String> = font
        .missing_glyphs
        .iter()
        .take(MISSING_GLYPHS_SHOWN)
        .map(|ch| format!("{ch:?} (U+{:04X})", *ch as u32))
        .collect();
    if font.missing_glyphs.len() > MISSING_GLYPHS_SHOWN {
        shown.push(format!(
            "... (and {} others)",
            font.missing_glyphs.len() - MISSING_GLYPHS_SHOWN
        ));
    }
    debug.event(
        "font.missing_glyphs",
        &[
            ("font", font.name.clone()),
            ("glyphs", shown.join(", ")),
        ],
    );
}

struct CidEntry {
    code: u32,
    cid: u32,
    glyph_id: u16,
    width: i64,
    unicode: Vec<u32>,
}

fn cid_entries(font: &TtfFont, debug: Option<&DebugLogger>) -> Vec<CidEntry> {
    let mut entries = Vec::with_capacity(font.subset.len());
    for (glyph, code) in font.subset.items() {
        let cid = match &font.outlines {
            OutlineFormat::Cff(info) => info.cid_for_gid(glyph.glyph_id),
            _ => code,
        };
        if cid > 0xFFFF || code > 0xFFFF {
            if let Some(debug) = debug {
                debug.event(
                    "font.cid_overflow",
                    &[
                        ("font", font.name.clone()),
                        ("cid", cid.to_string()),
                        ("glyph", glyph.name.clone()),
                    ],
                );
            }
            continue;
        }
        entries.push(CidEntry {
            code,
            cid,
            glyph_id: glyph.glyph_id,
            width: glyph.width,
            unicode: glyph.unicode.clone(),
        });
    }
    entries
}

fn system_info(ros: &Ros) -> Dict {
    Dict::new()
        .with("Registry", Value::Literal(ros.registry.clone()))
        .with("Ordering", Value::Literal(ros.ordering.clone()))
        .with("Supplement", Value::Int(ros.supplement))
}

fn descriptor(font: &TtfFont, base_font: &str) -> Dict {
    let metrics = &font.metrics;
    let [x_min, y_min, x_max, y_max] = metrics.bbox;
    Dict::typed("FontDescriptor")
        .with("FontName", Value::name(base_font))
        .with("Flags", Value::Int(metrics.flags as i64))
        .with(
            "FontBBox",
            Value::Array(
                [x_min, y_min, x_max, y_max]
                    .iter()
                    .map(|v| Value::Int(*v as i64))
                    .collect(),
            ),
        )
        .with("ItalicAngle", Value::Int(metrics.italic_angle as i64))
        .with("Ascent", Value::Int(metrics.ascent as i64))
        .with("Descent", Value::Int(metrics.descent as i64))
        .with("CapHeight", Value::Int(metrics.cap_height as i64))
        .with("StemV", Value::Int(metrics.stem_v as i64))
        .with("MissingWidth", Value::Int(metrics.missing_width))
}

/// Gids kept by the subsetter besides the used ones: null, CR and space.
fn recommended_glyphs(font: &TtfFont) -> Result<BTreeSet<u16>> {
    let face = font.face()?;
    Ok(['\0', '\r', ' ']
        .iter()
        .filter_map(|ch| face.glyph_index(*ch).map(|gid| gid.0))
        .collect())
}

fn embed_composite(
    graph: &mut ObjectGraph,
    font: &TtfFont,
    compress: bool,
    debug: Option<&DebugLogger>,
) -> Result<ObjId> {
    log_missing_glyphs(font, debug);
    let base_font = format!("{SUBSET_PREFIX}{}", font.name);
    let entries = cid_entries(font, debug);
    let cff = match &font.outlines {
        OutlineFormat::Cff(info) => Some(info),
        OutlineFormat::TrueType => None,
        OutlineFormat::None => {
            return Err(PdfError::font(format!(
                "font {} has no outlines to embed",
                font.name
            )));
        }
    };

    let type0 = graph.add(
        PdfObject::dict(
            Dict::typed("Font")
                .with("Subtype", Value::name("Type0"))
                .with("BaseFont", Value::name(base_font.as_str())),
        ),
        Some("fonts"),
    )?;

    let cid_widths: BTreeMap<u32, i64> = entries.iter().map(|e| (e.cid, e.width)).collect();
    let mut cid_font = Dict::typed("Font")
        .with(
            "Subtype",
            Value::name(if cff.is_some() {
                "CIDFontType0"
            } else {
                "CIDFontType2"
            }),
        )
        .with("BaseFont", Value::name(base_font.as_str()))
        .with("DW", Value::Int(font.metrics.missing_width));
    if !cid_widths.is_empty() {
        cid_font.set("W", Value::raw(compress_widths(&cid_widths)));
    }
    let cid_font = graph.add(PdfObject::dict(cid_font), Some("fonts"))?;

    let unicodes: BTreeMap<u32, Vec<u32>> = entries
        .iter()
        .map(|e| (e.code, e.unicode.clone()))
        .collect();
    let to_unicode = graph.add(
        PdfObject::content(Dict::new(), to_unicode_cmap(&unicodes, 2).as_bytes(), compress)?,
        Some("fonts"),
    )?;

    let ros = cff
        .and_then(|info| info.ros.clone())
        .unwrap_or_else(|| Ros {
            registry: "Adobe".to_string(),
            ordering: "UCS".to_string(),
            supplement: 0,
        });
    let encoding = match cff {
        Some(_) => {
            let code_to_cid: BTreeMap<u32, u32> = entries.iter().map(|e| (e.code, e.cid)).collect();
            let dict = Dict::typed("CMap")
                .with("CMapName", Value::name(cmap_name(&ros)))
                .with("CIDSystemInfo", system_info(&ros));
            let cmap = cid_encoding_cmap(&ros, &code_to_cid);
            Value::Ref(graph.add(PdfObject::content(dict, cmap.as_bytes(), compress)?, Some("fonts"))?)
        }
        None => Value::name("Identity-H"),
    };
    let system_info_id = graph.add(PdfObject::dict(system_info(&ros)), Some("fonts"))?;
    let descriptor_id = graph.add(PdfObject::dict(descriptor(font, &base_font)), Some("fonts"))?;

    let cid_to_gid = match cff {
        Some(_) => None,
        None => {
            let mut map = vec![0u8; CID_TO_GID_ENTRIES * 2];
            for entry in &entries {
                let at = entry.code as usize * 2;
                map[at..at + 2].copy_from_slice(&entry.glyph_id.to_be_bytes());
            }
            Some(graph.add(
                PdfObject::compressed(Dict::new(), flate_compress(&map)?),
                Some("fonts"),
            )?)
        }
    };

    let (file_key, file_id) = match cff {
        None => {
            let mut keep: BTreeSet<u16> = entries.iter().map(|e| e.glyph_id).collect();
            keep.extend(recommended_glyphs(font)?);
            let program = subset_truetype(&font.data, &keep)?;
            let dict = Dict::new().with("Length1", Value::Int(program.len() as i64));
            let id = graph.add(PdfObject::compressed(dict, flate_compress(&program)?), Some("fonts"))?;
            ("FontFile2", id)
        }
        Some(info) if info.cid_keyed => {
            let program = find_table(&font.data, b"CFF ")
                .ok_or_else(|| PdfError::font(format!("font {} lost its CFF table", font.name)))?;
            let dict = Dict::new().with("Subtype", Value::name("CIDFontType0C"));
            let id = graph.add(PdfObject::compressed(dict, flate_compress(program)?), Some("fonts"))?;
            ("FontFile3", id)
        }
        Some(_) => {
            let dict = Dict::new().with("Subtype", Value::name("OpenType"));
            let id = graph.add(
                PdfObject::compressed(dict, flate_compress(&font.data)?),
                Some("fonts"),
            )?;
            ("FontFile3", id)
        }
    };

    graph.dict_mut(descriptor_id)?.set(file_key, file_id);
    let cid_dict = graph.dict_mut(cid_font)?;
    cid_dict.set("CIDSystemInfo", system_info_id);
    cid_dict.set("FontDescriptor", descriptor_id);
    if let Some(map) = cid_to_gid {
        cid_dict.set("CIDToGIDMap", map);
    }
    let type0_dict = graph.dict_mut(type0)?;
    type0_dict.set("Encoding", encoding);
    type0_dict.set("DescendantFonts", Value::refs([cid_font]));
    type0_dict.set("ToUnicode", to_unicode);
    Ok(type0)
}
