//! `COLR` table reader. Version 0 layer lists and version 1 paint graphs
//! are decoded into [`Paint`] values with variation deltas already applied.

use crate::debug::DebugLogger;
use crate::error::{PdfError, Result};
use crate::subset::Reader;
use crate::types::{BlendMode, Matrix, Rect};
use crate::varstore::{DeltaSetIndexMap, ItemVariationStore, NO_VARIATION_INDEX, VariationResolver};

const MAX_PAINT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extend {
    Pad,
    Repeat,
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColorStopRecord {
    pub(crate) offset: f32,
    pub(crate) palette_index: u16,
    pub(crate) alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColorLine {
    pub(crate) extend: Extend,
    pub(crate) stops: Vec<ColorStopRecord>,
}

/// Porter-Duff operators plus the separable and non-separable blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompositeMode {
    Clear,
    Source,
    Destination,
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceAtop,
    DestinationAtop,
    Xor,
    Blend(BlendMode),
}

impl CompositeMode {
    fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => CompositeMode::Clear,
            1 => CompositeMode::Source,
            2 => CompositeMode::Destination,
            3 => CompositeMode::SourceOver,
            4 => CompositeMode::DestinationOver,
            5 => CompositeMode::SourceIn,
            6 => CompositeMode::DestinationIn,
            7 => CompositeMode::SourceOut,
            8 => CompositeMode::DestinationOut,
            9 => CompositeMode::SourceAtop,
            10 => CompositeMode::DestinationAtop,
            11 => CompositeMode::Xor,
            // No additive mode in PDF; screen is the closest lightening blend.
            12 => CompositeMode::Blend(BlendMode::Screen),
            13 => CompositeMode::Blend(BlendMode::Screen),
            14 => CompositeMode::Blend(BlendMode::Overlay),
            15 => CompositeMode::Blend(BlendMode::Darken),
            16 => CompositeMode::Blend(BlendMode::Lighten),
            17 => CompositeMode::Blend(BlendMode::ColorDodge),
            18 => CompositeMode::Blend(BlendMode::ColorBurn),
            19 => CompositeMode::Blend(BlendMode::HardLight),
            20 => CompositeMode::Blend(BlendMode::SoftLight),
            21 => CompositeMode::Blend(BlendMode::Difference),
            22 => CompositeMode::Blend(BlendMode::Exclusion),
            23 => CompositeMode::Blend(BlendMode::Multiply),
            24 => CompositeMode::Blend(BlendMode::Hue),
            25 => CompositeMode::Blend(BlendMode::Saturation),
            26 => CompositeMode::Blend(BlendMode::Color),
            27 => CompositeMode::Blend(BlendMode::Luminosity),
            other => {
                return Err(PdfError::not_implemented(format!(
                    "unknown composite mode {other}"
                )));
            }
        })
    }
}

/// A resolved paint node. Every transform format collapses into `Transform`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Paint {
    Layers(Vec<Paint>),
    Solid {
        palette_index: u16,
        alpha: f32,
    },
    LinearGradient {
        line: ColorLine,
        p0: (f32, f32),
        p1: (f32, f32),
        p2: (f32, f32),
    },
    RadialGradient {
        line: ColorLine,
        c0: (f32, f32),
        r0: f32,
        c1: (f32, f32),
        r1: f32,
    },
    /// Angles in degrees, counter-clockwise.
    SweepGradient {
        line: ColorLine,
        center: (f32, f32),
        start_angle: f32,
        end_angle: f32,
    },
    Glyph {
        glyph_id: u16,
        paint: Box<Paint>,
    },
    ColrGlyph(u16),
    Transform {
        matrix: Matrix,
        paint: Box<Paint>,
    },
    Composite {
        source: Box<Paint>,
        mode: CompositeMode,
        backdrop: Box<Paint>,
    },
}

/// What a color glyph is made of.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorGlyph {
    /// Version 0: `(outline glyph, palette index)` painted back to front.
    Layers(Vec<(u16, u16)>),
    Paint(Paint),
}

#[derive(Debug, Clone)]
struct ClipRecord {
    start: u16,
    end: u16,
    offset: usize,
}

pub(crate) struct ColrTable<'a> {
    data: &'a [u8],
    base_records: Vec<(u16, usize, usize)>,
    layer_records: Vec<(u16, u16)>,
    base_paints: Vec<(u16, usize)>,
    layer_paints: Vec<usize>,
    clip_list: usize,
    clips: Vec<ClipRecord>,
    resolver: Option<VariationResolver>,
}

impl<'a> ColrTable<'a> {
    /// Parses the table, evaluating variations at normalized `coords`.
    pub(crate) fn parse(data: &'a [u8], coords: Vec<f32>) -> Result<Self> {
        let mut reader = Reader::new(data);
        let version = reader.u16()?;
        let base_count = reader.u16()? as usize;
        let base_offset = reader.u32()? as usize;
        let layer_offset = reader.u32()? as usize;
        let layer_count = reader.u16()? as usize;

        let mut base_records = Vec::with_capacity(base_count);
        let mut records = Reader::at(data, base_offset);
        for _ in 0..base_count {
            let gid = records.u16()?;
            let first = records.u16()? as usize;
            let count = records.u16()? as usize;
            base_records.push((gid, first, count));
        }
        let mut layer_records = Vec::with_capacity(layer_count);
        let mut layers = Reader::at(data, layer_offset);
        for _ in 0..layer_count {
            layer_records.push((layers.u16()?, layers.u16()?));
        }

        let mut table = Self {
            data,
            base_records,
            layer_records,
            base_paints: Vec::new(),
            layer_paints: Vec::new(),
            clip_list: 0,
            clips: Vec::new(),
            resolver: None,
        };
        if version == 0 {
            return Ok(table);
        }

        let base_list = reader.u32()? as usize;
        let layer_list = reader.u32()? as usize;
        let clip_list = reader.u32()? as usize;
        let index_map = reader.u32()? as usize;
        let var_store = reader.u32()? as usize;

        if base_list != 0 {
            let mut list = Reader::at(data, base_list);
            let count = list.u32()? as usize;
            for _ in 0..count {
                let gid = list.u16()?;
                let offset = list.u32()? as usize;
                table.base_paints.push((gid, base_list + offset));
            }
        }
        if layer_list != 0 {
            let mut list = Reader::at(data, layer_list);
            let count = list.u32()? as usize;
            for _ in 0..count {
                table.layer_paints.push(layer_list + list.u32()? as usize);
            }
        }
        if clip_list != 0 {
            let mut list = Reader::at(data, clip_list);
            let _format = list.u8()?;
            let count = list.u32()? as usize;
            for _ in 0..count {
                table.clips.push(ClipRecord {
                    start: list.u16()?,
                    end: list.u16()?,
                    offset: list.u24()? as usize,
                });
            }
            table.clip_list = clip_list;
        }
        if var_store != 0 {
            let store = ItemVariationStore::parse(&data[var_store.min(data.len())..])?;
            let map = if index_map != 0 {
                Some(DeltaSetIndexMap::parse(&data[index_map.min(data.len())..])?)
            } else {
                None
            };
            table.resolver = Some(VariationResolver::new(store, map, coords));
        }
        Ok(table)
    }

    pub(crate) fn has_glyph(&self, gid: u16) -> bool {
        self.base_paints.iter().any(|(g, _)| *g == gid)
            || self.base_records.iter().any(|(g, _, _)| *g == gid)
    }

    /// Version 1 paints win over version 0 layers for the same glyph.
    pub(crate) fn glyph(&self, gid: u16) -> Result<Option<ColorGlyph>> {
        if let Some((_, offset)) = self.base_paints.iter().find(|(g, _)| *g == gid) {
            return Ok(Some(ColorGlyph::Paint(self.paint_at(*offset, 0)?)));
        }
        let Some((_, first, count)) = self.base_records.iter().find(|(g, _, _)| *g == gid) else {
            return Ok(None);
        };
        let layers = self
            .layer_records
            .iter()
            .skip(*first)
            .take(*count)
            .copied()
            .collect();
        Ok(Some(ColorGlyph::Layers(layers)))
    }

    /// The glyph's clip box from the `ClipList`, if any.
    pub(crate) fn clip_box(&self, gid: u16, debug: Option<&DebugLogger>) -> Result<Option<Rect>> {
        let Some(clip) = self
            .clips
            .iter()
            .find(|clip| clip.start <= gid && gid <= clip.end)
        else {
            return Ok(None);
        };
        let mut reader = Reader::at(self.data, self.clip_list + clip.offset);
        let format = reader.u8()?;
        if format != 1 && format != 2 {
            if let Some(debug) = debug {
                debug.event(
                    "colr.clip_box_unknown",
                    &[("glyph", gid.to_string()), ("format", format.to_string())],
                );
            }
            return Ok(None);
        }
        let mut values = [0f32; 4];
        for value in values.iter_mut() {
            *value = reader.i16()? as f32;
        }
        if format == 2 {
            let base = reader.u32()?;
            for (field, value) in values.iter_mut().enumerate() {
                *value += self.delta(base, field as u32);
            }
        }
        Ok(Some(Rect::new(values[0], values[1], values[2], values[3])))
    }

    fn delta(&self, base: u32, field: u32) -> f32 {
        self.resolver
            .as_ref()
            .map(|resolver| resolver.delta(base, field))
            .unwrap_or(0.0)
    }

    fn color_line(&self, offset: usize, variable: bool) -> Result<ColorLine> {
        let mut reader = Reader::at(self.data, offset);
        let extend = match reader.u8()? {
            1 => Extend::Repeat,
            2 => Extend::Reflect,
            _ => Extend::Pad,
        };
        let count = reader.u16()? as usize;
        let mut stops = Vec::with_capacity(count);
        for _ in 0..count {
            let mut offset = reader.f2dot14()?;
            let palette_index = reader.u16()?;
            let mut alpha = reader.f2dot14()?;
            if variable {
                let base = reader.u32()?;
                offset += self.delta(base, 0) / 16384.0;
                alpha += self.delta(base, 1) / 16384.0;
            }
            stops.push(ColorStopRecord {
                offset,
                palette_index,
                alpha,
            });
        }
        Ok(ColorLine { extend, stops })
    }

    fn child(&self, start: usize, reader: &mut Reader<'_>, depth: usize) -> Result<Box<Paint>> {
        let offset = reader.u24()? as usize;
        Ok(Box::new(self.paint_at(start + offset, depth + 1)?))
    }

    fn paint_at(&self, start: usize, depth: usize) -> Result<Paint> {
        if depth > MAX_PAINT_DEPTH {
            return Err(PdfError::font(format!(
                "COLR paint graph nested deeper than {MAX_PAINT_DEPTH} levels"
            )));
        }
        let mut reader = Reader::at(self.data, start);
        let format = reader.u8()?;
        let variable = matches!(format, 3 | 5 | 7 | 9 | 13 | 15 | 17 | 19 | 21 | 23 | 25 | 27 | 29 | 31);
        if self.resolver.is_none() {
            let name = match format {
                5 => Some("PaintVarLinearGradient"),
                7 => Some("PaintVarRadialGradient"),
                9 => Some("PaintVarSweepGradient"),
                _ => None,
            };
            if let Some(name) = name {
                return Err(PdfError::not_implemented(format!(
                    "{name} without an item variation store"
                )));
            }
        }
        let base_format = if variable { format - 1 } else { format };

        // Reads the trailing varIndexBase of variable formats and returns the
        // deltas of `fields` consecutive values.
        let deltas = |reader: &mut Reader<'_>, fields: u32| -> Result<Vec<f32>> {
            if !variable {
                return Ok(vec![0.0; fields as usize]);
            }
            let base = reader.u32()?;
            if base == NO_VARIATION_INDEX {
                return Ok(vec![0.0; fields as usize]);
            }
            Ok((0..fields).map(|field| self.delta(base, field)).collect())
        };

        let paint = match base_format {
            1 => {
                let count = reader.u8()? as usize;
                let first = reader.u32()? as usize;
                let mut layers = Vec::with_capacity(count);
                for idx in first..first + count {
                    let offset = self.layer_paints.get(idx).copied().ok_or_else(|| {
                        PdfError::font(format!("COLR layer index {idx} out of range"))
                    })?;
                    layers.push(self.paint_at(offset, depth + 1)?);
                }
                Paint::Layers(layers)
            }
            2 => {
                let palette_index = reader.u16()?;
                let alpha = reader.f2dot14()?;
                let d = deltas(&mut reader, 1)?;
                Paint::Solid {
                    palette_index,
                    alpha: alpha + d[0] / 16384.0,
                }
            }
            4 => {
                let line = self.color_line(start + reader.u24()? as usize, variable)?;
                let mut v = [0f32; 6];
                for value in v.iter_mut() {
                    *value = reader.i16()? as f32;
                }
                let d = deltas(&mut reader, 6)?;
                Paint::LinearGradient {
                    line,
                    p0: (v[0] + d[0], v[1] + d[1]),
                    p1: (v[2] + d[2], v[3] + d[3]),
                    p2: (v[4] + d[4], v[5] + d[5]),
                }
            }
            6 => {
                let line = self.color_line(start + reader.u24()? as usize, variable)?;
                let x0 = reader.i16()? as f32;
                let y0 = reader.i16()? as f32;
                let r0 = reader.u16()? as f32;
                let x1 = reader.i16()? as f32;
                let y1 = reader.i16()? as f32;
                let r1 = reader.u16()? as f32;
                let d = deltas(&mut reader, 6)?;
                Paint::RadialGradient {
                    line,
                    c0: (x0 + d[0], y0 + d[1]),
                    r0: r0 + d[2],
                    c1: (x1 + d[3], y1 + d[4]),
                    r1: r1 + d[5],
                }
            }
            8 => {
                let line = self.color_line(start + reader.u24()? as usize, variable)?;
                let cx = reader.i16()? as f32;
                let cy = reader.i16()? as f32;
                let start_angle = reader.f2dot14()?;
                let end_angle = reader.f2dot14()?;
                let d = deltas(&mut reader, 4)?;
                Paint::SweepGradient {
                    line,
                    center: (cx + d[0], cy + d[1]),
                    start_angle: (start_angle + d[2] / 16384.0) * 180.0,
                    end_angle: (end_angle + d[3] / 16384.0) * 180.0,
                }
            }
            10 => {
                let paint = self.child(start, &mut reader, depth)?;
                let glyph_id = reader.u16()?;
                Paint::Glyph { glyph_id, paint }
            }
            11 => Paint::ColrGlyph(reader.u16()?),
            12 => {
                let paint = self.child(start, &mut reader, depth)?;
                let mut affine = Reader::at(self.data, start + reader.u24()? as usize);
                let mut v = [0f32; 6];
                for value in v.iter_mut() {
                    *value = affine.fixed()?;
                }
                let d = deltas(&mut affine, 6)?;
                Paint::Transform {
                    matrix: Matrix::new(
                        v[0] + d[0] / 65536.0,
                        v[1] + d[1] / 65536.0,
                        v[2] + d[2] / 65536.0,
                        v[3] + d[3] / 65536.0,
                        v[4] + d[4] / 65536.0,
                        v[5] + d[5] / 65536.0,
                    ),
                    paint,
                }
            }
            14 => {
                let paint = self.child(start, &mut reader, depth)?;
                let dx = reader.i16()? as f32;
                let dy = reader.i16()? as f32;
                let d = deltas(&mut reader, 2)?;
                Paint::Transform {
                    matrix: Matrix::translate(dx + d[0], dy + d[1]),
                    paint,
                }
            }
            16 | 18 | 20 | 22 => {
                let paint = self.child(start, &mut reader, depth)?;
                let uniform = matches!(base_format, 20 | 22);
                let centered = matches!(base_format, 18 | 22);
                let mut values = vec![reader.f2dot14()?];
                if !uniform {
                    values.push(reader.f2dot14()?);
                }
                let scale_fields = values.len();
                if centered {
                    values.push(reader.i16()? as f32);
                    values.push(reader.i16()? as f32);
                }
                let d = deltas(&mut reader, values.len() as u32)?;
                for (idx, value) in values.iter_mut().enumerate() {
                    *value += if idx < scale_fields {
                        d[idx] / 16384.0
                    } else {
                        d[idx]
                    };
                }
                let (sx, sy) = if uniform {
                    (values[0], values[0])
                } else {
                    (values[0], values[1])
                };
                let mut matrix = Matrix::scale(sx, sy);
                if centered {
                    matrix = matrix.about(values[scale_fields], values[scale_fields + 1]);
                }
                Paint::Transform { matrix, paint }
            }
            24 | 26 => {
                let paint = self.child(start, &mut reader, depth)?;
                let mut values = vec![reader.f2dot14()?];
                if base_format == 26 {
                    values.push(reader.i16()? as f32);
                    values.push(reader.i16()? as f32);
                }
                let d = deltas(&mut reader, values.len() as u32)?;
                let angle = (values[0] + d[0] / 16384.0) * 180.0;
                let mut matrix = Matrix::rotate(angle);
                if base_format == 26 {
                    matrix = matrix.about(values[1] + d[1], values[2] + d[2]);
                }
                Paint::Transform { matrix, paint }
            }
            28 | 30 => {
                let paint = self.child(start, &mut reader, depth)?;
                let mut values = vec![reader.f2dot14()?, reader.f2dot14()?];
                if base_format == 30 {
                    values.push(reader.i16()? as f32);
                    values.push(reader.i16()? as f32);
                }
                let d = deltas(&mut reader, values.len() as u32)?;
                let x_angle = (values[0] + d[0] / 16384.0) * 180.0;
                let y_angle = (values[1] + d[1] / 16384.0) * 180.0;
                let mut matrix = Matrix::skew(-x_angle, y_angle);
                if base_format == 30 {
                    matrix = matrix.about(values[2] + d[2], values[3] + d[3]);
                }
                Paint::Transform { matrix, paint }
            }
            32 => {
                let source = self.child(start, &mut reader, depth)?;
                let mode = CompositeMode::from_u8(reader.u8()?)?;
                let backdrop = self.child(start, &mut reader, depth)?;
                Paint::Composite {
                    source,
                    mode,
                    backdrop,
                }
            }
            other => {
                return Err(PdfError::not_implemented(format!(
                    "Unknown PaintFormat: {other}"
                )));
            }
        };
        Ok(paint)
    }
}

/// Paint byte builders for tests. Child offsets are relative to the paint
/// itself, so a parent is followed directly by its child.
#[cfg(test)]
pub(crate) mod build {
    pub(crate) fn f2dot14(value: f32) -> [u8; 2] {
        ((value * 16384.0).round() as i16).to_be_bytes()
    }

    fn u24(value: usize) -> [u8; 3] {
        let bytes = (value as u32).to_be_bytes();
        [bytes[1], bytes[2], bytes[3]]
    }

    pub(crate) fn solid(palette_index: u16, alpha: f32) -> Vec<u8> {
        let mut out = vec![2];
        out.extend_from_slice(&palette_index.to_be_bytes());
        out.extend_from_slice(&f2dot14(alpha));
        out
    }

    pub(crate) fn glyph(glyph_id: u16, child: Vec<u8>) -> Vec<u8> {
        let mut out = vec![10];
        out.extend_from_slice(&u24(6));
        out.extend_from_slice(&glyph_id.to_be_bytes());
        out.extend(child);
        out
    }

    pub(crate) fn colr_glyph(glyph_id: u16) -> Vec<u8> {
        let mut out = vec![11];
        out.extend_from_slice(&glyph_id.to_be_bytes());
        out
    }

    pub(crate) fn layers(first: u32, count: u8) -> Vec<u8> {
        let mut out = vec![1, count];
        out.extend_from_slice(&first.to_be_bytes());
        out
    }

    pub(crate) fn translate(dx: i16, dy: i16, child: Vec<u8>) -> Vec<u8> {
        let mut out = vec![14];
        out.extend_from_slice(&u24(8));
        out.extend_from_slice(&dx.to_be_bytes());
        out.extend_from_slice(&dy.to_be_bytes());
        out.extend(child);
        out
    }

    pub(crate) fn rotate(turns_of_pi: f32, child: Vec<u8>) -> Vec<u8> {
        let mut out = vec![24];
        out.extend_from_slice(&u24(6));
        out.extend_from_slice(&f2dot14(turns_of_pi));
        out.extend(child);
        out
    }

    pub(crate) fn composite(source: Vec<u8>, mode: u8, backdrop: Vec<u8>) -> Vec<u8> {
        let mut out = vec![32];
        out.extend_from_slice(&u24(8));
        out.push(mode);
        out.extend_from_slice(&u24(8 + source.len()));
        out.extend(source);
        out.extend(backdrop);
        out
    }

    /// `stops` are `(offset, palette index, alpha)`.
    pub(crate) fn linear(
        extend: u8,
        stops: &[(f32, u16, f32)],
        points: [i16; 6],
    ) -> Vec<u8> {
        let mut out = vec![4];
        out.extend_from_slice(&u24(16));
        for value in points {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out.push(extend);
        out.extend_from_slice(&(stops.len() as u16).to_be_bytes());
        for (offset, palette_index, alpha) in stops {
            out.extend_from_slice(&f2dot14(*offset));
            out.extend_from_slice(&palette_index.to_be_bytes());
            out.extend_from_slice(&f2dot14(*alpha));
        }
        out
    }

    /// A version 1 table with base glyph paints, a layer list and clip boxes.
    pub(crate) fn colr_v1(
        glyphs: &[(u16, Vec<u8>)],
        layers: &[Vec<u8>],
        clips: &[(u16, u16, u8, [i16; 4])],
    ) -> Vec<u8> {
        colr_v1_with_store(glyphs, layers, clips, &[])
    }

    /// Like [`colr_v1`], followed by an item variation store when `store`
    /// is not empty.
    pub(crate) fn colr_v1_with_store(
        glyphs: &[(u16, Vec<u8>)],
        layers: &[Vec<u8>],
        clips: &[(u16, u16, u8, [i16; 4])],
        store: &[u8],
    ) -> Vec<u8> {
        let header_len = 34usize;
        let mut base_list = Vec::new();
        base_list.extend_from_slice(&(glyphs.len() as u32).to_be_bytes());
        let mut offset = 4 + 6 * glyphs.len();
        for (gid, paint) in glyphs {
            base_list.extend_from_slice(&gid.to_be_bytes());
            base_list.extend_from_slice(&(offset as u32).to_be_bytes());
            offset += paint.len();
        }
        for (_, paint) in glyphs {
            base_list.extend_from_slice(paint);
        }

        let mut layer_list = Vec::new();
        layer_list.extend_from_slice(&(layers.len() as u32).to_be_bytes());
        let mut offset = 4 + 4 * layers.len();
        for paint in layers {
            layer_list.extend_from_slice(&(offset as u32).to_be_bytes());
            offset += paint.len();
        }
        for paint in layers {
            layer_list.extend_from_slice(paint);
        }

        let mut clip_list = Vec::new();
        if !clips.is_empty() {
            clip_list.push(1);
            clip_list.extend_from_slice(&(clips.len() as u32).to_be_bytes());
            let mut offset = 5 + 7 * clips.len();
            for (start, end, _, _) in clips {
                clip_list.extend_from_slice(&start.to_be_bytes());
                clip_list.extend_from_slice(&end.to_be_bytes());
                clip_list.extend_from_slice(&u24(offset));
                offset += 9;
            }
            for (_, _, format, bounds) in clips {
                clip_list.push(*format);
                for value in bounds {
                    clip_list.extend_from_slice(&value.to_be_bytes());
                }
            }
        }

        let base_at = header_len;
        let layer_at = base_at + base_list.len();
        let clip_at = if clip_list.is_empty() {
            0
        } else {
            layer_at + layer_list.len()
        };
        let store_at = if store.is_empty() {
            0
        } else {
            layer_at + layer_list.len() + clip_list.len()
        };
        let mut out = Vec::new();
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(base_at as u32).to_be_bytes());
        out.extend_from_slice(&(layer_at as u32).to_be_bytes());
        out.extend_from_slice(&(clip_at as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(store_at as u32).to_be_bytes());
        out.extend(base_list);
        out.extend(layer_list);
        out.extend(clip_list);
        out.extend_from_slice(store);
        out
    }

    /// `PaintVarSolid` whose alpha varies through store entry `var_index`.
    pub(crate) fn var_solid(palette_index: u16, alpha: f32, var_index: u32) -> Vec<u8> {
        let mut out = solid(palette_index, alpha);
        out[0] = 3;
        out.extend_from_slice(&var_index.to_be_bytes());
        out
    }

    /// A version 0 table; `glyphs` must be sorted by glyph id.
    pub(crate) fn colr_v0(glyphs: &[(u16, Vec<(u16, u16)>)]) -> Vec<u8> {
        let base_at = 14usize;
        let layer_at = base_at + 6 * glyphs.len();
        let total_layers: usize = glyphs.iter().map(|(_, layers)| layers.len()).sum();
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        out.extend_from_slice(&(base_at as u32).to_be_bytes());
        out.extend_from_slice(&(layer_at as u32).to_be_bytes());
        out.extend_from_slice(&(total_layers as u16).to_be_bytes());
        let mut first = 0u16;
        for (gid, layers) in glyphs {
            out.extend_from_slice(&gid.to_be_bytes());
            out.extend_from_slice(&first.to_be_bytes());
            out.extend_from_slice(&(layers.len() as u16).to_be_bytes());
            first += layers.len() as u16;
        }
        for (_, layers) in glyphs {
            for (gid, palette_index) in layers {
                out.extend_from_slice(&gid.to_be_bytes());
                out.extend_from_slice(&palette_index.to_be_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn version_zero_layers() {
        let data = colr_v0(&[(4, vec![(1, 0), (2, 1)])]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        assert!(table.has_glyph(4));
        assert!(!table.has_glyph(1));
        assert_eq!(
            table.glyph(4).unwrap(),
            Some(ColorGlyph::Layers(vec![(1, 0), (2, 1)]))
        );
        assert_eq!(table.glyph(9).unwrap(), None);
    }

    #[test]
    fn nested_paints_decode() {
        let paint = translate(10, -5, glyph(3, solid(1, 0.5)));
        let data = colr_v1(&[(7, paint)], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        let Some(ColorGlyph::Paint(Paint::Transform { matrix, paint })) = table.glyph(7).unwrap()
        else {
            panic!("expected a transform");
        };
        assert_eq!(matrix, Matrix::translate(10.0, -5.0));
        assert_eq!(
            *paint,
            Paint::Glyph {
                glyph_id: 3,
                paint: Box::new(Paint::Solid {
                    palette_index: 1,
                    alpha: 0.5
                }),
            }
        );
    }

    #[test]
    fn layer_lists_and_composites_decode() {
        let data = colr_v1(
            &[(
                1,
                composite(layers(0, 2), 12, solid(0, 1.0)),
            )],
            &[colr_glyph(2), solid(3, 1.0)],
            &[],
        );
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        let Some(ColorGlyph::Paint(Paint::Composite {
            source,
            mode,
            backdrop,
        })) = table.glyph(1).unwrap()
        else {
            panic!("expected a composite");
        };
        assert_eq!(mode, CompositeMode::Blend(BlendMode::Screen));
        assert_eq!(
            *source,
            Paint::Layers(vec![
                Paint::ColrGlyph(2),
                Paint::Solid {
                    palette_index: 3,
                    alpha: 1.0
                }
            ])
        );
        assert!(matches!(*backdrop, Paint::Solid { palette_index: 0, .. }));
    }

    #[test]
    fn rotation_angles_are_half_turns() {
        let data = colr_v1(&[(1, rotate(0.5, solid(0, 1.0)))], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        let Some(ColorGlyph::Paint(Paint::Transform { matrix, .. })) = table.glyph(1).unwrap() else {
            panic!("expected a transform");
        };
        let (x, y) = matrix.apply(1.0, 0.0);
        assert!(x.abs() < 1e-4 && (y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn unknown_formats_are_not_implemented() {
        let data = colr_v1(&[(1, vec![99])], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        let err = table.glyph(1).unwrap_err();
        assert_eq!(err.to_string(), "not implemented: Unknown PaintFormat: 99");
    }

    #[test]
    fn unknown_composite_modes_are_not_implemented() {
        let data = colr_v1(&[(1, composite(solid(0, 1.0), 40, solid(1, 1.0)))], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        let err = table.glyph(1).unwrap_err();
        assert!(matches!(err, PdfError::NotImplemented(_)));
        assert!(err.to_string().contains("composite mode 40"));
    }

    #[test]
    fn variable_gradients_need_a_store() {
        let mut paint = linear(0, &[(0.0, 0, 1.0)], [0, 0, 10, 0, 0, 10]);
        paint[0] = 5;
        let data = colr_v1(&[(1, paint)], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        assert!(matches!(table.glyph(1), Err(PdfError::NotImplemented(_))));
    }

    #[test]
    fn variable_solid_uses_base_values_without_store() {
        let mut paint = solid(2, 0.25);
        paint[0] = 3;
        paint.extend_from_slice(&0u32.to_be_bytes());
        let data = colr_v1(&[(1, paint)], &[], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        assert_eq!(
            table.glyph(1).unwrap(),
            Some(ColorGlyph::Paint(Paint::Solid {
                palette_index: 2,
                alpha: 0.25
            }))
        );
    }

    #[test]
    fn variable_solid_follows_the_requested_location() {
        let store = crate::varstore::build_store(&[(0.0, 1.0, 1.0)], &[&[-8192]]);
        let data = colr_v1_with_store(&[(1, var_solid(2, 1.0, 0))], &[], &[], &store);
        let alpha_at = |coords: Vec<f32>| {
            let table = ColrTable::parse(&data, coords).unwrap();
            match table.glyph(1).unwrap() {
                Some(ColorGlyph::Paint(Paint::Solid { alpha, .. })) => alpha,
                other => panic!("expected a solid paint, got {other:?}"),
            }
        };
        assert_eq!(alpha_at(Vec::new()), 1.0);
        assert_eq!(alpha_at(vec![0.0]), 1.0);
        assert_eq!(alpha_at(vec![0.5]), 0.75);
        assert_eq!(alpha_at(vec![1.0]), 0.5);
    }

    #[test]
    fn clip_boxes_and_unknown_formats() {
        let data = colr_v1(
            &[(1, solid(0, 1.0)), (2, solid(0, 1.0))],
            &[],
            &[(1, 1, 1, [0, -100, 500, 700]), (2, 2, 7, [0, 0, 0, 0])],
        );
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        assert_eq!(
            table.clip_box(1, None).unwrap(),
            Some(Rect::new(0.0, -100.0, 500.0, 700.0))
        );
        let debug = DebugLogger::in_memory();
        assert_eq!(table.clip_box(2, Some(&debug)).unwrap(), None);
        assert_eq!(debug.count("colr.clip_box_unknown"), 1);
        assert_eq!(table.clip_box(3, None).unwrap(), None);
    }

    #[test]
    fn runaway_layer_nesting_is_an_error() {
        let data = colr_v1(&[(1, layers(0, 1))], &[layers(0, 1)], &[]);
        let table = ColrTable::parse(&data, Vec::new()).unwrap();
        assert!(matches!(table.glyph(1), Err(PdfError::Font(_))));
    }
}
