//! Embedded bitmap strikes: `CBLC`/`CBDT` (PNG color) and `EBLC`/`EBDT`
//! (monochrome and grayscale).

use crate::draw::{DrawNode, Fill, Path};
use crate::error::{PdfError, Result};
use crate::images::ImageCache;
use crate::object::fmt;
use crate::resources::{ImageSoftMask, SoftMask};
use crate::subset::{Reader, find_table};
use crate::types::{Matrix, Rect, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BitmapKind {
    /// `CBLC`/`CBDT`, PNG payloads.
    Color,
    /// `EBLC`/`EBDT`, packed coverage rows.
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Strike {
    ppem: u16,
    bit_depth: u8,
    subtables_offset: usize,
    subtable_count: usize,
    start_glyph: u16,
    end_glyph: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GlyphMetrics {
    pub(crate) height: u8,
    pub(crate) width: u8,
    pub(crate) bearing_x: i8,
    pub(crate) bearing_y: i8,
    pub(crate) advance: u8,
}

impl GlyphMetrics {
    fn small(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            height: reader.u8()?,
            width: reader.u8()?,
            bearing_x: reader.i8()?,
            bearing_y: reader.i8()?,
            advance: reader.u8()?,
        })
    }

    /// Big metrics; the vertical half is skipped.
    fn big(reader: &mut Reader<'_>) -> Result<Self> {
        let metrics = Self::small(reader)?;
        reader.skip(3);
        Ok(metrics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GlyphLocation {
    image_format: u16,
    offset: usize,
    length: usize,
    metrics: Option<GlyphMetrics>,
}

/// Picks the smallest strike at least `target` ppem tall, else the largest.
pub(crate) fn select_strike(ppems: &[u16], target: u16) -> Option<usize> {
    let above = ppems
        .iter()
        .enumerate()
        .filter(|(_, ppem)| **ppem >= target)
        .min_by_key(|(_, ppem)| **ppem)
        .map(|(idx, _)| idx);
    above.or_else(|| {
        ppems
            .iter()
            .enumerate()
            .max_by_key(|(_, ppem)| **ppem)
            .map(|(idx, _)| idx)
    })
}

/// Unpacks one row of `width` samples of `depth` bits starting at bit
/// `bit_offset`, scaling every sample to 0..=255.
pub(crate) fn decode_row(data: &[u8], bit_offset: usize, width: usize, depth: u8) -> Result<Vec<u8>> {
    if !matches!(depth, 1 | 2 | 4 | 8) {
        return Err(PdfError::not_implemented(format!(
            "unsupported EBDT bit depth {depth}"
        )));
    }
    let max = (1u16 << depth) - 1;
    let mut out = Vec::with_capacity(width);
    for column in 0..width {
        let bit = bit_offset + column * depth as usize;
        let byte = *data
            .get(bit / 8)
            .ok_or_else(|| PdfError::font("EBDT glyph data is truncated"))?;
        let shift = 8 - depth as usize - bit % 8;
        let sample = (byte >> shift) as u16 & max;
        out.push((sample * 255 / max) as u8);
    }
    Ok(out)
}

/// `re` operators for the runs of set pixels of a 1-bit glyph, top row first.
fn run_rectangles(rows: &[Vec<u8>], origin: (f32, f32), pixel: f32) -> String {
    let mut rects = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        let y = origin.1 - (row_index + 1) as f32 * pixel;
        let mut column = 0;
        while column < row.len() {
            if row[column] == 0 {
                column += 1;
                continue;
            }
            let start = column;
            while column < row.len() && row[column] != 0 {
                column += 1;
            }
            rects.push(format!(
                "{} {} {} {} re",
                fmt(origin.0 + start as f32 * pixel),
                fmt(y),
                fmt((column - start) as f32 * pixel),
                fmt(pixel)
            ));
        }
    }
    if rects.is_empty() {
        return String::new();
    }
    format!("{} f", rects.join(" "))
}

pub(crate) struct BitmapStrikes<'a> {
    kind: BitmapKind,
    locator: &'a [u8],
    data: &'a [u8],
    strike: Strike,
    units_per_em: u16,
    font_bbox: Rect,
}

impl<'a> BitmapStrikes<'a> {
    /// Loads the strike best matching `target_ppem`, or `None` when the font
    /// carries no tables of `kind`.
    pub(crate) fn load(
        font: &'a [u8],
        kind: BitmapKind,
        target_ppem: u16,
        units_per_em: u16,
        font_bbox: Rect,
    ) -> Result<Option<Self>> {
        let (locator_tag, data_tag) = match kind {
            BitmapKind::Color => (b"CBLC", b"CBDT"),
            BitmapKind::Gray => (b"EBLC", b"EBDT"),
        };
        let (Some(locator), Some(data)) = (find_table(font, locator_tag), find_table(font, data_tag))
        else {
            return Ok(None);
        };
        let strikes = parse_strikes(locator)?;
        let ppems: Vec<u16> = strikes.iter().map(|strike| strike.ppem).collect();
        let Some(chosen) = select_strike(&ppems, target_ppem) else {
            return Ok(None);
        };
        Ok(Some(Self {
            kind,
            locator,
            data,
            strike: strikes[chosen],
            units_per_em: units_per_em.max(1),
            font_bbox,
        }))
    }

    pub(crate) fn ppem(&self) -> u16 {
        self.strike.ppem
    }

    pub(crate) fn glyph_exists(&self, gid: u16) -> bool {
        matches!(self.locate(gid), Ok(Some(location)) if location.length > 0)
    }

    fn locate(&self, gid: u16) -> Result<Option<GlyphLocation>> {
        let strike = &self.strike;
        if gid < strike.start_glyph || gid > strike.end_glyph {
            return Ok(None);
        }
        let mut array = Reader::at(self.locator, strike.subtables_offset);
        for _ in 0..strike.subtable_count {
            let first = array.u16()?;
            let last = array.u16()?;
            let extra = array.u32()? as usize;
            if gid < first || gid > last {
                continue;
            }
            return self.locate_in_subtable(strike.subtables_offset + extra, gid, first);
        }
        Ok(None)
    }

    fn locate_in_subtable(
        &self,
        at: usize,
        gid: u16,
        first: u16,
    ) -> Result<Option<GlyphLocation>> {
        let mut reader = Reader::at(self.locator, at);
        let index_format = reader.u16()?;
        let image_format = reader.u16()?;
        let image_data = reader.u32()? as usize;
        let slot = (gid - first) as usize;
        let located = |start: usize, end: usize, metrics: Option<GlyphMetrics>| {
            Some(GlyphLocation {
                image_format,
                offset: image_data + start,
                length: end.saturating_sub(start),
                metrics,
            })
        };
        let location = match index_format {
            1 | 3 => {
                let width = if index_format == 1 { 4 } else { 2 };
                reader.skip(slot * width);
                let (start, end) = if index_format == 1 {
                    (reader.u32()? as usize, reader.u32()? as usize)
                } else {
                    (reader.u16()? as usize, reader.u16()? as usize)
                };
                located(start, end, None)
            }
            2 => {
                let size = reader.u32()? as usize;
                let metrics = GlyphMetrics::big(&mut reader)?;
                located(slot * size, (slot + 1) * size, Some(metrics))
            }
            4 => {
                let count = reader.u32()? as usize;
                let mut pairs = Vec::with_capacity(count + 1);
                for _ in 0..=count {
                    pairs.push((reader.u16()?, reader.u16()? as usize));
                }
                pairs
                    .windows(2)
                    .find(|pair| pair[0].0 == gid)
                    .and_then(|pair| located(pair[0].1, pair[1].1, None))
            }
            5 => {
                let size = reader.u32()? as usize;
                let metrics = GlyphMetrics::big(&mut reader)?;
                let count = reader.u32()? as usize;
                let mut found = None;
                for idx in 0..count {
                    if reader.u16()? == gid {
                        found = Some(idx);
                        break;
                    }
                }
                found.and_then(|idx| located(idx * size, (idx + 1) * size, Some(metrics)))
            }
            other => {
                return Err(PdfError::not_implemented(format!(
                    "bitmap index subtable format {other}"
                )));
            }
        };
        Ok(location)
    }

    /// Font units per strike pixel.
    fn pixel(&self) -> f32 {
        self.units_per_em as f32 / self.strike.ppem.max(1) as f32
    }

    /// Glyph box in font units; without metrics the font box stands in.
    fn placement(&self, metrics: Option<GlyphMetrics>) -> Rect {
        let Some(m) = metrics else {
            return self.font_bbox;
        };
        let pixel = self.pixel();
        let x = m.bearing_x as f32 * pixel;
        let top = m.bearing_y as f32 * pixel;
        Rect::new(x, top - m.height as f32 * pixel, x + m.width as f32 * pixel, top)
    }

    pub(crate) fn load_glyph(
        &self,
        gid: u16,
        images: &mut ImageCache,
        color: Rgba,
    ) -> Result<Vec<DrawNode>> {
        let Some(location) = self.locate(gid)? else {
            return Ok(Vec::new());
        };
        let mut reader = Reader::at(self.data, location.offset);
        match (self.kind, location.image_format) {
            (BitmapKind::Color, 17 | 18 | 19) => {
                let metrics = match location.image_format {
                    17 => Some(GlyphMetrics::small(&mut reader)?),
                    18 => Some(GlyphMetrics::big(&mut reader)?),
                    _ => location.metrics,
                };
                let length = reader.u32()? as usize;
                let png = reader.bytes(length)?;
                let (_, index, _) = images.preload(png)?;
                let rect = self.placement(metrics);
                Ok(vec![DrawNode::Image {
                    index,
                    matrix: Matrix::new(rect.width(), 0.0, 0.0, rect.height(), rect.x_min, rect.y_min),
                }])
            }
            (BitmapKind::Gray, 1 | 2 | 5 | 6 | 7) => {
                let metrics = match location.image_format {
                    1 | 2 => GlyphMetrics::small(&mut reader)?,
                    6 | 7 => GlyphMetrics::big(&mut reader)?,
                    _ => location.metrics.ok_or_else(|| {
                        PdfError::not_implemented("EBDT image format 5 without index metrics")
                    })?,
                };
                let byte_aligned = matches!(location.image_format, 1 | 6);
                let data = &self.data[reader.pos().min(self.data.len())..];
                let rows = decode_rows(data, metrics, self.strike.bit_depth, byte_aligned)?;
                let rect = self.placement(Some(metrics));
                if self.strike.bit_depth == 1 {
                    let operators = run_rectangles(&rows, (rect.x_min, rect.y_max), self.pixel());
                    if operators.is_empty() {
                        return Ok(Vec::new());
                    }
                    return Ok(vec![DrawNode::Raw { operators, color }]);
                }
                let pixels: Vec<u8> = rows.concat();
                let image = images.preload_gray(metrics.width as u32, metrics.height as u32, &pixels)?;
                Ok(vec![DrawNode::Masked {
                    mask: SoftMask::Image(ImageSoftMask {
                        image,
                        bbox: rect,
                        matrix: Matrix::new(
                            rect.width(),
                            0.0,
                            0.0,
                            rect.height(),
                            rect.x_min,
                            rect.y_min,
                        ),
                    }),
                    children: vec![DrawNode::Fill {
                        path: Path::rect(rect),
                        fill: Fill::Solid(color),
                    }],
                }])
            }
            (_, format) => Err(PdfError::not_implemented(format!(
                "bitmap image format {format}"
            ))),
        }
    }
}

fn decode_rows(data: &[u8], metrics: GlyphMetrics, depth: u8, byte_aligned: bool) -> Result<Vec<Vec<u8>>> {
    let width = metrics.width as usize;
    let row_bits = width * depth as usize;
    let stride = if byte_aligned { row_bits.div_ceil(8) * 8 } else { row_bits };
    (0..metrics.height as usize)
        .map(|row| decode_row(data, row * stride, width, depth))
        .collect()
}

fn parse_strikes(locator: &[u8]) -> Result<Vec<Strike>> {
    let mut reader = Reader::new(locator);
    let _version = reader.u32()?;
    let count = reader.u32()? as usize;
    let mut strikes = Vec::with_capacity(count);
    for _ in 0..count {
        let subtables_offset = reader.u32()? as usize;
        let _tables_size = reader.u32()?;
        let subtable_count = reader.u32()? as usize;
        let _color_ref = reader.u32()?;
        reader.skip(24);
        let start_glyph = reader.u16()?;
        let end_glyph = reader.u16()?;
        let ppem = reader.u8()? as u16;
        let _ppem_y = reader.u8()?;
        let bit_depth = reader.u8()?;
        let _flags = reader.i8()?;
        strikes.push(Strike {
            ppem,
            bit_depth,
            subtables_offset,
            subtable_count,
            start_glyph,
            end_glyph,
        });
    }
    Ok(strikes)
}

/// Builds matching locator and data tables holding one strike with an
/// index format 4 subtable. `glyphs` are `(gid, payload)` in gid order.
#[cfg(test)]
pub(crate) fn build_strike(
    kind: BitmapKind,
    ppem: u8,
    bit_depth: u8,
    image_format: u16,
    glyphs: &[(u16, Vec<u8>)],
) -> (Vec<u8>, Vec<u8>) {
    let version: u32 = match kind {
        BitmapKind::Color => 0x0003_0000,
        BitmapKind::Gray => 0x0002_0000,
    };
    let first = glyphs.first().map(|g| g.0).unwrap_or(0);
    let last = glyphs.last().map(|g| g.0).unwrap_or(0);

    let mut data = version.to_be_bytes().to_vec();
    let mut pairs = Vec::new();
    for (gid, payload) in glyphs {
        pairs.push((*gid, (data.len() - 4) as u16));
        data.extend_from_slice(payload);
    }
    pairs.push((0, (data.len() - 4) as u16));

    let mut subtable = Vec::new();
    subtable.extend_from_slice(&4u16.to_be_bytes());
    subtable.extend_from_slice(&image_format.to_be_bytes());
    subtable.extend_from_slice(&4u32.to_be_bytes());
    subtable.extend_from_slice(&(glyphs.len() as u32).to_be_bytes());
    for (gid, offset) in pairs {
        subtable.extend_from_slice(&gid.to_be_bytes());
        subtable.extend_from_slice(&offset.to_be_bytes());
    }

    let mut locator = version.to_be_bytes().to_vec();
    locator.extend_from_slice(&1u32.to_be_bytes());
    locator.extend_from_slice(&56u32.to_be_bytes());
    locator.extend_from_slice(&((8 + subtable.len()) as u32).to_be_bytes());
    locator.extend_from_slice(&1u32.to_be_bytes());
    locator.extend_from_slice(&0u32.to_be_bytes());
    locator.extend_from_slice(&[0; 24]);
    locator.extend_from_slice(&first.to_be_bytes());
    locator.extend_from_slice(&last.to_be_bytes());
    locator.extend_from_slice(&[ppem, ppem, bit_depth, 1]);
    locator.extend_from_slice(&first.to_be_bytes());
    locator.extend_from_slice(&last.to_be_bytes());
    locator.extend_from_slice(&8u32.to_be_bytes());
    locator.extend(subtable);
    (locator, data)
}
