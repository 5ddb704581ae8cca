//! Apple `sbix` strikes: per-glyph PNG or JPEG images.

use crate::bitmap::select_strike;
use crate::draw::DrawNode;
use crate::error::{PdfError, Result};
use crate::images::ImageCache;
use crate::subset::Reader;
use crate::types::{Matrix, Rect};

pub(crate) struct SbixStrike<'a> {
    data: &'a [u8],
    strike: usize,
    ppem: u16,
    glyph_count: u16,
    units_per_em: u16,
}

impl<'a> SbixStrike<'a> {
    /// Opens the strike best matching `target_ppem` in the `sbix` table `data`.
    pub(crate) fn load(
        data: &'a [u8],
        glyph_count: u16,
        target_ppem: u16,
        units_per_em: u16,
    ) -> Result<Option<Self>> {
        let mut reader = Reader::new(data);
        let _version = reader.u16()?;
        let _flags = reader.u16()?;
        let count = reader.u32()? as usize;
        let mut strikes = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = reader.u32()? as usize;
            let ppem = Reader::at(data, offset).u16()?;
            strikes.push((offset, ppem));
        }
        let ppems: Vec<u16> = strikes.iter().map(|(_, ppem)| *ppem).collect();
        let Some(chosen) = select_strike(&ppems, target_ppem) else {
            return Ok(None);
        };
        let (strike, ppem) = strikes[chosen];
        Ok(Some(Self {
            data,
            strike,
            ppem,
            glyph_count,
            units_per_em: units_per_em.max(1),
        }))
    }

    /// Byte range of the glyph record within the table.
    fn record(&self, gid: u16) -> Result<Option<(usize, usize)>> {
        if gid >= self.glyph_count {
            return Ok(None);
        }
        let mut reader = Reader::at(self.data, self.strike + 4 + gid as usize * 4);
        let start = reader.u32()? as usize;
        let end = reader.u32()? as usize;
        if end <= start {
            return Ok(None);
        }
        Ok(Some((self.strike + start, self.strike + end)))
    }

    pub(crate) fn glyph_exists(&self, gid: u16) -> bool {
        matches!(self.record(gid), Ok(Some(_)))
    }

    /// Draws the glyph image. `outline_box` is the glyph's outline bounds when
    /// the font has outlines; the origin offset is applied on top of it.
    pub(crate) fn load_glyph(
        &self,
        gid: u16,
        outline_box: Option<Rect>,
        images: &mut ImageCache,
    ) -> Result<Vec<DrawNode>> {
        let Some((start, end)) = self.record(gid)? else {
            return Ok(Vec::new());
        };
        let mut reader = Reader::at(self.data, start);
        let origin_x = reader.i16()? as f32;
        let origin_y = reader.i16()? as f32;
        let graphic_type = reader.bytes(4)?;
        let payload = reader.bytes(end.saturating_sub(start + 8))?;
        match graphic_type {
            b"png " | b"jpg " => {}
            b"dupe" => {
                return Err(PdfError::not_implemented("sbix dupe glyphs"));
            }
            b"tiff" => {
                return Err(PdfError::not_implemented("sbix tiff glyph images"));
            }
            other => {
                return Err(PdfError::not_implemented(format!(
                    "sbix graphic type {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        }
        let (_, index, info) = images.preload(payload)?;
        let pixel = self.units_per_em as f32 / self.ppem.max(1) as f32;
        let (width, height) = (info.width as f32 * pixel, info.height as f32 * pixel);
        let (x, y) = match outline_box {
            Some(bounds) => (bounds.x_min + origin_x * pixel, bounds.y_min + origin_y * pixel),
            None => (origin_x * pixel, origin_y * pixel),
        };
        Ok(vec![DrawNode::Image {
            index,
            matrix: Matrix::new(width, 0.0, 0.0, height, x, y),
        }])
    }
}

/// An `sbix` table with one strike; `glyphs[gid]` is `(origin, type, data)`
/// or `None` for an empty record.
#[cfg(test)]
pub(crate) fn build_sbix(ppem: u16, glyphs: &[Option<((i16, i16), [u8; 4], Vec<u8>)>]) -> Vec<u8> {
    let mut strike = Vec::new();
    strike.extend_from_slice(&ppem.to_be_bytes());
    strike.extend_from_slice(&72u16.to_be_bytes());
    let mut offset = 4 + 4 * (glyphs.len() + 1);
    let mut records = Vec::new();
    for glyph in glyphs {
        strike.extend_from_slice(&(offset as u32).to_be_bytes());
        if let Some(((x, y), tag, data)) = glyph {
            records.extend_from_slice(&x.to_be_bytes());
            records.extend_from_slice(&y.to_be_bytes());
            records.extend_from_slice(tag);
            records.extend_from_slice(data);
            offset += 8 + data.len();
        }
    }
    strike.extend_from_slice(&(offset as u32).to_be_bytes());
    strike.extend(records);

    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&12u32.to_be_bytes());
    out.extend(strike);
    out
}
