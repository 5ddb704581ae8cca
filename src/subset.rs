//! Minimal sfnt plumbing: a big-endian reader, table lookup, a table-directory
//! writer and the glyph-id preserving TrueType subsetter.

use std::collections::BTreeSet;

use crate::error::{PdfError, Result};

/// Tables never needed by an embedded CID font program.
const DROPPED_TABLES: [&[u8; 4]; 18] = [
    b"FFTM", b"GDEF", b"GPOS", b"GSUB", b"MATH", b"hdmx", b"meta", b"sbix", b"CBDT", b"CBLC",
    b"EBDT", b"EBLC", b"EBSC", b"SVG ", b"CPAL", b"COLR", b"DSIG", b"kern",
];

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip(&mut self, count: usize) {
        self.pos = self.pos.saturating_add(count);
    }

    pub(crate) fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| PdfError::font(format!("truncated table at offset {}", self.pos)))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn i16(&mut self) -> Result<i16> {
        Ok(self.u16()? as i16)
    }

    pub(crate) fn u24(&mut self) -> Result<u32> {
        let b = self.bytes(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }

    /// 2.14 fixed point.
    pub(crate) fn f2dot14(&mut self) -> Result<f32> {
        Ok(self.i16()? as f32 / 16384.0)
    }

    /// 16.16 fixed point.
    pub(crate) fn fixed(&mut self) -> Result<f32> {
        Ok(self.i32()? as f32 / 65536.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableRecord {
    pub(crate) tag: [u8; 4],
    pub(crate) offset: usize,
    pub(crate) length: usize,
}

pub(crate) fn table_directory(data: &[u8]) -> Result<(u32, Vec<TableRecord>)> {
    let mut reader = Reader::new(data);
    let version = reader.u32()?;
    let count = reader.u16()?;
    reader.skip(6);
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag_bytes = reader.bytes(4)?;
        let tag = [tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]];
        let _checksum = reader.u32()?;
        let offset = reader.u32()? as usize;
        let length = reader.u32()? as usize;
        if offset.checked_add(length).is_none_or(|end| end > data.len()) {
            return Err(PdfError::font(format!(
                "table {} lies outside the font data",
                String::from_utf8_lossy(&tag)
            )));
        }
        records.push(TableRecord { tag, offset, length });
    }
    Ok((version, records))
}

pub(crate) fn find_table<'a>(data: &'a [u8], tag: &[u8; 4]) -> Option<&'a [u8]> {
    let (_, records) = table_directory(data).ok()?;
    records
        .iter()
        .find(|record| &record.tag == tag)
        .map(|record| &data[record.offset..record.offset + record.length])
}

fn checksum(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

/// Serializes tables behind a fresh directory (sorted by tag, 4-byte aligned)
/// and patches `head.checkSumAdjustment`.
pub(crate) fn write_sfnt(version: u32, tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut sorted: Vec<&([u8; 4], Vec<u8>)> = tables.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let count = sorted.len() as u16;
    let mut entry_selector: u16 = 0;
    while (1u32 << (entry_selector + 1)) <= count as u32 {
        entry_selector += 1;
    }
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = count * 16 - search_range.min(count * 16);

    let mut out = Vec::new();
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = 12 + 16 * sorted.len();
    let mut head_offset = None;
    for (tag, data) in &sorted {
        let mut table = data.clone();
        if tag == b"head" && table.len() >= 12 {
            table[8..12].copy_from_slice(&[0, 0, 0, 0]);
            head_offset = Some(offset);
        }
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(&table).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.len() as u32).to_be_bytes());
        offset += (table.len() + 3) & !3;
    }
    for (tag, data) in &sorted {
        let start = out.len();
        out.extend_from_slice(data);
        if tag == b"head" && data.len() >= 12 {
            out[start + 8..start + 12].copy_from_slice(&[0, 0, 0, 0]);
        }
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }
    if let Some(head) = head_offset {
        let adjustment = 0xB1B0_AFBAu32.wrapping_sub(checksum(&out));
        out[head + 8..head + 12].copy_from_slice(&adjustment.to_be_bytes());
    }
    out
}

fn glyph_offsets(loca: &[u8], long: bool, num_glyphs: usize) -> Result<Vec<usize>> {
    let mut reader = Reader::new(loca);
    let mut offsets = Vec::with_capacity(num_glyphs + 1);
    for _ in 0..=num_glyphs {
        let offset = if long {
            reader.u32()? as usize
        } else {
            reader.u16()? as usize * 2
        };
        offsets.push(offset);
    }
    Ok(offsets)
}

fn component_glyphs(glyph: &[u8]) -> Result<Vec<u16>> {
    let mut reader = Reader::new(glyph);
    if reader.i16()? >= 0 {
        return Ok(Vec::new());
    }
    reader.skip(8);
    let mut out = Vec::new();
    loop {
        let flags = reader.u16()?;
        out.push(reader.u16()?);
        reader.skip(if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 });
        if flags & WE_HAVE_A_SCALE != 0 {
            reader.skip(2);
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            reader.skip(4);
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            reader.skip(8);
        }
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    Ok(out)
}

/// Subsets a `glyf`-based font in place: glyph ids do not move, unused
/// glyphs become empty, composite dependencies are kept, and layout and
/// color tables are dropped. Returns the rebuilt font file.
pub(crate) fn subset_truetype(data: &[u8], keep: &BTreeSet<u16>) -> Result<Vec<u8>> {
    let (version, records) = table_directory(data)?;
    let table = |tag: &[u8; 4]| {
        records
            .iter()
            .find(|record| &record.tag == tag)
            .map(|record| &data[record.offset..record.offset + record.length])
    };
    let head = table(b"head").ok_or_else(|| PdfError::font("missing head table"))?;
    let maxp = table(b"maxp").ok_or_else(|| PdfError::font("missing maxp table"))?;
    let loca = table(b"loca").ok_or_else(|| PdfError::font("missing loca table"))?;
    let glyf = table(b"glyf").ok_or_else(|| PdfError::font("missing glyf table"))?;

    let long_loca = Reader::at(head, 50).i16()? == 1;
    let num_glyphs = Reader::at(maxp, 4).u16()? as usize;
    let offsets = glyph_offsets(loca, long_loca, num_glyphs)?;
    let glyph_data = |gid: usize| -> &[u8] {
        let start = offsets[gid].min(glyf.len());
        let end = offsets[gid + 1].min(glyf.len()).max(start);
        &glyf[start..end]
    };

    let mut kept: BTreeSet<u16> = keep
        .iter()
        .copied()
        .filter(|gid| (*gid as usize) < num_glyphs)
        .collect();
    kept.insert(0);
    let mut pending: Vec<u16> = kept.iter().copied().collect();
    while let Some(gid) = pending.pop() {
        let glyph = glyph_data(gid as usize);
        if glyph.len() < 10 {
            continue;
        }
        for component in component_glyphs(glyph)? {
            if (component as usize) < num_glyphs && kept.insert(component) {
                pending.push(component);
            }
        }
    }

    let mut new_glyf = Vec::with_capacity(glyf.len());
    let mut new_loca = Vec::with_capacity((num_glyphs + 1) * 4);
    for gid in 0..num_glyphs {
        new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());
        if kept.contains(&(gid as u16)) {
            new_glyf.extend_from_slice(glyph_data(gid));
            while new_glyf.len() % 4 != 0 {
                new_glyf.push(0);
            }
        }
    }
    new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());

    let mut new_head = head.to_vec();
    if new_head.len() >= 52 {
        new_head[50..52].copy_from_slice(&1i16.to_be_bytes());
    }

    let mut tables = Vec::with_capacity(records.len());
    for record in &records {
        if DROPPED_TABLES.iter().any(|tag| **tag == record.tag) {
            continue;
        }
        let bytes = match &record.tag {
            b"glyf" => new_glyf.clone(),
            b"loca" => new_loca.clone(),
            b"head" => new_head.clone(),
            _ => data[record.offset..record.offset + record.length].to_vec(),
        };
        tables.push((record.tag, bytes));
    }
    Ok(write_sfnt(version, &tables))
}
