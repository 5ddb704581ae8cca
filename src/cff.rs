//! Just enough of the CFF format to classify an OpenType/CFF font: whether
//! its top DICT carries a registry/ordering/supplement, and the charset that
//! maps glyph ids to CIDs.

use crate::cmap::Ros;
use crate::error::{PdfError, Result};
use crate::subset::Reader;

const STANDARD_STRING_COUNT: usize = 391;
const OP_CHARSET: u16 = 15;
const OP_CHARSTRINGS: u16 = 17;
const OP_ROS: u16 = 0x0C1E;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CffInfo {
    pub(crate) cid_keyed: bool,
    pub(crate) ros: Option<Ros>,
    gid_to_cid: Vec<u32>,
}

impl CffInfo {
    pub(crate) fn cid_for_gid(&self, gid: u16) -> u32 {
        self.gid_to_cid
            .get(gid as usize)
            .copied()
            .unwrap_or(gid as u32)
    }
}

struct Index<'a> {
    items: Vec<&'a [u8]>,
}

fn read_index<'a>(data: &'a [u8], reader: &mut Reader<'a>) -> Result<Index<'a>> {
    let count = reader.u16()? as usize;
    if count == 0 {
        return Ok(Index { items: Vec::new() });
    }
    let off_size = reader.u8()?;
    let mut offsets = Vec::with_capacity(count + 1);
    for _ in 0..=count {
        let offset = match off_size {
            1 => reader.u8()? as usize,
            2 => reader.u16()? as usize,
            3 => reader.u24()? as usize,
            4 => reader.u32()? as usize,
            other => return Err(PdfError::font(format!("invalid CFF offset size {other}"))),
        };
        offsets.push(offset);
    }
    let base = reader.pos() - 1;
    let mut items = Vec::with_capacity(count);
    for pair in offsets.windows(2) {
        let start = base + pair[0];
        let end = base + pair[1];
        if start > end || end > data.len() {
            return Err(PdfError::font("CFF INDEX entry out of range"));
        }
        items.push(&data[start..end]);
    }
    if let Some(last) = offsets.last() {
        *reader = Reader::at(data, base + last);
    }
    Ok(Index { items })
}

/// Operator -> operands, in DICT order.
fn parse_dict(data: &[u8]) -> Result<Vec<(u16, Vec<f64>)>> {
    let mut reader = Reader::new(data);
    let mut operands = Vec::new();
    let mut out = Vec::new();
    while reader.pos() < data.len() {
        let b0 = reader.u8()?;
        match b0 {
            0..=11 | 13..=21 => out.push((b0 as u16, std::mem::take(&mut operands))),
            12 => {
                let b1 = reader.u8()?;
                out.push((0x0C00 | b1 as u16, std::mem::take(&mut operands)));
            }
            28 => operands.push(reader.i16()? as f64),
            29 => operands.push(reader.i32()? as f64),
            30 => operands.push(read_real(&mut reader)?),
            32..=246 => operands.push(b0 as f64 - 139.0),
            247..=250 => {
                let b1 = reader.u8()? as f64;
                operands.push((b0 as f64 - 247.0) * 256.0 + b1 + 108.0);
            }
            251..=254 => {
                let b1 = reader.u8()? as f64;
                operands.push(-(b0 as f64 - 251.0) * 256.0 - b1 - 108.0);
            }
            _ => return Err(PdfError::font(format!("invalid CFF DICT byte {b0}"))),
        }
    }
    Ok(out)
}

fn read_real(reader: &mut Reader<'_>) -> Result<f64> {
    let mut text = String::new();
    'outer: loop {
        let byte = reader.u8()?;
        for nibble in [byte >> 4, byte & 0x0F] {
            match nibble {
                0..=9 => text.push((b'0' + nibble) as char),
                0xA => text.push('.'),
                0xB => text.push('E'),
                0xC => text.push_str("E-"),
                0xE => text.push('-'),
                0xF => break 'outer,
                _ => {}
            }
        }
    }
    Ok(text.parse().unwrap_or(0.0))
}

fn custom_string(strings: &Index<'_>, sid: usize) -> Option<String> {
    let idx = sid.checked_sub(STANDARD_STRING_COUNT)?;
    strings
        .items
        .get(idx)
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
}

fn read_charset(data: &[u8], offset: usize, glyph_count: usize) -> Result<Vec<u32>> {
    let mut map = Vec::with_capacity(glyph_count);
    map.push(0);
    let mut reader = Reader::at(data, offset);
    let format = reader.u8()?;
    match format {
        0 => {
            while map.len() < glyph_count {
                map.push(reader.u16()? as u32);
            }
        }
        1 | 2 => {
            while map.len() < glyph_count {
                let first = reader.u16()? as u32;
                let left = if format == 1 {
                    reader.u8()? as u32
                } else {
                    reader.u16()? as u32
                };
                for step in 0..=left {
                    if map.len() >= glyph_count {
                        break;
                    }
                    map.push(first + step);
                }
            }
        }
        other => return Err(PdfError::font(format!("unknown CFF charset format {other}"))),
    }
    Ok(map)
}

/// Parses the `CFF ` table of an OpenType font.
pub(crate) fn parse_cff(data: &[u8]) -> Result<CffInfo> {
    let mut reader = Reader::new(data);
    reader.skip(2);
    let header_size = reader.u8()? as usize;
    let mut reader = Reader::at(data, header_size);
    let _names = read_index(data, &mut reader)?;
    let top_dicts = read_index(data, &mut reader)?;
    let strings = read_index(data, &mut reader)?;
    let top = top_dicts
        .items
        .first()
        .ok_or_else(|| PdfError::font("CFF table has no top DICT"))?;
    let entries = parse_dict(top)?;
    let operand = |op: u16| {
        entries
            .iter()
            .find(|(key, _)| *key == op)
            .map(|(_, values)| values.clone())
    };

    let ros = operand(OP_ROS).and_then(|values| {
        if values.len() < 3 {
            return None;
        }
        let defaults = Ros::default();
        Some(Ros {
            registry: custom_string(&strings, values[0] as usize).unwrap_or(defaults.registry),
            ordering: custom_string(&strings, values[1] as usize).unwrap_or(defaults.ordering),
            supplement: values[2] as i64,
        })
    });
    let cid_keyed = ros.is_some();

    let glyph_count = match operand(OP_CHARSTRINGS).and_then(|v| v.first().copied()) {
        Some(offset) => {
            let mut charstrings = Reader::at(data, offset as usize);
            charstrings.u16()? as usize
        }
        None => 0,
    };
    let charset_offset = operand(OP_CHARSET)
        .and_then(|v| v.first().copied())
        .unwrap_or(0.0) as usize;
    let gid_to_cid = if cid_keyed && charset_offset > 2 && glyph_count > 0 {
        read_charset(data, charset_offset, glyph_count)?
    } else {
        (0..glyph_count as u32).collect()
    };

    Ok(CffInfo {
        cid_keyed,
        ros,
        gid_to_cid,
    })
}

#[cfg(test)]
pub(crate) fn build_cid_cff(registry: &str, ordering: &str, supplement: i32, cids: &[u16]) -> Vec<u8> {
    fn index(items: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(items.len() as u16).to_be_bytes());
        if items.is_empty() {
            return out;
        }
        out.push(4);
        let mut offset = 1u32;
        out.extend_from_slice(&offset.to_be_bytes());
        for item in items {
            offset += item.len() as u32;
            out.extend_from_slice(&offset.to_be_bytes());
        }
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }
    fn int29(value: i32) -> Vec<u8> {
        let mut out = vec![29];
        out.extend_from_slice(&value.to_be_bytes());
        out
    }

    let header = vec![1, 0, 4, 4];
    let names = index(&[b"TestCID".to_vec()]);
    let strings = index(&[registry.as_bytes().to_vec(), ordering.as_bytes().to_vec()]);
    let glyph_count = cids.len() + 1;
    let charstrings = index(&vec![vec![14u8]; glyph_count]);
    let mut charset = vec![0u8];
    for cid in cids {
        charset.extend_from_slice(&cid.to_be_bytes());
    }

    // Fixed-width operands keep the top DICT size independent of the offsets.
    let top_len = 5 * 3 + 2 + 5 + 1 + 5 + 1;
    let top_index_len = 2 + 1 + 8 + top_len;
    let base = header.len() + names.len() + top_index_len + strings.len();
    let global_subrs = index(&[]);
    let charset_offset = base + global_subrs.len();
    let charstrings_offset = charset_offset + charset.len();

    let mut top = Vec::new();
    top.extend(int29(391));
    top.extend(int29(392));
    top.extend(int29(supplement));
    top.extend_from_slice(&[12, 30]);
    top.extend(int29(charset_offset as i32));
    top.push(15);
    top.extend(int29(charstrings_offset as i32));
    top.push(17);

    let mut out = header;
    out.extend(names);
    out.extend(index(&[top]));
    out.extend(strings);
    out.extend(global_subrs);
    out.extend(charset);
    out.extend(charstrings);
    out
}
