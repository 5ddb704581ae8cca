//! `ItemVariationStore` and `DeltaSetIndexMap`, evaluated eagerly at one
//! normalized design-space location.

use crate::error::{PdfError, Result};
use crate::subset::Reader;

pub(crate) const NO_VARIATION_INDEX: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq)]
struct RegionAxis {
    start: f32,
    peak: f32,
    end: f32,
}

impl RegionAxis {
    fn scalar(&self, coord: f32) -> f32 {
        let RegionAxis { start, peak, end } = *self;
        if start > peak || peak > end {
            return 1.0;
        }
        if start < 0.0 && end > 0.0 && peak != 0.0 {
            return 1.0;
        }
        if peak == 0.0 || coord == peak {
            return 1.0;
        }
        if coord <= start || coord >= end {
            return 0.0;
        }
        if coord < peak {
            (coord - start) / (peak - start)
        } else {
            (end - coord) / (end - peak)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ItemVariationData {
    region_indexes: Vec<u16>,
    deltas: Vec<Vec<i32>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ItemVariationStore {
    regions: Vec<Vec<RegionAxis>>,
    data: Vec<ItemVariationData>,
}

impl ItemVariationStore {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let format = reader.u16()?;
        if format != 1 {
            return Err(PdfError::font(format!(
                "unknown item variation store format {format}"
            )));
        }
        let region_list = reader.u32()? as usize;
        let data_count = reader.u16()? as usize;
        let mut data_offsets = Vec::with_capacity(data_count);
        for _ in 0..data_count {
            data_offsets.push(reader.u32()? as usize);
        }

        let mut regions = Vec::new();
        if region_list != 0 {
            let mut reader = Reader::at(data, region_list);
            let axis_count = reader.u16()? as usize;
            let region_count = reader.u16()? as usize;
            for _ in 0..region_count {
                let mut axes = Vec::with_capacity(axis_count);
                for _ in 0..axis_count {
                    axes.push(RegionAxis {
                        start: reader.f2dot14()?,
                        peak: reader.f2dot14()?,
                        end: reader.f2dot14()?,
                    });
                }
                regions.push(axes);
            }
        }

        let mut items = Vec::with_capacity(data_count);
        for offset in data_offsets {
            items.push(parse_variation_data(data, offset)?);
        }
        Ok(Self {
            regions,
            data: items,
        })
    }

    /// Raw (unscaled) delta of one item at `coords`.
    pub(crate) fn delta(&self, outer: u16, inner: u16, coords: &[f32]) -> f32 {
        let Some(item) = self.data.get(outer as usize) else {
            return 0.0;
        };
        let Some(row) = item.deltas.get(inner as usize) else {
            return 0.0;
        };
        let mut total = 0.0;
        for (region_index, delta) in item.region_indexes.iter().zip(row) {
            let Some(region) = self.regions.get(*region_index as usize) else {
                continue;
            };
            let scalar = region
                .iter()
                .enumerate()
                .map(|(axis, range)| range.scalar(coords.get(axis).copied().unwrap_or(0.0)))
                .product::<f32>();
            total += scalar * *delta as f32;
        }
        total
    }
}

fn parse_variation_data(data: &[u8], offset: usize) -> Result<ItemVariationData> {
    let mut reader = Reader::at(data, offset);
    let item_count = reader.u16()? as usize;
    let word_delta_count = reader.u16()?;
    let region_count = reader.u16()? as usize;
    let long_words = word_delta_count & 0x8000 != 0;
    let word_count = (word_delta_count & 0x7FFF) as usize;
    let mut region_indexes = Vec::with_capacity(region_count);
    for _ in 0..region_count {
        region_indexes.push(reader.u16()?);
    }
    let mut deltas = Vec::with_capacity(item_count);
    for _ in 0..item_count {
        let mut row = Vec::with_capacity(region_count);
        for column in 0..region_count {
            let value = match (column < word_count, long_words) {
                (true, true) => reader.i32()?,
                (true, false) => reader.i16()? as i32,
                (false, true) => reader.i16()? as i32,
                (false, false) => reader.i8()? as i32,
            };
            row.push(value);
        }
        deltas.push(row);
    }
    Ok(ItemVariationData {
        region_indexes,
        deltas,
    })
}

/// Maps a variation index to an `(outer, inner)` store address.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DeltaSetIndexMap {
    entries: Vec<(u16, u16)>,
}

impl DeltaSetIndexMap {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let format = reader.u8()?;
        let entry_format = reader.u8()?;
        let count = match format {
            0 => reader.u16()? as usize,
            1 => reader.u32()? as usize,
            other => {
                return Err(PdfError::font(format!(
                    "unknown delta set index map format {other}"
                )));
            }
        };
        let entry_size = ((entry_format >> 4) & 0x3) as usize + 1;
        let inner_bits = (entry_format & 0xF) as u32 + 1;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let mut entry = 0u32;
            for _ in 0..entry_size {
                entry = (entry << 8) | reader.u8()? as u32;
            }
            entries.push((
                (entry >> inner_bits) as u16,
                (entry & ((1 << inner_bits) - 1)) as u16,
            ));
        }
        Ok(Self { entries })
    }

    fn map(&self, index: u32) -> (u16, u16) {
        match self.entries.get(index as usize).or(self.entries.last()) {
            Some(entry) => *entry,
            None => ((index >> 16) as u16, (index & 0xFFFF) as u16),
        }
    }
}

/// Variation store plus the location it is evaluated at. All-zero
/// coordinates are the default instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct VariationResolver {
    store: ItemVariationStore,
    index_map: Option<DeltaSetIndexMap>,
    coords: Vec<f32>,
}

impl VariationResolver {
    pub(crate) fn new(
        store: ItemVariationStore,
        index_map: Option<DeltaSetIndexMap>,
        coords: Vec<f32>,
    ) -> Self {
        Self {
            store,
            index_map,
            coords,
        }
    }

    /// Delta for field `field` of a record whose first variation index is `base`.
    pub(crate) fn delta(&self, base: u32, field: u32) -> f32 {
        if base == NO_VARIATION_INDEX {
            return 0.0;
        }
        let index = base.wrapping_add(field);
        let (outer, inner) = match &self.index_map {
            Some(map) => map.map(index),
            None => ((index >> 16) as u16, (index & 0xFFFF) as u16),
        };
        self.store.delta(outer, inner, &self.coords)
    }
}

/// One `fvar` axis, in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DesignAxis {
    pub(crate) tag: [u8; 4],
    min: f32,
    default: f32,
    max: f32,
}

impl DesignAxis {
    fn normalize(&self, value: f32) -> f32 {
        let value = value.clamp(self.min, self.max);
        if value < self.default && self.default > self.min {
            (value - self.default) / (self.default - self.min)
        } else if value > self.default && self.max > self.default {
            (value - self.default) / (self.max - self.default)
        } else {
            0.0
        }
    }
}

pub(crate) fn design_axes(fvar: &[u8]) -> Result<Vec<DesignAxis>> {
    let mut reader = Reader::new(fvar);
    let version = reader.u32()?;
    if version >> 16 != 1 {
        return Err(PdfError::font(format!("unknown fvar version {version:#010x}")));
    }
    let axes_offset = reader.u16()? as usize;
    let _reserved = reader.u16()?;
    let count = reader.u16()? as usize;
    let axis_size = reader.u16()? as usize;
    let mut axes = Vec::with_capacity(count);
    for idx in 0..count {
        let mut record = Reader::at(fvar, axes_offset + idx * axis_size);
        let mut tag = [0u8; 4];
        tag.copy_from_slice(record.bytes(4)?);
        axes.push(DesignAxis {
            tag,
            min: record.fixed()?,
            default: record.fixed()?,
            max: record.fixed()?,
        });
    }
    Ok(axes)
}

/// Normalized coordinates, one per `fvar` axis, for the `requested` user
/// values. Unlisted axes stay at their default; `avar` segment maps apply.
pub(crate) fn normalize_location(
    fvar: &[u8],
    avar: Option<&[u8]>,
    requested: &[([u8; 4], f32)],
) -> Result<Vec<f32>> {
    let axes = design_axes(fvar)?;
    let mut coords: Vec<f32> = axes
        .iter()
        .map(|axis| {
            requested
                .iter()
                .rev()
                .find(|(tag, _)| *tag == axis.tag)
                .map(|(_, value)| axis.normalize(*value))
                .unwrap_or(0.0)
        })
        .collect();
    if let Some(avar) = avar {
        let maps = segment_maps(avar)?;
        for (coord, map) in coords.iter_mut().zip(&maps) {
            *coord = map_segment(map, *coord);
        }
    }
    Ok(coords
        .into_iter()
        .map(|coord| (coord * 16384.0).round() / 16384.0)
        .collect())
}

fn segment_maps(avar: &[u8]) -> Result<Vec<Vec<(f32, f32)>>> {
    let mut reader = Reader::new(avar);
    let _major = reader.u16()?;
    let _minor = reader.u16()?;
    let _reserved = reader.u16()?;
    let count = reader.u16()? as usize;
    let mut maps = Vec::with_capacity(count);
    for _ in 0..count {
        let pairs = reader.u16()? as usize;
        let mut map = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            map.push((reader.f2dot14()?, reader.f2dot14()?));
        }
        maps.push(map);
    }
    Ok(maps)
}

/// Piecewise-linear `avar` mapping; maps with fewer than two pairs are identity.
fn map_segment(map: &[(f32, f32)], coord: f32) -> f32 {
    if map.len() < 2 {
        return coord;
    }
    for pair in map.windows(2) {
        let ((from0, to0), (from1, to1)) = (pair[0], pair[1]);
        if coord <= from1 {
            if coord <= from0 {
                return to0;
            }
            if from1 - from0 <= f32::EPSILON {
                return to1;
            }
            return to0 + (to1 - to0) * (coord - from0) / (from1 - from0);
        }
    }
    map[map.len() - 1].1
}

/// An `fvar` table; axes are `(tag, min, default, max)` in user units.
#[cfg(test)]
pub(crate) fn build_fvar(axes: &[([u8; 4], f32, f32, f32)]) -> Vec<u8> {
    let fixed = |value: f32| ((value * 65536.0).round() as i32).to_be_bytes();
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&16u16.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes());
    out.extend_from_slice(&(axes.len() as u16).to_be_bytes());
    out.extend_from_slice(&20u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(4 + 4 * axes.len() as u16).to_be_bytes());
    for (tag, min, default, max) in axes {
        out.extend_from_slice(tag);
        out.extend_from_slice(&fixed(*min));
        out.extend_from_slice(&fixed(*default));
        out.extend_from_slice(&fixed(*max));
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&256u16.to_be_bytes());
    }
    out
}

#[cfg(test)]
pub(crate) fn build_store(regions: &[(f32, f32, f32)], deltas: &[&[i16]]) -> Vec<u8> {
    fn f2dot14(value: f32) -> [u8; 2] {
        ((value * 16384.0).round() as i16).to_be_bytes()
    }
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes());
    let header_len = 2 + 4 + 2 + 4;
    out.extend_from_slice(&(header_len as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    let region_list_len = 4 + regions.len() * 6;
    out.extend_from_slice(&((header_len + region_list_len) as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    for (start, peak, end) in regions {
        out.extend_from_slice(&f2dot14(*start));
        out.extend_from_slice(&f2dot14(*peak));
        out.extend_from_slice(&f2dot14(*end));
    }
    out.extend_from_slice(&(deltas.len() as u16).to_be_bytes());
    out.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    out.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    for idx in 0..regions.len() {
        out.extend_from_slice(&(idx as u16).to_be_bytes());
    }
    for row in deltas {
        for delta in row.iter() {
            out.extend_from_slice(&delta.to_be_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(coords: Vec<f32>) -> VariationResolver {
        let data = build_store(&[(0.0, 1.0, 1.0)], &[&[100], &[-40]]);
        VariationResolver::new(ItemVariationStore::parse(&data).unwrap(), None, coords)
    }

    #[test]
    fn delta_is_zero_at_default_location() {
        let resolver = resolver(vec![0.0]);
        assert_eq!(resolver.delta(0, 0), 0.0);
        assert_eq!(resolver.delta(0, 1), 0.0);
        assert_eq!(VariationResolver::default().delta(0, 0), 0.0);
    }

    #[test]
    fn delta_scales_with_region() {
        let resolver = resolver(vec![0.5]);
        assert_eq!(resolver.delta(0, 0), 50.0);
        assert_eq!(resolver.delta(0, 1), -20.0);
        assert_eq!(resolver.delta(NO_VARIATION_INDEX, 0), 0.0);
        let full = self::resolver(vec![1.0]);
        assert_eq!(full.delta(1, 0), -40.0);
    }

    #[test]
    fn user_values_normalize_around_the_default() {
        let fvar = build_fvar(&[(*b"wght", 100.0, 400.0, 900.0), (*b"wdth", 50.0, 100.0, 100.0)]);
        let axes = design_axes(&fvar).unwrap();
        assert_eq!(axes.len(), 2);
        assert_eq!(axes[1].tag, *b"wdth");
        assert_eq!(normalize_location(&fvar, None, &[]).unwrap(), vec![0.0, 0.0]);
        assert_eq!(
            normalize_location(&fvar, None, &[(*b"wght", 650.0), (*b"wdth", 75.0)]).unwrap(),
            vec![0.5, -0.5]
        );
        assert_eq!(
            normalize_location(&fvar, None, &[(*b"wght", 2000.0), (*b"wdth", 500.0)]).unwrap(),
            vec![1.0, 0.0]
        );
    }

    #[test]
    fn avar_segments_remap_coordinates() {
        let fvar = build_fvar(&[(*b"wght", 100.0, 400.0, 900.0)]);
        let mut avar = vec![0, 1, 0, 0, 0, 0, 0, 1, 0, 4];
        for (from, to) in [(-1.0f32, -1.0f32), (0.0, 0.0), (0.5, 0.25), (1.0, 1.0)] {
            avar.extend_from_slice(&((from * 16384.0) as i16).to_be_bytes());
            avar.extend_from_slice(&((to * 16384.0) as i16).to_be_bytes());
        }
        let at = |value| normalize_location(&fvar, Some(&avar), &[(*b"wght", value)]).unwrap();
        assert_eq!(at(650.0), vec![0.25]);
        assert_eq!(at(775.0), vec![0.625]);
        assert_eq!(at(250.0), vec![-0.5]);
    }

    #[test]
    fn index_map_entries_split_outer_and_inner() {
        // format 0, 1-byte entries, 4 inner bits: 0x21 -> (2, 1)
        let map = DeltaSetIndexMap::parse(&[0, 0x03, 0, 2, 0x21, 0x05]).unwrap();
        assert_eq!(map.map(0), (2, 1));
        assert_eq!(map.map(1), (0, 5));
        assert_eq!(map.map(9), (0, 5));
    }
}
