use crate::debug::DebugLogger;
use crate::error::Result;
use crate::subset::Reader;
use crate::types::{Rgba, TextColor};

/// Palette entry that stands for the current text color.
pub(crate) const FOREGROUND_INDEX: u16 = 0xFFFF;

/// Color palettes of a `CPAL` table, channels normalized to 0..=1.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Palettes {
    palettes: Vec<Vec<Rgba>>,
}

impl Palettes {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let _version = reader.u16()?;
        let entries = reader.u16()? as usize;
        let count = reader.u16()? as usize;
        let _records = reader.u16()?;
        let records_offset = reader.u32()? as usize;
        let mut palettes = Vec::with_capacity(count);
        for _ in 0..count {
            let first = reader.u16()? as usize;
            let mut colors = Vec::with_capacity(entries);
            let mut record = Reader::at(data, records_offset + first * 4);
            for _ in 0..entries {
                let b = record.u8()?;
                let g = record.u8()?;
                let r = record.u8()?;
                let a = record.u8()?;
                colors.push(Rgba::new(
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    a as f32 / 255.0,
                ));
            }
            palettes.push(colors);
        }
        Ok(Self { palettes })
    }

    pub(crate) fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Picks palette `index`; an unknown index degrades to palette 0.
    pub(crate) fn select(&self, index: usize, debug: Option<&DebugLogger>) -> Palette {
        let chosen = if index < self.palettes.len() {
            index
        } else {
            if let Some(debug) = debug {
                debug.event(
                    "colr.palette_out_of_range",
                    &[
                        ("palette", index.to_string()),
                        ("available", self.palettes.len().to_string()),
                    ],
                );
            }
            0
        };
        Palette {
            colors: self.palettes.get(chosen).cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Palette {
    colors: Vec<Rgba>,
}

impl Palette {
    /// Resolves a palette entry, multiplying `alpha` into its own alpha.
    pub(crate) fn color(&self, index: u16, alpha: f32, text_color: TextColor) -> Rgba {
        let base = if index == FOREGROUND_INDEX {
            let (r, g, b) = text_color.to_rgb();
            Rgba::new(r, g, b, 1.0)
        } else {
            self.colors.get(index as usize).copied().unwrap_or(Rgba::BLACK)
        };
        Rgba {
            a: base.a * alpha,
            ..base
        }
    }
}

#[cfg(test)]
pub(crate) fn build_cpal(palettes: &[&[[u8; 4]]]) -> Vec<u8> {
    let entries = palettes.first().map(|p| p.len()).unwrap_or(0);
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(entries as u16).to_be_bytes());
    out.extend_from_slice(&(palettes.len() as u16).to_be_bytes());
    out.extend_from_slice(&((entries * palettes.len()) as u16).to_be_bytes());
    let records_offset = 12 + 2 * palettes.len();
    out.extend_from_slice(&(records_offset as u32).to_be_bytes());
    for idx in 0..palettes.len() {
        out.extend_from_slice(&((idx * entries) as u16).to_be_bytes());
    }
    for palette in palettes {
        for [r, g, b, a] in palette.iter() {
            out.extend_from_slice(&[*b, *g, *r, *a]);
        }
    }
    out
}
