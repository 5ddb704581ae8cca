//! Synthetic sfnt fonts for tests, assembled with the crate's own writer.

use crate::subset::write_sfnt;

struct GlyphSpec {
    ch: Option<char>,
    advance: u16,
    outline: bool,
}

pub(crate) struct FontBuilder {
    units_per_em: u16,
    glyphs: Vec<GlyphSpec>,
    extra: Vec<([u8; 4], Vec<u8>)>,
    with_glyf: bool,
}

impl FontBuilder {
    /// A font with a boxed `.notdef` at glyph 0.
    pub(crate) fn new() -> Self {
        Self {
            units_per_em: 1000,
            glyphs: vec![GlyphSpec {
                ch: None,
                advance: 500,
                outline: true,
            }],
            extra: Vec::new(),
            with_glyf: true,
        }
    }

    pub(crate) fn units_per_em(mut self, units: u16) -> Self {
        self.units_per_em = units;
        self
    }

    /// Adds a glyph with a rectangular outline; its id is the insertion order.
    pub(crate) fn glyph(mut self, ch: char, advance: u16) -> Self {
        self.glyphs.push(GlyphSpec {
            ch: Some(ch),
            advance,
            outline: true,
        });
        self
    }

    pub(crate) fn empty_glyph(mut self, ch: char, advance: u16) -> Self {
        self.glyphs.push(GlyphSpec {
            ch: Some(ch),
            advance,
            outline: false,
        });
        self
    }

    pub(crate) fn table(mut self, tag: [u8; 4], data: Vec<u8>) -> Self {
        self.extra.push((tag, data));
        self
    }

    /// Drops `glyf`/`loca`, leaving a bitmap-only font.
    pub(crate) fn without_outlines(mut self) -> Self {
        self.with_glyf = false;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let count = self.glyphs.len() as u16;
        let mut tables: Vec<([u8; 4], Vec<u8>)> = vec![
            (*b"head", self.head()),
            (*b"hhea", self.hhea()),
            (*b"maxp", maxp(count)),
            (*b"hmtx", self.hmtx()),
            (*b"cmap", self.cmap()),
            (*b"post", post()),
        ];
        if self.with_glyf {
            let (loca, glyf) = self.outlines();
            tables.push((*b"loca", loca));
            tables.push((*b"glyf", glyf));
        }
        tables.extend(self.extra);
        write_sfnt(0x0001_0000, &tables)
    }

    fn head(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        out.extend_from_slice(&0x000Bu16.to_be_bytes());
        out.extend_from_slice(&self.units_per_em.to_be_bytes());
        out.extend_from_slice(&[0; 16]);
        out.extend_from_slice(&0i16.to_be_bytes());
        out.extend_from_slice(&(-200i16).to_be_bytes());
        out.extend_from_slice(&1000i16.to_be_bytes());
        out.extend_from_slice(&800i16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&8u16.to_be_bytes());
        out.extend_from_slice(&2i16.to_be_bytes());
        out.extend_from_slice(&1i16.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        out
    }

    fn hhea(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&800i16.to_be_bytes());
        out.extend_from_slice(&(-200i16).to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        let max_advance = self.glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
        out.extend_from_slice(&max_advance.to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        out.extend_from_slice(&1i16.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&0i16.to_be_bytes());
        out.extend_from_slice(&(self.glyphs.len() as u16).to_be_bytes());
        out
    }

    fn hmtx(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for glyph in &self.glyphs {
            out.extend_from_slice(&glyph.advance.to_be_bytes());
            out.extend_from_slice(&0i16.to_be_bytes());
        }
        out
    }

    fn cmap(&self) -> Vec<u8> {
        let mut mapped: Vec<(u32, u32)> = self
            .glyphs
            .iter()
            .enumerate()
            .filter_map(|(gid, glyph)| glyph.ch.map(|ch| (ch as u32, gid as u32)))
            .collect();
        mapped.sort();
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&3u16.to_be_bytes());
        out.extend_from_slice(&10u16.to_be_bytes());
        out.extend_from_slice(&12u32.to_be_bytes());
        out.extend_from_slice(&12u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(16 + 12 * mapped.len() as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(mapped.len() as u32).to_be_bytes());
        for (cp, gid) in mapped {
            out.extend_from_slice(&cp.to_be_bytes());
            out.extend_from_slice(&cp.to_be_bytes());
            out.extend_from_slice(&gid.to_be_bytes());
        }
        out
    }

    fn outlines(&self) -> (Vec<u8>, Vec<u8>) {
        let mut loca = Vec::new();
        let mut glyf = Vec::new();
        for glyph in &self.glyphs {
            loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
            if glyph.outline {
                glyf.extend_from_slice(&square(glyph.advance as i16));
            }
        }
        loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
        (loca, glyf)
    }
}

fn maxp(count: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0000_5000u32.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out
}

fn post() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0003_0000u32.to_be_bytes());
    out.extend_from_slice(&[0; 28]);
    out
}

/// One closed rectangular contour, `(50, 0)` to `(advance - 50, 700)`.
fn square(advance: i16) -> Vec<u8> {
    let x_max = (advance - 50).max(51);
    let mut out = Vec::new();
    out.extend_from_slice(&1i16.to_be_bytes());
    for value in [50, 0, x_max, 700] {
        out.extend_from_slice(&(value as i16).to_be_bytes());
    }
    out.extend_from_slice(&3u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&[1, 1, 1, 1]);
    for dx in [50, x_max - 50, 0, 50 - x_max] {
        out.extend_from_slice(&(dx as i16).to_be_bytes());
    }
    for dy in [0i16, 0, 700, 0] {
        out.extend_from_slice(&dy.to_be_bytes());
    }
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}
