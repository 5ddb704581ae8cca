//! Evaluates `COLR` glyphs into [`DrawNode`] trees.

use std::collections::HashSet;

use crate::colr::{ColorGlyph, ColorLine, ColrTable, CompositeMode, Extend, Paint};
use crate::cpal::Palette;
use crate::debug::DebugLogger;
use crate::draw::{DrawNode, Fill, Path, coverage_mask, glyph_outline};
use crate::error::Result;
use crate::resources::SoftMask;
use crate::shading::{ColorStop, Gradient, GradientGeometry, Pattern};
use crate::types::{Matrix, Rect, Rgba, TextColor};

const MAX_UNROLLED_CYCLES: i32 = 64;
const SWEEP_STEP_DEGREES: f32 = 2.0;

/// Glyph contours by glyph id.
pub(crate) trait OutlineSource {
    fn outline(&self, gid: u16) -> Option<Path>;
}

impl OutlineSource for ttf_parser::Face<'_> {
    fn outline(&self, gid: u16) -> Option<Path> {
        glyph_outline(self, gid)
    }
}

pub(crate) struct PaintContext<'a> {
    pub(crate) table: &'a ColrTable<'a>,
    pub(crate) outlines: &'a dyn OutlineSource,
    pub(crate) palette: &'a Palette,
    pub(crate) text_color: TextColor,
    /// Area leaf paints cover, normally the font bounding box.
    pub(crate) surface: Rect,
    pub(crate) debug: Option<&'a DebugLogger>,
}

impl PaintContext<'_> {
    /// Drawing for color glyph `gid`, empty when the table has no entry.
    pub(crate) fn render_glyph(&self, gid: u16) -> Result<Vec<DrawNode>> {
        let mut visited = HashSet::from([gid]);
        self.color_glyph(gid, Matrix::identity(), &mut visited)
    }

    fn color_glyph(
        &self,
        gid: u16,
        ctm: Matrix,
        visited: &mut HashSet<u16>,
    ) -> Result<Vec<DrawNode>> {
        let nodes = match self.table.glyph(gid)? {
            None => return Ok(Vec::new()),
            Some(ColorGlyph::Layers(layers)) => layers
                .into_iter()
                .filter_map(|(layer_gid, palette_index)| {
                    let path = self.outlines.outline(layer_gid)?.transformed(ctm);
                    let color = self.palette.color(palette_index, 1.0, self.text_color);
                    Some(DrawNode::Fill {
                        path,
                        fill: Fill::Solid(color),
                    })
                })
                .collect(),
            Some(ColorGlyph::Paint(paint)) => self.paint(&paint, ctm, visited)?,
        };
        match self.table.clip_box(gid, self.debug)? {
            Some(clip) if !nodes.is_empty() => Ok(vec![DrawNode::Clip {
                path: Path::rect(clip).transformed(ctm),
                children: nodes,
            }]),
            _ => Ok(nodes),
        }
    }

    fn paint(&self, paint: &Paint, ctm: Matrix, visited: &mut HashSet<u16>) -> Result<Vec<DrawNode>> {
        match paint {
            Paint::Layers(layers) => {
                let mut out = Vec::new();
                for layer in layers {
                    out.extend(self.paint(layer, ctm, visited)?);
                }
                Ok(out)
            }
            Paint::Solid {
                palette_index,
                alpha,
            } => Ok(vec![self.cover(Fill::Solid(self.palette.color(
                *palette_index,
                *alpha,
                self.text_color,
            )))]),
            Paint::LinearGradient { line, p0, p1, p2 } => {
                let end = linear_end(*p0, *p1, *p2);
                Ok(self.gradient(line, ctm, GradientShape::Linear(*p0, end)))
            }
            Paint::RadialGradient { line, c0, r0, c1, r1 } => Ok(self.gradient(
                line,
                ctm,
                GradientShape::Radial(*c0, r0.max(0.0), *c1, r1.max(1e-6)),
            )),
            Paint::SweepGradient {
                line,
                center,
                start_angle,
                end_angle,
            } => Ok(self.sweep(line, ctm, *center, *start_angle, *end_angle)),
            Paint::Glyph { glyph_id, paint } => {
                let Some(outline) = self.outlines.outline(*glyph_id) else {
                    return Ok(Vec::new());
                };
                let clip = outline.transformed(ctm);
                let mut children = self.paint(paint, ctm, visited)?;
                if children.len() == 1 {
                    if let DrawNode::Fill { path, .. } = &children[0] {
                        if *path == Path::rect(self.surface) {
                            if let Some(DrawNode::Fill { fill, .. }) = children.pop() {
                                return Ok(vec![DrawNode::Fill { path: clip, fill }]);
                            }
                        }
                    }
                }
                Ok(vec![DrawNode::Clip {
                    path: clip,
                    children,
                }])
            }
            Paint::ColrGlyph(gid) => {
                if visited.contains(gid) {
                    if let Some(debug) = self.debug {
                        debug.event("colr.cycle_skipped", &[("glyph", gid.to_string())]);
                    }
                    return Ok(Vec::new());
                }
                visited.insert(*gid);
                let out = self.color_glyph(*gid, ctm, visited);
                visited.remove(gid);
                out
            }
            Paint::Transform { matrix, paint } => self.paint(paint, ctm.mul(*matrix), visited),
            Paint::Composite {
                source,
                mode,
                backdrop,
            } => {
                let source = self.paint(source, ctm, visited)?;
                let backdrop = self.paint(backdrop, ctm, visited)?;
                Ok(self.composite(source, *mode, backdrop))
            }
        }
    }

    /// Porter-Duff operators restrict one layer to the coverage of the other
    /// through a soft mask; blend modes map to an `/ExtGState` blend group
    /// over the backdrop.
    fn composite(
        &self,
        source: Vec<DrawNode>,
        mode: CompositeMode,
        backdrop: Vec<DrawNode>,
    ) -> Vec<DrawNode> {
        let over = |mut below: Vec<DrawNode>, above: Vec<DrawNode>| {
            below.extend(above);
            below
        };
        match mode {
            CompositeMode::Clear => Vec::new(),
            CompositeMode::Source => source,
            CompositeMode::Destination => backdrop,
            CompositeMode::SourceOver => over(backdrop, source),
            CompositeMode::DestinationOver => over(source, backdrop),
            CompositeMode::SourceIn => self.restrict(source, &backdrop, false),
            CompositeMode::DestinationIn => self.restrict(backdrop, &source, false),
            CompositeMode::SourceOut => self.restrict(source, &backdrop, true),
            CompositeMode::DestinationOut => self.restrict(backdrop, &source, true),
            CompositeMode::SourceAtop => {
                let top = self.restrict(source, &backdrop, false);
                over(backdrop, top)
            }
            CompositeMode::DestinationAtop => {
                let top = self.restrict(backdrop, &source, false);
                over(source, top)
            }
            CompositeMode::Xor => {
                let kept_source = self.restrict(source.clone(), &backdrop, true);
                let kept_backdrop = self.restrict(backdrop, &source, true);
                over(kept_source, kept_backdrop)
            }
            CompositeMode::Blend(mode) => {
                let mut out = backdrop;
                if !source.is_empty() {
                    out.push(DrawNode::Blend {
                        mode,
                        children: source,
                    });
                }
                out
            }
        }
    }

    /// `layer` limited to where `mask` paints, or with `outside`, to where
    /// it does not. A single opaque fill restricts by clipping.
    fn restrict(&self, layer: Vec<DrawNode>, mask: &[DrawNode], outside: bool) -> Vec<DrawNode> {
        if layer.is_empty() {
            return Vec::new();
        }
        if mask.is_empty() {
            return if outside { layer } else { Vec::new() };
        }
        if let [DrawNode::Fill {
            path,
            fill: Fill::Solid(color),
        }] = mask
        {
            if !outside && color.a >= 1.0 {
                return vec![DrawNode::Clip {
                    path: path.clone(),
                    children: layer,
                }];
            }
        }
        vec![DrawNode::Masked {
            mask: SoftMask::Vector(coverage_mask(mask, self.surface, outside)),
            children: layer,
        }]
    }

    fn cover(&self, fill: Fill) -> DrawNode {
        DrawNode::Fill {
            path: Path::rect(self.surface),
            fill,
        }
    }

    fn resolve_stops(&self, stops: &[(f32, u16, f32)]) -> Vec<ColorStop> {
        stops
            .iter()
            .map(|(offset, palette_index, alpha)| ColorStop {
                offset: *offset,
                color: self.palette.color(*palette_index, *alpha, self.text_color),
            })
            .collect()
    }

    /// The surface in paint space, where gradient geometry lives.
    fn paint_space_surface(&self, ctm: Matrix) -> Rect {
        match ctm.invert() {
            Some(inverse) => self.surface.transformed(inverse),
            None => self.surface,
        }
    }

    fn gradient(&self, line: &ColorLine, ctm: Matrix, shape: GradientShape) -> Vec<DrawNode> {
        let (stops, t0, t1) = match normalize_color_line(line) {
            NormalizedLine::Empty => return Vec::new(),
            NormalizedLine::Solid(palette_index, alpha) => {
                return vec![self.cover(Fill::Solid(self.palette.color(
                    palette_index,
                    alpha,
                    self.text_color,
                )))];
            }
            NormalizedLine::Stops { stops, t0, t1 } => (stops, t0, t1),
        };
        let shape = shape.slice(t0, t1);
        let (stops, shape) = if line.extend == Extend::Pad {
            (stops, shape)
        } else {
            let (lo, hi) = shape.coverage(self.paint_space_surface(ctm));
            (
                unroll(&stops, line.extend, lo, hi),
                shape.slice(lo as f32, hi as f32),
            )
        };
        let gradient = Gradient {
            geometry: shape.geometry(),
            stops: self.resolve_stops(&stops),
            extend: true,
        };
        vec![self.cover(Fill::Gradient(Pattern {
            gradient,
            matrix: ctm,
        }))]
    }

    fn sweep(
        &self,
        line: &ColorLine,
        ctm: Matrix,
        center: (f32, f32),
        start_angle: f32,
        end_angle: f32,
    ) -> Vec<DrawNode> {
        let (stops, t0, t1) = match normalize_color_line(line) {
            NormalizedLine::Empty => return Vec::new(),
            NormalizedLine::Solid(palette_index, alpha) => {
                return vec![self.cover(Fill::Solid(self.palette.color(
                    palette_index,
                    alpha,
                    self.text_color,
                )))];
            }
            NormalizedLine::Stops { stops, t0, t1 } => (stops, t0, t1),
        };
        let (start, span) = sweep_angles(start_angle, end_angle);
        // Sub-range of the sweep the normalized stops cover.
        let start = start + span * t0;
        let span = span * (t1 - t0);
        let colors = self.resolve_stops(&stops);

        let surface = self.paint_space_surface(ctm);
        let radius = [
            (surface.x_min, surface.y_min),
            (surface.x_max, surface.y_min),
            (surface.x_max, surface.y_max),
            (surface.x_min, surface.y_max),
        ]
        .iter()
        .map(|(x, y)| ((x - center.0).powi(2) + (y - center.1).powi(2)).sqrt())
        .fold(1.0f32, f32::max)
            * 1.5;

        let wedges = (360.0 / SWEEP_STEP_DEGREES) as usize;
        let mut out = Vec::with_capacity(wedges);
        for wedge in 0..wedges {
            let a0 = wedge as f32 * SWEEP_STEP_DEGREES;
            let a1 = a0 + SWEEP_STEP_DEGREES;
            let mid = (a0 + a1) / 2.0;
            let mut t = (mid - start).rem_euclid(360.0) / span.max(1e-6);
            if t > 1.0 {
                // Angles outside the sweep sit either after its end or before its start.
                let before = (start - mid).rem_euclid(360.0) / span.max(1e-6);
                t = if before < t - 1.0 { -before } else { t };
            }
            let t = apply_extend(t, line.extend);
            let color = color_at(&colors, t);
            let point = |deg: f32| {
                let rad = deg.to_radians();
                (
                    center.0 + radius * libm::cosf(rad),
                    center.1 + radius * libm::sinf(rad),
                )
            };
            let path = Path::polygon(&[center, point(a0), point(a1)]).transformed(ctm);
            out.push(DrawNode::Fill {
                path,
                fill: Fill::Solid(color),
            });
        }
        out
    }
}

/// End of the gradient vector: `p1` projected onto the line through `p0`
/// perpendicular to `p0 p2`.
fn linear_end(p0: (f32, f32), p1: (f32, f32), p2: (f32, f32)) -> (f32, f32) {
    let u = (p2.0 - p0.0, p2.1 - p0.1);
    let v = (p1.0 - p0.0, p1.1 - p0.1);
    let len2 = u.0 * u.0 + u.1 * u.1;
    if len2 < 1e-12 {
        return p1;
    }
    let k = (v.0 * u.0 + v.1 * u.1) / len2;
    (p0.0 + v.0 - u.0 * k, p0.1 + v.1 - u.1 * k)
}

/// Start and span in degrees, span in `(0, 360]`.
fn sweep_angles(start: f32, end: f32) -> (f32, f32) {
    let start = start % 360.0;
    let end = end % 360.0;
    let mut span = end - start;
    if span <= 0.0 {
        span += 360.0;
    }
    (start.rem_euclid(360.0), span)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GradientShape {
    Linear((f32, f32), (f32, f32)),
    Radial((f32, f32), f32, (f32, f32), f32),
}

impl GradientShape {
    /// Geometry of the parameter range `t0..t1`, re-based to `0..1`.
    fn slice(self, t0: f32, t1: f32) -> Self {
        let at = |a: (f32, f32), b: (f32, f32), t: f32| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
        match self {
            GradientShape::Linear(p0, p1) => GradientShape::Linear(at(p0, p1, t0), at(p0, p1, t1)),
            GradientShape::Radial(c0, r0, c1, r1) => GradientShape::Radial(
                at(c0, c1, t0),
                (r0 + (r1 - r0) * t0).max(0.0),
                at(c0, c1, t1),
                (r0 + (r1 - r0) * t1).max(1e-6),
            ),
        }
    }

    /// Whole-cycle parameter range needed to paint `surface`.
    fn coverage(self, surface: Rect) -> (i32, i32) {
        let corners = [
            (surface.x_min, surface.y_min),
            (surface.x_max, surface.y_min),
            (surface.x_max, surface.y_max),
            (surface.x_min, surface.y_max),
        ];
        let (lo, hi) = match self {
            GradientShape::Linear(p0, p1) => {
                let d = (p1.0 - p0.0, p1.1 - p0.1);
                let len2 = d.0 * d.0 + d.1 * d.1;
                if len2 < 1e-12 {
                    return (0, 1);
                }
                corners.iter().fold((f32::MAX, f32::MIN), |(lo, hi), (x, y)| {
                    let t = ((x - p0.0) * d.0 + (y - p0.1) * d.1) / len2;
                    (lo.min(t), hi.max(t))
                })
            }
            GradientShape::Radial(c0, r0, c1, r1) => {
                let dr = r1 - r0;
                if dr.abs() < 1e-6 {
                    return (0, 1);
                }
                let shift = ((c1.0 - c0.0).powi(2) + (c1.1 - c0.1).powi(2)).sqrt();
                let reach = corners
                    .iter()
                    .map(|(x, y)| ((x - c0.0).powi(2) + (y - c0.1).powi(2)).sqrt())
                    .fold(0.0f32, f32::max)
                    + shift;
                let t_edge = (reach - r0) / dr;
                let t_zero = -r0 / dr;
                if dr > 0.0 {
                    (0.0, t_edge)
                } else {
                    (0.0, t_zero.min(t_edge))
                }
            }
        };
        let lo = (lo.floor() as i32).clamp(-MAX_UNROLLED_CYCLES, 0);
        let hi = (hi.ceil() as i32).clamp(1, MAX_UNROLLED_CYCLES);
        (lo, hi)
    }

    fn geometry(self) -> GradientGeometry {
        match self {
            GradientShape::Linear((x0, y0), (x1, y1)) => GradientGeometry::Axial { x0, y0, x1, y1 },
            GradientShape::Radial((x0, y0), r0, (x1, y1), r1) => GradientGeometry::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NormalizedLine {
    Empty,
    Solid(u16, f32),
    /// Stops re-based to `0..1` and the original range they came from.
    Stops {
        stops: Vec<(f32, u16, f32)>,
        t0: f32,
        t1: f32,
    },
}

/// Clamps offsets to `0..1`, sorts stops, merges stops at the same offset
/// (the later one wins) and re-bases offsets to `0..1`.
fn normalize_color_line(line: &ColorLine) -> NormalizedLine {
    let mut stops: Vec<(f32, u16, f32)> = line
        .stops
        .iter()
        .filter(|stop| stop.offset.is_finite())
        .map(|stop| {
            (
                stop.offset.clamp(0.0, 1.0),
                stop.palette_index,
                stop.alpha.clamp(0.0, 1.0),
            )
        })
        .collect();
    if stops.is_empty() {
        return NormalizedLine::Empty;
    }
    stops.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut merged: Vec<(f32, u16, f32)> = Vec::with_capacity(stops.len());
    for stop in stops {
        match merged.last_mut() {
            Some(last) if (stop.0 - last.0).abs() <= 1e-6 => *last = stop,
            _ => merged.push(stop),
        }
    }
    if merged.len() == 1 {
        return NormalizedLine::Solid(merged[0].1, merged[0].2);
    }
    let t0 = merged[0].0;
    let t1 = merged[merged.len() - 1].0;
    let span = t1 - t0;
    let stops = merged
        .into_iter()
        .map(|(offset, palette_index, alpha)| ((offset - t0) / span, palette_index, alpha))
        .collect();
    NormalizedLine::Stops { stops, t0, t1 }
}

/// Repeats `stops` over cycles `lo..hi`, mirrored on odd cycles when
/// reflecting, and re-bases the result to `0..1`.
fn unroll(stops: &[(f32, u16, f32)], extend: Extend, lo: i32, hi: i32) -> Vec<(f32, u16, f32)> {
    let cycles = (hi - lo).max(1) as f32;
    let mut out = Vec::new();
    for cycle in lo..hi {
        let mirrored = extend == Extend::Reflect && cycle.rem_euclid(2) == 1;
        let ordered: Vec<(f32, u16, f32)> = if mirrored {
            stops.iter().rev().map(|(t, p, a)| (1.0 - t, *p, *a)).collect()
        } else {
            stops.to_vec()
        };
        for (t, palette_index, alpha) in ordered {
            out.push(((cycle - lo) as f32 / cycles + t / cycles, palette_index, alpha));
        }
    }
    out
}

fn apply_extend(t: f32, extend: Extend) -> f32 {
    match extend {
        Extend::Pad => t.clamp(0.0, 1.0),
        Extend::Repeat => t.rem_euclid(1.0),
        Extend::Reflect => {
            let t = t.rem_euclid(2.0);
            if t > 1.0 { 2.0 - t } else { t }
        }
    }
}

fn color_at(stops: &[ColorStop], t: f32) -> Rgba {
    let Some(first) = stops.first() else {
        return Rgba::BLACK;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= 0.0 {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops[stops.len() - 1].color
}
