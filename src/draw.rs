//! Vector drawing model shared by every color glyph source, and its
//! translation into content-stream operators.

use ttf_parser::OutlineBuilder;

use crate::debug::DebugLogger;
use crate::object::fmt;
use crate::resources::{GraphicsStyle, Resource, ResourceCatalog, SoftMask, UsageSet, VectorSoftMask};
use crate::shading::Pattern;
use crate::types::{BlendMode, Matrix, Rect, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PathSeg {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Path {
    segs: Vec<PathSeg>,
    current: (f32, f32),
}

impl Path {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rect(rect: Rect) -> Self {
        let mut path = Path::new();
        path.move_to(rect.x_min, rect.y_min);
        path.line_to(rect.x_max, rect.y_min);
        path.line_to(rect.x_max, rect.y_max);
        path.line_to(rect.x_min, rect.y_max);
        path.close();
        path
    }

    pub(crate) fn polygon(points: &[(f32, f32)]) -> Self {
        let mut path = Path::new();
        for (idx, (x, y)) in points.iter().enumerate() {
            if idx == 0 {
                path.move_to(*x, *y);
            } else {
                path.line_to(*x, *y);
            }
        }
        if !points.is_empty() {
            path.close();
        }
        path
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub(crate) fn segments(&self) -> &[PathSeg] {
        &self.segs
    }

    pub(crate) fn transformed(&self, m: Matrix) -> Path {
        if m.is_identity() {
            return self.clone();
        }
        let segs = self
            .segs
            .iter()
            .map(|seg| match *seg {
                PathSeg::MoveTo(x, y) => {
                    let (x, y) = m.apply(x, y);
                    PathSeg::MoveTo(x, y)
                }
                PathSeg::LineTo(x, y) => {
                    let (x, y) = m.apply(x, y);
                    PathSeg::LineTo(x, y)
                }
                PathSeg::CurveTo(x1, y1, x2, y2, x, y) => {
                    let (x1, y1) = m.apply(x1, y1);
                    let (x2, y2) = m.apply(x2, y2);
                    let (x, y) = m.apply(x, y);
                    PathSeg::CurveTo(x1, y1, x2, y2, x, y)
                }
                PathSeg::Close => PathSeg::Close,
            })
            .collect();
        let (cx, cy) = m.apply(self.current.0, self.current.1);
        Path {
            segs,
            current: (cx, cy),
        }
    }

    /// Bounding box of the control points.
    pub(crate) fn bounds(&self) -> Option<Rect> {
        let mut out: Option<Rect> = None;
        let mut grow = |x: f32, y: f32| {
            let rect = out.get_or_insert(Rect::new(x, y, x, y));
            rect.x_min = rect.x_min.min(x);
            rect.y_min = rect.y_min.min(y);
            rect.x_max = rect.x_max.max(x);
            rect.y_max = rect.y_max.max(y);
        };
        for seg in &self.segs {
            match *seg {
                PathSeg::MoveTo(x, y) | PathSeg::LineTo(x, y) => grow(x, y),
                PathSeg::CurveTo(x1, y1, x2, y2, x, y) => {
                    grow(x1, y1);
                    grow(x2, y2);
                    grow(x, y);
                }
                PathSeg::Close => {}
            }
        }
        out
    }

    /// Path construction operators, one per line.
    pub(crate) fn operators(&self) -> String {
        let mut out = String::new();
        for seg in &self.segs {
            match *seg {
                PathSeg::MoveTo(x, y) => out.push_str(&format!("{} {} m\n", fmt(x), fmt(y))),
                PathSeg::LineTo(x, y) => out.push_str(&format!("{} {} l\n", fmt(x), fmt(y))),
                PathSeg::CurveTo(x1, y1, x2, y2, x, y) => out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt(x1),
                    fmt(y1),
                    fmt(x2),
                    fmt(y2),
                    fmt(x),
                    fmt(y)
                )),
                PathSeg::Close => out.push_str("h\n"),
            }
        }
        out
    }
}

impl OutlineBuilder for Path {
    fn move_to(&mut self, x: f32, y: f32) {
        self.segs.push(PathSeg::MoveTo(x, y));
        self.current = (x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.segs.push(PathSeg::LineTo(x, y));
        self.current = (x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x0, y0) = self.current;
        let c1 = (x0 + 2.0 / 3.0 * (x1 - x0), y0 + 2.0 / 3.0 * (y1 - y0));
        let c2 = (x + 2.0 / 3.0 * (x1 - x), y + 2.0 / 3.0 * (y1 - y));
        self.segs.push(PathSeg::CurveTo(c1.0, c1.1, c2.0, c2.1, x, y));
        self.current = (x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.segs.push(PathSeg::CurveTo(x1, y1, x2, y2, x, y));
        self.current = (x, y);
    }

    fn close(&mut self) {
        self.segs.push(PathSeg::Close);
    }
}

/// Outline of `gid` in font units, or `None` for glyphs without contours.
pub(crate) fn glyph_outline(face: &ttf_parser::Face<'_>, gid: u16) -> Option<Path> {
    let mut path = Path::new();
    face.outline_glyph(ttf_parser::GlyphId(gid), &mut path)?;
    if path.is_empty() { None } else { Some(path) }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fill {
    Solid(Rgba),
    /// Gradient in paint space; the pattern matrix maps it to glyph space.
    Gradient(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawNode {
    Fill { path: Path, fill: Fill },
    Clip { path: Path, children: Vec<DrawNode> },
    Blend { mode: BlendMode, children: Vec<DrawNode> },
    /// Image XObject painted into the unit square mapped by `matrix`.
    Image { index: usize, matrix: Matrix },
    /// Children painted through a luminosity soft mask.
    Masked { mask: SoftMask, children: Vec<DrawNode> },
    /// Pre-built path operators filled with one color.
    Raw { operators: String, color: Rgba },
}

impl Fill {
    /// Opacity used where a fill only contributes coverage. Gradients use
    /// the mean of their stop alphas.
    fn alpha(&self) -> f32 {
        match self {
            Fill::Solid(color) => color.a,
            Fill::Gradient(pattern) => {
                let stops = &pattern.gradient.stops;
                if stops.is_empty() {
                    return 1.0;
                }
                stops.iter().map(|stop| stop.color.a).sum::<f32>() / stops.len() as f32
            }
        }
    }
}

/// Soft mask that is opaque where `nodes` paint, or, with `outside`, opaque
/// everywhere in `bbox` except where they paint. Overlapping shapes combine
/// through a lighten (or darken) blend so coverage only ever grows.
pub(crate) fn coverage_mask(nodes: &[DrawNode], bbox: Rect, outside: bool) -> VectorSoftMask {
    let mut operators = String::new();
    if outside {
        operators.push_str("1 g\n");
        operators.push_str(&Path::rect(bbox).operators());
        operators.push_str("f\n");
    }
    operators.push_str("/Cov gs\n");
    for node in nodes {
        coverage(node, outside, &mut operators);
    }
    VectorSoftMask {
        bbox,
        blend: if outside {
            BlendMode::Darken
        } else {
            BlendMode::Lighten
        },
        operators,
    }
}

fn coverage(node: &DrawNode, outside: bool, out: &mut String) {
    let level = |alpha: f32| {
        let alpha = alpha.clamp(0.0, 1.0);
        fmt(if outside { 1.0 - alpha } else { alpha })
    };
    match node {
        DrawNode::Fill { path, fill } => {
            if path.is_empty() {
                return;
            }
            out.push_str(&format!("{} g\n", level(fill.alpha())));
            out.push_str(&path.operators());
            out.push_str("f\n");
        }
        DrawNode::Clip { path, children } => {
            if path.is_empty() || children.is_empty() {
                return;
            }
            out.push_str("q\n");
            out.push_str(&path.operators());
            out.push_str("W n\n");
            for child in children {
                coverage(child, outside, out);
            }
            out.push_str("Q\n");
        }
        DrawNode::Blend { children, .. } | DrawNode::Masked { children, .. } => {
            for child in children {
                coverage(child, outside, out);
            }
        }
        DrawNode::Image { matrix, .. } => {
            out.push_str(&format!(
                "q\n{} cm\n{} g\n0 0 1 1 re\nf\nQ\n",
                matrix.operands(),
                level(1.0)
            ));
        }
        DrawNode::Raw { operators, color } => {
            out.push_str(&format!("{} g\n{operators}\n", level(color.a)));
        }
    }
}

/// Content stream produced from a drawing plus what it needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Rendered {
    pub(crate) content: String,
    pub(crate) transparency: bool,
}

/// Emits `nodes` under the `base` transform, registering every graphics
/// state, pattern and image into `usage`.
pub(crate) fn render(
    nodes: &[DrawNode],
    base: Matrix,
    catalog: &mut ResourceCatalog,
    usage: &mut UsageSet,
    debug: Option<&DebugLogger>,
) -> Rendered {
    let mut out = Rendered::default();
    if !base.is_identity() {
        out.content.push_str(&format!("{} cm\n", base.operands()));
    }
    let mut renderer = Renderer {
        base,
        catalog,
        usage,
        debug,
        transparency: false,
    };
    for node in nodes {
        renderer.node(node, &mut out.content);
    }
    out.transparency = renderer.transparency;
    out
}

struct Renderer<'a> {
    base: Matrix,
    catalog: &'a mut ResourceCatalog,
    usage: &'a mut UsageSet,
    debug: Option<&'a DebugLogger>,
    transparency: bool,
}

impl Renderer<'_> {
    fn style(&mut self, style: GraphicsStyle) -> String {
        self.transparency = true;
        let name = self.catalog.add_graphics_style(style);
        self.catalog
            .register_into(self.usage, Resource::GraphicsState(name))
    }

    fn alpha(&mut self, alpha: f32, out: &mut String) {
        if alpha < 1.0 {
            let name = self.style(GraphicsStyle::fill_alpha(alpha.max(0.0)));
            out.push_str(&format!("/{name} gs\n"));
        }
    }

    fn node(&mut self, node: &DrawNode, out: &mut String) {
        match node {
            DrawNode::Fill { path, fill } => {
                if path.is_empty() {
                    return;
                }
                out.push_str("q\n");
                match fill {
                    Fill::Solid(color) => {
                        self.alpha(color.a, out);
                        out.push_str(&format!("{} rg\n", color.rgb_operands()));
                    }
                    Fill::Gradient(pattern) => {
                        self.gradient_alpha(pattern, out);
                        let pattern = Pattern {
                            gradient: pattern.gradient.clone(),
                            matrix: self.base.mul(pattern.matrix),
                        };
                        let name = self
                            .catalog
                            .register_into(self.usage, Resource::Pattern(pattern));
                        out.push_str(&format!("/Pattern cs /{name} scn\n"));
                    }
                }
                out.push_str(&path.operators());
                out.push_str("f\nQ\n");
            }
            DrawNode::Clip { path, children } => {
                if path.is_empty() || children.is_empty() {
                    return;
                }
                out.push_str("q\n");
                out.push_str(&path.operators());
                out.push_str("W n\n");
                for child in children {
                    self.node(child, out);
                }
                out.push_str("Q\n");
            }
            DrawNode::Blend { mode, children } => {
                if children.is_empty() {
                    return;
                }
                let name = self.style(GraphicsStyle::blend(*mode));
                out.push_str(&format!("q\n/{name} gs\n"));
                for child in children {
                    self.node(child, out);
                }
                out.push_str("Q\n");
            }
            DrawNode::Image { index, matrix } => {
                let name = self
                    .catalog
                    .register_into(self.usage, Resource::Image(*index));
                out.push_str(&format!("q\n{} cm\n/{name} Do\nQ\n", matrix.operands()));
            }
            DrawNode::Masked { mask, children } => {
                let name = self.style(GraphicsStyle {
                    soft_mask: Some(mask.clone()),
                    ..GraphicsStyle::default()
                });
                out.push_str(&format!("q\n/{name} gs\n"));
                for child in children {
                    self.node(child, out);
                }
                out.push_str("Q\n");
            }
            DrawNode::Raw { operators, color } => {
                out.push_str("q\n");
                self.alpha(color.a, out);
                out.push_str(&format!("{} rg\n{operators}\nQ\n", color.rgb_operands()));
            }
        }
    }

    /// Shadings carry no alpha; a uniform stop alpha becomes `/ca`, anything
    /// else is flattened to the mean.
    fn gradient_alpha(&mut self, pattern: &Pattern, out: &mut String) {
        let stops = &pattern.gradient.stops;
        if stops.is_empty() {
            return;
        }
        let first = stops[0].color.a;
        let uniform = stops.iter().all(|stop| (stop.color.a - first).abs() < 1e-6);
        let alpha = if uniform {
            first
        } else {
            let mean = stops.iter().map(|stop| stop.color.a).sum::<f32>() / stops.len() as f32;
            if let Some(debug) = self.debug {
                debug.event(
                    "draw.gradient_alpha_flattened",
                    &[("stops", stops.len().to_string()), ("alpha", fmt(mean))],
                );
            }
            mean
        };
        self.alpha(alpha, out);
    }
}
