//! OpenType `SVG ` glyph documents compiled to vector draw nodes.

use std::collections::HashMap;
use std::io::Read;

use ttf_parser::OutlineBuilder;

use crate::draw::{DrawNode, Fill, Path};
use crate::error::{PdfError, Result};
use crate::subset::Reader;
use crate::types::{Matrix, Rgba};

const MAX_USE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy)]
struct DocumentRecord {
    start: u16,
    end: u16,
    offset: usize,
    length: usize,
}

/// The document index of an `SVG ` table.
pub(crate) struct SvgDocuments<'a> {
    data: &'a [u8],
    records: Vec<DocumentRecord>,
}

impl<'a> SvgDocuments<'a> {
    pub(crate) fn parse(data: &'a [u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let _version = reader.u16()?;
        let list = reader.u32()? as usize;
        let mut reader = Reader::at(data, list);
        let count = reader.u16()? as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(DocumentRecord {
                start: reader.u16()?,
                end: reader.u16()?,
                offset: list + reader.u32()? as usize,
                length: reader.u32()? as usize,
            });
        }
        Ok(Self { data, records })
    }

    pub(crate) fn glyph_exists(&self, gid: u16) -> bool {
        self.records
            .iter()
            .any(|record| record.start <= gid && gid <= record.end)
    }

    /// The document holding `gid`, inflated when stored gzip-compressed.
    pub(crate) fn document(&self, gid: u16) -> Result<Option<String>> {
        let Some(record) = self
            .records
            .iter()
            .find(|record| record.start <= gid && gid <= record.end)
        else {
            return Ok(None);
        };
        let raw = self
            .data
            .get(record.offset..record.offset + record.length)
            .ok_or_else(|| PdfError::font("SVG document extends past the table"))?;
        let text = if raw.starts_with(&[0x1F, 0x8B]) {
            let mut out = String::new();
            flate2::read::GzDecoder::new(raw)
                .read_to_string(&mut out)
                .map_err(|err| PdfError::font(format!("cannot inflate SVG document: {err}")))?;
            out
        } else {
            String::from_utf8_lossy(raw).into_owned()
        };
        Ok(Some(text))
    }
}

#[derive(Debug, Clone, Copy)]
struct SvgStyle {
    /// `None` once `fill="none"` is in effect.
    fill: Option<Rgba>,
    fill_opacity: f32,
    opacity: f32,
}

impl SvgStyle {
    fn new() -> Self {
        Self {
            fill: Some(Rgba::BLACK),
            fill_opacity: 1.0,
            opacity: 1.0,
        }
    }
}

struct Compiler<'a, 'input> {
    ids: HashMap<&'a str, roxmltree::Node<'a, 'input>>,
    text_color: Rgba,
}

/// Compiles glyph `gid` of an SVG glyph document. The element with id
/// `glyph{gid}` is drawn with its ancestors' transforms and styles, or the
/// whole document when no such element exists. SVG's y-down space is
/// flipped into glyph space.
pub(crate) fn compile_glyph(document: &str, gid: u16, text_color: Rgba) -> Result<Vec<DrawNode>> {
    let doc = roxmltree::Document::parse(document)
        .map_err(|err| PdfError::font(format!("invalid SVG glyph document: {err}")))?;
    let mut ids = HashMap::new();
    for node in doc.descendants().filter(|node| node.is_element()) {
        if let Some(id) = node.attribute("id") {
            ids.entry(id).or_insert(node);
        }
    }
    let compiler = Compiler { ids, text_color };
    let target = compiler
        .ids
        .get(format!("glyph{gid}").as_str())
        .copied()
        .unwrap_or_else(|| doc.root_element());

    let mut ctm = Matrix::scale(1.0, -1.0);
    let mut style = SvgStyle::new();
    let ancestors: Vec<_> = target.ancestors().skip(1).filter(|n| n.is_element()).collect();
    for node in ancestors.iter().rev() {
        compiler.apply_style(*node, &mut style);
        if let Some(transform) = node.attribute("transform") {
            ctm = ctm.mul(parse_transform(transform));
        }
    }
    let mut out = Vec::new();
    compiler.element(&mut out, target, ctm, style, 0);
    Ok(out)
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn apply_style(&self, node: roxmltree::Node<'_, '_>, style: &mut SvgStyle) {
        let mut declarations: Vec<(&str, &str)> = Vec::new();
        for name in ["fill", "fill-opacity", "opacity"] {
            if let Some(value) = node.attribute(name) {
                declarations.push((name, value));
            }
        }
        if let Some(inline) = node.attribute("style") {
            for declaration in inline.split(';') {
                if let Some((name, value)) = declaration.split_once(':') {
                    declarations.push((name.trim(), value.trim()));
                }
            }
        }
        for (name, value) in declarations {
            match name {
                "fill" => {
                    if let Some(fill) = self.parse_paint(value) {
                        style.fill = fill;
                    }
                }
                "fill-opacity" => {
                    if let Some(value) = parse_number(value) {
                        style.fill_opacity = value.clamp(0.0, 1.0);
                    }
                }
                "opacity" => {
                    if let Some(value) = parse_number(value) {
                        style.opacity *= value.clamp(0.0, 1.0);
                    }
                }
                _ => {}
            }
        }
    }

    /// `Some(None)` is an explicit `none`; `None` leaves the inherited fill.
    fn parse_paint(&self, value: &str) -> Option<Option<Rgba>> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("none") {
            return Some(None);
        }
        if value.eq_ignore_ascii_case("currentcolor") {
            return Some(Some(self.text_color));
        }
        // Paint servers are not supported; such shapes are left unpainted.
        if value.starts_with("url(") {
            return Some(None);
        }
        parse_color(value).map(Some)
    }

    fn element(
        &self,
        out: &mut Vec<DrawNode>,
        node: roxmltree::Node<'a, 'input>,
        ctm: Matrix,
        inherited: SvgStyle,
        depth: usize,
    ) {
        if !node.is_element() || depth > MAX_USE_DEPTH {
            return;
        }
        let mut style = inherited;
        self.apply_style(node, &mut style);
        let ctm = match node.attribute("transform") {
            Some(transform) => ctm.mul(parse_transform(transform)),
            None => ctm,
        };
        let path = match node.tag_name().name() {
            "defs" | "clipPath" | "linearGradient" | "radialGradient" | "mask" | "style" => None,
            "svg" | "g" | "symbol" => {
                for child in node.children().filter(|child| child.is_element()) {
                    self.element(out, child, ctm, style, depth);
                }
                None
            }
            "use" => {
                let href = node
                    .attribute("href")
                    .or_else(|| node.attribute(("http://www.w3.org/1999/xlink", "href")));
                if let Some(target) = href
                    .and_then(|href| href.strip_prefix('#'))
                    .and_then(|id| self.ids.get(id).copied())
                {
                    let x = number_attr(node, "x", 0.0);
                    let y = number_attr(node, "y", 0.0);
                    self.element(out, target, ctm.mul(Matrix::translate(x, y)), style, depth + 1);
                }
                None
            }
            "path" => node.attribute("d").map(parse_path_data),
            "rect" => rect_path(node),
            "circle" => {
                let r = number_attr(node, "r", 0.0);
                ellipse_path(number_attr(node, "cx", 0.0), number_attr(node, "cy", 0.0), r, r)
            }
            "ellipse" => ellipse_path(
                number_attr(node, "cx", 0.0),
                number_attr(node, "cy", 0.0),
                number_attr(node, "rx", 0.0),
                number_attr(node, "ry", 0.0),
            ),
            "polygon" => node
                .attribute("points")
                .map(|points| Path::polygon(&parse_points(points))),
            _ => None,
        };
        let (Some(path), Some(color)) = (path, style.fill) else {
            return;
        };
        if path.is_empty() {
            return;
        }
        let alpha = color.a * style.fill_opacity * style.opacity;
        out.push(DrawNode::Fill {
            path: path.transformed(ctm),
            fill: Fill::Solid(Rgba { a: alpha, ..color }),
        });
    }
}

fn number_attr(node: roxmltree::Node<'_, '_>, name: &str, default: f32) -> f32 {
    node.attribute(name).and_then(parse_number).unwrap_or(default)
}

fn parse_number(input: &str) -> Option<f32> {
    let trimmed = input.trim();
    if let Some(percent) = trimmed.strip_suffix('%') {
        return percent.trim().parse::<f32>().ok().map(|v| v / 100.0);
    }
    trimmed
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim()
        .parse::<f32>()
        .ok()
}

fn parse_color(input: &str) -> Option<Rgba> {
    let value = input.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |text: &str| u8::from_str_radix(text, 16).ok().map(|v| v as f32 / 255.0);
        return match hex.len() {
            3 => {
                let expand = |idx: usize| channel(&hex[idx..idx + 1].repeat(2));
                Some(Rgba::new(expand(0)?, expand(1)?, expand(2)?, 1.0))
            }
            6 => Some(Rgba::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                1.0,
            )),
            8 => Some(Rgba::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        };
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |text: &str| -> Option<f32> {
            match text.strip_suffix('%') {
                Some(percent) => percent.parse::<f32>().ok().map(|v| v / 100.0),
                None => text.parse::<f32>().ok().map(|v| v / 255.0),
            }
        };
        let alpha = parts
            .get(3)
            .and_then(|text| parse_number(text))
            .unwrap_or(1.0);
        return Some(Rgba::new(
            channel(parts[0])?.clamp(0.0, 1.0),
            channel(parts[1])?.clamp(0.0, 1.0),
            channel(parts[2])?.clamp(0.0, 1.0),
            alpha.clamp(0.0, 1.0),
        ));
    }
    let (r, g, b) = match lower.as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(Rgba::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0))
}

fn parse_number_list(input: &str) -> Vec<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<f32>().ok())
        .collect()
}

fn parse_transform(input: &str) -> Matrix {
    let mut out = Matrix::identity();
    let mut rest = input.trim();
    while let Some(open) = rest.find('(') {
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let Some(close) = rest[open + 1..].find(')') else {
            break;
        };
        let args = parse_number_list(&rest[open + 1..open + 1 + close]);
        let arg = |idx: usize, default: f32| args.get(idx).copied().unwrap_or(default);
        let step = match name {
            "translate" => Matrix::translate(arg(0, 0.0), arg(1, 0.0)),
            "scale" => Matrix::scale(arg(0, 1.0), arg(1, arg(0, 1.0))),
            "rotate" if args.len() >= 3 => Matrix::rotate(args[0]).about(args[1], args[2]),
            "rotate" => Matrix::rotate(arg(0, 0.0)),
            "skewX" => Matrix::skew(arg(0, 0.0), 0.0),
            "skewY" => Matrix::skew(0.0, arg(0, 0.0)),
            "matrix" if args.len() >= 6 => {
                Matrix::new(args[0], args[1], args[2], args[3], args[4], args[5])
            }
            _ => Matrix::identity(),
        };
        out = out.mul(step);
        rest = rest[open + 1 + close + 1..].trim_start();
    }
    out
}

fn parse_points(input: &str) -> Vec<(f32, f32)> {
    parse_number_list(input)
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

fn rect_path(node: roxmltree::Node<'_, '_>) -> Option<Path> {
    let x = number_attr(node, "x", 0.0);
    let y = number_attr(node, "y", 0.0);
    let w = number_attr(node, "width", 0.0);
    let h = number_attr(node, "height", 0.0);
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(Path::polygon(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h)]))
}

fn ellipse_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    const KAPPA: f32 = 0.552_284_8;
    let (ox, oy) = (rx * KAPPA, ry * KAPPA);
    let mut path = Path::new();
    path.move_to(cx + rx, cy);
    path.curve_to(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry);
    path.curve_to(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy);
    path.curve_to(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry);
    path.curve_to(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy);
    path.close();
    Some(path)
}

/// Parses SVG path data; quadratics and arcs are emitted as cubics.
fn parse_path_data(d: &str) -> Path {
    let mut path = Path::new();
    let mut lexer = PathLexer::new(d);
    let mut command = ' ';
    let (mut x, mut y) = (0.0f32, 0.0f32);
    let (mut start_x, mut start_y) = (0.0f32, 0.0f32);
    let mut last_cubic: Option<(f32, f32)> = None;
    let mut last_quad: Option<(f32, f32)> = None;

    while let Some(c) = lexer.command(&mut command) {
        let relative = c.is_ascii_lowercase();
        let offset = |px: f32, py: f32, cx: f32, cy: f32| {
            if relative { (cx + px, cy + py) } else { (px, py) }
        };
        match c.to_ascii_uppercase() {
            'M' => {
                let Some((px, py)) = lexer.pair() else { break };
                (x, y) = offset(px, py, x, y);
                path.move_to(x, y);
                (start_x, start_y) = (x, y);
                while let Some((px, py)) = lexer.pair() {
                    (x, y) = offset(px, py, x, y);
                    path.line_to(x, y);
                }
                last_cubic = None;
                last_quad = None;
            }
            'L' => {
                while let Some((px, py)) = lexer.pair() {
                    (x, y) = offset(px, py, x, y);
                    path.line_to(x, y);
                }
                last_cubic = None;
                last_quad = None;
            }
            'H' => {
                while let Some(px) = lexer.number() {
                    x = if relative { x + px } else { px };
                    path.line_to(x, y);
                }
                last_cubic = None;
                last_quad = None;
            }
            'V' => {
                while let Some(py) = lexer.number() {
                    y = if relative { y + py } else { py };
                    path.line_to(x, y);
                }
                last_cubic = None;
                last_quad = None;
            }
            'C' => {
                while let (Some(c1), Some(c2), Some(end)) = (lexer.pair(), lexer.pair(), lexer.pair()) {
                    let c1 = offset(c1.0, c1.1, x, y);
                    let c2 = offset(c2.0, c2.1, x, y);
                    (x, y) = offset(end.0, end.1, x, y);
                    path.curve_to(c1.0, c1.1, c2.0, c2.1, x, y);
                    last_cubic = Some(c2);
                    last_quad = None;
                }
            }
            'S' => {
                while let (Some(c2), Some(end)) = (lexer.pair(), lexer.pair()) {
                    let c1 = match last_cubic {
                        Some((px, py)) => (2.0 * x - px, 2.0 * y - py),
                        None => (x, y),
                    };
                    let c2 = offset(c2.0, c2.1, x, y);
                    (x, y) = offset(end.0, end.1, x, y);
                    path.curve_to(c1.0, c1.1, c2.0, c2.1, x, y);
                    last_cubic = Some(c2);
                    last_quad = None;
                }
            }
            'Q' => {
                while let (Some(ctrl), Some(end)) = (lexer.pair(), lexer.pair()) {
                    let ctrl = offset(ctrl.0, ctrl.1, x, y);
                    (x, y) = offset(end.0, end.1, x, y);
                    path.quad_to(ctrl.0, ctrl.1, x, y);
                    last_quad = Some(ctrl);
                    last_cubic = None;
                }
            }
            'T' => {
                while let Some(end) = lexer.pair() {
                    let ctrl = match last_quad {
                        Some((px, py)) => (2.0 * x - px, 2.0 * y - py),
                        None => (x, y),
                    };
                    (x, y) = offset(end.0, end.1, x, y);
                    path.quad_to(ctrl.0, ctrl.1, x, y);
                    last_quad = Some(ctrl);
                    last_cubic = None;
                }
            }
            'A' => {
                while let (Some(rx), Some(ry), Some(rotation), Some(large), Some(sweep), Some(end)) = (
                    lexer.number(),
                    lexer.number(),
                    lexer.number(),
                    lexer.flag(),
                    lexer.flag(),
                    lexer.pair(),
                ) {
                    let (ex, ey) = offset(end.0, end.1, x, y);
                    arc_to(&mut path, (x, y), (rx, ry), rotation, large, sweep, (ex, ey));
                    (x, y) = (ex, ey);
                    last_cubic = None;
                    last_quad = None;
                }
            }
            'Z' => {
                path.close();
                (x, y) = (start_x, start_y);
                last_cubic = None;
                last_quad = None;
            }
            _ => break,
        }
    }
    path
}

/// Appends an elliptical arc as cubic segments, using the center
/// parameterization of SVG 1.1 appendix F.6.
fn arc_to(
    path: &mut Path,
    from: (f32, f32),
    radii: (f32, f32),
    rotation_deg: f32,
    large_arc: bool,
    sweep: bool,
    to: (f32, f32),
) {
    use std::f32::consts::PI;

    let (mut rx, mut ry) = (radii.0.abs(), radii.1.abs());
    if rx == 0.0 || ry == 0.0 || from == to {
        path.line_to(to.0, to.1);
        return;
    }
    let phi = rotation_deg.to_radians();
    let (sin_phi, cos_phi) = (libm::sinf(phi), libm::cosf(phi));

    let dx2 = (from.0 - to.0) / 2.0;
    let dy2 = (from.1 - to.1) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = libm::sqrtf(lambda);
        rx *= s;
        ry *= s;
    }
    let (rx2, ry2) = (rx * rx, ry * ry);
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let coef = if den == 0.0 {
        0.0
    } else {
        let sign = if large_arc == sweep { -1.0 } else { 1.0 };
        sign * libm::sqrtf((num / den).max(0.0))
    };
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);
    let cx = cos_phi * cxp - sin_phi * cyp + (from.0 + to.0) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.1 + to.1) / 2.0;

    let angle = |ux: f32, uy: f32, vx: f32, vy: f32| libm::atan2f(ux * vy - uy * vx, ux * vx + uy * vy);
    let (ux, uy) = ((x1p - cxp) / rx, (y1p - cyp) / ry);
    let (vx, vy) = ((-x1p - cxp) / rx, (-y1p - cyp) / ry);
    let mut theta = angle(1.0, 0.0, ux, uy);
    let mut delta = angle(ux, uy, vx, vy);
    if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    }

    let segments = libm::ceilf(delta.abs() / (PI / 2.0)).max(1.0) as usize;
    let step = delta / segments as f32;
    let map = |x: f32, y: f32| {
        let (x, y) = (rx * x, ry * y);
        (cx + cos_phi * x - sin_phi * y, cy + sin_phi * x + cos_phi * y)
    };
    for _ in 0..segments {
        let (t1, t2) = (theta, theta + step);
        let k = 4.0 / 3.0 * libm::tanf(step / 4.0);
        let (s1, c1) = (libm::sinf(t1), libm::cosf(t1));
        let (s2, c2) = (libm::sinf(t2), libm::cosf(t2));
        let p1 = map(c1 - k * s1, s1 + k * c1);
        let p2 = map(c2 + k * s2, s2 - k * c2);
        let p3 = map(c2, s2);
        path.curve_to(p1.0, p1.1, p2.0, p2.1, p3.0, p3.1);
        theta = t2;
    }
}

struct PathLexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PathLexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| matches!(b, b' ' | b'\n' | b'\r' | b'\t' | b','))
        {
            self.pos += 1;
        }
    }

    /// Next command letter, or the current one repeated for implicit commands.
    fn command(&mut self, current: &mut char) -> Option<char> {
        self.skip_separators();
        let byte = *self.bytes.get(self.pos)?;
        if byte.is_ascii_alphabetic() {
            self.pos += 1;
            *current = byte as char;
            return Some(*current);
        }
        // A lone moveto pair continues as lineto.
        match *current {
            ' ' => None,
            'M' => Some('L'),
            'm' => Some('l'),
            other => Some(other),
        }
    }

    fn number(&mut self) -> Option<f32> {
        self.skip_separators();
        let start = self.pos;
        let mut digits = false;
        let at = |pos: usize| self.bytes.get(pos).copied();
        let mut pos = self.pos;
        if matches!(at(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        while at(pos).is_some_and(|b| b.is_ascii_digit()) {
            pos += 1;
            digits = true;
        }
        if at(pos) == Some(b'.') {
            pos += 1;
            while at(pos).is_some_and(|b| b.is_ascii_digit()) {
                pos += 1;
                digits = true;
            }
        }
        if digits && matches!(at(pos), Some(b'e' | b'E')) {
            let mut exp = pos + 1;
            if matches!(at(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if at(exp).is_some_and(|b| b.is_ascii_digit()) {
                pos = exp;
                while at(pos).is_some_and(|b| b.is_ascii_digit()) {
                    pos += 1;
                }
            }
        }
        if !digits {
            return None;
        }
        let text = std::str::from_utf8(&self.bytes[start..pos]).ok()?;
        let value = text.parse::<f32>().ok()?;
        self.pos = pos;
        Some(value)
    }

    /// Arc flags may be packed without separators (`01`).
    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        match self.bytes.get(self.pos)? {
            b'0' => {
                self.pos += 1;
                Some(false)
            }
            b'1' => {
                self.pos += 1;
                Some(true)
            }
            _ => None,
        }
    }

    fn pair(&mut self) -> Option<(f32, f32)> {
        let save = self.pos;
        let x = self.number()?;
        match self.number() {
            Some(y) => Some((x, y)),
            None => {
                self.pos = save;
                None
            }
        }
    }
}

/// An `SVG ` table holding `documents`, each `(first gid, last gid, bytes)`.
#[cfg(test)]
pub(crate) fn build_svg_table(documents: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&10u32.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&(documents.len() as u16).to_be_bytes());
    let mut offset = 2 + 12 * documents.len();
    for (start, end, bytes) in documents {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        offset += bytes.len();
    }
    for (_, _, bytes) in documents {
        out.extend_from_slice(bytes);
    }
    out
}
