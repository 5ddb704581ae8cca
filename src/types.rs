use crate::object::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
        }
    }

    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width: width_mm * 72.0 / 25.4,
            height: height_mm * 72.0 / 25.4,
        }
    }

    /// `[0 0 w h]` with two decimals, the layout used for every media box.
    pub(crate) fn media_box(self) -> String {
        format!("[0 0 {:.2} {:.2}]", self.width, self.height)
    }
}

/// Axis-aligned box, in whatever unit the caller works in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub(crate) fn transformed(&self, m: Matrix) -> Rect {
        let corners = [
            m.apply(self.x_min, self.y_min),
            m.apply(self.x_max, self.y_min),
            m.apply(self.x_max, self.y_max),
            m.apply(self.x_min, self.y_max),
        ];
        let mut out = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            out.x_min = out.x_min.min(x);
            out.y_min = out.y_min.min(y);
            out.x_max = out.x_max.max(x);
            out.y_max = out.y_max.max(y);
        }
        out
    }
}

/// Color of application text, as the front end expressed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextColor {
    Gray(f32),
    Rgb(f32, f32, f32),
    Cmyk(f32, f32, f32, f32),
}

impl Default for TextColor {
    fn default() -> Self {
        TextColor::Gray(0.0)
    }
}

impl TextColor {
    pub fn to_rgb(self) -> (f32, f32, f32) {
        match self {
            TextColor::Gray(g) => (g, g, g),
            TextColor::Rgb(r, g, b) => (r, g, b),
            TextColor::Cmyk(c, m, y, k) => (
                1.0 - (c + k).min(1.0),
                1.0 - (m + k).min(1.0),
                1.0 - (y + k).min(1.0),
            ),
        }
    }
}

/// Non-premultiplied color with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn lerp(self, other: Rgba, t: f32) -> Rgba {
        Rgba {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
            a: lerp(self.a, other.a, t),
        }
    }

    pub(crate) fn rgb_operands(&self) -> String {
        format!("{} {} {}", fmt(self.r), fmt(self.g), fmt(self.b))
    }
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn pdf_name(self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }
}

/// Affine transform `[a b c d e f]`, PDF `cm` operand order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `deg` degrees.
    pub fn rotate(deg: f32) -> Self {
        let rad = deg.to_radians();
        let s = libm::sinf(rad);
        let c = libm::cosf(rad);
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Skew by angles in degrees along x then y.
    pub fn skew(x_deg: f32, y_deg: f32) -> Self {
        let tx = libm::tanf(x_deg.to_radians());
        let ty = libm::tanf(y_deg.to_radians());
        Self::new(1.0, ty, tx, 1.0, 0.0, 0.0)
    }

    /// `self * other`: `other` applies first, then `self`.
    pub fn mul(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// The same transform applied around `(cx, cy)` instead of the origin.
    pub fn about(self, cx: f32, cy: f32) -> Self {
        Matrix::translate(cx, cy)
            .mul(self)
            .mul(Matrix::translate(-cx, -cy))
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        let e = -(a * self.e + c * self.f);
        let f = -(b * self.e + d * self.f);
        Some(Matrix::new(a, b, c, d, e, f))
    }

    pub fn is_identity(&self) -> bool {
        *self == Matrix::identity()
    }

    pub(crate) fn operands(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            fmt(self.a),
            fmt(self.b),
            fmt(self.c),
            fmt(self.d),
            fmt(self.e),
            fmt(self.f)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn mul_applies_right_operand_first() {
        let m = Matrix::translate(10.0, 0.0).mul(Matrix::scale(2.0, 2.0));
        assert!(close(m.apply(1.0, 1.0), (12.0, 2.0)));
    }

    #[test]
    fn rotate_about_center_keeps_center_fixed() {
        let m = Matrix::rotate(90.0).about(5.0, 5.0);
        assert!(close(m.apply(5.0, 5.0), (5.0, 5.0)));
        assert!(close(m.apply(6.0, 5.0), (5.0, 6.0)));
    }

    #[test]
    fn invert_round_trips() {
        let m = Matrix::new(2.0, 0.5, -1.0, 3.0, 7.0, -4.0);
        let inv = m.invert().expect("invertible");
        let (x, y) = m.apply(3.0, 9.0);
        assert!(close(inv.apply(x, y), (3.0, 9.0)));
        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn cmyk_text_color_to_rgb() {
        assert_eq!(TextColor::Cmyk(0.0, 1.0, 1.0, 0.0).to_rgb(), (1.0, 0.0, 0.0));
        assert_eq!(TextColor::Gray(0.5).to_rgb(), (0.5, 0.5, 0.5));
    }

    #[test]
    fn transformed_rect_is_bounding_box() {
        let r = Rect::new(0.0, 0.0, 2.0, 1.0).transformed(Matrix::rotate(90.0));
        assert!((r.x_min + 1.0).abs() < 1e-4);
        assert!((r.y_max - 2.0).abs() < 1e-4);
    }

    #[test]
    fn media_box_uses_two_decimals() {
        assert_eq!(Size::a4().media_box(), "[0 0 595.28 841.89]");
        assert_eq!(Size::new(100.0, 50.5).media_box(), "[0 0 100.00 50.50]");
    }
}
