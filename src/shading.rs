use crate::object::{Dict, Value, fmt};
use crate::types::{Matrix, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientGeometry {
    Axial {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
    },
    Radial {
        x0: f32,
        y0: f32,
        r0: f32,
        x1: f32,
        y1: f32,
        r1: f32,
    },
}

/// Smooth shading over DeviceRGB. Stops are sorted by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub geometry: GradientGeometry,
    pub stops: Vec<ColorStop>,
    pub extend: bool,
}

impl Gradient {
    /// Stops padded so the function domain is exactly `[0 1]`.
    fn padded_stops(&self) -> Vec<ColorStop> {
        let mut stops: Vec<ColorStop> = self.stops.clone();
        if stops.is_empty() {
            stops.push(ColorStop {
                offset: 0.0,
                color: Rgba::BLACK,
            });
        }
        stops.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap_or(std::cmp::Ordering::Equal));
        for stop in stops.iter_mut() {
            stop.offset = stop.offset.clamp(0.0, 1.0);
        }
        if let Some(first) = stops.first().copied() {
            if first.offset > 0.0 {
                stops.insert(0, ColorStop { offset: 0.0, ..first });
            }
        }
        if let Some(last) = stops.last().copied() {
            if last.offset < 1.0 {
                stops.push(ColorStop { offset: 1.0, ..last });
            }
        }
        stops
    }

    pub(crate) fn function(&self) -> Dict {
        let stops = self.padded_stops();
        let interpolation = |a: &ColorStop, b: &ColorStop| {
            Dict::new()
                .with("FunctionType", Value::Int(2))
                .with("Domain", Value::reals(&[0.0, 1.0]))
                .with("C0", Value::reals(&[a.color.r, a.color.g, a.color.b]))
                .with("C1", Value::reals(&[b.color.r, b.color.g, b.color.b]))
                .with("N", Value::Int(1))
        };
        if stops.len() <= 2 {
            let first = stops[0];
            let last = stops[stops.len() - 1];
            return interpolation(&first, &last);
        }
        let functions: Vec<Value> = stops
            .windows(2)
            .map(|pair| Value::Dict(interpolation(&pair[0], &pair[1])))
            .collect();
        let bounds: Vec<f32> = stops[1..stops.len() - 1].iter().map(|s| s.offset).collect();
        let mut encode = Vec::with_capacity(functions.len() * 2);
        for _ in 0..functions.len() {
            encode.push(0.0);
            encode.push(1.0);
        }
        Dict::new()
            .with("FunctionType", Value::Int(3))
            .with("Domain", Value::reals(&[0.0, 1.0]))
            .with("Functions", Value::Array(functions))
            .with("Bounds", Value::reals(&bounds))
            .with("Encode", Value::reals(&encode))
    }

    pub(crate) fn shading_dict(&self) -> Dict {
        let (shading_type, coords) = match self.geometry {
            GradientGeometry::Axial { x0, y0, x1, y1 } => (2, vec![x0, y0, x1, y1]),
            GradientGeometry::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => (3, vec![x0, y0, r0, x1, y1, r1]),
        };
        Dict::new()
            .with("ShadingType", Value::Int(shading_type))
            .with("ColorSpace", Value::name("DeviceRGB"))
            .with("Coords", Value::reals(&coords))
            .with("Function", self.function())
            .with(
                "Extend",
                Value::Array(vec![Value::Bool(self.extend), Value::Bool(self.extend)]),
            )
    }

    /// Stable text used to deduplicate identical shadings.
    pub(crate) fn key(&self) -> String {
        let mut out = match self.geometry {
            GradientGeometry::Axial { x0, y0, x1, y1 } => {
                format!("axial {} {} {} {}", fmt(x0), fmt(y0), fmt(x1), fmt(y1))
            }
            GradientGeometry::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => format!(
                "radial {} {} {} {} {} {}",
                fmt(x0),
                fmt(y0),
                fmt(r0),
                fmt(x1),
                fmt(y1),
                fmt(r1)
            ),
        };
        for stop in &self.stops {
            out.push_str(&format!(" {}:{}", fmt(stop.offset), stop.color.rgb_operands()));
        }
        if self.extend {
            out.push_str(" extend");
        }
        out
    }
}

/// Shading pattern used as a fill color through `/Pattern cs /Pn scn`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub gradient: Gradient,
    pub matrix: Matrix,
}

impl Pattern {
    pub(crate) fn pattern_dict(&self) -> Dict {
        let mut dict = Dict::typed("Pattern")
            .with("PatternType", Value::Int(2))
            .with("Shading", self.gradient.shading_dict());
        if !self.matrix.is_identity() {
            let m = self.matrix;
            dict.set("Matrix", Value::reals(&[m.a, m.b, m.c, m.d, m.e, m.f]));
        }
        dict
    }

    pub(crate) fn key(&self) -> String {
        format!("{} @ {}", self.gradient.key(), self.matrix.operands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(offset: f32, r: f32) -> ColorStop {
        ColorStop {
            offset,
            color: Rgba::new(r, 0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn two_stops_use_a_single_exponential_function() {
        let gradient = Gradient {
            geometry: GradientGeometry::Axial {
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 0.0,
            },
            stops: vec![stop(0.0, 0.0), stop(1.0, 1.0)],
            extend: true,
        };
        let function = gradient.function();
        assert_eq!(function.get("FunctionType"), Some(&Value::Int(2)));
    }

    #[test]
    fn inner_stops_become_stitching_bounds() {
        let gradient = Gradient {
            geometry: GradientGeometry::Axial {
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 0.0,
            },
            stops: vec![stop(0.25, 0.0), stop(0.5, 0.5), stop(0.75, 1.0)],
            extend: false,
        };
        let function = gradient.function();
        assert_eq!(function.get("FunctionType"), Some(&Value::Int(3)));
        assert_eq!(function.get("Bounds"), Some(&Value::reals(&[0.25, 0.5, 0.75])));
        match function.get("Functions") {
            Some(Value::Array(items)) => assert_eq!(items.len(), 4),
            other => panic!("unexpected functions {other:?}"),
        }
    }

    #[test]
    fn identical_patterns_share_a_key() {
        let gradient = Gradient {
            geometry: GradientGeometry::Radial {
                x0: 1.0,
                y0: 1.0,
                r0: 0.0,
                x1: 1.0,
                y1: 1.0,
                r1: 5.0,
            },
            stops: vec![stop(0.0, 0.2), stop(1.0, 0.8)],
            extend: true,
        };
        let a = Pattern {
            gradient: gradient.clone(),
            matrix: Matrix::identity(),
        };
        let b = Pattern {
            gradient,
            matrix: Matrix::translate(1.0, 0.0),
        };
        assert_eq!(a.key(), a.clone().key());
        assert_ne!(a.key(), b.key());
        assert!(a.pattern_dict().get("Matrix").is_none());
        assert!(b.pattern_dict().get("Matrix").is_some());
    }
}
