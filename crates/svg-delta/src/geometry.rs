//! Coarse element bounds, used to spot ids that got reused by a canvas-sized element.
//!
//! Bounds are in user units of the element itself; transforms are ignored. Curve bounds use the
//! control-point hull and arcs contribute their endpoints only.

use crate::dom::{Element, SvgDocument};
use svgtypes::{PathParser, PathSegment, PointsParser};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    fn at(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => f.write_str("width"),
            Axis::Vertical => f.write_str("height"),
        }
    }
}

fn include(bounds: &mut Option<Bounds>, x: f64, y: f64) {
    if !(x.is_finite() && y.is_finite()) {
        return;
    }
    match bounds {
        Some(b) => b.include_point(x, y),
        None => *bounds = Some(Bounds::at(x, y)),
    }
}

/// Bounds of path data. Parsing stops at the first malformed segment, like renderers do.
pub fn path_bounds(d: &str) -> Option<Bounds> {
    let mut bounds = None;
    let (mut cx, mut cy) = (0.0_f64, 0.0_f64);
    let (mut sx, mut sy) = (0.0_f64, 0.0_f64);

    for seg in PathParser::from(d) {
        let Ok(seg) = seg else {
            break;
        };
        let (ox, oy) = (cx, cy);
        let is_move = matches!(seg, PathSegment::MoveTo { .. });
        let resolve = |abs: bool, x: f64, y: f64| if abs { (x, y) } else { (ox + x, oy + y) };

        match seg {
            PathSegment::MoveTo { abs, x, y } => {
                (cx, cy) = resolve(abs, x, y);
                (sx, sy) = (cx, cy);
            }
            PathSegment::LineTo { abs, x, y }
            | PathSegment::SmoothQuadratic { abs, x, y }
            | PathSegment::EllipticalArc { abs, x, y, .. } => {
                (cx, cy) = resolve(abs, x, y);
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                cx = if abs { x } else { ox + x };
            }
            PathSegment::VerticalLineTo { abs, y } => {
                cy = if abs { y } else { oy + y };
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let (ax, ay) = resolve(abs, x1, y1);
                let (bx, by) = resolve(abs, x2, y2);
                include(&mut bounds, ax, ay);
                include(&mut bounds, bx, by);
                (cx, cy) = resolve(abs, x, y);
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let (bx, by) = resolve(abs, x2, y2);
                include(&mut bounds, bx, by);
                (cx, cy) = resolve(abs, x, y);
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let (ax, ay) = resolve(abs, x1, y1);
                include(&mut bounds, ax, ay);
                (cx, cy) = resolve(abs, x, y);
            }
            PathSegment::ClosePath { .. } => {
                (cx, cy) = (sx, sy);
            }
        }
        if !is_move {
            include(&mut bounds, ox, oy);
        }
        include(&mut bounds, cx, cy);
    }

    bounds
}

fn parse_length(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s
        .strip_suffix("px")
        .or_else(|| s.strip_suffix("pt"))
        .unwrap_or(s)
        .trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn length_attr(el: &Element, name: &str) -> Option<f64> {
    el.attr(name).and_then(parse_length)
}

/// Bounds of a shape element, when it has measurable geometry.
pub fn element_bounds(el: &Element) -> Option<Bounds> {
    match el.tag() {
        "path" => path_bounds(el.attr("d")?),
        "rect" | "image" => {
            let x = length_attr(el, "x").unwrap_or(0.0);
            let y = length_attr(el, "y").unwrap_or(0.0);
            let w = length_attr(el, "width")?;
            let h = length_attr(el, "height")?;
            let mut b = Bounds::at(x, y);
            b.include_point(x + w, y + h);
            Some(b)
        }
        "circle" | "ellipse" => {
            let cx = length_attr(el, "cx").unwrap_or(0.0);
            let cy = length_attr(el, "cy").unwrap_or(0.0);
            let (rx, ry) = match el.tag() {
                "circle" => {
                    let r = length_attr(el, "r")?;
                    (r, r)
                }
                _ => (length_attr(el, "rx")?, length_attr(el, "ry")?),
            };
            let mut b = Bounds::at(cx - rx, cy - ry);
            b.include_point(cx + rx, cy + ry);
            Some(b)
        }
        "line" => {
            let mut b = Bounds::at(
                length_attr(el, "x1").unwrap_or(0.0),
                length_attr(el, "y1").unwrap_or(0.0),
            );
            b.include_point(
                length_attr(el, "x2").unwrap_or(0.0),
                length_attr(el, "y2").unwrap_or(0.0),
            );
            Some(b)
        }
        "polyline" | "polygon" => {
            let mut bounds = None;
            for (x, y) in PointsParser::from(el.attr("points")?) {
                include(&mut bounds, x, y);
            }
            bounds
        }
        _ => None,
    }
}

/// Canvas size from the root `viewBox`, falling back to `width`/`height`.
pub fn canvas_size(doc: &SvgDocument) -> Option<(f64, f64)> {
    let root = doc.element(doc.root())?;
    let from_view_box = root.attr("viewBox").and_then(|raw| {
        let nums: Vec<f64> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match nums.as_slice() {
            [_, _, w, h] => Some((*w, *h)),
            _ => None,
        }
    });
    let (w, h) = from_view_box.or_else(|| {
        Some((length_attr(root, "width")?, length_attr(root, "height")?))
    })?;
    if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 {
        Some((w, h))
    } else {
        None
    }
}

/// Returns the axis along which `after` grew from a fraction of the canvas to (nearly) all of it.
pub fn blowup_axis(
    before: Bounds,
    after: Bounds,
    canvas: (f64, f64),
    canvas_fraction: f64,
    min_growth: f64,
) -> Option<Axis> {
    let grew = |old: f64, new: f64, extent: f64| {
        let limit = extent * canvas_fraction;
        new >= limit && old < limit && new >= old * min_growth
    };
    if grew(before.width(), after.width(), canvas.0) {
        return Some(Axis::Horizontal);
    }
    if grew(before.height(), after.height(), canvas.1) {
        return Some(Axis::Vertical);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(b: Bounds, expected: (f64, f64, f64, f64)) {
        let got = (b.min_x, b.min_y, b.max_x, b.max_y);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(got.0, expected.0)
                && close(got.1, expected.1)
                && close(got.2, expected.2)
                && close(got.3, expected.3),
            "got {got:?}, expected {expected:?}"
        );
    }

    #[test]
    fn absolute_polygon() {
        let b = path_bounds("M 1 1 L 3 1 L 3 2 L 1 2 Z").unwrap();
        approx(b, (1.0, 1.0, 3.0, 2.0));
    }

    #[test]
    fn relative_commands_accumulate() {
        let b = path_bounds("m 2 2 l 3 0 v 4 h -5 z").unwrap();
        approx(b, (0.0, 2.0, 5.0, 6.0));
    }

    #[test]
    fn curves_include_control_points() {
        let b = path_bounds("M 0 0 C 0 10 10 10 10 0").unwrap();
        approx(b, (0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn empty_path_has_no_bounds() {
        assert!(path_bounds("").is_none());
    }

    #[test]
    fn view_box_wins_over_width_height() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="460.8pt" height="345.6pt" viewBox="0 0 460.8 345.6"/>"#,
        )
        .unwrap();
        assert_eq!(canvas_size(&doc), Some((460.8, 345.6)));

        let doc =
            SvgDocument::parse(r#"<svg xmlns="http://www.w3.org/2000/svg" width="20px" height="10"/>"#)
                .unwrap();
        assert_eq!(canvas_size(&doc), Some((20.0, 10.0)));
    }

    #[test]
    fn blowup_needs_growth_to_canvas_size() {
        let small = path_bounds("M 1 1 L 3 1 L 3 2 L 1 2 Z").unwrap();
        let full = path_bounds("M 0 0 L 9 0 L 9 9 L 0 9 Z").unwrap();
        let nudged = path_bounds("M 1 1 L 4 1 L 4 2 L 1 2 Z").unwrap();

        assert_eq!(
            blowup_axis(small, full, (10.0, 10.0), 0.8, 2.0),
            Some(Axis::Horizontal)
        );
        assert_eq!(blowup_axis(small, nudged, (10.0, 10.0), 0.8, 2.0), None);
        assert_eq!(blowup_axis(full, full, (10.0, 10.0), 0.8, 2.0), None);
    }
}
