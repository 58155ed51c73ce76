//! tiny-skia rasterization glue.
//!
//! Everything backend-specific lives here: enum conversions, turning
//! patterns into shaders, clip masks, and the pixel-probe hit tests. Paths
//! arrive in device space for filling and in user space for stroking (the
//! stroking pen is a user-space quantity; the outline is transformed by the
//! CTM afterwards, which `stroke_path` does for us).

use tiny_skia::{
    BlendMode, FillRule as SkFillRule, FilterQuality, GradientStop, LineCap as SkLineCap,
    LineJoin as SkLineJoin, LinearGradient, Mask, MaskType, Paint as SkPaint,
    Path as SkPath, PathBuilder, Pixmap, Point, RadialGradient, Shader, SpreadMode,
    Stroke, StrokeDash, Transform,
};

use crate::error::{Result, Status};
use crate::matrix::Matrix;
use crate::path::{Path, PathSegment};
use crate::pattern::{Color, Extend, Filter, Pattern, PatternType};
use crate::state::{Antialias, FillRule, LineCap, LineJoin, Operator, StrokeStyle};

// --- Conversion helpers ---

pub(crate) fn to_skia_transform(m: &Matrix) -> Transform {
    Transform::from_row(
        m.xx as f32,
        m.yx as f32,
        m.xy as f32,
        m.yy as f32,
        m.x0 as f32,
        m.y0 as f32,
    )
}

fn to_skia_color(color: Color, alpha: f64) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        color.red as f32,
        color.green as f32,
        color.blue as f32,
        (color.alpha * alpha.clamp(0.0, 1.0)) as f32,
    )
    .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}

pub(crate) fn to_skia_fill_rule(rule: FillRule) -> SkFillRule {
    match rule {
        FillRule::Winding => SkFillRule::Winding,
        FillRule::EvenOdd => SkFillRule::EvenOdd,
    }
}

fn to_skia_blend_mode(operator: Operator) -> BlendMode {
    match operator {
        Operator::Clear => BlendMode::Clear,
        Operator::Source => BlendMode::Source,
        Operator::Over => BlendMode::SourceOver,
        Operator::In => BlendMode::SourceIn,
        Operator::Out => BlendMode::SourceOut,
        Operator::Atop => BlendMode::SourceAtop,
        Operator::Dest => BlendMode::Destination,
        Operator::DestOver => BlendMode::DestinationOver,
        Operator::DestIn => BlendMode::DestinationIn,
        Operator::DestOut => BlendMode::DestinationOut,
        Operator::DestAtop => BlendMode::DestinationAtop,
        Operator::Xor => BlendMode::Xor,
        // Plus is a saturating add, which also stands in for Saturate.
        Operator::Add | Operator::Saturate => BlendMode::Plus,
    }
}

fn to_skia_line_cap(cap: LineCap) -> SkLineCap {
    match cap {
        LineCap::Butt => SkLineCap::Butt,
        LineCap::Round => SkLineCap::Round,
        LineCap::Square => SkLineCap::Square,
    }
}

fn to_skia_line_join(join: LineJoin) -> SkLineJoin {
    match join {
        LineJoin::Miter => SkLineJoin::Miter,
        LineJoin::Round => SkLineJoin::Round,
        LineJoin::Bevel => SkLineJoin::Bevel,
    }
}

fn to_skia_filter(filter: Filter) -> FilterQuality {
    match filter {
        Filter::Fast | Filter::Nearest => FilterQuality::Nearest,
        Filter::Good | Filter::Bilinear => FilterQuality::Bilinear,
        Filter::Best | Filter::Gaussian => FilterQuality::Bicubic,
    }
}

fn to_spread_mode(extend: Extend) -> SpreadMode {
    match extend {
        // No transparent-outside spread mode exists; surface patterns get
        // an explicit footprint mask instead, gradients render padded.
        Extend::None | Extend::Pad => SpreadMode::Pad,
        Extend::Repeat => SpreadMode::Repeat,
        Extend::Reflect => SpreadMode::Reflect,
    }
}

fn antialias_enabled(antialias: Antialias) -> bool {
    !matches!(antialias, Antialias::None)
}

/// Convert a recorded path into a tiny-skia path.
///
/// Returns `None` for empty or degenerate paths, which callers treat as
/// nothing to draw.
pub(crate) fn to_skia_path(path: &Path) -> Option<SkPath> {
    if path.is_empty() {
        return None;
    }

    let mut pb = PathBuilder::new();
    for seg in path.segments() {
        match *seg {
            PathSegment::MoveTo(x, y) => pb.move_to(x as f32, y as f32),
            PathSegment::LineTo(x, y) => pb.line_to(x as f32, y as f32),
            PathSegment::CurveTo(c1x, c1y, c2x, c2y, x, y) => pb.cubic_to(
                c1x as f32,
                c1y as f32,
                c2x as f32,
                c2y as f32,
                x as f32,
                y as f32,
            ),
            PathSegment::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn to_skia_stroke(style: &StrokeStyle) -> Option<Stroke> {
    if style.line_width <= 0.0 {
        return None;
    }

    let dash = if style.dash.is_empty() {
        None
    } else {
        // tiny-skia wants an even number of intervals; odd patterns repeat.
        let mut array: Vec<f32> = style.dash.iter().map(|d| *d as f32).collect();
        if array.len() % 2 == 1 {
            let copy = array.clone();
            array.extend(copy);
        }
        StrokeDash::new(array, style.dash_offset as f32)
    };

    Some(Stroke {
        width: style.line_width as f32,
        miter_limit: style.miter_limit as f32,
        line_cap: to_skia_line_cap(style.line_cap),
        line_join: to_skia_line_join(style.line_join),
        dash,
    })
}

/// Parameters shared by every drawing call.
pub(crate) struct DrawParams<'a> {
    pub source: &'a Pattern,
    pub operator: Operator,
    pub antialias: Antialias,
    /// User space to device space at draw time
    pub ctm: Matrix,
    /// Extra opacity applied on top of the source (for `paint_with_alpha`)
    pub alpha: f64,
}

/// Build a tiny-skia paint for a pattern.
///
/// `target_from_pattern` maps pattern space into the coordinate space the
/// path is drawn in (device space for fills, user space for strokes since
/// `stroke_path` transforms the shader along with the path).
///
/// Returns `Ok(None)` when the pattern paints nothing (no gradient stops or
/// a degenerate gradient), which callers treat as a successful no-op.
fn make_paint<'a>(
    source: &'a Pattern,
    target_from_pattern: &Matrix,
    operator: Operator,
    antialias: Antialias,
    alpha: f64,
) -> Result<Option<SkPaint<'a>>> {
    source.status()?;

    let ts = to_skia_transform(target_from_pattern);
    let shader: Shader<'a> = match source.pattern_type() {
        PatternType::Solid => {
            let (r, g, b, a) = source.rgba()?;
            Shader::SolidColor(to_skia_color(Color::rgba(r, g, b, a), alpha))
        }
        PatternType::Linear => {
            let (x0, y0, x1, y1) = source.linear_points()?;
            let stops = gradient_stops(source, alpha)?;
            match stops {
                None => return Ok(None),
                Some(stops) => {
                    let shader = LinearGradient::new(
                        Point::from_xy(x0 as f32, y0 as f32),
                        Point::from_xy(x1 as f32, y1 as f32),
                        stops,
                        to_spread_mode(source.extend()),
                        ts,
                    );
                    match shader {
                        Some(shader) => shader,
                        None => return Ok(None),
                    }
                }
            }
        }
        PatternType::Radial => {
            let (x0, y0, _r0, x1, y1, r1) = source.radial_circles()?;
            let stops = gradient_stops(source, alpha)?;
            match stops {
                None => return Ok(None),
                Some(stops) => {
                    // The inner circle becomes the focal point; tiny-skia
                    // radial gradients have a single radius.
                    let shader = RadialGradient::new(
                        Point::from_xy(x0 as f32, y0 as f32),
                        Point::from_xy(x1 as f32, y1 as f32),
                        r1 as f32,
                        stops,
                        to_spread_mode(source.extend()),
                        ts,
                    );
                    match shader {
                        Some(shader) => shader,
                        None => return Ok(None),
                    }
                }
            }
        }
        PatternType::Surface => {
            let surface = source.surface()?;
            tiny_skia::Pattern::new(
                surface.pixmap().as_ref(),
                to_spread_mode(source.extend()),
                to_skia_filter(source.filter()),
                alpha.clamp(0.0, 1.0) as f32,
                ts,
            )
        }
    };

    let mut paint = SkPaint::default();
    paint.shader = shader;
    paint.blend_mode = to_skia_blend_mode(operator);
    paint.anti_alias = antialias_enabled(antialias);
    Ok(Some(paint))
}

/// Gradient stops with the extra alpha folded in.
///
/// `Ok(None)` means the gradient has no stops and paints nothing. A single
/// stop is duplicated so the shader constructors accept it.
fn gradient_stops(source: &Pattern, alpha: f64) -> Result<Option<Vec<GradientStop>>> {
    let stops = source.stops()?;
    if stops.is_empty() {
        return Ok(None);
    }

    let mut out: Vec<GradientStop> = stops
        .iter()
        .map(|s| GradientStop::new(s.offset as f32, to_skia_color(s.color, alpha)))
        .collect();
    if out.len() == 1 {
        let c = stops[0].color;
        out.push(GradientStop::new(1.0, to_skia_color(c, alpha)));
    }
    Ok(Some(out))
}

/// The mask to draw through: the clip mask, possibly intersected with the
/// footprint of an `Extend::None` surface pattern.
fn effective_mask(
    params: &DrawParams,
    width: u32,
    height: u32,
    clip: Option<&Mask>,
) -> Result<Option<Mask>> {
    if params.source.pattern_type() != PatternType::Surface
        || params.source.extend() != Extend::None
    {
        return Ok(clip.cloned());
    }

    let surface = params.source.surface()?;
    let pattern_to_device = Matrix::multiply(&params.source.matrix().invert()?, &params.ctm);

    let mut footprint = Path::new();
    footprint.rectangle(0.0, 0.0, surface.width() as f64, surface.height() as f64);
    let footprint = footprint.transformed(&pattern_to_device);
    let Some(sk_footprint) = to_skia_path(&footprint) else {
        return Ok(clip.cloned());
    };

    let mask = match clip {
        Some(clip) => {
            let mut mask = clip.clone();
            mask.intersect_path(
                &sk_footprint,
                SkFillRule::Winding,
                true,
                Transform::identity(),
            );
            mask
        }
        None => {
            let mut mask = Mask::new(width, height).ok_or(Status::NoMemory)?;
            mask.fill_path(&sk_footprint, SkFillRule::Winding, true, Transform::identity());
            mask
        }
    };
    Ok(Some(mask))
}

/// Fill a device-space path.
pub(crate) fn fill(
    pixmap: &mut Pixmap,
    path: &Path,
    rule: FillRule,
    params: &DrawParams,
    clip: Option<&Mask>,
) -> Result<()> {
    let Some(sk_path) = to_skia_path(path) else {
        return Ok(());
    };

    let shader_ts = Matrix::multiply(&params.source.matrix().invert()?, &params.ctm);
    let Some(paint) = make_paint(
        params.source,
        &shader_ts,
        params.operator,
        params.antialias,
        params.alpha,
    )?
    else {
        return Ok(());
    };

    let mask = effective_mask(params, pixmap.width(), pixmap.height(), clip)?;
    pixmap.fill_path(
        &sk_path,
        &paint,
        to_skia_fill_rule(rule),
        Transform::identity(),
        mask.as_ref(),
    );
    Ok(())
}

/// Stroke a user-space path. `stroke_path` shapes the pen in path (user)
/// space and applies the CTM to both outline and shader.
pub(crate) fn stroke(
    pixmap: &mut Pixmap,
    path: &Path,
    style: &StrokeStyle,
    params: &DrawParams,
    clip: Option<&Mask>,
) -> Result<()> {
    let Some(sk_path) = to_skia_path(path) else {
        return Ok(());
    };
    let Some(sk_stroke) = to_skia_stroke(style) else {
        return Ok(());
    };

    let shader_ts = params.source.matrix().invert()?;
    let Some(paint) = make_paint(
        params.source,
        &shader_ts,
        params.operator,
        params.antialias,
        params.alpha,
    )?
    else {
        return Ok(());
    };

    let mask = effective_mask(params, pixmap.width(), pixmap.height(), clip)?;
    pixmap.stroke_path(
        &sk_path,
        &paint,
        &sk_stroke,
        to_skia_transform(&params.ctm),
        mask.as_ref(),
    );
    Ok(())
}

/// Render a pattern over the whole target and keep only its alpha, for use
/// as the mask of a `mask` operation.
pub(crate) fn pattern_alpha_mask(
    width: u32,
    height: u32,
    pattern: &Pattern,
    ctm: &Matrix,
) -> Result<Mask> {
    let mut scratch = Pixmap::new(width, height).ok_or(Status::NoMemory)?;

    let params = DrawParams {
        source: pattern,
        operator: Operator::Source,
        antialias: Antialias::Default,
        ctm: *ctm,
        alpha: 1.0,
    };

    let mut full = Path::new();
    full.rectangle(0.0, 0.0, width as f64, height as f64);
    fill(&mut scratch, &full, FillRule::Winding, &params, None)?;

    Ok(Mask::from_pixmap(scratch.as_ref(), MaskType::Alpha))
}

/// Combine two alpha masks by multiplying coverage.
pub(crate) fn intersect_masks(a: &Mask, b: &Mask) -> Mask {
    let mut out = a.clone();
    let bd = b.data();
    for (o, m) in out.data_mut().iter_mut().zip(bd.iter()) {
        *o = ((*o as u16 * *m as u16) / 255) as u8;
    }
    out
}

/// Build the clip mask for a stack of device-space clip paths.
///
/// An entry that cannot be converted clips everything away, which the
/// all-zero mask expresses naturally.
pub(crate) fn build_clip_mask(
    width: u32,
    height: u32,
    entries: &[(Path, FillRule)],
) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    for (i, (path, rule)) in entries.iter().enumerate() {
        let Some(sk_path) = to_skia_path(path) else {
            return Some(Mask::new(width, height).unwrap());
        };
        if i == 0 {
            mask.fill_path(&sk_path, to_skia_fill_rule(*rule), true, Transform::identity());
        } else {
            mask.intersect_path(&sk_path, to_skia_fill_rule(*rule), true, Transform::identity());
        }
    }
    Some(mask)
}

/// Whether the device-space point (x, y) is inside the filled path.
///
/// Rasterizes a single probe pixel centered on the point so the answer
/// agrees exactly with what filling would touch.
pub(crate) fn hit_fill(path: &Path, rule: FillRule, x: f64, y: f64) -> bool {
    let Some(sk_path) = to_skia_path(path) else {
        return false;
    };
    let Some(mut probe) = Pixmap::new(1, 1) else {
        return false;
    };

    let mut paint = SkPaint::default();
    paint.shader = Shader::SolidColor(tiny_skia::Color::WHITE);
    paint.anti_alias = false;

    let ts = Transform::from_translate(0.5 - x as f32, 0.5 - y as f32);
    probe.fill_path(&sk_path, &paint, to_skia_fill_rule(rule), ts, None);
    probe.data()[3] != 0
}

/// Whether the device-space point (x, y) would be painted by stroking the
/// user-space path with the given style under `ctm`.
pub(crate) fn hit_stroke(
    path: &Path,
    style: &StrokeStyle,
    ctm: &Matrix,
    x: f64,
    y: f64,
) -> bool {
    let Some(sk_path) = to_skia_path(path) else {
        return false;
    };
    let Some(sk_stroke) = to_skia_stroke(style) else {
        return false;
    };
    let Some(mut probe) = Pixmap::new(1, 1) else {
        return false;
    };

    let mut paint = SkPaint::default();
    paint.shader = Shader::SolidColor(tiny_skia::Color::WHITE);
    paint.anti_alias = false;

    let probe_ts = Matrix::multiply(ctm, &Matrix::translation(0.5 - x, 0.5 - y));
    probe.stroke_path(
        &sk_path,
        &paint,
        &sk_stroke,
        to_skia_transform(&probe_ts),
        None,
    );
    probe.data()[3] != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Path {
        let mut p = Path::new();
        p.rectangle(0.0, 0.0, 10.0, 10.0);
        p
    }

    #[test]
    fn test_hit_fill() {
        let path = unit_square();
        assert!(hit_fill(&path, FillRule::Winding, 5.0, 5.0));
        assert!(!hit_fill(&path, FillRule::Winding, 15.0, 5.0));
    }

    #[test]
    fn test_hit_fill_even_odd_hole() {
        // Two nested winding-identical squares: even-odd makes a hole.
        let mut path = Path::new();
        path.rectangle(0.0, 0.0, 20.0, 20.0);
        path.rectangle(5.0, 5.0, 10.0, 10.0);
        assert!(!hit_fill(&path, FillRule::EvenOdd, 10.0, 10.0));
        assert!(hit_fill(&path, FillRule::EvenOdd, 2.0, 2.0));
        assert!(hit_fill(&path, FillRule::Winding, 10.0, 10.0));
    }

    #[test]
    fn test_hit_stroke() {
        let mut path = Path::new();
        path.move_to(0.0, 5.0);
        path.line_to(20.0, 5.0);

        let style = StrokeStyle {
            line_width: 4.0,
            ..Default::default()
        };
        let ctm = Matrix::identity();
        assert!(hit_stroke(&path, &style, &ctm, 10.0, 5.0));
        assert!(hit_stroke(&path, &style, &ctm, 10.0, 6.5));
        assert!(!hit_stroke(&path, &style, &ctm, 10.0, 9.0));
    }

    #[test]
    fn test_clip_mask_intersection() {
        let mut a = Path::new();
        a.rectangle(0.0, 0.0, 10.0, 10.0);
        let mut b = Path::new();
        b.rectangle(5.0, 5.0, 10.0, 10.0);

        let mask = build_clip_mask(
            20,
            20,
            &[(a, FillRule::Winding), (b, FillRule::Winding)],
        )
        .unwrap();

        // Only the 5..10 overlap remains.
        let at = |x: usize, y: usize| mask.data()[y * 20 + x];
        assert_eq!(at(7, 7), 255);
        assert_eq!(at(2, 2), 0);
        assert_eq!(at(12, 12), 0);
    }

    #[test]
    fn test_intersect_masks() {
        let mut left = Path::new();
        left.rectangle(0.0, 0.0, 4.0, 8.0);
        let mut top = Path::new();
        top.rectangle(0.0, 0.0, 8.0, 4.0);

        let a = build_clip_mask(8, 8, &[(left, FillRule::Winding)]).unwrap();
        let b = build_clip_mask(8, 8, &[(top, FillRule::Winding)]).unwrap();
        let combined = intersect_masks(&a, &b);

        assert_eq!(combined.data()[1 * 8 + 1], 255);
        assert_eq!(combined.data()[6 * 8 + 1], 0);
        assert_eq!(combined.data()[1 * 8 + 6], 0);
    }
}
