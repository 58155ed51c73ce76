//! The drawing context.
//!
//! A [`Context`] borrows an [`ImageSurface`] exclusively and records all
//! drawing state: the current transformation, source pattern, path, clip,
//! stroke parameters, and font selection. Paths are fixed into device space
//! as they are built, so later transform changes do not move geometry
//! already in the path.
//!
//! Errors are sticky: the first failing operation poisons the context, every
//! later mutating call returns the same status without drawing, and
//! [`Context::status`] reports it.

use rustc_hash::FxHashMap;
use tiny_skia::{Mask, Pixmap};

use crate::error::{Result, Status};
use crate::font::{
    FontExtents, FontFace, FontOptions, FontSlant, FontType, FontWeight, Glyph, ScaledFont,
    TextCluster, TextClusterFlags, TextExtents,
};
use crate::matrix::Matrix;
use crate::path::{arc_to_cubics, Path, PathSegment};
use crate::pattern::Pattern;
use crate::raster;
use crate::state::{Antialias, FillRule, GraphicsState, LineCap, LineJoin, Operator};
use crate::surface::{Content, ImageSurface};

/// An axis-aligned rectangle in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Smallest accepted flattening tolerance.
const TOLERANCE_MINIMUM: f64 = 0.0002;

struct GroupTarget {
    pixmap: Pixmap,
    content: Content,
    /// CTM in effect when the group was pushed; becomes the matrix of the
    /// pattern `pop_group` returns.
    ctm_at_push: Matrix,
    /// Depth of the state stack right after the implicit save, so `restore`
    /// cannot unwind past the group boundary.
    states_floor: usize,
    /// Depth of the clip stack at push time; `pop_group` drops any clips
    /// added inside the group.
    clip_floor: usize,
}

type ToyKey = (String, FontSlant, FontWeight);

/// A stateful drawing context targeting one image surface.
pub struct Context<'a> {
    surface: &'a mut ImageSurface,
    states: Vec<GraphicsState>,
    /// Current path, in device space
    path: Path,
    status: Option<Status>,
    /// Base transform from the surface's device offset; `set_matrix`
    /// composes with it
    base: Matrix,
    /// Clip paths in device space, intersected in order
    clip_stack: Vec<(Path, FillRule)>,
    clip_mask: Option<Mask>,
    clip_dirty: bool,
    groups: Vec<GroupTarget>,
    fonts: FxHashMap<ToyKey, FontFace>,
    scaled: Option<ScaledFont>,
}

impl<'a> Context<'a> {
    /// Create a context drawing into `surface`.
    ///
    /// # Returns
    /// `Err(Status::SurfaceFinished)` when the surface has been finished.
    pub fn new(surface: &'a mut ImageSurface) -> Result<Self> {
        surface.status()?;

        let (dx, dy) = surface.device_offset();
        let base = Matrix::translation(dx, dy);
        let state = GraphicsState {
            ctm: base,
            ..Default::default()
        };
        Ok(Context {
            surface,
            states: vec![state],
            path: Path::new(),
            status: None,
            base,
            clip_stack: Vec::new(),
            clip_mask: None,
            clip_dirty: false,
            groups: Vec::new(),
            fonts: FxHashMap::default(),
            scaled: None,
        })
    }

    /// The context's sticky status.
    pub fn status(&self) -> Result<()> {
        match self.status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    /// The surface this context draws into.
    pub fn target(&self) -> &ImageSurface {
        self.surface
    }

    fn set_error(&mut self, status: Status) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Run a mutating operation under the sticky-error regime: a poisoned
    /// context refuses it, and a failure poisons the context.
    fn run(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.status()?;
        match f(self) {
            Ok(()) => Ok(()),
            Err(status) => {
                self.set_error(status);
                Err(status)
            }
        }
    }

    // The state stack is never empty: `new` seeds it and `restore` refuses
    // to pop the last entry.
    fn state(&self) -> &GraphicsState {
        self.states.last().unwrap()
    }

    fn state_mut(&mut self) -> &mut GraphicsState {
        self.states.last_mut().unwrap()
    }

    // --- State stack ---

    /// Push a copy of the current graphics state.
    pub fn save(&mut self) -> Result<()> {
        self.run(|cr| {
            let mut snapshot = cr.state().clone();
            snapshot.clip_depth = cr.clip_stack.len();
            cr.states.push(snapshot);
            Ok(())
        })
    }

    /// Pop the graphics state, undoing every change since the matching
    /// `save`, including clips added since then.
    ///
    /// # Returns
    /// `Err(Status::InvalidRestore)` without a matching `save`.
    pub fn restore(&mut self) -> Result<()> {
        self.run(|cr| {
            let floor = cr.groups.last().map_or(1, |g| g.states_floor);
            if cr.states.len() <= floor {
                return Err(Status::InvalidRestore);
            }
            let popped = cr.states.pop().unwrap();
            if cr.clip_stack.len() > popped.clip_depth {
                cr.clip_stack.truncate(popped.clip_depth);
                cr.clip_dirty = true;
            }
            Ok(())
        })
    }

    // --- Groups ---

    /// Redirect drawing to a temporary surface until `pop_group`.
    pub fn push_group(&mut self) -> Result<()> {
        self.push_group_with_content(Content::ColorAlpha)
    }

    /// Redirect drawing to a temporary surface holding only the given
    /// content kind.
    pub fn push_group_with_content(&mut self, content: Content) -> Result<()> {
        self.run(|cr| {
            let pixmap = Pixmap::new(cr.surface.width(), cr.surface.height())
                .ok_or(Status::NoMemory)?;
            let ctm_at_push = cr.state().ctm;

            let mut snapshot = cr.state().clone();
            snapshot.clip_depth = cr.clip_stack.len();
            cr.states.push(snapshot);

            cr.groups.push(GroupTarget {
                pixmap,
                content,
                ctm_at_push,
                states_floor: cr.states.len(),
                clip_floor: cr.clip_stack.len(),
            });
            Ok(())
        })
    }

    /// Finish the current group and return its contents as a pattern.
    ///
    /// The pattern's matrix is set so that painting it under the CTM that
    /// was current at `push_group` places the content where it was drawn.
    ///
    /// # Returns
    /// `Err(Status::InvalidPopGroup)` without a matching `push_group`.
    pub fn pop_group(&mut self) -> Result<Pattern> {
        self.status()?;
        if self.groups.is_empty() {
            self.set_error(Status::InvalidPopGroup);
            return Err(Status::InvalidPopGroup);
        }

        let group = self.groups.pop().unwrap();
        // Undo the implicit save, along with any unbalanced saves and clips
        // made inside the group.
        self.states.truncate(group.states_floor - 1);
        if self.clip_stack.len() > group.clip_floor {
            self.clip_stack.truncate(group.clip_floor);
            self.clip_dirty = true;
        }

        let mut pixmap = group.pixmap;
        match group.content {
            Content::ColorAlpha => {}
            Content::Color => {
                for px in pixmap.data_mut().chunks_exact_mut(4) {
                    px[3] = 255;
                }
            }
            Content::Alpha => {
                for px in pixmap.data_mut().chunks_exact_mut(4) {
                    px[0] = 0;
                    px[1] = 0;
                    px[2] = 0;
                }
            }
        }

        let surface = ImageSurface::from_pixmap(pixmap, group.content.format());
        let mut pattern = Pattern::for_owned_surface(surface);
        pattern.set_matrix(group.ctm_at_push);
        Ok(pattern)
    }

    /// Finish the current group and install its contents as the source.
    pub fn pop_group_to_source(&mut self) -> Result<()> {
        let pattern = self.pop_group()?;
        self.set_source(pattern)
    }

    // --- Source ---

    /// Set the source to an opaque color.
    pub fn set_source_rgb(&mut self, red: f64, green: f64, blue: f64) -> Result<()> {
        self.set_source(Pattern::solid_rgb(red, green, blue))
    }

    /// Set the source to a translucent color.
    pub fn set_source_rgba(&mut self, red: f64, green: f64, blue: f64, alpha: f64) -> Result<()> {
        self.set_source(Pattern::solid_rgba(red, green, blue, alpha))
    }

    /// Set the source pattern.
    ///
    /// Installing a pattern that carries an error poisons the context with
    /// that error.
    pub fn set_source(&mut self, pattern: Pattern) -> Result<()> {
        self.run(|cr| {
            pattern.status()?;
            cr.state_mut().source = pattern;
            Ok(())
        })
    }

    /// Set the source to a snapshot of `surface` placed at (x, y) in user
    /// space.
    pub fn set_source_surface(&mut self, surface: &ImageSurface, x: f64, y: f64) -> Result<()> {
        let mut pattern = Pattern::for_surface(surface);
        pattern.set_matrix(Matrix::translation(-x, -y));
        self.set_source(pattern)
    }

    /// The current source pattern.
    pub fn source(&self) -> &Pattern {
        &self.state().source
    }

    // --- Rendering parameters ---

    pub fn set_operator(&mut self, operator: Operator) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().operator = operator;
            Ok(())
        })
    }

    pub fn operator(&self) -> Operator {
        self.state().operator
    }

    pub fn set_antialias(&mut self, antialias: Antialias) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().antialias = antialias;
            Ok(())
        })
    }

    pub fn antialias(&self) -> Antialias {
        self.state().antialias
    }

    /// Set the curve flattening tolerance, in device units. Values below
    /// the supported minimum are clamped.
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().tolerance = tolerance.max(TOLERANCE_MINIMUM);
            Ok(())
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.state().tolerance
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().fill_rule = rule;
            Ok(())
        })
    }

    pub fn fill_rule(&self) -> FillRule {
        self.state().fill_rule
    }

    /// Set the stroke width in user space units.
    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().stroke.line_width = width;
            Ok(())
        })
    }

    pub fn line_width(&self) -> f64 {
        self.state().stroke.line_width
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().stroke.line_cap = cap;
            Ok(())
        })
    }

    pub fn line_cap(&self) -> LineCap {
        self.state().stroke.line_cap
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().stroke.line_join = join;
            Ok(())
        })
    }

    pub fn line_join(&self) -> LineJoin {
        self.state().stroke.line_join
    }

    pub fn set_miter_limit(&mut self, limit: f64) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().stroke.miter_limit = limit;
            Ok(())
        })
    }

    pub fn miter_limit(&self) -> f64 {
        self.state().stroke.miter_limit
    }

    /// Set the dash pattern: alternating on/off lengths in user space,
    /// starting `offset` into the pattern. An empty slice restores solid
    /// strokes.
    ///
    /// # Returns
    /// `Err(Status::InvalidDash)` when a length is negative or all lengths
    /// are zero.
    pub fn set_dash(&mut self, dashes: &[f64], offset: f64) -> Result<()> {
        self.run(|cr| {
            if !dashes.is_empty() {
                if dashes.iter().any(|d| *d < 0.0) || dashes.iter().all(|d| *d == 0.0) {
                    return Err(Status::InvalidDash);
                }
            }
            let stroke = &mut cr.state_mut().stroke;
            stroke.dash = dashes.iter().copied().collect();
            stroke.dash_offset = offset;
            Ok(())
        })
    }

    /// The current dash pattern and offset.
    pub fn dash(&self) -> (Vec<f64>, f64) {
        let stroke = &self.state().stroke;
        (stroke.dash.to_vec(), stroke.dash_offset)
    }

    pub fn dash_count(&self) -> usize {
        self.state().stroke.dash.len()
    }

    // --- Transformations ---

    /// Translate user space.
    pub fn translate(&mut self, tx: f64, ty: f64) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().ctm.translate(tx, ty);
            Ok(())
        })
    }

    /// Scale user space.
    ///
    /// # Returns
    /// `Err(Status::InvalidMatrix)` for a zero scale factor, which would
    /// make the CTM singular.
    pub fn scale(&mut self, sx: f64, sy: f64) -> Result<()> {
        self.run(|cr| {
            if sx == 0.0 || sy == 0.0 {
                return Err(Status::InvalidMatrix);
            }
            cr.state_mut().ctm.scale(sx, sy);
            Ok(())
        })
    }

    /// Rotate user space by `radians`.
    pub fn rotate(&mut self, radians: f64) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().ctm.rotate(radians);
            Ok(())
        })
    }

    /// Apply `matrix` as an additional transformation of user space.
    pub fn transform(&mut self, matrix: Matrix) -> Result<()> {
        self.run(|cr| {
            if !matrix.is_invertible() {
                return Err(Status::InvalidMatrix);
            }
            let ctm = cr.state().ctm;
            cr.state_mut().ctm = Matrix::multiply(&matrix, &ctm);
            Ok(())
        })
    }

    /// Set the user-to-device transformation outright.
    pub fn set_matrix(&mut self, matrix: Matrix) -> Result<()> {
        self.run(|cr| {
            if !matrix.is_invertible() {
                return Err(Status::InvalidMatrix);
            }
            let base = cr.base;
            cr.state_mut().ctm = Matrix::multiply(&matrix, &base);
            Ok(())
        })
    }

    /// Reset the transformation to identity.
    pub fn identity_matrix(&mut self) -> Result<()> {
        self.set_matrix(Matrix::identity())
    }

    /// The current user-to-device transformation, excluding the surface's
    /// device offset.
    pub fn matrix(&self) -> Matrix {
        // base is a pure translation and always invertible.
        let unbase = self.base.invert().unwrap();
        Matrix::multiply(&self.state().ctm, &unbase)
    }

    /// Transform a point from user space to device space.
    pub fn user_to_device(&self, x: f64, y: f64) -> (f64, f64) {
        self.state().ctm.transform_point(x, y)
    }

    /// Transform a distance vector from user space to device space.
    pub fn user_to_device_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        self.state().ctm.transform_distance(dx, dy)
    }

    /// Transform a point from device space to user space.
    pub fn device_to_user(&self, x: f64, y: f64) -> (f64, f64) {
        self.inverse_ctm().transform_point(x, y)
    }

    /// Transform a distance vector from device space to user space.
    pub fn device_to_user_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        self.inverse_ctm().transform_distance(dx, dy)
    }

    // The CTM is kept invertible by construction: every way of changing it
    // rejects singular matrices.
    fn inverse_ctm(&self) -> Matrix {
        self.state().ctm.invert().unwrap()
    }

    // --- Path construction ---

    /// Clear the current path.
    pub fn new_path(&mut self) -> Result<()> {
        self.run(|cr| {
            cr.path.clear();
            Ok(())
        })
    }

    /// Begin a new subpath without a current point.
    pub fn new_sub_path(&mut self) -> Result<()> {
        self.run(|cr| {
            cr.path.new_sub_path();
            Ok(())
        })
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.run(|cr| {
            let (dx, dy) = cr.state().ctm.transform_point(x, y);
            cr.path.move_to(dx, dy);
            Ok(())
        })
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.run(|cr| {
            let (dx, dy) = cr.state().ctm.transform_point(x, y);
            cr.path.line_to(dx, dy);
            Ok(())
        })
    }

    pub fn curve_to(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    ) -> Result<()> {
        self.run(|cr| {
            let ctm = cr.state().ctm;
            let (c1x, c1y) = ctm.transform_point(x1, y1);
            let (c2x, c2y) = ctm.transform_point(x2, y2);
            let (ex, ey) = ctm.transform_point(x3, y3);
            cr.path.curve_to(c1x, c1y, c2x, c2y, ex, ey);
            Ok(())
        })
    }

    /// Add a closed rectangle subpath.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.run(|cr| {
            let ctm = cr.state().ctm;
            let corners = [
                (x, y),
                (x + width, y),
                (x + width, y + height),
                (x, y + height),
            ];
            let (dx, dy) = ctm.transform_point(corners[0].0, corners[0].1);
            cr.path.move_to(dx, dy);
            for &(cx, cy) in &corners[1..] {
                let (dx, dy) = ctm.transform_point(cx, cy);
                cr.path.line_to(dx, dy);
            }
            cr.path.close_path();
            Ok(())
        })
    }

    /// Add a circular arc traversed with increasing angles.
    ///
    /// A line connects the current point to the arc's start; without a
    /// current point the arc begins a new subpath.
    pub fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) -> Result<()> {
        self.arc_impl(xc, yc, radius, angle1, angle2, false)
    }

    /// Add a circular arc traversed with decreasing angles.
    pub fn arc_negative(
        &mut self,
        xc: f64,
        yc: f64,
        radius: f64,
        angle1: f64,
        angle2: f64,
    ) -> Result<()> {
        self.arc_impl(xc, yc, radius, angle1, angle2, true)
    }

    fn arc_impl(
        &mut self,
        xc: f64,
        yc: f64,
        radius: f64,
        angle1: f64,
        angle2: f64,
        negative: bool,
    ) -> Result<()> {
        self.run(|cr| {
            let ctm = cr.state().ctm;
            let start = (xc + radius * angle1.cos(), yc + radius * angle1.sin());
            let (sx, sy) = ctm.transform_point(start.0, start.1);
            if cr.path.current_point().is_some() {
                cr.path.line_to(sx, sy);
            } else {
                cr.path.move_to(sx, sy);
            }

            for c in arc_to_cubics(xc, yc, radius, angle1, angle2, negative) {
                let (c1x, c1y) = ctm.transform_point(c[0], c[1]);
                let (c2x, c2y) = ctm.transform_point(c[2], c[3]);
                let (ex, ey) = ctm.transform_point(c[4], c[5]);
                cr.path.curve_to(c1x, c1y, c2x, c2y, ex, ey);
            }
            Ok(())
        })
    }

    pub fn close_path(&mut self) -> Result<()> {
        self.run(|cr| {
            cr.path.close_path();
            Ok(())
        })
    }

    /// Move relative to the current point.
    ///
    /// # Returns
    /// `Err(Status::NoCurrentPoint)` when the path has no current point.
    pub fn rel_move_to(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.run(|cr| {
            let (x, y) = cr.user_current_point()?;
            let (dx, dy) = cr.state().ctm.transform_point(x + dx, y + dy);
            cr.path.move_to(dx, dy);
            Ok(())
        })
    }

    /// Draw a line relative to the current point.
    pub fn rel_line_to(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.run(|cr| {
            let (x, y) = cr.user_current_point()?;
            let (dx, dy) = cr.state().ctm.transform_point(x + dx, y + dy);
            cr.path.line_to(dx, dy);
            Ok(())
        })
    }

    /// Draw a curve with control points relative to the current point.
    pub fn rel_curve_to(
        &mut self,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        dx3: f64,
        dy3: f64,
    ) -> Result<()> {
        self.run(|cr| {
            let (x, y) = cr.user_current_point()?;
            let ctm = cr.state().ctm;
            let (c1x, c1y) = ctm.transform_point(x + dx1, y + dy1);
            let (c2x, c2y) = ctm.transform_point(x + dx2, y + dy2);
            let (ex, ey) = ctm.transform_point(x + dx3, y + dy3);
            cr.path.curve_to(c1x, c1y, c2x, c2y, ex, ey);
            Ok(())
        })
    }

    fn user_current_point(&self) -> Result<(f64, f64)> {
        let (dx, dy) = self.path.current_point().ok_or(Status::NoCurrentPoint)?;
        Ok(self.inverse_ctm().transform_point(dx, dy))
    }

    /// Whether the path has a current point.
    pub fn has_current_point(&self) -> bool {
        self.path.current_point().is_some()
    }

    /// The current point in user space.
    ///
    /// # Returns
    /// `Err(Status::NoCurrentPoint)` when the path has none.
    pub fn current_point(&self) -> Result<(f64, f64)> {
        self.user_current_point()
    }

    /// A copy of the current path, in user space.
    pub fn copy_path(&self) -> Result<Path> {
        self.status()?;
        Ok(self.path.transformed(&self.inverse_ctm()))
    }

    /// A copy of the current path with curves flattened to line segments,
    /// in user space.
    pub fn copy_path_flat(&self) -> Result<Path> {
        self.status()?;
        let flat = self.path.flattened(self.state().tolerance);
        Ok(flat.transformed(&self.inverse_ctm()))
    }

    /// Append a user-space path to the current path.
    pub fn append_path(&mut self, path: &Path) -> Result<()> {
        self.run(|cr| {
            let device = path.transformed(&cr.state().ctm);
            cr.path.append(&device);
            Ok(())
        })
    }

    /// The bounding box of the current path in user space, or all zeros for
    /// an empty path.
    pub fn path_extents(&self) -> (f64, f64, f64, f64) {
        self.device_box_to_user(self.path.extents())
    }

    fn device_box_to_user(&self, bbox: Option<(f64, f64, f64, f64)>) -> (f64, f64, f64, f64) {
        let Some((x1, y1, x2, y2)) = bbox else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        let inv = self.inverse_ctm();
        let corners = [
            inv.transform_point(x1, y1),
            inv.transform_point(x2, y1),
            inv.transform_point(x1, y2),
            inv.transform_point(x2, y2),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f64::MAX, f64::min);
        let min_y = corners.iter().map(|c| c.1).fold(f64::MAX, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::MIN, f64::max);
        let max_y = corners.iter().map(|c| c.1).fold(f64::MIN, f64::max);
        (min_x, min_y, max_x, max_y)
    }

    // --- Drawing ---

    fn ensure_clip_mask(&mut self) -> Result<()> {
        if self.clip_stack.is_empty() {
            self.clip_mask = None;
            self.clip_dirty = false;
            return Ok(());
        }
        if self.clip_dirty || self.clip_mask.is_none() {
            let mask =
                raster::build_clip_mask(self.surface.width(), self.surface.height(), &self.clip_stack)
                    .ok_or(Status::NoMemory)?;
            self.clip_mask = Some(mask);
            self.clip_dirty = false;
        }
        Ok(())
    }

    /// Fill a device-space path onto the active target through the clip.
    fn draw_fill_device(&mut self, path: &Path, rule: FillRule, alpha: f64) -> Result<()> {
        self.ensure_clip_mask()?;
        let state = self.states.last().unwrap();
        let params = raster::DrawParams {
            source: &state.source,
            operator: state.operator,
            antialias: state.antialias,
            ctm: state.ctm,
            alpha,
        };
        let mask = self.clip_mask.as_ref();
        let pixmap = match self.groups.last_mut() {
            Some(group) => &mut group.pixmap,
            None => self.surface.pixmap_mut(),
        };
        raster::fill(pixmap, path, rule, &params, mask)
    }

    /// Paint the source over the whole clipped surface.
    pub fn paint(&mut self) -> Result<()> {
        self.paint_with_alpha(1.0)
    }

    /// Paint the source with an extra opacity factor.
    pub fn paint_with_alpha(&mut self, alpha: f64) -> Result<()> {
        self.run(|cr| {
            let mut full = Path::new();
            full.rectangle(0.0, 0.0, cr.surface.width() as f64, cr.surface.height() as f64);
            cr.draw_fill_device(&full, FillRule::Winding, alpha)
        })
    }

    /// Fill the current path and clear it.
    pub fn fill(&mut self) -> Result<()> {
        self.fill_preserve()?;
        self.path.clear();
        Ok(())
    }

    /// Fill the current path, keeping it for further operations.
    pub fn fill_preserve(&mut self) -> Result<()> {
        self.run(|cr| {
            let path = cr.path.clone();
            let rule = cr.state().fill_rule;
            cr.draw_fill_device(&path, rule, 1.0)
        })
    }

    /// Stroke the current path and clear it.
    pub fn stroke(&mut self) -> Result<()> {
        self.stroke_preserve()?;
        self.path.clear();
        Ok(())
    }

    /// Stroke the current path, keeping it for further operations.
    ///
    /// The pen is shaped in user space, so the CTM scales and skews the
    /// stroke along with the geometry.
    pub fn stroke_preserve(&mut self) -> Result<()> {
        self.run(|cr| {
            cr.ensure_clip_mask()?;
            // The stroker wants the path back in user space.
            let user_path = cr.path.transformed(&cr.inverse_ctm());
            let state = cr.states.last().unwrap();
            let params = raster::DrawParams {
                source: &state.source,
                operator: state.operator,
                antialias: state.antialias,
                ctm: state.ctm,
                alpha: 1.0,
            };
            let style = state.stroke.clone();
            let mask = cr.clip_mask.as_ref();
            let pixmap = match cr.groups.last_mut() {
                Some(group) => &mut group.pixmap,
                None => cr.surface.pixmap_mut(),
            };
            raster::stroke(pixmap, &user_path, &style, &params, mask)
        })
    }

    /// Paint the source wherever `pattern` has alpha, scaled by it.
    pub fn mask(&mut self, pattern: &Pattern) -> Result<()> {
        self.run(|cr| {
            pattern.status()?;
            cr.ensure_clip_mask()?;

            let (w, h) = (cr.surface.width(), cr.surface.height());
            let ctm = cr.state().ctm;
            let alpha_mask = raster::pattern_alpha_mask(w, h, pattern, &ctm)?;
            let combined = match &cr.clip_mask {
                Some(clip) => raster::intersect_masks(clip, &alpha_mask),
                None => alpha_mask,
            };

            let mut full = Path::new();
            full.rectangle(0.0, 0.0, w as f64, h as f64);

            let state = cr.states.last().unwrap();
            let params = raster::DrawParams {
                source: &state.source,
                operator: state.operator,
                antialias: state.antialias,
                ctm: state.ctm,
                alpha: 1.0,
            };
            let pixmap = match cr.groups.last_mut() {
                Some(group) => &mut group.pixmap,
                None => cr.surface.pixmap_mut(),
            };
            raster::fill(pixmap, &full, FillRule::Winding, &params, Some(&combined))
        })
    }

    /// Paint the source through the alpha of `surface` placed at (x, y) in
    /// user space.
    pub fn mask_surface(&mut self, surface: &ImageSurface, x: f64, y: f64) -> Result<()> {
        let mut pattern = Pattern::for_surface(surface);
        pattern.set_matrix(Matrix::translation(-x, -y));
        self.mask(&pattern)
    }

    /// Emit the current page. The image backend has no notion of pages, so
    /// this does nothing; kept for API parity.
    pub fn show_page(&mut self) -> Result<()> {
        self.status()
    }

    /// Emit the current page contents without clearing them. A no-op for
    /// the image backend.
    pub fn copy_page(&mut self) -> Result<()> {
        self.status()
    }

    // --- Inked-area queries ---

    /// The user-space bounding box that `fill` would affect.
    pub fn fill_extents(&self) -> (f64, f64, f64, f64) {
        self.device_box_to_user(self.path.extents())
    }

    /// The user-space bounding box that `stroke` would affect.
    ///
    /// Computed from the path's control box padded by the stroke radius, so
    /// it can be looser than the exact ink for sharp miters.
    pub fn stroke_extents(&self) -> (f64, f64, f64, f64) {
        let user_path = self.path.transformed(&self.inverse_ctm());
        let Some((x1, y1, x2, y2)) = user_path.extents() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        let pad = self.state().stroke.line_width / 2.0;
        (x1 - pad, y1 - pad, x2 + pad, y2 + pad)
    }

    /// Whether the user-space point would be covered by `fill`.
    pub fn in_fill(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = self.state().ctm.transform_point(x, y);
        raster::hit_fill(&self.path, self.state().fill_rule, dx, dy)
    }

    /// Whether the user-space point would be covered by `stroke`.
    pub fn in_stroke(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = self.state().ctm.transform_point(x, y);
        let user_path = self.path.transformed(&self.inverse_ctm());
        raster::hit_stroke(&user_path, &self.state().stroke, &self.state().ctm, dx, dy)
    }

    /// Whether the user-space point is inside the current clip.
    pub fn in_clip(&mut self, x: f64, y: f64) -> bool {
        if self.clip_stack.is_empty() {
            return true;
        }
        if self.ensure_clip_mask().is_err() {
            return false;
        }
        let (dx, dy) = self.state().ctm.transform_point(x, y);
        let (px, py) = (dx.floor(), dy.floor());
        if px < 0.0 || py < 0.0 {
            return false;
        }
        let (px, py) = (px as u32, py as u32);
        let w = self.surface.width();
        if px >= w || py >= self.surface.height() {
            return false;
        }
        match &self.clip_mask {
            Some(mask) => mask.data()[(py * w + px) as usize] != 0,
            None => true,
        }
    }

    // --- Clipping ---

    /// Intersect the clip with the current path and clear the path.
    pub fn clip(&mut self) -> Result<()> {
        self.clip_preserve()?;
        self.path.clear();
        Ok(())
    }

    /// Intersect the clip with the current path, keeping the path.
    ///
    /// An empty path clips everything away.
    pub fn clip_preserve(&mut self) -> Result<()> {
        self.run(|cr| {
            let rule = cr.state().fill_rule;
            cr.clip_stack.push((cr.path.clone(), rule));
            cr.clip_dirty = true;
            Ok(())
        })
    }

    /// Remove the clip entirely, regardless of save/restore nesting.
    pub fn reset_clip(&mut self) -> Result<()> {
        self.run(|cr| {
            cr.clip_stack.clear();
            cr.clip_mask = None;
            cr.clip_dirty = false;
            cr.state_mut().clip_depth = 0;
            Ok(())
        })
    }

    /// The user-space bounding box of the current clip.
    pub fn clip_extents(&self) -> (f64, f64, f64, f64) {
        let surface_box: (f64, f64, f64, f64) = (
            0.0,
            0.0,
            self.surface.width() as f64,
            self.surface.height() as f64,
        );

        let mut device_box = surface_box;
        for (path, _) in &self.clip_stack {
            let Some(extents) = path.extents() else {
                return (0.0, 0.0, 0.0, 0.0);
            };
            device_box = (
                device_box.0.max(extents.0),
                device_box.1.max(extents.1),
                device_box.2.min(extents.2),
                device_box.3.min(extents.3),
            );
            if device_box.0 >= device_box.2 || device_box.1 >= device_box.3 {
                return (0.0, 0.0, 0.0, 0.0);
            }
        }
        self.device_box_to_user(Some(device_box))
    }

    /// The current clip as a list of user-space rectangles.
    ///
    /// # Returns
    /// `Err(Status::ClipNotRepresentable)` when a clip path is not an
    /// axis-aligned rectangle or the CTM rotates or skews.
    pub fn copy_clip_rectangle_list(&self) -> Result<Vec<Rectangle>> {
        self.status()?;

        let ctm = self.state().ctm;
        if ctm.xy != 0.0 || ctm.yx != 0.0 {
            return Err(Status::ClipNotRepresentable);
        }

        let mut device_box: (f64, f64, f64, f64) = (
            0.0,
            0.0,
            self.surface.width() as f64,
            self.surface.height() as f64,
        );
        for (path, _) in &self.clip_stack {
            let (x1, y1, x2, y2) =
                rectangular_path_box(path).ok_or(Status::ClipNotRepresentable)?;
            device_box = (
                device_box.0.max(x1),
                device_box.1.max(y1),
                device_box.2.min(x2),
                device_box.3.min(y2),
            );
            if device_box.0 >= device_box.2 || device_box.1 >= device_box.3 {
                return Ok(Vec::new());
            }
        }

        let inv = self.inverse_ctm();
        let (ux1, uy1) = inv.transform_point(device_box.0, device_box.1);
        let (ux2, uy2) = inv.transform_point(device_box.2, device_box.3);
        let (x1, x2) = (ux1.min(ux2), ux1.max(ux2));
        let (y1, y2) = (uy1.min(uy2), uy1.max(uy2));
        Ok(vec![Rectangle {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }])
    }

    // --- Text ---

    /// Register font data under a toy family/slant/weight selection, making
    /// it available to `select_font_face`.
    ///
    /// # Returns
    /// `Err(Status::InvalidFormat)` when the data is not a parseable font.
    pub fn register_font(
        &mut self,
        family: &str,
        slant: FontSlant,
        weight: FontWeight,
        data: Vec<u8>,
    ) -> Result<()> {
        self.run(|cr| {
            let face = FontFace::from_bytes(data, 0)?;
            cr.fonts
                .insert((family.to_lowercase(), slant, weight), face);
            Ok(())
        })
    }

    /// Select a toy font face by family, slant, and weight.
    pub fn select_font_face(
        &mut self,
        family: &str,
        slant: FontSlant,
        weight: FontWeight,
    ) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().font_face = Some(FontFace::toy(family, slant, weight));
            cr.scaled = None;
            Ok(())
        })
    }

    /// Set the font size: a uniform font matrix scale.
    pub fn set_font_size(&mut self, size: f64) -> Result<()> {
        self.set_font_matrix(Matrix::scaling(size, size))
    }

    /// Set the transformation from font space to user space.
    ///
    /// # Returns
    /// `Err(Status::InvalidMatrix)` for a singular matrix.
    pub fn set_font_matrix(&mut self, matrix: Matrix) -> Result<()> {
        self.run(|cr| {
            if !matrix.is_invertible() {
                return Err(Status::InvalidMatrix);
            }
            cr.state_mut().font_matrix = matrix;
            cr.scaled = None;
            Ok(())
        })
    }

    pub fn font_matrix(&self) -> Matrix {
        self.state().font_matrix
    }

    pub fn set_font_options(&mut self, options: FontOptions) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().font_options = options;
            cr.scaled = None;
            Ok(())
        })
    }

    pub fn font_options(&self) -> FontOptions {
        self.state().font_options
    }

    /// Install a font face directly, bypassing toy-font resolution.
    pub fn set_font_face(&mut self, face: FontFace) -> Result<()> {
        self.run(|cr| {
            cr.state_mut().font_face = Some(face);
            cr.scaled = None;
            Ok(())
        })
    }

    /// The currently selected font face, if any.
    pub fn font_face(&self) -> Option<&FontFace> {
        self.state().font_face.as_ref()
    }

    /// Install a scaled font, adopting its face, font matrix, and options.
    pub fn set_scaled_font(&mut self, font: &ScaledFont) -> Result<()> {
        self.run(|cr| {
            let state = cr.state_mut();
            state.font_face = Some(font.face().clone());
            state.font_matrix = font.font_matrix();
            state.font_options = font.options();
            cr.scaled = Some(font.clone());
            Ok(())
        })
    }

    /// The scaled font for the current selection, creating it on demand.
    ///
    /// # Returns
    /// `Err(Status::FontTypeMismatch)` when a toy selection cannot be
    /// resolved against the registered fonts.
    pub fn scaled_font(&mut self) -> Result<ScaledFont> {
        self.status()?;

        let face = self.resolve_font_face()?;
        let state = self.state();
        if let Some(cached) = &self.scaled {
            if *cached.face() == face
                && cached.font_matrix() == state.font_matrix
                && cached.ctm() == state.ctm
                && cached.options() == state.font_options
            {
                return Ok(cached.clone());
            }
        }

        let font = ScaledFont::new(face, state.font_matrix, state.ctm, state.font_options)?;
        self.scaled = Some(font.clone());
        Ok(font)
    }

    /// Resolve the selected face: toy selections go through the registry,
    /// falling back to the family's normal variant.
    fn resolve_font_face(&self) -> Result<FontFace> {
        let face = match &self.state().font_face {
            Some(face) => face.clone(),
            None => FontFace::toy("sans-serif", FontSlant::Normal, FontWeight::Normal),
        };
        if face.font_type() != FontType::Toy {
            return Ok(face);
        }

        let family = face.toy_family()?.to_lowercase();
        let key = (family.clone(), face.toy_slant()?, face.toy_weight()?);
        if let Some(found) = self.fonts.get(&key) {
            return Ok(found.clone());
        }
        let fallback = (family, FontSlant::Normal, FontWeight::Normal);
        self.fonts
            .get(&fallback)
            .cloned()
            .ok_or(Status::FontTypeMismatch)
    }

    /// Draw text at the current point and advance it.
    pub fn show_text(&mut self, text: &str) -> Result<()> {
        self.run(|cr| {
            let font = cr.scaled_font_internal()?;
            let (x, y) = cr.path.current_point().map_or((0.0, 0.0), |(dx, dy)| {
                cr.inverse_ctm().transform_point(dx, dy)
            });
            let (glyphs, _, _) = font.text_to_glyphs(x, y, text)?;
            cr.draw_glyphs(&font, &glyphs)?;

            let extents = font.text_extents(text)?;
            let (dx, dy) = cr
                .state()
                .ctm
                .transform_point(x + extents.x_advance, y + extents.y_advance);
            cr.path.move_to(dx, dy);
            Ok(())
        })
    }

    /// Draw an explicit glyph array.
    pub fn show_glyphs(&mut self, glyphs: &[Glyph]) -> Result<()> {
        self.run(|cr| {
            let font = cr.scaled_font_internal()?;
            cr.draw_glyphs(&font, glyphs)
        })
    }

    /// Draw glyphs with an explicit byte-to-glyph cluster mapping.
    ///
    /// # Returns
    /// `Err(Status::InvalidClusters)` when the clusters do not cover the
    /// text and glyphs exactly.
    pub fn show_text_glyphs(
        &mut self,
        text: &str,
        glyphs: &[Glyph],
        clusters: &[TextCluster],
        _flags: TextClusterFlags,
    ) -> Result<()> {
        self.run(|cr| {
            let bytes: usize = clusters.iter().map(|c| c.num_bytes).sum();
            let count: usize = clusters.iter().map(|c| c.num_glyphs).sum();
            if bytes != text.len() || count != glyphs.len() {
                return Err(Status::InvalidClusters);
            }
            let font = cr.scaled_font_internal()?;
            cr.draw_glyphs(&font, glyphs)
        })
    }

    // scaled_font minus the status check, for use inside `run`.
    fn scaled_font_internal(&mut self) -> Result<ScaledFont> {
        let face = self.resolve_font_face()?;
        let state = self.state();
        if let Some(cached) = &self.scaled {
            if *cached.face() == face
                && cached.font_matrix() == state.font_matrix
                && cached.ctm() == state.ctm
                && cached.options() == state.font_options
            {
                return Ok(cached.clone());
            }
        }
        let font = ScaledFont::new(face, state.font_matrix, state.ctm, state.font_options)?;
        self.scaled = Some(font.clone());
        Ok(font)
    }

    fn draw_glyphs(&mut self, font: &ScaledFont, glyphs: &[Glyph]) -> Result<()> {
        if glyphs.is_empty() {
            return Ok(());
        }
        if font.face().font_type() == FontType::User {
            return self.draw_user_glyphs(font, glyphs);
        }

        // Collect the outlines into one device path and fill it with the
        // source.
        let ctm = self.state().ctm;
        let mut device = Path::new();
        for glyph in glyphs {
            let outline = font.glyph_outline_user(glyph)?;
            device.append(&outline.transformed(&ctm));
        }

        let antialias = self.glyph_antialias(font);
        let saved = std::mem::replace(&mut self.state_mut().antialias, antialias);
        let result = self.draw_fill_device(&device, FillRule::Winding, 1.0);
        self.state_mut().antialias = saved;
        result
    }

    // Font options override the context antialias mode for glyphs.
    fn glyph_antialias(&self, font: &ScaledFont) -> Antialias {
        match font.options().antialias() {
            Antialias::Default => self.state().antialias,
            other => other,
        }
    }

    /// Draw user-font glyphs by running the render callback against this
    /// context, with the CTM set so the callback draws in font space.
    fn draw_user_glyphs(&mut self, font: &ScaledFont, glyphs: &[Glyph]) -> Result<()> {
        let face = font.face().user_face().ok_or(Status::FontTypeMismatch)?;
        let render = face.render_glyph_func().ok_or(Status::UserFontError)?;

        for glyph in glyphs {
            let mut snapshot = self.state().clone();
            snapshot.clip_depth = self.clip_stack.len();
            self.states.push(snapshot);
            let saved_path = std::mem::take(&mut self.path);

            let user_from_font = Matrix::multiply(
                &font.font_matrix(),
                &Matrix::translation(glyph.x, glyph.y),
            );
            let glyph_ctm = Matrix::multiply(&user_from_font, &self.state().ctm);
            self.state_mut().ctm = glyph_ctm;

            let mut extents = TextExtents::default();
            let result = render(font, glyph.index, self, &mut extents);

            self.path = saved_path;
            self.states.pop();
            result?;
        }
        Ok(())
    }

    /// Append the outline of `text` at the current point to the path.
    pub fn text_path(&mut self, text: &str) -> Result<()> {
        self.run(|cr| {
            let font = cr.scaled_font_internal()?;
            let (x, y) = cr.path.current_point().map_or((0.0, 0.0), |(dx, dy)| {
                cr.inverse_ctm().transform_point(dx, dy)
            });
            let (glyphs, _, _) = font.text_to_glyphs(x, y, text)?;
            cr.append_glyph_outlines(&font, &glyphs)?;

            let extents = font.text_extents(text)?;
            let (dx, dy) = cr
                .state()
                .ctm
                .transform_point(x + extents.x_advance, y + extents.y_advance);
            cr.path.move_to(dx, dy);
            Ok(())
        })
    }

    /// Append glyph outlines to the path.
    pub fn glyph_path(&mut self, glyphs: &[Glyph]) -> Result<()> {
        self.run(|cr| {
            let font = cr.scaled_font_internal()?;
            cr.append_glyph_outlines(&font, glyphs)
        })
    }

    fn append_glyph_outlines(&mut self, font: &ScaledFont, glyphs: &[Glyph]) -> Result<()> {
        let ctm = self.state().ctm;
        for glyph in glyphs {
            let outline = font.glyph_outline_user(glyph)?;
            self.path.append(&outline.transformed(&ctm));
        }
        Ok(())
    }

    /// Ink and advance extents of `text` under the current font.
    pub fn text_extents(&mut self, text: &str) -> Result<TextExtents> {
        let font = self.scaled_font()?;
        font.text_extents(text)
    }

    /// Ink and advance extents of a glyph array under the current font.
    pub fn glyph_extents(&mut self, glyphs: &[Glyph]) -> Result<TextExtents> {
        let font = self.scaled_font()?;
        font.glyph_extents(glyphs)
    }

    /// Metrics of the current font.
    pub fn font_extents(&mut self) -> Result<FontExtents> {
        let font = self.scaled_font()?;
        font.extents()
    }
}

/// If the path is a single axis-aligned rectangle, its device-space box.
fn rectangular_path_box(path: &Path) -> Option<(f64, f64, f64, f64)> {
    let segs = path.segments();
    let closed = matches!(segs.last(), Some(PathSegment::ClosePath));
    let points: Vec<(f64, f64)> = segs
        .iter()
        .filter_map(|seg| match *seg {
            PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => Some((x, y)),
            _ => None,
        })
        .collect();
    if !closed || points.len() != 4 || segs.len() != 5 {
        return None;
    }

    // Each consecutive edge must be axis-aligned.
    for i in 0..4 {
        let a = points[i];
        let b = points[(i + 1) % 4];
        if a.0 != b.0 && a.1 != b.1 {
            return None;
        }
    }

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let x1 = xs.iter().copied().fold(f64::MAX, f64::min);
    let x2 = xs.iter().copied().fold(f64::MIN, f64::max);
    let y1 = ys.iter().copied().fold(f64::MAX, f64::min);
    let y2 = ys.iter().copied().fold(f64::MIN, f64::max);
    Some((x1, y1, x2, y2))
}
