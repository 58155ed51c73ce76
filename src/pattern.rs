//! Paint sources: solid colors, surfaces, and gradients.
//!
//! A [`Pattern`] is usable anywhere color is needed: as a context's source,
//! or as the alpha mask of a `mask` operation. Patterns carry their own
//! matrix (user space to pattern space), extend mode, filter, and a sticky
//! status.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Result, Status};
use crate::matrix::Matrix;
use crate::surface::ImageSurface;

/// A color with non-premultiplied components in the 0.0..=1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    /// Create an opaque color. Components are clamped to 0.0..=1.0.
    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Color::rgba(red, green, blue, 1.0)
    }

    /// Create a translucent color. Components are clamped to 0.0..=1.0.
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Color {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
}

/// One gradient color stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// Position along the gradient's control vector, 0.0..=1.0
    pub offset: f64,
    pub color: Color,
}

/// The kind of paint a pattern provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    Solid,
    Surface,
    Linear,
    Radial,
}

/// How a pattern is extended outside its natural area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extend {
    /// Pixels outside the pattern are fully transparent
    None,
    /// The pattern is tiled by repeating
    Repeat,
    /// The pattern is tiled by reflecting at the edges
    Reflect,
    /// Edge pixels are extended outward
    Pad,
}

/// Filter used when reading pixels from a surface pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// High-performance filter
    Fast,
    /// Reasonable-quality default
    #[default]
    Good,
    /// Highest-quality filter available
    Best,
    /// Nearest-neighbor
    Nearest,
    /// Linear interpolation in two dimensions
    Bilinear,
    /// Gaussian (treated as Best)
    Gaussian,
}

type StopList = SmallVec<[ColorStop; 4]>;

#[derive(Debug, Clone)]
enum PatternKind {
    Solid(Color),
    Surface(Arc<ImageSurface>),
    Linear {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        stops: StopList,
    },
    Radial {
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
        stops: StopList,
    },
}

/// A paint source.
///
/// Patterns are values: cloning one is cheap (surface patterns share their
/// pixels through an `Arc`), and a context takes its own copy on
/// `set_source`. Operations that do not apply to the pattern's kind set a
/// sticky [`Status`] that `status()` reports and that poisons a context the
/// pattern is installed into.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    matrix: Matrix,
    extend: Extend,
    filter: Filter,
    status: Option<Status>,
}

impl Pattern {
    fn new(kind: PatternKind, extend: Extend) -> Self {
        Pattern {
            kind,
            matrix: Matrix::identity(),
            extend,
            filter: Filter::default(),
            status: None,
        }
    }

    /// Create an opaque solid-color pattern.
    pub fn solid_rgb(red: f64, green: f64, blue: f64) -> Self {
        Pattern::new(PatternKind::Solid(Color::rgb(red, green, blue)), Extend::Pad)
    }

    /// Create a translucent solid-color pattern.
    pub fn solid_rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Pattern::new(
            PatternKind::Solid(Color::rgba(red, green, blue, alpha)),
            Extend::Pad,
        )
    }

    /// Create a pattern that paints with a snapshot of `surface`.
    pub fn for_surface(surface: &ImageSurface) -> Self {
        Pattern::new(
            PatternKind::Surface(Arc::new(surface.snapshot())),
            Extend::None,
        )
    }

    pub(crate) fn for_owned_surface(surface: ImageSurface) -> Self {
        Pattern::new(PatternKind::Surface(Arc::new(surface)), Extend::None)
    }

    /// Create a linear gradient along the line from (x0, y0) to (x1, y1).
    ///
    /// Color stops are added with [`Pattern::add_color_stop_rgba`].
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Pattern::new(
            PatternKind::Linear {
                x0,
                y0,
                x1,
                y1,
                stops: StopList::new(),
            },
            Extend::Pad,
        )
    }

    /// Create a radial gradient between the circle centered at (x0, y0)
    /// with radius `r0` and the circle centered at (x1, y1) with radius
    /// `r1`.
    pub fn radial(x0: f64, y0: f64, r0: f64, x1: f64, y1: f64, r1: f64) -> Self {
        Pattern::new(
            PatternKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
                stops: StopList::new(),
            },
            Extend::Pad,
        )
    }

    /// The pattern's kind.
    pub fn pattern_type(&self) -> PatternType {
        match self.kind {
            PatternKind::Solid(_) => PatternType::Solid,
            PatternKind::Surface(_) => PatternType::Surface,
            PatternKind::Linear { .. } => PatternType::Linear,
            PatternKind::Radial { .. } => PatternType::Radial,
        }
    }

    /// The pattern's sticky status.
    pub fn status(&self) -> Result<()> {
        match self.status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    pub(crate) fn set_error(&mut self, status: Status) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Add an opaque color stop to a gradient pattern.
    ///
    /// On a non-gradient pattern this sets the sticky status
    /// `PatternTypeMismatch`.
    pub fn add_color_stop_rgb(&mut self, offset: f64, red: f64, green: f64, blue: f64) {
        self.add_color_stop_rgba(offset, red, green, blue, 1.0);
    }

    /// Add a translucent color stop to a gradient pattern.
    ///
    /// The offset is clamped to 0.0..=1.0. Stops keep their insertion order
    /// when offsets are equal.
    pub fn add_color_stop_rgba(
        &mut self,
        offset: f64,
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
    ) {
        if self.status.is_some() {
            return;
        }

        let stop = ColorStop {
            offset: offset.clamp(0.0, 1.0),
            color: Color::rgba(red, green, blue, alpha),
        };

        match &mut self.kind {
            PatternKind::Linear { stops, .. } | PatternKind::Radial { stops, .. } => {
                // Stable insertion: after existing stops with the same offset.
                let at = stops
                    .iter()
                    .position(|s| s.offset > stop.offset)
                    .unwrap_or(stops.len());
                stops.insert(at, stop);
            }
            _ => self.set_error(Status::PatternTypeMismatch),
        }
    }

    /// Get the solid color of a solid pattern.
    pub fn rgba(&self) -> Result<(f64, f64, f64, f64)> {
        match self.kind {
            PatternKind::Solid(c) => Ok((c.red, c.green, c.blue, c.alpha)),
            _ => Err(Status::PatternTypeMismatch),
        }
    }

    /// Get the surface of a surface pattern.
    pub fn surface(&self) -> Result<&ImageSurface> {
        match &self.kind {
            PatternKind::Surface(s) => Ok(s),
            _ => Err(Status::PatternTypeMismatch),
        }
    }

    /// Get the endpoints of a linear gradient.
    pub fn linear_points(&self) -> Result<(f64, f64, f64, f64)> {
        match self.kind {
            PatternKind::Linear { x0, y0, x1, y1, .. } => Ok((x0, y0, x1, y1)),
            _ => Err(Status::PatternTypeMismatch),
        }
    }

    /// Get the circles of a radial gradient as (x0, y0, r0, x1, y1, r1).
    pub fn radial_circles(&self) -> Result<(f64, f64, f64, f64, f64, f64)> {
        match self.kind {
            PatternKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
                ..
            } => Ok((x0, y0, r0, x1, y1, r1)),
            _ => Err(Status::PatternTypeMismatch),
        }
    }

    /// Number of color stops on a gradient pattern.
    pub fn color_stop_count(&self) -> Result<usize> {
        self.stops().map(|s| s.len())
    }

    /// Get a gradient color stop by index.
    pub fn color_stop(&self, index: usize) -> Result<ColorStop> {
        let stops = self.stops()?;
        stops.get(index).copied().ok_or(Status::InvalidIndex)
    }

    pub(crate) fn stops(&self) -> Result<&[ColorStop]> {
        match &self.kind {
            PatternKind::Linear { stops, .. } | PatternKind::Radial { stops, .. } => Ok(stops),
            _ => Err(Status::PatternTypeMismatch),
        }
    }

    /// Set the pattern matrix (user space to pattern space).
    ///
    /// A non-invertible matrix sets the sticky status `InvalidMatrix`.
    pub fn set_matrix(&mut self, matrix: Matrix) {
        if self.status.is_some() {
            return;
        }
        if !matrix.is_invertible() {
            self.set_error(Status::InvalidMatrix);
            return;
        }
        self.matrix = matrix;
    }

    /// The pattern matrix.
    pub fn matrix(&self) -> Matrix {
        self.matrix
    }

    /// Set how the pattern extends outside its natural area.
    pub fn set_extend(&mut self, extend: Extend) {
        if self.status.is_none() {
            self.extend = extend;
        }
    }

    pub fn extend(&self) -> Extend {
        self.extend
    }

    /// Set the filter used when sampling a surface pattern.
    pub fn set_filter(&mut self, filter: Filter) {
        if self.status.is_none() {
            self.filter = filter;
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }
}
