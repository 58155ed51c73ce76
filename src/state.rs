//! Graphics state management.
//!
//! This module holds the drawing parameters a context snapshots on `save`
//! and restores on `restore`: the transformation matrix, the source
//! pattern, compositing and antialiasing modes, line style, fill rule, and
//! font selection.

use smallvec::SmallVec;

use crate::font::{FontFace, FontOptions};
use crate::matrix::Matrix;
use crate::pattern::Pattern;

/// Compositing operator used when painting a source onto a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Clear the destination where the source is drawn
    Clear,
    /// Replace the destination with the source
    Source,
    /// Draw the source over the destination (default)
    #[default]
    Over,
    /// Keep the source where the destination was opaque
    In,
    /// Keep the source where the destination was transparent
    Out,
    /// Source atop the destination, bounded by the destination
    Atop,
    /// Leave the destination untouched
    Dest,
    /// Draw the destination over the source
    DestOver,
    /// Keep the destination where the source is opaque
    DestIn,
    /// Keep the destination where the source is transparent
    DestOut,
    /// Destination atop the source, bounded by the source
    DestAtop,
    /// Keep source and destination where exactly one is opaque
    Xor,
    /// Add source and destination channel values
    Add,
    /// Saturating addition of source and destination
    Saturate,
}

/// Antialiasing mode for rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Antialias {
    /// Backend default (antialiased)
    #[default]
    Default,
    /// No antialiasing
    None,
    /// Single-channel grayscale antialiasing
    Gray,
    /// Subpixel antialiasing (carried as metadata; rendered as grayscale)
    Subpixel,
}

/// Fill rule for path filling and clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Nonzero winding number rule (default)
    #[default]
    Winding,
    /// Even-odd rule
    EvenOdd,
}

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Stroke is squared off at the endpoint (default)
    #[default]
    Butt,
    /// Semicircular cap centered on the endpoint
    Round,
    /// Square cap extending half the line width past the endpoint
    Square,
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Outer edges extended to a sharp point, subject to the miter limit
    #[default]
    Miter,
    /// Circular arc between the edges
    Round,
    /// Edges connected by a straight cut
    Bevel,
}

/// Stroke properties for path rendering.
///
/// All quantities are in user space: the stroking pen is shaped before the
/// current transformation is applied, so a scaled context scales its
/// strokes.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    /// Line width in user space units (default: 2.0)
    pub line_width: f64,

    /// Line cap style (default: Butt)
    pub line_cap: LineCap,

    /// Line join style (default: Miter)
    pub line_join: LineJoin,

    /// Maximum ratio of miter length to line width before a bevel is used
    /// (default: 10.0)
    pub miter_limit: f64,

    /// Dash pattern: alternating on/off lengths. Empty means solid.
    pub dash: SmallVec<[f64; 8]>,

    /// Offset into the dash pattern at the start of the stroke
    pub dash_offset: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        StrokeStyle {
            line_width: 2.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            dash: SmallVec::new(),
            dash_offset: 0.0,
        }
    }
}

/// A snapshot of every parameter `save`/`restore` preserves.
#[derive(Clone)]
pub(crate) struct GraphicsState {
    /// Current transformation matrix (user space to device space)
    pub ctm: Matrix,

    /// Paint source for drawing operations
    pub source: Pattern,

    /// Compositing operator
    pub operator: Operator,

    /// Antialiasing mode
    pub antialias: Antialias,

    /// Accuracy bound for curve flattening, in device units
    pub tolerance: f64,

    /// Fill rule for `fill` and `clip`
    pub fill_rule: FillRule,

    /// Stroke parameters
    pub stroke: StrokeStyle,

    /// Selected font face, if any
    pub font_face: Option<FontFace>,

    /// Font space to user space transformation
    pub font_matrix: Matrix,

    /// Font rendering options
    pub font_options: FontOptions,

    /// Number of clip entries that belong to outer states; `restore` trims
    /// the clip stack back to this depth
    pub clip_depth: usize,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: Matrix::identity(),
            source: Pattern::solid_rgb(0.0, 0.0, 0.0),
            operator: Operator::default(),
            antialias: Antialias::default(),
            tolerance: 0.1,
            fill_rule: FillRule::default(),
            stroke: StrokeStyle::default(),
            font_face: None,
            font_matrix: Matrix::scaling(10.0, 10.0),
            font_options: FontOptions::default(),
            clip_depth: 0,
        }
    }
}
