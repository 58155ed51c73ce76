//! # Inkpad: A 2D Vector Graphics Library for Rust
//!
//! Inkpad renders antialiased 2D vector graphics into in-memory image
//! surfaces through a stateful drawing context: build paths out of lines,
//! Bézier curves, and arcs, then fill, stroke, or clip with solid colors,
//! gradients, or other surfaces as the paint source.
//!
//! ## Features
//!
//! - **Stateful contexts**: save/restore stacks, transformation matrices,
//!   and sticky error handling
//! - **Paths**: lines, cubic curves, arcs, rectangles, hit testing, and
//!   extents queries
//! - **Patterns**: solid colors, linear and radial gradients, and surface
//!   patterns with extend and filter control
//! - **Compositing**: the full set of Porter-Duff operators plus additive
//!   blending
//! - **Text**: TrueType/OpenType shaping, toy font selection, and
//!   callback-driven user fonts
//! - **PNG import/export** for image surfaces
//!
//! ## Quick Start
//!
//! ```rust
//! use inkpad::{Context, Format, ImageSurface};
//!
//! let mut surface = ImageSurface::new(Format::ARgb32, 120, 120)?;
//! {
//!     let mut cr = Context::new(&mut surface)?;
//!
//!     // White background
//!     cr.set_source_rgb(1.0, 1.0, 1.0)?;
//!     cr.paint()?;
//!
//!     // A red circle with a dark outline
//!     cr.arc(60.0, 60.0, 40.0, 0.0, std::f64::consts::PI * 2.0)?;
//!     cr.set_source_rgb(0.8, 0.1, 0.1)?;
//!     cr.fill_preserve()?;
//!     cr.set_source_rgb(0.2, 0.2, 0.2)?;
//!     cr.set_line_width(4.0)?;
//!     cr.stroke()?;
//! }
//! surface.write_to_png("circle.png")?;
//! # std::fs::remove_file("circle.png").ok();
//! # Ok::<(), inkpad::Status>(())
//! ```
//!
//! ## Error handling
//!
//! Fallible operations return [`Result`]. On top of that, contexts and
//! patterns keep a sticky [`Status`]: the first error poisons the object,
//! every later mutating call returns that same status without drawing, and
//! `status()` reports it. A long drawing sequence can therefore ignore
//! intermediate results and check once at the end.
//!
//! ## Coordinate spaces
//!
//! Drawing commands take user-space coordinates and are transformed by the
//! current transformation matrix (CTM) into device-space pixels. Paths are
//! fixed into device space as they are built, so changing the CTM afterward
//! does not move geometry already in the path. Stroke widths and dashes are
//! user-space quantities: scaling the CTM scales strokes along with shapes.

pub mod context;
pub mod error;
pub mod font;
pub mod matrix;
pub mod path;
pub mod pattern;
mod png;
mod raster;
pub mod state;
pub mod surface;

// Re-export main types for convenience
pub use context::{Context, Rectangle};
pub use error::{Result, Status};
pub use font::{
    FontExtents, FontFace, FontOptions, FontSlant, FontType, FontWeight, Glyph, HintMetrics,
    HintStyle, ScaledFont, SubpixelOrder, TextCluster, TextClusterFlags, TextExtents,
    UserFontFace,
};
pub use matrix::Matrix;
pub use path::{Path, PathSegment};
pub use pattern::{Color, ColorStop, Extend, Filter, Pattern, PatternType};
pub use state::{Antialias, FillRule, LineCap, LineJoin, Operator};
pub use surface::{Content, Format, ImageSurface, SurfaceType};
