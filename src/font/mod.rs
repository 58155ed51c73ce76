//! Font faces, scaled fonts, and text shaping.
//!
//! A [`FontFace`] describes an unscaled font: either real TrueType/OpenType
//! data, a "toy" family/slant/weight selector that a context resolves
//! through its font registry, or a callback-driven user font. A
//! [`ScaledFont`] pairs a face with a font matrix, a CTM, and rendering
//! options, and answers every metrics and shaping question. Glyph outlines
//! are produced in font units and cached.

mod user;

pub use user::UserFontFace;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rustc_hash::FxHashMap;
use rustybuzz::UnicodeBuffer;
use ttf_parser::{Face, GlyphId};

use crate::error::{Result, Status};
use crate::matrix::Matrix;
use crate::path::Path;
use crate::state::Antialias;

/// Slant of a toy font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Weight of a toy font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// The kind of a font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontType {
    /// A family/slant/weight selector resolved through the context registry
    Toy,
    /// TrueType or OpenType font data
    Ttf,
    /// Glyphs drawn by user callbacks
    User,
}

/// Subpixel component order for `Antialias::Subpixel`.
///
/// Carried as metadata; rendering is grayscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubpixelOrder {
    #[default]
    Default,
    Rgb,
    Bgr,
    Vrgb,
    Vbgr,
}

/// Hinting style. Carried as metadata; outlines are not hinted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintStyle {
    #[default]
    Default,
    None,
    Slight,
    Medium,
    Full,
}

/// Whether font metrics are quantized to integer device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintMetrics {
    #[default]
    Default,
    Off,
    On,
}

/// Options governing how fonts are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontOptions {
    antialias: Antialias,
    subpixel_order: SubpixelOrder,
    hint_style: HintStyle,
    hint_metrics: HintMetrics,
}

impl FontOptions {
    pub fn new() -> Self {
        FontOptions::default()
    }

    /// Overwrite every non-default setting of `self` with `other`'s.
    pub fn merge(&mut self, other: &FontOptions) {
        if other.antialias != Antialias::Default {
            self.antialias = other.antialias;
        }
        if other.subpixel_order != SubpixelOrder::Default {
            self.subpixel_order = other.subpixel_order;
        }
        if other.hint_style != HintStyle::Default {
            self.hint_style = other.hint_style;
        }
        if other.hint_metrics != HintMetrics::Default {
            self.hint_metrics = other.hint_metrics;
        }
    }

    pub fn set_antialias(&mut self, antialias: Antialias) {
        self.antialias = antialias;
    }

    pub fn antialias(&self) -> Antialias {
        self.antialias
    }

    pub fn set_subpixel_order(&mut self, order: SubpixelOrder) {
        self.subpixel_order = order;
    }

    pub fn subpixel_order(&self) -> SubpixelOrder {
        self.subpixel_order
    }

    pub fn set_hint_style(&mut self, style: HintStyle) {
        self.hint_style = style;
    }

    pub fn hint_style(&self) -> HintStyle {
        self.hint_style
    }

    pub fn set_hint_metrics(&mut self, metrics: HintMetrics) {
        self.hint_metrics = metrics;
    }

    pub fn hint_metrics(&self) -> HintMetrics {
        self.hint_metrics
    }
}

/// One positioned glyph. The position is the glyph origin in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Glyph index in the font (not a character code)
    pub index: u32,
    pub x: f64,
    pub y: f64,
}

/// Extents of a run of text or glyphs, in user space.
///
/// Bearings are offsets from the origin to the top-left of the inked
/// rectangle; `y_bearing` is typically negative since text extends above
/// the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtents {
    pub x_bearing: f64,
    pub y_bearing: f64,
    pub width: f64,
    pub height: f64,
    pub x_advance: f64,
    pub y_advance: f64,
}

/// Metrics of a font as a whole, in user space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontExtents {
    pub ascent: f64,
    pub descent: f64,
    pub height: f64,
    pub max_x_advance: f64,
    pub max_y_advance: f64,
}

/// Maps a run of text bytes to a run of glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCluster {
    pub num_bytes: usize,
    pub num_glyphs: usize,
}

/// Cluster mapping direction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextClusterFlags {
    /// Clusters map to glyphs from the end of the glyph array backward
    pub backward: bool,
}

#[derive(Debug)]
pub(crate) enum FaceKind {
    Ttf { data: Arc<Vec<u8>>, index: u32 },
    Toy {
        family: String,
        slant: FontSlant,
        weight: FontWeight,
    },
    User(UserFontFace),
}

/// An unscaled font face.
///
/// Faces are cheap to clone; TrueType data is shared through an `Arc`.
#[derive(Clone, Debug)]
pub struct FontFace {
    kind: Arc<FaceKind>,
}

impl PartialEq for FontFace {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.kind, &other.kind)
    }
}

impl FontFace {
    /// Create a face from TrueType or OpenType data.
    ///
    /// # Arguments
    /// * `data` - The raw font file contents
    /// * `index` - Face index within a collection (0 for single fonts)
    ///
    /// # Returns
    /// `Err(Status::InvalidFormat)` when the data cannot be parsed.
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self> {
        Face::parse(&data, index).map_err(|_| Status::InvalidFormat)?;
        Ok(FontFace {
            kind: Arc::new(FaceKind::Ttf {
                data: Arc::new(data),
                index,
            }),
        })
    }

    /// Create a toy face from a family name plus slant and weight.
    ///
    /// The face carries the selection only; a context resolves it against
    /// its registered fonts when text is drawn or measured.
    pub fn toy(family: &str, slant: FontSlant, weight: FontWeight) -> Self {
        FontFace {
            kind: Arc::new(FaceKind::Toy {
                family: family.to_string(),
                slant,
                weight,
            }),
        }
    }

    pub(crate) fn from_user(face: UserFontFace) -> Self {
        FontFace {
            kind: Arc::new(FaceKind::User(face)),
        }
    }

    pub fn font_type(&self) -> FontType {
        match *self.kind {
            FaceKind::Ttf { .. } => FontType::Ttf,
            FaceKind::Toy { .. } => FontType::Toy,
            FaceKind::User(_) => FontType::User,
        }
    }

    /// The family of a toy face.
    ///
    /// # Returns
    /// `Err(Status::FontTypeMismatch)` on non-toy faces.
    pub fn toy_family(&self) -> Result<&str> {
        match &*self.kind {
            FaceKind::Toy { family, .. } => Ok(family),
            _ => Err(Status::FontTypeMismatch),
        }
    }

    /// The slant of a toy face.
    pub fn toy_slant(&self) -> Result<FontSlant> {
        match *self.kind {
            FaceKind::Toy { slant, .. } => Ok(slant),
            _ => Err(Status::FontTypeMismatch),
        }
    }

    /// The weight of a toy face.
    pub fn toy_weight(&self) -> Result<FontWeight> {
        match *self.kind {
            FaceKind::Toy { weight, .. } => Ok(weight),
            _ => Err(Status::FontTypeMismatch),
        }
    }

    pub(crate) fn kind(&self) -> &FaceKind {
        &self.kind
    }

    pub(crate) fn user_face(&self) -> Option<&UserFontFace> {
        match &*self.kind {
            FaceKind::User(face) => Some(face),
            _ => None,
        }
    }
}

const GLYPH_CACHE_SIZE: usize = 256;

/// Em-space quantities read from the font tables once, when the scaled
/// font is built.
#[derive(Clone, Copy)]
struct FaceMetrics {
    upem: f64,
    glyph_count: u32,
    ascent_em: f64,
    descent_em: f64,
    line_em: f64,
    max_advance_em: f64,
}

impl FaceMetrics {
    fn from_face(face: &Face) -> Self {
        let upem = face.units_per_em() as f64;
        let ascent_em = face.ascender() as f64 / upem;
        let descent_em = -(face.descender() as f64) / upem;
        let gap_em = face.line_gap() as f64 / upem;

        // The widest advance in the font.
        let max_advance_em = (0..face.number_of_glyphs())
            .filter_map(|i| face.glyph_hor_advance(GlyphId(i)))
            .max()
            .unwrap_or(0) as f64
            / upem;

        FaceMetrics {
            upem,
            glyph_count: face.number_of_glyphs() as u32,
            ascent_em,
            descent_em,
            line_em: ascent_em + descent_em + gap_em,
            max_advance_em,
        }
    }
}

/// A shaped glyph run: positioned glyphs, their cluster mapping, and the
/// total pen advance in user space.
struct ShapedRun {
    glyphs: Vec<Glyph>,
    clusters: Vec<TextCluster>,
    flags: TextClusterFlags,
    advance: (f64, f64),
}

/// A font face bound to a font matrix, a CTM, and options.
///
/// All metrics and glyph positions it reports are in user space. Cloning
/// shares the glyph and advance caches.
#[derive(Clone)]
pub struct ScaledFont {
    face: FontFace,
    font_matrix: Matrix,
    ctm: Matrix,
    options: FontOptions,
    metrics: Option<FaceMetrics>,
    glyph_cache: Arc<Mutex<LruCache<u32, Path>>>,
    advance_cache: Arc<Mutex<FxHashMap<u32, f64>>>,
}

impl fmt::Debug for ScaledFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledFont")
            .field("font_type", &self.face.font_type())
            .field("font_matrix", &self.font_matrix)
            .field("ctm", &self.ctm)
            .finish()
    }
}

impl ScaledFont {
    /// Bind a face to a font matrix and CTM.
    ///
    /// # Returns
    /// `Err(Status::InvalidMatrix)` when either matrix is singular.
    pub fn new(
        face: FontFace,
        font_matrix: Matrix,
        ctm: Matrix,
        options: FontOptions,
    ) -> Result<Self> {
        if !font_matrix.is_invertible() || !ctm.is_invertible() {
            return Err(Status::InvalidMatrix);
        }
        if let Some(user) = face.user_face() {
            user.freeze();
        }
        let metrics = match face.kind() {
            FaceKind::Ttf { data, index } => {
                let parsed = Face::parse(data, *index).map_err(|_| Status::InvalidFormat)?;
                Some(FaceMetrics::from_face(&parsed))
            }
            _ => None,
        };
        Ok(ScaledFont {
            face,
            font_matrix,
            ctm,
            options,
            metrics,
            glyph_cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(GLYPH_CACHE_SIZE).unwrap(),
            ))),
            advance_cache: Arc::new(Mutex::new(FxHashMap::default())),
        })
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn font_matrix(&self) -> Matrix {
        self.font_matrix
    }

    pub fn ctm(&self) -> Matrix {
        self.ctm
    }

    pub fn options(&self) -> FontOptions {
        self.options
    }

    /// Run `f` with the parsed TrueType face. Only cache misses come
    /// through here; everything metrics-shaped is answered from
    /// [`FaceMetrics`].
    ///
    /// # Returns
    /// `Err(Status::FontTypeMismatch)` unless the face carries font data.
    fn with_face<T>(&self, f: impl FnOnce(&Face) -> T) -> Result<T> {
        match self.face.kind() {
            FaceKind::Ttf { data, index } => {
                let face = Face::parse(data, *index).map_err(|_| Status::InvalidFormat)?;
                Ok(f(&face))
            }
            _ => Err(Status::FontTypeMismatch),
        }
    }

    fn metrics(&self) -> Result<FaceMetrics> {
        self.metrics.ok_or(Status::FontTypeMismatch)
    }

    /// The transformation from font units to user space: a scale to em
    /// space with the y axis flipped to point down, then the font matrix.
    fn glyph_to_user(&self, upem: f64) -> Matrix {
        Matrix::multiply(&Matrix::scaling(1.0 / upem, -1.0 / upem), &self.font_matrix)
    }

    /// Whole-font metrics in user space.
    pub fn extents(&self) -> Result<FontExtents> {
        if self.face.font_type() == FontType::User {
            return self.user_font_extents();
        }

        let m = self.metrics()?;
        let (_, dy_asc) = self.font_matrix.transform_distance(0.0, m.ascent_em);
        let (_, dy_desc) = self.font_matrix.transform_distance(0.0, m.descent_em);
        let (_, dy_line) = self.font_matrix.transform_distance(0.0, m.line_em);
        let (dx_adv, _) = self.font_matrix.transform_distance(m.max_advance_em, 0.0);

        Ok(FontExtents {
            ascent: dy_asc.abs(),
            descent: dy_desc.abs(),
            height: dy_line.abs(),
            max_x_advance: dx_adv.abs(),
            max_y_advance: 0.0,
        })
    }

    /// Look up the glyph index for a character, if the font has one.
    pub fn glyph_index(&self, c: char) -> Result<Option<u32>> {
        self.with_face(|face| face.glyph_index(c).map(|g| g.0 as u32))
    }

    /// Convert text to positioned glyphs starting at (x, y), with the
    /// byte-to-glyph cluster mapping.
    ///
    /// Shaping handles kerning, ligatures, and script-specific forms, so
    /// one cluster can span several bytes or glyphs.
    pub fn text_to_glyphs(
        &self,
        x: f64,
        y: f64,
        text: &str,
    ) -> Result<(Vec<Glyph>, Vec<TextCluster>, TextClusterFlags)> {
        if let FaceKind::User(_) = self.face.kind() {
            return self.user_text_to_glyphs(x, y, text);
        }
        let run = self.shape(x, y, text)?;
        Ok((run.glyphs, run.clusters, run.flags))
    }

    /// Shape text into a positioned glyph run.
    fn shape(&self, x: f64, y: f64, text: &str) -> Result<ShapedRun> {
        let (data, index) = match self.face.kind() {
            FaceKind::Ttf { data, index } => (data, *index),
            _ => return Err(Status::FontTypeMismatch),
        };
        let buzz = rustybuzz::Face::from_slice(data, index).ok_or(Status::InvalidFormat)?;
        let upem = buzz.units_per_em() as f64;

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let shaped = rustybuzz::shape(&buzz, &[], buffer);

        let infos = shaped.glyph_infos();
        let positions = shaped.glyph_positions();

        let mut glyphs = Vec::with_capacity(infos.len());
        let (mut pen_x, mut pen_y) = (x, y);
        for (info, pos) in infos.iter().zip(positions) {
            let (ox, oy) = self.font_matrix.transform_distance(
                pos.x_offset as f64 / upem,
                -(pos.y_offset as f64) / upem,
            );
            glyphs.push(Glyph {
                index: info.glyph_id,
                x: pen_x + ox,
                y: pen_y + oy,
            });

            let (ax, ay) = self.font_matrix.transform_distance(
                pos.x_advance as f64 / upem,
                -(pos.y_advance as f64) / upem,
            );
            pen_x += ax;
            pen_y += ay;
        }

        let backward = infos.len() > 1 && infos[0].cluster > infos[infos.len() - 1].cluster;
        let clusters = build_clusters(text, infos, backward);

        Ok(ShapedRun {
            glyphs,
            clusters,
            flags: TextClusterFlags { backward },
            advance: (pen_x - x, pen_y - y),
        })
    }

    /// Ink and advance extents of a text string, in user space.
    pub fn text_extents(&self, text: &str) -> Result<TextExtents> {
        if self.face.font_type() == FontType::User {
            let (glyphs, _, _) = self.text_to_glyphs(0.0, 0.0, text)?;
            return self.glyph_extents(&glyphs);
        }

        let run = self.shape(0.0, 0.0, text)?;
        let mut extents = self.glyph_extents(&run.glyphs)?;
        // The advance comes from shaping: it keeps positioning adjustments
        // on the final glyph and trailing whitespace that has no ink.
        extents.x_advance = run.advance.0;
        extents.y_advance = run.advance.1;
        Ok(extents)
    }

    /// Ink and advance extents of an explicit glyph array, in user space.
    ///
    /// # Returns
    /// `Err(Status::InvalidIndex)` when a glyph index is out of range for
    /// the font.
    pub fn glyph_extents(&self, glyphs: &[Glyph]) -> Result<TextExtents> {
        if glyphs.is_empty() {
            return Ok(TextExtents::default());
        }
        if self.face.font_type() == FontType::User {
            return self.user_glyph_extents(glyphs);
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        let mut any_ink = false;

        for glyph in glyphs {
            let outline = self.glyph_outline_user(glyph)?;
            if let Some((x1, y1, x2, y2)) = outline.extents() {
                min_x = min_x.min(x1);
                min_y = min_y.min(y1);
                max_x = max_x.max(x2);
                max_y = max_y.max(y2);
                any_ink = true;
            }
        }

        let first = glyphs[0];
        let last = glyphs[glyphs.len() - 1];
        let (ax, ay) = self.glyph_advance(last.index)?;

        let mut extents = TextExtents {
            x_advance: last.x + ax - first.x,
            y_advance: last.y + ay - first.y,
            ..Default::default()
        };
        if any_ink {
            extents.x_bearing = min_x - first.x;
            extents.y_bearing = min_y - first.y;
            extents.width = max_x - min_x;
            extents.height = max_y - min_y;
        }
        Ok(extents)
    }

    /// A glyph's advance vector in user space, cached in em units.
    fn glyph_advance(&self, index: u32) -> Result<(f64, f64)> {
        self.check_index(index)?;
        let mut cache = self.advance_cache.lock().unwrap();
        let adv_em = match cache.get(&index) {
            Some(adv) => *adv,
            None => {
                let upem = self.metrics()?.upem;
                let adv = self.with_face(|face| {
                    face.glyph_hor_advance(GlyphId(index as u16)).unwrap_or(0) as f64
                })? / upem;
                cache.insert(index, adv);
                adv
            }
        };
        Ok(self.font_matrix.transform_distance(adv_em, 0.0))
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.metrics()?.glyph_count {
            return Err(Status::InvalidIndex);
        }
        Ok(())
    }

    /// A glyph's outline in font units, cached.
    ///
    /// Glyphs with no ink (such as spaces) yield an empty path.
    fn glyph_outline_font_units(&self, index: u32) -> Result<Path> {
        self.check_index(index)?;

        let mut cache = self.glyph_cache.lock().unwrap();
        if let Some(path) = cache.get(&index) {
            return Ok(path.clone());
        }

        let path = self.with_face(|face| {
            let mut builder = OutlinePath::default();
            face.outline_glyph(GlyphId(index as u16), &mut builder);
            builder.path
        })?;
        cache.put(index, path.clone());
        Ok(path)
    }

    /// A glyph's outline positioned at its origin, in user space.
    pub(crate) fn glyph_outline_user(&self, glyph: &Glyph) -> Result<Path> {
        let upem = self.metrics()?.upem;
        let outline = self.glyph_outline_font_units(glyph.index)?;

        let mut to_user = self.glyph_to_user(upem);
        to_user.x0 += glyph.x;
        to_user.y0 += glyph.y;
        Ok(outline.transformed(&to_user))
    }
}

/// Group shaped glyphs into byte clusters.
fn build_clusters(
    text: &str,
    infos: &[rustybuzz::GlyphInfo],
    backward: bool,
) -> Vec<TextCluster> {
    if infos.is_empty() {
        return Vec::new();
    }

    // Cluster values are byte offsets into the original text; glyphs that
    // share a value belong to one cluster.
    let mut clusters: Vec<TextCluster> = Vec::new();
    let mut byte_starts: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < infos.len() {
        let start = infos[i].cluster;
        let mut num_glyphs = 1;
        while i + num_glyphs < infos.len() && infos[i + num_glyphs].cluster == start {
            num_glyphs += 1;
        }
        byte_starts.push(start as usize);
        clusters.push(TextCluster {
            num_bytes: 0,
            num_glyphs,
        });
        i += num_glyphs;
    }

    if backward {
        clusters.reverse();
        byte_starts.reverse();
    }

    for i in 0..clusters.len() {
        let end = byte_starts.get(i + 1).copied().unwrap_or(text.len());
        clusters[i].num_bytes = end - byte_starts[i];
    }
    clusters
}

/// Collects a ttf-parser glyph outline into a recorded path, converting
/// quadratic segments to cubics.
#[derive(Default)]
struct OutlinePath {
    path: Path,
}

impl ttf_parser::OutlineBuilder for OutlinePath {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(x as f64, y as f64);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x0, y0) = self.path.current_point().unwrap_or((x1 as f64, y1 as f64));
        let (cx, cy) = (x1 as f64, y1 as f64);
        let (ex, ey) = (x as f64, y as f64);
        // Exact quadratic-to-cubic elevation.
        self.path.curve_to(
            x0 + 2.0 / 3.0 * (cx - x0),
            y0 + 2.0 / 3.0 * (cy - y0),
            ex + 2.0 / 3.0 * (cx - ex),
            ey + 2.0 / 3.0 * (cy - ey),
            ex,
            ey,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.curve_to(
            x1 as f64, y1 as f64, x2 as f64, y2 as f64, x as f64, y as f64,
        );
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noto() -> FontFace {
        FontFace::from_bytes(ttf_noto_sans::REGULAR.to_vec(), 0).unwrap()
    }

    fn scaled(size: f64) -> ScaledFont {
        ScaledFont::new(
            noto(),
            Matrix::scaling(size, size),
            Matrix::identity(),
            FontOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert_eq!(
            FontFace::from_bytes(vec![0, 1, 2, 3], 0).err(),
            Some(Status::InvalidFormat)
        );
    }

    #[test]
    fn test_toy_face_accessors() {
        let face = FontFace::toy("serif", FontSlant::Italic, FontWeight::Bold);
        assert_eq!(face.font_type(), FontType::Toy);
        assert_eq!(face.toy_family().unwrap(), "serif");
        assert_eq!(face.toy_slant().unwrap(), FontSlant::Italic);
        assert_eq!(face.toy_weight().unwrap(), FontWeight::Bold);

        assert_eq!(noto().toy_family().err(), Some(Status::FontTypeMismatch));
    }

    #[test]
    fn test_scaled_font_rejects_singular_matrix() {
        let result = ScaledFont::new(
            noto(),
            Matrix::scaling(0.0, 10.0),
            Matrix::identity(),
            FontOptions::default(),
        );
        assert_eq!(result.err(), Some(Status::InvalidMatrix));
    }

    #[test]
    fn test_font_extents_scale_with_size() {
        let small = scaled(10.0).extents().unwrap();
        let large = scaled(20.0).extents().unwrap();
        assert!(small.ascent > 0.0);
        assert!(small.descent > 0.0);
        assert!((large.ascent - 2.0 * small.ascent).abs() < 1e-9);
    }

    #[test]
    fn test_text_to_glyphs_advances() {
        let font = scaled(16.0);
        let (glyphs, clusters, flags) = font.text_to_glyphs(5.0, 40.0, "Hi").unwrap();
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].x, 5.0);
        assert_eq!(glyphs[0].y, 40.0);
        assert!(glyphs[1].x > glyphs[0].x);
        assert!(!flags.backward);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.iter().map(|c| c.num_bytes).sum::<usize>(), 2);
        assert_eq!(clusters.iter().map(|c| c.num_glyphs).sum::<usize>(), 2);
    }

    #[test]
    fn test_text_extents_reasonable() {
        let font = scaled(16.0);
        let extents = font.text_extents("Hello").unwrap();
        assert!(extents.width > 0.0);
        assert!(extents.height > 0.0);
        // Ink sits above the baseline.
        assert!(extents.y_bearing < 0.0);
        assert!(extents.x_advance >= extents.width);
    }

    #[test]
    fn test_wider_text_advances_further() {
        let font = scaled(16.0);
        let short = font.text_extents("il").unwrap();
        let long = font.text_extents("WWWW").unwrap();
        assert!(long.x_advance > short.x_advance);
    }

    #[test]
    fn test_glyph_extents_bad_index() {
        let font = scaled(16.0);
        let glyph = Glyph {
            index: u32::MAX,
            x: 0.0,
            y: 0.0,
        };
        assert_eq!(
            font.glyph_extents(&[glyph]).err(),
            Some(Status::InvalidIndex)
        );
    }

    #[test]
    fn test_space_has_advance_but_no_ink() {
        let font = scaled(16.0);
        let idx = font.glyph_index(' ').unwrap().unwrap();
        let glyph = Glyph {
            index: idx,
            x: 0.0,
            y: 0.0,
        };
        let extents = font.glyph_extents(&[glyph]).unwrap();
        assert_eq!(extents.width, 0.0);
        assert!(extents.x_advance > 0.0);
    }

    #[test]
    fn test_glyph_outline_flipped_to_user_space() {
        let font = scaled(16.0);
        let idx = font.glyph_index('A').unwrap().unwrap();
        let outline = font
            .glyph_outline_user(&Glyph {
                index: idx,
                x: 0.0,
                y: 100.0,
            })
            .unwrap();
        let (_, y1, _, y2) = outline.extents().unwrap();
        // The glyph rises above its baseline at y=100.
        assert!(y1 < 100.0);
        assert!(y2 <= 100.0 + 16.0);
    }

    #[test]
    fn test_metrics_read_once_match_font_tables() {
        let font = scaled(16.0);
        let face = Face::parse(ttf_noto_sans::REGULAR, 0).unwrap();
        let upem = face.units_per_em() as f64;

        let extents = font.extents().unwrap();
        let ascent = face.ascender() as f64 / upem * 16.0;
        let descent = -(face.descender() as f64) / upem * 16.0;
        assert!((extents.ascent - ascent).abs() < 1e-9);
        assert!((extents.descent - descent).abs() < 1e-9);
        assert!(extents.max_x_advance > 0.0);

        // Repeated and cloned queries answer from the same cached tables.
        let clone = font.clone();
        let again = clone.extents().unwrap();
        assert_eq!(extents.ascent, again.ascent);
        assert_eq!(extents.max_x_advance, again.max_x_advance);
    }

    #[test]
    fn test_repeated_glyph_queries_are_stable() {
        let font = scaled(16.0);
        let idx = font.glyph_index('m').unwrap().unwrap();
        let glyph = Glyph {
            index: idx,
            x: 0.0,
            y: 0.0,
        };
        let first = font.glyph_extents(&[glyph]).unwrap();
        // Second call comes out of the advance and outline caches.
        let second = font.glyph_extents(&[glyph]).unwrap();
        assert_eq!(first.x_advance, second.x_advance);
        assert_eq!(first.width, second.width);
    }

    #[test]
    fn test_combining_mark_does_not_widen_advance() {
        let font = scaled(16.0);
        let base = font.text_extents("e").unwrap();
        // The combining acute is positioned over the e with a zero shaped
        // advance; the run's advance is the base letter's alone.
        let marked = font.text_extents("e\u{301}").unwrap();
        assert!((marked.x_advance - base.x_advance).abs() < 1e-9);
        assert_eq!(marked.y_advance, 0.0);
    }

    #[test]
    fn test_font_options_merge() {
        let mut base = FontOptions::new();
        base.set_hint_style(HintStyle::Full);

        let mut other = FontOptions::new();
        other.set_antialias(Antialias::None);

        base.merge(&other);
        assert_eq!(base.antialias(), Antialias::None);
        // Defaults in `other` leave `base` untouched.
        assert_eq!(base.hint_style(), HintStyle::Full);
    }
}
