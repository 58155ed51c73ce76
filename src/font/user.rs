//! User fonts: faces whose glyphs are produced by caller-supplied
//! callbacks instead of font data.
//!
//! Callbacks work in font space, where one em is one unit and y grows
//! downward. The face becomes immutable once a scaled font has been
//! created from it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::Context;
use crate::error::{Result, Status};
use crate::font::{
    FontExtents, Glyph, ScaledFont, TextCluster, TextClusterFlags, TextExtents,
};
use crate::surface::{Format, ImageSurface};

/// Fills in the font-space metrics of a user font when a scaled font is
/// created. The context targets a throwaway surface and may be used for
/// measuring.
pub type UserFontInitFunc =
    Arc<dyn Fn(&ScaledFont, &mut Context<'_>, &mut FontExtents) -> Result<()> + Send + Sync>;

/// Draws one glyph into the supplied context in font space and reports its
/// font-space extents.
pub type UserFontRenderGlyphFunc =
    Arc<dyn Fn(&ScaledFont, u32, &mut Context<'_>, &mut TextExtents) -> Result<()> + Send + Sync>;

/// Maps a character to a glyph index. Without one, the character's code
/// point is used directly.
pub type UserFontUnicodeToGlyphFunc =
    Arc<dyn Fn(&ScaledFont, char) -> Result<u32> + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    init: Option<UserFontInitFunc>,
    render_glyph: Option<UserFontRenderGlyphFunc>,
    unicode_to_glyph: Option<UserFontUnicodeToGlyphFunc>,
}

struct Inner {
    frozen: AtomicBool,
    callbacks: Mutex<Callbacks>,
}

/// A font face backed by drawing callbacks.
#[derive(Clone)]
pub struct UserFontFace {
    inner: Arc<Inner>,
}

impl fmt::Debug for UserFontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFontFace")
            .field("frozen", &self.inner.frozen.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for UserFontFace {
    fn default() -> Self {
        UserFontFace::new()
    }
}

impl UserFontFace {
    pub fn new() -> Self {
        UserFontFace {
            inner: Arc::new(Inner {
                frozen: AtomicBool::new(false),
                callbacks: Mutex::new(Callbacks::default()),
            }),
        }
    }

    /// Wrap this user font in a [`crate::font::FontFace`] so it can be
    /// installed on a context.
    pub fn font_face(&self) -> crate::font::FontFace {
        crate::font::FontFace::from_user(self.clone())
    }

    fn set<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Callbacks),
    {
        if self.inner.frozen.load(Ordering::Acquire) {
            return Err(Status::UserFontImmutable);
        }
        apply(&mut self.inner.callbacks.lock().unwrap());
        Ok(())
    }

    /// Set the metrics callback.
    ///
    /// # Returns
    /// `Err(Status::UserFontImmutable)` once a scaled font exists for this
    /// face.
    pub fn set_init_func(&self, f: UserFontInitFunc) -> Result<()> {
        self.set(|cb| cb.init = Some(f))
    }

    /// Set the glyph rendering callback. Text operations fail with
    /// `UserFontError` when no render callback is installed.
    pub fn set_render_glyph_func(&self, f: UserFontRenderGlyphFunc) -> Result<()> {
        self.set(|cb| cb.render_glyph = Some(f))
    }

    /// Set the character-to-glyph mapping callback.
    pub fn set_unicode_to_glyph_func(&self, f: UserFontUnicodeToGlyphFunc) -> Result<()> {
        self.set(|cb| cb.unicode_to_glyph = Some(f))
    }

    pub(crate) fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Release);
    }

    pub(crate) fn init_func(&self) -> Option<UserFontInitFunc> {
        self.inner.callbacks.lock().unwrap().init.clone()
    }

    pub(crate) fn render_glyph_func(&self) -> Option<UserFontRenderGlyphFunc> {
        self.inner.callbacks.lock().unwrap().render_glyph.clone()
    }

    pub(crate) fn unicode_to_glyph_func(&self) -> Option<UserFontUnicodeToGlyphFunc> {
        self.inner.callbacks.lock().unwrap().unicode_to_glyph.clone()
    }
}

/// Run a callback against a context on a throwaway surface, for measuring.
fn with_scratch_context<T>(
    f: impl FnOnce(&mut Context<'_>) -> Result<T>,
) -> Result<T> {
    let mut surface = ImageSurface::new(Format::A8, 1, 1)?;
    let mut cr = Context::new(&mut surface)?;
    f(&mut cr)
}

impl ScaledFont {
    fn require_user_face(&self) -> Result<&UserFontFace> {
        self.face().user_face().ok_or(Status::FontTypeMismatch)
    }

    /// Whole-font metrics of a user font, in user space.
    pub(crate) fn user_font_extents(&self) -> Result<FontExtents> {
        let face = self.require_user_face()?;

        // Font-space defaults for fonts that install no init callback.
        let mut fs = FontExtents {
            ascent: 1.0,
            descent: 0.0,
            height: 1.0,
            max_x_advance: 1.0,
            max_y_advance: 0.0,
        };
        if let Some(init) = face.init_func() {
            with_scratch_context(|cr| init(self, cr, &mut fs))?;
        }

        let fm = self.font_matrix();
        let (_, ascent) = fm.transform_distance(0.0, fs.ascent);
        let (_, descent) = fm.transform_distance(0.0, fs.descent);
        let (_, height) = fm.transform_distance(0.0, fs.height);
        let (max_x, _) = fm.transform_distance(fs.max_x_advance, 0.0);
        let (_, max_y) = fm.transform_distance(0.0, fs.max_y_advance);
        Ok(FontExtents {
            ascent: ascent.abs(),
            descent: descent.abs(),
            height: height.abs(),
            max_x_advance: max_x.abs(),
            max_y_advance: max_y.abs(),
        })
    }

    /// A user glyph's font-space extents, obtained by running the render
    /// callback against a throwaway surface.
    pub(crate) fn user_glyph_metrics(&self, index: u32) -> Result<TextExtents> {
        let face = self.require_user_face()?;
        let render = face.render_glyph_func().ok_or(Status::UserFontError)?;

        let mut extents = TextExtents {
            x_advance: 1.0,
            ..Default::default()
        };
        with_scratch_context(|cr| render(self, index, cr, &mut extents))?;
        Ok(extents)
    }

    /// Ink and advance extents of user-font glyphs, in user space.
    pub(crate) fn user_glyph_extents(&self, glyphs: &[Glyph]) -> Result<TextExtents> {
        if glyphs.is_empty() {
            return Ok(TextExtents::default());
        }

        let fm = self.font_matrix();
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        let mut any_ink = false;
        let mut advance = (0.0, 0.0);

        for glyph in glyphs {
            let fs = self.user_glyph_metrics(glyph.index)?;
            if fs.width > 0.0 && fs.height > 0.0 {
                // Transform the font-space ink rectangle corner by corner
                // so rotated font matrices stay correct.
                for (cx, cy) in [
                    (fs.x_bearing, fs.y_bearing),
                    (fs.x_bearing + fs.width, fs.y_bearing),
                    (fs.x_bearing, fs.y_bearing + fs.height),
                    (fs.x_bearing + fs.width, fs.y_bearing + fs.height),
                ] {
                    let (dx, dy) = fm.transform_distance(cx, cy);
                    min_x = min_x.min(glyph.x + dx);
                    min_y = min_y.min(glyph.y + dy);
                    max_x = max_x.max(glyph.x + dx);
                    max_y = max_y.max(glyph.y + dy);
                }
                any_ink = true;
            }
            advance = fm.transform_distance(fs.x_advance, fs.y_advance);
        }

        let first = glyphs[0];
        let last = glyphs[glyphs.len() - 1];
        let mut extents = TextExtents {
            x_advance: last.x + advance.0 - first.x,
            y_advance: last.y + advance.1 - first.y,
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

    /// Convert text to user-font glyphs: one glyph per character, advanced
    /// by the metrics the render callback reports.
    pub(crate) fn user_text_to_glyphs(
        &self,
        x: f64,
        y: f64,
        text: &str,
    ) -> Result<(Vec<Glyph>, Vec<TextCluster>, TextClusterFlags)> {
        let face = self.require_user_face()?;
        let to_glyph = face.unicode_to_glyph_func();
        let fm = self.font_matrix();

        let mut glyphs = Vec::new();
        let mut clusters = Vec::new();
        let (mut pen_x, mut pen_y) = (x, y);
        for c in text.chars() {
            let index = match &to_glyph {
                Some(f) => f(self, c)?,
                None => c as u32,
            };
            glyphs.push(Glyph {
                index,
                x: pen_x,
                y: pen_y,
            });
            clusters.push(TextCluster {
                num_bytes: c.len_utf8(),
                num_glyphs: 1,
            });

            let fs = self.user_glyph_metrics(index)?;
            let (ax, ay) = fm.transform_distance(fs.x_advance, fs.y_advance);
            pen_x += ax;
            pen_y += ay;
        }
        Ok((glyphs, clusters, TextClusterFlags::default()))
    }
}
