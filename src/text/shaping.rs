use crate::foundation::core::Rect;
use crate::foundation::error::{KinetypeError, KinetypeResult};
use crate::text::font::{FontDescriptor, LoadedFont};
use crate::text::metrics::{GlyphMetrics, GlyphMetricsProvider};

/// Parley brush placeholder; color is applied at raster time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InkBrush;

/// One positioned glyph, x relative to the pen origin and y relative to the baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapedGlyph {
    /// Glyph id in the font.
    pub id: u32,
    /// Horizontal offset from the pen origin.
    pub x: f32,
    /// Vertical offset from the baseline.
    pub y: f32,
}

/// A shaped single-line word.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedWord {
    /// Positioned glyphs in visual order.
    pub glyphs: Vec<ShapedGlyph>,
    /// Typographic advance of the whole word.
    pub advance: f32,
    /// Size the word was shaped at.
    pub font_size: f32,
}

/// Shapes words with Parley against a single registered font.
pub struct WordShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<InkBrush>,
    font: LoadedFont,
    family_name: String,
}

impl WordShaper {
    /// Register `font` with a fresh Parley font context.
    pub fn new(font: LoadedFont) -> KinetypeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            KinetypeError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| KinetypeError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            font,
            family_name,
        })
    }

    /// The font words are shaped with.
    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    /// Shape `text` at `size_px` on a single unbroken line.
    pub fn shape(&mut self, text: &str, size_px: f32) -> ShapedWord {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(InkBrush));

        let mut layout: parley::Layout<InkBrush> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        let mut advance = 0.0f32;
        for line in layout.lines() {
            advance = advance.max(line.metrics().advance);
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                // `glyphs()` leaves every glyph at the run origin; only the positioned
                // iterator accumulates advances.
                let baseline = run.baseline();
                glyphs.extend(run.positioned_glyphs().map(|g| ShapedGlyph {
                    id: u32::from(g.id),
                    x: g.x,
                    y: g.y - baseline,
                }));
            }
        }

        ShapedWord {
            glyphs,
            advance,
            font_size: size_px,
        }
    }

    /// Union of glyph outline boxes of `word`, relative to pen origin and baseline.
    pub fn ink_bounds(&self, word: &ShapedWord) -> Rect {
        let Ok(face) = ttf_parser::Face::parse(&self.font.bytes, self.font.descriptor.face_index)
        else {
            return Rect::ZERO;
        };
        let scale = f64::from(word.font_size) / f64::from(face.units_per_em().max(1));

        let mut ink: Option<Rect> = None;
        for g in &word.glyphs {
            let Ok(id) = u16::try_from(g.id) else {
                continue;
            };
            let Some(bb) = face.glyph_bounding_box(ttf_parser::GlyphId(id)) else {
                continue;
            };
            let (gx, gy) = (f64::from(g.x), f64::from(g.y));
            let r = Rect::new(
                gx + f64::from(bb.x_min) * scale,
                gy - f64::from(bb.y_max) * scale,
                gx + f64::from(bb.x_max) * scale,
                gy - f64::from(bb.y_min) * scale,
            );
            ink = Some(match ink {
                Some(acc) => acc.union(r),
                None => r,
            });
        }
        ink.unwrap_or(Rect::ZERO)
    }
}

/// Glyph metrics from real shaping: Parley advances plus outline ink boxes.
pub struct ShapedMetrics {
    shaper: WordShaper,
}

impl ShapedMetrics {
    /// Build a provider for `font`.
    pub fn new(font: LoadedFont) -> KinetypeResult<Self> {
        Ok(Self {
            shaper: WordShaper::new(font)?,
        })
    }
}

impl GlyphMetricsProvider for ShapedMetrics {
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics {
        let word = self.shaper.shape(text, font_size as f32);
        GlyphMetrics {
            advance_width: f64::from(word.advance),
            ink: self.shaper.ink_bounds(&word),
        }
    }

    fn font(&self) -> &FontDescriptor {
        &self.shaper.font().descriptor
    }
}
