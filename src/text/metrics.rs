use std::collections::HashMap;

use crate::foundation::core::Rect;
use crate::text::font::FontDescriptor;

/// Measured geometry of one string at one font size.
///
/// `advance_width` drives the layout cursor; `ink` is the tight box around drawn pixels relative
/// to the pen position on the baseline (y grows downwards, so `ink.y0` is negative for glyphs
/// rising above the baseline). The two are deliberately kept apart: conflating them makes word
/// spacing drift and clips descenders.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlyphMetrics {
    /// Typographic cursor advance in pixels.
    pub advance_width: f64,
    /// Ink bounding box relative to the pen origin.
    pub ink: Rect,
}

impl GlyphMetrics {
    /// Width of the ink box.
    pub fn ink_width(&self) -> f64 {
        self.ink.width()
    }

    /// Height of the ink box.
    pub fn ink_height(&self) -> f64 {
        self.ink.height()
    }
}

/// Source of glyph measurements for a single resolved font.
///
/// Implementations must be deterministic: equal `(text, font_size)` queries return equal metrics.
pub trait GlyphMetricsProvider {
    /// Measure `text` set at `font_size` pixels.
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics;

    /// Description of the font the metrics come from.
    fn font(&self) -> &FontDescriptor;
}

impl<P: GlyphMetricsProvider + ?Sized> GlyphMetricsProvider for Box<P> {
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics {
        (**self).measure(text, font_size)
    }

    fn font(&self) -> &FontDescriptor {
        (**self).font()
    }
}

/// Font-free width estimate based on character classes.
///
/// Used when no font could be resolved and in tests that need stable numbers.
#[derive(Clone, Debug)]
pub struct EstimatedMetrics {
    font: FontDescriptor,
}

impl Default for EstimatedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatedMetrics {
    /// Estimator reporting the built-in fallback font.
    pub fn new() -> Self {
        Self {
            font: FontDescriptor::fallback(),
        }
    }

    /// Advance of `ch` in em units.
    pub fn char_units(ch: char) -> f64 {
        if ch.is_whitespace() {
            0.25
        } else if ch.is_ascii_alphanumeric() {
            0.55
        } else if ch.is_ascii() {
            0.35
        } else if matches!(
            ch as u32,
            0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
        ) {
            1.0
        } else {
            0.9
        }
    }
}

impl GlyphMetricsProvider for EstimatedMetrics {
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics {
        let size = f64::from(font_size);
        let advance_width = text.chars().map(Self::char_units).sum::<f64>() * size;
        if text.trim().is_empty() {
            return GlyphMetrics {
                advance_width,
                ink: Rect::ZERO,
            };
        }

        let descends = text.chars().any(|c| matches!(c, 'g' | 'j' | 'p' | 'q' | 'y' | ',' | ';'));
        let bearing = advance_width * 0.03;
        GlyphMetrics {
            advance_width,
            ink: Rect::new(
                bearing,
                -0.72 * size,
                advance_width - bearing,
                if descends { 0.21 * size } else { 0.0 },
            ),
        }
    }

    fn font(&self) -> &FontDescriptor {
        &self.font
    }
}

/// Memoizes `(text, size)` measurements of an inner provider for the duration of one run.
///
/// Results are identical to calling the inner provider directly.
#[derive(Debug)]
pub struct MetricsCache<P> {
    inner: P,
    entries: HashMap<(String, u32), GlyphMetrics>,
    hits: u64,
    misses: u64,
}

impl<P: GlyphMetricsProvider> MetricsCache<P> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// `(hits, misses)` observed so far.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl<P: GlyphMetricsProvider> GlyphMetricsProvider for MetricsCache<P> {
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics {
        if let Some(m) = self.entries.get(&(text.to_string(), font_size)) {
            self.hits += 1;
            return *m;
        }
        self.misses += 1;
        let m = self.inner.measure(text, font_size);
        self.entries.insert((text.to_string(), font_size), m);
        m
    }

    fn font(&self) -> &FontDescriptor {
        self.inner.font()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/metrics.rs"]
mod tests;
