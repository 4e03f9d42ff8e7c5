use crate::config::settings::{CanvasPadding, KineticConfig};
use crate::foundation::core::{Point, Rect};
use crate::layout::packer::Screen;
use crate::text::metrics::{GlyphMetrics, GlyphMetricsProvider};
use crate::text::script::WordUnit;

/// A word with its final on-screen geometry and highlight window.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedWord {
    /// The underlying word.
    pub word: WordUnit,
    /// Line within the screen.
    pub line_index: usize,
    /// Screen font size.
    pub font_size: u32,
    /// Cursor position where the word's advance starts.
    pub pen_x: f64,
    /// Typographic advance at `font_size`.
    pub advance_width: f64,
    /// Top of the word's line band.
    pub line_top: f64,
    /// Height of every line band on the screen.
    pub line_height: f64,
    /// Baseline the glyphs sit on.
    pub baseline_y: f64,
    /// Padded glyph canvas, placed so its center matches the visible ink.
    pub canvas: Rect,
    /// Light-up time relative to the screen start.
    pub bright_start: f64,
    /// Time from light-up to the end of the screen (>= 0).
    pub bright_duration: f64,
}

impl PlacedWord {
    /// Top-left corner of the glyph canvas.
    pub fn position(&self) -> Point {
        self.canvas.origin()
    }

    /// Horizontal span covered by the word's advance.
    pub fn advance_span(&self) -> (f64, f64) {
        (self.pen_x, self.pen_x + self.advance_width)
    }
}

/// Vertical frame of a screen's text block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockGeometry {
    /// Fixed height of every line band.
    pub line_height: f64,
    /// Total height of all bands.
    pub block_height: f64,
    /// Top of the first band; the block is centered in the frame.
    pub start_y: f64,
}

impl BlockGeometry {
    /// Top of line band `line_index`.
    pub fn line_top(&self, line_index: usize) -> f64 {
        self.start_y + line_index as f64 * self.line_height
    }
}

/// Line bands use a fixed height derived from the font size, never from individual ink heights,
/// so adjacent lines cannot collide when ascenders and descenders vary.
pub fn block_geometry(line_count: usize, font_size: u32, cfg: &KineticConfig) -> BlockGeometry {
    let line_height = f64::from(font_size) * cfg.line_spacing_factor;
    let block_height = line_count as f64 * line_height;
    BlockGeometry {
        line_height,
        block_height,
        start_y: (f64::from(cfg.frame_height) - block_height) / 2.0,
    }
}

/// Place the padded canvas of a word whose advance starts at `pen_x` on `baseline_y`.
///
/// The canvas holds the ink centered, so centers are matched instead of corners:
/// `x = (pen_x + advance / 2) - canvas_width / 2`.
pub fn canvas_for(
    pen_x: f64,
    baseline_y: f64,
    metrics: &GlyphMetrics,
    padding: &CanvasPadding,
) -> Rect {
    let width = metrics.ink_width() * padding.width_ratio;
    let height = metrics.ink_height() * padding.height_ratio;
    let x = (pen_x + metrics.advance_width / 2.0) - width / 2.0;
    let y = (baseline_y + metrics.ink.center().y) - height / 2.0;
    Rect::from_origin_size((x, y), (width, height))
}

/// Compute geometry and highlight windows for every word of `screen`.
pub fn place_screen(
    screen: &Screen,
    cfg: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
) -> Vec<PlacedWord> {
    let font_size = screen.font_size;
    let block = block_geometry(screen.lines.len(), font_size, cfg);
    let baseline_shift = f64::from(font_size) * cfg.canvas_padding.baseline_ratio;

    let mut placed = Vec::with_capacity(screen.words.len());
    for line in &screen.lines {
        let line_top = block.line_top(line.index);
        let baseline_y = line_top + block.line_height / 2.0 + baseline_shift;
        let mut cursor = cfg.left_margin;

        for word in screen.line_words(line) {
            let m = metrics.measure(&word.text, font_size);
            let bright_start = (word.start_time - screen.start).max(0.0);
            placed.push(PlacedWord {
                word: word.clone(),
                line_index: line.index,
                font_size,
                pen_x: cursor,
                advance_width: m.advance_width,
                line_top,
                line_height: block.line_height,
                baseline_y,
                canvas: canvas_for(cursor, baseline_y, &m, &cfg.canvas_padding),
                bright_start,
                bright_duration: (screen.duration - bright_start).max(0.0),
            });
            cursor += m.advance_width + cfg.word_gap;
        }
    }
    placed
}

#[cfg(test)]
#[path = "../../tests/unit/layout/placer.rs"]
mod tests;
