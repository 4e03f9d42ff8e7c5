use std::ops::Range;

use crate::config::settings::KineticConfig;
use crate::text::metrics::GlyphMetricsProvider;
use crate::text::script::{Script, WordUnit};

/// A row of consecutive words inside a [`Screen`].
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    /// Index of the line within its screen.
    pub index: usize,
    /// Range into [`Screen::words`].
    pub words: Range<usize>,
    /// Measured width at the screen's font size (advances plus gaps).
    pub width: f64,
}

/// A time-boxed group of words displayed together.
#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    /// Screen position in the video.
    pub index: usize,
    /// Absolute start time in seconds.
    pub start: f64,
    /// Display time in seconds.
    pub duration: f64,
    /// Font size shared by every line on this screen.
    pub font_size: u32,
    /// `false` when at least one line still overflows at the minimum size.
    pub fits: bool,
    /// Words in reading order.
    pub words: Vec<WordUnit>,
    /// Line grouping of `words`.
    pub lines: Vec<Line>,
}

impl Screen {
    /// Words belonging to `line`.
    pub fn line_words(&self, line: &Line) -> &[WordUnit] {
        &self.words[line.words.clone()]
    }
}

/// A line that could not be shrunk into the safe width.
///
/// Non-fatal: the line is laid out overflowing and the run continues.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutOverflow {
    /// Screen containing the line.
    pub screen_index: usize,
    /// Line within the screen.
    pub line_index: usize,
    /// Measured width at `font_size`.
    pub line_width: f64,
    /// Width the line had to fit into.
    pub safe_width: f64,
    /// Size the line was measured at (the minimum size).
    pub font_size: u32,
}

/// Result of the per-screen font size search.
#[derive(Clone, Debug, PartialEq)]
pub struct Autoscale {
    /// Chosen size.
    pub font_size: u32,
    /// Whether every line fits at `font_size`.
    pub fits: bool,
    /// Width of each line at `font_size`.
    pub line_widths: Vec<f64>,
    /// Sizes measured, in order.
    pub tried: Vec<u32>,
}

/// Sum of word advances plus the gaps between them.
pub fn line_width(
    words: &[WordUnit],
    font_size: u32,
    word_gap: f64,
    metrics: &mut dyn GlyphMetricsProvider,
) -> f64 {
    let advances: f64 = words
        .iter()
        .map(|w| metrics.measure(&w.text, font_size).advance_width)
        .sum();
    advances + (words.len().saturating_sub(1) as f64) * word_gap
}

/// Find the largest size, stepping down from `base_font_size`, at which every line fits.
///
/// Linear search: every candidate re-measures all lines. Reaching `min_font_size` ends the search
/// and the overflow is accepted.
pub fn autoscale(
    lines: &[&[WordUnit]],
    cfg: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
) -> Autoscale {
    let safe_width = cfg.safe_width();
    let mut size = cfg.base_font_size;
    let mut tried = Vec::new();
    loop {
        tried.push(size);
        let line_widths: Vec<f64> = lines
            .iter()
            .map(|words| line_width(words, size, cfg.word_gap, metrics))
            .collect();
        let fits = line_widths.iter().all(|w| *w <= safe_width);
        if fits || size <= cfg.min_font_size {
            return Autoscale {
                font_size: size,
                fits,
                line_widths,
                tried,
            };
        }
        size = size.saturating_sub(cfg.font_step).max(cfg.min_font_size);
    }
}

/// Group `words` into lines and choose the screen's font size.
pub fn pack_screen(
    index: usize,
    words: &[WordUnit],
    seconds_per_word: f64,
    cfg: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
) -> (Screen, Vec<LayoutOverflow>) {
    let ranges: Vec<Range<usize>> = (0..words.len())
        .step_by(cfg.words_per_line)
        .map(|s| s..(s + cfg.words_per_line).min(words.len()))
        .collect();
    let slices: Vec<&[WordUnit]> = ranges.iter().map(|r| &words[r.clone()]).collect();
    let scale = autoscale(&slices, cfg, metrics);

    tracing::debug!(
        screen = index,
        font_size = scale.font_size,
        fits = scale.fits,
        steps = scale.tried.len(),
        "autoscaled screen"
    );

    let safe_width = cfg.safe_width();
    let mut overflows = Vec::new();
    let lines = ranges
        .into_iter()
        .zip(scale.line_widths.iter().copied())
        .enumerate()
        .map(|(line_index, (range, width))| {
            if width > safe_width {
                tracing::warn!(
                    screen = index,
                    line = line_index,
                    width,
                    safe_width,
                    font_size = scale.font_size,
                    "line overflows safe width at minimum font size"
                );
                overflows.push(LayoutOverflow {
                    screen_index: index,
                    line_index,
                    line_width: width,
                    safe_width,
                    font_size: scale.font_size,
                });
            }
            Line {
                index: line_index,
                words: range,
                width,
            }
        })
        .collect();

    let start = words.first().map(|w| w.start_time).unwrap_or(0.0);
    let screen = Screen {
        index,
        start,
        duration: words.len() as f64 * seconds_per_word,
        font_size: scale.font_size,
        fits: scale.fits,
        words: words.to_vec(),
        lines,
    };
    (screen, overflows)
}

/// Split a script into screens of `words_per_screen` words.
pub fn screen_chunks<'a>(
    script: &'a Script,
    cfg: &KineticConfig,
) -> impl Iterator<Item = &'a [WordUnit]> + use<'a> {
    script.words.chunks(cfg.words_per_screen)
}

/// Pack every screen of `script`.
pub fn pack_screens(
    script: &Script,
    cfg: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
) -> (Vec<Screen>, Vec<LayoutOverflow>) {
    let mut screens = Vec::new();
    let mut overflows = Vec::new();
    for (index, words) in screen_chunks(script, cfg).enumerate() {
        let (screen, mut o) = pack_screen(index, words, script.seconds_per_word, cfg, metrics);
        screens.push(screen);
        overflows.append(&mut o);
    }
    (screens, overflows)
}

#[cfg(test)]
#[path = "../../tests/unit/layout/packer.rs"]
mod tests;
