use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::FrameSize;
use crate::foundation::error::{KinetypeError, KinetypeResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Engine configuration.
///
/// Every field has a default matching the classic 16:10 landscape layout, so a JSON document only
/// needs to list the options it overrides.
pub struct KineticConfig {
    /// Output frame width in pixels.
    pub frame_width: u32,
    /// Output frame height in pixels.
    pub frame_height: u32,
    /// Font size every screen starts autoscaling from.
    pub base_font_size: u32,
    /// Smallest font size autoscaling may reach.
    pub min_font_size: u32,
    /// Decrement applied per autoscale step.
    pub font_step: u32,
    /// Left edge of the safe text area.
    pub left_margin: f64,
    /// Distance kept free on the right edge.
    pub right_margin: f64,
    /// Horizontal gap inserted between consecutive words.
    pub word_gap: f64,
    /// Line height as a multiple of the font size.
    pub line_spacing_factor: f64,
    /// Words grouped into one line.
    pub words_per_line: usize,
    /// Words grouped into one screen.
    pub words_per_screen: usize,
    /// Output frames per second.
    pub frame_rate: u32,
    /// Pace words by narration duration (`true`) or by `silent_words_per_second`.
    pub voice_enabled: bool,
    /// Reading rate used when voice is disabled.
    pub silent_words_per_second: f64,
    /// Font family name or path to a font file.
    pub font: String,
    /// Extra directories scanned for fonts before system fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Opacity of words that have not been read yet.
    pub dim_opacity: f32,
    /// Glyph canvas padding used for placement.
    pub canvas_padding: CanvasPadding,
    /// Frame background color.
    pub background_rgb: [u8; 3],
    /// Word color.
    pub text_rgb: [u8; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Safety padding around a word's ink box.
///
/// Glyphs are drawn centered on a canvas larger than their ink so accents and descenders are
/// never clipped; the placer compensates so the ink, not the canvas, lands on the cursor.
pub struct CanvasPadding {
    /// Canvas width as a multiple of ink width.
    pub width_ratio: f64,
    /// Canvas height as a multiple of ink height.
    pub height_ratio: f64,
    /// Distance from the line band's center down to the baseline, as a fraction of font size.
    pub baseline_ratio: f64,
}

impl Default for CanvasPadding {
    fn default() -> Self {
        Self {
            width_ratio: 1.1,
            height_ratio: 1.5,
            baseline_ratio: 0.35,
        }
    }
}

impl Default for KineticConfig {
    fn default() -> Self {
        Self {
            frame_width: 1920,
            frame_height: 1200,
            base_font_size: 130,
            min_font_size: 40,
            font_step: 10,
            left_margin: 150.0,
            right_margin: 150.0,
            word_gap: 35.0,
            line_spacing_factor: 1.4,
            words_per_line: 3,
            words_per_screen: 12,
            frame_rate: 24,
            voice_enabled: true,
            silent_words_per_second: 2.5,
            font: "sans-serif".to_string(),
            font_dirs: Vec::new(),
            dim_opacity: 0.25,
            canvas_padding: CanvasPadding::default(),
            background_rgb: [0, 0, 0],
            text_rgb: [255, 255, 255],
        }
    }
}

impl KineticConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> KinetypeResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| KinetypeError::serde(format!("config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> KinetypeResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Horizontal room available for a line of text.
    pub fn safe_width(&self) -> f64 {
        f64::from(self.frame_width) - self.left_margin - self.right_margin
    }

    /// Output frame dimensions.
    pub fn frame_size(&self) -> FrameSize {
        FrameSize {
            width: self.frame_width,
            height: self.frame_height,
        }
    }

    /// Reject configurations the layout engine cannot honour.
    pub fn validate(&self) -> KinetypeResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(KinetypeError::validation(
                "frame_width and frame_height must be > 0",
            ));
        }
        if !self.left_margin.is_finite()
            || !self.right_margin.is_finite()
            || self.left_margin < 0.0
            || self.right_margin < 0.0
        {
            return Err(KinetypeError::validation(
                "margins must be finite and >= 0",
            ));
        }
        if self.safe_width() <= 0.0 {
            return Err(KinetypeError::validation(format!(
                "margins leave no room for text (safe width {})",
                self.safe_width()
            )));
        }
        if self.min_font_size == 0 {
            return Err(KinetypeError::validation("min_font_size must be > 0"));
        }
        if self.min_font_size > self.base_font_size {
            return Err(KinetypeError::validation(format!(
                "min_font_size ({}) must not exceed base_font_size ({})",
                self.min_font_size, self.base_font_size
            )));
        }
        if self.font_step == 0 {
            return Err(KinetypeError::validation("font_step must be > 0"));
        }
        if !self.word_gap.is_finite() || self.word_gap < 0.0 {
            return Err(KinetypeError::validation("word_gap must be finite and >= 0"));
        }
        if !self.line_spacing_factor.is_finite() || self.line_spacing_factor < 1.0 {
            return Err(KinetypeError::validation(
                "line_spacing_factor must be finite and >= 1",
            ));
        }
        if self.words_per_line == 0 || self.words_per_screen == 0 {
            return Err(KinetypeError::validation(
                "words_per_line and words_per_screen must be > 0",
            ));
        }
        if self.frame_rate == 0 {
            return Err(KinetypeError::validation("frame_rate must be > 0"));
        }
        if !self.silent_words_per_second.is_finite() || self.silent_words_per_second <= 0.0 {
            return Err(KinetypeError::validation(
                "silent_words_per_second must be finite and > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.dim_opacity) {
            return Err(KinetypeError::validation("dim_opacity must be within [0, 1]"));
        }
        let pad = &self.canvas_padding;
        if !(pad.width_ratio >= 1.0 && pad.height_ratio >= 1.0) {
            return Err(KinetypeError::validation(
                "canvas padding ratios must be >= 1",
            ));
        }
        if !pad.baseline_ratio.is_finite() {
            return Err(KinetypeError::validation(
                "canvas padding baseline_ratio must be finite",
            ));
        }
        if self.font.trim().is_empty() {
            return Err(KinetypeError::validation("font must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
