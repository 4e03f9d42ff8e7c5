use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{KinetypeError, KinetypeResult};
use crate::layout::packer::LayoutOverflow;
use crate::schedule::highlight::Directive;
use crate::text::font::FontDescriptor;

/// Directives of one screen together with its time box.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScreenPlan {
    /// Screen position.
    pub index: usize,
    /// Absolute start in seconds.
    pub start: f64,
    /// Display time in seconds.
    pub duration: f64,
    /// Font size shared by all words on the screen.
    pub font_size: u32,
    /// `false` when a line overflowed at the minimum size.
    pub fits: bool,
    /// Draw instructions in z-order.
    pub directives: Vec<Directive>,
}

impl ScreenPlan {
    /// Absolute end time.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Complete, immutable output of one engine run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Output width in pixels.
    pub frame_width: u32,
    /// Output height in pixels.
    pub frame_height: u32,
    /// Output frames per second.
    pub frame_rate: u32,
    /// Font the layout was measured with.
    pub font: FontDescriptor,
    /// Constant step between word start times.
    pub seconds_per_word: f64,
    /// Word count times seconds per word.
    pub total_duration: f64,
    /// Screens in playback order.
    pub screens: Vec<ScreenPlan>,
    /// Lines that could not be fitted.
    pub overflows: Vec<LayoutOverflow>,
}

impl Timeline {
    /// All directives in playback and z-order.
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.screens.iter().flat_map(|s| s.directives.iter())
    }

    /// Frame rate as [`Fps`].
    pub fn fps(&self) -> KinetypeResult<Fps> {
        Fps::new(self.frame_rate, 1)
    }

    /// Number of frames needed to cover the whole timeline.
    pub fn frame_count(&self) -> KinetypeResult<u64> {
        Ok(self.fps()?.secs_to_frames_ceil(self.total_duration))
    }

    /// Screen shown at absolute time `t`.
    pub fn screen_at(&self, t: f64) -> Option<&ScreenPlan> {
        self.screens.iter().find(|s| s.start <= t && t < s.end())
    }

    /// Screen and visible directives at absolute time `t`, in draw order.
    pub fn active_at(&self, t: f64) -> Option<(&ScreenPlan, Vec<&Directive>)> {
        let screen = self.screen_at(t)?;
        let local = t - screen.start;
        let visible = screen
            .directives
            .iter()
            .filter(|d| d.is_visible_at(local))
            .collect();
        Some((screen, visible))
    }

    /// Time of the first sample of frame `idx`.
    pub fn frame_time(&self, idx: FrameIndex) -> KinetypeResult<f64> {
        Ok(self.fps()?.frames_to_secs(idx.0))
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> KinetypeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KinetypeError::serde(format!("timeline json: {e}")))
    }

    /// Parse a timeline previously written with [`Timeline::to_json_pretty`].
    pub fn from_json_str(json: &str) -> KinetypeResult<Self> {
        serde_json::from_str(json).map_err(|e| KinetypeError::serde(format!("timeline json: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/timeline.rs"]
mod tests;
