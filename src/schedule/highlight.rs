use crate::config::settings::KineticConfig;
use crate::layout::packer::Screen;
use crate::layout::placer::PlacedWord;

/// Opacity of a word once it has been read.
pub const BRIGHT_OPACITY: f32 = 1.0;

/// Visual state a directive renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// "Not yet read": low opacity for the whole screen.
    Dim,
    /// "Read": full opacity from light-up to the end of the screen.
    Bright,
}

/// One timed draw instruction handed to a compositor.
///
/// Times are relative to the owning screen's start. Directives are ordered so that later ones draw
/// on top of earlier ones.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Directive {
    /// Dim or bright state.
    pub kind: DirectiveKind,
    /// Owning screen.
    pub screen_index: usize,
    /// Word index in the whole script.
    pub word_index: usize,
    /// Word text.
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Canvas left edge.
    pub x: f64,
    /// Canvas top edge.
    pub y: f64,
    /// Padded canvas width.
    pub canvas_width: f64,
    /// Padded canvas height.
    pub canvas_height: f64,
    /// Cursor position the glyphs are set from.
    pub pen_x: f64,
    /// Baseline the glyphs sit on.
    pub baseline_y: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Start, relative to the screen.
    pub start: f64,
    /// Visible duration.
    pub duration: f64,
    /// Duration of the owning screen.
    pub screen_duration: f64,
}

impl Directive {
    /// End time relative to the screen.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether the directive is visible at `local_t` seconds into its screen.
    pub fn is_visible_at(&self, local_t: f64) -> bool {
        self.start <= local_t && local_t < self.end()
    }
}

fn directive_for(
    word: &PlacedWord,
    screen: &Screen,
    kind: DirectiveKind,
    opacity: f32,
    start: f64,
    duration: f64,
) -> Directive {
    Directive {
        kind,
        screen_index: screen.index,
        word_index: word.word.index,
        text: word.word.text.clone(),
        font_size: word.font_size,
        x: word.canvas.x0,
        y: word.canvas.y0,
        canvas_width: word.canvas.width(),
        canvas_height: word.canvas.height(),
        pen_x: word.pen_x,
        baseline_y: word.baseline_y,
        opacity,
        start,
        duration,
        screen_duration: screen.duration,
    }
}

/// Emit the dim/bright directive pairs for one screen, in reading order.
///
/// Each word gets a dim directive spanning the whole screen followed by a bright directive from
/// its light-up time to the end of the screen. The bright directive is omitted when no time is
/// left for it, so the word stays dim for the entire screen.
pub fn schedule_screen(
    screen: &Screen,
    placed: &[PlacedWord],
    cfg: &KineticConfig,
) -> Vec<Directive> {
    let mut out = Vec::with_capacity(placed.len() * 2);
    for word in placed {
        out.push(directive_for(
            word,
            screen,
            DirectiveKind::Dim,
            cfg.dim_opacity,
            0.0,
            screen.duration,
        ));
        if word.bright_duration > 0.0 {
            out.push(directive_for(
                word,
                screen,
                DirectiveKind::Bright,
                BRIGHT_OPACITY,
                word.bright_start,
                word.bright_duration,
            ));
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/highlight.rs"]
mod tests;
