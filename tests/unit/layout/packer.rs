use super::*;
use crate::text::font::FontDescriptor;
use crate::text::metrics::GlyphMetrics;
use crate::text::script::{Pacing, build_script};
use kurbo::Rect;

/// Half an em per character, no kerning.
struct HalfEm {
    font: FontDescriptor,
}

impl HalfEm {
    fn new() -> Self {
        Self {
            font: FontDescriptor::fallback(),
        }
    }
}

impl GlyphMetricsProvider for HalfEm {
    fn measure(&mut self, text: &str, font_size: u32) -> GlyphMetrics {
        let size = f64::from(font_size);
        let advance_width = 0.5 * size * text.chars().count() as f64;
        GlyphMetrics {
            advance_width,
            ink: Rect::new(0.0, -0.7 * size, advance_width, 0.2 * size),
        }
    }

    fn font(&self) -> &FontDescriptor {
        &self.font
    }
}

fn words(texts: &[&str]) -> Vec<WordUnit> {
    texts
        .iter()
        .enumerate()
        .map(|(index, t)| WordUnit {
            text: t.to_string(),
            index,
            start_time: index as f64,
        })
        .collect()
}

#[test]
fn line_width_adds_gaps_between_words_only() {
    let mut m = HalfEm::new();
    let w = words(&["ab", "cd", "ef"]);
    assert_eq!(line_width(&w, 100, 35.0, &mut m), 300.0 + 70.0);
    assert_eq!(line_width(&w[..1], 100, 35.0, &mut m), 100.0);
}

#[test]
fn short_lines_keep_base_size() {
    let cfg = KineticConfig::default();
    let mut m = HalfEm::new();
    let w = words(&["alpha", "beta", "gamma"]);
    let scale = autoscale(&[&w[..]], &cfg, &mut m);
    assert_eq!(scale.font_size, 130);
    assert!(scale.fits);
    assert_eq!(scale.tried, vec![130]);
}

#[test]
fn wide_lines_step_down_until_they_fit() {
    let cfg = KineticConfig::default();
    let mut m = HalfEm::new();
    let w = words(&["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
    let scale = autoscale(&[&w[..]], &cfg, &mut m);
    assert_eq!(scale.tried, vec![130, 120, 110, 100]);
    assert_eq!(scale.font_size, 100);
    assert!(scale.fits);
    assert!(scale.line_widths.iter().all(|w| *w <= cfg.safe_width()));
}

#[test]
fn every_tried_size_above_the_choice_overflowed() {
    let cfg = KineticConfig::default();
    let mut m = HalfEm::new();
    let w = words(&["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
    let scale = autoscale(&[&w[..]], &cfg, &mut m);
    for &size in &scale.tried[..scale.tried.len() - 1] {
        assert!(line_width(&w, size, cfg.word_gap, &mut m) > cfg.safe_width());
    }
}

#[test]
fn last_step_clamps_to_minimum() {
    let cfg = KineticConfig {
        min_font_size: 45,
        frame_width: 700,
        ..KineticConfig::default()
    };
    let mut m = HalfEm::new();
    let w = words(&["x".repeat(60).as_str()]);
    let scale = autoscale(&[&w[..]], &cfg, &mut m);
    assert_eq!(scale.tried.last(), Some(&45));
    assert_eq!(scale.tried[scale.tried.len() - 2], 50);
    assert_eq!(scale.font_size, 45);
}

#[test]
fn pathological_word_is_accepted_overflowing_at_minimum() {
    let cfg = KineticConfig {
        frame_width: 1000,
        ..KineticConfig::default()
    };
    let long = "x".repeat(40);
    let mut m = HalfEm::new();
    let (screen, overflows) = pack_screen(0, &words(&[long.as_str()]), 1.0, &cfg, &mut m);
    assert_eq!(screen.font_size, cfg.min_font_size);
    assert!(!screen.fits);
    assert_eq!(overflows.len(), 1);
    assert_eq!(overflows[0].line_index, 0);
    assert_eq!(overflows[0].line_width, 800.0);
    assert_eq!(overflows[0].safe_width, 700.0);
    assert_eq!(screen.words[0].text, long);
}

#[test]
fn lines_on_one_screen_share_a_font_size() {
    let cfg = KineticConfig::default();
    let mut m = HalfEm::new();
    let w = words(&["a", "b", "c", "aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
    let (screen, overflows) = pack_screen(0, &w, 0.5, &cfg, &mut m);
    assert!(overflows.is_empty());
    assert_eq!(screen.lines.len(), 2);
    assert_eq!(screen.font_size, 100);
    for line in &screen.lines {
        let expected = line_width(screen.line_words(line), 100, cfg.word_gap, &mut m);
        assert_eq!(line.width, expected);
    }
    assert_eq!(screen.duration, 3.0);
}

#[test]
fn screens_are_chunked_and_lines_grouped() {
    let cfg = KineticConfig::default();
    let script = build_script(
        "one two three four five six seven eight nine ten eleven twelve thirteen",
        Pacing::Narrated { total_seconds: 13.0 },
    )
    .unwrap();
    let mut m = HalfEm::new();
    let (screens, _) = pack_screens(&script, &cfg, &mut m);
    assert_eq!(screens.len(), 2);
    assert_eq!(screens[0].words.len(), 12);
    assert_eq!(screens[0].lines.len(), 4);
    assert_eq!(screens[1].words.len(), 1);
    assert_eq!(screens[1].lines.len(), 1);
    assert_eq!(screens[1].start, 12.0);
    assert_eq!(screens[1].duration, 1.0);
    assert_eq!(screens[1].words[0].index, 12);
}

#[test]
fn short_final_line_keeps_remaining_words() {
    let cfg = KineticConfig::default();
    let mut m = HalfEm::new();
    let w = words(&["a", "b", "c", "d", "e", "f", "g"]);
    let (screen, _) = pack_screen(0, &w, 1.0, &cfg, &mut m);
    let sizes: Vec<usize> = screen.lines.iter().map(|l| l.words.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn overflow_on_one_screen_leaves_others_untouched() {
    let cfg = KineticConfig {
        frame_width: 1000,
        words_per_screen: 1,
        ..KineticConfig::default()
    };
    let script = build_script(
        &format!("{} tiny", "x".repeat(40)),
        Pacing::Fixed { seconds_per_word: 0.4 },
    )
    .unwrap();
    let mut m = HalfEm::new();
    let (screens, overflows) = pack_screens(&script, &cfg, &mut m);
    assert_eq!(overflows.len(), 1);
    assert_eq!(overflows[0].screen_index, 0);
    assert_eq!(screens[0].font_size, cfg.min_font_size);
    assert_eq!(screens[1].font_size, cfg.base_font_size);
    assert!(screens[1].fits);
}
