use super::*;
use crate::pipeline::engine::build_timeline;
use crate::pipeline::progress::NoopProgress;
use crate::schedule::highlight::DirectiveKind;
use crate::text::font::{FontResolver, ResolvedFont, SystemFontResolver};
use crate::text::metrics::GlyphMetricsProvider;
use crate::text::script::Pacing;
use crate::text::shaping::ShapedMetrics;

fn small_config() -> KineticConfig {
    KineticConfig {
        frame_width: 640,
        frame_height: 360,
        base_font_size: 48,
        min_font_size: 16,
        font_step: 4,
        left_margin: 40.0,
        right_margin: 40.0,
        word_gap: 16.0,
        ..KineticConfig::default()
    }
}

fn system_font() -> LoadedFont {
    match SystemFontResolver::new(&[]).resolve("sans-serif") {
        ResolvedFont::Loaded(f) => f,
        ResolvedFont::Fallback { .. } => panic!("raster tests need an installed font"),
    }
}

/// Bounding box `(x0, y0, x1, y1)` of pixels brighter than `threshold` in the red channel.
fn lit_bounds(frame: &FrameRgba, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..frame.height {
        for x in 0..frame.width {
            let i = ((y * frame.width + x) * 4) as usize;
            if frame.data[i] <= threshold {
                continue;
            }
            bounds = Some(match bounds {
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                None => (x, y, x, y),
            });
        }
    }
    bounds
}

fn max_in(frame: &FrameRgba, d: &Directive) -> u8 {
    let x0 = d.x.max(0.0) as u32;
    let y0 = d.y.max(0.0) as u32;
    let x1 = ((d.x + d.canvas_width).ceil() as u32).min(frame.width);
    let y1 = ((d.y + d.canvas_height).ceil() as u32).min(frame.height);
    let mut max = 0u8;
    for y in y0..y1 {
        for x in x0..x1 {
            let i = ((y * frame.width + x) * 4) as usize;
            max = max.max(frame.data[i]);
        }
    }
    max
}

#[test]
fn raster_dimensions_are_bounded() {
    assert_eq!(raster_dim(1920, "width").unwrap(), 1920);
    assert!(matches!(
        raster_dim(0, "width"),
        Err(KinetypeError::Validation(_))
    ));
    assert!(matches!(
        raster_dim(70_000, "height"),
        Err(KinetypeError::Validation(_))
    ));
}

#[test]
fn dim_words_are_darker_than_bright_words() {
    let font = system_font();
    let cfg = small_config();
    let mut metrics = ShapedMetrics::new(font.clone()).unwrap();
    let timeline = build_timeline(
        "Hello world",
        Pacing::Narrated { total_seconds: 2.0 },
        &cfg,
        &mut metrics,
        &mut NoopProgress,
    )
    .unwrap();
    let mut raster = FrameRasterizer::new(font, &cfg).unwrap();

    let frame = raster.render_at(&timeline, 0.5).unwrap();
    assert_eq!((frame.width, frame.height), (640, 360));
    assert_eq!(frame.data.len(), 640 * 360 * 4);

    let dims: Vec<&Directive> = timeline
        .directives()
        .filter(|d| d.kind == DirectiveKind::Dim)
        .collect();
    let hello = max_in(&frame, dims[0]);
    let world = max_in(&frame, dims[1]);
    assert!(hello > 200, "bright word peak {hello}");
    assert!(world > 0 && world < 100, "dim word peak {world}");

    let later = raster.render_frame(&timeline, FrameIndex(36)).unwrap();
    assert!(max_in(&later, dims[1]) > 200);
}

#[test]
fn word_ink_lands_on_its_pen_span_and_baseline() {
    let font = system_font();
    let cfg = KineticConfig {
        base_font_size: 96,
        ..small_config()
    };
    let mut metrics = ShapedMetrics::new(font.clone()).unwrap();
    let timeline = build_timeline(
        "Hello",
        Pacing::Narrated { total_seconds: 1.0 },
        &cfg,
        &mut metrics,
        &mut NoopProgress,
    )
    .unwrap();
    let bright = timeline
        .directives()
        .find(|d| d.kind == DirectiveKind::Bright)
        .unwrap()
        .clone();
    let advance = metrics.measure("Hello", bright.font_size).advance_width;

    let mut raster = FrameRasterizer::new(font, &cfg).unwrap();
    let frame = raster.render_at(&timeline, 0.5).unwrap();
    let (x0, y0, x1, y1) = lit_bounds(&frame, 128).expect("word drew no pixels");
    let (x0, y0, x1, y1) = (f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));

    assert!(x0 >= bright.pen_x - 1.0, "ink starts at {x0}, pen at {}", bright.pen_x);
    assert!(x1 <= bright.pen_x + advance + 1.0);
    assert!(x1 - x0 > 0.8 * advance, "ink spans {} of {advance}", x1 - x0);
    assert!(
        (y1 - bright.baseline_y).abs() < 3.0,
        "ink bottom {y1}, baseline {}",
        bright.baseline_y
    );
    assert!(y0 > bright.baseline_y - f64::from(bright.font_size));

    assert!(x0 >= bright.x - 1.0 && x1 <= bright.x + bright.canvas_width + 1.0);
    assert!(y0 >= bright.y - 1.0 && y1 <= bright.y + bright.canvas_height + 1.0);
}

#[test]
fn frames_outside_the_timeline_are_background() {
    let font = system_font();
    let cfg = KineticConfig {
        background_rgb: [10, 20, 30],
        ..small_config()
    };
    let mut metrics = ShapedMetrics::new(font.clone()).unwrap();
    let timeline = build_timeline(
        "Hello",
        Pacing::Narrated { total_seconds: 1.0 },
        &cfg,
        &mut metrics,
        &mut NoopProgress,
    )
    .unwrap();
    let mut raster = FrameRasterizer::new(font, &cfg).unwrap();

    let frame = raster.render_at(&timeline, 5.0).unwrap();
    assert!(frame.data.chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
}

#[test]
fn timeline_size_must_match() {
    let font = system_font();
    let cfg = small_config();
    let timeline = build_timeline(
        "Hello",
        Pacing::Narrated { total_seconds: 1.0 },
        &KineticConfig::default(),
        &mut crate::text::metrics::EstimatedMetrics::new(),
        &mut NoopProgress,
    )
    .unwrap();
    let mut raster = FrameRasterizer::new(font, &cfg).unwrap();
    assert!(matches!(
        raster.render_at(&timeline, 0.0),
        Err(KinetypeError::Validation(_))
    ));
}
