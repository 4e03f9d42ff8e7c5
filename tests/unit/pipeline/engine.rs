use super::*;
use crate::compose::compositor::InMemoryCompositor;
use crate::foundation::core::FrameSize;
use crate::foundation::error::RenderFailure;
use crate::narration::source::FixedNarration;
use crate::pipeline::progress::NoopProgress;
use crate::text::metrics::EstimatedMetrics;
use std::path::{Path, PathBuf};

const TEXT: &str = "Wealth is not about having a lot of money; it is about having options";

#[derive(Default)]
struct Recorder {
    updates: Vec<ProgressUpdate>,
    cancel_after: Option<usize>,
}

impl ProgressSink for Recorder {
    fn on_progress(&mut self, update: ProgressUpdate) {
        self.updates.push(update);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .is_some_and(|n| self.updates.len() >= n)
    }
}

struct FailingCompositor;

impl Compositor for FailingCompositor {
    fn compose(
        &mut self,
        _timeline: &Timeline,
        _audio: Option<&Path>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        Err(RenderFailure::new("disk full"))
    }
}

/// Accepts only square frames; counts how often it was asked to compose.
#[derive(Default)]
struct SquareOnlyCompositor {
    composed: usize,
}

impl Compositor for SquareOnlyCompositor {
    fn check_frame_size(&self, size: FrameSize) -> KinetypeResult<()> {
        if size.width != size.height {
            return Err(KinetypeError::validation("frames must be square"));
        }
        Ok(())
    }

    fn compose(
        &mut self,
        _timeline: &Timeline,
        _audio: Option<&Path>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        self.composed += 1;
        Ok(())
    }
}

fn silent_config() -> KineticConfig {
    KineticConfig {
        voice_enabled: false,
        ..KineticConfig::default()
    }
}

#[test]
fn build_timeline_covers_every_word_once() {
    let cfg = KineticConfig::default();
    let t = build_timeline(
        TEXT,
        Pacing::Narrated {
            total_seconds: 14.0,
        },
        &cfg,
        &mut EstimatedMetrics::new(),
        &mut NoopProgress,
    )
    .unwrap();

    assert_eq!(t.screens.len(), 2);
    assert_eq!(t.seconds_per_word, 1.0);
    assert_eq!(t.total_duration, 14.0);
    assert!(t.font.is_fallback());

    let mut dims: Vec<usize> = t
        .directives()
        .filter(|d| d.kind == crate::schedule::highlight::DirectiveKind::Dim)
        .map(|d| d.word_index)
        .collect();
    dims.dedup();
    assert_eq!(dims, (0..14).collect::<Vec<_>>());
}

#[test]
fn build_timeline_rejects_bad_input_before_layout() {
    let mut seen = Vec::new();
    let mut sink = |u: ProgressUpdate| seen.push(u);

    let err = build_timeline(
        "  \n\t ",
        Pacing::Fixed {
            seconds_per_word: 0.5,
        },
        &KineticConfig::default(),
        &mut EstimatedMetrics::new(),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::EmptyScript));

    let bad = KineticConfig {
        words_per_line: 0,
        ..KineticConfig::default()
    };
    let err = build_timeline(
        TEXT,
        Pacing::Fixed {
            seconds_per_word: 0.5,
        },
        &bad,
        &mut EstimatedMetrics::new(),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::Validation(_)));

    let err = build_timeline(
        TEXT,
        Pacing::Narrated { total_seconds: 0.0 },
        &KineticConfig::default(),
        &mut EstimatedMetrics::new(),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::InvalidDuration(_)));

    assert!(seen.is_empty());
}

#[test]
fn layout_progress_stays_in_its_band() {
    let mut rec = Recorder::default();
    let text = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    build_timeline(
        &text,
        Pacing::Fixed {
            seconds_per_word: 0.5,
        },
        &KineticConfig::default(),
        &mut EstimatedMetrics::new(),
        &mut rec,
    )
    .unwrap();

    assert_eq!(rec.updates.len(), 4);
    assert!(rec.updates.iter().all(|u| u.phase == Phase::Layout));
    assert!(rec.updates.windows(2).all(|w| w[0].fraction < w[1].fraction));
    assert!(rec.updates[0].fraction > 0.10);
    assert!((rec.updates[3].fraction - 0.20).abs() < 1e-12);
}

#[test]
fn cancellation_between_screens_stops_layout() {
    let mut rec = Recorder {
        cancel_after: Some(1),
        ..Recorder::default()
    };
    let err = build_timeline(
        TEXT,
        Pacing::Fixed {
            seconds_per_word: 0.5,
        },
        &KineticConfig::default(),
        &mut EstimatedMetrics::new(),
        &mut rec,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::Cancelled));
    assert_eq!(rec.updates.len(), 1);
}

#[test]
fn progress_does_not_change_results() {
    let cfg = KineticConfig::default();
    let pacing = Pacing::Narrated {
        total_seconds: 9.0,
    };
    let a = build_timeline(
        TEXT,
        pacing,
        &cfg,
        &mut EstimatedMetrics::new(),
        &mut NoopProgress,
    )
    .unwrap();
    let b = build_timeline(
        TEXT,
        pacing,
        &cfg,
        &mut EstimatedMetrics::new(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(a.to_json_pretty().unwrap(), b.to_json_pretty().unwrap());
}

#[test]
fn render_reports_bands_in_order() {
    let cfg = KineticConfig::default();
    let narration = FixedNarration::new(7.0).with_audio("voice.wav");
    let mut compositor = InMemoryCompositor::new();
    let mut rec = Recorder::default();

    let t = render(
        RenderRequest {
            script: TEXT,
            config: &cfg,
            narration: Some(&narration),
        },
        &mut EstimatedMetrics::new(),
        &mut compositor,
        &mut rec,
    )
    .unwrap();

    assert_eq!(t.seconds_per_word, 0.5);
    assert_eq!(compositor.composed().len(), 1);
    assert_eq!(compositor.composed()[0].0, t);
    assert_eq!(compositor.composed()[0].1, Some(PathBuf::from("voice.wav")));

    let phases: Vec<Phase> = rec.updates.iter().map(|u| u.phase).collect();
    assert_eq!(phases.first(), Some(&Phase::Narration));
    assert_eq!(phases.last(), Some(&Phase::Done));
    assert!(phases.windows(2).all(|w| w[0] <= w[1]));
    assert!(rec.updates.windows(2).all(|w| w[0].fraction <= w[1].fraction));
}

#[test]
fn silent_mode_uses_reading_rate() {
    let cfg = silent_config();
    let mut compositor = InMemoryCompositor::new();
    let t = render(
        RenderRequest {
            script: "one two three four five",
            config: &cfg,
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut compositor,
        &mut NoopProgress,
    )
    .unwrap();
    assert!((t.seconds_per_word - 0.4).abs() < 1e-12);
    assert!((t.total_duration - 2.0).abs() < 1e-12);
    assert_eq!(compositor.composed()[0].1, None);
}

#[test]
fn voice_mode_requires_a_narration_source() {
    let err = render(
        RenderRequest {
            script: TEXT,
            config: &KineticConfig::default(),
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut InMemoryCompositor::new(),
        &mut NoopProgress,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::Validation(_)));
    assert!(err.is_input_error());
}

#[test]
fn empty_script_is_rejected_before_narration() {
    let narration = FixedNarration::new(-1.0);
    let err = render(
        RenderRequest {
            script: " \n ",
            config: &KineticConfig::default(),
            narration: Some(&narration),
        },
        &mut EstimatedMetrics::new(),
        &mut InMemoryCompositor::new(),
        &mut NoopProgress,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::EmptyScript));
}

#[test]
fn compositor_failure_is_propagated_unchanged() {
    let err = render(
        RenderRequest {
            script: TEXT,
            config: &silent_config(),
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut FailingCompositor,
        &mut NoopProgress,
    )
    .unwrap_err();
    assert!(err.is_render_failure());
    match err {
        KinetypeError::Render(f) => assert_eq!(f.message(), "disk full"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cancellation_after_layout_skips_composition() {
    let mut rec = Recorder {
        // narration start, narration ready, two layout screens
        cancel_after: Some(4),
        ..Recorder::default()
    };
    let mut compositor = InMemoryCompositor::new();
    let err = render(
        RenderRequest {
            script: TEXT,
            config: &silent_config(),
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut compositor,
        &mut rec,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::Cancelled));
    assert!(compositor.composed().is_empty());
}

struct CancellingCompositor;

impl Compositor for CancellingCompositor {
    fn compose(
        &mut self,
        _timeline: &Timeline,
        _audio: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        progress.on_progress(ProgressUpdate::within(Phase::Compose, 0.5, "half"));
        if progress.is_cancelled() {
            return Err(RenderFailure::new("stopped"));
        }
        Ok(())
    }
}

#[test]
fn failure_after_cancel_during_compose_reports_cancelled() {
    let mut rec = Recorder {
        cancel_after: Some(5),
        ..Recorder::default()
    };
    let err = render(
        RenderRequest {
            script: TEXT,
            config: &silent_config(),
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut CancellingCompositor,
        &mut rec,
    )
    .unwrap_err();
    assert!(matches!(err, KinetypeError::Cancelled));
}

#[test]
fn unsupported_frame_size_is_an_input_error_before_narration() {
    let cfg = silent_config();
    let mut compositor = SquareOnlyCompositor::default();
    let mut progress = Recorder::default();
    let err = render(
        RenderRequest {
            script: TEXT,
            config: &cfg,
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut compositor,
        &mut progress,
    )
    .unwrap_err();

    assert!(err.is_input_error(), "{err}");
    assert!(!err.is_render_failure());
    assert_eq!(compositor.composed, 0);
    assert!(progress.updates.is_empty());

    let square = KineticConfig {
        frame_width: 1200,
        ..silent_config()
    };
    render(
        RenderRequest {
            script: TEXT,
            config: &square,
            narration: None,
        },
        &mut EstimatedMetrics::new(),
        &mut compositor,
        &mut NoopProgress,
    )
    .unwrap();
    assert_eq!(compositor.composed, 1);
}
