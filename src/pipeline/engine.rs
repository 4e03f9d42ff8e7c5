use crate::compose::compositor::Compositor;
use crate::config::settings::KineticConfig;
use crate::foundation::error::{KinetypeError, KinetypeResult};
use crate::layout::packer::{pack_screen, screen_chunks};
use crate::layout::placer::place_screen;
use crate::narration::source::NarrationSource;
use crate::pipeline::progress::{Phase, ProgressSink, ProgressUpdate, check_cancelled};
use crate::schedule::highlight::schedule_screen;
use crate::schedule::timeline::{ScreenPlan, Timeline};
use crate::text::metrics::GlyphMetricsProvider;
use crate::text::script::{Pacing, Script, build_script, normalize_script};

/// Inputs of a full [`render`] run.
pub struct RenderRequest<'a> {
    /// Raw script text.
    pub script: &'a str,
    /// Layout and timing configuration.
    pub config: &'a KineticConfig,
    /// Narration source; required when `config.voice_enabled` is set.
    pub narration: Option<&'a dyn NarrationSource>,
}

/// Turn raw script text into a complete [`Timeline`].
///
/// Pure given its inputs: equal text, pacing, configuration and metrics produce equal timelines.
/// Layout progress is reported per screen in the layout band and cancellation is checked before
/// each screen.
#[tracing::instrument(skip_all, fields(chars = script_text.len()))]
pub fn build_timeline(
    script_text: &str,
    pacing: Pacing,
    config: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
    progress: &mut dyn ProgressSink,
) -> KinetypeResult<Timeline> {
    config.validate()?;
    let script = build_script(script_text, pacing)?;
    layout_script(&script, config, metrics, progress)
}

fn layout_script(
    script: &Script,
    config: &KineticConfig,
    metrics: &mut dyn GlyphMetricsProvider,
    progress: &mut dyn ProgressSink,
) -> KinetypeResult<Timeline> {
    let chunks: Vec<_> = screen_chunks(script, config).collect();
    let total = chunks.len();
    tracing::debug!(
        words = script.word_count(),
        screens = total,
        seconds_per_word = script.seconds_per_word,
        "laying out script"
    );

    let mut screens = Vec::with_capacity(total);
    let mut overflows = Vec::new();
    for (index, words) in chunks.into_iter().enumerate() {
        check_cancelled(progress)?;

        let (screen, mut screen_overflows) =
            pack_screen(index, words, script.seconds_per_word, config, metrics);
        let placed = place_screen(&screen, config, metrics);
        let directives = schedule_screen(&screen, &placed, config);
        screens.push(ScreenPlan {
            index: screen.index,
            start: screen.start,
            duration: screen.duration,
            font_size: screen.font_size,
            fits: screen.fits,
            directives,
        });
        overflows.append(&mut screen_overflows);

        progress.on_progress(ProgressUpdate::within(
            Phase::Layout,
            (index + 1) as f64 / total as f64,
            format!("laid out screen {}/{total}", index + 1),
        ));
    }

    Ok(Timeline {
        frame_width: config.frame_width,
        frame_height: config.frame_height,
        frame_rate: config.frame_rate,
        font: metrics.font().clone(),
        seconds_per_word: script.seconds_per_word,
        total_duration: script.total_duration(),
        screens,
        overflows,
    })
}

/// Run narration, layout and composition for one request.
///
/// Progress bands: narration 0 to 10 %, layout 10 to 20 %, composition 20 to 100 %, then
/// [`Phase::Done`]. A compositor failure is returned unchanged as [`KinetypeError::Render`]; a
/// failure observed after cancellation was requested is reported as [`KinetypeError::Cancelled`].
#[tracing::instrument(skip_all, fields(voice = request.config.voice_enabled))]
pub fn render(
    request: RenderRequest<'_>,
    metrics: &mut dyn GlyphMetricsProvider,
    compositor: &mut dyn Compositor,
    progress: &mut dyn ProgressSink,
) -> KinetypeResult<Timeline> {
    let config = request.config;
    config.validate()?;
    compositor.check_frame_size(config.frame_size())?;
    let cleaned = normalize_script(request.script);
    if cleaned.is_empty() {
        return Err(KinetypeError::EmptyScript);
    }

    progress.on_progress(ProgressUpdate::within(Phase::Narration, 0.0, "narrating"));
    let (pacing, audio) = if config.voice_enabled {
        let source = request.narration.ok_or_else(|| {
            KinetypeError::validation("voice mode requires a narration source")
        })?;
        let narration = source.narrate(&cleaned)?;
        (
            Pacing::Narrated {
                total_seconds: narration.duration_secs,
            },
            narration.audio,
        )
    } else {
        (Pacing::silent(config.silent_words_per_second), None)
    };
    progress.on_progress(ProgressUpdate::within(Phase::Narration, 1.0, "narration ready"));
    check_cancelled(progress)?;

    let script = build_script(&cleaned, pacing)?;
    let timeline = layout_script(&script, config, metrics, progress)?;
    check_cancelled(progress)?;

    if let Err(failure) = compositor.compose(&timeline, audio.as_deref(), progress) {
        if progress.is_cancelled() {
            return Err(KinetypeError::Cancelled);
        }
        tracing::error!(error = %failure, "compositor failed");
        return Err(failure.into());
    }

    progress.on_progress(ProgressUpdate::within(Phase::Done, 1.0, "done"));
    tracing::info!(
        screens = timeline.screens.len(),
        overflows = timeline.overflows.len(),
        duration = timeline.total_duration,
        "render complete"
    );
    Ok(timeline)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/engine.rs"]
mod tests;
