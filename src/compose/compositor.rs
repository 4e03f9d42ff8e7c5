use std::path::{Path, PathBuf};

use crate::compose::ffmpeg::ensure_parent_dir;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{KinetypeResult, RenderFailure};
use crate::pipeline::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::schedule::timeline::Timeline;

/// Consumer of a finished [`Timeline`].
///
/// Failures are opaque [`RenderFailure`] values; the engine reports them unchanged and never
/// retries. Implementations report their own progress as [`Phase::Compose`] updates and
/// may stop early when [`ProgressSink::is_cancelled`] returns `true`.
pub trait Compositor {
    /// Reject frame sizes this compositor cannot produce.
    ///
    /// Called before narration and layout, so a bad size surfaces as an input error instead of a
    /// render failure.
    fn check_frame_size(&self, size: FrameSize) -> KinetypeResult<()> {
        let _ = size;
        Ok(())
    }

    /// Render `timeline`, muxing `audio` when given.
    fn compose(
        &mut self,
        timeline: &Timeline,
        audio: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure>;
}

/// Writes the timeline as pretty-printed JSON.
#[derive(Clone, Debug)]
pub struct ManifestCompositor {
    out_path: PathBuf,
}

impl ManifestCompositor {
    /// Compositor writing to `out_path`; parent directories are created on demand.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
        }
    }

    /// Destination file.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }
}

impl Compositor for ManifestCompositor {
    fn compose(
        &mut self,
        timeline: &Timeline,
        _audio: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        let json = timeline
            .to_json_pretty()
            .map_err(|e| RenderFailure::new(e.to_string()))?;
        ensure_parent_dir(&self.out_path)
            .map_err(|e| RenderFailure::new(e.to_string()))?;
        std::fs::write(&self.out_path, json).map_err(|e| {
            RenderFailure::new(format!(
                "failed to write manifest '{}': {e}",
                self.out_path.display()
            ))
        })?;
        progress.on_progress(ProgressUpdate::within(
            Phase::Compose,
            1.0,
            format!("wrote {}", self.out_path.display()),
        ));
        Ok(())
    }
}

/// Keeps composed timelines in memory, for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryCompositor {
    composed: Vec<(Timeline, Option<PathBuf>)>,
}

impl InMemoryCompositor {
    /// Empty compositor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timelines received so far, with their audio paths.
    pub fn composed(&self) -> &[(Timeline, Option<PathBuf>)] {
        &self.composed
    }
}

impl Compositor for InMemoryCompositor {
    fn compose(
        &mut self,
        timeline: &Timeline,
        audio: Option<&Path>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        self.composed
            .push((timeline.clone(), audio.map(Path::to_path_buf)));
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
